//! Input and output type declarations.

// self
use crate::_prelude::*;

/// Declared type of a function input or output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
	/// UTF-8 string.
	String,
	/// JSON number.
	Number,
	/// JSON boolean.
	Boolean,
	/// JSON object.
	Object,
	/// JSON array.
	Array,
	/// JSON Web Key, either as an object or as a JSON-encoded string.
	Jwk,
	/// Any JSON value.
	Any,
}
impl ValueType {
	/// Returns the schema label used in descriptor metadata.
	pub const fn as_str(self) -> &'static str {
		match self {
			ValueType::String => "string",
			ValueType::Number => "number",
			ValueType::Boolean => "boolean",
			ValueType::Object => "object",
			ValueType::Array => "array",
			ValueType::Jwk => "jwk",
			ValueType::Any => "any",
		}
	}
}
impl Display for ValueType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Schema entry for one function input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
	/// Declared type.
	#[serde(rename = "type")]
	pub ty: ValueType,
	/// Whether the step fails validation when the value is missing or empty.
	#[serde(default)]
	pub required: bool,
	/// Value used when the caller supplies nothing.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub default: Option<Value>,
	/// Human-readable description shown by the UI.
	#[serde(default)]
	pub description: String,
}
impl InputSpec {
	/// Declares a required input.
	pub fn required(ty: ValueType, description: impl Into<String>) -> Self {
		Self { ty, required: true, default: None, description: description.into() }
	}

	/// Declares an optional input.
	pub fn optional(ty: ValueType, description: impl Into<String>) -> Self {
		Self { ty, required: false, default: None, description: description.into() }
	}

	/// Sets the fallback value applied when the input is absent.
	pub fn with_default(mut self, value: impl Into<Value>) -> Self {
		self.default = Some(value.into());

		self
	}
}

/// Schema entry for one function output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
	/// Declared type.
	#[serde(rename = "type")]
	pub ty: ValueType,
	/// Human-readable description shown by the UI.
	#[serde(default)]
	pub description: String,
}
impl OutputSpec {
	/// Declares an output.
	pub fn new(ty: ValueType, description: impl Into<String>) -> Self {
		Self { ty, description: description.into() }
	}
}

//! Immutable function metadata and its builder.

// self
use crate::{
	_prelude::*,
	function::{InputSpec, OutputSpec, SubFunction},
};

const FUNCTION_ID_MAX_LEN: usize = 128;

/// Errors raised while constructing descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DescriptorError {
	/// The identifier was empty.
	#[error("Function identifier cannot be empty.")]
	EmptyId,
	/// The identifier contains whitespace characters.
	#[error("Function identifier `{id}` contains whitespace.")]
	ContainsWhitespace {
		/// Rejected identifier.
		id: String,
	},
	/// The identifier exceeded the allowed character count.
	#[error("Function identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
	/// A required input also declares a default, which could never apply.
	#[error("Input `{input}` is required and cannot declare a default.")]
	RequiredWithDefault {
		/// Offending input name.
		input: String,
	},
}

/// Immutable function descriptor owned by the registry.
///
/// Serializes as metadata only; the handler never leaves the process.
#[derive(Clone, Serialize)]
pub struct FunctionDescriptor {
	/// Unique identifier used by `fn` in chain steps.
	pub id: String,
	/// Display name.
	pub name: String,
	/// One-line summary.
	pub description: String,
	/// Grouping used by the category filter.
	pub category: String,
	/// Declared inputs keyed by name.
	pub inputs: BTreeMap<String, InputSpec>,
	/// Declared outputs keyed by name.
	pub outputs: BTreeMap<String, OutputSpec>,
	#[serde(skip)]
	handler: Arc<dyn SubFunction>,
}
impl FunctionDescriptor {
	/// Creates a new builder for the provided identifier and handler.
	pub fn builder(
		id: impl Into<String>,
		handler: impl 'static + SubFunction,
	) -> FunctionDescriptorBuilder {
		FunctionDescriptorBuilder::new(id, Arc::new(handler))
	}

	/// Returns the executable handler.
	pub fn handler(&self) -> &dyn SubFunction {
		self.handler.as_ref()
	}
}
impl Debug for FunctionDescriptor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FunctionDescriptor")
			.field("id", &self.id)
			.field("category", &self.category)
			.field("inputs", &self.inputs.keys().collect::<Vec<_>>())
			.field("outputs", &self.outputs.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Builder for [`FunctionDescriptor`] values.
pub struct FunctionDescriptorBuilder {
	id: String,
	name: Option<String>,
	description: String,
	category: String,
	inputs: BTreeMap<String, InputSpec>,
	outputs: BTreeMap<String, OutputSpec>,
	handler: Arc<dyn SubFunction>,
}
impl FunctionDescriptorBuilder {
	/// Creates a builder seeded with the identifier and a shared handler.
	pub fn new(id: impl Into<String>, handler: Arc<dyn SubFunction>) -> Self {
		Self {
			id: id.into(),
			name: None,
			description: String::new(),
			category: "general".into(),
			inputs: BTreeMap::new(),
			outputs: BTreeMap::new(),
			handler,
		}
	}

	/// Sets the display name (defaults to the identifier).
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());

		self
	}

	/// Sets the summary.
	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();

		self
	}

	/// Sets the category (defaults to `general`).
	pub fn category(mut self, category: impl Into<String>) -> Self {
		self.category = category.into();

		self
	}

	/// Declares an input.
	pub fn input(mut self, name: impl Into<String>, spec: InputSpec) -> Self {
		self.inputs.insert(name.into(), spec);

		self
	}

	/// Declares an output.
	pub fn output(mut self, name: impl Into<String>, spec: OutputSpec) -> Self {
		self.outputs.insert(name.into(), spec);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<FunctionDescriptor, DescriptorError> {
		validate_id(&self.id)?;

		if let Some((input, _)) =
			self.inputs.iter().find(|(_, spec)| spec.required && spec.default.is_some())
		{
			return Err(DescriptorError::RequiredWithDefault { input: input.clone() });
		}

		Ok(FunctionDescriptor {
			name: self.name.unwrap_or_else(|| self.id.clone()),
			id: self.id,
			description: self.description,
			category: self.category,
			inputs: self.inputs,
			outputs: self.outputs,
			handler: self.handler,
		})
	}
}

fn validate_id(id: &str) -> Result<(), DescriptorError> {
	if id.is_empty() {
		return Err(DescriptorError::EmptyId);
	}
	if id.chars().any(char::is_whitespace) {
		return Err(DescriptorError::ContainsWhitespace { id: id.to_owned() });
	}
	if id.len() > FUNCTION_ID_MAX_LEN {
		return Err(DescriptorError::TooLong { max: FUNCTION_ID_MAX_LEN });
	}

	Ok(())
}

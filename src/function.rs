//! Sub-function contract, descriptors, and the registry that owns them.
//!
//! A sub function is a named, schema-described unit of protocol work (sign a JWT, call a
//! token endpoint, decode a token). `descriptor` holds the immutable metadata plus the
//! [`SubFunction`] handler, `schema` the input/output type declarations, `registry` the explicit
//! id-to-descriptor map built at startup, and `builtin` the functions shipped with the lab.

pub mod builtin;
pub mod descriptor;
pub mod registry;
pub mod schema;

pub use descriptor::*;
pub use registry::*;
pub use schema::*;

// self
use crate::{_prelude::*, context::ExecutionContext, error::FunctionError};

/// Boxed future returned by [`SubFunction::execute`].
pub type FunctionFuture<'a> =
	Pin<Box<dyn Future<Output = Result<FunctionOutput, FunctionError>> + 'a + Send>>;

/// Executable half of a function descriptor.
///
/// Handlers receive inputs that are already template-resolved, defaulted, and validated
/// against the descriptor schema. They may perform network I/O and own their timeouts.
pub trait SubFunction
where
	Self: Send + Sync,
{
	/// Runs the function.
	fn execute<'a>(&'a self, inputs: JsonMap, context: &'a ExecutionContext) -> FunctionFuture<'a>;
}

/// Successful handler result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionOutput {
	/// Named outputs addressable as `{{subFn.<step>.<name>}}`.
	pub outputs: JsonMap,
	/// Equivalent `curl` command for the network call, if one was made.
	pub curl: Option<String>,
}
impl FunctionOutput {
	/// Wraps bare outputs.
	pub fn new(outputs: JsonMap) -> Self {
		Self { outputs, curl: None }
	}

	/// Attaches the `curl` rendering of the request that produced the outputs.
	pub fn with_curl(mut self, curl: impl Into<String>) -> Self {
		self.curl = Some(curl.into());

		self
	}
}
impl From<JsonMap> for FunctionOutput {
	fn from(outputs: JsonMap) -> Self {
		Self::new(outputs)
	}
}

/// Decodes resolved inputs into a handler's typed request, reporting the failing path.
pub fn decode_inputs<T>(inputs: JsonMap) -> Result<T, FunctionError>
where
	T: serde::de::DeserializeOwned,
{
	Ok(serde_path_to_error::deserialize(Value::Object(inputs))?)
}

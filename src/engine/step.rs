// crates.io
use serde::ser::{SerializeStruct, Serializer};
// self
use crate::{_prelude::*, function::FunctionOutput};

/// Uniform result of one step, whatever happened inside the handler.
///
/// Serializes as `{success: true, outputs, curl}` (curl is `null` when the function made no
/// network call) or `{success: false, error}`.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
	/// The handler returned outputs.
	Succeeded {
		/// Named outputs.
		outputs: JsonMap,
		/// `curl` rendering of the request the handler made, if any.
		curl: Option<String>,
	},
	/// Lookup, validation, or the handler failed.
	Failed {
		/// Human-readable failure.
		error: String,
	},
}
impl StepOutcome {
	/// Builds a failed outcome.
	pub fn failed(error: impl Into<String>) -> Self {
		Self::Failed { error: error.into() }
	}

	/// Returns `true` for [`StepOutcome::Succeeded`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Succeeded { .. })
	}

	/// Outputs of a successful step.
	pub fn outputs(&self) -> Option<&JsonMap> {
		match self {
			Self::Succeeded { outputs, .. } => Some(outputs),
			Self::Failed { .. } => None,
		}
	}

	/// `curl` rendering of a successful step, if it made a request.
	pub fn curl(&self) -> Option<&str> {
		match self {
			Self::Succeeded { curl, .. } => curl.as_deref(),
			Self::Failed { .. } => None,
		}
	}

	/// Failure message of a failed step.
	pub fn error(&self) -> Option<&str> {
		match self {
			Self::Succeeded { .. } => None,
			Self::Failed { error } => Some(error),
		}
	}
}
impl From<FunctionOutput> for StepOutcome {
	fn from(output: FunctionOutput) -> Self {
		Self::Succeeded { outputs: output.outputs, curl: output.curl }
	}
}
impl<E> From<Result<FunctionOutput, E>> for StepOutcome
where
	E: Display,
{
	fn from(result: Result<FunctionOutput, E>) -> Self {
		match result {
			Ok(output) => output.into(),
			Err(e) => Self::failed(e.to_string()),
		}
	}
}
impl Serialize for StepOutcome {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self {
			Self::Succeeded { outputs, curl } => {
				let mut state = serializer.serialize_struct("StepOutcome", 3)?;

				state.serialize_field("success", &true)?;
				state.serialize_field("outputs", outputs)?;
				state.serialize_field("curl", curl)?;
				state.end()
			},
			Self::Failed { error } => {
				let mut state = serializer.serialize_struct("StepOutcome", 2)?;

				state.serialize_field("success", &false)?;
				state.serialize_field("error", error)?;
				state.end()
			},
		}
	}
}

/// One entry of a chain's `results`, attributed to its step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepResult {
	/// Step id (`id`, or `fn` when the step has none).
	pub id: String,
	/// Function the step invoked.
	#[serde(rename = "fn")]
	pub function: String,
	/// What happened.
	#[serde(flatten)]
	pub outcome: StepOutcome,
}

// crates.io
use serde::ser::{SerializeStruct, Serializer};
// self
use crate::{_prelude::*, engine::StepResult};

/// Promotes one output field of a step into the chain's `stateUpdates`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMapping {
	/// Output name on the step.
	pub from: String,
	/// Key written into `stateUpdates`.
	pub to: String,
}

/// One step of a chain as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStep {
	/// Registered function to invoke.
	#[serde(rename = "fn")]
	pub function: String,
	/// Step id used for `{{subFn.<id>...}}` addressing; defaults to `fn`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	/// Input templates.
	#[serde(default)]
	pub inputs: JsonMap,
	/// Outputs promoted into `stateUpdates` when the step succeeds.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub store_results: Vec<StoreMapping>,
}
impl ChainStep {
	/// Creates a step invoking `function` with no inputs.
	pub fn new(function: impl Into<String>) -> Self {
		Self { function: function.into(), id: None, inputs: JsonMap::new(), store_results: Vec::new() }
	}

	/// Sets the step id.
	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());

		self
	}

	/// Sets one input template.
	pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.inputs.insert(name.into(), value.into());

		self
	}

	/// Promotes output `from` into `stateUpdates[to]`.
	pub fn store(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
		self.store_results.push(StoreMapping { from: from.into(), to: to.into() });

		self
	}

	/// Effective step id.
	pub fn step_id(&self) -> &str {
		self.id.as_deref().unwrap_or(&self.function)
	}
}

/// Result of one chain invocation.
///
/// Serializes as `{success: true, results, stateUpdates}` or
/// `{success: false, error, failedAt, failedStep, results}`.
#[derive(Clone, Debug, PartialEq)]
pub enum ChainResult {
	/// Every step succeeded.
	Completed {
		/// One entry per step.
		results: Vec<StepResult>,
		/// Outputs promoted via `storeResults`.
		state_updates: JsonMap,
	},
	/// A step failed and the chain stopped there.
	Failed {
		/// The failing step's error.
		error: String,
		/// Zero-based index of the failing step.
		failed_at: usize,
		/// Id of the failing step.
		failed_step: String,
		/// Entries for every attempted step, the failing one last.
		results: Vec<StepResult>,
	},
}
impl ChainResult {
	/// Returns `true` for [`ChainResult::Completed`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Completed { .. })
	}

	/// Entries for every attempted step.
	pub fn results(&self) -> &[StepResult] {
		match self {
			Self::Completed { results, .. } | Self::Failed { results, .. } => results,
		}
	}

	/// Promoted outputs of a completed chain.
	pub fn state_updates(&self) -> Option<&JsonMap> {
		match self {
			Self::Completed { state_updates, .. } => Some(state_updates),
			Self::Failed { .. } => None,
		}
	}

	/// Error, index, and id of the failing step.
	pub fn failure(&self) -> Option<(&str, usize, &str)> {
		match self {
			Self::Completed { .. } => None,
			Self::Failed { error, failed_at, failed_step, .. } =>
				Some((error.as_str(), *failed_at, failed_step.as_str())),
		}
	}
}
impl Serialize for ChainResult {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self {
			Self::Completed { results, state_updates } => {
				let mut state = serializer.serialize_struct("ChainResult", 3)?;

				state.serialize_field("success", &true)?;
				state.serialize_field("results", results)?;
				state.serialize_field("stateUpdates", state_updates)?;
				state.end()
			},
			Self::Failed { error, failed_at, failed_step, results } => {
				let mut state = serializer.serialize_struct("ChainResult", 5)?;

				state.serialize_field("success", &false)?;
				state.serialize_field("error", error)?;
				state.serialize_field("failedAt", failed_at)?;
				state.serialize_field("failedStep", failed_step)?;
				state.serialize_field("results", results)?;
				state.end()
			},
		}
	}
}

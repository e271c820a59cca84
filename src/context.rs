//! Execution context threaded through every step: caller scopes plus accumulated step outputs.

// self
use crate::_prelude::*;

/// Scopes visible to expressions while a function or chain runs.
///
/// `config` and `state` come from the caller and are never written by the engine.
/// `sub_fn_results` holds the outputs of completed chain steps keyed by step id; the chain
/// executor rebuilds it from scratch for every invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
	/// Caller configuration (endpoints, client ids, keys).
	#[serde(default)]
	pub config: JsonMap,
	/// Caller session state (tokens captured by earlier flows).
	#[serde(default)]
	pub state: JsonMap,
	/// Outputs of completed steps, keyed by step id.
	#[serde(default)]
	pub sub_fn_results: BTreeMap<String, Value>,
}
impl ExecutionContext {
	/// Creates a context from caller-supplied config and state.
	pub fn new(config: JsonMap, state: JsonMap) -> Self {
		Self { config, state, sub_fn_results: BTreeMap::new() }
	}

	/// Replaces the step-output scope.
	pub fn with_sub_fn_results(mut self, results: BTreeMap<String, Value>) -> Self {
		self.sub_fn_results = results;

		self
	}
}

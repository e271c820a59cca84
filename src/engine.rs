//! Step and chain execution over an explicit function registry.
//!
//! [`Engine::execute_step`] runs one function: lookup, template resolution, defaults,
//! validation, then the handler, with every failure (including a handler panic) normalized
//! into a [`StepOutcome`]. [`Engine::execute_chain`] runs steps strictly in order, publishing
//! each step's outputs under `subFn.<stepId>` for the steps after it, and stops at the first
//! failure while keeping the results gathered so far.

mod chain;
mod step;

pub use chain::*;
pub use step::*;

// std
use std::panic::AssertUnwindSafe;
// crates.io
use futures::FutureExt;
// self
use crate::{
	_prelude::*,
	context::ExecutionContext,
	error::{FunctionError, RegistryError},
	expr::{EnvSource, ProcessEnv, Resolver},
	function::{FunctionOutput, FunctionRegistry, SubFunction},
	input,
	obs::{self, EngineSpan, OperationKind, Outcome},
};

/// Runs sub functions and chains against a shared registry.
///
/// Cloning is cheap; every invocation builds its own scopes, so concurrent calls never share
/// mutable state.
#[derive(Clone)]
pub struct Engine {
	registry: Arc<FunctionRegistry>,
	env: Arc<dyn EnvSource>,
}
impl Engine {
	/// Creates an engine that reads `{{env.*}}` from the process environment.
	pub fn new(registry: impl Into<Arc<FunctionRegistry>>) -> Self {
		Self { registry: registry.into(), env: Arc::new(ProcessEnv::default()) }
	}

	/// Replaces the source backing the `env` namespace.
	pub fn with_env(mut self, env: impl 'static + EnvSource) -> Self {
		self.env = Arc::new(env);

		self
	}

	/// Registry the engine dispatches into.
	pub fn registry(&self) -> &FunctionRegistry {
		&self.registry
	}

	/// Runs one function and returns its raw result.
	///
	/// Errors are typed so callers can tell an unknown id ([`Error::Registry`]) from invalid
	/// input ([`Error::Validation`]) and handler failures ([`Error::Function`]).
	pub async fn run(
		&self,
		function_id: &str,
		raw_inputs: &JsonMap,
		context: &ExecutionContext,
	) -> Result<FunctionOutput> {
		let descriptor = self.registry.lookup(function_id)?;
		let mut inputs = {
			let resolver = Resolver::new(context, self.env.as_ref());

			input::resolve_inputs(raw_inputs, &resolver)
		};

		input::apply_defaults(descriptor, &mut inputs);

		let errors = input::validate_inputs(descriptor, &inputs);

		if !errors.is_empty() {
			return Err(Error::Validation { errors });
		}

		Ok(invoke(descriptor.handler(), inputs, context).await?)
	}

	/// Runs one function, normalizing every failure into [`StepOutcome::Failed`].
	pub async fn execute_step(
		&self,
		function_id: &str,
		raw_inputs: &JsonMap,
		context: &ExecutionContext,
	) -> StepOutcome {
		const KIND: OperationKind = OperationKind::Step;

		let span = EngineSpan::new(KIND, function_id);

		obs::record_outcome(KIND, Outcome::Attempt);

		let outcome =
			StepOutcome::from(span.instrument(self.run(function_id, raw_inputs, context)).await);

		if let Some(error) = outcome.error() {
			obs::step_failed(function_id, error);
		}

		obs::record_outcome(KIND, Outcome::from_success(outcome.is_success()));

		outcome
	}

	/// Checks that every step names a registered function, reporting the first that does not.
	pub fn check_chain(&self, steps: &[ChainStep]) -> Result<(), RegistryError> {
		match steps.iter().position(|step| !self.registry.contains(&step.function)) {
			Some(index) => Err(RegistryError::UnregisteredStep {
				index,
				id: steps[index].function.clone(),
				available: self.registry.ids(),
			}),
			None => Ok(()),
		}
	}

	/// Runs `steps` in order against the caller's config and state.
	///
	/// Any `subFnResults` already present on `context` are ignored; the chain starts from an
	/// empty step scope.
	pub async fn execute_chain(&self, steps: &[ChainStep], context: &ExecutionContext) -> ChainResult {
		const KIND: OperationKind = OperationKind::Chain;

		let span = EngineSpan::new(KIND, &steps.len().to_string());

		obs::record_outcome(KIND, Outcome::Attempt);

		let result = span.instrument(self.run_chain(steps, context)).await;

		obs::record_outcome(KIND, Outcome::from_success(result.is_success()));

		result
	}

	async fn run_chain(&self, steps: &[ChainStep], context: &ExecutionContext) -> ChainResult {
		let mut scope = ExecutionContext::new(context.config.clone(), context.state.clone());
		let mut state_updates = JsonMap::new();
		let mut results = Vec::with_capacity(steps.len());

		for (index, step) in steps.iter().enumerate() {
			let id = step.step_id().to_owned();
			let outcome = self.execute_step(&step.function, &step.inputs, &scope).await;

			if let Some(error) = outcome.error().map(str::to_owned) {
				results.push(StepResult { id: id.clone(), function: step.function.clone(), outcome });

				return ChainResult::Failed { error, failed_at: index, failed_step: id, results };
			}
			if let Some(outputs) = outcome.outputs() {
				for mapping in &step.store_results {
					if let Some(value) = outputs.get(&mapping.from) {
						state_updates.insert(mapping.to.clone(), value.clone());
					}
				}

				if scope.sub_fn_results.contains_key(&id) {
					obs::duplicate_step_id(&id, index);
				}

				scope.sub_fn_results.insert(id.clone(), Value::Object(outputs.clone()));
			}

			results.push(StepResult { id, function: step.function.clone(), outcome });
		}

		ChainResult::Completed { results, state_updates }
	}
}
impl Debug for Engine {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Engine").field("functions", &self.registry.ids()).finish()
	}
}

/// Calls the handler, converting a panic into [`FunctionError::Panicked`].
async fn invoke(
	handler: &dyn SubFunction,
	inputs: JsonMap,
	context: &ExecutionContext,
) -> Result<FunctionOutput, FunctionError> {
	let call = AssertUnwindSafe(async move { handler.execute(inputs, context).await });

	match call.catch_unwind().await {
		Ok(result) => result,
		Err(payload) => {
			let message = payload
				.downcast_ref::<&str>()
				.map(|s| (*s).to_owned())
				.or_else(|| payload.downcast_ref::<String>().cloned())
				.unwrap_or_else(|| "non-string panic payload".into());

			Err(FunctionError::Panicked { message })
		},
	}
}

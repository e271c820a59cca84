#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// self
use oauth2_lab::{
	JsonMap,
	context::ExecutionContext,
	error::FunctionError,
	function::{
		FunctionDescriptor, FunctionFuture, FunctionOutput, FunctionRegistry, InputSpec,
		OutputSpec, SubFunction, ValueType,
	},
	serde_json::{Value, json},
};

/// Returns `{out: inputs.v}` and counts its invocations.
#[derive(Clone, Default)]
pub struct Echo {
	pub calls: Arc<AtomicUsize>,
}
impl Echo {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl SubFunction for Echo {
	fn execute<'a>(&'a self, inputs: JsonMap, _context: &'a ExecutionContext) -> FunctionFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			let mut outputs = JsonMap::new();

			outputs.insert("out".into(), inputs.get("v").cloned().unwrap_or(Value::Null));

			Ok(FunctionOutput::new(outputs))
		})
	}
}

/// Always fails and counts its invocations.
#[derive(Clone, Default)]
pub struct Fails {
	pub calls: Arc<AtomicUsize>,
}
impl SubFunction for Fails {
	fn execute<'a>(&'a self, _inputs: JsonMap, _context: &'a ExecutionContext) -> FunctionFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async { Err(FunctionError::other("upstream rejected the request")) })
	}
}

/// Registry with `echo` (required `v`) and `fail` (optional `v`).
pub fn stub_registry(echo: Echo, fails: Fails) -> FunctionRegistry {
	let echo = FunctionDescriptor::builder("echo", echo)
		.category("test")
		.input("v", InputSpec::required(ValueType::Any, "Value to echo."))
		.output("out", OutputSpec::new(ValueType::Any, "The echoed value."))
		.build()
		.expect("Echo descriptor should build.");
	let fails = FunctionDescriptor::builder("fail", fails)
		.category("test")
		.input("v", InputSpec::optional(ValueType::Any, "Ignored."))
		.build()
		.expect("Fail descriptor should build.");

	FunctionRegistry::new()
		.with(echo)
		.and_then(|registry| registry.with(fails))
		.expect("Stub functions should register.")
}

/// Unwraps a JSON object literal.
pub fn object(value: Value) -> JsonMap {
	match value {
		Value::Object(map) => map,
		other => panic!("Expected a JSON object, got {other}."),
	}
}

/// Context with the given config and state objects.
pub fn context(config: Value, state: Value) -> ExecutionContext {
	ExecutionContext::new(object(config), object(state))
}

/// Empty context.
pub fn empty_context() -> ExecutionContext {
	context(json!({}), json!({}))
}

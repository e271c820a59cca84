//! Input resolution, defaulting, and schema validation for a single step.

// self
use crate::{
	_prelude::*,
	expr::Resolver,
	function::{FunctionDescriptor, ValueType},
};

/// Resolves every string leaf of `inputs`, recursing through objects and arrays.
///
/// Returns a new map; the caller's definition is left untouched so a chain can be replayed.
pub fn resolve_inputs(inputs: &JsonMap, resolver: &Resolver) -> JsonMap {
	inputs.iter().map(|(name, value)| (name.clone(), resolve_value(value, resolver))).collect()
}

fn resolve_value(value: &Value, resolver: &Resolver) -> Value {
	match value {
		Value::String(template) => resolver.resolve_template(template),
		Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, resolver)).collect()),
		Value::Object(map) => Value::Object(resolve_inputs(map, resolver)),
		other => other.clone(),
	}
}

/// Fills declared defaults for inputs that are absent or `null`.
pub fn apply_defaults(descriptor: &FunctionDescriptor, inputs: &mut JsonMap) {
	for (name, spec) in &descriptor.inputs {
		let Some(default) = spec.default.as_ref() else { continue };

		if inputs.get(name).is_none_or(Value::is_null) {
			inputs.insert(name.clone(), default.clone());
		}
	}
}

/// Checks resolved inputs against the descriptor schema.
///
/// Returns one message per problem; an empty list means the handler may run.
pub fn validate_inputs(descriptor: &FunctionDescriptor, inputs: &JsonMap) -> Vec<String> {
	let mut errors = Vec::new();

	for (name, spec) in &descriptor.inputs {
		let value = inputs.get(name).filter(|value| !is_blank(value));
		let Some(value) = value else {
			if spec.required {
				errors.push(format!("Missing required input: `{name}`"));
			}

			continue;
		};

		if spec.ty == ValueType::Jwk {
			if let Value::String(raw) = value {
				match serde_json::from_str::<Value>(raw) {
					Ok(Value::Object(_)) => {},
					Ok(_) => errors.push(format!("Invalid JWK for `{name}`: expected a JSON object")),
					Err(e) => errors.push(format!("Invalid JWK for `{name}`: {e}")),
				}
			}
		}
	}

	errors
}

fn is_blank(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.is_empty(),
		_ => false,
	}
}

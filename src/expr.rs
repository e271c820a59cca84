//! Template expressions: `{{namespace.path}}` lookups against the execution context.
//!
//! A template string may contain any number of `{{ ... }}` occurrences. Each body is parsed
//! into an [`Expression`] (one or more `||` alternatives, each a namespace path or a quoted
//! literal) and evaluated against an [`ExecutionContext`] plus an [`EnvSource`].
//!
//! - A string that is exactly one `{{ ... }}` resolves to the raw JSON value, keeping its type.
//! - Mixed text stringifies every resolved value before concatenation.
//! - Anything that does not resolve (missing path, unknown namespace) keeps its original
//!   `{{ ... }}` text so broken chains stay visible in the output.

mod env;
mod parse;

pub use env::*;
pub use parse::*;

// std
use std::sync::LazyLock;
// crates.io
use regex::{Captures, Regex};
// self
use crate::{_prelude::*, context::ExecutionContext, obs};

static TEMPLATE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("Template pattern must compile."));
static WHOLE_TEMPLATE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\{\{([^{}]+)\}\}$").expect("Template pattern must compile."));

/// Evaluates template strings against one execution context.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
	context: &'a ExecutionContext,
	env: &'a dyn EnvSource,
}
impl<'a> Resolver<'a> {
	/// Creates a resolver over `context`, reading `env.*` lookups from `env`.
	pub fn new(context: &'a ExecutionContext, env: &'a dyn EnvSource) -> Self {
		Self { context, env }
	}

	/// Resolves every `{{ ... }}` occurrence in `template`.
	pub fn resolve_template(&self, template: &str) -> Value {
		if let Some(caps) = WHOLE_TEMPLATE.captures(template) {
			return self.resolve_body(&caps[1]).unwrap_or_else(|| Value::String(template.to_owned()));
		}
		if !template.contains("{{") {
			return Value::String(template.to_owned());
		}

		let rendered = TEMPLATE.replace_all(template, |caps: &Captures| {
			match self.resolve_body(&caps[1]) {
				Some(value) => stringify(&value),
				None => caps[0].to_owned(),
			}
		});

		Value::String(rendered.into_owned())
	}

	/// Parses and evaluates one expression body; `None` means unresolved.
	pub fn resolve_body(&self, body: &str) -> Option<Value> {
		match body.parse::<Expression>() {
			Ok(expr) => self.evaluate(&expr),
			Err(e) => {
				obs::expression_rejected(body, &e);

				None
			},
		}
	}

	/// Evaluates a parsed expression; the first truthy alternative wins, otherwise the last
	/// alternative's value is returned.
	pub fn evaluate(&self, expr: &Expression) -> Option<Value> {
		let mut last = None;

		for operand in &expr.alternatives {
			let value = self.operand(operand);

			if is_truthy(value.as_ref()) {
				return value;
			}

			last = value;
		}

		last
	}

	fn operand(&self, operand: &Operand) -> Option<Value> {
		match operand {
			Operand::Literal(text) => Some(Value::String(text.clone())),
			Operand::Path(path) => self.lookup(path),
		}
	}

	fn lookup(&self, path: &PathRef) -> Option<Value> {
		let segments = path.segments.as_slice();

		match path.namespace {
			Namespace::Config => lookup_map(&self.context.config, segments),
			Namespace::State => lookup_map(&self.context.state, segments),
			Namespace::SubFn => match segments.split_first() {
				None => Some(Value::Object(
					self.context
						.sub_fn_results
						.iter()
						.map(|(id, outputs)| (id.clone(), outputs.clone()))
						.collect(),
				)),
				Some((step, rest)) =>
					walk(self.context.sub_fn_results.get(step)?, rest).cloned(),
			},
			Namespace::Env => self.env.var(&segments.join(".")).map(Value::String),
		}
	}
}

/// JavaScript-style truthiness used by `||` fallbacks.
pub fn is_truthy(value: Option<&Value>) -> bool {
	match value {
		None | Some(Value::Null) => false,
		Some(Value::Bool(flag)) => *flag,
		Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
		Some(Value::String(s)) => !s.is_empty(),
		Some(Value::Array(_) | Value::Object(_)) => true,
	}
}

/// Renders a resolved value for splicing into surrounding text.
///
/// Whole-number floats print without a fraction (`2.0` becomes `2`).
pub fn stringify(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Number(n) if !n.is_i64() && !n.is_u64() => match n.as_f64() {
			Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
			_ => n.to_string(),
		},
		other => other.to_string(),
	}
}

fn lookup_map(map: &JsonMap, segments: &[String]) -> Option<Value> {
	match segments.split_first() {
		None => Some(Value::Object(map.clone())),
		Some((head, rest)) => walk(map.get(head)?, rest).cloned(),
	}
}

fn walk<'v>(mut current: &'v Value, segments: &[String]) -> Option<&'v Value> {
	for segment in segments {
		current = match current {
			Value::Object(map) => map.get(segment)?,
			Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
			_ => return None,
		};
	}

	Some(current)
}

// self
use crate::_prelude::*;

/// Read-only source backing the `env` namespace.
pub trait EnvSource
where
	Self: Send + Sync,
{
	/// Returns the variable's value, or `None` when it is unset or hidden.
	fn var(&self, name: &str) -> Option<String>;
}

/// Process environment, optionally restricted to names sharing a prefix.
#[derive(Clone, Debug, Default)]
pub struct ProcessEnv {
	prefix: Option<String>,
}
impl ProcessEnv {
	/// Only exposes variables whose names start with `prefix`.
	pub fn with_prefix(prefix: impl Into<String>) -> Self {
		Self { prefix: Some(prefix.into()) }
	}
}
impl EnvSource for ProcessEnv {
	fn var(&self, name: &str) -> Option<String> {
		if let Some(prefix) = self.prefix.as_deref() {
			if !name.starts_with(prefix) {
				return None;
			}
		}

		std::env::var(name).ok()
	}
}

impl EnvSource for BTreeMap<String, String> {
	fn var(&self, name: &str) -> Option<String> {
		self.get(name).cloned()
	}
}

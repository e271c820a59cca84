//! Functions shipped with the lab.
//!
//! JWT helpers are always available; functions that talk to the network need the `reqwest`
//! feature and share one [`HttpTransport`](crate::http::HttpTransport).

pub mod jwt;
#[cfg(feature = "reqwest")] pub mod http_request;
#[cfg(feature = "reqwest")] pub mod oauth;

#[cfg(feature = "reqwest")] pub use http_request::HttpRequest;
pub use jwt::{JwtDecode, JwtSign};
#[cfg(feature = "reqwest")] pub use oauth::{ClientAuthMethod, JwtBearer, TokenExchange};

// self
#[cfg(feature = "reqwest")] use crate::http::HttpTransport;
use crate::{
	_prelude::*,
	error::RegistryError,
	function::{FunctionDescriptor, FunctionRegistry},
};

/// Descriptors for the offline JWT helpers.
pub fn jwt_functions() -> Result<Vec<FunctionDescriptor>, RegistryError> {
	Ok(vec![jwt::decode_descriptor()?, jwt::sign_descriptor()?])
}

/// Descriptors for the functions that perform outbound requests.
#[cfg(feature = "reqwest")]
pub fn network_functions(
	transport: Arc<HttpTransport>,
) -> Result<Vec<FunctionDescriptor>, RegistryError> {
	Ok(vec![
		http_request::descriptor(transport.clone())?,
		oauth::token_exchange_descriptor(transport.clone())?,
		oauth::jwt_bearer_descriptor(transport)?,
	])
}

/// Registry holding every built-in function.
#[cfg(feature = "reqwest")]
pub fn registry(transport: Arc<HttpTransport>) -> Result<FunctionRegistry, RegistryError> {
	let mut registry = FunctionRegistry::new();

	for descriptor in jwt_functions()?.into_iter().chain(network_functions(transport)?) {
		registry.register(descriptor)?;
	}

	Ok(registry)
}

/// Registry holding the offline built-in functions.
#[cfg(not(feature = "reqwest"))]
pub fn registry() -> Result<FunctionRegistry, RegistryError> {
	let mut registry = FunctionRegistry::new();

	for descriptor in jwt_functions()? {
		registry.register(descriptor)?;
	}

	Ok(registry)
}

/// Copies `key` out of a response object, `null` when absent.
#[cfg(feature = "reqwest")]
fn field_or_null(map: &JsonMap, key: &str) -> Value {
	map.get(key).cloned().unwrap_or(Value::Null)
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	#[test]
	fn registry_exposes_all_builtins_by_category() {
		let transport = Arc::new(HttpTransport::new().expect("Default transport should build."));
		let registry = registry(transport).expect("Built-ins should register.");

		assert_eq!(
			registry.ids(),
			vec!["http_request", "jwt_bearer", "jwt_decode", "jwt_sign", "token_exchange"]
		);
		assert_eq!(
			registry
				.categories()
				.into_iter()
				.map(|c| (c.name, c.count))
				.collect::<Vec<_>>(),
			vec![("http".to_owned(), 1), ("jwt".to_owned(), 2), ("oauth".to_owned(), 2)]
		);
	}
}

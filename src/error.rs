//! Lab-level error types shared across the registry, functions, transport, and server.

// self
use crate::{_prelude::*, function::DescriptorError};

/// Lab-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Function registration or lookup failure.
	#[error(transparent)]
	Registry(#[from] RegistryError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A registered function reported a failure.
	#[error(transparent)]
	Function(#[from] FunctionError),
	/// Resolved inputs do not satisfy the function schema.
	#[error("Validation failed: {}", errors.join("; "))]
	Validation {
		/// One message per offending input.
		errors: Vec<String>,
	},
}

/// Failures raised while registering or addressing functions.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RegistryError {
	/// The requested function id is not registered.
	#[error("Unknown sub function: {id}. Available: {}", available.join(", "))]
	UnknownFunction {
		/// Requested identifier.
		id: String,
		/// Every registered identifier, sorted.
		available: Vec<String>,
	},
	/// A chain references a function id that is not registered.
	#[error("Unknown sub function at step {index}: {id}. Available: {}", available.join(", "))]
	UnregisteredStep {
		/// Zero-based index of the first offending step.
		index: usize,
		/// Requested identifier.
		id: String,
		/// Every registered identifier, sorted.
		available: Vec<String>,
	},
	/// Two descriptors share the same identifier.
	#[error("Sub function `{id}` is already registered.")]
	DuplicateFunction {
		/// Conflicting identifier.
		id: String,
	},
	/// A descriptor was rejected while being built.
	#[error(transparent)]
	Descriptor(#[from] DescriptorError),
}

/// Configuration failures raised while building transports or serving the API.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// The API listener could not be bound.
	#[error("Unable to bind the API listener on {addr}.")]
	Bind {
		/// Address that failed to bind.
		addr: String,
		/// Underlying I/O failure.
		#[source]
		source: std::io::Error,
	},
	/// The API server stopped with an I/O failure.
	#[error("API server terminated unexpectedly.")]
	Serve(#[source] std::io::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures reported by sub-function handlers.
///
/// The step executor turns every variant into a failed step using its display text, so
/// messages are written for the person reading the lab output.
#[derive(Debug, ThisError)]
pub enum FunctionError {
	/// Inputs could not be decoded into the handler's typed request.
	#[error("Invalid input `{path}`: {message}")]
	InvalidInput {
		/// Dotted path of the offending input.
		path: String,
		/// Decoder message.
		message: String,
	},
	/// A JWK input is structurally valid JSON but unusable.
	#[error("Invalid JWK: {reason}.")]
	InvalidJwk {
		/// Why the key was rejected.
		reason: String,
	},
	/// A compact JWT could not be parsed.
	#[error("Invalid JWT: {reason}.")]
	InvalidToken {
		/// Why the token was rejected.
		reason: String,
	},
	/// Signing the JWT failed.
	#[error("Signing failed: {reason}.")]
	Signing {
		/// Why signing failed.
		reason: String,
	},
	/// The token endpoint answered with a non-success status.
	#[error("Token endpoint returned HTTP {status}: {}", describe_oauth_error(error.as_deref(), description.as_deref()))]
	TokenEndpoint {
		/// HTTP status code.
		status: u16,
		/// OAuth `error` code, when the body carried one.
		error: Option<String>,
		/// OAuth `error_description`, or a body preview.
		description: Option<String>,
	},
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The handler panicked while executing.
	#[error("Sub function panicked: {message}")]
	Panicked {
		/// Panic payload rendered as text.
		message: String,
	},
	/// Free-form handler failure.
	#[error("{0}")]
	Other(String),
}
impl FunctionError {
	/// Builds a free-form failure from any displayable message.
	pub fn other(message: impl Into<String>) -> Self {
		Self::Other(message.into())
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for FunctionError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::InvalidInput { path: e.path().to_string(), message: e.into_inner().to_string() }
	}
}

/// Transport-level failures (network, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error while calling {url}: {source}")]
	Network {
		/// Target URL.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request did not complete within its timeout.
	#[error("Request to {url} timed out after {timeout_ms} ms.")]
	Timeout {
		/// Target URL.
		url: String,
		/// Applied timeout.
		timeout_ms: u128,
	},
	/// The request could not be built (bad URL, method, or header).
	#[error("Invalid request: {reason}.")]
	InvalidRequest {
		/// Why the request was rejected before dispatch.
		reason: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		url: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}

fn describe_oauth_error(error: Option<&str>, description: Option<&str>) -> String {
	match (error, description) {
		(Some(error), Some(description)) => format!("{error} ({description})"),
		(Some(error), None) => error.to_owned(),
		(None, Some(description)) => description.to_owned(),
		(None, None) => "no error details".into(),
	}
}

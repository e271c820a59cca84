// std
use std::time::Duration as StdDuration;
// crates.io
use clap::{ArgAction, Parser};
// self
use crate::{error::ConfigError, expr::ProcessEnv, http::HttpTransport};

/// Command-line and environment configuration for the lab API.
#[derive(Clone, Debug, PartialEq, Eq, Parser)]
#[command(name = "oauth2-lab", version, about = "OAuth 2.0 protocol lab API.")]
pub struct ServerConfig {
	/// Socket address the API listens on.
	#[arg(long, env = "OAUTH2_LAB_BIND", default_value = "127.0.0.1:3000")]
	pub bind: String,
	/// Default timeout for outbound HTTP calls, in seconds.
	#[arg(long = "http-timeout", env = "OAUTH2_LAB_HTTP_TIMEOUT", default_value_t = 30)]
	pub http_timeout_secs: u64,
	/// Only expose environment variables with this prefix to `{{env.*}}`.
	#[arg(long, env = "OAUTH2_LAB_ENV_PREFIX")]
	pub env_prefix: Option<String>,
	/// Answer cross-origin requests from any origin.
	#[arg(long, env = "OAUTH2_LAB_CORS", default_value_t = true, action = ArgAction::Set)]
	pub cors: bool,
}
impl ServerConfig {
	/// Builds the outbound transport shared by the network functions.
	pub fn transport(&self) -> Result<HttpTransport, ConfigError> {
		HttpTransport::builder().timeout(StdDuration::from_secs(self.http_timeout_secs)).build()
	}

	/// Environment source honoring [`env_prefix`](Self::env_prefix).
	pub fn env_source(&self) -> ProcessEnv {
		match self.env_prefix.as_deref() {
			Some(prefix) if !prefix.is_empty() => ProcessEnv::with_prefix(prefix),
			_ => ProcessEnv::default(),
		}
	}
}
impl Default for ServerConfig {
	fn default() -> Self {
		Self { bind: "127.0.0.1:3000".into(), http_timeout_secs: 30, env_prefix: None, cors: true }
	}
}

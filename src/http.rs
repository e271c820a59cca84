//! Outbound HTTP for the built-in functions.
//!
//! [`HttpTransport`] wraps a reqwest client so shared behavior lives in one place: redirects
//! are never followed (token endpoints answer directly), every request carries a timeout, and
//! failures map into [`TransportError`]. Each [`OutboundRequest`] can render itself as a
//! `curl` command so the lab can show exactly what was sent.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::{Method, redirect::Policy};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Reqwest-backed transport shared by every built-in function.
#[derive(Clone, Debug)]
pub struct HttpTransport {
	client: ReqwestClient,
	default_timeout: StdDuration,
}
impl HttpTransport {
	/// Builds a transport with the default 30 second timeout.
	pub fn new() -> Result<Self, ConfigError> {
		Self::builder().build()
	}

	/// Starts a builder.
	pub fn builder() -> HttpTransportBuilder {
		HttpTransportBuilder::default()
	}

	/// Wraps an existing client. Configure it to disable redirect following.
	pub fn with_client(client: ReqwestClient, default_timeout: StdDuration) -> Self {
		Self { client, default_timeout }
	}

	/// Timeout applied when a request does not set its own.
	pub fn default_timeout(&self) -> StdDuration {
		self.default_timeout
	}

	/// Sends `request` and buffers the response body.
	pub async fn send(&self, request: &OutboundRequest) -> Result<InboundResponse, TransportError> {
		let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes()).map_err(
			|_| TransportError::InvalidRequest {
				reason: format!("unsupported HTTP method `{}`", request.method),
			},
		)?;
		let url = Url::parse(&request.url).map_err(|e| TransportError::InvalidRequest {
			reason: format!("invalid URL `{}`: {e}", request.url),
		})?;
		let timeout = request.timeout.unwrap_or(self.default_timeout);
		let mut builder = self.client.request(method, url).timeout(timeout);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if let Some(body) = request.body.as_ref() {
			builder = builder.body(body.clone());
		}

		let response =
			builder.send().await.map_err(|e| map_reqwest_error(&request.url, timeout, e))?;
		let status = response.status().as_u16();
		let headers = response
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
			})
			.collect();
		let body =
			response.text().await.map_err(|e| map_reqwest_error(&request.url, timeout, e))?;

		Ok(InboundResponse { status, headers, body })
	}
}

/// Builder for [`HttpTransport`].
#[derive(Debug, Default)]
pub struct HttpTransportBuilder {
	timeout: Option<StdDuration>,
	user_agent: Option<String>,
}
impl HttpTransportBuilder {
	/// Overrides the default request timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Overrides the `User-Agent` header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Builds the transport.
	pub fn build(self) -> Result<HttpTransport, ConfigError> {
		let user_agent = self
			.user_agent
			.unwrap_or_else(|| concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into());
		let client = ReqwestClient::builder().redirect(Policy::none()).user_agent(user_agent).build()?;

		Ok(HttpTransport::with_client(client, self.timeout.unwrap_or(DEFAULT_TIMEOUT)))
	}
}

/// Request description handed to [`HttpTransport::send`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: String,
	/// Absolute URL.
	pub url: String,
	/// Headers in insertion order.
	pub headers: Vec<(String, String)>,
	/// Raw request body.
	pub body: Option<String>,
	/// Per-request timeout; falls back to the transport default.
	pub timeout: Option<StdDuration>,
}
impl OutboundRequest {
	/// Creates a request without headers or body.
	pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
		Self { method: method.into(), url: url.into(), headers: Vec::new(), body: None, timeout: None }
	}

	/// Appends a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sets the body.
	pub fn body(mut self, body: impl Into<String>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Sets the timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Returns `true` when a header with `name` is present (case-insensitive).
	pub fn has_header(&self, name: &str) -> bool {
		self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
	}

	/// Renders the request as a copy-pasteable `curl` command.
	pub fn to_curl(&self) -> String {
		let mut parts = vec![format!(
			"curl -X {} {}",
			self.method.to_ascii_uppercase(),
			shell_quote(&self.url)
		)];

		for (name, value) in &self.headers {
			parts.push(format!("-H {}", shell_quote(&format!("{name}: {value}"))));
		}
		if let Some(body) = self.body.as_ref() {
			parts.push(format!("--data-raw {}", shell_quote(body)));
		}

		parts.join(" \\\n  ")
	}
}

/// Buffered response returned by [`HttpTransport::send`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with UTF-8 values, lower-cased names.
	pub headers: BTreeMap<String, String>,
	/// Response body as text.
	pub body: String,
}
impl InboundResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Parses the body as JSON.
	pub fn json(&self) -> Option<Value> {
		serde_json::from_str(&self.body).ok()
	}

	/// Parsed JSON body, or the raw text when it is not JSON.
	pub fn body_value(&self) -> Value {
		self.json().unwrap_or_else(|| Value::String(self.body.clone()))
	}

	/// First `max` characters of the body, for error messages.
	pub fn body_preview(&self, max: usize) -> String {
		let mut preview = self.body.chars().take(max).collect::<String>();

		if self.body.chars().count() > max {
			preview.push('…');
		}

		preview
	}
}

fn map_reqwest_error(url: &str, timeout: StdDuration, e: ReqwestError) -> TransportError {
	if e.is_timeout() {
		TransportError::Timeout { url: url.to_owned(), timeout_ms: timeout.as_millis() }
	} else if e.is_builder() {
		TransportError::InvalidRequest { reason: e.to_string() }
	} else {
		TransportError::network(url, e)
	}
}

fn shell_quote(raw: &str) -> String {
	format!("'{}'", raw.replace('\'', r"'\''"))
}

//! Generic HTTP call, for discovery documents, JWKS, userinfo, and protected APIs.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	context::ExecutionContext,
	error::{FunctionError, RegistryError},
	function::{
		FunctionDescriptor, FunctionFuture, FunctionOutput, InputSpec, OutputSpec, SubFunction,
		ValueType, decode_inputs,
	},
	http::{HttpTransport, OutboundRequest},
};

/// Sends one HTTP request and reports status, headers, and body.
#[derive(Clone, Debug)]
pub struct HttpRequest {
	transport: Arc<HttpTransport>,
}
impl HttpRequest {
	/// Creates the function on top of a shared transport.
	pub fn new(transport: Arc<HttpTransport>) -> Self {
		Self { transport }
	}
}
impl SubFunction for HttpRequest {
	fn execute<'a>(&'a self, inputs: JsonMap, _context: &'a ExecutionContext) -> FunctionFuture<'a> {
		Box::pin(async move {
			let request = decode_inputs::<Request>(inputs)?.into_outbound()?;
			let response = self.transport.send(&request).await?;
			let mut outputs = JsonMap::new();

			outputs.insert("status".into(), response.status.into());
			outputs.insert("ok".into(), response.is_success().into());
			outputs.insert(
				"headers".into(),
				Value::Object(
					response.headers.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect(),
				),
			);
			outputs.insert("body".into(), response.body_value());

			Ok(FunctionOutput::new(outputs).with_curl(request.to_curl()))
		})
	}
}

#[derive(Deserialize)]
struct Request {
	url: String,
	#[serde(default)]
	method: Option<String>,
	#[serde(default)]
	headers: Option<BTreeMap<String, Value>>,
	#[serde(default)]
	body: Option<Value>,
	#[serde(default)]
	timeout_ms: Option<u64>,
}
impl Request {
	fn into_outbound(self) -> Result<OutboundRequest, FunctionError> {
		let mut request = OutboundRequest::new(self.method.as_deref().unwrap_or("GET"), self.url);

		for (name, value) in self.headers.unwrap_or_default() {
			let value = match value {
				Value::String(s) => s,
				Value::Null => continue,
				other => other.to_string(),
			};

			request = request.header(name, value);
		}

		match self.body {
			None | Some(Value::Null) => {},
			Some(Value::String(raw)) => request = request.body(raw),
			Some(json) => {
				let raw = serde_json::to_string(&json).map_err(|e| FunctionError::InvalidInput {
					path: "body".into(),
					message: e.to_string(),
				})?;

				if !request.has_header("content-type") {
					request = request.header("Content-Type", "application/json");
				}

				request = request.body(raw);
			},
		}

		if let Some(ms) = self.timeout_ms {
			request = request.timeout(StdDuration::from_millis(ms));
		}

		Ok(request)
	}
}

/// Descriptor for [`HttpRequest`].
pub fn descriptor(transport: Arc<HttpTransport>) -> Result<FunctionDescriptor, RegistryError> {
	Ok(FunctionDescriptor::builder("http_request", HttpRequest::new(transport))
		.name("HTTP request")
		.description("Sends an arbitrary HTTP request and returns the parsed response.")
		.category("http")
		.input("url", InputSpec::required(ValueType::String, "Absolute URL."))
		.input("method", InputSpec::optional(ValueType::String, "HTTP method.").with_default("GET"))
		.input("headers", InputSpec::optional(ValueType::Object, "Request headers."))
		.input(
			"body",
			InputSpec::optional(ValueType::Any, "Raw string body, or JSON sent as application/json."),
		)
		.input("timeout_ms", InputSpec::optional(ValueType::Number, "Per-request timeout."))
		.output("status", OutputSpec::new(ValueType::Number, "HTTP status code."))
		.output("ok", OutputSpec::new(ValueType::Boolean, "Whether the status is 2xx."))
		.output("headers", OutputSpec::new(ValueType::Object, "Response headers."))
		.output("body", OutputSpec::new(ValueType::Any, "JSON body, or text when not JSON."))
		.build()?)
}

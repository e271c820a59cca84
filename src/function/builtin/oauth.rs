//! Token endpoint grants: RFC 8693 token exchange and the RFC 7523 JWT bearer grant.
//!
//! Both functions post a form-encoded request, authenticate the client the way the caller
//! asked, and surface OAuth error bodies as [`FunctionError::TokenEndpoint`].

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	context::ExecutionContext,
	error::{FunctionError, RegistryError},
	function::{
		FunctionDescriptor, FunctionDescriptorBuilder, FunctionFuture, FunctionOutput, InputSpec,
		OutputSpec, SubFunction, ValueType, builtin::field_or_null, decode_inputs,
	},
	http::{HttpTransport, OutboundRequest},
};

/// RFC 8693 grant type.
pub const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
/// RFC 7523 grant type.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Default `subject_token_type` for token exchange.
pub const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";

const ERROR_PREVIEW_CHARS: usize = 200;

/// Client authentication applied to token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// Public client; only `client_id` is sent.
	None,
}
impl ClientAuthMethod {
	/// Wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			ClientAuthMethod::ClientSecretBasic => "client_secret_basic",
			ClientAuthMethod::ClientSecretPost => "client_secret_post",
			ClientAuthMethod::None => "none",
		}
	}
}

/// Exchanges a subject token (and optional actor token) for a new token.
#[derive(Clone, Debug)]
pub struct TokenExchange {
	transport: Arc<HttpTransport>,
}
impl TokenExchange {
	/// Creates the function on top of a shared transport.
	pub fn new(transport: Arc<HttpTransport>) -> Self {
		Self { transport }
	}
}
impl SubFunction for TokenExchange {
	fn execute<'a>(&'a self, inputs: JsonMap, _context: &'a ExecutionContext) -> FunctionFuture<'a> {
		Box::pin(async move {
			let request = decode_inputs::<TokenExchangeRequest>(inputs)?;

			if request.actor_token.as_deref().is_some_and(|t| !t.is_empty())
				&& request.actor_token_type.as_deref().is_none_or(str::is_empty)
			{
				return Err(FunctionError::InvalidInput {
					path: "actor_token_type".into(),
					message: "required when `actor_token` is set".into(),
				});
			}

			let mut form = TokenForm::new(TOKEN_EXCHANGE_GRANT)
				.param("subject_token", request.subject_token)
				.param(
					"subject_token_type",
					request.subject_token_type.unwrap_or_else(|| ACCESS_TOKEN_TYPE.into()),
				)
				.optional("actor_token", request.actor_token)
				.optional("actor_token_type", request.actor_token_type)
				.optional("requested_token_type", request.requested_token_type);

			for audience in request.audience.map(OneOrMany::into_vec).unwrap_or_default() {
				form = form.param("audience", audience);
			}
			for resource in request.resource.map(OneOrMany::into_vec).unwrap_or_default() {
				form = form.param("resource", resource);
			}

			let form = form.optional("scope", request.scope);
			let outbound = form.into_request(&request.token_endpoint, &request.client);
			let response = call_token_endpoint(&self.transport, &outbound).await?;

			Ok(FunctionOutput::new(token_outputs(
				response,
				&["access_token", "issued_token_type", "token_type", "expires_in", "scope", "refresh_token"],
			)?)
			.with_curl(outbound.to_curl()))
		})
	}
}

/// Trades a signed JWT assertion for an access token.
#[derive(Clone, Debug)]
pub struct JwtBearer {
	transport: Arc<HttpTransport>,
}
impl JwtBearer {
	/// Creates the function on top of a shared transport.
	pub fn new(transport: Arc<HttpTransport>) -> Self {
		Self { transport }
	}
}
impl SubFunction for JwtBearer {
	fn execute<'a>(&'a self, inputs: JsonMap, _context: &'a ExecutionContext) -> FunctionFuture<'a> {
		Box::pin(async move {
			let request = decode_inputs::<JwtBearerRequest>(inputs)?;
			let outbound = TokenForm::new(JWT_BEARER_GRANT)
				.param("assertion", request.assertion)
				.optional("scope", request.scope)
				.into_request(&request.token_endpoint, &request.client);
			let response = call_token_endpoint(&self.transport, &outbound).await?;

			Ok(FunctionOutput::new(token_outputs(
				response,
				&["access_token", "token_type", "expires_in", "scope", "refresh_token"],
			)?)
			.with_curl(outbound.to_curl()))
		})
	}
}

#[derive(Deserialize)]
struct TokenExchangeRequest {
	token_endpoint: String,
	subject_token: String,
	#[serde(default)]
	subject_token_type: Option<String>,
	#[serde(default)]
	actor_token: Option<String>,
	#[serde(default)]
	actor_token_type: Option<String>,
	#[serde(default)]
	requested_token_type: Option<String>,
	#[serde(default)]
	audience: Option<OneOrMany>,
	#[serde(default)]
	resource: Option<OneOrMany>,
	#[serde(default)]
	scope: Option<String>,
	#[serde(flatten)]
	client: ClientCredentials,
}

#[derive(Deserialize)]
struct JwtBearerRequest {
	token_endpoint: String,
	assertion: String,
	#[serde(default)]
	scope: Option<String>,
	#[serde(flatten)]
	client: ClientCredentials,
}

#[derive(Debug, Default, Deserialize)]
struct ClientCredentials {
	#[serde(default)]
	client_id: Option<String>,
	#[serde(default)]
	client_secret: Option<String>,
	#[serde(default)]
	client_auth: Option<ClientAuthMethod>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
	One(String),
	Many(Vec<String>),
}
impl OneOrMany {
	fn into_vec(self) -> Vec<String> {
		match self {
			OneOrMany::One(value) => vec![value],
			OneOrMany::Many(values) => values,
		}
	}
}

/// Form parameters for one token endpoint call, in send order.
#[derive(Debug)]
struct TokenForm {
	params: Vec<(&'static str, String)>,
}
impl TokenForm {
	fn new(grant_type: &str) -> Self {
		Self { params: vec![("grant_type", grant_type.to_owned())] }
	}

	fn param(mut self, name: &'static str, value: String) -> Self {
		self.params.push((name, value));

		self
	}

	fn optional(self, name: &'static str, value: Option<String>) -> Self {
		match value {
			Some(value) if !value.is_empty() => self.param(name, value),
			_ => self,
		}
	}

	fn into_request(self, endpoint: &str, client: &ClientCredentials) -> OutboundRequest {
		let mut params = self.params;
		let mut request = OutboundRequest::new("POST", endpoint)
			.header("Content-Type", "application/x-www-form-urlencoded")
			.header("Accept", "application/json");
		let client_id = client.client_id.as_deref().filter(|id| !id.is_empty());
		let client_secret = client.client_secret.as_deref().filter(|secret| !secret.is_empty());

		match (client.client_auth.unwrap_or_default(), client_id, client_secret) {
			(_, None, _) => {},
			(ClientAuthMethod::ClientSecretBasic, Some(id), Some(secret)) => {
				request = request.header("Authorization", basic_authorization(id, secret));
			},
			(ClientAuthMethod::ClientSecretPost, Some(id), Some(secret)) => {
				params.push(("client_id", id.to_owned()));
				params.push(("client_secret", secret.to_owned()));
			},
			(_, Some(id), _) => params.push(("client_id", id.to_owned())),
		}

		let body = form_urlencoded::Serializer::new(String::new())
			.extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
			.finish();

		request.body(body)
	}
}

/// `Authorization: Basic` value with both parts form-encoded first.
fn basic_authorization(client_id: &str, client_secret: &str) -> String {
	let encode = |raw: &str| form_urlencoded::byte_serialize(raw.as_bytes()).collect::<String>();

	format!("Basic {}", STANDARD.encode(format!("{}:{}", encode(client_id), encode(client_secret))))
}

async fn call_token_endpoint(
	transport: &HttpTransport,
	request: &OutboundRequest,
) -> Result<JsonMap, FunctionError> {
	let response = transport.send(request).await?;
	let body = response.json();

	if !response.is_success() {
		let field = |key: &str| {
			body.as_ref().and_then(|b| b.get(key)).and_then(Value::as_str).map(str::to_owned)
		};
		let description = field("error_description").or_else(|| {
			(body.is_none() && !response.body.is_empty())
				.then(|| response.body_preview(ERROR_PREVIEW_CHARS))
		});

		return Err(FunctionError::TokenEndpoint {
			status: response.status,
			error: field("error"),
			description,
		});
	}

	match body {
		Some(Value::Object(map)) => Ok(map),
		_ => Err(FunctionError::other(format!(
			"Token endpoint returned a non-JSON body: {}",
			response.body_preview(ERROR_PREVIEW_CHARS)
		))),
	}
}

fn token_outputs(response: JsonMap, fields: &[&str]) -> Result<JsonMap, FunctionError> {
	if !response.get("access_token").is_some_and(Value::is_string) {
		return Err(FunctionError::other("Token endpoint response is missing `access_token`."));
	}

	let mut outputs =
		fields.iter().map(|f| ((*f).to_owned(), field_or_null(&response, f))).collect::<JsonMap>();

	outputs.insert("response".into(), Value::Object(response));

	Ok(outputs)
}

fn client_inputs(builder: FunctionDescriptorBuilder) -> FunctionDescriptorBuilder {
	builder
		.input("client_id", InputSpec::optional(ValueType::String, "OAuth client identifier."))
		.input("client_secret", InputSpec::optional(ValueType::String, "OAuth client secret."))
		.input(
			"client_auth",
			InputSpec::optional(
				ValueType::String,
				"client_secret_basic, client_secret_post, or none.",
			)
			.with_default(ClientAuthMethod::default().as_str()),
		)
}

fn token_output_specs(builder: FunctionDescriptorBuilder) -> FunctionDescriptorBuilder {
	builder
		.output("access_token", OutputSpec::new(ValueType::String, "Issued token."))
		.output("token_type", OutputSpec::new(ValueType::String, "Token type, usually Bearer."))
		.output("expires_in", OutputSpec::new(ValueType::Number, "Lifetime in seconds."))
		.output("scope", OutputSpec::new(ValueType::String, "Granted scope."))
		.output("refresh_token", OutputSpec::new(ValueType::String, "Refresh token, if issued."))
		.output("response", OutputSpec::new(ValueType::Object, "Full token response."))
}

/// Descriptor for [`TokenExchange`].
pub fn token_exchange_descriptor(
	transport: Arc<HttpTransport>,
) -> Result<FunctionDescriptor, RegistryError> {
	let builder = FunctionDescriptor::builder("token_exchange", TokenExchange::new(transport))
		.name("Token exchange")
		.description("RFC 8693 token exchange against a token endpoint.")
		.category("oauth")
		.input("token_endpoint", InputSpec::required(ValueType::String, "Token endpoint URL."))
		.input("subject_token", InputSpec::required(ValueType::String, "Token being exchanged."))
		.input(
			"subject_token_type",
			InputSpec::optional(ValueType::String, "Type URN of the subject token.")
				.with_default(ACCESS_TOKEN_TYPE),
		)
		.input("actor_token", InputSpec::optional(ValueType::String, "Token of the acting party."))
		.input(
			"actor_token_type",
			InputSpec::optional(ValueType::String, "Type URN of the actor token."),
		)
		.input(
			"requested_token_type",
			InputSpec::optional(ValueType::String, "Type URN of the token wanted back."),
		)
		.input("audience", InputSpec::optional(ValueType::Any, "Target audience or audiences."))
		.input("resource", InputSpec::optional(ValueType::Any, "Target resource URI or URIs."))
		.input("scope", InputSpec::optional(ValueType::String, "Space-separated scope."))
		.output(
			"issued_token_type",
			OutputSpec::new(ValueType::String, "Type URN of the issued token."),
		);

	Ok(token_output_specs(client_inputs(builder)).build()?)
}

/// Descriptor for [`JwtBearer`].
pub fn jwt_bearer_descriptor(
	transport: Arc<HttpTransport>,
) -> Result<FunctionDescriptor, RegistryError> {
	let builder = FunctionDescriptor::builder("jwt_bearer", JwtBearer::new(transport))
		.name("JWT bearer grant")
		.description("RFC 7523 JWT bearer grant against a token endpoint.")
		.category("oauth")
		.input("token_endpoint", InputSpec::required(ValueType::String, "Token endpoint URL."))
		.input("assertion", InputSpec::required(ValueType::String, "Signed JWT assertion."))
		.input("scope", InputSpec::optional(ValueType::String, "Space-separated scope."));

	Ok(token_output_specs(client_inputs(builder)).build()?)
}

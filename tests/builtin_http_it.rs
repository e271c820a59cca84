#![cfg(feature = "reqwest")]

mod common;

// std
use std::sync::Arc;
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use httpmock::prelude::*;
// self
use common::*;
use oauth2_lab::{
	engine::{ChainStep, Engine},
	function::builtin,
	http::HttpTransport,
	serde_json::{Value, json},
};

const CLIENT_ID: &str = "lab-client";
const CLIENT_SECRET: &str = "lab-secret";

fn engine() -> Engine {
	let transport = HttpTransport::builder()
		.timeout(std::time::Duration::from_secs(5))
		.build()
		.expect("Transport should build.");

	Engine::new(builtin::registry(Arc::new(transport)).expect("Built-ins should register."))
}

fn basic() -> String {
	format!("Basic {}", STANDARD.encode(format!("{CLIENT_ID}:{CLIENT_SECRET}")))
}

#[tokio::test]
async fn token_exchange_posts_rfc8693_form_with_basic_auth() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").header("authorization", basic());
			then.status(200).header("content-type", "application/json").body(
				json!({
					"access_token": "delegated",
					"issued_token_type": "urn:ietf:params:oauth:token-type:access_token",
					"token_type": "Bearer",
					"expires_in": 600
				})
				.to_string(),
			);
		})
		.await;
	let ctx = context(
		json!({
			"tokenEndpoint": server.url("/token"),
			"clientId": CLIENT_ID,
			"clientSecret": CLIENT_SECRET
		}),
		json!({ "accessToken": "subject-at" }),
	);
	let outcome = engine()
		.execute_step(
			"token_exchange",
			&object(json!({
				"token_endpoint": "{{config.tokenEndpoint}}",
				"subject_token": "{{state.accessToken}}",
				"audience": ["api-a", "api-b"],
				"scope": "read",
				"client_id": "{{config.clientId}}",
				"client_secret": "{{config.clientSecret}}"
			})),
			&ctx,
		)
		.await;

	mock.assert_async().await;

	let outputs = outcome.outputs().expect("Token exchange should succeed.");
	let curl = outcome.curl().expect("Token exchange should render curl.");

	assert_eq!(outputs["access_token"], "delegated");
	assert_eq!(outputs["expires_in"], 600);
	assert_eq!(outputs["refresh_token"], Value::Null);
	assert_eq!(outputs["response"]["token_type"], "Bearer");
	assert!(curl.starts_with(&format!("curl -X POST '{}'", server.url("/token"))));
	assert!(curl.contains(
		"grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Atoken-exchange&subject_token=subject-at"
	));
	assert!(
		curl.contains("subject_token_type=urn%3Aietf%3Aparams%3Aoauth%3Atoken-type%3Aaccess_token")
	);
	assert!(curl.contains("audience=api-a&audience=api-b&scope=read"));
	assert!(!curl.contains("client_secret="));
}

#[tokio::test]
async fn token_endpoint_errors_fail_the_step() {
	let server = MockServer::start_async().await;
	let _oauth_error = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_grant\",\"error_description\":\"assertion expired\"}",
			);
		})
		.await;
	let _gateway = server
		.mock_async(|when, then| {
			when.method(POST).path("/broken");
			then.status(502).body("upstream unavailable");
		})
		.await;
	let engine = engine();
	let ctx = empty_context();
	let oauth = engine
		.execute_step(
			"jwt_bearer",
			&object(json!({ "token_endpoint": server.url("/token"), "assertion": "a.b.c" })),
			&ctx,
		)
		.await;
	let gateway = engine
		.execute_step(
			"jwt_bearer",
			&object(json!({ "token_endpoint": server.url("/broken"), "assertion": "a.b.c" })),
			&ctx,
		)
		.await;

	assert_eq!(
		oauth.error(),
		Some("Token endpoint returned HTTP 400: invalid_grant (assertion expired)")
	);
	assert_eq!(gateway.error(), Some("Token endpoint returned HTTP 502: upstream unavailable"));
}

#[tokio::test]
async fn sign_grant_and_call_api_in_one_chain() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				json!({
					"access_token": "bearer-at",
					"token_type": "Bearer",
					"expires_in": 300,
					"refresh_token": "rt"
				})
				.to_string(),
			);
		})
		.await;
	let userinfo = server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo").header("authorization", "Bearer bearer-at");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":\"alice\",\"email\":\"alice@lab.example\"}");
		})
		.await;
	let ctx = context(
		json!({
			"tokenEndpoint": server.url("/token"),
			"userinfo": server.url("/userinfo"),
			"clientId": CLIENT_ID,
			"key": { "kty": "oct", "k": "bGFiLXNlY3JldC1sYWItc2VjcmV0LWxhYi1zZWNyZXQ" }
		}),
		json!({}),
	);
	let steps: Vec<ChainStep> = oauth2_lab::serde_json::from_value(json!([
		{
			"fn": "jwt_sign",
			"id": "assertion",
			"inputs": {
				"claims": {
					"iss": "{{config.clientId}}",
					"sub": "{{config.clientId}}",
					"aud": "{{config.tokenEndpoint}}"
				},
				"key": "{{config.key}}"
			}
		},
		{
			"fn": "jwt_bearer",
			"id": "grant",
			"inputs": {
				"token_endpoint": "{{config.tokenEndpoint}}",
				"assertion": "{{subFn.assertion.jwt}}",
				"client_id": "{{config.clientId}}",
				"client_auth": "none"
			},
			"storeResults": [
				{ "from": "access_token", "to": "accessToken" },
				{ "from": "refresh_token", "to": "refreshToken" }
			]
		},
		{
			"fn": "http_request",
			"id": "me",
			"inputs": {
				"url": "{{config.userinfo}}",
				"headers": { "Authorization": "Bearer {{subFn.grant.access_token}}" }
			},
			"storeResults": [{ "from": "body", "to": "profile" }]
		}
	]))
	.expect("Chain should deserialize.");
	let result = engine().execute_chain(&steps, &ctx).await;

	assert!(result.is_success(), "Unexpected failure: {:?}", result.failure());

	token.assert_async().await;
	userinfo.assert_async().await;

	let updates = result.state_updates().expect("Completed chain has state updates.");

	assert_eq!(updates["accessToken"], "bearer-at");
	assert_eq!(updates["refreshToken"], "rt");
	assert_eq!(updates["profile"]["email"], "alice@lab.example");
	assert_eq!(result.results()[0].outcome.curl(), None);

	let grant_curl = result.results()[1].outcome.curl().expect("Grant should render curl.");

	assert!(grant_curl.contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"));
	assert!(grant_curl.contains("client_id=lab-client"));
	assert!(!grant_curl.contains("Authorization"));
}

#[tokio::test]
async fn http_request_reports_non_success_and_text_bodies() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/session");
			then.status(503).header("x-lab", "down").body("maintenance");
		})
		.await;
	let outcome = engine()
		.execute_step(
			"http_request",
			&object(json!({ "url": server.url("/session"), "method": "DELETE" })),
			&empty_context(),
		)
		.await;
	let outputs = outcome.outputs().expect("Non-2xx responses are still reported.");

	assert_eq!(outputs["status"], 503);
	assert_eq!(outputs["ok"], false);
	assert_eq!(outputs["body"], "maintenance");
	assert_eq!(outputs["headers"]["x-lab"], "down");
	assert_eq!(
		outcome.curl(),
		Some(format!("curl -X DELETE '{}'", server.url("/session")).as_str())
	);
}

#[tokio::test]
async fn http_request_honors_per_call_timeout() {
	let server = MockServer::start_async().await;
	let _slow = server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200).delay(std::time::Duration::from_millis(1_500)).body("late");
		})
		.await;
	let outcome = engine()
		.execute_step(
			"http_request",
			&object(json!({ "url": server.url("/slow"), "timeout_ms": 100 })),
			&empty_context(),
		)
		.await;
	let error = outcome.error().expect("Slow endpoint should time out.");

	assert!(error.contains("timed out after 100 ms"), "Unexpected error: {error}");
}

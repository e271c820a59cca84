mod common;

// std
use std::{collections::BTreeMap, sync::atomic::Ordering};
// self
use common::*;
use oauth2_lab::{
	engine::{ChainResult, ChainStep, Engine},
	error::Error,
	serde_json::{Value, json},
};

fn engine(echo: &Echo, fails: &Fails) -> Engine {
	Engine::new(stub_registry(echo.clone(), fails.clone())).with_env(BTreeMap::from([(
		"LAB_CLIENT_ID".to_owned(),
		"lab-client".to_owned(),
	)]))
}

fn chain(value: Value) -> Vec<ChainStep> {
	oauth2_lab::serde_json::from_value(value).expect("Chain should deserialize.")
}

#[tokio::test]
async fn echo_chain_threads_outputs_into_state_updates() {
	let (echo, fails) = (Echo::default(), Fails::default());
	let result = engine(&echo, &fails)
		.execute_chain(
			&chain(json!([
				{ "fn": "echo", "id": "s1", "inputs": { "v": "hello" } },
				{
					"fn": "echo",
					"id": "s2",
					"inputs": { "v": "{{subFn.s1.out}}-world" },
					"storeResults": [{ "from": "out", "to": "final" }]
				}
			])),
			&empty_context(),
		)
		.await;

	assert!(result.is_success());
	assert_eq!(result.state_updates().and_then(|s| s.get("final")), Some(&json!("hello-world")));
	assert_eq!(echo.calls(), 2);
	assert_eq!(
		oauth2_lab::serde_json::to_value(&result).expect("Chain result should serialize."),
		json!({
			"success": true,
			"results": [
				{ "id": "s1", "fn": "echo", "success": true, "outputs": { "out": "hello" }, "curl": null },
				{ "id": "s2", "fn": "echo", "success": true, "outputs": { "out": "hello-world" }, "curl": null }
			],
			"stateUpdates": { "final": "hello-world" }
		})
	);
}

#[tokio::test]
async fn whole_templates_keep_types_and_partial_templates_stringify() {
	let (echo, fails) = (Echo::default(), Fails::default());
	let ctx = context(
		json!({ "port": 8443, "scopes": ["openid", "profile"], "client": { "id": "abc" } }),
		json!({ "enabled": false }),
	);
	let result = engine(&echo, &fails)
		.execute_chain(
			&chain(json!([
				{ "fn": "echo", "id": "number", "inputs": { "v": "{{config.port}}" } },
				{ "fn": "echo", "id": "array", "inputs": { "v": "{{config.scopes}}" } },
				{ "fn": "echo", "id": "boolean", "inputs": { "v": "{{state.enabled}}" } },
				{
					"fn": "echo",
					"id": "text",
					"inputs": { "v": "port={{config.port}} first={{config.scopes.0}}" }
				},
				{ "fn": "echo", "id": "object", "inputs": { "v": "client={{config.client}}" } },
				{ "fn": "echo", "id": "nested", "inputs": { "v": { "list": ["{{config.client.id}}", 1] } } }
			])),
			&ctx,
		)
		.await;
	let outputs = result
		.results()
		.iter()
		.map(|r| (r.id.as_str(), r.outcome.outputs().map(|o| o["out"].clone())))
		.collect::<BTreeMap<_, _>>();

	assert!(result.is_success(), "Unexpected failure: {:?}", result.failure());
	assert_eq!(outputs["number"], Some(json!(8443)));
	assert_eq!(outputs["array"], Some(json!(["openid", "profile"])));
	assert_eq!(outputs["boolean"], Some(json!(false)));
	assert_eq!(outputs["text"], Some(json!("port=8443 first=openid")));
	assert_eq!(outputs["object"], Some(json!("client={\"id\":\"abc\"}")));
	assert_eq!(outputs["nested"], Some(json!({ "list": ["abc", 1] })));
}

#[tokio::test]
async fn unresolved_templates_pass_through_verbatim() {
	let (echo, fails) = (Echo::default(), Fails::default());
	let engine = engine(&echo, &fails);
	let ctx = empty_context();
	let whole = engine.execute_step("echo", &object(json!({ "v": "{{state.missing}}" })), &ctx).await;
	let partial = engine
		.execute_step("echo", &object(json!({ "v": "a {{secrets.key}} b {{config.none}}" })), &ctx)
		.await;

	assert_eq!(whole.outputs().map(|o| &o["out"]), Some(&json!("{{state.missing}}")));
	assert_eq!(
		partial.outputs().map(|o| &o["out"]),
		Some(&json!("a {{secrets.key}} b {{config.none}}"))
	);
}

#[tokio::test]
async fn fallbacks_and_env_resolve() {
	let (echo, fails) = (Echo::default(), Fails::default());
	let engine = engine(&echo, &fails);
	let ctx = context(json!({ "token": "from-config", "empty": "" }), json!({}));
	let fallback = engine
		.execute_step("echo", &object(json!({ "v": "{{state.token || config.token}}" })), &ctx)
		.await;
	let literal = engine
		.execute_step("echo", &object(json!({ "v": "{{config.empty || 'anonymous'}}" })), &ctx)
		.await;
	let env = engine
		.execute_step("echo", &object(json!({ "v": "client={{env.LAB_CLIENT_ID}}" })), &ctx)
		.await;

	assert_eq!(fallback.outputs().map(|o| &o["out"]), Some(&json!("from-config")));
	assert_eq!(literal.outputs().map(|o| &o["out"]), Some(&json!("anonymous")));
	assert_eq!(env.outputs().map(|o| &o["out"]), Some(&json!("client=lab-client")));
}

#[tokio::test]
async fn validation_failure_never_reaches_the_handler() {
	let (echo, fails) = (Echo::default(), Fails::default());
	let engine = engine(&echo, &fails);
	let outcome =
		engine.execute_step("echo", &object(json!({ "v": "{{state.absent}}x" })), &empty_context()).await;

	assert!(outcome.is_success(), "Partially resolved text still counts as a value.");
	assert_eq!(echo.calls(), 1);

	let err = engine
		.run("echo", &object(json!({ "v": "" })), &empty_context())
		.await
		.expect_err("Empty required input should fail validation.");

	assert!(
		matches!(&err, Error::Validation { errors } if errors == &["Missing required input: `v`"]),
		"Unexpected error: {err:?}"
	);
	assert_eq!(echo.calls(), 1);
}

#[tokio::test]
async fn chain_stops_at_first_failure_and_keeps_partial_results() {
	let (echo, fails) = (Echo::default(), Fails::default());
	let ctx = empty_context();
	let result = engine(&echo, &fails)
		.execute_chain(
			&chain(json!([
				{
					"fn": "echo",
					"id": "first",
					"inputs": { "v": 1 },
					"storeResults": [{ "from": "out", "to": "one" }]
				},
				{ "fn": "fail", "id": "second" },
				{ "fn": "echo", "id": "third", "inputs": { "v": 3 } }
			])),
			&ctx,
		)
		.await;

	assert_eq!(result.failure(), Some(("upstream rejected the request", 1, "second")));
	assert_eq!(result.results().len(), 2);
	assert!(result.results()[0].outcome.is_success());
	assert_eq!(result.state_updates(), None);
	assert_eq!(echo.calls(), 1);
	assert_eq!(fails.calls.load(Ordering::SeqCst), 1);
	assert!(matches!(result, ChainResult::Failed { failed_at: 1, .. }));
	assert!(ctx.sub_fn_results.is_empty(), "Caller context must not be mutated.");
}

#[tokio::test]
async fn later_steps_address_earlier_outputs_by_step_id_or_function() {
	let (echo, fails) = (Echo::default(), Fails::default());
	let result = engine(&echo, &fails)
		.execute_chain(
			&chain(json!([
				{ "fn": "echo", "inputs": { "v": { "access_token": "at-1", "ttl": 60 } } },
				{
					"fn": "echo",
					"id": "copy",
					"inputs": { "v": "{{subFn.echo.out.access_token}}" },
					"storeResults": [
						{ "from": "out", "to": "token" },
						{ "from": "missing", "to": "ignored" }
					]
				}
			])),
			&empty_context(),
		)
		.await;

	assert_eq!(
		result.state_updates().cloned().map(Value::Object),
		Some(json!({ "token": "at-1" }))
	);
	assert_eq!(result.results()[0].id, "echo");
}

#[tokio::test]
async fn unknown_functions_are_reported_before_and_during_execution() {
	let (echo, fails) = (Echo::default(), Fails::default());
	let engine = engine(&echo, &fails);
	let steps = chain(json!([{ "fn": "echo", "inputs": { "v": 1 } }, { "fn": "nope" }]));
	let err = engine.check_chain(&steps).expect_err("Unknown step should be reported.");

	assert_eq!(err.to_string(), "Unknown sub function at step 1: nope. Available: echo, fail");

	let result = engine.execute_chain(&steps, &empty_context()).await;

	assert_eq!(
		result.failure(),
		Some(("Unknown sub function: nope. Available: echo, fail", 1, "nope"))
	);
	assert_eq!(echo.calls(), 1);
}

#[cfg(feature = "reqwest")]
#[tokio::test]
async fn builtin_jwt_functions_chain_offline() {
	let registry = oauth2_lab::function::builtin::registry(std::sync::Arc::new(
		oauth2_lab::http::HttpTransport::new().expect("Default transport should build."),
	))
	.expect("Built-ins should register.");
	let ctx = context(
		json!({
			"issuer": "https://lab.example",
			"key": { "kty": "oct", "kid": "k1", "k": "bGFiLXNlY3JldC1sYWItc2VjcmV0LWxhYi1zZWNyZXQ" }
		}),
		json!({ "user": "alice" }),
	);
	let result = Engine::new(registry)
		.execute_chain(
			&chain(json!([
				{
					"fn": "jwt_sign",
					"id": "sign",
					"inputs": {
						"claims": { "iss": "{{config.issuer}}", "sub": "{{state.user}}" },
						"key": "{{config.key}}",
						"include_jti": false
					}
				},
				{
					"fn": "jwt_decode",
					"id": "inspect",
					"inputs": { "token": "{{subFn.sign.jwt}}" },
					"storeResults": [{ "from": "payload", "to": "claims" }]
				}
			])),
			&ctx,
		)
		.await;

	assert!(result.is_success(), "Unexpected failure: {:?}", result.failure());

	let claims = &result.state_updates().expect("Completed chain has state updates.")["claims"];

	assert_eq!(claims["iss"], "https://lab.example");
	assert_eq!(claims["sub"], "alice");
	assert!(claims.get("jti").is_none());
	assert_eq!(
		claims["exp"].as_i64().zip(claims["iat"].as_i64()).map(|(exp, iat)| exp - iat),
		Some(300)
	);
}

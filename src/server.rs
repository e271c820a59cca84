//! JSON API over the engine: list and describe functions, run one, or run a chain.

mod config;

pub use config::ServerConfig;

// crates.io
use axum::{
	Json, Router,
	extract::{Path, Query, State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;
// self
use crate::{
	_prelude::*,
	context::ExecutionContext,
	engine::{ChainStep, Engine},
	error::{ConfigError, RegistryError},
	function::{CategoryCount, FunctionDescriptor, builtin},
};

const DEFAULT_LOG_FILTER: &str = "oauth2_lab=info";

/// Installs the global `tracing` subscriber, honoring `RUST_LOG`.
///
/// Does nothing when a subscriber is already installed.
pub fn init_tracing() {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Builds the engine with every built-in function and serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
	let registry = builtin::registry(Arc::new(config.transport()?))?;
	let engine = Engine::new(registry).with_env(config.env_source());
	let listener = TcpListener::bind(config.bind.as_str())
		.await
		.map_err(|source| ConfigError::Bind { addr: config.bind.clone(), source })?;

	tracing::info!(
		addr = %config.bind,
		functions = engine.registry().len(),
		cors = config.cors,
		"oauth2-lab listening"
	);

	serve_on(listener, engine, config.cors).await
}

/// Serves `engine` on an already bound listener until Ctrl-C.
pub async fn serve_on(listener: TcpListener, engine: Engine, cors: bool) -> Result<()> {
	axum::serve(listener, router(engine, cors))
		.with_graceful_shutdown(async {
			let _ = tokio::signal::ctrl_c().await;
		})
		.await
		.map_err(ConfigError::Serve)?;

	Ok(())
}

/// Routes of the lab API.
pub fn router(engine: Engine, cors: bool) -> Router {
	let router = Router::new()
		.route("/functions", get(list_functions))
		.route("/functions/categories", get(list_categories))
		.route("/functions/chain", post(execute_chain))
		.route("/functions/{id}", get(describe_function))
		.route("/functions/{id}/execute", post(execute_function))
		.with_state(engine);

	if cors { router.layer(CorsLayer::permissive()) } else { router }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
	#[serde(default)]
	category: Option<String>,
}

#[derive(Serialize)]
struct FunctionList<'a> {
	functions: Vec<&'a FunctionDescriptor>,
	total: usize,
	filter: Option<&'a str>,
}

#[derive(Serialize)]
struct CategoryList {
	categories: Vec<CategoryCount>,
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
	#[serde(default)]
	inputs: JsonMap,
	#[serde(default)]
	context: ExecutionContext,
}

#[derive(Debug, Deserialize)]
struct ChainRequest {
	chain: Vec<ChainStep>,
	#[serde(default)]
	context: ExecutionContext,
}

async fn list_functions(State(engine): State<Engine>, Query(query): Query<ListQuery>) -> Response {
	let filter = query.category.as_deref().filter(|c| !c.is_empty());
	let functions = engine.registry().descriptors(filter).collect::<Vec<_>>();

	Json(FunctionList { total: functions.len(), functions, filter }).into_response()
}

async fn list_categories(State(engine): State<Engine>) -> Json<CategoryList> {
	Json(CategoryList { categories: engine.registry().categories() })
}

async fn describe_function(State(engine): State<Engine>, Path(id): Path<String>) -> Response {
	match engine.registry().get(&id) {
		Some(descriptor) => Json(descriptor).into_response(),
		None => (
			StatusCode::NOT_FOUND,
			Json(json!({
				"error": format!("Unknown sub function: {id}"),
				"id": id,
				"available": engine.registry().ids(),
			})),
		)
			.into_response(),
	}
}

async fn execute_function(
	State(engine): State<Engine>,
	Path(id): Path<String>,
	request: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Response {
	let Json(request) = match request {
		Ok(request) => request,
		Err(rejection) => return malformed(rejection),
	};

	if let Err(e) = engine.registry().lookup(&id) {
		return (
			StatusCode::NOT_FOUND,
			Json(json!({ "success": false, "error": e.to_string(), "available": engine.registry().ids() })),
		)
			.into_response();
	}

	let outcome = engine.execute_step(&id, &request.inputs, &request.context).await;
	let status = if outcome.is_success() { StatusCode::OK } else { StatusCode::BAD_REQUEST };

	(status, Json(outcome)).into_response()
}

async fn execute_chain(
	State(engine): State<Engine>,
	request: Result<Json<ChainRequest>, JsonRejection>,
) -> Response {
	let Json(request) = match request {
		Ok(request) => request,
		Err(rejection) => return malformed(rejection),
	};

	if request.chain.is_empty() {
		return (
			StatusCode::BAD_REQUEST,
			Json(json!({ "success": false, "error": "Chain must contain at least one step." })),
		)
			.into_response();
	}
	if let Err(e) = engine.check_chain(&request.chain) {
		let failed_at = match &e {
			RegistryError::UnregisteredStep { index, .. } => Some(*index),
			_ => None,
		};

		return (
			StatusCode::BAD_REQUEST,
			Json(json!({
				"success": false,
				"error": e.to_string(),
				"failedAt": failed_at,
				"available": engine.registry().ids(),
			})),
		)
			.into_response();
	}

	let result = engine.execute_chain(&request.chain, &request.context).await;
	let status = if result.is_success() { StatusCode::OK } else { StatusCode::BAD_REQUEST };

	(status, Json(result)).into_response()
}

fn malformed(rejection: JsonRejection) -> Response {
	tracing::debug!(status = %rejection.status(), "rejected request body");

	(StatusCode::BAD_REQUEST, Json(json!({ "success": false, "error": rejection.body_text() })))
		.into_response()
}

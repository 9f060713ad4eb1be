//! HTTP transport for the tool protocol.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/rpc` | One request envelope in, one response envelope out |
//! | `GET`  | `/health` | Health check (returns version and index) |
//!
//! `/rpc` always answers `200 OK` with a response envelope, including for
//! protocol errors and unparseable bodies, so clients handle one shape.
//! Requests are dispatched one at a time behind a single async lock,
//! matching the stdio transport.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::protocol::{DispatchError, RpcResponse};

/// Shared state for route handlers.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Mutex<Dispatcher>>,
    index: Arc<str>,
}

/// Build the router. Exposed separately from [`run_http`] so tests can
/// drive it without binding a socket.
pub fn router(dispatcher: Dispatcher, index: &str) -> Router {
    let state = AppState {
        dispatcher: Arc::new(Mutex::new(dispatcher)),
        index: Arc::from(index),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/rpc", post(handle_rpc))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Serve on `[server].bind` until the process is interrupted.
pub async fn run_http(config: &Config, dispatcher: Dispatcher) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(dispatcher, &config.elasticsearch.index);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("rpc server listening on http://{}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("rpc server stopped");
    Ok(())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    index: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        index: state.index.to_string(),
    })
}

// ============ POST /rpc ============

/// The body is taken as raw bytes so malformed JSON, or a body that is not
/// UTF-8, is answered with a `PARSE_ERROR` envelope rather than an
/// extractor rejection.
async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Json<RpcResponse> {
    let line = match std::str::from_utf8(&body) {
        Ok(line) => line.trim(),
        Err(e) => {
            return Json(RpcResponse::failure(
                Value::Null,
                &DispatchError::Parse(e.to_string()),
            ))
        }
    };
    let dispatcher = state.dispatcher.lock().await;
    Json(dispatcher.dispatch_line(line).await)
}

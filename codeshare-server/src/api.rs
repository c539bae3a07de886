//! HTTP API: `POST /run` and `GET /health`.
//!
//! ```text
//! POST /run {"language":"python3","code":"print(1)"}
//!   200 {"language":..,"version":..,"run":{"stdout":..,"stderr":..,"output":..}}
//!   500 {"error":"Execution failed"}
//! ```
//!
//! Every failure, whatever its cause, is reported to the caller as the same
//! 500 body; the cause is logged here.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use codeshare_exec::{ExecutionProxy, RunRequest};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Fixed body for any failed run.
pub const EXECUTION_FAILED: &str = "Execution failed";

#[derive(Clone)]
pub struct ApiState {
    pub proxy: ExecutionProxy,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/run", post(run))
        .route("/health", get(|| async { "OK" }))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on an already bound listener.
pub async fn serve(listener: TcpListener, state: ApiState) -> std::io::Result<()> {
    log::info!("HTTP API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

async fn run(State(state): State<ApiState>, body: Bytes) -> Response {
    let request: RunRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            log::error!("Rejecting run request with unreadable body: {e}");
            return execution_failed();
        }
    };

    log::info!("Run request: language={} ({} bytes)", request.language, request.code.len());
    log::debug!("Code:\n{}", request.code);

    match state.proxy.execute(&request.language, &request.code).await {
        Ok(result) => {
            log::info!("Run finished for {}", request.language);
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            log::error!("Execution backend error: {e}");
            execution_failed()
        }
    }
}

fn execution_failed() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": EXECUTION_FAILED })),
    )
        .into_response()
}

//! HTTP data service for latency telemetry.
//!
//! Serves the backing telemetry document at `GET /data`, re-reading it from
//! disk on every request. Any origin may call it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use log::{error, info};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use latencyscope_core::DocumentError;
use latencyscope_core::document::read_document;

/// Body of the 500 response when the document cannot be read.
pub const READ_ERROR_MESSAGE: &str = "Errore nella lettura del file JSON";
/// Body of the 500 response when the document is not valid JSON.
pub const PARSE_ERROR_MESSAGE: &str = "Errore nel parsing del file JSON";

/// Shared server state.
struct AppState {
    document: PathBuf,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

fn error_response(message: &'static str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: message }),
    )
        .into_response()
}

async fn handle_data(State(state): State<Arc<AppState>>) -> Response {
    match read_document(&state.document).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e @ DocumentError::Read { .. }) => {
            error!("{e}");
            error_response(READ_ERROR_MESSAGE)
        }
        Err(e) => {
            error!("{}: {e}", state.document.display());
            error_response(PARSE_ERROR_MESSAGE)
        }
    }
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "latencyscope data service",
        "version": latencyscope_core::VERSION,
        "document": state.document.display().to_string(),
        "endpoints": {
            "/": "This API index",
            "/data": {
                "method": "GET",
                "description": "Full telemetry snapshot, re-read on every request",
                "shape": {"messages": [{"id": "int", "send_time": "ms", "recv_time": "ms"}]},
            },
        },
    }))
}

/// Build the axum router serving `document`.
pub fn build_router(document: impl Into<PathBuf>) -> Router {
    let state = Arc::new(AppState {
        document: document.into(),
    });

    Router::new()
        .route("/", get(handle_index))
        .route("/data", get(handle_data))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve on an already-bound listener until the future is dropped.
pub async fn serve(listener: tokio::net::TcpListener, document: &Path) -> std::io::Result<()> {
    let app = build_router(document);
    axum::serve(listener, app).await
}

/// Bind `host:port` and run the data service.
pub async fn run_server(document: &Path, host: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("serving {} on http://{addr}/data", document.display());
    serve(listener, document).await
}

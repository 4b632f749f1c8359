//! HTTP facade over the tracker store.
//!
//! Two surfaces share one store: the flat `/folders` + `/test-cases` API
//! ([`flat`]) and the TMS plugin API ([`tms`]). Every handler maps a request
//! to one store operation and its result back to a JSON envelope.

pub mod flat;
pub mod tms;

use crate::error::Error;
use crate::tracker::SqliteTrackerStore;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The store every handler operates on.
    pub store: Arc<SqliteTrackerStore>,
}

impl AppState {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: Arc<SqliteTrackerStore>) -> Self {
        Self { store }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => {
                error!(error = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({"detail": self.to_string()}))).into_response()
    }
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "service": "tasktracker-stub", "version": crate::VERSION}))
}

/// Log every request with its status and duration.
async fn trace_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(%method, %path, status = response.status().as_u16(), elapsed_ms, "request");
    response
}

/// Create the full stub router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(flat::routes())
        .merge(tms::routes())
        .layer(middleware::from_fn(trace_requests))
        .with_state(state)
}

/// Serve the stub on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "TaskTracker stub listening");
    }
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await
}

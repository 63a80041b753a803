//! HTTP server implementation using axum.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use dmap_scheduler::{PresentedSet, SchedulerHandle};
use dmap_telemetry::{encode_text, Metrics};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::notifier::Notifier;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    notifier: Arc<dyn Notifier>,
    scheduler: SchedulerHandle,
}

impl AppState {
    pub fn new(notifier: Arc<dyn Notifier>, scheduler: SchedulerHandle) -> Self {
        Self {
            notifier,
            scheduler,
        }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/notify", post(notify))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/refresh", post(request_refresh))
        .route("/metrics", get(get_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotifyRequest {
    #[serde(default, alias = "telegramChatId")]
    destination_id: Option<Value>,
    #[serde(default)]
    text: Option<String>,
}

impl NotifyRequest {
    /// Destination as a string. Numeric chat ids are accepted.
    fn destination(&self) -> Option<String> {
        let id = match self.destination_id.as_ref()? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Forward a message to the notifier.
async fn notify(
    State(state): State<AppState>,
    payload: Result<Json<NotifyRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected notify body");
            Metrics::notify("invalid");
            return error_response(StatusCode::BAD_REQUEST, "Invalid JSON body");
        }
    };

    let destination = request.destination();
    let text = request.text.filter(|t| !t.is_empty());
    let (Some(destination), Some(text)) = (destination, text) else {
        Metrics::notify("invalid");
        return error_response(StatusCode::BAD_REQUEST, "Missing destinationId or text");
    };

    match state.notifier.send(&destination, &text).await {
        Ok(()) => {
            Metrics::notify("ok");
            (StatusCode::OK, Json(json!({ "success": true }))).into_response()
        }
        Err(e) => {
            error!(destination = %destination, error = %e, "Notification delivery failed");
            Metrics::notify("error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to deliver message")
        }
    }
}

/// Current presented set as JSON.
async fn get_snapshot(State(state): State<AppState>) -> Json<PresentedSet> {
    Json(state.scheduler.current())
}

/// Explicit user refresh.
async fn request_refresh(State(state): State<AppState>) -> Response {
    match state.scheduler.refresh() {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "accepted": true }))).into_response(),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()),
    }
}

async fn get_metrics() -> Response {
    match encode_text() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// Bind and serve until `cancel` fires.
pub async fn run_server(
    state: AppState,
    config: ServerConfig,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(port = config.port, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

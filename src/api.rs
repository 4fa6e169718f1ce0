use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::backend::http::SECRET_HEADER;
use crate::chat::ChatMessage;
use crate::intake::IntakeHandler;

#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<IntakeHandler>,
    pub secret: Arc<str>,
    pub metrics: Option<PrometheusHandle>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/metrics", get(metrics))
        .route("/events/message", post(message_event))
        .with_state(state)
}

async fn metrics(State(state): State<AppState>) -> (StatusCode, String) {
    match &state.metrics {
        Some(h) => (StatusCode::OK, h.render()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}

/// Chat gateway bridge posts each inbound message here. Handling happens in
/// the background so the bridge is never held up by the backend.
async fn message_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(msg): Json<ChatMessage>,
) -> StatusCode {
    let authorized = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == &*state.secret);
    if !authorized {
        return StatusCode::UNAUTHORIZED;
    }

    let intake = state.intake.clone();
    tokio::spawn(async move {
        intake.on_message(&msg).await;
    });
    StatusCode::ACCEPTED
}

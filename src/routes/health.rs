use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::i18n;
use crate::services::poller::BoardState;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub event_feed: BoardState,
    pub poll_interval_seconds: u64,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: i18n::t("app.name"),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        event_feed: state.poller.snapshot().await.state,
        poll_interval_seconds: state.config.events.poll_interval_seconds,
    };

    (StatusCode::OK, Json(response))
}

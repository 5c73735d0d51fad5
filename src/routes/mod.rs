pub mod content;
pub mod events;
pub mod health;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

/// Routes under `/api`. Rate limiting is layered on by the caller.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/events", events::router())
        .nest("/news", content::news_router())
        .nest("/patches", content::patches_router())
}

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppErrorWithDetails};
use crate::i18n;
use crate::models::MinuteSpan;
use crate::services::poller::{BoardState, EventBoard};
use crate::services::schedule::{ClassifiedEvent, EventStatus, WindowFailure};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_board))
        .route("/refresh", post(refresh_board))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    pub lang: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventBoardResponse {
    pub state: BoardState,
    pub generated_at: Option<String>,
    /// Wall-clock time (`HH:MM`) the board was computed for.
    pub now: Option<String>,
    pub active: Vec<EventCard>,
    pub upcoming: Vec<EventCard>,
    pub upcoming_overflow: usize,
    pub failures: Vec<WindowFailure>,
    pub messages: BoardMessages,
}

#[derive(Debug, Serialize)]
pub struct EventCard {
    #[serde(flatten)]
    pub event: ClassifiedEvent,
    pub status_label: String,
    pub time_range: String,
    pub countdown: String,
}

/// Text the front end shows in place of, or after, the two lists.
#[derive(Debug, Default, Serialize)]
pub struct BoardMessages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_active: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_upcoming: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more_upcoming: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Current event board as last published by the poller
async fn get_board(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<EventBoardResponse>, AppErrorWithDetails> {
    let lang = resolve_language(query.lang.as_deref())?;
    let board = state.poller.snapshot().await;
    Ok(Json(render_board(&board, &lang)))
}

/// Run one poll tick now and return the fresh board. A failed fetch is a 502;
/// the error board is still published for `GET /api/events`.
async fn refresh_board(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<EventBoardResponse>, AppErrorWithDetails> {
    let lang = resolve_language(query.lang.as_deref())?;
    tracing::info!("Manual event board refresh requested");
    let board = state.poller.refresh().await.map_err(AppError::Feed)?;
    Ok(Json(render_board(&board, &lang)))
}

pub fn resolve_language(lang: Option<&str>) -> Result<String, AppErrorWithDetails> {
    let Some(raw) = lang else {
        return Ok(i18n::DEFAULT_LANG.to_string());
    };

    let lang = i18n::normalize_language(raw);
    if i18n::is_supported_language(&lang) {
        Ok(lang)
    } else {
        let message = i18n::tr(None, "error.unsupported_language", Some(&[("lang", raw)]));
        Err(AppError::BadRequest(message)
            .with_details(serde_json::json!({ "supported": i18n::supported_languages() })))
    }
}

/// "1h 5m" in the requested language.
fn span_label(lang: Option<&str>, span: MinuteSpan) -> String {
    let h = span.hours().to_string();
    let m = span.minutes().to_string();
    match (span.hours(), span.minutes()) {
        (0, _) => i18n::tr(lang, "duration.minutes", Some(&[("m", m.as_str())])),
        (_, 0) => i18n::tr(lang, "duration.hours", Some(&[("h", h.as_str())])),
        _ => i18n::tr(
            lang,
            "duration.hours_minutes",
            Some(&[("h", h.as_str()), ("m", m.as_str())]),
        ),
    }
}

pub fn render_board(board: &EventBoard, lang: &str) -> EventBoardResponse {
    let lang = Some(lang);
    let classification = &board.classification;

    let card = |event: &ClassifiedEvent| {
        let (status_key, countdown) = match event.status {
            EventStatus::Active { remaining } => (
                "events.status_active",
                i18n::tr(
                    lang,
                    "events.ends_in",
                    Some(&[("time", span_label(lang, remaining).as_str())]),
                ),
            ),
            EventStatus::Upcoming { starts_in } => (
                "events.status_scheduled",
                i18n::tr(
                    lang,
                    "events.starts_in",
                    Some(&[("time", span_label(lang, starts_in).as_str())]),
                ),
            ),
        };
        EventCard {
            event: event.clone(),
            status_label: i18n::tr(lang, status_key, None),
            time_range: format!("{} - {}", event.start, event.end),
            countdown,
        }
    };

    let mut messages = BoardMessages::default();
    match board.state {
        BoardState::Loading => {
            messages.loading = Some(i18n::tr(lang, "events.loading", None));
        }
        BoardState::Error => {
            let err = board.error.as_deref().unwrap_or("unknown error");
            messages.error = Some(i18n::tr(lang, "events.error", Some(&[("err", err)])));
        }
        BoardState::Ready => {
            if classification.active.is_empty() {
                messages.no_active = Some(i18n::tr(lang, "events.no_active", None));
            }
            if classification.upcoming.is_empty() {
                messages.no_upcoming = Some(i18n::tr(lang, "events.no_upcoming", None));
            } else if classification.upcoming_overflow > 0 {
                let count = classification.upcoming_overflow.to_string();
                messages.more_upcoming = Some(i18n::tr(
                    lang,
                    "events.more_upcoming",
                    Some(&[("count", count.as_str())]),
                ));
            }
        }
    }

    EventBoardResponse {
        state: board.state,
        generated_at: board.generated_at.map(|dt| dt.to_rfc3339()),
        now: board.now.map(|now| now.to_string()),
        active: classification.active.iter().map(card).collect(),
        upcoming: classification.upcoming.iter().map(card).collect(),
        upcoming_overflow: classification.upcoming_overflow,
        failures: classification.failures.clone(),
        messages,
    }
}

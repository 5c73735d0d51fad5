//! Initialization helpers for the application:
//! - tracing subscriber setup
//! - event feed + poller construction
//! - background worker spawn helpers
//!
//! This module keeps startup wiring out of `main.rs`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::feed::{self, redact_url};
use crate::services::poller::{EventPoller, PollerHandle};

const DEFAULT_LOG_FILTER: &str = "raider_board=debug,tower_http=debug";

/// Initialize tracing. `RUST_LOG` overrides the default filter;
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Build the event poller from configuration.
pub fn build_event_poller(config: &Config) -> Result<Arc<EventPoller>> {
    let events = &config.events;
    tracing::info!(
        "Event timer feed: {} (poll every {}s, timeout {}s, clock {:?})",
        redact_url(&events.request_url()),
        events.poll_interval_seconds,
        events.fetch_timeout_seconds,
        events.clock
    );

    let source = feed::source_from_config(events)
        .map_err(|e| anyhow::anyhow!("Failed to set up event feed: {}", e))?;

    Ok(Arc::new(EventPoller::new(
        source,
        events.clock,
        events.upcoming_limit,
    )))
}

/// Spawn background workers:
/// - periodic event-timer polling
///
/// Each worker listens for a shutdown notification via the given
/// `tokio::sync::broadcast::Sender<()>`; the returned handles are awaited on
/// shutdown.
pub fn spawn_background_workers(
    state: Arc<crate::AppState>,
    shutdown: tokio::sync::broadcast::Sender<()>,
) -> Vec<PollerHandle> {
    let interval = Duration::from_secs(state.config.events.poll_interval_seconds);
    vec![PollerHandle::spawn(state.poller.clone(), interval, shutdown)]
}

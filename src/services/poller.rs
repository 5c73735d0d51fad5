//! Background polling of the event-timer feed.
//!
//! Each tick fetches the feed, reads the wall clock, classifies and replaces
//! the published [`EventBoard`] wholesale. A failed fetch discards the previous
//! board and publishes an error state; the next tick is the only retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::config::ClockSource;
use crate::models::WallClockMinutes;
use crate::services::feed::{EventSource, FeedError};
use crate::services::schedule::{classify, Classification};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardState {
    /// No tick has completed yet.
    Loading,
    Ready,
    Error,
}

/// The last classification result, as served to the front end.
#[derive(Debug, Clone, Serialize)]
pub struct EventBoard {
    pub state: BoardState,
    pub generated_at: Option<DateTime<Utc>>,
    /// Wall-clock time the classification was computed for.
    pub now: Option<WallClockMinutes>,
    pub classification: Classification,
    pub error: Option<String>,
}

impl EventBoard {
    pub fn loading() -> Self {
        Self {
            state: BoardState::Loading,
            generated_at: None,
            now: None,
            classification: Classification::default(),
            error: None,
        }
    }

    pub fn ready(now: WallClockMinutes, classification: Classification) -> Self {
        Self {
            state: BoardState::Ready,
            generated_at: Some(Utc::now()),
            now: Some(now),
            classification,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: BoardState::Error,
            generated_at: Some(Utc::now()),
            now: None,
            classification: Classification::default(),
            error: Some(message.into()),
        }
    }
}

impl Default for EventBoard {
    fn default() -> Self {
        Self::loading()
    }
}

pub type SharedBoard = Arc<RwLock<EventBoard>>;

impl ClockSource {
    pub fn now(&self) -> WallClockMinutes {
        match self {
            ClockSource::Local => WallClockMinutes::from_time(&chrono::Local::now()),
            ClockSource::Utc => WallClockMinutes::from_time(&Utc::now()),
        }
    }
}

type ClockFn = Box<dyn Fn() -> WallClockMinutes + Send + Sync>;

pub struct EventPoller {
    source: Box<dyn EventSource>,
    board: SharedBoard,
    clock: ClockFn,
    upcoming_limit: usize,
    // Serializes ticks so a manual refresh and the interval tick cannot
    // publish out of order.
    tick_lock: Mutex<()>,
}

impl EventPoller {
    pub fn new(source: Box<dyn EventSource>, clock: ClockSource, upcoming_limit: usize) -> Self {
        Self::with_clock(source, move || clock.now(), upcoming_limit)
    }

    pub fn with_clock<F>(source: Box<dyn EventSource>, clock: F, upcoming_limit: usize) -> Self
    where
        F: Fn() -> WallClockMinutes + Send + Sync + 'static,
    {
        Self {
            source,
            board: Arc::new(RwLock::new(EventBoard::loading())),
            clock: Box::new(clock),
            upcoming_limit,
            tick_lock: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> EventBoard {
        self.board.read().await.clone()
    }

    /// Fetch, classify and publish once. Returns the published board.
    pub async fn tick(&self) -> EventBoard {
        self.update().await.0
    }

    /// Like [`tick`](Self::tick), but a failed fetch is returned as the error.
    /// The error board is still published.
    pub async fn refresh(&self) -> Result<EventBoard, FeedError> {
        match self.update().await {
            (board, None) => Ok(board),
            (_, Some(e)) => Err(e),
        }
    }

    async fn update(&self) -> (EventBoard, Option<FeedError>) {
        let _guard = self.tick_lock.lock().await;

        let (board, failure) = match self.source.fetch().await {
            Ok(events) => {
                let now = (self.clock)();
                let classification = classify(now, &events, self.upcoming_limit);

                for failure in &classification.failures {
                    tracing::warn!(
                        "Skipping window {} of event {:?}: {}",
                        failure.window_index,
                        failure.event,
                        failure.error
                    );
                }
                if classification.is_empty() {
                    tracing::debug!("Nothing scheduled in the event feed");
                }
                tracing::debug!(
                    "Classified {} events at {}: {} active, {} upcoming (+{} more)",
                    events.len(),
                    now,
                    classification.active.len(),
                    classification.upcoming.len(),
                    classification.upcoming_overflow
                );

                (EventBoard::ready(now, classification), None)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch event timers from {}: {}",
                    self.source.describe(),
                    e
                );
                (EventBoard::failed(e.to_string()), Some(e))
            }
        };

        *self.board.write().await = board.clone();
        (board, failure)
    }
}

/// Stop handle for a running poll loop.
pub struct PollerHandle {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    /// Spawn the poll loop: tick immediately, then once per `interval`, until
    /// a shutdown notification arrives on `shutdown`.
    pub fn spawn(
        poller: Arc<EventPoller>,
        interval: Duration,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        let mut shutdown_rx = shutdown.subscribe();

        let handle = tokio::spawn(async move {
            tracing::info!(
                "Event timer poller started ({}, every {}s)",
                poller.source.describe(),
                interval.as_secs()
            );

            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                poller.tick().await;

                // Sleep until the next tick or exit early on shutdown.
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            tracing::info!("Event timer poller shutting down");
        });

        Self { shutdown, handle }
    }

    /// Signal the loop to stop and wait up to `wait` for it to exit.
    pub async fn stop(self, wait: Duration) {
        let _ = self.shutdown.send(());
        if tokio::time::timeout(wait, self.handle).await.is_err() {
            tracing::warn!(
                "Event timer poller did not stop within {}s",
                wait.as_secs()
            );
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::EventsConfig;
use crate::models::{EventDefinition, EventFeed};

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(u16),

    #[error("could not read feed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid feed document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid feed location: {0}")]
    Location(String),
}

/// Something that can produce the current list of event definitions.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<EventDefinition>, FeedError>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}

/// Redact potentially sensitive information from a feed URL before logging.
///
/// Relay URLs often carry API keys in the userinfo or query string; both are
/// dropped. Non-URL locations (file paths) are returned unchanged.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            let scheme = url.scheme();
            let host = url.host_str().unwrap_or("");
            let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
            let path = url.path();
            let query_part = if url.query().is_some() { "?(redacted)" } else { "" };
            format!("{}://{}{}{}{}", scheme, host, port_part, path, query_part)
        }
        _ => raw.to_string(),
    }
}

/// Event-timer feed served over HTTP(S). Always fetched in full.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: Client,
    url: String,
}

impl HttpEventSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("raider-board/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch(&self) -> Result<Vec<EventDefinition>, FeedError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        // Decode from bytes so a bad body surfaces as `Decode`, not `Request`.
        let body = response.bytes().await?;
        let feed = EventFeed::from_slice(&body)?;
        Ok(feed.data)
    }

    fn describe(&self) -> String {
        redact_url(&self.url)
    }
}

/// A pre-fetched `events.json` on disk, re-read on every fetch.
#[derive(Debug, Clone)]
pub struct FileEventSource {
    path: PathBuf,
}

impl FileEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EventSource for FileEventSource {
    async fn fetch(&self) -> Result<Vec<EventDefinition>, FeedError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| FeedError::Io {
                path: self.path.clone(),
                source,
            })?;
        let feed = EventFeed::from_slice(&bytes)?;
        Ok(feed.data)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Build the configured event source: http(s) URLs go through the relay
/// prefix, `file://` URLs and bare paths are read from disk.
pub fn source_from_config(config: &EventsConfig) -> Result<Box<dyn EventSource>, FeedError> {
    let location = config.feed_url.trim();

    match url::Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            let timeout = Duration::from_secs(config.fetch_timeout_seconds);
            Ok(Box::new(HttpEventSource::new(config.request_url(), timeout)?))
        }
        Ok(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| FeedError::Location(location.to_string()))?;
            Ok(Box::new(FileEventSource::new(path)))
        }
        Ok(url) => Err(FeedError::Location(format!(
            "unsupported scheme {:?} in {}",
            url.scheme(),
            location
        ))),
        // Not a URL at all: treat it as a relative or absolute path.
        Err(_) => Ok(Box::new(FileEventSource::new(location))),
    }
}

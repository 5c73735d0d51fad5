use std::env;
use std::path::PathBuf;

use crate::services::schedule::DEFAULT_UPCOMING_LIMIT;

pub const DEFAULT_EVENTS_FEED_URL: &str = "https://metaforge.app/api/arc-raiders/event-timers";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub events: EventsConfig,
    pub content: ContentConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS (the static front end).
    pub frontend_url: String,
    /// Directory with the static site. Not served when `None`.
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct EventsConfig {
    /// Event-timer feed. Either an http(s) URL or a path to a local `events.json`.
    pub feed_url: String,
    /// Optional CORS relay prefix; the feed URL is appended to it verbatim.
    pub feed_proxy: Option<String>,
    pub poll_interval_seconds: u64,
    pub fetch_timeout_seconds: u64,
    /// How many upcoming windows the board shows before "+N more".
    pub upcoming_limit: usize,
    pub clock: ClockSource,
}

/// Which wall clock "now" is read from. The feed carries no timezone, so the
/// server's local time is assumed to match the event authoring frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    Local,
    Utc,
}

#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Directory holding `news.json` and `patches.json`.
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for /api endpoints
    pub api_per_second: u32,
    /// Burst size for /api endpoints
    pub api_burst: u32,
}

impl EventsConfig {
    /// The URL actually requested, with the relay prefix applied.
    pub fn request_url(&self) -> String {
        match &self.feed_proxy {
            Some(proxy) if !proxy.is_empty() => format!("{}{}", proxy, self.feed_url),
            _ => self.feed_url.clone(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or(defaults.server.host),
                port: parse_env("PORT", defaults.server.port)?,
                frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.server.frontend_url),
                static_dir: env::var("STATIC_DIR")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from),
            },
            events: EventsConfig {
                feed_url: env::var("EVENTS_FEED_URL").unwrap_or(defaults.events.feed_url),
                feed_proxy: env::var("EVENTS_FEED_PROXY").ok().filter(|v| !v.is_empty()),
                poll_interval_seconds: parse_env(
                    "EVENTS_POLL_INTERVAL_SECONDS",
                    defaults.events.poll_interval_seconds,
                )?,
                fetch_timeout_seconds: parse_env(
                    "EVENTS_FETCH_TIMEOUT_SECONDS",
                    defaults.events.fetch_timeout_seconds,
                )?,
                upcoming_limit: parse_env("EVENTS_UPCOMING_LIMIT", defaults.events.upcoming_limit)?,
                clock: match env::var("EVENTS_CLOCK") {
                    Ok(v) => match v.to_lowercase().as_str() {
                        "local" => ClockSource::Local,
                        "utc" => ClockSource::Utc,
                        _ => return Err(ConfigError::InvalidValue("EVENTS_CLOCK".to_string())),
                    },
                    Err(_) => defaults.events.clock,
                },
            },
            content: ContentConfig {
                dir: env::var("CONTENT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.content.dir),
            },
            rate_limit: RateLimitConfig {
                api_per_second: parse_env(
                    "RATE_LIMIT_API_PER_SECOND",
                    defaults.rate_limit.api_per_second,
                )?,
                api_burst: parse_env("RATE_LIMIT_API_BURST", defaults.rate_limit.api_burst)?,
            },
        })
        .and_then(Config::validated)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.events.poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "EVENTS_POLL_INTERVAL_SECONDS".to_string(),
            ));
        }
        if self.events.feed_url.trim().is_empty() {
            return Err(ConfigError::MissingEnv("EVENTS_FEED_URL".to_string()));
        }
        Ok(self)
    }
}

/// Parse an optional env var, falling back to `default` when unset.
/// A set-but-unparseable value is an error rather than a silent default.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
                static_dir: None,
            },
            events: EventsConfig {
                feed_url: DEFAULT_EVENTS_FEED_URL.to_string(),
                feed_proxy: None,
                poll_interval_seconds: 60,
                fetch_timeout_seconds: 15,
                upcoming_limit: DEFAULT_UPCOMING_LIMIT,
                clock: ClockSource::Local,
            },
            content: ContentConfig {
                dir: PathBuf::from("data"),
            },
            rate_limit: RateLimitConfig {
                api_per_second: 5,
                api_burst: 20,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_without_proxy() {
        let events = Config::default().events;
        assert_eq!(events.request_url(), DEFAULT_EVENTS_FEED_URL);
    }

    #[test]
    fn request_url_with_proxy_prefix() {
        let mut events = Config::default().events;
        events.feed_proxy = Some("https://corsproxy.io/?".to_string());
        assert_eq!(
            events.request_url(),
            format!("https://corsproxy.io/?{}", DEFAULT_EVENTS_FEED_URL)
        );
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = Config::default();
        config.events.poll_interval_seconds = 0;
        assert!(matches!(
            config.validated(),
            Err(ConfigError::InvalidValue(name)) if name == "EVENTS_POLL_INTERVAL_SECONDS"
        ));
    }

    #[test]
    fn unparseable_rate_limit_is_an_error() {
        env::set_var("RATE_LIMIT_API_BURST", "lots");
        let result = Config::from_env();
        env::remove_var("RATE_LIMIT_API_BURST");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue(name)) if name == "RATE_LIMIT_API_BURST"
        ));
    }

    #[test]
    fn parse_env_falls_back_only_when_unset() {
        assert_eq!(parse_env("RAIDER_BOARD_TEST_UNSET_VAR", 7u32).unwrap(), 7);

        env::set_var("RAIDER_BOARD_TEST_SET_VAR", " 12 ");
        assert_eq!(parse_env("RAIDER_BOARD_TEST_SET_VAR", 7u32).unwrap(), 12);
        env::remove_var("RAIDER_BOARD_TEST_SET_VAR");
    }

    #[test]
    fn defaults_match_site_behaviour() {
        let config = Config::default();
        assert_eq!(config.events.upcoming_limit, 9);
        assert_eq!(config.events.poll_interval_seconds, 60);
        assert_eq!(config.events.clock, ClockSource::Local);
    }
}

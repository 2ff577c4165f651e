//! Process configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::domain::{InvalidServiceState, ServiceState};
use crate::feeds::FeedClientConfig;
use crate::tracker::TrackerConfig;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_MOCK_DATA_DIR: &str = "data/mock";
const DEFAULT_STATIC_DIR: &str = "static";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: {message}")]
    Invalid { var: &'static str, message: String },

    #[error(transparent)]
    ServiceState(#[from] InvalidServiceState),
}

impl ConfigError {
    fn invalid(var: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            message: message.into(),
        }
    }
}

/// Everything `main` needs to start the server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feeds: FeedClientConfig,
    pub tracker: TrackerConfig,

    /// Serve fixtures from `mock_data_dir` instead of fetching feeds
    pub use_mock: bool,
    pub mock_data_dir: PathBuf,

    /// Where telemetry events are POSTed, if anywhere
    pub telemetry_url: Option<String>,

    pub bind_addr: SocketAddr,
    pub static_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feeds: FeedClientConfig::default(),
            tracker: TrackerConfig::default(),
            use_mock: false,
            mock_data_dir: PathBuf::from(DEFAULT_MOCK_DATA_DIR),
            telemetry_url: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    /// if set. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut feeds = FeedClientConfig::default();
        if let Some(url) = get("LIVE_FEED_URL") {
            feeds = feeds.with_live_url(url);
        }
        if let Some(url) = get("SCHEDULE_URL") {
            feeds = feeds.with_schedule_url(url);
        }
        if let Some(url) = get("STATUS_URL") {
            feeds = feeds.with_status_url(url);
        }
        if let Some(key) = get("FEED_API_KEY") {
            feeds = feeds.with_api_key(key);
        }
        if let Some(auth) = get("FEED_BASIC_AUTH") {
            let (user, password) = auth.split_once(':').ok_or_else(|| {
                ConfigError::invalid("FEED_BASIC_AUTH", "expected user:password")
            })?;
            feeds = feeds.with_basic_auth(user, password);
        }

        let mut tracker = TrackerConfig::default();
        if let Some(ms) = get("LIVE_STALE_MS") {
            let ms: i64 = ms
                .parse()
                .map_err(|_| ConfigError::invalid("LIVE_STALE_MS", format!("not a number: {ms}")))?;
            if ms < 0 {
                return Err(ConfigError::invalid("LIVE_STALE_MS", "must not be negative"));
            }
            tracker = tracker.with_stale_after_ms(ms);
        }
        if let Some(state) = get("SERVICE_DEFAULT_STATE") {
            tracker = tracker.with_default_service_state(ServiceState::parse(&state)?);
        }

        let use_mock = match get("USE_MOCK_FEED") {
            Some(flag) => parse_flag(&flag)
                .ok_or_else(|| ConfigError::invalid("USE_MOCK_FEED", format!("not a boolean: {flag}")))?,
            None => false,
        };

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", format!("{bind_addr}: {e}")))?;

        Ok(Self {
            feeds,
            tracker,
            use_mock,
            mock_data_dir: get("MOCK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MOCK_DATA_DIR)),
            telemetry_url: get("TELEMETRY_URL"),
            bind_addr,
            static_dir: get("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
        })
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert!(!config.use_mock);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.mock_data_dir, PathBuf::from("data/mock"));
        assert_eq!(config.static_dir, "static");
        assert_eq!(config.tracker.stale_after_ms, 45_000);
        assert_eq!(config.tracker.default_service_state, ServiceState::On);
        assert!(config.feeds.live_url.is_none());
        assert!(config.telemetry_url.is_none());
    }

    #[test]
    fn reads_feeds_and_auth() {
        let config = config(&[
            ("LIVE_FEED_URL", "https://feeds.example/live.json"),
            ("STATUS_URL", " https://feeds.example/status.json "),
            ("SCHEDULE_URL", ""),
            ("FEED_API_KEY", "k3y"),
            ("FEED_BASIC_AUTH", "ops:pa:ss"),
            ("TELEMETRY_URL", "https://t.example/events"),
        ])
        .unwrap();
        assert_eq!(
            config.feeds.live_url.as_deref(),
            Some("https://feeds.example/live.json")
        );
        assert_eq!(
            config.feeds.status_url.as_deref(),
            Some("https://feeds.example/status.json")
        );
        assert!(config.feeds.schedule_url.is_none());
        assert_eq!(config.feeds.api_key.as_deref(), Some("k3y"));
        assert_eq!(
            config.feeds.basic_auth,
            Some(("ops".to_string(), "pa:ss".to_string()))
        );
        assert_eq!(config.telemetry_url.as_deref(), Some("https://t.example/events"));
    }

    #[test]
    fn reads_tracker_settings() {
        let config = config(&[
            ("LIVE_STALE_MS", "60000"),
            ("SERVICE_DEFAULT_STATE", "Limited"),
            ("USE_MOCK_FEED", "TRUE"),
            ("MOCK_DATA_DIR", "/srv/fixtures"),
            ("BIND_ADDR", "0.0.0.0:8080"),
        ])
        .unwrap();
        assert_eq!(config.tracker.stale_after_ms, 60_000);
        assert_eq!(config.tracker.default_service_state, ServiceState::Limited);
        assert!(config.use_mock);
        assert_eq!(config.mock_data_dir, PathBuf::from("/srv/fixtures"));
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn rejects_bad_values() {
        let err = config(&[("LIVE_STALE_MS", "soon")]).unwrap_err();
        assert!(err.to_string().starts_with("LIVE_STALE_MS"));

        assert!(config(&[("LIVE_STALE_MS", "-5")]).is_err());
        assert!(config(&[("FEED_BASIC_AUTH", "nocolon")]).is_err());
        assert!(config(&[("USE_MOCK_FEED", "maybe")]).is_err());
        assert!(config(&[("BIND_ADDR", "localhost")]).is_err());
        assert!(matches!(
            config(&[("SERVICE_DEFAULT_STATE", "sometimes")]),
            Err(ConfigError::ServiceState(_))
        ));
    }
}

//! HTTP feed client.
//!
//! Fetches the live, schedule and status feeds from their configured URLs.
//! Handles authentication, request limits and decoding into feed types.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use tokio::sync::Semaphore;
use tracing::debug;

use super::error::FeedError;
use super::types::{LiveFeed, ScheduleDocument, StatusPayload};
use super::{FeedKind, FeedSource};

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Response bodies quoted in errors are cut to this many characters.
const ERROR_BODY_CHARS: usize = 500;

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// Live vehicle/ETA feed URL
    pub live_url: Option<String>,
    /// Schedule feed URL (JSON or timetable text)
    pub schedule_url: Option<String>,
    /// Service status feed URL
    pub status_url: Option<String>,
    /// Sent as `x-api-key` on every request
    pub api_key: Option<String>,
    /// Sent as HTTP basic auth on every request
    pub basic_auth: Option<(String, String)>,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FeedClientConfig {
    fn default() -> Self {
        Self {
            live_url: None,
            schedule_url: None,
            status_url: None,
            api_key: None,
            basic_auth: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 10,
        }
    }
}

impl FeedClientConfig {
    pub fn with_live_url(mut self, url: impl Into<String>) -> Self {
        self.live_url = Some(url.into());
        self
    }

    pub fn with_schedule_url(mut self, url: impl Into<String>) -> Self {
        self.schedule_url = Some(url.into());
        self
    }

    pub fn with_status_url(mut self, url: impl Into<String>) -> Self {
        self.status_url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn url(&self, kind: FeedKind) -> Option<&str> {
        match kind {
            FeedKind::Live => self.live_url.as_deref(),
            FeedKind::Schedule => self.schedule_url.as_deref(),
            FeedKind::Status => self.status_url.as_deref(),
        }
    }
}

/// `Authorization` header value for HTTP basic auth.
fn basic_auth_header(user: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{user}:{password}")))
}

fn invalid_header(what: &str) -> FeedError {
    FeedError::Api {
        status: 0,
        message: format!("Invalid {what} format"),
    }
}

/// HTTP client for the shuttle feeds.
///
/// Uses a semaphore to bound concurrent requests so a burst of manual
/// refreshes cannot pile up on the feed host.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    config: Arc<FeedClientConfig>,
    semaphore: Arc<Semaphore>,
}

impl FeedClient {
    pub fn new(config: FeedClientConfig) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();

        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key).map_err(|_| invalid_header("API key"))?;
            headers.insert(HeaderName::from_static("x-api-key"), value);
        }

        if let Some((user, password)) = &config.basic_auth {
            let mut value = HeaderValue::from_str(&basic_auth_header(user, password))
                .map_err(|_| invalid_header("basic auth"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config: Arc::new(config),
        })
    }

    /// True if a URL is configured for this feed.
    pub fn is_configured(&self, kind: FeedKind) -> bool {
        self.config.url(kind).is_some()
    }

    /// GET a feed and return its body text.
    async fn get_body(&self, kind: FeedKind) -> Result<String, FeedError> {
        let url = self.config.url(kind).ok_or(FeedError::NotConfigured(kind))?;

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FeedError::Api {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        debug!(feed = %kind, url, "fetching feed");
        let response = self
            .http
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FeedError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message: body.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        Ok(response.text().await?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, kind: FeedKind) -> Result<T, FeedError> {
        let body = self.get_body(kind).await?;
        serde_json::from_str(&body).map_err(|e| FeedError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(ERROR_BODY_CHARS).collect()),
        })
    }
}

impl FeedSource for FeedClient {
    async fn fetch_live(&self) -> Result<LiveFeed, FeedError> {
        let mut feed: LiveFeed = self.get_json(FeedKind::Live).await?;
        feed.received_at = Some(Utc::now());
        Ok(feed)
    }

    async fn fetch_schedule(&self) -> Result<ScheduleDocument, FeedError> {
        let body = self.get_body(FeedKind::Schedule).await?;
        ScheduleDocument::from_body(&body).map_err(|e| FeedError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(ERROR_BODY_CHARS).collect()),
        })
    }

    async fn fetch_status(&self) -> Result<StatusPayload, FeedError> {
        self.get_json(FeedKind::Status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = FeedClientConfig::default();
        assert!(config.live_url.is_none());
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn config_builder() {
        let config = FeedClientConfig::default()
            .with_live_url("http://localhost:8080/live")
            .with_status_url("http://localhost:8080/status")
            .with_timeout(3);
        assert_eq!(config.url(FeedKind::Live), Some("http://localhost:8080/live"));
        assert_eq!(config.url(FeedKind::Schedule), None);
        assert_eq!(config.url(FeedKind::Status), Some("http://localhost:8080/status"));
        assert_eq!(config.timeout_secs, 3);
    }

    #[test]
    fn basic_auth_encoding() {
        assert_eq!(
            basic_auth_header("Aladdin", "open sesame"),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn rejects_unprintable_api_key() {
        let result = FeedClient::new(FeedClientConfig::default().with_api_key("bad\nkey"));
        assert!(matches!(result, Err(FeedError::Api { status: 0, .. })));
    }

    #[tokio::test]
    async fn unconfigured_feed_is_an_error() {
        let client = FeedClient::new(FeedClientConfig::default()).unwrap();
        assert!(!client.is_configured(FeedKind::Status));
        let err = client.fetch_status().await.unwrap_err();
        assert!(matches!(err, FeedError::NotConfigured(FeedKind::Status)));
    }
}

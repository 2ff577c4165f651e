//! Feed client error types.

use std::fmt;

use super::FeedKind;

/// Errors from fetching or decoding a feed.
#[derive(Debug)]
pub enum FeedError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// JSON deserialization failed
    Json {
        message: String,
        body: Option<String>,
    },

    /// Feed returned an error status code
    Api { status: u16, message: String },

    /// Rate limited by the feed host
    RateLimited,

    /// Credentials rejected
    Unauthorized,

    /// No URL or fixture for this feed
    NotConfigured(FeedKind),

    /// Reading a local fixture failed
    Io { path: String, message: String },
}

impl FeedError {
    /// Short machine-readable name, used in telemetry payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Http(_) => "http",
            FeedError::Json { .. } => "json",
            FeedError::Api { .. } => "api",
            FeedError::RateLimited => "rate_limited",
            FeedError::Unauthorized => "unauthorized",
            FeedError::NotConfigured(_) => "not_configured",
            FeedError::Io { .. } => "io",
        }
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Http(e) => write!(f, "HTTP error: {e}"),
            FeedError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            FeedError::Api { status, message } => write!(f, "feed error {status}: {message}"),
            FeedError::RateLimited => write!(f, "rate limited by feed host"),
            FeedError::Unauthorized => write!(f, "unauthorized (check feed credentials)"),
            FeedError::NotConfigured(kind) => write!(f, "{kind} feed not configured"),
            FeedError::Io { path, message } => write!(f, "failed to read {path}: {message}"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Http(err)
    }
}

//! Per-feed fetch records.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of the most recent fetch of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    /// Never fetched.
    #[default]
    Idle,
    Success,
    Error,
}

impl FeedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedStatus::Idle => "idle",
            FeedStatus::Success => "success",
            FeedStatus::Error => "error",
        }
    }
}

/// Everything known about one feed.
///
/// A failed fetch keeps the last good `data` (and the `fetched_at` that
/// goes with it); stale data beats no data.
#[derive(Debug)]
pub struct FeedState<T> {
    pub status: FeedStatus,
    pub data: Option<Arc<T>>,
    /// When `data` was fetched.
    pub fetched_at: Option<DateTime<Utc>>,
    /// When the last fetch, successful or not, completed.
    pub attempted_at: Option<DateTime<Utc>>,
    /// Message from the last failed fetch, cleared on success.
    pub error: Option<String>,
}

// Manual impls: `T` itself need not be `Clone` or `Default`.
impl<T> Clone for FeedState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            fetched_at: self.fetched_at,
            attempted_at: self.attempted_at,
            error: self.error.clone(),
        }
    }
}

impl<T> Default for FeedState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> FeedState<T> {
    pub fn idle() -> Self {
        Self {
            status: FeedStatus::Idle,
            data: None,
            fetched_at: None,
            attempted_at: None,
            error: None,
        }
    }

    /// The record after a successful fetch.
    pub fn succeeded(data: T, at: DateTime<Utc>) -> Self {
        Self {
            status: FeedStatus::Success,
            data: Some(Arc::new(data)),
            fetched_at: Some(at),
            attempted_at: Some(at),
            error: None,
        }
    }

    /// The record after a failed fetch, carrying over the previous data.
    pub fn failed(&self, error: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: FeedStatus::Error,
            data: self.data.clone(),
            fetched_at: self.fetched_at,
            attempted_at: Some(at),
            error: Some(error.into()),
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.status == FeedStatus::Success
    }
}

//! Shuttle data feeds.
//!
//! Three independent feeds drive the tracker:
//! - **live**: vehicle positions and per-stop ETAs, refreshed every 30s
//! - **schedule**: the printed timetable, as JSON or tab-separated text
//! - **status**: whether the operator is running the service
//!
//! Any of them can be slow, stale or down at any time. Sources only fetch
//! and decode; deciding what to trust is the tracker's job.

mod client;
mod error;
mod mock;
mod types;

use std::fmt;
use std::future::Future;

pub use client::{FeedClient, FeedClientConfig};
pub use error::FeedError;
pub use mock::MockFeedClient;
pub use types::{
    Incident, LiveEta, LiveFeed, ScheduleDocument, SchedulePayload, StatusPayload,
    parse_timestamp,
};

/// Which feed a request or error concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Live,
    Schedule,
    Status,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Live => "live",
            FeedKind::Schedule => "schedule",
            FeedKind::Status => "status",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can fetch the three feeds.
///
/// Implemented by the HTTP client, the fixture-backed mock, and the caching
/// wrapper in [`crate::cache`].
pub trait FeedSource: Send + Sync + 'static {
    fn fetch_live(&self) -> impl Future<Output = Result<LiveFeed, FeedError>> + Send;

    fn fetch_schedule(&self) -> impl Future<Output = Result<ScheduleDocument, FeedError>> + Send;

    fn fetch_status(&self) -> impl Future<Output = Result<StatusPayload, FeedError>> + Send;
}

//! Mock feed source for running without feed access.
//!
//! Loads fixtures from a directory and serves them as if they were live
//! responses. The expected files are:
//!
//! - `live-etas.json`: a [`LiveFeed`]
//! - `schedule.json`: a [`SchedulePayload`], or instead
//! - `timetable.tsv`: raw timetable text
//! - `status.json`: a [`StatusPayload`]
//!
//! Missing files make the matching fetch fail with
//! [`FeedError::NotConfigured`], which is how a real deployment without
//! that feed behaves.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use super::error::FeedError;
use super::types::{LiveFeed, ScheduleDocument, SchedulePayload, StatusPayload};
use super::{FeedKind, FeedSource};

const LIVE_FILE: &str = "live-etas.json";
const SCHEDULE_FILE: &str = "schedule.json";
const TIMETABLE_FILE: &str = "timetable.tsv";
const STATUS_FILE: &str = "status.json";

#[derive(Debug, Default)]
struct MockData {
    live: Option<LiveFeed>,
    schedule: Option<ScheduleDocument>,
    status: Option<StatusPayload>,
    failing: HashSet<FeedKind>,
}

/// Feed source that serves fixtures from memory.
///
/// Live fixtures are re-stamped with the current time on every fetch so
/// they read as fresh; use [`MockFeedClient::with_fixed_timestamps`] to
/// serve them verbatim.
#[derive(Debug, Clone, Default)]
pub struct MockFeedClient {
    data: Arc<RwLock<MockData>>,
    fixed_timestamps: bool,
}

fn read_fixture(path: &Path) -> Result<Option<String>, FeedError> {
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|e| FeedError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

fn parse_fixture<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, FeedError> {
    let Some(json) = read_fixture(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| FeedError::Json {
            message: format!("{}: {e}", path.display()),
            body: None,
        })
}

impl MockFeedClient {
    /// An empty source: every fetch fails until data is set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load fixtures from a directory.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, FeedError> {
        let data_dir = data_dir.as_ref();
        if !data_dir.is_dir() {
            return Err(FeedError::Io {
                path: data_dir.display().to_string(),
                message: "not a directory".to_string(),
            });
        }

        let live: Option<LiveFeed> = parse_fixture(&data_dir.join(LIVE_FILE))?;
        let status: Option<StatusPayload> = parse_fixture(&data_dir.join(STATUS_FILE))?;
        let schedule = match parse_fixture::<SchedulePayload>(&data_dir.join(SCHEDULE_FILE))? {
            Some(payload) => Some(ScheduleDocument::Payload(payload)),
            None => read_fixture(&data_dir.join(TIMETABLE_FILE))?.map(ScheduleDocument::Timetable),
        };

        if live.is_none() && schedule.is_none() && status.is_none() {
            return Err(FeedError::Io {
                path: data_dir.display().to_string(),
                message: "no fixture files found".to_string(),
            });
        }

        Ok(Self {
            data: Arc::new(RwLock::new(MockData {
                live,
                schedule,
                status,
                failing: HashSet::new(),
            })),
            fixed_timestamps: false,
        })
    }

    /// Serve live fixtures with their own `updatedAt`.
    pub fn with_fixed_timestamps(mut self) -> Self {
        self.fixed_timestamps = true;
        self
    }

    pub async fn set_live(&self, feed: LiveFeed) {
        self.data.write().await.live = Some(feed);
    }

    pub async fn set_schedule(&self, doc: ScheduleDocument) {
        self.data.write().await.schedule = Some(doc);
    }

    pub async fn set_status(&self, status: StatusPayload) {
        self.data.write().await.status = Some(status);
    }

    /// Make fetches of one feed fail (or succeed again).
    pub async fn set_failing(&self, kind: FeedKind, failing: bool) {
        let mut data = self.data.write().await;
        if failing {
            data.failing.insert(kind);
        } else {
            data.failing.remove(&kind);
        }
    }

    async fn serve<T: Clone>(
        &self,
        kind: FeedKind,
        pick: impl FnOnce(&MockData) -> Option<&T>,
    ) -> Result<T, FeedError> {
        let data = self.data.read().await;
        if data.failing.contains(&kind) {
            return Err(FeedError::Api {
                status: 503,
                message: format!("simulated {kind} outage"),
            });
        }
        pick(&data).cloned().ok_or(FeedError::NotConfigured(kind))
    }
}

impl FeedSource for MockFeedClient {
    async fn fetch_live(&self) -> Result<LiveFeed, FeedError> {
        let mut feed = self.serve(FeedKind::Live, |d| d.live.as_ref()).await?;
        let now = Utc::now();
        if !self.fixed_timestamps {
            feed.updated_at = Some(now.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        feed.received_at = Some(now);
        Ok(feed)
    }

    async fn fetch_schedule(&self) -> Result<ScheduleDocument, FeedError> {
        self.serve(FeedKind::Schedule, |d| d.schedule.as_ref()).await
    }

    async fn fetch_status(&self) -> Result<StatusPayload, FeedError> {
        self.serve(FeedKind::Status, |d| d.status.as_ref()).await
    }
}

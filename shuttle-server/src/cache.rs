//! Caching layer in front of a feed source.
//!
//! Feed timers and manual refreshes can ask for the same feed within a few
//! seconds of each other. Successful responses are kept for a short TTL so
//! bursts collapse into one upstream request. Errors are never cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::feeds::{FeedError, FeedKind, FeedSource, LiveFeed, ScheduleDocument, StatusPayload};

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for live responses. Keep well under the staleness window.
    pub live_ttl: Duration,

    /// TTL for schedule responses.
    pub schedule_ttl: Duration,

    /// TTL for status responses.
    pub status_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            live_ttl: Duration::from_secs(5),
            schedule_ttl: Duration::from_secs(300),
            status_ttl: Duration::from_secs(15),
        }
    }
}

impl CacheConfig {
    pub fn with_live_ttl(mut self, ttl: Duration) -> Self {
        self.live_ttl = ttl;
        self
    }
}

fn single_entry<V: Clone + Send + Sync + 'static>(ttl: Duration) -> MokaCache<(), V> {
    MokaCache::builder().time_to_live(ttl).build()
}

/// Feed source wrapper that caches successful responses.
pub struct CachedFeedSource<S> {
    source: S,
    live: MokaCache<(), Arc<LiveFeed>>,
    schedule: MokaCache<(), Arc<ScheduleDocument>>,
    status: MokaCache<(), Arc<StatusPayload>>,
}

impl<S: FeedSource> CachedFeedSource<S> {
    pub fn new(source: S, config: &CacheConfig) -> Self {
        Self {
            source,
            live: single_entry(config.live_ttl),
            schedule: single_entry(config.schedule_ttl),
            status: single_entry(config.status_ttl),
        }
    }

    /// Access the underlying source for fetches that bypass the cache.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Invalidate all cached responses.
    pub fn invalidate_all(&self) {
        self.live.invalidate_all();
        self.schedule.invalidate_all();
        self.status.invalidate_all();
    }
}

/// Serve from `cache` if present, otherwise fetch and remember a success.
async fn cached<T, F>(cache: &MokaCache<(), Arc<T>>, kind: FeedKind, fetch: F) -> Result<T, FeedError>
where
    T: Clone + Send + Sync + 'static,
    F: Future<Output = Result<T, FeedError>>,
{
    if let Some(hit) = cache.get(&()).await {
        debug!(feed = %kind, "feed cache hit");
        return Ok(T::clone(&hit));
    }

    let fresh = fetch.await?;
    cache.insert((), Arc::new(fresh.clone())).await;
    Ok(fresh)
}

impl<S: FeedSource> FeedSource for CachedFeedSource<S> {
    async fn fetch_live(&self) -> Result<LiveFeed, FeedError> {
        cached(&self.live, FeedKind::Live, self.source.fetch_live()).await
    }

    async fn fetch_schedule(&self) -> Result<ScheduleDocument, FeedError> {
        cached(&self.schedule, FeedKind::Schedule, self.source.fetch_schedule()).await
    }

    async fn fetch_status(&self) -> Result<StatusPayload, FeedError> {
        cached(&self.status, FeedKind::Status, self.source.fetch_status()).await
    }
}

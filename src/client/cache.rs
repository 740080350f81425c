use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use super::keys::QueryKey;
use super::FetchError;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Value>, FetchError>>>;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<Value>,
    pub fetched_at: DateTime<Utc>,
    pub stale_time: Duration,
    pub invalidated: bool,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        !self.invalidated && now - self.fetched_at < self.stale_time
    }
}

/// Entries and in-flight fetches live under one lock so that
/// check-entry / join-in-flight / start-fetch is a single step.
#[derive(Default)]
pub(crate) struct CacheState {
    pub(crate) entries: HashMap<QueryKey, CacheEntry>,
    pub(crate) in_flight: HashMap<QueryKey, SharedFetch>,
}

/// Per-session response store. Anyone may read; only fetches write.
pub struct QueryCache {
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
}

impl QueryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.state.lock().await.entries.get(key).cloned()
    }

    pub async fn is_fresh(&self, key: &QueryKey) -> bool {
        let now = self.now();
        self.state
            .lock()
            .await
            .entries
            .get(key)
            .map(|e| e.is_fresh(now))
            .unwrap_or(false)
    }

    pub async fn is_fetching(&self, key: &QueryKey) -> bool {
        self.state.lock().await.in_flight.contains_key(key)
    }

    /// Mark every entry under `prefix` stale; the data stays readable until
    /// the next fetch replaces it. Returns how many entries were touched.
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut state = self.state.lock().await;
        let mut touched = 0;
        for (key, entry) in state.entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                touched += 1;
            }
        }
        touched
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry_at(fetched_at: DateTime<Utc>, stale_minutes: i64) -> CacheEntry {
        CacheEntry {
            value: Arc::new(json!({})),
            fetched_at,
            stale_time: Duration::minutes(stale_minutes),
            invalidated: false,
        }
    }

    #[test]
    fn entry_goes_stale_after_window() {
        let clock = ManualClock::new(Utc::now());
        let entry = entry_at(clock.now(), 5);
        clock.advance(Duration::minutes(4));
        assert!(entry.is_fresh(clock.now()));
        clock.advance(Duration::minutes(1));
        assert!(!entry.is_fresh(clock.now()));
    }

    #[tokio::test]
    async fn invalidate_marks_only_matching_prefix() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = QueryCache::new(clock.clone());
        let movie = QueryKey::root("movies").and("popular").and(1u32);
        let tv = QueryKey::root("tv-shows").and("popular").and(1u32);
        {
            let mut state = cache.lock().await;
            state.entries.insert(movie.clone(), entry_at(clock.now(), 5));
            state.entries.insert(tv.clone(), entry_at(clock.now(), 5));
        }
        assert_eq!(cache.invalidate(&QueryKey::root("movies")).await, 1);
        assert!(!cache.is_fresh(&movie).await);
        assert!(cache.is_fresh(&tv).await);
        assert!(cache.entry(&movie).await.is_some());
    }
}

//! Data-fetch layer in front of the catalog gateway.
//!
//! Every catalog operation is a [`QuerySpec`]: a cache key, the gateway path
//! and query, a staleness window and an enabled flag. [`QueryClient`] runs
//! specs through a shared [`QueryCache`], so identical keys reuse a fresh
//! entry or join the one fetch already in flight. The retrieval shapes in
//! [`observer`] sit on top of the client.

use async_trait::async_trait;
use chrono::Duration;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub mod cache;
pub mod genres;
mod http;
pub mod keys;
pub mod movies;
pub mod observer;
pub mod params;
pub mod search;
pub mod tv;

pub use cache::{CacheEntry, Clock, ManualClock, QueryCache, SystemClock};
pub use http::HttpTransport;
pub use keys::{KeyPart, QueryKey};
pub use observer::{
    InfiniteQuery, InfiniteSnapshot, PageSource, PagedQuery, QueryObserver, QuerySnapshot,
    QueryStatus,
};
pub use params::{DiscoverMovieParams, DiscoverTvParams, SortBy, TimeWindow};

use cache::{CacheState, SharedFetch};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("query is disabled")]
    Disabled,
    #[error("API error: {status}")]
    Status { status: u16, message: Option<String> },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// One GET against the gateway. `path` is relative to the catalog root.
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, FetchError>;
}

/// How long a successful response is served without going back to the
/// network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    List,
    Detail,
    Taxonomy,
}

impl Freshness {
    pub fn stale_time(self) -> Duration {
        match self {
            Freshness::List => Duration::minutes(5),
            Freshness::Detail => Duration::minutes(30),
            Freshness::Taxonomy => Duration::hours(24),
        }
    }
}

/// Request descriptor for one catalog operation, typed by its response.
pub struct QuerySpec<T> {
    key: QueryKey,
    path: String,
    query: Vec<(String, String)>,
    freshness: Freshness,
    enabled: bool,
    _response: PhantomData<fn() -> T>,
}

impl<T> Clone for QuerySpec<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            path: self.path.clone(),
            query: self.query.clone(),
            freshness: self.freshness,
            enabled: self.enabled,
            _response: PhantomData,
        }
    }
}

impl<T> fmt::Debug for QuerySpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpec")
            .field("key", &self.key)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("freshness", &self.freshness)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl<T> QuerySpec<T> {
    pub fn new(key: QueryKey, path: impl Into<String>, freshness: Freshness) -> Self {
        Self {
            key,
            path: path.into(),
            query: Vec::new(),
            freshness,
            enabled: true,
            _response: PhantomData,
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn params(mut self, params: Vec<(String, String)>) -> Self {
        self.query.extend(params);
        self
    }

    pub fn enabled_if(mut self, enabled: bool) -> Self {
        self.enabled = self.enabled && enabled;
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            key: self.key.clone(),
            path: self.path.clone(),
            query: self.query.clone(),
            stale_time: self.freshness.stale_time(),
        }
    }
}

#[derive(Debug, Clone)]
struct Descriptor {
    key: QueryKey,
    path: String,
    query: Vec<(String, String)>,
    stale_time: Duration,
}

/// Outcome of a detail lookup. Any failure reads as absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn CatalogTransport>,
    cache: QueryCache,
}

impl QueryClient {
    pub fn new(transport: Arc<dyn CatalogTransport>) -> Self {
        Self::with_clock(transport, Arc::new(SystemClock))
    }

    pub fn with_clock(transport: Arc<dyn CatalogTransport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                cache: QueryCache::new(clock),
            }),
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    /// Fresh entry: returned with no network call. Stale entry: returned
    /// as-is while a background revalidation runs. Miss: fetched, joining
    /// any in-flight fetch for the same key.
    pub async fn fetch<T: DeserializeOwned>(&self, spec: &QuerySpec<T>) -> Result<T, FetchError> {
        let value = self.fetch_value(spec, false).await?;
        decode(&value)
    }

    /// Skip the freshness check and go to the network, still sharing an
    /// in-flight fetch for the key if there is one.
    pub async fn refetch<T: DeserializeOwned>(
        &self,
        spec: &QuerySpec<T>,
    ) -> Result<T, FetchError> {
        let value = self.fetch_value(spec, true).await?;
        decode(&value)
    }

    /// Last stored value for the spec regardless of freshness.
    pub async fn peek<T: DeserializeOwned>(&self, spec: &QuerySpec<T>) -> Option<T> {
        let entry = self.inner.cache.entry(spec.key()).await?;
        decode(&entry.value).ok()
    }

    pub async fn details_or_not_found<T: DeserializeOwned>(&self, spec: &QuerySpec<T>) -> Lookup<T> {
        match self.fetch(spec).await {
            Ok(record) => Lookup::Found(record),
            Err(e) => {
                debug!(key = %spec.key(), "Treating failed detail fetch as not found: {}", e);
                Lookup::NotFound
            }
        }
    }

    async fn fetch_value<T>(&self, spec: &QuerySpec<T>, force: bool) -> Result<Arc<Value>, FetchError> {
        if !spec.is_enabled() {
            return Err(FetchError::Disabled);
        }

        let pending = {
            let mut state = self.inner.cache.lock().await;
            if !force {
                if let Some(entry) = state.entries.get(spec.key()) {
                    let value = entry.value.clone();
                    if entry.is_fresh(self.inner.cache.now()) {
                        debug!(key = %spec.key(), "Cache hit");
                        return Ok(value);
                    }
                    debug!(key = %spec.key(), "Serving stale entry, revalidating");
                    // Started fetches are spawned, so dropping the handle
                    // does not cancel the revalidation.
                    let _ = self.join_or_start(&mut state, spec.descriptor());
                    return Ok(value);
                }
            }
            self.join_or_start(&mut state, spec.descriptor())
        };
        pending.await
    }

    fn join_or_start(&self, state: &mut CacheState, descriptor: Descriptor) -> SharedFetch {
        if let Some(existing) = state.in_flight.get(&descriptor.key) {
            debug!(key = %descriptor.key, "Joining in-flight fetch");
            return existing.clone();
        }
        let key = descriptor.key.clone();
        let inner = self.inner.clone();
        let fetch = async move { inner.run(descriptor).await }.boxed().shared();
        state.in_flight.insert(key, fetch.clone());
        tokio::spawn(fetch.clone());
        fetch
    }
}

impl Inner {
    async fn run(&self, descriptor: Descriptor) -> Result<Arc<Value>, FetchError> {
        debug!(key = %descriptor.key, path = %descriptor.path, "Fetching from gateway");
        let result = self
            .transport
            .get(&descriptor.path, &descriptor.query)
            .await
            .map(Arc::new);

        let mut state = self.cache.lock().await;
        state.in_flight.remove(&descriptor.key);
        match &result {
            Ok(value) => {
                state.entries.insert(
                    descriptor.key.clone(),
                    CacheEntry {
                        value: value.clone(),
                        fetched_at: self.cache.now(),
                        stale_time: descriptor.stale_time,
                        invalidated: false,
                    },
                );
            }
            Err(e) => warn!(key = %descriptor.key, "Catalog fetch failed: {}", e),
        }
        result
    }
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, FetchError> {
    T::deserialize(value).map_err(|e| FetchError::Decode(e.to_string()))
}

//! Retrieval shapes over [`QueryClient`]: single-shot, paginated and
//! cursor-following. Each tracks `idle -> loading -> success | error` and
//! drops results that arrive after its parameters changed.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::keys::QueryKey;
use super::{FetchError, QueryClient, QuerySpec};
use crate::models::Paged;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
    pub status: QueryStatus,
    pub data: Option<T>,
    pub error: Option<FetchError>,
    /// `data` belongs to the previous parameters and is shown until the
    /// current ones load.
    pub is_placeholder: bool,
}

impl<T> QuerySnapshot<T> {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

struct ObserverState<T> {
    spec: QuerySpec<T>,
    status: QueryStatus,
    data: Option<T>,
    error: Option<FetchError>,
    is_placeholder: bool,
}

impl<T: Clone> ObserverState<T> {
    fn snapshot(&self) -> QuerySnapshot<T> {
        QuerySnapshot {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_placeholder: self.is_placeholder,
        }
    }
}

/// Single-shot retrieval of one spec.
pub struct QueryObserver<T> {
    client: QueryClient,
    keep_previous: bool,
    state: Mutex<ObserverState<T>>,
}

impl<T> QueryObserver<T>
where
    T: DeserializeOwned + Clone + Send,
{
    pub fn new(client: QueryClient, spec: QuerySpec<T>) -> Self {
        Self::build(client, spec, false)
    }

    /// Observer that keeps showing the previous data as a placeholder when
    /// its spec changes.
    pub fn keep_previous(client: QueryClient, spec: QuerySpec<T>) -> Self {
        Self::build(client, spec, true)
    }

    fn build(client: QueryClient, spec: QuerySpec<T>, keep_previous: bool) -> Self {
        Self {
            client,
            keep_previous,
            state: Mutex::new(ObserverState {
                spec,
                status: QueryStatus::Idle,
                data: None,
                error: None,
                is_placeholder: false,
            }),
        }
    }

    pub async fn snapshot(&self) -> QuerySnapshot<T> {
        self.state.lock().await.snapshot()
    }

    pub async fn key(&self) -> QueryKey {
        self.state.lock().await.spec.key().clone()
    }

    /// Fetch through the cache. A disabled spec stays idle.
    pub async fn load(&self) -> QuerySnapshot<T> {
        self.run(false).await
    }

    /// Re-issue the current request verbatim, bypassing freshness.
    pub async fn retry(&self) -> QuerySnapshot<T> {
        self.run(true).await
    }

    /// Swap in new parameters without fetching. A different key resets the
    /// state to idle; the old data is kept as a placeholder only for
    /// observers built with [`QueryObserver::keep_previous`].
    pub async fn set_spec(&self, spec: QuerySpec<T>) {
        let mut state = self.state.lock().await;
        if state.spec.key() == spec.key() && state.spec.is_enabled() == spec.is_enabled() {
            return;
        }
        state.spec = spec;
        state.status = QueryStatus::Idle;
        state.error = None;
        if self.keep_previous && state.data.is_some() {
            state.is_placeholder = true;
        } else {
            state.data = None;
            state.is_placeholder = false;
        }
    }

    async fn run(&self, force: bool) -> QuerySnapshot<T> {
        let spec = {
            let mut state = self.state.lock().await;
            if !state.spec.is_enabled() {
                return state.snapshot();
            }
            state.status = QueryStatus::Loading;
            state.error = None;
            state.spec.clone()
        };

        let result = if force {
            self.client.refetch(&spec).await
        } else {
            self.client.fetch(&spec).await
        };

        let mut state = self.state.lock().await;
        if state.spec.key() != spec.key() {
            debug!(key = %spec.key(), current = %state.spec.key(), "Dropping late result");
            return state.snapshot();
        }
        match result {
            Ok(data) => {
                state.data = Some(data);
                state.status = QueryStatus::Success;
                state.is_placeholder = false;
            }
            Err(e) => {
                if state.is_placeholder {
                    state.data = None;
                    state.is_placeholder = false;
                }
                state.error = Some(e);
                state.status = QueryStatus::Error;
            }
        }
        state.snapshot()
    }
}

/// Builds the spec for any page of a paged operation.
pub struct PageSource<T> {
    key: QueryKey,
    enabled: bool,
    page_spec: Arc<dyn Fn(u32) -> QuerySpec<Paged<T>> + Send + Sync>,
}

impl<T> Clone for PageSource<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            enabled: self.enabled,
            page_spec: self.page_spec.clone(),
        }
    }
}

impl<T> PageSource<T> {
    pub fn new<F>(key: QueryKey, page_spec: F) -> Self
    where
        F: Fn(u32) -> QuerySpec<Paged<T>> + Send + Sync + 'static,
    {
        Self {
            key,
            enabled: true,
            page_spec: Arc::new(page_spec),
        }
    }

    pub fn enabled_if(mut self, enabled: bool) -> Self {
        self.enabled = self.enabled && enabled;
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn spec(&self, page: u32) -> QuerySpec<Paged<T>> {
        (self.page_spec)(page.max(1)).enabled_if(self.enabled)
    }
}

/// Explicit page number; a page change replaces the result, showing the
/// previous page as a placeholder meanwhile.
pub struct PagedQuery<T> {
    source: PageSource<T>,
    page: Mutex<u32>,
    observer: QueryObserver<Paged<T>>,
}

impl<T> PagedQuery<T>
where
    T: DeserializeOwned + Clone + Send,
{
    pub fn new(client: QueryClient, source: PageSource<T>, page: u32) -> Self {
        let page = page.max(1);
        let observer = QueryObserver::keep_previous(client, source.spec(page));
        Self {
            source,
            page: Mutex::new(page),
            observer,
        }
    }

    pub async fn page(&self) -> u32 {
        *self.page.lock().await
    }

    pub async fn load(&self) -> QuerySnapshot<Paged<T>> {
        self.observer.load().await
    }

    pub async fn set_page(&self, page: u32) -> QuerySnapshot<Paged<T>> {
        let page = page.max(1);
        *self.page.lock().await = page;
        self.observer.set_spec(self.source.spec(page)).await;
        self.observer.load().await
    }

    pub async fn retry(&self) -> QuerySnapshot<Paged<T>> {
        self.observer.retry().await
    }

    pub async fn snapshot(&self) -> QuerySnapshot<Paged<T>> {
        self.observer.snapshot().await
    }
}

#[derive(Debug, Clone)]
pub struct InfiniteSnapshot<T> {
    pub status: QueryStatus,
    pub pages: Vec<Paged<T>>,
    pub error: Option<FetchError>,
    pub has_next_page: bool,
}

impl<T: Clone> InfiniteSnapshot<T> {
    pub fn items(&self) -> Vec<T> {
        self.pages
            .iter()
            .flat_map(|p| p.results.iter().cloned())
            .collect()
    }
}

struct InfiniteState<T> {
    source: PageSource<T>,
    pages: Vec<Paged<T>>,
    next_page: Option<u32>,
    status: QueryStatus,
    error: Option<FetchError>,
    /// Cursors up to this page were invalidated and bypass the cache.
    refetch_through: Option<u32>,
}

impl<T: Clone> InfiniteState<T> {
    fn reset(&mut self) {
        self.pages.clear();
        self.next_page = Some(1);
        self.status = QueryStatus::Idle;
        self.error = None;
        self.refetch_through = None;
    }

    fn must_refetch(&self, cursor: u32) -> bool {
        self.refetch_through.is_some_and(|last| cursor <= last)
    }

    fn snapshot(&self) -> InfiniteSnapshot<T> {
        InfiniteSnapshot {
            status: self.status,
            pages: self.pages.clone(),
            error: self.error.clone(),
            has_next_page: self.next_page.is_some(),
        }
    }
}

/// Cursor-following retrieval: pages accumulate in fetch order until the
/// upstream reports the last one.
pub struct InfiniteQuery<T> {
    client: QueryClient,
    state: Mutex<InfiniteState<T>>,
}

impl<T> InfiniteQuery<T>
where
    T: DeserializeOwned + Clone + Send,
{
    pub fn new(client: QueryClient, source: PageSource<T>) -> Self {
        Self {
            client,
            state: Mutex::new(InfiniteState {
                source,
                pages: Vec::new(),
                next_page: Some(1),
                status: QueryStatus::Idle,
                error: None,
                refetch_through: None,
            }),
        }
    }

    pub async fn snapshot(&self) -> InfiniteSnapshot<T> {
        self.state.lock().await.snapshot()
    }

    pub async fn has_next_page(&self) -> bool {
        self.state.lock().await.next_page.is_some()
    }

    /// Fetch the page at the current cursor. Does nothing once the cursor is
    /// exhausted or the source is disabled.
    pub async fn fetch_next_page(&self) -> InfiniteSnapshot<T> {
        self.run(false).await
    }

    /// Re-issue the fetch for the current cursor, bypassing freshness.
    pub async fn retry(&self) -> InfiniteSnapshot<T> {
        self.run(true).await
    }

    /// Keep following the cursor until it is exhausted, a fetch fails, or
    /// `max_pages` more pages have been added.
    pub async fn fetch_all(&self, max_pages: Option<usize>) -> InfiniteSnapshot<T> {
        let mut fetched = 0usize;
        loop {
            if max_pages.is_some_and(|max| fetched >= max) || !self.has_next_page().await {
                return self.snapshot().await;
            }
            let snapshot = self.fetch_next_page().await;
            if snapshot.status != QueryStatus::Success {
                return snapshot;
            }
            fetched += 1;
        }
    }

    /// New parameters start over from page one.
    pub async fn set_source(&self, source: PageSource<T>) {
        let mut state = self.state.lock().await;
        if state.source.key() == source.key() && state.source.is_enabled() == source.is_enabled() {
            return;
        }
        state.source = source;
        state.reset();
    }

    /// Drop accumulated pages and mark their cache entries stale. Following
    /// the cursor again goes back to the network for every dropped page.
    pub async fn invalidate(&self) {
        let keys: Vec<QueryKey> = {
            let mut state = self.state.lock().await;
            let keys = state
                .pages
                .iter()
                .map(|p| state.source.spec(p.page).key().clone())
                .collect();
            let last = state.pages.iter().map(|p| p.page).max();
            state.reset();
            state.refetch_through = last;
            keys
        };
        for key in keys {
            self.client.cache().invalidate(&key).await;
        }
    }

    async fn run(&self, force: bool) -> InfiniteSnapshot<T> {
        let (spec, cursor, source_key, force) = {
            let mut state = self.state.lock().await;
            let Some(cursor) = state.next_page else {
                return state.snapshot();
            };
            if !state.source.is_enabled() {
                return state.snapshot();
            }
            state.status = QueryStatus::Loading;
            state.error = None;
            let force = force || state.must_refetch(cursor);
            (
                state.source.spec(cursor),
                cursor,
                state.source.key().clone(),
                force,
            )
        };

        let result = if force {
            self.client.refetch(&spec).await
        } else {
            self.client.fetch(&spec).await
        };

        let mut state = self.state.lock().await;
        if state.source.key() != &source_key || state.next_page != Some(cursor) {
            debug!(key = %source_key, cursor, "Dropping late page");
            return state.snapshot();
        }
        match result {
            Ok(page) => {
                state.next_page = page.next_page();
                state.pages.push(page);
                state.status = QueryStatus::Success;
            }
            Err(e) => {
                state.error = Some(e);
                state.status = QueryStatus::Error;
            }
        }
        state.snapshot()
    }
}

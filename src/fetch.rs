//! Data-fetch layer.
//!
//! Bridges asynchronous admin-dashboard requests to synchronous-readable
//! state snapshots: [`Fetcher`] for a single resource and
//! [`PaginatedFetcher`] for collection endpoints with page/limit/total
//! state. Both enforce the supersession rule (only the most recently issued
//! request's result is applied, regardless of resolution order) through a
//! generation counter, and cancel in-flight work when the handle is dropped
//! so an unmounted view's state is never touched.
//!
//! Failures never propagate past this layer: they land in
//! [`FetchState::error`] as user-displayable text.

use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ApiClient, Page};
use crate::error::Error;

/// Default page size for paginated fetches.
pub const DEFAULT_LIMIT: u32 = 10;

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// The loading/data/error triple describing one asynchronous request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> FetchState<T> {
    /// Initial state on mount and on every refetch.
    fn started() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }

    fn resolved(data: T) -> Self {
        Self {
            data: Some(data),
            loading: false,
            error: None,
        }
    }

    fn failed(error: &Error) -> Self {
        Self {
            data: None,
            loading: false,
            error: Some(error.user_message()),
        }
    }
}

/// A fetchable resource: request path plus query pairs. Compared by value to
/// decide whether a change triggers a re-fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Page/limit/total state owned by the paginated fetcher.
///
/// Invariants: `total_pages == ceil(total / limit)` and
/// `1 <= page <= max(1, total_pages)` (`page` stays 1 for an empty result
/// set). Mutated only through the fetcher's navigation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            total: 0,
            total_pages: 0,
        }
    }

    /// Recompute the derived fields after `total` or `limit` changed, and
    /// clamp `page` back into range.
    fn recompute(&mut self) {
        let limit = u64::from(self.limit.max(1));
        self.total_pages = u32::try_from(self.total.div_ceil(limit)).unwrap_or(u32::MAX);
        self.page = self.page.clamp(1, self.total_pages.max(1));
    }

    /// Absorb the totals reported by a collection response.
    fn absorb(&mut self, total: u64) {
        self.total = total;
        self.recompute();
    }
}

// ---------------------------------------------------------------------------
// Single-resource fetcher
// ---------------------------------------------------------------------------

struct FetchInner<T> {
    client: Arc<dyn ApiClient>,
    request: Mutex<FetchRequest>,
    state: Mutex<FetchState<T>>,
    // Supersession guard: a result is applied only when the generation still
    // matches the value taken at request start.
    generation: AtomicU64,
    cancel: CancellationToken,
}

/// One hook instance bound to a single resource.
///
/// Constructed per consuming view; dropping it cancels any in-flight
/// request. `state()` is the synchronous snapshot the view reads once per
/// render cycle.
pub struct Fetcher<T> {
    inner: Arc<FetchInner<T>>,
}

impl<T> Fetcher<T>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    /// Inert construction: state starts as loading, no request is issued
    /// until [`refetch`](Self::refetch) or [`set_request`](Self::set_request).
    pub fn new(client: Arc<dyn ApiClient>, request: FetchRequest) -> Self {
        Self {
            inner: Arc::new(FetchInner {
                client,
                request: Mutex::new(request),
                state: Mutex::new(FetchState::started()),
                generation: AtomicU64::new(0),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Construct and immediately issue the initial request on the current
    /// tokio runtime (one request per mount).
    pub fn mount(client: Arc<dyn ApiClient>, request: FetchRequest) -> Self {
        let fetcher = Self::new(client, request);
        tokio::spawn(fetcher.refetch());
        fetcher
    }

    /// Synchronous snapshot of the current state.
    pub fn state(&self) -> FetchState<T> {
        self.inner
            .state
            .lock()
            .map(|st| st.clone())
            .unwrap_or_else(|_| FetchState::started())
    }

    /// Force a new request regardless of whether inputs changed. Resolves to
    /// the data, or `None` on failure, supersession, or cancellation; the
    /// outcome is also applied to [`FetchState`].
    ///
    /// The returned future owns its captures, so it may be spawned and
    /// outlive the handle — cancellation still prevents any state write.
    pub fn refetch(&self) -> impl std::future::Future<Output = Option<T>> + Send + 'static {
        let inner = self.inner.clone();
        async move { run_fetch(&inner).await }
    }

    /// Replace the fetched resource. A value-equal request is a no-op;
    /// otherwise exactly one re-fetch is spawned on the current runtime.
    pub fn set_request(&self, request: FetchRequest) {
        let changed = match self.inner.request.lock() {
            Ok(mut current) => {
                if *current == request {
                    false
                } else {
                    *current = request;
                    true
                }
            }
            Err(_) => false,
        };
        if changed {
            tokio::spawn(self.refetch());
        }
    }
}

impl<T> Drop for Fetcher<T> {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

async fn run_fetch<T>(inner: &FetchInner<T>) -> Option<T>
where
    T: DeserializeOwned + Clone,
{
    let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
    if let Ok(mut st) = inner.state.lock() {
        *st = FetchState::started();
    }
    let request = inner.request.lock().ok()?.clone();

    let result = tokio::select! {
        _ = inner.cancel.cancelled() => return None,
        r = inner.client.get(&request.path, &request.query) => r,
    };
    if inner.cancel.is_cancelled() {
        return None;
    }

    let mut st = inner.state.lock().ok()?;
    if inner.generation.load(Ordering::SeqCst) != generation {
        debug!(path = %request.path, "fetch result superseded, discarding");
        return None;
    }
    match result.and_then(|value| {
        serde_json::from_value::<T>(value).map_err(|e| Error::Decode(e.to_string()))
    }) {
        Ok(data) => {
            *st = FetchState::resolved(data.clone());
            Some(data)
        }
        Err(e) => {
            *st = FetchState::failed(&e);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Paginated fetcher
// ---------------------------------------------------------------------------

struct PaginatedInner<T> {
    client: Arc<dyn ApiClient>,
    path: String,
    filters: Mutex<Vec<(String, String)>>,
    pagination: Mutex<Pagination>,
    state: Mutex<FetchState<Vec<T>>>,
    generation: AtomicU64,
    cancel: CancellationToken,
}

/// Hook instance for a paginated collection endpoint.
///
/// Owns the [`Pagination`] state; views navigate only through
/// [`go_to_page`](Self::go_to_page) and friends. Each accepted navigation
/// issues exactly one request; interleaved navigations serialize by the
/// supersession rule, so the last requested page wins.
pub struct PaginatedFetcher<T> {
    inner: Arc<PaginatedInner<T>>,
}

impl<T> PaginatedFetcher<T>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    pub fn new(client: Arc<dyn ApiClient>, path: impl Into<String>) -> Self {
        Self::with_limit(client, path, DEFAULT_LIMIT)
    }

    pub fn with_limit(client: Arc<dyn ApiClient>, path: impl Into<String>, limit: u32) -> Self {
        Self {
            inner: Arc::new(PaginatedInner {
                client,
                path: path.into(),
                filters: Mutex::new(Vec::new()),
                pagination: Mutex::new(Pagination::new(limit)),
                state: Mutex::new(FetchState::started()),
                generation: AtomicU64::new(0),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Construct and immediately fetch the first page on the current
    /// runtime.
    pub fn mount(client: Arc<dyn ApiClient>, path: impl Into<String>) -> Self {
        let fetcher = Self::new(client, path);
        tokio::spawn(fetcher.refetch());
        fetcher
    }

    pub fn state(&self) -> FetchState<Vec<T>> {
        self.inner
            .state
            .lock()
            .map(|st| st.clone())
            .unwrap_or_else(|_| FetchState::started())
    }

    pub fn pagination(&self) -> Pagination {
        self.inner
            .pagination
            .lock()
            .map(|p| *p)
            .unwrap_or_else(|_| Pagination::new(DEFAULT_LIMIT))
    }

    /// Re-fetch the current page with the current limit and filters.
    pub fn refetch(&self) -> impl std::future::Future<Output = Option<Vec<T>>> + Send + 'static {
        let inner = self.inner.clone();
        async move { run_page_fetch(&inner).await }
    }

    /// Navigate to a page. Out-of-range targets (`page < 1` or
    /// `page > total_pages`) are no-ops and never issue a request; an
    /// in-range target issues exactly one.
    pub async fn go_to_page(&self, page: u32) -> Option<Vec<T>> {
        {
            let mut pagination = self.inner.pagination.lock().ok()?;
            if page < 1 || page > pagination.total_pages {
                debug!(
                    page,
                    total_pages = pagination.total_pages,
                    "page out of range, ignoring navigation"
                );
                return None;
            }
            pagination.page = page;
        }
        run_page_fetch(&self.inner).await
    }

    /// Delegate to `go_to_page(page + 1)`, inheriting its bounds check.
    pub async fn next_page(&self) -> Option<Vec<T>> {
        let page = self.pagination().page;
        self.go_to_page(page + 1).await
    }

    /// Delegate to `go_to_page(page - 1)`, inheriting its bounds check.
    pub async fn prev_page(&self) -> Option<Vec<T>> {
        let page = self.pagination().page;
        self.go_to_page(page.saturating_sub(1)).await
    }

    /// Change the page size: resets to page 1 and issues exactly one
    /// request with the new limit. `limit < 1` is a no-op.
    pub async fn change_limit(&self, limit: u32) -> Option<Vec<T>> {
        if limit < 1 {
            return None;
        }
        {
            let mut pagination = self.inner.pagination.lock().ok()?;
            pagination.limit = limit;
            pagination.page = 1;
            pagination.recompute();
        }
        run_page_fetch(&self.inner).await
    }

    /// Replace the filter query pairs sent with every page request. A
    /// value-equal set is a no-op; a change resets to page 1 and issues one
    /// request.
    pub async fn set_filters(&self, filters: Vec<(String, String)>) -> Option<Vec<T>> {
        {
            let mut current = self.inner.filters.lock().ok()?;
            if *current == filters {
                return None;
            }
            *current = filters;
        }
        if let Ok(mut pagination) = self.inner.pagination.lock() {
            pagination.page = 1;
        }
        run_page_fetch(&self.inner).await
    }
}

impl<T> Drop for PaginatedFetcher<T> {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

async fn run_page_fetch<T>(inner: &PaginatedInner<T>) -> Option<Vec<T>>
where
    T: DeserializeOwned + Clone,
{
    let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
    if let Ok(mut st) = inner.state.lock() {
        *st = FetchState::started();
    }

    let (page, limit) = {
        let pagination = inner.pagination.lock().ok()?;
        (pagination.page, pagination.limit)
    };
    let mut query = vec![
        ("page".to_string(), page.to_string()),
        ("limit".to_string(), limit.to_string()),
    ];
    if let Ok(filters) = inner.filters.lock() {
        query.extend(filters.iter().cloned());
    }

    let result = tokio::select! {
        _ = inner.cancel.cancelled() => return None,
        r = inner.client.get(&inner.path, &query) => r,
    };
    if inner.cancel.is_cancelled() {
        return None;
    }

    let mut st = inner.state.lock().ok()?;
    if inner.generation.load(Ordering::SeqCst) != generation {
        debug!(path = %inner.path, page, "page result superseded, discarding");
        return None;
    }
    match result.and_then(|value| {
        serde_json::from_value::<Page<T>>(value).map_err(|e| Error::Decode(e.to_string()))
    }) {
        Ok(envelope) => {
            if let Ok(mut pagination) = inner.pagination.lock() {
                pagination.absorb(envelope.total);
            }
            *st = FetchState::resolved(envelope.data.clone());
            Some(envelope.data)
        }
        Err(e) => {
            *st = FetchState::failed(&e);
            None
        }
    }
}

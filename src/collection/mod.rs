//! Incremental, offset-paginated, filterable report caches.
//!
//! A [`ReportCollection`] wraps a [`PageSource`] and keeps the reports
//! fetched so far in server order. The `loading` flag is the collection's
//! mutex: a `load` issued while another is outstanding is dropped, never
//! queued, so pages are never applied out of order.
//!
//! Every reset-style request (filter change, forced reload, search) bumps a
//! generation counter. A response whose generation is no longer current is
//! discarded. When a reset arrives while a fetch is in flight, the items are
//! cleared immediately and the in-flight loader re-issues the reset fetch
//! itself once its stale response lands.

pub mod sources;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::ApiFuture;
use crate::models::report::{ReportPatch, ReportStats, ReportStatus, ReportSummary};
use crate::AppError;

/// Parameters of one page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of items already held.
    pub offset: usize,
    /// Page size.
    pub limit: usize,
    /// Active status filter.
    pub filter: Option<ReportStatus>,
    /// Whether this is the first page of a fresh listing.
    pub first_page: bool,
}

/// One fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Items in server order.
    pub items: Vec<ReportSummary>,
    /// Whether more pages exist.
    pub has_more: bool,
    /// Optional queue counters.
    pub stats: Option<ReportStats>,
}

/// Fetch operation a collection is generic over.
pub trait PageSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch one page.
    ///
    /// # Errors
    ///
    /// Propagates transport, authorization, and server errors.
    fn fetch_page(&self, request: PageRequest) -> ApiFuture<'_, Page>;

    /// Run a one-shot, non-paginated search.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for sources without search.
    fn search(&self, _query: String) -> ApiFuture<'_, Vec<ReportSummary>> {
        let name = self.name();
        Box::pin(async move {
            Err(AppError::Validation(format!(
                "search is not available for {name}"
            )))
        })
    }
}

/// How a `load` or `search` call settled.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Results were applied.
    Loaded {
        /// Items received in this response.
        received: usize,
        /// Whether another page exists.
        has_more: bool,
    },
    /// Another fetch was already in flight; nothing was issued.
    Skipped,
    /// The response arrived after a newer request superseded it.
    Discarded,
    /// The fetch failed; existing items were kept.
    Failed(AppError),
}

impl LoadOutcome {
    /// Whether results were applied.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Mutable state of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionState {
    /// Items in server order.
    pub items: Vec<ReportSummary>,
    /// Items fetched so far for the active filter.
    pub offset: usize,
    /// Whether another page exists.
    pub has_more: bool,
    /// A fetch is in flight.
    pub loading: bool,
    /// Active status filter.
    pub filter: Option<ReportStatus>,
    /// A load has completed successfully at least once.
    pub loaded: bool,
    /// Collection-scoped error from the last failed request.
    pub error: Option<String>,
    /// The last failure was an authorization failure.
    pub forbidden: bool,
    /// Latest queue counters.
    pub stats: Option<ReportStats>,
    /// Query whose results are displayed instead of the paged listing.
    pub search: Option<String>,
    generation: u64,
    pending_reset: bool,
}

impl CollectionState {
    fn begin_reset(&mut self) {
        self.generation += 1;
        self.items.clear();
        self.offset = 0;
        self.has_more = false;
        self.search = None;
        self.error = None;
        self.forbidden = false;
    }

    fn record_error(&mut self, err: &AppError) {
        self.forbidden = matches!(err, AppError::Unauthorized(_));
        self.error = Some(err.user_message());
    }
}

/// Paginated report cache over a [`PageSource`].
pub struct ReportCollection<S: PageSource> {
    source: S,
    page_size: usize,
    state: Mutex<CollectionState>,
}

impl<S: PageSource> ReportCollection<S> {
    /// Create an empty collection.
    #[must_use]
    pub fn new(source: S, page_size: usize) -> Self {
        Self {
            source,
            page_size,
            state: Mutex::new(CollectionState::default()),
        }
    }

    /// Underlying page source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Copy of the current state for rendering.
    pub async fn snapshot(&self) -> CollectionState {
        self.state.lock().await.clone()
    }

    /// Whether a load has ever completed successfully.
    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    /// Look up a cached item.
    pub async fn find(&self, id: i64) -> Option<ReportSummary> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    fn page_request(&self, state: &CollectionState, first_page: bool) -> PageRequest {
        PageRequest {
            offset: state.offset,
            limit: self.page_size,
            filter: state.filter,
            first_page,
        }
    }

    /// Fetch the next page, or restart from the first page when `reset`.
    ///
    /// A call made while a fetch is in flight issues nothing and returns
    /// [`LoadOutcome::Skipped`]; a skipped reset still clears the items and
    /// is carried out by the in-flight loader.
    pub async fn load(&self, reset: bool) -> LoadOutcome {
        let name = self.source.name();
        let (mut request, mut generation) = {
            let mut state = self.state.lock().await;
            if state.loading {
                if reset {
                    state.begin_reset();
                    state.pending_reset = true;
                }
                debug!(collection = name, reset, "load skipped: fetch in flight");
                return LoadOutcome::Skipped;
            }
            if !reset && state.search.is_some() {
                debug!(collection = name, "load skipped: search results displayed");
                return LoadOutcome::Skipped;
            }
            if reset {
                state.begin_reset();
            }
            state.loading = true;
            let first_page = reset || state.offset == 0;
            (self.page_request(&state, first_page), state.generation)
        };

        loop {
            let result = self.source.fetch_page(request).await;
            let mut state = self.state.lock().await;

            if state.generation != generation {
                if state.pending_reset {
                    state.pending_reset = false;
                    request = self.page_request(&state, true);
                    generation = state.generation;
                    debug!(collection = name, "stale page dropped, re-issuing reset fetch");
                    continue;
                }
                state.loading = false;
                debug!(collection = name, "stale page discarded");
                return LoadOutcome::Discarded;
            }

            state.loading = false;
            return match result {
                Ok(page) => {
                    let received = page.items.len();
                    state.items.extend(page.items);
                    state.offset += received;
                    state.has_more = page.has_more;
                    state.loaded = true;
                    state.error = None;
                    state.forbidden = false;
                    if page.stats.is_some() {
                        state.stats = page.stats;
                    }
                    info!(
                        collection = name,
                        received,
                        offset = state.offset,
                        has_more = page.has_more,
                        "page loaded"
                    );
                    LoadOutcome::Loaded {
                        received,
                        has_more: page.has_more,
                    }
                }
                Err(err) => {
                    warn!(collection = name, %err, "page load failed");
                    state.record_error(&err);
                    LoadOutcome::Failed(err)
                }
            };
        }
    }

    /// Switch the status filter and reload from the first page.
    pub async fn apply_filter(&self, filter: Option<ReportStatus>) -> LoadOutcome {
        self.state.lock().await.filter = filter;
        self.load(true).await
    }

    /// Replace the items with the full result set for `query`.
    ///
    /// A blank query returns to the paged listing.
    pub async fn search(&self, query: &str) -> LoadOutcome {
        let query = query.trim();
        if query.is_empty() {
            return self.load(true).await;
        }
        let name = self.source.name();
        let (generation, previous) = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.pending_reset = false;
            state.error = None;
            let previous = state.search.replace(query.to_owned());
            (state.generation, previous)
        };

        let result = self.source.search(query.to_owned()).await;
        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(collection = name, query, "stale search result discarded");
            return LoadOutcome::Discarded;
        }

        match result {
            Ok(items) => {
                let received = items.len();
                state.items = items;
                state.offset = 0;
                state.has_more = false;
                info!(collection = name, query, received, "search results applied");
                LoadOutcome::Loaded {
                    received,
                    has_more: false,
                }
            }
            Err(err) => {
                warn!(collection = name, query, %err, "search failed");
                state.search = previous;
                state.record_error(&err);
                LoadOutcome::Failed(err)
            }
        }
    }

    /// Merge `patch` into the cached item with `id`.
    ///
    /// Returns `false` when the item is not cached (scrolled out or filtered
    /// away).
    pub async fn patch(&self, id: i64, patch: &ReportPatch) -> bool {
        let mut state = self.state.lock().await;
        match state.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.apply(patch);
                true
            }
            None => false,
        }
    }
}

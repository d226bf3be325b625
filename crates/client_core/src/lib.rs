use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::protocol::{Page, PageQuery};
use tokio::sync::watch;
use tracing::{debug, warn};

pub mod api_client;
pub mod error;

pub use api_client::{ApiResource, DashboardApi};
pub use error::{FetchError, FetchErrorKind, FetchFailure};

/// Capability for fetching one page of a paginated resource.
///
/// Implementations must surface every failure through `Err` and never
/// panic; the controller treats any `Err` as a normal runtime condition.
#[async_trait]
pub trait ResourceFetcher<T>: Send + Sync {
    async fn fetch_page(&self, query: PageQuery) -> Result<Page<T>, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of a controller's fetch lifecycle.
///
/// Invariants: `items` is non-empty only under `Success`; `error` is
/// `Some` only under `Error`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub phase: FetchPhase,
    pub items: Vec<T>,
    pub error: Option<FetchFailure>,
}

impl<T> FetchState<T> {
    fn idle() -> Self {
        Self {
            phase: FetchPhase::Idle,
            items: Vec::new(),
            error: None,
        }
    }

    fn begin_loading(&mut self) {
        self.phase = FetchPhase::Loading;
        self.items.clear();
        self.error = None;
    }

    fn complete_success(&mut self, items: Vec<T>) {
        self.phase = FetchPhase::Success;
        self.items = items;
        self.error = None;
    }

    fn complete_error(&mut self, failure: FetchFailure) {
        self.phase = FetchPhase::Error;
        self.items.clear();
        self.error = Some(failure);
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, FetchPhase::Success | FetchPhase::Error)
    }
}

/// Owns the lifecycle of "fetch one page of items, expose the snapshot".
///
/// `refresh` supersedes any fetch still in flight: each issued fetch is
/// tagged with a sequence number, and a result is applied only while its
/// tag is still the most recently issued one. Stale results are discarded
/// on arrival, so a slow early response can never overwrite a faster
/// later one.
pub struct ListFetchController<T> {
    fetcher: Arc<dyn ResourceFetcher<T>>,
    query: PageQuery,
    issued: AtomicU64,
    state: watch::Sender<FetchState<T>>,
}

impl<T> std::fmt::Debug for ListFetchController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListFetchController")
            .field("query", &self.query)
            .field("issued", &self.issued)
            .finish_non_exhaustive()
    }
}

impl<T> ListFetchController<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher<T>>,
        query: PageQuery,
    ) -> Result<Arc<Self>, FetchError> {
        if query.page < 1 {
            return Err(FetchError::invalid_query(format!(
                "page must be >= 1, got {}",
                query.page
            )));
        }
        if query.limit < 1 {
            return Err(FetchError::invalid_query(format!(
                "limit must be >= 1, got {}",
                query.limit
            )));
        }

        let (state, _) = watch::channel(FetchState::idle());
        Ok(Arc::new(Self {
            fetcher,
            query,
            issued: AtomicU64::new(0),
            state,
        }))
    }

    /// Starts a fetch and returns immediately. The snapshot transitions to
    /// `Loading` before this returns; completion is applied on the ambient
    /// Tokio runtime. Failures are folded into the snapshot, never thrown.
    pub fn refresh(self: &Arc<Self>) {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(FetchState::begin_loading);
        debug!(
            seq,
            page = self.query.page,
            limit = self.query.limit,
            "issuing page fetch"
        );

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let result = controller.fetcher.fetch_page(controller.query).await;
            controller.apply(seq, result);
        });
    }

    /// Pure read of the latest snapshot.
    pub fn current_state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    /// Change notifications for the presentation layer. Receivers observe
    /// snapshots read-only; stale discards do not notify.
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.subscribe()
    }

    pub fn query(&self) -> PageQuery {
        self.query
    }

    fn apply(&self, seq: u64, result: Result<Page<T>, FetchError>) {
        // The staleness check runs inside the watch mutation closure, so
        // check and apply are atomic with respect to concurrent refreshes.
        let applied = self.state.send_if_modified(|snapshot| {
            if seq != self.issued.load(Ordering::SeqCst) {
                return false;
            }
            match result {
                Ok(page) => snapshot.complete_success(page.docs),
                Err(ref err) => {
                    warn!(seq, error = %err, "page fetch failed");
                    snapshot.complete_error(FetchFailure::from(err));
                }
            }
            true
        });

        if !applied {
            debug!(seq, "discarding stale page response");
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

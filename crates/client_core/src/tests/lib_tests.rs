use super::*;
use std::collections::VecDeque;

use chrono::{TimeZone, Utc};
use shared::domain::PostId;
use shared::protocol::StorySummary;
use tokio::sync::{oneshot, Mutex};
use tokio::time::{sleep, timeout, Duration};

type ScriptedResult = Result<Page<StorySummary>, FetchError>;

// Returns scripted results in call order; an entry with a gate suspends
// until the test releases it, which lets ordering tests hold a fetch in
// flight.
struct ScriptedFetcher {
    script: Mutex<VecDeque<(Option<oneshot::Receiver<()>>, ScriptedResult)>>,
    calls_started: AtomicU64,
}

impl ScriptedFetcher {
    fn new(entries: Vec<(Option<oneshot::Receiver<()>>, ScriptedResult)>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(entries.into()),
            calls_started: AtomicU64::new(0),
        })
    }

    async fn wait_for_calls_started(&self, expected: u64) {
        timeout(Duration::from_secs(2), async {
            while self.calls_started.load(Ordering::SeqCst) < expected {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("scripted fetcher was never invoked");
    }
}

#[async_trait]
impl ResourceFetcher<StorySummary> for ScriptedFetcher {
    async fn fetch_page(&self, _query: PageQuery) -> ScriptedResult {
        let (gate, result) = self
            .script
            .lock()
            .await
            .pop_front()
            .expect("scripted fetcher ran out of entries");
        self.calls_started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result
    }
}

fn story(id: i64, title: &str) -> StorySummary {
    StorySummary {
        post_id: PostId(id),
        title: title.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
        category: None,
        like_count: 0,
        published_at: Utc
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .single()
            .expect("timestamp"),
    }
}

fn page_of(docs: Vec<StorySummary>) -> Page<StorySummary> {
    Page {
        docs,
        page: 1,
        limit: 20,
        has_more: false,
    }
}

fn controller_with(
    fetcher: &Arc<ScriptedFetcher>,
    query: PageQuery,
) -> Result<Arc<ListFetchController<StorySummary>>, FetchError> {
    ListFetchController::new(
        Arc::clone(fetcher) as Arc<dyn ResourceFetcher<StorySummary>>,
        query,
    )
}

async fn refresh_and_settle(
    controller: &Arc<ListFetchController<StorySummary>>,
) -> FetchState<StorySummary> {
    let mut updates = controller.subscribe();
    controller.refresh();
    timeout(Duration::from_secs(2), async {
        loop {
            updates.changed().await.expect("controller dropped");
            if updates.borrow_and_update().is_terminal() {
                break;
            }
        }
    })
    .await
    .expect("fetch did not settle");
    controller.current_state()
}

#[tokio::test]
async fn refresh_transitions_idle_to_loading_to_success() {
    let (release, gate) = oneshot::channel();
    let fetcher = ScriptedFetcher::new(vec![(
        Some(gate),
        Ok(page_of(vec![story(1, "First"), story(2, "Second")])),
    )]);
    let controller = controller_with(&fetcher, PageQuery::new(1, 20)).expect("controller");

    assert_eq!(controller.current_state().phase, FetchPhase::Idle);

    let mut updates = controller.subscribe();
    controller.refresh();

    // The loading transition is synchronous with refresh.
    let snapshot = controller.current_state();
    assert_eq!(snapshot.phase, FetchPhase::Loading);
    assert!(snapshot.items.is_empty());

    release.send(()).expect("release gate");
    timeout(Duration::from_secs(2), async {
        loop {
            updates.changed().await.expect("controller dropped");
            if updates.borrow_and_update().is_terminal() {
                break;
            }
        }
    })
    .await
    .expect("fetch did not settle");

    let snapshot = controller.current_state();
    assert_eq!(snapshot.phase, FetchPhase::Success);
    assert_eq!(
        snapshot.items,
        vec![story(1, "First"), story(2, "Second")]
    );
    assert_eq!(snapshot.error, None);
}

#[tokio::test]
async fn refresh_replaces_items_instead_of_appending() {
    let fetcher = ScriptedFetcher::new(vec![
        (None, Ok(page_of(vec![story(1, "Stale")]))),
        (None, Ok(page_of(vec![story(2, "Fresh"), story(3, "Fresher")]))),
    ]);
    let controller = controller_with(&fetcher, PageQuery::new(1, 20)).expect("controller");

    let first = refresh_and_settle(&controller).await;
    assert_eq!(first.items.len(), 1);

    let second = refresh_and_settle(&controller).await;
    assert_eq!(second.phase, FetchPhase::Success);
    assert_eq!(second.items, vec![story(2, "Fresh"), story(3, "Fresher")]);
}

#[tokio::test]
async fn slow_stale_response_cannot_overwrite_newer_result() {
    let (release_a, gate_a) = oneshot::channel();
    let (release_b, gate_b) = oneshot::channel();
    let fetcher = ScriptedFetcher::new(vec![
        (Some(gate_a), Ok(page_of(vec![story(1, "Superseded")]))),
        (Some(gate_b), Ok(page_of(vec![story(2, "Current")]))),
    ]);
    let controller = controller_with(&fetcher, PageQuery::new(1, 20)).expect("controller");

    controller.refresh();
    fetcher.wait_for_calls_started(1).await;
    controller.refresh();
    fetcher.wait_for_calls_started(2).await;

    // B was issued last but completes first.
    release_b.send(()).expect("release b");
    timeout(Duration::from_secs(2), async {
        while controller.current_state().phase != FetchPhase::Success {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("second fetch did not settle");
    assert_eq!(controller.current_state().items, vec![story(2, "Current")]);

    // A completes afterwards and must be discarded on arrival.
    release_a.send(()).expect("release a");
    sleep(Duration::from_millis(50)).await;

    let snapshot = controller.current_state();
    assert_eq!(snapshot.phase, FetchPhase::Success);
    assert_eq!(snapshot.items, vec![story(2, "Current")]);
}

#[tokio::test]
async fn fetch_error_clears_items_and_records_failure() {
    let fetcher = ScriptedFetcher::new(vec![
        (None, Ok(page_of(vec![story(1, "Shown")]))),
        (None, Err(FetchError::transport(Some(502), "upstream fell over"))),
    ]);
    let controller = controller_with(&fetcher, PageQuery::new(1, 20)).expect("controller");

    let first = refresh_and_settle(&controller).await;
    assert_eq!(first.phase, FetchPhase::Success);

    let second = refresh_and_settle(&controller).await;
    assert_eq!(second.phase, FetchPhase::Error);
    assert!(second.items.is_empty());
    let failure = second.error.expect("failure recorded");
    assert_eq!(failure.kind, FetchErrorKind::Transport);
    assert!(failure.message.contains("upstream fell over"));
}

#[tokio::test]
async fn refresh_after_error_starts_clean() {
    let fetcher = ScriptedFetcher::new(vec![
        (None, Err(FetchError::transport(None, "connection reset"))),
        (None, Ok(page_of(vec![story(4, "Recovered")]))),
    ]);
    let controller = controller_with(&fetcher, PageQuery::new(1, 20)).expect("controller");

    let failed = refresh_and_settle(&controller).await;
    assert_eq!(failed.phase, FetchPhase::Error);

    let recovered = refresh_and_settle(&controller).await;
    assert_eq!(recovered.phase, FetchPhase::Success);
    assert_eq!(recovered.items, vec![story(4, "Recovered")]);
    assert_eq!(recovered.error, None);
}

#[tokio::test]
async fn rejects_zero_page_and_zero_limit_before_any_fetch() {
    let fetcher = ScriptedFetcher::new(Vec::new());

    let err = controller_with(&fetcher, PageQuery::new(0, 20))
        .expect_err("page 0 must be rejected");
    assert!(matches!(err, FetchError::InvalidQuery { .. }));

    let err = controller_with(&fetcher, PageQuery::new(1, 0))
        .expect_err("limit 0 must be rejected");
    assert!(matches!(err, FetchError::InvalidQuery { .. }));

    // Nothing was ever fetched for either rejected query.
    assert_eq!(fetcher.calls_started.load(Ordering::SeqCst), 0);
}

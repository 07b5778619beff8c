//! WorkspaceStore against a scripted backend.
//!
//! The fake ignores cancellation tokens and answers only when the test says
//! so, which lets each test pick the order responses arrive in.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use marketdesk_core::rental::{
    CreateRentalInput, DepositStatus, Rental, RentalMutation, RentalQuery, RentalStatus, RentalWorkspace,
};
use marketdesk_core::types::event_types;
use marketdesk_core::{ListMeta, TimelineEvent};
use marketdesk_sync::{
    BackendMode, DetailPhase, LoadPhase, MutationNotice, NoticeKind, WorkspaceBackend, WorkspaceError,
    WorkspaceEventEmitter, WorkspaceResult, WorkspaceScope, WorkspaceSettings, WorkspaceStore,
};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Scripted Backend
// =============================================================================

type Reply<T> = oneshot::Receiver<WorkspaceResult<T>>;

#[derive(Default)]
struct ScriptedRentals {
    lists: Mutex<VecDeque<Reply<RentalWorkspace>>>,
    details: Mutex<HashMap<String, Reply<Option<Rental>>>>,
    writes: Mutex<VecDeque<Reply<Rental>>>,
    queries: Mutex<Vec<RentalQuery>>,
    list_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl ScriptedRentals {
    /// Queues a list response the test releases later.
    fn pending_list(&self) -> oneshot::Sender<WorkspaceResult<RentalWorkspace>> {
        let (tx, rx) = oneshot::channel();
        self.lists.lock().unwrap().push_back(rx);
        tx
    }

    fn ready_list(&self, result: WorkspaceResult<RentalWorkspace>) {
        let _ = self.pending_list().send(result);
    }

    fn pending_detail(&self, id: &str) -> oneshot::Sender<WorkspaceResult<Option<Rental>>> {
        let (tx, rx) = oneshot::channel();
        self.details.lock().unwrap().insert(id.to_string(), rx);
        tx
    }

    fn pending_write(&self) -> oneshot::Sender<WorkspaceResult<Rental>> {
        let (tx, rx) = oneshot::channel();
        self.writes.lock().unwrap().push_back(rx);
        tx
    }

    fn ready_write(&self, result: WorkspaceResult<Rental>) {
        let _ = self.pending_write().send(result);
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn last_query(&self) -> RentalQuery {
        self.queries.lock().unwrap().last().cloned().expect("no list fetch")
    }
}

#[async_trait]
impl WorkspaceBackend<RentalWorkspace> for ScriptedRentals {
    fn mode(&self) -> BackendMode {
        BackendMode::Remote
    }

    async fn fetch_workspace(&self, query: &RentalQuery, _cancel: &CancellationToken) -> WorkspaceResult<RentalWorkspace> {
        self.queries.lock().unwrap().push(query.clone());
        let reply = self.lists.lock().unwrap().pop_front().expect("unscripted list fetch");
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        reply.await.unwrap_or(Err(WorkspaceError::Cancelled))
    }

    async fn fetch_entity(&self, id: &str, _cancel: &CancellationToken) -> WorkspaceResult<Option<Rental>> {
        let reply = self.details.lock().unwrap().remove(id).expect("unscripted detail fetch");
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        reply.await.unwrap_or(Err(WorkspaceError::Cancelled))
    }

    async fn apply(&self, _mutation: &RentalMutation, _cancel: &CancellationToken) -> WorkspaceResult<Rental> {
        let reply = self.writes.lock().unwrap().pop_front().expect("unscripted write");
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        reply.await.unwrap_or(Err(WorkspaceError::Cancelled))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn rental(id: &str, status: RentalStatus) -> Rental {
    let at = Utc.with_ymd_and_hms(2026, 4, 2, 8, 30, 0).unwrap();
    Rental {
        id: id.to_string(),
        item_id: format!("item-{}", id),
        renter_id: "renter-1".to_string(),
        booking_id: None,
        marketplace_item_id: None,
        quantity: 1,
        status,
        deposit_status: DepositStatus::Pending,
        deposit_cents: 10_000,
        daily_rate_cents: 2_500,
        rental_start: None,
        rental_end: None,
        pickup_at: None,
        returned_at: None,
        notes: None,
        checkpoints: vec![],
        timeline: vec![],
        created_at: at,
        updated_at: at,
    }
}

fn workspace(rentals: Vec<Rental>) -> RentalWorkspace {
    RentalWorkspace {
        meta: ListMeta {
            total: rentals.len() as u32,
            page: None,
            per_page: None,
        },
        rentals,
    }
}

fn ids(store_data: &Option<RentalWorkspace>) -> Vec<String> {
    store_data
        .as_ref()
        .map(|w| w.rentals.iter().map(|r| r.id.clone()).collect())
        .unwrap_or_default()
}

fn setup() -> (Arc<ScriptedRentals>, WorkspaceStore<RentalWorkspace>) {
    let backend = Arc::new(ScriptedRentals::default());
    let store = WorkspaceStore::new(backend.clone(), WorkspaceSettings::default());
    (backend, store)
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    while !done() {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// List Loading
// =============================================================================

#[tokio::test]
async fn test_filter_load_reports_ready() {
    let (backend, store) = setup();
    backend.ready_list(Ok(workspace(vec![
        rental("r1", RentalStatus::Approved),
        rental("r2", RentalStatus::Approved),
        rental("r3", RentalStatus::Approved),
    ])));

    store
        .set_filter(RentalQuery {
            status: Some(RentalStatus::Approved),
            ..RentalQuery::default()
        })
        .await
        .unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(ids(&snapshot.list.data).len(), 3);
    assert!(!snapshot.list.is_loading());
    assert_eq!(snapshot.list.phase, LoadPhase::Ready);
    assert_eq!(backend.last_query().status, Some(RentalStatus::Approved));
    assert_eq!(store.summary().await.map(|s| s.active), Some(3));
}

#[tokio::test]
async fn test_newer_list_fetch_wins() {
    let (backend, store) = setup();
    let first = backend.pending_list();
    let second = backend.pending_list();

    let load_a = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });
    wait_until(|| backend.list_calls() == 1).await;

    let load_b = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });
    wait_until(|| backend.list_calls() == 2).await;

    second.send(Ok(workspace(vec![rental("r2", RentalStatus::Requested)]))).unwrap();
    load_b.await.unwrap().unwrap();

    first.send(Ok(workspace(vec![rental("r1", RentalStatus::Requested)]))).unwrap();
    load_a.await.unwrap().unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(ids(&snapshot.list.data), vec!["r2"]);
    assert_eq!(snapshot.list.phase, LoadPhase::Ready);
}

#[tokio::test]
async fn test_superseded_failure_is_dropped() {
    let (backend, store) = setup();
    let first = backend.pending_list();
    backend.ready_list(Ok(workspace(vec![rental("r2", RentalStatus::Requested)])));

    let load_a = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });
    wait_until(|| backend.list_calls() == 1).await;

    store.load().await.unwrap();

    first
        .send(Err(WorkspaceError::Server {
            status: 500,
            message: "Internal Server Error".to_string(),
            details: None,
        }))
        .unwrap();
    assert!(load_a.await.unwrap().is_ok());

    let snapshot = store.snapshot().await;
    assert!(snapshot.list.error.is_none());
    assert_eq!(ids(&snapshot.list.data), vec!["r2"]);
}

#[tokio::test]
async fn test_load_failure_sets_banner_and_retry_clears_it() {
    let (backend, store) = setup();
    backend.ready_list(Err(WorkspaceError::Server {
        status: 503,
        message: "Service Unavailable".to_string(),
        details: None,
    }));

    let err = store.load().await.unwrap_err();
    assert_eq!(err.status(), Some(503));

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.list.phase, LoadPhase::Errored);
    let banner = snapshot.list.error.expect("banner");
    assert_eq!(banner.message, "Service Unavailable");
    assert!(banner.retryable);

    backend.ready_list(Ok(workspace(vec![rental("r1", RentalStatus::Requested)])));
    store.retry().await.unwrap();

    let snapshot = store.snapshot().await;
    assert!(snapshot.list.error.is_none());
    assert_eq!(snapshot.list.phase, LoadPhase::Ready);
}

#[tokio::test]
async fn test_silent_refresh_failure_keeps_data() {
    let (backend, store) = setup();
    backend.ready_list(Ok(workspace(vec![rental("r1", RentalStatus::Requested)])));
    store.load().await.unwrap();

    backend.ready_list(Err(WorkspaceError::Transport {
        message: "Unable to reach rentals service".to_string(),
        source: "connection refused".into(),
    }));
    store.refresh_silent().await;

    let snapshot = store.snapshot().await;
    assert_eq!(ids(&snapshot.list.data), vec!["r1"]);
    assert_eq!(snapshot.list.phase, LoadPhase::Ready);
    assert_eq!(
        snapshot.list.error.map(|b| b.message),
        Some("Unable to reach rentals service".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_search_is_debounced() {
    let (backend, store) = setup();
    backend.ready_list(Ok(workspace(vec![rental("r1", RentalStatus::Requested)])));

    let early = tokio::spawn({
        let store = store.clone();
        async move { store.set_search("dri").await }
    });
    while store.query().await.search != "dri" {
        tokio::task::yield_now().await;
    }

    store.set_search("drill").await.unwrap();
    early.await.unwrap().unwrap();

    assert_eq!(backend.list_calls(), 1);
    assert_eq!(backend.last_query().search, "drill");
    assert_eq!(store.query().await.search, "drill");
}

#[tokio::test]
async fn test_search_rejects_oversized_text() {
    let (backend, store) = setup();

    let err = store.set_search("x".repeat(500)).await.unwrap_err();
    assert!(matches!(err, WorkspaceError::Validation(_)));
    assert_eq!(backend.list_calls(), 0);
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn test_latest_selection_wins() {
    let (backend, store) = setup();
    let r2 = backend.pending_detail("r2");
    let r1 = backend.pending_detail("r1");

    let select_r2 = tokio::spawn({
        let store = store.clone();
        async move { store.select("r2").await }
    });
    wait_until(|| backend.detail_calls() == 1).await;

    let select_r1 = tokio::spawn({
        let store = store.clone();
        async move { store.select("r1").await }
    });
    wait_until(|| backend.detail_calls() == 2).await;

    r1.send(Ok(Some(rental("r1", RentalStatus::Approved)))).unwrap();
    select_r1.await.unwrap().unwrap();

    r2.send(Ok(Some(rental("r2", RentalStatus::InUse)))).unwrap();
    select_r2.await.unwrap().unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.selected.id.as_deref(), Some("r1"));
    assert_eq!(snapshot.selected.data.map(|r| r.id), Some("r1".to_string()));
    assert_eq!(snapshot.selected.phase, DetailPhase::Ready);
}

#[tokio::test]
async fn test_unknown_selection_is_not_found() {
    let (backend, store) = setup();
    let _ = backend.pending_detail("r-missing").send(Ok(None));

    store.select("r-missing").await.unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.selected.phase, DetailPhase::NotFound);
    assert!(snapshot.selected.data.is_none());
    assert!(snapshot.selected.error.is_none());

    store.clear_selection().await;
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.selected.phase, DetailPhase::Idle);
    assert!(snapshot.selected.id.is_none());
}

// =============================================================================
// Mutations
// =============================================================================

#[tokio::test]
async fn test_invalid_create_makes_no_calls() {
    let (backend, store) = setup();

    let err = store
        .mutate(RentalMutation::Create(CreateRentalInput {
            item_id: String::new(),
            renter_id: "renter-1".to_string(),
            quantity: 1,
            ..CreateRentalInput::default()
        }))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkspaceError::Validation(_)));
    assert_eq!(backend.write_calls(), 0);
    assert_eq!(backend.list_calls(), 0);

    let notice = store.notice().await.expect("notice");
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(!store.snapshot().await.mutation.is_saving());
}

#[tokio::test]
async fn test_disallowed_transition_makes_no_calls() {
    let (backend, store) = setup();
    backend.ready_list(Ok(workspace(vec![rental("r1", RentalStatus::Settled)])));
    store.load().await.unwrap();

    let err = store
        .mutate(RentalMutation::Approve { id: "r1".to_string() })
        .await
        .unwrap_err();

    assert!(matches!(err, WorkspaceError::Policy(_)));
    assert!(err.is_client_side());
    assert_eq!(backend.write_calls(), 0);
    assert_eq!(backend.list_calls(), 1);
}

#[tokio::test]
async fn test_saving_stays_set_while_any_write_is_outstanding() {
    let (backend, store) = setup();
    backend.ready_list(Ok(workspace(vec![
        rental("r1", RentalStatus::Requested),
        rental("r2", RentalStatus::Requested),
    ])));
    store.load().await.unwrap();

    let first = backend.pending_write();
    let second = backend.pending_write();
    let approve = |id: &str| {
        let store = store.clone();
        let id = id.to_string();
        tokio::spawn(async move { store.mutate(RentalMutation::Approve { id }).await })
    };
    let approve_r1 = approve("r1");
    wait_until(|| backend.write_calls() == 1).await;
    let approve_r2 = approve("r2");
    wait_until(|| backend.write_calls() == 2).await;

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.mutation.in_flight, 2);
    assert!(snapshot.mutation.is_saving());

    backend.ready_list(Ok(workspace(vec![
        rental("r1", RentalStatus::Approved),
        rental("r2", RentalStatus::Requested),
    ])));
    let _ = first.send(Ok(rental("r1", RentalStatus::Approved)));
    approve_r1.await.unwrap().unwrap();

    // One write answered, the other still pending.
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.mutation.in_flight, 1);
    assert!(snapshot.mutation.is_saving());

    let _ = second.send(Err(WorkspaceError::Server {
        status: 409,
        message: "Rental already approved".to_string(),
        details: None,
    }));
    approve_r2.await.unwrap().unwrap_err();

    assert!(!store.snapshot().await.mutation.is_saving());
}

#[tokio::test]
async fn test_mutation_merges_then_reconciles() {
    let (backend, store) = setup();
    backend.ready_list(Ok(workspace(vec![
        rental("r1", RentalStatus::Requested),
        rental("r2", RentalStatus::Requested),
    ])));
    store.load().await.unwrap();

    let mut approved = rental("r1", RentalStatus::Approved);
    approved.timeline.push(TimelineEvent::new(
        "evt-9",
        event_types::STATUS_CHANGE,
        "Rental approved",
        Utc.with_ymd_and_hms(2026, 4, 3, 9, 0, 0).unwrap(),
    ));
    backend.ready_write(Ok(approved));
    let refresh = backend.pending_list();

    let mutate = tokio::spawn({
        let store = store.clone();
        async move { store.mutate(RentalMutation::Approve { id: "r1".to_string() }).await }
    });
    wait_until(|| backend.list_calls() == 2).await;

    // Merged before the refresh has answered.
    let snapshot = store.snapshot().await;
    let r1 = snapshot.list.data.as_ref().and_then(|w| w.rentals.iter().find(|r| r.id == "r1")).cloned();
    assert_eq!(r1.as_ref().map(|r| r.status), Some(RentalStatus::Approved));
    assert_eq!(snapshot.list.phase, LoadPhase::Refreshing);

    // Server confirms the status but its list payload omits the timeline.
    let mut listed = rental("r1", RentalStatus::Approved);
    listed.deposit_cents = 12_000;
    refresh
        .send(Ok(workspace(vec![listed, rental("r2", RentalStatus::Requested)])))
        .unwrap();
    mutate.await.unwrap().unwrap();

    let snapshot = store.snapshot().await;
    let r1 = snapshot
        .list
        .data
        .as_ref()
        .and_then(|w| w.rentals.iter().find(|r| r.id == "r1"))
        .cloned()
        .expect("r1");
    assert_eq!(r1.status, RentalStatus::Approved);
    assert_eq!(r1.deposit_cents, 12_000);
    assert_eq!(r1.timeline.len(), 1);
    assert_eq!(snapshot.list.phase, LoadPhase::Ready);

    let notice = store.notice().await.expect("notice");
    assert_eq!(notice.kind, NoticeKind::Success);
    assert_eq!(notice.message, "Rental approved");
}

#[tokio::test]
async fn test_fetch_issued_before_write_cannot_revert_it() {
    let (backend, store) = setup();
    backend.ready_list(Ok(workspace(vec![rental("r1", RentalStatus::Requested)])));
    store.load().await.unwrap();

    let stale = backend.pending_list();
    let stale_load = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });
    wait_until(|| backend.list_calls() == 2).await;

    backend.ready_write(Ok(rental("r1", RentalStatus::Approved)));
    backend.ready_list(Ok(workspace(vec![rental("r1", RentalStatus::Approved)])));
    store
        .mutate(RentalMutation::Approve { id: "r1".to_string() })
        .await
        .unwrap();

    stale
        .send(Ok(workspace(vec![rental("r1", RentalStatus::Requested)])))
        .unwrap();
    stale_load.await.unwrap().unwrap();

    let snapshot = store.snapshot().await;
    let status = snapshot.list.data.and_then(|w| w.rentals.first().map(|r| r.status));
    assert_eq!(status, Some(RentalStatus::Approved));
}

#[tokio::test]
async fn test_server_rejection_keeps_data() {
    let (backend, store) = setup();
    backend.ready_list(Ok(workspace(vec![rental("r1", RentalStatus::Requested)])));
    store.load().await.unwrap();

    backend.ready_write(Err(WorkspaceError::Server {
        status: 409,
        message: "Rental was already approved".to_string(),
        details: None,
    }));
    let err = store
        .mutate(RentalMutation::Approve { id: "r1".to_string() })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));

    let snapshot = store.snapshot().await;
    assert_eq!(
        snapshot.list.data.and_then(|w| w.rentals.first().map(|r| r.status)),
        Some(RentalStatus::Requested)
    );
    assert!(!snapshot.mutation.is_saving());
    assert_eq!(
        snapshot.mutation.notice.map(|n| n.message),
        Some("Rental was already approved".to_string())
    );
    assert_eq!(backend.list_calls(), 1);
}

// =============================================================================
// Emitter
// =============================================================================

#[derive(Default)]
struct RecordingEmitter {
    list: Mutex<Vec<LoadPhase>>,
    notices: Mutex<Vec<String>>,
}

impl WorkspaceEventEmitter for RecordingEmitter {
    fn emit_list(&self, _workspace: &'static str, phase: LoadPhase) {
        self.list.lock().unwrap().push(phase);
    }

    fn emit_selection(&self, _workspace: &'static str, _id: Option<&str>, _phase: DetailPhase) {}

    fn emit_notice(&self, _workspace: &'static str, notice: &MutationNotice) {
        self.notices.lock().unwrap().push(notice.message.clone());
    }
}

#[tokio::test]
async fn test_emitter_sees_phases() {
    let backend = Arc::new(ScriptedRentals::default());
    let emitter = Arc::new(RecordingEmitter::default());
    let store = WorkspaceStore::with_emitter(backend.clone(), WorkspaceSettings::default(), emitter.clone());

    backend.ready_list(Ok(workspace(vec![rental("r1", RentalStatus::Requested)])));
    store.load().await.unwrap();

    assert_eq!(*emitter.list.lock().unwrap(), vec![LoadPhase::Loading, LoadPhase::Ready]);
}

// =============================================================================
// Scope
// =============================================================================

#[tokio::test]
async fn test_scope_lookup() {
    let (_, store) = setup();
    let mut scope = WorkspaceScope::new();
    assert!(scope.is_empty());

    let err = scope.try_get::<RentalWorkspace>().err().expect("not provided");
    assert_eq!(err.to_string(), "RentalWorkspace must be used within its provider");

    scope.provide(store);
    assert!(scope.contains::<RentalWorkspace>());
    assert_eq!(scope.len(), 1);
    assert_eq!(scope.expect::<RentalWorkspace>().mode(), BackendMode::Remote);
}

#[test]
#[should_panic(expected = "RentalWorkspace must be used within its provider")]
fn test_scope_expect_panics_outside_provider() {
    let scope = WorkspaceScope::new();
    let _ = scope.expect::<RentalWorkspace>();
}

//! # Workspace Store
//!
//! The single writer of one workspace snapshot. Everything the console shows
//! for a feature area comes from [`WorkspaceStore::snapshot`], and every
//! change goes through one of the store's actions.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  list                                                                   │
//! │                                                                         │
//! │   Idle ──load──► Loading ──ok──► Ready ──refresh_silent──► Refreshing   │
//! │                     │              ▲                          │  │      │
//! │                     │ err          └───────────ok─────────────┘  │ err  │
//! │                     ▼                                            ▼      │
//! │                  Errored ◄──────────── (no data yet)          Ready +   │
//! │                     │                                         banner    │
//! │                     └──retry──► Loading                     (data kept) │
//! │                                                                         │
//! │  selected (own fetch family)                                            │
//! │                                                                         │
//! │   Idle ──select(id)──► Loading ──► Ready | NotFound | Errored           │
//! │                                                                         │
//! │  mutate(m)                                                              │
//! │                                                                         │
//! │   validate ──✗──► error notice, no request                              │
//! │   policy gate (cached status) ──✗──► error notice, no request           │
//! │   backend.apply ──✗──► error notice, snapshot untouched                 │
//! │        │ ok                                                             │
//! │        ▼                                                                │
//! │   invalidate list fetches → merge outcome → success notice              │
//! │        → refresh_silent (reconcile)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Supersession
//! List and detail fetches each belong to a [`FetchFamily`]. Issuing a
//! fetch cancels the previous one of the same family, and a response is
//! committed only while its generation is still the latest.

use std::sync::Arc;
use std::time::Duration;

use marketdesk_core::validation::validate_search_query;
use marketdesk_core::workspace::{merge_entity, merge_timeline};
use marketdesk_core::{Entity, ListQuery, Mutation, Workspace};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{BackendMode, WorkspaceBackend};
use crate::config::WorkspaceSettings;
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::family::FetchFamily;

// =============================================================================
// Phases
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Background refetch; data stays on screen.
    Refreshing,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    /// The backend does not know the selected id.
    NotFound,
    Errored,
}

// =============================================================================
// State
// =============================================================================

/// Persistent error shown above a list or detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    pub message: String,
    pub retryable: bool,
}

impl ErrorBanner {
    pub fn from_error(err: &WorkspaceError) -> Self {
        ErrorBanner {
            message: err.user_message(),
            retryable: err.is_retryable(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListState<W> {
    pub phase: LoadPhase,
    pub data: Option<W>,
    pub error: Option<ErrorBanner>,
}

impl<W> Default for ListState<W> {
    fn default() -> Self {
        ListState {
            phase: LoadPhase::Idle,
            data: None,
            error: None,
        }
    }
}

impl<W> ListState<W> {
    /// True only for a foreground load; silent refreshes do not count.
    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }
}

#[derive(Debug, Clone)]
pub struct SelectedState<E> {
    pub id: Option<String>,
    pub phase: DetailPhase,
    pub data: Option<E>,
    pub error: Option<ErrorBanner>,
}

impl<E> Default for SelectedState<E> {
    fn default() -> Self {
        SelectedState {
            id: None,
            phase: DetailPhase::Idle,
            data: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Short-lived status message next to the acting form.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationNotice {
    pub kind: NoticeKind,
    pub message: String,
    pub at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct MutationState {
    /// Writes sent and not yet answered.
    pub in_flight: u32,
    pub notice: Option<MutationNotice>,
}

impl MutationState {
    /// True while any write is outstanding.
    pub fn is_saving(&self) -> bool {
        self.in_flight > 0
    }

    /// The notice, unless it is older than `ttl`.
    pub fn visible_notice(&self, now: Instant, ttl: Duration) -> Option<&MutationNotice> {
        self.notice
            .as_ref()
            .filter(|notice| now.saturating_duration_since(notice.at) < ttl)
    }
}

/// Everything a workspace panel renders from.
#[derive(Debug, Clone)]
pub struct WorkspaceState<W: Workspace> {
    pub list: ListState<W>,
    pub selected: SelectedState<W::Entity>,
    pub mutation: MutationState,
    pub query: W::Query,
}

impl<W: Workspace> Default for WorkspaceState<W> {
    fn default() -> Self {
        WorkspaceState {
            list: ListState::default(),
            selected: SelectedState::default(),
            mutation: MutationState::default(),
            query: W::Query::default(),
        }
    }
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Observer of store changes (UI bridge, logging, tests).
pub trait WorkspaceEventEmitter: Send + Sync {
    fn emit_list(&self, workspace: &'static str, phase: LoadPhase);

    fn emit_selection(&self, workspace: &'static str, id: Option<&str>, phase: DetailPhase);

    fn emit_notice(&self, workspace: &'static str, notice: &MutationNotice);
}

/// No-op emitter for headless use.
pub struct NoOpEmitter;

impl WorkspaceEventEmitter for NoOpEmitter {
    fn emit_list(&self, _workspace: &'static str, _phase: LoadPhase) {}
    fn emit_selection(&self, _workspace: &'static str, _id: Option<&str>, _phase: DetailPhase) {}
    fn emit_notice(&self, _workspace: &'static str, _notice: &MutationNotice) {}
}

// =============================================================================
// Workspace Store
// =============================================================================

/// Owner of one workspace snapshot.
///
/// Cloning is cheap and every clone drives the same snapshot.
pub struct WorkspaceStore<W: Workspace> {
    state: Arc<RwLock<WorkspaceState<W>>>,

    backend: Arc<dyn WorkspaceBackend<W>>,

    emitter: Arc<dyn WorkspaceEventEmitter>,

    list_family: Arc<FetchFamily>,

    detail_family: Arc<FetchFamily>,

    /// Pending debounced searches.
    search_family: Arc<FetchFamily>,

    settings: WorkspaceSettings,
}

impl<W: Workspace> Clone for WorkspaceStore<W> {
    fn clone(&self) -> Self {
        WorkspaceStore {
            state: Arc::clone(&self.state),
            backend: Arc::clone(&self.backend),
            emitter: Arc::clone(&self.emitter),
            list_family: Arc::clone(&self.list_family),
            detail_family: Arc::clone(&self.detail_family),
            search_family: Arc::clone(&self.search_family),
            settings: self.settings.clone(),
        }
    }
}

impl<W: Workspace> WorkspaceStore<W> {
    pub fn new(backend: Arc<dyn WorkspaceBackend<W>>, settings: WorkspaceSettings) -> Self {
        Self::with_emitter(backend, settings, Arc::new(NoOpEmitter))
    }

    pub fn with_emitter(
        backend: Arc<dyn WorkspaceBackend<W>>,
        settings: WorkspaceSettings,
        emitter: Arc<dyn WorkspaceEventEmitter>,
    ) -> Self {
        info!(workspace = W::NAME, mode = %backend.mode(), "Workspace store created");

        WorkspaceStore {
            state: Arc::new(RwLock::new(WorkspaceState::default())),
            backend,
            emitter,
            list_family: Arc::new(FetchFamily::new("list")),
            detail_family: Arc::new(FetchFamily::new("detail")),
            search_family: Arc::new(FetchFamily::new("search")),
            settings,
        }
    }

    pub fn mode(&self) -> BackendMode {
        self.backend.mode()
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    /// Clone of the current state.
    pub async fn snapshot(&self) -> WorkspaceState<W> {
        self.state.read().await.clone()
    }

    /// Summary of the loaded data, recomputed on every call.
    pub async fn summary(&self) -> Option<W::Summary> {
        self.state.read().await.list.data.as_ref().map(Workspace::summary)
    }

    pub async fn query(&self) -> W::Query {
        self.state.read().await.query.clone()
    }

    /// The mutation notice if it has not expired yet.
    pub async fn notice(&self) -> Option<MutationNotice> {
        let ttl = Duration::from_millis(self.settings.notice_ttl_ms);
        self.state
            .read()
            .await
            .mutation
            .visible_notice(Instant::now(), ttl)
            .cloned()
    }

    // =========================================================================
    // List Actions
    // =========================================================================

    /// Foreground fetch of the whole workspace. Supersedes in-flight list
    /// fetches. A superseded load returns `Ok(())` without touching state.
    pub async fn load(&self) -> WorkspaceResult<()> {
        let ticket = self.list_family.begin();

        let query = {
            let mut state = self.state.write().await;
            state.list.phase = LoadPhase::Loading;
            state.list.error = None;
            state.query.clone()
        };
        self.emitter.emit_list(W::NAME, LoadPhase::Loading);
        debug!(workspace = W::NAME, generation = ticket.generation, ?query, "Loading workspace");

        let result = self.backend.fetch_workspace(&query, &ticket.token).await;
        self.commit_list(ticket.generation, result, false).await
    }

    /// Background refetch that never blanks what is on screen.
    ///
    /// Failures land in the list banner; the data stays.
    pub async fn refresh_silent(&self) {
        let ticket = self.list_family.begin();

        let query = {
            let mut state = self.state.write().await;
            state.list.phase = if state.list.data.is_some() {
                LoadPhase::Refreshing
            } else {
                LoadPhase::Loading
            };
            state.query.clone()
        };
        debug!(workspace = W::NAME, generation = ticket.generation, "Silent refresh");

        let result = self.backend.fetch_workspace(&query, &ticket.token).await;
        if let Err(e) = self.commit_list(ticket.generation, result, true).await {
            warn!(workspace = W::NAME, error = %e, "Silent refresh failed; keeping stale data");
        }
    }

    /// Clears the banner and loads again.
    pub async fn retry(&self) -> WorkspaceResult<()> {
        self.dismiss_error().await;
        self.load().await
    }

    pub async fn dismiss_error(&self) {
        let mut state = self.state.write().await;
        state.list.error = None;
        if state.list.phase == LoadPhase::Errored && state.list.data.is_some() {
            state.list.phase = LoadPhase::Ready;
        }
    }

    /// Replaces the filters and reloads.
    pub async fn set_filter(&self, query: W::Query) -> WorkspaceResult<()> {
        self.state.write().await.query = query;
        self.load().await
    }

    /// Stores the search text and reloads once typing pauses.
    ///
    /// A later call within the debounce window cancels this one, which then
    /// returns `Ok(())` without fetching.
    pub async fn set_search(&self, text: impl Into<String>) -> WorkspaceResult<()> {
        let text = text.into();
        validate_search_query(&text)?;

        let ticket = self.search_family.begin();
        self.state.write().await.query.set_search(text);

        let debounce = Duration::from_millis(self.settings.search_debounce_ms);
        tokio::select! {
            _ = ticket.token.cancelled() => return Ok(()),
            _ = tokio::time::sleep(debounce) => {}
        }

        if !self.search_family.is_current(ticket.generation) {
            return Ok(());
        }
        self.load().await
    }

    async fn commit_list(&self, generation: u64, result: WorkspaceResult<W>, silent: bool) -> WorkspaceResult<()> {
        let mut state = self.state.write().await;

        if !self.list_family.is_current(generation) {
            debug!(workspace = W::NAME, generation, "Dropping superseded list response");
            return Ok(());
        }

        match result {
            Ok(mut workspace) => {
                if let Some(previous) = state.list.data.as_ref() {
                    carry_timelines(previous, &mut workspace);
                }
                reconcile_selected(&mut state.selected, &workspace);

                debug!(
                    workspace = W::NAME,
                    count = workspace.entities().len(),
                    silent,
                    "Workspace loaded"
                );
                state.list.data = Some(workspace);
                state.list.phase = LoadPhase::Ready;
                state.list.error = None;
                drop(state);

                self.emitter.emit_list(W::NAME, LoadPhase::Ready);
                Ok(())
            }
            Err(e) if e.is_cancellation() => Ok(()),
            Err(e) => {
                state.list.error = Some(ErrorBanner::from_error(&e));
                state.list.phase = if silent && state.list.data.is_some() {
                    LoadPhase::Ready
                } else {
                    LoadPhase::Errored
                };
                let phase = state.list.phase;
                drop(state);

                warn!(workspace = W::NAME, error = %e, silent, "Workspace load failed");
                self.emitter.emit_list(W::NAME, phase);
                Err(e)
            }
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Fetches one entity into the detail slot. Supersedes in-flight detail
    /// fetches.
    pub async fn select(&self, id: impl Into<String>) -> WorkspaceResult<()> {
        let id = id.into();
        let ticket = self.detail_family.begin();

        {
            let mut state = self.state.write().await;
            let same = state.selected.id.as_deref() == Some(id.as_str());
            state.selected.id = Some(id.clone());
            state.selected.phase = DetailPhase::Loading;
            state.selected.error = None;
            if !same {
                state.selected.data = None;
            }
        }
        self.emitter.emit_selection(W::NAME, Some(&id), DetailPhase::Loading);

        let result = self.backend.fetch_entity(&id, &ticket.token).await;

        let mut state = self.state.write().await;
        if !self.detail_family.is_current(ticket.generation) {
            debug!(workspace = W::NAME, id = %id, "Dropping superseded detail response");
            return Ok(());
        }

        let outcome = match result {
            Ok(Some(entity)) => {
                state.selected.data = Some(match state.selected.data.take() {
                    Some(current) => merge_entity(&current, entity),
                    None => entity,
                });
                state.selected.phase = DetailPhase::Ready;
                Ok(())
            }
            Ok(None) => {
                debug!(workspace = W::NAME, id = %id, "Selected entity not found");
                state.selected.data = None;
                state.selected.phase = DetailPhase::NotFound;
                Ok(())
            }
            Err(e) if e.is_cancellation() => return Ok(()),
            Err(e) => {
                warn!(workspace = W::NAME, id = %id, error = %e, "Detail load failed");
                state.selected.error = Some(ErrorBanner::from_error(&e));
                state.selected.phase = DetailPhase::Errored;
                Err(e)
            }
        };
        let phase = state.selected.phase;
        drop(state);

        self.emitter.emit_selection(W::NAME, Some(&id), phase);
        outcome
    }

    pub async fn clear_selection(&self) {
        self.detail_family.invalidate();
        self.state.write().await.selected = SelectedState::default();
        self.emitter.emit_selection(W::NAME, None, DetailPhase::Idle);
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Runs a write: gate, apply, merge, reconcile.
    pub async fn mutate(&self, mutation: W::Mutation) -> WorkspaceResult<W::Outcome> {
        let label = mutation.label();

        if let Err(e) = self.gate(&mutation).await {
            debug!(workspace = W::NAME, action = label, error = %e, "Mutation rejected locally");
            self.set_notice(NoticeKind::Error, e.user_message()).await;
            return Err(e);
        }

        self.state.write().await.mutation.in_flight += 1;
        info!(workspace = W::NAME, action = label, target = ?mutation.target_id(), "Applying mutation");

        let result = self.backend.apply(&mutation, &CancellationToken::new()).await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(workspace = W::NAME, action = label, error = %e, "Mutation failed");
                self.finish_write().await;
                self.set_notice(NoticeKind::Error, e.user_message()).await;
                return Err(e);
            }
        };

        // Responses to fetches issued before the write would revert it.
        self.list_family.invalidate();

        {
            let mut state = self.state.write().await;
            if let Some(data) = state.list.data.as_mut() {
                data.merge_outcome(&outcome);
            }
            if let Some(entity) = W::outcome_entity(&outcome) {
                if state.selected.id.as_deref() == Some(entity.id()) {
                    state.selected.data = Some(match state.selected.data.take() {
                        Some(current) => merge_entity(&current, entity.clone()),
                        None => entity.clone(),
                    });
                    state.selected.phase = DetailPhase::Ready;
                    state.selected.error = None;
                }
            }
            state.mutation.in_flight = state.mutation.in_flight.saturating_sub(1);
        }
        self.set_notice(NoticeKind::Success, mutation.success_message().to_string()).await;

        self.refresh_silent().await;
        Ok(outcome)
    }

    async fn finish_write(&self) {
        let mut state = self.state.write().await;
        state.mutation.in_flight = state.mutation.in_flight.saturating_sub(1);
    }

    pub async fn clear_notice(&self) {
        self.state.write().await.mutation.notice = None;
    }

    /// Input validation, then the status policy against the cached entity.
    async fn gate(&self, mutation: &W::Mutation) -> WorkspaceResult<()> {
        mutation.validate()?;

        let Some(id) = mutation.target_id() else {
            return Ok(());
        };

        let state = self.state.read().await;
        let cached = state
            .selected
            .data
            .as_ref()
            .filter(|e| e.id() == id)
            .or_else(|| state.list.data.as_ref().and_then(|w| w.find(id)));

        match cached {
            Some(entity) => W::check_transition(entity, mutation).map_err(WorkspaceError::from),
            None => Ok(()),
        }
    }

    async fn set_notice(&self, kind: NoticeKind, message: String) {
        let notice = MutationNotice {
            kind,
            message,
            at: Instant::now(),
        };
        self.emitter.emit_notice(W::NAME, &notice);
        self.state.write().await.mutation.notice = Some(notice);
    }
}

// =============================================================================
// Reconciliation Helpers
// =============================================================================

/// Keeps timeline events the previous snapshot already had.
fn carry_timelines<W: Workspace>(previous: &W, next: &mut W) {
    for entity in next.entities_mut() {
        if let Some(prior) = previous.find(entity.id()) {
            let timeline = merge_timeline(prior.timeline(), entity.timeline());
            *entity.timeline_mut() = timeline;
        }
    }
}

/// Folds a refreshed list entity into the selected one.
fn reconcile_selected<W: Workspace>(selected: &mut SelectedState<W::Entity>, workspace: &W) {
    if selected.phase != DetailPhase::Ready {
        return;
    }
    let Some(id) = selected.id.as_deref() else {
        return;
    };
    if let Some(fresh) = workspace.find(id) {
        selected.data = Some(match selected.data.take() {
            Some(current) => merge_entity(&current, fresh.clone()),
            None => fresh.clone(),
        });
    }
}

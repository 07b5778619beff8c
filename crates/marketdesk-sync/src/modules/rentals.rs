//! # Rentals
//!
//! Backends of the rentals workspace (`/api/admin/rentals`).
//!
//! ## Endpoints
//! ```text
//! GET    /api/admin/rentals?status=&search=       { data: Rental[], meta }
//! GET    /api/admin/rentals/:id                   { data: Rental }
//! POST   /api/admin/rentals                       create
//! PATCH  /api/admin/rentals/:id                   partial update
//! POST   /api/admin/rentals/:id/approve
//!                          /schedule-pickup       { pickupAt }
//!                          /checkout
//!                          /return                { returnedAt?, notes? }
//!                          /inspection            { outcome, notes? }
//!                          /cancel                { reason? }
//!                          /checkpoints           { kind, notes? }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use marketdesk_core::lifecycle::Lifecycle;
use marketdesk_core::rental::{
    CheckpointKind, CreateRentalInput, DepositStatus, InspectionOutcome, Rental, RentalCheckpoint,
    RentalMutation, RentalQuery, RentalStatus, RentalWorkspace,
};
use marketdesk_core::types::event_types;
use marketdesk_core::{CoreError, ListMeta, ListQuery, Mutation, QueryParams, TimelineEvent, Workspace};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ApiClient, ApiPath, Envelope};
use crate::backend::{not_found_as_none, BackendMode, WorkspaceBackend};
use crate::config::ConsoleConfig;
use crate::demo::{demo_event, demo_id, matches_search, not_found, rejection, DemoLatency};
use crate::error::WorkspaceResult;
use crate::store::WorkspaceStore;

use super::select_backend;

pub const ROOT: &str = "/api/admin/rentals";
pub const SERVICE: &str = "rentals";

/// Demo deposit charged per rented unit.
const DEMO_DEPOSIT_PER_UNIT_CENTS: i64 = 5_000;
const DEMO_DAILY_RATE_CENTS: i64 = 2_500;

/// Remote or demo backend, depending on the demo gate.
pub fn backend(config: &ConsoleConfig) -> WorkspaceResult<Arc<dyn WorkspaceBackend<RentalWorkspace>>> {
    select_backend(
        config,
        SERVICE,
        |api| Arc::new(RemoteRentalBackend::new(api)),
        |latency| Arc::new(DemoRentalBackend::new(latency)),
    )
}

pub fn store(config: &ConsoleConfig) -> WorkspaceResult<WorkspaceStore<RentalWorkspace>> {
    Ok(WorkspaceStore::new(backend(config)?, config.workspace.clone()))
}

// =============================================================================
// Remote Backend
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SchedulePickupBody<'a> {
    pickup_at: &'a DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReturnBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    returned_at: Option<&'a DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Serialize)]
struct InspectionBody<'a> {
    outcome: InspectionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Serialize)]
struct CancelBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

/// Rentals over REST.
pub struct RemoteRentalBackend {
    api: ApiClient,
}

impl RemoteRentalBackend {
    pub fn new(api: ApiClient) -> Self {
        RemoteRentalBackend { api }
    }

    fn action_path(id: &str, action: &str) -> ApiPath {
        ApiPath::new(ROOT).segment(id).segment(action)
    }
}

#[async_trait]
impl WorkspaceBackend<RentalWorkspace> for RemoteRentalBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Remote
    }

    async fn fetch_workspace(&self, query: &RentalQuery, cancel: &CancellationToken) -> WorkspaceResult<RentalWorkspace> {
        let body = self.api.get(ROOT, &query.to_params(), cancel).await?;
        let envelope: Envelope<Vec<Rental>> = self.api.envelope(body)?;
        let meta = envelope.meta_or_total(envelope.data.len());

        Ok(RentalWorkspace {
            rentals: envelope.data,
            meta,
        })
    }

    async fn fetch_entity(&self, id: &str, cancel: &CancellationToken) -> WorkspaceResult<Option<Rental>> {
        let path = ApiPath::new(ROOT).segment(id);
        match not_found_as_none(self.api.get(path, &QueryParams::new(), cancel).await)? {
            Some(body) => Ok(Some(self.api.data(body)?)),
            None => Ok(None),
        }
    }

    async fn apply(&self, mutation: &RentalMutation, cancel: &CancellationToken) -> WorkspaceResult<Rental> {
        let api = &self.api;
        let body = match mutation {
            RentalMutation::Create(input) => api.post(ROOT, Some(input), cancel).await?,
            RentalMutation::Update { id, input } => api.patch(ApiPath::new(ROOT).segment(id), Some(input), cancel).await?,
            RentalMutation::Approve { id } | RentalMutation::Checkout { id } => {
                api.post::<()>(Self::action_path(id, mutation.label()), None, cancel).await?
            }
            RentalMutation::SchedulePickup { id, pickup_at } => {
                let body = SchedulePickupBody { pickup_at };
                api.post(Self::action_path(id, mutation.label()), Some(&body), cancel).await?
            }
            RentalMutation::Return { id, returned_at, notes } => {
                let body = ReturnBody {
                    returned_at: returned_at.as_ref(),
                    notes: notes.as_deref(),
                };
                api.post(Self::action_path(id, mutation.label()), Some(&body), cancel).await?
            }
            RentalMutation::Inspect { id, outcome, notes } => {
                let body = InspectionBody {
                    outcome: *outcome,
                    notes: notes.as_deref(),
                };
                api.post(Self::action_path(id, mutation.label()), Some(&body), cancel).await?
            }
            RentalMutation::Cancel { id, reason } => {
                let body = CancelBody {
                    reason: reason.as_deref(),
                };
                api.post(Self::action_path(id, mutation.label()), Some(&body), cancel).await?
            }
            RentalMutation::AddCheckpoint { id, input } => {
                api.post(Self::action_path(id, mutation.label()), Some(input), cancel).await?
            }
        };

        api.data(body)
    }
}

// =============================================================================
// Demo Backend
// =============================================================================

/// Rentals over an in-memory fixture set.
pub struct DemoRentalBackend {
    rentals: Mutex<Vec<Rental>>,
    latency: DemoLatency,
}

impl DemoRentalBackend {
    pub fn new(latency: DemoLatency) -> Self {
        Self::with_fixtures(seed_rentals(Utc::now()), latency)
    }

    pub fn with_fixtures(rentals: Vec<Rental>, latency: DemoLatency) -> Self {
        DemoRentalBackend {
            rentals: Mutex::new(rentals),
            latency,
        }
    }
}

#[async_trait]
impl WorkspaceBackend<RentalWorkspace> for DemoRentalBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Demo
    }

    async fn fetch_workspace(&self, query: &RentalQuery, cancel: &CancellationToken) -> WorkspaceResult<RentalWorkspace> {
        self.latency.pause_or_cancel(cancel).await?;

        let rentals: Vec<Rental> = self
            .rentals
            .lock()
            .await
            .iter()
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .filter(|r| {
                matches_search(
                    query.search(),
                    [
                        r.id.as_str(),
                        r.item_id.as_str(),
                        r.renter_id.as_str(),
                        r.notes.as_deref().unwrap_or(""),
                    ],
                )
            })
            .cloned()
            .collect();

        Ok(RentalWorkspace {
            meta: ListMeta {
                total: rentals.len() as u32,
                page: Some(1),
                per_page: None,
            },
            rentals,
        })
    }

    async fn fetch_entity(&self, id: &str, cancel: &CancellationToken) -> WorkspaceResult<Option<Rental>> {
        self.latency.pause_or_cancel(cancel).await?;
        Ok(self.rentals.lock().await.iter().find(|r| r.id == id).cloned())
    }

    async fn apply(&self, mutation: &RentalMutation, cancel: &CancellationToken) -> WorkspaceResult<Rental> {
        self.latency.pause_or_cancel(cancel).await?;
        mutation.validate().map_err(|e| rejection(CoreError::Validation(e)))?;

        let now = Utc::now();
        let mut rentals = self.rentals.lock().await;

        if let RentalMutation::Create(input) = mutation {
            let rental = new_rental(input, now);
            debug!(id = %rental.id, "Demo rental created");
            rentals.insert(0, rental.clone());
            return Ok(rental);
        }

        let id = mutation.target_id().unwrap_or_default();
        let rental = rentals
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("Rental", id))?;

        RentalWorkspace::check_transition(rental, mutation).map_err(rejection)?;
        apply_change(rental, mutation, now);

        debug!(id = %rental.id, action = mutation.label(), status = rental.status.as_str(), "Demo rental changed");
        Ok(rental.clone())
    }
}

fn new_rental(input: &CreateRentalInput, now: DateTime<Utc>) -> Rental {
    Rental {
        id: demo_id("rent"),
        item_id: input.item_id.trim().to_string(),
        renter_id: input.renter_id.trim().to_string(),
        booking_id: input.booking_id.clone(),
        marketplace_item_id: input.marketplace_item_id.clone(),
        quantity: input.quantity,
        status: RentalStatus::Requested,
        deposit_status: DepositStatus::Pending,
        deposit_cents: DEMO_DEPOSIT_PER_UNIT_CENTS * input.quantity,
        daily_rate_cents: DEMO_DAILY_RATE_CENTS,
        rental_start: input.rental_start,
        rental_end: input.rental_end,
        pickup_at: None,
        returned_at: None,
        notes: input.notes.clone(),
        checkpoints: Vec::new(),
        timeline: vec![demo_event(
            event_types::STATUS_CHANGE,
            "Rental requested",
            json!({ "to": RentalStatus::Requested.as_str() }),
        )],
        created_at: now,
        updated_at: now,
    }
}

fn checkpoint(kind: CheckpointKind, notes: Option<String>, at: DateTime<Utc>) -> RentalCheckpoint {
    RentalCheckpoint {
        id: demo_id("chk"),
        kind,
        notes,
        recorded_at: at,
    }
}

/// Applies an already-permitted change and appends its demo event.
fn apply_change(rental: &mut Rental, mutation: &RentalMutation, now: DateTime<Utc>) {
    let event = match mutation {
        RentalMutation::Create(_) => return,
        RentalMutation::Update { input, .. } => {
            input.apply_to(rental);
            demo_event(
                event_types::UPDATED,
                "Rental updated",
                serde_json::to_value(input).unwrap_or_default(),
            )
        }
        RentalMutation::AddCheckpoint { input, .. } => {
            rental.checkpoints.push(checkpoint(input.kind, input.notes.clone(), now));
            demo_event(
                event_types::CHECKPOINT,
                "Checkpoint recorded",
                json!({ "kind": input.kind }),
            )
        }
        other => {
            let Some(to) = other.transition() else {
                return;
            };
            let from = rental.status;
            let mut payload = json!({ "from": from.as_str(), "to": to.as_str() });

            match other {
                RentalMutation::SchedulePickup { pickup_at, .. } => {
                    rental.pickup_at = Some(*pickup_at);
                }
                RentalMutation::Return { returned_at, notes, .. } => {
                    rental.returned_at = Some(returned_at.unwrap_or(now));
                    rental.checkpoints.push(checkpoint(CheckpointKind::Return, notes.clone(), now));
                }
                RentalMutation::Inspect { notes, .. } => {
                    rental.checkpoints.push(checkpoint(CheckpointKind::Inspection, notes.clone(), now));
                }
                RentalMutation::Cancel { reason: Some(reason), .. } => {
                    payload["reason"] = json!(reason);
                }
                _ => {}
            }

            rental.status = to;
            rental.deposit_status = rental.deposit_status.after_transition(to);
            demo_event(event_types::STATUS_CHANGE, other.success_message(), payload)
        }
    };

    rental.timeline.push(event);
    rental.updated_at = now;
}

// =============================================================================
// Fixtures
// =============================================================================

fn seed_event(rental_id: &str, n: usize, status: RentalStatus, at: DateTime<Utc>) -> TimelineEvent {
    TimelineEvent::new(
        format!("evt-{}-{}", rental_id, n),
        event_types::STATUS_CHANGE,
        format!("Status set to {}", status.as_str()),
        at,
    )
    .with_payload(json!({ "to": status.as_str() }))
}

#[allow(clippy::too_many_arguments)]
fn seed_rental(
    id: &str,
    item_id: &str,
    renter_id: &str,
    status: RentalStatus,
    deposit_status: DepositStatus,
    deposit_cents: i64,
    daily_rate_cents: i64,
    created_at: DateTime<Utc>,
) -> Rental {
    let mut timeline = vec![seed_event(id, 1, RentalStatus::Requested, created_at)];
    if status != RentalStatus::Requested {
        timeline.push(seed_event(id, 2, status, created_at + Duration::hours(2)));
    }

    Rental {
        id: id.to_string(),
        item_id: item_id.to_string(),
        renter_id: renter_id.to_string(),
        booking_id: None,
        marketplace_item_id: None,
        quantity: 1,
        status,
        deposit_status,
        deposit_cents,
        daily_rate_cents,
        rental_start: Some(created_at + Duration::days(1)),
        rental_end: Some(created_at + Duration::days(4)),
        pickup_at: None,
        returned_at: None,
        notes: None,
        checkpoints: Vec::new(),
        timeline,
        created_at,
        updated_at: created_at + Duration::hours(2),
    }
}

/// Seeded rentals, newest first, one per interesting status.
pub fn seed_rentals(now: DateTime<Utc>) -> Vec<Rental> {
    use DepositStatus::*;
    use RentalStatus::*;

    let day = |n: i64| now - Duration::days(n);

    let mut scheduled = seed_rental("r-103", "trailer-6x10", "renter-kofi", PickupScheduled, Pending, 25_000, 6_500, day(3));
    scheduled.pickup_at = Some(now + Duration::days(1));

    let mut disputed = seed_rental("r-107", "pressure-washer", "renter-lena", Disputed, Held, 12_000, 3_000, day(12));
    disputed.notes = Some("Renter contests scratch on the wand".to_string());

    vec![
        seed_rental("r-101", "ladder-12ft", "renter-ava", Requested, Pending, 15_000, 1_800, day(1)),
        seed_rental("r-102", "tile-saw", "renter-ben", Approved, Pending, 10_000, 2_200, day(2)),
        scheduled,
        seed_rental("r-104", "generator-5kw", "renter-dee", InUse, Held, 20_000, 4_500, day(5)),
        seed_rental("r-105", "carpet-cleaner", "renter-eli", InspectionPending, Held, 8_000, 2_000, day(8)),
        seed_rental("r-106", "scaffold-set", "renter-fay", Settled, Released, 30_000, 7_000, day(10)),
        disputed,
        seed_rental("r-108", "post-driver", "renter-gus", Cancelled, Pending, 6_000, 1_500, day(14)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketdesk_core::rental::UpdateRentalInput;
    use std::time::Duration as StdDuration;

    fn instant() -> DemoLatency {
        DemoLatency::new(StdDuration::ZERO, StdDuration::ZERO)
    }

    #[tokio::test]
    async fn test_demo_create_rental() {
        let backend = DemoRentalBackend::new(instant());
        let token = CancellationToken::new();

        let created = backend
            .apply(
                &RentalMutation::Create(CreateRentalInput {
                    item_id: "X".to_string(),
                    renter_id: "renter-zoe".to_string(),
                    quantity: 2,
                    ..Default::default()
                }),
                &token,
            )
            .await
            .unwrap();

        assert_eq!(created.status, RentalStatus::Requested);
        assert_eq!(created.deposit_status, DepositStatus::Pending);
        assert_eq!(created.timeline.len(), 1);
        assert!(created.timeline[0].is_status_change());
        assert!(created.timeline[0].is_demo());

        let listed = backend.fetch_workspace(&RentalQuery::default(), &token).await.unwrap();
        assert_eq!(listed.rentals[0].id, created.id);
    }

    #[tokio::test]
    async fn test_demo_checkout_holds_deposit() {
        let backend = DemoRentalBackend::new(instant());
        let token = CancellationToken::new();

        let rental = backend
            .apply(&RentalMutation::Checkout { id: "r-102".to_string() }, &token)
            .await
            .unwrap();

        assert_eq!(rental.status, RentalStatus::InUse);
        assert_eq!(rental.deposit_status, DepositStatus::Held);
        let last = rental.timeline.last().unwrap();
        assert!(last.is_demo());
        assert_eq!(last.payload["from"], "approved");
        assert_eq!(last.payload["to"], "in_use");
    }

    #[tokio::test]
    async fn test_demo_rejects_invalid_transition() {
        let backend = DemoRentalBackend::new(instant());
        let token = CancellationToken::new();

        let err = backend
            .apply(&RentalMutation::Checkout { id: "r-106".to_string() }, &token)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));

        let err = backend
            .apply(&RentalMutation::Approve { id: "r-999".to_string() }, &token)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_demo_rejects_end_before_stored_start() {
        let backend = DemoRentalBackend::new(instant());
        let token = CancellationToken::new();
        let before = backend.fetch_entity("r-101", &token).await.unwrap().unwrap();
        let start = before.rental_start.unwrap();

        let err = backend
            .apply(
                &RentalMutation::Update {
                    id: "r-101".to_string(),
                    input: UpdateRentalInput {
                        rental_end: Some(start - Duration::days(2)),
                        ..Default::default()
                    },
                },
                &token,
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(422));

        let after = backend.fetch_entity("r-101", &token).await.unwrap().unwrap();
        assert_eq!(after.rental_end, before.rental_end);
        assert_eq!(after.timeline.len(), before.timeline.len());
    }

    #[tokio::test]
    async fn test_demo_filters() {
        let backend = DemoRentalBackend::new(instant());
        let token = CancellationToken::new();

        let held = backend
            .fetch_workspace(&RentalQuery::with_status(RentalStatus::InUse), &token)
            .await
            .unwrap();
        assert_eq!(held.rentals.len(), 1);
        assert_eq!(held.meta.total, 1);

        let query = RentalQuery {
            status: None,
            search: "SCRATCH".to_string(),
        };
        let found = backend.fetch_workspace(&query, &token).await.unwrap();
        assert_eq!(found.rentals.len(), 1);
        assert_eq!(found.rentals[0].id, "r-107");

        assert!(backend.fetch_entity("nope", &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_demo_return_and_settle() {
        let backend = DemoRentalBackend::new(instant());
        let token = CancellationToken::new();

        let returned = backend
            .apply(
                &RentalMutation::Return {
                    id: "r-104".to_string(),
                    returned_at: None,
                    notes: Some("Fuel tank half full".to_string()),
                },
                &token,
            )
            .await
            .unwrap();
        assert_eq!(returned.status, RentalStatus::InspectionPending);
        assert!(returned.returned_at.is_some());
        assert_eq!(returned.checkpoints.len(), 1);

        let settled = backend
            .apply(
                &RentalMutation::Inspect {
                    id: "r-104".to_string(),
                    outcome: InspectionOutcome::Settled,
                    notes: None,
                },
                &token,
            )
            .await
            .unwrap();
        assert_eq!(settled.status, RentalStatus::Settled);
        assert_eq!(settled.deposit_status, DepositStatus::Released);
    }

    #[test]
    fn test_seed_summary() {
        let workspace = RentalWorkspace {
            rentals: seed_rentals(Utc::now()),
            meta: ListMeta::default(),
        };
        let summary = workspace.summary();
        assert_eq!(summary.total, 8);
        assert_eq!(summary.active, 3);
        assert_eq!(summary.awaiting_action, 2);
        assert_eq!(summary.deposits_held_cents, 40_000);
        assert_eq!(workspace.summary(), summary);
    }
}

//! # Rental Module
//!
//! Equipment rentals managed from the admin console.
//!
//! ## Rental Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  requested ──► approved ──► pickup_scheduled ──► in_use                 │
//! │      │            │  │              │               ▲  │                │
//! │      │            │  └──────────────┼───────────────┘  ▼                │
//! │      │            │                 │        inspection_pending         │
//! │      ▼            ▼                 ▼             │         │           │
//! │  cancelled ◄──────┴─────────────────┘             ▼         ▼           │
//! │                                               settled ◄── disputed      │
//! │                                                                         │
//! │  Deposit: pending ──checkout──► held ──settle──► released              │
//! │                                   └──cancel───► refunded               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::lifecycle::{ensure_not_terminal, ensure_transition, status_breakdown, Lifecycle, LifecycleAction};
use crate::money::Money;
use crate::types::{ListMeta, QueryParams, TimelineEvent};
use crate::validation::{
    validate_date_range, validate_notes, validate_price_cents, validate_quantity, validate_required,
};
use crate::workspace::{Entity, ListQuery, Mutation, Workspace};
use crate::MAX_RENTAL_QUANTITY;

// =============================================================================
// Statuses
// =============================================================================

/// Where a rental is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Requested,
    Approved,
    PickupScheduled,
    InUse,
    InspectionPending,
    Settled,
    Cancelled,
    Disputed,
}

impl Lifecycle for RentalStatus {
    const ALL: &'static [Self] = &[
        RentalStatus::Requested,
        RentalStatus::Approved,
        RentalStatus::PickupScheduled,
        RentalStatus::InUse,
        RentalStatus::InspectionPending,
        RentalStatus::Settled,
        RentalStatus::Cancelled,
        RentalStatus::Disputed,
    ];

    fn transitions(self) -> &'static [Self] {
        use RentalStatus::*;
        match self {
            Requested => &[Approved, Cancelled],
            Approved => &[PickupScheduled, InUse, Cancelled],
            PickupScheduled => &[InUse, Cancelled],
            InUse => &[InspectionPending],
            InspectionPending => &[Settled, Disputed],
            Disputed => &[Settled],
            Settled | Cancelled => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            RentalStatus::Requested => "requested",
            RentalStatus::Approved => "approved",
            RentalStatus::PickupScheduled => "pickup_scheduled",
            RentalStatus::InUse => "in_use",
            RentalStatus::InspectionPending => "inspection_pending",
            RentalStatus::Settled => "settled",
            RentalStatus::Cancelled => "cancelled",
            RentalStatus::Disputed => "disputed",
        }
    }
}

/// State of the security deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Held,
    Released,
    Forfeited,
    Refunded,
}

impl DepositStatus {
    /// Deposit state after the rental moves to `to`.
    ///
    /// ```text
    /// in_use     pending → held
    /// settled    held    → released
    /// cancelled  held    → refunded
    /// ```
    /// Every other combination leaves the deposit untouched; a disputed
    /// rental keeps holding it until settlement.
    pub fn after_transition(self, to: RentalStatus) -> DepositStatus {
        match (self, to) {
            (DepositStatus::Pending, RentalStatus::InUse) => DepositStatus::Held,
            (DepositStatus::Held, RentalStatus::Settled) => DepositStatus::Released,
            (DepositStatus::Held, RentalStatus::Cancelled) => DepositStatus::Refunded,
            (current, _) => current,
        }
    }
}

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    Pickup,
    Return,
    Inspection,
    Note,
}

/// Condition record taken at pickup, return or inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RentalCheckpoint {
    pub id: String,
    pub kind: CheckpointKind,
    #[serde(default)]
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

/// A rental of one marketplace item to one renter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: String,
    pub item_id: String,
    pub renter_id: String,
    #[serde(default)]
    pub booking_id: Option<String>,
    #[serde(default)]
    pub marketplace_item_id: Option<String>,
    pub quantity: i64,
    pub status: RentalStatus,
    pub deposit_status: DepositStatus,
    #[serde(default)]
    pub deposit_cents: i64,
    #[serde(default)]
    pub daily_rate_cents: i64,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub rental_start: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub rental_end: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub pickup_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub returned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub checkpoints: Vec<RentalCheckpoint>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Rental {
    pub fn capabilities(&self) -> RentalCapabilities {
        RentalCapabilities::for_status(self.status)
    }

    /// Deposit as money.
    pub fn deposit(&self) -> Money {
        Money::from_cents(self.deposit_cents)
    }
}

impl Entity for Rental {
    fn id(&self) -> &str {
        &self.id
    }

    fn timeline(&self) -> &[TimelineEvent] {
        &self.timeline
    }

    fn timeline_mut(&mut self) -> &mut Vec<TimelineEvent> {
        &mut self.timeline
    }
}

// =============================================================================
// Actions & Capabilities
// =============================================================================

/// Lifecycle buttons of the rental detail panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentalAction {
    Approve,
    SchedulePickup,
    Checkout,
    Return,
    Settle,
    Dispute,
    Cancel,
}

impl LifecycleAction for RentalAction {
    type Status = RentalStatus;

    const ALL: &'static [Self] = &[
        RentalAction::Approve,
        RentalAction::SchedulePickup,
        RentalAction::Checkout,
        RentalAction::Return,
        RentalAction::Settle,
        RentalAction::Dispute,
        RentalAction::Cancel,
    ];

    fn target(self) -> RentalStatus {
        match self {
            RentalAction::Approve => RentalStatus::Approved,
            RentalAction::SchedulePickup => RentalStatus::PickupScheduled,
            RentalAction::Checkout => RentalStatus::InUse,
            RentalAction::Return => RentalStatus::InspectionPending,
            RentalAction::Settle => RentalStatus::Settled,
            RentalAction::Dispute => RentalStatus::Disputed,
            RentalAction::Cancel => RentalStatus::Cancelled,
        }
    }
}

/// Button flags of the rental detail panel, derived from the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RentalCapabilities {
    pub can_approve: bool,
    pub can_schedule_pickup: bool,
    pub can_checkout: bool,
    pub can_return: bool,
    pub can_settle: bool,
    pub can_dispute: bool,
    pub can_cancel: bool,
    pub can_edit: bool,
}

impl RentalCapabilities {
    pub fn for_status(status: RentalStatus) -> Self {
        RentalCapabilities {
            can_approve: RentalAction::Approve.is_enabled_for(status),
            can_schedule_pickup: RentalAction::SchedulePickup.is_enabled_for(status),
            can_checkout: RentalAction::Checkout.is_enabled_for(status),
            can_return: RentalAction::Return.is_enabled_for(status),
            can_settle: RentalAction::Settle.is_enabled_for(status),
            can_dispute: RentalAction::Dispute.is_enabled_for(status),
            can_cancel: RentalAction::Cancel.is_enabled_for(status),
            can_edit: !status.is_terminal(),
        }
    }
}

// =============================================================================
// Query
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RentalQuery {
    pub status: Option<RentalStatus>,
    pub search: String,
}

impl RentalQuery {
    pub fn with_status(status: RentalStatus) -> Self {
        RentalQuery {
            status: Some(status),
            ..Default::default()
        }
    }
}

impl ListQuery for RentalQuery {
    fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .push("status", self.status.map(Lifecycle::as_str))
            .push("search", Some(self.search.trim()))
    }

    fn search(&self) -> &str {
        &self.search
    }

    fn set_search(&mut self, search: String) {
        self.search = search;
    }
}

// =============================================================================
// Mutation Inputs
// =============================================================================

/// Body of `POST /api/admin/rentals`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateRentalInput {
    pub item_id: String,
    pub renter_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketplace_item_id: Option<String>,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub rental_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub rental_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CreateRentalInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("itemId", &self.item_id)?;
        validate_required("renterId", &self.renter_id)?;
        validate_quantity("quantity", self.quantity, MAX_RENTAL_QUANTITY)?;
        validate_date_range("rentalStart", self.rental_start, "rentalEnd", self.rental_end)?;
        validate_notes(self.notes.as_deref())
    }
}

/// Body of `PATCH /api/admin/rentals/:id`. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRentalInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub rental_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub rental_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_rate_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketplace_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl UpdateRentalInput {
    pub fn is_empty(&self) -> bool {
        *self == UpdateRentalInput::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::Required {
                field: "changes".to_string(),
            });
        }
        if let Some(quantity) = self.quantity {
            validate_quantity("quantity", quantity, MAX_RENTAL_QUANTITY)?;
        }
        if let Some(cents) = self.deposit_cents {
            validate_price_cents("depositCents", cents)?;
        }
        if let Some(cents) = self.daily_rate_cents {
            validate_price_cents("dailyRateCents", cents)?;
        }
        validate_date_range("rentalStart", self.rental_start, "rentalEnd", self.rental_end)?;
        validate_notes(self.notes.as_deref())
    }

    /// Checks the rental period `rental` would end up with once these
    /// changes land, so a lone `rentalEnd` cannot fall before the stored start.
    pub fn validate_against(&self, rental: &Rental) -> Result<(), ValidationError> {
        validate_date_range(
            "rentalStart",
            self.rental_start.or(rental.rental_start),
            "rentalEnd",
            self.rental_end.or(rental.rental_end),
        )
    }

    /// Applies the present fields to `rental`.
    pub fn apply_to(&self, rental: &mut Rental) {
        if let Some(quantity) = self.quantity {
            rental.quantity = quantity;
        }
        if self.rental_start.is_some() {
            rental.rental_start = self.rental_start;
        }
        if self.rental_end.is_some() {
            rental.rental_end = self.rental_end;
        }
        if let Some(cents) = self.deposit_cents {
            rental.deposit_cents = cents;
        }
        if let Some(cents) = self.daily_rate_cents {
            rental.daily_rate_cents = cents;
        }
        if self.booking_id.is_some() {
            rental.booking_id = self.booking_id.clone();
        }
        if self.marketplace_item_id.is_some() {
            rental.marketplace_item_id = self.marketplace_item_id.clone();
        }
        if self.notes.is_some() {
            rental.notes = self.notes.clone();
        }
    }
}

/// Result of a post-return inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InspectionOutcome {
    Settled,
    Disputed,
}

impl InspectionOutcome {
    pub fn status(self) -> RentalStatus {
        match self {
            InspectionOutcome::Settled => RentalStatus::Settled,
            InspectionOutcome::Disputed => RentalStatus::Disputed,
        }
    }
}

/// Body of `POST /api/admin/rentals/:id/checkpoints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointInput {
    pub kind: CheckpointKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// =============================================================================
// Mutations
// =============================================================================

/// Every write the rentals workspace can issue.
#[derive(Debug, Clone, PartialEq)]
pub enum RentalMutation {
    Create(CreateRentalInput),
    Update {
        id: String,
        input: UpdateRentalInput,
    },
    Approve {
        id: String,
    },
    SchedulePickup {
        id: String,
        pickup_at: DateTime<Utc>,
    },
    Checkout {
        id: String,
    },
    Return {
        id: String,
        returned_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    },
    Inspect {
        id: String,
        outcome: InspectionOutcome,
        notes: Option<String>,
    },
    Cancel {
        id: String,
        reason: Option<String>,
    },
    AddCheckpoint {
        id: String,
        input: CheckpointInput,
    },
}

impl RentalMutation {
    /// Status this mutation moves the rental to, for lifecycle actions.
    pub fn transition(&self) -> Option<RentalStatus> {
        match self {
            RentalMutation::Approve { .. } => Some(RentalStatus::Approved),
            RentalMutation::SchedulePickup { .. } => Some(RentalStatus::PickupScheduled),
            RentalMutation::Checkout { .. } => Some(RentalStatus::InUse),
            RentalMutation::Return { .. } => Some(RentalStatus::InspectionPending),
            RentalMutation::Inspect { outcome, .. } => Some(outcome.status()),
            RentalMutation::Cancel { .. } => Some(RentalStatus::Cancelled),
            RentalMutation::Create(_)
            | RentalMutation::Update { .. }
            | RentalMutation::AddCheckpoint { .. } => None,
        }
    }
}

impl Mutation for RentalMutation {
    fn label(&self) -> &'static str {
        match self {
            RentalMutation::Create(_) => "create",
            RentalMutation::Update { .. } => "update",
            RentalMutation::Approve { .. } => "approve",
            RentalMutation::SchedulePickup { .. } => "schedule-pickup",
            RentalMutation::Checkout { .. } => "checkout",
            RentalMutation::Return { .. } => "return",
            RentalMutation::Inspect { .. } => "inspection",
            RentalMutation::Cancel { .. } => "cancel",
            RentalMutation::AddCheckpoint { .. } => "checkpoints",
        }
    }

    fn target_id(&self) -> Option<&str> {
        match self {
            RentalMutation::Create(_) => None,
            RentalMutation::Update { id, .. }
            | RentalMutation::Approve { id }
            | RentalMutation::SchedulePickup { id, .. }
            | RentalMutation::Checkout { id }
            | RentalMutation::Return { id, .. }
            | RentalMutation::Inspect { id, .. }
            | RentalMutation::Cancel { id, .. }
            | RentalMutation::AddCheckpoint { id, .. } => Some(id),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(id) = self.target_id() {
            validate_required("id", id)?;
        }
        match self {
            RentalMutation::Create(input) => input.validate(),
            RentalMutation::Update { input, .. } => input.validate(),
            RentalMutation::Return { notes, .. }
            | RentalMutation::Inspect { notes, .. }
            | RentalMutation::Cancel { reason: notes, .. } => validate_notes(notes.as_deref()),
            RentalMutation::AddCheckpoint { input, .. } => validate_notes(input.notes.as_deref()),
            RentalMutation::Approve { .. }
            | RentalMutation::SchedulePickup { .. }
            | RentalMutation::Checkout { .. } => Ok(()),
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            RentalMutation::Create(_) => "Rental created",
            RentalMutation::Update { .. } => "Rental updated",
            RentalMutation::Approve { .. } => "Rental approved",
            RentalMutation::SchedulePickup { .. } => "Pickup scheduled",
            RentalMutation::Checkout { .. } => "Rental checked out",
            RentalMutation::Return { .. } => "Return recorded",
            RentalMutation::Inspect { .. } => "Inspection recorded",
            RentalMutation::Cancel { .. } => "Rental cancelled",
            RentalMutation::AddCheckpoint { .. } => "Checkpoint added",
        }
    }
}

// =============================================================================
// Workspace
// =============================================================================

/// Snapshot of the rentals list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RentalWorkspace {
    pub rentals: Vec<Rental>,
    #[serde(default)]
    pub meta: ListMeta,
}

/// Derived rental figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RentalSummary {
    pub total: u32,
    pub by_status: BTreeMap<RentalStatus, u32>,
    /// approved + pickup_scheduled + in_use
    pub active: u32,
    /// requested + inspection_pending
    pub awaiting_action: u32,
    pub deposits_held_cents: i64,
}

impl Workspace for RentalWorkspace {
    type Entity = Rental;
    type Query = RentalQuery;
    type Mutation = RentalMutation;
    type Outcome = Rental;
    type Summary = RentalSummary;

    const NAME: &'static str = "RentalWorkspace";

    fn entities(&self) -> &[Rental] {
        &self.rentals
    }

    fn entities_mut(&mut self) -> &mut Vec<Rental> {
        &mut self.rentals
    }

    fn summary(&self) -> RentalSummary {
        let by_status = status_breakdown(self.rentals.iter().map(|r| r.status));
        let count = |statuses: &[RentalStatus]| -> u32 {
            statuses.iter().map(|s| by_status.get(s).copied().unwrap_or(0)).sum()
        };

        RentalSummary {
            total: self.rentals.len() as u32,
            active: count(&[
                RentalStatus::Approved,
                RentalStatus::PickupScheduled,
                RentalStatus::InUse,
            ]),
            awaiting_action: count(&[RentalStatus::Requested, RentalStatus::InspectionPending]),
            deposits_held_cents: self
                .rentals
                .iter()
                .filter(|r| r.deposit_status == DepositStatus::Held)
                .map(Rental::deposit)
                .sum::<Money>()
                .cents(),
            by_status,
        }
    }

    fn merge_outcome(&mut self, outcome: &Rental) {
        self.upsert(outcome.clone());
    }

    fn outcome_entity(outcome: &Rental) -> Option<&Rental> {
        Some(outcome)
    }

    fn check_transition(rental: &Rental, mutation: &RentalMutation) -> CoreResult<()> {
        match (mutation, mutation.transition()) {
            (_, Some(to)) => ensure_transition(&rental.id, rental.status, to),
            (RentalMutation::Update { input, .. }, None) => {
                ensure_not_terminal(&rental.id, rental.status)?;
                Ok(input.validate_against(rental)?)
            }
            (RentalMutation::AddCheckpoint { .. }, None) if rental.status == RentalStatus::Cancelled => {
                Err(CoreError::TerminalStatus {
                    entity_id: rental.id.clone(),
                    status: rental.status.as_str().to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::enabled_actions;
    use chrono::TimeZone;

    pub(crate) fn rental(id: &str, status: RentalStatus, deposit: DepositStatus, cents: i64) -> Rental {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Rental {
            id: id.to_string(),
            item_id: "item-1".to_string(),
            renter_id: "renter-1".to_string(),
            booking_id: None,
            marketplace_item_id: None,
            quantity: 1,
            status,
            deposit_status: deposit,
            deposit_cents: cents,
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

    fn workspace() -> RentalWorkspace {
        RentalWorkspace {
            rentals: vec![
                rental("r1", RentalStatus::Requested, DepositStatus::Pending, 10_000),
                rental("r2", RentalStatus::InUse, DepositStatus::Held, 15_000),
                rental("r3", RentalStatus::Approved, DepositStatus::Pending, 5_000),
                rental("r4", RentalStatus::InspectionPending, DepositStatus::Held, 2_000),
            ],
            meta: ListMeta::default(),
        }
    }

    #[test]
    fn test_summary_figures() {
        let summary = workspace().summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.awaiting_action, 2);
        assert_eq!(summary.deposits_held_cents, 17_000);
        assert_eq!(summary.by_status[&RentalStatus::Settled], 0);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let ws = workspace();
        assert_eq!(ws.summary(), ws.summary());
    }

    #[test]
    fn test_enabled_actions_match_table_for_every_status() {
        for status in RentalStatus::ALL {
            let targets: Vec<RentalStatus> = enabled_actions::<RentalAction>(*status)
                .into_iter()
                .map(|a| a.target())
                .collect();
            assert_eq!(targets, status.transitions(), "status {:?}", status);
        }
    }

    #[test]
    fn test_capabilities_for_status() {
        let caps = RentalCapabilities::for_status(RentalStatus::InspectionPending);
        assert!(caps.can_settle);
        assert!(caps.can_dispute);
        assert!(!caps.can_cancel);
        assert!(!caps.can_checkout);

        let caps = RentalCapabilities::for_status(RentalStatus::Settled);
        assert_eq!(
            caps,
            RentalCapabilities {
                can_approve: false,
                can_schedule_pickup: false,
                can_checkout: false,
                can_return: false,
                can_settle: false,
                can_dispute: false,
                can_cancel: false,
                can_edit: false,
            }
        );
    }

    #[test]
    fn test_create_requires_item_id() {
        let mutation = RentalMutation::Create(CreateRentalInput {
            item_id: String::new(),
            renter_id: "renter-1".to_string(),
            quantity: 2,
            ..Default::default()
        });
        assert_eq!(
            mutation.validate().unwrap_err(),
            ValidationError::Required {
                field: "itemId".to_string()
            }
        );
    }

    #[test]
    fn test_create_rejects_inverted_range() {
        let start = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
        let input = CreateRentalInput {
            item_id: "item-1".to_string(),
            renter_id: "renter-1".to_string(),
            quantity: 1,
            rental_start: Some(start),
            rental_end: Some(start - chrono::Duration::days(1)),
            ..Default::default()
        };
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_create_input_wire_format() {
        let input = CreateRentalInput {
            item_id: "X".to_string(),
            renter_id: "renter-1".to_string(),
            quantity: 2,
            ..Default::default()
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["itemId"], "X");
        assert!(value.get("bookingId").is_none());
    }

    #[test]
    fn test_check_transition_uses_table() {
        let r = rental("r1", RentalStatus::Requested, DepositStatus::Pending, 0);
        let approve = RentalMutation::Approve { id: "r1".to_string() };
        let checkout = RentalMutation::Checkout { id: "r1".to_string() };

        assert!(RentalWorkspace::check_transition(&r, &approve).is_ok());
        assert!(matches!(
            RentalWorkspace::check_transition(&r, &checkout),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_update_blocked_on_terminal_rental() {
        let r = rental("r1", RentalStatus::Settled, DepositStatus::Released, 0);
        let update = RentalMutation::Update {
            id: "r1".to_string(),
            input: UpdateRentalInput {
                notes: Some("late fee waived".to_string()),
                ..Default::default()
            },
        };
        assert!(matches!(
            RentalWorkspace::check_transition(&r, &update),
            Err(CoreError::TerminalStatus { .. })
        ));
    }

    #[test]
    fn test_partial_update_checked_against_stored_period() {
        let mut r = rental("r1", RentalStatus::Approved, DepositStatus::Pending, 0);
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        r.rental_start = Some(start);
        r.rental_end = Some(start + chrono::Duration::days(3));

        let update = |end| RentalMutation::Update {
            id: "r1".to_string(),
            input: UpdateRentalInput {
                rental_end: Some(end),
                ..Default::default()
            },
        };

        let early = update(start - chrono::Duration::days(2));
        assert!(early.validate().is_ok());
        assert!(matches!(
            RentalWorkspace::check_transition(&r, &early),
            Err(CoreError::Validation(ValidationError::InvalidRange { .. }))
        ));

        assert!(RentalWorkspace::check_transition(&r, &update(start + chrono::Duration::days(5))).is_ok());

        // Moving only the start past the stored end is caught the same way.
        let late_start = RentalMutation::Update {
            id: "r1".to_string(),
            input: UpdateRentalInput {
                rental_start: Some(start + chrono::Duration::days(4)),
                ..Default::default()
            },
        };
        assert!(RentalWorkspace::check_transition(&r, &late_start).is_err());
    }

    #[test]
    fn test_deposit_follows_lifecycle() {
        assert_eq!(
            DepositStatus::Pending.after_transition(RentalStatus::InUse),
            DepositStatus::Held
        );
        assert_eq!(
            DepositStatus::Held.after_transition(RentalStatus::Settled),
            DepositStatus::Released
        );
        assert_eq!(
            DepositStatus::Held.after_transition(RentalStatus::Disputed),
            DepositStatus::Held
        );
        assert_eq!(
            DepositStatus::Pending.after_transition(RentalStatus::Cancelled),
            DepositStatus::Pending
        );
    }

    #[test]
    fn test_query_params() {
        let query = RentalQuery {
            status: Some(RentalStatus::PickupScheduled),
            search: "  ".to_string(),
        };
        let params = query.to_params();
        assert_eq!(params.get("status"), Some("pickup_scheduled"));
        assert_eq!(params.get("search"), None);
    }

    #[test]
    fn test_merge_outcome_upserts() {
        let mut ws = workspace();
        let mut approved = ws.rentals[0].clone();
        approved.status = RentalStatus::Approved;

        ws.merge_outcome(&approved);
        assert_eq!(ws.rentals.len(), 4);
        assert_eq!(ws.find("r1").unwrap().status, RentalStatus::Approved);
    }
}

//! # Booking Module
//!
//! Service bookings dispatched to providers.
//!
//! ```text
//! pending ──confirm──► confirmed ──start──► in_progress ──complete──► completed
//!    │                     │
//!    └──────cancel─────────┴──────► cancelled
//! ```
//!
//! Assignment is not a status change: a booking can be (re)assigned to a
//! provider at any point before it reaches a terminal status.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::lifecycle::{ensure_not_terminal, ensure_transition, status_breakdown, Lifecycle, LifecycleAction};
use crate::money::Money;
use crate::types::{ListMeta, QueryParams, TimelineEvent};
use crate::validation::{validate_date_range, validate_notes, validate_price_cents, validate_required};
use crate::workspace::{Entity, ListQuery, Mutation, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl Lifecycle for BookingStatus {
    const ALL: &'static [Self] = &[
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    fn transitions(self) -> &'static [Self] {
        use BookingStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[InProgress, Cancelled],
            InProgress => &[Completed],
            Completed | Cancelled => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub reference: String,
    pub customer_name: String,
    pub service_name: String,
    #[serde(default)]
    pub provider_id: Option<String>,
    pub status: BookingStatus,
    #[ts(as = "String")]
    pub scheduled_start: DateTime<Utc>,
    #[ts(as = "String")]
    pub scheduled_end: DateTime<Utc>,
    pub price_cents: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn capabilities(&self) -> BookingCapabilities {
        BookingCapabilities::for_status(self.status)
    }

    /// Not yet dispatched and still actionable.
    pub fn is_unassigned(&self) -> bool {
        self.provider_id.is_none() && !self.status.is_terminal()
    }
}

impl Entity for Booking {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    Confirm,
    Start,
    Complete,
    Cancel,
}

impl LifecycleAction for BookingAction {
    type Status = BookingStatus;

    const ALL: &'static [Self] = &[
        BookingAction::Confirm,
        BookingAction::Start,
        BookingAction::Complete,
        BookingAction::Cancel,
    ];

    fn target(self) -> BookingStatus {
        match self {
            BookingAction::Confirm => BookingStatus::Confirmed,
            BookingAction::Start => BookingStatus::InProgress,
            BookingAction::Complete => BookingStatus::Completed,
            BookingAction::Cancel => BookingStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BookingCapabilities {
    pub can_confirm: bool,
    pub can_start: bool,
    pub can_complete: bool,
    pub can_cancel: bool,
    pub can_assign: bool,
}

impl BookingCapabilities {
    pub fn for_status(status: BookingStatus) -> Self {
        BookingCapabilities {
            can_confirm: BookingAction::Confirm.is_enabled_for(status),
            can_start: BookingAction::Start.is_enabled_for(status),
            can_complete: BookingAction::Complete.is_enabled_for(status),
            can_cancel: BookingAction::Cancel.is_enabled_for(status),
            can_assign: !status.is_terminal(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingQuery {
    pub status: Option<BookingStatus>,
    pub provider_id: Option<String>,
    pub search: String,
}

impl ListQuery for BookingQuery {
    fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .push("status", self.status.map(Lifecycle::as_str))
            .push("providerId", self.provider_id.as_deref())
            .push("search", Some(self.search.trim()))
    }

    fn search(&self) -> &str {
        &self.search
    }

    fn set_search(&mut self, search: String) {
        self.search = search;
    }
}

/// Body of `PATCH /api/provider/bookings/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub scheduled_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl UpdateBookingInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if *self == UpdateBookingInput::default() {
            return Err(ValidationError::Required {
                field: "changes".to_string(),
            });
        }
        if let Some(cents) = self.price_cents {
            validate_price_cents("priceCents", cents)?;
        }
        validate_date_range(
            "scheduledStart",
            self.scheduled_start,
            "scheduledEnd",
            self.scheduled_end,
        )?;
        validate_notes(self.notes.as_deref())
    }

    pub fn apply_to(&self, booking: &mut Booking) {
        if let Some(start) = self.scheduled_start {
            booking.scheduled_start = start;
        }
        if let Some(end) = self.scheduled_end {
            booking.scheduled_end = end;
        }
        if let Some(cents) = self.price_cents {
            booking.price_cents = cents;
        }
        if self.notes.is_some() {
            booking.notes = self.notes.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookingMutation {
    Confirm { id: String },
    Start { id: String },
    Complete { id: String },
    Cancel { id: String, reason: Option<String> },
    Assign { id: String, provider_id: String },
    Update { id: String, input: UpdateBookingInput },
}

impl BookingMutation {
    pub fn transition(&self) -> Option<BookingStatus> {
        match self {
            BookingMutation::Confirm { .. } => Some(BookingStatus::Confirmed),
            BookingMutation::Start { .. } => Some(BookingStatus::InProgress),
            BookingMutation::Complete { .. } => Some(BookingStatus::Completed),
            BookingMutation::Cancel { .. } => Some(BookingStatus::Cancelled),
            BookingMutation::Assign { .. } | BookingMutation::Update { .. } => None,
        }
    }
}

impl Mutation for BookingMutation {
    fn label(&self) -> &'static str {
        match self {
            BookingMutation::Confirm { .. } => "confirm",
            BookingMutation::Start { .. } => "start",
            BookingMutation::Complete { .. } => "complete",
            BookingMutation::Cancel { .. } => "cancel",
            BookingMutation::Assign { .. } => "assign",
            BookingMutation::Update { .. } => "update",
        }
    }

    fn target_id(&self) -> Option<&str> {
        match self {
            BookingMutation::Confirm { id }
            | BookingMutation::Start { id }
            | BookingMutation::Complete { id }
            | BookingMutation::Cancel { id, .. }
            | BookingMutation::Assign { id, .. }
            | BookingMutation::Update { id, .. } => Some(id),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(id) = self.target_id() {
            validate_required("id", id)?;
        }
        match self {
            BookingMutation::Cancel { reason, .. } => validate_notes(reason.as_deref()),
            BookingMutation::Assign { provider_id, .. } => validate_required("providerId", provider_id),
            BookingMutation::Update { input, .. } => input.validate(),
            _ => Ok(()),
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            BookingMutation::Confirm { .. } => "Booking confirmed",
            BookingMutation::Start { .. } => "Booking started",
            BookingMutation::Complete { .. } => "Booking completed",
            BookingMutation::Cancel { .. } => "Booking cancelled",
            BookingMutation::Assign { .. } => "Provider assigned",
            BookingMutation::Update { .. } => "Booking updated",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BookingWorkspace {
    pub bookings: Vec<Booking>,
    #[serde(default)]
    pub meta: ListMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub total: u32,
    pub by_status: BTreeMap<BookingStatus, u32>,
    pub unassigned: u32,
    /// Price sum of completed bookings.
    pub booked_revenue_cents: i64,
}

impl Workspace for BookingWorkspace {
    type Entity = Booking;
    type Query = BookingQuery;
    type Mutation = BookingMutation;
    type Outcome = Booking;
    type Summary = BookingSummary;

    const NAME: &'static str = "BookingWorkspace";

    fn entities(&self) -> &[Booking] {
        &self.bookings
    }

    fn entities_mut(&mut self) -> &mut Vec<Booking> {
        &mut self.bookings
    }

    fn summary(&self) -> BookingSummary {
        BookingSummary {
            total: self.bookings.len() as u32,
            by_status: status_breakdown(self.bookings.iter().map(|b| b.status)),
            unassigned: self.bookings.iter().filter(|b| b.is_unassigned()).count() as u32,
            booked_revenue_cents: self
                .bookings
                .iter()
                .filter(|b| b.status == BookingStatus::Completed)
                .map(|b| Money::from_cents(b.price_cents))
                .sum::<Money>()
                .cents(),
        }
    }

    fn merge_outcome(&mut self, outcome: &Booking) {
        self.upsert(outcome.clone());
    }

    fn outcome_entity(outcome: &Booking) -> Option<&Booking> {
        Some(outcome)
    }

    fn check_transition(booking: &Booking, mutation: &BookingMutation) -> CoreResult<()> {
        match mutation.transition() {
            Some(to) => ensure_transition(&booking.id, booking.status, to),
            None => ensure_not_terminal(&booking.id, booking.status),
        }
    }
}

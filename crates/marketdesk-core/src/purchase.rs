//! # Purchase Module
//!
//! Procurement: purchase orders, the suppliers they are raised against and
//! the category budgets they commit.
//!
//! ## Purchase Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  From                 Reachable                                         │
//! │  ───────────────────  ───────────────────────────────────────────────   │
//! │  draft                awaiting_approval, approved, sent, cancelled      │
//! │  awaiting_approval    approved, cancelled                               │
//! │  approved             sent, cancelled                                   │
//! │  sent                 partial, received, cancelled                      │
//! │  partial              received, cancelled                               │
//! │  received             closed                                            │
//! │  closed, cancelled    (terminal)                                        │
//! │                                                                         │
//! │  A draft may skip approval or go straight out to the supplier.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::lifecycle::{ensure_not_terminal, ensure_transition, status_breakdown, Lifecycle, LifecycleAction};
use crate::money::Money;
use crate::types::{ListMeta, QueryParams, TimelineEvent};
use crate::validation::{
    validate_email, validate_notes, validate_price_cents, validate_quantity, validate_required,
    validate_sku, validate_title,
};
use crate::workspace::{upsert_entity, Entity, ListQuery, Mutation, Workspace};
use crate::{MAX_LINE_QUANTITY, MAX_ORDER_LINES};

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Draft,
    AwaitingApproval,
    Approved,
    Sent,
    Partial,
    Received,
    Closed,
    Cancelled,
}

impl Lifecycle for PurchaseOrderStatus {
    const ALL: &'static [Self] = &[
        PurchaseOrderStatus::Draft,
        PurchaseOrderStatus::AwaitingApproval,
        PurchaseOrderStatus::Approved,
        PurchaseOrderStatus::Sent,
        PurchaseOrderStatus::Partial,
        PurchaseOrderStatus::Received,
        PurchaseOrderStatus::Closed,
        PurchaseOrderStatus::Cancelled,
    ];

    fn transitions(self) -> &'static [Self] {
        use PurchaseOrderStatus::*;
        match self {
            Draft => &[AwaitingApproval, Approved, Sent, Cancelled],
            AwaitingApproval => &[Approved, Cancelled],
            Approved => &[Sent, Cancelled],
            Sent => &[Partial, Received, Cancelled],
            Partial => &[Received, Cancelled],
            Received => &[Closed],
            Closed | Cancelled => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::AwaitingApproval => "awaiting_approval",
            PurchaseOrderStatus::Approved => "approved",
            PurchaseOrderStatus::Sent => "sent",
            PurchaseOrderStatus::Partial => "partial",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Closed => "closed",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }
}

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderLine {
    pub sku: String,
    pub description: String,
    pub quantity: i64,
    #[serde(default)]
    pub received_quantity: i64,
    pub unit_cost_cents: i64,
}

impl PurchaseOrderLine {
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).multiply_quantity(self.quantity)
    }

    pub fn received_value(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).multiply_quantity(self.received_quantity)
    }

    pub fn is_fully_received(&self) -> bool {
        self.received_quantity >= self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: String,
    pub reference: String,
    pub supplier_id: String,
    pub status: PurchaseOrderStatus,
    pub currency: String,
    #[serde(default)]
    pub lines: Vec<PurchaseOrderLine>,
    pub total_cents: i64,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn capabilities(&self) -> PurchaseCapabilities {
        PurchaseCapabilities::for_status(self.status)
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    pub fn received_value(&self) -> Money {
        self.lines.iter().map(PurchaseOrderLine::received_value).sum()
    }
}

impl Entity for PurchaseOrder {
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub lead_time_days: u32,
}

/// Spending limit for one procurement category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub category: String,
    pub limit_cents: i64,
    #[serde(default)]
    pub committed_cents: i64,
}

impl Budget {
    /// Committed share of the limit in basis points (uncapped).
    pub fn utilization_bps(&self) -> i64 {
        Money::from_cents(self.committed_cents).ratio_bps(Money::from_cents(self.limit_cents))
    }

    pub fn is_over_limit(&self) -> bool {
        self.committed_cents > self.limit_cents
    }
}

// =============================================================================
// Actions & Capabilities
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseAction {
    SubmitForApproval,
    Approve,
    Send,
    ReceivePartial,
    Receive,
    Close,
    Cancel,
}

impl LifecycleAction for PurchaseAction {
    type Status = PurchaseOrderStatus;

    const ALL: &'static [Self] = &[
        PurchaseAction::SubmitForApproval,
        PurchaseAction::Approve,
        PurchaseAction::Send,
        PurchaseAction::ReceivePartial,
        PurchaseAction::Receive,
        PurchaseAction::Close,
        PurchaseAction::Cancel,
    ];

    fn target(self) -> PurchaseOrderStatus {
        match self {
            PurchaseAction::SubmitForApproval => PurchaseOrderStatus::AwaitingApproval,
            PurchaseAction::Approve => PurchaseOrderStatus::Approved,
            PurchaseAction::Send => PurchaseOrderStatus::Sent,
            PurchaseAction::ReceivePartial => PurchaseOrderStatus::Partial,
            PurchaseAction::Receive => PurchaseOrderStatus::Received,
            PurchaseAction::Close => PurchaseOrderStatus::Closed,
            PurchaseAction::Cancel => PurchaseOrderStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCapabilities {
    pub can_submit: bool,
    pub can_approve: bool,
    pub can_send: bool,
    pub can_receive_partial: bool,
    pub can_receive: bool,
    pub can_close: bool,
    pub can_cancel: bool,
    pub can_edit: bool,
}

impl PurchaseCapabilities {
    pub fn for_status(status: PurchaseOrderStatus) -> Self {
        PurchaseCapabilities {
            can_submit: PurchaseAction::SubmitForApproval.is_enabled_for(status),
            can_approve: PurchaseAction::Approve.is_enabled_for(status),
            can_send: PurchaseAction::Send.is_enabled_for(status),
            can_receive_partial: PurchaseAction::ReceivePartial.is_enabled_for(status),
            can_receive: PurchaseAction::Receive.is_enabled_for(status),
            can_close: PurchaseAction::Close.is_enabled_for(status),
            can_cancel: PurchaseAction::Cancel.is_enabled_for(status),
            can_edit: !status.is_terminal(),
        }
    }
}

// =============================================================================
// Query
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseQuery {
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<String>,
    pub search: String,
}

impl ListQuery for PurchaseQuery {
    fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .push("status", self.status.map(Lifecycle::as_str))
            .push("supplierId", self.supplier_id.as_deref())
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderLineInput {
    pub sku: String,
    pub description: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

impl PurchaseOrderLineInput {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_sku(&self.sku)?;
        validate_title("description", &self.description)?;
        validate_quantity("quantity", self.quantity, MAX_LINE_QUANTITY)?;
        validate_price_cents("unitCostCents", self.unit_cost_cents)
    }

    pub fn to_line(&self) -> PurchaseOrderLine {
        PurchaseOrderLine {
            sku: self.sku.trim().to_string(),
            description: self.description.trim().to_string(),
            quantity: self.quantity,
            received_quantity: 0,
            unit_cost_cents: self.unit_cost_cents,
        }
    }
}

fn validate_lines(lines: &[PurchaseOrderLineInput]) -> Result<(), ValidationError> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }
    if lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }
    lines.iter().try_for_each(PurchaseOrderLineInput::validate)
}

fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three letter ISO code".to_string(),
        });
    }
    Ok(())
}

/// Sum of line totals.
pub fn lines_total(lines: &[PurchaseOrderLineInput]) -> Money {
    lines.iter().map(|l| l.to_line().line_total()).sum()
}

/// Body of `POST /api/admin/purchases`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub currency: String,
    pub lines: Vec<PurchaseOrderLineInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub expected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CreatePurchaseOrderInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("supplierId", &self.supplier_id)?;
        validate_currency(&self.currency)?;
        validate_lines(&self.lines)?;
        validate_notes(self.notes.as_deref())
    }
}

/// Body of `PATCH /api/admin/purchases/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePurchaseOrderInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<PurchaseOrderLineInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub expected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl UpdatePurchaseOrderInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if *self == UpdatePurchaseOrderInput::default() {
            return Err(ValidationError::Required {
                field: "changes".to_string(),
            });
        }
        if let Some(lines) = &self.lines {
            validate_lines(lines)?;
        }
        validate_notes(self.notes.as_deref())
    }

    /// Applies the present fields, recomputing the total when lines change.
    pub fn apply_to(&self, order: &mut PurchaseOrder) {
        if let Some(lines) = &self.lines {
            order.lines = lines.iter().map(PurchaseOrderLineInput::to_line).collect();
            order.total_cents = lines_total(lines).cents();
        }
        if self.expected_at.is_some() {
            order.expected_at = self.expected_at;
        }
        if self.notes.is_some() {
            order.notes = self.notes.clone();
        }
    }
}

/// Body of `POST /api/admin/purchases/suppliers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub lead_time_days: u32,
}

impl CreateSupplierInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title("name", &self.name)?;
        if let Some(email) = &self.email {
            validate_email("email", email)?;
        }
        if self.lead_time_days > 365 {
            return Err(ValidationError::OutOfRange {
                field: "leadTimeDays".to_string(),
                min: 0,
                max: 365,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Mutations
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseMutation {
    CreateOrder(CreatePurchaseOrderInput),
    UpdateOrder {
        id: String,
        input: UpdatePurchaseOrderInput,
    },
    /// `POST /:id/transition { status, note? }`
    Transition {
        id: String,
        status: PurchaseOrderStatus,
        note: Option<String>,
    },
    CreateSupplier(CreateSupplierInput),
    /// `PUT /budgets/:id { limitCents }`
    UpdateBudget {
        id: String,
        limit_cents: i64,
    },
}

impl Mutation for PurchaseMutation {
    fn label(&self) -> &'static str {
        match self {
            PurchaseMutation::CreateOrder(_) => "create-order",
            PurchaseMutation::UpdateOrder { .. } => "update-order",
            PurchaseMutation::Transition { .. } => "transition",
            PurchaseMutation::CreateSupplier(_) => "create-supplier",
            PurchaseMutation::UpdateBudget { .. } => "update-budget",
        }
    }

    fn target_id(&self) -> Option<&str> {
        match self {
            PurchaseMutation::UpdateOrder { id, .. } | PurchaseMutation::Transition { id, .. } => {
                Some(id)
            }
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            PurchaseMutation::CreateOrder(input) => input.validate(),
            PurchaseMutation::UpdateOrder { id, input } => {
                validate_required("id", id)?;
                input.validate()
            }
            PurchaseMutation::Transition { id, note, .. } => {
                validate_required("id", id)?;
                validate_notes(note.as_deref())
            }
            PurchaseMutation::CreateSupplier(input) => input.validate(),
            PurchaseMutation::UpdateBudget { id, limit_cents } => {
                validate_required("id", id)?;
                validate_price_cents("limitCents", *limit_cents)
            }
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            PurchaseMutation::CreateOrder(_) => "Purchase order created",
            PurchaseMutation::UpdateOrder { .. } => "Purchase order updated",
            PurchaseMutation::Transition { .. } => "Purchase order status updated",
            PurchaseMutation::CreateSupplier(_) => "Supplier added",
            PurchaseMutation::UpdateBudget { .. } => "Budget updated",
        }
    }
}

/// What a purchase write returns.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Order(PurchaseOrder),
    Supplier(Supplier),
    Budget(Budget),
}

// =============================================================================
// Workspace
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseWorkspace {
    pub orders: Vec<PurchaseOrder>,
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub meta: ListMeta,
}

impl PurchaseWorkspace {
    pub fn supplier(&self, id: &str) -> Option<&Supplier> {
        self.suppliers.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummary {
    pub total_orders: u32,
    pub by_status: BTreeMap<PurchaseOrderStatus, u32>,
    /// Sum of totals over orders that are not closed or cancelled.
    pub open_commitment_cents: i64,
    pub received_value_cents: i64,
    pub supplier_count: u32,
    pub budgets_over_limit: u32,
}

impl Workspace for PurchaseWorkspace {
    type Entity = PurchaseOrder;
    type Query = PurchaseQuery;
    type Mutation = PurchaseMutation;
    type Outcome = PurchaseOutcome;
    type Summary = PurchaseSummary;

    const NAME: &'static str = "PurchaseWorkspace";

    fn entities(&self) -> &[PurchaseOrder] {
        &self.orders
    }

    fn entities_mut(&mut self) -> &mut Vec<PurchaseOrder> {
        &mut self.orders
    }

    fn summary(&self) -> PurchaseSummary {
        PurchaseSummary {
            total_orders: self.orders.len() as u32,
            by_status: status_breakdown(self.orders.iter().map(|o| o.status)),
            open_commitment_cents: self
                .orders
                .iter()
                .filter(|o| !o.status.is_terminal())
                .map(PurchaseOrder::total)
                .sum::<Money>()
                .cents(),
            received_value_cents: self
                .orders
                .iter()
                .filter(|o| o.status != PurchaseOrderStatus::Cancelled)
                .map(PurchaseOrder::received_value)
                .sum::<Money>()
                .cents(),
            supplier_count: self.suppliers.len() as u32,
            budgets_over_limit: self.budgets.iter().filter(|b| b.is_over_limit()).count() as u32,
        }
    }

    fn merge_outcome(&mut self, outcome: &PurchaseOutcome) {
        match outcome {
            PurchaseOutcome::Order(order) => upsert_entity(&mut self.orders, order.clone()),
            PurchaseOutcome::Supplier(supplier) => {
                match self.suppliers.iter_mut().find(|s| s.id == supplier.id) {
                    Some(existing) => *existing = supplier.clone(),
                    None => self.suppliers.push(supplier.clone()),
                }
            }
            PurchaseOutcome::Budget(budget) => {
                match self.budgets.iter_mut().find(|b| b.id == budget.id) {
                    Some(existing) => *existing = budget.clone(),
                    None => self.budgets.push(budget.clone()),
                }
            }
        }
    }

    fn outcome_entity(outcome: &PurchaseOutcome) -> Option<&PurchaseOrder> {
        match outcome {
            PurchaseOutcome::Order(order) => Some(order),
            _ => None,
        }
    }

    fn check_transition(order: &PurchaseOrder, mutation: &PurchaseMutation) -> CoreResult<()> {
        match mutation {
            PurchaseMutation::Transition { status, .. } => {
                ensure_transition(&order.id, order.status, *status)
            }
            PurchaseMutation::UpdateOrder { .. } => ensure_not_terminal(&order.id, order.status),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::enabled_actions;
    use crate::CoreError;
    use chrono::TimeZone;

    fn order(id: &str, status: PurchaseOrderStatus, lines: Vec<PurchaseOrderLine>) -> PurchaseOrder {
        let at = Utc.with_ymd_and_hms(2026, 2, 10, 8, 0, 0).unwrap();
        let total = lines.iter().map(PurchaseOrderLine::line_total).sum::<Money>();
        PurchaseOrder {
            id: id.to_string(),
            reference: format!("PO-{}", id),
            supplier_id: "sup-1".to_string(),
            status,
            currency: "USD".to_string(),
            lines,
            total_cents: total.cents(),
            expected_at: None,
            notes: None,
            timeline: vec![],
            created_at: at,
            updated_at: at,
        }
    }

    fn line(quantity: i64, received: i64, cost: i64) -> PurchaseOrderLine {
        PurchaseOrderLine {
            sku: "TENT-4P".to_string(),
            description: "Four person tent".to_string(),
            quantity,
            received_quantity: received,
            unit_cost_cents: cost,
        }
    }

    fn line_input() -> PurchaseOrderLineInput {
        PurchaseOrderLineInput {
            sku: "KAYAK-1".to_string(),
            description: "Sit-on-top kayak".to_string(),
            quantity: 2,
            unit_cost_cents: 45_000,
        }
    }

    #[test]
    fn test_sent_order_transitions() {
        assert_eq!(
            PurchaseOrderStatus::Sent.transitions(),
            &[
                PurchaseOrderStatus::Partial,
                PurchaseOrderStatus::Received,
                PurchaseOrderStatus::Cancelled
            ]
        );

        let actions = enabled_actions::<PurchaseAction>(PurchaseOrderStatus::Sent);
        assert_eq!(
            actions,
            vec![
                PurchaseAction::ReceivePartial,
                PurchaseAction::Receive,
                PurchaseAction::Cancel
            ]
        );

        let caps = PurchaseCapabilities::for_status(PurchaseOrderStatus::Sent);
        assert!(!caps.can_approve);
        assert!(!caps.can_send);
        assert!(!caps.can_close);
    }

    #[test]
    fn test_enabled_actions_match_table_for_every_status() {
        for status in PurchaseOrderStatus::ALL {
            let targets: Vec<PurchaseOrderStatus> = enabled_actions::<PurchaseAction>(*status)
                .into_iter()
                .map(|a| a.target())
                .collect();
            assert_eq!(targets, status.transitions(), "status {:?}", status);
        }
    }

    #[test]
    fn test_summary() {
        let ws = PurchaseWorkspace {
            orders: vec![
                order("1", PurchaseOrderStatus::Sent, vec![line(10, 0, 1_000)]),
                order("2", PurchaseOrderStatus::Partial, vec![line(4, 2, 500)]),
                order("3", PurchaseOrderStatus::Closed, vec![line(1, 1, 9_900)]),
                order("4", PurchaseOrderStatus::Cancelled, vec![line(3, 1, 100)]),
            ],
            suppliers: vec![Supplier {
                id: "sup-1".to_string(),
                name: "Acme Outdoor".to_string(),
                email: None,
                lead_time_days: 7,
            }],
            budgets: vec![
                Budget {
                    id: "b1".to_string(),
                    category: "Camping".to_string(),
                    limit_cents: 10_000,
                    committed_cents: 12_000,
                },
                Budget {
                    id: "b2".to_string(),
                    category: "Water".to_string(),
                    limit_cents: 10_000,
                    committed_cents: 500,
                },
            ],
            meta: ListMeta::default(),
        };

        let summary = ws.summary();
        assert_eq!(summary.total_orders, 4);
        assert_eq!(summary.open_commitment_cents, 10_000 + 2_000);
        assert_eq!(summary.received_value_cents, 1_000 + 9_900);
        assert_eq!(summary.supplier_count, 1);
        assert_eq!(summary.budgets_over_limit, 1);
        assert_eq!(summary, ws.summary());
    }

    #[test]
    fn test_create_order_validation() {
        let mut input = CreatePurchaseOrderInput {
            supplier_id: "sup-1".to_string(),
            reference: None,
            currency: "USD".to_string(),
            lines: vec![line_input()],
            expected_at: None,
            notes: None,
        };
        assert!(input.validate().is_ok());
        assert_eq!(lines_total(&input.lines).cents(), 90_000);

        input.currency = "usd".to_string();
        assert!(input.validate().is_err());

        input.currency = "USD".to_string();
        input.lines.clear();
        assert_eq!(
            input.validate().unwrap_err(),
            ValidationError::Required {
                field: "lines".to_string()
            }
        );
    }

    #[test]
    fn test_transition_gate() {
        let received = order("1", PurchaseOrderStatus::Received, vec![]);
        let to_sent = PurchaseMutation::Transition {
            id: "1".to_string(),
            status: PurchaseOrderStatus::Sent,
            note: None,
        };
        assert!(matches!(
            PurchaseWorkspace::check_transition(&received, &to_sent),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_merge_secondary_collections() {
        let mut ws = PurchaseWorkspace::default();
        let budget = Budget {
            id: "b1".to_string(),
            category: "Camping".to_string(),
            limit_cents: 50_000,
            committed_cents: 0,
        };
        ws.merge_outcome(&PurchaseOutcome::Budget(budget.clone()));
        ws.merge_outcome(&PurchaseOutcome::Budget(Budget {
            limit_cents: 75_000,
            ..budget
        }));

        assert_eq!(ws.budgets.len(), 1);
        assert_eq!(ws.budgets[0].limit_cents, 75_000);
        assert!(PurchaseWorkspace::outcome_entity(&PurchaseOutcome::Budget(ws.budgets[0].clone())).is_none());
    }

    #[test]
    fn test_update_recomputes_total() {
        let mut po = order("1", PurchaseOrderStatus::Draft, vec![line(1, 0, 100)]);
        let update = UpdatePurchaseOrderInput {
            lines: Some(vec![line_input()]),
            ..Default::default()
        };
        update.apply_to(&mut po);
        assert_eq!(po.total_cents, 90_000);
        assert_eq!(po.lines[0].received_quantity, 0);
    }

    #[test]
    fn test_budget_utilization() {
        let budget = Budget {
            id: "b1".to_string(),
            category: "Camping".to_string(),
            limit_cents: 20_000,
            committed_cents: 5_000,
        };
        assert_eq!(budget.utilization_bps(), 2_500);
        assert!(!budget.is_over_limit());
    }
}

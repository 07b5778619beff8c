//! # Purchases
//!
//! Backends of the purchase management workspace (`/api/admin/purchases`).
//! The list endpoint returns orders, suppliers and budgets in one payload.
//!
//! ## Endpoints
//! ```text
//! GET    /api/admin/purchases?status=&supplierId=&search=
//!                              { data: { orders, suppliers, budgets }, meta }
//! GET    /api/admin/purchases/:id              { data: PurchaseOrder }
//! POST   /api/admin/purchases                  create order
//! PATCH  /api/admin/purchases/:id              lines / expectedAt / notes
//! POST   /api/admin/purchases/:id/transition   { status, note? }
//! POST   /api/admin/purchases/suppliers        create supplier
//! PUT    /api/admin/purchases/budgets/:id      { limitCents }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use marketdesk_core::lifecycle::Lifecycle;
use marketdesk_core::purchase::{
    lines_total, Budget, CreatePurchaseOrderInput, PurchaseMutation, PurchaseOrder, PurchaseOrderLine,
    PurchaseOrderLineInput, PurchaseOrderStatus, PurchaseOutcome, PurchaseQuery, PurchaseWorkspace, Supplier,
};
use marketdesk_core::types::event_types;
use marketdesk_core::{CoreError, ListMeta, ListQuery, Mutation, QueryParams, TimelineEvent, ValidationError, Workspace};
use serde::{Deserialize, Serialize};
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

pub const ROOT: &str = "/api/admin/purchases";
pub const SERVICE: &str = "purchases";

pub fn backend(config: &ConsoleConfig) -> WorkspaceResult<Arc<dyn WorkspaceBackend<PurchaseWorkspace>>> {
    select_backend(
        config,
        SERVICE,
        |api| Arc::new(RemotePurchaseBackend::new(api)),
        |latency| Arc::new(DemoPurchaseBackend::new(latency)),
    )
}

pub fn store(config: &ConsoleConfig) -> WorkspaceResult<WorkspaceStore<PurchaseWorkspace>> {
    Ok(WorkspaceStore::new(backend(config)?, config.workspace.clone()))
}

// =============================================================================
// Remote Backend
// =============================================================================

#[derive(Deserialize)]
struct PurchaseData {
    orders: Vec<PurchaseOrder>,
    #[serde(default)]
    suppliers: Vec<Supplier>,
    #[serde(default)]
    budgets: Vec<Budget>,
}

#[derive(Serialize)]
struct TransitionBody<'a> {
    status: PurchaseOrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BudgetBody {
    limit_cents: i64,
}

/// Purchases over REST.
pub struct RemotePurchaseBackend {
    api: ApiClient,
}

impl RemotePurchaseBackend {
    pub fn new(api: ApiClient) -> Self {
        RemotePurchaseBackend { api }
    }
}

#[async_trait]
impl WorkspaceBackend<PurchaseWorkspace> for RemotePurchaseBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Remote
    }

    async fn fetch_workspace(&self, query: &PurchaseQuery, cancel: &CancellationToken) -> WorkspaceResult<PurchaseWorkspace> {
        let body = self.api.get(ROOT, &query.to_params(), cancel).await?;
        let envelope: Envelope<PurchaseData> = self.api.envelope(body)?;
        let meta = envelope.meta_or_total(envelope.data.orders.len());

        Ok(PurchaseWorkspace {
            orders: envelope.data.orders,
            suppliers: envelope.data.suppliers,
            budgets: envelope.data.budgets,
            meta,
        })
    }

    async fn fetch_entity(&self, id: &str, cancel: &CancellationToken) -> WorkspaceResult<Option<PurchaseOrder>> {
        let path = ApiPath::new(ROOT).segment(id);
        match not_found_as_none(self.api.get(path, &QueryParams::new(), cancel).await)? {
            Some(body) => Ok(Some(self.api.data(body)?)),
            None => Ok(None),
        }
    }

    async fn apply(&self, mutation: &PurchaseMutation, cancel: &CancellationToken) -> WorkspaceResult<PurchaseOutcome> {
        let api = &self.api;
        match mutation {
            PurchaseMutation::CreateOrder(input) => {
                let body = api.post(ROOT, Some(input), cancel).await?;
                Ok(PurchaseOutcome::Order(api.data(body)?))
            }
            PurchaseMutation::UpdateOrder { id, input } => {
                let body = api.patch(ApiPath::new(ROOT).segment(id), Some(input), cancel).await?;
                Ok(PurchaseOutcome::Order(api.data(body)?))
            }
            PurchaseMutation::Transition { id, status, note } => {
                let payload = TransitionBody {
                    status: *status,
                    note: note.as_deref(),
                };
                let path = ApiPath::new(ROOT).segment(id).segment("transition");
                let body = api.post(path, Some(&payload), cancel).await?;
                Ok(PurchaseOutcome::Order(api.data(body)?))
            }
            PurchaseMutation::CreateSupplier(input) => {
                let body = api.post(ApiPath::new(ROOT).segment("suppliers"), Some(input), cancel).await?;
                Ok(PurchaseOutcome::Supplier(api.data(body)?))
            }
            PurchaseMutation::UpdateBudget { id, limit_cents } => {
                let payload = BudgetBody {
                    limit_cents: *limit_cents,
                };
                let path = ApiPath::new(ROOT).segment("budgets").segment(id);
                let body = api.put(path, Some(&payload), cancel).await?;
                Ok(PurchaseOutcome::Budget(api.data(body)?))
            }
        }
    }
}

// =============================================================================
// Demo Backend
// =============================================================================

/// Collections behind the demo purchases backend.
#[derive(Debug, Clone, Default)]
pub struct PurchaseFixtures {
    pub orders: Vec<PurchaseOrder>,
    pub suppliers: Vec<Supplier>,
    pub budgets: Vec<Budget>,
}

pub struct DemoPurchaseBackend {
    fixtures: Mutex<PurchaseFixtures>,
    latency: DemoLatency,
}

impl DemoPurchaseBackend {
    pub fn new(latency: DemoLatency) -> Self {
        Self::with_fixtures(seed_purchases(Utc::now()), latency)
    }

    pub fn with_fixtures(fixtures: PurchaseFixtures, latency: DemoLatency) -> Self {
        DemoPurchaseBackend {
            fixtures: Mutex::new(fixtures),
            latency,
        }
    }
}

#[async_trait]
impl WorkspaceBackend<PurchaseWorkspace> for DemoPurchaseBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Demo
    }

    async fn fetch_workspace(&self, query: &PurchaseQuery, cancel: &CancellationToken) -> WorkspaceResult<PurchaseWorkspace> {
        self.latency.pause_or_cancel(cancel).await?;
        let fixtures = self.fixtures.lock().await;

        let orders: Vec<PurchaseOrder> = fixtures
            .orders
            .iter()
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .filter(|o| query.supplier_id.as_deref().map_or(true, |s| o.supplier_id == s))
            .filter(|o| {
                let supplier = fixtures
                    .suppliers
                    .iter()
                    .find(|s| s.id == o.supplier_id)
                    .map(|s| s.name.as_str())
                    .unwrap_or("");
                matches_search(query.search(), [o.id.as_str(), o.reference.as_str(), supplier])
            })
            .cloned()
            .collect();

        Ok(PurchaseWorkspace {
            meta: ListMeta {
                total: orders.len() as u32,
                page: Some(1),
                per_page: None,
            },
            orders,
            suppliers: fixtures.suppliers.clone(),
            budgets: fixtures.budgets.clone(),
        })
    }

    async fn fetch_entity(&self, id: &str, cancel: &CancellationToken) -> WorkspaceResult<Option<PurchaseOrder>> {
        self.latency.pause_or_cancel(cancel).await?;
        Ok(self.fixtures.lock().await.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn apply(&self, mutation: &PurchaseMutation, cancel: &CancellationToken) -> WorkspaceResult<PurchaseOutcome> {
        self.latency.pause_or_cancel(cancel).await?;
        mutation.validate().map_err(|e| rejection(CoreError::Validation(e)))?;

        let now = Utc::now();
        let mut fixtures = self.fixtures.lock().await;

        match mutation {
            PurchaseMutation::CreateOrder(input) => {
                if !fixtures.suppliers.iter().any(|s| s.id == input.supplier_id) {
                    return Err(rejection(CoreError::Validation(ValidationError::NotAllowed {
                        field: "supplierId".to_string(),
                        allowed: fixtures.suppliers.iter().map(|s| s.id.clone()).collect(),
                    })));
                }
                let reference = format!("PO-{}", 2_000 + fixtures.orders.len() + 1);
                let order = new_order(input, reference, now);
                debug!(id = %order.id, "Demo purchase order created");
                fixtures.orders.insert(0, order.clone());
                Ok(PurchaseOutcome::Order(order))
            }
            PurchaseMutation::UpdateOrder { id, input } => {
                let order = find_order(&mut fixtures.orders, id)?;
                PurchaseWorkspace::check_transition(order, mutation).map_err(rejection)?;
                input.apply_to(order);
                order.timeline.push(demo_event(
                    event_types::UPDATED,
                    "Purchase order updated",
                    serde_json::to_value(input).unwrap_or_default(),
                ));
                order.updated_at = now;
                Ok(PurchaseOutcome::Order(order.clone()))
            }
            PurchaseMutation::Transition { id, status, note } => {
                let order = find_order(&mut fixtures.orders, id)?;
                PurchaseWorkspace::check_transition(order, mutation).map_err(rejection)?;

                let from = order.status;
                receive_lines(&mut order.lines, *status);
                order.status = *status;
                let mut payload = json!({ "from": from.as_str(), "to": status.as_str() });
                if let Some(note) = note {
                    payload["note"] = json!(note);
                }
                order.timeline.push(demo_event(
                    event_types::STATUS_CHANGE,
                    format!("Status changed to {}", status.as_str()),
                    payload,
                ));
                order.updated_at = now;
                Ok(PurchaseOutcome::Order(order.clone()))
            }
            PurchaseMutation::CreateSupplier(input) => {
                let supplier = Supplier {
                    id: demo_id("sup"),
                    name: input.name.trim().to_string(),
                    email: input.email.clone(),
                    lead_time_days: input.lead_time_days,
                };
                fixtures.suppliers.push(supplier.clone());
                Ok(PurchaseOutcome::Supplier(supplier))
            }
            PurchaseMutation::UpdateBudget { id, limit_cents } => {
                let budget = fixtures
                    .budgets
                    .iter_mut()
                    .find(|b| b.id == *id)
                    .ok_or_else(|| not_found("Budget", id))?;
                budget.limit_cents = *limit_cents;
                Ok(PurchaseOutcome::Budget(budget.clone()))
            }
        }
    }
}

fn find_order<'a>(orders: &'a mut [PurchaseOrder], id: &str) -> WorkspaceResult<&'a mut PurchaseOrder> {
    orders
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or_else(|| not_found("Purchase order", id))
}

fn new_order(input: &CreatePurchaseOrderInput, fallback_reference: String, now: DateTime<Utc>) -> PurchaseOrder {
    PurchaseOrder {
        id: demo_id("po"),
        reference: input.reference.clone().unwrap_or(fallback_reference),
        supplier_id: input.supplier_id.clone(),
        status: PurchaseOrderStatus::Draft,
        currency: input.currency.clone(),
        lines: input.lines.iter().map(PurchaseOrderLineInput::to_line).collect(),
        total_cents: lines_total(&input.lines).cents(),
        expected_at: input.expected_at,
        notes: input.notes.clone(),
        timeline: vec![demo_event(
            event_types::STATUS_CHANGE,
            "Purchase order drafted",
            json!({ "to": PurchaseOrderStatus::Draft.as_str() }),
        )],
        created_at: now,
        updated_at: now,
    }
}

/// Simulated goods receipt: `partial` books half of each open line,
/// `received` books everything.
fn receive_lines(lines: &mut [PurchaseOrderLine], to: PurchaseOrderStatus) {
    match to {
        PurchaseOrderStatus::Partial => {
            for line in lines.iter_mut() {
                let half = (line.quantity + 1) / 2;
                line.received_quantity = line.received_quantity.max(half);
            }
        }
        PurchaseOrderStatus::Received => {
            for line in lines.iter_mut() {
                line.received_quantity = line.quantity;
            }
        }
        _ => {}
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn line(sku: &str, description: &str, quantity: i64, received: i64, unit_cost_cents: i64) -> PurchaseOrderLine {
    PurchaseOrderLine {
        sku: sku.to_string(),
        description: description.to_string(),
        quantity,
        received_quantity: received,
        unit_cost_cents,
    }
}

fn seed_order(
    id: &str,
    supplier_id: &str,
    status: PurchaseOrderStatus,
    lines: Vec<PurchaseOrderLine>,
    created_at: DateTime<Utc>,
) -> PurchaseOrder {
    let total_cents = lines.iter().map(PurchaseOrderLine::line_total).sum::<marketdesk_core::Money>().cents();
    PurchaseOrder {
        id: id.to_string(),
        reference: format!("PO-{}", id.trim_start_matches("po-")),
        supplier_id: supplier_id.to_string(),
        status,
        currency: "USD".to_string(),
        lines,
        total_cents,
        expected_at: Some(created_at + Duration::days(7)),
        notes: None,
        timeline: vec![TimelineEvent::new(
            format!("evt-{}-1", id),
            event_types::STATUS_CHANGE,
            format!("Status set to {}", status.as_str()),
            created_at,
        )
        .with_payload(json!({ "to": status.as_str() }))],
        created_at,
        updated_at: created_at,
    }
}

/// Seeded suppliers, budgets and orders.
pub fn seed_purchases(now: DateTime<Utc>) -> PurchaseFixtures {
    use PurchaseOrderStatus::*;

    let day = |n: i64| now - Duration::days(n);

    let suppliers = vec![
        Supplier {
            id: "sup-1".to_string(),
            name: "Northwind Tools".to_string(),
            email: Some("orders@northwind.example".to_string()),
            lead_time_days: 5,
        },
        Supplier {
            id: "sup-2".to_string(),
            name: "Harbor Rental Supply".to_string(),
            email: None,
            lead_time_days: 12,
        },
        Supplier {
            id: "sup-3".to_string(),
            name: "Cascade Safety".to_string(),
            email: Some("sales@cascade.example".to_string()),
            lead_time_days: 3,
        },
    ];

    let budgets = vec![
        Budget {
            id: "bud-equipment".to_string(),
            category: "Equipment".to_string(),
            limit_cents: 2_500_000,
            committed_cents: 1_840_000,
        },
        Budget {
            id: "bud-consumables".to_string(),
            category: "Consumables".to_string(),
            limit_cents: 300_000,
            committed_cents: 342_500,
        },
        Budget {
            id: "bud-safety".to_string(),
            category: "Safety".to_string(),
            limit_cents: 500_000,
            committed_cents: 120_000,
        },
    ];

    let orders = vec![
        seed_order("po-1006", "sup-1", Draft, vec![line("SAW-BLADE-10", "10in saw blade", 20, 0, 2_450)], day(1)),
        seed_order("po-1005", "sup-3", AwaitingApproval, vec![line("GLOVE-L", "Work gloves, large", 100, 0, 650)], day(2)),
        seed_order("po-1004", "sup-2", Sent, vec![line("TARP-20", "20ft tarp", 30, 0, 3_900)], day(4)),
        seed_order(
            "po-1003",
            "sup-1",
            Partial,
            vec![
                line("DRILL-18V", "18V cordless drill", 10, 6, 12_900),
                line("BIT-SET", "Drill bit set", 10, 10, 2_100),
            ],
            day(9),
        ),
        seed_order("po-1002", "sup-3", Received, vec![line("HARNESS", "Fall arrest harness", 8, 8, 18_500)], day(15)),
        seed_order("po-1001", "sup-2", Closed, vec![line("STRAP-2", "Ratchet strap", 50, 50, 1_200)], day(30)),
    ];

    PurchaseFixtures {
        orders,
        suppliers,
        budgets,
    }
}

//! # Storefront
//!
//! Backends of the provider storefront workspace (`/api/provider/storefront`):
//! the profile, inventory items and coupons. Inventory items are the primary
//! collection.
//!
//! ```text
//! GET    /api/provider/storefront?status=&search=
//!                                     { data: { storefront, inventory, coupons }, meta? }
//! PUT    /api/provider/storefront                      profile
//! GET    /api/provider/storefront/inventory/:id
//! POST   /api/provider/storefront/inventory
//! PATCH  /api/provider/storefront/inventory/:id
//! POST   /api/provider/storefront/inventory/:id/status { status }
//! POST   /api/provider/storefront/coupons
//! PATCH  /api/provider/storefront/coupons/:id
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use marketdesk_core::lifecycle::Lifecycle;
use marketdesk_core::storefront::{
    Coupon, InventoryItem, InventoryStatus, StorefrontMutation, StorefrontOutcome, StorefrontProfile,
    StorefrontQuery, StorefrontWorkspace,
};
use marketdesk_core::types::event_types;
use marketdesk_core::{CoreError, ListMeta, ListQuery, Mutation, QueryParams, TimelineEvent, Workspace};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ApiClient, ApiPath, Envelope};
use crate::backend::{not_found_as_none, BackendMode, WorkspaceBackend};
use crate::config::ConsoleConfig;
use crate::demo::{demo_event, demo_id, matches_search, not_found, rejection, DemoLatency};
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::store::WorkspaceStore;

use super::select_backend;

pub const ROOT: &str = "/api/provider/storefront";
pub const SERVICE: &str = "storefront";

pub fn backend(config: &ConsoleConfig) -> WorkspaceResult<Arc<dyn WorkspaceBackend<StorefrontWorkspace>>> {
    select_backend(
        config,
        SERVICE,
        |api| Arc::new(RemoteStorefrontBackend::new(api)),
        |latency| Arc::new(DemoStorefrontBackend::new(latency)),
    )
}

pub fn store(config: &ConsoleConfig) -> WorkspaceResult<WorkspaceStore<StorefrontWorkspace>> {
    Ok(WorkspaceStore::new(backend(config)?, config.workspace.clone()))
}

// =============================================================================
// Remote Backend
// =============================================================================

#[derive(Deserialize)]
struct StorefrontData {
    #[serde(default)]
    storefront: Option<StorefrontProfile>,
    #[serde(default)]
    inventory: Vec<InventoryItem>,
    #[serde(default)]
    coupons: Vec<Coupon>,
}

#[derive(Serialize)]
struct StatusBody {
    status: InventoryStatus,
}

pub struct RemoteStorefrontBackend {
    api: ApiClient,
}

impl RemoteStorefrontBackend {
    pub fn new(api: ApiClient) -> Self {
        RemoteStorefrontBackend { api }
    }
}

#[async_trait]
impl WorkspaceBackend<StorefrontWorkspace> for RemoteStorefrontBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Remote
    }

    async fn fetch_workspace(&self, query: &StorefrontQuery, cancel: &CancellationToken) -> WorkspaceResult<StorefrontWorkspace> {
        let body = self.api.get(ROOT, &query.to_params(), cancel).await?;
        let envelope: Envelope<StorefrontData> = self.api.envelope(body)?;

        let meta = envelope.meta_or_total(envelope.data.inventory.len());

        Ok(StorefrontWorkspace {
            storefront: envelope.data.storefront,
            inventory: envelope.data.inventory,
            coupons: envelope.data.coupons,
            meta,
        })
    }

    async fn fetch_entity(&self, id: &str, cancel: &CancellationToken) -> WorkspaceResult<Option<InventoryItem>> {
        let path = ApiPath::new(ROOT).segment("inventory").segment(id);
        match not_found_as_none(self.api.get(path, &QueryParams::new(), cancel).await)? {
            Some(body) => Ok(Some(self.api.data(body)?)),
            None => Ok(None),
        }
    }

    async fn apply(&self, mutation: &StorefrontMutation, cancel: &CancellationToken) -> WorkspaceResult<StorefrontOutcome> {
        let api = &self.api;
        match mutation {
            StorefrontMutation::UpdateProfile(input) => {
                let body = api.put(ROOT, Some(input), cancel).await?;
                Ok(StorefrontOutcome::Profile(api.data(body)?))
            }
            StorefrontMutation::CreateItem(input) => {
                let body = api.post(ApiPath::new(ROOT).segment("inventory"), Some(input), cancel).await?;
                Ok(StorefrontOutcome::Item(api.data(body)?))
            }
            StorefrontMutation::UpdateItem { id, input } => {
                let path = ApiPath::new(ROOT).segment("inventory").segment(id);
                let body = api.patch(path, Some(input), cancel).await?;
                Ok(StorefrontOutcome::Item(api.data(body)?))
            }
            StorefrontMutation::SetItemStatus { id, status } => {
                let payload = StatusBody { status: *status };
                let path = ApiPath::new(ROOT).segment("inventory").segment(id).segment("status");
                let body = api.post(path, Some(&payload), cancel).await?;
                Ok(StorefrontOutcome::Item(api.data(body)?))
            }
            StorefrontMutation::CreateCoupon(input) => {
                let body = api.post(ApiPath::new(ROOT).segment("coupons"), Some(input), cancel).await?;
                Ok(StorefrontOutcome::Coupon(api.data(body)?))
            }
            StorefrontMutation::UpdateCoupon { id, input } => {
                let path = ApiPath::new(ROOT).segment("coupons").segment(id);
                let body = api.patch(path, Some(input), cancel).await?;
                Ok(StorefrontOutcome::Coupon(api.data(body)?))
            }
        }
    }
}

// =============================================================================
// Demo Backend
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct StorefrontFixtures {
    pub storefront: Option<StorefrontProfile>,
    pub inventory: Vec<InventoryItem>,
    pub coupons: Vec<Coupon>,
}

pub struct DemoStorefrontBackend {
    fixtures: Mutex<StorefrontFixtures>,
    latency: DemoLatency,
}

impl DemoStorefrontBackend {
    pub fn new(latency: DemoLatency) -> Self {
        Self::with_fixtures(seed_storefront(Utc::now()), latency)
    }

    pub fn with_fixtures(fixtures: StorefrontFixtures, latency: DemoLatency) -> Self {
        DemoStorefrontBackend {
            fixtures: Mutex::new(fixtures),
            latency,
        }
    }
}

fn find_item<'a>(inventory: &'a mut [InventoryItem], id: &str) -> WorkspaceResult<&'a mut InventoryItem> {
    inventory
        .iter_mut()
        .find(|i| i.id == id)
        .ok_or_else(|| not_found("Inventory item", id))
}

fn conflict(message: String) -> WorkspaceError {
    WorkspaceError::Server {
        status: 409,
        message,
        details: None,
    }
}

#[async_trait]
impl WorkspaceBackend<StorefrontWorkspace> for DemoStorefrontBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Demo
    }

    async fn fetch_workspace(&self, query: &StorefrontQuery, cancel: &CancellationToken) -> WorkspaceResult<StorefrontWorkspace> {
        self.latency.pause_or_cancel(cancel).await?;
        let fixtures = self.fixtures.lock().await;

        let inventory: Vec<InventoryItem> = fixtures
            .inventory
            .iter()
            .filter(|i| query.status.map_or(true, |s| i.status == s))
            .filter(|i| matches_search(query.search(), [i.sku.as_str(), i.title.as_str()]))
            .cloned()
            .collect();

        Ok(StorefrontWorkspace {
            storefront: fixtures.storefront.clone(),
            meta: ListMeta {
                total: inventory.len() as u32,
                page: None,
                per_page: None,
            },
            inventory,
            coupons: fixtures.coupons.clone(),
        })
    }

    async fn fetch_entity(&self, id: &str, cancel: &CancellationToken) -> WorkspaceResult<Option<InventoryItem>> {
        self.latency.pause_or_cancel(cancel).await?;
        Ok(self.fixtures.lock().await.inventory.iter().find(|i| i.id == id).cloned())
    }

    async fn apply(&self, mutation: &StorefrontMutation, cancel: &CancellationToken) -> WorkspaceResult<StorefrontOutcome> {
        self.latency.pause_or_cancel(cancel).await?;
        mutation.validate().map_err(|e| rejection(CoreError::Validation(e)))?;

        let now = Utc::now();
        let mut fixtures = self.fixtures.lock().await;

        let outcome = match mutation {
            StorefrontMutation::UpdateProfile(input) => {
                let id = fixtures
                    .storefront
                    .as_ref()
                    .map(|s| s.id.clone())
                    .unwrap_or_else(|| demo_id("store"));
                let profile = StorefrontProfile {
                    id,
                    name: input.name.trim().to_string(),
                    slug: input.slug.clone(),
                    description: input.description.clone(),
                    published: input.published,
                };
                fixtures.storefront = Some(profile.clone());
                StorefrontOutcome::Profile(profile)
            }
            StorefrontMutation::CreateItem(input) => {
                if fixtures.inventory.iter().any(|i| i.sku.eq_ignore_ascii_case(input.sku.trim())) {
                    return Err(conflict(format!("SKU {} already exists", input.sku.trim())));
                }
                let item = InventoryItem {
                    id: demo_id("inv"),
                    sku: input.sku.trim().to_string(),
                    title: input.title.trim().to_string(),
                    price_cents: input.price_cents,
                    stock: input.stock,
                    status: InventoryStatus::Draft,
                    timeline: vec![demo_event(
                        event_types::STATUS_CHANGE,
                        "Item drafted",
                        json!({ "to": InventoryStatus::Draft.as_str() }),
                    )],
                    created_at: now,
                    updated_at: now,
                };
                fixtures.inventory.insert(0, item.clone());
                StorefrontOutcome::Item(item)
            }
            StorefrontMutation::UpdateItem { id, input } => {
                let item = find_item(&mut fixtures.inventory, id)?;
                StorefrontWorkspace::check_transition(item, mutation).map_err(rejection)?;
                input.apply_to(item);
                item.timeline.push(demo_event(
                    event_types::UPDATED,
                    "Item updated",
                    serde_json::to_value(input).unwrap_or_default(),
                ));
                item.updated_at = now;
                StorefrontOutcome::Item(item.clone())
            }
            StorefrontMutation::SetItemStatus { id, status } => {
                let item = find_item(&mut fixtures.inventory, id)?;
                StorefrontWorkspace::check_transition(item, mutation).map_err(rejection)?;
                let from = item.status;
                item.status = *status;
                item.timeline.push(demo_event(
                    event_types::STATUS_CHANGE,
                    format!("Item {}", status.as_str()),
                    json!({ "from": from.as_str(), "to": status.as_str() }),
                ));
                item.updated_at = now;
                StorefrontOutcome::Item(item.clone())
            }
            StorefrontMutation::CreateCoupon(input) => {
                let code = input.code.trim().to_string();
                if fixtures.coupons.iter().any(|c| c.code == code) {
                    return Err(conflict(format!("Coupon {} already exists", code)));
                }
                let coupon = Coupon {
                    id: demo_id("cpn"),
                    code,
                    percent_off_bps: input.percent_off_bps,
                    active: true,
                    expires_at: input.expires_at,
                    redemptions: 0,
                };
                fixtures.coupons.insert(0, coupon.clone());
                StorefrontOutcome::Coupon(coupon)
            }
            StorefrontMutation::UpdateCoupon { id, input } => {
                let coupon = fixtures
                    .coupons
                    .iter_mut()
                    .find(|c| c.id == *id)
                    .ok_or_else(|| not_found("Coupon", id))?;
                input.apply_to(coupon);
                StorefrontOutcome::Coupon(coupon.clone())
            }
        };

        debug!(action = mutation.label(), "Demo storefront changed");
        Ok(outcome)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn seed_item(id: &str, sku: &str, title: &str, price_cents: i64, stock: i64, status: InventoryStatus, created_at: DateTime<Utc>) -> InventoryItem {
    InventoryItem {
        id: id.to_string(),
        sku: sku.to_string(),
        title: title.to_string(),
        price_cents,
        stock,
        status,
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

/// Seeded profile, catalogue and coupons.
pub fn seed_storefront(now: DateTime<Utc>) -> StorefrontFixtures {
    use InventoryStatus::*;

    let day = |n: i64| now - Duration::days(n);

    StorefrontFixtures {
        storefront: Some(StorefrontProfile {
            id: "store-1".to_string(),
            name: "Lakeside Gear Co.".to_string(),
            slug: "lakeside-gear".to_string(),
            description: Some("Paddle, camp and fish rentals by the marina".to_string()),
            published: true,
        }),
        inventory: vec![
            seed_item("inv-301", "SUP-11", "Inflatable paddle board", 45_000, 6, Active, day(2)),
            seed_item("inv-302", "KAYAK-2P", "Two person kayak", 89_000, 0, Active, day(5)),
            seed_item("inv-303", "TENT-4", "Four person tent", 32_000, 4, Inactive, day(9)),
            seed_item("inv-304", "ROD-7FT", "Spinning rod 7ft", 12_500, 10, Draft, day(12)),
            seed_item("inv-305", "COOLER-50", "50qt cooler", 9_900, 3, Archived, day(40)),
        ],
        coupons: vec![
            Coupon {
                id: "cpn-1".to_string(),
                code: "SUMMER-10".to_string(),
                percent_off_bps: 1_000,
                active: true,
                expires_at: Some(now + Duration::days(30)),
                redemptions: 14,
            },
            Coupon {
                id: "cpn-2".to_string(),
                code: "WELCOME".to_string(),
                percent_off_bps: 500,
                active: false,
                expires_at: None,
                redemptions: 52,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketdesk_core::storefront::{CreateCouponInput, CreateInventoryItemInput, UpdateCouponInput};
    use std::time::Duration as StdDuration;

    fn backend() -> DemoStorefrontBackend {
        DemoStorefrontBackend::new(DemoLatency::new(StdDuration::ZERO, StdDuration::ZERO))
    }

    #[tokio::test]
    async fn test_demo_item_lifecycle() {
        let backend = backend();
        let token = CancellationToken::new();

        let created = backend
            .apply(
                &StorefrontMutation::CreateItem(CreateInventoryItemInput {
                    sku: "LIFEVEST-M".to_string(),
                    title: "Life vest, medium".to_string(),
                    price_cents: 4_500,
                    stock: 12,
                }),
                &token,
            )
            .await
            .unwrap();
        let StorefrontOutcome::Item(item) = created else {
            panic!("expected an item");
        };
        assert_eq!(item.status, InventoryStatus::Draft);

        let activated = backend
            .apply(
                &StorefrontMutation::SetItemStatus {
                    id: item.id.clone(),
                    status: InventoryStatus::Active,
                },
                &token,
            )
            .await
            .unwrap();
        assert!(matches!(activated, StorefrontOutcome::Item(ref i) if i.status == InventoryStatus::Active));

        let err = backend
            .apply(
                &StorefrontMutation::SetItemStatus {
                    id: "inv-305".to_string(),
                    status: InventoryStatus::Active,
                },
                &token,
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
    }

    #[tokio::test]
    async fn test_demo_duplicate_sku_and_coupon() {
        let backend = backend();
        let token = CancellationToken::new();

        let err = backend
            .apply(
                &StorefrontMutation::CreateItem(CreateInventoryItemInput {
                    sku: "sup-11".to_string(),
                    title: "Another board".to_string(),
                    price_cents: 100,
                    stock: 1,
                }),
                &token,
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));

        let err = backend
            .apply(
                &StorefrontMutation::CreateCoupon(CreateCouponInput {
                    code: "WELCOME".to_string(),
                    percent_off_bps: 500,
                    expires_at: None,
                }),
                &token,
            )
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Coupon WELCOME already exists");
    }

    #[tokio::test]
    async fn test_demo_summary_tracks_coupons() {
        let backend = backend();
        let token = CancellationToken::new();

        let before = backend
            .fetch_workspace(&StorefrontQuery::default(), &token)
            .await
            .unwrap()
            .summary();
        assert_eq!(before.item_count, 5);
        assert_eq!(before.out_of_stock, 1);
        assert_eq!(before.active_coupons, 1);
        assert_eq!(before.inventory_value_cents, 45_000 * 6 + 32_000 * 4 + 12_500 * 10);
        assert!(before.published);

        backend
            .apply(
                &StorefrontMutation::UpdateCoupon {
                    id: "cpn-2".to_string(),
                    input: UpdateCouponInput {
                        active: Some(true),
                        ..Default::default()
                    },
                },
                &token,
            )
            .await
            .unwrap();

        let after = backend
            .fetch_workspace(&StorefrontQuery::default(), &token)
            .await
            .unwrap()
            .summary();
        assert_eq!(after.active_coupons, 2);
    }
}

//! # Storefront Module
//!
//! A provider's public storefront: the profile, the catalogue of inventory
//! items and the discount coupons.
//!
//! ## Inventory Item Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   draft ──activate──► active ◄──activate── inactive                     │
//! │     │                   │  └──deactivate──────►│                        │
//! │     │                   │                      │                        │
//! │     └──────archive──────┴───────archive────────┴──► archived            │
//! │                                                                         │
//! │   Archived items are read-only and excluded from inventory value.       │
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
    validate_coupon_code, validate_max_length, validate_percent_bps, validate_price_cents,
    validate_required, validate_sku, validate_slug, validate_stock, validate_title,
};
use crate::workspace::{upsert_entity, Entity, ListQuery, Mutation, Workspace};
use crate::MAX_NOTES_LENGTH;

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    Draft,
    Active,
    Inactive,
    Archived,
}

impl Lifecycle for InventoryStatus {
    const ALL: &'static [Self] = &[
        InventoryStatus::Draft,
        InventoryStatus::Active,
        InventoryStatus::Inactive,
        InventoryStatus::Archived,
    ];

    fn transitions(self) -> &'static [Self] {
        use InventoryStatus::*;
        match self {
            Draft => &[Active, Archived],
            Active => &[Inactive, Archived],
            Inactive => &[Active, Archived],
            Archived => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            InventoryStatus::Draft => "draft",
            InventoryStatus::Active => "active",
            InventoryStatus::Inactive => "inactive",
            InventoryStatus::Archived => "archived",
        }
    }
}

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontProfile {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub sku: String,
    pub title: String,
    pub price_cents: i64,
    pub stock: i64,
    pub status: InventoryStatus,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn capabilities(&self) -> InventoryCapabilities {
        InventoryCapabilities::for_status(self.status)
    }

    /// Price × stock.
    pub fn stock_value(&self) -> Money {
        Money::from_cents(self.price_cents).multiply_quantity(self.stock)
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.status == InventoryStatus::Active && self.stock <= 0
    }
}

impl Entity for InventoryItem {
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
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub percent_off_bps: u32,
    pub active: bool,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub redemptions: u32,
}

impl Coupon {
    /// Active and not past its expiry at `now`.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.map_or(true, |at| at > now)
    }

    /// Price after this coupon.
    pub fn apply(&self, price: Money) -> Money {
        price.apply_percentage_discount(self.percent_off_bps)
    }
}

// =============================================================================
// Actions & Capabilities
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryAction {
    Activate,
    Deactivate,
    Archive,
}

impl LifecycleAction for InventoryAction {
    type Status = InventoryStatus;

    const ALL: &'static [Self] = &[
        InventoryAction::Activate,
        InventoryAction::Deactivate,
        InventoryAction::Archive,
    ];

    fn target(self) -> InventoryStatus {
        match self {
            InventoryAction::Activate => InventoryStatus::Active,
            InventoryAction::Deactivate => InventoryStatus::Inactive,
            InventoryAction::Archive => InventoryStatus::Archived,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCapabilities {
    pub can_activate: bool,
    pub can_deactivate: bool,
    pub can_archive: bool,
    pub can_edit: bool,
}

impl InventoryCapabilities {
    pub fn for_status(status: InventoryStatus) -> Self {
        InventoryCapabilities {
            can_activate: InventoryAction::Activate.is_enabled_for(status),
            can_deactivate: InventoryAction::Deactivate.is_enabled_for(status),
            can_archive: InventoryAction::Archive.is_enabled_for(status),
            can_edit: !status.is_terminal(),
        }
    }
}

// =============================================================================
// Query
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorefrontQuery {
    pub status: Option<InventoryStatus>,
    pub search: String,
}

impl ListQuery for StorefrontQuery {
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

/// Body of `PUT /api/provider/storefront`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontProfileInput {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub published: bool,
}

impl StorefrontProfileInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title("name", &self.name)?;
        validate_slug(&self.slug)?;
        if let Some(description) = &self.description {
            validate_max_length("description", description, MAX_NOTES_LENGTH)?;
        }
        Ok(())
    }
}

/// Body of `POST /api/provider/storefront/inventory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryItemInput {
    pub sku: String,
    pub title: String,
    pub price_cents: i64,
    pub stock: i64,
}

impl CreateInventoryItemInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_sku(&self.sku)?;
        validate_title("title", &self.title)?;
        validate_price_cents("priceCents", self.price_cents)?;
        validate_stock(self.stock)
    }
}

/// Body of `PATCH /api/provider/storefront/inventory/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventoryItemInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

impl UpdateInventoryItemInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if *self == UpdateInventoryItemInput::default() {
            return Err(ValidationError::Required {
                field: "changes".to_string(),
            });
        }
        if let Some(title) = &self.title {
            validate_title("title", title)?;
        }
        if let Some(cents) = self.price_cents {
            validate_price_cents("priceCents", cents)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, item: &mut InventoryItem) {
        if let Some(title) = &self.title {
            item.title = title.trim().to_string();
        }
        if let Some(cents) = self.price_cents {
            item.price_cents = cents;
        }
        if let Some(stock) = self.stock {
            item.stock = stock;
        }
    }
}

/// Body of `POST /api/provider/storefront/coupons`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponInput {
    pub code: String,
    pub percent_off_bps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateCouponInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_coupon_code(&self.code)?;
        validate_percent_bps("percentOffBps", self.percent_off_bps)
    }
}

/// Body of `PATCH /api/provider/storefront/coupons/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_off_bps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl UpdateCouponInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if *self == UpdateCouponInput::default() {
            return Err(ValidationError::Required {
                field: "changes".to_string(),
            });
        }
        if let Some(bps) = self.percent_off_bps {
            validate_percent_bps("percentOffBps", bps)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, coupon: &mut Coupon) {
        if let Some(active) = self.active {
            coupon.active = active;
        }
        if let Some(bps) = self.percent_off_bps {
            coupon.percent_off_bps = bps;
        }
        if self.expires_at.is_some() {
            coupon.expires_at = self.expires_at;
        }
    }
}

// =============================================================================
// Mutations
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum StorefrontMutation {
    UpdateProfile(StorefrontProfileInput),
    CreateItem(CreateInventoryItemInput),
    UpdateItem {
        id: String,
        input: UpdateInventoryItemInput,
    },
    SetItemStatus {
        id: String,
        status: InventoryStatus,
    },
    CreateCoupon(CreateCouponInput),
    UpdateCoupon {
        id: String,
        input: UpdateCouponInput,
    },
}

impl Mutation for StorefrontMutation {
    fn label(&self) -> &'static str {
        match self {
            StorefrontMutation::UpdateProfile(_) => "update-profile",
            StorefrontMutation::CreateItem(_) => "create-item",
            StorefrontMutation::UpdateItem { .. } => "update-item",
            StorefrontMutation::SetItemStatus { .. } => "item-status",
            StorefrontMutation::CreateCoupon(_) => "create-coupon",
            StorefrontMutation::UpdateCoupon { .. } => "update-coupon",
        }
    }

    fn target_id(&self) -> Option<&str> {
        match self {
            StorefrontMutation::UpdateItem { id, .. } | StorefrontMutation::SetItemStatus { id, .. } => {
                Some(id)
            }
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StorefrontMutation::UpdateProfile(input) => input.validate(),
            StorefrontMutation::CreateItem(input) => input.validate(),
            StorefrontMutation::UpdateItem { id, input } => {
                validate_required("id", id)?;
                input.validate()
            }
            StorefrontMutation::SetItemStatus { id, .. } => validate_required("id", id),
            StorefrontMutation::CreateCoupon(input) => input.validate(),
            StorefrontMutation::UpdateCoupon { id, input } => {
                validate_required("id", id)?;
                input.validate()
            }
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            StorefrontMutation::UpdateProfile(_) => "Storefront saved",
            StorefrontMutation::CreateItem(_) => "Item added",
            StorefrontMutation::UpdateItem { .. } => "Item updated",
            StorefrontMutation::SetItemStatus { .. } => "Item status updated",
            StorefrontMutation::CreateCoupon(_) => "Coupon created",
            StorefrontMutation::UpdateCoupon { .. } => "Coupon updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorefrontOutcome {
    Profile(StorefrontProfile),
    Item(InventoryItem),
    Coupon(Coupon),
}

// =============================================================================
// Workspace
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontWorkspace {
    #[serde(default)]
    pub storefront: Option<StorefrontProfile>,
    pub inventory: Vec<InventoryItem>,
    #[serde(default)]
    pub coupons: Vec<Coupon>,
    #[serde(default)]
    pub meta: ListMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontSummary {
    pub item_count: u32,
    pub by_status: BTreeMap<InventoryStatus, u32>,
    pub out_of_stock: u32,
    /// Price × stock over every item that is not archived.
    pub inventory_value_cents: i64,
    pub active_coupons: u32,
    pub published: bool,
}

impl Workspace for StorefrontWorkspace {
    type Entity = InventoryItem;
    type Query = StorefrontQuery;
    type Mutation = StorefrontMutation;
    type Outcome = StorefrontOutcome;
    type Summary = StorefrontSummary;

    const NAME: &'static str = "StorefrontWorkspace";

    fn entities(&self) -> &[InventoryItem] {
        &self.inventory
    }

    fn entities_mut(&mut self) -> &mut Vec<InventoryItem> {
        &mut self.inventory
    }

    fn summary(&self) -> StorefrontSummary {
        StorefrontSummary {
            item_count: self.inventory.len() as u32,
            by_status: status_breakdown(self.inventory.iter().map(|i| i.status)),
            out_of_stock: self.inventory.iter().filter(|i| i.is_out_of_stock()).count() as u32,
            inventory_value_cents: self
                .inventory
                .iter()
                .filter(|i| i.status != InventoryStatus::Archived)
                .map(InventoryItem::stock_value)
                .sum::<Money>()
                .cents(),
            active_coupons: self.coupons.iter().filter(|c| c.active).count() as u32,
            published: self.storefront.as_ref().map_or(false, |s| s.published),
        }
    }

    fn merge_outcome(&mut self, outcome: &StorefrontOutcome) {
        match outcome {
            StorefrontOutcome::Profile(profile) => self.storefront = Some(profile.clone()),
            StorefrontOutcome::Item(item) => upsert_entity(&mut self.inventory, item.clone()),
            StorefrontOutcome::Coupon(coupon) => {
                match self.coupons.iter_mut().find(|c| c.id == coupon.id) {
                    Some(existing) => *existing = coupon.clone(),
                    None => self.coupons.insert(0, coupon.clone()),
                }
            }
        }
    }

    fn outcome_entity(outcome: &StorefrontOutcome) -> Option<&InventoryItem> {
        match outcome {
            StorefrontOutcome::Item(item) => Some(item),
            _ => None,
        }
    }

    fn check_transition(item: &InventoryItem, mutation: &StorefrontMutation) -> CoreResult<()> {
        match mutation {
            StorefrontMutation::SetItemStatus { status, .. } => {
                ensure_transition(&item.id, item.status, *status)
            }
            StorefrontMutation::UpdateItem { .. } => ensure_not_terminal(&item.id, item.status),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::enabled_actions;
    use crate::CoreError;
    use chrono::{Duration, TimeZone};

    fn item(id: &str, status: InventoryStatus, price: i64, stock: i64) -> InventoryItem {
        let at = Utc.with_ymd_and_hms(2026, 1, 20, 12, 0, 0).unwrap();
        InventoryItem {
            id: id.to_string(),
            sku: format!("SKU-{}", id),
            title: "Paddle board".to_string(),
            price_cents: price,
            stock,
            status,
            timeline: vec![],
            created_at: at,
            updated_at: at,
        }
    }

    fn coupon(id: &str, active: bool) -> Coupon {
        Coupon {
            id: id.to_string(),
            code: "SPRING-20".to_string(),
            percent_off_bps: 2_000,
            active,
            expires_at: None,
            redemptions: 0,
        }
    }

    #[test]
    fn test_enabled_actions_match_table_for_every_status() {
        for status in InventoryStatus::ALL {
            let targets: Vec<InventoryStatus> = enabled_actions::<InventoryAction>(*status)
                .into_iter()
                .map(|a| a.target())
                .collect();
            assert_eq!(targets, status.transitions(), "status {:?}", status);
        }
    }

    #[test]
    fn test_summary() {
        let ws = StorefrontWorkspace {
            storefront: Some(StorefrontProfile {
                id: "sf-1".to_string(),
                name: "Harbor Rentals".to_string(),
                slug: "harbor-rentals".to_string(),
                description: None,
                published: true,
            }),
            inventory: vec![
                item("1", InventoryStatus::Active, 1_000, 3),
                item("2", InventoryStatus::Active, 2_500, 0),
                item("3", InventoryStatus::Inactive, 500, 4),
                item("4", InventoryStatus::Archived, 9_999, 10),
            ],
            coupons: vec![coupon("c1", true), coupon("c2", false)],
            meta: ListMeta::default(),
        };

        let summary = ws.summary();
        assert_eq!(summary.item_count, 4);
        assert_eq!(summary.out_of_stock, 1);
        assert_eq!(summary.inventory_value_cents, 3_000 + 2_000);
        assert_eq!(summary.active_coupons, 1);
        assert!(summary.published);
        assert_eq!(summary, ws.summary());
    }

    #[test]
    fn test_archived_item_is_read_only() {
        let archived = item("4", InventoryStatus::Archived, 100, 1);
        let reactivate = StorefrontMutation::SetItemStatus {
            id: "4".to_string(),
            status: InventoryStatus::Active,
        };
        assert!(matches!(
            StorefrontWorkspace::check_transition(&archived, &reactivate),
            Err(CoreError::InvalidTransition { .. })
        ));
        assert!(!archived.capabilities().can_edit);
    }

    #[test]
    fn test_merge_outcomes() {
        let mut ws = StorefrontWorkspace::default();
        ws.merge_outcome(&StorefrontOutcome::Coupon(coupon("c1", true)));
        ws.merge_outcome(&StorefrontOutcome::Coupon(coupon("c1", false)));
        assert_eq!(ws.coupons.len(), 1);
        assert!(!ws.coupons[0].active);

        ws.merge_outcome(&StorefrontOutcome::Item(item("1", InventoryStatus::Draft, 100, 1)));
        assert_eq!(ws.inventory.len(), 1);
    }

    #[test]
    fn test_coupon_redeemable_and_discount() {
        let now = Utc::now();
        let mut c = coupon("c1", true);
        assert!(c.is_redeemable(now));
        assert_eq!(c.apply(Money::from_cents(10_000)).cents(), 8_000);

        c.expires_at = Some(now - Duration::days(1));
        assert!(!c.is_redeemable(now));
    }

    #[test]
    fn test_profile_validation() {
        let input = StorefrontProfileInput {
            name: "Harbor Rentals".to_string(),
            slug: "Harbor Rentals".to_string(),
            description: None,
            published: false,
        };
        assert_eq!(input.validate().unwrap_err().field(), "slug");
    }
}

//! # marketdesk-core: Pure Domain Logic for the Marketplace Admin Console
//!
//! This crate holds every rule of the admin workspaces that can be expressed
//! without I/O: entity shapes, status adjacency tables, summary computation,
//! the snapshot merge function and client-side validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Marketdesk Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Admin console (browser, TS)                     │   │
//! │  │   Rentals ── Purchases ── Bookings ── Storefront panels         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ store actions / snapshots              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 marketdesk-sync (WorkspaceStore)                │   │
//! │  │   ApiClient ── Remote/Demo backends ── fetch families           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ marketdesk-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ workspace │  │ lifecycle │  │  modules  │  │ validation│  │   │
//! │  │   │  Entity   │  │ adjacency │  │  rental   │  │   rules   │  │   │
//! │  │   │  merge    │  │  actions  │  │  purchase │  │   checks  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO TIMERS • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Shared records (timeline events, list meta, query params)
//! - [`workspace`] - `Entity` / `Workspace` traits and the merge function
//! - [`lifecycle`] - Status adjacency tables and action gating
//! - [`money`] - Integer money (cents)
//! - [`error`] - Domain error types
//! - [`validation`] - Client-side input validation
//! - [`rental`], [`purchase`], [`booking`], [`storefront`] - Feature areas
//!
//! ## Example Usage
//!
//! ```rust
//! use marketdesk_core::lifecycle::Lifecycle;
//! use marketdesk_core::purchase::PurchaseOrderStatus;
//!
//! let next = PurchaseOrderStatus::Sent.transitions();
//! assert_eq!(
//!     next,
//!     &[
//!         PurchaseOrderStatus::Partial,
//!         PurchaseOrderStatus::Received,
//!         PurchaseOrderStatus::Cancelled,
//!     ]
//! );
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;
pub mod workspace;

pub mod booking;
pub mod purchase;
pub mod rental;
pub mod storefront;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use lifecycle::{Lifecycle, LifecycleAction};
pub use money::Money;
pub use types::{ListMeta, QueryParams, TimelineEvent};
pub use workspace::{Entity, ListQuery, Mutation, Workspace};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum units of one item on a single rental.
pub const MAX_RENTAL_QUANTITY: i64 = 999;

/// Maximum units on a single purchase order line.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Maximum lines on a purchase order.
pub const MAX_ORDER_LINES: usize = 200;

/// Maximum length of a free-text search query.
pub const MAX_SEARCH_LENGTH: usize = 100;

/// Maximum length of free-text notes attached to an entity.
pub const MAX_NOTES_LENGTH: usize = 2000;

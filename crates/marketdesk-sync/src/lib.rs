//! # marketdesk-sync: Workspace Stores for the Marketdesk Admin Console
//!
//! This crate owns everything about a workspace that touches the network or
//! a clock: the REST client, the remote/demo backends, request supersession,
//! debounced search and the per-workspace store that panels read from.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Workspace Store Architecture                      │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                WorkspaceStore<W> (single writer)                 │  │
//! │  │                                                                  │  │
//! │  │  list / selected / mutation / query snapshot behind a RwLock    │  │
//! │  │  load ── set_filter ── set_search ── select ── mutate           │  │
//! │  └───────────┬──────────────────────┬───────────────────────┬───────┘  │
//! │              ▼                      ▼                       ▼          │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌─────────────────┐  │
//! │  │    FetchFamily     │  │ WorkspaceBackend<W>│  │ EventEmitter    │  │
//! │  │                    │  │                    │  │                 │  │
//! │  │ generation counter │  │ Remote (ApiClient) │  │ list / detail / │  │
//! │  │ + cancel token,    │  │ or Demo (fixtures),│  │ notice changes  │  │
//! │  │ newest wins        │  │ chosen once        │  │                 │  │
//! │  └────────────────────┘  └─────────┬──────────┘  └─────────────────┘  │
//! │                                    ▼                                   │
//! │                      ┌──────────────────────────┐                      │
//! │                      │        ApiClient         │                      │
//! │                      │ reqwest, cookie jar,     │                      │
//! │                      │ { data, meta } envelope  │                      │
//! │                      └──────────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! ### Plumbing
//! - [`api`] - REST client and error wrapping
//! - [`config`] - Console configuration (API base URL, debounce, demo flag)
//! - [`error`] - Workspace error types
//! - [`family`] - Fetch families (supersession + cancellation)
//! - [`telemetry`] - Tracing subscriber setup
//!
//! ### Workspaces
//! - [`backend`] - `WorkspaceBackend` trait
//! - [`demo`] - Demo gate, latency and synthetic events
//! - [`store`] - `WorkspaceStore` and its snapshot types
//! - [`scope`] - Provider lookup for stores
//! - [`modules`] - Rentals, purchases, bookings and storefront backends
//!
//! ## Usage
//!
//! ```rust,ignore
//! use marketdesk_core::rental::RentalStatus;
//! use marketdesk_sync::{modules::rentals, ConsoleConfig};
//!
//! let config = ConsoleConfig::load_or_default(None);
//! let store = rentals::store(&config)?;
//!
//! store.load().await?;
//! store.set_search("kayak").await?;
//!
//! let snapshot = store.snapshot().await;
//! println!("{} rentals", snapshot.list.data.map_or(0, |w| w.rentals.len()));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod config;
pub mod error;
pub mod family;
pub mod telemetry;

pub mod backend;
pub mod demo;
pub mod modules;
pub mod scope;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::{ApiClient, ApiPath, Envelope};
pub use backend::{BackendMode, WorkspaceBackend};
pub use config::{ApiSettings, ConsoleConfig, DemoSettings, WorkspaceSettings};
pub use demo::{BuildProfile, DemoGate, DemoLatency};
pub use error::{WorkspaceError, WorkspaceResult};
pub use family::{FetchFamily, FetchTicket};
pub use scope::WorkspaceScope;
pub use store::{
    DetailPhase, ErrorBanner, ListState, LoadPhase, MutationNotice, MutationState, NoOpEmitter, NoticeKind,
    SelectedState, WorkspaceEventEmitter, WorkspaceState, WorkspaceStore,
};

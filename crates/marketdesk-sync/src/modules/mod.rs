//! # Feature Areas
//!
//! One module per admin workspace. Each exposes a remote backend, a demo
//! backend, `backend(&config)` which picks between them, and `store(&config)`.
//!
//! | Module | Workspace | REST root |
//! |--------|-----------|-----------|
//! | [`rentals`] | `RentalWorkspace` | `/api/admin/rentals` |
//! | [`purchases`] | `PurchaseWorkspace` | `/api/admin/purchases` |
//! | [`bookings`] | `BookingWorkspace` | `/api/provider/bookings` |
//! | [`storefront`] | `StorefrontWorkspace` | `/api/provider/storefront` |

pub mod bookings;
pub mod purchases;
pub mod rentals;
pub mod storefront;

use std::sync::Arc;

use marketdesk_core::Workspace;
use tracing::info;

use crate::api::ApiClient;
use crate::backend::WorkspaceBackend;
use crate::config::ConsoleConfig;
use crate::demo::{DemoGate, DemoLatency};
use crate::error::WorkspaceResult;

/// Builds the demo backend when the gate is open, the remote one otherwise.
fn select_backend<W: Workspace>(
    config: &ConsoleConfig,
    service: &'static str,
    remote: impl FnOnce(ApiClient) -> Arc<dyn WorkspaceBackend<W>>,
    demo: impl FnOnce(DemoLatency) -> Arc<dyn WorkspaceBackend<W>>,
) -> WorkspaceResult<Arc<dyn WorkspaceBackend<W>>> {
    if DemoGate::from_config(config).is_enabled() {
        info!(workspace = W::NAME, "Demo mode: serving seeded fixtures");
        return Ok(demo(DemoLatency::from_config(config)));
    }

    let api = ApiClient::new(&config.api, service)?;
    info!(workspace = W::NAME, base_url = %config.api.base_url, "Remote backend");
    Ok(remote(api))
}

//! # Workspace Preview
//!
//! Loads every workspace once and prints its summary. Useful for checking a
//! backend from a terminal.
//!
//! ```text
//! MARKETDESK_API_URL=https://admin.example.com \
//! MARKETDESK_SESSION_COOKIE="session=..." cargo run --bin preview
//!
//! # seeded fixtures (development builds only)
//! MARKETDESK_DEMO_URL="/admin?demo=1" cargo run --bin preview
//! ```

use marketdesk_core::booking::BookingWorkspace;
use marketdesk_core::purchase::PurchaseWorkspace;
use marketdesk_core::rental::RentalWorkspace;
use marketdesk_core::storefront::StorefrontWorkspace;
use marketdesk_core::Workspace;
use marketdesk_sync::modules::{bookings, purchases, rentals, storefront};
use marketdesk_sync::telemetry::init_tracing;
use marketdesk_sync::{ConsoleConfig, WorkspaceScope, WorkspaceStore};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ConsoleConfig::load_or_default(None);
    config.validate()?;
    info!(base_url = %config.api.base_url, "Configuration loaded");

    let mut scope = WorkspaceScope::new();
    scope
        .provide(rentals::store(&config)?)
        .provide(purchases::store(&config)?)
        .provide(bookings::store(&config)?)
        .provide(storefront::store(&config)?);

    print_summary(&scope.try_get::<RentalWorkspace>()?).await;
    print_summary(&scope.try_get::<PurchaseWorkspace>()?).await;
    print_summary(&scope.try_get::<BookingWorkspace>()?).await;
    print_summary(&scope.try_get::<StorefrontWorkspace>()?).await;

    Ok(())
}

async fn print_summary<W: Workspace>(store: &WorkspaceStore<W>) {
    if let Err(e) = store.load().await {
        warn!(workspace = W::NAME, error = %e, "Load failed");
        println!("{} ({}): {}", W::NAME, store.mode(), e.user_message());
        return;
    }

    match store.summary().await {
        Some(summary) => println!("{} ({}): {:#?}", W::NAME, store.mode(), summary),
        None => println!("{} ({}): no data", W::NAME, store.mode()),
    }
}

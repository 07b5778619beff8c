//! # Bookings
//!
//! Backends of the provider booking workspace (`/api/provider/bookings`).
//!
//! ```text
//! GET    /api/provider/bookings?status=&providerId=&search=   { data: Booking[], meta }
//! GET    /api/provider/bookings/:id
//! POST   /api/provider/bookings/:id/confirm | start | complete
//! POST   /api/provider/bookings/:id/cancel    { reason? }
//! POST   /api/provider/bookings/:id/assign    { providerId }
//! PATCH  /api/provider/bookings/:id
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use marketdesk_core::booking::{Booking, BookingMutation, BookingQuery, BookingStatus, BookingWorkspace};
use marketdesk_core::lifecycle::Lifecycle;
use marketdesk_core::types::event_types;
use marketdesk_core::{CoreError, ListMeta, ListQuery, Mutation, QueryParams, TimelineEvent, Workspace};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ApiClient, ApiPath, Envelope};
use crate::backend::{not_found_as_none, BackendMode, WorkspaceBackend};
use crate::config::ConsoleConfig;
use crate::demo::{demo_event, matches_search, not_found, rejection, DemoLatency};
use crate::error::WorkspaceResult;
use crate::store::WorkspaceStore;

use super::select_backend;

pub const ROOT: &str = "/api/provider/bookings";
pub const SERVICE: &str = "bookings";

pub fn backend(config: &ConsoleConfig) -> WorkspaceResult<Arc<dyn WorkspaceBackend<BookingWorkspace>>> {
    select_backend(
        config,
        SERVICE,
        |api| Arc::new(RemoteBookingBackend::new(api)),
        |latency| Arc::new(DemoBookingBackend::new(latency)),
    )
}

pub fn store(config: &ConsoleConfig) -> WorkspaceResult<WorkspaceStore<BookingWorkspace>> {
    Ok(WorkspaceStore::new(backend(config)?, config.workspace.clone()))
}

// =============================================================================
// Remote Backend
// =============================================================================

#[derive(Serialize)]
struct CancelBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignBody<'a> {
    provider_id: &'a str,
}

pub struct RemoteBookingBackend {
    api: ApiClient,
}

impl RemoteBookingBackend {
    pub fn new(api: ApiClient) -> Self {
        RemoteBookingBackend { api }
    }
}

#[async_trait]
impl WorkspaceBackend<BookingWorkspace> for RemoteBookingBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Remote
    }

    async fn fetch_workspace(&self, query: &BookingQuery, cancel: &CancellationToken) -> WorkspaceResult<BookingWorkspace> {
        let body = self.api.get(ROOT, &query.to_params(), cancel).await?;
        let envelope: Envelope<Vec<Booking>> = self.api.envelope(body)?;
        let meta = envelope.meta_or_total(envelope.data.len());

        Ok(BookingWorkspace {
            bookings: envelope.data,
            meta,
        })
    }

    async fn fetch_entity(&self, id: &str, cancel: &CancellationToken) -> WorkspaceResult<Option<Booking>> {
        let path = ApiPath::new(ROOT).segment(id);
        match not_found_as_none(self.api.get(path, &QueryParams::new(), cancel).await)? {
            Some(body) => Ok(Some(self.api.data(body)?)),
            None => Ok(None),
        }
    }

    async fn apply(&self, mutation: &BookingMutation, cancel: &CancellationToken) -> WorkspaceResult<Booking> {
        let api = &self.api;
        let action = |id: &String| ApiPath::new(ROOT).segment(id.as_str()).segment(mutation.label());

        let body = match mutation {
            BookingMutation::Confirm { id } | BookingMutation::Start { id } | BookingMutation::Complete { id } => {
                api.post::<()>(action(id), None, cancel).await?
            }
            BookingMutation::Cancel { id, reason } => {
                let payload = CancelBody {
                    reason: reason.as_deref(),
                };
                api.post(action(id), Some(&payload), cancel).await?
            }
            BookingMutation::Assign { id, provider_id } => {
                let payload = AssignBody { provider_id };
                api.post(action(id), Some(&payload), cancel).await?
            }
            BookingMutation::Update { id, input } => api.patch(ApiPath::new(ROOT).segment(id), Some(input), cancel).await?,
        };

        api.data(body)
    }
}

// =============================================================================
// Demo Backend
// =============================================================================

pub struct DemoBookingBackend {
    bookings: Mutex<Vec<Booking>>,
    latency: DemoLatency,
}

impl DemoBookingBackend {
    pub fn new(latency: DemoLatency) -> Self {
        Self::with_fixtures(seed_bookings(Utc::now()), latency)
    }

    pub fn with_fixtures(bookings: Vec<Booking>, latency: DemoLatency) -> Self {
        DemoBookingBackend {
            bookings: Mutex::new(bookings),
            latency,
        }
    }
}

#[async_trait]
impl WorkspaceBackend<BookingWorkspace> for DemoBookingBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Demo
    }

    async fn fetch_workspace(&self, query: &BookingQuery, cancel: &CancellationToken) -> WorkspaceResult<BookingWorkspace> {
        self.latency.pause_or_cancel(cancel).await?;

        let bookings: Vec<Booking> = self
            .bookings
            .lock()
            .await
            .iter()
            .filter(|b| query.status.map_or(true, |s| b.status == s))
            .filter(|b| {
                query
                    .provider_id
                    .as_deref()
                    .map_or(true, |p| b.provider_id.as_deref() == Some(p))
            })
            .filter(|b| {
                matches_search(
                    query.search(),
                    [
                        b.reference.as_str(),
                        b.customer_name.as_str(),
                        b.service_name.as_str(),
                    ],
                )
            })
            .cloned()
            .collect();

        Ok(BookingWorkspace {
            meta: ListMeta {
                total: bookings.len() as u32,
                page: Some(1),
                per_page: None,
            },
            bookings,
        })
    }

    async fn fetch_entity(&self, id: &str, cancel: &CancellationToken) -> WorkspaceResult<Option<Booking>> {
        self.latency.pause_or_cancel(cancel).await?;
        Ok(self.bookings.lock().await.iter().find(|b| b.id == id).cloned())
    }

    async fn apply(&self, mutation: &BookingMutation, cancel: &CancellationToken) -> WorkspaceResult<Booking> {
        self.latency.pause_or_cancel(cancel).await?;
        mutation.validate().map_err(|e| rejection(CoreError::Validation(e)))?;

        let mut bookings = self.bookings.lock().await;
        let id = mutation.target_id().unwrap_or_default();
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| not_found("Booking", id))?;

        BookingWorkspace::check_transition(booking, mutation).map_err(rejection)?;

        let event = match mutation {
            BookingMutation::Assign { provider_id, .. } => {
                let previous = booking.provider_id.replace(provider_id.clone());
                demo_event(
                    event_types::ASSIGNMENT,
                    format!("Assigned to {}", provider_id),
                    json!({ "from": previous, "to": provider_id }),
                )
            }
            BookingMutation::Update { input, .. } => {
                input.apply_to(booking);
                demo_event(
                    event_types::UPDATED,
                    "Booking updated",
                    serde_json::to_value(input).unwrap_or_default(),
                )
            }
            transition => {
                let from = booking.status;
                let to = transition.transition().unwrap_or(from);
                booking.status = to;
                let mut payload = json!({ "from": from.as_str(), "to": to.as_str() });
                if let BookingMutation::Cancel { reason: Some(reason), .. } = transition {
                    payload["reason"] = json!(reason);
                }
                demo_event(event_types::STATUS_CHANGE, transition.success_message(), payload)
            }
        };

        booking.timeline.push(event);
        booking.updated_at = Utc::now();
        debug!(id = %booking.id, action = mutation.label(), "Demo booking changed");
        Ok(booking.clone())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

#[allow(clippy::too_many_arguments)]
fn seed_booking(
    id: &str,
    customer: &str,
    service: &str,
    provider: Option<&str>,
    status: BookingStatus,
    price_cents: i64,
    start: DateTime<Utc>,
    hours: i64,
) -> Booking {
    let created_at = start - Duration::days(3);
    Booking {
        id: id.to_string(),
        reference: format!("BK-{}", id.trim_start_matches("bk-")),
        customer_name: customer.to_string(),
        service_name: service.to_string(),
        provider_id: provider.map(str::to_string),
        status,
        scheduled_start: start,
        scheduled_end: start + Duration::hours(hours),
        price_cents,
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

/// Seeded bookings around `now`.
pub fn seed_bookings(now: DateTime<Utc>) -> Vec<Booking> {
    use BookingStatus::*;

    vec![
        seed_booking("bk-501", "Dana Whitfield", "Boat detailing", None, Pending, 32_000, now + Duration::days(2), 3),
        seed_booking("bk-502", "Marco Ruiz", "Gutter cleaning", Some("prov-ivy"), Confirmed, 18_500, now + Duration::days(1), 2),
        seed_booking("bk-503", "Priya Nair", "Deck staining", Some("prov-oak"), InProgress, 64_000, now - Duration::hours(1), 6),
        seed_booking("bk-504", "Tom Becker", "Window washing", Some("prov-ivy"), Completed, 15_000, now - Duration::days(2), 2),
        seed_booking("bk-505", "Sara Lind", "Lawn aeration", None, Cancelled, 9_500, now - Duration::days(4), 1),
    ]
}

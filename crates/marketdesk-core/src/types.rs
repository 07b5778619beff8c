//! # Shared Types
//!
//! Records shared by every workspace: the append-only timeline event, the
//! pagination echo returned with list responses, and the query parameter
//! builder used to encode filters.
//!
//! ## Timeline Events
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Rental r-102 timeline (oldest first)                                   │
//! │                                                                         │
//! │  10:02  status_change   "Rental requested"         {to: requested}      │
//! │  10:15  status_change   "Rental approved"          {to: approved}       │
//! │  11:40  checkpoint      "Pickup photos uploaded"   {kind: pickup}       │
//! │  11:41  status_change   "Checked out"              {to: in_use,         │
//! │                                                     source: demo}  ◄──  │
//! │                                                                         │
//! │  Events are never edited or removed. Demo-mode events carry             │
//! │  `payload.source = "demo"`.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Payload `source` marker of events synthesized by the demo backends.
pub const DEMO_EVENT_SOURCE: &str = "demo";

/// Well-known timeline event types.
pub mod event_types {
    pub const STATUS_CHANGE: &str = "status_change";
    pub const UPDATED: &str = "updated";
    pub const CHECKPOINT: &str = "checkpoint";
    pub const ASSIGNMENT: &str = "assignment";
    pub const NOTE: &str = "note";
}

// =============================================================================
// Timeline Event
// =============================================================================

/// One append-only audit record on an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    /// Stable event identifier (dedup key when merging).
    pub id: String,

    /// Event type, e.g. `status_change`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Human readable description.
    pub description: String,

    /// When the event happened.
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,

    /// Free-form payload.
    #[serde(default)]
    #[ts(type = "unknown")]
    pub payload: Value,
}

impl TimelineEvent {
    /// Creates an event with an empty payload.
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        description: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        TimelineEvent {
            id: id.into(),
            event_type: event_type.into(),
            description: description.into(),
            occurred_at,
            payload: Value::Null,
        }
    }

    /// Replaces the payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// True when the event was produced by a demo backend.
    pub fn is_demo(&self) -> bool {
        self.payload.get("source").and_then(Value::as_str) == Some(DEMO_EVENT_SOURCE)
    }

    /// True for `status_change` events.
    pub fn is_status_change(&self) -> bool {
        self.event_type == event_types::STATUS_CHANGE
    }
}

// =============================================================================
// List Meta
// =============================================================================

/// Pagination echo returned next to a list payload.
///
/// This is the server's view and is replaced wholesale on every fetch. The
/// workspace summaries never read it; they are computed from the
/// collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct ListMeta {
    pub total: u32,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

// =============================================================================
// Query Parameters
// =============================================================================

/// Ordered query string pairs.
///
/// `None` and empty-string values are dropped at push time, so a filter left
/// blank never reaches the URL.
///
/// ## Example
/// ```rust
/// use marketdesk_core::QueryParams;
///
/// let params = QueryParams::new()
///     .push("status", Some("approved"))
///     .push("search", Some(""))
///     .push("page", None::<u32>);
/// assert_eq!(params.pairs(), &[("status".to_string(), "approved".to_string())]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `key=value` unless the value is absent or empty.
    pub fn push<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            let value = value.to_string();
            if !value.is_empty() {
                self.0.push((key.to_string(), value));
            }
        }
        self
    }

    /// All retained pairs in insertion order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

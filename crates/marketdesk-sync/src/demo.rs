//! # Demo Mode
//!
//! Helpers shared by the in-memory demo backends: the activation gate,
//! simulated latency, and synthetic timeline events.
//!
//! Demo mode is reachable only from a development build launched with the
//! opt-in query flag (`?demo=1`). A release build never serves fixtures,
//! whatever the URL says.

use std::time::Duration;

use chrono::Utc;
use marketdesk_core::types::DEMO_EVENT_SOURCE;
use marketdesk_core::{CoreError, TimelineEvent};
use rand::Rng;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::config::ConsoleConfig;
use crate::error::{WorkspaceError, WorkspaceResult};

/// Query flag values that count as "on".
const TRUTHY: &[&str] = &["1", "true", "yes", "on"];

// =============================================================================
// Build Profile
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildProfile {
    Development,
    Production,
}

impl BuildProfile {
    /// Profile of the running binary.
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            BuildProfile::Development
        } else {
            BuildProfile::Production
        }
    }
}

// =============================================================================
// Demo Gate
// =============================================================================

/// Resolved demo-mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoGate {
    enabled: bool,
}

impl DemoGate {
    /// Enabled only for a development build whose launch URL carries `flag`
    /// with a truthy value.
    pub fn resolve(profile: BuildProfile, launch_url: Option<&str>, flag: &str) -> Self {
        let enabled = profile == BuildProfile::Development && launch_url.map(|url| has_flag(url, flag)).unwrap_or(false);

        debug!(?profile, enabled, "Demo gate resolved");
        DemoGate { enabled }
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::resolve(
            BuildProfile::current(),
            config.demo.launch_url.as_deref(),
            &config.demo.query_flag,
        )
    }

    pub fn disabled() -> Self {
        DemoGate { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Accepts absolute URLs and bare paths such as `/admin/rentals?demo=1`.
fn has_flag(launch_url: &str, flag: &str) -> bool {
    let parsed = Url::parse(launch_url).or_else(|_| {
        Url::parse("http://localhost/").and_then(|base| base.join(launch_url))
    });

    match parsed {
        Ok(url) => url
            .query_pairs()
            .any(|(key, value)| key == flag && TRUTHY.contains(&value.to_ascii_lowercase().as_str())),
        Err(_) => false,
    }
}

// =============================================================================
// Simulated Latency
// =============================================================================

/// Random delay window applied to every demo call.
#[derive(Debug, Clone, Copy)]
pub struct DemoLatency {
    min: Duration,
    max: Duration,
}

impl DemoLatency {
    pub fn new(min: Duration, max: Duration) -> Self {
        DemoLatency {
            min,
            max: max.max(min),
        }
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        let (min, max) = config.demo_delay();
        Self::new(min, max)
    }

    /// Picks a delay within the window.
    pub fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Sleeps for a sampled delay unless `cancel` fires first.
    pub async fn pause_or_cancel(&self, cancel: &CancellationToken) -> WorkspaceResult<()> {
        let delay = self.sample();
        tokio::select! {
            _ = cancel.cancelled() => Err(WorkspaceError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

impl Default for DemoLatency {
    fn default() -> Self {
        Self::new(Duration::from_millis(200), Duration::from_millis(300))
    }
}

// =============================================================================
// Synthetic Records
// =============================================================================

/// Fresh id for a demo record, e.g. `rent-3f2a9c1b`.
pub fn demo_id(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &id[..8])
}

/// Timeline event stamped now and tagged `source: demo`.
///
/// Object payloads get the tag merged in; anything else is wrapped as
/// `{ "value": ..., "source": "demo" }`.
pub fn demo_event(event_type: &str, description: impl Into<String>, payload: Value) -> TimelineEvent {
    let mut map = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    map.insert("source".to_string(), Value::String(DEMO_EVENT_SOURCE.to_string()));

    TimelineEvent::new(demo_id("evt"), event_type, description, Utc::now()).with_payload(Value::Object(map))
}

/// The error a real backend would answer with for a rejected write.
pub fn rejection(err: CoreError) -> WorkspaceError {
    let status = match &err {
        CoreError::EntityNotFound { .. } => 404,
        CoreError::Validation(_) => 422,
        CoreError::InvalidTransition { .. } | CoreError::TerminalStatus { .. } => 409,
    };
    WorkspaceError::Server {
        status,
        message: err.to_string(),
        details: None,
    }
}

pub fn not_found(entity: &str, id: &str) -> WorkspaceError {
    rejection(CoreError::EntityNotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    })
}

/// Case-insensitive substring match over a record's searchable fields.
pub fn matches_search<'a>(search: &str, fields: impl IntoIterator<Item = &'a str>) -> bool {
    let needle = search.trim().to_lowercase();
    needle.is_empty() || fields.into_iter().any(|field| field.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketdesk_core::types::event_types;
    use serde_json::json;

    #[test]
    fn test_gate_requires_development_build() {
        let url = Some("http://localhost:5173/admin/rentals?demo=1");
        assert!(DemoGate::resolve(BuildProfile::Development, url, "demo").is_enabled());
        assert!(!DemoGate::resolve(BuildProfile::Production, url, "demo").is_enabled());
    }

    #[test]
    fn test_gate_requires_flag() {
        let dev = BuildProfile::Development;
        assert!(!DemoGate::resolve(dev, None, "demo").is_enabled());
        assert!(!DemoGate::resolve(dev, Some("http://localhost:5173/admin"), "demo").is_enabled());
        assert!(!DemoGate::resolve(dev, Some("http://localhost:5173/admin?demo=0"), "demo").is_enabled());
        assert!(!DemoGate::resolve(dev, Some("http://localhost:5173/admin?preview=1"), "demo").is_enabled());
        assert!(DemoGate::resolve(dev, Some("/admin/rentals?tab=open&demo=TRUE"), "demo").is_enabled());
        assert!(DemoGate::resolve(dev, Some("/admin?sandbox=yes"), "sandbox").is_enabled());
    }

    #[test]
    fn test_latency_within_window() {
        let latency = DemoLatency::default();
        for _ in 0..50 {
            let delay = latency.sample();
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(300));
        }

        let fixed = DemoLatency::new(Duration::from_millis(5), Duration::ZERO);
        assert_eq!(fixed.sample(), Duration::from_millis(5));
    }

    #[test]
    fn test_rejection_status() {
        let err = not_found("Rental", "r9");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Rental not found: r9");

        let err = rejection(CoreError::TerminalStatus {
            entity_id: "r1".to_string(),
            status: "settled".to_string(),
        });
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_matches_search() {
        assert!(matches_search("", ["anything"]));
        assert!(matches_search("  DRILL ", ["item-1", "Cordless drill"]));
        assert!(!matches_search("saw", ["item-1", "Cordless drill"]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_or_cancel() {
        let latency = DemoLatency::default();
        let cancel = CancellationToken::new();
        assert!(latency.pause_or_cancel(&cancel).await.is_ok());

        cancel.cancel();
        let err = latency.pause_or_cancel(&cancel).await.unwrap_err();
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_demo_event_is_tagged() {
        let event = demo_event(event_types::STATUS_CHANGE, "Rental approved", json!({ "to": "approved" }));
        assert!(event.is_demo());
        assert!(event.is_status_change());
        assert_eq!(event.payload["to"], "approved");

        let bare = demo_event(event_types::NOTE, "Note", Value::Null);
        assert!(bare.is_demo());
        assert!(bare.id.starts_with("evt-"));
    }
}

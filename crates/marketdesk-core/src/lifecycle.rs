//! # Lifecycle Module
//!
//! Static status adjacency tables and the action gating derived from them.
//!
//! ## How Gating Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Status → Enabled Actions                           │
//! │                                                                         │
//! │  Rental status: approved                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  transitions(approved) = {pickup_scheduled, in_use, cancelled}          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  action.target() ∈ transitions ?                                        │
//! │       ├── SchedulePickup → pickup_scheduled  ✅                         │
//! │       ├── Checkout       → in_use            ✅                         │
//! │       ├── Cancel         → cancelled         ✅                         │
//! │       └── Approve        → approved          ❌                         │
//! │                                                                         │
//! │  Capabilities are recomputed from the status every time they are read. │
//! │  Nothing here is stored, so nothing can drift.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Traits
// =============================================================================

/// A status vocabulary with a fixed adjacency table.
pub trait Lifecycle: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// Every status, in display order.
    const ALL: &'static [Self];

    /// Statuses directly reachable from `self`.
    fn transitions(self) -> &'static [Self];

    /// Wire name (`snake_case`).
    fn as_str(self) -> &'static str;

    fn can_transition_to(self, next: Self) -> bool {
        self.transitions().contains(&next)
    }

    fn is_terminal(self) -> bool {
        self.transitions().is_empty()
    }
}

/// A user-facing action that moves an entity to one target status.
pub trait LifecycleAction: Copy + Eq + Debug + Send + Sync + 'static {
    type Status: Lifecycle;

    /// Every action, in button order.
    const ALL: &'static [Self];

    /// Status this action produces.
    fn target(self) -> Self::Status;

    fn is_enabled_for(self, status: Self::Status) -> bool {
        status.can_transition_to(self.target())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Actions enabled for `status`, in button order.
pub fn enabled_actions<A: LifecycleAction>(status: A::Status) -> Vec<A> {
    A::ALL
        .iter()
        .copied()
        .filter(|action| action.is_enabled_for(status))
        .collect()
}

/// Rejects a transition absent from the adjacency table.
pub fn ensure_transition<S: Lifecycle>(entity_id: &str, from: S, to: S) -> CoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            entity_id: entity_id.to_string(),
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

/// Rejects changes to an entity in a terminal status.
pub fn ensure_not_terminal<S: Lifecycle>(entity_id: &str, status: S) -> CoreResult<()> {
    if status.is_terminal() {
        Err(CoreError::TerminalStatus {
            entity_id: entity_id.to_string(),
            status: status.as_str().to_string(),
        })
    } else {
        Ok(())
    }
}

/// Counts entities per status. Every status appears, zero included.
pub fn status_breakdown<S, I>(statuses: I) -> BTreeMap<S, u32>
where
    S: Lifecycle,
    I: IntoIterator<Item = S>,
{
    let mut counts: BTreeMap<S, u32> = S::ALL.iter().map(|s| (*s, 0)).collect();
    for status in statuses {
        *counts.entry(status).or_insert(0) += 1;
    }
    counts
}

/// Parses a wire name against a status vocabulary.
pub fn parse_status<S: Lifecycle>(field: &str, value: &str) -> Result<S, crate::ValidationError> {
    S::ALL
        .iter()
        .copied()
        .find(|s| s.as_str() == value)
        .ok_or_else(|| crate::ValidationError::NotAllowed {
            field: field.to_string(),
            allowed: S::ALL.iter().map(|s| s.as_str().to_string()).collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingStatus;
    use crate::rental::{RentalAction, RentalStatus};

    #[test]
    fn test_enabled_actions_follow_table() {
        let actions = enabled_actions::<RentalAction>(RentalStatus::Approved);
        assert_eq!(
            actions,
            vec![
                RentalAction::SchedulePickup,
                RentalAction::Checkout,
                RentalAction::Cancel
            ]
        );
        assert!(enabled_actions::<RentalAction>(RentalStatus::Settled).is_empty());
    }

    #[test]
    fn test_ensure_transition() {
        assert!(ensure_transition("b-1", BookingStatus::Pending, BookingStatus::Confirmed).is_ok());
        let err = ensure_transition("b-1", BookingStatus::Completed, BookingStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_status_breakdown_includes_zeroes() {
        let counts = status_breakdown([BookingStatus::Pending, BookingStatus::Pending]);
        assert_eq!(counts[&BookingStatus::Pending], 2);
        assert_eq!(counts[&BookingStatus::Completed], 0);
        assert_eq!(counts.len(), BookingStatus::ALL.len());
    }

    #[test]
    fn test_parse_status() {
        let parsed: RentalStatus = parse_status("status", "in_use").unwrap();
        assert_eq!(parsed, RentalStatus::InUse);
        assert!(parse_status::<RentalStatus>("status", "lost").is_err());
    }
}

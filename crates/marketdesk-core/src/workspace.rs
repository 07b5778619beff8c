//! # Workspace Module
//!
//! The traits every feature area implements, and the merge function the
//! store uses to fold a write result into the cached snapshot.
//!
//! ## Merge Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    merge_entity(current, incoming)                      │
//! │                                                                         │
//! │  current  { status: approved, notes: "a", timeline: [e1, e2] }          │
//! │  incoming { status: in_use,   notes: "a", timeline: [e2, e3] }          │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │  result   { status: in_use,   notes: "a", timeline: [e1, e2, e3] }      │
//! │                                                                         │
//! │  • Scalar fields: last write wins (the incoming entity)                 │
//! │  • Timeline: union by event id, ordered by occurredAt                   │
//! │  • An event already in the snapshot is never dropped                    │
//! │                                                                         │
//! │  upsert_entity: replace-merge in place when the id is known,            │
//! │                 otherwise insert at the top of the collection           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::fmt::Debug;

use crate::error::{CoreResult, ValidationError};
use crate::types::{QueryParams, TimelineEvent};

// =============================================================================
// Traits
// =============================================================================

/// A record with a stable id and an append-only timeline.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn timeline(&self) -> &[TimelineEvent];

    fn timeline_mut(&mut self) -> &mut Vec<TimelineEvent>;
}

/// Filters and search text of a list fetch.
pub trait ListQuery: Clone + Debug + Default + PartialEq + Send + Sync + 'static {
    /// Encodes the query as URL parameters. Blank values are omitted.
    fn to_params(&self) -> QueryParams;

    fn search(&self) -> &str;

    fn set_search(&mut self, search: String);
}

/// A write action issued against a workspace.
pub trait Mutation: Clone + Debug + Send + Sync + 'static {
    /// Short action name used in logs (`approve`, `create`, ...).
    fn label(&self) -> &'static str;

    /// Id of the primary entity the action targets, if it targets one.
    fn target_id(&self) -> Option<&str>;

    /// Client-side input validation. A failure here means no request is made.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Text of the success notice shown next to the acting form.
    fn success_message(&self) -> &'static str;
}

/// An aggregate snapshot owned by one store.
///
/// The primary collection is ordered newest first. Secondary collections
/// (suppliers, budgets, coupons) live on the implementing struct and are
/// only ever touched through [`Workspace::merge_outcome`].
pub trait Workspace: Clone + Debug + Default + Send + Sync + 'static {
    type Entity: Entity;
    type Query: ListQuery;
    type Mutation: Mutation;
    /// What a successful write returns.
    type Outcome: Clone + Debug + Send + Sync + 'static;
    type Summary: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Human name used in logs and provider errors.
    const NAME: &'static str;

    fn entities(&self) -> &[Self::Entity];

    fn entities_mut(&mut self) -> &mut Vec<Self::Entity>;

    /// Derived figures. Pure function of the collections.
    fn summary(&self) -> Self::Summary;

    /// Folds a successful write result into the snapshot.
    fn merge_outcome(&mut self, outcome: &Self::Outcome);

    /// The primary entity carried by an outcome, if any.
    fn outcome_entity(outcome: &Self::Outcome) -> Option<&Self::Entity>;

    /// Status policy gate of `mutation` against the cached `entity`.
    fn check_transition(_entity: &Self::Entity, _mutation: &Self::Mutation) -> CoreResult<()> {
        Ok(())
    }

    fn find(&self, id: &str) -> Option<&Self::Entity> {
        self.entities().iter().find(|e| e.id() == id)
    }

    fn upsert(&mut self, entity: Self::Entity) {
        upsert_entity(self.entities_mut(), entity);
    }
}

// =============================================================================
// Merge Functions
// =============================================================================

/// Union of two timelines by event id, ordered by `occurred_at`.
///
/// Existing events win on id collisions. The sort is stable so events with
/// equal timestamps keep their arrival order.
pub fn merge_timeline(existing: &[TimelineEvent], incoming: &[TimelineEvent]) -> Vec<TimelineEvent> {
    let mut seen: HashSet<&str> = existing.iter().map(|e| e.id.as_str()).collect();
    let mut merged = existing.to_vec();

    for event in incoming {
        if seen.insert(event.id.as_str()) {
            merged.push(event.clone());
        }
    }

    merged.sort_by_key(|e| e.occurred_at);
    merged
}

/// Merges `incoming` over `current`: incoming scalars, merged timeline.
pub fn merge_entity<E: Entity>(current: &E, incoming: E) -> E {
    let mut merged = incoming;
    let timeline = merge_timeline(current.timeline(), merged.timeline());
    *merged.timeline_mut() = timeline;
    merged
}

/// Replace-merges `entity` in place, or inserts it at the top.
pub fn upsert_entity<E: Entity>(entities: &mut Vec<E>, entity: E) {
    match entities.iter().position(|e| e.id() == entity.id()) {
        Some(index) => {
            let merged = merge_entity(&entities[index], entity);
            entities[index] = merged;
        }
        None => entities.insert(0, entity),
    }
}

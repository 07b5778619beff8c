//! # Error Types
//!
//! Domain-specific error types for marketdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  marketdesk-core errors (this file)                                    │
//! │  ├── CoreError        - Lifecycle / policy violations                  │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  marketdesk-sync errors (separate crate)                               │
//! │  └── WorkspaceError   - Cancellation, server, transport, config        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → WorkspaceError → notice / banner  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both enums are raised before any network call; a form that fails here
//! never produces a request.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Policy errors detected against the cached snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The requested status is not reachable from the entity's current status.
    ///
    /// ## When This Occurs
    /// - A stale panel offers "Checkout" on a rental that was already returned
    /// - A purchase order in `received` is asked to move to `sent`
    #[error("{entity_id} cannot move from {from} to {to}")]
    InvalidTransition {
        entity_id: String,
        from: String,
        to: String,
    },

    /// The entity is in a terminal status and accepts no further changes of
    /// this kind.
    #[error("{entity_id} is {status} and can no longer be changed")]
    TerminalStatus { entity_id: String, status: String },

    /// The entity is not part of the cached snapshot.
    #[error("{entity} not found: {id}")]
    EntityNotFound { entity: String, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when form input doesn't meet requirements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., bad slug, bad email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A date range whose end precedes its start.
    #[error("{end_field} must be after {start_field}")]
    InvalidRange {
        start_field: String,
        end_field: String,
    },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Name of the offending field, for inline form errors.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
            ValidationError::InvalidRange { end_field, .. } => end_field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

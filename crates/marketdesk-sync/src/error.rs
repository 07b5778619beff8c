//! # Workspace Error Types
//!
//! Error types for store, backend and API client operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Workspace Error Categories                          │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Client-side    │  │   Request       │  │     Configuration       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  Cancelled      │  │  InvalidConfig          │ │
//! │  │  Policy         │  │  Server         │  │  InvalidUrl             │ │
//! │  │  NotProvided    │  │  Transport      │  │  ConfigLoadFailed       │ │
//! │  │                 │  │  Decode         │  │  ConfigSaveFailed       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Where each one ends up:                                               │
//! │  • list / detail load  → persistent banner with retry                  │
//! │  • mutation            → short-lived notice next to the form           │
//! │  • Cancelled           → dropped, never shown                          │
//! │  • NotProvided         → panic via `WorkspaceScope::expect`            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use marketdesk_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for workspace operations.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Boxed cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every failure a workspace operation can produce.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    // =========================================================================
    // Client-side Errors
    // =========================================================================
    /// Input rejected before any request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Lifecycle policy rejected the action against the cached entity.
    #[error(transparent)]
    Policy(CoreError),

    /// A workspace was looked up outside a scope that provides it.
    #[error("{workspace} must be used within its provider")]
    NotProvided { workspace: &'static str },

    // =========================================================================
    // Request Errors
    // =========================================================================
    /// The request was superseded or aborted. Not a failure.
    #[error("Request cancelled")]
    Cancelled,

    /// Non-2xx response.
    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The service could not be reached.
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: BoxError,
    },

    /// A 2xx body did not have the expected shape.
    #[error("Unexpected response from {service} service: {reason}")]
    Decode { service: String, reason: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid console configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for WorkspaceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(validation) => WorkspaceError::Validation(validation),
            other => WorkspaceError::Policy(other),
        }
    }
}

impl From<url::ParseError> for WorkspaceError {
    fn from(err: url::ParseError) -> Self {
        WorkspaceError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for WorkspaceError {
    fn from(err: std::io::Error) -> Self {
        WorkspaceError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for WorkspaceError {
    fn from(err: toml::de::Error) -> Self {
        WorkspaceError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for WorkspaceError {
    fn from(err: toml::ser::Error) -> Self {
        WorkspaceError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl WorkspaceError {
    /// True for superseded or aborted requests, which callers drop silently.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, WorkspaceError::Cancelled)
    }

    /// True when re-issuing the same request could succeed.
    ///
    /// Nothing retries automatically; this only decides whether a banner
    /// offers a retry button.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkspaceError::Transport { .. } => true,
            WorkspaceError::Server { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// True when the error was raised locally, before any network call.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            WorkspaceError::Validation(_) | WorkspaceError::Policy(_)
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            WorkspaceError::InvalidConfig(_)
                | WorkspaceError::InvalidUrl(_)
                | WorkspaceError::ConfigLoadFailed(_)
                | WorkspaceError::ConfigSaveFailed(_)
        )
    }

    /// HTTP status for server errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            WorkspaceError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The text a banner or notice shows.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

//! # Workspace Backends
//!
//! The seam between a [`WorkspaceStore`](crate::store::WorkspaceStore) and
//! wherever its data comes from.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Arc<dyn WorkspaceBackend<W>>                            │
//! │                          │                                              │
//! │            ┌─────────────┴──────────────┐                               │
//! │            ▼                            ▼                               │
//! │   Remote*Backend                 Demo*Backend                           │
//! │   ApiClient → REST root          seeded fixtures + 200-300ms delay      │
//! │                                                                         │
//! │   Picked once by `<module>::backend(&config)`. Both return the same     │
//! │   workspace shapes, so nothing downstream knows which is active.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use marketdesk_core::Workspace;
use std::fmt;
use tokio_util::sync::CancellationToken;

use crate::error::{WorkspaceError, WorkspaceResult};

/// Which implementation is serving a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Remote,
    Demo,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Remote => write!(f, "remote"),
            BackendMode::Demo => write!(f, "demo"),
        }
    }
}

/// Data source of one workspace.
#[async_trait]
pub trait WorkspaceBackend<W: Workspace>: Send + Sync {
    fn mode(&self) -> BackendMode;

    /// Fetches the whole workspace for `query`.
    async fn fetch_workspace(&self, query: &W::Query, cancel: &CancellationToken) -> WorkspaceResult<W>;

    /// Fetches one primary entity. `Ok(None)` when the backend does not know the id.
    async fn fetch_entity(&self, id: &str, cancel: &CancellationToken) -> WorkspaceResult<Option<W::Entity>>;

    /// Performs a write and returns what the backend reports back.
    async fn apply(&self, mutation: &W::Mutation, cancel: &CancellationToken) -> WorkspaceResult<W::Outcome>;
}

/// Maps a 404 into `Ok(None)` for detail fetches.
pub fn not_found_as_none<T>(result: WorkspaceResult<T>) -> WorkspaceResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(WorkspaceError::Server { status: 404, .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

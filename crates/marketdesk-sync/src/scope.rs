//! # Workspace Scope
//!
//! Scoped lookup of workspace stores by workspace type. A page root
//! provides the stores it owns; panels below it look them up.
//!
//! Looking up a workspace the scope does not provide is a wiring bug, not a
//! runtime condition: [`WorkspaceScope::expect`] panics with
//! `"<Workspace> must be used within its provider"`.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use marketdesk_core::Workspace;
use tracing::debug;

use crate::error::{WorkspaceError, WorkspaceResult};
use crate::store::WorkspaceStore;

/// Type-keyed set of stores.
#[derive(Default)]
pub struct WorkspaceScope {
    stores: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl WorkspaceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `store`, replacing any store of the same workspace type.
    pub fn provide<W: Workspace>(&mut self, store: WorkspaceStore<W>) -> &mut Self {
        debug!(workspace = W::NAME, "Workspace provided");
        self.stores.insert(TypeId::of::<W>(), Box::new(store));
        self
    }

    pub fn contains<W: Workspace>(&self) -> bool {
        self.stores.contains_key(&TypeId::of::<W>())
    }

    /// Handle to the provided store.
    pub fn try_get<W: Workspace>(&self) -> WorkspaceResult<WorkspaceStore<W>> {
        self.stores
            .get(&TypeId::of::<W>())
            .and_then(|store| store.downcast_ref::<WorkspaceStore<W>>())
            .cloned()
            .ok_or(WorkspaceError::NotProvided { workspace: W::NAME })
    }

    /// Handle to the provided store.
    ///
    /// # Panics
    ///
    /// When no store for `W` was provided.
    pub fn expect<W: Workspace>(&self) -> WorkspaceStore<W> {
        match self.try_get::<W>() {
            Ok(store) => store,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

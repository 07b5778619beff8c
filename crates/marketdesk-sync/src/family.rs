//! # Fetch Families
//!
//! A fetch family is a stream of requests where only the latest one may
//! update state: the list fetches of a workspace, or its detail fetches.
//!
//! ```text
//!   begin() ─► gen 1, token A
//!   begin() ─► gen 2, token B      (token A cancelled)
//!
//!   response for gen 1 arrives ──► is_current(1) == false ──► dropped
//!   response for gen 2 arrives ──► is_current(2) == true  ──► committed
//! ```
//!
//! The generation check is what guarantees ordering; the token only saves
//! the work of finishing a request nobody will read.

use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Handle of one issued fetch.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub generation: u64,
    pub token: CancellationToken,
}

#[derive(Debug, Default)]
struct FamilyState {
    generation: u64,
    token: CancellationToken,
}

/// Generation counter plus the token of the in-flight fetch.
#[derive(Debug)]
pub struct FetchFamily {
    name: &'static str,
    state: Mutex<FamilyState>,
}

impl FetchFamily {
    pub fn new(name: &'static str) -> Self {
        FetchFamily {
            name,
            state: Mutex::new(FamilyState::default()),
        }
    }

    /// Supersedes the in-flight fetch and issues a new ticket.
    pub fn begin(&self) -> FetchTicket {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.token.cancel();
        state.generation += 1;
        state.token = CancellationToken::new();

        trace!(family = self.name, generation = state.generation, "Fetch issued");

        FetchTicket {
            generation: state.generation,
            token: state.token.clone(),
        }
    }

    /// True when no fetch has been issued or invalidated since `generation`.
    pub fn is_current(&self, generation: u64) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).generation == generation
    }

    /// Cancels the in-flight fetch without issuing a new one.
    pub fn invalidate(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.token.cancel();
        state.generation += 1;
        state.token = CancellationToken::new();

        trace!(family = self.name, generation = state.generation, "Fetch family invalidated");
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_supersedes_previous() {
        let family = FetchFamily::new("list");

        let first = family.begin();
        let second = family.begin();

        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
        assert!(!family.is_current(first.generation));
        assert!(family.is_current(second.generation));
    }

    #[test]
    fn test_invalidate() {
        let family = FetchFamily::new("detail");
        let ticket = family.begin();

        family.invalidate();

        assert!(ticket.token.is_cancelled());
        assert!(!family.is_current(ticket.generation));
        assert_eq!(family.generation(), 2);
    }
}

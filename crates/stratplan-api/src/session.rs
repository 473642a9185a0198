//! Process-wide session state.
//!
//! The current user is fetched once and shared. A refresh takes a
//! [`Ticket`] before its request goes out; when the response lands, it is
//! stored only if no newer refresh (or a clear) was started meanwhile, so a
//! slow response can never overwrite fresher state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::models::CurrentUser;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    /// Nothing fetched yet.
    #[default]
    Unknown,
    Anonymous,
    Authenticated(CurrentUser),
}

impl SessionState {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Sequence number for one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct SessionContext {
    state: Mutex<SessionState>,
    sequence: AtomicU64,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.lock().user().cloned()
    }

    pub fn is_known(&self) -> bool {
        !matches!(*self.lock(), SessionState::Unknown)
    }

    /// Start a refresh. Invalidates every earlier ticket.
    pub fn begin(&self) -> Ticket {
        Ticket(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Store the result of the refresh holding `ticket`. Returns `false`
    /// and drops `state` when a newer refresh or a clear has started.
    pub fn complete(&self, ticket: Ticket, state: SessionState) -> bool {
        let mut current = self.lock();
        if self.sequence.load(Ordering::SeqCst) != ticket.0 {
            tracing::debug!(ticket = ticket.0, "discarding stale session response");
            return false;
        }
        *current = state;
        true
    }

    /// Forget the session. In-flight refreshes are discarded on arrival.
    pub fn clear(&self) {
        let mut current = self.lock();
        self.sequence.fetch_add(1, Ordering::SeqCst);
        *current = SessionState::Anonymous;
    }
}

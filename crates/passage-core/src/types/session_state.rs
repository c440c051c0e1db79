//! Derived session state.

use crate::tokens::TokenSet;

/// Where the session currently stands. Derived on demand, never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No usable token set is stored.
    Anonymous,
    /// A token set is stored.
    Authenticated(TokenSet),
    /// A refresh exchange is in flight.
    Refreshing,
}

impl SessionState {
    /// Returns true if a token set is available right now.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

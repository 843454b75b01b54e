//! # Shared Session Handle
//!
//! The single [`PosSession`] shared by the input loop and in-flight effects.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  key press ──► with_session_mut(dispatch) ──► effects                  │
//! │                                                   │                     │
//! │                                   spawned task ◄──┘                     │
//! │                                       │  .await backend call            │
//! │                                       ▼  (no lock held)                 │
//! │                        with_session_mut(apply result)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! NOTE: the lock is a `std::sync::Mutex` and every access is a closure, so
//! it can never be held across an `.await`.

use std::sync::{Arc, Mutex, PoisonError};

use medipos_core::PosSession;

#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    session: Arc<Mutex<PosSession>>,
}

impl SharedSession {
    pub fn new(session: PosSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Executes a function with read access to the session.
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&PosSession) -> R,
    {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&session)
    }

    /// Executes a function with write access to the session.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let effects = shared.with_session_mut(|s| dispatch(s, key));
    /// ```
    pub fn with_session_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut PosSession) -> R,
    {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_one_session() {
        let shared = SharedSession::default();
        let other = shared.clone();
        shared.with_session_mut(|s| s.set_search_query("amox"));
        assert_eq!(other.with_session(|s| s.search_query().to_string()), "amox");
    }
}

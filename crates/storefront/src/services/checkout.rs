//! Order-finalization guard.
//!
//! Finalization must run at most once per payment session even if the
//! shopper's return page fires the callback repeatedly. The guard is a
//! small state machine per session id: `NotStarted -> InFlight ->
//! Completed`, with a reset back to `NotStarted` on failure so a retry
//! stays possible. The `orders.payment_session_id` unique constraint is
//! the database backstop behind it.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

/// Finalization progress for one payment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalizeState {
    /// No finalization attempt has run.
    #[default]
    NotStarted,
    /// An attempt is currently running.
    InFlight,
    /// An attempt succeeded; the order exists.
    Completed,
}

/// Re-entry into a finalization that is running or already done.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeRejection {
    /// Another finalization for this session is running right now.
    #[error("order finalization already in progress")]
    InFlight,
    /// This session was already finalized into an order.
    #[error("order already finalized for this payment session")]
    Completed,
}

/// Tracks finalization state per payment session id.
#[derive(Debug, Default)]
pub struct FinalizeRegistry {
    states: Mutex<HashMap<String, FinalizeState>>,
}

impl FinalizeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, FinalizeState>> {
        self.states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Attempt the `NotStarted -> InFlight` transition.
    ///
    /// # Errors
    ///
    /// Returns [`FinalizeRejection`] if the session is already in flight
    /// or completed.
    pub fn begin(&self, session_id: &str) -> Result<(), FinalizeRejection> {
        let mut states = self.map();
        match states.get(session_id).copied().unwrap_or_default() {
            FinalizeState::NotStarted => {
                states.insert(session_id.to_string(), FinalizeState::InFlight);
                Ok(())
            }
            FinalizeState::InFlight => Err(FinalizeRejection::InFlight),
            FinalizeState::Completed => Err(FinalizeRejection::Completed),
        }
    }

    /// Mark the session finalized (`InFlight -> Completed`).
    pub fn complete(&self, session_id: &str) {
        self.map()
            .insert(session_id.to_string(), FinalizeState::Completed);
    }

    /// Roll the session back to `NotStarted` after a failed attempt so
    /// the shopper can retry with the same snapshot.
    pub fn reset(&self, session_id: &str) {
        self.map().remove(session_id);
    }

    /// Current state for a session.
    #[must_use]
    pub fn state(&self, session_id: &str) -> FinalizeState {
        self.map().get(session_id).copied().unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_from_not_started() {
        let registry = FinalizeRegistry::new();
        assert!(registry.begin("cs_1").is_ok());
        assert_eq!(registry.state("cs_1"), FinalizeState::InFlight);
    }

    #[test]
    fn test_reentry_while_in_flight_rejected() {
        let registry = FinalizeRegistry::new();
        registry.begin("cs_1").unwrap();
        assert_eq!(registry.begin("cs_1"), Err(FinalizeRejection::InFlight));
    }

    #[test]
    fn test_reentry_after_completed_rejected() {
        let registry = FinalizeRegistry::new();
        registry.begin("cs_1").unwrap();
        registry.complete("cs_1");
        assert_eq!(registry.begin("cs_1"), Err(FinalizeRejection::Completed));
    }

    #[test]
    fn test_double_callback_runs_exactly_once() {
        // Two callbacks with the same session id: only the first may run.
        let registry = FinalizeRegistry::new();
        let first = registry.begin("cs_dup");
        let second = registry.begin("cs_dup");
        assert!(first.is_ok());
        assert!(second.is_err());
    }

    #[test]
    fn test_reset_allows_retry_after_failure() {
        let registry = FinalizeRegistry::new();
        registry.begin("cs_1").unwrap();
        registry.reset("cs_1");
        assert_eq!(registry.state("cs_1"), FinalizeState::NotStarted);
        assert!(registry.begin("cs_1").is_ok());
    }

    #[test]
    fn test_sessions_are_independent() {
        let registry = FinalizeRegistry::new();
        registry.begin("cs_a").unwrap();
        assert!(registry.begin("cs_b").is_ok());
    }
}

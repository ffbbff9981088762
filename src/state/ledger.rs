use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    error::AppError,
    state::events::{OperationId, StatusEvent},
};

/// Pending flags and last errors keyed by operation identity.
///
/// The ledger is a pure reducer: it only changes through [`StatusLedger::reduce`].
/// For any identity, `pending` is true exactly when the last lifecycle event
/// observed for it was a start.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLedger {
    pending: IndexMap<OperationId, bool>,
    last_errors: IndexMap<OperationId, AppError>,
}

impl StatusLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event.
    pub fn reduce(&mut self, event: &StatusEvent) {
        match event {
            StatusEvent::Started { id, .. } => {
                self.pending.insert(id.clone(), true);
            }
            StatusEvent::Succeeded { id, .. } => {
                self.pending.insert(id.clone(), false);
                self.last_errors.shift_remove(id);
            }
            StatusEvent::Failed { id, error, .. } => {
                self.pending.insert(id.clone(), false);
                self.last_errors.insert(id.clone(), error.clone());
            }
            StatusEvent::Dismissed { id } => {
                self.last_errors.shift_remove(id);
            }
            StatusEvent::DismissedAll => self.last_errors.clear(),
            StatusEvent::Reset => *self = Self::default(),
        }
    }

    /// Whether an invocation of `id` is in flight. False for unknown identities.
    pub fn is_pending(&self, id: &OperationId) -> bool {
        self.pending.get(id).copied().unwrap_or(false)
    }

    /// Error of the last failed invocation of `id`, unless since cleared.
    pub fn last_error(&self, id: &OperationId) -> Option<&AppError> {
        self.last_errors.get(id)
    }

    /// Every recorded error in first-failure order.
    pub fn errors(&self) -> impl Iterator<Item = (&OperationId, &AppError)> {
        self.last_errors.iter()
    }

    /// Whether no event has left a trace in the ledger.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.last_errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    const FETCH_GAME: OperationId = OperationId::from_static("games/fetchGame");
    const CREATE_TURN: OperationId = OperationId::from_static("games/createTurn");

    fn started(id: &OperationId) -> StatusEvent {
        StatusEvent::Started {
            id: id.clone(),
            invocation: Uuid::new_v4(),
        }
    }

    fn succeeded(id: &OperationId) -> StatusEvent {
        StatusEvent::Succeeded {
            id: id.clone(),
            invocation: Uuid::new_v4(),
            payload: json!(null),
        }
    }

    fn failed(id: &OperationId, error: AppError) -> StatusEvent {
        StatusEvent::Failed {
            id: id.clone(),
            invocation: Uuid::new_v4(),
            error,
        }
    }

    #[test]
    fn unknown_identities_default_to_idle() {
        let ledger = StatusLedger::new();
        assert!(!ledger.is_pending(&FETCH_GAME));
        assert!(ledger.last_error(&FETCH_GAME).is_none());
    }

    #[test]
    fn start_sets_pending_until_terminal_event() {
        let mut ledger = StatusLedger::new();
        ledger.reduce(&started(&FETCH_GAME));
        assert!(ledger.is_pending(&FETCH_GAME));
        assert!(!ledger.is_pending(&CREATE_TURN));

        ledger.reduce(&failed(&FETCH_GAME, AppError::network("offline")));
        assert!(!ledger.is_pending(&FETCH_GAME));
        assert_eq!(
            ledger.last_error(&FETCH_GAME),
            Some(&AppError::network("offline"))
        );
    }

    #[test]
    fn success_after_failure_clears_error() {
        let mut ledger = StatusLedger::new();
        ledger.reduce(&started(&FETCH_GAME));
        ledger.reduce(&failed(&FETCH_GAME, AppError::timeout("slow")));
        ledger.reduce(&started(&FETCH_GAME));
        ledger.reduce(&succeeded(&FETCH_GAME));

        assert!(!ledger.is_pending(&FETCH_GAME));
        assert!(ledger.last_error(&FETCH_GAME).is_none());
    }

    #[test]
    fn dismiss_clears_error_but_keeps_pending() {
        let mut ledger = StatusLedger::new();
        ledger.reduce(&failed(&FETCH_GAME, AppError::network("offline")));
        ledger.reduce(&started(&FETCH_GAME));
        ledger.reduce(&StatusEvent::Dismissed {
            id: FETCH_GAME.clone(),
        });

        assert!(ledger.last_error(&FETCH_GAME).is_none());
        assert!(ledger.is_pending(&FETCH_GAME));
    }

    #[test]
    fn dismiss_all_clears_every_error_only() {
        let mut ledger = StatusLedger::new();
        ledger.reduce(&failed(&FETCH_GAME, AppError::network("offline")));
        ledger.reduce(&failed(&CREATE_TURN, AppError::unexpected("bug")));
        ledger.reduce(&started(&CREATE_TURN));
        ledger.reduce(&StatusEvent::DismissedAll);

        assert_eq!(ledger.errors().count(), 0);
        assert!(ledger.is_pending(&CREATE_TURN));
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut ledger = StatusLedger::new();
        ledger.reduce(&started(&CREATE_TURN));
        ledger.reduce(&failed(&FETCH_GAME, AppError::network("offline")));
        ledger.reduce(&StatusEvent::Reset);

        assert_eq!(ledger, StatusLedger::new());
        assert!(ledger.is_empty());
    }

    #[test]
    fn last_processed_terminal_event_wins() {
        let mut ledger = StatusLedger::new();
        ledger.reduce(&started(&CREATE_TURN));
        ledger.reduce(&started(&CREATE_TURN));
        ledger.reduce(&succeeded(&CREATE_TURN));
        ledger.reduce(&failed(&CREATE_TURN, AppError::network("late")));

        assert_eq!(
            ledger.last_error(&CREATE_TURN),
            Some(&AppError::network("late"))
        );
        assert!(!ledger.is_pending(&CREATE_TURN));
    }
}

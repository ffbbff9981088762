use std::{
    borrow::Cow,
    fmt,
    sync::{Mutex, PoisonError},
};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::error::AppError;

/// Stable key identifying a class of asynchronous operation, e.g. `games/fetchGame`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OperationId(Cow<'static, str>);

impl OperationId {
    /// Identity for a statically declared operation.
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    /// Identity `<domain>/<name>` for an operation declared at runtime.
    pub fn new(domain: &str, name: &str) -> Self {
        Self(Cow::Owned(format!("{domain}/{name}")))
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for OperationId {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

/// Unique identifier for a single invocation of an operation.
pub type InvocationId = Uuid;

/// Events reduced by the status ledger and fanned out to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StatusEvent {
    /// An invocation started.
    Started {
        id: OperationId,
        invocation: InvocationId,
    },
    /// An invocation resolved with `payload`.
    Succeeded {
        id: OperationId,
        invocation: InvocationId,
        payload: Value,
    },
    /// An invocation failed with a normalized error.
    Failed {
        id: OperationId,
        invocation: InvocationId,
        error: AppError,
    },
    /// Forget the last error of one operation.
    Dismissed { id: OperationId },
    /// Forget every recorded error.
    DismissedAll,
    /// Return the ledger to its initial state.
    Reset,
}

impl StatusEvent {
    /// Operation the event refers to, when it targets a single one.
    pub fn operation(&self) -> Option<&OperationId> {
        match self {
            StatusEvent::Started { id, .. }
            | StatusEvent::Succeeded { id, .. }
            | StatusEvent::Failed { id, .. }
            | StatusEvent::Dismissed { id } => Some(id),
            StatusEvent::DismissedAll | StatusEvent::Reset => None,
        }
    }
}

/// Fan-out of applied [`StatusEvent`]s.
///
/// General observers share a bounded broadcast channel and may lag. Failure
/// watchers get their own unbounded queue carrying only [`StatusEvent::Failed`],
/// so a slow watcher never loses a failure.
pub struct EventHub {
    sender: broadcast::Sender<StatusEvent>,
    failure_watchers: Mutex<Vec<mpsc::UnboundedSender<StatusEvent>>>,
}

impl EventHub {
    /// Hub whose broadcast channel buffers `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            sender,
            failure_watchers: Mutex::new(Vec::new()),
        }
    }

    /// Receive every event published from now on, subject to the channel capacity.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    /// Receive every failure published from now on, without loss.
    pub fn watch_failures(&self) -> mpsc::UnboundedReceiver<StatusEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.failure_watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        receiver
    }

    /// Publish `event`. Watchers whose receiver was dropped are forgotten.
    pub fn broadcast(&self, event: StatusEvent) {
        if matches!(event, StatusEvent::Failed { .. }) {
            self.failure_watchers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|watcher| watcher.send(event.clone()).is_ok());
        }
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_derived_from_domain_and_name() {
        let id = OperationId::new("games", "fetchGame");
        assert_eq!(id, OperationId::from_static("games/fetchGame"));
        assert_ne!(id, OperationId::new("games", "createTurn"));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = StatusEvent::Dismissed {
            id: "games/fetchGame".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({ "type": "dismissed", "id": "games/fetchGame" })
        );
    }

    #[tokio::test]
    async fn failure_watchers_outlast_a_lagging_broadcast() {
        let hub = EventHub::new(2);
        let mut lagging = hub.subscribe();
        let mut failures = hub.watch_failures();
        let id = OperationId::from_static("games/createTurn");

        hub.broadcast(StatusEvent::Failed {
            id: id.clone(),
            invocation: Uuid::new_v4(),
            error: AppError::network("offline"),
        });
        for _ in 0..8 {
            hub.broadcast(StatusEvent::Started {
                id: id.clone(),
                invocation: Uuid::new_v4(),
            });
        }

        assert!(matches!(
            lagging.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert!(matches!(
            failures.recv().await,
            Some(StatusEvent::Failed { .. })
        ));
        assert!(failures.try_recv().is_err());
    }

    #[test]
    fn dropped_failure_watchers_are_forgotten() {
        let hub = EventHub::new(4);
        drop(hub.watch_failures());
        hub.broadcast(StatusEvent::Failed {
            id: "games/startGame".into(),
            invocation: Uuid::new_v4(),
            error: AppError::network("offline"),
        });
        assert!(hub.failure_watchers.lock().unwrap().is_empty());
    }
}

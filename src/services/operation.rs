use std::{any::Any, future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, ErrorCode, OperationError},
    state::{InvocationId, OperationId, SharedState, StatusEvent},
};

/// Handle given to an operation body for the duration of one invocation.
#[derive(Clone)]
pub struct OperationContext {
    state: SharedState,
    invocation: InvocationId,
}

impl OperationContext {
    /// Read access to the shared client state.
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Identifier of the running invocation.
    pub fn invocation(&self) -> InvocationId {
        self.invocation
    }

    /// Dispatch a further status event.
    pub fn dispatch(&self, event: StatusEvent) {
        self.state.dispatch(event);
    }
}

/// Outcome of a wrapped invocation. Failures are values, never panics or `Err`s.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<T> {
    Fulfilled(T),
    Rejected(AppError),
}

impl<T> Settled<T> {
    /// Convert into a plain [`Result`].
    pub fn into_result(self) -> Result<T, AppError> {
        match self {
            Settled::Fulfilled(value) => Ok(value),
            Settled::Rejected(err) => Err(err),
        }
    }

    /// Whether the invocation resolved.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settled::Fulfilled(_))
    }

    /// The normalized failure, if the invocation was rejected.
    pub fn error(&self) -> Option<&AppError> {
        match self {
            Settled::Fulfilled(_) => None,
            Settled::Rejected(err) => Some(err),
        }
    }
}

type OperationFn<P, T> =
    dyn Fn(P, OperationContext) -> BoxFuture<'static, Result<T, OperationError>> + Send + Sync;

/// A fallible asynchronous operation bound to a stable [`OperationId`].
///
/// Every [`AsyncOperation::dispatch`] emits [`StatusEvent::Started`] before the
/// body runs and then exactly one of [`StatusEvent::Succeeded`] or
/// [`StatusEvent::Failed`]. Concurrent invocations are neither serialized nor
/// deduplicated.
pub struct AsyncOperation<P, T> {
    id: OperationId,
    run: Arc<OperationFn<P, T>>,
}

impl<P, T> Clone for AsyncOperation<P, T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            run: Arc::clone(&self.run),
        }
    }
}

/// Bind `operation` to `id`.
pub fn wrap<P, T, F, Fut>(id: impl Into<OperationId>, operation: F) -> AsyncOperation<P, T>
where
    F: Fn(P, OperationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, OperationError>> + Send + 'static,
{
    AsyncOperation {
        id: id.into(),
        run: Arc::new(move |payload, context| Box::pin(operation(payload, context))),
    }
}

impl<P, T> AsyncOperation<P, T>
where
    T: Serialize,
{
    /// Identity under which this operation reports status.
    pub fn id(&self) -> &OperationId {
        &self.id
    }

    /// Run one invocation against `state`.
    pub async fn dispatch(&self, state: &SharedState, payload: P) -> Settled<T> {
        let invocation = Uuid::new_v4();
        state.dispatch(StatusEvent::Started {
            id: self.id.clone(),
            invocation,
        });

        let context = OperationContext {
            state: state.clone(),
            invocation,
        };
        let outcome = AssertUnwindSafe(async { (self.run)(payload, context).await })
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.classify()),
            Err(panic) => Err(AppError::unexpected(format!(
                "operation panicked: {}",
                panic_message(&*panic)
            ))),
        };

        match result {
            Ok(value) => {
                let payload = serde_json::to_value(&value).unwrap_or_else(|err| {
                    warn!(operation = %self.id, error = %err, "failed to serialize operation result");
                    Value::Null
                });
                debug!(operation = %self.id, %invocation, "operation fulfilled");
                state.dispatch(StatusEvent::Succeeded {
                    id: self.id.clone(),
                    invocation,
                    payload,
                });
                Settled::Fulfilled(value)
            }
            Err(error) => {
                if error.code() == ErrorCode::Unexpected {
                    state.reporter().capture_exception(&self.id, &error);
                }
                debug!(operation = %self.id, %invocation, error = %error, "operation rejected");
                state.dispatch(StatusEvent::Failed {
                    id: self.id.clone(),
                    invocation,
                    error: error.clone(),
                });
                Settled::Rejected(error)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

use tracing::error;

use crate::{error::AppError, state::OperationId};

/// Fire-and-forget sink for failures the classifier could not recognise.
pub trait ErrorReporter: Send + Sync {
    fn capture_exception(&self, operation: &OperationId, error: &AppError);
}

/// Default reporter emitting an error-level trace event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn capture_exception(&self, operation: &OperationId, error: &AppError) {
        error!(operation = %operation, error = %error, "unexpected failure captured");
    }
}

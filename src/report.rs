//! Error reporting sink for failures that never reach a caller

use crate::Error;

/// Receives failures from fire-and-forget work such as background fetches
pub trait ErrorReporter: Send + Sync {
    /// Report a failure; `context` names the operation that failed
    fn report(&self, context: &str, error: &Error);
}

/// Reports failures as `tracing` warnings
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, error: &Error) {
        tracing::warn!(context, error = %error, "background operation failed");
    }
}

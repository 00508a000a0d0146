//! Error types for the lint engine.
//!
//! # Error Handling Strategy
//!
//! Two complementary patterns are used, mirroring the split between fatal and
//! recoverable conditions:
//!
//! - [`InvalidArgument`]: programmer errors in utility operations (negative
//!   line numbers and the like). Returned as `Result<T, InvalidArgument>` and
//!   never suppressed or retried.
//!
//! - Value-encoded failures: plugin load problems become error strings on the
//!   plugin's [`crate::plugin::LoadedPlugin`] record, and rule panics become
//!   [`crate::linter::RuleFailure`] entries on the analysis report. These keep
//!   a run going under partial failure instead of aborting it.

use std::any::Any;

use thiserror::Error;

/// Invalid input to a utility operation; fail fast, this is a bug in the
/// caller rather than a data condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidArgument {
    #[error("line number must be non-negative, got {0}")]
    NegativeLineNumber(i64),

    #[error("line length must be non-negative, got {0}")]
    NegativeLineLength(i64),
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

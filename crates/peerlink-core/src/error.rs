//! Error types for session operations.
//!
//! # Design
//! - Keep error messages constant; store operational context in fields.
//! - Separate caller mistakes (`Validation`, `InvalidInput`) from engine state
//!   failures (`EngineUnavailable`) so callers know whether a retry can help.

use thiserror::Error;

/// Primary error type for session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Settings input had the wrong shape or a recognised key had the wrong type.
    #[error("invalid session settings")]
    Validation {
        /// Settings key that failed validation (`<root>` for the document itself).
        field: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Non-settings input could not be interpreted.
    #[error("invalid session input")]
    InvalidInput {
        /// Input field that was rejected.
        field: &'static str,
        /// Machine-readable reason for the rejection.
        reason: &'static str,
    },
    /// The engine session is destroyed or unreachable; the session must be recreated.
    #[error("engine session unavailable")]
    EngineUnavailable {
        /// Operation that could not be serviced.
        operation: &'static str,
    },
    /// The engine rejected a single call.
    #[error("engine operation failed")]
    EngineFailure {
        /// Operation that failed.
        operation: &'static str,
        /// Engine-provided failure detail.
        message: String,
    },
    /// The background worker driving the session has stopped.
    #[error("session worker closed")]
    WorkerClosed {
        /// Operation that could not be delivered.
        operation: &'static str,
    },
}

impl SessionError {
    /// Build a validation failure for a settings key.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: &'static str) -> Self {
        Self::Validation {
            field: field.into(),
            reason,
        }
    }

    /// Whether the failure leaves the session unusable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::EngineUnavailable { .. } | Self::WorkerClosed { .. }
        )
    }
}

/// Convenience alias for session operation results.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_constant_and_context_lives_in_fields() {
        let err = SessionError::validation("proxy_port", "must be an integer");
        assert_eq!(err.to_string(), "invalid session settings");
        match err {
            SessionError::Validation { field, reason } => {
                assert_eq!(field, "proxy_port");
                assert_eq!(reason, "must be an integer");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn only_engine_state_failures_are_fatal() {
        assert!(
            SessionError::EngineUnavailable {
                operation: "pop_alerts"
            }
            .is_fatal()
        );
        assert!(
            SessionError::WorkerClosed {
                operation: "add_torrent"
            }
            .is_fatal()
        );
        assert!(!SessionError::validation("<root>", "settings must be an object").is_fatal());
        assert!(
            !SessionError::EngineFailure {
                operation: "add_torrent",
                message: "bad magnet".to_string(),
            }
            .is_fatal()
        );
    }
}

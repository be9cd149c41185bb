//! # Design
//!
//! - Centralize engine-boundary error context without using `anyhow`.
//! - Keep error messages constant; store operational context in fields.
//! - Convert into the public `SessionError` taxonomy at the session boundary.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use peerlink_core::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Failure reported by a `SessionEngine` implementation.
pub enum EngineError {
    /// A request contained an invalid field value.
    InvalidInput {
        /// Field name with an invalid value.
        field: &'static str,
        /// Static reason describing the invalid value.
        reason: &'static str,
    },
    /// The engine session has been shut down or was never created.
    SessionUnavailable {
        /// Operation that could not be serviced.
        operation: &'static str,
    },
    /// A native engine call reported a failure.
    NativeFailure {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Native error message payload.
        message: String,
    },
}

impl EngineError {
    /// Whether the engine can no longer service any call.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::SessionUnavailable { .. })
    }
}

impl Display for EngineError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { field, reason } => {
                let _ = (field, reason);
                formatter.write_str("invalid engine input")
            }
            Self::SessionUnavailable { operation } => {
                let _ = operation;
                formatter.write_str("engine session unavailable")
            }
            Self::NativeFailure { operation, message } => {
                let _ = (operation, message);
                formatter.write_str("engine native error")
            }
        }
    }
}

impl Error for EngineError {}

impl From<EngineError> for SessionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidInput { field, reason } => Self::InvalidInput { field, reason },
            EngineError::SessionUnavailable { operation } => Self::EngineUnavailable { operation },
            EngineError::NativeFailure { operation, message } => {
                Self::EngineFailure { operation, message }
            }
        }
    }
}

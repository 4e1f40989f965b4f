//! Error types for the chat system.

use parley_database::DatabaseError;
use thiserror::Error;

pub type ChatResult<T> = Result<T, ChatError>;

/// Failure taxonomy shared by every pipeline. Each variant maps onto one
/// tagged error event on the realtime channel.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("not permitted: {reason}")]
    Authorization { reason: String },

    #[error("invalid request: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("storage failure: {0}")]
    Storage(#[from] DatabaseError),
}

impl ChatError {
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    pub fn authorization(reason: impl Into<String>) -> Self {
        Self::Authorization {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Wire tag of the error event this failure is reported as.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "authentication_error",
            Self::Authorization { .. } => "authorization_error",
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found_error",
            Self::Storage(_) => "storage_error",
        }
    }
}

//! Error types for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parley_auth::AuthError;
use parley_chats::ChatError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::AuthorizationFailed(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = json!({
            "error": status.as_str(),
            "message": self.to_string(),
        });

        (status, Json(error_response)).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<ChatError> for GatewayError {
    fn from(error: ChatError) -> Self {
        match error {
            ChatError::Authentication { reason } => GatewayError::AuthenticationFailed(reason),
            ChatError::Authorization { reason } => GatewayError::AuthorizationFailed(reason),
            ChatError::Validation { message } => GatewayError::InvalidRequest(message),
            err @ ChatError::NotFound { .. } => GatewayError::NotFound(err.to_string()),
            ChatError::Storage(err) => {
                tracing::error!(error = %err, "storage failure while serving request");
                GatewayError::InternalError("storage unavailable".to_string())
            }
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Database(err) => {
                tracing::error!(error = %err, "storage failure while authenticating");
                GatewayError::InternalError("storage unavailable".to_string())
            }
            AuthError::TokenCreation(msg) => GatewayError::InternalError(msg),
            other => GatewayError::AuthenticationFailed(other.to_string()),
        }
    }
}

//! Error types for the sync server.

use gophkeeper_sync_protocol::{ErrorCode, ErrorResponse, ProtocolError};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing, malformed or expired bearer token.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Unknown login or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Login is already taken.
    #[error("user already exists: {0}")]
    UserExists(String),

    /// Unknown endpoint.
    #[error("no such endpoint: {0}")]
    NotFound(String),

    /// SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Password hashing or migration error.
    #[error("core error: {0}")]
    Core(#[from] gophkeeper_core::CoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        ServerError::InvalidRequest(err.to_string())
    }
}

impl ServerError {
    /// Creates an unauthenticated error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_)
                | ServerError::Unauthenticated(_)
                | ServerError::InvalidCredentials
                | ServerError::UserExists(_)
                | ServerError::NotFound(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Wire error category.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServerError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            ServerError::Unauthenticated(_) => ErrorCode::Unauthenticated,
            ServerError::InvalidCredentials => ErrorCode::InvalidCredentials,
            ServerError::UserExists(_) => ErrorCode::UserExists,
            ServerError::NotFound(_) => ErrorCode::NotFound,
            ServerError::Database(_) | ServerError::Core(_) | ServerError::Internal(_) => {
                ErrorCode::Internal
            }
        }
    }

    /// Builds the error body sent to the client.
    ///
    /// Server-side failures are reported without their details.
    pub fn to_response(&self) -> ErrorResponse {
        let message = if self.is_server_error() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        ErrorResponse::new(self.code(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::InvalidCredentials.is_client_error());
        assert!(ServerError::internal("oops").is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
    }

    #[test]
    fn codes_and_statuses() {
        assert_eq!(ServerError::UserExists("me".into()).code().status(), 409);
        assert_eq!(ServerError::unauthenticated("expired").code().status(), 401);
        assert_eq!(ServerError::InvalidCredentials.code().status(), 401);
        assert_eq!(ServerError::NotFound("/x".into()).code().status(), 404);
        assert_eq!(ServerError::internal("disk").code().status(), 500);
    }

    #[test]
    fn internal_details_stay_private() {
        let response = ServerError::internal("disk at /var/lib is full").to_response();
        assert_eq!(response.code, ErrorCode::Internal);
        assert!(!response.message.contains("/var/lib"));

        let response = ServerError::UserExists("me".into()).to_response();
        assert!(response.message.contains("me"));
    }

    #[test]
    fn protocol_errors_are_bad_requests() {
        let err: ServerError = ProtocolError::decoding_failed("eof").into();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}

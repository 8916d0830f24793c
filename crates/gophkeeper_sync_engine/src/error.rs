//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The server could not be reached.
    #[error("remote unavailable: {message}")]
    RemoteUnavailable {
        /// Error message.
        message: String,
    },

    /// The server failed while handling the request (5xx).
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Error message from the server.
        message: String,
    },

    /// The server refused the request (4xx other than 401).
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Error message from the server.
        message: String,
    },

    /// Credentials or token were not accepted.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A secret operation was attempted before register or login.
    #[error("not authenticated: register or login first")]
    NotAuthenticated,

    /// Another cycle is in progress on this engine.
    #[error("a sync cycle is already running")]
    AlreadySyncing,

    /// Sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// Local storage error during sync.
    #[error("local store error: {0}")]
    Core(#[from] gophkeeper_core::CoreError),

    /// Message could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] gophkeeper_sync_protocol::ProtocolError),
}

impl SyncError {
    /// Creates a remote unavailable error.
    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
        }
    }

    /// Maps a non-2xx HTTP status to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::AuthenticationFailed(message),
            500..=599 => Self::Server { status, message },
            _ => Self::Rejected { status, message },
        }
    }

    /// Returns true if this error can be retried on the next cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteUnavailable { .. } | SyncError::Server { .. }
        )
    }

    /// Returns true if the user has to (re)authenticate.
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            SyncError::AuthenticationFailed(_) | SyncError::NotAuthenticated
        )
    }
}

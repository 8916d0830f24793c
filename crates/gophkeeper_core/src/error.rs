//! Error types for gophkeeper core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Secret codec error.
    #[error("codec error: {0}")]
    Codec(#[from] gophkeeper_codec::CodecError),

    /// SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Ciphertext is shorter than the nonce.
    #[error("ciphertext too short: {len} bytes, need at least {min}")]
    CiphertextTooShort {
        /// Length of the rejected input.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },

    /// Authentication tag did not verify. Usually a wrong passphrase.
    #[error("authentication failed: wrong passphrase or corrupted data")]
    AuthenticationFailed,

    /// Encryption failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// Password hashing or verifier parsing failed.
    #[error("password hash error: {message}")]
    PasswordHash {
        /// Description of the failure.
        message: String,
    },

    /// The passphrase does not match the vault verifier.
    #[error("wrong master password")]
    WrongPassphrase,

    /// No live secret stored under the key.
    #[error("no such secret: {key}")]
    NotFound {
        /// The requested key.
        key: String,
    },

    /// Another process holds the vault lock.
    #[error("vault locked: another process has exclusive access")]
    VaultLocked,

    /// A record cannot be stored.
    #[error("invalid record: {message}")]
    InvalidRecord {
        /// Description of the problem.
        message: String,
    },

    /// A sealed value would be larger than replication accepts.
    #[error("value too large: {len} bytes, limit is {max}")]
    ValueTooLarge {
        /// Size the sealed value would have.
        len: usize,
        /// Largest accepted size.
        max: usize,
    },

    /// Stored data has an unexpected shape.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },
}

impl CoreError {
    /// Create a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an encryption failed error.
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            message: message.into(),
        }
    }

    /// Create a password hash error.
    pub fn password_hash(message: impl Into<String>) -> Self {
        Self::PasswordHash {
            message: message.into(),
        }
    }

    /// Create an invalid record error.
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns true if the error is an expected "no such secret".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the stored secret could not be recovered.
    ///
    /// Covers cipher failures and codec corruption; these are never retried.
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::AuthenticationFailed | Self::CiphertextTooShort { .. } => true,
            Self::Codec(e) => e.is_corruption(),
            _ => false,
        }
    }
}

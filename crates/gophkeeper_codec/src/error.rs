//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while building, encoding or decoding a secret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Stored bytes do not describe a secret (bad tag, truncated or unparseable payload).
    #[error("malformed value: {message}")]
    MalformedValue {
        /// Description of what is wrong with the bytes.
        message: String,
    },

    /// A secret field violates its constraints.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the violated constraint.
        message: String,
    },

    /// The secret type name is not one of the known kinds.
    #[error("unknown secret type: {name}")]
    UnknownKind {
        /// The name that was supplied.
        name: String,
    },

    /// User supplied arguments could not be turned into a secret.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the input problem.
        message: String,
    },

    /// Failed to serialize a payload.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },
}

impl CodecError {
    /// Create a malformed value error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedValue {
            message: message.into(),
        }
    }

    /// Create a validation error for a field.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Returns true if the error means stored data is corrupted.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::MalformedValue { .. })
    }
}

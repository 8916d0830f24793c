//! Protocol messages for sync and account management.
//!
//! Every message is a plain serde struct carried as a CBOR body. Secret
//! routes additionally require an `Authorization: Bearer <token>` header,
//! which is not part of the message itself.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::conflict::UpsertOutcome;
use crate::error::{ProtocolError, ProtocolResult};
use crate::record::SyncRecord;

/// Media type of every request and response body.
pub const CONTENT_TYPE: &str = "application/cbor";

/// Endpoint paths.
pub mod endpoints {
    /// Create an account and receive a token.
    pub const REGISTER: &str = "/v1/auth/register";
    /// Log in and receive a token.
    pub const LOGIN: &str = "/v1/auth/login";
    /// Push one record.
    pub const UPSERT: &str = "/v1/secrets/upsert";
    /// Pull records changed since a timestamp.
    pub const CHANGES: &str = "/v1/secrets/changes";
}

/// CBOR encoding shared by all messages.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Encodes to CBOR.
    fn encode(&self) -> ProtocolResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| ProtocolError::encoding_failed(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes from CBOR.
    fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| ProtocolError::decoding_failed(e.to_string()))
    }
}

/// Account creation request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Account login.
    pub login: String,
    /// Account password.
    pub password: String,
    /// Vault passphrase shared by every device of the account.
    pub master_password: String,
}

impl RegisterRequest {
    /// Creates a new register request.
    pub fn new(
        login: impl Into<String>,
        password: impl Into<String>,
        master_password: impl Into<String>,
    ) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            master_password: master_password.into(),
        }
    }

    /// Checks that no field is empty.
    pub fn validate(&self) -> ProtocolResult<()> {
        validate_credentials(&self.login, &self.password, &self.master_password)
    }
}

/// Login request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account login.
    pub login: String,
    /// Account password.
    pub password: String,
    /// Vault passphrase; must match the one given at registration.
    pub master_password: String,
}

impl LoginRequest {
    /// Creates a new login request.
    pub fn new(
        login: impl Into<String>,
        password: impl Into<String>,
        master_password: impl Into<String>,
    ) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            master_password: master_password.into(),
        }
    }

    /// Checks that no field is empty.
    pub fn validate(&self) -> ProtocolResult<()> {
        validate_credentials(&self.login, &self.password, &self.master_password)
    }
}

fn validate_credentials(login: &str, password: &str, master_password: &str) -> ProtocolResult<()> {
    if login.is_empty() {
        return Err(ProtocolError::invalid_message("login must not be empty"));
    }
    if password.is_empty() {
        return Err(ProtocolError::invalid_message("password must not be empty"));
    }
    if master_password.is_empty() {
        return Err(ProtocolError::invalid_message(
            "master password must not be empty",
        ));
    }
    Ok(())
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

/// Bearer token issued on register or login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque bearer credential.
    pub token: String,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Push of a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertRequest {
    /// The record to store.
    pub record: SyncRecord,
}

/// Result of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertResponse {
    /// What the store did with the record.
    pub outcome: UpsertOutcome,
}

/// Request for records changed after a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Exclusive lower bound on `updated_at`.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub since: DateTime<Utc>,
}

/// Records changed after the requested timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PullResponse {
    /// Matching records ordered by `updated_at`.
    pub records: Vec<SyncRecord>,
}

/// Machine readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Body could not be decoded or failed validation.
    InvalidRequest,
    /// Missing, malformed or expired bearer token.
    Unauthenticated,
    /// Unknown login or wrong password.
    InvalidCredentials,
    /// Login is already taken.
    UserExists,
    /// Unknown endpoint.
    NotFound,
    /// Unexpected server failure.
    Internal,
}

impl ErrorCode {
    /// HTTP status the code is carried with.
    pub fn status(&self) -> u16 {
        match self {
            ErrorCode::InvalidRequest => 400,
            ErrorCode::Unauthenticated | ErrorCode::InvalidCredentials => 401,
            ErrorCode::NotFound => 404,
            ErrorCode::UserExists => 409,
            ErrorCode::Internal => 500,
        }
    }
}

/// Error body returned with every non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category.
    pub code: ErrorCode,
    /// Human readable description.
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl WireMessage for RegisterRequest {}
impl WireMessage for LoginRequest {}
impl WireMessage for TokenResponse {}
impl WireMessage for UpsertRequest {}
impl WireMessage for UpsertResponse {}
impl WireMessage for PullRequest {}
impl WireMessage for PullResponse {}
impl WireMessage for ErrorResponse {}

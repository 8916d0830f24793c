//! # gophkeeper Sync Protocol
//!
//! Sync protocol types and CBOR messages for gophkeeper.
//!
//! This crate provides:
//! - `SyncRecord`, the unit of replication
//! - The last-writer-wins rule applied by the authoritative store
//! - Request/response messages and endpoint paths
//! - CBOR encoding/decoding
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod conflict;
mod error;
pub mod messages;
mod record;

pub use conflict::{resolve, Conflict, UpsertOutcome};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    endpoints, ErrorCode, ErrorResponse, LoginRequest, PullRequest, PullResponse,
    RegisterRequest, TokenResponse, UpsertRequest, UpsertResponse, WireMessage, CONTENT_TYPE,
};
pub use record::{OwnerId, SyncRecord, MAX_KEY_BYTES, MAX_VALUE_BYTES};

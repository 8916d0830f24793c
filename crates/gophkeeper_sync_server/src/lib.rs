//! # gophkeeper Sync Server
//!
//! Authoritative replica and HTTP sync server for gophkeeper.
//!
//! This crate provides:
//! - HTTP endpoints (register, login, upsert, changes)
//! - A SQLite remote store with per-key last-writer-wins upserts
//! - Accounts with argon2 password hashes
//! - Bearer tokens (HMAC-SHA256, with expiry)
//!
//! # Architecture
//!
//! Every request goes through [`SyncServer::dispatch`], which takes the
//! path, the bearer token and the CBOR body and returns a status with a
//! CBOR body. The axum router in [`http`] is a thin shell around it, and
//! tests call it directly.
//!
//! # Authentication
//!
//! ```rust,ignore
//! use gophkeeper_sync_server::{AuthConfig, TokenValidator};
//! use gophkeeper_sync_protocol::OwnerId;
//!
//! let validator = TokenValidator::new(AuthConfig::new(secret));
//! let token = validator.create_token(OwnerId(7))?;
//! assert_eq!(validator.resolve(&token)?, OwnerId(7));
//! ```
//!
//! # Conflict rule
//!
//! For each `(owner, key)` the row with the larger `updated_at` wins; on a
//! tie the stored row is kept. The check and the write happen in one
//! immediate transaction, so racing clients converge in any arrival order.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod accounts;
mod auth;
mod config;
mod error;
mod handler;
pub mod http;
mod server;
mod store;

pub use accounts::Accounts;
pub use auth::{AuthConfig, TokenValidator};
pub use config::{ConfigError, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::{SyncServer, WireResponse};
pub use store::{RemoteStore, UserRow};

//! # gophkeeper Core
//!
//! Local vault storage and encryption for gophkeeper.
//!
//! This crate provides:
//! - `SecretCipher` for sealing secret payloads with a passphrase-derived key
//! - Argon2 hashing used for the vault unlock verifier and account passwords
//! - `LocalStore`, the device's SQLite replica with its sync watermark
//! - `Vault`, which ties codec, cipher and store together for commands
//!
//! ## Layout
//!
//! ```text
//! <db_path>        # SQLite database (secrets, replica_meta, schema_version)
//! <db_path>.lock   # Advisory lock, one process per vault
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crypto;
mod error;
mod lock;
pub mod store;
mod types;
mod vault;

pub use crypto::{hash_password, open, seal, verify_password, SecretCipher, VaultKey};
pub use error::{CoreError, CoreResult};
pub use lock::VaultLock;
pub use store::LocalStore;
pub use types::{now, SecretRecord, EPOCH};
pub use vault::Vault;

//! Cryptographic operations for the vault.
//!
//! ## Security Model
//!
//! - Secrets are sealed with AES-256-GCM
//! - The key is SHA-256 of the master password, so every device of an
//!   account derives the same key without storing it
//! - Unique random nonce per seal, prepended to the output
//! - Keys are zeroized on drop
//! - The master password itself is only kept as an Argon2 verifier
//!
//! ## Usage
//!
//! ```
//! use gophkeeper_core::crypto::{SecretCipher, VaultKey};
//!
//! let cipher = SecretCipher::new(VaultKey::derive("correct horse"));
//! let sealed = cipher.seal(b"secret data").unwrap();
//! assert_eq!(cipher.open(&sealed).unwrap(), b"secret data");
//! ```

mod cipher;
mod password;

pub use cipher::{open, seal, SecretCipher, VaultKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use password::{hash_password, verify_password};

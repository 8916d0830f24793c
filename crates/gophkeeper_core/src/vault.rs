//! Unlocked vault: secrets in, sealed records out.

use std::sync::Arc;

use gophkeeper_codec::{decode_secret, encode_secret, Secret};
use gophkeeper_sync_protocol::{MAX_KEY_BYTES, MAX_VALUE_BYTES};

use crate::crypto::{hash_password, verify_password, SecretCipher, NONCE_SIZE, TAG_SIZE};
use crate::error::{CoreError, CoreResult};
use crate::store::LocalStore;
use crate::types::{now, SecretRecord};

/// An unlocked vault over a [`LocalStore`].
///
/// Every value written through the vault is validated, encoded and sealed
/// before it reaches the store; every value read is opened and decoded.
/// Cipher and codec failures are returned as-is so a wrong passphrase or a
/// corrupted row is never shown as a real secret.
#[derive(Debug)]
pub struct Vault {
    store: Arc<LocalStore>,
    cipher: SecretCipher,
}

impl Vault {
    /// Unlocks the vault with the master password.
    ///
    /// On first use the store has no verifier; one is created for
    /// `passphrase`. Afterwards `passphrase` must match it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WrongPassphrase`] on mismatch.
    pub fn unlock(store: Arc<LocalStore>, passphrase: &str) -> CoreResult<Self> {
        if passphrase.is_empty() {
            return Err(CoreError::WrongPassphrase);
        }

        match store.verifier()? {
            Some(verifier) => {
                if !verify_password(passphrase, &verifier)? {
                    return Err(CoreError::WrongPassphrase);
                }
                tracing::debug!("vault unlocked");
            }
            None => {
                store.set_verifier(&hash_password(passphrase)?)?;
                tracing::info!("vault initialized with a new master password");
            }
        }

        Ok(Self {
            store,
            cipher: SecretCipher::from_passphrase(passphrase),
        })
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Stores `secret` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Codec`] if the secret fails validation
    /// - [`CoreError::InvalidRecord`] if the key is empty or too long
    /// - [`CoreError::ValueTooLarge`] if the sealed value would exceed
    ///   [`MAX_VALUE_BYTES`]
    pub fn put(&self, key: &str, secret: &Secret) -> CoreResult<()> {
        if key.is_empty() || key.len() > MAX_KEY_BYTES {
            return Err(CoreError::invalid_record(format!(
                "key must be 1 to {MAX_KEY_BYTES} bytes, got {}",
                key.len()
            )));
        }

        let encoded = encode_secret(secret)?;
        let len = encoded.len() + NONCE_SIZE + TAG_SIZE;
        if len > MAX_VALUE_BYTES {
            return Err(CoreError::ValueTooLarge {
                len,
                max: MAX_VALUE_BYTES,
            });
        }

        let sealed = self.cipher.seal(&encoded)?;
        self.store.upsert(&SecretRecord::new(key, sealed, now()))?;
        tracing::debug!(key, kind = %secret.kind(), "stored secret");
        Ok(())
    }

    /// Returns the secret stored under `key`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the key is absent or deleted
    /// - [`CoreError::AuthenticationFailed`] / [`CoreError::CiphertextTooShort`]
    ///   if the value cannot be opened
    /// - [`CoreError::Codec`] if the opened value is malformed
    pub fn get(&self, key: &str) -> CoreResult<Secret> {
        let record = self.store.get(key)?;
        if record.is_deleted() {
            return Err(CoreError::not_found(key));
        }

        let encoded = self.cipher.open(&record.value)?;
        Ok(decode_secret(&encoded)?)
    }

    /// Marks the secret under `key` as deleted.
    ///
    /// The row stays in place as a tombstone so the deletion replicates.
    pub fn delete(&self, key: &str) -> CoreResult<()> {
        let record = self.store.get(key)?;
        if record.is_deleted() {
            return Err(CoreError::not_found(key));
        }

        self.store.upsert(&SecretRecord::tombstone(key, now()))?;
        tracing::debug!(key, "deleted secret");
        Ok(())
    }

    /// Returns the keys of all live secrets.
    pub fn list(&self) -> CoreResult<Vec<String>> {
        self.store.list_keys()
    }
}

//! Sealing secrets with AES-256-GCM.

use crate::error::{CoreError, CoreResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Key used to seal vault secrets.
///
/// The key is automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    bytes: [u8; KEY_SIZE],
}

impl VaultKey {
    /// Derives the key from the master password.
    ///
    /// The same password always yields the same key.
    #[must_use]
    pub fn derive(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&digest);
        Self { bytes }
    }

    /// Returns the key as a byte slice.
    ///
    /// # Security
    ///
    /// Don't log or serialize the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Seals and opens secret payloads.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Creates a cipher for the given key.
    #[must_use]
    pub fn new(key: VaultKey) -> Self {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
        Self { cipher }
    }

    /// Creates a cipher directly from the master password.
    #[must_use]
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self::new(VaultKey::derive(passphrase))
    }

    /// Encrypts and authenticates `plaintext`.
    ///
    /// The output format is: `nonce (12 bytes) || ciphertext || tag (16 bytes)`
    pub fn seal(&self, plaintext: &[u8]) -> CoreResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CoreError::encryption_failed("encryption error"))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend(ciphertext);

        Ok(result)
    }

    /// Opens data produced by [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// - [`CoreError::CiphertextTooShort`] if the input cannot hold a nonce
    /// - [`CoreError::AuthenticationFailed`] if the tag does not verify
    pub fn open(&self, sealed: &[u8]) -> CoreResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE {
            return Err(CoreError::CiphertextTooShort {
                len: sealed.len(),
                min: NONCE_SIZE,
            });
        }

        let (nonce, encrypted) = sealed.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), encrypted)
            .map_err(|_| CoreError::AuthenticationFailed)
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("cipher", &"Aes256Gcm")
            .finish()
    }
}

/// Seals `plaintext` with a key derived from `passphrase`.
pub fn seal(passphrase: &str, plaintext: &[u8]) -> CoreResult<Vec<u8>> {
    SecretCipher::from_passphrase(passphrase).seal(plaintext)
}

/// Opens `sealed` with a key derived from `passphrase`.
pub fn open(passphrase: &str, sealed: &[u8]) -> CoreResult<Vec<u8>> {
    SecretCipher::from_passphrase(passphrase).open(sealed)
}

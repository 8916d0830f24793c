//! Authentication support for the sync server.
//!
//! This module provides bearer tokens signed with HMAC-SHA256. Tokens
//! include their issue time for expiration checking.
//!
//! ## Token Format
//!
//! Tokens are composed of:
//! - 4 bytes: owner id (big-endian)
//! - 8 bytes: issue time (Unix millis, big-endian)
//! - 32 bytes: HMAC-SHA256 signature over the first 12 bytes
//!
//! Total: 44 bytes, base64url-encoded (no padding) for transport.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use gophkeeper_sync_protocol::OwnerId;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ServerError, ServerResult};

type HmacSha256 = Hmac<Sha256>;

const PAYLOAD_LEN: usize = 12;
const TOKEN_LEN: usize = PAYLOAD_LEN + 32;

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Secret key for HMAC.
    pub secret: Vec<u8>,
    /// Token expiration duration.
    pub token_expiry: Duration,
}

impl AuthConfig {
    /// Creates a new auth configuration.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            token_expiry: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Sets the token expiration duration.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"[REDACTED]")
            .field("token_expiry", &self.token_expiry)
            .finish()
    }
}

/// Issues and resolves bearer tokens.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    config: AuthConfig,
}

impl TokenValidator {
    /// Creates a new token validator.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Creates a token for `owner` issued now.
    pub fn create_token(&self, owner: OwnerId) -> ServerResult<String> {
        self.create_token_at(owner, Utc::now())
    }

    /// Creates a token for `owner` issued at `issued_at`.
    pub fn create_token_at(
        &self,
        owner: OwnerId,
        issued_at: DateTime<Utc>,
    ) -> ServerResult<String> {
        let mut token = Vec::with_capacity(TOKEN_LEN);
        token.extend_from_slice(&owner.as_u32().to_be_bytes());
        token.extend_from_slice(&issued_at.timestamp_millis().to_be_bytes());

        let signature = self.mac()?.chain_update(&token).finalize().into_bytes();
        token.extend_from_slice(&signature);
        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    /// Returns the owner a token was issued to.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Unauthenticated`] if the token is malformed,
    /// badly signed or expired.
    pub fn resolve(&self, token: &str) -> ServerResult<OwnerId> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| ServerError::unauthenticated("malformed token"))?;
        if bytes.len() != TOKEN_LEN {
            return Err(ServerError::unauthenticated("malformed token"));
        }

        let (payload, signature) = bytes.split_at(PAYLOAD_LEN);
        self.mac()?
            .chain_update(payload)
            .verify_slice(signature)
            .map_err(|_| ServerError::unauthenticated("invalid token signature"))?;

        let mut owner = [0u8; 4];
        owner.copy_from_slice(&payload[..4]);
        let mut issued = [0u8; 8];
        issued.copy_from_slice(&payload[4..]);

        let issued_at = i64::from_be_bytes(issued);
        let expiry_ms = i64::try_from(self.config.token_expiry.as_millis()).unwrap_or(i64::MAX);
        if Utc::now().timestamp_millis().saturating_sub(issued_at) > expiry_ms {
            return Err(ServerError::unauthenticated("token expired"));
        }

        Ok(OwnerId(u32::from_be_bytes(owner)))
    }

    fn mac(&self) -> ServerResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| ServerError::internal(format!("hmac key: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> TokenValidator {
        TokenValidator::new(AuthConfig::new(b"test-secret-key-32-bytes-long!!".to_vec()))
    }

    #[test]
    fn create_and_resolve_token() {
        let validator = validator();
        let token = validator.create_token(OwnerId(42)).unwrap();
        assert!(!token.contains('='));
        assert_eq!(validator.resolve(&token).unwrap(), OwnerId(42));
    }

    #[test]
    fn reject_foreign_secret() {
        let token = validator().create_token(OwnerId(1)).unwrap();
        let other = TokenValidator::new(AuthConfig::new(b"another-secret".to_vec()));
        assert!(matches!(
            other.resolve(&token),
            Err(ServerError::Unauthenticated(_))
        ));
    }

    #[test]
    fn reject_tampered_token() {
        let validator = validator();
        let token = validator.create_token(OwnerId(1)).unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(&token).unwrap();
        bytes[3] ^= 0x01; // owner id 1 -> 0
        let forged = URL_SAFE_NO_PAD.encode(&bytes);
        assert!(validator.resolve(&forged).is_err());
    }

    #[test]
    fn reject_malformed_token() {
        let validator = validator();
        assert!(validator.resolve("").is_err());
        assert!(validator.resolve("not base64 !!").is_err());
        assert!(validator.resolve(&URL_SAFE_NO_PAD.encode([0u8; 10])).is_err());
    }

    #[test]
    fn reject_expired_token() {
        let validator = TokenValidator::new(
            AuthConfig::new(b"secret".to_vec()).with_expiry(Duration::from_secs(60)),
        );
        let issued = Utc::now() - chrono::Duration::seconds(120);
        let token = validator.create_token_at(OwnerId(1), issued).unwrap();

        match validator.resolve(&token) {
            Err(ServerError::Unauthenticated(message)) => assert_eq!(message, "token expired"),
            other => panic!("unexpected: {other:?}"),
        }

        let fresh = Utc::now() - chrono::Duration::seconds(30);
        let token = validator.create_token_at(OwnerId(1), fresh).unwrap();
        assert!(validator.resolve(&token).is_ok());
    }

    #[test]
    fn debug_redacts_secret() {
        let output = format!("{:?}", validator());
        assert!(!output.contains("test-secret"));
    }
}

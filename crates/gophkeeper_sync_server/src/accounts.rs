//! Account registration and login.

use std::sync::Arc;

use gophkeeper_core::{hash_password, verify_password};

use crate::auth::TokenValidator;
use crate::error::{ServerError, ServerResult};
use crate::store::RemoteStore;

/// Creates accounts and issues tokens.
///
/// Both the account password and the master password are stored as argon2
/// hashes. Login checks both, which keeps every device of an account on
/// the same vault passphrase.
#[derive(Debug, Clone)]
pub struct Accounts {
    store: Arc<RemoteStore>,
    tokens: TokenValidator,
}

impl Accounts {
    /// Creates the account service.
    pub fn new(store: Arc<RemoteStore>, tokens: TokenValidator) -> Self {
        Self { store, tokens }
    }

    /// Registers `login` and returns a token for the new owner.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::UserExists`] if the login is taken.
    pub fn register(
        &self,
        login: &str,
        password: &str,
        master_password: &str,
    ) -> ServerResult<String> {
        if self.store.find_user(login)?.is_some() {
            return Err(ServerError::UserExists(login.to_string()));
        }

        let password_hash = hash_password(password)?;
        let master_password_hash = hash_password(master_password)?;
        let owner = self
            .store
            .create_user(login, &password_hash, &master_password_hash)?;

        tracing::info!(login, %owner, "registered user");
        self.tokens.create_token(owner)
    }

    /// Checks both passwords and returns a fresh token.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidCredentials`] if the login is unknown
    /// or either password does not match.
    pub fn login(
        &self,
        login: &str,
        password: &str,
        master_password: &str,
    ) -> ServerResult<String> {
        let user = self
            .store
            .find_user(login)?
            .ok_or(ServerError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)?
            || !verify_password(master_password, &user.master_password_hash)?
        {
            tracing::warn!(login, "rejected login");
            return Err(ServerError::InvalidCredentials);
        }

        tracing::debug!(login, owner = %user.id, "logged in");
        self.tokens.create_token(user.id)
    }
}

//! Request handlers for sync endpoints.

use std::sync::Arc;

use gophkeeper_sync_protocol::{
    LoginRequest, OwnerId, PullRequest, PullResponse, RegisterRequest, TokenResponse,
    UpsertRequest, UpsertResponse,
};

use crate::accounts::Accounts;
use crate::auth::{AuthConfig, TokenValidator};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::store::RemoteStore;

/// Context for request handling.
#[derive(Debug)]
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Remote store (shared across all handlers).
    pub store: Arc<RemoteStore>,
    /// Token issuer and validator.
    pub tokens: TokenValidator,
    /// Account service.
    pub accounts: Accounts,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<RemoteStore>) -> Self {
        let tokens = TokenValidator::new(
            AuthConfig::new(config.token_secret.clone()).with_expiry(config.token_ttl),
        );
        let accounts = Accounts::new(Arc::clone(&store), tokens.clone());
        Self {
            config,
            store,
            tokens,
            accounts,
        }
    }
}

/// Handler for sync requests.
#[derive(Debug)]
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Resolves the bearer token of a secret request.
    pub fn authenticate(&self, bearer: Option<&str>) -> ServerResult<OwnerId> {
        let token = bearer.ok_or_else(|| ServerError::unauthenticated("missing bearer token"))?;
        self.context.tokens.resolve(token)
    }

    /// Handles a register request.
    pub fn handle_register(&self, request: RegisterRequest) -> ServerResult<TokenResponse> {
        request.validate()?;
        let token = self.context.accounts.register(
            &request.login,
            &request.password,
            &request.master_password,
        )?;
        Ok(TokenResponse { token })
    }

    /// Handles a login request.
    pub fn handle_login(&self, request: LoginRequest) -> ServerResult<TokenResponse> {
        request.validate()?;
        let token = self.context.accounts.login(
            &request.login,
            &request.password,
            &request.master_password,
        )?;
        Ok(TokenResponse { token })
    }

    /// Handles a push of one record.
    pub fn handle_upsert(
        &self,
        owner: OwnerId,
        request: UpsertRequest,
    ) -> ServerResult<UpsertResponse> {
        request.record.validate()?;
        let outcome = self.context.store.upsert(owner, &request.record)?;
        tracing::debug!(%owner, key = %request.record.key, ?outcome, "upsert");
        Ok(UpsertResponse { outcome })
    }

    /// Handles a pull of changed records.
    pub fn handle_changes(
        &self,
        owner: OwnerId,
        request: PullRequest,
    ) -> ServerResult<PullResponse> {
        let records = self.context.store.changed_since(owner, request.since)?;
        tracing::debug!(%owner, since = %request.since, count = records.len(), "changes");
        Ok(PullResponse { records })
    }
}

//! HTTP transport implementation.
//!
//! This module provides an HTTP-based transport for the sync engine.
//! The actual HTTP client is abstracted via a trait so the binary can plug
//! in `reqwest` while tests route requests straight into a server.

use chrono::{DateTime, Utc};
use gophkeeper_sync_protocol::{
    endpoints, ErrorResponse, LoginRequest, PullRequest, PullResponse, RegisterRequest,
    SyncRecord, TokenResponse, UpsertOutcome, UpsertRequest, UpsertResponse, WireMessage,
};
use parking_lot::RwLock;

use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a new response.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// `Err` means no response was received at all (connection refused,
/// timeout, DNS failure). Any status, including 5xx, is an `Ok`.
pub trait HttpClient: Send + Sync {
    /// Sends a CBOR POST request, with a bearer token when given.
    fn post(&self, url: &str, bearer: Option<&str>, body: Vec<u8>) -> Result<HttpResponse, String>;
}

/// HTTP-based sync transport.
///
/// Holds the bearer token obtained from [`register`](Self::register) or
/// [`login`](Self::login) and attaches it to every secret request.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the server (e.g., "http://127.0.0.1:50051").
    base_url: String,
    /// HTTP client implementation.
    client: C,
    token: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            token: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns true once a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Replaces the held token.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Forgets the held token.
    pub fn clear_token(&self) {
        *self.token.write() = None;
    }

    /// Creates an account and keeps the issued token.
    pub fn register(&self, login: &str, password: &str, master_password: &str) -> SyncResult<()> {
        let request = RegisterRequest::new(login, password, master_password);
        request.validate()?;
        let response: TokenResponse = self.post_message(endpoints::REGISTER, None, &request)?;
        self.set_token(response.token);
        tracing::info!(login, "registered");
        Ok(())
    }

    /// Logs in and keeps the issued token.
    pub fn login(&self, login: &str, password: &str, master_password: &str) -> SyncResult<()> {
        let request = LoginRequest::new(login, password, master_password);
        request.validate()?;
        let response: TokenResponse = self.post_message(endpoints::LOGIN, None, &request)?;
        self.set_token(response.token);
        tracing::info!(login, "logged in");
        Ok(())
    }

    fn bearer(&self) -> SyncResult<String> {
        self.token.read().clone().ok_or(SyncError::NotAuthenticated)
    }

    fn post_message<Req, Res>(
        &self,
        endpoint: &str,
        bearer: Option<&str>,
        request: &Req,
    ) -> SyncResult<Res>
    where
        Req: WireMessage,
        Res: WireMessage,
    {
        let body = request.encode()?;
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url, bearer, body)
            .map_err(SyncError::remote_unavailable)?;

        if response.is_success() {
            return Ok(Res::decode(&response.body)?);
        }

        let message = ErrorResponse::decode(&response.body)
            .map(|e| e.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).into_owned());
        tracing::debug!(endpoint, status = response.status, %message, "request failed");
        Err(SyncError::from_status(response.status, message))
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    fn upsert(&self, record: &SyncRecord) -> SyncResult<UpsertOutcome> {
        let bearer = self.bearer()?;
        let request = UpsertRequest {
            record: record.clone(),
        };
        let response: UpsertResponse =
            self.post_message(endpoints::UPSERT, Some(&bearer), &request)?;
        Ok(response.outcome)
    }

    fn pull_changed_since(&self, since: DateTime<Utc>) -> SyncResult<Vec<SyncRecord>> {
        let bearer = self.bearer()?;
        let response: PullResponse =
            self.post_message(endpoints::CHANGES, Some(&bearer), &PullRequest { since })?;
        Ok(response.records)
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a POST request and returns the response.
    fn handle_post(&self, path: &str, bearer: Option<&str>, body: &[u8]) -> HttpResponse;
}

impl<S: LoopbackServer + ?Sized> LoopbackServer for std::sync::Arc<S> {
    fn handle_post(&self, path: &str, bearer: Option<&str>, body: &[u8]) -> HttpResponse {
        (**self).handle_post(path, bearer, body)
    }
}

/// A loopback HTTP client that routes requests directly to a server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn post(&self, url: &str, bearer: Option<&str>, body: Vec<u8>) -> Result<HttpResponse, String> {
        let path = url.find("/v1/").map(|i| &url[i..]).unwrap_or(url);
        Ok(self.server.handle_post(path, bearer, &body))
    }
}

//! Main sync server.

use std::sync::Arc;

use gophkeeper_sync_protocol::{
    endpoints, LoginRequest, PullRequest, RegisterRequest, UpsertRequest, WireMessage,
};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use crate::store::RemoteStore;

/// Status and CBOR body produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// CBOR body: the response message, or an `ErrorResponse`.
    pub body: Vec<u8>,
}

impl WireResponse {
    fn ok<M: WireMessage>(message: &M) -> ServerResult<Self> {
        Ok(Self {
            status: 200,
            body: message.encode()?,
        })
    }

    fn error(err: &ServerError) -> Self {
        let response = err.to_response();
        Self {
            status: response.code.status(),
            body: response.encode().unwrap_or_default(),
        }
    }
}

/// The sync server.
///
/// Routes decoded requests to the [`RequestHandler`] and encodes the
/// result. Transport concerns (HTTP, headers, limits) live in
/// [`crate::http`].
///
/// # Example
///
/// ```
/// use gophkeeper_sync_server::{ServerConfig, SyncServer};
///
/// let server = SyncServer::open(ServerConfig::new("secret")).unwrap();
/// let response = server.dispatch("/v1/secrets/changes", None, &[]);
/// assert_eq!(response.status, 401);
/// ```
#[derive(Debug)]
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SyncServer {
    /// Creates a sync server over an existing store.
    pub fn new(config: ServerConfig, store: Arc<RemoteStore>) -> Self {
        let context = Arc::new(HandlerContext::new(config, store));
        let handler = RequestHandler::new(Arc::clone(&context));
        Self { handler, context }
    }

    /// Opens the store named by the configuration and creates the server.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let store = match &config.database_path {
            Some(path) => RemoteStore::open(path)?,
            None => RemoteStore::open_in_memory()?,
        };
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Returns the remote store.
    pub fn store(&self) -> &Arc<RemoteStore> {
        &self.context.store
    }

    /// Handles one request.
    ///
    /// `path` is the endpoint path, `bearer` the token from the
    /// `Authorization` header and `body` the CBOR request.
    pub fn dispatch(&self, path: &str, bearer: Option<&str>, body: &[u8]) -> WireResponse {
        match self.route(path, bearer, body) {
            Ok(response) => response,
            Err(err) => {
                if err.is_server_error() {
                    tracing::error!(path, error = %err, "request failed");
                } else {
                    tracing::warn!(path, error = %err, "request rejected");
                }
                WireResponse::error(&err)
            }
        }
    }

    fn route(&self, path: &str, bearer: Option<&str>, body: &[u8]) -> ServerResult<WireResponse> {
        match path {
            endpoints::REGISTER => {
                let request = RegisterRequest::decode(body)?;
                WireResponse::ok(&self.handler.handle_register(request)?)
            }
            endpoints::LOGIN => {
                let request = LoginRequest::decode(body)?;
                WireResponse::ok(&self.handler.handle_login(request)?)
            }
            endpoints::UPSERT => {
                let owner = self.handler.authenticate(bearer)?;
                let request = UpsertRequest::decode(body)?;
                WireResponse::ok(&self.handler.handle_upsert(owner, request)?)
            }
            endpoints::CHANGES => {
                let owner = self.handler.authenticate(bearer)?;
                let request = PullRequest::decode(body)?;
                WireResponse::ok(&self.handler.handle_changes(owner, request)?)
            }
            other => Err(ServerError::NotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gophkeeper_sync_protocol::{
        ErrorCode, ErrorResponse, PullResponse, SyncRecord, TokenResponse, UpsertOutcome,
        UpsertResponse,
    };

    fn server() -> SyncServer {
        SyncServer::open(ServerConfig::new("secret")).unwrap()
    }

    fn register(server: &SyncServer, login: &str) -> String {
        let body = RegisterRequest::new(login, "pw", "master").encode().unwrap();
        let response = server.dispatch(endpoints::REGISTER, None, &body);
        assert_eq!(response.status, 200);
        TokenResponse::decode(&response.body).unwrap().token
    }

    fn error_code(response: &WireResponse) -> ErrorCode {
        ErrorResponse::decode(&response.body).unwrap().code
    }

    #[test]
    fn full_sync_flow() {
        let server = server();
        let token = register(&server, "me");

        let record = SyncRecord::new("site", vec![1], Utc.timestamp_millis_opt(100).unwrap());
        let body = UpsertRequest { record }.encode().unwrap();
        let response = server.dispatch(endpoints::UPSERT, Some(&token), &body);
        assert_eq!(response.status, 200);
        assert_eq!(
            UpsertResponse::decode(&response.body).unwrap().outcome,
            UpsertOutcome::Inserted
        );

        let body = PullRequest {
            since: Utc.timestamp_millis_opt(0).unwrap(),
        }
        .encode()
        .unwrap();
        let response = server.dispatch(endpoints::CHANGES, Some(&token), &body);
        assert_eq!(response.status, 200);
        assert_eq!(PullResponse::decode(&response.body).unwrap().records.len(), 1);
    }

    #[test]
    fn status_mapping() {
        let server = server();
        register(&server, "me");

        let body = RegisterRequest::new("me", "pw", "master").encode().unwrap();
        let response = server.dispatch(endpoints::REGISTER, None, &body);
        assert_eq!(response.status, 409);
        assert_eq!(error_code(&response), ErrorCode::UserExists);

        let body = LoginRequest::new("me", "bad", "master").encode().unwrap();
        let response = server.dispatch(endpoints::LOGIN, None, &body);
        assert_eq!(response.status, 401);
        assert_eq!(error_code(&response), ErrorCode::InvalidCredentials);

        let response = server.dispatch(endpoints::UPSERT, Some("garbage"), &[]);
        assert_eq!(response.status, 401);
        assert_eq!(error_code(&response), ErrorCode::Unauthenticated);

        let response = server.dispatch(endpoints::LOGIN, None, &[0xff]);
        assert_eq!(response.status, 400);
        assert_eq!(error_code(&response), ErrorCode::InvalidRequest);

        let response = server.dispatch("/v1/nope", None, &[]);
        assert_eq!(response.status, 404);
        assert_eq!(error_code(&response), ErrorCode::NotFound);
    }

    #[test]
    fn owners_do_not_see_each_other() {
        let server = server();
        let mine = register(&server, "me");
        let yours = register(&server, "you");

        let record = SyncRecord::new("site", vec![1], Utc.timestamp_millis_opt(100).unwrap());
        let body = UpsertRequest { record }.encode().unwrap();
        server.dispatch(endpoints::UPSERT, Some(&mine), &body);

        let body = PullRequest {
            since: Utc.timestamp_millis_opt(0).unwrap(),
        }
        .encode()
        .unwrap();
        let response = server.dispatch(endpoints::CHANGES, Some(&yours), &body);
        assert!(PullResponse::decode(&response.body)
            .unwrap()
            .records
            .is_empty());
    }
}

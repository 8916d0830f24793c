//! HTTP front end for [`SyncServer`].
//!
//! Every endpoint is a `POST` carrying a CBOR body. The router only
//! extracts the path, the bearer token and the body, then hands them to
//! [`SyncServer::dispatch`] on the blocking pool.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use gophkeeper_sync_protocol::{endpoints, CONTENT_TYPE};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::server::SyncServer;

/// Builds the router serving all sync endpoints.
pub fn router(server: Arc<SyncServer>) -> Router {
    let limit = server.config().max_body_bytes;
    Router::new()
        .route(endpoints::REGISTER, post(forward))
        .route(endpoints::LOGIN, post(forward))
        .route(endpoints::UPSERT, post(forward))
        .route(endpoints::CHANGES, post(forward))
        .fallback(forward)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn forward(
    State(server): State<Arc<SyncServer>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let bearer = bearer_token(&headers);

    let result = tokio::task::spawn_blocking(move || {
        server.dispatch(&path, bearer.as_deref(), &body)
    })
    .await;

    match result {
        Ok(response) => {
            let status =
                StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, [(header::CONTENT_TYPE, CONTENT_TYPE)], response.body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "dispatch task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Returns the token of an `Authorization: Bearer <token>` header.
///
/// A missing header, a non-bearer scheme or an empty token all yield
/// `None`; the secret endpoints then answer 401.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

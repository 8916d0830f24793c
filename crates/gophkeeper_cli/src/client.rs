//! Blocking HTTP client used by the sync transport.

use std::time::Duration;

use gophkeeper_sync_engine::{HttpClient, HttpResponse};
use gophkeeper_sync_protocol::CONTENT_TYPE;
use reqwest::blocking::Client;
use reqwest::header;

/// `reqwest` client with a per-request timeout.
///
/// Must be created and dropped outside the tokio runtime; it runs its own.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Builds a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn post(&self, url: &str, bearer: Option<&str>, body: Vec<u8>) -> Result<HttpResponse, String> {
        let mut request = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

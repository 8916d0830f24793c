//! Configuration for the sync engine.

use std::time::Duration;

/// Default server address.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:50051";

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Server URL.
    pub server_url: String,
    /// Time between background cycles.
    pub interval: Duration,
    /// Per-request timeout applied by the HTTP client.
    pub request_timeout: Duration,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the background sync interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("https://vault.example.com")
            .with_interval(Duration::from_secs(5))
            .with_request_timeout(Duration::from_secs(2));

        assert_eq!(config.server_url, "https://vault.example.com");
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }
}

//! Server configuration.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:50051";
/// Default database file.
pub const DEFAULT_DATABASE: &str = "gophkeeper-server.db";
/// Default token lifetime in seconds.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Invalid or missing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    /// A variable has an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the sync server.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// SQLite database file. `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,
    /// Secret key for token signing.
    pub token_secret: Vec<u8>,
    /// Token lifetime.
    pub token_ttl: Duration,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Verbose logging.
    pub debug: bool,
}

impl ServerConfig {
    /// Creates an in-memory configuration signing tokens with `secret`.
    pub fn new(token_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 50051)),
            database_path: None,
            token_secret: token_secret.into(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            max_body_bytes: 4 * 1024 * 1024,
            debug: false,
        }
    }

    /// Sets the bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the database file.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the token lifetime.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Sets the request body limit.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Reads the configuration from `GOPHKEEPER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen = value_or_default(&lookup, "GOPHKEEPER_LISTEN", DEFAULT_LISTEN);
        let bind_addr = listen.parse::<SocketAddr>().map_err(|_| {
            ConfigError::Invalid(format!("GOPHKEEPER_LISTEN is not a socket address: {listen}"))
        })?;

        let database_path = value_or_default(&lookup, "GOPHKEEPER_DATABASE", DEFAULT_DATABASE);
        let token_secret = required_trimmed(&lookup, "GOPHKEEPER_SECRET")?;

        let ttl_secs = value_or_default(
            &lookup,
            "GOPHKEEPER_TOKEN_TTL_SECS",
            &DEFAULT_TOKEN_TTL_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|_| {
            ConfigError::Invalid("GOPHKEEPER_TOKEN_TTL_SECS must be a positive integer".to_string())
        })?;
        if ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "GOPHKEEPER_TOKEN_TTL_SECS must be a positive integer".to_string(),
            ));
        }

        let debug = optional_trimmed(&lookup, "GOPHKEEPER_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            debug,
            ..Self::new(token_secret.into_bytes())
                .with_bind_addr(bind_addr)
                .with_database_path(database_path)
                .with_token_ttl(Duration::from_secs(ttl_secs))
        })
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_path", &self.database_path)
            .field("token_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("debug", &self.debug)
            .finish()
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_map(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ServerConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn secret_is_required() {
        let err = from_map(&[]).unwrap_err();
        assert!(err.to_string().contains("GOPHKEEPER_SECRET"));

        let err = from_map(&[("GOPHKEEPER_SECRET", "   ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("GOPHKEEPER_SECRET")));
    }

    #[test]
    fn defaults() {
        let config = from_map(&[("GOPHKEEPER_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_LISTEN);
        assert_eq!(config.database_path, Some(PathBuf::from(DEFAULT_DATABASE)));
        assert_eq!(config.token_ttl, Duration::from_secs(86_400));
        assert_eq!(config.token_secret, b"s3cret");
        assert!(!config.debug);
    }

    #[test]
    fn overrides() {
        let config = from_map(&[
            ("GOPHKEEPER_SECRET", "s3cret"),
            ("GOPHKEEPER_LISTEN", "0.0.0.0:9000"),
            ("GOPHKEEPER_DATABASE", "/data/vault.db"),
            ("GOPHKEEPER_TOKEN_TTL_SECS", "60"),
            ("GOPHKEEPER_DEBUG", "true"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.database_path, Some(PathBuf::from("/data/vault.db")));
        assert_eq!(config.token_ttl, Duration::from_secs(60));
        assert!(config.debug);
    }

    #[test]
    fn bad_values_rejected() {
        assert!(from_map(&[
            ("GOPHKEEPER_SECRET", "s"),
            ("GOPHKEEPER_LISTEN", ":50051")
        ])
        .is_err());
        assert!(from_map(&[
            ("GOPHKEEPER_SECRET", "s"),
            ("GOPHKEEPER_TOKEN_TTL_SECS", "0")
        ])
        .is_err());
        assert!(from_map(&[
            ("GOPHKEEPER_SECRET", "s"),
            ("GOPHKEEPER_TOKEN_TTL_SECS", "soon")
        ])
        .is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = ServerConfig::new("very-secret-key");
        let output = format!("{config:?}");
        assert!(!output.contains("very-secret-key"));
        assert!(output.contains("[REDACTED]"));
    }
}

//! Replication records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

/// Largest record key, in bytes.
pub const MAX_KEY_BYTES: usize = 1024;

/// Largest sealed value a record may carry, in bytes.
///
/// Writers refuse larger values before storing them.
pub const MAX_VALUE_BYTES: usize = 3 * 1024 * 1024;

/// Stable identity of a vault owner on the authoritative store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub u32);

impl OwnerId {
    /// Returns the raw id.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A secret record as exchanged between replicas.
///
/// The owner is not part of the record on the wire; the server derives it
/// from the bearer credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Secret slot name, unique per owner.
    pub key: String,
    /// Sealed secret payload. Opaque to replication.
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
    /// Time of the logical change, chosen by the writer.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    /// Tombstone marker.
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SyncRecord {
    /// Creates a live record.
    pub fn new(key: impl Into<String>, value: Vec<u8>, updated_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value,
            updated_at,
            deleted_at: None,
        }
    }

    /// Sets the tombstone marker.
    pub fn with_deleted_at(mut self, deleted_at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(deleted_at);
        self
    }

    /// Returns true if the record is a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Checks the record is acceptable for storage.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.key.is_empty() {
            return Err(ProtocolError::invalid_message("record key must not be empty"));
        }
        if self.key.len() > MAX_KEY_BYTES {
            return Err(ProtocolError::invalid_message(format!(
                "record key is {} bytes, limit is {MAX_KEY_BYTES}",
                self.key.len()
            )));
        }
        if self.value.len() > MAX_VALUE_BYTES {
            return Err(ProtocolError::invalid_message(format!(
                "record value is {} bytes, limit is {MAX_VALUE_BYTES}",
                self.value.len()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for SyncRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncRecord")
            .field("key", &self.key)
            .field("value_len", &self.value.len())
            .field("updated_at", &self.updated_at)
            .field("deleted_at", &self.deleted_at)
            .finish()
    }
}

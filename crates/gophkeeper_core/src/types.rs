//! Record and timestamp types.

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{CoreError, CoreResult};

/// Watermark of a replica that has never synced.
pub const EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Current time at the millisecond resolution used for storage and the wire.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> CoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| CoreError::invalid_format(format!("timestamp out of range: {millis}")))
}

/// A sealed secret as stored in the local replica.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretRecord {
    /// Secret slot name.
    pub key: String,
    /// Sealed, encoded secret. Empty for tombstones written locally.
    pub value: Vec<u8>,
    /// Time of the last logical change.
    pub updated_at: DateTime<Utc>,
    /// Tombstone marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SecretRecord {
    /// Creates a live record.
    pub fn new(key: impl Into<String>, value: Vec<u8>, updated_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value,
            updated_at,
            deleted_at: None,
        }
    }

    /// Creates a tombstone for `key` at `at`.
    pub fn tombstone(key: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            updated_at: at,
            deleted_at: Some(at),
        }
    }

    /// Returns true if the record is a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl std::fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRecord")
            .field("key", &self.key)
            .field("value_len", &self.value.len())
            .field("updated_at", &self.updated_at)
            .field("deleted_at", &self.deleted_at)
            .finish()
    }
}

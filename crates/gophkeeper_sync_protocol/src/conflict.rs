//! Last-writer-wins conflict resolution.
//!
//! The authoritative store calls [`resolve`] inside its write transaction
//! with the `updated_at` of the stored row (if any) and of the incoming
//! record. The larger timestamp wins; on a tie the stored row is kept, which
//! makes re-delivery of the same record a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the authoritative store did with an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpsertOutcome {
    /// No row existed; the record was inserted.
    Inserted,
    /// The stored row was older and has been replaced.
    Overwritten,
    /// The stored row was at least as new; nothing changed.
    Discarded,
}

impl UpsertOutcome {
    /// Returns true if the store changed.
    pub fn is_applied(&self) -> bool {
        !matches!(self, UpsertOutcome::Discarded)
    }

    /// Converts to a code.
    pub fn to_code(&self) -> u8 {
        match self {
            UpsertOutcome::Inserted => 1,
            UpsertOutcome::Overwritten => 2,
            UpsertOutcome::Discarded => 3,
        }
    }

    /// Converts from a code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(UpsertOutcome::Inserted),
            2 => Some(UpsertOutcome::Overwritten),
            3 => Some(UpsertOutcome::Discarded),
            _ => None,
        }
    }
}

/// Decides the fate of an incoming write.
pub fn resolve(existing: Option<DateTime<Utc>>, incoming: DateTime<Utc>) -> UpsertOutcome {
    match existing {
        None => UpsertOutcome::Inserted,
        Some(stored) if stored >= incoming => UpsertOutcome::Discarded,
        Some(_) => UpsertOutcome::Overwritten,
    }
}

/// A write that lost against the stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Key of the contested record.
    pub key: String,
    /// `updated_at` of the row that was kept.
    pub stored_updated_at: DateTime<Utc>,
    /// `updated_at` of the write that was discarded.
    pub incoming_updated_at: DateTime<Utc>,
}

impl Conflict {
    /// Returns the conflict if the incoming write would be discarded.
    pub fn detect(
        key: &str,
        stored: Option<DateTime<Utc>>,
        incoming: DateTime<Utc>,
    ) -> Option<Self> {
        let stored = stored?;
        (resolve(Some(stored), incoming) == UpsertOutcome::Discarded).then(|| Self {
            key: key.to_string(),
            stored_updated_at: stored,
            incoming_updated_at: incoming,
        })
    }

    /// Returns true if both writes carry the same timestamp.
    pub fn is_tie(&self) -> bool {
        self.stored_updated_at == self.incoming_updated_at
    }
}

//! Store-backed replica.
//!
//! Adapts the SQLite vault store to [`LocalReplica`]. Sealed values pass
//! through untouched; only the record shape changes between the local and
//! the wire representation.

use chrono::{DateTime, Utc};
use gophkeeper_core::{LocalStore, SecretRecord};
use gophkeeper_sync_protocol::SyncRecord;

use crate::error::SyncResult;
use crate::state::LocalReplica;

fn to_wire(record: SecretRecord) -> SyncRecord {
    SyncRecord {
        key: record.key,
        value: record.value,
        updated_at: record.updated_at,
        deleted_at: record.deleted_at,
    }
}

fn from_wire(record: &SyncRecord) -> SecretRecord {
    SecretRecord {
        key: record.key.clone(),
        value: record.value.clone(),
        updated_at: record.updated_at,
        deleted_at: record.deleted_at,
    }
}

impl LocalReplica for LocalStore {
    fn changed_since(&self, since: DateTime<Utc>) -> SyncResult<Vec<SyncRecord>> {
        let records = LocalStore::changed_since(self, since)?;
        Ok(records.into_iter().map(to_wire).collect())
    }

    fn apply_remote(&self, records: &[SyncRecord]) -> SyncResult<()> {
        let local: Vec<_> = records.iter().map(from_wire).collect();
        self.upsert_many(&local)?;
        Ok(())
    }

    fn watermark(&self) -> SyncResult<DateTime<Utc>> {
        Ok(LocalStore::watermark(self)?)
    }

    fn set_watermark(&self, at: DateTime<Utc>) -> SyncResult<()> {
        Ok(LocalStore::set_watermark(self, at)?)
    }
}

//! Local replica store.
//!
//! One SQLite database per device holding the sealed secrets and a
//! singleton metadata row with the sync watermark and the unlock verifier.
//! Writes never apply conflict logic: local edits and records pulled from
//! the authoritative store both overwrite by key.

mod schema;

pub use schema::apply_migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{CoreError, CoreResult};
use crate::lock::VaultLock;
use crate::types::{from_millis, to_millis, SecretRecord};

const UPSERT_SQL: &str = "INSERT INTO secrets (key, value, updated_at, deleted_at)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at,
        deleted_at = excluded.deleted_at";

/// SQLite-backed local replica.
///
/// The connection is guarded by a mutex so the store can be shared between
/// the command loop and the background synchronizer.
pub struct LocalStore {
    conn: Mutex<Connection>,
    _lock: Option<VaultLock>,
}

impl LocalStore {
    /// Opens or creates the vault database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VaultLocked`] if another process has the vault
    /// open.
    pub fn open(path: &Path) -> CoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let lock = VaultLock::acquire(path)?;
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let version = apply_migrations(&conn, schema::LOCAL_MIGRATIONS)?;
        tracing::debug!(path = %path.display(), version, "opened local store");

        Ok(Self {
            conn: Mutex::new(conn),
            _lock: Some(lock),
        })
    }

    /// Opens a throwaway in-memory store.
    pub fn open_in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn, schema::LOCAL_MIGRATIONS)?;
        Ok(Self {
            conn: Mutex::new(conn),
            _lock: None,
        })
    }

    /// Inserts or overwrites the record stored under `record.key`.
    pub fn upsert(&self, record: &SecretRecord) -> CoreResult<()> {
        check_key(&record.key)?;
        let conn = self.conn.lock();
        conn.execute(UPSERT_SQL, record_params(record))?;
        Ok(())
    }

    /// Upserts a batch of records in one transaction.
    ///
    /// Either every record is written or none is.
    pub fn upsert_many(&self, records: &[SecretRecord]) -> CoreResult<()> {
        for record in records {
            check_key(&record.key)?;
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_SQL)?;
            for record in records {
                stmt.execute(record_params(record))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns the record stored under `key`, tombstones included.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no row exists.
    pub fn get(&self, key: &str) -> CoreResult<SecretRecord> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                "SELECT key, value, updated_at, deleted_at FROM secrets WHERE key = ?1",
                [key],
                read_row,
            )
            .optional()?;

        match raw {
            Some(raw) => into_record(raw),
            None => Err(CoreError::not_found(key)),
        }
    }

    /// Returns every record with `updated_at` strictly after `since`,
    /// oldest first.
    pub fn changed_since(&self, since: DateTime<Utc>) -> CoreResult<Vec<SecretRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT key, value, updated_at, deleted_at FROM secrets
             WHERE updated_at > ?1
             ORDER BY updated_at, key",
        )?;

        let rows = stmt.query_map([to_millis(since)], read_row)?;
        let mut records = Vec::new();
        for raw in rows {
            records.push(into_record(raw?)?);
        }
        Ok(records)
    }

    /// Returns the keys of all live (non-tombstoned) secrets, sorted.
    pub fn list_keys(&self) -> CoreResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare_cached("SELECT key FROM secrets WHERE deleted_at IS NULL ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Returns the last sync watermark. Epoch zero if never synced.
    pub fn watermark(&self) -> CoreResult<DateTime<Utc>> {
        let conn = self.conn.lock();
        let millis: i64 = conn.query_row(
            "SELECT last_sync FROM replica_meta WHERE id = 0",
            [],
            |row| row.get(0),
        )?;
        from_millis(millis)
    }

    /// Persists the sync watermark.
    pub fn set_watermark(&self, at: DateTime<Utc>) -> CoreResult<()> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE replica_meta SET last_sync = ?1 WHERE id = 0",
            [to_millis(at)],
        )?;
        if updated != 1 {
            return Err(CoreError::invalid_format("replica metadata row is missing"));
        }
        Ok(())
    }

    /// Returns the unlock verifier, if one was stored.
    pub fn verifier(&self) -> CoreResult<Option<String>> {
        let conn = self.conn.lock();
        let verifier = conn.query_row(
            "SELECT unlock_verifier FROM replica_meta WHERE id = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(verifier)
    }

    /// Stores the unlock verifier.
    pub fn set_verifier(&self, verifier: &str) -> CoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE replica_meta SET unlock_verifier = ?1 WHERE id = 0",
            [verifier],
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("locked", &self._lock.is_some())
            .finish_non_exhaustive()
    }
}

type RawRecord = (String, Vec<u8>, i64, Option<i64>);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_record((key, value, updated_at, deleted_at): RawRecord) -> CoreResult<SecretRecord> {
    Ok(SecretRecord {
        key,
        value,
        updated_at: from_millis(updated_at)?,
        deleted_at: deleted_at.map(from_millis).transpose()?,
    })
}

fn record_params(record: &SecretRecord) -> (&str, &[u8], i64, Option<i64>) {
    (
        record.key.as_str(),
        record.value.as_slice(),
        to_millis(record.updated_at),
        record.deleted_at.map(to_millis),
    )
}

fn check_key(key: &str) -> CoreResult<()> {
    if key.is_empty() {
        return Err(CoreError::invalid_record("key must not be empty"));
    }
    Ok(())
}

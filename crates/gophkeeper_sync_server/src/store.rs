//! Authoritative replica.
//!
//! SQLite tables for accounts and every owner's secrets. The store never
//! looks inside secret values; it only compares `updated_at`.

use std::path::Path;

use chrono::{DateTime, Utc};
use gophkeeper_core::store::apply_migrations;
use gophkeeper_sync_protocol::{resolve, Conflict, OwnerId, SyncRecord, UpsertOutcome};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};

use crate::error::{ServerError, ServerResult};

const REMOTE_MIGRATIONS: &[&str] = &[
    // v1: accounts and secrets
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        login TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        master_password_hash TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS secrets (
        owner_id INTEGER NOT NULL REFERENCES users(id),
        key TEXT NOT NULL,
        value BLOB NOT NULL,
        updated_at INTEGER NOT NULL,
        deleted_at INTEGER,
        PRIMARY KEY (owner_id, key)
    );
    CREATE INDEX IF NOT EXISTS idx_secrets_owner_updated ON secrets(owner_id, updated_at);",
];

/// An account row.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRow {
    /// Owner id used in tokens and secret rows.
    pub id: OwnerId,
    /// Unique login.
    pub login: String,
    /// Argon2 PHC string of the account password.
    pub password_hash: String,
    /// Argon2 PHC string of the master password.
    pub master_password_hash: String,
}

impl std::fmt::Debug for UserRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRow")
            .field("id", &self.id)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

/// SQLite-backed remote store shared by all request handlers.
pub struct RemoteStore {
    conn: Mutex<Connection>,
}

impl RemoteStore {
    /// Opens or creates the server database at `path`.
    pub fn open(path: &Path) -> ServerResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ServerError::internal(format!("create {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )?;
        let version = apply_migrations(&conn, REMOTE_MIGRATIONS)?;
        tracing::info!(path = %path.display(), version, "opened remote store");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a throwaway in-memory store.
    pub fn open_in_memory() -> ServerResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        apply_migrations(&conn, REMOTE_MIGRATIONS)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::UserExists`] if the login is taken.
    pub fn create_user(
        &self,
        login: &str,
        password_hash: &str,
        master_password_hash: &str,
    ) -> ServerResult<OwnerId> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO users (login, password_hash, master_password_hash) VALUES (?1, ?2, ?3)",
            params![login, password_hash, master_password_hash],
        );

        match inserted {
            Ok(_) => {
                let id = u32::try_from(conn.last_insert_rowid())
                    .map_err(|_| ServerError::internal("user id out of range"))?;
                Ok(OwnerId(id))
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(ServerError::UserExists(login.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Looks up an account by login.
    pub fn find_user(&self, login: &str) -> ServerResult<Option<UserRow>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, login, password_hash, master_password_hash FROM users WHERE login = ?1",
                [login],
                |row| {
                    Ok(UserRow {
                        id: OwnerId(row.get(0)?),
                        login: row.get(1)?,
                        password_hash: row.get(2)?,
                        master_password_hash: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Applies an incoming record with last-writer-wins on `updated_at`.
    ///
    /// The read of the stored timestamp and the write share one immediate
    /// transaction, so concurrent upserts of the same key serialize.
    pub fn upsert(&self, owner: OwnerId, record: &SyncRecord) -> ServerResult<UpsertOutcome> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT updated_at FROM secrets WHERE owner_id = ?1 AND key = ?2",
                params![owner.as_u32(), record.key],
                |row| row.get(0),
            )
            .optional()?;
        let existing = existing.map(from_millis).transpose()?;

        let outcome = resolve(existing, record.updated_at);
        match outcome {
            UpsertOutcome::Inserted => {
                tx.execute(
                    "INSERT INTO secrets (owner_id, key, value, updated_at, deleted_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        owner.as_u32(),
                        record.key,
                        record.value,
                        record.updated_at.timestamp_millis(),
                        record.deleted_at.map(|at| at.timestamp_millis()),
                    ],
                )?;
            }
            UpsertOutcome::Overwritten => {
                tx.execute(
                    "UPDATE secrets SET value = ?3, updated_at = ?4, deleted_at = ?5
                     WHERE owner_id = ?1 AND key = ?2",
                    params![
                        owner.as_u32(),
                        record.key,
                        record.value,
                        record.updated_at.timestamp_millis(),
                        record.deleted_at.map(|at| at.timestamp_millis()),
                    ],
                )?;
            }
            UpsertOutcome::Discarded => {
                if let Some(conflict) = Conflict::detect(&record.key, existing, record.updated_at) {
                    tracing::debug!(
                        %owner,
                        key = %conflict.key,
                        stored = %conflict.stored_updated_at,
                        incoming = %conflict.incoming_updated_at,
                        "discarded older write"
                    );
                }
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    /// Returns the owner's records with `updated_at` strictly after `since`,
    /// oldest first.
    pub fn changed_since(
        &self,
        owner: OwnerId,
        since: DateTime<Utc>,
    ) -> ServerResult<Vec<SyncRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT key, value, updated_at, deleted_at FROM secrets
             WHERE owner_id = ?1 AND updated_at > ?2
             ORDER BY updated_at, key",
        )?;

        let rows = stmt.query_map(params![owner.as_u32(), since.timestamp_millis()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (key, value, updated_at, deleted_at) = row?;
            records.push(SyncRecord {
                key,
                value,
                updated_at: from_millis(updated_at)?,
                deleted_at: deleted_at.map(from_millis).transpose()?,
            });
        }
        Ok(records)
    }

    /// Returns the stored record for `(owner, key)`.
    pub fn get(&self, owner: OwnerId, key: &str) -> ServerResult<Option<SyncRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT value, updated_at, deleted_at FROM secrets
                 WHERE owner_id = ?1 AND key = ?2",
                params![owner.as_u32(), key],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(value, updated_at, deleted_at)| {
            Ok(SyncRecord {
                key: key.to_string(),
                value,
                updated_at: from_millis(updated_at)?,
                deleted_at: deleted_at.map(from_millis).transpose()?,
            })
        })
        .transpose()
    }
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore").finish_non_exhaustive()
    }
}

fn from_millis(millis: i64) -> ServerResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| ServerError::internal(format!("timestamp out of range: {millis}")))
}

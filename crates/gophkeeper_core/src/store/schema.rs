//! Versioned schema migrations.
//!
//! Each step is a SQL batch that moves the schema from version `n` to
//! `n + 1`. Applied steps are recorded in `schema_version`, so opening a
//! database only runs what is missing.

use rusqlite::Connection;

use crate::error::CoreResult;

/// Local replica schema, one entry per version.
pub(crate) const LOCAL_MIGRATIONS: &[&str] = &[
    // v1: secrets and the singleton metadata row
    "CREATE TABLE IF NOT EXISTS secrets (
        key TEXT PRIMARY KEY NOT NULL,
        value BLOB NOT NULL,
        updated_at INTEGER NOT NULL,
        deleted_at INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_secrets_updated_at ON secrets(updated_at);
    CREATE TABLE IF NOT EXISTS replica_meta (
        id INTEGER PRIMARY KEY CHECK (id = 0),
        last_sync INTEGER NOT NULL DEFAULT 0,
        unlock_verifier TEXT
    );
    INSERT OR IGNORE INTO replica_meta (id, last_sync) VALUES (0, 0);",
];

/// Applies every step of `migrations` not yet recorded and returns the
/// resulting schema version.
pub fn apply_migrations(conn: &Connection, migrations: &[&str]) -> CoreResult<i64> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY NOT NULL)",
    )?;

    let current: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    let mut version = current;
    for (index, sql) in migrations.iter().enumerate() {
        let target = index as i64 + 1;
        if target <= current {
            continue;
        }

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [target])?;
        tx.commit()?;

        tracing::debug!(version = target, "applied schema migration");
        version = target;
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_once() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply_migrations(&conn, LOCAL_MIGRATIONS).unwrap(), 1);
        assert_eq!(apply_migrations(&conn, LOCAL_MIGRATIONS).unwrap(), 1);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM replica_meta", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn runs_only_new_steps() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn, &["CREATE TABLE a (x INTEGER)"]).unwrap();

        let steps = ["CREATE TABLE a (x INTEGER)", "CREATE TABLE b (y INTEGER)"];
        assert_eq!(apply_migrations(&conn, &steps).unwrap(), 2);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('a', 'b')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn metadata_row_is_singleton() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn, LOCAL_MIGRATIONS).unwrap();
        assert!(conn
            .execute("INSERT INTO replica_meta (id, last_sync) VALUES (1, 0)", [])
            .is_err());
    }
}

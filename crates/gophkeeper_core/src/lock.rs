//! Single-process access to a vault file.
//!
//! A `<db_path>.lock` file next to the database is held with an exclusive
//! advisory lock for as long as the store is open, so two client processes
//! never sync the same vault concurrently.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive lock on a vault database path.
///
/// Released when dropped.
#[derive(Debug)]
pub struct VaultLock {
    path: PathBuf,
    _file: File,
}

impl VaultLock {
    /// Acquires the lock for `db_path` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VaultLocked`] if another process holds it.
    pub fn acquire(db_path: &Path) -> CoreResult<Self> {
        let path = Self::lock_path(db_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(CoreError::VaultLocked);
        }

        Ok(Self { path, _file: file })
    }

    /// Returns the lock file path used for `db_path`.
    #[must_use]
    pub fn lock_path(db_path: &Path) -> PathBuf {
        let mut name = db_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Returns the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

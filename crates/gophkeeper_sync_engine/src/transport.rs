//! Transport layer abstraction for sync operations.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use gophkeeper_sync_protocol::{resolve, SyncRecord, UpsertOutcome};
use parking_lot::Mutex;

use crate::error::{SyncError, SyncResult};

/// A sync transport talks to the authoritative store for one owner.
///
/// Implementations attach whatever credential identifies the owner; the
/// engine never sees it.
pub trait SyncTransport: Send + Sync {
    /// Pushes one record. The store decides whether it wins.
    fn upsert(&self, record: &SyncRecord) -> SyncResult<UpsertOutcome>;

    /// Returns the owner's records with `updated_at` strictly after `since`.
    fn pull_changed_since(&self, since: DateTime<Utc>) -> SyncResult<Vec<SyncRecord>>;
}

/// A mock transport for testing.
///
/// Behaves like a single-owner authoritative store held in memory, with
/// switches to simulate outages.
#[derive(Debug, Default)]
pub struct MockTransport {
    records: Mutex<BTreeMap<String, SyncRecord>>,
    unavailable: AtomicBool,
    upserts_before_failure: Mutex<Option<usize>>,
    upsert_calls: AtomicUsize,
    pull_calls: AtomicUsize,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with [`SyncError::RemoteUnavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Lets `count` more upserts succeed, then fails the rest.
    pub fn fail_upserts_after(&self, count: usize) {
        *self.upserts_before_failure.lock() = Some(count);
    }

    /// Stores a record directly, as another device would.
    pub fn insert(&self, record: SyncRecord) {
        self.records.lock().insert(record.key.clone(), record);
    }

    /// Returns the stored record for `key`.
    pub fn get(&self, key: &str) -> Option<SyncRecord> {
        self.records.lock().get(key).cloned()
    }

    /// Number of upsert calls received, failed ones included.
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Number of pull calls received, failed ones included.
    pub fn pull_calls(&self) -> usize {
        self.pull_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> SyncResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SyncError::remote_unavailable("mock transport offline"));
        }
        Ok(())
    }
}

impl SyncTransport for MockTransport {
    fn upsert(&self, record: &SyncRecord) -> SyncResult<UpsertOutcome> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        if let Some(remaining) = self.upserts_before_failure.lock().as_mut() {
            if *remaining == 0 {
                return Err(SyncError::remote_unavailable("mock upsert failure"));
            }
            *remaining -= 1;
        }

        let mut records = self.records.lock();
        let existing = records.get(&record.key).map(|r| r.updated_at);
        let outcome = resolve(existing, record.updated_at);
        if outcome.is_applied() {
            records.insert(record.key.clone(), record.clone());
        }
        Ok(outcome)
    }

    fn pull_changed_since(&self, since: DateTime<Utc>) -> SyncResult<Vec<SyncRecord>> {
        self.pull_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut changed: Vec<_> = self
            .records
            .lock()
            .values()
            .filter(|r| r.updated_at > since)
            .cloned()
            .collect();
        changed.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.key.cmp(&b.key)));
        Ok(changed)
    }
}

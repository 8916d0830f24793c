//! Sync engine state machine.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use gophkeeper_core::{now, CoreError, EPOCH};
use gophkeeper_sync_protocol::{SyncRecord, UpsertOutcome};
use parking_lot::RwLock;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Engine is idle, not syncing.
    Idle,
    /// Engine is pushing local changes to the server.
    Pushing,
    /// Engine is pulling remote changes.
    Pulling,
    /// The last cycle completed.
    Synced,
    /// The last cycle failed.
    Error,
    /// The engine was stopped and accepts no more cycles.
    Stopped,
}

impl SyncState {
    /// Returns true if the engine is in an active sync state.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Pushing | SyncState::Pulling)
    }

    /// Returns true if the engine can start a new sync.
    pub fn can_start_sync(&self) -> bool {
        matches!(self, SyncState::Idle | SyncState::Synced | SyncState::Error)
    }
}

/// Cumulative statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of sync cycles completed.
    pub cycles_completed: u64,
    /// Total number of cycles that failed.
    pub cycles_failed: u64,
    /// Total number of records pushed and applied by the store.
    pub records_pushed: u64,
    /// Total number of pushed records the store discarded.
    pub records_discarded: u64,
    /// Total number of records pulled.
    pub records_pulled: u64,
    /// Start time of the last successful cycle.
    pub last_sync: Option<DateTime<Utc>>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a sync cycle.
#[derive(Debug, Clone)]
pub struct SyncCycleResult {
    /// Number of records the store inserted or overwrote.
    pub pushed: u64,
    /// Number of pushed records the store discarded as older.
    pub discarded: u64,
    /// Number of records pulled and applied locally.
    pub pulled: u64,
    /// The watermark persisted at the end of the cycle.
    pub watermark: DateTime<Utc>,
    /// Duration of the sync cycle.
    pub duration: Duration,
}

/// The client replica as seen by the engine.
pub trait LocalReplica: Send + Sync {
    /// Returns local records with `updated_at` strictly after `since`.
    fn changed_since(&self, since: DateTime<Utc>) -> SyncResult<Vec<SyncRecord>>;

    /// Overwrites local records with the pulled ones, all or nothing.
    fn apply_remote(&self, records: &[SyncRecord]) -> SyncResult<()>;

    /// Returns the last persisted watermark.
    fn watermark(&self) -> SyncResult<DateTime<Utc>>;

    /// Persists the watermark.
    fn set_watermark(&self, at: DateTime<Utc>) -> SyncResult<()>;
}

impl<R: LocalReplica + ?Sized> LocalReplica for Arc<R> {
    fn changed_since(&self, since: DateTime<Utc>) -> SyncResult<Vec<SyncRecord>> {
        (**self).changed_since(since)
    }

    fn apply_remote(&self, records: &[SyncRecord]) -> SyncResult<()> {
        (**self).apply_remote(records)
    }

    fn watermark(&self) -> SyncResult<DateTime<Utc>> {
        (**self).watermark()
    }

    fn set_watermark(&self, at: DateTime<Utc>) -> SyncResult<()> {
        (**self).set_watermark(at)
    }
}

/// The sync engine manages synchronization with the authoritative store.
pub struct SyncEngine<T: SyncTransport, R: LocalReplica> {
    config: SyncConfig,
    transport: Arc<T>,
    replica: Arc<R>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    cancelled: AtomicBool,
    stopped: AtomicBool,
}

impl<T: SyncTransport, R: LocalReplica> SyncEngine<T, R> {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, transport: T, replica: R) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            replica: Arc::new(replica),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            cancelled: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Gets the local replica.
    pub fn replica(&self) -> &R {
        &self.replica
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Cancels any ongoing sync operation.
    ///
    /// The flag stays set, so later cycles also return
    /// [`SyncError::Cancelled`] until [`reset_cancel`](Self::reset_cancel).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Resets the cancelled flag.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Cancels and permanently stops the engine.
    ///
    /// An in-flight cycle ends at its next record boundary and leaves the
    /// engine in [`SyncState::Stopped`].
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.cancel();

        let mut state = self.state.write();
        if !state.is_active() {
            *state = SyncState::Stopped;
        }
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Claims the engine for one cycle.
    fn begin_cycle(&self) -> SyncResult<()> {
        let mut state = self.state.write();
        match *state {
            SyncState::Stopped => Err(SyncError::Cancelled),
            current if !current.can_start_sync() => Err(SyncError::AlreadySyncing),
            _ => {
                *state = SyncState::Pushing;
                Ok(())
            }
        }
    }

    /// Performs one full cycle: push, pull, then advance the watermark.
    ///
    /// # Errors
    ///
    /// - [`SyncError::AlreadySyncing`] if another cycle holds the engine
    /// - [`SyncError::Cancelled`] if the engine was cancelled or stopped
    /// - any transport or storage error; the watermark is left unchanged
    pub fn sync_once(&self) -> SyncResult<SyncCycleResult> {
        self.begin_cycle()?;

        let started = Instant::now();
        let cycle_start = now();
        let outcome = self.run_cycle(cycle_start, started);
        self.finish_cycle(&outcome);
        outcome
    }

    fn run_cycle(
        &self,
        cycle_start: DateTime<Utc>,
        started: Instant,
    ) -> SyncResult<SyncCycleResult> {
        self.check_cancelled()?;
        let since = overlap(self.replica.watermark()?);

        let (pushed, discarded) = self.push_changes(since)?;

        self.check_cancelled()?;
        self.set_state(SyncState::Pulling);
        let pulled = self.pull_changes(since)?;

        self.replica.set_watermark(cycle_start)?;

        Ok(SyncCycleResult {
            pushed,
            discarded,
            pulled,
            watermark: cycle_start,
            duration: started.elapsed(),
        })
    }

    /// Pushes local records changed after `since`, one at a time.
    fn push_changes(&self, since: DateTime<Utc>) -> SyncResult<(u64, u64)> {
        let mut pushed = 0u64;
        let mut discarded = 0u64;

        for record in self.replica.changed_since(since)? {
            self.check_cancelled()?;

            let outcome = self.transport.upsert(&record)?;
            tracing::debug!(key = %record.key, ?outcome, "pushed record");
            match outcome {
                UpsertOutcome::Discarded => discarded += 1,
                UpsertOutcome::Inserted | UpsertOutcome::Overwritten => pushed += 1,
            }
        }

        Ok((pushed, discarded))
    }

    /// Pulls remote records changed after `since` and applies them.
    fn pull_changes(&self, since: DateTime<Utc>) -> SyncResult<u64> {
        let records = self.transport.pull_changed_since(since)?;
        self.check_cancelled()?;

        if !records.is_empty() {
            self.replica.apply_remote(&records)?;
            for record in &records {
                tracing::debug!(key = %record.key, deleted = record.is_deleted(), "pulled record");
            }
        }

        Ok(records.len() as u64)
    }

    fn finish_cycle(&self, outcome: &SyncResult<SyncCycleResult>) {
        let stopped = self.stopped.load(Ordering::SeqCst);

        match outcome {
            Ok(result) => {
                tracing::info!(
                    pushed = result.pushed,
                    discarded = result.discarded,
                    pulled = result.pulled,
                    duration_ms = result.duration.as_millis() as u64,
                    "sync cycle completed"
                );
                let mut stats = self.stats.write();
                stats.cycles_completed += 1;
                stats.records_pushed += result.pushed;
                stats.records_discarded += result.discarded;
                stats.records_pulled += result.pulled;
                stats.last_sync = Some(result.watermark);
                stats.last_error = None;
                drop(stats);
                self.set_state(if stopped { SyncState::Stopped } else { SyncState::Synced });
            }
            Err(SyncError::Cancelled) => {
                tracing::debug!("sync cycle cancelled");
                self.set_state(if stopped { SyncState::Stopped } else { SyncState::Idle });
            }
            Err(e) => {
                let mut stats = self.stats.write();
                stats.cycles_failed += 1;
                stats.last_error = Some(e.to_string());
                drop(stats);
                self.set_state(if stopped { SyncState::Stopped } else { SyncState::Error });
            }
        }
    }
}

/// Lower bound for a cycle that starts from `watermark`.
///
/// The watermark is the previous cycle start. Writes stamped in that
/// millisecond may have committed after the previous reads, so they are
/// read again. Re-sent rows end as ties.
fn overlap(watermark: DateTime<Utc>) -> DateTime<Utc> {
    watermark
        .checked_sub_signed(chrono::Duration::milliseconds(1))
        .unwrap_or(watermark)
}

/// An in-memory replica for testing.
#[derive(Debug)]
pub struct MemoryReplica {
    records: RwLock<BTreeMap<String, SyncRecord>>,
    watermark: RwLock<DateTime<Utc>>,
    fail_watermark: AtomicBool,
}

impl MemoryReplica {
    /// Creates an empty replica that has never synced.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            watermark: RwLock::new(EPOCH),
            fail_watermark: AtomicBool::new(false),
        }
    }

    /// Writes a record as a local edit would.
    pub fn put(&self, record: SyncRecord) {
        self.records.write().insert(record.key.clone(), record);
    }

    /// Returns the record stored under `key`.
    pub fn get(&self, key: &str) -> Option<SyncRecord> {
        self.records.read().get(key).cloned()
    }

    /// Returns the number of stored records, tombstones included.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Makes watermark writes fail.
    pub fn set_fail_watermark(&self, fail: bool) {
        self.fail_watermark.store(fail, Ordering::SeqCst);
    }
}

impl Default for MemoryReplica {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalReplica for MemoryReplica {
    fn changed_since(&self, since: DateTime<Utc>) -> SyncResult<Vec<SyncRecord>> {
        let mut changed: Vec<_> = self
            .records
            .read()
            .values()
            .filter(|r| r.updated_at > since)
            .cloned()
            .collect();
        changed.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.key.cmp(&b.key)));
        Ok(changed)
    }

    fn apply_remote(&self, records: &[SyncRecord]) -> SyncResult<()> {
        let mut stored = self.records.write();
        for record in records {
            stored.insert(record.key.clone(), record.clone());
        }
        Ok(())
    }

    fn watermark(&self) -> SyncResult<DateTime<Utc>> {
        Ok(*self.watermark.read())
    }

    fn set_watermark(&self, at: DateTime<Utc>) -> SyncResult<()> {
        if self.fail_watermark.load(Ordering::SeqCst) {
            return Err(CoreError::Io(std::io::Error::other("watermark write failed")).into());
        }
        *self.watermark.write() = at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use std::sync::mpsc;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn engine() -> SyncEngine<MockTransport, MemoryReplica> {
        SyncEngine::new(
            SyncConfig::default(),
            MockTransport::new(),
            MemoryReplica::new(),
        )
    }

    #[test]
    fn sync_state_checks() {
        assert!(SyncState::Idle.can_start_sync());
        assert!(SyncState::Synced.can_start_sync());
        assert!(SyncState::Error.can_start_sync());
        assert!(!SyncState::Pulling.can_start_sync());
        assert!(!SyncState::Pushing.can_start_sync());
        assert!(!SyncState::Stopped.can_start_sync());

        assert!(SyncState::Pulling.is_active());
        assert!(SyncState::Pushing.is_active());
        assert!(!SyncState::Idle.is_active());
    }

    #[test]
    fn sync_engine_initial_state() {
        let engine = engine();
        assert_eq!(engine.state(), SyncState::Idle);
        assert_eq!(engine.stats().cycles_completed, 0);
        assert_eq!(engine.replica().watermark().unwrap(), EPOCH);
    }

    #[test]
    fn push_then_pull() {
        let engine = engine();
        engine.replica().put(SyncRecord::new("local", vec![1], at(100)));
        engine
            .transport()
            .insert(SyncRecord::new("remote", vec![2], at(200)));

        let before = now();
        let result = engine.sync_once().unwrap();

        assert_eq!(result.pushed, 1);
        assert_eq!(result.discarded, 0);
        // The pushed record comes back too: pull uses the old watermark.
        assert_eq!(result.pulled, 2);
        assert!(result.watermark >= before);

        assert_eq!(engine.transport().get("local").unwrap().value, vec![1]);
        assert_eq!(engine.replica().get("remote").unwrap().value, vec![2]);
        assert_eq!(engine.replica().watermark().unwrap(), result.watermark);
        assert_eq!(engine.state(), SyncState::Synced);

        let stats = engine.stats();
        assert_eq!(stats.cycles_completed, 1);
        assert_eq!(stats.records_pushed, 1);
        assert_eq!(stats.last_sync, Some(result.watermark));
    }

    #[test]
    fn older_local_write_is_discarded_and_overwritten() {
        let engine = engine();
        engine.replica().put(SyncRecord::new("site", b"E0".to_vec(), at(100)));
        engine
            .transport()
            .insert(SyncRecord::new("site", b"E1".to_vec(), at(200)));

        let result = engine.sync_once().unwrap();
        assert_eq!(result.pushed, 0);
        assert_eq!(result.discarded, 1);

        assert_eq!(engine.replica().get("site").unwrap().value, b"E1");
        assert_eq!(engine.transport().get("site").unwrap().updated_at, at(200));
    }

    #[test]
    fn second_cycle_is_a_noop() {
        let engine = engine();
        engine.replica().put(SyncRecord::new("a", vec![1], at(100)));

        engine.sync_once().unwrap();
        let upserts = engine.transport().upsert_calls();

        let result = engine.sync_once().unwrap();
        assert_eq!(result.pushed, 0);
        assert_eq!(result.pulled, 0);
        assert_eq!(engine.transport().upsert_calls(), upserts);
    }

    #[test]
    fn writes_stamped_at_the_watermark_are_not_skipped() {
        let engine = engine();
        let first = engine.sync_once().unwrap();

        // A local edit and a remote write that both landed in the cycle's
        // starting millisecond, after its reads.
        engine
            .replica()
            .put(SyncRecord::new("local", vec![1], first.watermark));
        engine
            .transport()
            .insert(SyncRecord::new("remote", vec![2], first.watermark));

        let second = engine.sync_once().unwrap();
        assert_eq!(second.pushed, 1);
        assert_eq!(engine.transport().get("local").unwrap().value, vec![1]);
        assert_eq!(engine.replica().get("remote").unwrap().value, vec![2]);
    }

    #[test]
    fn overlap_steps_back_one_millisecond() {
        assert_eq!(overlap(at(1_000)), at(999));
        assert_eq!(overlap(EPOCH), at(-1));
    }

    #[test]
    fn failed_push_keeps_watermark() {
        let engine = engine();
        engine.replica().put(SyncRecord::new("a", vec![1], at(100)));
        engine.replica().put(SyncRecord::new("b", vec![2], at(200)));
        engine.transport().fail_upserts_after(1);

        let err = engine.sync_once().unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(engine.state(), SyncState::Error);
        assert_eq!(engine.replica().watermark().unwrap(), EPOCH);
        assert_eq!(engine.transport().pull_calls(), 0);

        let stats = engine.stats();
        assert_eq!(stats.cycles_failed, 1);
        assert!(stats.last_error.is_some());
    }

    #[test]
    fn failed_pull_keeps_watermark() {
        let engine = engine();
        engine.transport().set_unavailable(true);

        assert!(engine.sync_once().is_err());
        assert_eq!(engine.replica().watermark().unwrap(), EPOCH);

        engine.transport().set_unavailable(false);
        engine.sync_once().unwrap();
        assert_eq!(engine.state(), SyncState::Synced);
    }

    #[test]
    fn watermark_write_failure_fails_cycle() {
        let engine = engine();
        engine
            .transport()
            .insert(SyncRecord::new("remote", vec![2], at(200)));
        engine.replica().set_fail_watermark(true);

        assert!(matches!(engine.sync_once(), Err(SyncError::Core(_))));
        assert_eq!(engine.replica().watermark().unwrap(), EPOCH);
        assert_eq!(engine.state(), SyncState::Error);
        assert_eq!(engine.stats().cycles_completed, 0);
    }

    #[test]
    fn cancelled_engine_does_nothing() {
        let engine = engine();
        engine.replica().put(SyncRecord::new("a", vec![1], at(100)));
        engine.cancel();

        assert!(matches!(engine.sync_once(), Err(SyncError::Cancelled)));
        assert_eq!(engine.transport().upsert_calls(), 0);
        assert_eq!(engine.state(), SyncState::Idle);

        engine.reset_cancel();
        assert!(engine.sync_once().is_ok());
    }

    #[test]
    fn stopped_engine_rejects_cycles() {
        let engine = engine();
        engine.stop();
        assert_eq!(engine.state(), SyncState::Stopped);

        engine.reset_cancel();
        assert!(matches!(engine.sync_once(), Err(SyncError::Cancelled)));
        assert_eq!(engine.state(), SyncState::Stopped);
    }

    /// Blocks inside `upsert` until released.
    struct GatedTransport {
        inner: MockTransport,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl SyncTransport for GatedTransport {
        fn upsert(&self, record: &SyncRecord) -> SyncResult<UpsertOutcome> {
            let _ = self.entered.lock().send(());
            let _ = self.release.lock().recv();
            self.inner.upsert(record)
        }

        fn pull_changed_since(&self, since: DateTime<Utc>) -> SyncResult<Vec<SyncRecord>> {
            self.inner.pull_changed_since(since)
        }
    }

    #[test]
    fn concurrent_cycle_is_rejected() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let transport = GatedTransport {
            inner: MockTransport::new(),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        let replica = MemoryReplica::new();
        replica.put(SyncRecord::new("a", vec![1], at(100)));

        let engine = Arc::new(SyncEngine::new(SyncConfig::default(), transport, replica));
        let background = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.sync_once())
        };

        entered_rx.recv().unwrap();
        assert_eq!(engine.state(), SyncState::Pushing);
        assert!(matches!(engine.sync_once(), Err(SyncError::AlreadySyncing)));

        release_tx.send(()).unwrap();
        let result = background.join().unwrap().unwrap();
        assert_eq!(result.pushed, 1);
        assert_eq!(engine.state(), SyncState::Synced);
    }

    #[test]
    fn memory_replica_basics() {
        let replica = MemoryReplica::new();
        assert!(replica.is_empty());

        replica.put(SyncRecord::new("b", vec![2], at(20)));
        replica.put(SyncRecord::new("a", vec![1], at(10)));
        assert_eq!(replica.len(), 2);

        let keys: Vec<_> = replica
            .changed_since(at(10))
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, ["b"]);

        replica
            .apply_remote(&[SyncRecord::new("a", vec![9], at(5))])
            .unwrap();
        assert_eq!(replica.get("a").unwrap().value, vec![9]);
    }
}

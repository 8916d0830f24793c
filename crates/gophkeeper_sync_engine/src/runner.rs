//! Background sync loop.
//!
//! Runs one cycle immediately, then one per interval tick, until the shared
//! shutdown signal fires or [`SyncRunner::stop`] is called. Cycles run on
//! the blocking pool because SQLite and the HTTP client block.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::SyncError;
use crate::state::{LocalReplica, SyncEngine};
use crate::transport::SyncTransport;

/// Handle to a running background sync task.
pub struct SyncRunner<T: SyncTransport + 'static, R: LocalReplica + 'static> {
    engine: Arc<SyncEngine<T, R>>,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl<T: SyncTransport + 'static, R: LocalReplica + 'static> SyncRunner<T, R> {
    /// Spawns the loop on the current tokio runtime.
    ///
    /// `shutdown` is the process-wide signal; the loop exits once it reads
    /// `true` or its sender is dropped.
    pub fn spawn(
        engine: Arc<SyncEngine<T, R>>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(Arc::clone(&engine), interval, shutdown, stop_rx));
        Self {
            engine,
            stop_tx,
            handle,
        }
    }

    /// Returns the engine driven by this runner.
    pub fn engine(&self) -> &Arc<SyncEngine<T, R>> {
        &self.engine
    }

    /// Returns true once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the engine and waits for the in-flight cycle to finish.
    pub async fn stop(self) {
        self.engine.stop();
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "sync task ended abnormally");
        }
        tracing::info!("background sync stopped");
    }
}

async fn run_loop<T, R>(
    engine: Arc<SyncEngine<T, R>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut stop: watch::Receiver<bool>,
) where
    T: SyncTransport + 'static,
    R: LocalReplica + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(interval_secs = period.as_secs(), "background sync started");
    let mut login = LoginNotice::default();

    loop {
        if *shutdown.borrow() || *stop.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = stop.changed() => break,
            _ = ticker.tick() => run_cycle(&engine, &mut login).await,
        }
    }
}

/// Remembers whether the loop already warned that a login is needed.
#[derive(Debug, Default)]
struct LoginNotice {
    warned: bool,
}

impl LoginNotice {
    /// Returns true only for the first login failure since the last success.
    fn first_failure(&mut self) -> bool {
        !std::mem::replace(&mut self.warned, true)
    }

    fn clear(&mut self) {
        self.warned = false;
    }
}

async fn run_cycle<T, R>(engine: &Arc<SyncEngine<T, R>>, login: &mut LoginNotice)
where
    T: SyncTransport + 'static,
    R: LocalReplica + 'static,
{
    let engine = Arc::clone(engine);
    match tokio::task::spawn_blocking(move || engine.sync_once()).await {
        Ok(Ok(_)) => login.clear(),
        Ok(Err(SyncError::AlreadySyncing)) => {
            tracing::debug!("skipping tick: a cycle is already running");
        }
        Ok(Err(SyncError::Cancelled)) => {
            tracing::debug!("sync cycle cancelled");
        }
        Ok(Err(e)) if e.needs_login() => {
            if login.first_failure() {
                tracing::warn!(error = %e, "background sync paused until login");
            } else {
                tracing::debug!(error = %e, "sync skipped until login");
            }
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, retryable = e.is_retryable(), "sync cycle failed");
        }
        Err(e) => {
            tracing::error!(error = %e, "sync cycle panicked");
        }
    }
}

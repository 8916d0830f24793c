//! # gophkeeper Sync Engine
//!
//! Client-side synchronizer for gophkeeper vaults.
//!
//! This crate provides:
//! - Sync state machine (idle → pushing → pulling → synced)
//! - Watermark management
//! - Transport abstraction with an HTTP implementation
//! - A [`LocalReplica`] adapter for the SQLite vault store
//! - A background runner driven by a tokio interval
//!
//! ## Architecture
//!
//! The engine implements a **push-then-pull** cycle:
//! 1. Record the cycle start time `S` and read the watermark `W`
//! 2. Push every local record changed after `W`, one at a time
//! 3. Pull every remote record changed after `W` and apply it locally
//! 4. Persist `W = S`
//!
//! Conflicts are settled by the authoritative store (last writer wins on
//! `updated_at`); the client never arbitrates.
//!
//! ## Key Invariants
//!
//! - The watermark only advances when the whole cycle succeeds
//! - At most one cycle runs at a time per engine
//! - Re-running a cycle is harmless: pushes of unchanged records are
//!   discarded by the store, pulls overwrite with identical data

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod runner;
mod state;
mod store_replica;
mod transport;

pub use config::{SyncConfig, DEFAULT_SERVER_URL};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpResponse, HttpTransport, LoopbackClient, LoopbackServer};
pub use runner::SyncRunner;
pub use state::{
    LocalReplica, MemoryReplica, SyncCycleResult, SyncEngine, SyncState, SyncStats,
};
pub use transport::{MockTransport, SyncTransport};

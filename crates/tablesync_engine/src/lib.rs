//! # tablesync engine
//!
//! Push cycle and gateway seams for tablesync.
//!
//! This crate provides:
//! - The [`LocalStore`] and [`RemoteTable`] gateway traits
//! - The [`SyncEngine`] push cycle over one entity kind
//! - Per-operation observer reporting ([`PushOutcome`])
//! - Pass statistics
//! - In-memory mock gateways for tests
//!
//! ## Architecture
//!
//! The engine implements a **push/ack/merge** model per entity:
//! 1. Discover dirty local entities (sync state ≠ `Synced`)
//! 2. Issue the remote operation each entity's state implies
//! 3. Apply the server's authoritative response back onto the entity
//!    and persist it as `Synced`
//!
//! Remote completions run on the gateway's execution context; local
//! persistence and observer delivery happen from there.
//!
//! ## Key Invariants
//!
//! - A clean entity never produces a remote call
//! - An entity's state only changes after remote acknowledgment
//! - One entity's failure never aborts the rest of a pass
//! - A failed entity stays dirty and is retried on the next pass
//! - An entity with an outstanding push is never pushed again until
//!   that push completes

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod observer;
mod remote;
mod stats;
mod store;

pub use engine::SyncEngine;
pub use error::{RemoteError, StoreError, SyncError, SyncResult};
pub use observer::{PushOutcome, SyncObserver};
pub use remote::{
    DeleteCompletion, MockRemoteTable, RecordCompletion, RemoteCall, RemoteTable,
};
pub use stats::SyncStats;
pub use store::{LocalStore, MemoryStore};

//! # tablesync core
//!
//! Data model and pure sync logic for tablesync.
//!
//! This crate provides:
//! - Entity identity (`LocalId`, `RemoteId`)
//! - The per-entity sync state machine (`SyncState`, `SyncOperation`)
//! - The wire-shaped row representation (`Record`, `FieldValue`)
//! - Declared per-kind field mapping (`TableSchema`, `TableEntity`)
//! - The bidirectional field mapper
//!
//! Everything here is pure: no I/O, no shared state, no failure modes.
//! The push cycle that drives these types lives in `tablesync_engine`.
//!
//! ## Key Invariants
//!
//! - `Synced` is the sole rest state; every other state is dirty
//! - The state→operation mapping is fixed (Created→Create,
//!   Updated→Update, Deleted→Delete)
//! - The mapper copies only schema-declared fields and the remote
//!   identity key; unknown record keys are ignored
//! - Sync state and local identity never cross the mapping boundary

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod mapper;
mod record;
mod schema;
mod state;

pub use entity::{LocalId, RemoteId, TableEntity};
pub use mapper::{merge_entity_into_record, merge_record_into_entity};
pub use record::{FieldValue, Record};
pub use schema::TableSchema;
pub use state::{SyncOperation, SyncState};

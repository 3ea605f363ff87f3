//! Entity contract.

mod id;

pub use id::{LocalId, RemoteId};

use crate::record::FieldValue;
use crate::schema::TableSchema;
use crate::state::SyncState;

/// A local entity kind that can be synchronized with a remote table.
///
/// Each kind declares its mapping surface once: a [`TableSchema`] naming
/// the synchronized fields, plus named access to those fields as
/// [`FieldValue`]s. The engine and mapper work exclusively through this
/// trait; they never see the kind's concrete representation.
///
/// Implementations keep the control attributes (local identity, remote
/// identity, sync state) out of the schema's field set.
///
/// # Example
///
/// ```rust,ignore
/// struct Task {
///     id: LocalId,
///     remote_id: Option<RemoteId>,
///     state: SyncState,
///     title: String,
/// }
///
/// const TASK_SCHEMA: TableSchema = TableSchema {
///     table: "tasks",
///     remote_id_key: "id",
///     fields: &["title"],
/// };
///
/// impl TableEntity for Task {
///     fn schema() -> &'static TableSchema { &TASK_SCHEMA }
///     // ...
/// }
/// ```
pub trait TableEntity: Clone + Send + Sync + 'static {
    /// The declared mapping for this kind.
    fn schema() -> &'static TableSchema;

    /// The entity's local identity.
    fn local_id(&self) -> LocalId;

    /// The server-assigned identity, absent until first successful push.
    fn remote_id(&self) -> Option<&RemoteId>;

    /// Records the server-assigned identity.
    fn set_remote_id(&mut self, id: Option<RemoteId>);

    /// The entity's sync state.
    fn sync_state(&self) -> SyncState;

    /// Replaces the entity's sync state.
    fn set_sync_state(&mut self, state: SyncState);

    /// Reads a synchronized field by name.
    ///
    /// Returns `None` for names outside the schema's field set.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Writes a synchronized field by name.
    ///
    /// Names outside the schema's field set are ignored; this is what
    /// makes the mapper forward-compatible with fields added on the
    /// remote side.
    fn set_field(&mut self, name: &str, value: FieldValue);
}

//! Per-entity sync state machine.

use serde::{Deserialize, Serialize};

/// The synchronization state of a single entity.
///
/// `Synced` is the sole rest state: the local representation is known to
/// match the last representation acknowledged by the remote service. Any
/// other value records a local mutation that has not been acknowledged
/// yet and makes the entity *dirty* (eligible for the next push cycle).
///
/// Transitions are exactly:
/// - entity creation → `Created` ([`SyncState::initial`])
/// - field mutation: `Synced` → `Updated`, everything else unchanged
///   ([`SyncState::on_field_mutated`])
/// - delete request: any → `Deleted` ([`SyncState::on_delete_requested`])
/// - remote acknowledgment: any → `Synced` ([`SyncState::on_acknowledged`])
///
/// No other transitions exist. A `Deleted` entity that is acknowledged is
/// removed from the local store rather than stored as `Synced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncState {
    /// Created locally, never acknowledged by the remote service.
    Created,
    /// Modified locally since the last acknowledgment.
    Updated,
    /// Marked for deletion locally, removal not yet acknowledged.
    Deleted,
    /// Local representation matches the last acknowledged remote row.
    Synced,
}

impl SyncState {
    /// The state of a freshly created entity.
    #[must_use]
    pub fn initial() -> Self {
        SyncState::Created
    }

    /// Returns true if this state records an unacknowledged local mutation.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !matches!(self, SyncState::Synced)
    }

    /// Transition for a direct field mutation by the application.
    ///
    /// Only a `Synced` entity moves (to `Updated`). An entity already in
    /// `Created` or `Updated` keeps its pending operation, and `Deleted`
    /// stays `Deleted`: delete intent dominates later field writes.
    #[must_use]
    pub fn on_field_mutated(self) -> Self {
        match self {
            SyncState::Synced => SyncState::Updated,
            other => other,
        }
    }

    /// Transition for a local delete request.
    ///
    /// Overrides any prior pending state. Callers must treat a `Deleted`
    /// entity that was never pushed (no remote ID) as a purely local
    /// removal and skip the remote call.
    #[must_use]
    pub fn on_delete_requested(self) -> Self {
        SyncState::Deleted
    }

    /// Transition for a successful remote acknowledgment.
    ///
    /// Idempotent: acknowledging a `Synced` entity leaves it `Synced`.
    #[must_use]
    pub fn on_acknowledged(self) -> Self {
        SyncState::Synced
    }

    /// The remote operation this state implies at push time.
    ///
    /// Returns `None` for `Synced`: a clean entity never produces an
    /// operation.
    #[must_use]
    pub fn operation(&self) -> Option<SyncOperation> {
        match self {
            SyncState::Created => Some(SyncOperation::Create),
            SyncState::Updated => Some(SyncOperation::Update),
            SyncState::Deleted => Some(SyncOperation::Delete),
            SyncState::Synced => None,
        }
    }
}

/// The remote operation derived from a dirty entity's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncOperation {
    /// Insert a new row in the remote table.
    Create,
    /// Overwrite an existing remote row.
    Update,
    /// Remove a remote row.
    Delete,
}

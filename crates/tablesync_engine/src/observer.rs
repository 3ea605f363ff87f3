//! Per-operation reporting.

use crate::error::SyncError;
use std::sync::Arc;
use tablesync_core::{Record, SyncOperation, TableEntity};

/// Callback invoked once per processed dirty entity.
///
/// Completions may arrive from whatever execution context the remote
/// gateway uses, so observers must tolerate concurrent delivery.
pub type SyncObserver<T> = Arc<dyn Fn(PushOutcome<T>) + Send + Sync>;

/// The report for one processed entity.
///
/// Exactly one of `record`/`error` is populated, except for the purely
/// local removal of a never-pushed deleted entity, where both are `None`
/// and `operation` is `Delete`.
#[derive(Debug, Clone)]
pub struct PushOutcome<T> {
    /// The operation that was attempted.
    pub operation: SyncOperation,
    /// The entity as the engine last saw it.
    pub entity: T,
    /// The acknowledged row: the server response for create/update, the
    /// pushed record for delete.
    pub record: Option<Record>,
    /// The failure, if the operation was not applied.
    pub error: Option<SyncError>,
}

impl<T: TableEntity> PushOutcome<T> {
    /// Report for an acknowledged operation.
    pub fn applied(operation: SyncOperation, entity: T, record: Record) -> Self {
        Self {
            operation,
            entity,
            record: Some(record),
            error: None,
        }
    }

    /// Report for a failed operation.
    pub fn failed(operation: SyncOperation, entity: T, error: SyncError) -> Self {
        Self {
            operation,
            entity,
            record: None,
            error: Some(error),
        }
    }

    /// Report for the local-only removal of a never-pushed entity.
    pub fn local_delete(entity: T) -> Self {
        Self {
            operation: SyncOperation::Delete,
            entity,
            record: None,
            error: None,
        }
    }

    /// Returns true if the operation was applied.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

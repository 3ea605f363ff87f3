//! Shared entity fixtures.

use tablesync_core::{
    FieldValue, LocalId, RemoteId, SyncState, TableEntity, TableSchema,
};

/// Schema for the [`Task`] fixture.
pub const TASK_SCHEMA: TableSchema = TableSchema {
    table: "tasks",
    remote_id_key: "id",
    fields: &["title", "done"],
};

/// A minimal entity kind for exercising the engine in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Local identity.
    pub id: LocalId,
    /// Server-assigned identity, if ever pushed.
    pub remote_id: Option<RemoteId>,
    /// Sync state.
    pub state: SyncState,
    /// Synchronized field.
    pub title: String,
    /// Synchronized field.
    pub done: bool,
}

impl Task {
    /// Creates a fresh task with the given title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: LocalId::new(),
            remote_id: None,
            state: SyncState::initial(),
            title: title.into(),
            done: false,
        }
    }

    /// Factory for store implementations that create empty entities.
    #[must_use]
    pub fn blank() -> Self {
        Self::new("")
    }
}

impl TableEntity for Task {
    fn schema() -> &'static TableSchema {
        &TASK_SCHEMA
    }

    fn local_id(&self) -> LocalId {
        self.id
    }

    fn remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref()
    }

    fn set_remote_id(&mut self, id: Option<RemoteId>) {
        self.remote_id = id;
    }

    fn sync_state(&self) -> SyncState {
        self.state
    }

    fn set_sync_state(&mut self, state: SyncState) {
        self.state = state;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "title" => Some(FieldValue::Text(self.title.clone())),
            "done" => Some(FieldValue::Bool(self.done)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) {
        match name {
            "title" => {
                if let Some(s) = value.as_text() {
                    self.title = s.to_string();
                }
            }
            "done" => {
                if let Some(b) = value.as_bool() {
                    self.done = b;
                }
            }
            _ => {}
        }
    }
}

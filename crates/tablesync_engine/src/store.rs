//! Local store gateway.

use crate::error::StoreError;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tablesync_core::{LocalId, TableEntity};

/// The narrow seam to the local persistence engine.
///
/// The engine only ever creates entities, queries them with
/// host-language predicates, and persists or removes single entities.
/// Object storage, predicate evaluation, and durability are the
/// implementation's concern.
///
/// Implementations hand out owned snapshots; the engine mutates its
/// snapshot and writes it back through [`LocalStore::save`].
pub trait LocalStore<T: TableEntity>: Send + Sync {
    /// Creates and stores a new entity of this kind.
    ///
    /// The new entity starts in `Created` state with no remote identity.
    fn create(&self) -> Result<T, StoreError>;

    /// Returns all entities matching `predicate`, ordered by `sort`
    /// when given.
    fn query(
        &self,
        predicate: &dyn Fn(&T) -> bool,
        sort: Option<&dyn Fn(&T, &T) -> Ordering>,
    ) -> Result<Vec<T>, StoreError>;

    /// Persists an entity, overwriting the stored copy.
    fn save(&self, entity: &T) -> Result<(), StoreError>;

    /// Removes an entity from the store.
    fn delete(&self, id: LocalId) -> Result<(), StoreError>;
}

/// An in-memory local store for tests.
pub struct MemoryStore<T> {
    entities: RwLock<HashMap<LocalId, T>>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    fail_queries: AtomicBool,
    fail_saves: AtomicBool,
}

impl<T: TableEntity> MemoryStore<T> {
    /// Creates an empty store that builds new entities with `factory`.
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            factory: Box::new(factory),
            fail_queries: AtomicBool::new(false),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Seeds the store with an entity.
    pub fn insert(&self, entity: T) {
        self.entities.write().insert(entity.local_id(), entity);
    }

    /// Returns the stored copy of an entity.
    pub fn get(&self, id: LocalId) -> Option<T> {
        self.entities.read().get(&id).cloned()
    }

    /// Returns the number of stored entities.
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Makes subsequent queries fail.
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, AtomicOrdering::SeqCst);
    }

    /// Makes subsequent saves fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, AtomicOrdering::SeqCst);
    }
}

impl<T: TableEntity> LocalStore<T> for MemoryStore<T> {
    fn create(&self) -> Result<T, StoreError> {
        let entity = (self.factory)();
        self.entities.write().insert(entity.local_id(), entity.clone());
        Ok(entity)
    }

    fn query(
        &self,
        predicate: &dyn Fn(&T) -> bool,
        sort: Option<&dyn Fn(&T, &T) -> Ordering>,
    ) -> Result<Vec<T>, StoreError> {
        if self.fail_queries.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::QueryFailed("memory store offline".into()));
        }

        let mut matches: Vec<T> = self
            .entities
            .read()
            .values()
            .filter(|e| predicate(e))
            .cloned()
            .collect();

        if let Some(cmp) = sort {
            matches.sort_by(|a, b| cmp(a, b));
        }

        Ok(matches)
    }

    fn save(&self, entity: &T) -> Result<(), StoreError> {
        if self.fail_saves.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::SaveFailed("memory store offline".into()));
        }
        self.entities
            .write()
            .insert(entity.local_id(), entity.clone());
        Ok(())
    }

    fn delete(&self, id: LocalId) -> Result<(), StoreError> {
        match self.entities.write().remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablesync_core::{FieldValue, RemoteId, SyncState, TableSchema};

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: LocalId,
        remote_id: Option<RemoteId>,
        state: SyncState,
        body: String,
    }

    const NOTE_SCHEMA: TableSchema = TableSchema {
        table: "notes",
        remote_id_key: "id",
        fields: &["body"],
    };

    impl TableEntity for Note {
        fn schema() -> &'static TableSchema {
            &NOTE_SCHEMA
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
            (name == "body").then(|| FieldValue::Text(self.body.clone()))
        }
        fn set_field(&mut self, name: &str, value: FieldValue) {
            if name == "body" {
                if let Some(s) = value.as_text() {
                    self.body = s.to_string();
                }
            }
        }
    }

    fn note_store() -> MemoryStore<Note> {
        MemoryStore::new(|| Note {
            id: LocalId::new(),
            remote_id: None,
            state: SyncState::initial(),
            body: String::new(),
        })
    }

    #[test]
    fn create_starts_dirty() {
        let store = note_store();
        let note = store.create().unwrap();

        assert_eq!(note.state, SyncState::Created);
        assert!(note.remote_id.is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn query_with_predicate_and_sort() {
        let store = note_store();
        for body in ["b", "c", "a"] {
            let mut note = store.create().unwrap();
            note.body = body.to_string();
            store.save(&note).unwrap();
        }

        let all = store
            .query(&|n: &Note| !n.body.is_empty(), Some(&|a: &Note, b: &Note| a.body.cmp(&b.body)))
            .unwrap();

        let bodies: Vec<_> = all.iter().map(|n| n.body.as_str()).collect();
        assert_eq!(bodies, ["a", "b", "c"]);
    }

    #[test]
    fn save_overwrites() {
        let store = note_store();
        let mut note = store.create().unwrap();
        note.body = "first".into();
        store.save(&note).unwrap();
        note.body = "second".into();
        store.save(&note).unwrap();

        assert_eq!(store.get(note.id).unwrap().body, "second");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_missing_entity() {
        let store = note_store();
        let result = store.delete(LocalId::new());
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn failure_toggles() {
        let store = note_store();
        let note = store.create().unwrap();

        store.set_fail_queries(true);
        assert!(matches!(
            store.query(&|_| true, None),
            Err(StoreError::QueryFailed(_))
        ));

        store.set_fail_saves(true);
        assert!(matches!(store.save(&note), Err(StoreError::SaveFailed(_))));

        store.set_fail_queries(false);
        assert_eq!(store.query(&|_| true, None).unwrap().len(), 1);
    }
}

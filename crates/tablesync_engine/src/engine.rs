//! Push cycle orchestration.

use crate::error::{SyncError, SyncResult};
use crate::observer::{PushOutcome, SyncObserver};
use crate::remote::{DeleteCompletion, RecordCompletion, RemoteTable};
use crate::stats::SyncStats;
use crate::store::LocalStore;
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tablesync_core::{
    merge_entity_into_record, merge_record_into_entity, LocalId, Record, SyncOperation, SyncState,
    TableEntity,
};
use tracing::{debug, warn};

/// The synchronization engine for one entity kind.
///
/// The engine discovers dirty local entities, issues the remote
/// operation each entity's state implies, applies the server's
/// authoritative response back onto the entity, and reports every
/// processed entity through a caller-supplied observer.
///
/// Gateway handles are passed in explicitly; their lifetime is owned by
/// the caller. The engine performs no threading of its own — remote
/// completions run on whatever execution context the [`RemoteTable`]
/// implementation uses, and it is from there that local persistence and
/// observer delivery happen. An entity with an outstanding push is
/// skipped by discovery until that push completes, so a single entity is
/// never raced against itself.
pub struct SyncEngine<T: TableEntity, S: LocalStore<T>, R: RemoteTable> {
    store: Arc<S>,
    remote: Arc<R>,
    in_flight: Arc<Mutex<HashSet<LocalId>>>,
    stats: Arc<RwLock<SyncStats>>,
    _marker: PhantomData<T>,
}

impl<T, S, R> SyncEngine<T, S, R>
where
    T: TableEntity,
    S: LocalStore<T> + 'static,
    R: RemoteTable + 'static,
{
    /// Creates an engine over the given gateway handles.
    pub fn new(store: Arc<S>, remote: Arc<R>) -> Self {
        Self {
            store,
            remote,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            stats: Arc::new(RwLock::new(SyncStats::default())),
            _marker: PhantomData,
        }
    }

    /// Returns a snapshot of the accumulated pass statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Creates a new entity in the local store.
    ///
    /// The entity starts in `Created` state and is picked up by the next
    /// synchronization pass.
    pub fn create_entity(&self) -> SyncResult<T> {
        let entity = self.store.create()?;
        debug!(entity = %entity.local_id(), "created local entity");
        Ok(entity)
    }

    /// Reads local entities. No remote calls are made.
    pub fn read(
        &self,
        predicate: &dyn Fn(&T) -> bool,
        sort: Option<&dyn Fn(&T, &T) -> Ordering>,
    ) -> SyncResult<Vec<T>> {
        self.store
            .query(predicate, sort)
            .map_err(SyncError::Discovery)
    }

    /// Returns the dirty entities eligible for the next push cycle.
    ///
    /// Entities whose previous push is still outstanding are excluded;
    /// ordering is unspecified.
    pub fn collect_dirty(&self) -> SyncResult<Vec<T>> {
        let dirty = self
            .store
            .query(&|e: &T| e.sync_state().is_dirty(), None)
            .map_err(SyncError::Discovery)?;

        let in_flight = self.in_flight.lock();
        Ok(dirty
            .into_iter()
            .filter(|e| !in_flight.contains(&e.local_id()))
            .collect())
    }

    /// Runs one push cycle over every dirty entity.
    ///
    /// Each processed entity is reported exactly once through
    /// `observer`; a single entity's failure never aborts the rest of
    /// the batch. Returns the number of remote pushes dispatched
    /// (local-only removals are processed but not counted). If discovery
    /// itself fails the pass aborts with [`SyncError::Discovery`] and
    /// the observer is not invoked.
    pub fn synchronize(&self, observer: SyncObserver<T>) -> SyncResult<usize> {
        let dirty = self.collect_dirty()?;
        debug!(dirty = dirty.len(), "starting push cycle");

        let mut dispatched = 0;
        for entity in dirty {
            if self.push_entity(entity, Arc::clone(&observer)) {
                dispatched += 1;
            }
        }

        self.stats.write().passes_completed += 1;
        Ok(dispatched)
    }

    /// Persists `entity` as newly created and pushes it.
    ///
    /// On remote failure the entity stays dirty and is retried by the
    /// next pass.
    pub fn insert(&self, mut entity: T, observer: SyncObserver<T>) -> SyncResult<()> {
        entity.set_sync_state(SyncState::initial());
        self.store.save(&entity)?;
        self.push_entity(entity, observer);
        Ok(())
    }

    /// Records a field mutation on `entity`, persists it, and pushes it.
    ///
    /// A never-pushed entity keeps its `Created` state and is inserted
    /// rather than updated; a deleted entity keeps its delete intent.
    pub fn update(&self, mut entity: T, observer: SyncObserver<T>) -> SyncResult<()> {
        entity.set_sync_state(entity.sync_state().on_field_mutated());
        self.store.save(&entity)?;
        self.push_entity(entity, observer);
        Ok(())
    }

    /// Requests deletion of `entity`.
    ///
    /// A never-pushed entity is removed locally without a remote call;
    /// otherwise the delete intent is persisted and pushed.
    pub fn delete(&self, mut entity: T, observer: SyncObserver<T>) -> SyncResult<()> {
        entity.set_sync_state(entity.sync_state().on_delete_requested());
        if entity.remote_id().is_some() {
            self.store.save(&entity)?;
        }
        self.push_entity(entity, observer);
        Ok(())
    }

    /// Issues the remote operation implied by the entity's state.
    ///
    /// Returns true if a remote push was dispatched. A clean entity and
    /// an entity with an outstanding push are skipped; a never-pushed
    /// deleted entity is removed locally and reported without a remote
    /// call.
    fn push_entity(&self, mut entity: T, observer: SyncObserver<T>) -> bool {
        let Some(op) = entity.sync_state().operation() else {
            return false;
        };
        let id = entity.local_id();

        if op == SyncOperation::Delete && entity.remote_id().is_none() {
            self.remove_locally(entity, &observer);
            return false;
        }

        if !self.in_flight.lock().insert(id) {
            debug!(entity = %id, "push already outstanding, skipping");
            return false;
        }

        let mut record = Record::new();
        merge_entity_into_record(&entity, &mut record);
        debug!(entity = %id, operation = ?op, "pushing local change");
        self.stats.write().pushes_dispatched += 1;

        let store = Arc::clone(&self.store);
        let in_flight = Arc::clone(&self.in_flight);
        let stats = Arc::clone(&self.stats);

        if op == SyncOperation::Delete {
            let sent = record.clone();
            let completion: DeleteCompletion = Box::new(move |result| {
                let outcome = match result {
                    Ok(()) => match store.delete(id) {
                        Ok(()) => {
                            stats.write().pushes_acknowledged += 1;
                            PushOutcome::applied(op, entity, sent)
                        }
                        Err(e) => {
                            warn!(entity = %id, error = %e,
                                "local removal failed after remote delete; entity is desynchronized");
                            stats.write().pushes_failed += 1;
                            PushOutcome::failed(op, entity, SyncError::Store(e))
                        }
                    },
                    Err(e) => {
                        stats.write().pushes_failed += 1;
                        PushOutcome::failed(op, entity, SyncError::Remote(e))
                    }
                };
                in_flight.lock().remove(&id);
                observer(outcome);
            });
            self.remote.delete(record, completion);
        } else {
            let completion: RecordCompletion = Box::new(move |result| {
                let outcome = match result {
                    Ok(response) => {
                        merge_record_into_entity(&response, &mut entity);
                        entity.set_sync_state(entity.sync_state().on_acknowledged());
                        match store.save(&entity) {
                            Ok(()) => {
                                stats.write().pushes_acknowledged += 1;
                                PushOutcome::applied(op, entity, response)
                            }
                            Err(e) => {
                                warn!(entity = %id, error = %e,
                                    "local persistence failed after remote acknowledgment; entity is desynchronized");
                                stats.write().pushes_failed += 1;
                                PushOutcome::failed(op, entity, SyncError::Store(e))
                            }
                        }
                    }
                    Err(e) => {
                        stats.write().pushes_failed += 1;
                        PushOutcome::failed(op, entity, SyncError::Remote(e))
                    }
                };
                in_flight.lock().remove(&id);
                observer(outcome);
            });
            match op {
                SyncOperation::Create => self.remote.insert(record, completion),
                _ => self.remote.update(record, completion),
            }
        }

        true
    }

    /// Removes a never-pushed deleted entity without a remote call.
    fn remove_locally(&self, entity: T, observer: &SyncObserver<T>) {
        let id = entity.local_id();
        debug!(entity = %id, "removing never-pushed entity locally");
        let outcome = match self.store.delete(id) {
            Ok(()) => {
                self.stats.write().local_deletes += 1;
                PushOutcome::local_delete(entity)
            }
            Err(e) => PushOutcome::failed(SyncOperation::Delete, entity, SyncError::Store(e)),
        };
        observer(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RemoteError, StoreError};
    use crate::remote::MockRemoteTable;
    use crate::store::MemoryStore;
    use tablesync_core::FieldValue;
    use tablesync_testkit::fixtures::Task;

    type TaskEngine = SyncEngine<Task, MemoryStore<Task>, MockRemoteTable>;

    fn engine() -> (Arc<MemoryStore<Task>>, Arc<MockRemoteTable>, TaskEngine) {
        let store = Arc::new(MemoryStore::new(Task::blank));
        let remote = Arc::new(MockRemoteTable::new());
        let engine = SyncEngine::new(Arc::clone(&store), Arc::clone(&remote));
        (store, remote, engine)
    }

    /// Collects every outcome delivered to the observer.
    fn collecting_observer() -> (SyncObserver<Task>, Arc<Mutex<Vec<PushOutcome<Task>>>>) {
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcomes);
        let observer: SyncObserver<Task> = Arc::new(move |outcome| {
            sink.lock().push(outcome);
        });
        (observer, outcomes)
    }

    fn server_row(id: &str, title: &str) -> Record {
        let mut record = Record::new();
        record.insert("id", id);
        record.insert("title", title);
        record.insert("done", false);
        record
    }

    #[test]
    fn fresh_entity_is_discovered() {
        let (_, _, engine) = engine();
        let task = engine.create_entity().unwrap();

        assert_eq!(task.state, SyncState::Created);
        let dirty = engine.collect_dirty().unwrap();
        assert_eq!(dirty.len(), 1);
        assert_eq!(dirty[0].id, task.id);
    }

    #[test]
    fn created_entity_is_inserted_and_acknowledged() {
        let (store, remote, engine) = engine();
        let mut task = engine.create_entity().unwrap();
        task.title = "Alice".into();
        store.save(&task).unwrap();

        remote.set_insert_response(Ok(server_row("42", "Alice")));

        let (observer, outcomes) = collecting_observer();
        let dispatched = engine.synchronize(observer).unwrap();
        assert_eq!(dispatched, 1);

        // Remote insert carried the fields but no identity yet.
        let calls = remote.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, SyncOperation::Create);
        assert_eq!(
            calls[0].record.get("title").and_then(FieldValue::as_text),
            Some("Alice")
        );
        assert!(!calls[0].record.contains_key("id"));

        // Server identity and state were applied and persisted.
        let stored = store.get(task.id).unwrap();
        assert_eq!(stored.remote_id.as_ref().map(|r| r.as_str()), Some("42"));
        assert_eq!(stored.state, SyncState::Synced);

        let outcomes = outcomes.lock();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].operation, SyncOperation::Create);
        assert!(outcomes[0].is_success());
        assert_eq!(
            outcomes[0]
                .record
                .as_ref()
                .and_then(|r| r.get("id"))
                .and_then(FieldValue::as_text),
            Some("42")
        );
    }

    #[test]
    fn mutated_synced_entity_is_updated_with_join_key() {
        let (store, remote, engine) = engine();
        let mut task = Task::new("original");
        task.remote_id = Some("7".into());
        task.state = SyncState::Synced;
        store.insert(task.clone());

        // Application mutates a field.
        task.title = "renamed".into();
        task.state = task.state.on_field_mutated();
        assert_eq!(task.state, SyncState::Updated);
        store.save(&task).unwrap();

        remote.set_update_response(Ok(server_row("7", "renamed")));

        let (observer, outcomes) = collecting_observer();
        engine.synchronize(observer).unwrap();

        let calls = remote.calls();
        assert_eq!(calls[0].operation, SyncOperation::Update);
        assert_eq!(
            calls[0].record.get("id").and_then(FieldValue::as_text),
            Some("7")
        );

        assert_eq!(store.get(task.id).unwrap().state, SyncState::Synced);
        assert!(outcomes.lock()[0].is_success());
    }

    #[test]
    fn never_pushed_delete_is_local_only() {
        let (store, remote, engine) = engine();
        let mut task = engine.create_entity().unwrap();
        task.state = task.state.on_delete_requested();
        store.save(&task).unwrap();

        let (observer, outcomes) = collecting_observer();
        let dispatched = engine.synchronize(observer).unwrap();

        assert_eq!(dispatched, 0);
        assert_eq!(remote.call_count(), 0);
        assert!(store.is_empty());

        let outcomes = outcomes.lock();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].operation, SyncOperation::Delete);
        assert!(outcomes[0].record.is_none());
        assert!(outcomes[0].error.is_none());
    }

    #[test]
    fn failed_remote_delete_is_retried_next_pass() {
        let (store, remote, engine) = engine();
        let mut task = Task::new("doomed");
        task.remote_id = Some("9".into());
        task.state = SyncState::Deleted;
        store.insert(task.clone());

        remote.set_delete_response(Err(RemoteError::network("connection reset")));

        let (observer, outcomes) = collecting_observer();
        engine.synchronize(observer).unwrap();

        // Entity untouched, error reported.
        let stored = store.get(task.id).unwrap();
        assert_eq!(stored.state, SyncState::Deleted);
        {
            let outcomes = outcomes.lock();
            assert_eq!(outcomes.len(), 1);
            assert_eq!(outcomes[0].operation, SyncOperation::Delete);
            assert!(matches!(outcomes[0].error, Some(SyncError::Remote(_))));
        }

        // Next pass retries the same delete and succeeds.
        remote.set_delete_response(Ok(()));
        let (observer, _) = collecting_observer();
        engine.synchronize(observer).unwrap();

        assert!(store.get(task.id).is_none());
        assert_eq!(remote.call_count(), 2);
    }

    #[test]
    fn discovery_failure_aborts_pass_without_callbacks() {
        let (store, _, engine) = engine();
        engine.create_entity().unwrap();
        store.set_fail_queries(true);

        let (observer, outcomes) = collecting_observer();
        let result = engine.synchronize(observer);

        assert!(matches!(result, Err(SyncError::Discovery(_))));
        assert!(outcomes.lock().is_empty());
    }

    #[test]
    fn one_failure_does_not_abort_the_batch() {
        let (store, remote, engine) = engine();
        let mut created = engine.create_entity().unwrap();
        created.title = "new".into();
        store.save(&created).unwrap();

        let mut doomed = Task::new("doomed");
        doomed.remote_id = Some("3".into());
        doomed.state = SyncState::Deleted;
        store.insert(doomed.clone());

        remote.set_insert_response(Ok(server_row("50", "new")));
        remote.set_delete_response(Err(RemoteError::network("flaky")));

        let (observer, outcomes) = collecting_observer();
        let dispatched = engine.synchronize(observer).unwrap();
        assert_eq!(dispatched, 2);

        let outcomes = outcomes.lock();
        assert_eq!(outcomes.len(), 2);
        let insert = outcomes
            .iter()
            .find(|o| o.operation == SyncOperation::Create)
            .unwrap();
        let delete = outcomes
            .iter()
            .find(|o| o.operation == SyncOperation::Delete)
            .unwrap();
        assert!(insert.is_success());
        assert!(!delete.is_success());

        // The failed delete stays dirty; the insert is now clean.
        assert_eq!(store.get(created.id).unwrap().state, SyncState::Synced);
        assert_eq!(store.get(doomed.id).unwrap().state, SyncState::Deleted);
    }

    #[test]
    fn clean_entities_are_never_pushed() {
        let (store, remote, engine) = engine();
        let mut task = Task::new("settled");
        task.remote_id = Some("1".into());
        task.state = SyncState::Synced;
        store.insert(task);

        let (observer, outcomes) = collecting_observer();
        let dispatched = engine.synchronize(observer).unwrap();

        assert_eq!(dispatched, 0);
        assert_eq!(remote.call_count(), 0);
        assert!(outcomes.lock().is_empty());
    }

    #[test]
    fn post_ack_persistence_failure_is_reported() {
        let (store, remote, engine) = engine();
        let mut task = engine.create_entity().unwrap();
        task.title = "fragile".into();
        store.save(&task).unwrap();

        remote.set_insert_response(Ok(server_row("8", "fragile")));
        store.set_fail_saves(true);

        let (observer, outcomes) = collecting_observer();
        engine.synchronize(observer).unwrap();

        let outcomes = outcomes.lock();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            outcomes[0].error,
            Some(SyncError::Store(StoreError::SaveFailed(_)))
        ));
        // The stored copy still carries the pre-push state.
        assert_eq!(store.get(task.id).unwrap().state, SyncState::Created);
    }

    #[test]
    fn single_entity_insert_pushes_immediately() {
        let (store, remote, engine) = engine();
        remote.set_insert_response(Ok(server_row("11", "direct")));

        let task = Task::new("direct");
        let (observer, outcomes) = collecting_observer();
        engine.insert(task.clone(), observer).unwrap();

        assert_eq!(remote.call_count(), 1);
        assert_eq!(store.get(task.id).unwrap().state, SyncState::Synced);
        assert!(outcomes.lock()[0].is_success());
    }

    #[test]
    fn single_entity_update_of_unpushed_entity_inserts() {
        let (store, remote, engine) = engine();
        remote.set_insert_response(Ok(server_row("12", "still new")));

        let mut task = engine.create_entity().unwrap();
        task.title = "still new".into();

        let (observer, _) = collecting_observer();
        engine.update(task.clone(), observer).unwrap();

        // Created state dominates: the push is an insert, not an update.
        assert_eq!(remote.calls()[0].operation, SyncOperation::Create);
        assert_eq!(store.get(task.id).unwrap().state, SyncState::Synced);
    }

    #[test]
    fn single_entity_delete_routes_by_remote_visibility() {
        let (store, remote, engine) = engine();
        remote.set_delete_response(Ok(()));

        // Never pushed: local removal only.
        let unpushed = engine.create_entity().unwrap();
        let (observer, outcomes) = collecting_observer();
        engine.delete(unpushed, Arc::clone(&observer)).unwrap();
        assert_eq!(remote.call_count(), 0);

        // Remote-visible: pushed as a delete.
        let mut pushed = Task::new("remote");
        pushed.remote_id = Some("21".into());
        pushed.state = SyncState::Synced;
        store.insert(pushed.clone());
        engine.delete(pushed.clone(), observer).unwrap();

        assert_eq!(remote.call_count(), 1);
        assert!(store.get(pushed.id).is_none());
        assert_eq!(outcomes.lock().len(), 2);
    }

    #[test]
    fn stats_track_pass_outcomes() {
        let (store, remote, engine) = engine();
        let mut task = engine.create_entity().unwrap();
        task.title = "counted".into();
        store.save(&task).unwrap();
        remote.set_insert_response(Ok(server_row("30", "counted")));

        let (observer, _) = collecting_observer();
        engine.synchronize(observer).unwrap();

        let stats = engine.stats();
        assert_eq!(stats.passes_completed, 1);
        assert_eq!(stats.pushes_dispatched, 1);
        assert_eq!(stats.pushes_acknowledged, 1);
        assert_eq!(stats.pushes_failed, 0);
    }

    #[test]
    fn read_delegates_without_remote_calls() {
        let (store, remote, engine) = engine();
        for title in ["b", "a"] {
            let mut task = engine.create_entity().unwrap();
            task.title = title.into();
            store.save(&task).unwrap();
        }

        let tasks = engine
            .read(&|_| true, Some(&|a: &Task, b: &Task| a.title.cmp(&b.title)))
            .unwrap();

        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["a", "b"]);
        assert_eq!(remote.call_count(), 0);
    }

    #[test]
    fn read_failure_is_a_discovery_error() {
        let (store, _, engine) = engine();
        store.set_fail_queries(true);

        let result = engine.read(&|_| true, None);
        assert!(matches!(result, Err(SyncError::Discovery(_))));
    }
}

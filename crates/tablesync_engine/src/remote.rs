//! Remote table gateway.

use crate::error::RemoteError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tablesync_core::{Record, SyncOperation};

/// Completion for operations that return the authoritative row.
///
/// Invoked exactly once, from whatever execution context the gateway
/// implementation uses for its responses.
pub type RecordCompletion = Box<dyn FnOnce(Result<Record, RemoteError>) + Send + 'static>;

/// Completion for delete operations (no response body).
pub type DeleteCompletion = Box<dyn FnOnce(Result<(), RemoteError>) + Send + 'static>;

/// The seam to the remote tabular data service.
///
/// Calls are asynchronous relative to the caller: each method issues the
/// request and returns; the completion runs later on an arbitrary
/// execution context chosen by the implementation. Transport,
/// authentication, and wire serialization are the implementation's
/// concern.
///
/// The record's identity key is the join key between the local entity
/// and the remote row; `update` and `delete` require it.
pub trait RemoteTable: Send + Sync {
    /// Inserts a new row. The completion receives the authoritative row,
    /// including the server-assigned identity.
    fn insert(&self, record: Record, completion: RecordCompletion);

    /// Overwrites an existing row. The completion receives the
    /// authoritative row as stored by the server.
    fn update(&self, record: Record, completion: RecordCompletion);

    /// Removes a row.
    fn delete(&self, record: Record, completion: DeleteCompletion);
}

/// One call observed by [`MockRemoteTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    /// The operation that was issued.
    pub operation: SyncOperation,
    /// The record as pushed.
    pub record: Record,
}

/// A scripted remote table for tests.
///
/// Responses are configured per operation and replayed for every call;
/// an operation with no scripted response completes with an error.
/// With threaded delivery enabled, completions run on a spawned thread
/// to exercise the arbitrary-execution-context contract.
#[derive(Default)]
pub struct MockRemoteTable {
    insert_response: Mutex<Option<Result<Record, RemoteError>>>,
    update_response: Mutex<Option<Result<Record, RemoteError>>>,
    delete_response: Mutex<Option<Result<(), RemoteError>>>,
    calls: Mutex<Vec<RemoteCall>>,
    threaded: AtomicBool,
}

impl MockRemoteTable {
    /// Record key checked for the join identity on update/delete.
    pub const ID_KEY: &'static str = "id";

    /// Creates a mock with no scripted responses, delivering inline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the insert response.
    pub fn set_insert_response(&self, response: Result<Record, RemoteError>) {
        *self.insert_response.lock() = Some(response);
    }

    /// Scripts the update response.
    pub fn set_update_response(&self, response: Result<Record, RemoteError>) {
        *self.update_response.lock() = Some(response);
    }

    /// Scripts the delete response.
    pub fn set_delete_response(&self, response: Result<(), RemoteError>) {
        *self.delete_response.lock() = Some(response);
    }

    /// Delivers completions from a spawned thread instead of inline.
    pub fn set_threaded_delivery(&self, threaded: bool) {
        self.threaded.store(threaded, Ordering::SeqCst);
    }

    /// Returns every call observed so far, in issuance order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls observed so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn log(&self, operation: SyncOperation, record: &Record) {
        self.calls.lock().push(RemoteCall {
            operation,
            record: record.clone(),
        });
    }

    fn deliver(&self, completion: impl FnOnce() + Send + 'static) {
        if self.threaded.load(Ordering::SeqCst) {
            std::thread::spawn(completion);
        } else {
            completion();
        }
    }
}

impl RemoteTable for MockRemoteTable {
    fn insert(&self, record: Record, completion: RecordCompletion) {
        self.log(SyncOperation::Create, &record);
        let response = self.insert_response.lock().clone().unwrap_or_else(|| {
            Err(RemoteError::MalformedResponse(
                "no scripted insert response".into(),
            ))
        });
        self.deliver(move || completion(response));
    }

    fn update(&self, record: Record, completion: RecordCompletion) {
        self.log(SyncOperation::Update, &record);
        let response = if record.contains_key(Self::ID_KEY) {
            self.update_response.lock().clone().unwrap_or_else(|| {
                Err(RemoteError::MalformedResponse(
                    "no scripted update response".into(),
                ))
            })
        } else {
            Err(RemoteError::MissingIdentity)
        };
        self.deliver(move || completion(response));
    }

    fn delete(&self, record: Record, completion: DeleteCompletion) {
        self.log(SyncOperation::Delete, &record);
        let response = if record.contains_key(Self::ID_KEY) {
            self.delete_response.lock().clone().unwrap_or_else(|| {
                Err(RemoteError::MalformedResponse(
                    "no scripted delete response".into(),
                ))
            })
        } else {
            Err(RemoteError::MissingIdentity)
        };
        self.deliver(move || completion(response));
    }
}

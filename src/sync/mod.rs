//! Synchronization between the remote document tree and the local cache.
//!
//! Two paths write to the cache:
//!
//! - the write path ([`SyncProfileRepository`], [`SyncRoutineRepository`])
//!   turns one user intent into remote-then-local writes;
//! - the [`SyncEngine`] pulls the whole remote tree and reconciles it into
//!   the cache, treating the remote as the truth.
//!
//! Both deduplicate exercises through the same
//! [`ExerciseRepository::merge_by_name`](crate::db::ExerciseRepository::merge_by_name).

pub mod auto_sync;
pub mod cancel;
pub mod engine;
pub mod error;
pub mod profile_sync;
pub mod reader;
pub mod routine_sync;
pub mod schema;
pub mod writer;

pub use auto_sync::try_auto_sync;
pub use cancel::CancelToken;
pub use engine::{SyncEngine, SyncHandle, SyncReport};
pub use error::SyncError;
pub use profile_sync::SyncProfileRepository;
pub use routine_sync::{ExerciseEntry, SyncRoutineRepository};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::CancelToken;
    use crate::remote::{
        AutomergeDocumentStore, DocPath, Document, DocumentStore, Fields, RemoteError,
    };

    /// In-memory store whose reads or writes can be made to fail, and which
    /// can trip a cancel token while a listing is in flight.
    pub struct FailingStore {
        inner: AutomergeDocumentStore,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        cancel_on_list: Mutex<Option<CancelToken>>,
    }

    impl FailingStore {
        pub fn new() -> Self {
            Self {
                inner: AutomergeDocumentStore::in_memory(),
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
                cancel_on_list: Mutex::new(None),
            }
        }

        pub fn fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        pub fn cancel_on_list(&self, token: CancelToken) {
            *self.cancel_on_list.lock().unwrap() = Some(token);
        }

        fn check(&self, flag: &AtomicBool, path: &DocPath) -> Result<(), RemoteError> {
            if flag.load(Ordering::SeqCst) {
                Err(RemoteError::Status {
                    status: 503,
                    path: path.to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn get(&self, path: &DocPath) -> Result<Option<Document>, RemoteError> {
            self.check(&self.fail_reads, path)?;
            self.inner.get(path).await
        }

        async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), RemoteError> {
            self.check(&self.fail_writes, path)?;
            self.inner.set(path, fields).await
        }

        async fn add(&self, collection: &DocPath, fields: Fields) -> Result<String, RemoteError> {
            self.check(&self.fail_writes, collection)?;
            self.inner.add(collection, fields).await
        }

        async fn delete(&self, path: &DocPath) -> Result<(), RemoteError> {
            self.check(&self.fail_writes, path)?;
            self.inner.delete(path).await
        }

        async fn list_children(&self, collection: &DocPath) -> Result<Vec<Document>, RemoteError> {
            self.check(&self.fail_reads, collection)?;
            let token = self.cancel_on_list.lock().unwrap().take();
            if let Some(token) = token {
                token.cancel();
            }
            self.inner.list_children(collection).await
        }
    }
}

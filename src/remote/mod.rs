//! Remote document client.
//!
//! The remote store is a schema-less tree of collections and documents,
//! addressed by [`DocPath`]. Two backends implement [`DocumentStore`]: an
//! Automerge document kept on disk (or in memory) and a REST document API.

mod automerge_store;
mod error;
mod http_store;
mod path;

pub use automerge_store::AutomergeDocumentStore;
pub use error::RemoteError;
pub use http_store::HttpDocumentStore;
pub use path::{DocPath, UserScope};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Field map of a remote document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A document as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Asynchronous access to the remote document tree.
///
/// Every call may fail with a transport error; callers are expected to
/// surface it rather than retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document, or `None` if it does not exist.
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, RemoteError>;

    /// Creates or fully replaces the fields of a document.
    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), RemoteError>;

    /// Adds a document to a collection and returns the identifier the store
    /// assigned to it.
    async fn add(&self, collection: &DocPath, fields: Fields) -> Result<String, RemoteError>;

    /// Deletes a document. Deleting a missing document succeeds.
    async fn delete(&self, path: &DocPath) -> Result<(), RemoteError>;

    /// Lists the documents of a collection.
    async fn list_children(&self, collection: &DocPath) -> Result<Vec<Document>, RemoteError>;
}

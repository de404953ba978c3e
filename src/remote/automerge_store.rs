//! Document store backed by a single Automerge document.
//!
//! The whole remote tree lives in one document:
//!
//! ```text
//! ROOT
//! └── users                     (collection: map of document id -> node)
//!     └── {uid}                 (node)
//!         ├── fields            (map of document fields)
//!         └── collections
//!             └── routines      (collection)
//!                 └── {rid}     (node)
//! ```
//!
//! Used as the offline backend and as the remote stand-in in tests.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use automerge::{
    transaction::Transactable, AutoCommit, ObjId, ObjType, ReadDoc, ScalarValue, Value, ROOT,
};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{DocPath, Document, DocumentStore, Fields, RemoteError};

const FIELDS: &str = "fields";
const COLLECTIONS: &str = "collections";

pub struct AutomergeDocumentStore {
    doc: Mutex<AutoCommit>,
    path: Option<PathBuf>,
    /// Snapshot counter, bumped under the document lock.
    snapshots: AtomicU64,
    /// Counter of the snapshot last written to `path`.
    saved: Mutex<u64>,
}

/// Serialized document taken under the lock, written after it is released.
struct Snapshot {
    seq: u64,
    bytes: Vec<u8>,
}

impl AutomergeDocumentStore {
    /// A store that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            doc: Mutex::new(AutoCommit::new()),
            path: None,
            snapshots: AtomicU64::new(0),
            saved: Mutex::new(0),
        }
    }

    /// Opens the store persisted at `path`, starting empty if the file does
    /// not exist yet. Every write is saved back to the file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RemoteError> {
        let path = path.into();
        let doc = match fs::read(&path) {
            Ok(bytes) => AutoCommit::load(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => AutoCommit::new(),
            Err(e) => return Err(RemoteError::Io { path, source: e }),
        };
        Ok(Self {
            doc: Mutex::new(doc),
            path: Some(path),
            snapshots: AtomicU64::new(0),
            saved: Mutex::new(0),
        })
    }

    fn snapshot(&self, doc: &mut AutoCommit) -> Option<Snapshot> {
        if self.path.is_none() {
            return None;
        }
        Some(Snapshot {
            seq: self.snapshots.fetch_add(1, Ordering::SeqCst) + 1,
            bytes: doc.save(),
        })
    }

    async fn persist(&self, snapshot: Option<Snapshot>) -> Result<(), RemoteError> {
        let (Some(path), Some(snapshot)) = (&self.path, snapshot) else {
            return Ok(());
        };
        let mut saved = self.saved.lock().await;
        // A later snapshot already reached the file.
        if snapshot.seq < *saved {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RemoteError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::write(path, snapshot.bytes)
            .await
            .map_err(|e| RemoteError::Io {
                path: path.clone(),
                source: e,
            })?;
        *saved = snapshot.seq;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for AutomergeDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, RemoteError> {
        path.expect_document()?;
        let doc = self.doc.lock().await;
        match lookup(&doc, path)? {
            Some(node) => read_document(&doc, &node, path.last()),
            None => Ok(None),
        }
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), RemoteError> {
        path.expect_document()?;
        let snapshot = {
            let mut doc = self.doc.lock().await;
            let node = ensure(&mut doc, path)?;
            let fields_obj = doc.put_object(&node, FIELDS, ObjType::Map)?;
            for (key, value) in &fields {
                put_json(&mut doc, &fields_obj, key, value)?;
            }
            self.snapshot(&mut doc)
        };
        self.persist(snapshot).await
    }

    async fn add(&self, collection: &DocPath, fields: Fields) -> Result<String, RemoteError> {
        collection.expect_collection()?;
        let id = Uuid::new_v4().simple().to_string();
        self.set(&collection.child(&id), fields).await?;
        Ok(id)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), RemoteError> {
        path.expect_document()?;
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        let snapshot = {
            let mut doc = self.doc.lock().await;
            let Some(collection) = lookup(&doc, &parent)? else {
                return Ok(());
            };
            if doc.get(&collection, path.last())?.is_none() {
                return Ok(());
            }
            // Removing the node drops its nested collections with it.
            doc.delete(&collection, path.last())?;
            self.snapshot(&mut doc)
        };
        self.persist(snapshot).await
    }

    async fn list_children(&self, collection: &DocPath) -> Result<Vec<Document>, RemoteError> {
        collection.expect_collection()?;
        let doc = self.doc.lock().await;
        let Some(collection_obj) = lookup(&doc, collection)? else {
            return Ok(Vec::new());
        };

        let ids: Vec<String> = doc.keys(&collection_obj).collect();
        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = child_map(&doc, &collection_obj, &id)? {
                if let Some(document) = read_document(&doc, &node, &id)? {
                    documents.push(document);
                }
            }
        }
        Ok(documents)
    }
}

fn child_map(doc: &AutoCommit, parent: &ObjId, key: &str) -> Result<Option<ObjId>, RemoteError> {
    match doc.get(parent, key)? {
        Some((Value::Object(ObjType::Map), id)) => Ok(Some(id)),
        _ => Ok(None),
    }
}

fn ensure_map(doc: &mut AutoCommit, parent: &ObjId, key: &str) -> Result<ObjId, RemoteError> {
    if let Some(id) = child_map(doc, parent, key)? {
        return Ok(id);
    }
    Ok(doc.put_object(parent, key, ObjType::Map)?)
}

/// Resolves the map a path points at: a collection map or a document node.
fn lookup(doc: &AutoCommit, path: &DocPath) -> Result<Option<ObjId>, RemoteError> {
    let mut current = ROOT;
    for (i, segment) in path.segments().iter().enumerate() {
        if i > 0 && i % 2 == 0 {
            current = match child_map(doc, &current, COLLECTIONS)? {
                Some(id) => id,
                None => return Ok(None),
            };
        }
        current = match child_map(doc, &current, segment)? {
            Some(id) => id,
            None => return Ok(None),
        };
    }
    Ok(Some(current))
}

fn ensure(doc: &mut AutoCommit, path: &DocPath) -> Result<ObjId, RemoteError> {
    let mut current = ROOT;
    for (i, segment) in path.segments().iter().enumerate() {
        if i > 0 && i % 2 == 0 {
            current = ensure_map(doc, &current, COLLECTIONS)?;
        }
        current = ensure_map(doc, &current, segment)?;
    }
    Ok(current)
}

/// Reads a document node. Nodes that only exist as parents of nested
/// collections have no fields and are reported as missing.
fn read_document(
    doc: &AutoCommit,
    node: &ObjId,
    id: &str,
) -> Result<Option<Document>, RemoteError> {
    match child_map(doc, node, FIELDS)? {
        Some(fields) => Ok(Some(Document::new(id, read_map(doc, &fields)?))),
        None => Ok(None),
    }
}

fn read_map(doc: &AutoCommit, obj: &ObjId) -> Result<Fields, RemoteError> {
    let mut map = Fields::new();
    let keys: Vec<String> = doc.keys(obj).collect();
    for key in keys {
        if let Some((value, id)) = doc.get(obj, key.as_str())? {
            map.insert(key, read_value(doc, value, &id)?);
        }
    }
    Ok(map)
}

fn read_value(doc: &AutoCommit, value: Value<'_>, id: &ObjId) -> Result<JsonValue, RemoteError> {
    match value {
        Value::Object(ObjType::List) => {
            let mut items = Vec::with_capacity(doc.length(id));
            for index in 0..doc.length(id) {
                if let Some((item, item_id)) = doc.get(id, index)? {
                    items.push(read_value(doc, item, &item_id)?);
                }
            }
            Ok(JsonValue::Array(items))
        }
        Value::Object(ObjType::Text) => Ok(JsonValue::String(doc.text(id)?)),
        Value::Object(_) => Ok(JsonValue::Object(read_map(doc, id)?)),
        Value::Scalar(scalar) => Ok(scalar_to_json(&scalar)),
    }
}

fn scalar_to_json(scalar: &ScalarValue) -> JsonValue {
    match scalar {
        ScalarValue::Str(s) => JsonValue::String(s.to_string()),
        ScalarValue::Int(i) => JsonValue::from(*i),
        ScalarValue::Uint(u) => JsonValue::from(*u),
        ScalarValue::F64(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ScalarValue::Boolean(b) => JsonValue::Bool(*b),
        ScalarValue::Timestamp(t) => JsonValue::from(*t),
        _ => JsonValue::Null,
    }
}

fn json_to_scalar(value: &JsonValue) -> ScalarValue {
    match value {
        JsonValue::Bool(b) => ScalarValue::Boolean(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                ScalarValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                ScalarValue::Uint(u)
            } else {
                ScalarValue::F64(n.as_f64().unwrap_or_default())
            }
        }
        JsonValue::String(s) => ScalarValue::from(s.as_str()),
        _ => ScalarValue::Null,
    }
}

fn put_json(
    doc: &mut AutoCommit,
    obj: &ObjId,
    key: &str,
    value: &JsonValue,
) -> Result<(), RemoteError> {
    match value {
        JsonValue::Object(map) => {
            let child = doc.put_object(obj, key, ObjType::Map)?;
            for (k, v) in map {
                put_json(doc, &child, k, v)?;
            }
        }
        JsonValue::Array(items) => {
            let list = doc.put_object(obj, key, ObjType::List)?;
            for (index, item) in items.iter().enumerate() {
                insert_json(doc, &list, index, item)?;
            }
        }
        scalar => doc.put(obj, key, json_to_scalar(scalar))?,
    }
    Ok(())
}

fn insert_json(
    doc: &mut AutoCommit,
    list: &ObjId,
    index: usize,
    value: &JsonValue,
) -> Result<(), RemoteError> {
    match value {
        JsonValue::Object(map) => {
            let child = doc.insert_object(list, index, ObjType::Map)?;
            for (k, v) in map {
                put_json(doc, &child, k, v)?;
            }
        }
        JsonValue::Array(items) => {
            let nested = doc.insert_object(list, index, ObjType::List)?;
            for (i, item) in items.iter().enumerate() {
                insert_json(doc, &nested, i, item)?;
            }
        }
        scalar => doc.insert(list, index, json_to_scalar(scalar))?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::UserScope;
    use serde_json::json;
    use tempfile::TempDir;

    fn fields(value: JsonValue) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = AutomergeDocumentStore::in_memory();
        let path = UserScope::new("u1").profile();

        store
            .set(
                &path,
                fields(json!({"name": "Ana", "age": 30, "weight": 61.5, "photo_url": null})),
            )
            .await
            .unwrap();

        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.id, "u1");
        assert_eq!(doc.fields["name"], json!("Ana"));
        assert_eq!(doc.fields["age"], json!(30));
        assert_eq!(doc.fields["weight"], json!(61.5));
        assert_eq!(doc.fields["photo_url"], JsonValue::Null);
    }

    #[tokio::test]
    async fn test_set_replaces_all_fields() {
        let store = AutomergeDocumentStore::in_memory();
        let path = UserScope::new("u1").progress("r1");

        store
            .set(&path, fields(json!({"total_duration": 10.0, "extra": true})))
            .await
            .unwrap();
        store
            .set(
                &path,
                fields(json!({"total_duration": 12.5, "completed_exercises": [1, 2]})),
            )
            .await
            .unwrap();

        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.fields["total_duration"], json!(12.5));
        assert_eq!(doc.fields["completed_exercises"], json!([1, 2]));
        assert!(!doc.fields.contains_key("extra"));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = AutomergeDocumentStore::in_memory();
        let scope = UserScope::new("u1");
        assert!(store.get(&scope.profile()).await.unwrap().is_none());

        // A routine under a profile that was never set leaves the profile
        // node without fields.
        store
            .set(&scope.routine("r1"), fields(json!({"name": "Push"})))
            .await
            .unwrap();
        assert!(store.get(&scope.profile()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_and_list_children() {
        let store = AutomergeDocumentStore::in_memory();
        let scope = UserScope::new("u1");

        let a = store
            .add(&scope.routines(), fields(json!({"name": "Push"})))
            .await
            .unwrap();
        let b = store
            .add(&scope.routines(), fields(json!({"name": "Pull"})))
            .await
            .unwrap();
        assert_ne!(a, b);

        let docs = store.list_children(&scope.routines()).await.unwrap();
        assert_eq!(docs.len(), 2);
        let names: Vec<&str> = docs
            .iter()
            .map(|d| d.fields["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"Push"));
        assert!(names.contains(&"Pull"));

        assert!(store
            .list_children(&scope.exercises(&a))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_nested_collections() {
        let store = AutomergeDocumentStore::in_memory();
        let scope = UserScope::new("u1");

        let rid = store
            .add(&scope.routines(), fields(json!({"name": "Legs"})))
            .await
            .unwrap();
        store
            .add(&scope.exercises(&rid), fields(json!({"name": "Squat"})))
            .await
            .unwrap();

        store.delete(&scope.routine(&rid)).await.unwrap();

        assert!(store.get(&scope.routine(&rid)).await.unwrap().is_none());
        assert!(store
            .list_children(&scope.exercises(&rid))
            .await
            .unwrap()
            .is_empty());
        // Deleting again is fine.
        store.delete(&scope.routine(&rid)).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_wrong_path_kind() {
        let store = AutomergeDocumentStore::in_memory();
        let scope = UserScope::new("u1");

        assert!(matches!(
            store.get(&scope.routines()).await,
            Err(RemoteError::InvalidPath(_))
        ));
        assert!(matches!(
            store.add(&scope.profile(), Fields::new()).await,
            Err(RemoteError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_persists_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("remote").join("tree.automerge");
        let scope = UserScope::new("u1");

        let rid = {
            let store = AutomergeDocumentStore::open(&file).unwrap();
            store
                .add(&scope.routines(), fields(json!({"name": "Core"})))
                .await
                .unwrap()
        };

        let reopened = AutomergeDocumentStore::open(&file).unwrap();
        let doc = reopened.get(&scope.routine(&rid)).await.unwrap().unwrap();
        assert_eq!(doc.fields["name"], json!("Core"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_all_reach_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("tree.automerge");
        let scope = UserScope::new("u1");
        let store = std::sync::Arc::new(AutomergeDocumentStore::open(&file).unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let routines = scope.routines();
            handles.push(tokio::spawn(async move {
                store
                    .add(&routines, fields(json!({"name": format!("R{}", i)})))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reopened = AutomergeDocumentStore::open(&file).unwrap();
        let children = reopened.list_children(&scope.routines()).await.unwrap();
        assert_eq!(children.len(), 16);
    }
}

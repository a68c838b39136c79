//! Document store access.
//!
//! Records live in collections of JSON documents grouped by database. The
//! [`DocumentStore`] trait covers the two calls the pipeline makes:
//! `find` for ingestion and `insert_many` for pushing raw data.
//!
//! Two backends are provided:
//!
//! - [`MemoryStore`] (`memory://`), process-local, mostly for tests.
//! - [`JsonFileStore`] (`file://<root>`), one JSON-lines file per
//!   collection at `<root>/<database>/<collection>.jsonl`.
//!
//! Documents are keyed by `_id`. A document inserted without one gets a
//! fresh UUID. Inserts are unordered: every non-duplicate document of a
//! batch is stored even when some are rejected, and the rejection reports
//! how many went in.

pub mod push;

pub use push::{NetworkDataHandler, RetryPolicy};

use crate::dataset::Document;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Key field of every stored document.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unsupported store URI: {0}")]
    InvalidUri(String),

    #[error("store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt document at {path}:{line}: {source}")]
    CorruptDocument {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{duplicates} duplicate key(s) rejected, {inserted} document(s) inserted")]
    DuplicateKey { inserted: usize, duplicates: usize },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("collection {database}.{collection} is empty")]
    EmptyCollection { database: String, collection: String },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A document database.
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Documents whose fields equal every field of `query`. An empty query
    /// matches everything. Results keep insertion order.
    fn find(&self, database: &str, collection: &str, query: &Document)
        -> Result<Vec<Document>, StoreError>;

    /// Insert `docs`, returning how many were stored.
    ///
    /// Fails with [`StoreError::DuplicateKey`] when any `_id` already exists;
    /// the other documents are still stored.
    fn insert_many(&self, database: &str, collection: &str, docs: &[Document])
        -> Result<usize, StoreError>;
}

fn matches_query(doc: &Document, query: &Document) -> bool {
    query.iter().all(|(k, v)| doc.get(k) == Some(v))
}

fn id_key(doc: &Document) -> Option<String> {
    doc.get(ID_FIELD).map(|id| match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn with_id(doc: &Document) -> Document {
    let mut doc = doc.clone();
    if !doc.contains_key(ID_FIELD) {
        doc.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    doc
}

/// Split a batch into documents to store and a duplicate count, given the
/// ids already present. Ids repeated within the batch are duplicates too.
fn partition_batch(existing: &mut HashSet<String>, docs: &[Document]) -> (Vec<Document>, usize) {
    let mut accepted = Vec::with_capacity(docs.len());
    let mut duplicates = 0;
    for doc in docs {
        let doc = with_id(doc);
        match id_key(&doc) {
            Some(id) if existing.contains(&id) => duplicates += 1,
            Some(id) => {
                existing.insert(id);
                accepted.push(doc);
            }
            None => accepted.push(doc),
        }
    }
    (accepted, duplicates)
}

fn insert_outcome(inserted: usize, duplicates: usize) -> Result<usize, StoreError> {
    if duplicates > 0 {
        Err(StoreError::DuplicateKey {
            inserted,
            duplicates,
        })
    } else {
        Ok(inserted)
    }
}

#[derive(Debug, Default)]
struct MemoryCollection {
    ids: HashSet<String>,
    docs: Vec<Document>,
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<(String, String), MemoryCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("store lock poisoned".to_string())
}

impl DocumentStore for MemoryStore {
    fn find(&self, database: &str, collection: &str, query: &Document)
        -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().map_err(poisoned)?;
        let key = (database.to_string(), collection.to_string());
        Ok(collections
            .get(&key)
            .map(|c| c.docs.iter().filter(|d| matches_query(d, query)).cloned().collect())
            .unwrap_or_default())
    }

    fn insert_many(&self, database: &str, collection: &str, docs: &[Document])
        -> Result<usize, StoreError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let target = collections
            .entry((database.to_string(), collection.to_string()))
            .or_default();
        let (accepted, duplicates) = partition_batch(&mut target.ids, docs);
        let inserted = accepted.len();
        target.docs.extend(accepted);
        insert_outcome(inserted, duplicates)
    }
}

/// Store backed by JSON-lines files under a root directory.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_path(&self, database: &str, collection: &str) -> PathBuf {
        self.root.join(database).join(format!("{collection}.jsonl"))
    }

    fn read_all(&self, path: &Path) -> Result<Vec<Document>, StoreError> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        let mut docs = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| StoreError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let doc = serde_json::from_str(&line).map_err(|source| StoreError::CorruptDocument {
                path: path.to_path_buf(),
                line: i + 1,
                source,
            })?;
            docs.push(doc);
        }
        Ok(docs)
    }
}

impl DocumentStore for JsonFileStore {
    fn find(&self, database: &str, collection: &str, query: &Document)
        -> Result<Vec<Document>, StoreError> {
        let _guard = self.lock.read().map_err(poisoned)?;
        let path = self.collection_path(database, collection);
        let mut docs = self.read_all(&path)?;
        docs.retain(|d| matches_query(d, query));
        debug!(path = %path.display(), matched = docs.len(), "find");
        Ok(docs)
    }

    fn insert_many(&self, database: &str, collection: &str, docs: &[Document])
        -> Result<usize, StoreError> {
        let _guard = self.lock.write().map_err(poisoned)?;
        let path = self.collection_path(database, collection);
        let mut ids: HashSet<String> = self.read_all(&path)?.iter().filter_map(id_key).collect();
        let (accepted, duplicates) = partition_batch(&mut ids, docs);

        if !accepted.is_empty() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
            let mut buf = Vec::new();
            for doc in &accepted {
                serde_json::to_writer(&mut buf, doc)?;
                buf.push(b'\n');
            }
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| StoreError::io(&path, e))?;
            file.write_all(&buf).map_err(|e| StoreError::io(&path, e))?;
        }
        insert_outcome(accepted.len(), duplicates)
    }
}

/// Open the store named by `uri`: `memory://` or `file://<root>`.
pub fn open_store(uri: &str) -> Result<Box<dyn DocumentStore>, StoreError> {
    if uri == "memory://" {
        Ok(Box::new(MemoryStore::new()))
    } else if let Some(root) = uri.strip_prefix("file://").filter(|r| !r.is_empty()) {
        Ok(Box::new(JsonFileStore::new(root)))
    } else {
        Err(StoreError::InvalidUri(uri.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn exercise(store: &dyn DocumentStore) {
        let docs = vec![
            doc(json!({"_id": "a", "proto": "tcp", "bytes": 10})),
            doc(json!({"_id": "b", "proto": "udp", "bytes": 20})),
            doc(json!({"proto": "tcp", "bytes": 30})),
        ];
        assert_eq!(store.insert_many("net", "flows", &docs).unwrap(), 3);

        let all = store.find("net", "flows", &Document::new()).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|d| d.contains_key(ID_FIELD)));

        let tcp = store.find("net", "flows", &doc(json!({"proto": "tcp"}))).unwrap();
        assert_eq!(tcp.len(), 2);
        assert_eq!(tcp[1]["bytes"], json!(30));

        let again = vec![
            doc(json!({"_id": "a", "proto": "icmp"})),
            doc(json!({"_id": "c", "proto": "icmp"})),
        ];
        match store.insert_many("net", "flows", &again) {
            Err(StoreError::DuplicateKey { inserted, duplicates }) => {
                assert_eq!(inserted, 1);
                assert_eq!(duplicates, 1);
            }
            other => panic!("expected duplicate key, got {other:?}"),
        }
        assert_eq!(store.find("net", "flows", &Document::new()).unwrap().len(), 4);
        assert!(store.find("net", "other", &Document::new()).unwrap().is_empty());
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        exercise(&store);
        assert!(store.collection_path("net", "flows").exists());

        let reopened = JsonFileStore::new(dir.path());
        assert_eq!(reopened.find("net", "flows", &Document::new()).unwrap().len(), 4);
    }

    #[test]
    fn test_duplicates_within_batch() {
        let store = MemoryStore::new();
        let docs = vec![doc(json!({"_id": 1})), doc(json!({"_id": 1}))];
        assert!(matches!(
            store.insert_many("db", "c", &docs),
            Err(StoreError::DuplicateKey { inserted: 1, duplicates: 1 })
        ));
    }

    #[test]
    fn test_partition_batch_records_new_ids() {
        let mut existing: HashSet<String> = ["a".to_string()].into_iter().collect();
        let docs = vec![
            doc(json!({"_id": "a"})),
            doc(json!({"_id": "b"})),
            doc(json!({"_id": "b"})),
            doc(json!({"flow": 1})),
        ];
        let (accepted, duplicates) = partition_batch(&mut existing, &docs);
        assert_eq!(duplicates, 2);
        assert_eq!(accepted.len(), 2);
        assert!(existing.contains("b"));
        assert_eq!(existing.len(), 3);
        assert!(accepted.iter().all(|d| d.contains_key(ID_FIELD)));
    }

    #[test]
    fn test_corrupt_line_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let path = store.collection_path("db", "c");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{\"_id\": 1}\nnot json\n").unwrap();
        assert!(matches!(
            store.find("db", "c", &Document::new()),
            Err(StoreError::CorruptDocument { line: 2, .. })
        ));
    }

    #[test]
    fn test_open_store_uris() {
        assert!(open_store("memory://").is_ok());
        assert!(open_store("file:///tmp/netsentry").is_ok());
        assert!(matches!(open_store("file://"), Err(StoreError::InvalidUri(_))));
        assert!(matches!(
            open_store("mongodb+srv://cluster"),
            Err(StoreError::InvalidUri(_))
        ));
    }
}

//! Test helpers for end-to-end validation

use anyhow::Result;
use docstore_validate::store::{Cursor, IndexRead, VecCursor};
use docstore_validate::{DocumentStore, Document, IndexInfo, Namespace, SnapshotStore};
use serde_json::{json, Value};

pub const DATABASE: &str = "test";

/// A snapshot entry for one stored document
pub fn stored(file: i64, offset: i64, doc: Value) -> Value {
    json!({"loc": {"file": file, "offset": offset}, "doc": doc})
}

/// An explicit index entry
pub fn entry(key: Value, file: i64, offset: i64) -> Value {
    json!({"key": key, "loc": {"file": file, "offset": offset}})
}

/// Store with one database holding `collections`
pub fn store_with(collections: Value) -> SnapshotStore {
    SnapshotStore::from_value(json!({
        "databases": [{"name": DATABASE, "collections": collections}]
    }))
    .expect("test snapshot should load")
}

/// The two-document collection with a non-unique index on `a`
pub fn orders(index_entries: Option<Value>) -> Value {
    let mut index = json!({"name": "a_1", "key": {"a": 1}});
    if let Some(entries) = index_entries {
        index["entries"] = entries;
    }
    json!({
        "name": "orders",
        "documents": [
            stored(0, 10, json!({"_id": 1, "a": 5})),
            stored(0, 20, json!({"_id": 2, "a": 5}))
        ],
        "indexes": [index]
    })
}

pub fn ns(collection: &str) -> Namespace {
    Namespace::new(DATABASE, collection)
}

pub fn index_named(store: &dyn DocumentStore, ns: &Namespace, name: &str) -> IndexInfo {
    store
        .indexes(ns)
        .unwrap()
        .into_iter()
        .find(|index| index.name == name)
        .expect("index should exist")
}

/// Misbehaviour injected into one collection's reads
#[derive(Debug, Clone)]
pub enum Fault {
    /// The natural-order read drops `$diskLoc` from the document with this `_id`
    StripLocation { id: i64 },
    /// The index location read ends one record early
    ShortLocationRead,
    /// Every index read fails on its first record
    BrokenIndexCursor,
}

/// Wraps a snapshot and injects a fault into reads of one collection
pub struct FaultyStore {
    pub inner: SnapshotStore,
    pub collection: String,
    pub fault: Fault,
}

impl FaultyStore {
    pub fn new(inner: SnapshotStore, collection: &str, fault: Fault) -> Self {
        Self {
            inner,
            collection: collection.to_string(),
            fault,
        }
    }

    fn targets(&self, ns: &Namespace) -> bool {
        ns.collection == self.collection
    }
}

fn drain(mut cursor: Box<dyn Cursor>) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    while let Some(doc) = cursor.next()? {
        docs.push(doc);
    }
    cursor.close()?;
    Ok(docs)
}

struct BrokenCursor;

impl Cursor for BrokenCursor {
    fn next(&mut self) -> Result<Option<Document>> {
        anyhow::bail!("connection reset by peer")
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl DocumentStore for FaultyStore {
    fn database_names(&self) -> Result<Vec<String>> {
        self.inner.database_names()
    }

    fn collection_names(&self, database: &str) -> Result<Vec<String>> {
        self.inner.collection_names(database)
    }

    fn indexes(&self, ns: &Namespace) -> Result<Vec<IndexInfo>> {
        self.inner.indexes(ns)
    }

    fn natural_scan(&self, ns: &Namespace) -> Result<Box<dyn Cursor>> {
        let cursor = self.inner.natural_scan(ns)?;
        match (&self.fault, self.targets(ns)) {
            (Fault::StripLocation { id }, true) => {
                let mut docs = drain(cursor)?;
                for doc in &mut docs {
                    if doc.get("_id") == Some(&Value::from(*id)) {
                        doc.remove("$diskLoc");
                    }
                }
                Ok(Box::new(VecCursor::new(docs)))
            }
            _ => Ok(cursor),
        }
    }

    fn full_scan(&self, ns: &Namespace) -> Result<Box<dyn Cursor>> {
        self.inner.full_scan(ns)
    }

    fn index_scan(
        &self,
        ns: &Namespace,
        index: &IndexInfo,
        read: IndexRead,
    ) -> Result<Box<dyn Cursor>> {
        if !self.targets(ns) {
            return self.inner.index_scan(ns, index, read);
        }
        match (&self.fault, read) {
            (Fault::ShortLocationRead, IndexRead::ShowDiskLoc) => {
                let mut docs = drain(self.inner.index_scan(ns, index, read)?)?;
                docs.pop();
                Ok(Box::new(VecCursor::new(docs)))
            }
            (Fault::BrokenIndexCursor, _) => Ok(Box::new(BrokenCursor)),
            _ => self.inner.index_scan(ns, index, read),
        }
    }
}

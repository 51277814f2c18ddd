//! File-backed document store
//!
//! Loads a JSON dump of a store: databases, collections with their documents
//! in natural order (each with its physical location), and indexes. An index
//! may list its entries explicitly, which is how a diverged index is
//! represented; an index without entries is derived from the documents.
//!
//! ```json
//! { "databases": [ { "name": "shop", "collections": [ {
//!     "name": "orders",
//!     "documents": [ { "loc": {"file": 0, "offset": 10}, "doc": {"_id": 1, "a": 5} } ],
//!     "indexes": [ { "name": "a_1", "key": {"a": 1},
//!                    "entries": [ { "key": {"a": 5}, "loc": {"file": 0, "offset": 10} } ] } ]
//! } ] } ] }
//! ```

use crate::document::{compare_values, DiskLoc, Document};
use crate::index_spec::{IndexKeySpec, KeyDirection};
use crate::store::{Cursor, DocumentStore, IndexInfo, IndexRead, Namespace, VecCursor};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;

/// On-disk snapshot layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub databases: Vec<DatabaseSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub name: String,
    #[serde(default)]
    pub collections: Vec<CollectionSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub name: String,
    /// Natural (storage) order
    #[serde(default)]
    pub documents: Vec<StoredDocument>,
    #[serde(default)]
    pub indexes: Vec<IndexSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub loc: DiskLoc,
    pub doc: Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub name: String,
    /// Key document, e.g. `{"a": 1, "b": -1}`
    pub key: Value,
    /// Explicit entries; derived from the documents when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<IndexEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub key: Document,
    pub loc: DiskLoc,
}

struct IndexState {
    info: IndexInfo,
    /// Sorted in index order
    entries: Vec<IndexEntry>,
}

struct CollectionState {
    name: String,
    documents: Vec<StoredDocument>,
    by_loc: FxHashMap<DiskLoc, usize>,
    indexes: Vec<IndexState>,
}

struct DatabaseState {
    name: String,
    collections: Vec<CollectionState>,
}

/// In-memory store loaded from a snapshot
pub struct SnapshotStore {
    databases: Vec<DatabaseState>,
}

impl SnapshotStore {
    /// Load a snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("Invalid snapshot: {}", path.display()))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let file: SnapshotFile =
            serde_json::from_str(data).context("Failed to deserialize snapshot")?;
        Self::from_snapshot(file)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let file: SnapshotFile =
            serde_json::from_value(value).context("Failed to deserialize snapshot")?;
        Self::from_snapshot(file)
    }

    pub fn from_snapshot(file: SnapshotFile) -> Result<Self> {
        let mut databases: Vec<DatabaseState> = Vec::with_capacity(file.databases.len());
        for db in file.databases {
            if databases.iter().any(|existing| existing.name == db.name) {
                anyhow::bail!("Database '{}' appears twice in snapshot", db.name);
            }
            let mut collections: Vec<CollectionState> = Vec::with_capacity(db.collections.len());
            for coll in db.collections {
                if collections.iter().any(|existing| existing.name == coll.name) {
                    anyhow::bail!("Collection '{}.{}' appears twice in snapshot", db.name, coll.name);
                }
                let state = load_collection(coll)
                    .with_context(|| format!("Failed to load collection in database '{}'", db.name))?;
                collections.push(state);
            }
            databases.push(DatabaseState {
                name: db.name,
                collections,
            });
        }
        Ok(Self { databases })
    }

    fn collection(&self, ns: &Namespace) -> Result<&CollectionState> {
        self.databases
            .iter()
            .find(|db| db.name == ns.database)
            .and_then(|db| db.collections.iter().find(|c| c.name == ns.collection))
            .with_context(|| format!("Unknown collection '{}'", ns))
    }
}

fn load_collection(coll: CollectionSnapshot) -> Result<CollectionState> {
    let mut by_loc = FxHashMap::default();
    for (position, stored) in coll.documents.iter().enumerate() {
        if by_loc.insert(stored.loc, position).is_some() {
            anyhow::bail!(
                "Two documents in '{}' share location {}",
                coll.name,
                stored.loc
            );
        }
    }

    let mut indexes: Vec<IndexState> = Vec::with_capacity(coll.indexes.len());
    for index in coll.indexes {
        if indexes.iter().any(|existing| existing.info.name == index.name) {
            anyhow::bail!("Index '{}' appears twice on '{}'", index.name, coll.name);
        }
        let key = IndexKeySpec::from_key_document(&index.key)
            .with_context(|| format!("Index '{}' on '{}' has an invalid key", index.name, coll.name))?;
        let mut entries = match index.entries {
            Some(entries) => entries,
            None => coll
                .documents
                .iter()
                .map(|stored| IndexEntry {
                    key: stored.doc.project(key.field_names()),
                    loc: stored.loc,
                })
                .collect(),
        };
        entries.sort_by(|a, b| compare_entries(&key, a, b));
        indexes.push(IndexState {
            info: IndexInfo::new(index.name, key),
            entries,
        });
    }

    Ok(CollectionState {
        name: coll.name,
        documents: coll.documents,
        by_loc,
        indexes,
    })
}

/// Index order: key fields in turn, honoring direction, then location
fn compare_entries(key: &IndexKeySpec, a: &IndexEntry, b: &IndexEntry) -> Ordering {
    for field in key.fields() {
        let ord = compare_values(a.key.get_path(&field.name), b.key.get_path(&field.name));
        let ord = match field.direction {
            KeyDirection::Descending => ord.reverse(),
            KeyDirection::Ascending | KeyDirection::Special(_) => ord,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.loc.cmp(&b.loc)
}

impl DocumentStore for SnapshotStore {
    fn database_names(&self) -> Result<Vec<String>> {
        Ok(self.databases.iter().map(|db| db.name.clone()).collect())
    }

    fn collection_names(&self, database: &str) -> Result<Vec<String>> {
        let db = self
            .databases
            .iter()
            .find(|db| db.name == database)
            .with_context(|| format!("Unknown database '{}'", database))?;
        Ok(db.collections.iter().map(|c| c.name.clone()).collect())
    }

    fn indexes(&self, ns: &Namespace) -> Result<Vec<IndexInfo>> {
        let coll = self.collection(ns)?;
        Ok(coll.indexes.iter().map(|index| index.info.clone()).collect())
    }

    fn natural_scan(&self, ns: &Namespace) -> Result<Box<dyn Cursor>> {
        let coll = self.collection(ns)?;
        let docs = coll
            .documents
            .iter()
            .map(|stored| {
                let mut doc = stored.doc.clone();
                doc.set_disk_loc(stored.loc);
                doc
            })
            .collect();
        Ok(Box::new(VecCursor::new(docs)))
    }

    fn full_scan(&self, ns: &Namespace) -> Result<Box<dyn Cursor>> {
        let coll = self.collection(ns)?;
        let docs = coll.documents.iter().map(|stored| stored.doc.clone()).collect();
        Ok(Box::new(VecCursor::new(docs)))
    }

    fn index_scan(
        &self,
        ns: &Namespace,
        index: &IndexInfo,
        read: IndexRead,
    ) -> Result<Box<dyn Cursor>> {
        let coll = self.collection(ns)?;
        let state = coll
            .indexes
            .iter()
            .find(|candidate| candidate.info.name == index.name)
            .with_context(|| format!("Unknown index '{}' on '{}'", index.name, ns))?;
        let key = &state.info.key;

        let docs = match read {
            IndexRead::ReturnKey => state
                .entries
                .iter()
                .map(|entry| entry.key.project(key.field_names()))
                .collect(),
            IndexRead::ShowDiskLoc => state
                .entries
                .iter()
                .map(|entry| {
                    // A dangling entry has no document; the key stands in for it
                    let mut doc = match coll.by_loc.get(&entry.loc) {
                        Some(&position) => coll.documents[position].doc.clone(),
                        None => entry.key.project(key.field_names()),
                    };
                    doc.set_disk_loc(entry.loc);
                    doc
                })
                .collect(),
        };
        Ok(Box::new(VecCursor::new(docs)))
    }
}

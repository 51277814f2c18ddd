//! Document store collaborator
//!
//! The reconciliation core only needs a handful of reads from the store:
//! enumeration of databases, collections and indexes, a natural-order read
//! annotated with physical locations, and two index-order reads against the
//! same index. Anything that can answer those can be validated.

use crate::document::Document;
use crate::index_spec::IndexKeySpec;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A collection within a database
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// `database.collection`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Index description as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub key: IndexKeySpec,
}

impl IndexInfo {
    pub fn new(name: impl Into<String>, key: IndexKeySpec) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    /// System/internal index kinds (text, geo, hashed) that are not
    /// validated
    pub fn is_special(&self) -> bool {
        self.key.is_special()
    }
}

/// Which of the two index-order reads to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRead {
    /// The indexed field projection, retrieved through the index rather than
    /// the primary storage
    ReturnKey,
    /// Records in index order, each annotated with its `$diskLoc`
    ShowDiskLoc,
}

/// A single-pass read over the store
pub trait Cursor {
    /// Next record, `Ok(None)` once exhausted
    fn next(&mut self) -> Result<Option<Document>>;

    /// Release the server-side cursor
    fn close(&mut self) -> Result<()>;
}

/// Reads the validator needs from a document store
pub trait DocumentStore {
    fn database_names(&self) -> Result<Vec<String>>;

    fn collection_names(&self, database: &str) -> Result<Vec<String>>;

    fn indexes(&self, ns: &Namespace) -> Result<Vec<IndexInfo>>;

    /// Natural-order read with each record annotated with its `$diskLoc`
    fn natural_scan(&self, ns: &Namespace) -> Result<Box<dyn Cursor>>;

    /// Plain read of every record, no location metadata, no ordering promise
    fn full_scan(&self, ns: &Namespace) -> Result<Box<dyn Cursor>>;

    /// One of the two index-order reads against `index`
    fn index_scan(&self, ns: &Namespace, index: &IndexInfo, read: IndexRead)
        -> Result<Box<dyn Cursor>>;
}

/// Cursor over records already held in memory
#[derive(Debug)]
pub struct VecCursor {
    docs: std::vec::IntoIter<Document>,
    closed: bool,
}

impl VecCursor {
    pub fn new(docs: Vec<Document>) -> Self {
        Self {
            docs: docs.into_iter(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Cursor for VecCursor {
    fn next(&mut self) -> Result<Option<Document>> {
        if self.closed {
            anyhow::bail!("cursor used after close");
        }
        Ok(self.docs.next())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

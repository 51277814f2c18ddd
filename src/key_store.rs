//! Composite-key document store
//!
//! Groups documents by the canonical values of an index's key fields. The
//! structure is a tree with one level per key field: every level but the last
//! maps a key component to the next level, and the last maps a key component
//! to the locations of all documents sharing the full key. Non-unique indexes
//! simply produce lists with more than one location.
//!
//! Membership is decided by location, not by key: a document whose key exists
//! but whose `$diskLoc` was never stored is not contained.

use crate::document::{DiskLoc, Document, KeyPart};
use crate::error::{Result, ValidateError};
use crate::index_spec::IndexKeySpec;
use rustc_hash::FxHashMap;

#[derive(Debug)]
enum Level {
    Branch(FxHashMap<KeyPart, Level>),
    Leaf(FxHashMap<KeyPart, Vec<DiskLoc>>),
}

impl Level {
    /// Level for a key suffix of `remaining` fields
    fn new(remaining: usize) -> Self {
        if remaining > 1 {
            Level::Branch(FxHashMap::default())
        } else {
            Level::Leaf(FxHashMap::default())
        }
    }

    fn insert(&mut self, parts: &[KeyPart], loc: DiskLoc) {
        match (self, parts) {
            (Level::Leaf(locations), [last]) => {
                locations.entry(last.clone()).or_default().push(loc);
            }
            (Level::Branch(children), [first, rest @ ..]) => children
                .entry(first.clone())
                .or_insert_with(|| Level::new(rest.len()))
                .insert(rest, loc),
            _ => debug_assert!(false, "key depth does not match store depth"),
        }
    }

    fn get(&self, parts: &[KeyPart]) -> Option<&[DiskLoc]> {
        match (self, parts) {
            (Level::Leaf(locations), [last]) => locations.get(last).map(Vec::as_slice),
            (Level::Branch(children), [first, rest @ ..]) => children.get(first)?.get(rest),
            _ => None,
        }
    }
}

/// Locations of documents keyed by an index's field values
#[derive(Debug)]
pub struct KeyedDocumentStore {
    fields: Vec<String>,
    root: Level,
    len: usize,
}

impl KeyedDocumentStore {
    pub fn new(key: &IndexKeySpec) -> Result<Self> {
        if key.is_empty() {
            return Err(ValidateError::EmptyKeySpec);
        }
        let fields: Vec<String> = key.field_names().map(str::to_string).collect();
        Ok(Self {
            root: Level::new(fields.len()),
            fields,
            len: 0,
        })
    }

    /// Key field names in level order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of stored locations
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn key_of(&self, doc: &Document) -> Vec<KeyPart> {
        self.fields
            .iter()
            .map(|field| KeyPart::from_value(doc.get_path(field)))
            .collect()
    }

    /// Record `doc`'s location under its key
    pub fn put(&mut self, doc: &Document) -> Result<()> {
        let loc = doc.try_disk_loc()?;
        let key = self.key_of(doc);
        self.root.insert(&key, loc);
        self.len += 1;
        Ok(())
    }

    /// Every stored location sharing `doc`'s key
    pub fn matches(&self, doc: &Document) -> Option<&[DiskLoc]> {
        self.root.get(&self.key_of(doc))
    }

    /// Whether this exact record instance (key and location) was stored.
    /// A key path that was never stored is a plain `false`.
    pub fn contains(&self, doc: &Document) -> Result<bool> {
        let loc = doc.try_disk_loc()?;
        Ok(self
            .matches(doc)
            .is_some_and(|locations| locations.contains(&loc)))
    }
}

//! Reconciliation driver
//!
//! A pass drains a build scan into a fresh [`KeyedDocumentStore`], then probes
//! it with every record of a second scan. Records whose exact location is not
//! stored under their key are reported as mismatches, in probe order.
//!
//! Each index needs both passes:
//! - build from the collection, probe with the index: finds index entries
//!   with no matching collection document;
//! - build from the index, probe with the collection: finds collection
//!   documents with no matching index entry.

use crate::document::{DiskLoc, Document};
use crate::error::Result;
use crate::index_spec::IndexKeySpec;
use crate::key_store::KeyedDocumentStore;
use crate::scan::{CollectionScan, IndexScan, ScanGuard, ScanSource};
use crate::store::{DocumentStore, IndexInfo, Namespace};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Report text with a `{document}` placeholder for the rendered record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate(String);

impl MessageTemplate {
    pub const PLACEHOLDER: &'static str = "{document}";

    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn render(&self, document: &str) -> String {
        self.0.replace(Self::PLACEHOLDER, document)
    }
}

/// A probed record with no matching stored entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Pretty JSON of the probed record, `$diskLoc` included
    pub document: String,
    pub disk_loc: Option<DiskLoc>,
    pub message: String,
}

impl Mismatch {
    fn new(doc: &Document, template: &MessageTemplate) -> Self {
        let document = doc.render();
        Self {
            message: template.render(&document),
            disk_loc: doc.disk_loc(),
            document,
        }
    }
}

/// Counters for one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    pub built: usize,
    pub probed: usize,
    pub mismatched: usize,
}

impl PassStats {
    pub fn merge(&mut self, other: PassStats) {
        self.built += other.built;
        self.probed += other.probed;
        self.mismatched += other.mismatched;
    }
}

/// Mismatches and counters of one or more passes that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub mismatches: Vec<Mismatch>,
    pub stats: PassStats,
}

/// Builds a key store from one scan and probes it with another
pub struct Verifier<'a> {
    key: &'a IndexKeySpec,
    template: MessageTemplate,
}

impl<'a> Verifier<'a> {
    pub fn new(key: &'a IndexKeySpec, template: MessageTemplate) -> Self {
        Self { key, template }
    }

    /// Run a pass and collect its mismatches
    pub fn reconcile<B, P>(&self, build: B, probe: P) -> Result<Verification>
    where
        B: ScanSource,
        P: ScanSource,
    {
        let mut mismatches = Vec::new();
        let stats = self.reconcile_with(build, probe, |mismatch| mismatches.push(mismatch))?;
        Ok(Verification { mismatches, stats })
    }

    /// Run a pass, streaming each mismatch to `on_mismatch` as it is found.
    ///
    /// Any scan, location or key error aborts the pass. Both scans are closed
    /// on every path.
    pub fn reconcile_with<B, P, F>(&self, build: B, probe: P, mut on_mismatch: F) -> Result<PassStats>
    where
        B: ScanSource,
        P: ScanSource,
        F: FnMut(Mismatch),
    {
        let mut build = ScanGuard::new(build);
        let mut probe = ScanGuard::new(probe);
        let mut store = KeyedDocumentStore::new(self.key)?;
        let mut stats = PassStats::default();

        while let Some(doc) = build.next_document() {
            store.put(&doc)?;
            stats.built += 1;
        }
        if let Some(err) = build.err() {
            return Err(err.clone());
        }
        build.finish()?;

        while let Some(doc) = probe.next_document() {
            stats.probed += 1;
            if !store.contains(&doc)? {
                stats.mismatched += 1;
                on_mismatch(Mismatch::new(&doc, &self.template));
            }
        }
        if let Some(err) = probe.err() {
            return Err(err.clone());
        }
        probe.finish()?;

        debug!(
            key = %self.key,
            built = stats.built,
            probed = stats.probed,
            mismatched = stats.mismatched,
            "reconciliation pass complete"
        );
        Ok(stats)
    }
}

/// The two standing passes run against every index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckDirection {
    /// Build from the collection scan, probe with the index scan
    CollectionAgainstIndex,
    /// Build from the index scan, probe with the collection scan
    IndexAgainstCollection,
}

impl CheckDirection {
    pub const BOTH: [CheckDirection; 2] = [
        CheckDirection::CollectionAgainstIndex,
        CheckDirection::IndexAgainstCollection,
    ];

    pub fn template(self, ns: &Namespace, index: &IndexInfo) -> MessageTemplate {
        match self {
            CheckDirection::CollectionAgainstIndex => MessageTemplate::new(format!(
                "Document {} found in index {}, but not collection '{}'",
                MessageTemplate::PLACEHOLDER,
                index.key,
                ns.full_name()
            )),
            CheckDirection::IndexAgainstCollection => MessageTemplate::new(format!(
                "Document {} found in collection '{}', but not index {}",
                MessageTemplate::PLACEHOLDER,
                ns.full_name(),
                index.key
            )),
        }
    }

    /// Open both scans against the store and run this pass
    pub fn run(
        self,
        store: &dyn DocumentStore,
        ns: &Namespace,
        index: &IndexInfo,
    ) -> Result<Verification> {
        let collection = ScanGuard::new(CollectionScan::open(store, ns)?);
        let index_scan = ScanGuard::new(IndexScan::open(store, ns, index)?);
        let verifier = Verifier::new(&index.key, self.template(ns, index));
        match self {
            CheckDirection::CollectionAgainstIndex => verifier.reconcile(collection, index_scan),
            CheckDirection::IndexAgainstCollection => verifier.reconcile(index_scan, collection),
        }
    }
}

impl fmt::Display for CheckDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckDirection::CollectionAgainstIndex => write!(f, "collection against index"),
            CheckDirection::IndexAgainstCollection => write!(f, "index against collection"),
        }
    }
}

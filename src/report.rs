//! Validation report
//!
//! Collects per-index results of a run. Serializes for `--json` and renders
//! the console layout: one `==== db.coll ====` heading per collection, one
//! line per index, each mismatch message under the index that produced it.

use crate::store::Namespace;
use crate::verifier::{Mismatch, PassStats, Verification};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndexStatus {
    Validated {
        mismatches: Vec<Mismatch>,
        stats: PassStats,
    },
    SkippedSpecial,
    SkippedMultiKey,
    Failed {
        error: String,
    },
}

impl From<Verification> for IndexStatus {
    fn from(outcome: Verification) -> Self {
        IndexStatus::Validated {
            mismatches: outcome.mismatches,
            stats: outcome.stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub name: String,
    /// Key in list form, e.g. `[a -b]`
    pub key: String,
    #[serde(flatten)]
    pub status: IndexStatus,
}

impl IndexReport {
    pub fn mismatch_count(&self) -> usize {
        match &self.status {
            IndexStatus::Validated { mismatches, .. } => mismatches.len(),
            _ => 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, IndexStatus::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(
            self.status,
            IndexStatus::SkippedSpecial | IndexStatus::SkippedMultiKey
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub namespace: Namespace,
    pub indexes: Vec<IndexReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReport {
    pub collections: Vec<CollectionReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StoreReport {
    pub fn start() -> Self {
        Self {
            collections: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    fn indexes(&self) -> impl Iterator<Item = &IndexReport> {
        self.collections.iter().flat_map(|c| c.indexes.iter())
    }

    pub fn mismatch_count(&self) -> usize {
        self.indexes().map(IndexReport::mismatch_count).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.indexes().filter(|i| i.is_failed()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.indexes().filter(|i| i.is_skipped()).count()
    }

    pub fn validated_count(&self) -> usize {
        self.indexes()
            .filter(|i| matches!(i.status, IndexStatus::Validated { .. }))
            .count()
    }

    /// No mismatches and no failed indexes
    pub fn is_clean(&self) -> bool {
        self.mismatch_count() == 0 && self.failed_count() == 0
    }

    fn summary(&self) -> String {
        let elapsed = self
            .finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
            .unwrap_or(0);
        format!(
            "{} Validated {} indexes in {} collections: {} mismatches, {} failed, {} skipped ({} ms)",
            if self.is_clean() { "✅" } else { "❌" },
            self.validated_count(),
            self.collections.len(),
            self.mismatch_count(),
            self.failed_count(),
            self.skipped_count(),
            elapsed
        )
    }
}

impl fmt::Display for StoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for collection in &self.collections {
            writeln!(f, "==== {} ====", collection.namespace)?;
            for index in &collection.indexes {
                match &index.status {
                    IndexStatus::SkippedSpecial => {
                        writeln!(f, " ==> Skipping special index: {}", index.key)?
                    }
                    IndexStatus::SkippedMultiKey => {
                        writeln!(f, " ==> Skipping multikey index: {}", index.key)?
                    }
                    IndexStatus::Validated { mismatches, .. } => {
                        writeln!(f, " ==> Validating index {}", index.key)?;
                        for mismatch in mismatches {
                            writeln!(f, "{}", mismatch.message)?;
                        }
                    }
                    IndexStatus::Failed { error } => {
                        writeln!(f, " ==> Validating index {}", index.key)?;
                        writeln!(f, " ⚠️  Index {} failed: {}", index.name, error)?;
                    }
                }
            }
        }
        writeln!(f, "{}", self.summary())
    }
}

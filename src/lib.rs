//! docstore-validate - Collection/index consistency checker for document stores
//!
//! Cross-validates every collection against each of its secondary indexes:
//! documents present in the collection but absent from an index, and index
//! entries pointing at no document, are reported as mismatches.

/// Document and location model
pub mod document;
pub mod error;
/// Index key specifications
pub mod index_spec;
pub mod key_store;
pub mod scan;
/// Store collaborator traits
pub mod store;
pub mod verifier;

/// File-backed store
pub mod snapshot;

/// Run configuration, store walk and report
pub mod config;
pub mod report;
pub mod validate;

pub use config::ValidateConfig;
pub use document::{DiskLoc, Document};
pub use error::ValidateError;
pub use index_spec::IndexKeySpec;
pub use key_store::KeyedDocumentStore;
pub use report::{IndexStatus, StoreReport};
pub use scan::{CollectionScan, IndexScan, ScanSource};
pub use snapshot::SnapshotStore;
pub use store::{DocumentStore, IndexInfo, Namespace};
pub use validate::{validate_index, validate_store};
pub use verifier::{CheckDirection, Mismatch, Verifier};

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "docstore_validate=info,warn";

/// Install the stderr log subscriber used by the binaries
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .try_init();
}

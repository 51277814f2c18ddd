//! Error types for the reconciliation core
//!
//! Every variant aborts validation of the current index. Mismatches between a
//! collection and its index are results, not errors, and never appear here.

use thiserror::Error;

/// Errors raised while scanning or keying documents
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
    /// A document reached the key store without a `$diskLoc` field
    #[error("Document {document} is missing a DiskLoc")]
    MissingLocation { document: String },

    /// `$diskLoc` is present but is not a `{file, offset}` pair of integers
    #[error("Document {document} has a malformed DiskLoc: {reason}")]
    LocationFieldMalformed { document: String, reason: String },

    /// The two reads behind an index scan ended on different documents
    #[error("Iterators ended on different documents while scanning index {index} of '{namespace}'")]
    Desynchronization { namespace: String, index: String },

    /// A key store needs at least one key field
    #[error("Index key specification has no fields")]
    EmptyKeySpec,

    /// The store described an index key that could not be parsed
    #[error("Invalid index key specification: {reason}")]
    InvalidKeySpec { reason: String },

    /// The underlying store cursor failed
    #[error("{context}: {message}")]
    Cursor { context: String, message: String },
}

impl ValidateError {
    /// Wrap a store/cursor failure with the operation it interrupted
    pub fn cursor(context: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::Cursor {
            context: context.into(),
            message: format!("{:#}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ValidateError>;

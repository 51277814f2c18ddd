//! Scan sources
//!
//! A scan is a lazy, single-pass sequence of documents. Two strategies share
//! the [`ScanSource`] contract:
//!
//! - [`CollectionScan`]: natural (storage) order, each record annotated with
//!   its `$diskLoc` by the store.
//! - [`IndexScan`]: index order, built by zipping two reads of the same index.
//!   One read yields the key projection through the index, the other yields
//!   the `$diskLoc` for the same position. The two must agree on length; if
//!   they do not, the store changed between the reads or is misreporting, and
//!   the scan fails.
//!
//! Once `next_document` returns `None` the caller must still check `err()`
//! before treating the scan as fully read.

use crate::document::Document;
use crate::error::{Result, ValidateError};
use crate::store::{Cursor, DocumentStore, IndexInfo, IndexRead, Namespace};
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

/// Common contract of the two scan strategies
pub trait ScanSource {
    /// Next record, or `None` when the scan is exhausted or has failed
    fn next_document(&mut self) -> Option<Document>;

    /// The error that ended the scan, if any
    fn err(&self) -> Option<&ValidateError>;

    /// Release the underlying cursors; safe to call more than once
    fn close(&mut self) -> Result<()>;

    /// Drain the remaining records
    fn all(&mut self) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        while let Some(doc) = self.next_document() {
            docs.push(doc);
        }
        match self.err() {
            Some(err) => Err(err.clone()),
            None => Ok(docs),
        }
    }
}

impl<S: ScanSource + ?Sized> ScanSource for Box<S> {
    fn next_document(&mut self) -> Option<Document> {
        (**self).next_document()
    }

    fn err(&self) -> Option<&ValidateError> {
        (**self).err()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Natural-order scan of a collection
pub struct CollectionScan {
    namespace: Namespace,
    cursor: Box<dyn Cursor>,
    err: Option<ValidateError>,
    done: bool,
    closed: bool,
}

impl CollectionScan {
    /// Issue the natural-order read against `ns`
    pub fn open(store: &dyn DocumentStore, ns: &Namespace) -> Result<Self> {
        let cursor = store.natural_scan(ns).map_err(|e| {
            ValidateError::cursor(format!("Failed to open collection scan of '{}'", ns), &e)
        })?;
        Ok(Self::from_cursor(ns.clone(), cursor))
    }

    pub fn from_cursor(namespace: Namespace, cursor: Box<dyn Cursor>) -> Self {
        Self {
            namespace,
            cursor,
            err: None,
            done: false,
            closed: false,
        }
    }
}

impl ScanSource for CollectionScan {
    fn next_document(&mut self) -> Option<Document> {
        if self.done {
            return None;
        }
        match self.cursor.next() {
            Ok(Some(doc)) => Some(doc),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.err = Some(ValidateError::cursor(
                    format!("Collection scan of '{}' failed", self.namespace),
                    &e,
                ));
                self.done = true;
                None
            }
        }
    }

    fn err(&self) -> Option<&ValidateError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cursor.close().map_err(|e| {
            ValidateError::cursor(
                format!("Failed to close collection scan of '{}'", self.namespace),
                &e,
            )
        })
    }
}

/// Index-order scan joining the key projection read with the location read
pub struct IndexScan {
    namespace: Namespace,
    index: String,
    data: Box<dyn Cursor>,
    locations: Box<dyn Cursor>,
    err: Option<ValidateError>,
    done: bool,
    closed: bool,
}

impl IndexScan {
    /// Issue both reads against `index`
    pub fn open(store: &dyn DocumentStore, ns: &Namespace, index: &IndexInfo) -> Result<Self> {
        let mut data = store.index_scan(ns, index, IndexRead::ReturnKey).map_err(|e| {
            ValidateError::cursor(
                format!("Failed to open key read of index {} on '{}'", index.key, ns),
                &e,
            )
        })?;
        let locations = match store.index_scan(ns, index, IndexRead::ShowDiskLoc) {
            Ok(cursor) => cursor,
            Err(e) => {
                if let Err(close_err) = data.close() {
                    warn!(namespace = %ns, index = %index.key, error = %close_err, "failed to close key read");
                }
                return Err(ValidateError::cursor(
                    format!("Failed to open location read of index {} on '{}'", index.key, ns),
                    &e,
                ));
            }
        };
        Ok(Self::from_cursors(ns.clone(), index.key.to_string(), data, locations))
    }

    pub fn from_cursors(
        namespace: Namespace,
        index: String,
        data: Box<dyn Cursor>,
        locations: Box<dyn Cursor>,
    ) -> Self {
        Self {
            namespace,
            index,
            data,
            locations,
            err: None,
            done: false,
            closed: false,
        }
    }

    fn fail(&mut self, err: ValidateError) -> Option<Document> {
        debug!(namespace = %self.namespace, index = %self.index, error = %err, "index scan stopped");
        self.err = Some(err);
        self.done = true;
        None
    }
}

impl ScanSource for IndexScan {
    fn next_document(&mut self) -> Option<Document> {
        if self.done {
            return None;
        }

        let data = match self.data.next() {
            Ok(data) => data,
            Err(e) => {
                let err = ValidateError::cursor(
                    format!("Key read of index {} on '{}' failed", self.index, self.namespace),
                    &e,
                );
                return self.fail(err);
            }
        };
        let located = match self.locations.next() {
            Ok(located) => located,
            Err(e) => {
                let err = ValidateError::cursor(
                    format!("Location read of index {} on '{}' failed", self.index, self.namespace),
                    &e,
                );
                return self.fail(err);
            }
        };

        match (data, located) {
            (Some(mut data), Some(located)) => match located.try_disk_loc() {
                Ok(loc) => {
                    data.set_disk_loc(loc);
                    Some(data)
                }
                Err(err) => self.fail(err),
            },
            (None, None) => {
                self.done = true;
                None
            }
            _ => {
                let err = ValidateError::Desynchronization {
                    namespace: self.namespace.full_name(),
                    index: self.index.clone(),
                };
                self.fail(err)
            }
        }
    }

    fn err(&self) -> Option<&ValidateError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let data = self.data.close();
        let locations = self.locations.close();
        data.and(locations).map_err(|e| {
            ValidateError::cursor(
                format!("Failed to close scan of index {} on '{}'", self.index, self.namespace),
                &e,
            )
        })
    }
}

/// Owns a scan and closes it on every exit path
pub struct ScanGuard<S: ScanSource> {
    scan: S,
    closed: bool,
}

impl<S: ScanSource> ScanGuard<S> {
    pub fn new(scan: S) -> Self {
        Self {
            scan,
            closed: false,
        }
    }

    /// Close now and surface the close error
    pub fn finish(mut self) -> Result<()> {
        self.closed = true;
        self.scan.close()
    }
}

impl<S: ScanSource> Deref for ScanGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.scan
    }
}

impl<S: ScanSource> DerefMut for ScanGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.scan
    }
}

impl<S: ScanSource> ScanSource for ScanGuard<S> {
    fn next_document(&mut self) -> Option<Document> {
        self.scan.next_document()
    }

    fn err(&self) -> Option<&ValidateError> {
        self.scan.err()
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.scan.close()
    }
}

impl<S: ScanSource> Drop for ScanGuard<S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.scan.close() {
            warn!(error = %e, "failed to close scan");
        }
    }
}

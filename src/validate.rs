//! Store walk
//!
//! Visits every database, collection and index the configuration allows and
//! runs both reconciliation passes on each validatable index. An index that
//! fails is recorded in the report and the walk moves on, unless the
//! configuration asks to stop at the first failure.

use crate::config::ValidateConfig;
use crate::error::Result;
use crate::index_spec::IndexKeySpec;
use crate::report::{CollectionReport, IndexReport, IndexStatus, StoreReport};
use crate::store::{Cursor, DocumentStore, IndexInfo, Namespace};
use crate::verifier::{CheckDirection, Verification};
use anyhow::Context;
use tracing::{debug, error, info};

/// Text, geo and hashed indexes are not validated
pub fn is_special_index(index: &IndexInfo) -> bool {
    index.is_special()
}

/// Whether any document holds an array along one of the index's key paths.
/// Such an index has one entry per array element and cannot be reconciled
/// record-for-record.
pub fn is_multikey_index(
    store: &dyn DocumentStore,
    ns: &Namespace,
    index: &IndexInfo,
) -> anyhow::Result<bool> {
    let mut cursor = store
        .full_scan(ns)
        .with_context(|| format!("Failed to open full scan of '{}'", ns))?;
    let found = any_array_field(cursor.as_mut(), &index.key);
    let closed = cursor
        .close()
        .with_context(|| format!("Failed to close full scan of '{}'", ns));
    let found = found.with_context(|| format!("Full scan of '{}' failed", ns))?;
    closed?;
    Ok(found)
}

fn any_array_field(cursor: &mut dyn Cursor, key: &IndexKeySpec) -> anyhow::Result<bool> {
    while let Some(doc) = cursor.next()? {
        if key.field_names().any(|field| doc.path_holds_array(field)) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Run both passes over one index. Any error aborts the index.
pub fn validate_index(
    store: &dyn DocumentStore,
    ns: &Namespace,
    index: &IndexInfo,
) -> Result<Verification> {
    let mut outcome = Verification::default();
    for direction in CheckDirection::BOTH {
        let verification = direction.run(store, ns, index)?;
        debug!(
            namespace = %ns,
            index = %index.key,
            %direction,
            mismatched = verification.stats.mismatched,
            "pass complete"
        );
        outcome.stats.merge(verification.stats);
        outcome.mismatches.extend(verification.mismatches);
    }
    Ok(outcome)
}

/// Validate every index the configuration allows
pub fn validate_store(
    store: &dyn DocumentStore,
    config: &ValidateConfig,
) -> anyhow::Result<StoreReport> {
    let mut report = StoreReport::start();

    let databases = store.database_names().context("Failed to list databases")?;
    for database in databases {
        if !config.visits_database(&database) {
            debug!(database = %database, "skipping database");
            continue;
        }
        let collections = store
            .collection_names(&database)
            .with_context(|| format!("Failed to list collections of '{}'", database))?;
        for collection in collections {
            if !config.visits_collection(&collection) {
                debug!(database = %database, collection = %collection, "skipping collection");
                continue;
            }
            let ns = Namespace::new(database.clone(), collection);
            report.collections.push(validate_collection(store, &ns, config)?);
        }
    }

    report.finish();
    info!(
        validated = report.validated_count(),
        mismatches = report.mismatch_count(),
        failed = report.failed_count(),
        "validation complete"
    );
    Ok(report)
}

fn validate_collection(
    store: &dyn DocumentStore,
    ns: &Namespace,
    config: &ValidateConfig,
) -> anyhow::Result<CollectionReport> {
    info!(namespace = %ns, "validating collection");
    let indexes = store
        .indexes(ns)
        .with_context(|| format!("Failed to list indexes of '{}'", ns))?;

    let mut reports = Vec::with_capacity(indexes.len());
    for index in indexes {
        let status = index_status(store, ns, &index, config)?;
        reports.push(IndexReport {
            name: index.name,
            key: index.key.to_string(),
            status,
        });
    }
    Ok(CollectionReport {
        namespace: ns.clone(),
        indexes: reports,
    })
}

fn index_status(
    store: &dyn DocumentStore,
    ns: &Namespace,
    index: &IndexInfo,
    config: &ValidateConfig,
) -> anyhow::Result<IndexStatus> {
    if is_special_index(index) {
        info!(namespace = %ns, index = %index.key, "skipping special index");
        return Ok(IndexStatus::SkippedSpecial);
    }
    match is_multikey_index(store, ns, index) {
        Ok(true) => {
            info!(namespace = %ns, index = %index.key, "skipping multikey index");
            return Ok(IndexStatus::SkippedMultiKey);
        }
        Ok(false) => {}
        Err(err) => return failed(ns, index, config, err),
    }

    match validate_index(store, ns, index) {
        Ok(outcome) => {
            info!(
                namespace = %ns,
                index = %index.key,
                built = outcome.stats.built,
                probed = outcome.stats.probed,
                mismatched = outcome.stats.mismatched,
                "index validated"
            );
            Ok(outcome.into())
        }
        Err(err) => failed(ns, index, config, err.into()),
    }
}

fn failed(
    ns: &Namespace,
    index: &IndexInfo,
    config: &ValidateConfig,
    err: anyhow::Error,
) -> anyhow::Result<IndexStatus> {
    error!(namespace = %ns, index = %index.key, error = %format!("{:#}", err), "index validation failed");
    if config.fail_fast {
        return Err(err.context(format!(
            "Validation of index {} on '{}' failed",
            index.key, ns
        )));
    }
    Ok(IndexStatus::Failed {
        error: format!("{:#}", err),
    })
}

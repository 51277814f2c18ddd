//! Stores that misreport: missing locations, short reads, broken cursors

use crate::helpers::*;
use docstore_validate::{
    validate_index, validate_store, IndexStatus, SnapshotStore, ValidateConfig, ValidateError,
};
use serde_json::json;

fn orders_and_users() -> SnapshotStore {
    store_with(json!([
        orders(None),
        {
            "name": "users",
            "documents": [stored(2, 0, json!({"_id": 1, "name": "ada"}))],
            "indexes": [{"name": "name_1", "key": {"name": 1}}]
        }
    ]))
}

#[test]
fn test_missing_location_aborts_index() {
    let store = FaultyStore::new(orders_and_users(), "orders", Fault::StripLocation { id: 2 });
    let ns = ns("orders");
    let index = index_named(&store, &ns, "a_1");

    match validate_index(&store, &ns, &index) {
        Err(ValidateError::MissingLocation { document }) => {
            assert!(document.contains("\"_id\": 2"));
        }
        other => panic!("expected a missing location, got {:?}", other),
    }
}

#[test]
fn test_failed_index_does_not_stop_the_walk() {
    let store = FaultyStore::new(orders_and_users(), "orders", Fault::StripLocation { id: 2 });
    let report = validate_store(&store, &ValidateConfig::default()).unwrap();

    assert_eq!(report.collections.len(), 2);
    match &report.collections[0].indexes[0].status {
        IndexStatus::Failed { error } => assert!(error.contains("missing a DiskLoc")),
        other => panic!("expected a failed index, got {:?}", other),
    }
    assert!(matches!(
        report.collections[1].indexes[0].status,
        IndexStatus::Validated { .. }
    ));
    assert_eq!(report.failed_count(), 1);
    assert!(!report.is_clean());
    assert!(report.to_string().contains("Index a_1 failed"));
}

#[test]
fn test_fail_fast_ends_the_run() {
    let store = FaultyStore::new(orders_and_users(), "orders", Fault::StripLocation { id: 2 });
    let config = ValidateConfig {
        fail_fast: true,
        ..Default::default()
    };
    let err = validate_store(&store, &config).unwrap_err();
    let text = format!("{:#}", err);
    assert!(text.contains("Validation of index [a] on 'test.orders' failed"));
    assert!(text.contains("missing a DiskLoc"));
}

#[test]
fn test_short_location_read_is_a_desynchronization() {
    let store = FaultyStore::new(orders_and_users(), "orders", Fault::ShortLocationRead);
    let ns = ns("orders");
    let index = index_named(&store, &ns, "a_1");

    let err = validate_index(&store, &ns, &index).unwrap_err();
    assert_eq!(
        err,
        ValidateError::Desynchronization {
            namespace: "test.orders".to_string(),
            index: "[a]".to_string(),
        }
    );
    assert!(err.to_string().starts_with("Iterators ended on different documents"));
}

#[test]
fn test_broken_cursor_surfaces_store_error() {
    let store = FaultyStore::new(orders_and_users(), "orders", Fault::BrokenIndexCursor);
    let ns = ns("orders");
    let index = index_named(&store, &ns, "a_1");

    match validate_index(&store, &ns, &index) {
        Err(ValidateError::Cursor { message, .. }) => {
            assert!(message.contains("connection reset by peer"));
        }
        other => panic!("expected a cursor error, got {:?}", other),
    }
}

#[test]
fn test_unknown_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = SnapshotStore::load(&dir.path().join("absent.json")).err().unwrap();
    assert!(format!("{:#}", err).contains("Failed to read snapshot"));
}

//! Reconciliation of whole snapshots, clean and diverged

use crate::helpers::*;
use docstore_validate::{validate_index, validate_store, DiskLoc, IndexStatus, ValidateConfig};
use serde_json::json;

#[test]
fn test_matching_collection_and_index() {
    let store = store_with(json!([orders(None)]));
    let ns = ns("orders");
    let index = index_named(&store, &ns, "a_1");

    let outcome = validate_index(&store, &ns, &index).unwrap();
    assert!(outcome.mismatches.is_empty());
    assert_eq!(outcome.stats.mismatched, 0);

    let report = validate_store(&store, &ValidateConfig::default()).unwrap();
    assert!(report.is_clean());
    let text = report.to_string();
    assert!(text.starts_with("==== test.orders ====\n ==> Validating index [a]\n"));
}

#[test]
fn test_explicit_entries_matching_documents() {
    let entries = json!([entry(json!({"a": 5}), 0, 20), entry(json!({"a": 5}), 0, 10)]);
    let store = store_with(json!([orders(Some(entries))]));
    let report = validate_store(&store, &ValidateConfig::default()).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.validated_count(), 1);
}

#[test]
fn test_dangling_index_entry() {
    let entries = json!([
        entry(json!({"a": 5}), 0, 10),
        entry(json!({"a": 5}), 0, 20),
        entry(json!({"a": 7}), 0, 99)
    ]);
    let store = store_with(json!([orders(Some(entries))]));
    let ns = ns("orders");
    let index = index_named(&store, &ns, "a_1");

    let outcome = validate_index(&store, &ns, &index).unwrap();
    assert_eq!(outcome.mismatches.len(), 1);
    let mismatch = &outcome.mismatches[0];
    assert_eq!(mismatch.disk_loc, Some(DiskLoc::new(0, 99)));
    assert!(mismatch.message.starts_with("Document {"));
    assert!(mismatch
        .message
        .ends_with("found in index [a], but not collection 'test.orders'"));
    assert!(mismatch.document.contains("\"a\": 7"));
}

#[test]
fn test_missing_index_entry() {
    let entries = json!([entry(json!({"a": 5}), 0, 10)]);
    let store = store_with(json!([orders(Some(entries))]));
    let ns = ns("orders");
    let index = index_named(&store, &ns, "a_1");

    let outcome = validate_index(&store, &ns, &index).unwrap();
    assert_eq!(outcome.mismatches.len(), 1);
    let mismatch = &outcome.mismatches[0];
    assert_eq!(mismatch.disk_loc, Some(DiskLoc::new(0, 20)));
    assert!(mismatch
        .message
        .ends_with("found in collection 'test.orders', but not index [a]"));
    assert!(mismatch.document.contains("\"_id\": 2"));
}

#[test]
fn test_stale_key_is_reported_from_both_sides() {
    // The entry for (0,10) still carries the old value of `a`
    let entries = json!([entry(json!({"a": 6}), 0, 10), entry(json!({"a": 5}), 0, 20)]);
    let store = store_with(json!([orders(Some(entries))]));
    let ns = ns("orders");
    let index = index_named(&store, &ns, "a_1");

    let outcome = validate_index(&store, &ns, &index).unwrap();
    assert_eq!(outcome.mismatches.len(), 2);
    assert!(outcome.mismatches[0].message.contains("found in index"));
    assert!(outcome.mismatches[0].document.contains("\"a\": 6"));
    assert!(outcome.mismatches[1].message.contains("found in collection"));
    assert!(outcome.mismatches[1].document.contains("\"a\": 5"));
    assert!(outcome
        .mismatches
        .iter()
        .all(|m| m.disk_loc == Some(DiskLoc::new(0, 10))));
}

#[test]
fn test_compound_descending_index() {
    let store = store_with(json!([{
        "name": "events",
        "documents": [
            stored(1, 0, json!({"_id": 1, "kind": "a", "at": 3})),
            stored(1, 8, json!({"_id": 2, "kind": "b", "at": 1})),
            stored(1, 16, json!({"_id": 3, "kind": "a", "at": 2}))
        ],
        "indexes": [{"name": "kind_1_at_-1", "key": {"kind": 1, "at": -1}}]
    }]));
    let report = validate_store(&store, &ValidateConfig::default()).unwrap();
    assert!(report.is_clean());
    assert!(report.to_string().contains(" ==> Validating index [kind -at]"));
}

#[test]
fn test_skipped_indexes_and_namespaces() {
    let store = store_with(json!([
        {
            "name": "posts",
            "documents": [stored(0, 0, json!({"_id": 1, "tags": ["x", "y"], "body": "hi"}))],
            "indexes": [
                {"name": "tags_1", "key": {"tags": 1}},
                {"name": "body_text", "key": {"body": "text"}}
            ]
        },
        {"name": "system.indexes"}
    ]));
    let report = validate_store(&store, &ValidateConfig::default()).unwrap();
    assert_eq!(report.collections.len(), 1);
    let statuses: Vec<_> = report.collections[0]
        .indexes
        .iter()
        .map(|index| index.status.clone())
        .collect();
    assert_eq!(statuses, vec![IndexStatus::SkippedMultiKey, IndexStatus::SkippedSpecial]);

    let text = report.to_string();
    assert!(text.contains(" ==> Skipping multikey index: [tags]"));
    assert!(text.contains(" ==> Skipping special index: [$text:body]"));
}

#[test]
fn test_json_report() {
    let entries = json!([entry(json!({"a": 5}), 0, 10)]);
    let store = store_with(json!([orders(Some(entries))]));
    let report = validate_store(&store, &ValidateConfig::default()).unwrap();

    let value = serde_json::to_value(&report).unwrap();
    let index = &value["collections"][0]["indexes"][0];
    assert_eq!(index["name"], "a_1");
    assert_eq!(index["key"], "[a]");
    assert_eq!(index["status"], "validated");
    assert_eq!(index["mismatches"].as_array().unwrap().len(), 1);
    assert!(value["started_at"].is_string());
}

#[test]
fn test_nested_field_index() {
    let people = |entries: serde_json::Value| {
        json!([{
            "name": "people",
            "documents": [
                stored(0, 1, json!({"_id": 1, "addr": {"city": "X"}})),
                stored(0, 2, json!({"_id": 2, "addr": {"city": "Y"}}))
            ],
            "indexes": [{"name": "addr.city_1", "key": {"addr.city": 1}, "entries": entries}]
        }])
    };
    let ns = ns("people");

    let consistent = store_with(people(json!([
        entry(json!({"addr.city": "X"}), 0, 1),
        entry(json!({"addr.city": "Y"}), 0, 2)
    ])));
    let index = index_named(&consistent, &ns, "addr.city_1");
    let outcome = validate_index(&consistent, &ns, &index).unwrap();
    assert!(outcome.mismatches.is_empty());
    assert_eq!(outcome.stats.probed, 4);

    // The entry for (0,2) still carries the old city
    let stale = store_with(people(json!([
        entry(json!({"addr.city": "X"}), 0, 1),
        entry(json!({"addr.city": "Z"}), 0, 2)
    ])));
    let outcome = validate_index(&stale, &ns, &index).unwrap();
    assert_eq!(outcome.mismatches.len(), 2);
    assert!(outcome
        .mismatches
        .iter()
        .all(|m| m.disk_loc == Some(DiskLoc::new(0, 2))));
}

#[test]
fn test_array_under_nested_path_is_multikey() {
    let store = store_with(json!([{
        "name": "people",
        "documents": [stored(0, 1, json!({"_id": 1, "addr": [{"city": "X"}, {"city": "Y"}]}))],
        "indexes": [{"name": "addr.city_1", "key": {"addr.city": 1}}]
    }]));
    let report = validate_store(&store, &ValidateConfig::default()).unwrap();
    assert_eq!(
        report.collections[0].indexes[0].status,
        IndexStatus::SkippedMultiKey
    );
}

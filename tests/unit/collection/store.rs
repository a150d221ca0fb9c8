use super::*;
use std::collections::BTreeSet;

fn store() -> InMemorySource {
    let def: StoreDef = serde_json::from_value(serde_json::json!({
        "published": [{
            "id": "posts",
            "fields": [
                { "id": "title", "key": "title", "type": "text" },
                { "id": "author", "key": "author", "type": "reference", "reference_collection_id": "people" },
                { "id": "tags", "key": "tags", "type": "multi_reference", "reference_collection_id": "tags" }
            ],
            "items": [
                { "id": "p3", "manual_order": 2, "values": { "title": "Third", "tags": "not json" } },
                { "id": "p1", "manual_order": 0, "values": { "title": "First", "author": "u1", "tags": "[\"t1\",\"t2\"]" } },
                { "id": "p2", "manual_order": 1, "values": { "title": "Second", "author": " " } }
            ]
        }]
    }))
    .unwrap();
    InMemorySource::from_def(def).unwrap()
}

#[test]
fn items_come_back_in_manual_order_with_total() {
    let s = store();
    let page = s.items_with_values("posts", true, &ItemQuery::all()).unwrap();
    let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["p1", "p2", "p3"]);
    assert_eq!(page.total, 3);
    assert!(page.items.iter().all(|i| i.collection_id == "posts"));
}

#[test]
fn window_and_id_filter_keep_filtered_total() {
    let s = store();
    let q = ItemQuery {
        limit: Some(1),
        offset: 1,
        item_ids: Some(BTreeSet::from(["p1".to_string(), "p3".to_string()])),
    };
    let page = s.items_with_values("posts", true, &q).unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, "p3");

    let empty = ItemQuery {
        item_ids: Some(BTreeSet::new()),
        ..ItemQuery::all()
    };
    let page = s.items_with_values("posts", true, &empty).unwrap();
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
}

#[test]
fn offset_past_end_is_an_empty_window() {
    let s = store();
    let q = ItemQuery {
        limit: Some(10),
        offset: 50,
        item_ids: None,
    };
    let page = s.items_with_values("posts", true, &q).unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 3);
}

#[test]
fn reference_values_are_decoded_at_the_boundary() {
    let s = store();
    let p1 = s.item("posts", "p1", true).unwrap().unwrap();
    assert_eq!(
        p1.values["author"],
        FieldValue::References(vec!["u1".to_string()])
    );
    assert_eq!(
        p1.values["tags"],
        FieldValue::References(vec!["t1".to_string(), "t2".to_string()])
    );

    let p2 = s.item("posts", "p2", true).unwrap().unwrap();
    assert!(p2.values["author"].is_empty());

    // Malformed JSON is "no referenced items", not an error.
    let p3 = s.item("posts", "p3", true).unwrap().unwrap();
    assert_eq!(p3.values["tags"], FieldValue::References(vec![]));
}

#[test]
fn draft_and_published_are_separate() {
    let s = store();
    assert!(s.items_with_values("posts", false, &ItemQuery::all()).is_err());
    assert!(s.fields("posts", true).unwrap().len() == 3);
    assert!(s.item("posts", "nope", true).unwrap().is_none());
}

#[test]
fn duplicate_ids_are_rejected() {
    let def: StoreDef = serde_json::from_value(serde_json::json!({
        "draft": [{ "id": "a", "items": [{ "id": "x" }, { "id": "x" }] }]
    }))
    .unwrap();
    let err = InMemorySource::from_def(def).unwrap_err();
    assert!(err.to_string().contains("duplicate item id"));
}

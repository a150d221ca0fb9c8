use super::*;
use crate::collection::model::{FieldValue, ItemPage, ItemQuery};
use crate::collection::store::{InMemorySource, StoreDef};
use crate::foundation::error::TrellisError;
use crate::foundation::log::RecordingLog;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingSource {
    inner: InMemorySource,
    item_fetches: AtomicUsize,
}

impl CollectionSource for CountingSource {
    fn items_with_values(
        &self,
        collection_id: &str,
        published: bool,
        query: &ItemQuery,
    ) -> TrellisResult<ItemPage> {
        self.item_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.items_with_values(collection_id, published, query)
    }

    fn fields(&self, collection_id: &str, published: bool) -> TrellisResult<Vec<CollectionField>> {
        self.inner.fields(collection_id, published)
    }
}

struct FailingSource;

impl CollectionSource for FailingSource {
    fn items_with_values(&self, _: &str, _: bool, _: &ItemQuery) -> TrellisResult<ItemPage> {
        Err(TrellisError::fetch("database offline"))
    }

    fn fields(&self, _: &str, _: bool) -> TrellisResult<Vec<CollectionField>> {
        Err(TrellisError::fetch("database offline"))
    }
}

fn cyclic_store() -> CountingSource {
    let def: StoreDef = serde_json::from_value(serde_json::json!({
        "published": [
            {
                "id": "articles",
                "fields": [
                    { "id": "a_title", "key": "title", "type": "text" },
                    { "id": "a_author", "key": "author", "type": "reference", "reference_collection_id": "authors" }
                ],
                "items": [{ "id": "a1", "values": { "a_title": "Cycles", "a_author": "b1" } }]
            },
            {
                "id": "authors",
                "fields": [
                    { "id": "b_name", "key": "name", "type": "text" },
                    { "id": "b_best", "key": "best", "type": "reference", "reference_collection_id": "articles" },
                    { "id": "b_team", "key": "team", "type": "multi_reference", "reference_collection_id": "teams" }
                ],
                "items": [{ "id": "b1", "values": { "b_name": "Ada", "b_best": "a1", "b_team": "[\"missing\",\"t1\"]" } }]
            },
            {
                "id": "teams",
                "fields": [{ "id": "t_name", "key": "name", "type": "text" }],
                "items": [{ "id": "t1", "values": { "t_name": "Core" } }]
            }
        ]
    }))
    .unwrap();
    CountingSource {
        inner: InMemorySource::from_def(def).unwrap(),
        item_fetches: AtomicUsize::new(0),
    }
}

fn article(src: &CountingSource) -> (ItemValues, Vec<CollectionField>) {
    let item = src.inner.item("articles", "a1", true).unwrap().unwrap();
    let fields = src.inner.fields("articles", true).unwrap();
    (item.values, fields)
}

#[test]
fn references_merge_under_dotted_keys() {
    let src = cyclic_store();
    let (values, fields) = article(&src);
    let log = RecordingLog::new();
    let out = resolve_references(&src, true, &values, &fields, &log);

    assert_eq!(out["a_title"], FieldValue::from("Cycles"));
    assert_eq!(out["a_author.b_name"], FieldValue::from("Ada"));
    assert_eq!(out["a_author.b_best.a_title"], FieldValue::from("Cycles"));
    // Multi-reference merges its first resolvable item.
    assert_eq!(out["a_author.b_team.t_name"], FieldValue::from("Core"));
    assert!(log.warnings().is_empty());
}

#[test]
fn cycles_terminate_and_skip_the_second_visit() {
    let src = cyclic_store();
    let (values, fields) = article(&src);
    let out = resolve_references(&src, true, &values, &fields, &RecordingLog::new());

    assert!(
        !out
            .keys()
            .any(|k| k.starts_with("a_author.b_best.a_author.")),
        "second visit of (a_author, b1) must be omitted: {:?}",
        out.keys().collect::<Vec<_>>()
    );

    // b1, a1, "missing", t1: one fetch per distinct pair, nothing repeated.
    assert_eq!(src.item_fetches.load(Ordering::SeqCst), 4);
}

#[test]
fn repeated_pairs_reuse_the_first_expansion() {
    let def: StoreDef = serde_json::from_value(serde_json::json!({
        "draft": [
            {
                "id": "posts",
                "fields": [
                    { "id": "writer", "key": "writer", "type": "reference", "reference_collection_id": "people" },
                    { "id": "editor", "key": "editor", "type": "reference", "reference_collection_id": "people" }
                ],
                "items": [{ "id": "p1", "values": { "writer": "u1", "editor": "u2" } }]
            },
            {
                "id": "people",
                "fields": [
                    { "id": "name", "key": "name", "type": "text" },
                    { "id": "org", "key": "org", "type": "reference", "reference_collection_id": "orgs" }
                ],
                "items": [
                    { "id": "u1", "values": { "name": "Grace", "org": "o1" } },
                    { "id": "u2", "values": { "name": "Alan", "org": "o1" } }
                ]
            },
            {
                "id": "orgs",
                "fields": [{ "id": "org_name", "key": "name", "type": "text" }],
                "items": [{ "id": "o1", "values": { "org_name": "Acme" } }]
            }
        ]
    }))
    .unwrap();
    let src = CountingSource {
        inner: InMemorySource::from_def(def).unwrap(),
        item_fetches: AtomicUsize::new(0),
    };
    let item = src.inner.item("posts", "p1", false).unwrap().unwrap();
    let fields = src.inner.fields("posts", false).unwrap();

    let out = resolve_references(&src, false, &item.values, &fields, &RecordingLog::new());
    assert_eq!(out["writer.name"], FieldValue::from("Grace"));
    assert_eq!(out["editor.name"], FieldValue::from("Alan"));
    assert_eq!(out["writer.org.org_name"], FieldValue::from("Acme"));
    assert_eq!(out["editor.org.org_name"], FieldValue::from("Acme"));
    // writer:u1, org:o1, editor:u2; the second org:o1 comes from the first expansion.
    assert_eq!(src.item_fetches.load(Ordering::SeqCst), 3);
}

#[test]
fn fetch_failures_are_logged_and_skipped() {
    let mut values = ItemValues::new();
    values.insert("title".to_string(), "x".into());
    values.insert(
        "author".to_string(),
        FieldValue::References(vec!["u1".to_string()]),
    );
    let fields = vec![CollectionField {
        id: "author".to_string(),
        key: "author".to_string(),
        field_type: crate::collection::model::FieldType::Reference,
        reference_collection_id: Some("people".to_string()),
    }];
    let log = RecordingLog::new();
    let out = resolve_references(&FailingSource, true, &values, &fields, &log);

    assert_eq!(out, values);
    assert_eq!(
        log.warnings(),
        vec![ResolveWarning::ReferenceFetchFailed {
            field_id: "author".to_string(),
            item_id: "u1".to_string(),
            message: "fetch error: database offline".to_string(),
        }]
    );
}

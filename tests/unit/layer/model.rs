use super::*;

#[test]
fn stored_layer_json_parses_into_typed_slots() {
    let layer: Layer = serde_json::from_value(serde_json::json!({
        "id": "list",
        "name": "div",
        "variables": {
            "collection": {
                "collection_id": "posts",
                "sort": { "by": { "type": "field", "field_id": "date" }, "order": "desc" },
                "pagination": { "enabled": true, "items_per_page": 3 }
            }
        },
        "children": [{
            "id": "title",
            "name": "text",
            "variables": {
                "text": { "type": "dynamic_field", "field": { "field_id": "title" } },
                "link": { "type": "page", "page_id": "home" }
            }
        }]
    }))
    .unwrap();

    let binding = layer.collection_binding().unwrap();
    assert_eq!(
        binding.sort.by,
        SortBy::Field {
            field_id: "date".to_string()
        }
    );
    assert_eq!(binding.sort.order, SortOrder::Desc);
    assert_eq!(binding.items_per_page(10), Some(3));
    assert!(layer.starts_binding_scope());

    let title = &layer.children[0];
    assert_eq!(
        title.variables.text,
        Some(TextValue::DynamicField {
            field: FieldRef::new("title")
        })
    );
    assert!(!title.starts_binding_scope());
}

#[test]
fn synthetic_fields_are_omitted_when_absent() {
    let v = serde_json::to_value(Layer::new("a", "div")).unwrap();
    assert_eq!(v, serde_json::json!({ "id": "a", "name": "div" }));
}

#[test]
fn pagination_meta_uses_camel_case_on_the_wire() {
    let meta = PaginationMeta {
        layer_id: "list".to_string(),
        collection_id: "posts".to_string(),
        current_page: 2,
        total_pages: 3,
        total_items: 5,
        items_per_page: 2,
    };
    let v = serde_json::to_value(&meta).unwrap();
    assert_eq!(v["currentPage"], 2);
    assert_eq!(v["totalPages"], 3);
    assert_eq!(v["layerId"], "list");
}

#[test]
fn empty_collection_id_leaves_layer_unbound() {
    let mut layer = Layer::new("a", "div");
    layer.variables.collection = Some(CollectionBinding::new(" "));
    assert!(layer.collection_binding().is_none());
}

#[test]
fn items_per_page_falls_back_to_default() {
    let mut b = CollectionBinding::new("posts");
    assert_eq!(b.items_per_page(10), None);
    b.pagination = Some(PaginationSettings {
        enabled: true,
        items_per_page: Some(0),
    });
    assert_eq!(b.items_per_page(10), Some(10));
    b.pagination = Some(PaginationSettings {
        enabled: false,
        items_per_page: Some(4),
    });
    assert_eq!(b.items_per_page(10), None);
}

#[test]
fn field_ref_key_joins_relationships() {
    assert_eq!(FieldRef::new("author").key(), "author");
    assert_eq!(
        FieldRef::through("author", &["company", "name"]).key(),
        "author.company.name"
    );
}

#[test]
fn component_library_serializes_as_list() {
    let lib: ComponentLibrary = serde_json::from_value(serde_json::json!([
        { "id": "card", "layers": [{ "id": "t", "name": "text" }] },
        { "id": "hero" }
    ]))
    .unwrap();
    assert_eq!(lib.len(), 2);
    assert_eq!(lib.get("card").unwrap().layers.len(), 1);
    assert!(lib.get("nope").is_none());
}

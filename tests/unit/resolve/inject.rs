use super::*;
use crate::layer::dsl::{LayerBuilder, collection};

fn values() -> ItemValues {
    let mut v = ItemValues::new();
    v.insert("title".to_string(), "Hello".into());
    v.insert("cover".to_string(), "/img/cover.png".into());
    v.insert("url".to_string(), "https://example.com".into());
    v.insert("author.name".to_string(), "Ada".into());
    v.insert(
        "body".to_string(),
        r#"[{"type":"text","text":"Rich","marks":["bold"]}]"#.into(),
    );
    v
}

fn fields() -> Vec<CollectionField> {
    vec![
        CollectionField {
            id: "title".to_string(),
            key: "title".to_string(),
            field_type: FieldType::Text,
            reference_collection_id: None,
        },
        CollectionField {
            id: "body".to_string(),
            key: "body".to_string(),
            field_type: FieldType::RichText,
            reference_collection_id: None,
        },
    ]
}

#[test]
fn field_bindings_become_static_values() {
    let layer = LayerBuilder::new("card", "div")
        .child(LayerBuilder::new("t", "text").text_field(FieldRef::new("title")).build())
        .child(LayerBuilder::new("img", "image").image_field(FieldRef::new("cover")).build())
        .child(LayerBuilder::new("a", "link").link_field(FieldRef::new("url")).build())
        .child(
            LayerBuilder::new("by", "text")
                .text_field(FieldRef::through("author", &["name"]))
                .build(),
        )
        .build();

    let out = inject_item_values(&layer, &values(), &fields());
    assert_eq!(out.children[0].variables.text, Some(TextValue::text("Hello")));
    assert_eq!(
        out.children[1].variables.image,
        Some(MediaValue::Static {
            url: "/img/cover.png".to_string()
        })
    );
    assert_eq!(
        out.children[2].variables.link,
        Some(LinkValue::Url {
            href: "https://example.com".to_string()
        })
    );
    assert_eq!(out.children[3].variables.text, Some(TextValue::text("Ada")));
    // The input tree is left alone.
    assert!(matches!(
        layer.children[0].variables.text,
        Some(TextValue::DynamicField { .. })
    ));
}

#[test]
fn inline_tokens_are_replaced_and_missing_values_are_empty() {
    let content = format!(
        "{} by {} ({})",
        inline_variable_token(&FieldRef::new("title")),
        inline_variable_token(&FieldRef::through("author", &["name"])),
        inline_variable_token(&FieldRef::new("missing")),
    );
    let layer = LayerBuilder::new("t", "text").dynamic_text(content).build();

    let out = inject_item_values(&layer, &values(), &fields());
    assert_eq!(out.variables.text, Some(TextValue::text("Hello by Ada ()")));
}

#[test]
fn malformed_tokens_resolve_to_empty_text() {
    let layer = LayerBuilder::new("t", "text")
        .dynamic_text("a<inline-variable>{not json</inline-variable>b")
        .build();
    let out = inject_item_values(&layer, &values(), &fields());
    assert_eq!(out.variables.text, Some(TextValue::text("ab")));
}

#[test]
fn rich_text_variables_become_text_nodes() {
    let layer = LayerBuilder::new("rt", "text")
        .rich_text(vec![RichTextNode::Element {
            tag: "paragraph".to_string(),
            children: vec![
                RichTextNode::Text {
                    text: "Title: ".to_string(),
                    marks: vec![],
                },
                RichTextNode::Variable {
                    field: FieldRef::new("title"),
                },
            ],
        }])
        .build();

    let out = inject_item_values(&layer, &values(), &fields());
    let Some(TextValue::DynamicRichText { nodes }) = out.variables.text else {
        panic!("rich text stays structured");
    };
    assert_eq!(
        nodes,
        vec![RichTextNode::Element {
            tag: "paragraph".to_string(),
            children: vec![
                RichTextNode::Text {
                    text: "Title: ".to_string(),
                    marks: vec![],
                },
                RichTextNode::Text {
                    text: "Hello".to_string(),
                    marks: vec![],
                },
            ],
        }]
    );
}

#[test]
fn direct_rich_text_field_is_parsed_into_nodes() {
    let layer = LayerBuilder::new("rt", "text")
        .text_field(FieldRef::new("body"))
        .build();
    let out = inject_item_values(&layer, &values(), &fields());
    assert_eq!(
        out.variables.text,
        Some(TextValue::DynamicRichText {
            nodes: vec![RichTextNode::Text {
                text: "Rich".to_string(),
                marks: vec!["bold".to_string()],
            }]
        })
    );
}

#[test]
fn nested_collection_scopes_are_not_entered() {
    let nested = LayerBuilder::new("inner", "div")
        .collection(collection("tags"))
        .child(LayerBuilder::new("tag", "text").text_field(FieldRef::new("title")).build())
        .build();
    let layer = LayerBuilder::new("card", "div").child(nested.clone()).build();

    let out = inject_item_values(&layer, &values(), &fields());
    assert_eq!(out.children[0], nested);
}

#[test]
fn token_detection() {
    assert!(has_inline_token(&inline_variable_token(&FieldRef::new("x"))));
    assert!(!has_inline_token("plain text"));
}

use super::*;
use crate::foundation::log::RecordingLog;
use crate::layer::dsl::LayerBuilder;
use crate::layer::model::{ComponentVariable, FieldRef};

fn card() -> Component {
    Component {
        id: "card".to_string(),
        name: "Card".to_string(),
        layers: vec![
            LayerBuilder::new("box", "div")
                .child(LayerBuilder::new("heading", "text").component_text("v_title").build())
                .child(LayerBuilder::new("caption", "text").component_text("v_caption").build())
                .child(LayerBuilder::new("extra", "text").component_text("v_extra").build())
                .build(),
        ],
        variables: vec![
            ComponentVariable {
                id: "v_title".to_string(),
                name: "Title".to_string(),
                default: Some(TextValue::text("Untitled")),
            },
            ComponentVariable {
                id: "v_caption".to_string(),
                name: "Caption".to_string(),
                default: Some(TextValue::text("No caption")),
            },
            ComponentVariable {
                id: "v_extra".to_string(),
                name: "Extra".to_string(),
                default: None,
            },
        ],
    }
}

fn library(components: impl IntoIterator<Item = Component>) -> ComponentLibrary {
    components.into_iter().collect::<Vec<_>>().into()
}

#[test]
fn instances_expand_with_overrides_and_defaults() {
    let page = vec![
        LayerBuilder::new("hero", "section")
            .component("card")
            .override_text("v_title", TextValue::text("Welcome"))
            .build(),
    ];
    let log = RecordingLog::new();
    let out = expand_components(&page, &library([card()]), &log);

    let hero = &out[0];
    assert_eq!(hero.id, "hero");
    assert_eq!(hero.component, None);
    assert_eq!(hero.attributes[COMPONENT_ID_ATTR], "card");

    let body = &hero.children[0];
    assert_eq!(body.id, "hero-box");
    let texts: Vec<_> = body
        .children
        .iter()
        .map(|c| (c.id.as_str(), c.variables.text.clone()))
        .collect();
    assert_eq!(
        texts,
        vec![
            ("hero-heading", Some(TextValue::text("Welcome"))),
            ("hero-caption", Some(TextValue::text("No caption"))),
            ("hero-extra", Some(TextValue::text(""))),
        ]
    );
    assert!(log.warnings().is_empty());
    // Input untouched.
    assert!(page[0].component.is_some());
}

#[test]
fn overrides_may_bind_fields_for_later_injection() {
    let field = TextValue::DynamicField {
        field: FieldRef::new("title"),
    };
    let page = vec![
        LayerBuilder::new("c", "div")
            .component("card")
            .override_text("v_title", field.clone())
            .build(),
    ];
    let out = expand_components(&page, &library([card()]), &RecordingLog::new());
    assert_eq!(out[0].children[0].children[0].variables.text, Some(field));
}

#[test]
fn nested_instances_expand_with_forwarded_variables() {
    let wrapper = Component {
        id: "wrapper".to_string(),
        name: String::new(),
        layers: vec![
            LayerBuilder::new("inner", "div")
                .component("card")
                .override_text(
                    "v_title",
                    TextValue::ComponentVariable {
                        variable_id: "w_title".to_string(),
                    },
                )
                .build(),
        ],
        variables: vec![],
    };
    let page = vec![
        LayerBuilder::new("w", "div")
            .component("wrapper")
            .override_text("w_title", TextValue::text("Forwarded"))
            .build(),
    ];
    let out = expand_components(&page, &library([card(), wrapper]), &RecordingLog::new());

    let inner = &out[0].children[0];
    assert_eq!(inner.id, "w-inner");
    assert_eq!(inner.attributes[COMPONENT_ID_ATTR], "card");
    let heading = &inner.children[0].children[0];
    assert_eq!(heading.id, "w-inner-heading");
    assert_eq!(heading.variables.text, Some(TextValue::text("Forwarded")));
}

#[test]
fn cycles_and_missing_components_are_logged() {
    let looped = Component {
        id: "loop".to_string(),
        name: String::new(),
        layers: vec![LayerBuilder::new("again", "div").component("loop").build()],
        variables: vec![],
    };
    let page = vec![
        LayerBuilder::new("a", "div").component("loop").build(),
        LayerBuilder::new("b", "div").component("nope").build(),
    ];
    let log = RecordingLog::new();
    let out = expand_components(&page, &library([looped]), &log);

    assert_eq!(out[0].children[0].id, "a-again");
    assert!(out[0].children[0].children.is_empty());
    assert!(out[1].children.is_empty());
    assert_eq!(
        log.warnings(),
        vec![
            ResolveWarning::ComponentCycle {
                layer_id: "a-again".to_string(),
                component_id: "loop".to_string(),
            },
            ResolveWarning::ComponentMissing {
                layer_id: "b".to_string(),
                component_id: "nope".to_string(),
            },
        ]
    );
}

#[test]
fn trees_without_instances_are_returned_as_is() {
    let page = vec![
        LayerBuilder::new("a", "div")
            .child(LayerBuilder::new("t", "text").component_text("orphan").build())
            .build(),
    ];
    assert_eq!(
        expand_components(&page, &library([card()]), &RecordingLog::new()),
        page
    );
}

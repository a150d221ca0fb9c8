use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::{
    collection::model::{CollectionField, FieldType, ItemValues},
    layer::model::{
        FieldRef, Layer, LinkValue, MediaValue, RichTextNode, TextValue, VariableBindings,
    },
};

const TOKEN_OPEN: &str = "<inline-variable>";
const TOKEN_CLOSE: &str = "</inline-variable>";

static INLINE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<inline-variable>(.*?)</inline-variable>")
        .expect("inline variable pattern is valid")
});

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
enum InlineVariable {
    Field(FieldRef),
}

/// Encode `field` as an inline-variable token for plain or rich text.
pub fn inline_variable_token(field: &FieldRef) -> String {
    let payload = serde_json::to_string(&InlineVariable::Field(field.clone())).unwrap_or_default();
    format!("{TOKEN_OPEN}{payload}{TOKEN_CLOSE}")
}

/// Return `true` when `text` still holds an inline-variable token.
pub fn has_inline_token(text: &str) -> bool {
    INLINE_TOKEN_RE.is_match(text)
}

/// Substitute `values` into every field binding of `layer` and its descendants.
///
/// Descendants that open their own binding scope (collection layers and fragments) are copied
/// untouched: their items supply the context there. Missing values become empty strings, as do
/// malformed tokens.
pub fn inject_item_values(layer: &Layer, values: &ItemValues, fields: &[CollectionField]) -> Layer {
    Layer {
        id: layer.id.clone(),
        name: layer.name.clone(),
        children: layer
            .children
            .iter()
            .map(|c| {
                if c.starts_binding_scope() {
                    c.clone()
                } else {
                    inject_item_values(c, values, fields)
                }
            })
            .collect(),
        variables: inject_variables(&layer.variables, values, fields),
        attributes: layer.attributes.clone(),
        settings: layer.settings.clone(),
        component: layer.component.clone(),
        fragment: layer.fragment.clone(),
        pagination_meta: layer.pagination_meta.clone(),
        collection_item: layer.collection_item.clone(),
    }
}

fn inject_variables(
    vars: &VariableBindings,
    values: &ItemValues,
    fields: &[CollectionField],
) -> VariableBindings {
    VariableBindings {
        text: vars.text.as_ref().map(|t| inject_text(t, values, fields)),
        image: vars.image.as_ref().map(|m| inject_media(m, values)),
        video: vars.video.as_ref().map(|m| inject_media(m, values)),
        icon: vars.icon.as_ref().map(|m| inject_media(m, values)),
        link: vars.link.as_ref().map(|l| inject_link(l, values)),
        collection: vars.collection.clone(),
        conditional_visibility: vars.conditional_visibility.clone(),
    }
}

fn inject_text(text: &TextValue, values: &ItemValues, fields: &[CollectionField]) -> TextValue {
    match text {
        TextValue::Static { .. } | TextValue::ComponentVariable { .. } => text.clone(),
        TextValue::DynamicText { content } => TextValue::Static {
            content: replace_inline_tokens(content, values),
        },
        TextValue::DynamicField { field } => {
            let raw = lookup(values, field);
            if let Some(nodes) = rich_text_field_nodes(field, &raw, fields) {
                return TextValue::DynamicRichText {
                    nodes: inject_rich_nodes(&nodes, values),
                };
            }
            TextValue::Static { content: raw }
        }
        TextValue::DynamicRichText { nodes } => TextValue::DynamicRichText {
            nodes: inject_rich_nodes(nodes, values),
        },
    }
}

// A direct binding to a rich_text field yields structured nodes when the stored value parses.
fn rich_text_field_nodes(
    field: &FieldRef,
    raw: &str,
    fields: &[CollectionField],
) -> Option<Vec<RichTextNode>> {
    if !field.relationships.is_empty() {
        return None;
    }
    let def = fields.iter().find(|f| f.id == field.field_id)?;
    if def.field_type != FieldType::RichText {
        return None;
    }
    serde_json::from_str::<Vec<RichTextNode>>(raw).ok()
}

fn inject_rich_nodes(nodes: &[RichTextNode], values: &ItemValues) -> Vec<RichTextNode> {
    nodes
        .iter()
        .map(|n| match n {
            RichTextNode::Text { text, marks } => RichTextNode::Text {
                text: replace_inline_tokens(text, values),
                marks: marks.clone(),
            },
            RichTextNode::Variable { field } => RichTextNode::Text {
                text: lookup(values, field),
                marks: Vec::new(),
            },
            RichTextNode::Element { tag, children } => RichTextNode::Element {
                tag: tag.clone(),
                children: inject_rich_nodes(children, values),
            },
        })
        .collect()
}

fn inject_media(media: &MediaValue, values: &ItemValues) -> MediaValue {
    match media {
        MediaValue::DynamicField { field } => MediaValue::Static {
            url: lookup(values, field),
        },
        _ => media.clone(),
    }
}

fn inject_link(link: &LinkValue, values: &ItemValues) -> LinkValue {
    match link {
        LinkValue::DynamicField { field } => LinkValue::Url {
            href: lookup(values, field),
        },
        _ => link.clone(),
    }
}

fn replace_inline_tokens(content: &str, values: &ItemValues) -> String {
    if !content.contains(TOKEN_OPEN) {
        return content.to_owned();
    }
    INLINE_TOKEN_RE
        .replace_all(content, |caps: &Captures<'_>| {
            match serde_json::from_str::<InlineVariable>(&caps[1]) {
                Ok(InlineVariable::Field(field)) => lookup(values, &field),
                Err(_) => String::new(),
            }
        })
        .into_owned()
}

fn lookup(values: &ItemValues, field: &FieldRef) -> String {
    values
        .get(field.key().as_ref())
        .map(|v| v.as_text().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/inject.rs"]
mod tests;

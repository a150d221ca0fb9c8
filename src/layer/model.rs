use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::{collection::model::ItemValues, visibility::condition::ConditionSet};

/// `name` carried by synthetic fragment layers.
pub const FRAGMENT_LAYER_NAME: &str = "fragment";
/// Attribute stamped on every per-item clone.
pub const ITEM_ID_ATTR: &str = "data-collection-item-id";
/// Attribute stamped on expanded component instances.
pub const COMPONENT_ID_ATTR: &str = "data-component-id";

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// A node of the declarative page tree.
///
/// Stored trees only use the public fields up to `component`. The `_`-prefixed fields are
/// written by the resolver and read by renderers and the client-side hydration code.
pub struct Layer {
    /// Layer identifier, unique within a tree.
    pub id: String,
    /// Element/kind tag (for example `"div"`, `"text"`, `"image"`).
    pub name: String,
    /// Child layers in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Layer>,
    /// Typed binding slots.
    #[serde(default, skip_serializing_if = "VariableBindings::is_empty")]
    pub variables: VariableBindings,
    /// HTML-ish attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Opaque renderer settings, passed through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub settings: serde_json::Value,
    /// Component instance marker; expanded before binding resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentInstance>,

    /// Set on fragments produced by collection binding resolution.
    #[serde(rename = "_fragment", default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<FragmentInfo>,
    /// Pagination state of a paginated fragment.
    #[serde(
        rename = "_pagination_meta",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pagination_meta: Option<PaginationMeta>,
    /// Item a per-item clone was produced for.
    #[serde(
        rename = "_collection_item",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub collection_item: Option<BoundItem>,
}

impl Layer {
    /// Create a childless layer with no bindings.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Return `true` for synthetic fragments.
    pub fn is_fragment(&self) -> bool {
        self.fragment.is_some()
    }

    /// Collection binding, if the layer declares one with a non-empty collection id.
    pub fn collection_binding(&self) -> Option<&CollectionBinding> {
        self.variables
            .collection
            .as_ref()
            .filter(|b| !b.collection_id.trim().is_empty())
    }

    /// Return `true` when this subtree is owned by its own binding context.
    ///
    /// Both unresolved collection layers and already-resolved fragments qualify; the injector
    /// never descends into either.
    pub fn starts_binding_scope(&self) -> bool {
        self.collection_binding().is_some() || self.is_fragment()
    }

    /// Depth-first pre-order visit of this layer and its descendants.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Layer)) {
        f(self);
        for c in &self.children {
            c.visit(f);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// One optional typed value per binding slot.
pub struct VariableBindings {
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextValue>,
    /// Image source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaValue>,
    /// Video source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaValue>,
    /// Icon source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<MediaValue>,
    /// Link target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkValue>,
    /// Collection source binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionBinding>,
    /// Conditional visibility expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_visibility: Option<ConditionSet>,
}

impl VariableBindings {
    /// Return `true` when no slot is set.
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.image.is_none()
            && self.video.is_none()
            && self.icon.is_none()
            && self.link.is_none()
            && self.collection.is_none()
            && self.conditional_visibility.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Field binding, optionally followed through reference fields.
pub struct FieldRef {
    /// Field on the bound item.
    pub field_id: String,
    /// Reference fields to follow, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<String>,
}

impl FieldRef {
    /// Direct field binding.
    pub fn new(field_id: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            relationships: Vec::new(),
        }
    }

    /// Binding that follows `relationships` after `field_id`.
    pub fn through(field_id: impl Into<String>, relationships: &[&str]) -> Self {
        Self {
            field_id: field_id.into(),
            relationships: relationships.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Key into reference-enhanced [`ItemValues`]: `"{field_id}.{rel}..."`.
    pub fn key(&self) -> Cow<'_, str> {
        if self.relationships.is_empty() {
            return Cow::Borrowed(self.field_id.as_str());
        }
        let mut k = self.field_id.clone();
        for r in &self.relationships {
            k.push('.');
            k.push_str(r);
        }
        Cow::Owned(k)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Value of the `text` slot.
pub enum TextValue {
    /// Literal text.
    Static {
        /// Text content.
        content: String,
    },
    /// Plain text containing inline-variable tokens.
    DynamicText {
        /// Text with `<inline-variable>{..}</inline-variable>` tokens.
        content: String,
    },
    /// Whole slot bound to one field.
    DynamicField {
        /// Bound field.
        field: FieldRef,
    },
    /// Structured rich text with embedded variables.
    DynamicRichText {
        /// Rich text nodes.
        nodes: Vec<RichTextNode>,
    },
    /// Bound to a variable of the enclosing component.
    ComponentVariable {
        /// Component variable id.
        variable_id: String,
    },
}

impl TextValue {
    /// Literal text value.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Static {
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Rich text node.
pub enum RichTextNode {
    /// Text run.
    Text {
        /// Text content; may contain inline-variable tokens.
        text: String,
        /// Formatting marks (`"bold"`, `"italic"`, ...).
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<String>,
    },
    /// Embedded field variable.
    Variable {
        /// Bound field.
        field: FieldRef,
    },
    /// Block or inline element wrapping other nodes.
    Element {
        /// Element tag (`"paragraph"`, `"heading"`, ...).
        tag: String,
        /// Child nodes.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<RichTextNode>,
    },
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Value of the `image`, `video` and `icon` slots.
pub enum MediaValue {
    /// Literal URL.
    Static {
        /// Source URL.
        url: String,
    },
    /// Asset managed by the asset store.
    Asset {
        /// Asset identifier.
        asset_id: String,
    },
    /// Bound to one field.
    DynamicField {
        /// Bound field.
        field: FieldRef,
    },
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Value of the `link` slot.
pub enum LinkValue {
    /// Literal URL.
    Url {
        /// Target URL.
        href: String,
    },
    /// Internal page.
    Page {
        /// Target page id.
        page_id: String,
    },
    /// Bound to one field.
    DynamicField {
        /// Bound field.
        field: FieldRef,
    },
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Collection-source binding: turns a layer into a list over collection items.
pub struct CollectionBinding {
    /// Bound collection; an empty id leaves the layer unbound.
    pub collection_id: String,
    /// Item order.
    #[serde(default)]
    pub sort: SortSpec,
    /// Static item limit (ignored when pagination is enabled).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Static item offset (ignored when pagination is enabled).
    #[serde(default)]
    pub offset: usize,
    /// Field of the parent item whose referenced ids restrict this list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_field_id: Option<String>,
    /// Type of `source_field_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_field_type: Option<SourceFieldType>,
    /// Declarative item filter, evaluated against each item's own values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<ConditionSet>,
    /// Pagination settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationSettings>,
}

impl CollectionBinding {
    /// Unsorted, unfiltered binding over `collection_id`.
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            sort: SortSpec::default(),
            limit: None,
            offset: 0,
            source_field_id: None,
            source_field_type: None,
            filters: None,
            pagination: None,
        }
    }

    /// Items per page when pagination is enabled, `None` otherwise.
    pub fn items_per_page(&self, default_per_page: usize) -> Option<usize> {
        let p = self.pagination.as_ref().filter(|p| p.enabled)?;
        Some(match p.items_per_page {
            Some(n) if n > 0 => n,
            _ => default_per_page,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Sort key and direction.
pub struct SortSpec {
    /// Sort key.
    #[serde(default)]
    pub by: SortBy,
    /// Direction.
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Sort key.
pub enum SortBy {
    /// Editor-defined `manual_order`.
    #[default]
    Manual,
    /// Fresh shuffle on every resolution.
    Random,
    /// Value of one field.
    Field {
        /// Sorted field.
        field_id: String,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Sort direction.
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Type of a binding's source field.
pub enum SourceFieldType {
    /// Parent holds one id.
    Reference,
    /// Parent holds a list of ids.
    MultiReference,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Pagination settings of a collection binding.
pub struct PaginationSettings {
    /// Enable pagination.
    #[serde(default)]
    pub enabled: bool,
    /// Items per page; unset or zero uses the engine default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Pagination state of one paginated collection layer (read by client-side hydration).
pub struct PaginationMeta {
    /// Original collection layer id.
    pub layer_id: String,
    /// Bound collection.
    pub collection_id: String,
    /// 1-based page being shown.
    pub current_page: usize,
    /// `ceil(total_items / items_per_page)`.
    pub total_pages: usize,
    /// Items matching the binding's id filter.
    pub total_items: usize,
    /// Page size.
    pub items_per_page: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Origin of a fragment.
pub struct FragmentInfo {
    /// Collection layer the fragment replaces.
    pub source_layer_id: String,
    /// Bound collection.
    pub collection_id: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Item bound to a per-item clone.
pub struct BoundItem {
    /// Item id.
    pub item_id: String,
    /// Item slug, when the collection has a slug field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Reference-enhanced values; the binding context below this clone.
    #[serde(default)]
    pub values: ItemValues,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Component instance marker.
pub struct ComponentInstance {
    /// Component to expand.
    pub component_id: String,
    /// Text overrides keyed by component variable id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, TextValue>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Reusable layer tree.
pub struct Component {
    /// Component id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Component body.
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Overridable text variables.
    #[serde(default)]
    pub variables: Vec<ComponentVariable>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Overridable text variable of a component.
pub struct ComponentVariable {
    /// Variable id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Value used when an instance does not override it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<TextValue>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "Vec<Component>", into = "Vec<Component>")]
/// Components addressable by id (serialized as a list).
pub struct ComponentLibrary {
    by_id: BTreeMap<String, Component>,
}

impl ComponentLibrary {
    /// Empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a component.
    pub fn insert(&mut self, component: Component) {
        self.by_id.insert(component.id.clone(), component);
    }

    /// Look up a component.
    pub fn get(&self, component_id: &str) -> Option<&Component> {
        self.by_id.get(component_id)
    }

    /// Components in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.by_id.values()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Return `true` when the library holds no component.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl From<Vec<Component>> for ComponentLibrary {
    fn from(v: Vec<Component>) -> Self {
        let mut lib = Self::new();
        for c in v {
            lib.insert(c);
        }
        lib
    }
}

impl From<ComponentLibrary> for Vec<Component> {
    fn from(lib: ComponentLibrary) -> Self {
        lib.by_id.into_values().collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layer/model.rs"]
mod tests;

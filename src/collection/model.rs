use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Declared type of a collection field.
pub enum FieldType {
    /// Plain text.
    Text,
    /// Numeric value stored as text.
    Number,
    /// Boolean stored as `"true"` / `"false"`.
    Boolean,
    /// Date/time stored as text.
    Date,
    /// Image URL or asset id.
    Image,
    /// Link URL.
    Link,
    /// Rich text stored as a JSON node list.
    RichText,
    /// Single foreign item id.
    Reference,
    /// Many foreign item ids.
    MultiReference,
}

impl FieldType {
    /// Return `true` for `reference` and `multi_reference`.
    pub fn is_reference(self) -> bool {
        matches!(self, Self::Reference | Self::MultiReference)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Field definition on a collection.
pub struct CollectionField {
    /// Field identifier (key of [`ItemValues`]).
    pub id: String,
    /// Human-facing key (for example `"slug"`).
    pub key: String,
    /// Declared value type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Target collection for reference types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_collection_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
/// A decoded field value.
///
/// Reference ids are typed lists; stored JSON strings are decoded by the store, never by the
/// resolution passes.
pub enum FieldValue {
    /// Scalar value in its stored textual form.
    Text(String),
    /// Foreign item ids, in stored order.
    References(Vec<String>),
}

impl FieldValue {
    /// Textual form used when the value is injected into a layer.
    ///
    /// A single reference renders as its id; several render as a JSON array.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s.as_str()),
            Self::References(ids) if ids.len() == 1 => Cow::Borrowed(ids[0].as_str()),
            Self::References(ids) if ids.is_empty() => Cow::Borrowed(""),
            Self::References(ids) => Cow::Owned(serde_json::to_string(ids).unwrap_or_default()),
        }
    }

    /// Referenced ids; a non-empty text value counts as a single id.
    pub fn reference_ids(&self) -> Vec<&str> {
        match self {
            Self::Text(s) if s.trim().is_empty() => Vec::new(),
            Self::Text(s) => vec![s.as_str()],
            Self::References(ids) => ids.iter().map(String::as_str).collect(),
        }
    }

    /// Return `true` for blank text and empty id lists.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::References(ids) => ids.is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Field-keyed values of one item; also the propagated binding context.
///
/// Keys are field ids, or dotted paths (`"{field}.{refField}"`) after reference resolution.
pub type ItemValues = BTreeMap<String, FieldValue>;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// One CMS item.
pub struct CollectionItem {
    /// Item identifier.
    pub id: String,
    /// Owning collection.
    #[serde(default)]
    pub collection_id: String,
    /// Position under manual sorting.
    #[serde(default)]
    pub manual_order: i64,
    /// Decoded values.
    #[serde(default)]
    pub values: ItemValues,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Fetch window and id filter for [`crate::CollectionSource::items_with_values`].
pub struct ItemQuery {
    /// Maximum number of items; `None` means unbounded.
    pub limit: Option<usize>,
    /// Items to skip before the window starts.
    pub offset: usize,
    /// Restrict to these ids; `Some(empty)` matches nothing.
    pub item_ids: Option<BTreeSet<String>>,
}

impl ItemQuery {
    /// Query for every item of a collection.
    pub fn all() -> Self {
        Self::default()
    }

    /// Query for exactly one item id.
    pub fn by_id(item_id: &str) -> Self {
        Self {
            limit: Some(1),
            offset: 0,
            item_ids: Some(BTreeSet::from([item_id.to_owned()])),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
/// A window of items plus the total matching the query's id filter.
pub struct ItemPage {
    /// Items inside the requested window, in storage order.
    pub items: Vec<CollectionItem>,
    /// Count of all items matching the id filter, ignoring limit and offset.
    pub total: usize,
}

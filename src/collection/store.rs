use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::{
    collection::model::{
        CollectionField, CollectionItem, FieldType, FieldValue, ItemPage, ItemQuery, ItemValues,
    },
    collection::source::CollectionSource,
    foundation::error::{TrellisError, TrellisResult},
};

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
/// JSON store fixture: two parallel copies of the CMS data.
pub struct StoreDef {
    /// Draft collections (editor preview).
    #[serde(default)]
    pub draft: Vec<CollectionDef>,
    /// Published collections (live site).
    #[serde(default)]
    pub published: Vec<CollectionDef>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// A collection as stored: field definitions plus raw item rows.
pub struct CollectionDef {
    /// Collection identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Field definitions.
    #[serde(default)]
    pub fields: Vec<CollectionField>,
    /// Raw item rows.
    #[serde(default)]
    pub items: Vec<StoredItemDef>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Item row with every value in its stored string form.
pub struct StoredItemDef {
    /// Item identifier.
    pub id: String,
    /// Position under manual sorting.
    #[serde(default)]
    pub manual_order: i64,
    /// Raw values keyed by field id. Multi-reference values are JSON-encoded id arrays.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default)]
struct StoredCollection {
    fields: Vec<CollectionField>,
    // Storage order: manual_order, then id.
    items: Vec<CollectionItem>,
}

/// In-memory [`CollectionSource`] backed by a [`StoreDef`].
///
/// This is the serialization boundary for reference values: stored strings are decoded into
/// [`FieldValue::References`] once, when the store is built.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    draft: BTreeMap<String, StoredCollection>,
    published: BTreeMap<String, StoredCollection>,
}

impl InMemorySource {
    /// Build a source from a store definition.
    pub fn from_def(def: StoreDef) -> TrellisResult<Self> {
        let mut out = Self::default();
        for c in def.draft {
            out.insert_collection(false, c)?;
        }
        for c in def.published {
            out.insert_collection(true, c)?;
        }
        Ok(out)
    }

    /// Parse a store from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> TrellisResult<Self> {
        let def: StoreDef = serde_json::from_reader(r)
            .map_err(|e| TrellisError::serde(format!("parse store JSON: {e}")))?;
        Self::from_def(def)
    }

    /// Parse a store from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> TrellisResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TrellisError::validation(format!("open store JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Add one collection to the draft or published copy.
    pub fn insert_collection(&mut self, published: bool, def: CollectionDef) -> TrellisResult<()> {
        if def.id.trim().is_empty() {
            return Err(TrellisError::validation("collection id must be non-empty"));
        }
        let target = if published {
            &mut self.published
        } else {
            &mut self.draft
        };
        if target.contains_key(&def.id) {
            return Err(TrellisError::validation(format!(
                "duplicate collection id '{}'",
                def.id
            )));
        }

        let types: BTreeMap<&str, FieldType> = def
            .fields
            .iter()
            .map(|f| (f.id.as_str(), f.field_type))
            .collect();

        let mut items = Vec::with_capacity(def.items.len());
        for row in &def.items {
            if items.iter().any(|i: &CollectionItem| i.id == row.id) {
                return Err(TrellisError::validation(format!(
                    "collection '{}' has duplicate item id '{}'",
                    def.id, row.id
                )));
            }
            let values: ItemValues = row
                .values
                .iter()
                .map(|(k, raw)| {
                    let ty = types.get(k.as_str()).copied();
                    (k.clone(), decode_stored_value(raw, ty))
                })
                .collect();
            items.push(CollectionItem {
                id: row.id.clone(),
                collection_id: def.id.clone(),
                manual_order: row.manual_order,
                values,
            });
        }
        items.sort_by(|a, b| {
            a.manual_order
                .cmp(&b.manual_order)
                .then_with(|| a.id.cmp(&b.id))
        });

        target.insert(
            def.id,
            StoredCollection {
                fields: def.fields,
                items,
            },
        );
        Ok(())
    }

    fn collection(&self, collection_id: &str, published: bool) -> TrellisResult<&StoredCollection> {
        let map = if published {
            &self.published
        } else {
            &self.draft
        };
        map.get(collection_id).ok_or_else(|| {
            TrellisError::fetch(format!(
                "unknown {} collection '{collection_id}'",
                if published { "published" } else { "draft" }
            ))
        })
    }
}

impl CollectionSource for InMemorySource {
    fn items_with_values(
        &self,
        collection_id: &str,
        published: bool,
        query: &ItemQuery,
    ) -> TrellisResult<ItemPage> {
        let c = self.collection(collection_id, published)?;
        let matching: Vec<&CollectionItem> = c
            .items
            .iter()
            .filter(|i| query.item_ids.as_ref().is_none_or(|ids| ids.contains(&i.id)))
            .collect();
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(ItemPage { items, total })
    }

    fn fields(&self, collection_id: &str, published: bool) -> TrellisResult<Vec<CollectionField>> {
        Ok(self.collection(collection_id, published)?.fields.clone())
    }
}

/// Decode one stored string according to its field type.
///
/// Malformed multi-reference JSON decodes to an empty id list; values without a field
/// definition stay text.
pub fn decode_stored_value(raw: &str, field_type: Option<FieldType>) -> FieldValue {
    match field_type {
        Some(FieldType::Reference) => {
            let id = raw.trim();
            if id.is_empty() {
                FieldValue::References(Vec::new())
            } else {
                FieldValue::References(vec![id.to_owned()])
            }
        }
        Some(FieldType::MultiReference) => {
            let ids = serde_json::from_str::<Vec<String>>(raw).unwrap_or_default();
            FieldValue::References(ids.into_iter().filter(|id| !id.is_empty()).collect())
        }
        _ => FieldValue::Text(raw.to_owned()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/collection/store.rs"]
mod tests;

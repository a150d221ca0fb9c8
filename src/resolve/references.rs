use std::collections::{BTreeMap, BTreeSet};

use crate::{
    collection::model::{CollectionField, CollectionItem, ItemValues},
    collection::source::CollectionSource,
    foundation::error::TrellisResult,
    foundation::log::{ResolveLog, ResolveWarning},
};

/// Merge referenced items' values into `values` under dotted keys.
///
/// For each reference field holding an id, the referenced item's values (themselves enhanced
/// recursively) are merged as `"{fieldId}.{refKey}"`. A multi-reference field merges its first
/// resolvable item. A `(field_id, item_id)` pair is fetched at most once per call: a pair still
/// being expanded further up the chain (a cycle) is skipped, a pair already expanded elsewhere is
/// merged from the earlier result without another fetch.
///
/// Failed fetches are reported to `log` and the field is skipped.
#[tracing::instrument(level = "debug", skip_all, fields(fields = fields.len()))]
pub fn resolve_references<S: CollectionSource + ?Sized>(
    source: &S,
    published: bool,
    values: &ItemValues,
    fields: &[CollectionField],
    log: &dyn ResolveLog,
) -> ItemValues {
    let mut walk = ReferenceWalk {
        source,
        published,
        log,
        in_progress: BTreeSet::new(),
        done: BTreeMap::new(),
    };
    walk.enhance(values, fields)
}

struct ReferenceWalk<'a, S: ?Sized> {
    source: &'a S,
    published: bool,
    log: &'a dyn ResolveLog,
    // "{field_id}:{item_id}" pairs on the current chain.
    in_progress: BTreeSet<String>,
    // Enhanced values of pairs already expanded in this call.
    done: BTreeMap<String, ItemValues>,
}

impl<S: CollectionSource + ?Sized> ReferenceWalk<'_, S> {
    fn enhance(&mut self, values: &ItemValues, fields: &[CollectionField]) -> ItemValues {
        let mut out = values.clone();
        for field in fields.iter().filter(|f| f.field_type.is_reference()) {
            let Some(ref_collection) = field
                .reference_collection_id
                .as_deref()
                .filter(|c| !c.trim().is_empty())
            else {
                continue;
            };
            let Some(value) = values.get(&field.id) else {
                continue;
            };

            for ref_id in value.reference_ids() {
                if let Some(nested) = self.expand_pair(&field.id, ref_collection, ref_id) {
                    for (k, v) in nested {
                        out.insert(format!("{}.{k}", field.id), v);
                    }
                    break;
                }
            }
        }
        out
    }

    fn expand_pair(
        &mut self,
        field_id: &str,
        ref_collection: &str,
        ref_id: &str,
    ) -> Option<ItemValues> {
        let pair = format!("{field_id}:{ref_id}");
        if let Some(cached) = self.done.get(&pair) {
            return Some(cached.clone());
        }
        if self.in_progress.contains(&pair) {
            tracing::debug!(pair, "reference cycle skipped");
            return None;
        }

        let (item, ref_fields) = match self.fetch(ref_collection, ref_id) {
            Ok(Some(found)) => found,
            Ok(None) => return None,
            Err(e) => {
                self.log.warn(ResolveWarning::ReferenceFetchFailed {
                    field_id: field_id.to_owned(),
                    item_id: ref_id.to_owned(),
                    message: e.to_string(),
                });
                return None;
            }
        };

        self.in_progress.insert(pair.clone());
        let nested = self.enhance(&item.values, &ref_fields);
        self.in_progress.remove(&pair);

        self.done.insert(pair, nested.clone());
        Some(nested)
    }

    fn fetch(
        &self,
        collection_id: &str,
        item_id: &str,
    ) -> TrellisResult<Option<(CollectionItem, Vec<CollectionField>)>> {
        let Some(item) = self.source.item(collection_id, item_id, self.published)? else {
            return Ok(None);
        };
        let fields = self.source.fields(collection_id, self.published)?;
        Ok(Some((item, fields)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/references.rs"]
mod tests;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rayon::prelude::*;

use crate::{
    collection::model::{CollectionField, CollectionItem, FieldValue, ItemQuery, ItemValues},
    collection::source::CollectionSource,
    engine::pipeline::ResolveOpts,
    foundation::core::{clone_layer_id, fragment_layer_id, page_count},
    foundation::error::{TrellisError, TrellisResult},
    foundation::log::{ResolveLog, ResolveWarning},
    layer::model::{
        BoundItem, CollectionBinding, FRAGMENT_LAYER_NAME, FragmentInfo, ITEM_ID_ATTR, Layer,
        PaginationMeta, SortBy, SortOrder, SortSpec, SourceFieldType,
    },
    resolve::inject::inject_item_values,
    resolve::references::resolve_references,
    visibility::condition::{CollectionCounts, VisibilityContext, evaluate_visibility, parse_number},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Requested page per paginated collection layer.
pub struct PaginationContext {
    /// Page numbers keyed by original collection layer id.
    #[serde(default)]
    pub page_numbers: BTreeMap<String, usize>,
    /// Page used by layers without their own entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_page: Option<usize>,
}

impl PaginationContext {
    /// First page everywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `page` for `layer_id`.
    pub fn with_page(mut self, layer_id: impl Into<String>, page: usize) -> Self {
        self.page_numbers.insert(layer_id.into(), page);
        self
    }

    /// Request `page` for every layer without its own entry.
    pub fn with_default_page(mut self, page: usize) -> Self {
        self.default_page = Some(page);
        self
    }

    /// 1-based page for `layer_id`; values below 1 become 1. Never clamped to the page count.
    pub fn current_page(&self, layer_id: &str) -> usize {
        self.page_numbers
            .get(layer_id)
            .copied()
            .or(self.default_page)
            .unwrap_or(1)
            .max(1)
    }
}

/// Everything collection binding resolution reads besides the tree itself.
pub struct BindingEnv<'a, S: ?Sized> {
    /// Item data.
    pub source: &'a S,
    /// Read published (`true`) or draft (`false`) data.
    pub published: bool,
    /// Requested pages.
    pub pagination: &'a PaginationContext,
    /// Engine options.
    pub opts: &'a ResolveOpts,
    /// Warning sink.
    pub log: &'a dyn ResolveLog,
}

/// Replace every collection-bound layer in `layers` with a fragment of per-item clones.
///
/// `parent_values` is the enclosing item's binding context; it feeds bindings that list the ids
/// referenced by a parent field. A binding whose fetch fails is reported to the log and kept as
/// is, with its children resolved without item context. Meeting a fragment in the input is a
/// contract violation.
#[tracing::instrument(level = "debug", skip_all, fields(layers = layers.len()))]
pub fn resolve_collection_layers<S: CollectionSource + ?Sized>(
    env: &BindingEnv<'_, S>,
    layers: &[Layer],
    parent_values: Option<&ItemValues>,
) -> TrellisResult<Vec<Layer>> {
    resolve_siblings(env, layers, parent_values, env.opts.parallel)
}

fn resolve_siblings<S: CollectionSource + ?Sized>(
    env: &BindingEnv<'_, S>,
    layers: &[Layer],
    parent: Option<&ItemValues>,
    parallel: bool,
) -> TrellisResult<Vec<Layer>> {
    if parallel && layers.len() > 1 {
        layers
            .par_iter()
            .map(|l| resolve_layer(env, l, parent, parallel))
            .collect()
    } else {
        layers
            .iter()
            .map(|l| resolve_layer(env, l, parent, parallel))
            .collect()
    }
}

fn resolve_layer<S: CollectionSource + ?Sized>(
    env: &BindingEnv<'_, S>,
    layer: &Layer,
    parent: Option<&ItemValues>,
    parallel: bool,
) -> TrellisResult<Layer> {
    if layer.is_fragment() {
        return Err(TrellisError::contract(format!(
            "stored layer tree contains fragment '{}'",
            layer.id
        )));
    }
    if let Some(binding) = layer.collection_binding() {
        return resolve_binding(env, layer, binding, parent, parallel);
    }

    let mut out = layer.clone();
    out.children = resolve_siblings(env, &layer.children, parent, parallel)?;
    Ok(out)
}

struct Window {
    limit: Option<usize>,
    offset: usize,
    // (current page, items per page) when paginated.
    page: Option<(usize, usize)>,
}

struct Fetched {
    items: Vec<CollectionItem>,
    total: usize,
    fields: Vec<CollectionField>,
}

#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(layer_id = %layer.id, collection_id = %binding.collection_id)
)]
fn resolve_binding<S: CollectionSource + ?Sized>(
    env: &BindingEnv<'_, S>,
    layer: &Layer,
    binding: &CollectionBinding,
    parent: Option<&ItemValues>,
    parallel: bool,
) -> TrellisResult<Layer> {
    let window = fetch_window(env, layer, binding);
    let fetched = match fetch_items(env, binding, &window, parent) {
        Ok(f) => f,
        Err(e) => {
            env.log.warn(ResolveWarning::BindingFetchFailed {
                layer_id: layer.id.clone(),
                collection_id: binding.collection_id.clone(),
                message: e.to_string(),
            });
            let mut out = layer.clone();
            out.children = resolve_siblings(env, &layer.children, None, parallel)?;
            return Ok(out);
        }
    };

    let mut items = fetched.items;
    if let Some(filters) = &binding.filters {
        let no_counts = CollectionCounts::new();
        items.retain(|item| {
            evaluate_visibility(
                filters,
                &VisibilityContext {
                    item_values: Some(&item.values),
                    counts: &no_counts,
                },
            )
        });
    }
    sort_items(&mut items, &binding.sort);
    tracing::debug!(
        fetched_total = fetched.total,
        shown = items.len(),
        "collection items selected"
    );

    let fields = &fetched.fields;
    let clones = if parallel && items.len() > 1 {
        items
            .par_iter()
            .map(|item| build_clone(env, layer, item, fields))
            .collect::<TrellisResult<Vec<_>>>()?
    } else {
        items
            .iter()
            .map(|item| build_clone(env, layer, item, fields))
            .collect::<TrellisResult<Vec<_>>>()?
    };

    let mut fragment = Layer::new(fragment_layer_id(&layer.id), FRAGMENT_LAYER_NAME);
    fragment.fragment = Some(FragmentInfo {
        source_layer_id: layer.id.clone(),
        collection_id: binding.collection_id.clone(),
    });
    fragment.children = clones;
    fragment.pagination_meta = window.page.map(|(current_page, items_per_page)| PaginationMeta {
        layer_id: layer.id.clone(),
        collection_id: binding.collection_id.clone(),
        current_page,
        total_pages: page_count(fetched.total, items_per_page),
        total_items: fetched.total,
        items_per_page,
    });
    Ok(fragment)
}

fn fetch_window<S: ?Sized>(
    env: &BindingEnv<'_, S>,
    layer: &Layer,
    binding: &CollectionBinding,
) -> Window {
    match binding.items_per_page(env.opts.default_items_per_page) {
        Some(per_page) => {
            let current = env.pagination.current_page(&layer.id);
            Window {
                limit: Some(per_page),
                offset: (current - 1).saturating_mul(per_page),
                page: Some((current, per_page)),
            }
        }
        None => Window {
            limit: binding.limit,
            offset: binding.offset,
            page: None,
        },
    }
}

fn fetch_items<S: CollectionSource + ?Sized>(
    env: &BindingEnv<'_, S>,
    binding: &CollectionBinding,
    window: &Window,
    parent: Option<&ItemValues>,
) -> TrellisResult<Fetched> {
    let query = ItemQuery {
        limit: window.limit,
        offset: window.offset,
        item_ids: allowed_item_ids(binding, parent),
    };
    let page = env
        .source
        .items_with_values(&binding.collection_id, env.published, &query)?;
    let fields = env.source.fields(&binding.collection_id, env.published)?;
    Ok(Fetched {
        items: page.items,
        total: page.total,
        fields,
    })
}

// `None` means unrestricted. A source field without a usable parent value restricts to nothing.
fn allowed_item_ids(
    binding: &CollectionBinding,
    parent: Option<&ItemValues>,
) -> Option<BTreeSet<String>> {
    let field_id = binding
        .source_field_id
        .as_deref()
        .filter(|f| !f.trim().is_empty())?;
    let ids = parent
        .and_then(|p| p.get(field_id))
        .map(FieldValue::reference_ids)
        .unwrap_or_default();
    let take = match binding.source_field_type {
        Some(SourceFieldType::Reference) => 1,
        Some(SourceFieldType::MultiReference) | None => usize::MAX,
    };
    Some(ids.into_iter().take(take).map(str::to_owned).collect())
}

fn sort_items(items: &mut [CollectionItem], sort: &SortSpec) {
    match &sort.by {
        SortBy::Random => {
            items.shuffle(&mut rand::thread_rng());
            return;
        }
        SortBy::Manual => items.sort_by_key(|i| i.manual_order),
        SortBy::Field { field_id } => items.sort_by(|a, b| {
            compare_sort_values(a.values.get(field_id), b.values.get(field_id))
        }),
    }
    if sort.order == SortOrder::Desc {
        items.reverse();
    }
}

// Numbers compare numerically and sort before text, so mixed columns still get a total order.
fn compare_sort_values(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    let a: Cow<'_, str> = a.map(FieldValue::as_text).unwrap_or_default();
    let b: Cow<'_, str> = b.map(FieldValue::as_text).unwrap_or_default();
    match (parse_number(&a), parse_number(&b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(&b)),
    }
}

fn build_clone<S: CollectionSource + ?Sized>(
    env: &BindingEnv<'_, S>,
    layer: &Layer,
    item: &CollectionItem,
    fields: &[CollectionField],
) -> TrellisResult<Layer> {
    let values = resolve_references(env.source, env.published, &item.values, fields, env.log);

    let mut scoped = layer.clone();
    scoped.variables.collection = None;
    scoped.children = resolve_siblings(env, &layer.children, Some(&values), false)?;

    let mut clone = inject_item_values(&scoped, &values, fields);
    clone.id = clone_layer_id(&layer.id, &item.id);
    clone
        .attributes
        .insert(ITEM_ID_ATTR.to_owned(), item.id.clone());
    clone.collection_item = Some(BoundItem {
        item_id: item.id.clone(),
        slug: item_slug(&values, fields, &env.opts.slug_field_key),
        values,
    });
    Ok(clone)
}

fn item_slug(values: &ItemValues, fields: &[CollectionField], slug_key: &str) -> Option<String> {
    let field = fields.iter().find(|f| f.key == slug_key)?;
    let slug = values.get(&field.id)?.as_text();
    (!slug.trim().is_empty()).then(|| slug.into_owned())
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/collections.rs"]
mod tests;

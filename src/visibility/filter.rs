use crate::{
    collection::model::ItemValues,
    layer::model::Layer,
    visibility::condition::{CollectionCounts, VisibilityContext, evaluate_visibility},
};

/// Count the clones of every resolved collection layer, keyed by original layer id.
///
/// A nested collection layer produces one fragment per parent item; their counts are summed.
pub fn aggregate_collection_counts(layers: &[Layer]) -> CollectionCounts {
    let mut counts = CollectionCounts::new();
    for root in layers {
        root.visit(&mut |l| {
            if let Some(info) = &l.fragment {
                *counts.entry(info.source_layer_id.clone()).or_default() += l.children.len();
            }
        });
    }
    counts
}

/// Drop every layer whose conditional visibility evaluates to false, with its subtree.
///
/// Conditions read the nearest clone's item values, falling back to `root_values` (the page
/// item) outside collection lists. Must run after all fragments exist so `counts` is final.
#[tracing::instrument(level = "debug", skip_all, fields(counted = counts.len()))]
pub fn filter_by_visibility(
    layers: &[Layer],
    root_values: Option<&ItemValues>,
    counts: &CollectionCounts,
) -> Vec<Layer> {
    filter_siblings(layers, root_values, counts)
}

fn filter_siblings(
    layers: &[Layer],
    inherited: Option<&ItemValues>,
    counts: &CollectionCounts,
) -> Vec<Layer> {
    layers
        .iter()
        .filter_map(|l| filter_layer(l, inherited, counts))
        .collect()
}

fn filter_layer(
    layer: &Layer,
    inherited: Option<&ItemValues>,
    counts: &CollectionCounts,
) -> Option<Layer> {
    let values = layer
        .collection_item
        .as_ref()
        .map(|b| &b.values)
        .or(inherited);

    if let Some(set) = &layer.variables.conditional_visibility {
        let ctx = VisibilityContext {
            item_values: values,
            counts,
        };
        if !evaluate_visibility(set, &ctx) {
            tracing::debug!(layer_id = %layer.id, "hidden by condition");
            return None;
        }
    }

    let mut out = layer.clone();
    out.children = filter_siblings(&layer.children, values, counts);
    Some(out)
}

#[cfg(test)]
#[path = "../../tests/unit/visibility/filter.rs"]
mod tests;

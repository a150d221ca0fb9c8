//! Deterministic identifiers for synthetic layers.
//!
//! Synthetic ids are derived only from stored ids so that resolving the same input twice yields
//! the same tree; client-side hydration matches on them.

/// Id of the per-item clone of `layer_id` for `item_id`.
pub fn clone_layer_id(layer_id: &str, item_id: &str) -> String {
    format!("{layer_id}-item-{item_id}")
}

/// Id of the fragment that replaces the collection-bound `layer_id`.
pub fn fragment_layer_id(layer_id: &str) -> String {
    format!("{layer_id}-fragment")
}

/// Id of a component layer copied into the instance `instance_id`.
pub fn component_layer_id(instance_id: &str, component_layer_id: &str) -> String {
    format!("{instance_id}-{component_layer_id}")
}

/// Number of pages needed for `total` items at `per_page` items each.
///
/// `per_page` of zero yields zero pages.
pub fn page_count(total: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

use std::collections::BTreeMap;

use crate::layer::model::{Layer, PaginationMeta, TextValue};

/// Attribute linking a control to the original collection layer id.
pub const TARGET_LAYER_ATTR: &str = "data-pagination-for";
/// Attribute naming the control's role (see [`PaginationRole`]).
pub const ROLE_ATTR: &str = "data-pagination-role";
/// Stamped on every patched control.
pub const CURRENT_PAGE_ATTR: &str = "data-current-page";
/// Page a previous/next control navigates to.
pub const TARGET_PAGE_ATTR: &str = "data-target-page";
/// Present (as `"true"`) on disabled controls.
pub const DISABLED_ATTR: &str = "disabled";

/// Pagination metadata keyed by original collection layer id.
pub type PaginationMetaMap = BTreeMap<String, PaginationMeta>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Role of a pagination control.
pub enum PaginationRole {
    /// "Page X of Y" indicator.
    Info,
    /// Previous-page button.
    Previous,
    /// Next-page button.
    Next,
}

impl PaginationRole {
    /// Attribute value for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Previous => "previous",
            Self::Next => "next",
        }
    }

    /// Parse an attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "previous" => Some(Self::Previous),
            "next" => Some(Self::Next),
            _ => None,
        }
    }
}

/// Collect the pagination metadata carried by fragments anywhere in `layers`.
pub fn collect_pagination_meta(layers: &[Layer]) -> PaginationMetaMap {
    let mut out = PaginationMetaMap::new();
    for root in layers {
        root.visit(&mut |l| {
            if let (Some(info), Some(meta)) = (&l.fragment, &l.pagination_meta) {
                out.insert(info.source_layer_id.clone(), meta.clone());
            }
        });
    }
    out
}

/// Rewrite pagination controls linked to the collection layers in `meta`.
///
/// Controls pointing at unknown layers are left as they are.
#[tracing::instrument(level = "debug", skip_all, fields(paginated = meta.len()))]
pub fn apply_pagination_meta(layers: &[Layer], meta: &PaginationMetaMap) -> Vec<Layer> {
    if meta.is_empty() {
        return layers.to_vec();
    }
    layers.iter().map(|l| patch_layer(l, meta)).collect()
}

fn patch_layer(layer: &Layer, meta: &PaginationMetaMap) -> Layer {
    let mut out = layer.clone();
    out.children = layer.children.iter().map(|c| patch_layer(c, meta)).collect();

    let target = layer.attributes.get(TARGET_LAYER_ATTR);
    let role = layer
        .attributes
        .get(ROLE_ATTR)
        .and_then(|r| PaginationRole::parse(r));
    if let (Some(m), Some(role)) = (target.and_then(|t| meta.get(t)), role) {
        patch_control(&mut out, role, m);
    }
    out
}

fn patch_control(layer: &mut Layer, role: PaginationRole, meta: &PaginationMeta) {
    let current = meta.current_page;
    layer
        .attributes
        .insert(CURRENT_PAGE_ATTR.to_owned(), current.to_string());

    let (disabled, target) = match role {
        PaginationRole::Info => {
            layer.variables.text = Some(TextValue::text(format!(
                "Page {current} of {}",
                meta.total_pages
            )));
            return;
        }
        PaginationRole::Previous => (current <= 1, current.saturating_sub(1)),
        PaginationRole::Next => (current >= meta.total_pages, current.saturating_add(1)),
    };

    if disabled {
        layer
            .attributes
            .insert(DISABLED_ATTR.to_owned(), "true".to_owned());
        layer.attributes.remove(TARGET_PAGE_ATTR);
    } else {
        layer.attributes.remove(DISABLED_ATTR);
        layer
            .attributes
            .insert(TARGET_PAGE_ATTR.to_owned(), target.to_string());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pagination/controls.rs"]
mod tests;

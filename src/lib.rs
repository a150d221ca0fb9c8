//! Trellis resolves the stored layer trees of a visual website builder into render-ready trees.
//!
//! A page is stored as a declarative tree of [`Layer`]s whose parts may be bound to CMS-like
//! collections. The same stored tree serves the editor preview (draft data) and the live site
//! (published data); only the [`CollectionSource`] flag differs.
//!
//! # Pipeline overview
//!
//! 1. **Expand components**: instances become copies of their component's layers
//! 2. **Resolve collections**: each bound layer becomes a fragment of per-item clones, with
//!    references followed and field bindings injected
//! 3. **Bind the page item** (dynamic pages only)
//! 4. **Filter**: conditional visibility, after item counts are known
//! 5. **Patch pagination controls**
//!
//! [`Resolver::resolve_page`] runs the passes in this order; every pass is also exported on
//! its own. Passes never mutate their input and never invent ids: resolving the same request
//! twice yields the same tree (random sorting aside).
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod collection;
mod engine;
mod foundation;
mod layer;
mod pagination;
mod resolve;
mod visibility;

pub use collection::model::{
    CollectionField, CollectionItem, FieldType, FieldValue, ItemPage, ItemQuery, ItemValues,
};
pub use collection::source::CollectionSource;
pub use collection::store::{
    CollectionDef, InMemorySource, StoreDef, StoredItemDef, decode_stored_value,
};
pub use engine::pipeline::{PageItemRef, PageRequest, ResolveOpts, ResolvedPage, Resolver};
pub use foundation::core::{clone_layer_id, component_layer_id, fragment_layer_id, page_count};
pub use foundation::error::{TrellisError, TrellisResult};
pub use foundation::log::{RecordingLog, ResolveLog, ResolveWarning, TracingLog};
pub use layer::document::PageDocument;
pub use layer::dsl::{LayerBuilder, collection, pagination_control};
pub use layer::model::{
    BoundItem, COMPONENT_ID_ATTR, CollectionBinding, Component, ComponentInstance,
    ComponentLibrary, ComponentVariable, FRAGMENT_LAYER_NAME, FieldRef, FragmentInfo, ITEM_ID_ATTR,
    Layer, LinkValue, MediaValue, PaginationMeta, PaginationSettings, RichTextNode, SortBy,
    SortOrder, SortSpec, SourceFieldType, TextValue, VariableBindings,
};
pub use pagination::controls::{
    CURRENT_PAGE_ATTR, DISABLED_ATTR, PaginationMetaMap, PaginationRole, ROLE_ATTR,
    TARGET_LAYER_ATTR, TARGET_PAGE_ATTR, apply_pagination_meta, collect_pagination_meta,
};
pub use resolve::collections::{BindingEnv, PaginationContext, resolve_collection_layers};
pub use resolve::components::expand_components;
pub use resolve::inject::{has_inline_token, inject_item_values, inline_variable_token};
pub use resolve::references::resolve_references;
pub use visibility::condition::{
    CollectionCounts, Condition, ConditionGroup, ConditionSet, ConditionSource, Operator,
    VisibilityContext, evaluate_visibility,
};
pub use visibility::filter::{aggregate_collection_counts, filter_by_visibility};

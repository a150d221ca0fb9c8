use std::collections::BTreeMap;

use crate::{
    collection::model::{CollectionField, ItemValues},
    collection::source::CollectionSource,
    foundation::error::{TrellisError, TrellisResult},
    foundation::log::{ResolveLog, TracingLog},
    layer::model::{ComponentLibrary, Layer},
    pagination::controls::{PaginationMetaMap, apply_pagination_meta, collect_pagination_meta},
    resolve::collections::{BindingEnv, PaginationContext, resolve_collection_layers},
    resolve::components::expand_components,
    resolve::inject::inject_item_values,
    resolve::references::resolve_references,
    visibility::condition::CollectionCounts,
    visibility::filter::{aggregate_collection_counts, filter_by_visibility},
};

#[derive(Clone, Debug)]
/// Options for [`Resolver`].
pub struct ResolveOpts {
    /// Resolve sibling layers and items in parallel (rayon), using a dedicated thread pool.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Page size for paginated bindings that leave it unset or zero.
    pub default_items_per_page: usize,
    /// Key of the collection field whose value is an item's slug.
    pub slug_field_key: String,
}

impl Default for ResolveOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            default_items_per_page: 10,
            slug_field_key: "slug".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// CMS item a dynamic page is rendered for.
pub struct PageItemRef {
    /// Collection of the item.
    pub collection_id: String,
    /// Item id.
    pub item_id: String,
}

#[derive(Clone, Debug, Default)]
/// One page resolution request.
pub struct PageRequest {
    /// Stored layer tree.
    pub layers: Vec<Layer>,
    /// Read published (`true`) or draft (`false`) data.
    pub published: bool,
    /// Item bound to the whole page (dynamic collection pages).
    pub page_item: Option<PageItemRef>,
    /// Requested pages of paginated lists.
    pub pagination: PaginationContext,
    /// Components referenced by instances in `layers`.
    pub components: ComponentLibrary,
}

impl PageRequest {
    /// Request over `layers` with draft data, first pages and no components.
    pub fn new(layers: Vec<Layer>) -> Self {
        Self {
            layers,
            ..Self::default()
        }
    }

    /// Select published data.
    pub fn published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    /// Bind the page to one item.
    pub fn with_page_item(
        mut self,
        collection_id: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Self {
        self.page_item = Some(PageItemRef {
            collection_id: collection_id.into(),
            item_id: item_id.into(),
        });
        self
    }

    /// Replace the pagination context.
    pub fn with_pagination(mut self, pagination: PaginationContext) -> Self {
        self.pagination = pagination;
        self
    }

    /// Replace the component library.
    pub fn with_components(mut self, components: ComponentLibrary) -> Self {
        self.components = components;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
/// Output of [`Resolver::resolve_page`].
pub struct ResolvedPage {
    /// Resolved tree; fragments are to be unwrapped by the renderer.
    pub layers: Vec<Layer>,
    /// Pagination state keyed by original collection layer id.
    pub pagination: PaginationMetaMap,
    /// Clone counts keyed by original collection layer id.
    pub collection_counts: CollectionCounts,
    /// Slugs of the items shown on the page, keyed by item id.
    pub item_slugs: BTreeMap<String, String>,
}

/// Runs the resolution passes over one page at a time.
///
/// A resolver holds no per-page state; one value can serve any number of requests.
pub struct Resolver<'a, S: ?Sized> {
    source: &'a S,
    opts: ResolveOpts,
    log: &'a dyn ResolveLog,
}

impl<'a, S: CollectionSource + ?Sized> Resolver<'a, S> {
    /// Resolver reading `source`, reporting warnings through `tracing`.
    pub fn new(source: &'a S, opts: ResolveOpts) -> Self {
        Self {
            source,
            opts,
            log: &TracingLog,
        }
    }

    /// Report warnings to `log` instead.
    pub fn with_log(mut self, log: &'a dyn ResolveLog) -> Self {
        self.log = log;
        self
    }

    /// Options in effect.
    pub fn opts(&self) -> &ResolveOpts {
        &self.opts
    }

    /// Resolve one page.
    ///
    /// Passes run in a fixed order: component expansion, collection binding resolution,
    /// page-item injection, count aggregation, visibility filtering, pagination control
    /// patching. Content problems degrade the affected section and are logged; only contract
    /// violations, a missing page item and thread pool setup errors are returned.
    #[tracing::instrument(
        skip_all,
        fields(layers = req.layers.len(), published = req.published)
    )]
    pub fn resolve_page(&self, req: &PageRequest) -> TrellisResult<ResolvedPage> {
        if self.opts.parallel {
            let pool = build_thread_pool(self.opts.threads)?;
            pool.install(|| self.run(req))
        } else {
            self.run(req)
        }
    }

    fn run(&self, req: &PageRequest) -> TrellisResult<ResolvedPage> {
        let expanded = expand_components(&req.layers, &req.components, self.log);

        let page_item = match &req.page_item {
            Some(r) => Some(self.load_page_item(r, req.published)?),
            None => None,
        };
        let page_values = page_item.as_ref().map(|(values, _)| values);

        let env = BindingEnv {
            source: self.source,
            published: req.published,
            pagination: &req.pagination,
            opts: &self.opts,
            log: self.log,
        };
        let mut resolved = resolve_collection_layers(&env, &expanded, page_values)?;

        if let Some((values, fields)) = &page_item {
            resolved = resolved
                .iter()
                .map(|l| {
                    if l.starts_binding_scope() {
                        l.clone()
                    } else {
                        inject_item_values(l, values, fields)
                    }
                })
                .collect();
        }

        let collection_counts = aggregate_collection_counts(&resolved);
        let pagination = collect_pagination_meta(&resolved);
        let visible = filter_by_visibility(&resolved, page_values, &collection_counts);
        let layers = apply_pagination_meta(&visible, &pagination);
        let item_slugs = collect_item_slugs(&layers);

        tracing::debug!(
            lists = collection_counts.len(),
            paginated = pagination.len(),
            items = item_slugs.len(),
            "page resolved"
        );
        Ok(ResolvedPage {
            layers,
            pagination,
            collection_counts,
            item_slugs,
        })
    }

    fn load_page_item(
        &self,
        r: &PageItemRef,
        published: bool,
    ) -> TrellisResult<(ItemValues, Vec<CollectionField>)> {
        let item = self
            .source
            .item(&r.collection_id, &r.item_id, published)?
            .ok_or_else(|| {
                TrellisError::validation(format!(
                    "page item '{}' not found in collection '{}'",
                    r.item_id, r.collection_id
                ))
            })?;
        let fields = self.source.fields(&r.collection_id, published)?;
        let values = resolve_references(self.source, published, &item.values, &fields, self.log);
        Ok((values, fields))
    }
}

fn collect_item_slugs(layers: &[Layer]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for root in layers {
        root.visit(&mut |l| {
            if let Some(item) = &l.collection_item
                && let Some(slug) = &item.slug
            {
                out.insert(item.item_id.clone(), slug.clone());
            }
        });
    }
    out
}

fn build_thread_pool(threads: Option<usize>) -> TrellisResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(TrellisError::validation(
            "resolve option 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| TrellisError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/engine/pipeline.rs"]
mod tests;

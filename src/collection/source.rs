use crate::{
    collection::model::{CollectionField, CollectionItem, ItemPage, ItemQuery},
    foundation::error::TrellisResult,
};

/// Read-only access to CMS data, selected per call by the draft/published flag.
///
/// Implementations are shared across rayon workers while a page resolves, hence `Send + Sync`.
pub trait CollectionSource: Send + Sync {
    /// Items of `collection_id` matching `query`, plus the total matching its id filter.
    fn items_with_values(
        &self,
        collection_id: &str,
        published: bool,
        query: &ItemQuery,
    ) -> TrellisResult<ItemPage>;

    /// Field definitions of `collection_id`.
    fn fields(&self, collection_id: &str, published: bool) -> TrellisResult<Vec<CollectionField>>;

    /// Single item lookup; `Ok(None)` when the id does not exist.
    fn item(
        &self,
        collection_id: &str,
        item_id: &str,
        published: bool,
    ) -> TrellisResult<Option<CollectionItem>> {
        let page = self.items_with_values(collection_id, published, &ItemQuery::by_id(item_id))?;
        Ok(page.items.into_iter().next())
    }
}

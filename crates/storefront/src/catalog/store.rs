//! Async catalog state container.

use std::sync::Arc;
use std::time::Duration;

use boutique_core::{CategoryId, ProductId, SubcategoryId};
use moka::future::Cache;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};
use url::Url;

use super::normalize::{self, MediaBase};
use super::{
    CatalogError, CatalogState, Category, LOAD_FAILED_MESSAGE, Product, ProductDetails, Stage,
    Subcategory,
};
use crate::content::raw::{records, single_record};
use crate::content::{
    CATEGORIES_PATH, ContentApi, ContentError, PRODUCTS_PATH, SUBCATEGORIES_PATH, product_path,
};

/// How long legacy product details stay cached.
const DETAILS_TTL: Duration = Duration::from_secs(300);

/// Most product details kept in the cache.
const DETAILS_CAPACITY: u64 = 1000;

// =============================================================================
// CatalogStore
// =============================================================================

/// Catalog state fed by a [`ContentApi`].
///
/// Cheap to clone; clones share state and the details cache.
///
/// # Concurrency
///
/// State lives behind an async `RwLock` that is never held across a backend
/// call, so readers are not blocked while a fetch is in flight. Concurrent
/// calls to the same fetch are last-write-wins. `loading` stays true until
/// every in-flight fetch has finished.
#[derive(Clone)]
pub struct CatalogStore<A> {
    inner: Arc<CatalogStoreInner<A>>,
}

struct CatalogStoreInner<A> {
    api: A,
    media: MediaBase,
    state: RwLock<Tracked>,
    details: Cache<ProductId, ProductDetails>,
}

/// State plus the in-flight fetch count backing `loading`.
#[derive(Default)]
struct Tracked {
    state: CatalogState,
    in_flight: usize,
}

impl Tracked {
    fn begin(&mut self) {
        self.in_flight += 1;
        self.state.loading = true;
        self.state.error = None;
    }

    fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.state.loading = self.in_flight > 0;
    }

    fn fail(&mut self, stage: Stage, source: ContentError) -> CatalogError {
        error!(%stage, error = %source, "Catalog fetch failed");
        self.state.error = Some(stage.user_message().to_string());
        CatalogError::Stage { stage, source }
    }
}

impl<A> std::fmt::Debug for CatalogStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("media", &self.inner.media.url().as_str())
            .finish_non_exhaustive()
    }
}

impl<A: ContentApi> CatalogStore<A> {
    /// Create an empty catalog. Nothing is fetched until asked.
    #[must_use]
    pub fn new(api: A, media_base: Url) -> Self {
        let details = Cache::builder()
            .max_capacity(DETAILS_CAPACITY)
            .time_to_live(DETAILS_TTL)
            .build();

        Self {
            inner: Arc::new(CatalogStoreInner {
                api,
                media: MediaBase::new(media_base),
                state: RwLock::new(Tracked::default()),
                details,
            }),
        }
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Fetch and replace the category list.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Stage`] if the request fails; the previous
    /// categories are kept and `error` is set.
    #[instrument(skip(self))]
    pub async fn fetch_categories(&self) -> Result<(), CatalogError> {
        self.inner.state.write().await.begin();
        let result = self.fetch_records(CATEGORIES_PATH).await;

        let mut tracked = self.inner.state.write().await;
        tracked.finish();
        let values = result.map_err(|e| tracked.fail(Stage::Categories, e))?;

        let mut categories = normalize::categories(values);
        normalize::link_subcategories(&mut categories, &tracked.state.subcategories);
        debug!(count = categories.len(), "Categories loaded");
        tracked.state.categories = categories;
        Ok(())
    }

    /// Fetch and replace the subcategory list, relinking categories.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Stage`] if the request fails; the previous
    /// subcategories are kept and `error` is set.
    #[instrument(skip(self))]
    pub async fn fetch_subcategories(&self) -> Result<(), CatalogError> {
        self.inner.state.write().await.begin();
        let result = self.fetch_records(SUBCATEGORIES_PATH).await;

        let mut tracked = self.inner.state.write().await;
        tracked.finish();
        let values = result.map_err(|e| tracked.fail(Stage::Subcategories, e))?;

        let subcategories = normalize::subcategories(values);
        let state = &mut tracked.state;
        normalize::link_subcategories(&mut state.categories, &subcategories);
        debug!(count = subcategories.len(), "Subcategories loaded");
        state.subcategories = subcategories;
        Ok(())
    }

    /// Fetch and replace the product list.
    ///
    /// Category and subcategory names missing from product records are
    /// filled from whatever sets are already loaded.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Stage`] if the request fails; the previous
    /// products are kept and `error` is set.
    #[instrument(skip(self))]
    pub async fn fetch_products(&self) -> Result<(), CatalogError> {
        self.inner.state.write().await.begin();
        let result = self.fetch_records(PRODUCTS_PATH).await;

        let mut tracked = self.inner.state.write().await;
        tracked.finish();
        let values = result.map_err(|e| tracked.fail(Stage::Products, e))?;

        let state = &mut tracked.state;
        let products = normalize::products(
            values,
            &self.inner.media,
            &state.categories,
            &state.subcategories,
        );
        debug!(count = products.len(), "Products loaded");
        state.products = products;
        Ok(())
    }

    /// Full reload: categories and subcategories concurrently, then products.
    ///
    /// Every stage runs even if an earlier one failed.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Load`] naming the failed stages; `error` is
    /// set to an aggregate message.
    #[instrument(skip(self))]
    pub async fn load_all_data(&self) -> Result<(), CatalogError> {
        self.inner.state.write().await.begin();

        let (categories, subcategories) =
            tokio::join!(self.fetch_categories(), self.fetch_subcategories());
        let products = self.fetch_products().await;

        let failed: Vec<Stage> = [
            (Stage::Categories, categories.is_err()),
            (Stage::Subcategories, subcategories.is_err()),
            (Stage::Products, products.is_err()),
        ]
        .into_iter()
        .filter_map(|(stage, failed)| failed.then_some(stage))
        .collect();

        let mut tracked = self.inner.state.write().await;
        tracked.finish();
        if failed.is_empty() {
            debug!(
                categories = tracked.state.categories.len(),
                subcategories = tracked.state.subcategories.len(),
                products = tracked.state.products.len(),
                "Catalog loaded"
            );
            return Ok(());
        }

        tracked.state.error = Some(LOAD_FAILED_MESSAGE.to_string());
        let err = CatalogError::Load { failed };
        error!(error = %err, "Catalog load incomplete");
        Err(err)
    }

    /// Category and subcategory of one product, from the legacy endpoint.
    ///
    /// Successful lookups are cached for five minutes. Any failure is logged
    /// and yields empty details.
    #[instrument(skip(self))]
    pub async fn fetch_product_details(&self, id: ProductId) -> ProductDetails {
        if let Some(details) = self.inner.details.get(&id).await {
            debug!("Product details cache hit");
            return details;
        }

        let record = self
            .inner
            .api
            .get_json(&product_path(id))
            .await
            .and_then(single_record);
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Failed to fetch product details");
                return ProductDetails::default();
            }
        };

        let details = {
            let tracked = self.inner.state.read().await;
            normalize::details(record, &tracked.state.categories, &tracked.state.subcategories)
        };
        self.inner.details.insert(id, details.clone()).await;
        details
    }

    async fn fetch_records(&self, path: &str) -> Result<Vec<serde_json::Value>, ContentError> {
        let body = self.inner.api.get_json(path).await?;
        records(body)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select a category (or none). Always clears the selected subcategory.
    pub async fn select_category(&self, id: Option<CategoryId>) {
        let mut tracked = self.inner.state.write().await;
        tracked.state.selected_category = id;
        tracked.state.selected_subcategory = None;
    }

    /// Select a subcategory (or none). The selected category is untouched.
    pub async fn select_subcategory(&self, id: Option<SubcategoryId>) {
        self.inner.state.write().await.state.selected_subcategory = id;
    }

    /// Clear both selections.
    pub async fn reset_filters(&self) {
        let mut tracked = self.inner.state.write().await;
        tracked.state.selected_category = None;
        tracked.state.selected_subcategory = None;
    }

    /// Products matching the current selection.
    pub async fn filtered_products(&self) -> Vec<Product> {
        self.inner.state.read().await.state.filtered_products()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Absolute URL for an image path (see [`MediaBase::resolve`]).
    #[must_use]
    pub fn image_url(&self, path: &str) -> Option<String> {
        self.inner.media.resolve(path)
    }

    /// Dismiss the current error message.
    pub async fn clear_error(&self) {
        self.inner.state.write().await.state.error = None;
    }

    /// Copy of the whole state.
    pub async fn snapshot(&self) -> CatalogState {
        self.inner.state.read().await.state.clone()
    }

    pub async fn products(&self) -> Vec<Product> {
        self.inner.state.read().await.state.products.clone()
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.inner.state.read().await.state.categories.clone()
    }

    pub async fn subcategories(&self) -> Vec<Subcategory> {
        self.inner.state.read().await.state.subcategories.clone()
    }

    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.inner
            .state
            .read()
            .await
            .state
            .products
            .iter()
            .find(|product| product.id == id)
            .cloned()
    }

    pub async fn selected_category(&self) -> Option<CategoryId> {
        self.inner.state.read().await.state.selected_category
    }

    pub async fn selected_subcategory(&self) -> Option<SubcategoryId> {
        self.inner.state.read().await.state.selected_subcategory
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.state.read().await.state.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.inner.state.read().await.state.error.clone()
    }
}

//! Application state wiring the cart and catalog together.

use boutique_core::ProductId;

use crate::cart::{CartProduct, CartStore};
use crate::catalog::CatalogStore;
use crate::config::BoutiqueConfig;
use crate::content::ContentClient;
use crate::error::{AppError, Result};
use crate::storage::FileStore;

/// Cart and catalog built from one configuration.
///
/// The cart is rehydrated from the data directory on construction; the
/// catalog starts empty until [`CatalogStore::load_all_data`] is called.
#[derive(Debug)]
pub struct Storefront {
    config: BoutiqueConfig,
    cart: CartStore<FileStore>,
    catalog: CatalogStore<ContentClient>,
}

impl Storefront {
    /// Build the storefront from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: BoutiqueConfig) -> Result<Self> {
        let client = ContentClient::new(&config.content)?;
        let catalog = CatalogStore::new(client, config.content.media_url.clone());
        let cart = CartStore::open(FileStore::new(config.data_dir.clone()));

        Ok(Self {
            config,
            cart,
            catalog,
        })
    }

    /// Add one unit of a catalog product to the cart.
    ///
    /// The catalog must already be loaded; product data is copied by value.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the product is not in the catalog.
    pub async fn add_to_cart(&mut self, id: ProductId) -> Result<()> {
        let product = self
            .catalog
            .product(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
        self.cart.add_item(CartProduct::from(&product));
        Ok(())
    }

    #[must_use]
    pub const fn config(&self) -> &BoutiqueConfig {
        &self.config
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore<FileStore> {
        &self.cart
    }

    pub const fn cart_mut(&mut self) -> &mut CartStore<FileStore> {
        &mut self.cart
    }

    #[must_use]
    pub const fn catalog(&self) -> &CatalogStore<ContentClient> {
        &self.catalog
    }
}

//! Catalog browsing commands.

use std::fmt::Write as _;

use boutique_core::{CategoryId, SubcategoryId};
use boutique_storefront::Storefront;
use boutique_storefront::catalog::{CatalogError, Category, Product, Stage};
use boutique_storefront::error::Result;
use tracing::warn;

/// List categories with their subcategories.
///
/// # Errors
///
/// Returns an error if either list cannot be fetched.
pub async fn categories(storefront: &Storefront) -> Result<String> {
    let catalog = storefront.catalog();
    let (categories, subcategories) =
        tokio::join!(catalog.fetch_categories(), catalog.fetch_subcategories());
    categories?;
    subcategories?;

    Ok(render_categories(&catalog.categories().await))
}

/// List products, filtered the way the storefront filters them.
///
/// # Errors
///
/// Returns an error if the product list fails to load. Failed category or
/// subcategory stages only log a warning; the products are still listed.
pub async fn products(
    storefront: &Storefront,
    category: Option<CategoryId>,
    subcategory: Option<SubcategoryId>,
) -> Result<String> {
    let catalog = storefront.catalog();
    tolerate_partial_load(catalog.load_all_data().await)?;

    catalog.select_category(category).await;
    catalog.select_subcategory(subcategory).await;

    Ok(render_products(&catalog.filtered_products().await))
}

/// Keep going when only the category or subcategory stage failed.
fn tolerate_partial_load(
    result: std::result::Result<(), CatalogError>,
) -> std::result::Result<(), CatalogError> {
    if let Err(CatalogError::Load { failed }) = &result
        && !failed.contains(&Stage::Products)
    {
        warn!(failed = ?failed, "Catalog partially loaded, filters may be incomplete");
        return Ok(());
    }
    result
}

pub fn render_categories(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories.".to_string();
    }

    let mut out = String::new();
    for category in categories {
        let _ = writeln!(out, "{:>5}  {}", category.id, category.name);
        for sub in &category.subcategories {
            let _ = writeln!(out, "{:>5}    - {}", sub.id, sub.name);
        }
    }
    out
}

pub fn render_products(products: &[Product]) -> String {
    if products.is_empty() {
        return "No products.".to_string();
    }

    let mut out = String::new();
    for product in products {
        let _ = write!(out, "{:>5}  {:<32} {:>10}", product.id, product.name, product.price);
        if let Some(previous) = product.previous_price {
            let _ = write!(out, "  (was {previous})");
        }
        let section = product
            .subcategory
            .as_ref()
            .map(|s| s.name.as_str())
            .or_else(|| product.category.as_ref().map(|c| c.name.as_str()))
            .filter(|name| !name.is_empty());
        if let Some(section) = section {
            let _ = write!(out, "  [{section}]");
        }
        out.push('\n');
    }
    out
}

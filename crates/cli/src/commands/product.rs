//! Legacy single-product lookup.

use boutique_core::ProductId;
use boutique_storefront::Storefront;
use boutique_storefront::catalog::ProductDetails;

/// Show a product's category and subcategory.
///
/// Lookup failures are logged by the catalog and show as unknown here.
pub async fn details(storefront: &Storefront, id: ProductId) -> String {
    let details = storefront.catalog().fetch_product_details(id).await;
    render(id, &details)
}

pub fn render(id: ProductId, details: &ProductDetails) -> String {
    let category = details
        .category
        .as_ref()
        .map_or_else(|| "unknown".to_string(), |c| format!("{} ({})", c.name, c.id));
    let subcategory = details
        .subcategory
        .as_ref()
        .map_or_else(|| "unknown".to_string(), |s| format!("{} ({})", s.name, s.id));

    format!("Product {id}\n  category:    {category}\n  subcategory: {subcategory}\n")
}

#[cfg(test)]
mod tests {
    use boutique_core::{CategoryId, SubcategoryId};
    use boutique_storefront::catalog::{CategoryRef, SubcategoryRef};

    use super::*;

    #[test]
    fn test_render_details() {
        let details = ProductDetails {
            category: Some(CategoryRef {
                id: CategoryId::new(1),
                name: "Shoes".to_string(),
            }),
            subcategory: Some(SubcategoryRef {
                id: SubcategoryId::new(10),
                name: "Sneakers".to_string(),
            }),
        };
        assert_eq!(
            render(ProductId::new(3), &details),
            "Product 3\n  category:    Shoes (1)\n  subcategory: Sneakers (10)\n"
        );
    }

    #[test]
    fn test_render_empty_details() {
        let out = render(ProductId::new(3), &ProductDetails::default());
        assert!(out.contains("category:    unknown"));
        assert!(out.contains("subcategory: unknown"));
    }
}

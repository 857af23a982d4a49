//! Product catalog state.
//!
//! [`CatalogStore`] owns the normalized product/category/subcategory graph
//! fetched from the content backend, the current filter selection, and the
//! loading/error flags a UI renders from. Nothing here is persisted; the
//! graph is always rebuilt from the backend.
//!
//! Subcategories are separate entities that point at their parent through
//! [`Subcategory::category_id`]. Each [`Category`] carries a copy of its
//! children, rebuilt whenever either side is (re)fetched.

mod normalize;
mod store;

use boutique_core::{CategoryId, Price, ProductId, SubcategoryId};
use serde::Serialize;
use thiserror::Error;

use crate::content::ContentError;

pub use normalize::MediaBase;
pub use store::CatalogStore;

// =============================================================================
// Entities
// =============================================================================

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_price: Option<Price>,
    /// Absolute image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<SubcategoryRef>,
}

/// Reference from a product to its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    /// Empty when neither the product record nor the category list named it.
    pub name: String,
}

/// Reference from a product to its subcategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubcategoryRef {
    pub id: SubcategoryId,
    pub name: String,
}

/// A top-level product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Subcategories whose parent is this category, in fetch order.
    pub subcategories: Vec<Subcategory>,
}

/// A second-level category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub name: String,
    /// Parent category, if the backend sent one.
    pub category_id: Option<CategoryId>,
}

/// Classification returned by the legacy single-product endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<SubcategoryRef>,
}

// =============================================================================
// State
// =============================================================================

/// Point-in-time copy of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogState {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
    pub selected_category: Option<CategoryId>,
    pub selected_subcategory: Option<SubcategoryId>,
    /// True while any fetch is in flight.
    pub loading: bool,
    /// User-facing message from the most recent failure.
    pub error: Option<String>,
}

impl CatalogState {
    /// Products matching the current selection.
    ///
    /// A selected subcategory wins. Otherwise a selected category matches
    /// products assigned to it directly or through one of its subcategories.
    /// With no selection every product is returned.
    #[must_use]
    pub fn filtered_products(&self) -> Vec<Product> {
        if let Some(selected) = self.selected_subcategory {
            return self
                .products
                .iter()
                .filter(|product| product.subcategory.as_ref().is_some_and(|s| s.id == selected))
                .cloned()
                .collect();
        }

        let Some(selected) = self.selected_category else {
            return self.products.clone();
        };

        self.products
            .iter()
            .filter(|product| {
                product.category.as_ref().is_some_and(|c| c.id == selected)
                    || product
                        .subcategory
                        .as_ref()
                        .and_then(|s| self.parent_of(s.id))
                        .is_some_and(|parent| parent == selected)
            })
            .cloned()
            .collect()
    }

    fn parent_of(&self, id: SubcategoryId) -> Option<CategoryId> {
        self.subcategories
            .iter()
            .find(|sub| sub.id == id)
            .and_then(|sub| sub.category_id)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// One of the catalog fetch stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Categories,
    Subcategories,
    Products,
}

impl Stage {
    /// Message shown to the shopper when this stage fails.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::Categories => "Failed to load categories",
            Self::Subcategories => "Failed to load subcategories",
            Self::Products => "Failed to load products",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Categories => "categories",
            Self::Subcategories => "subcategories",
            Self::Products => "products",
        })
    }
}

/// Message shown when a full reload had at least one failed stage.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load catalog data";

/// Errors returned by catalog fetches.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A single fetch stage failed.
    #[error("Fetching {stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ContentError,
    },

    /// A full reload finished with failed stages.
    #[error("Catalog load failed for: {}", stage_list(.failed))]
    Load { failed: Vec<Stage> },
}

fn stage_list(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i64, category: Option<i64>, subcategory: Option<i64>) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Price::ZERO,
            previous_price: None,
            image: None,
            category: category.map(|id| CategoryRef {
                id: CategoryId::new(id),
                name: String::new(),
            }),
            subcategory: subcategory.map(|id| SubcategoryRef {
                id: SubcategoryId::new(id),
                name: String::new(),
            }),
        }
    }

    fn state() -> CatalogState {
        CatalogState {
            products: vec![
                product(1, Some(1), None),
                product(2, None, Some(10)),
                product(3, Some(2), Some(20)),
                product(4, None, None),
            ],
            subcategories: vec![
                Subcategory {
                    id: SubcategoryId::new(10),
                    name: "Sneakers".to_string(),
                    category_id: Some(CategoryId::new(1)),
                },
                Subcategory {
                    id: SubcategoryId::new(20),
                    name: "Caps".to_string(),
                    category_id: Some(CategoryId::new(2)),
                },
            ],
            ..CatalogState::default()
        }
    }

    fn ids(products: &[Product]) -> Vec<i64> {
        products.iter().map(|p| p.id.as_i64()).collect()
    }

    #[test]
    fn test_no_selection_returns_everything() {
        assert_eq!(ids(&state().filtered_products()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_category_matches_direct_and_via_subcategory() {
        let state = CatalogState {
            selected_category: Some(CategoryId::new(1)),
            ..state()
        };
        assert_eq!(ids(&state.filtered_products()), vec![1, 2]);
    }

    #[test]
    fn test_subcategory_wins_over_category() {
        let state = CatalogState {
            selected_category: Some(CategoryId::new(1)),
            selected_subcategory: Some(SubcategoryId::new(20)),
            ..state()
        };
        assert_eq!(ids(&state.filtered_products()), vec![3]);
    }

    #[test]
    fn test_unknown_selection_matches_nothing() {
        let state = CatalogState {
            selected_category: Some(CategoryId::new(99)),
            ..state()
        };
        assert!(state.filtered_products().is_empty());
    }

    #[test]
    fn test_load_error_lists_stages() {
        let err = CatalogError::Load {
            failed: vec![Stage::Categories, Stage::Products],
        };
        assert_eq!(err.to_string(), "Catalog load failed for: categories, products");
    }
}

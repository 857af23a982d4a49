//! Raw backend records to catalog entities.
//!
//! One function per entity. Records without a usable id are skipped with a
//! warning; everything else degrades field by field.

use boutique_core::{CategoryId, Price, ProductId, SubcategoryId};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::{Category, CategoryRef, Product, ProductDetails, Subcategory, SubcategoryRef};
use crate::content::raw::{
    NamedFields, ProductFields, RawMedia, RawRecord, RawRelation, SubcategoryFields,
};

/// Base URL that relative upload paths are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBase(Url);

impl MediaBase {
    #[must_use]
    pub const fn new(base: Url) -> Self {
        Self(base)
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.0
    }

    /// Absolute URL for an image path.
    ///
    /// Absolute URLs are returned unchanged. Relative paths
    /// (`/uploads/a.png`, `uploads/a.png`) are appended to the base;
    /// protocol-relative ones take the base's scheme. Empty input yields
    /// `None`.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<String> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        if Url::parse(path).is_ok() {
            return Some(path.to_owned());
        }
        if path.starts_with("//") {
            return self.0.join(path).ok().map(String::from);
        }
        Some(format!(
            "{}/{}",
            self.0.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

/// Decode every record in a batch, skipping the undecodable ones.
fn decode_batch<T: DeserializeOwned>(
    entity: &'static str,
    values: Vec<serde_json::Value>,
) -> Vec<(i64, T)> {
    let total = values.len();
    let decoded: Vec<(i64, T)> = values
        .into_iter()
        .filter_map(|value| match RawRecord::<T>::decode(value) {
            Ok(record) => Some(record.into_parts()),
            Err(e) => {
                warn!(entity, error = %e, "Skipping undecodable record");
                None
            }
        })
        .collect();

    debug!(entity, total, decoded = decoded.len(), "Normalized records");
    decoded
}

pub fn categories(values: Vec<serde_json::Value>) -> Vec<Category> {
    decode_batch::<NamedFields>("category", values)
        .into_iter()
        .map(|(id, fields)| Category {
            id: CategoryId::new(id),
            name: fields.name.unwrap_or_default(),
            subcategories: Vec::new(),
        })
        .collect()
}

pub fn subcategories(values: Vec<serde_json::Value>) -> Vec<Subcategory> {
    decode_batch::<SubcategoryFields>("subcategory", values)
        .into_iter()
        .map(|(id, fields)| {
            let category_id = fields
                .category
                .and_then(RawRelation::into_related)
                .map(|(id, _)| id)
                .or(fields.category_id)
                .map(CategoryId::new);
            Subcategory {
                id: SubcategoryId::new(id),
                name: fields.name.unwrap_or_default(),
                category_id,
            }
        })
        .collect()
}

/// Normalize a product batch.
///
/// Reference names the product record left out are taken from the already
/// known categories and subcategories.
pub fn products(
    values: Vec<serde_json::Value>,
    media: &MediaBase,
    categories: &[Category],
    subcategories: &[Subcategory],
) -> Vec<Product> {
    decode_batch::<ProductFields>("product", values)
        .into_iter()
        .map(|(id, fields)| product(ProductId::new(id), fields, media, categories, subcategories))
        .collect()
}

fn product(
    id: ProductId,
    fields: ProductFields,
    media: &MediaBase,
    categories: &[Category],
    subcategories: &[Subcategory],
) -> Product {
    let price = fields.price.as_ref().and_then(Price::coerce).unwrap_or_else(|| {
        warn!(product_id = %id, raw = ?fields.price, "Missing or invalid price, using 0");
        Price::ZERO
    });

    Product {
        id,
        name: fields.name.unwrap_or_default(),
        price,
        previous_price: fields.previous_price.as_ref().and_then(Price::coerce),
        image: fields
            .image
            .and_then(RawMedia::first_url)
            .and_then(|url| media.resolve(&url)),
        category: category_ref(fields.category, categories),
        subcategory: subcategory_ref(fields.subcategory, subcategories),
    }
}

/// Normalize a legacy single-product body into its classification.
pub fn details(
    record: serde_json::Value,
    categories: &[Category],
    subcategories: &[Subcategory],
) -> ProductDetails {
    let fields = match RawRecord::<ProductFields>::decode(record.clone()) {
        Ok(record) => record.into_parts().1,
        Err(_) => serde_json::from_value::<ProductFields>(record).unwrap_or_default(),
    };
    ProductDetails {
        category: category_ref(fields.category, categories),
        subcategory: subcategory_ref(fields.subcategory, subcategories),
    }
}

/// Rebuild every category's child list from the subcategory set.
pub fn link_subcategories(categories: &mut [Category], subcategories: &[Subcategory]) {
    for category in categories {
        category.subcategories = subcategories
            .iter()
            .filter(|sub| sub.category_id == Some(category.id))
            .cloned()
            .collect();
    }
}

fn category_ref(relation: Option<RawRelation>, known: &[Category]) -> Option<CategoryRef> {
    let (id, name) = relation?.into_related()?;
    let id = CategoryId::new(id);
    let name = name
        .filter(|name| !name.is_empty())
        .or_else(|| known.iter().find(|c| c.id == id).map(|c| c.name.clone()))
        .unwrap_or_default();
    Some(CategoryRef { id, name })
}

fn subcategory_ref(relation: Option<RawRelation>, known: &[Subcategory]) -> Option<SubcategoryRef> {
    let (id, name) = relation?.into_related()?;
    let id = SubcategoryId::new(id);
    let name = name
        .filter(|name| !name.is_empty())
        .or_else(|| known.iter().find(|s| s.id == id).map(|s| s.name.clone()))
        .unwrap_or_default();
    Some(SubcategoryRef { id, name })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn media() -> MediaBase {
        MediaBase::new("https://cms.example.com".parse().unwrap())
    }

    #[test]
    fn test_resolve_image_paths() {
        let media = media();
        assert_eq!(
            media.resolve("/uploads/a.png").as_deref(),
            Some("https://cms.example.com/uploads/a.png")
        );
        assert_eq!(
            media.resolve("uploads/b.png").as_deref(),
            Some("https://cms.example.com/uploads/b.png")
        );
        assert_eq!(
            media.resolve("https://cdn.example.net/c.png").as_deref(),
            Some("https://cdn.example.net/c.png")
        );
        assert_eq!(
            media.resolve("//cdn.example.net/d.png").as_deref(),
            Some("https://cdn.example.net/d.png")
        );
        assert_eq!(media.resolve("  "), None);
    }

    #[test]
    fn test_resolve_keeps_base_path() {
        let media = MediaBase::new("https://cms.example.com/media/".parse().unwrap());
        assert_eq!(
            media.resolve("/uploads/a.png").as_deref(),
            Some("https://cms.example.com/media/uploads/a.png")
        );
    }

    #[test]
    fn test_mixed_category_shapes() {
        let categories = categories(vec![
            json!({"id": 1, "Nom": "Shoes"}),
            json!({"id": 2, "attributes": {"Nom": "Hats"}}),
            json!({"Nom": "no id"}),
        ]);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "Shoes");
        assert_eq!(categories[1].id, CategoryId::new(2));
        assert_eq!(categories[1].name, "Hats");
    }

    #[test]
    fn test_subcategory_parent_resolution() {
        let subs = subcategories(vec![
            json!({"id": 10, "attributes": {"nom": "Sneakers", "category": {"data": {"id": 1}}}}),
            json!({"id": 11, "nom": "Boots", "category": {"id": 1, "Nom": "Shoes"}}),
            json!({"id": 12, "nom": "Caps", "category": 2}),
            json!({"id": 13, "nom": "Beanies", "categoryId": 2}),
            json!({"id": 14, "nom": "Orphan"}),
        ]);
        let parents: Vec<Option<i64>> = subs
            .iter()
            .map(|s| s.category_id.map(|c| c.as_i64()))
            .collect();
        assert_eq!(parents, vec![Some(1), Some(1), Some(2), Some(2), None]);
        assert_eq!(subs[0].name, "Sneakers");
    }

    #[test]
    fn test_link_subcategories() {
        let mut cats = categories(vec![json!({"id": 1, "Nom": "Shoes"}), json!({"id": 2, "Nom": "Hats"})]);
        let subs = subcategories(vec![
            json!({"id": 10, "nom": "Sneakers", "categoryId": 1}),
            json!({"id": 11, "nom": "Boots", "categoryId": 1}),
            json!({"id": 12, "nom": "Orphan"}),
        ]);
        link_subcategories(&mut cats, &subs);

        let children: Vec<i64> = cats[0].subcategories.iter().map(|s| s.id.as_i64()).collect();
        assert_eq!(children, vec![10, 11]);
        assert!(cats[1].subcategories.is_empty());
    }

    #[test]
    fn test_wrapped_product() {
        let products = products(
            vec![json!({
                "id": 7,
                "attributes": {
                    "Nom": "Runner",
                    "prix": "59.90",
                    "anscienPrix": 79,
                    "image": {"data": [{"id": 1, "attributes": {"url": "/uploads/runner.png"}}]},
                    "category": {"data": {"id": 1, "attributes": {"Nom": "Shoes"}}},
                    "subcategory": {"data": {"id": 10, "attributes": {"nom": "Sneakers"}}}
                }
            })],
            &media(),
            &[],
            &[],
        );

        let product = &products[0];
        assert_eq!(product.name, "Runner");
        assert_eq!(product.price, Price::parse("59.9").unwrap());
        assert_eq!(product.previous_price, Some(Price::parse("79").unwrap()));
        assert_eq!(
            product.image.as_deref(),
            Some("https://cms.example.com/uploads/runner.png")
        );
        assert_eq!(product.category.as_ref().unwrap().name, "Shoes");
        assert_eq!(product.subcategory.as_ref().unwrap().id, SubcategoryId::new(10));
    }

    #[test]
    fn test_flat_product_fills_names_from_known_sets() {
        let cats = categories(vec![json!({"id": 1, "Nom": "Shoes"})]);
        let subs = subcategories(vec![json!({"id": 10, "nom": "Sneakers", "categoryId": 1})]);
        let products = products(
            vec![json!({
                "id": 8,
                "Nom": "Trail",
                "prix": 42,
                "image": [{"url": "https://cdn.example.net/trail.png"}],
                "category": 1,
                "subcategory": {"id": 10}
            })],
            &media(),
            &cats,
            &subs,
        );

        let product = &products[0];
        assert_eq!(product.price, Price::parse("42").unwrap());
        assert_eq!(product.previous_price, None);
        assert_eq!(product.image.as_deref(), Some("https://cdn.example.net/trail.png"));
        assert_eq!(product.category.as_ref().unwrap().name, "Shoes");
        assert_eq!(product.subcategory.as_ref().unwrap().name, "Sneakers");
    }

    #[test]
    fn test_bad_price_defaults_to_zero() {
        let products = products(
            vec![
                json!({"id": 1, "Nom": "Free?", "prix": "n/a"}),
                json!({"id": 2, "Nom": "Nothing"}),
                json!({"id": 3, "Nom": "Negative", "prix": -4}),
            ],
            &media(),
            &[],
            &[],
        );
        assert!(products.iter().all(|p| p.price == Price::ZERO));
    }

    #[test]
    fn test_legacy_details() {
        let found = details(
            json!({"id": 3, "category": {"id": 1, "Nom": "Shoes"}, "subcategory": {"id": 10}}),
            &[],
            &subcategories(vec![json!({"id": 10, "nom": "Sneakers"})]),
        );
        assert_eq!(found.category.unwrap().name, "Shoes");
        assert_eq!(found.subcategory.unwrap().name, "Sneakers");

        let empty = details(json!({"title": "no relations"}), &[], &[]);
        assert_eq!(empty, ProductDetails::default());
    }
}

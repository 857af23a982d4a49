//! Catalog loading over HTTP against the fixture backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use boutique_core::{CategoryId, Price, ProductId, SubcategoryId};
use boutique_integration_tests::{FIXTURE_TOKEN, Fixture, FixtureBackend, seeded_backend};
use boutique_storefront::Storefront;
use boutique_storefront::catalog::{CatalogError, Product, Stage};
use boutique_storefront::content::ContentError;
use serde_json::json;

const PRODUCTS: &str = "/api/produits?populate=*";

fn storefront(backend: &FixtureBackend) -> (Storefront, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = backend.config(dir.path()).unwrap();
    (Storefront::new(config).unwrap(), dir)
}

fn ids(products: &[Product]) -> Vec<i64> {
    products.iter().map(|p| p.id.as_i64()).collect()
}

#[tokio::test]
async fn test_load_all_data_normalizes_both_shapes() {
    let backend = seeded_backend().await.unwrap();
    let (storefront, _dir) = storefront(&backend);
    let catalog = storefront.catalog();

    catalog.load_all_data().await.unwrap();
    let state = catalog.snapshot().await;

    assert!(!state.loading);
    assert_eq!(state.error, None);

    let names: Vec<&str> = state.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Shoes", "Hats"]);
    assert_eq!(state.categories[0].subcategories[0].name, "Sneakers");
    assert_eq!(state.categories[1].subcategories[0].id, SubcategoryId::new(20));

    let runner = &state.products[0];
    assert_eq!(runner.price, Price::parse("59.90").unwrap());
    assert_eq!(runner.previous_price, Some(Price::parse("79").unwrap()));
    assert_eq!(
        runner.image.as_deref(),
        Some("https://media.example.com/uploads/runner.png")
    );
    assert_eq!(runner.category.as_ref().unwrap().name, "Shoes");

    let court = &state.products[1];
    assert_eq!(court.image.as_deref(), Some("https://cdn.example.net/court.png"));
    assert_eq!(court.subcategory.as_ref().unwrap().name, "Sneakers");

    let snapback = &state.products[2];
    assert_eq!(snapback.price, Price::parse("15.5").unwrap());
    assert_eq!(snapback.subcategory.as_ref().unwrap().name, "Caps");
}

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let backend = seeded_backend().await.unwrap();
    let (storefront, _dir) = storefront(&backend);

    storefront.catalog().fetch_categories().await.unwrap();

    assert_eq!(backend.hits("/api/categories"), 1);
    assert_eq!(
        backend.last_authorization(),
        Some(format!("Bearer {FIXTURE_TOKEN}"))
    );
}

#[tokio::test]
async fn test_filters_over_loaded_catalog() {
    let backend = seeded_backend().await.unwrap();
    let (storefront, _dir) = storefront(&backend);
    let catalog = storefront.catalog();
    catalog.load_all_data().await.unwrap();

    catalog.select_category(Some(CategoryId::new(1))).await;
    assert_eq!(ids(&catalog.filtered_products().await), vec![100, 101]);

    catalog.select_subcategory(Some(SubcategoryId::new(20))).await;
    assert_eq!(ids(&catalog.filtered_products().await), vec![102]);

    catalog.select_category(Some(CategoryId::new(2))).await;
    assert_eq!(catalog.selected_subcategory().await, None);
    assert_eq!(ids(&catalog.filtered_products().await), vec![102]);

    catalog.reset_filters().await;
    assert_eq!(catalog.filtered_products().await.len(), 3);
}

#[tokio::test]
async fn test_server_error_keeps_previous_products() {
    let backend = seeded_backend().await.unwrap();
    let (storefront, _dir) = storefront(&backend);
    let catalog = storefront.catalog();
    catalog.fetch_products().await.unwrap();

    backend.fail(PRODUCTS, 500);
    let err = catalog.fetch_products().await.unwrap_err();

    assert!(matches!(
        err,
        CatalogError::Stage {
            stage: Stage::Products,
            source: ContentError::Status { status: 500, .. },
        }
    ));
    assert_eq!(ids(&catalog.products().await), vec![100, 101, 102]);
    assert_eq!(catalog.error().await.as_deref(), Some("Failed to load products"));
}

#[tokio::test]
async fn test_invalid_body_and_rate_limit() {
    let backend = seeded_backend().await.unwrap();
    let (storefront, _dir) = storefront(&backend);
    let catalog = storefront.catalog();

    backend.set(PRODUCTS, Fixture::Raw("<html>maintenance</html>".to_string()));
    let err = catalog.fetch_products().await.unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Stage {
            source: ContentError::Parse(_),
            ..
        }
    ));

    backend.set(PRODUCTS, Fixture::RateLimited(30));
    let err = catalog.fetch_products().await.unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Stage {
            source: ContentError::RateLimited(30),
            ..
        }
    ));
}

#[tokio::test]
async fn test_bare_array_envelope() {
    let backend = seeded_backend().await.unwrap();
    backend.respond(PRODUCTS, json!([{"id": 5, "Nom": "Loose", "prix": 3}]));
    let (storefront, _dir) = storefront(&backend);

    storefront.catalog().fetch_products().await.unwrap();
    let products = storefront.catalog().products().await;
    assert_eq!(ids(&products), vec![5]);
}

#[tokio::test]
async fn test_partial_failure_reports_stage() {
    let backend = seeded_backend().await.unwrap();
    backend.fail("/api/categories", 502);
    let (storefront, _dir) = storefront(&backend);
    let catalog = storefront.catalog();

    let err = catalog.load_all_data().await.unwrap_err();
    assert!(matches!(err, CatalogError::Load { ref failed } if failed == &[Stage::Categories]));
    assert_eq!(catalog.error().await.as_deref(), Some("Failed to load catalog data"));
    assert_eq!(catalog.products().await.len(), 3);
    assert_eq!(catalog.subcategories().await.len(), 2);
}

#[tokio::test]
async fn test_product_details_are_cached() {
    let backend = seeded_backend().await.unwrap();
    backend.respond(
        "/api/products/100",
        json!({"id": 100, "category": {"id": 1, "Nom": "Shoes"}, "subcategory": null}),
    );
    let (storefront, _dir) = storefront(&backend);
    let catalog = storefront.catalog();

    let first = catalog.fetch_product_details(ProductId::new(100)).await;
    let second = catalog.fetch_product_details(ProductId::new(100)).await;

    assert_eq!(first, second);
    assert_eq!(first.category.unwrap().id, CategoryId::new(1));
    assert_eq!(first.subcategory, None);
    assert_eq!(backend.hits("/api/products/100"), 1);

    let missing = catalog.fetch_product_details(ProductId::new(999)).await;
    assert_eq!(missing.category, None);
}

//! Integration tests for catalog lookups and caching.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::Method;

use autoparts_core::ProductId;
use autoparts_integration_tests::{FakeApi, product_json};
use autoparts_storefront::catalog::ProductFilter;

async fn api() -> FakeApi {
    let api = FakeApi::start().await.unwrap();
    api.seed_product(product_json(1, "Front Brake Pad", 40.0, 10, "Brakes"));
    api.seed_product(product_json(2, "Rear Brake Disc", 65.0, 3, "Brakes"));
    api.seed_product(product_json(3, "Oil Filter", 12.5, 30, "Filters"));
    api
}

// ============================================================================
// Caching
// ============================================================================

#[tokio::test]
async fn test_listing_is_cached_until_invalidated() {
    let api = api().await;
    let (ctx, _storage) = api.context().unwrap();

    assert_eq!(ctx.catalog().list_products().await.unwrap().len(), 3);
    assert_eq!(ctx.catalog().list_products().await.unwrap().len(), 3);
    assert_eq!(api.count(&Method::GET, "/api/products"), 1);

    ctx.catalog().invalidate().await;
    ctx.catalog().list_products().await.unwrap();
    assert_eq!(api.count(&Method::GET, "/api/products"), 2);
}

#[tokio::test]
async fn test_zero_ttl_disables_cache() {
    let api = api().await;
    let mut config = api.config();
    config.catalog_cache_ttl = Duration::ZERO;
    let (ctx, _storage) = api.context_with(config).unwrap();

    ctx.catalog().list_products().await.unwrap();
    ctx.catalog().list_products().await.unwrap();

    assert_eq!(api.count(&Method::GET, "/api/products"), 2);
}

#[tokio::test]
async fn test_single_product_is_cached() {
    let api = api().await;
    let (ctx, _storage) = api.context().unwrap();

    let product = ctx.catalog().get_product(ProductId::new(2)).await.unwrap();
    assert_eq!(product.name, "Rear Brake Disc");
    assert!(product.is_low_stock());

    ctx.catalog().get_product(ProductId::new(2)).await.unwrap();
    assert_eq!(api.count(&Method::GET, "/api/products/2"), 1);
}

// ============================================================================
// Filtering
// ============================================================================

#[tokio::test]
async fn test_search_and_categories() {
    let api = api().await;
    let (ctx, _storage) = api.context().unwrap();

    let filter = ProductFilter::new(Some("brake".to_string()), Some("Brakes".to_string()));
    let names: Vec<String> = ctx
        .catalog()
        .search(&filter)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, ["Front Brake Pad", "Rear Brake Disc"]);

    let none = ProductFilter::new(Some("brake".to_string()), Some("Filters".to_string()));
    assert!(ctx.catalog().search(&none).await.unwrap().is_empty());

    assert_eq!(ctx.catalog().categories().await.unwrap(), ["Brakes", "Filters"]);
    // All three lookups were served from one fetch.
    assert_eq!(api.count(&Method::GET, "/api/products"), 1);
}

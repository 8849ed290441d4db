//! Integration tests for checkout and order history.

#![allow(clippy::unwrap_used)]

use axum::http::Method;
use rust_decimal::Decimal;

use autoparts_core::{OrderStatus, OrderTotal, ProductId};
use autoparts_integration_tests::{FakeApi, product_json};
use autoparts_storefront::checkout::{CheckoutError, CheckoutOptions};

async fn api_with_cart() -> (FakeApi, autoparts_storefront::StorefrontContext) {
    let api = FakeApi::start().await.unwrap();
    api.seed_product(product_json(1, "Brake Pad", 40.0, 10, "Brakes"));
    api.seed_product(product_json(2, "Oil Filter", 12.5, 30, "Filters"));
    let (ctx, _storage) = api.signed_in_context("CUSTOMER").unwrap();
    ctx.add_to_cart(ProductId::new(1), 1).await.unwrap();
    ctx.add_to_cart(ProductId::new(2), 2).await.unwrap();
    (api, ctx)
}

#[tokio::test]
async fn test_checkout_places_order_and_clears_cart() {
    let (api, ctx) = api_with_cart().await;
    api.clear_requests();

    let options = CheckoutOptions {
        shipping_address: Some("1 Garage Lane".to_string()),
        ..CheckoutOptions::default()
    };
    let order = ctx.checkout(&options).await.unwrap().unwrap();

    assert!(order.id.is_some());
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.total(), OrderTotal::Reported(Decimal::new(65, 0)));

    assert_eq!(ctx.cart().count(), 0);
    assert!(api.cart_lines().is_empty());
    // The cart is emptied locally; no refresh follows.
    assert_eq!(api.count(&Method::POST, "/api/checkout"), 1);
    assert_eq!(api.count(&Method::GET, "/api/cart"), 0);
}

#[tokio::test]
async fn test_empty_cart_makes_no_call() {
    let api = FakeApi::start().await.unwrap();
    let (ctx, _storage) = api.signed_in_context("CUSTOMER").unwrap();

    let err = ctx.checkout(&CheckoutOptions::default()).await.unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(api.count(&Method::POST, "/api/checkout"), 0);
}

#[tokio::test]
async fn test_server_rejection_keeps_cart() {
    let (api, ctx) = api_with_cart().await;
    // Another client checked out the same server-side cart.
    let (other, _storage) = api.signed_in_context("CUSTOMER").unwrap();
    other.start().await;
    other.checkout(&CheckoutOptions::default()).await.unwrap();

    let err = ctx.checkout(&CheckoutOptions::default()).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Checkout(_)));
    assert_eq!(err.to_string(), "Failed to complete checkout. Please try again.");
    assert_eq!(err.api_error().unwrap().status().map(|s| s.as_u16()), Some(400));
    assert_eq!(ctx.cart().count(), 2);
}

#[tokio::test]
async fn test_history_lists_placed_orders() {
    let (_api, ctx) = api_with_cart().await;
    let placed = ctx
        .checkout(&CheckoutOptions::default())
        .await
        .unwrap()
        .unwrap();

    let history = ctx.order_history().await.unwrap();

    assert_eq!(history.len(), 1);
    let order = history.first().unwrap();
    assert_eq!(order.id, placed.id);
    assert_eq!(
        order.placed_at.unwrap().format("%Y-%m-%d %H:%M").to_string(),
        "2026-10-19 10:15"
    );
    let filter = order.items.iter().find(|i| i.name == "Oil Filter").unwrap();
    assert_eq!(filter.quantity, 2);
    assert_eq!(filter.line_total(), Decimal::new(25, 0));
}

//! Integration tests for login, registration and logout.

#![allow(clippy::unwrap_used)]

use axum::http::Method;
use secrecy::SecretString;

use autoparts_core::{ProductId, Role};
use autoparts_integration_tests::{FakeApi, PASSWORD, product_json};
use autoparts_storefront::auth::{AuthError, RegisterRequest};
use autoparts_storefront::storage::{SessionStorage, StorageKey};

fn password(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: password(PASSWORD),
        first_name: Some("Dana".to_string()),
        last_name: Some("Mechanic".to_string()),
        phone: None,
    }
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_persists_session_and_loads_cart() {
    let api = FakeApi::start().await.unwrap();
    api.add_account("dana@parts.test", "CUSTOMER");
    let (ctx, storage) = api.context().unwrap();

    let session = ctx
        .login("dana@parts.test", &password(PASSWORD))
        .await
        .unwrap();

    assert_eq!(session.identity, "dana@parts.test");
    assert_eq!(session.role, Role::Customer);
    assert!(ctx.sessions().is_authenticated());
    assert!(!ctx.sessions().is_admin());

    assert!(storage.token().unwrap().starts_with("token-"));
    assert_eq!(storage.load(StorageKey::Email).as_deref(), Some("dana@parts.test"));
    assert_eq!(storage.load(StorageKey::Role).as_deref(), Some("CUSTOMER"));

    assert_eq!(api.count(&Method::POST, "/api/users/login"), 1);
    assert_eq!(api.count(&Method::GET, "/api/cart"), 1);
}

#[tokio::test]
async fn test_admin_login_grants_admin() {
    let api = FakeApi::start().await.unwrap();
    api.add_account("boss@parts.test", "ADMIN");
    let (ctx, _storage) = api.context().unwrap();

    let session = ctx
        .login("boss@parts.test", &password(PASSWORD))
        .await
        .unwrap();

    assert_eq!(session.role, Role::Admin);
    assert!(ctx.sessions().is_admin());
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() {
    let api = FakeApi::start().await.unwrap();
    api.add_account("dana@parts.test", "CUSTOMER");
    let (ctx, storage) = api.context().unwrap();

    let err = ctx
        .login("dana@parts.test", &password("nope"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(!ctx.sessions().is_authenticated());
    assert_eq!(storage.token(), None);
    assert_eq!(api.count(&Method::GET, "/api/cart"), 0);
}

#[tokio::test]
async fn test_invalid_input_makes_no_request() {
    let api = FakeApi::start().await.unwrap();
    let (ctx, _storage) = api.context().unwrap();

    let err = ctx.login("not-an-email", &password(PASSWORD)).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidEmail(_)));

    let err = ctx.login("dana@parts.test", &password("")).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingPassword));

    assert!(api.requests().is_empty());
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_then_login() {
    let api = FakeApi::start().await.unwrap();
    let (ctx, _storage) = api.context().unwrap();

    ctx.register(&register_request("new@parts.test")).await.unwrap();
    // Registration does not sign in.
    assert!(!ctx.sessions().is_authenticated());

    ctx.login("new@parts.test", &password(PASSWORD)).await.unwrap();
    assert!(ctx.sessions().is_authenticated());
}

#[tokio::test]
async fn test_duplicate_registration_surfaces_server_message() {
    let api = FakeApi::start().await.unwrap();
    api.add_account("taken@parts.test", "CUSTOMER");
    let (ctx, _storage) = api.context().unwrap();

    let err = ctx
        .register(&register_request("taken@parts.test"))
        .await
        .unwrap_err();

    let AuthError::Api(source) = &err else {
        panic!("expected an API error, got {err:?}");
    };
    assert_eq!(source.status().map(|s| s.as_u16()), Some(409));
    assert_eq!(err.to_string(), "Email already registered");
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_forgets_session_and_cart() {
    let api = FakeApi::start().await.unwrap();
    api.seed_product(product_json(1, "Spark Plug", 8.5, 40, "Ignition"));
    api.add_account("dana@parts.test", "CUSTOMER");
    let (ctx, storage) = api.context().unwrap();
    ctx.login("dana@parts.test", &password(PASSWORD)).await.unwrap();
    ctx.add_to_cart(ProductId::new(1), 4).await.unwrap();
    assert_eq!(ctx.cart().count(), 1);
    api.clear_requests();

    ctx.logout();

    assert!(!ctx.sessions().is_authenticated());
    assert_eq!(ctx.cart().count(), 0);
    for key in StorageKey::ALL {
        assert_eq!(storage.load(key), None);
    }
    // Logging out is local; the server-side cart is kept for next time.
    assert!(api.requests().is_empty());
    assert_eq!(api.cart_lines().len(), 1);
}

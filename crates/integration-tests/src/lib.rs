//! Integration tests for the Autoparts client.
//!
//! [`FakeApi`] serves the REST endpoints the client talks to from an
//! in-process axum router bound to an ephemeral port. It keeps accounts,
//! products, one cart and the placed orders in memory, and records every
//! request so tests can assert on what went over the wire.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p autoparts-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let api = FakeApi::start().await?;
//! api.seed_product(product_json(1, "Brake Pad", 49.9, 10, "Brakes"));
//! let (ctx, _storage) = api.signed_in_context("CUSTOMER")?;
//! ctx.add_to_cart(ProductId::new(1), 2).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use autoparts_storefront::StorefrontContext;
use autoparts_storefront::config::ClientConfig;
use autoparts_storefront::gateway::ApiError;
use autoparts_storefront::storage::{MemoryStorage, SessionStorage, StorageKey};

/// The only password the fake API accepts.
pub const PASSWORD: &str = "correct-horse";

/// Fixed timestamp stamped on every order.
pub const ORDER_DATE: &str = "2026-10-19T10:15:30";

/// One request as the fake API saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    /// Raw `Authorization` header.
    pub authorization: Option<String>,
}

/// One multipart part received by the image upload endpoint.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub product_id: i64,
    pub field: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

#[derive(Default)]
struct ApiState {
    requests: Mutex<Vec<RecordedRequest>>,
    /// email -> role
    accounts: Mutex<HashMap<String, String>>,
    /// token -> role
    tokens: Mutex<HashMap<String, String>>,
    products: Mutex<Vec<Value>>,
    cart: Mutex<Vec<Value>>,
    orders: Mutex<Vec<Value>>,
    uploads: Mutex<Vec<RecordedUpload>>,
    next_id: AtomicI64,
    fail_uploads: AtomicBool,
    wrap_cart: AtomicBool,
}

impl ApiState {
    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Product JSON in the shape the real API returns.
#[must_use]
pub fn product_json(id: i64, name: &str, price: f64, stock: i64, category: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("{name} for most makes"),
        "price": price,
        "category": category,
        "stockQuantity": stock,
        "imageUrl": null,
    })
}

// =============================================================================
// Harness
// =============================================================================

/// In-process stand-in for the storefront REST API.
///
/// The server task is aborted when this is dropped.
pub struct FakeApi {
    state: Arc<ApiState>,
    base_url: Url,
    server: JoinHandle<()>,
}

impl FakeApi {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{addr}"))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let state = Arc::new(ApiState::default());
        let app = router(state.clone());
        let server = tokio::spawn(async move {
            // Ends only when the task is aborted.
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            state,
            base_url,
            server,
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
    }

    /// A signed-out storefront context over fresh in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn context(&self) -> Result<(StorefrontContext, Arc<MemoryStorage>), ApiError> {
        self.context_with(self.config())
    }

    /// Like [`FakeApi::context`] with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn context_with(
        &self,
        config: ClientConfig,
    ) -> Result<(StorefrontContext, Arc<MemoryStorage>), ApiError> {
        let storage = Arc::new(MemoryStorage::new());
        let ctx = StorefrontContext::with_storage(config, storage.clone())?;
        Ok((ctx, storage))
    }

    /// A context whose storage already holds a valid session for `role`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn signed_in_context(
        &self,
        role: &str,
    ) -> Result<(StorefrontContext, Arc<MemoryStorage>), ApiError> {
        let token = format!("seeded-{}", role.to_ascii_lowercase());
        self.issue_token(&token, role);

        let storage = Arc::new(MemoryStorage::new());
        storage.store(StorageKey::Token, &token);
        storage.store(StorageKey::Email, &format!("{}@parts.test", role.to_ascii_lowercase()));
        storage.store(StorageKey::Role, role);

        let ctx = StorefrontContext::with_storage(self.config(), storage.clone())?;
        Ok((ctx, storage))
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Register an account that can log in with [`PASSWORD`].
    pub fn add_account(&self, email: &str, role: &str) {
        lock(&self.state.accounts).insert(email.to_string(), role.to_string());
    }

    /// Accept `token` as a bearer credential for `role`.
    pub fn issue_token(&self, token: &str, role: &str) {
        lock(&self.state.tokens).insert(token.to_string(), role.to_string());
    }

    /// Reject every credential issued so far.
    pub fn revoke_tokens(&self) {
        lock(&self.state.tokens).clear();
    }

    /// Add a product. Ids assigned later start above the highest seeded id.
    pub fn seed_product(&self, product: Value) {
        if let Some(id) = product["id"].as_i64() {
            self.state.next_id.fetch_max(id, Ordering::SeqCst);
        }
        lock(&self.state.products).push(product);
    }

    /// Make the image upload endpoint answer 500.
    pub fn fail_uploads(&self) {
        self.state.fail_uploads.store(true, Ordering::SeqCst);
    }

    /// Answer `GET /api/cart` with `{"items": [...]}` instead of a bare list.
    pub fn wrap_cart_response(&self) {
        self.state.wrap_cart.store(true, Ordering::SeqCst);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// How many requests matched `method` and `path`.
    #[must_use]
    pub fn count(&self, method: &Method, path: &str) -> usize {
        lock(&self.state.requests)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn clear_requests(&self) {
        lock(&self.state.requests).clear();
    }

    #[must_use]
    pub fn products(&self) -> Vec<Value> {
        lock(&self.state.products).clone()
    }

    #[must_use]
    pub fn cart_lines(&self) -> Vec<Value> {
        lock(&self.state.cart).clone()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        lock(&self.state.orders).clone()
    }

    #[must_use]
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        lock(&self.state.uploads).clone()
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Router
// =============================================================================

fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/users/login", post(login))
        .route("/api/users/register", post(register))
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/products/{id}/upload-image", post(upload_image))
        .route("/api/cart", get(get_cart))
        .route("/api/cart/add", post(add_to_cart))
        .route("/api/checkout", post(checkout))
        .route("/api/checkout/history", get(order_history))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<Arc<ApiState>>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        authorization: request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    lock(&state.requests).push(recorded);
    next.run(request).await
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

/// Role behind the bearer token, or the 401 to return.
fn authorize(state: &ApiState, headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| lock(&state.tokens).get(token).cloned())
        .ok_or_else(|| message(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

fn authorize_admin(state: &ApiState, headers: &HeaderMap) -> Result<(), Response> {
    if authorize(state, headers)? == "ADMIN" {
        Ok(())
    } else {
        Err(message(StatusCode::FORBIDDEN, "Access denied"))
    }
}

fn product_index(products: &[Value], id: i64) -> Option<usize> {
    products.iter().position(|p| p["id"].as_i64() == Some(id))
}

// ===== Users =====

async fn login(State(state): State<Arc<ApiState>>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let role = lock(&state.accounts).get(email).cloned();

    match role {
        Some(role) if body["password"] == PASSWORD => {
            let token = format!("token-{}", state.next_id());
            lock(&state.tokens).insert(token.clone(), role.clone());
            Json(json!({ "token": token, "role": role })).into_response()
        }
        _ => message(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    }
}

async fn register(State(state): State<Arc<ApiState>>, Json(body): Json<Value>) -> Response {
    let Some(email) = body["email"].as_str() else {
        return message(StatusCode::BAD_REQUEST, "Email is required");
    };
    let mut accounts = lock(&state.accounts);
    if accounts.contains_key(email) {
        return message(StatusCode::CONFLICT, "Email already registered");
    }
    accounts.insert(email.to_string(), "CUSTOMER".to_string());
    "User registered successfully".into_response()
}

// ===== Products =====

async fn list_products(State(state): State<Arc<ApiState>>) -> Response {
    Json(Value::Array(lock(&state.products).clone())).into_response()
}

async fn get_product(State(state): State<Arc<ApiState>>, Path(id): Path<i64>) -> Response {
    let products = lock(&state.products);
    match product_index(&products, id).and_then(|i| products.get(i)) {
        Some(product) => Json(product.clone()).into_response(),
        None => message(StatusCode::NOT_FOUND, "Product not found"),
    }
}

async fn create_product(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Err(response) = authorize_admin(&state, &headers) {
        return response;
    }
    body["id"] = json!(state.next_id());
    lock(&state.products).push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update_product(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Err(response) = authorize_admin(&state, &headers) {
        return response;
    }
    let mut products = lock(&state.products);
    let Some(slot) = product_index(&products, id).and_then(|i| products.get_mut(i)) else {
        return message(StatusCode::NOT_FOUND, "Product not found");
    };
    body["id"] = json!(id);
    body["imageUrl"] = slot["imageUrl"].clone();
    *slot = body.clone();
    Json(body).into_response()
}

async fn delete_product(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authorize_admin(&state, &headers) {
        return response;
    }
    let mut products = lock(&state.products);
    match product_index(&products, id) {
        Some(index) => {
            products.remove(index);
            StatusCode::NO_CONTENT.into_response()
        }
        None => message(StatusCode::NOT_FOUND, "Product not found"),
    }
}

async fn upload_image(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if let Err(response) = authorize_admin(&state, &headers) {
        return response;
    }
    if state.fail_uploads.load(Ordering::SeqCst) {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Storage unavailable");
    }

    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let Ok(bytes) = field.bytes().await else {
            return message(StatusCode::BAD_REQUEST, "Unreadable upload");
        };

        if let Some(name) = &file_name {
            let mut products = lock(&state.products);
            if let Some(product) = product_index(&products, id).and_then(|i| products.get_mut(i)) {
                product["imageUrl"] = json!(format!("products/{id}/{name}"));
            }
        }
        lock(&state.uploads).push(RecordedUpload {
            product_id: id,
            field: field_name,
            file_name,
            content_type,
            len: bytes.len(),
        });
    }
    "Image uploaded successfully".into_response()
}

// ===== Cart =====

async fn get_cart(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let lines = Value::Array(lock(&state.cart).clone());
    if state.wrap_cart.load(Ordering::SeqCst) {
        Json(json!({ "items": lines })).into_response()
    } else {
        Json(lines).into_response()
    }
}

async fn add_to_cart(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let product_id = params.get("productId").and_then(|v| v.parse::<i64>().ok());
    let qty = params.get("qty").and_then(|v| v.parse::<i64>().ok());
    let (Some(product_id), Some(qty)) = (product_id, qty) else {
        return message(StatusCode::BAD_REQUEST, "productId and qty are required");
    };

    let product = {
        let products = lock(&state.products);
        product_index(&products, product_id).and_then(|i| products.get(i).cloned())
    };
    let Some(product) = product else {
        return message(StatusCode::NOT_FOUND, "Product not found");
    };
    let stock = product["stockQuantity"].as_i64().unwrap_or_default();

    let mut cart = lock(&state.cart);
    let existing = cart
        .iter()
        .position(|line| line["productId"].as_i64() == Some(product_id));
    let in_cart = existing
        .and_then(|i| cart.get(i))
        .and_then(|line| line["quantity"].as_i64())
        .unwrap_or_default();
    if in_cart + qty > stock {
        return message(StatusCode::BAD_REQUEST, "Insufficient stock");
    }

    match existing.and_then(|i| cart.get_mut(i)) {
        Some(line) => line["quantity"] = json!(in_cart + qty),
        None => {
            let line = json!({
                "id": state.next_id(),
                "productId": product_id,
                "quantity": qty,
                "product": product,
            });
            cart.push(line);
        }
    }
    Json(json!({ "message": "Item added to cart" })).into_response()
}

// ===== Checkout =====

async fn checkout(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let lines: Vec<Value> = std::mem::take(&mut *lock(&state.cart));
    if lines.is_empty() {
        return message(StatusCode::BAD_REQUEST, "Cart is empty");
    }

    let items: Vec<Value> = lines
        .iter()
        .map(|line| {
            json!({
                "productId": line["productId"],
                "productName": line["product"]["name"],
                "price": line["product"]["price"],
                "quantity": line["quantity"],
            })
        })
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let total: f64 = lines
        .iter()
        .map(|line| {
            line["product"]["price"].as_f64().unwrap_or_default()
                * line["quantity"].as_i64().unwrap_or_default() as f64
        })
        .sum();

    let order = json!({
        "id": state.next_id(),
        "orderDate": ORDER_DATE,
        "status": "PENDING",
        "totalAmount": total,
        "items": items,
    });
    lock(&state.orders).push(order.clone());
    Json(order).into_response()
}

async fn order_history(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    Json(Value::Array(lock(&state.orders).clone())).into_response()
}

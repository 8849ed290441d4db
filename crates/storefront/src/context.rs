//! Storefront context shared by every view.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use autoparts_core::{Order, ProductId};

use crate::auth::{AuthClient, AuthError, RegisterRequest};
use crate::cart::{CartError, CartSynchronizer, RefreshOutcome};
use crate::catalog::Catalog;
use crate::checkout::{Checkout, CheckoutError, CheckoutOptions};
use crate::config::ClientConfig;
use crate::gateway::{ApiError, Gateway, SessionEvent};
use crate::images::ImageResolver;
use crate::session::{Session, SessionStore};
use crate::storage::{FileStorage, SessionStorage};

/// One instance of each store and client, constructed once at startup.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct StorefrontContext {
    inner: Arc<StorefrontContextInner>,
}

struct StorefrontContextInner {
    config: ClientConfig,
    gateway: Gateway,
    sessions: Arc<SessionStore>,
    cart: Arc<CartSynchronizer>,
    auth: AuthClient,
    catalog: Catalog,
    checkout: Checkout,
    images: ImageResolver,
}

impl StorefrontContext {
    /// Create a context persisting the session to `config.session_file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let storage = Arc::new(FileStorage::open(&config.session_file));
        Self::with_storage(config, storage)
    }

    /// Create a context over the given storage. Restores any persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_storage(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Self, ApiError> {
        let gateway = Gateway::new(&config, storage.clone())?;

        let sessions = Arc::new(SessionStore::new(storage.clone()));
        sessions.restore();

        let cart = Arc::new(CartSynchronizer::new(Arc::new(gateway.clone()), storage));
        let auth = AuthClient::new(gateway.clone(), sessions.clone());
        let catalog = Catalog::new(gateway.clone(), &config);
        let checkout = Checkout::new(gateway.clone());
        let images = ImageResolver::new(&config);

        Ok(Self {
            inner: Arc::new(StorefrontContextInner {
                config,
                gateway,
                sessions,
                cart,
                auth,
                catalog,
                checkout,
                images,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    #[must_use]
    pub fn cart(&self) -> &CartSynchronizer {
        &self.inner.cart
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn images(&self) -> &ImageResolver {
        &self.inner.images
    }

    /// Load the cart once if a session was restored.
    pub async fn start(&self) -> RefreshOutcome {
        if self.sessions().is_authenticated() {
            self.cart().refresh().await
        } else {
            RefreshOutcome::SignedOut
        }
    }

    /// Empty the cart snapshot whenever the gateway expires the session.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn_session_watcher(&self) -> JoinHandle<()> {
        let mut events = self.gateway().subscribe();
        let cart = self.inner.cart.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::LoginRequired { login_path }) => {
                        debug!(login_path, "Session expired; emptying cart");
                        cart.clear();
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Session watcher lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Sign in and load the account's cart.
    ///
    /// # Errors
    ///
    /// See [`AuthClient::login`].
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Session, AuthError> {
        let session = self.inner.auth.login(email, password).await?;
        self.cart().refresh().await;
        Ok(session)
    }

    /// # Errors
    ///
    /// See [`AuthClient::register`].
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), AuthError> {
        self.inner.auth.register(request).await
    }

    /// Sign out and forget the cart.
    pub fn logout(&self) {
        self.sessions().logout();
        self.cart().clear();
    }

    // =========================================================================
    // Shopping
    // =========================================================================

    /// Add to the cart if signed in.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LoginRequired` without a request when signed out,
    /// otherwise see [`CartSynchronizer::add_item`].
    pub async fn add_to_cart(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if !self.sessions().is_authenticated() {
            info!(product_id = %product_id, "Add to cart requires login");
            return Err(CartError::LoginRequired);
        }
        self.cart().add_item(product_id, quantity).await
    }

    /// # Errors
    ///
    /// See [`Checkout::checkout`].
    pub async fn checkout(&self, options: &CheckoutOptions) -> Result<Option<Order>, CheckoutError> {
        self.inner.checkout.checkout(self.cart(), options).await
    }

    /// # Errors
    ///
    /// See [`Checkout::history`].
    pub async fn order_history(&self) -> Result<Vec<Order>, CheckoutError> {
        self.inner.checkout.history().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::storage::{MemoryStorage, StorageKey};

    fn context(storage: Arc<MemoryStorage>) -> StorefrontContext {
        // Nothing listens here; no test below reaches the network.
        let config = ClientConfig::new(Url::parse("http://127.0.0.1:9").unwrap());
        StorefrontContext::with_storage(config, storage).unwrap()
    }

    #[tokio::test]
    async fn test_add_to_cart_requires_login() {
        let ctx = context(Arc::new(MemoryStorage::new()));
        let err = ctx.add_to_cart(ProductId::new(1), 1).await.unwrap_err();
        assert!(matches!(err, CartError::LoginRequired));
    }

    #[tokio::test]
    async fn test_restores_persisted_session() {
        let storage = Arc::new(MemoryStorage::new());
        storage.store(StorageKey::Token, "T1");
        storage.store(StorageKey::Email, "a@b.com");
        storage.store(StorageKey::Role, "ADMIN");

        let ctx = context(storage);
        assert!(ctx.sessions().is_authenticated());
        assert!(ctx.sessions().is_admin());
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_cart() {
        let storage = Arc::new(MemoryStorage::new());
        storage.store(StorageKey::Token, "T1");
        storage.store(StorageKey::Email, "a@b.com");
        let ctx = context(storage.clone());

        ctx.logout();

        assert!(!ctx.sessions().is_authenticated());
        assert_eq!(ctx.cart().count(), 0);
        assert_eq!(storage.token(), None);
    }

    #[tokio::test]
    async fn test_checkout_refuses_empty_cart() {
        let storage = Arc::new(MemoryStorage::new());
        storage.store(StorageKey::Token, "T1");
        storage.store(StorageKey::Email, "a@b.com");
        let ctx = context(storage);

        let err = ctx.checkout(&CheckoutOptions::default()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(err.to_string(), "Your cart is empty");
    }
}

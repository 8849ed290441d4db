//! Cart synchronizer.
//!
//! Keeps an in-memory mirror of the server-side cart. The mirror is never
//! patched locally: every mutation goes to the API and is followed by a
//! refresh that replaces the whole [`CartSnapshot`].
//!
//! # Concurrency
//!
//! A single in-flight flag guards [`CartSynchronizer::refresh`]. A refresh
//! requested while another one is running returns [`RefreshOutcome::Skipped`]
//! straight away; it is not queued. At most one cart fetch is outstanding at
//! any time and the snapshot is only replaced by a completed fetch.
//!
//! # Example
//!
//! ```rust,ignore
//! let cart = CartSynchronizer::new(Arc::new(gateway.clone()), storage.clone());
//! let mut updates = cart.subscribe();
//!
//! cart.add_item(ProductId::new(42), 2).await?;
//! assert_eq!(updates.borrow_and_update().len(), 1);
//! ```

mod conversions;

pub use conversions::parse_cart_response;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, instrument, warn};

use autoparts_core::{CartSnapshot, CartSummary, ProductId};

use crate::gateway::{ApiError, Gateway};
use crate::storage::SessionStorage;

/// Shown when an add fails without a usable message.
const ADD_ITEM_FALLBACK: &str = "Failed to add item to cart";

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Adding to the cart requires a signed-in customer.
    #[error("Please log in to add items to your cart")]
    LoginRequired,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// The API refused or failed the add.
    #[error("{message}")]
    AddItem {
        /// User-presentable message.
        message: String,
        #[source]
        source: ApiError,
    },
}

/// What a call to [`CartSynchronizer::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Another refresh was already running; nothing happened.
    Skipped,
    /// No credential is stored; the snapshot was emptied without a network call.
    SignedOut,
    /// The snapshot was replaced with this many lines.
    Refreshed(usize),
    /// The fetch failed; the snapshot was emptied.
    Failed,
}

/// Remote cart operations.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Fetch the server-side cart.
    async fn fetch_cart(&self) -> Result<CartSnapshot, ApiError>;

    /// Add `quantity` units of a product to the server-side cart.
    async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError>;
}

#[async_trait]
impl CartBackend for Gateway {
    async fn fetch_cart(&self) -> Result<CartSnapshot, ApiError> {
        let body: serde_json::Value = self.get_json("/api/cart").await?;
        Ok(parse_cart_response(body))
    }

    async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        self.post_empty(
            "/api/cart/add",
            &[
                ("productId", product_id.to_string()),
                ("qty", quantity.to_string()),
            ],
        )
        .await
    }
}

/// Clears the in-flight flag when a refresh ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// In-memory mirror of the server-side cart.
pub struct CartSynchronizer {
    backend: Arc<dyn CartBackend>,
    storage: Arc<dyn SessionStorage>,
    in_flight: AtomicBool,
    snapshot: watch::Sender<CartSnapshot>,
}

impl CartSynchronizer {
    /// Create a synchronizer with an empty snapshot.
    #[must_use]
    pub fn new(backend: Arc<dyn CartBackend>, storage: Arc<dyn SessionStorage>) -> Self {
        let (snapshot, _) = watch::channel(CartSnapshot::default());
        Self {
            backend,
            storage,
            in_flight: AtomicBool::new(false),
            snapshot,
        }
    }

    /// Re-fetch the cart and replace the snapshot.
    ///
    /// Failures never leave a stale cart behind: the snapshot is emptied and
    /// the error is logged, except for connectivity failures which are only
    /// traced at debug level while the backend is down.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> RefreshOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Cart refresh already in flight");
            return RefreshOutcome::Skipped;
        }
        let _in_flight = InFlight(&self.in_flight);

        if self.storage.token().is_none() {
            self.replace(CartSnapshot::default());
            return RefreshOutcome::SignedOut;
        }

        match self.backend.fetch_cart().await {
            Ok(snapshot) => {
                let len = snapshot.len();
                self.replace(snapshot);
                RefreshOutcome::Refreshed(len)
            }
            Err(e) => {
                if e.is_connectivity() {
                    debug!(error = %e, "Cart unavailable; backend unreachable");
                } else {
                    error!(error = %e, "Error fetching cart");
                }
                self.replace(CartSnapshot::default());
                RefreshOutcome::Failed
            }
        }
    }

    /// Add to the server-side cart, then refresh.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero quantity (no request
    /// is made) and `CartError::AddItem` if the API rejects the add. The
    /// snapshot is untouched on error.
    #[instrument(skip(self))]
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        if let Err(source) = self.backend.add_item(product_id, quantity).await {
            warn!(error = %source, "Error adding to cart");
            return Err(CartError::AddItem {
                message: add_item_message(&source),
                source,
            });
        }

        self.refresh().await;
        Ok(())
    }

    /// Empty the snapshot without contacting the server.
    pub fn clear(&self) {
        self.replace(CartSnapshot::default());
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch for snapshot replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.snapshot.subscribe()
    }

    /// Number of lines (the badge count).
    #[must_use]
    pub fn count(&self) -> usize {
        self.snapshot.borrow().len()
    }

    #[must_use]
    pub fn summary(&self) -> CartSummary {
        self.snapshot.borrow().summary()
    }

    /// Whether a refresh is running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn replace(&self, snapshot: CartSnapshot) {
        self.snapshot.send_replace(snapshot);
    }
}

fn add_item_message(error: &ApiError) -> String {
    match error {
        ApiError::Http(_) | ApiError::Parse(_) | ApiError::InvalidUrl(_) => {
            ADD_ITEM_FALLBACK.to_string()
        }
        other => other.to_string(),
    }
}

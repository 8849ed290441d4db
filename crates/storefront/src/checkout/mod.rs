//! Checkout and order history.

mod conversions;

pub use conversions::{convert_order, parse_order_history};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument, warn};

use autoparts_core::Order;

use crate::cart::CartSynchronizer;
use crate::gateway::{ApiError, Gateway};

/// Errors from checkout and order history.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to check out. No request is made.
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Failed to complete checkout. Please try again.")]
    Checkout(#[source] ApiError),

    #[error("Failed to load order history. Please try again later.")]
    History(#[source] ApiError),
}

impl CheckoutError {
    /// The gateway error behind this failure, if any.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::EmptyCart => None,
            Self::Checkout(e) | Self::History(e) => Some(e),
        }
    }
}

/// Options sent with a checkout. All optional; the default serializes as `{}`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Checkout client.
#[derive(Clone)]
pub struct Checkout {
    gateway: Gateway,
}

impl Checkout {
    #[must_use]
    pub const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Place an order for the current cart and empty the local snapshot.
    ///
    /// The server empties its own cart when an order is placed, so no
    /// refresh follows.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if the snapshot is empty, and
    /// `CheckoutError::Checkout` if the API call fails.
    #[instrument(skip(self, cart, options))]
    pub async fn checkout(
        &self,
        cart: &CartSynchronizer,
        options: &CheckoutOptions,
    ) -> Result<Option<Order>, CheckoutError> {
        if cart.snapshot().is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let body = self
            .gateway
            .post_text("/api/checkout", options)
            .await
            .map_err(|e| {
                warn!(error = %e, "Checkout error");
                CheckoutError::Checkout(e)
            })?;

        cart.clear();

        // Some deployments answer with a plain-text confirmation.
        let order = match serde_json::from_str(&body) {
            Ok(Value::Object(map)) => Some(convert_order(&map)),
            _ => None,
        };
        info!(order_id = ?order.as_ref().and_then(|o| o.id), "Order placed");
        Ok(order)
    }

    /// Orders visible to the signed-in account. Admins see every order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::History` if the API call fails.
    #[instrument(skip(self))]
    pub async fn history(&self) -> Result<Vec<Order>, CheckoutError> {
        let body: Value = self
            .gateway
            .get_json("/api/checkout/history")
            .await
            .map_err(|e| {
                warn!(error = %e, "Error fetching orders");
                CheckoutError::History(e)
            })?;
        Ok(parse_order_history(body))
    }
}

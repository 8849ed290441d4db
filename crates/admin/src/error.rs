//! Back-office error type.

use thiserror::Error;

use autoparts_core::{ProductId, ProductInputError};
use autoparts_storefront::checkout::CheckoutError;
use autoparts_storefront::gateway::{ApiError, FailureKind};

/// Errors from back-office operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The current session is not an admin session. No request was made.
    #[error("Admin access required")]
    Forbidden,

    /// Product form failed local validation. No request was made.
    #[error(transparent)]
    InvalidProduct(#[from] ProductInputError),

    #[error("Product not found")]
    NotFound(ProductId),

    #[error("Failed to create product")]
    Create(#[source] ApiError),

    #[error("Failed to update product")]
    Update(#[source] ApiError),

    #[error("Failed to delete product")]
    Delete(#[source] ApiError),

    #[error("Failed to upload image")]
    Upload(#[source] ApiError),

    #[error("Failed to load orders")]
    Orders(#[source] CheckoutError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AdminError {
    /// Failure class of the underlying gateway error, if there is one.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Create(e) | Self::Update(e) | Self::Delete(e) | Self::Upload(e) | Self::Api(e) => {
                Some(e.kind())
            }
            Self::Orders(e) => e.api_error().map(ApiError::kind),
            Self::Forbidden | Self::InvalidProduct(_) | Self::NotFound(_) => None,
        }
    }
}

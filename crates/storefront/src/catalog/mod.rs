//! Product catalog.
//!
//! Read-only product lookups, cached with `moka`. The cache lifetime comes
//! from [`ClientConfig::catalog_cache_ttl`]; a zero lifetime disables caching.
//! Back-office mutations call [`Catalog::invalidate`] so the storefront does
//! not keep serving the old listing.

mod cache;
mod filter;

pub use filter::{ProductFilter, categories};

use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use autoparts_core::{Product, ProductId};

use crate::config::ClientConfig;
use crate::gateway::{ApiError, Gateway};
use cache::{CacheKey, CacheValue};

const CACHE_CAPACITY: u64 = 1000;

/// Errors from catalog lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found")]
    NotFound(ProductId),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Catalog client.
#[derive(Clone)]
pub struct Catalog {
    gateway: Gateway,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl Catalog {
    #[must_use]
    pub fn new(gateway: Gateway, config: &ClientConfig) -> Self {
        Self::with_ttl(gateway, config.catalog_cache_ttl)
    }

    /// Create a catalog whose cached entries live for `ttl`.
    #[must_use]
    pub fn with_ttl(gateway: Gateway, ttl: Duration) -> Self {
        let cache = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(ttl)
                .build()
        });
        Self { gateway, cache }
    }

    /// All products.
    ///
    /// # Errors
    ///
    /// Returns the gateway's classified error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        if let Some(CacheValue::Products(products)) = self.cached(&CacheKey::Products).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Option<Vec<Product>> = self.gateway.get_json("/api/products").await?;
        let products = products.unwrap_or_default();

        self.store(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Products matching `filter`.
    ///
    /// # Errors
    ///
    /// See [`Catalog::list_products`].
    pub async fn search(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        let products = self.list_products().await?;
        Ok(products.into_iter().filter(|p| filter.matches(p)).collect())
    }

    /// Distinct categories across all products.
    ///
    /// # Errors
    ///
    /// See [`Catalog::list_products`].
    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        Ok(categories(&self.list_products().await?))
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` on 404, otherwise the gateway's error.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cached(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Option<Product> = self
            .gateway
            .get_json(&format!("/api/products/{id}"))
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    CatalogError::NotFound(id)
                } else {
                    CatalogError::Api(e)
                }
            })?;
        let product = product.ok_or(CatalogError::NotFound(id))?;

        self.store(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Drop every cached entry.
    pub async fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
            cache.run_pending_tasks().await;
        }
    }

    async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        match &self.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn store(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.cache {
            cache.insert(key, value).await;
        }
    }
}

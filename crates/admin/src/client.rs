//! Back-office API client.

use tracing::{info, instrument, warn};

use autoparts_core::{Order, Product, ProductForm, ProductId, ProductInput};
use autoparts_storefront::StorefrontContext;
use autoparts_storefront::gateway::{Gateway, ImageUpload};

use crate::dashboard::DashboardStats;
use crate::error::AdminError;

/// What happened to the image attached to a save.
#[derive(Debug)]
pub enum ImageOutcome {
    /// No image was supplied.
    NotRequested,
    Uploaded,
    /// The product was saved but the image was not.
    Failed(AdminError),
}

/// Result of [`AdminClient::save_product`].
#[derive(Debug)]
pub struct SaveOutcome {
    pub product: Product,
    /// `true` for a create, `false` for an update.
    pub created: bool,
    pub image: ImageOutcome,
}

/// Client for admin-only endpoints.
///
/// Shares the storefront context, so it sends the same credential and a 401
/// here ends the storefront session too.
#[derive(Clone)]
pub struct AdminClient {
    ctx: StorefrontContext,
}

impl AdminClient {
    #[must_use]
    pub const fn new(ctx: StorefrontContext) -> Self {
        Self { ctx }
    }

    fn gateway(&self) -> Result<&Gateway, AdminError> {
        if self.ctx.sessions().is_admin() {
            Ok(self.ctx.gateway())
        } else {
            Err(AdminError::Forbidden)
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// All products, bypassing the storefront cache.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admin sessions, otherwise the
    /// gateway's error.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, AdminError> {
        let products: Option<Vec<Product>> = self.gateway()?.get_json("/api/products").await?;
        Ok(products.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `AdminError::NotFound` on 404.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, AdminError> {
        let product: Option<Product> = self
            .gateway()?
            .get_json(&format!("/api/products/{id}"))
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    AdminError::NotFound(id)
                } else {
                    AdminError::Api(e)
                }
            })?;
        product.ok_or(AdminError::NotFound(id))
    }

    /// # Errors
    ///
    /// Returns `AdminError::Create` if the API rejects the product.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, AdminError> {
        let product: Product = self
            .gateway()?
            .post_json("/api/products", input)
            .await
            .map_err(AdminError::Create)?;
        info!(product_id = %product.id, "Product created");
        self.ctx.catalog().invalidate().await;
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `AdminError::Update` if the API rejects the change.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, AdminError> {
        let product: Option<Product> = self
            .gateway()?
            .put_json(&format!("/api/products/{id}"), input)
            .await
            .map_err(AdminError::Update)?;
        info!("Product updated");
        self.ctx.catalog().invalidate().await;

        // An empty response still means the update went through.
        Ok(product.unwrap_or_else(|| Product {
            id,
            name: input.name.clone(),
            description: Some(input.description.clone()),
            price: input.price,
            category: Some(input.category.clone()),
            stock_quantity: Some(input.stock_quantity),
            image_url: None,
        }))
    }

    /// # Errors
    ///
    /// Returns `AdminError::Delete` if the API refuses.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AdminError> {
        self.gateway()?
            .delete(&format!("/api/products/{id}"))
            .await
            .map_err(AdminError::Delete)?;
        info!("Product deleted");
        self.ctx.catalog().invalidate().await;
        Ok(())
    }

    /// Upload a product image as multipart field `image`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Upload` if the upload fails.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name))]
    pub async fn upload_product_image(
        &self,
        id: ProductId,
        upload: ImageUpload,
    ) -> Result<(), AdminError> {
        self.gateway()?
            .post_multipart(&format!("/api/products/{id}/upload-image"), upload)
            .await
            .map_err(AdminError::Upload)?;
        info!("Product image uploaded");
        self.ctx.catalog().invalidate().await;
        Ok(())
    }

    /// Validate a form, create or update the product, then upload the image
    /// if one was given.
    ///
    /// An image failure does not undo the save; it is reported in
    /// [`SaveOutcome::image`].
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidProduct` before any request if the form is
    /// invalid, and `AdminError::Create`/`AdminError::Update` if the save fails.
    pub async fn save_product(
        &self,
        existing: Option<ProductId>,
        form: &ProductForm,
        image: Option<ImageUpload>,
    ) -> Result<SaveOutcome, AdminError> {
        let input = form.validate()?;

        let (product, created) = match existing {
            Some(id) => (self.update_product(id, &input).await?, false),
            None => (self.create_product(&input).await?, true),
        };

        let image = match image {
            None => ImageOutcome::NotRequested,
            Some(upload) => match self.upload_product_image(product.id, upload).await {
                Ok(()) => ImageOutcome::Uploaded,
                Err(e) => {
                    warn!(product_id = %product.id, error = %e, "Error uploading image");
                    ImageOutcome::Failed(e)
                }
            },
        };

        Ok(SaveOutcome {
            product,
            created,
            image,
        })
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Every order. The history endpoint returns all orders to admins.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Orders` if the request fails.
    pub async fn all_orders(&self) -> Result<Vec<Order>, AdminError> {
        self.gateway()?;
        self.ctx.order_history().await.map_err(AdminError::Orders)
    }

    /// Product and order counts, fetched concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first failure of either listing.
    #[instrument(skip(self))]
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AdminError> {
        let (products, orders) = tokio::try_join!(self.list_products(), self.all_orders())?;
        Ok(DashboardStats::from_listings(&products, &orders))
    }
}

//! Back-office commands.
//!
//! All of these require an admin session; the API is never called otherwise.

use std::path::Path;

use autoparts_admin::{AdminClient, AdminError, ImageOutcome, SaveOutcome};
use autoparts_core::{ProductForm, ProductId};
use autoparts_storefront::gateway::ImageUpload;
use clap::Args;
use thiserror::Error;

/// Errors specific to back-office commands.
#[derive(Debug, Error)]
pub enum AdminCommandError {
    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error("Cannot read image {path}: {source}")]
    ReadImage {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Product fields accepted by `admin create` and `admin update`.
#[derive(Debug, Args)]
pub struct ProductFields {
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    price: Option<String>,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    stock: Option<String>,

    /// Image file to upload after saving
    #[arg(long)]
    image: Option<std::path::PathBuf>,
}

impl ProductFields {
    fn apply(self, mut form: ProductForm) -> (ProductForm, Option<std::path::PathBuf>) {
        let Self {
            name,
            description,
            price,
            category,
            stock,
            image,
        } = self;
        if let Some(v) = name {
            form.name = v;
        }
        if let Some(v) = description {
            form.description = v;
        }
        if let Some(v) = price {
            form.price = v;
        }
        if let Some(v) = category {
            form.category = v;
        }
        if let Some(v) = stock {
            form.stock_quantity = v;
        }
        (form, image)
    }
}

fn read_image(path: &Path) -> Result<ImageUpload, AdminCommandError> {
    let bytes = std::fs::read(path).map_err(|source| AdminCommandError::ReadImage {
        path: path.display().to_string(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
    Ok(ImageUpload::new(file_name, bytes))
}

#[allow(clippy::print_stdout)]
pub async fn stats(admin: &AdminClient) -> Result<(), AdminError> {
    let stats = admin.dashboard_stats().await?;
    println!("Total products:  {}", stats.total_products);
    println!("Low stock items: {}", stats.low_stock_items);
    println!("Total orders:    {}", stats.total_orders);
    Ok(())
}

pub async fn orders(admin: &AdminClient) -> Result<(), AdminError> {
    let orders = admin.all_orders().await?;
    super::shop::print_orders(&orders);
    Ok(())
}

pub async fn create(admin: &AdminClient, fields: ProductFields) -> Result<(), AdminCommandError> {
    let (form, image) = fields.apply(ProductForm::default());
    let image = image.as_deref().map(read_image).transpose()?;
    let outcome = admin.save_product(None, &form, image).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn update(admin: &AdminClient, id: i64, fields: ProductFields) -> Result<(), AdminCommandError> {
    let id = ProductId::new(id);
    let existing = admin.get_product(id).await?;
    let (form, image) = fields.apply(ProductForm::from_product(&existing));
    let image = image.as_deref().map(read_image).transpose()?;
    let outcome = admin.save_product(Some(id), &form, image).await?;
    print_outcome(&outcome);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn delete(admin: &AdminClient, id: i64) -> Result<(), AdminError> {
    admin.delete_product(ProductId::new(id)).await?;
    println!("Product deleted");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn upload_image(admin: &AdminClient, id: i64, path: &Path) -> Result<(), AdminCommandError> {
    let upload = read_image(path)?;
    admin.upload_product_image(ProductId::new(id), upload).await?;
    println!("Image uploaded successfully");
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_outcome(outcome: &SaveOutcome) {
    if outcome.created {
        println!("Product created successfully (#{})", outcome.product.id);
    } else {
        println!("Product updated successfully (#{})", outcome.product.id);
    }
    match &outcome.image {
        ImageOutcome::NotRequested => {}
        ImageOutcome::Uploaded => println!("Image uploaded successfully"),
        ImageOutcome::Failed(e) => match std::error::Error::source(e) {
            Some(cause) => println!("{e}: {cause}"),
            None => println!("{e}"),
        },
    }
}

//! Catalog products.
//!
//! [`Product`] is what the API returns from `/api/products`. [`ProductForm`]
//! and [`ProductInput`] are the back-office side: raw form text and the
//! validated body sent on create/update.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::types::ProductId;

/// Products with fewer units than this in stock count as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// A product as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Server-assigned identifier.
    pub id: ProductId,
    /// Display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Long-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in the store currency.
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: Decimal,
    /// Category label, e.g. "Brakes".
    #[serde(default)]
    pub category: Option<String>,
    /// Units in stock, when the API reports it.
    #[serde(default)]
    pub stock_quantity: Option<i32>,
    /// Relative image reference under `/uploads/`.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    /// Whether stock is below [`LOW_STOCK_THRESHOLD`]. Unknown stock counts as zero.
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity.unwrap_or(0) < LOW_STOCK_THRESHOLD
    }
}

/// Deserialize `null` as the type's default instead of failing.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Errors from validating a [`ProductForm`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProductInputError {
    #[error("Product name is required")]
    MissingName,
    #[error("Price must be a number, got {0:?}")]
    InvalidPrice(String),
    #[error("Price cannot be negative")]
    NegativePrice,
    #[error("Stock quantity must be a whole number, got {0:?}")]
    InvalidStock(String),
    #[error("Stock quantity cannot be negative")]
    NegativeStock,
}

/// Validated product body for `POST /api/products` and `PUT /api/products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: String,
    pub stock_quantity: i32,
}

/// Unvalidated product fields as typed into the back-office form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub stock_quantity: String,
}

impl ProductForm {
    /// Pre-fill the form from an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: product.price.to_string(),
            category: product.category.clone().unwrap_or_default(),
            stock_quantity: product
                .stock_quantity
                .map(|q| q.to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate the form into a [`ProductInput`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ProductInputError`] found: a blank name, a price
    /// that is not a non-negative decimal, or a stock quantity that is not a
    /// non-negative integer.
    pub fn validate(&self) -> Result<ProductInput, ProductInputError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ProductInputError::MissingName);
        }

        let price_text = self.price.trim();
        let price: Decimal = price_text
            .parse()
            .map_err(|_| ProductInputError::InvalidPrice(price_text.to_owned()))?;
        if price < Decimal::ZERO {
            return Err(ProductInputError::NegativePrice);
        }

        let stock_text = self.stock_quantity.trim();
        let stock_quantity: i32 = stock_text
            .parse()
            .map_err(|_| ProductInputError::InvalidStock(stock_text.to_owned()))?;
        if stock_quantity < 0 {
            return Err(ProductInputError::NegativeStock);
        }

        Ok(ProductInput {
            name: name.to_owned(),
            description: self.description.trim().to_owned(),
            price,
            category: self.category.trim().to_owned(),
            stock_quantity,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn form() -> ProductForm {
        ProductForm {
            name: " Brake Pad Set ".to_string(),
            description: "Front axle".to_string(),
            price: "49.90".to_string(),
            category: "Brakes".to_string(),
            stock_quantity: "12".to_string(),
        }
    }

    #[test]
    fn test_product_deserializes_backend_shape() {
        let json = r#"{
            "id": 42,
            "name": "Oil Filter",
            "price": 12.5,
            "category": "Engine",
            "stockQuantity": 3,
            "imageUrl": "oil-filter.png",
            "description": null
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(42));
        assert_eq!(product.price, dec("12.5"));
        assert_eq!(product.image_url.as_deref(), Some("oil-filter.png"));
        assert!(product.is_low_stock());
    }

    #[test]
    fn test_product_tolerates_null_price_and_name() {
        let product: Product =
            serde_json::from_str(r#"{"id": 1, "name": null, "price": null}"#).unwrap();
        assert_eq!(product.name, "");
        assert_eq!(product.price, Decimal::ZERO);
        assert_eq!(product.stock_quantity, None);
    }

    #[test]
    fn test_low_stock_threshold() {
        let mut product: Product = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        product.stock_quantity = Some(5);
        assert!(!product.is_low_stock());
        product.stock_quantity = Some(4);
        assert!(product.is_low_stock());
    }

    #[test]
    fn test_form_validates() {
        let input = form().validate().unwrap();
        assert_eq!(input.name, "Brake Pad Set");
        assert_eq!(input.price, dec("49.90"));
        assert_eq!(input.stock_quantity, 12);
    }

    #[test]
    fn test_form_rejections() {
        let mut f = form();
        f.name = "  ".to_string();
        assert_eq!(f.validate(), Err(ProductInputError::MissingName));

        let mut f = form();
        f.price = "cheap".to_string();
        assert!(matches!(f.validate(), Err(ProductInputError::InvalidPrice(_))));

        let mut f = form();
        f.price = "-1".to_string();
        assert_eq!(f.validate(), Err(ProductInputError::NegativePrice));

        let mut f = form();
        f.stock_quantity = "2.5".to_string();
        assert!(matches!(f.validate(), Err(ProductInputError::InvalidStock(_))));

        let mut f = form();
        f.stock_quantity = "-3".to_string();
        assert_eq!(f.validate(), Err(ProductInputError::NegativeStock));
    }

    #[test]
    fn test_input_serializes_price_as_number() {
        let json = serde_json::to_value(form().validate().unwrap()).unwrap();
        assert_eq!(json["price"], serde_json::json!(49.9));
        assert_eq!(json["stockQuantity"], serde_json::json!(12));
    }

    #[test]
    fn test_form_round_trips_existing_product() {
        let product: Product = serde_json::from_str(
            r#"{"id": 3, "name": "Headlight", "price": "89.00", "category": "Lighting", "stockQuantity": 7}"#,
        )
        .unwrap();
        let f = ProductForm::from_product(&product);
        assert_eq!(f.stock_quantity, "7");
        assert_eq!(f.validate().unwrap().price, dec("89.00"));
    }
}

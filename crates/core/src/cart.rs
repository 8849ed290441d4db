//! Cart snapshot types.
//!
//! A [`CartSnapshot`] is the client's cached view of the server-held cart.
//! It is never patched locally: every successful refresh replaces it whole.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CartItemId, ProductId};

/// Sales tax applied on top of the cart subtotal (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Denormalized product fields carried on a cart line, as last fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub name: String,
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Server-side line identifier, when the API exposes one.
    pub id: Option<CartItemId>,
    pub product_id: ProductId,
    /// Always at least 1.
    pub quantity: u32,
    pub product: CartProduct,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Ordered cart contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot(Vec<CartLine>);

impl CartSnapshot {
    #[must_use]
    pub const fn new(lines: Vec<CartLine>) -> Self {
        Self(lines)
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.0
    }

    /// Number of distinct lines (the badge count).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.0.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Find the line for a product.
    #[must_use]
    pub fn line_for(&self, product_id: ProductId) -> Option<&CartLine> {
        self.0.iter().find(|line| line.product_id == product_id)
    }

    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary::from_subtotal(self.0.iter().map(CartLine::line_total).sum())
    }
}

impl IntoIterator for CartSnapshot {
    type Item = CartLine;
    type IntoIter = std::vec::IntoIter<CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Subtotal, tax, and grand total shown before checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl CartSummary {
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let tax = (subtotal * TAX_RATE).round_dp(2);
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product_id: i64, price: &str, quantity: u32) -> CartLine {
        CartLine {
            id: None,
            product_id: ProductId::new(product_id),
            quantity,
            product: CartProduct {
                name: format!("Part {product_id}"),
                price: price.parse().unwrap(),
                ..CartProduct::default()
            },
        }
    }

    #[test]
    fn test_tax_rate_is_ten_percent() {
        assert_eq!(TAX_RATE.to_string(), "0.10");
    }

    #[test]
    fn test_summary() {
        let cart = CartSnapshot::new(vec![line(1, "10.00", 2), line(2, "5.50", 1)]);
        let summary = cart.summary();
        assert_eq!(summary.subtotal.to_string(), "25.50");
        assert_eq!(summary.tax.to_string(), "2.55");
        assert_eq!(summary.total.to_string(), "28.05");
    }

    #[test]
    fn test_counts() {
        let cart = CartSnapshot::new(vec![line(1, "1", 3), line(2, "1", 4)]);
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.total_quantity(), 7);
        assert_eq!(cart.line_for(ProductId::new(2)).unwrap().quantity, 4);
        assert!(cart.line_for(ProductId::new(3)).is_none());
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let summary = CartSnapshot::default().summary();
        assert!(summary.total.is_zero());
    }
}

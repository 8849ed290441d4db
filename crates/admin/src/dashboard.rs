//! Dashboard statistics.

use serde::Serialize;

use autoparts_core::{Order, Product};

/// Headline numbers on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: usize,
    /// Products below the low-stock threshold; unknown stock counts as zero.
    pub low_stock_items: usize,
    pub total_orders: usize,
}

impl DashboardStats {
    #[must_use]
    pub fn from_listings(products: &[Product], orders: &[Order]) -> Self {
        Self {
            total_products: products.len(),
            low_stock_items: products.iter().filter(|p| p.is_low_stock()).count(),
            total_orders: orders.len(),
        }
    }
}

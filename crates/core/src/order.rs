//! Orders as reported by the checkout history endpoint.
//!
//! The API does not populate order totals reliably. [`Order::total`] reports
//! where a figure came from instead of silently recomputing it, so callers
//! can tell a server-reported total from one derived from line items.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{OrderId, ProductId};

/// Order lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
pub enum OrderStatus {
    Pending,
    /// Reported when the API omits a status.
    #[default]
    Processing,
    Completed,
    /// Any status this client does not know about, kept verbatim.
    Other(String),
}

impl OrderStatus {
    /// Interpret a wire status; `None` or blank means [`OrderStatus::Processing`].
    #[must_use]
    pub fn from_wire(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::Processing;
        };
        match value.to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "PROCESSING" => Self::Processing,
            "COMPLETED" => Self::Completed,
            _ => Self::Other(value.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub product_id: Option<ProductId>,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: Option<OrderId>,
    pub placed_at: Option<NaiveDateTime>,
    pub status: OrderStatus,
    /// First positive total the API reported, if any.
    pub reported_total: Option<Decimal>,
    pub items: Vec<OrderItem>,
}

/// Where an order total came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "amount", rename_all = "snake_case")]
pub enum OrderTotal {
    /// Taken from the API response.
    Reported(Decimal),
    /// Summed from line items because the API gave no usable total.
    /// Not authoritative: discounts, shipping, or tax may be missing.
    ComputedFromItems(Decimal),
    /// Neither a total nor any items were available.
    Unavailable,
}

impl OrderTotal {
    /// The figure to display, zero when unavailable.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        match self {
            Self::Reported(amount) | Self::ComputedFromItems(amount) => *amount,
            Self::Unavailable => Decimal::ZERO,
        }
    }

    #[must_use]
    pub const fn is_reported(&self) -> bool {
        matches!(self, Self::Reported(_))
    }
}

impl Order {
    #[must_use]
    pub fn total(&self) -> OrderTotal {
        if let Some(total) = self.reported_total.filter(|t| *t > Decimal::ZERO) {
            return OrderTotal::Reported(total);
        }
        if self.items.is_empty() {
            return OrderTotal::Unavailable;
        }
        OrderTotal::ComputedFromItems(self.items.iter().map(OrderItem::line_total).sum())
    }
}

//! Cart response conversion.
//!
//! `GET /api/cart` answers either `{"items": [...]}` or a bare array. Anything
//! else reads as an empty cart.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use autoparts_core::{CartItemId, CartLine, CartProduct, CartSnapshot, ProductId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLine {
    #[serde(default)]
    id: Option<CartItemId>,
    #[serde(default)]
    product_id: Option<ProductId>,
    #[serde(default)]
    quantity: Option<u32>,
    #[serde(default)]
    product: Option<WireProduct>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProduct {
    #[serde(default)]
    id: Option<ProductId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

/// Convert a cart response body into a [`CartSnapshot`].
///
/// Lines that do not decode, or that name no product, are dropped with a
/// warning. A missing or zero quantity counts as 1.
#[must_use]
pub fn parse_cart_response(body: Value) -> CartSnapshot {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let lines = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| match serde_json::from_value::<WireLine>(raw) {
            Ok(line) => convert_line(index, line),
            Err(e) => {
                warn!(index, error = %e, "Dropping undecodable cart line");
                None
            }
        })
        .collect();

    CartSnapshot::new(lines)
}

fn convert_line(index: usize, line: WireLine) -> Option<CartLine> {
    let product = line.product.unwrap_or_default();
    let Some(product_id) = line.product_id.or(product.id) else {
        warn!(index, "Dropping cart line without a product id");
        return None;
    };

    Some(CartLine {
        id: line.id,
        product_id,
        quantity: line.quantity.filter(|q| *q > 0).unwrap_or(1),
        product: CartProduct {
            name: product.name.unwrap_or_default(),
            price: product.price.unwrap_or_default(),
            category: product.category,
            image_url: product.image_url,
        },
    })
}

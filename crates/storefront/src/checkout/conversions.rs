//! Order history conversion.
//!
//! The order endpoints are loosely typed: the same fact may arrive under one
//! of several field names, as a number or a string, or not at all. Every
//! lookup here takes the first present, non-zero candidate.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::warn;

use autoparts_core::{Order, OrderId, OrderItem, OrderStatus, ProductId};

const TOTAL_FIELDS: [&str; 5] = ["totalAmount", "total", "totalPrice", "amount", "orderTotal"];
const DATE_FIELDS: [&str; 3] = ["orderDate", "createdAt", "date"];
const FALLBACK_ITEM_NAME: &str = "Product";

/// Convert an order history body into orders. A non-array body is empty.
#[must_use]
pub fn parse_order_history(body: Value) -> Vec<Order> {
    let Value::Array(entries) = body else {
        return Vec::new();
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry {
            Value::Object(map) => Some(convert_order(&map)),
            _ => {
                warn!(index, "Dropping order history entry that is not an object");
                None
            }
        })
        .collect()
}

/// Convert a single order object.
#[must_use]
pub fn convert_order(map: &Map<String, Value>) -> Order {
    let id = ["id", "orderId"]
        .iter()
        .find_map(|key| map.get(*key).and_then(as_i64))
        .map(OrderId::new);

    let placed_at = DATE_FIELDS
        .iter()
        .find_map(|key| map.get(*key).and_then(as_datetime));

    let reported_total = TOTAL_FIELDS
        .iter()
        .find_map(|key| map.get(*key).and_then(as_decimal).filter(|d| !d.is_zero()));

    let items = match map.get("items") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(convert_item)
            .collect(),
        _ => Vec::new(),
    };

    Order {
        id,
        placed_at,
        status: OrderStatus::from_wire(map.get("status").and_then(Value::as_str)),
        reported_total,
        items,
    }
}

fn convert_item(map: &Map<String, Value>) -> OrderItem {
    let product = map.get("product").and_then(Value::as_object);
    let nested = |key: &str| product.and_then(|p| p.get(key));

    let product_id = map
        .get("productId")
        .or_else(|| nested("id"))
        .and_then(as_i64)
        .map(ProductId::new);

    let name = [map.get("productName"), map.get("name"), nested("name")]
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(FALLBACK_ITEM_NAME)
        .to_string();

    let unit_price = [map.get("price"), nested("price")]
        .into_iter()
        .flatten()
        .filter_map(as_decimal)
        .find(|d| !d.is_zero())
        .unwrap_or_default();

    let quantity = map
        .get("quantity")
        .and_then(as_i64)
        .and_then(|q| u32::try_from(q).ok())
        .filter(|q| *q > 0)
        .unwrap_or(1);

    OrderItem {
        product_id,
        name,
        unit_price,
        quantity,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Accepts ISO-8601 strings (with or without offset), plain dates, and the
/// `[year, month, day, hour, minute, second, nanos]` arrays some Java
/// backends emit for local date-times.
fn as_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.naive_utc())
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
        }
        Value::Array(parts) => {
            let parts: Vec<u32> = parts
                .iter()
                .map(|p| p.as_u64().and_then(|n| u32::try_from(n).ok()))
                .collect::<Option<_>>()?;
            let field = |i: usize| parts.get(i).copied().unwrap_or(0);
            let year = i32::try_from(*parts.first()?).ok()?;
            NaiveDate::from_ymd_opt(year, field(1), field(2))?
                .and_hms_nano_opt(field(3), field(4), field(5), field(6))
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use autoparts_core::OrderTotal;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_non_array_history_is_empty() {
        assert!(parse_order_history(json!({"orders": []})).is_empty());
        assert!(parse_order_history(Value::Null).is_empty());
    }

    #[test]
    fn test_fallback_fields() {
        let orders = parse_order_history(json!([{
            "orderId": "17",
            "createdAt": "2024-03-05T10:30:00",
            "totalPrice": "59.97",
            "items": []
        }]));
        let order = &orders[0];
        assert_eq!(order.id, Some(OrderId::new(17)));
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.placed_at.unwrap().day(), 5);
        assert_eq!(order.total(), OrderTotal::Reported("59.97".parse().unwrap()));
    }

    #[test]
    fn test_zero_total_is_computed_from_items() {
        let orders = parse_order_history(json!([{
            "id": 3,
            "status": "COMPLETED",
            "totalAmount": 0,
            "items": [
                {"productName": "Spark Plug", "price": 4.5, "quantity": 4},
                {"product": {"id": 8, "name": "Air Filter", "price": 12}},
                {"name": "", "price": 0}
            ]
        }]));
        let order = &orders[0];
        assert_eq!(order.status, OrderStatus::Completed);

        let names: Vec<&str> = order.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Spark Plug", "Air Filter", "Product"]);
        assert_eq!(order.items[1].product_id, Some(ProductId::new(8)));
        assert_eq!(order.items[1].quantity, 1);

        let total = order.total();
        assert!(!total.is_reported());
        assert_eq!(total.amount(), Decimal::from(30));
    }

    #[test]
    fn test_date_formats() {
        let offset = as_datetime(&json!("2024-03-05T10:30:00Z")).unwrap();
        assert_eq!(offset.hour(), 10);

        let plain = as_datetime(&json!("2024-03-05")).unwrap();
        assert_eq!(plain.hour(), 0);

        let array = as_datetime(&json!([2024, 3, 5, 10, 30, 15])).unwrap();
        assert_eq!(array.second(), 15);

        assert!(as_datetime(&json!("yesterday")).is_none());
    }
}

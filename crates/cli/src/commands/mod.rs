//! CLI command implementations.

pub mod account;
pub mod admin;
pub mod shop;

use rust_decimal::Decimal;

/// Format an amount as dollars with two decimals.
fn money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

//! Autoparts Core - Shared domain types.
//!
//! This crate provides the types used across all Autoparts components:
//! - `storefront` - Client library for the customer-facing shop
//! - `admin` - Back-office client for product and order management
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no persisted state. The remote REST API owns persistence and
//! business rules; these types describe what the client believes about it.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, and roles
//! - [`product`] - Catalog products and admin product input
//! - [`cart`] - Cart lines, snapshots, and summaries
//! - [`order`] - Orders, order items, and total resolution

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod product;
pub mod types;

pub use cart::{CartLine, CartProduct, CartSnapshot, CartSummary, TAX_RATE};
pub use order::{Order, OrderItem, OrderStatus, OrderTotal};
pub use product::{LOW_STOCK_THRESHOLD, Product, ProductForm, ProductInput, ProductInputError};
pub use types::*;

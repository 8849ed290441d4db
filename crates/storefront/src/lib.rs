//! Autoparts storefront client library.
//!
//! The client side of the spare-parts store: a persisted session, an HTTP
//! gateway to the REST API, a cart mirror kept in sync with the server, and
//! the catalog, checkout, and image helpers the views are built on.
//! [`StorefrontContext`] wires one instance of each.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod context;
pub mod gateway;
pub mod images;
pub mod session;
pub mod storage;

pub use context::StorefrontContext;

//! Autoparts back-office library.
//!
//! Product management, order listing, and dashboard statistics for admin
//! accounts. Built on the storefront gateway; every operation first checks
//! that the current session holds the admin role.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod dashboard;
pub mod error;

pub use client::{AdminClient, ImageOutcome, SaveOutcome};
pub use dashboard::DashboardStats;
pub use error::AdminError;

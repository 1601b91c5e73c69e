//! EAZYMART storefront client library.
//!
//! Provides the persisted cart, pricing, checkout, and order tracking engine
//! behind the storefront, plus HTTP clients for the inventory and order
//! services and a terminal front end.

pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod geo;
pub mod inventory;
pub mod ledger;
pub mod models;
pub mod pricing;
pub mod session;
pub mod store;
pub mod tls;
pub mod tui;

pub use error::{Result, StoreError};

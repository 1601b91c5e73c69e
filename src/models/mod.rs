//! Shared data model for the storefront.
//!
//! Cart lines, orders, catalog items, and the response envelope used by the
//! inventory and order services. Field names follow the camelCase JSON the
//! services and the persisted store expect.

pub mod cart;
pub mod catalog;
pub mod envelope;
pub mod order;
pub mod reply;

pub use cart::{CartLine, NewItem};
pub use catalog::{Catalog, CatalogItem, ItemLookup};
pub use envelope::{ProtocolError, ResponseBody};
pub use order::{Customer, Location, Order, OrderStatus, OrderType};
pub use reply::SubmitReply;

//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line of the shopping cart.
///
/// Identity is `id`; the cart never holds two lines with the same `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Catalog item key.
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Always at least 1; a line reaching zero is removed.
    pub quantity: u32,
    #[serde(default)]
    pub special_request: String,
}

impl CartLine {
    /// Creates a line with quantity 1 and no special request.
    #[must_use]
    pub fn new(id: &str, name: &str, price: Decimal) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
            quantity: 1,
            special_request: String::new(),
        }
    }

    /// Returns `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// An item as offered to the cart by a front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl NewItem {
    #[must_use]
    pub fn new(id: &str, name: &str, price: Decimal) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
        }
    }
}

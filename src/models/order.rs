//! Order records.
//!
//! An [`Order`] is the immutable snapshot sent to the order service and kept
//! in the tracking ledger. Only `order_status` and `external_receipt_id` are
//! filled in after the service confirms it.

use std::fmt::{self, Write};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::CartLine;
use crate::pricing::format_rupees;

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    #[default]
    Delivery,
    Pickup,
}

impl OrderType {
    /// Switches between delivery and pickup.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Delivery => Self::Pickup,
            Self::Pickup => Self::Delivery,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivery => f.write_str("Delivery"),
            Self::Pickup => f.write_str("Pickup"),
        }
    }
}

/// Lifecycle status recorded on an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Built locally and handed to the order service.
    #[default]
    Received,
    /// The order service issued a receipt.
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub order_type: OrderType,
    pub customer: Customer,
    pub location: Location,
    pub items: Vec<CartLine>,
    pub special_instructions: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub delivery_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub promo_code: String,
    pub timestamp: DateTime<Utc>,
    pub order_status: OrderStatus,
    #[serde(
        rename = "loyverse_receipt_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub external_receipt_id: Option<String>,
}

impl Order {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|l| l.quantity).sum()
    }

    /// Records the service's receipt and marks the order confirmed.
    pub fn confirm(&mut self, receipt_id: String) {
        self.external_receipt_id = Some(receipt_id);
        self.order_status = OrderStatus::Confirmed;
    }

    /// Printable receipt text.
    #[must_use]
    pub fn receipt_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "EAZYMART Order Receipt");
        let _ = writeln!(out, "Website Order ID: {}", self.order_id);
        let _ = writeln!(
            out,
            "Loyverse Receipt ID: {}",
            self.external_receipt_id.as_deref().unwrap_or("N/A")
        );
        let _ = writeln!(out, "Order Type: {}", self.order_type);
        let _ = writeln!(out, "Customer: {} ({})", self.customer.name, self.customer.phone);
        let _ = writeln!(out, "Address: {}", self.location.address);
        let _ = writeln!(out, "Placed: {}", self.timestamp.format("%Y-%m-%d %H:%M UTC"));
        let _ = writeln!(out, "Items:");
        for line in &self.items {
            let _ = writeln!(
                out,
                "  {} x{} - {}",
                line.name,
                line.quantity,
                format_rupees(line.line_total())
            );
            if !line.special_request.is_empty() {
                let _ = writeln!(out, "    note: {}", line.special_request);
            }
        }
        let _ = writeln!(out, "Subtotal: {}", format_rupees(self.subtotal));
        if !self.delivery_fee.is_zero() {
            let _ = writeln!(out, "Delivery Fee: {}", format_rupees(self.delivery_fee));
        }
        if !self.discount.is_zero() {
            let _ = writeln!(
                out,
                "Discount ({}): -{}",
                self.promo_code,
                format_rupees(self.discount)
            );
        }
        let _ = writeln!(out, "Total: {}", format_rupees(self.total));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order() -> Order {
        let mut line = CartLine::new("rice", "Rice 5kg", dec!(250));
        line.quantity = 2;
        Order {
            order_id: "AA-12345678".to_string(),
            order_type: OrderType::Delivery,
            customer: Customer {
                name: "Lakshmi".to_string(),
                phone: "9876543210".to_string(),
                email: None,
            },
            location: Location {
                address: "Main Road, Chilakaluripet".to_string(),
                latitude: Some(16.09),
                longitude: Some(80.16),
            },
            items: vec![line],
            special_instructions: "None".to_string(),
            subtotal: dec!(500),
            delivery_fee: dec!(30),
            discount: dec!(50),
            total: dec!(480),
            promo_code: "EAZY10".to_string(),
            timestamp: "2025-03-01T10:15:00.000Z".parse().unwrap(),
            order_status: OrderStatus::Received,
            external_receipt_id: None,
        }
    }

    #[test]
    fn serializes_wire_field_names() {
        let value = serde_json::to_value(sample_order()).unwrap();
        assert_eq!(value["orderId"], "AA-12345678");
        assert_eq!(value["orderType"], "Delivery");
        assert_eq!(value["orderStatus"], "Received");
        assert_eq!(value["deliveryFee"], 30.0);
        assert_eq!(value["total"], 480.0);
        assert_eq!(value["items"][0]["quantity"], 2);
        assert!(value.get("loyverse_receipt_id").is_none());
        assert!(value["customer"].get("email").is_none());
    }

    #[test]
    fn confirm_sets_receipt_and_status() {
        let mut order = sample_order();
        order.confirm("0008".to_string());
        assert_eq!(order.order_status, OrderStatus::Confirmed);
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["loyverse_receipt_id"], "0008");
    }

    #[test]
    fn round_trips_through_ledger_json() {
        let mut order = sample_order();
        order.confirm("0008".to_string());
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn receipt_text_lists_items_and_totals() {
        let text = sample_order().receipt_text();
        assert!(text.contains("Website Order ID: AA-12345678"));
        assert!(text.contains("Loyverse Receipt ID: N/A"));
        assert!(text.contains("Rice 5kg x2 - ₹500.00"));
        assert!(text.contains("Discount (EAZY10): -₹50.00"));
        assert!(text.contains("Total: ₹480.00"));
    }

    #[test]
    fn item_count_sums_quantities() {
        assert_eq!(sample_order().item_count(), 2);
    }

    #[test]
    fn order_type_toggles() {
        assert_eq!(OrderType::Delivery.toggled(), OrderType::Pickup);
        assert_eq!(OrderType::Pickup.toggled(), OrderType::Delivery);
    }
}

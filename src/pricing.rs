//! Order total computation.
//!
//! [`compute_totals`] is a pure function of the cart lines, order type, and
//! promo state. Formatting for display lives in [`format_rupees`] and is not
//! part of the computed values.

use rust_decimal::Decimal;

use crate::config::StoreRules;
use crate::models::{CartLine, OrderType};

/// Session-local promo code state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromoState {
    code: String,
    discount_rate: Decimal,
}

impl PromoState {
    /// Applies customer input, returning whether the code was recognized.
    ///
    /// Input is trimmed and upper-cased. Unrecognized input clears any
    /// previously applied code.
    pub fn apply(&mut self, input: &str, rules: &StoreRules) -> bool {
        let code = input.trim().to_uppercase();
        if code == rules.promo_code {
            self.code = code;
            self.discount_rate = rules.promo_rate;
            true
        } else {
            self.reset();
            false
        }
    }

    pub fn reset(&mut self) {
        self.code.clear();
        self.discount_rate = Decimal::ZERO;
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn discount_rate(&self) -> Decimal {
        self.discount_rate
    }
}

/// The four computed amounts for a cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// Whether an order with these totals may be submitted.
    #[must_use]
    pub fn allows_submission(&self, line_count: usize) -> bool {
        line_count > 0 && self.total > Decimal::ZERO
    }
}

/// Sum of `price * quantity` over all lines.
#[must_use]
pub fn subtotal(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}

/// Computes subtotal, delivery fee, discount, and total.
#[must_use]
pub fn compute_totals(
    lines: &[CartLine],
    order_type: OrderType,
    promo: &PromoState,
    rules: &StoreRules,
) -> Totals {
    let subtotal = subtotal(lines);
    let delivery_fee = match order_type {
        OrderType::Delivery => rules.delivery_fee,
        OrderType::Pickup => Decimal::ZERO,
    };
    let discount = if promo.code() == rules.promo_code {
        (subtotal * promo.discount_rate()).min(subtotal)
    } else {
        Decimal::ZERO
    };

    Totals {
        subtotal,
        delivery_fee,
        discount,
        total: subtotal + delivery_fee - discount,
    }
}

/// Formats an amount as rupees with two decimals, e.g. `₹480.00`.
#[must_use]
pub fn format_rupees(amount: Decimal) -> String {
    format!("₹{:.2}", amount.round_dp(2))
}

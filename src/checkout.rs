//! Order building and submission.
//!
//! A checkout attempt moves through
//! `Idle → Validating → (Rejected | GeofenceChecking) → (RangeRejected | Submitting) → (Confirmed | Failed) → Idle`.
//! Validation runs against the session in
//! [`Storefront::begin_checkout`](crate::session::Storefront::begin_checkout),
//! which snapshots the cart into a [`PendingCheckout`]. The pending checkout
//! owns everything it needs, so the geofence check and the network round
//! trip can run while the session keeps accepting cart commands.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::StoreRules;
use crate::gateway::{GatewayError, OrderGateway};
use crate::geo::{Coordinate, GeocodeError, Geocoder, haversine_km};
use crate::models::envelope::{INVALID_RESPONSE_FORMAT, unwrap_envelope};
use crate::models::{
    CartLine, Customer, Location, Order, OrderStatus, OrderType, ProtocolError, SubmitReply,
};
use crate::pricing::Totals;

/// Recorded when the customer leaves special instructions blank.
const NO_INSTRUCTIONS: &str = "None";

/// Last millisecond timestamp used for an order id.
static LAST_ORDER_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Customer-entered checkout fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    /// Delivery address; required for delivery orders.
    pub address: String,
    /// Flat/landmark details, used as the address when `address` is blank.
    pub detailed_address: String,
    pub special_instructions: String,
    /// Delivery point chosen on a map, if any. Takes precedence over
    /// geocoding `address`.
    pub coordinate: Option<Coordinate>,
}

/// A required checkout field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    CustomerName,
    CustomerPhone,
    DeliveryAddress,
}

impl FormField {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::CustomerName => "name",
            Self::CustomerPhone => "phone",
            Self::DeliveryAddress => "delivery address",
        }
    }
}

/// Required fields left blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub missing: Vec<FormField>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.missing.iter().map(|m| m.label()).collect();
        write!(
            f,
            "Please fill in all required fields correctly (missing: {}).",
            labels.join(", ")
        )
    }
}

impl std::error::Error for ValidationError {}

impl CheckoutForm {
    /// Checks the required fields for `order_type`, reporting every blank one.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing the missing fields.
    pub fn validate(&self, order_type: OrderType) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push(FormField::CustomerName);
        }
        if self.phone.trim().is_empty() {
            missing.push(FormField::CustomerPhone);
        }
        if order_type == OrderType::Delivery && self.address.trim().is_empty() {
            missing.push(FormField::DeliveryAddress);
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }
}

/// A delivery point the store cannot serve.
#[derive(Debug, Clone, PartialEq)]
pub enum GeofenceError {
    OutOfRange { distance_km: f64, radius_km: f64 },
    /// The delivery address could not be located.
    Unresolved { address: String, reason: GeocodeError },
}

impl fmt::Display for GeofenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                distance_km,
                radius_km,
            } => write!(
                f,
                "Your location is {distance_km:.1} km away, outside our {radius_km} km delivery range."
            ),
            Self::Unresolved { address, reason } => {
                write!(f, "Could not locate \"{address}\" for delivery: {reason}")
            }
        }
    }
}

impl std::error::Error for GeofenceError {}

/// Why a checkout attempt did not confirm.
///
/// Every variant returns the session to idle with the cart intact.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Your cart is empty. Please add items before placing an order.")]
    EmptyOrder,

    /// The cart has lines but nothing to charge.
    #[error("Order total must be greater than zero.")]
    NonPositiveTotal,

    /// The order snapshot had no items or a non-positive total.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("An order is already being submitted.")]
    SubmissionInFlight,

    #[error("{0}")]
    Geofence(#[from] GeofenceError),

    #[error("{0}")]
    Network(GatewayError),

    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// The order service reported a failure.
    #[error("{0}")]
    Application(String),

    /// The order was accepted but could not be recorded locally.
    #[error("Order placed, but it could not be saved on this device: {0}")]
    Storage(String),
}

impl From<GatewayError> for CheckoutError {
    /// A 2xx body that is not JSON is malformed, not a transport failure.
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidBody(reason) => {
                warn!(%reason, "order service sent an unreadable body");
                Self::Protocol(ProtocolError::new(INVALID_RESPONSE_FORMAT))
            }
            other => Self::Network(other),
        }
    }
}

/// Stage of a checkout attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckoutPhase {
    #[default]
    Idle,
    Validating,
    Rejected,
    GeofenceChecking,
    RangeRejected,
    Submitting,
    Confirmed,
    Failed,
}

impl fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Rejected => "rejected",
            Self::GeofenceChecking => "geofence-checking",
            Self::RangeRejected => "range-rejected",
            Self::Submitting => "submitting",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Terminal result of [`PendingCheckout::run`].
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order_id: String,
    /// `Confirmed`, `RangeRejected`, or `Failed`.
    pub phase: CheckoutPhase,
    pub result: Result<Order, CheckoutError>,
}

/// A validated checkout with its cart and pricing snapshot.
#[derive(Debug, Clone)]
pub struct PendingCheckout {
    order_id: String,
    timestamp: DateTime<Utc>,
    order_type: OrderType,
    form: CheckoutForm,
    items: Vec<CartLine>,
    totals: Totals,
    promo_code: String,
    rules: StoreRules,
    phase: CheckoutPhase,
}

impl PendingCheckout {
    pub(crate) fn new(
        form: CheckoutForm,
        order_type: OrderType,
        items: Vec<CartLine>,
        totals: Totals,
        promo_code: &str,
        rules: StoreRules,
    ) -> Self {
        let timestamp = Utc::now();
        Self {
            order_id: next_order_id(timestamp),
            timestamp,
            order_type,
            form,
            items,
            totals,
            promo_code: promo_code.to_string(),
            rules,
            phase: CheckoutPhase::Validating,
        }
    }

    #[must_use]
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    #[must_use]
    pub fn phase(&self) -> CheckoutPhase {
        self.phase
    }

    #[must_use]
    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Runs the geofence check and submits the order.
    ///
    /// No request reaches `gateway` unless the delivery point is in range
    /// and the order snapshot is valid.
    pub async fn run(
        mut self,
        geocoder: Option<&dyn Geocoder>,
        gateway: &dyn OrderGateway,
    ) -> CheckoutOutcome {
        if self.order_type == OrderType::Delivery {
            self.enter(CheckoutPhase::GeofenceChecking);
        }
        let coordinate =
            match check_geofence(self.order_type, &self.form, geocoder, &self.rules).await {
                Ok(point) => point,
                Err(e) => {
                    warn!(order_id = %self.order_id, error = %e, "delivery outside geofence");
                    return self.finish(CheckoutPhase::RangeRejected, Err(e.into()));
                }
            };

        self.enter(CheckoutPhase::Submitting);
        let mut order = match self.build_order(coordinate) {
            Ok(order) => order,
            Err(e) => return self.finish(CheckoutPhase::Failed, Err(e)),
        };

        let result = submit_and_interpret(gateway, &order).await;
        match result {
            Ok(receipt_id) => {
                info!(order_id = %order.order_id, receipt_id = %receipt_id, "order confirmed");
                order.confirm(receipt_id);
                self.finish(CheckoutPhase::Confirmed, Ok(order))
            }
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "order submission failed");
                self.finish(CheckoutPhase::Failed, Err(e))
            }
        }
    }

    /// Assembles the order record from the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidOrder`] if the snapshot has no items
    /// or a non-positive total.
    pub fn build_order(&self, coordinate: Option<Coordinate>) -> Result<Order, CheckoutError> {
        if self.items.is_empty() {
            return Err(CheckoutError::InvalidOrder("no items".to_string()));
        }
        if self.totals.total <= Decimal::ZERO {
            return Err(CheckoutError::InvalidOrder(format!(
                "total is {}",
                self.totals.total
            )));
        }

        let form = &self.form;
        let address = [form.address.trim(), form.detailed_address.trim()]
            .into_iter()
            .find(|a| !a.is_empty())
            .unwrap_or(self.rules.pickup_address.as_str())
            .to_string();
        let email = Some(form.email.trim())
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        let special_instructions = match form.special_instructions.trim() {
            "" => NO_INSTRUCTIONS.to_string(),
            text => text.to_string(),
        };

        Ok(Order {
            order_id: self.order_id.clone(),
            order_type: self.order_type,
            customer: Customer {
                name: form.name.trim().to_string(),
                phone: form.phone.trim().to_string(),
                email,
            },
            location: Location {
                address,
                latitude: coordinate.map(|c| c.lat),
                longitude: coordinate.map(|c| c.lng),
            },
            items: self.items.clone(),
            special_instructions,
            subtotal: self.totals.subtotal,
            delivery_fee: self.totals.delivery_fee,
            discount: self.totals.discount,
            total: self.totals.total,
            promo_code: self.promo_code.clone(),
            timestamp: self.timestamp,
            order_status: OrderStatus::Received,
            external_receipt_id: None,
        })
    }

    fn enter(&mut self, phase: CheckoutPhase) {
        debug!(order_id = %self.order_id, from = %self.phase, to = %phase, "checkout transition");
        self.phase = phase;
    }

    fn finish(
        mut self,
        phase: CheckoutPhase,
        result: Result<Order, CheckoutError>,
    ) -> CheckoutOutcome {
        self.enter(phase);
        CheckoutOutcome {
            order_id: self.order_id,
            phase,
            result,
        }
    }
}

/// Resolves and checks the delivery point.
///
/// Pickup orders skip the check. A delivery whose point cannot be resolved,
/// or resolves to a non-finite or out-of-range coordinate, is rejected rather
/// than assumed to be in range.
///
/// # Errors
///
/// Returns a [`GeofenceError`] if the point is unresolvable or farther than
/// the delivery radius from the pickup location.
pub async fn check_geofence(
    order_type: OrderType,
    form: &CheckoutForm,
    geocoder: Option<&dyn Geocoder>,
    rules: &StoreRules,
) -> Result<Option<Coordinate>, GeofenceError> {
    if order_type == OrderType::Pickup {
        return Ok(None);
    }

    let address = form.address.trim();
    let point = match (form.coordinate, geocoder) {
        (Some(point), _) => point,
        (None, Some(geocoder)) => geocoder
            .resolve_coordinates(address)
            .await
            .map_err(|reason| GeofenceError::Unresolved {
                address: address.to_string(),
                reason,
            })?,
        (None, None) => {
            return Err(GeofenceError::Unresolved {
                address: address.to_string(),
                reason: GeocodeError::Unavailable("no geocoder configured".to_string()),
            });
        }
    };

    if !point.is_valid() {
        return Err(GeofenceError::Unresolved {
            address: address.to_string(),
            reason: GeocodeError::Unavailable(format!(
                "invalid coordinate {},{}",
                point.lat, point.lng
            )),
        });
    }

    let distance_km = match geocoder {
        Some(geocoder) => geocoder.distance_km(rules.pickup_location, point),
        None => haversine_km(rules.pickup_location, point),
    };
    debug!(distance_km, radius_km = rules.delivery_radius_km, "geofence distance");

    // NaN distances must not pass.
    if !(distance_km.is_finite() && distance_km <= rules.delivery_radius_km) {
        return Err(GeofenceError::OutOfRange {
            distance_km,
            radius_km: rules.delivery_radius_km,
        });
    }
    Ok(Some(point))
}

/// Posts the order and returns the receipt id from a success reply.
async fn submit_and_interpret(
    gateway: &dyn OrderGateway,
    order: &Order,
) -> Result<String, CheckoutError> {
    let raw = gateway.submit(order).await?;
    let payload = unwrap_envelope(raw)?;
    match SubmitReply::from_payload(&payload)? {
        SubmitReply::Success { receipt_id } => Ok(receipt_id),
        SubmitReply::Failure { message } => Err(CheckoutError::Application(message)),
    }
}

/// Returns `AA-` followed by the last 8 digits of the submission time in
/// milliseconds.
///
/// Ids are strictly increasing within a process even when two orders are
/// placed in the same millisecond.
fn next_order_id(now: DateTime<Utc>) -> String {
    let now_ms = now.timestamp_millis();
    let mut prev = LAST_ORDER_MILLIS.load(Ordering::Relaxed);
    let millis = loop {
        let candidate = now_ms.max(prev + 1);
        match LAST_ORDER_MILLIS.compare_exchange_weak(
            prev,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break candidate,
            Err(actual) => prev = actual,
        }
    };
    format!("AA-{:08}", millis.rem_euclid(100_000_000))
}

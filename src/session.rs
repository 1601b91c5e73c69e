//! The storefront session: the command interface front ends drive.
//!
//! [`Storefront`] owns the cart, promo state, order type, catalog, and
//! tracking ledger. Commands mutate that state and publish a
//! [`StorefrontEvent`] to every subscriber; front ends render from the
//! accessors and use the events for notifications.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::Result;
use crate::cart::{CartEngine, QuantityChange};
use crate::checkout::{CheckoutError, CheckoutForm, CheckoutOutcome, CheckoutPhase, PendingCheckout};
use crate::config::StoreRules;
use crate::gateway::OrderGateway;
use crate::geo::Geocoder;
use crate::ledger::TrackingLedger;
use crate::models::{CartLine, Catalog, ItemLookup, NewItem, Order, OrderType};
use crate::pricing::{PromoState, Totals, compute_totals};
use crate::store::KeyValueStore;

/// State-change notification published by [`Storefront`].
#[derive(Debug, Clone, PartialEq)]
pub enum StorefrontEvent {
    /// Cart contents, order type, or promo changed.
    CartChanged { badge: u32, totals: Totals },
    /// A quantity change was refused because of the stock ceiling.
    StockLimited { name: String, max: i64 },
    PromoApplied { code: String },
    PromoRejected { input: String },
    /// A checkout passed validation and is being submitted.
    CheckoutStarted { order_id: String },
    /// A checkout was refused before any network call.
    CheckoutRejected { message: String },
    /// The delivery point is outside the geofence or could not be located.
    OutOfRange { message: String },
    OrderConfirmed { order_id: String, receipt_id: String },
    OrderFailed { order_id: String, message: String },
}

/// One customer's storefront session.
pub struct Storefront {
    cart: CartEngine,
    ledger: TrackingLedger,
    catalog: Catalog,
    promo: PromoState,
    order_type: OrderType,
    rules: StoreRules,
    in_flight: Option<String>,
    subscribers: Vec<mpsc::UnboundedSender<StorefrontEvent>>,
}

impl Storefront {
    /// Opens a session over the persisted cart and ledger in `store`.
    ///
    /// The catalog starts empty until [`Storefront::set_catalog`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn open(store: Arc<dyn KeyValueStore>, rules: StoreRules) -> Result<Self> {
        let cart = CartEngine::load(store.clone(), rules.default_stock_ceiling)?;
        let ledger = TrackingLedger::load(store)?;
        info!(
            cart_lines = cart.lines().len(),
            orders = ledger.len(),
            "storefront session opened"
        );

        Ok(Self {
            cart,
            ledger,
            catalog: Catalog::default(),
            promo: PromoState::default(),
            order_type: OrderType::default(),
            rules,
            in_flight: None,
            subscribers: Vec::new(),
        })
    }

    /// Registers a new subscriber. Dropped receivers are pruned on the next
    /// publish.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StorefrontEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    // ── Queries ────────────────────────────────────────────────────────

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    #[must_use]
    pub fn badge_count(&self) -> u32 {
        self.cart.badge_count()
    }

    #[must_use]
    pub fn totals(&self) -> Totals {
        compute_totals(self.cart.lines(), self.order_type, &self.promo, &self.rules)
    }

    #[must_use]
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    #[must_use]
    pub fn promo_code(&self) -> &str {
        self.promo.code()
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn rules(&self) -> &StoreRules {
        &self.rules
    }

    #[must_use]
    pub fn orders(&self) -> &[Order] {
        self.ledger.orders()
    }

    #[must_use]
    pub fn find_order(&self, order_id: &str) -> Option<&Order> {
        self.ledger.find_by_id(order_id.trim())
    }

    /// Whether the cart may be submitted: non-empty with a positive total.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.totals().allows_submission(self.cart.lines().len())
    }

    /// Order id of the submission in flight, if any.
    #[must_use]
    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    // ── Cart commands ──────────────────────────────────────────────────

    pub fn set_catalog(&mut self, catalog: Catalog) {
        info!(items = catalog.len(), "catalog loaded");
        self.catalog = catalog;
    }

    /// Adds one unit of `item` to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn add_item(&mut self, item: &NewItem) -> Result<()> {
        self.cart.add_item(item)?;
        self.publish_cart();
        Ok(())
    }

    /// Adds one unit of the catalog item `id`.
    ///
    /// Returns `false` without touching the cart if the item is unknown or
    /// sold out.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn add_from_catalog(&mut self, id: &str) -> Result<bool> {
        let Some(item) = self.catalog.get_item(id) else {
            warn!(id, "add requested for unknown catalog item");
            return Ok(false);
        };
        if item.is_sold_out() {
            return Ok(false);
        }
        let new_item = item.to_new_item();
        self.add_item(&new_item)?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn remove_line(&mut self, index: usize) -> Result<bool> {
        let removed = self.cart.remove_line(index)?;
        if removed {
            self.publish_cart();
        }
        Ok(removed)
    }

    /// Changes a line's quantity, checking stock against the current catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn update_quantity(&mut self, index: usize, delta: i64) -> Result<QuantityChange> {
        let change = self.cart.update_quantity(index, delta, &self.catalog)?;
        match &change {
            QuantityChange::Updated(_) | QuantityChange::Removed => self.publish_cart(),
            QuantityChange::Rejected { name, max } => self.publish(StorefrontEvent::StockLimited {
                name: name.clone(),
                max: *max,
            }),
            QuantityChange::NoSuchLine => {}
        }
        Ok(change)
    }

    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn set_special_request(&mut self, index: usize, text: &str) -> Result<bool> {
        let updated = self.cart.set_special_request(index, text)?;
        if updated {
            self.publish_cart();
        }
        Ok(updated)
    }

    /// Applies a promo code, returning whether it was recognized.
    pub fn apply_promo(&mut self, input: &str) -> bool {
        let accepted = self.promo.apply(input, &self.rules);
        if accepted {
            info!(code = %self.promo.code(), "promo code applied");
            self.publish(StorefrontEvent::PromoApplied {
                code: self.promo.code().to_string(),
            });
        } else {
            self.publish(StorefrontEvent::PromoRejected {
                input: input.trim().to_string(),
            });
        }
        self.publish_cart();
        accepted
    }

    pub fn set_order_type(&mut self, order_type: OrderType) {
        if self.order_type != order_type {
            self.order_type = order_type;
            self.publish_cart();
        }
    }

    pub fn toggle_order_type(&mut self) {
        self.set_order_type(self.order_type.toggled());
    }

    // ── Checkout ───────────────────────────────────────────────────────

    /// Validates the form against the current cart and snapshots a
    /// [`PendingCheckout`].
    ///
    /// The session is marked in flight until the outcome is passed to
    /// [`Storefront::finish_checkout`]. Cart commands stay available in the
    /// meantime.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::SubmissionInFlight`] if a submission is
    /// already running, [`CheckoutError::Validation`] listing missing fields,
    /// then [`CheckoutError::EmptyOrder`] or
    /// [`CheckoutError::NonPositiveTotal`] if the cart cannot be submitted.
    pub fn begin_checkout(
        &mut self,
        form: CheckoutForm,
    ) -> std::result::Result<PendingCheckout, CheckoutError> {
        let refusal = if self.in_flight.is_some() {
            Some(CheckoutError::SubmissionInFlight)
        } else if let Err(e) = form.validate(self.order_type) {
            Some(CheckoutError::from(e))
        } else if self.cart.is_empty() {
            Some(CheckoutError::EmptyOrder)
        } else if !self.can_submit() {
            Some(CheckoutError::NonPositiveTotal)
        } else {
            None
        };
        if let Some(err) = refusal {
            warn!(error = %err, phase = %CheckoutPhase::Rejected, "checkout refused");
            self.publish(StorefrontEvent::CheckoutRejected {
                message: err.to_string(),
            });
            return Err(err);
        }

        let pending = PendingCheckout::new(
            form,
            self.order_type,
            self.cart.lines().to_vec(),
            self.totals(),
            self.promo.code(),
            self.rules.clone(),
        );
        info!(order_id = %pending.order_id(), order_type = %self.order_type, "checkout started");
        self.in_flight = Some(pending.order_id().to_string());
        self.publish(StorefrontEvent::CheckoutStarted {
            order_id: pending.order_id().to_string(),
        });
        Ok(pending)
    }

    /// Applies the outcome of a checkout and returns the session to idle.
    ///
    /// On confirmation the order is appended to the ledger, the cart is
    /// cleared, and the promo is reset. The whole cart is cleared, including
    /// lines added while the submission was in flight. On failure the cart is
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns the checkout failure, or [`CheckoutError::Storage`] if a
    /// confirmed order could not be recorded or the cart could not be cleared.
    pub fn finish_checkout(
        &mut self,
        outcome: CheckoutOutcome,
    ) -> std::result::Result<Order, CheckoutError> {
        if self.in_flight.as_deref() == Some(outcome.order_id.as_str()) {
            self.in_flight = None;
        }

        let order = match outcome.result {
            Ok(order) => order,
            Err(err) => {
                let message = err.to_string();
                let event = if outcome.phase == CheckoutPhase::RangeRejected {
                    StorefrontEvent::OutOfRange { message }
                } else {
                    StorefrontEvent::OrderFailed {
                        order_id: outcome.order_id,
                        message,
                    }
                };
                self.publish(event);
                return Err(err);
            }
        };

        let receipt_id = order.external_receipt_id.clone().unwrap_or_default();
        let recorded = self.ledger.record(order.clone());
        let cleared = self.cart.clear();
        self.promo.reset();

        self.publish(StorefrontEvent::OrderConfirmed {
            order_id: order.order_id.clone(),
            receipt_id,
        });
        self.publish_cart();

        if let Err(e) = recorded.and(cleared) {
            error!(order_id = %order.order_id, error = %e, "confirmed order not saved");
            return Err(CheckoutError::Storage(e.to_string()));
        }
        Ok(order)
    }

    /// Runs a whole checkout: validate, geofence, submit, and record.
    ///
    /// Holds the session for the duration of the round trip. Front ends
    /// that need cart commands during submission use
    /// [`Storefront::begin_checkout`] and [`Storefront::finish_checkout`]
    /// around a spawned [`PendingCheckout::run`] instead.
    ///
    /// # Errors
    ///
    /// Returns the [`CheckoutError`] that stopped the checkout.
    pub async fn submit_order(
        &mut self,
        form: CheckoutForm,
        geocoder: Option<&dyn Geocoder>,
        gateway: &dyn OrderGateway,
    ) -> std::result::Result<Order, CheckoutError> {
        let pending = self.begin_checkout(form)?;
        let outcome = pending.run(geocoder, gateway).await;
        self.finish_checkout(outcome)
    }

    fn publish_cart(&mut self) {
        let event = StorefrontEvent::CartChanged {
            badge: self.cart.badge_count(),
            totals: self.totals(),
        };
        self.publish(event);
    }

    fn publish(&mut self, event: StorefrontEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

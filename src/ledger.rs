//! Append-only record of submitted orders.

use std::sync::Arc;

use tracing::info;

use crate::Result;
use crate::models::Order;
use crate::store::{self, KeyValueStore, ORDERS_KEY};

/// Persisted list of confirmed orders, queried by order id.
pub struct TrackingLedger {
    orders: Vec<Order>,
    store: Arc<dyn KeyValueStore>,
}

impl TrackingLedger {
    /// Loads the persisted ledger.
    ///
    /// Entries that no longer decode are skipped; the raw ledger is kept
    /// under [`store::backup_key`] before anything can overwrite it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read, or an unreadable ledger
    /// cannot be backed up.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let orders = store::load_list(store.as_ref(), ORDERS_KEY)?;
        Ok(Self { orders, store })
    }

    /// Appends an order. Earlier entries are never modified and repeated
    /// ids are kept as separate entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be persisted; the in-memory
    /// ledger is left unchanged in that case.
    pub fn record(&mut self, order: Order) -> Result<()> {
        let order_id = order.order_id.clone();
        let mut next = self.orders.clone();
        next.push(order);
        store::save_json(self.store.as_ref(), ORDERS_KEY, &next)?;
        self.orders = next;
        info!(order_id = %order_id, entries = self.orders.len(), "order saved for tracking");
        Ok(())
    }

    /// Returns the first order with `order_id`, if any.
    #[must_use]
    pub fn find_by_id(&self, order_id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.order_id == order_id)
    }

    /// All orders, oldest first.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

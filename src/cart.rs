//! Cart engine: in-memory cart state with persist-then-commit mutations.
//!
//! Every mutation computes the next cart, writes it to the
//! [`KeyValueStore`], and only then replaces the in-memory lines. A failed
//! write therefore leaves both copies unchanged.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::Result;
use crate::models::{CartLine, ItemLookup, NewItem};
use crate::store::{self, CART_KEY, KeyValueStore};

/// Result of [`CartEngine::update_quantity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityChange {
    /// The line now holds this quantity.
    Updated(u32),
    /// The quantity reached zero and the line was removed.
    Removed,
    /// The new quantity would exceed the stock ceiling; nothing changed.
    Rejected { name: String, max: i64 },
    /// No line at the given index; nothing changed.
    NoSuchLine,
}

/// Owns the cart lines and keeps them in sync with the store.
pub struct CartEngine {
    lines: Vec<CartLine>,
    store: Arc<dyn KeyValueStore>,
    default_stock_ceiling: u32,
}

impl CartEngine {
    /// Loads the persisted cart.
    ///
    /// Persisted lines with a zero quantity or a duplicate id are dropped so
    /// the cart invariants hold from the first read.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(store: Arc<dyn KeyValueStore>, default_stock_ceiling: u32) -> Result<Self> {
        let persisted: Vec<CartLine> = store::load_list(store.as_ref(), CART_KEY)?;
        let mut lines: Vec<CartLine> = Vec::with_capacity(persisted.len());
        for line in persisted {
            if line.quantity == 0 || lines.iter().any(|l| l.id == line.id) {
                warn!(id = %line.id, "dropping invalid persisted cart line");
                continue;
            }
            lines.push(line);
        }
        debug!(lines = lines.len(), "loaded cart");

        Ok(Self {
            lines,
            store,
            default_stock_ceiling,
        })
    }

    /// Lines in display order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Badge count: the sum of all quantities.
    #[must_use]
    pub fn badge_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Adds one unit of `item`, merging with an existing line of the same id.
    ///
    /// An empty id is ignored. A negative price keeps the existing line's
    /// price, or zero for a new line.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn add_item(&mut self, item: &NewItem) -> Result<()> {
        if item.id.trim().is_empty() {
            warn!(name = %item.name, "ignoring cart item without an id");
            return Ok(());
        }

        let mut next = self.lines.clone();
        match next.iter_mut().find(|l| l.id == item.id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(1);
            }
            None => {
                let price = if item.price < Decimal::ZERO {
                    warn!(id = %item.id, price = %item.price, "negative price, using zero");
                    Decimal::ZERO
                } else {
                    item.price
                };
                next.push(CartLine::new(&item.id, &item.name, price));
            }
        }
        self.commit(next)
    }

    /// Removes the line at `index`. Out-of-range indexes are ignored.
    ///
    /// Returns whether a line was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn remove_line(&mut self, index: usize) -> Result<bool> {
        if index >= self.lines.len() {
            return Ok(false);
        }
        let mut next = self.lines.clone();
        let removed = next.remove(index);
        debug!(id = %removed.id, "removed cart line");
        self.commit(next)?;
        Ok(true)
    }

    /// Adds `delta` to the quantity of the line at `index`.
    ///
    /// A result of zero or less removes the line. A result above the item's
    /// stock ceiling (numeric catalog stock, else the default ceiling) is
    /// rejected without touching the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn update_quantity(
        &mut self,
        index: usize,
        delta: i64,
        catalog: &dyn ItemLookup,
    ) -> Result<QuantityChange> {
        let Some(line) = self.lines.get(index) else {
            return Ok(QuantityChange::NoSuchLine);
        };

        let new_qty = i64::from(line.quantity).saturating_add(delta);
        if new_qty <= 0 {
            self.remove_line(index)?;
            return Ok(QuantityChange::Removed);
        }

        let max = self.stock_ceiling(&line.id, catalog);
        if new_qty > max {
            warn!(id = %line.id, requested = new_qty, max, "quantity exceeds stock");
            return Ok(QuantityChange::Rejected {
                name: line.name.clone(),
                max,
            });
        }

        let new_qty = u32::try_from(new_qty).unwrap_or(u32::MAX);
        let mut next = self.lines.clone();
        next[index].quantity = new_qty;
        self.commit(next)?;
        Ok(QuantityChange::Updated(new_qty))
    }

    /// Overwrites the special request on the line at `index`.
    ///
    /// Returns whether a line was updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn set_special_request(&mut self, index: usize, text: &str) -> Result<bool> {
        if index >= self.lines.len() {
            return Ok(false);
        }
        let mut next = self.lines.clone();
        next[index].special_request = text.to_string();
        self.commit(next)?;
        Ok(true)
    }

    /// Empties the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new())
    }

    fn stock_ceiling(&self, id: &str, catalog: &dyn ItemLookup) -> i64 {
        catalog
            .get_item(id)
            .and_then(|item| item.stock)
            .unwrap_or(i64::from(self.default_stock_ceiling))
    }

    fn commit(&mut self, next: Vec<CartLine>) -> Result<()> {
        store::save_json(self.store.as_ref(), CART_KEY, &next)?;
        self.lines = next;
        Ok(())
    }
}

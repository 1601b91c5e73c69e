//! Product catalog models.
//!
//! The inventory service returns either an object keyed by item id or an
//! array of items. Both shapes normalize into a [`Catalog`] that preserves
//! the service's ordering and answers [`ItemLookup::get_item`] queries used
//! for stock ceilings.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::cart::NewItem;
use super::envelope::ProtocolError;

/// Numeric stock at or above this value is shown as unlimited.
const UNLIMITED_STOCK: i64 = 999;

/// A single product offered by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    /// Only numeric stock values count; anything else means "unknown".
    #[serde(default, deserialize_with = "lenient_stock")]
    pub stock: Option<i64>,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl CatalogItem {
    /// True when the item has a numeric stock of zero or less.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.stock.is_some_and(|s| s <= 0)
    }

    /// Human-readable stock description.
    #[must_use]
    pub fn stock_label(&self) -> String {
        match self.stock {
            Some(s) if s >= UNLIMITED_STOCK => "In Stock (Unlimited)".to_string(),
            Some(s) if s > 0 => format!("{s} in stock"),
            _ => "Out of Stock".to_string(),
        }
    }

    /// Converts the item into the shape the cart accepts.
    #[must_use]
    pub fn to_new_item(&self) -> NewItem {
        NewItem::new(&self.id, &self.name, self.price)
    }
}

/// Read access to catalog items by id.
pub trait ItemLookup {
    fn get_item(&self, id: &str) -> Option<&CatalogItem>;
}

/// An ordered, id-indexed set of catalog items.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog from items, dropping those without an id.
    ///
    /// A later item with an id already present replaces the earlier one.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let mut catalog = Self::default();
        for item in items {
            if item.id.is_empty() {
                continue;
            }
            match catalog.index.get(&item.id) {
                Some(&pos) => catalog.items[pos] = item,
                None => {
                    catalog.index.insert(item.id.clone(), catalog.items.len());
                    catalog.items.push(item);
                }
            }
        }
        catalog
    }

    /// Normalizes an unwrapped inventory payload.
    ///
    /// Keyed objects use the key as the id when the item has none. Array
    /// entries fall back to `handle` when `id` is missing.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] if the payload is neither an object nor an
    /// array, or an entry is not an item object.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let entries: Vec<(Option<String>, Value)> = match value {
            Value::Object(map) => map.into_iter().map(|(k, v)| (Some(k), v)).collect(),
            Value::Array(list) => list.into_iter().map(|v| (None, v)).collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(ProtocolError::new(format!(
                    "catalog must be an object or array, got {}",
                    json_kind(&other)
                )));
            }
        };

        let mut items = Vec::with_capacity(entries.len());
        for (key, raw) in entries {
            let mut item: CatalogItem = serde_json::from_value(raw)
                .map_err(|e| ProtocolError::new(format!("invalid catalog item: {e}")))?;
            if item.id.is_empty() {
                item.id = key.or_else(|| item.handle.clone()).unwrap_or_default();
            }
            items.push(item);
        }
        Ok(Self::from_items(items))
    }

    /// All items in service order.
    #[must_use]
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Groups items by category, categories in first-seen order.
    #[must_use]
    pub fn items_by_category(&self) -> Vec<(&str, Vec<&CatalogItem>)> {
        let mut groups: Vec<(&str, Vec<&CatalogItem>)> = Vec::new();
        for item in &self.items {
            match groups.iter_mut().find(|(c, _)| *c == item.category) {
                Some((_, members)) => members.push(item),
                None => groups.push((item.category.as_str(), vec![item])),
            }
        }
        groups
    }
}

impl ItemLookup for Catalog {
    fn get_item(&self, id: &str) -> Option<&CatalogItem> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accepts numbers or numeric strings; anything else becomes zero.
fn lenient_price<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let price = match value {
        Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    };
    Ok(price.unwrap_or(Decimal::ZERO))
}

fn lenient_stock<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        _ => None,
    })
}

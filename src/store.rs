//! Durable key-value persistence for the cart and the order ledger.
//!
//! Values are JSON strings under fixed keys, matching what a browser's
//! local storage held: [`CART_KEY`] maps to an array of cart lines and
//! [`ORDERS_KEY`] to an array of orders.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::{Result, StoreError};

/// Key holding the persisted cart.
pub const CART_KEY: &str = "eazymartCart";

/// Key holding the persisted order ledger.
pub const ORDERS_KEY: &str = "eazymartOrders";

/// A string-valued key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so a crash never leaves a half-written value behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            StoreError::Storage(format!("failed to create {}: {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Storage(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(|e| {
            StoreError::Storage(format!("failed to write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            StoreError::Storage(format!("failed to replace {}: {e}", path.display()))
        })
    }
}

/// In-process store, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Storage("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Storage("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Serializes `value` as JSON under `key`.
///
/// # Errors
///
/// Returns an error if serialization or the underlying write fails.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}

/// Loads a JSON list stored under `key`.
///
/// A missing key yields an empty list. Entries are decoded one at a time and
/// an unreadable entry is skipped. Whenever anything is skipped, the raw value
/// is first copied to [`backup_key`] so the next save cannot destroy it.
///
/// # Errors
///
/// Returns an error if the underlying read fails or an unreadable value
/// cannot be backed up.
pub fn load_list<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Vec<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(Vec::new());
    };
    let entries = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Null) => return Ok(Vec::new()),
        Ok(Value::Array(entries)) => entries,
        Ok(other) => {
            warn!(key, kind = json_kind(&other), "persisted value is not a list");
            back_up(store, key, &raw)?;
            return Ok(Vec::new());
        }
        Err(e) => {
            warn!(key, error = %e, "persisted value is not JSON");
            back_up(store, key, &raw)?;
            return Ok(Vec::new());
        }
    };

    let total = entries.len();
    let mut list = Vec::with_capacity(total);
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value(entry) {
            Ok(item) => list.push(item),
            Err(e) => warn!(key, index, error = %e, "skipping unreadable persisted entry"),
        }
    }
    if list.len() < total {
        back_up(store, key, &raw)?;
    }
    Ok(list)
}

/// Key under which an unreadable value for `key` is preserved.
#[must_use]
pub fn backup_key(key: &str) -> String {
    format!("{key}.unreadable")
}

fn back_up(store: &dyn KeyValueStore, key: &str, raw: &str) -> Result<()> {
    let backup = backup_key(key);
    store.set(&backup, raw)?;
    warn!(key, backup = %backup, "preserved unreadable persisted value");
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

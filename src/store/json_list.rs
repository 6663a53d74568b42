//! JSON array values stored under a single key

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::KeyValueStore;

/// Read a list, treating a missing or unreadable value as empty
pub fn read_list<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Vec<T>> {
    let raw = match store.get(key)? {
        Some(raw) => raw,
        None => return Ok(Vec::new()),
    };

    match serde_json::from_str(&raw) {
        Ok(items) => Ok(items),
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable stored list");
            Ok(Vec::new())
        }
    }
}

pub fn write_list<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, items: &[T]) -> Result<()> {
    let raw = serde_json::to_string(items)?;
    store.set(key, &raw)
}

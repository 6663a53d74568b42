//! Query history, most recent first, capped in length

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::json_list::{read_list, write_list};
use super::KeyValueStore;

pub const HISTORY_KEY: &str = "queryHistory";

pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// One executed query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,

    pub executed_at: DateTime<Utc>,
}

pub struct QueryHistory<'a> {
    store: &'a mut dyn KeyValueStore,
    max_entries: usize,
}

impl<'a> QueryHistory<'a> {
    pub fn new(store: &'a mut dyn KeyValueStore, max_entries: usize) -> Self {
        Self { store, max_entries }
    }

    /// Record a query; the oldest entries fall off once the cap is reached
    pub fn add(&mut self, query: &str, object: Option<&str>, record_count: Option<u64>) -> Result<HistoryEntry> {
        let entry = HistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.to_string(),
            object: object.map(str::to_string),
            record_count,
            executed_at: Utc::now(),
        };

        let mut all = self.list()?;
        all.insert(0, entry.clone());
        all.truncate(self.max_entries);
        write_list(self.store, HISTORY_KEY, &all)?;

        Ok(entry)
    }

    pub fn list(&self) -> Result<Vec<HistoryEntry>> {
        read_list(&*self.store, HISTORY_KEY)
    }

    /// Drop the whole history key
    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(HISTORY_KEY)
    }
}

//! Saved queries, most recent first

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::json_list::{read_list, write_list};
use super::KeyValueStore;

pub const SAVED_QUERIES_KEY: &str = "savedQueries";

/// A named query kept for later reuse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuery {
    pub id: String,
    pub name: String,
    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    pub created_at: DateTime<Utc>,
}

pub struct SavedQueries<'a> {
    store: &'a mut dyn KeyValueStore,
}

impl<'a> SavedQueries<'a> {
    pub fn new(store: &'a mut dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Store a query under a fresh id and return the new entry
    pub fn save(&mut self, name: &str, query: &str, object: Option<&str>) -> Result<SavedQuery> {
        let entry = SavedQuery {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            query: query.to_string(),
            object: object.map(str::to_string),
            created_at: Utc::now(),
        };

        let mut all = self.list()?;
        all.insert(0, entry.clone());
        write_list(self.store, SAVED_QUERIES_KEY, &all)?;

        Ok(entry)
    }

    pub fn list(&self) -> Result<Vec<SavedQuery>> {
        read_list(&*self.store, SAVED_QUERIES_KEY)
    }

    /// Look up by id, or by name when no id matches
    pub fn get(&self, id_or_name: &str) -> Result<Option<SavedQuery>> {
        let all = self.list()?;
        let found = all
            .iter()
            .find(|q| q.id == id_or_name)
            .or_else(|| all.iter().find(|q| q.name == id_or_name))
            .cloned();
        Ok(found)
    }

    /// Returns false when nothing was removed
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let mut all = self.list()?;
        let before = all.len();
        all.retain(|q| q.id != id);

        if all.len() == before {
            return Ok(false);
        }

        write_list(self.store, SAVED_QUERIES_KEY, &all)?;
        Ok(true)
    }
}

//! Store module - durable key-value storage and the lists kept in it

mod database;
mod json_list;
mod saved;
mod history;

pub use database::{Database, KeyValueStore};
pub use saved::{SavedQueries, SavedQuery};
pub use history::{HistoryEntry, QueryHistory, DEFAULT_MAX_ENTRIES};

//! Schema module - object/field metadata and its on-disk cache

mod types;
pub mod loader;

pub use types::*;
pub use loader::{load_metadata, save_metadata, MetadataCache};

//! Metadata cache - persists describe results to metadata.yaml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::{FieldMetadata, ObjectMetadata};

const CACHE_FILE: &str = "metadata.yaml";

/// Object list plus per-object field lists, as last fetched from the org
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataCache {
    #[serde(default)]
    pub objects: Vec<ObjectMetadata>,

    #[serde(default)]
    pub fields: BTreeMap<String, Vec<FieldMetadata>>,
}

impl MetadataCache {
    /// Field metadata for an object, empty when it was never described
    pub fn fields_for(&self, object: &str) -> &[FieldMetadata] {
        self.fields.get(object).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_fields(&mut self, object: &str, fields: Vec<FieldMetadata>) {
        self.fields.insert(object.to_string(), fields);
    }
}

/// Load the metadata cache from the data directory
pub fn load_metadata(data_dir: &Path) -> Result<MetadataCache> {
    let cache_path = data_dir.join(CACHE_FILE);

    if !cache_path.exists() {
        return Ok(MetadataCache::default());
    }

    let contents = std::fs::read_to_string(&cache_path)
        .with_context(|| format!("Failed to read metadata cache: {}", cache_path.display()))?;

    let cache: MetadataCache = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse metadata cache: {}", cache_path.display()))?;

    Ok(cache)
}

/// Write the metadata cache to the data directory
pub fn save_metadata(data_dir: &Path, cache: &MetadataCache) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    let cache_path = data_dir.join(CACHE_FILE);
    let contents = serde_yaml::to_string(cache)?;

    std::fs::write(&cache_path, contents)
        .with_context(|| format!("Failed to write metadata cache: {}", cache_path.display()))?;

    Ok(())
}

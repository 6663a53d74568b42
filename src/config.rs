//! Global configuration for the workbench

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::DEFAULT_MAX_ENTRIES;

const DEFAULT_API_VERSION: &str = "59.0";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Workbench configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Org base URL, e.g. https://acme.my.salesforce.com
    #[serde(default)]
    pub instance_url: Option<String>,

    /// OAuth access token (session id)
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of history entries kept
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Where the store and metadata cache live
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_history_limit() -> usize {
    DEFAULT_MAX_ENTRIES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance_url: None,
            access_token: None,
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            history_limit: default_history_limit(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load config from the given path, or the default location when none is given
    ///
    /// A missing default config is not an error. Environment variables
    /// `SF_INSTANCE_URL` and `SF_ACCESS_TOKEN` override the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::load_from(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SF_INSTANCE_URL").filter(|v| !v.is_empty()) {
            self.instance_url = Some(url);
        }
        if let Some(token) = lookup("SF_ACCESS_TOKEN").filter(|v| !v.is_empty()) {
            self.access_token = Some(token);
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Data directory, falling back to the OS data dir
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("soql-workbench")
        })
    }

    /// Get default config file path
    /// Checks ~/.config/soql-workbench/config.toml first (XDG style),
    /// then falls back to OS-specific location
    pub fn default_path() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("soql-workbench").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("soql-workbench")
            .join("config.toml")
    }

    /// Write a commented default config if none exists and return its path
    pub fn create_default(path: Option<&Path>) -> Result<PathBuf> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        if config_path.exists() {
            return Ok(config_path);
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let default_config = r#"# SOQL Workbench configuration

# Org base URL and access token (SF_INSTANCE_URL / SF_ACCESS_TOKEN override these)
# instance_url = "https://yourorg.my.salesforce.com"
# access_token = "00D..."

api_version = "59.0"
timeout_secs = 30
history_limit = 50

# Where saved queries, history and the metadata cache are kept
# data_dir = "/path/to/data"
"#;

        std::fs::write(&config_path, default_config)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_fields_missing() {
        let config: Config = toml::from_str(r#"instance_url = "https://acme.my.salesforce.com""#).unwrap();
        assert_eq!(config.api_version, "59.0");
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_created_default_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = Config::create_default(Some(&path)).unwrap();
        assert_eq!(created, path);

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.instance_url.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config {
            instance_url: Some("https://file.example.com".to_string()),
            ..Default::default()
        };

        config.apply_env(|name| match name {
            "SF_ACCESS_TOKEN" => Some("token-from-env".to_string()),
            "SF_INSTANCE_URL" => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.access_token.as_deref(), Some("token-from-env"));
        assert_eq!(config.instance_url.as_deref(), Some("https://file.example.com"));
    }
}

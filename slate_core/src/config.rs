/// Configuration file support for SLATE
///
/// Allows store and observer settings to come from TOML/YAML config
/// files instead of hardcoded values. Supports auto-detection of file
/// format and multiple search paths.
use crate::error::{SlateError, SlateResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_poll_interval_ms() -> u64 {
    10
}

/// Settings for a change observer attached to one store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Sampling period in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Emit only on observed change instead of every tick
    #[serde(default)]
    pub distinct: bool,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            distinct: false,
        }
    }
}

impl ObserverConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// SLATE store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store name (the shared segment is published under this)
    pub name: String,

    /// Observer settings for readers of this store
    #[serde(default)]
    pub observer: Option<ObserverConfig>,
}

/// Full configuration file with multiple store definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlateConfig {
    /// Map of store name -> store config
    pub stores: std::collections::HashMap<String, StoreConfig>,
}

impl SlateConfig {
    /// Load config from a file (auto-detect format)
    pub fn from_file<P: AsRef<Path>>(path: P) -> SlateResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SlateError::config(format!("Failed to read config file: {}", e)))?;

        // Auto-detect format based on extension
        let extension = path.extension().and_then(|s| s.to_str());
        match extension {
            Some("toml") => Self::from_toml(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => {
                // Try both formats
                Self::from_toml(&contents).or_else(|_| Self::from_yaml(&contents))
            }
        }
    }

    /// Parse config from TOML string
    pub fn from_toml(contents: &str) -> SlateResult<Self> {
        toml::from_str(contents)
            .map_err(|e| SlateError::config(format!("Failed to parse TOML: {}", e)))
    }

    /// Parse config from YAML string
    pub fn from_yaml(contents: &str) -> SlateResult<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| SlateError::config(format!("Failed to parse YAML: {}", e)))
    }

    /// Find and load config file from standard search paths
    ///
    /// Search order:
    /// 1. ./slate.toml or ./slate.yaml
    /// 2. ~/.slate/config.toml or ~/.slate/config.yaml
    /// 3. /etc/slate/config.toml or /etc/slate/config.yaml
    pub fn find_and_load() -> SlateResult<Self> {
        let search_paths = Self::get_search_paths();

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(SlateError::config(
            "No config file found in standard locations",
        ))
    }

    /// Get standard config file search paths
    pub fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Current directory
        paths.push(PathBuf::from("slate.toml"));
        paths.push(PathBuf::from("slate.yaml"));
        paths.push(PathBuf::from("slate.yml"));

        // User config directory (~/.slate/)
        if let Some(home) = dirs::home_dir() {
            let slate_dir = home.join(".slate");
            paths.push(slate_dir.join("config.toml"));
            paths.push(slate_dir.join("config.yaml"));
            paths.push(slate_dir.join("config.yml"));
        }

        // System config directory (/etc/slate/)
        paths.push(PathBuf::from("/etc/slate/config.toml"));
        paths.push(PathBuf::from("/etc/slate/config.yaml"));

        paths
    }

    /// Get a store config by name
    pub fn get_store(&self, name: &str) -> SlateResult<&StoreConfig> {
        self.stores
            .get(name)
            .ok_or_else(|| SlateError::config(format!("Store '{}' not found in config", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [stores.weather]
            name = "weather"

            [stores.weather.observer]
            poll_interval_ms = 25
            distinct = true

            [stores.odometry]
            name = "odometry"
        "#;

        let config = SlateConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.stores.len(), 2);

        let weather = config.get_store("weather").unwrap();
        let observer = weather.observer.as_ref().unwrap();
        assert_eq!(observer.poll_interval(), Duration::from_millis(25));
        assert!(observer.distinct);

        let odometry = config.get_store("odometry").unwrap();
        assert!(odometry.observer.is_none());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml_str = r#"
            stores:
              weather:
                name: weather
                observer:
                  poll_interval_ms: 50
              odometry:
                name: odometry
        "#;

        let config = SlateConfig::from_yaml(yaml_str).unwrap();
        assert_eq!(config.stores.len(), 2);

        let weather = config.get_store("weather").unwrap();
        let observer = weather.observer.as_ref().unwrap();
        assert_eq!(observer.poll_interval_ms, 50);
        assert!(!observer.distinct);
    }

    #[test]
    fn test_observer_defaults() {
        let observer = ObserverConfig::default();
        assert_eq!(observer.poll_interval(), Duration::from_millis(10));
        assert!(!observer.distinct);
    }

    #[test]
    fn test_unknown_store() {
        let config = SlateConfig::from_toml("[stores]").unwrap();
        assert!(config.get_store("missing").is_err());
    }
}

//! # strata-config
//!
//! Configuration management for the strata blob store.
//!
//! Loads configuration from:
//! 1. `~/.strata/config.toml` (global)
//! 2. `.strata/config.toml` (project-local, overrides global)
//! 3. Environment variables (highest priority)

pub mod logging;
pub mod path;
pub mod testing;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};
use tracing::debug;

/// Default storage root (tilde-expanded on use)
pub const DEFAULT_STORE_ROOT: &str = "~/.strata/store";

/// Default scratch directory for in-flight uploads
pub const DEFAULT_SCRATCH: &str = "~/.strata/scratch";

/// Global config instance
static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::load().unwrap_or_default()));

/// Get global config (read-only)
pub fn config() -> RwLockReadGuard<'static, Config> {
    // A poisoned lock still holds a complete config; readers never leave it half-written.
    CONFIG.read().unwrap_or_else(|e| e.into_inner())
}

/// Reload config from disk
pub fn reload() -> Result<(), ConfigError> {
    let new_config = Config::load()?;
    *CONFIG.write().unwrap_or_else(|e| e.into_inner()) = new_config;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub list: ListConfig,
}

impl Config {
    /// Load config from standard locations
    pub fn load() -> Result<Self, ConfigError> {
        let mut config =
            Self::load_from(Self::global_config_path().as_deref(), Path::new(".strata/config.toml"))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load a global file (if any) and overlay a project file, without env overrides.
    pub fn load_from(global: Option<&Path>, project: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(global_path) = global {
            if global_path.exists() {
                debug!("Loading global config from {:?}", global_path);
                let contents = std::fs::read_to_string(global_path)?;
                config = toml::from_str(&contents)?;
            }
        }

        if project.exists() {
            debug!("Loading project config from {:?}", project);
            let contents = std::fs::read_to_string(project)?;
            let project_config: Config = toml::from_str(&contents)?;
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Global config path: ~/.strata/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".strata/config.toml"))
    }

    /// Merge a project config over this one.
    ///
    /// Values still at their defaults in `other` are treated as unset.
    fn merge(&mut self, other: Config) {
        let defaults = Config::default();
        if other.storage.root != defaults.storage.root {
            self.storage.root = other.storage.root;
        }
        if other.storage.scratch != defaults.storage.scratch {
            self.storage.scratch = other.storage.scratch;
        }
        if other.ingest.scheme != defaults.ingest.scheme {
            self.ingest.scheme = other.ingest.scheme;
        }
        if other.list.page_size != defaults.list.page_size {
            self.list.page_size = other.list.page_size;
        }
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("STRATA_ROOT") {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(scratch) = lookup("STRATA_SCRATCH") {
            self.storage.scratch = PathBuf::from(scratch);
        }
        if let Some(scheme) = lookup("STRATA_SCHEME").and_then(|v| v.parse().ok()) {
            self.ingest.scheme = scheme;
        }
        if let Some(size) = lookup("STRATA_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.list.page_size = size;
        }
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        Config::default().to_toml()
    }

    pub fn to_toml(&self) -> String {
        // Plain structs of strings, paths and integers always serialize.
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage root holding the V1/ and V2/ trees
    pub root: PathBuf,
    /// Scratch directory for temp files; must share a volume with `root`
    pub scratch: PathBuf,
}

impl StorageConfig {
    pub fn root_path(&self) -> PathBuf {
        path::expand_home(&self.root)
    }

    pub fn scratch_path(&self) -> PathBuf {
        path::expand_home(&self.scratch)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORE_ROOT),
            scratch: PathBuf::from(DEFAULT_SCRATCH),
        }
    }
}

/// Ingest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Scheme version for new uploads (1 or 2)
    pub scheme: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { scheme: 2 }
    }
}

/// Listing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Identifiers per page when no limit is given
    pub page_size: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.root, PathBuf::from(DEFAULT_STORE_ROOT));
        assert_eq!(config.ingest.scheme, 2);
        assert_eq!(config.list.page_size, 100);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[storage]"));
        assert!(toml_str.contains("[ingest]"));
        assert!(toml_str.contains("[list]"));
        assert!(toml_str.contains(".strata/store"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed: Config = toml::from_str("[list]\npage_size = 7\n").unwrap();
        assert_eq!(parsed.list.page_size, 7);
        assert_eq!(parsed.ingest.scheme, 2);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STRATA_ROOT", "/data/store"),
            ("STRATA_SCHEME", "1"),
            ("STRATA_PAGE_SIZE", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.storage.root, PathBuf::from("/data/store"));
        assert_eq!(config.storage.scratch, PathBuf::from(DEFAULT_SCRATCH));
        assert_eq!(config.ingest.scheme, 1);
        assert_eq!(config.list.page_size, 100);
    }
}

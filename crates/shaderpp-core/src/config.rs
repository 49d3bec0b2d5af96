use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file looked up by hosts
pub const CONFIG_FILE_NAME: &str = "shaderpp.yaml";

/// Default search root: the host application's asset directory
pub const DEFAULT_ASSET_DIR: &str = "assets";

/// Preprocessor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessorConfig {
    /// Directories consulted, in order, after the including file's own
    /// directory (default: ["assets"])
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,

    /// Reuse expansions of unchanged files (default: true)
    #[serde(default = "default_true")]
    pub enable_cache: bool,

    /// Evict least-recently-used cache entries beyond this count
    /// (default: unbounded)
    #[serde(default)]
    pub max_cache_entries: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_search_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(DEFAULT_ASSET_DIR)]
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            search_paths: default_search_paths(),
            enable_cache: true,
            max_cache_entries: None,
        }
    }
}

/// Overrides supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Appended after the configured search paths
    pub extra_search_paths: Vec<PathBuf>,
    pub no_cache: bool,
    pub max_cache_entries: Option<usize>,
}

impl PreprocessorConfig {
    /// Load configuration from a JSON (`.json`) or YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Create a default configuration and write it to a file as YAML
    pub fn init_file(path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(&PreprocessorConfig::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Merge CLI overrides into this configuration
    pub fn merge(&mut self, overrides: &ConfigOverrides) {
        self.search_paths
            .extend(overrides.extra_search_paths.iter().cloned());

        if overrides.no_cache {
            self.enable_cache = false;
        }

        if overrides.max_cache_entries.is_some() {
            self.max_cache_entries = overrides.max_cache_entries;
        }
    }
}

//! Store configuration, persisted as config.yaml in the data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default embedding dimension (matches the upstream text embedder)
const DEFAULT_DIMENSION: usize = 768;
/// Default number of search results
const DEFAULT_K: usize = 5;

/// Config file name within the data directory
const CONFIG_FILE: &str = "config.yaml";

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a vector store instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Embedding dimension, fixed for the lifetime of the store
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Default number of results returned by search
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Directory holding vectors.bin, metadata.json and config.yaml
    #[serde(skip_serializing, skip_deserializing)]
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            default_k: DEFAULT_K,
            data_dir: PathBuf::from("data"),
        }
    }
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

fn default_k() -> usize {
    DEFAULT_K
}

impl StoreConfig {
    /// Load the config from `data_dir/config.yaml`, writing the defaults
    /// there on first run.
    pub fn load_with(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE);

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_yml::from_str::<StoreConfig>(&raw)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?
        } else {
            let config = StoreConfig::default();
            std::fs::create_dir_all(data_dir)?;
            std::fs::write(
                &path,
                serde_yml::to_string(&config)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?,
            )?;
            config
        };

        config.data_dir = data_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Check config invariants.
    ///
    /// Run again after applying any override on top of a loaded config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 {
            return Err(ConfigError::Invalid(
                "dimension must be greater than 0".to_string(),
            ));
        }
        if self.dimension > crate::index_storage::MAX_DIMENSION {
            return Err(ConfigError::Invalid(format!(
                "dimension must be at most {}, got {}",
                crate::index_storage::MAX_DIMENSION,
                self.dimension
            )));
        }
        if self.default_k == 0 {
            return Err(ConfigError::Invalid(
                "default_k must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

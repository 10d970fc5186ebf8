use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::btree::{BPlusTree, BPlusTreeError, DEFAULT_ORDER};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Tree error: {0}")]
    TreeError(#[from] BPlusTreeError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for building a tree and running the shell
///
/// Missing fields in a config file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Minimum degree `t`
    pub order: usize,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
            log_filter: "warn".to_string(),
        }
    }
}

impl TreeConfig {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Build an empty tree, rejecting an invalid order
    pub fn build_tree(&self) -> ConfigResult<BPlusTree> {
        Ok(BPlusTree::new(self.order)?)
    }
}

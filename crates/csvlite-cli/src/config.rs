//! Configuration management for csvlite CLI
//!
//! Defaults that command-line flags override.

use crate::error::{CliError, Result};
use csvlite_common::TypeTag;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Environment variable naming the default target directory
pub const TARGET_DIR_ENV: &str = "CSVLITE_TARGET_DIR";

/// Environment variable naming the default column type
pub const DEFAULT_TYPE_ENV: &str = "CSVLITE_DEFAULT_TYPE";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory receiving the database and artifacts
    pub target_dir: PathBuf,

    /// Type for columns without an explicit mapping
    #[serde(default)]
    pub default_type: Option<TypeTag>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("."),
            default_type: None,
        }
    }
}

impl Config {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::new();

        if let Some(dir) = lookup(TARGET_DIR_ENV).filter(|dir| !dir.trim().is_empty()) {
            config.target_dir = PathBuf::from(dir);
        }

        if let Some(tag) = lookup(DEFAULT_TYPE_ENV) {
            let parsed = tag
                .parse::<TypeTag>()
                .map_err(|e| CliError::config(format!("{DEFAULT_TYPE_ENV}: {e}")))?;
            config.default_type = Some(parsed);
        }

        Ok(config)
    }
}

//! Optional config-file layer for the process-wide tunables
//!
//! Environment variables always win (see [`crate::settings`]); the file only
//! pre-sets values for hosts that prefer checked-in configuration.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// File-sourced tunable overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    /// Maximum retained completed steps
    #[serde(rename = "max-completed-tasks")]
    pub max_completed_tasks: Option<usize>,

    /// Memory-pressure threshold, e.g. "64MiB" or a raw byte count
    #[serde(rename = "memory-threshold")]
    pub memory_threshold: Option<String>,

    /// Process soft memory limit; 80% of it becomes the threshold when no
    /// explicit threshold is configured
    #[serde(rename = "soft-memory-limit")]
    pub soft_memory_limit: Option<String>,
}

impl FileConfig {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .wizqueue.yml
        let local_config = PathBuf::from(".wizqueue.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/wizqueue/wizqueue.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("wizqueue").join("wizqueue.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::debug!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

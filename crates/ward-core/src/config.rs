//! Configuration management for ward
//!
//! Repository-level settings: sweep skip directories, report and state
//! locations, and the sweep time budget. Loaded from `.ward/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// Repository-level ward configuration
///
/// Loaded from `.ward/config.toml` in the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardConfig {
    /// Directory names skipped entirely during a sweep, both as
    /// containers and as individual entries
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,

    /// Where sweep error reports are written, relative to the root
    #[serde(default = "default_error_log_dir")]
    pub error_log_dir: PathBuf,

    /// Where persisted state files live, relative to the root
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Time budget for one full-tree sweep, in seconds
    #[serde(default = "default_sweep_budget_secs")]
    pub sweep_budget_secs: u64,
}

fn default_skip_dirs() -> Vec<String> {
    vec![
        ".git".to_string(),
        ".jj".to_string(),
        ".hg".to_string(),
        ".svn".to_string(),
        "__pycache__".to_string(),
        "target".to_string(),
        "node_modules".to_string(),
        ".venv".to_string(),
        "venv".to_string(),
    ]
}

fn default_error_log_dir() -> PathBuf {
    PathBuf::from("logs/errors/active")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".ward/state")
}

fn default_sweep_budget_secs() -> u64 {
    60
}

impl WardConfig {
    /// Load configuration from `.ward/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(".ward/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content).map_err(|e| {
                crate::WardError::Configuration(format!("Failed to parse config file: {}", e))
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `.ward/config.toml`
    pub fn write_default(root: &Path) -> Result<()> {
        let config_dir = root.join(".ward");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let config = Self::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| crate::WardError::Other(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

impl Default for WardConfig {
    fn default() -> Self {
        Self {
            skip_dirs: default_skip_dirs(),
            error_log_dir: default_error_log_dir(),
            state_dir: default_state_dir(),
            sweep_budget_secs: default_sweep_budget_secs(),
        }
    }
}

//! # Application Configuration
//!
//! Settings are resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A YAML file, given explicitly or through `SPLITBILL_CONFIG`
//! 3. `SPLITBILL_DATA_DIR` and `SPLITBILL_CURRENCY_SYMBOL`
//!
//! ## YAML Format
//!
//! ```yaml
//! data_directory: "./splitbill-data"
//! currency:
//!   symbol: "Rp"
//!   thousands_separator: "."
//! log_filter: "info"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::money::CurrencyFormat;

pub const CONFIG_PATH_VAR: &str = "SPLITBILL_CONFIG";
pub const DATA_DIR_VAR: &str = "SPLITBILL_DATA_DIR";
pub const CURRENCY_SYMBOL_VAR: &str = "SPLITBILL_CURRENCY_SYMBOL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the JSON collections
    pub data_directory: PathBuf,
    pub currency: CurrencyFormat,
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from("./splitbill-data"),
            currency: CurrencyFormat::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Parse a YAML file; missing keys keep their defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            self.data_directory = PathBuf::from(dir);
        }
        if let Some(symbol) = lookup(CURRENCY_SYMBOL_VAR).filter(|v| !v.trim().is_empty()) {
            self.currency.symbol = symbol;
        }
    }

    /// The file to read: `path` if given, else `SPLITBILL_CONFIG`
    pub fn resolve_path(path: Option<&Path>) -> Option<PathBuf> {
        path.map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from))
    }

    /// Resolve the full configuration from the file (if any) and the environment.
    ///
    /// Runs before logging is set up, so it logs nothing itself.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_path(path) {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }
}

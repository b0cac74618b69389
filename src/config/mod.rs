//! Run configuration
//!
//! Defaults, optionally replaced field by field from a JSON settings file,
//! then by command line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Standard-Pfade relativ zum Arbeitsverzeichnis
const DEFAULT_SYMBOLS_PATH: &str = "public/data/symbols.json";
const DEFAULT_PRICES_PATH: &str = "public/data/prices.json";

/// Pause nach jeder Anfrage (Yahoo drosselt aggressive Clients)
const DEFAULT_REQUEST_DELAY_SECS: u64 = 20;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Symbol list to read (`{ "stocks": [...] }`)
    pub symbols_path: PathBuf,
    /// Snapshot file to overwrite
    pub prices_path: PathBuf,
    /// Wait after each provider request, 0 disables
    pub request_delay_secs: u64,
    pub request_timeout_secs: u64,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbols_path: PathBuf::from(DEFAULT_SYMBOLS_PATH),
            prices_path: PathBuf::from(DEFAULT_PRICES_PATH),
            request_delay_secs: DEFAULT_REQUEST_DELAY_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_level: "info".to_string(),
        }
    }
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub symbols_path: Option<PathBuf>,
    pub prices_path: Option<PathBuf>,
    pub request_delay_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl Settings {
    /// Load settings from a JSON file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    /// Defaults, or the given settings file if any
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(p) = overrides.symbols_path {
            self.symbols_path = p;
        }
        if let Some(p) = overrides.prices_path {
            self.prices_path = p;
        }
        if let Some(secs) = overrides.request_delay_secs {
            self.request_delay_secs = secs;
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        self
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

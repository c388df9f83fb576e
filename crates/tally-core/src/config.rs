//! Engine configuration
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tally/config/engine.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their default values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/engine.toml");

/// Thresholds for the insight rule cascade and rolling averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub anomaly_multiplier: f64,
    pub rolling_window_months: u32,
    pub streak_min_months: u32,
    pub merchant_min_months: usize,
    pub merchant_min_total: f64,
    pub almost_at_limit_pct: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            anomaly_multiplier: 1.5,
            rolling_window_months: 3,
            streak_min_months: 3,
            merchant_min_months: 3,
            merchant_min_total: 500.0,
            almost_at_limit_pct: 90.0,
        }
    }
}

/// Engine-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Imported transactions dated before this are hidden and pruned
    pub import_cutoff: NaiveDate,
    /// Timeout for each bank-feed HTTP request
    pub request_timeout_secs: u64,
    /// Seed newly discovered feed accounts with the provider balance instead of 0
    pub seed_new_account_balance: bool,
    pub insights: InsightConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            import_cutoff: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid constant date"),
            request_timeout_secs: 30,
            seed_new_account_balance: false,
            insights: InsightConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load config with override resolution
    pub fn load() -> Result<Self> {
        match Self::override_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No engine config override, using embedded defaults");
                Self::embedded()
            }
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), "Loaded engine config override");
        Ok(config)
    }

    /// Parse the defaults compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let i = &self.insights;
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be > 0".into()));
        }
        if !i.anomaly_multiplier.is_finite() || i.anomaly_multiplier <= 0.0 {
            return Err(Error::Config("anomaly_multiplier must be > 0".into()));
        }
        if i.rolling_window_months == 0 {
            return Err(Error::Config("rolling_window_months must be >= 1".into()));
        }
        if !(0.0..100.0).contains(&i.almost_at_limit_pct) {
            return Err(Error::Config(
                "almost_at_limit_pct must be in [0, 100)".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Path of the user override file, if a data dir exists on this platform
    pub fn override_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("tally").join("config").join("engine.toml"))
    }
}

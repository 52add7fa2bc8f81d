//! Store configuration.
//!
//! Read from `.cadence/config.yaml`. Every field is optional; a missing file
//! yields the defaults.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration file name within the .cadence directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule: ScheduleConfig,
    pub storage: StorageConfig,
    pub daemon: DaemonSettings,
}

/// Knobs for the critical-path calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Working hours in one day, used to turn effort estimates into days
    pub hours_per_day: f64,

    /// Add each edge's lag to the finish-to-start bound
    pub apply_lag: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hours_per_day: 8.0,
            apply_lag: false,
        }
    }
}

/// SQLite settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { busy_timeout_ms: 5000 }
    }
}

impl StorageConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Daemon settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// How often the daemon loop wakes to check for shutdown.
    #[serde(alias = "flush_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self { poll_interval_ms: 100 }
    }
}

impl Config {
    /// Load configuration from a file, falling back to defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        if !config.schedule.hours_per_day.is_finite() || config.schedule.hours_per_day <= 0.0 {
            eyre::bail!(
                "Invalid config {}: schedule.hours_per_day must be positive",
                path.display()
            );
        }

        Ok(config)
    }

    /// Write the configuration as YAML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, yaml).with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}

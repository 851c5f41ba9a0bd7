//! Configuration file support for inktrack.
//!
//! This module handles loading and validating tunables from the
//! configuration file located at `~/.config/inktrack/config.toml`:
//! tick-to-seconds mapping, guideline snapping window, and assistant
//! handle appearance.
//!
//! If no config file exists, sensible defaults are used automatically.

pub mod types;

// Re-export commonly used types at module level
pub use types::{AssistantConfig, SnapConfig, TimingConfig};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure containing all tunables.
///
/// This is the root type deserialized from the TOML file. All fields have
/// sensible defaults and use those if not specified in the config file.
///
/// # Example TOML
/// ```toml
/// [timing]
/// tick_seconds = 0.001
///
/// [snap]
/// snap_length = 20.0
/// snap_scale = 1.0
///
/// [assistant]
/// point_radius = 10.0
/// ```
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Host tick timing
    #[serde(default)]
    pub timing: TimingConfig,

    /// Guideline snapping window
    #[serde(default)]
    pub snap: SnapConfig,

    /// Assistant handle appearance
    #[serde(default)]
    pub assistant: AssistantConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Invalid values are clamped to the nearest valid value and a warning
    /// is logged.
    fn validate_and_clamp(&mut self) {
        if !(1e-6..=1.0).contains(&self.timing.tick_seconds) {
            log::warn!(
                "Invalid tick_seconds {:e}, clamping to 1e-6-1.0 range",
                self.timing.tick_seconds
            );
            self.timing.tick_seconds = self.timing.tick_seconds.clamp(1e-6, 1.0);
        }

        if !(1.0..=200.0).contains(&self.snap.snap_length) {
            log::warn!(
                "Invalid snap_length {:.1}, clamping to 1.0-200.0 range",
                self.snap.snap_length
            );
            self.snap.snap_length = self.snap.snap_length.clamp(1.0, 200.0);
        }

        if !(0.1..=10.0).contains(&self.snap.snap_scale) {
            log::warn!(
                "Invalid snap_scale {:.2}, clamping to 0.1-10.0 range",
                self.snap.snap_scale
            );
            self.snap.snap_scale = self.snap.snap_scale.clamp(0.1, 10.0);
        }

        if !(2.0..=50.0).contains(&self.assistant.point_radius) {
            log::warn!(
                "Invalid point_radius {:.1}, clamping to 2.0-50.0 range",
                self.assistant.point_radius
            );
            self.assistant.point_radius = self.assistant.point_radius.clamp(2.0, 50.0);
        }
    }

    /// Returns the path to the configuration file.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined
    /// (e.g. HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("inktrack");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from file, or returns defaults if not found.
    ///
    /// All loaded values are validated and clamped to acceptable ranges.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The config directory path cannot be determined
    /// - The file exists but cannot be read
    /// - The file exists but contains invalid TOML syntax
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let config = Self::from_toml(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        info!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Parses configuration from a TOML string, clamping invalid values.
    pub fn from_toml(s: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(s)?;
        config.validate_and_clamp();
        debug!("Config: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_snapping_constants() {
        let config = Config::default();
        assert_eq!(config.snap.snap_length, 20.0);
        assert_eq!(config.snap.snap_scale, 1.0);
        assert_eq!(config.snap.max_length(), 40.0);
        assert_eq!(config.timing.tick_seconds, 0.001);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = Config::from_toml("[timing]\ntick_seconds = 0.01\n").unwrap();
        assert_eq!(config.timing.tick_seconds, 0.01);
        assert_eq!(config.snap.snap_length, 20.0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = Config::from_toml(
            "[timing]\ntick_seconds = 5.0\n[snap]\nsnap_length = 0.0\nsnap_scale = 99.0\n[assistant]\npoint_radius = 1000.0\n",
        )
        .unwrap();
        assert_eq!(config.timing.tick_seconds, 1.0);
        assert_eq!(config.snap.snap_length, 1.0);
        assert_eq!(config.snap.snap_scale, 10.0);
        assert_eq!(config.assistant.point_radius, 50.0);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(Config::from_toml("not toml at all [").is_err());
    }
}

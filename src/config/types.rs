//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Timing settings.
///
/// The host delivers event timestamps as integer ticks; this section maps
/// ticks to seconds for track timelines and history lookups.
#[derive(Debug, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Seconds per host tick (valid range: 1e-6 - 1.0).
    /// The default of 0.001 matches hosts that report milliseconds.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
        }
    }
}

/// Guideline snapping settings.
///
/// Controls the arc-length window used when scoring a live stroke against
/// candidate guidelines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SnapConfig {
    /// Reference arc length in screen units where scoring weight peaks
    /// (valid range: 1.0 - 200.0).
    #[serde(default = "default_snap_length")]
    pub snap_length: f64,

    /// Width of the scoring window relative to `snap_length`
    /// (valid range: 0.1 - 10.0).
    #[serde(default = "default_snap_scale")]
    pub snap_scale: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            snap_length: default_snap_length(),
            snap_scale: default_snap_scale(),
        }
    }
}

impl SnapConfig {
    /// Screen-space arc length at which a stroke becomes "long enough"
    /// for a snap commit decision.
    pub fn max_length(&self) -> f64 {
        2.0 * self.snap_length * self.snap_scale
    }
}

/// Assistant appearance settings.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// On-screen radius of assistant control handles in pixels
    /// (valid range: 2.0 - 50.0).
    #[serde(default = "default_point_radius")]
    pub point_radius: f64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            point_radius: default_point_radius(),
        }
    }
}

fn default_tick_seconds() -> f64 {
    0.001
}

fn default_snap_length() -> f64 {
    20.0
}

fn default_snap_scale() -> f64 {
    1.0
}

fn default_point_radius() -> f64 {
    10.0
}

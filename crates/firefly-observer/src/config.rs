//! Observer subsystem settings.
//!
//! Each subsystem has its own section under `observers:` in the simulation
//! configuration. Every field has a serde default, so an empty section
//! yields the documented defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Statistics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Whether the subsystem is constructed (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether its overlay is attached to the mount surface (default: true).
    #[serde(default = "default_true")]
    pub visible: bool,

    /// Simulated milliseconds between snapshots (default: 500).
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: f64,

    /// Population samples kept for the history graph (default: 60).
    #[serde(default = "default_history_length")]
    pub history_length: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            visible: true,
            update_interval_ms: default_update_interval_ms(),
            history_length: default_history_length(),
        }
    }
}

/// Event log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogConfig {
    /// Whether the subsystem is constructed (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether its overlay is attached (default: true).
    #[serde(default = "default_true")]
    pub visible: bool,

    /// Entries kept; the oldest are dropped (default: 100).
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Group consecutive identical messages (default: true).
    #[serde(default = "default_true")]
    pub group_similar: bool,

    /// Window within which identical messages are grouped (default: 1000).
    #[serde(default = "default_group_window_ms")]
    pub group_window_ms: f64,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            visible: true,
            max_entries: default_max_entries(),
            group_similar: true,
            group_window_ms: default_group_window_ms(),
        }
    }
}

/// Achievement settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementsConfig {
    /// Whether the subsystem is constructed (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether its overlay is attached (default: true).
    #[serde(default = "default_true")]
    pub visible: bool,

    /// Persist unlocks through the store (default: true).
    #[serde(default = "default_true")]
    pub persist: bool,

    /// File backing the store; in-memory when absent.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Default for AchievementsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            visible: true,
            persist: true,
            store_path: None,
        }
    }
}

/// Audio cue settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Whether cues are produced at all (default: false).
    #[serde(default)]
    pub enabled: bool,

    /// Master volume (default: 0.5).
    #[serde(default = "default_master_volume")]
    pub master_volume: f64,

    /// Ambient layer volume (default: 0.3).
    #[serde(default = "default_ambient_volume")]
    pub ambient_volume: f64,

    /// Event cue volume (default: 0.6).
    #[serde(default = "default_event_volume")]
    pub event_volume: f64,

    /// Random pitch spread, as a fraction (default: 0.1).
    #[serde(default = "default_pitch_variation")]
    pub pitch_variation: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            master_volume: default_master_volume(),
            ambient_volume: default_ambient_volume(),
            event_volume: default_event_volume(),
            pitch_variation: default_pitch_variation(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_update_interval_ms() -> f64 {
    500.0
}

const fn default_history_length() -> usize {
    60
}

const fn default_max_entries() -> usize {
    100
}

const fn default_group_window_ms() -> f64 {
    1000.0
}

const fn default_master_volume() -> f64 {
    0.5
}

const fn default_ambient_volume() -> f64 {
    0.3
}

const fn default_event_volume() -> f64 {
    0.6
}

const fn default_pitch_variation() -> f64 {
    0.1
}

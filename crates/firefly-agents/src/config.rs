//! Tunables for population bounds, lifecycle timing, and collisions.
//!
//! These structs deserialize directly from the `population`, `lifecycle`
//! and `collision` sections of `firefly-config.yaml`. Every field has a
//! serde default so partial sections are accepted.

use serde::Deserialize;

use crate::error::AgentError;

/// Population floor, ceiling, and initial seed count.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PopulationConfig {
    /// Entities spawned when the engine starts (default: 20).
    #[serde(default = "default_initial")]
    pub initial: usize,

    /// Floor maintained by `enforce_bounds` (default: 10).
    #[serde(default = "default_min")]
    pub min: usize,

    /// Spawn gate (default: 50).
    #[serde(default = "default_max")]
    pub max: usize,
}

const fn default_initial() -> usize {
    20
}
const fn default_min() -> usize {
    10
}
const fn default_max() -> usize {
    50
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial: default_initial(),
            min: default_min(),
            max: default_max(),
        }
    }
}

impl PopulationConfig {
    /// Check that `min <= initial <= max` and `max >= 1`.
    pub fn check(&self) -> Result<(), AgentError> {
        if self.max == 0 {
            return Err(AgentError::InvalidBounds {
                reason: "max must be at least 1".to_owned(),
            });
        }
        if self.min > self.max {
            return Err(AgentError::InvalidBounds {
                reason: format!("min {} exceeds max {}", self.min, self.max),
            });
        }
        if self.initial > self.max {
            return Err(AgentError::InvalidBounds {
                reason: format!("initial {} exceeds max {}", self.initial, self.max),
            });
        }
        Ok(())
    }
}

/// Lifecycle timing and vitality parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LifecycleConfig {
    /// Time spent in `birth` before maturing (default: 3500 ms).
    #[serde(default = "default_birth_window")]
    pub birth_window_ms: f64,

    /// Time spent in `dying` before removal (default: 1000 ms).
    #[serde(default = "default_dying_window")]
    pub dying_window_ms: f64,

    /// Lower bound of the random base max-age (default: 120 000 ms).
    #[serde(default = "default_min_base_age")]
    pub min_base_age_ms: f64,

    /// Upper bound of the random base max-age (default: 240 000 ms).
    #[serde(default = "default_max_base_age")]
    pub max_base_age_ms: f64,

    /// Energy lost per 16 ms of mature life at tier 0 (default: 0.006).
    #[serde(default = "default_energy_decay")]
    pub energy_decay: f64,
}

const fn default_birth_window() -> f64 {
    3_500.0
}
const fn default_dying_window() -> f64 {
    1_000.0
}
const fn default_min_base_age() -> f64 {
    120_000.0
}
const fn default_max_base_age() -> f64 {
    240_000.0
}
const fn default_energy_decay() -> f64 {
    0.006
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            birth_window_ms: default_birth_window(),
            dying_window_ms: default_dying_window(),
            min_base_age_ms: default_min_base_age(),
            max_base_age_ms: default_max_base_age(),
            energy_decay: default_energy_decay(),
        }
    }
}

/// Collision detection and outcome parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollisionConfig {
    /// Whether collisions are resolved at all (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Distance below which two mature entities collide (default: 25).
    #[serde(default = "default_radius")]
    pub radius: f64,

    /// Per-entity cooldown after a collision (default: 2000 ms).
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: f64,

    /// Energy each participant gains from a mixed-digit merge (default: 35).
    #[serde(default = "default_merge_energy")]
    pub merge_energy: f64,
}

const fn default_true() -> bool {
    true
}
const fn default_radius() -> f64 {
    25.0
}
const fn default_cooldown() -> f64 {
    2_000.0
}
const fn default_merge_energy() -> f64 {
    35.0
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            radius: default_radius(),
            cooldown_ms: default_cooldown(),
            merge_energy: default_merge_energy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_are_consistent() {
        assert!(PopulationConfig::default().check().is_ok());
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let config = PopulationConfig {
            initial: 5,
            min: 20,
            max: 10,
        };
        assert!(matches!(
            config.check(),
            Err(AgentError::InvalidBounds { .. })
        ));
    }
}

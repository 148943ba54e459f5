//! Configuration loading and validation for the Firefly simulation.
//!
//! The canonical configuration lives in `firefly-config.yaml` at the project
//! root. Every section mirrors a crate's own config structs, and every field
//! has a serde default, so a partial or empty file is accepted.
//!
//! Parsing never rejects out-of-range values. [`SimulationConfig::validate`]
//! clamps them into range instead and reports each change as a
//! [`ConfigAdjustment`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use firefly_agents::{CollisionConfig, LifecycleConfig, PopulationConfig};
use firefly_observer::{AchievementsConfig, AudioConfig, EventLogConfig, StatisticsConfig};
use firefly_types::{BehaviorKind, Viewport};
use firefly_world::{CosmicConfig, ResourcesConfig};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// One value changed by [`SimulationConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAdjustment {
    /// Dotted path of the field.
    pub field: String,
    /// Value as configured.
    pub original: String,
    /// Value after clamping.
    pub adjusted: String,
}

impl fmt::Display for ConfigAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.field, self.original, self.adjusted)
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `firefly-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Seed, viewport and frame timing.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Population floor, ceiling and seed count.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Lifecycle timing and energy decay.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Collision radius, cooldown and merge energy.
    #[serde(default)]
    pub collision: CollisionConfig,

    /// Per-module enabled flags and tunables.
    #[serde(default)]
    pub behaviors: BehaviorsConfig,

    /// Resource and hazard spawn rules.
    #[serde(default)]
    pub resources: ResourcesSection,

    /// Cosmic event scheduling.
    #[serde(default)]
    pub cosmic_events: CosmicConfig,

    /// Player tool charges.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Statistics, event log and achievements.
    #[serde(default)]
    pub observers: ObserversConfig,

    /// Audio cues.
    #[serde(default)]
    pub audio: AudioConfig,

    /// Log level and output format.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Run boundaries.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// The simulation area.
    pub const fn viewport(&self) -> Viewport {
        Viewport {
            width: self.engine.width,
            height: self.engine.height,
        }
    }

    /// Clamp every out-of-range value and return what changed. Each change
    /// is logged at warn.
    pub fn validate(&mut self) -> Vec<ConfigAdjustment> {
        let mut out = Vec::new();

        // Engine
        bounded_f64("engine.width", &mut self.engine.width, 1.0, MAX_VIEWPORT_PX, &mut out);
        bounded_f64("engine.height", &mut self.engine.height, 1.0, MAX_VIEWPORT_PX, &mut out);
        if self.engine.frame_interval_ms == 0 {
            record(&mut out, "engine.frame_interval_ms", 0, 1);
            self.engine.frame_interval_ms = 1;
        }
        bounded_f64(
            "engine.default_frame_dt_ms",
            &mut self.engine.default_frame_dt_ms,
            1.0,
            MAX_FRAME_DT_MS,
            &mut out,
        );
        let floor = self.engine.default_frame_dt_ms;
        bounded_f64("engine.max_frame_dt_ms", &mut self.engine.max_frame_dt_ms, floor, MAX_FRAME_DT_MS, &mut out);

        // Population
        let population = &mut self.population;
        if population.max == 0 {
            record(&mut out, "population.max", 0, 1);
            population.max = 1;
        }
        if population.min > population.max {
            record(&mut out, "population.min", population.min, population.max);
            population.min = population.max;
        }
        let initial = population.initial.clamp(population.min, population.max);
        if initial != population.initial {
            record(&mut out, "population.initial", population.initial, initial);
            population.initial = initial;
        }

        // Lifecycle
        let lifecycle = &mut self.lifecycle;
        bounded_f64("lifecycle.birth_window_ms", &mut lifecycle.birth_window_ms, 0.0, MAX_WINDOW_MS, &mut out);
        bounded_f64("lifecycle.dying_window_ms", &mut lifecycle.dying_window_ms, 0.0, MAX_WINDOW_MS, &mut out);
        bounded_f64("lifecycle.min_base_age_ms", &mut lifecycle.min_base_age_ms, 1.0, MAX_AGE_MS, &mut out);
        let min_age = lifecycle.min_base_age_ms;
        bounded_f64("lifecycle.max_base_age_ms", &mut lifecycle.max_base_age_ms, min_age, MAX_AGE_MS, &mut out);
        bounded_f64("lifecycle.energy_decay", &mut lifecycle.energy_decay, 0.0, MAX_ENERGY_DECAY, &mut out);

        // Collisions
        bounded_f64("collision.radius", &mut self.collision.radius, 0.0, MAX_COLLISION_RADIUS, &mut out);
        bounded_f64("collision.cooldown_ms", &mut self.collision.cooldown_ms, 0.0, MAX_WINDOW_MS, &mut out);
        bounded_f64("collision.merge_energy", &mut self.collision.merge_energy, 0.0, 100.0, &mut out);

        // Behaviors
        probability("behaviors.rare_spawn_chance", &mut self.behaviors.rare_spawn_chance, &mut out);
        probability("behaviors.reproduction_chance", &mut self.behaviors.reproduction_chance, &mut out);

        // Resources
        let kinds = &mut self.resources.kinds;
        probability("resources.energy_wells.spawn_chance", &mut kinds.energy_wells.spawn_chance, &mut out);
        probability("resources.predator_stars.spawn_chance", &mut kinds.predator_stars.spawn_chance, &mut out);
        probability("resources.portals.spawn_chance", &mut kinds.portals.spawn_chance, &mut out);
        probability("resources.sanctuaries.spawn_chance", &mut kinds.sanctuaries.spawn_chance, &mut out);
        probability("resources.black_holes.spawn_chance", &mut kinds.black_holes.spawn_chance, &mut out);
        probability(
            "resources.shadow_fireflies.spawn_chance",
            &mut kinds.shadow_fireflies.spawn_chance,
            &mut out,
        );
        probability("resources.void_serpents.spawn_chance", &mut kinds.void_serpents.spawn_chance, &mut out);
        probability("resources.parasites.spawn_chance", &mut kinds.parasites.spawn_chance, &mut out);
        for (field, age) in [
            ("resources.black_holes.min_ecosystem_age_ms", &mut kinds.black_holes.min_ecosystem_age_ms),
            (
                "resources.shadow_fireflies.min_ecosystem_age_ms",
                &mut kinds.shadow_fireflies.min_ecosystem_age_ms,
            ),
            ("resources.void_serpents.min_ecosystem_age_ms", &mut kinds.void_serpents.min_ecosystem_age_ms),
            ("resources.parasites.min_ecosystem_age_ms", &mut kinds.parasites.min_ecosystem_age_ms),
        ] {
            bounded_f64(field, age, 0.0, MAX_AGE_MS, &mut out);
        }
        bounded_f64(
            "resources.void_serpents.spawn_cooldown_ms",
            &mut kinds.void_serpents.spawn_cooldown_ms,
            0.0,
            MAX_WINDOW_MS,
            &mut out,
        );

        // Cosmic events
        let cosmic = &mut self.cosmic_events;
        bounded_f64(
            "cosmic_events.event_check_interval_ms",
            &mut cosmic.event_check_interval_ms,
            MIN_EVENT_CHECK_INTERVAL_MS,
            MAX_WINDOW_MS,
            &mut out,
        );
        probability("cosmic_events.base_event_chance", &mut cosmic.base_event_chance, &mut out);

        // Observers
        let stats = &mut self.observers.statistics;
        bounded_f64(
            "observers.statistics.update_interval_ms",
            &mut stats.update_interval_ms,
            16.0,
            MAX_WINDOW_MS,
            &mut out,
        );
        if stats.history_length == 0 {
            record(&mut out, "observers.statistics.history_length", 0, 1);
            stats.history_length = 1;
        }
        let log = &mut self.observers.event_log;
        if log.max_entries == 0 {
            record(&mut out, "observers.event_log.max_entries", 0, 1);
            log.max_entries = 1;
        }
        bounded_f64("observers.event_log.group_window_ms", &mut log.group_window_ms, 0.0, MAX_WINDOW_MS, &mut out);

        // Audio
        let audio = &mut self.audio;
        probability("audio.master_volume", &mut audio.master_volume, &mut out);
        probability("audio.ambient_volume", &mut audio.ambient_volume, &mut out);
        probability("audio.event_volume", &mut audio.event_volume, &mut out);
        probability("audio.pitch_variation", &mut audio.pitch_variation, &mut out);

        for adjustment in &out {
            warn!(
                field = %adjustment.field,
                original = %adjustment.original,
                adjusted = %adjustment.adjusted,
                "Configuration value clamped"
            );
        }
        out
    }
}

const MIN_EVENT_CHECK_INTERVAL_MS: f64 = 100.0;
const MAX_VIEWPORT_PX: f64 = 100_000.0;
const MAX_FRAME_DT_MS: f64 = 10_000.0;
const MAX_WINDOW_MS: f64 = 3_600_000.0;
const MAX_AGE_MS: f64 = 86_400_000.0;
const MAX_ENERGY_DECAY: f64 = 100.0;
const MAX_COLLISION_RADIUS: f64 = 10_000.0;

fn record(out: &mut Vec<ConfigAdjustment>, field: &str, original: impl fmt::Display, adjusted: impl fmt::Display) {
    out.push(ConfigAdjustment {
        field: field.to_owned(),
        original: original.to_string(),
        adjusted: adjusted.to_string(),
    });
}

/// Clamp into `[0, 1]`; NaN becomes 0.
fn probability(field: &str, value: &mut f64, out: &mut Vec<ConfigAdjustment>) {
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    if clamped.to_bits() != value.to_bits() {
        record(out, field, *value, clamped);
        *value = clamped;
    }
}

/// Clamp into `[min, max]`; NaN becomes `min`, infinities clamp to the
/// nearer bound.
fn bounded_f64(field: &str, value: &mut f64, min: f64, max: f64, out: &mut Vec<ConfigAdjustment>) {
    let clamped = if value.is_nan() { min } else { value.clamp(min, max) };
    if clamped.to_bits() != value.to_bits() {
        record(out, field, *value, clamped);
        *value = clamped;
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Seed, viewport and frame timing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Random seed for reproducibility (default: 42).
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Simulation area width in pixels (default: 1280).
    #[serde(default = "default_width")]
    pub width: f64,

    /// Simulation area height in pixels (default: 720).
    #[serde(default = "default_height")]
    pub height: f64,

    /// Real-time milliseconds between frames in the runner (default: 16).
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Delta used when there is no previous frame timestamp (default: 16).
    #[serde(default = "default_frame_dt_ms")]
    pub default_frame_dt_ms: f64,

    /// Upper bound on a single frame's delta (default: 250).
    #[serde(default = "default_max_frame_dt_ms")]
    pub max_frame_dt_ms: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            width: default_width(),
            height: default_height(),
            frame_interval_ms: default_frame_interval_ms(),
            default_frame_dt_ms: default_frame_dt_ms(),
            max_frame_dt_ms: default_max_frame_dt_ms(),
        }
    }
}

/// Per-module enabled flags. Keys that name no known module are kept in
/// `unknown` and reported by the plugin table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BehaviorsConfig {
    /// Chasing and fleeing (default: true).
    #[serde(default = "default_true")]
    pub hunting: bool,

    /// Flocking (default: true).
    #[serde(default = "default_true")]
    pub swarming: bool,

    /// Constellation shapes (default: true).
    #[serde(default = "default_true")]
    pub pattern_formation: bool,

    /// Offspring (default: true).
    #[serde(default = "default_true")]
    pub reproduction: bool,

    /// House personalities (default: true).
    #[serde(default = "default_true")]
    pub personality: bool,

    /// Rare variants (default: true).
    #[serde(default = "default_true")]
    pub rare_variants: bool,

    /// Pointer attraction and repulsion (default: true).
    #[serde(default = "default_true")]
    pub pointer_interaction: bool,

    /// Day/night and wind (default: true).
    #[serde(default = "default_true")]
    pub environment: bool,

    /// Per-frame chance of a spontaneous rare spawn (default: 0.0001).
    #[serde(default = "default_rare_spawn_chance")]
    pub rare_spawn_chance: f64,

    /// Per-frame reproduction chance per eligible entity (default: 0.0002).
    #[serde(default = "default_reproduction_chance")]
    pub reproduction_chance: f64,

    /// Unrecognized keys.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_yml::Value>,
}

impl BehaviorsConfig {
    /// Whether the module is switched on.
    pub const fn is_enabled(&self, kind: BehaviorKind) -> bool {
        match kind {
            BehaviorKind::Hunting => self.hunting,
            BehaviorKind::Swarming => self.swarming,
            BehaviorKind::PatternFormation => self.pattern_formation,
            BehaviorKind::Reproduction => self.reproduction,
            BehaviorKind::Personality => self.personality,
            BehaviorKind::RareVariants => self.rare_variants,
            BehaviorKind::PointerInteraction => self.pointer_interaction,
            BehaviorKind::Environment => self.environment,
        }
    }
}

impl Default for BehaviorsConfig {
    fn default() -> Self {
        Self {
            hunting: true,
            swarming: true,
            pattern_formation: true,
            reproduction: true,
            personality: true,
            rare_variants: true,
            pointer_interaction: true,
            environment: true,
            rare_spawn_chance: default_rare_spawn_chance(),
            reproduction_chance: default_reproduction_chance(),
            unknown: BTreeMap::new(),
        }
    }
}

/// Resource spawn rules plus any unrecognized kinds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResourcesSection {
    /// Known kinds.
    #[serde(flatten)]
    pub kinds: ResourcesConfig,

    /// Unrecognized keys.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_yml::Value>,
}

/// Player tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolsConfig {
    /// Charges each tool starts with (default: 3).
    #[serde(default = "default_starting_charges")]
    pub starting_charges: u32,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            starting_charges: default_starting_charges(),
        }
    }
}

/// Observer subsystem sections.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ObserversConfig {
    /// Statistics.
    #[serde(default)]
    pub statistics: StatisticsConfig,

    /// Event log.
    #[serde(default)]
    pub event_log: EventLogConfig,

    /// Achievements.
    #[serde(default)]
    pub achievements: AchievementsConfig,

    /// Unrecognized keys.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_yml::Value>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (default: pretty).
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}

/// Run boundaries. Zero means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Stop after this many frames (default: 0).
    #[serde(default)]
    pub max_frames: u64,

    /// Stop after this many wall-clock seconds (default: 0).
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_seed() -> u64 {
    42
}

const fn default_width() -> f64 {
    1280.0
}

const fn default_height() -> f64 {
    720.0
}

const fn default_frame_interval_ms() -> u64 {
    16
}

const fn default_frame_dt_ms() -> f64 {
    16.0
}

const fn default_max_frame_dt_ms() -> f64 {
    250.0
}

const fn default_true() -> bool {
    true
}

const fn default_rare_spawn_chance() -> f64 {
    firefly_agents::behavior::rare::DEFAULT_SPAWN_CHANCE
}

const fn default_reproduction_chance() -> f64 {
    firefly_agents::behavior::reproduction::BASE_CHANCE
}

const fn default_starting_charges() -> u32 {
    firefly_world::tools::DEFAULT_STARTING_CHARGES
}

fn default_log_level() -> String {
    "info".to_owned()
}

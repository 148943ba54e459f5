//! Tunables for resource kinds and the cosmic event scheduler.
//!
//! These structs deserialize from the `resources` and `cosmic_events`
//! sections of `firefly-config.yaml`. Each resource kind section has the
//! same shape, `{enabled, max_count, spawn_chance, types}`, and is flattened
//! into a [`KindSettings`] for the resource manager. Hazard sections add
//! spawn gates: a minimum ecosystem age, a minimum population and a cooldown
//! between spawns.

use serde::Deserialize;

use firefly_types::{
    PredatorVariant, ResourceKind, ResourceVariant, SanctuaryVariant, WellVariant,
};

/// Runtime spawn rules for one resource kind.
#[derive(Debug, Clone, PartialEq)]
pub struct KindSettings {
    /// Whether the kind spawns at all.
    pub enabled: bool,
    /// Maximum concurrent resources (portal pairs count once).
    pub max_count: usize,
    /// Per-frame spawn chance while below `max_count`.
    pub spawn_chance: f64,
    /// Variants picked uniformly on spawn.
    pub variants: Vec<ResourceVariant>,
    /// Simulated time before the spawn roll is made at all.
    pub min_ecosystem_age_ms: f64,
    /// Live entities required for the spawn roll.
    pub min_population: usize,
    /// Time between two spawns of this kind; zero for none.
    pub spawn_cooldown_ms: f64,
}

impl KindSettings {
    /// Settings without spawn gates.
    pub const fn ungated(enabled: bool, max_count: usize, spawn_chance: f64, variants: Vec<ResourceVariant>) -> Self {
        Self {
            enabled,
            max_count,
            spawn_chance,
            variants,
            min_ecosystem_age_ms: 0.0,
            min_population: 0,
            spawn_cooldown_ms: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Energy wells
// ---------------------------------------------------------------------------

/// Energy well spawn rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WellsConfig {
    /// Spawn wells (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum concurrent wells (default: 3).
    #[serde(default = "default_wells_max")]
    pub max_count: usize,
    /// Per-frame spawn chance (default: 0.0005).
    #[serde(default = "default_wells_chance")]
    pub spawn_chance: f64,
    /// Variants to spawn (default: all).
    #[serde(default = "default_well_types")]
    pub types: Vec<WellVariant>,
}

const fn default_true() -> bool {
    true
}
const fn default_wells_max() -> usize {
    3
}
const fn default_wells_chance() -> f64 {
    0.0005
}
fn default_well_types() -> Vec<WellVariant> {
    vec![WellVariant::Standard, WellVariant::Volatile, WellVariant::Ancient]
}

impl Default for WellsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_count: default_wells_max(),
            spawn_chance: default_wells_chance(),
            types: default_well_types(),
        }
    }
}

// ---------------------------------------------------------------------------
// Predator stars
// ---------------------------------------------------------------------------

/// Predator star spawn rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredatorsConfig {
    /// Spawn predators (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum concurrent predators (default: 2).
    #[serde(default = "default_predators_max")]
    pub max_count: usize,
    /// Per-frame spawn chance (default: 0.0002).
    #[serde(default = "default_predators_chance")]
    pub spawn_chance: f64,
    /// Variants to spawn (default: HUNTER, LURKER, DRIFTER).
    #[serde(default = "default_predator_types")]
    pub types: Vec<PredatorVariant>,
}

const fn default_predators_max() -> usize {
    2
}
const fn default_predators_chance() -> f64 {
    0.0002
}
fn default_predator_types() -> Vec<PredatorVariant> {
    vec![
        PredatorVariant::Hunter,
        PredatorVariant::Lurker,
        PredatorVariant::Drifter,
    ]
}

impl Default for PredatorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_count: default_predators_max(),
            spawn_chance: default_predators_chance(),
            types: default_predator_types(),
        }
    }
}

// ---------------------------------------------------------------------------
// Portals
// ---------------------------------------------------------------------------

/// Portal spawn rules. Portals always spawn as linked pairs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PortalsConfig {
    /// Spawn portals (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum concurrent pairs (default: 3).
    #[serde(default = "default_portals_max")]
    pub max_count: usize,
    /// Per-frame spawn chance (default: 0, operator-spawned only).
    #[serde(default)]
    pub spawn_chance: f64,
}

const fn default_portals_max() -> usize {
    3
}

impl Default for PortalsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_count: default_portals_max(),
            spawn_chance: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Sanctuaries
// ---------------------------------------------------------------------------

/// Sanctuary spawn rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SanctuariesConfig {
    /// Spawn sanctuaries (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum concurrent sanctuaries (default: 5).
    #[serde(default = "default_sanctuaries_max")]
    pub max_count: usize,
    /// Per-frame spawn chance (default: 0, operator-spawned only).
    #[serde(default)]
    pub spawn_chance: f64,
    /// Variants to spawn (default: all).
    #[serde(default = "default_sanctuary_types")]
    pub types: Vec<SanctuaryVariant>,
}

const fn default_sanctuaries_max() -> usize {
    5
}
fn default_sanctuary_types() -> Vec<SanctuaryVariant> {
    vec![
        SanctuaryVariant::Standard,
        SanctuaryVariant::Ancient,
        SanctuaryVariant::Celestial,
        SanctuaryVariant::Permanent,
    ]
}

impl Default for SanctuariesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_count: default_sanctuaries_max(),
            spawn_chance: 0.0,
            types: default_sanctuary_types(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hazards
// ---------------------------------------------------------------------------

/// Black hole spawn rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlackHolesConfig {
    /// Spawn black holes (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum concurrent black holes (default: 1).
    #[serde(default = "default_one")]
    pub max_count: usize,
    /// Per-frame spawn chance (default: 0.0001).
    #[serde(default = "default_black_hole_chance")]
    pub spawn_chance: f64,
    /// Ecosystem age before the first roll (default: 30 000 ms).
    #[serde(default = "default_black_hole_age")]
    pub min_ecosystem_age_ms: f64,
}

const fn default_one() -> usize {
    1
}
const fn default_black_hole_chance() -> f64 {
    0.0001
}
const fn default_black_hole_age() -> f64 {
    30_000.0
}

impl Default for BlackHolesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_count: 1,
            spawn_chance: default_black_hole_chance(),
            min_ecosystem_age_ms: default_black_hole_age(),
        }
    }
}

/// Shadow firefly spawn rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShadowsConfig {
    /// Spawn shadow fireflies (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum concurrent shadows (default: 3).
    #[serde(default = "default_shadows_max")]
    pub max_count: usize,
    /// Per-frame spawn chance (default: 0.00005).
    #[serde(default = "default_shadows_chance")]
    pub spawn_chance: f64,
    /// Ecosystem age before the first roll (default: 60 000 ms).
    #[serde(default = "default_shadows_age")]
    pub min_ecosystem_age_ms: f64,
}

const fn default_shadows_max() -> usize {
    3
}
const fn default_shadows_chance() -> f64 {
    0.000_05
}
const fn default_shadows_age() -> f64 {
    60_000.0
}

impl Default for ShadowsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_count: default_shadows_max(),
            spawn_chance: default_shadows_chance(),
            min_ecosystem_age_ms: default_shadows_age(),
        }
    }
}

/// Void serpent spawn rules. A serpent appears as soon as its cooldown has
/// run out and the population is large enough.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SerpentsConfig {
    /// Spawn serpents (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum concurrent serpents (default: 1).
    #[serde(default = "default_one")]
    pub max_count: usize,
    /// Chance per frame once the gates are open (default: 1).
    #[serde(default = "default_serpent_chance")]
    pub spawn_chance: f64,
    /// Ecosystem age before the first roll (default: 120 000 ms).
    #[serde(default = "default_serpent_age")]
    pub min_ecosystem_age_ms: f64,
    /// Live entities required (default: 20).
    #[serde(default = "default_serpent_population")]
    pub min_population: usize,
    /// Time between serpents (default: 180 000 ms). The first one waits half.
    #[serde(default = "default_serpent_cooldown")]
    pub spawn_cooldown_ms: f64,
}

const fn default_serpent_chance() -> f64 {
    1.0
}
const fn default_serpent_age() -> f64 {
    120_000.0
}
const fn default_serpent_population() -> usize {
    20
}
const fn default_serpent_cooldown() -> f64 {
    180_000.0
}

impl Default for SerpentsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_count: 1,
            spawn_chance: default_serpent_chance(),
            min_ecosystem_age_ms: default_serpent_age(),
            min_population: default_serpent_population(),
            spawn_cooldown_ms: default_serpent_cooldown(),
        }
    }
}

/// Parasite spawn rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParasitesConfig {
    /// Spawn parasites (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum concurrent parasites (default: 10).
    #[serde(default = "default_parasites_max")]
    pub max_count: usize,
    /// Per-frame spawn chance (default: 0.0001).
    #[serde(default = "default_parasites_chance")]
    pub spawn_chance: f64,
    /// Ecosystem age before the first roll (default: 45 000 ms).
    #[serde(default = "default_parasites_age")]
    pub min_ecosystem_age_ms: f64,
}

const fn default_parasites_max() -> usize {
    10
}
const fn default_parasites_chance() -> f64 {
    0.0001
}
const fn default_parasites_age() -> f64 {
    45_000.0
}

impl Default for ParasitesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_count: default_parasites_max(),
            spawn_chance: default_parasites_chance(),
            min_ecosystem_age_ms: default_parasites_age(),
        }
    }
}

// ---------------------------------------------------------------------------
// All resource kinds
// ---------------------------------------------------------------------------

/// Spawn rules for every resource kind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResourcesConfig {
    /// Energy wells.
    #[serde(default)]
    pub energy_wells: WellsConfig,
    /// Predator stars.
    #[serde(default)]
    pub predator_stars: PredatorsConfig,
    /// Portal pairs.
    #[serde(default)]
    pub portals: PortalsConfig,
    /// Sanctuaries.
    #[serde(default)]
    pub sanctuaries: SanctuariesConfig,
    /// Black holes.
    #[serde(default)]
    pub black_holes: BlackHolesConfig,
    /// Shadow fireflies.
    #[serde(default)]
    pub shadow_fireflies: ShadowsConfig,
    /// Void serpents.
    #[serde(default)]
    pub void_serpents: SerpentsConfig,
    /// Parasites.
    #[serde(default)]
    pub parasites: ParasitesConfig,
}

impl ResourcesConfig {
    /// Flatten one kind's section into runtime settings.
    pub fn settings(&self, kind: ResourceKind) -> KindSettings {
        match kind {
            ResourceKind::EnergyWell => KindSettings::ungated(
                self.energy_wells.enabled,
                self.energy_wells.max_count,
                self.energy_wells.spawn_chance,
                self.energy_wells
                    .types
                    .iter()
                    .map(|&v| ResourceVariant::Well(v))
                    .collect(),
            ),
            ResourceKind::PredatorStar => KindSettings::ungated(
                self.predator_stars.enabled,
                self.predator_stars.max_count,
                self.predator_stars.spawn_chance,
                self.predator_stars
                    .types
                    .iter()
                    .map(|&v| ResourceVariant::Predator(v))
                    .collect(),
            ),
            ResourceKind::Portal => KindSettings::ungated(
                self.portals.enabled,
                self.portals.max_count,
                self.portals.spawn_chance,
                vec![ResourceVariant::Portal],
            ),
            ResourceKind::Sanctuary => KindSettings::ungated(
                self.sanctuaries.enabled,
                self.sanctuaries.max_count,
                self.sanctuaries.spawn_chance,
                self.sanctuaries
                    .types
                    .iter()
                    .map(|&v| ResourceVariant::Sanctuary(v))
                    .collect(),
            ),
            ResourceKind::BlackHole => KindSettings {
                min_ecosystem_age_ms: self.black_holes.min_ecosystem_age_ms,
                ..KindSettings::ungated(
                    self.black_holes.enabled,
                    self.black_holes.max_count,
                    self.black_holes.spawn_chance,
                    vec![ResourceVariant::BlackHole],
                )
            },
            ResourceKind::ShadowFirefly => KindSettings {
                min_ecosystem_age_ms: self.shadow_fireflies.min_ecosystem_age_ms,
                ..KindSettings::ungated(
                    self.shadow_fireflies.enabled,
                    self.shadow_fireflies.max_count,
                    self.shadow_fireflies.spawn_chance,
                    vec![ResourceVariant::Shadow],
                )
            },
            ResourceKind::VoidSerpent => KindSettings {
                min_ecosystem_age_ms: self.void_serpents.min_ecosystem_age_ms,
                min_population: self.void_serpents.min_population,
                spawn_cooldown_ms: self.void_serpents.spawn_cooldown_ms,
                ..KindSettings::ungated(
                    self.void_serpents.enabled,
                    self.void_serpents.max_count,
                    self.void_serpents.spawn_chance,
                    vec![ResourceVariant::Serpent],
                )
            },
            ResourceKind::Parasite => KindSettings {
                min_ecosystem_age_ms: self.parasites.min_ecosystem_age_ms,
                ..KindSettings::ungated(
                    self.parasites.enabled,
                    self.parasites.max_count,
                    self.parasites.spawn_chance,
                    vec![ResourceVariant::Parasite],
                )
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Cosmic events
// ---------------------------------------------------------------------------

/// Cosmic event scheduler tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CosmicConfig {
    /// Run the scheduler (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time between scheduled rolls (default: 15 000 ms).
    #[serde(default = "default_check_interval")]
    pub event_check_interval_ms: f64,
    /// Chance that a scheduled roll starts an event (default: 0.06).
    #[serde(default = "default_event_chance")]
    pub base_event_chance: f64,
    /// Cap on simultaneously active events (default: 2).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_events: usize,
}

const fn default_check_interval() -> f64 {
    15_000.0
}
const fn default_event_chance() -> f64 {
    0.06
}
const fn default_max_concurrent() -> usize {
    2
}

impl Default for CosmicConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            event_check_interval_ms: default_check_interval(),
            base_event_chance: default_event_chance(),
            max_concurrent_events: default_max_concurrent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predator_defaults_exclude_nova() {
        let settings = ResourcesConfig::default().settings(ResourceKind::PredatorStar);
        assert_eq!(settings.max_count, 2);
        assert!(!settings
            .variants
            .contains(&ResourceVariant::Predator(PredatorVariant::Nova)));
        assert_eq!(settings.variants.len(), 3);
    }

    #[test]
    fn partial_section_keeps_defaults() {
        let json = r#"{"energy_wells": {"max_count": 7, "types": ["ANCIENT"]}}"#;
        let config: ResourcesConfig = serde_json::from_str(json).unwrap_or_default();
        assert_eq!(config.energy_wells.max_count, 7);
        assert!(config.energy_wells.enabled);
        assert_eq!(config.energy_wells.types, vec![WellVariant::Ancient]);
        assert_eq!(config.sanctuaries.max_count, 5);
    }

    #[test]
    fn portals_spawn_only_on_request_by_default() {
        let settings = ResourcesConfig::default().settings(ResourceKind::Portal);
        assert!(settings.spawn_chance.abs() < f64::EPSILON);
        assert_eq!(settings.variants, vec![ResourceVariant::Portal]);
    }

    #[test]
    fn hazards_carry_their_spawn_gates() {
        let config = ResourcesConfig::default();
        let serpent = config.settings(ResourceKind::VoidSerpent);
        assert_eq!(serpent.min_population, 20);
        assert!((serpent.spawn_cooldown_ms - 180_000.0).abs() < f64::EPSILON);
        assert!((serpent.min_ecosystem_age_ms - 120_000.0).abs() < f64::EPSILON);
        let parasites = config.settings(ResourceKind::Parasite);
        assert_eq!(parasites.max_count, 10);
        assert_eq!(parasites.variants, vec![ResourceVariant::Parasite]);
        let wells = config.settings(ResourceKind::EnergyWell);
        assert!(wells.min_ecosystem_age_ms.abs() < f64::EPSILON);
        assert_eq!(wells.min_population, 0);
    }
}

//! Milestone tracking.
//!
//! Achievements are unlocked once and stay unlocked. Progress and unlocks
//! persist through an [`AchievementStore`], an opaque key-value collaborator
//! the simulation reads and writes under [`STORAGE_KEY`] only. Newly
//! unlocked achievements queue up until the engine drains them with
//! [`Achievements::drain_unlocked`] and publishes them.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use firefly_events::{EventKind, SimEvent, Signal};
use firefly_types::{CosmicEventKind, RareVariant, ResourceVariant, Tier, ToolKind};

use crate::config::AchievementsConfig;
use crate::error::{ObserverError, StoreError};
use crate::observer::Observer;
use crate::statistics::EcosystemSnapshot;

/// Key the progress record is stored under.
pub const STORAGE_KEY: &str = "digitalLife_achievements";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Narrow key-value persistence interface.
pub trait AchievementStore: std::fmt::Debug {
    /// Read the value under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Empty store.
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl AchievementStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object in a file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        std::fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl AchievementStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.read_all()?;
        values.insert(key.to_owned(), value.to_owned());
        self.write_all(&values)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Grouping used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    /// Population milestones.
    Population,
    /// Tier milestones.
    Evolution,
    /// Rare variant sightings.
    Rare,
    /// Cosmic events witnessed.
    Cosmic,
    /// Lifespan and lineage.
    Survival,
    /// Operator interaction.
    Interaction,
    /// Emergent behavior.
    Special,
}

/// What must hold for an achievement to unlock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// Total births at least this many.
    Births(u64),
    /// Live population at least this many.
    Population(usize),
    /// At least this many evolutions into the tier.
    Evolved(Tier, u32),
    /// The rare variant was seen.
    Rare(RareVariant),
    /// Every rare variant was seen.
    AllRares,
    /// The cosmic event was witnessed.
    Witnessed(CosmicEventKind),
    /// Every cosmic event kind was witnessed.
    AllEvents,
    /// An entity reached this age.
    LongestLife(f64),
    /// A lineage reached this generation.
    Generation(u32),
    /// The tool was used at least this many times.
    ToolUsed(ToolKind, u32),
    /// A portal pair appeared.
    PortalCreated,
    /// A sanctuary appeared.
    SanctuaryCreated,
    /// A pattern formed.
    Constellation,
    /// A predator was driven off.
    PredatorRepelled,
}

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Achievement {
    /// Stable id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// What it takes.
    pub description: &'static str,
    /// Display group.
    pub category: AchievementCategory,
    /// Points awarded.
    pub points: u32,
    /// Unlock rule.
    pub condition: Condition,
}

macro_rules! achievement {
    ($id:literal, $name:literal, $desc:literal, $cat:ident, $points:literal, $cond:expr) => {
        Achievement {
            id: $id,
            name: $name,
            description: $desc,
            category: AchievementCategory::$cat,
            points: $points,
            condition: $cond,
        }
    };
}

/// Every achievement, in display order.
pub const CATALOG: &[Achievement] = &[
    achievement!("first_life", "Let There Be Light", "First firefly appears", Population, 10, Condition::Births(1)),
    achievement!("small_colony", "Small Colony", "25 fireflies alive at once", Population, 25, Condition::Population(25)),
    achievement!("thriving", "Thriving Ecosystem", "50 fireflies alive at once", Population, 50, Condition::Population(50)),
    achievement!("metropolis", "Digital Metropolis", "100 fireflies alive at once", Population, 100, Condition::Population(100)),
    achievement!("century", "Century of Lives", "100 fireflies born", Population, 50, Condition::Births(100)),
    achievement!("thousand_souls", "Thousand Souls", "1000 fireflies born", Population, 200, Condition::Births(1000)),
    achievement!("first_evolution", "Spark of Progress", "A firefly evolves to Charged", Evolution, 25, Condition::Evolved(Tier::Charged, 1)),
    achievement!("radiant_rise", "Radiant Rise", "A firefly reaches Radiant", Evolution, 50, Condition::Evolved(Tier::Radiant, 1)),
    achievement!("prismatic_power", "Prismatic Power", "A firefly reaches Prismatic", Evolution, 75, Condition::Evolved(Tier::Prismatic, 1)),
    achievement!("ascension", "Ascension", "A firefly reaches Ascended", Evolution, 150, Condition::Evolved(Tier::Ascended, 1)),
    achievement!("evolution_master", "Evolution Master", "10 fireflies reach Ascended", Evolution, 300, Condition::Evolved(Tier::Ascended, 10)),
    achievement!("golden_find", "Golden Discovery", "A Golden firefly appears", Rare, 100, Condition::Rare(RareVariant::Golden)),
    achievement!("diamond_find", "Diamond in the Rough", "A Diamond firefly appears", Rare, 100, Condition::Rare(RareVariant::Diamond)),
    achievement!("glitch_find", "System Anomaly", "A Glitch firefly appears", Rare, 100, Condition::Rare(RareVariant::Glitch)),
    achievement!("ancient_find", "Ancient Awakening", "An Ancient firefly appears", Rare, 100, Condition::Rare(RareVariant::Ancient)),
    achievement!("rare_collector", "Rare Collector", "Every rare variant seen", Rare, 500, Condition::AllRares),
    achievement!("solar_witness", "Solar Witness", "Experience a Solar Flare", Cosmic, 30, Condition::Witnessed(CosmicEventKind::SolarFlare)),
    achievement!("meteor_watcher", "Meteor Watcher", "Experience a Meteor Shower", Cosmic, 30, Condition::Witnessed(CosmicEventKind::MeteorShower)),
    achievement!("void_survivor", "Void Survivor", "Survive a Void Storm", Cosmic, 40, Condition::Witnessed(CosmicEventKind::VoidStorm)),
    achievement!("eclipse_viewer", "Eclipse Viewer", "Witness an Eclipse", Cosmic, 40, Condition::Witnessed(CosmicEventKind::Eclipse)),
    achievement!("nebula_drifter", "Nebula Drifter", "Experience a Nebula Drift", Cosmic, 30, Condition::Witnessed(CosmicEventKind::NebulaDrift)),
    achievement!("comet_chaser", "Comet Chaser", "Watch a comet pass", Cosmic, 50, Condition::Witnessed(CosmicEventKind::Comet)),
    achievement!("cosmic_veteran", "Cosmic Veteran", "Experience every cosmic event", Cosmic, 200, Condition::AllEvents),
    achievement!("elder", "Elder", "A firefly lives for 3 minutes", Survival, 50, Condition::LongestLife(180_000.0)),
    achievement!("ancient_one", "The Ancient One", "A firefly lives for 5 minutes", Survival, 100, Condition::LongestLife(300_000.0)),
    achievement!("dynasty", "Dynasty", "A lineage reaches 5 generations", Survival, 75, Condition::Generation(5)),
    achievement!("legacy", "Eternal Legacy", "A lineage reaches 10 generations", Survival, 150, Condition::Generation(10)),
    achievement!("first_blessing", "Divine Touch", "Use the Energy Blessing", Interaction, 15, Condition::ToolUsed(ToolKind::Blessing, 1)),
    achievement!("gravity_master", "Gravity Master", "Create 10 gravity zones", Interaction, 30, Condition::ToolUsed(ToolKind::Gravity, 10)),
    achievement!("protector", "Protector", "Deploy 5 shields", Interaction, 40, Condition::ToolUsed(ToolKind::Shield, 5)),
    achievement!("portal_maker", "Portal Maker", "A portal pair opens", Interaction, 25, Condition::PortalCreated),
    achievement!("sanctuary_builder", "Sanctuary Builder", "A sanctuary appears", Interaction, 25, Condition::SanctuaryCreated),
    achievement!("constellation_former", "Star Mapper", "Fireflies form a constellation", Special, 40, Condition::Constellation),
    achievement!("predator_repelled", "Swarm Defense", "A predator is repelled", Special, 35, Condition::PredatorRepelled),
];

/// Look up a catalog entry.
pub fn find(id: &str) -> Option<&'static Achievement> {
    CATALOG.iter().find(|a| a.id == id)
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Counters the unlock rules are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementStats {
    /// Births seen.
    pub total_births: u64,
    /// Deaths seen.
    pub total_deaths: u64,
    /// Population at the last snapshot.
    pub current_population: usize,
    /// Oldest age seen.
    pub longest_life_ms: f64,
    /// Highest generation seen.
    pub highest_generation: u32,
    /// Evolutions per target tier.
    pub evolutions: BTreeMap<Tier, u32>,
    /// Rare spawns per variant.
    pub rares: BTreeMap<RareVariant, u32>,
    /// Cosmic event starts per kind.
    pub events: BTreeMap<CosmicEventKind, u32>,
    /// Tool uses per tool.
    pub tools_used: BTreeMap<ToolKind, u32>,
    /// Portal pairs that appeared.
    pub portals_created: u32,
    /// Sanctuaries that appeared.
    pub sanctuaries_created: u32,
    /// Patterns formed.
    pub constellations_formed: u32,
    /// Predators driven off.
    pub predators_repelled: u32,
}

impl AchievementStats {
    /// Whether `condition` holds.
    pub fn satisfies(&self, condition: Condition) -> bool {
        match condition {
            Condition::Births(n) => self.total_births >= n,
            Condition::Population(n) => self.current_population >= n,
            Condition::Evolved(tier, n) => self.evolutions.get(&tier).copied().unwrap_or(0) >= n,
            Condition::Rare(variant) => self.rares.get(&variant).copied().unwrap_or(0) >= 1,
            Condition::AllRares => RareVariant::ALL
                .iter()
                .all(|v| self.rares.get(v).copied().unwrap_or(0) >= 1),
            Condition::Witnessed(kind) => self.events.get(&kind).copied().unwrap_or(0) >= 1,
            Condition::AllEvents => CosmicEventKind::ALL
                .iter()
                .all(|k| self.events.get(k).copied().unwrap_or(0) >= 1),
            Condition::LongestLife(ms) => self.longest_life_ms >= ms,
            Condition::Generation(n) => self.highest_generation >= n,
            Condition::ToolUsed(tool, n) => self.tools_used.get(&tool).copied().unwrap_or(0) >= n,
            Condition::PortalCreated => self.portals_created >= 1,
            Condition::SanctuaryCreated => self.sanctuaries_created >= 1,
            Condition::Constellation => self.constellations_formed >= 1,
            Condition::PredatorRepelled => self.predators_repelled >= 1,
        }
    }
}

/// The persisted record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedProgress {
    /// Unlocked ids.
    pub unlocked: BTreeSet<String>,
    /// Counters.
    pub stats: AchievementStats,
    /// Points earned.
    pub total_points: u32,
}

/// Summary of how far along the catalog is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Unlocked count.
    pub unlocked: usize,
    /// Catalog size.
    pub total: usize,
    /// Rounded percentage unlocked.
    pub percentage: u32,
    /// Points earned.
    pub points: u32,
    /// Points available.
    pub max_points: u32,
}

/// An unlock waiting to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unlocked {
    /// Catalog id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Points awarded.
    pub points: u32,
}

const SIGNALS: &[Signal] = &[
    Signal::Birth,
    Signal::Death,
    Signal::Evolution,
    Signal::RareSpawn,
    Signal::EventStart,
    Signal::ToolUse,
    Signal::ResourceSpawned,
    Signal::PatternFormed,
    Signal::PredatorRepelled,
];

/// Unlock tracker with optional persistence.
#[derive(Debug)]
pub struct Achievements {
    config: AchievementsConfig,
    progress: SavedProgress,
    pending: VecDeque<Unlocked>,
    store: Box<dyn AchievementStore>,
}

impl Achievements {
    /// Tracker backed by `store`. Saved progress is loaded when persistence
    /// is on; a corrupt or unreadable record is logged and ignored.
    pub fn new(config: AchievementsConfig, store: Box<dyn AchievementStore>) -> Self {
        let mut tracker = Self {
            config,
            progress: SavedProgress::default(),
            pending: VecDeque::new(),
            store,
        };
        if tracker.config.persist {
            match tracker.load() {
                Ok(Some(saved)) => {
                    info!(unlocked = saved.unlocked.len(), "Achievement progress loaded");
                    tracker.progress = saved;
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "Could not load achievement progress"),
            }
        }
        tracker
    }

    /// Tracker with the store the configuration names.
    pub fn from_config(config: AchievementsConfig) -> Self {
        let store: Box<dyn AchievementStore> = match &config.store_path {
            Some(path) => Box::new(FileStore::new(path.clone())),
            None => Box::new(MemoryStore::new()),
        };
        Self::new(config, store)
    }

    fn load(&self) -> Result<Option<SavedProgress>, StoreError> {
        self.store
            .get(STORAGE_KEY)?
            .map(|text| serde_json::from_str(&text).map_err(StoreError::from))
            .transpose()
    }

    /// Write the current record to the store.
    pub fn save(&mut self) -> Result<(), ObserverError> {
        let text = serde_json::to_string(&self.progress).map_err(StoreError::from)?;
        self.store.set(STORAGE_KEY, &text)?;
        Ok(())
    }

    /// Fold a world snapshot into the counters and check for unlocks.
    pub fn observe_snapshot(&mut self, snapshot: &EcosystemSnapshot) {
        let stats = &mut self.progress.stats;
        stats.current_population = snapshot.population;
        stats.longest_life_ms = stats.longest_life_ms.max(snapshot.oldest_age_ms);
        stats.highest_generation = stats.highest_generation.max(snapshot.highest_generation);
        self.check();
    }

    /// Unlock everything whose condition now holds. Returns the number of
    /// new unlocks.
    pub fn check(&mut self) -> usize {
        let mut unlocked: usize = 0;
        for achievement in CATALOG {
            if self.progress.unlocked.contains(achievement.id)
                || !self.progress.stats.satisfies(achievement.condition)
            {
                continue;
            }
            self.progress.unlocked.insert(achievement.id.to_owned());
            self.progress.total_points = self.progress.total_points.saturating_add(achievement.points);
            self.pending.push_back(Unlocked {
                id: achievement.id,
                name: achievement.name,
                points: achievement.points,
            });
            info!(id = achievement.id, points = achievement.points, "Achievement unlocked");
            unlocked = unlocked.saturating_add(1);
        }
        if unlocked > 0
            && self.config.persist
            && let Err(err) = self.save()
        {
            warn!(error = %err, "Could not save achievement progress");
        }
        unlocked
    }

    /// Take the unlocks not yet published.
    pub fn drain_unlocked(&mut self) -> Vec<Unlocked> {
        self.pending.drain(..).collect()
    }

    /// Whether `id` is unlocked.
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.progress.unlocked.contains(id)
    }

    /// Unlocked catalog entries.
    pub fn unlocked(&self) -> Vec<&'static Achievement> {
        CATALOG.iter().filter(|a| self.is_unlocked(a.id)).collect()
    }

    /// Catalog entries still locked.
    pub fn locked(&self) -> Vec<&'static Achievement> {
        CATALOG.iter().filter(|a| !self.is_unlocked(a.id)).collect()
    }

    /// Catalog entries in `category`.
    pub fn by_category(category: AchievementCategory) -> Vec<&'static Achievement> {
        CATALOG.iter().filter(|a| a.category == category).collect()
    }

    /// Unlock summary.
    pub fn progress(&self) -> Progress {
        let total = CATALOG.len();
        let unlocked = self.progress.unlocked.len();
        let percentage = unlocked
            .saturating_mul(100)
            .checked_div(total)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(0);
        Progress {
            unlocked,
            total,
            percentage,
            points: self.progress.total_points,
            max_points: CATALOG.iter().map(|a| a.points).fold(0, u32::saturating_add),
        }
    }

    /// Current counters.
    pub const fn stats(&self) -> &AchievementStats {
        &self.progress.stats
    }

    /// Forget every unlock and counter, and delete the stored record.
    pub fn reset(&mut self) -> Result<(), ObserverError> {
        self.progress = SavedProgress::default();
        self.pending.clear();
        if self.config.persist {
            self.store.remove(STORAGE_KEY)?;
        }
        info!("Achievement progress reset");
        Ok(())
    }
}

impl Observer for Achievements {
    fn name(&self) -> &'static str {
        "achievements"
    }

    fn signals(&self) -> &'static [Signal] {
        SIGNALS
    }

    fn handle(&mut self, event: &SimEvent) -> Result<(), ObserverError> {
        let stats = &mut self.progress.stats;
        match &event.kind {
            EventKind::Birth { entity, .. } => {
                stats.total_births = stats.total_births.saturating_add(1);
                stats.highest_generation = stats.highest_generation.max(entity.generation);
            }
            EventKind::Death { entity, .. } => {
                stats.total_deaths = stats.total_deaths.saturating_add(1);
                stats.longest_life_ms = stats.longest_life_ms.max(entity.age_ms);
            }
            EventKind::Evolution { to, .. } => increment(&mut stats.evolutions, *to),
            EventKind::RareSpawn { variant, .. } => increment(&mut stats.rares, *variant),
            EventKind::EventStart { event, .. } => increment(&mut stats.events, *event),
            EventKind::ToolUse { tool, .. } => increment(&mut stats.tools_used, *tool),
            EventKind::ResourceSpawned { variant, .. } => match variant {
                ResourceVariant::Portal => {
                    stats.portals_created = stats.portals_created.saturating_add(1);
                }
                ResourceVariant::Sanctuary(_) => {
                    stats.sanctuaries_created = stats.sanctuaries_created.saturating_add(1);
                }
                ResourceVariant::Well(_)
                | ResourceVariant::Predator(_)
                | ResourceVariant::BlackHole
                | ResourceVariant::Shadow
                | ResourceVariant::Serpent
                | ResourceVariant::Parasite => {}
            },
            EventKind::PatternFormed { .. } => {
                stats.constellations_formed = stats.constellations_formed.saturating_add(1);
            }
            EventKind::PredatorRepelled { entity: None, .. } => {
                stats.predators_repelled = stats.predators_repelled.saturating_add(1);
            }
            _ => return Ok(()),
        }
        let _ = self.check();
        Ok(())
    }
}

fn increment<K: Ord>(map: &mut BTreeMap<K, u32>, key: K) {
    let slot = map.entry(key).or_insert(0);
    *slot = slot.saturating_add(1);
}

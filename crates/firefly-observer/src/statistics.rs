//! Aggregate ecosystem statistics.
//!
//! Lifecycle counters are fed by the event bus. Every
//! `update_interval_ms` of simulated time the engine also hands over an
//! [`EcosystemSnapshot`] of the whole world, from which peak population,
//! birth and death rates, and the population history are derived.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use firefly_events::{EventKind, SimEvent, Signal};
use firefly_types::{
    CollisionOutcome, CosmicEventKind, DeathCause, Digit, EntitySnapshot, Modifiers, RareVariant,
    ResourceKind, Tier, ToolKind,
};

use crate::config::StatisticsConfig;
use crate::error::ObserverError;
use crate::observer::Observer;

/// Point-in-time picture of the world, assembled by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcosystemSnapshot {
    /// Simulated time of the snapshot.
    pub at_ms: f64,
    /// Live entities.
    pub population: usize,
    /// Live entities per tier.
    pub tiers: BTreeMap<Tier, usize>,
    /// Live entities per rare variant.
    pub rares: BTreeMap<RareVariant, usize>,
    /// Live entities per digit.
    pub digits: BTreeMap<Digit, usize>,
    /// Mean energy.
    pub average_energy: f64,
    /// Mean age.
    pub average_age_ms: f64,
    /// Age of the oldest live entity.
    pub oldest_age_ms: f64,
    /// Highest generation alive.
    pub highest_generation: u32,
    /// Active resources per kind.
    pub resources: BTreeMap<ResourceKind, usize>,
    /// Running cosmic events.
    pub active_events: Vec<CosmicEventKind>,
    /// Combined cosmic modifiers.
    pub modifiers: Modifiers,
}

impl EcosystemSnapshot {
    /// Population figures computed from entity snapshots; resource and
    /// cosmic fields start empty.
    pub fn from_entities(at_ms: f64, entities: &[EntitySnapshot]) -> Self {
        let mut tiers = BTreeMap::new();
        let mut rares = BTreeMap::new();
        let mut digits = BTreeMap::new();
        let mut energy = 0.0;
        let mut age = 0.0;
        let mut oldest: f64 = 0.0;
        let mut highest_generation = 0;
        for entity in entities {
            bump(&mut tiers, entity.tier);
            bump(&mut digits, entity.digit);
            if let Some(rare) = entity.rare {
                bump(&mut rares, rare);
            }
            energy += entity.energy;
            age += entity.age_ms;
            oldest = oldest.max(entity.age_ms);
            highest_generation = highest_generation.max(entity.generation);
        }
        #[allow(clippy::cast_precision_loss)]
        let count = entities.len().max(1) as f64;
        Self {
            at_ms,
            population: entities.len(),
            tiers,
            rares,
            digits,
            average_energy: energy / count,
            average_age_ms: age / count,
            oldest_age_ms: oldest,
            highest_generation,
            resources: BTreeMap::new(),
            active_events: Vec::new(),
            modifiers: Modifiers::NEUTRAL,
        }
    }
}

/// Serializable summary returned to the operator surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Births seen.
    pub total_births: u64,
    /// Deaths seen.
    pub total_deaths: u64,
    /// Deaths per cause.
    pub deaths_by_cause: BTreeMap<DeathCause, u64>,
    /// Collisions per outcome.
    pub collisions: BTreeMap<CollisionOutcome, u64>,
    /// Evolutions per target tier.
    pub evolutions: BTreeMap<Tier, u64>,
    /// Rare spawns per variant.
    pub rare_spawns: BTreeMap<RareVariant, u64>,
    /// Tool uses per tool.
    pub tool_uses: BTreeMap<ToolKind, u64>,
    /// Cosmic event starts per kind.
    pub cosmic_events: BTreeMap<CosmicEventKind, u64>,
    /// Predator captures.
    pub predator_kills: u64,
    /// Entities consumed by black holes and serpents.
    #[serde(default)]
    pub hazard_kills: u64,
    /// Entities converted by shadow fireflies.
    #[serde(default)]
    pub corruptions: u64,
    /// Portal teleports.
    pub teleports: u64,
    /// Highest population seen in a snapshot.
    pub peak_population: usize,
    /// Births per second over the last snapshot interval.
    pub birth_rate: f64,
    /// Deaths per second over the last snapshot interval.
    pub death_rate: f64,
    /// Recent population samples, oldest first.
    pub population_history: Vec<usize>,
    /// Latest snapshot.
    pub latest: Option<EcosystemSnapshot>,
}

/// Counter and snapshot aggregator.
#[derive(Debug, Clone)]
pub struct Statistics {
    config: StatisticsConfig,
    total_births: u64,
    total_deaths: u64,
    deaths_by_cause: BTreeMap<DeathCause, u64>,
    collisions: BTreeMap<CollisionOutcome, u64>,
    evolutions: BTreeMap<Tier, u64>,
    rare_spawns: BTreeMap<RareVariant, u64>,
    tool_uses: BTreeMap<ToolKind, u64>,
    cosmic_events: BTreeMap<CosmicEventKind, u64>,
    predator_kills: u64,
    hazard_kills: u64,
    corruptions: u64,
    teleports: u64,
    peak_population: usize,
    birth_rate: f64,
    death_rate: f64,
    history: VecDeque<usize>,
    latest: Option<EcosystemSnapshot>,
    since_update_ms: f64,
    last_births: u64,
    last_deaths: u64,
    last_snapshot_ms: Option<f64>,
}

const SIGNALS: &[Signal] = &[
    Signal::Birth,
    Signal::Death,
    Signal::Evolution,
    Signal::Collision,
    Signal::RareSpawn,
    Signal::ToolUse,
    Signal::EventStart,
    Signal::PredatorKill,
    Signal::HazardKill,
    Signal::Corruption,
    Signal::Teleport,
];

impl Statistics {
    /// Empty statistics.
    pub const fn new(config: StatisticsConfig) -> Self {
        Self {
            config,
            total_births: 0,
            total_deaths: 0,
            deaths_by_cause: BTreeMap::new(),
            collisions: BTreeMap::new(),
            evolutions: BTreeMap::new(),
            rare_spawns: BTreeMap::new(),
            tool_uses: BTreeMap::new(),
            cosmic_events: BTreeMap::new(),
            predator_kills: 0,
            hazard_kills: 0,
            corruptions: 0,
            teleports: 0,
            peak_population: 0,
            birth_rate: 0.0,
            death_rate: 0.0,
            history: VecDeque::new(),
            latest: None,
            since_update_ms: 0.0,
            last_births: 0,
            last_deaths: 0,
            last_snapshot_ms: None,
        }
    }

    /// Advance the update timer; `true` when a snapshot is due.
    pub fn tick(&mut self, dt_ms: f64) -> bool {
        self.since_update_ms += dt_ms;
        if self.since_update_ms < self.config.update_interval_ms {
            return false;
        }
        self.since_update_ms = 0.0;
        true
    }

    /// Record a snapshot: peak, rates, and history.
    pub fn ingest(&mut self, snapshot: EcosystemSnapshot) {
        self.peak_population = self.peak_population.max(snapshot.population);

        if let Some(previous) = self.last_snapshot_ms {
            let elapsed_s = (snapshot.at_ms - previous) / 1000.0;
            if elapsed_s > 0.0 {
                #[allow(clippy::cast_precision_loss)]
                let births = self.total_births.saturating_sub(self.last_births) as f64;
                #[allow(clippy::cast_precision_loss)]
                let deaths = self.total_deaths.saturating_sub(self.last_deaths) as f64;
                self.birth_rate = births / elapsed_s;
                self.death_rate = deaths / elapsed_s;
            }
        }
        self.last_births = self.total_births;
        self.last_deaths = self.total_deaths;
        self.last_snapshot_ms = Some(snapshot.at_ms);

        self.history.push_back(snapshot.population);
        while self.history.len() > self.config.history_length {
            let _ = self.history.pop_front();
        }
        self.latest = Some(snapshot);
    }

    /// Serializable summary of everything recorded.
    pub fn report(&self) -> StatisticsReport {
        StatisticsReport {
            total_births: self.total_births,
            total_deaths: self.total_deaths,
            deaths_by_cause: self.deaths_by_cause.clone(),
            collisions: self.collisions.clone(),
            evolutions: self.evolutions.clone(),
            rare_spawns: self.rare_spawns.clone(),
            tool_uses: self.tool_uses.clone(),
            cosmic_events: self.cosmic_events.clone(),
            predator_kills: self.predator_kills,
            hazard_kills: self.hazard_kills,
            corruptions: self.corruptions,
            teleports: self.teleports,
            peak_population: self.peak_population,
            birth_rate: self.birth_rate,
            death_rate: self.death_rate,
            population_history: self.history.iter().copied().collect(),
            latest: self.latest.clone(),
        }
    }

    /// Births seen.
    pub const fn total_births(&self) -> u64 {
        self.total_births
    }

    /// Deaths seen.
    pub const fn total_deaths(&self) -> u64 {
        self.total_deaths
    }

    /// Deaths recorded with `cause`.
    pub fn deaths_by(&self, cause: DeathCause) -> u64 {
        self.deaths_by_cause.get(&cause).copied().unwrap_or(0)
    }

    /// Highest population seen in a snapshot.
    pub const fn peak_population(&self) -> usize {
        self.peak_population
    }

    /// Latest snapshot.
    pub const fn latest(&self) -> Option<&EcosystemSnapshot> {
        self.latest.as_ref()
    }

    /// Active configuration.
    pub const fn config(&self) -> &StatisticsConfig {
        &self.config
    }
}

impl Observer for Statistics {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn signals(&self) -> &'static [Signal] {
        SIGNALS
    }

    fn handle(&mut self, event: &SimEvent) -> Result<(), ObserverError> {
        match &event.kind {
            EventKind::Birth { .. } => self.total_births = self.total_births.saturating_add(1),
            EventKind::Death { cause, .. } => {
                self.total_deaths = self.total_deaths.saturating_add(1);
                bump_u64(&mut self.deaths_by_cause, *cause);
            }
            EventKind::Evolution { to, .. } => bump_u64(&mut self.evolutions, *to),
            EventKind::Collision { outcome, .. } => bump_u64(&mut self.collisions, *outcome),
            EventKind::RareSpawn { variant, .. } => bump_u64(&mut self.rare_spawns, *variant),
            EventKind::ToolUse { tool, .. } => bump_u64(&mut self.tool_uses, *tool),
            EventKind::EventStart { event, .. } => bump_u64(&mut self.cosmic_events, *event),
            EventKind::PredatorKill { .. } => {
                self.predator_kills = self.predator_kills.saturating_add(1);
            }
            EventKind::HazardKill { .. } => self.hazard_kills = self.hazard_kills.saturating_add(1),
            EventKind::Corruption { .. } => self.corruptions = self.corruptions.saturating_add(1),
            EventKind::Teleport { .. } => self.teleports = self.teleports.saturating_add(1),
            _ => {}
        }
        Ok(())
    }
}

fn bump<K: Ord>(map: &mut BTreeMap<K, usize>, key: K) {
    let slot = map.entry(key).or_insert(0);
    *slot = slot.saturating_add(1);
}

fn bump_u64<K: Ord>(map: &mut BTreeMap<K, u64>, key: K) {
    let slot = map.entry(key).or_insert(0);
    *slot = slot.saturating_add(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use firefly_types::{EntityId, LifeState, ResourceId, ResourceVariant, Vec2};

    use super::*;

    fn entity(tier: Tier, age_ms: f64, generation: u32) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(),
            position: Vec2::ZERO,
            state: LifeState::Mature,
            digit: Digit::One,
            tier,
            rare: None,
            energy: 50.0,
            age_ms,
            generation,
        }
    }

    fn event(kind: EventKind) -> SimEvent {
        SimEvent {
            frame: 0,
            at_ms: 0.0,
            kind,
        }
    }

    #[test]
    fn snapshot_aggregates_population() {
        let snapshot = EcosystemSnapshot::from_entities(
            0.0,
            &[
                entity(Tier::Basic, 1000.0, 0),
                entity(Tier::Charged, 3000.0, 4),
            ],
        );
        assert_eq!(snapshot.population, 2);
        assert_eq!(snapshot.tiers.get(&Tier::Charged), Some(&1));
        assert!((snapshot.average_age_ms - 2000.0).abs() < f64::EPSILON);
        assert!((snapshot.oldest_age_ms - 3000.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.highest_generation, 4);
    }

    #[test]
    fn snapshot_of_nothing_is_zeroed() {
        let snapshot = EcosystemSnapshot::from_entities(0.0, &[]);
        assert_eq!(snapshot.population, 0);
        assert!(snapshot.average_energy.abs() < f64::EPSILON);
    }

    #[test]
    fn counts_deaths_by_cause() {
        let mut stats = Statistics::new(StatisticsConfig::default());
        let victim = entity(Tier::Basic, 0.0, 0);
        for cause in [DeathCause::Predator, DeathCause::Predator, DeathCause::Natural] {
            stats
                .handle(&event(EventKind::Death {
                    entity: victim,
                    cause,
                }))
                .unwrap();
        }
        assert_eq!(stats.total_deaths(), 3);
        assert_eq!(stats.deaths_by(DeathCause::Predator), 2);
        assert_eq!(stats.deaths_by(DeathCause::Sacrifice), 0);
    }

    #[test]
    fn hazard_kills_and_corruptions_are_counted() {
        let mut stats = Statistics::new(StatisticsConfig::default());
        let hole = ResourceId::new();
        let victim = EntityId::new();
        stats
            .handle(&event(EventKind::HazardKill {
                resource: hole,
                variant: ResourceVariant::BlackHole,
                victim,
                cause: DeathCause::Consumed,
            }))
            .unwrap();
        stats
            .handle(&event(EventKind::Corruption {
                resource: ResourceId::new(),
                entity: victim,
            }))
            .unwrap();
        let report = stats.report();
        assert_eq!(report.hazard_kills, 1);
        assert_eq!(report.corruptions, 1);
        assert_eq!(report.predator_kills, 0);
    }

    #[test]
    fn rates_use_simulated_interval() {
        let mut stats = Statistics::new(StatisticsConfig::default());
        stats.ingest(EcosystemSnapshot::from_entities(0.0, &[]));
        let newborn = entity(Tier::Basic, 0.0, 0);
        for _ in 0..4 {
            stats
                .handle(&event(EventKind::Birth {
                    entity: newborn,
                    origin: firefly_types::SpawnOrigin::Seed,
                }))
                .unwrap();
        }
        stats.ingest(EcosystemSnapshot::from_entities(2000.0, &[newborn; 4]));
        let report = stats.report();
        assert!((report.birth_rate - 2.0).abs() < 1e-9);
        assert_eq!(report.peak_population, 4);
        assert_eq!(report.population_history, vec![0, 4]);
    }

    #[test]
    fn history_is_bounded() {
        let mut stats = Statistics::new(StatisticsConfig {
            history_length: 3,
            ..StatisticsConfig::default()
        });
        for i in 0..10 {
            stats.ingest(EcosystemSnapshot::from_entities(f64::from(i) * 500.0, &[]));
        }
        assert_eq!(stats.report().population_history.len(), 3);
    }

    #[test]
    fn tick_fires_every_interval() {
        let mut stats = Statistics::new(StatisticsConfig::default());
        let fired = (0..100).filter(|_| stats.tick(50.0)).count();
        assert_eq!(fired, 10);
    }

    #[test]
    fn report_round_trips_through_json() {
        let mut stats = Statistics::new(StatisticsConfig::default());
        stats.ingest(EcosystemSnapshot::from_entities(0.0, &[entity(Tier::Radiant, 10.0, 1)]));
        let json = serde_json::to_string(&stats.report()).unwrap();
        let back: StatisticsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats.report());
    }
}

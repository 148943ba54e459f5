//! The Population Manager: sole owner of every live entity.
//!
//! Entities live in an insertion-ordered arena. Other subsystems borrow it
//! for the duration of their update and refer to entities across frames by
//! [`EntityId`] only. Removal has exactly one path: [`PopulationManager::kill`]
//! records a cause and starts the dying window, and [`PopulationManager::tick`]
//! unlinks the entity and publishes the death notification once that window
//! has elapsed.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, warn};

use firefly_events::{EventBus, EventKind};
use firefly_types::{
    DeathCause, Digit, Entity, EntityId, EntitySnapshot, GeneTrait, Genetics, House, LifeState,
    Modifiers, RareVariant, SpawnOrigin, Tier, Vec2, Viewport,
};

use crate::collision;
use crate::config::{CollisionConfig, LifecycleConfig, PopulationConfig};
use crate::genetics::random_genetics;

/// Frame length the per-frame constants are tuned for.
pub const REFERENCE_FRAME_MS: f64 = 16.0;

/// Distance past the viewport edge before an entity wraps around.
const WRAP_PADDING: f64 = 50.0;

/// Range of the random base speed.
const BASE_SPEED_RANGE: (f64, f64) = (0.3, 0.6);

/// Desperation-driven speed boost at full desperation.
const DESPERATION_SPEED_BOOST: f64 = 1.5;

/// Speed multiplier of ancient rare entities.
const ANCIENT_SPEED: f64 = 0.6;

/// Decay divisor step per tier level.
const DECAY_TIER_STEP: f64 = 0.3;

/// Decay multiplier of shadow-converted entities.
const SHADOW_DECAY: f64 = 0.5;

// ---------------------------------------------------------------------------
// Spawn parameters
// ---------------------------------------------------------------------------

/// Initial values for a new entity. Unset fields are randomized.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnParams {
    /// Position; random inside the viewport when `None`.
    pub position: Option<Vec2>,
    /// Initial velocity; small random drift when `None`.
    pub velocity: Option<Vec2>,
    /// Binary category; random when `None`.
    pub digit: Option<Digit>,
    /// Starting tier.
    pub tier: Tier,
    /// Starting energy; 100 when `None`.
    pub energy: Option<f64>,
    /// Lineage depth.
    pub generation: u32,
    /// Genetics; random around the defaults when `None`.
    pub genetics: Option<Genetics>,
    /// Rare tag.
    pub rare: Option<RareVariant>,
    /// Which path requested the spawn.
    pub origin: SpawnOrigin,
}

impl Default for SpawnParams {
    fn default() -> Self {
        Self::new(SpawnOrigin::Seed)
    }
}

impl SpawnParams {
    /// Fully randomized parameters for the given origin.
    pub const fn new(origin: SpawnOrigin) -> Self {
        Self {
            position: None,
            velocity: None,
            digit: None,
            tier: Tier::Basic,
            energy: None,
            generation: 0,
            genetics: None,
            rare: None,
            origin,
        }
    }

    /// Set the spawn position.
    #[must_use]
    pub const fn at(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the digit.
    #[must_use]
    pub const fn with_digit(mut self, digit: Digit) -> Self {
        self.digit = Some(digit);
        self
    }

    /// Set the starting energy.
    #[must_use]
    pub const fn with_energy(mut self, energy: f64) -> Self {
        self.energy = Some(energy);
        self
    }
}

/// What a population tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entities that left `birth`.
    pub matured: usize,
    /// Entities that ran out of energy or time this tick.
    pub started_dying: usize,
    /// Entities unlinked after their dying window.
    pub removed: usize,
}

/// An area where collisions grant extra evolution progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressZone {
    /// Zone center.
    pub center: Vec2,
    /// Zone radius.
    pub radius: f64,
    /// Multiplier on evolution progress gained inside.
    pub multiplier: f64,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Owns the entity arena and enforces lifecycle and bounds.
#[derive(Debug)]
pub struct PopulationManager {
    entities: Vec<Entity>,
    bounds: PopulationConfig,
    lifecycle: LifecycleConfig,
    collision: CollisionConfig,
    viewport: Viewport,
    total_spawned: u64,
    total_removed: u64,
}

impl PopulationManager {
    /// Create an empty population.
    pub const fn new(
        bounds: PopulationConfig,
        lifecycle: LifecycleConfig,
        collision: CollisionConfig,
        viewport: Viewport,
    ) -> Self {
        Self {
            entities: Vec::new(),
            bounds,
            lifecycle,
            collision,
            viewport,
            total_spawned: 0,
            total_removed: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Spawning and removal
    // -----------------------------------------------------------------------

    /// Spawn the configured initial population.
    pub fn seed(&mut self, rng: &mut impl Rng, bus: &mut EventBus) -> usize {
        let target = self.bounds.initial.min(self.bounds.max);
        let mut spawned: usize = 0;
        while self.entities.len() < target {
            if self.spawn(SpawnParams::new(SpawnOrigin::Seed), rng, bus).is_none() {
                break;
            }
            spawned = spawned.saturating_add(1);
        }
        spawned
    }

    /// Create an entity in `birth` state if the population is below `max`.
    ///
    /// Returns `None` and publishes nothing when at capacity.
    pub fn spawn(
        &mut self,
        params: SpawnParams,
        rng: &mut impl Rng,
        bus: &mut EventBus,
    ) -> Option<EntityId> {
        if self.is_full() {
            warn!(
                population = self.entities.len(),
                max = self.bounds.max,
                origin = ?params.origin,
                "Spawn rejected: population at capacity"
            );
            return None;
        }

        let position = params.position.unwrap_or_else(|| {
            Vec2::new(
                rng.random_range(0.0..self.viewport.width.max(1.0)),
                rng.random_range(0.0..self.viewport.height.max(1.0)),
            )
        });
        let digit = params
            .digit
            .unwrap_or_else(|| if rng.random_bool(0.5) { Digit::One } else { Digit::Zero });
        let base_age = random_between(
            rng,
            self.lifecycle.min_base_age_ms,
            self.lifecycle.max_base_age_ms,
        );

        let mut entity = Entity::new(EntityId::new(), position, digit, params.tier, base_age);
        entity.velocity = params.velocity.unwrap_or_else(|| {
            Vec2::new(rng.random_range(-0.25..0.25), rng.random_range(-0.25..0.25))
        });
        entity.base_speed = random_between(rng, BASE_SPEED_RANGE.0, BASE_SPEED_RANGE.1);
        entity.generation = params.generation;
        entity.rare = params.rare;
        entity.rare_checked = params.rare.is_some();
        entity.genetics = Some(params.genetics.unwrap_or_else(|| random_genetics(rng)));
        if let Some(energy) = params.energy {
            entity.set_energy(energy);
        }

        let id = entity.id;
        let snapshot = entity.snapshot();
        self.entities.push(entity);
        self.total_spawned = self.total_spawned.saturating_add(1);

        debug!(entity_id = %id, origin = ?params.origin, population = self.entities.len(), "Entity born");
        bus.emit(EventKind::Birth {
            entity: snapshot,
            origin: params.origin,
        });
        Some(id)
    }

    /// Request an entity's death. The first recorded cause wins.
    ///
    /// Returns `false` if the id is unknown or the entity is already dying.
    pub fn kill(&mut self, id: EntityId, cause: DeathCause) -> bool {
        let Some(entity) = self.get_mut(id) else {
            return false;
        };
        let accepted = entity.mark_dying(cause);
        if accepted {
            debug!(entity_id = %id, cause = ?cause, "Entity dying");
        }
        accepted
    }

    /// Convert a mature, live Zero into a shadow. Shadows decay at half rate
    /// and feel half the pull of black holes.
    ///
    /// Returns `false` if the entity is unknown, not a mature Zero, or
    /// already converted.
    pub fn corrupt(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.get_mut(id) else {
            return false;
        };
        if entity.shadow || entity.digit != Digit::Zero || !entity.is_mature() || entity.is_doomed() {
            return false;
        }
        entity.shadow = true;
        debug!(entity_id = %id, "Entity converted to shadow");
        true
    }

    /// Top the population up to `min` with synchronous refill spawns.
    ///
    /// Never removes entities; above `max` this is a no-op.
    pub fn enforce_bounds(&mut self, rng: &mut impl Rng, bus: &mut EventBus) -> usize {
        let mut spawned: usize = 0;
        while self.entities.len() < self.bounds.min {
            if self.spawn(SpawnParams::new(SpawnOrigin::Refill), rng, bus).is_none() {
                break;
            }
            spawned = spawned.saturating_add(1);
        }
        if spawned > 0 {
            debug!(spawned, population = self.entities.len(), "Refilled population to floor");
        }
        spawned
    }

    // -----------------------------------------------------------------------
    // Per-frame lifecycle
    // -----------------------------------------------------------------------

    /// Age, decay, move, and retire entities.
    pub fn tick(
        &mut self,
        dt_ms: f64,
        modifiers: &Modifiers,
        rng: &mut impl Rng,
        bus: &mut EventBus,
    ) -> TickReport {
        let mut report = TickReport::default();
        let step = dt_ms / REFERENCE_FRAME_MS;
        let viewport = self.viewport;

        for entity in &mut self.entities {
            entity.advance_time(dt_ms);
            entity.collision_cooldown_ms = (entity.collision_cooldown_ms - dt_ms).max(0.0);
            entity.reproduction_cooldown_ms = (entity.reproduction_cooldown_ms - dt_ms).max(0.0);

            match entity.state() {
                LifeState::Birth => {
                    let window =
                        self.lifecycle.birth_window_ms / entity.gene(GeneTrait::MaturitySpeed);
                    if entity.state_elapsed_ms() >= window
                        && entity.transition(LifeState::Mature).is_ok()
                    {
                        report.matured = report.matured.saturating_add(1);
                    }
                }
                LifeState::Mature => {
                    let decay = decay_per_frame(entity, &self.lifecycle, modifiers) * step;
                    entity.add_energy(-decay);
                    if entity.energy() <= 0.0 || entity.age_ms >= entity.max_age_ms() {
                        if entity.mark_dying(DeathCause::Natural) {
                            debug!(entity_id = %entity.id, age_ms = entity.age_ms, "Entity dying of natural causes");
                        }
                        report.started_dying = report.started_dying.saturating_add(1);
                    }
                }
                LifeState::Dying | LifeState::Dead => {}
            }

            if entity.state() == LifeState::Dying {
                let _ = entity.take_force();
            } else {
                integrate(entity, step, modifiers, &viewport, rng);
            }
        }

        report.removed = self.unlink_expired(bus);
        report
    }

    /// Remove entities whose dying window elapsed and publish their deaths.
    fn unlink_expired(&mut self, bus: &mut EventBus) -> usize {
        let window = self.lifecycle.dying_window_ms;
        let (expired, alive): (Vec<Entity>, Vec<Entity>) = std::mem::take(&mut self.entities)
            .into_iter()
            .partition(|e| e.state() == LifeState::Dying && e.state_elapsed_ms() >= window);
        self.entities = alive;

        let removed = expired.len();
        for mut entity in expired {
            let cause = entity.death_cause().unwrap_or(DeathCause::Natural);
            if let Err(err) = entity.transition(LifeState::Dead) {
                warn!(entity_id = %entity.id, error = %err, "Unexpected state at removal");
            }
            self.total_removed = self.total_removed.saturating_add(1);
            debug!(entity_id = %entity.id, cause = cause.as_str(), "Entity removed");
            bus.emit(EventKind::Death {
                entity: entity.snapshot(),
                cause,
            });
        }
        removed
    }

    /// Collide mature pairs in range and evolve entities that qualify.
    ///
    /// Returns the number of collisions.
    pub fn resolve_collisions(
        &mut self,
        zones: &[ProgressZone],
        modifiers: &Modifiers,
        bus: &mut EventBus,
    ) -> usize {
        if !self.collision.enabled {
            return 0;
        }
        let pairs = collision::find_pairs(&self.entities, self.collision.radius);

        for &(i, j) in &pairs {
            let Some((a, b)) = pair_mut(&mut self.entities, i, j) else {
                continue;
            };
            let midpoint = a.position.plus(b.position).scaled(0.5);
            let gain = zones
                .iter()
                .filter(|z| z.center.distance(midpoint) <= z.radius)
                .map(|z| z.multiplier)
                .fold(1.0_f64, f64::max);

            let outcome = collision::collide(a, b, &self.collision, gain, modifiers.energy);
            bus.emit(EventKind::Collision {
                a: a.id,
                b: b.id,
                outcome,
                position: midpoint,
            });

            for entity in [a, b] {
                if let Some((from, to)) = entity.try_evolve() {
                    debug!(entity_id = %entity.id, from = from.name(), to = to.name(), "Entity evolved");
                    bus.emit(EventKind::Evolution {
                        entity: entity.snapshot(),
                        from,
                        to,
                    });
                }
            }
        }

        pairs.len()
    }

    // -----------------------------------------------------------------------
    // Arena access
    // -----------------------------------------------------------------------

    /// All entities in insertion order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Mutable access to every entity. The slice cannot add or remove.
    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Iterate entities.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    /// Look up an entity.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Look up an entity mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// Whether an id is in the arena.
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|e| e.id).collect()
    }

    /// Snapshots of every entity.
    pub fn snapshots(&self) -> Vec<EntitySnapshot> {
        self.entities.iter().map(Entity::snapshot).collect()
    }

    /// Accumulate a force on one entity. Returns `false` for unknown ids.
    pub fn apply_force(&mut self, id: EntityId, force: Vec2) -> bool {
        let Some(entity) = self.get_mut(id) else {
            return false;
        };
        entity.apply_force(force);
        true
    }

    /// Add clamped energy to one entity, returning the change applied.
    pub fn add_energy(&mut self, id: EntityId, delta: f64) -> Option<f64> {
        self.get_mut(id).map(|e| e.add_energy(delta))
    }

    /// Move an entity, returning its previous position.
    pub fn teleport(&mut self, id: EntityId, to: Vec2) -> Option<Vec2> {
        self.get_mut(id)
            .map(|e| std::mem::replace(&mut e.position, to))
    }

    // -----------------------------------------------------------------------
    // Counts and bounds
    // -----------------------------------------------------------------------

    /// Current population, including dying entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether a spawn would be rejected.
    pub fn is_full(&self) -> bool {
        self.entities.len() >= self.bounds.max
    }

    /// Entities per digit.
    pub fn count_by_digit(&self) -> BTreeMap<Digit, usize> {
        count_by(&self.entities, |e| Some(e.digit))
    }

    /// Entities per tier.
    pub fn count_by_tier(&self) -> BTreeMap<Tier, usize> {
        count_by(&self.entities, |e| Some(e.tier()))
    }

    /// Entities per rare variant.
    pub fn count_by_rare(&self) -> BTreeMap<RareVariant, usize> {
        count_by(&self.entities, |e| e.rare)
    }

    /// Configured bounds.
    pub const fn bounds(&self) -> &PopulationConfig {
        &self.bounds
    }

    /// Current viewport.
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Resize the viewport.
    pub const fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Entities spawned since creation.
    pub const fn total_spawned(&self) -> u64 {
        self.total_spawned
    }

    /// Entities removed since creation.
    pub const fn total_removed(&self) -> u64 {
        self.total_removed
    }

    /// Drop every entity without notifications. Used by engine teardown.
    pub fn clear(&mut self) {
        self.entities.clear();
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn random_between(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    if high > low && (high - low).is_finite() {
        rng.random_range(low..high)
    } else {
        low
    }
}

fn decay_per_frame(entity: &Entity, lifecycle: &LifecycleConfig, modifiers: &Modifiers) -> f64 {
    let level = f64::from(entity.tier().level());
    let efficiency = entity.gene(GeneTrait::EnergyEfficiency).max(f64::EPSILON);
    let shadow = if entity.shadow { SHADOW_DECAY } else { 1.0 };
    lifecycle.energy_decay / DECAY_TIER_STEP.mul_add(level, 1.0) / efficiency
        * modifiers.death_rate
        * shadow
}

/// Maximum speed after genetics, environment, house, rare tag and desperation.
pub fn max_speed(entity: &Entity, modifiers: &Modifiers) -> f64 {
    let house = entity.house.map_or(1.0, House::speed_multiplier);
    let rare = if entity.rare == Some(RareVariant::Ancient) {
        ANCIENT_SPEED
    } else {
        1.0
    };
    let desperation = if entity.is_mature() {
        entity.desperation()
    } else {
        0.0
    };
    entity.base_speed
        * entity.gene(GeneTrait::Speed)
        * modifiers.speed
        * house
        * rare
        * DESPERATION_SPEED_BOOST.mul_add(desperation, 1.0)
}

fn integrate(
    entity: &mut Entity,
    step: f64,
    modifiers: &Modifiers,
    viewport: &Viewport,
    rng: &mut impl Rng,
) {
    let force = entity.take_force();
    let agility = entity.gene(GeneTrait::Agility);
    let mut velocity = entity.velocity.plus(force.scaled(agility * step));

    let desperation = if entity.is_mature() {
        entity.desperation()
    } else {
        0.0
    };
    let wander_chance = 0.04_f64.mul_add(desperation, 0.008).clamp(0.0, 1.0);
    if rng.random_bool(wander_chance) {
        let strength = 0.15 * 2.0_f64.mul_add(desperation, 1.0) * entity.gene(GeneTrait::Curiosity);
        let impulse = Vec2::new(rng.random_range(-0.5..0.5), rng.random_range(-0.5..0.5));
        velocity = velocity.plus(impulse.scaled(strength));
    }

    entity.velocity = velocity.limited(max_speed(entity, modifiers));
    entity.position = wrap(entity.position.plus(entity.velocity.scaled(step)), viewport);
}

fn wrap(point: Vec2, viewport: &Viewport) -> Vec2 {
    let wrap_axis = |value: f64, extent: f64| {
        if value < -WRAP_PADDING {
            extent + WRAP_PADDING
        } else if value > extent + WRAP_PADDING {
            -WRAP_PADDING
        } else {
            value
        }
    };
    Vec2::new(
        wrap_axis(point.x, viewport.width),
        wrap_axis(point.y, viewport.height),
    )
}

fn pair_mut(entities: &mut [Entity], i: usize, j: usize) -> Option<(&mut Entity, &mut Entity)> {
    if i >= j {
        return None;
    }
    let (left, right) = entities.split_at_mut_checked(j)?;
    Some((left.get_mut(i)?, right.first_mut()?))
}

fn count_by<K: Ord>(entities: &[Entity], key: impl Fn(&Entity) -> Option<K>) -> BTreeMap<K, usize> {
    let mut counts = BTreeMap::new();
    for k in entities.iter().filter_map(key) {
        let slot = counts.entry(k).or_insert(0_usize);
        *slot = slot.saturating_add(1);
    }
    counts
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn manager(min: usize, max: usize) -> PopulationManager {
        PopulationManager::new(
            PopulationConfig {
                initial: min,
                min,
                max,
            },
            LifecycleConfig::default(),
            CollisionConfig::default(),
            Viewport::default(),
        )
    }

    #[test]
    fn spawn_at_capacity_returns_none() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut bus = EventBus::new();
        let mut pop = manager(0, 2);
        assert!(pop.spawn(SpawnParams::default(), &mut rng, &mut bus).is_some());
        assert!(pop.spawn(SpawnParams::default(), &mut rng, &mut bus).is_some());
        assert!(pop.spawn(SpawnParams::default(), &mut rng, &mut bus).is_none());
        assert_eq!(pop.len(), 2);
        assert_eq!(bus.published(), 2);
    }

    #[test]
    fn newborns_mature_after_birth_window() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut bus = EventBus::new();
        let mut pop = manager(0, 5);
        let mut genetics = Genetics::neutral();
        genetics.set(GeneTrait::MaturitySpeed, 1.0);
        let params = SpawnParams {
            genetics: Some(genetics),
            ..SpawnParams::default()
        };
        let id = pop.spawn(params, &mut rng, &mut bus).unwrap_or_default();
        for _ in 0..200 {
            pop.tick(16.0, &Modifiers::NEUTRAL, &mut rng, &mut bus);
        }
        assert_eq!(pop.get(id).map(Entity::state), Some(LifeState::Birth));
        for _ in 0..20 {
            pop.tick(16.0, &Modifiers::NEUTRAL, &mut rng, &mut bus);
        }
        assert_eq!(pop.get(id).map(Entity::state), Some(LifeState::Mature));
    }

    #[test]
    fn kill_is_first_cause_wins_and_removal_happens_after_window() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut bus = EventBus::new();
        let mut pop = manager(0, 5);
        let id = pop
            .spawn(SpawnParams::default(), &mut rng, &mut bus)
            .unwrap_or_default();
        assert!(pop.kill(id, DeathCause::Predator));
        assert!(!pop.kill(id, DeathCause::Natural));
        assert!(pop.contains(id));

        for _ in 0..70 {
            pop.tick(16.0, &Modifiers::NEUTRAL, &mut rng, &mut bus);
        }
        assert!(!pop.contains(id));
        assert!(!pop.kill(id, DeathCause::Natural));
        assert_eq!(pop.total_removed(), 1);
    }

    #[test]
    fn only_mature_zeros_are_converted_once() {
        let mut rng = StdRng::seed_from_u64(31);
        let mut bus = EventBus::new();
        let mut pop = manager(0, 5);
        let zero = SpawnParams {
            digit: Some(Digit::Zero),
            ..SpawnParams::default()
        };
        let one = SpawnParams {
            digit: Some(Digit::One),
            ..SpawnParams::default()
        };
        let zero = pop.spawn(zero, &mut rng, &mut bus).unwrap_or_default();
        let one = pop.spawn(one, &mut rng, &mut bus).unwrap_or_default();
        assert!(!pop.corrupt(zero), "newborns are not converted");

        for id in [zero, one] {
            if let Some(entity) = pop.get_mut(id) {
                assert!(entity.transition(LifeState::Mature).is_ok());
            }
        }
        assert!(pop.corrupt(zero));
        assert!(!pop.corrupt(zero));
        assert!(!pop.corrupt(one));
        assert_eq!(pop.get(zero).map(|e| e.shadow), Some(true));
        assert_eq!(pop.get(one).map(|e| e.shadow), Some(false));
    }

    #[test]
    fn enforce_bounds_refills_to_floor_only() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut bus = EventBus::new();
        let mut pop = manager(5, 8);
        assert_eq!(pop.enforce_bounds(&mut rng, &mut bus), 5);
        assert_eq!(pop.len(), 5);
        assert_eq!(pop.enforce_bounds(&mut rng, &mut bus), 0);
    }

    #[test]
    fn teleport_returns_previous_position() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut bus = EventBus::new();
        let mut pop = manager(0, 5);
        let id = pop
            .spawn(SpawnParams::default().at(Vec2::new(1.0, 2.0)), &mut rng, &mut bus)
            .unwrap_or_default();
        let previous = pop.teleport(id, Vec2::new(9.0, 9.0));
        assert_eq!(previous, Some(Vec2::new(1.0, 2.0)));
        assert_eq!(pop.get(id).map(|e| e.position), Some(Vec2::new(9.0, 9.0)));
    }

    #[test]
    fn wrap_moves_across_edges() {
        let viewport = Viewport::new(100.0, 100.0);
        let wrapped = wrap(Vec2::new(-60.0, 200.0), &viewport);
        assert!((wrapped.x - 150.0).abs() < f64::EPSILON);
        assert!((wrapped.y + 50.0).abs() < f64::EPSILON);
    }
}

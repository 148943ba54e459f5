//! The simulated agent.
//!
//! Energy and life-state are private so their invariants hold by
//! construction: energy is clamped to `[0, 100]` after every change, and
//! life-state only moves forward.

use serde::{Deserialize, Serialize};

use crate::enums::{DeathCause, Digit, House, LifeState, RareVariant, Tier};
use crate::genetics::{GeneTrait, Genetics};
use crate::ids::{EntityId, FormationId, SwarmId};
use crate::structs::{EntitySnapshot, Vec2};

/// Maximum energy an entity can hold.
pub const MAX_ENERGY: f64 = 100.0;

/// Remaining-life fraction and energy blend above which an entity is desperate.
pub const DESPERATION_THRESHOLD: f64 = 0.5;

/// Hard cap on combined capture resistance.
const MAX_RESISTANCE: f64 = 0.95;

/// Errors raised by entity state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The requested life-state is not after the current one.
    #[error("cannot move entity {id} from {from:?} to {to:?}")]
    Backward {
        /// The entity.
        id: EntityId,
        /// Current state.
        from: LifeState,
        /// Requested state.
        to: LifeState,
    },
}

/// A firefly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable unique id.
    pub id: EntityId,
    /// Position in viewport pixels.
    pub position: Vec2,
    /// Velocity in pixels per 16 ms.
    pub velocity: Vec2,
    /// Forces accumulated this frame, integrated by the population tick.
    force: Vec2,
    /// Energy in `[0, 100]`.
    energy: f64,
    /// Age in milliseconds.
    pub age_ms: f64,
    /// Max-age before tier and genetic multipliers.
    pub base_max_age_ms: f64,
    /// Current life-state.
    state: LifeState,
    /// Time spent in the current life-state.
    state_elapsed_ms: f64,
    /// Cause recorded by the first kill request.
    death_cause: Option<DeathCause>,
    /// Binary category.
    pub digit: Digit,
    /// Evolution tier.
    tier: Tier,
    /// Progress toward the next tier.
    pub evolution_progress: f64,
    /// Time until this entity can collide again.
    pub collision_cooldown_ms: f64,
    /// Total collisions.
    pub collision_count: u32,
    /// Lineage depth.
    pub generation: u32,
    /// Rare variant tag.
    pub rare: Option<RareVariant>,
    /// Whether the rare-variant module has rolled for this entity.
    pub rare_checked: bool,
    /// Inheritable traits.
    pub genetics: Option<Genetics>,
    /// Swarm membership.
    pub swarm: Option<SwarmId>,
    /// Pattern formation membership.
    pub formation: Option<FormationId>,
    /// Personality house.
    pub house: Option<House>,
    /// Base maximum speed in pixels per 16 ms.
    pub base_speed: f64,
    /// Time until this entity may reproduce again.
    pub reproduction_cooldown_ms: f64,
    /// Extra capture resistance from rare effects or events.
    pub bonus_resistance: f64,
    /// Converted by a shadow firefly.
    #[serde(default)]
    pub shadow: bool,
}

impl Entity {
    /// Create a freshly born entity with full energy.
    pub fn new(id: EntityId, position: Vec2, digit: Digit, tier: Tier, base_max_age_ms: f64) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
            energy: MAX_ENERGY,
            age_ms: 0.0,
            base_max_age_ms,
            state: LifeState::Birth,
            state_elapsed_ms: 0.0,
            death_cause: None,
            digit,
            tier,
            evolution_progress: 0.0,
            collision_cooldown_ms: 0.0,
            collision_count: 0,
            generation: 0,
            rare: None,
            rare_checked: false,
            genetics: None,
            swarm: None,
            formation: None,
            house: None,
            base_speed: 1.0,
            reproduction_cooldown_ms: 0.0,
            bonus_resistance: 0.0,
            shadow: false,
        }
    }

    // -----------------------------------------------------------------------
    // Energy
    // -----------------------------------------------------------------------

    /// Current energy.
    pub const fn energy(&self) -> f64 {
        self.energy
    }

    /// Set energy, clamped to `[0, 100]`.
    pub fn set_energy(&mut self, value: f64) {
        self.energy = clamp_energy(value);
    }

    /// Add (or subtract) energy, clamped. Returns the change actually applied.
    pub fn add_energy(&mut self, delta: f64) -> f64 {
        let before = self.energy;
        self.energy = clamp_energy(before + delta);
        self.energy - before
    }

    // -----------------------------------------------------------------------
    // Life-state
    // -----------------------------------------------------------------------

    /// Current life-state.
    pub const fn state(&self) -> LifeState {
        self.state
    }

    /// Milliseconds spent in the current life-state.
    pub const fn state_elapsed_ms(&self) -> f64 {
        self.state_elapsed_ms
    }

    /// Advance the age and state timers.
    pub fn advance_time(&mut self, dt_ms: f64) {
        self.age_ms += dt_ms;
        self.state_elapsed_ms += dt_ms;
    }

    /// Move to a later life-state.
    pub fn transition(&mut self, next: LifeState) -> Result<(), TransitionError> {
        if !self.state.can_advance_to(next) {
            return Err(TransitionError::Backward {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.state_elapsed_ms = 0.0;
        Ok(())
    }

    /// Whether the entity is mature.
    pub fn is_mature(&self) -> bool {
        self.state == LifeState::Mature
    }

    /// Whether a death cause has been recorded.
    pub const fn is_doomed(&self) -> bool {
        self.death_cause.is_some()
    }

    /// The recorded death cause, if any.
    pub const fn death_cause(&self) -> Option<DeathCause> {
        self.death_cause
    }

    /// Record a death cause and start dying.
    ///
    /// Returns `false` if a cause was already recorded; the first cause wins.
    pub fn mark_dying(&mut self, cause: DeathCause) -> bool {
        if self.death_cause.is_some() {
            return false;
        }
        self.death_cause = Some(cause);
        if self.state.can_advance_to(LifeState::Dying) {
            self.state = LifeState::Dying;
            self.state_elapsed_ms = 0.0;
        }
        true
    }

    // -----------------------------------------------------------------------
    // Tier
    // -----------------------------------------------------------------------

    /// Current tier.
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Max-age after tier and genetic lifespan multipliers.
    pub fn max_age_ms(&self) -> f64 {
        self.base_max_age_ms * self.tier.life_multiplier() * self.gene(GeneTrait::Lifespan)
    }

    /// Evolve one tier if progress reached the threshold.
    ///
    /// On success the age resets, energy refills, progress clears, and the
    /// `(old, new)` tiers are returned.
    pub fn try_evolve(&mut self) -> Option<(Tier, Tier)> {
        let threshold = self.tier.evolve_threshold()?;
        if self.evolution_progress < threshold {
            return None;
        }
        let next = self.tier.next()?;
        let old = self.tier;
        self.tier = next;
        self.age_ms = 0.0;
        self.energy = MAX_ENERGY;
        self.evolution_progress = 0.0;
        Some((old, next))
    }

    /// Combined capture resistance.
    pub fn resistance(&self) -> f64 {
        (self.tier.resistance() + self.bonus_resistance).min(MAX_RESISTANCE)
    }

    // -----------------------------------------------------------------------
    // Forces
    // -----------------------------------------------------------------------

    /// Accumulate a force for this frame.
    pub fn apply_force(&mut self, force: Vec2) {
        self.force = self.force.plus(force);
    }

    /// The force accumulated so far.
    pub const fn force(&self) -> Vec2 {
        self.force
    }

    /// Scale the accumulated force.
    pub fn scale_force(&mut self, factor: f64) {
        self.force = self.force.scaled(factor);
    }

    /// Take and reset the accumulated force.
    pub fn take_force(&mut self) -> Vec2 {
        std::mem::take(&mut self.force)
    }

    // -----------------------------------------------------------------------
    // Derived values
    // -----------------------------------------------------------------------

    /// Genetic trait value, or the default without genetics.
    pub fn gene(&self, gene: GeneTrait) -> f64 {
        self.genetics
            .as_ref()
            .map_or_else(|| gene.spec().default, |g| g.get(gene))
    }

    /// `(1 - min(remaining life fraction, energy / 100))^2.5`.
    pub fn desperation(&self) -> f64 {
        let max_age = self.max_age_ms();
        let remaining = if max_age > 0.0 {
            (1.0 - self.age_ms / max_age).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let vitality = remaining.min(self.energy / MAX_ENERGY);
        (1.0 - vitality).clamp(0.0, 1.0).powf(2.5)
    }

    /// Whether the entity is desperate enough to seek any collision.
    pub fn is_desperate(&self) -> bool {
        self.is_mature() && self.desperation() > DESPERATION_THRESHOLD
    }

    /// Read-only copy for notifications.
    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            position: self.position,
            state: self.state,
            digit: self.digit,
            tier: self.tier,
            rare: self.rare,
            energy: self.energy,
            age_ms: self.age_ms,
            generation: self.generation,
        }
    }
}

fn clamp_energy(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_ENERGY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> Entity {
        Entity::new(EntityId::new(), Vec2::ZERO, Digit::One, Tier::Basic, 120_000.0)
    }

    #[test]
    fn energy_is_clamped() {
        let mut e = entity();
        let applied = e.add_energy(50.0);
        assert!(applied.abs() < f64::EPSILON);
        assert!((e.energy() - MAX_ENERGY).abs() < f64::EPSILON);
        e.set_energy(-5.0);
        assert!(e.energy().abs() < f64::EPSILON);
        e.set_energy(f64::NAN);
        assert!(e.energy().abs() < f64::EPSILON);
    }

    #[test]
    fn state_never_moves_backward() {
        let mut e = entity();
        assert!(e.transition(LifeState::Mature).is_ok());
        assert!(e.transition(LifeState::Birth).is_err());
        assert_eq!(e.state(), LifeState::Mature);
    }

    #[test]
    fn first_death_cause_wins() {
        let mut e = entity();
        assert!(e.mark_dying(DeathCause::Predator));
        assert!(!e.mark_dying(DeathCause::Natural));
        assert_eq!(e.death_cause(), Some(DeathCause::Predator));
        assert_eq!(e.state(), LifeState::Dying);
    }

    #[test]
    fn evolution_resets_age_and_energy() {
        let mut e = entity();
        e.age_ms = 5_000.0;
        e.set_energy(10.0);
        e.evolution_progress = 3.0;
        let evolved = e.try_evolve();
        assert_eq!(evolved, Some((Tier::Basic, Tier::Charged)));
        assert!(e.age_ms.abs() < f64::EPSILON);
        assert!((e.energy() - MAX_ENERGY).abs() < f64::EPSILON);
        assert!((e.max_age_ms() - 180_000.0).abs() < 1e-6);
    }

    #[test]
    fn desperation_rises_as_energy_falls() {
        let mut e = entity();
        let _ = e.transition(LifeState::Mature);
        assert!(!e.is_desperate());
        e.set_energy(5.0);
        assert!(e.is_desperate());
    }
}

//! Asexual reproduction with genetic inheritance.
//!
//! An eligible parent pays energy to spawn an offspring nearby. The child
//! inherits the parent's digit and a bred genome: the parent's genetics
//! crossed with the nearest mature entity of the same digit, or with
//! itself when no partner is around.

use std::any::Any;

use rand::Rng;
use tracing::debug;

use firefly_types::{BehaviorKind, Entity, EntityId, GeneTrait, Genetics, SpawnOrigin, Tier, Vec2};

use super::{BehaviorContext, BehaviorModule, is_active};
use crate::error::AgentError;
use crate::genetics::breed;
use crate::population::SpawnParams;

/// Minimum energy to reproduce.
pub const MIN_ENERGY: f64 = 85.0;
/// Minimum age to reproduce.
pub const MIN_AGE_MS: f64 = 20_000.0;
/// Energy paid by the parent.
pub const ENERGY_COST: f64 = 60.0;
/// Cooldown before the parent may reproduce again.
pub const COOLDOWN_MS: f64 = 30_000.0;
/// Base per-frame chance for an eligible parent.
pub const BASE_CHANCE: f64 = 0.0002;
/// Share of the parent's remaining energy the child starts with.
const CHILD_ENERGY_SHARE: f64 = 0.4;
/// Distance from the parent where the child appears.
const SPAWN_OFFSET: f64 = 30.0;

/// Whether an entity may reproduce now.
pub fn is_eligible(entity: &Entity) -> bool {
    is_active(entity)
        && entity.energy() >= MIN_ENERGY
        && entity.age_ms >= MIN_AGE_MS
        && entity.tier() >= Tier::Charged
        && entity.reproduction_cooldown_ms <= 0.0
        && entity.swarm.is_none()
        && entity.formation.is_none()
}

/// Reproduction behavior.
#[derive(Debug)]
pub struct ReproductionModule {
    chance: f64,
    births: u64,
}

impl Default for ReproductionModule {
    fn default() -> Self {
        Self::new()
    }
}

impl ReproductionModule {
    /// A module with the default per-frame chance.
    pub const fn new() -> Self {
        Self::with_chance(BASE_CHANCE)
    }

    /// A module with a custom per-frame chance.
    pub const fn with_chance(chance: f64) -> Self {
        Self { chance, births: 0 }
    }

    /// Offspring produced since creation.
    pub const fn births(&self) -> u64 {
        self.births
    }
}

impl BehaviorModule for ReproductionModule {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Reproduction
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        if ctx.population.is_full() {
            return Ok(());
        }

        let parents: Vec<EntityId> = ctx
            .population
            .iter()
            .filter(|e| is_eligible(e))
            .map(|e| e.id)
            .collect();

        for parent_id in parents {
            if ctx.population.is_full() {
                break;
            }
            let Some(parent) = ctx.population.get(parent_id) else {
                continue;
            };
            let chance = (self.chance * ctx.modifiers.spawn_rate * parent.gene(GeneTrait::Fertility))
                .clamp(0.0, 1.0);
            if !ctx.rng.random_bool(chance) {
                continue;
            }

            let parent_genes = parent.genetics.clone().unwrap_or_default();
            let partner_genes: Genetics = ctx
                .population
                .iter()
                .filter(|e| e.id != parent_id && is_active(e) && e.digit == parent.digit)
                .min_by(|a, b| {
                    a.position
                        .distance(parent.position)
                        .total_cmp(&b.position.distance(parent.position))
                })
                .and_then(|e| e.genetics.clone())
                .unwrap_or_else(|| parent_genes.clone());
            let genetics = breed(&parent_genes, &partner_genes, ctx.rng);
            let angle = ctx.rng.random_range(0.0..std::f64::consts::TAU);
            let position = parent.position.plus(Vec2::from_angle(angle).scaled(SPAWN_OFFSET));
            let digit = parent.digit;
            let generation = parent.generation.saturating_add(1);

            let Some(parent) = ctx.population.get_mut(parent_id) else {
                continue;
            };
            parent.add_energy(-ENERGY_COST);
            parent.reproduction_cooldown_ms = COOLDOWN_MS;
            let child_energy = parent.energy() * CHILD_ENERGY_SHARE;

            let params = SpawnParams {
                generation,
                genetics: Some(genetics),
                ..SpawnParams::new(SpawnOrigin::Reproduction)
                    .at(position)
                    .with_digit(digit)
                    .with_energy(child_energy)
            };
            if let Some(child) = ctx.population.spawn(params, ctx.rng, ctx.bus) {
                self.births = self.births.saturating_add(1);
                debug!(parent_id = %parent_id, child_id = %child, generation, "Offspring spawned");
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use firefly_events::EventBus;
    use firefly_types::{Digit, LifeState, Modifiers, Viewport};

    use super::*;
    use crate::config::{CollisionConfig, LifecycleConfig, PopulationConfig};
    use crate::population::PopulationManager;

    fn ready_parent(pop: &mut PopulationManager, rng: &mut StdRng, bus: &mut EventBus) -> EntityId {
        let id = pop
            .spawn(
                SpawnParams {
                    tier: Tier::Charged,
                    genetics: Some(Genetics::neutral()),
                    ..SpawnParams::default().at(Vec2::new(400.0, 300.0)).with_digit(Digit::One)
                },
                rng,
                bus,
            )
            .unwrap_or_default();
        if let Some(e) = pop.get_mut(id) {
            let _ = e.transition(LifeState::Mature);
            e.age_ms = MIN_AGE_MS;
        }
        id
    }

    #[test]
    fn eligibility_requires_charged_tier() {
        let mut e = Entity::new(EntityId::new(), Vec2::ZERO, Digit::One, Tier::Basic, 1e6);
        let _ = e.transition(LifeState::Mature);
        e.age_ms = MIN_AGE_MS;
        assert!(!is_eligible(&e));
    }

    #[test]
    fn certain_reproduction_spawns_child_and_charges_parent() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut bus = EventBus::new();
        let mut pop = PopulationManager::new(
            PopulationConfig::default(),
            LifecycleConfig::default(),
            CollisionConfig::default(),
            Viewport::default(),
        );
        let parent = ready_parent(&mut pop, &mut rng, &mut bus);
        let mut module = ReproductionModule::with_chance(1.0);
        let mut ctx = BehaviorContext {
            dt_ms: 16.0,
            population: &mut pop,
            rng: &mut rng,
            bus: &mut bus,
            modifiers: Modifiers::NEUTRAL,
            pointer: None,
        };
        assert!(module.update(&mut ctx).is_ok());

        assert_eq!(module.births(), 1);
        assert_eq!(pop.len(), 2);
        let parent_energy = pop.get(parent).map_or(0.0, Entity::energy);
        assert!((parent_energy - 40.0).abs() < 1e-9);
        let child = pop.iter().find(|e| e.id != parent);
        assert!(child.is_some_and(|c| c.generation == 1 && c.digit == Digit::One));
        assert!(child.is_some_and(|c| (c.energy() - 16.0).abs() < 1e-9));
    }

    #[test]
    fn no_reproduction_at_capacity() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut bus = EventBus::new();
        let mut pop = PopulationManager::new(
            PopulationConfig {
                initial: 1,
                min: 1,
                max: 1,
            },
            LifecycleConfig::default(),
            CollisionConfig::default(),
            Viewport::default(),
        );
        ready_parent(&mut pop, &mut rng, &mut bus);
        let mut module = ReproductionModule::with_chance(1.0);
        let mut ctx = BehaviorContext {
            dt_ms: 16.0,
            population: &mut pop,
            rng: &mut rng,
            bus: &mut bus,
            modifiers: Modifiers::NEUTRAL,
            pointer: None,
        };
        assert!(module.update(&mut ctx).is_ok());
        assert_eq!(module.births(), 0);
        assert_eq!(pop.len(), 1);
    }
}

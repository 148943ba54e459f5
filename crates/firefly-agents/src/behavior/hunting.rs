//! Predator/prey dynamics between the two digits.
//!
//! Mature Ones chase the nearest mature Zero; Zeros flee threats or drift
//! together. Desperate entities of either digit seek any nearby mature
//! entity, which is how collisions keep happening in a starving population.

use std::any::Any;
use std::collections::BTreeMap;

use firefly_types::{BehaviorKind, Digit, EntityId, Vec2};

use super::{BehaviorContext, BehaviorModule, is_active, nearest, toward};
use crate::error::AgentError;

const CHASE_RADIUS: f64 = 150.0;
const CHASE_FORCE: f64 = 0.03;
const FLEE_FORCE: f64 = 0.05;
const CLUSTER_RADIUS: f64 = 100.0;
const CLUSTER_FORCE: f64 = 0.005;
const DESPERATE_RADIUS: f64 = 300.0;
const DESPERATE_FORCE: f64 = 0.04;
const MAX_HUNGER: f64 = 100.0;
const HUNGER_DECAY_PER_S: f64 = 0.5;
const HUNGER_ON_MERGE: f64 = 50.0;
/// Above this share of Ones, hunters slow down so prey can recover.
const OVERPOPULATION_SHARE: f64 = 0.7;
const OVERPOPULATION_DAMPING: f64 = 0.5;

/// Hunting and fleeing behavior.
#[derive(Debug, Default)]
pub struct HuntingModule {
    hunger: BTreeMap<EntityId, f64>,
    last_seen: BTreeMap<EntityId, (u32, Digit)>,
}

impl HuntingModule {
    /// A module with no hunger recorded.
    pub const fn new() -> Self {
        Self {
            hunger: BTreeMap::new(),
            last_seen: BTreeMap::new(),
        }
    }

    /// Current hunger of a hunter, if tracked.
    pub fn hunger(&self, id: EntityId) -> Option<f64> {
        self.hunger.get(&id).copied()
    }

    fn refresh_hunger(&mut self, ctx: &BehaviorContext<'_>) {
        let decay = HUNGER_DECAY_PER_S * ctx.dt_ms / 1000.0;
        let entities = ctx.population.entities();

        self.hunger.retain(|id, _| entities.iter().any(|e| e.id == *id));
        self.last_seen.retain(|id, _| entities.iter().any(|e| e.id == *id));

        for entity in entities {
            let hunger = self.hunger.entry(entity.id).or_insert(0.0);
            *hunger = (*hunger - decay).max(0.0);

            // A One that collided and is still a One merged with a Zero.
            if let Some(&(count, digit)) = self.last_seen.get(&entity.id)
                && entity.collision_count > count
                && digit == Digit::One
                && entity.digit == Digit::One
            {
                *hunger = (*hunger + HUNGER_ON_MERGE).min(MAX_HUNGER);
            }
            self.last_seen
                .insert(entity.id, (entity.collision_count, entity.digit));
        }
    }
}

impl BehaviorModule for HuntingModule {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Hunting
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        self.refresh_hunger(ctx);

        let entities = ctx.population.entities();
        let active = entities.iter().filter(|e| is_active(e)).count();
        let ones = entities
            .iter()
            .filter(|e| is_active(e) && e.digit == Digit::One)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let ones_share = if active == 0 {
            0.0
        } else {
            ones as f64 / active as f64
        };
        let damping = if ones_share > OVERPOPULATION_SHARE {
            OVERPOPULATION_DAMPING
        } else {
            1.0
        };

        let mut forces: Vec<(usize, Vec2)> = Vec::new();
        for (i, entity) in entities.iter().enumerate() {
            if !is_active(entity) {
                continue;
            }
            let here = entity.position;

            if entity.is_desperate() {
                if let Some((j, _)) = nearest(entities, i, DESPERATE_RADIUS, is_active)
                    && let Some(target) = entities.get(j)
                {
                    let strength = DESPERATE_FORCE * 3.0_f64.mul_add(entity.desperation(), 1.0);
                    forces.push((i, toward(here, target.position, strength)));
                }
                continue;
            }

            match entity.digit {
                Digit::One => {
                    let prey = nearest(entities, i, CHASE_RADIUS, |e| {
                        is_active(e) && e.digit == Digit::Zero
                    });
                    if let Some((j, _)) = prey
                        && let Some(target) = entities.get(j)
                    {
                        let hunger = self.hunger.get(&entity.id).copied().unwrap_or(0.0);
                        let boost = 0.5_f64.mul_add(hunger / MAX_HUNGER, 1.0);
                        let strength = CHASE_FORCE * boost * damping;
                        forces.push((i, toward(here, target.position, strength)));
                    }
                }
                Digit::Zero => {
                    let threat = nearest(entities, i, CHASE_RADIUS, |e| {
                        is_active(e) && e.digit == Digit::One
                    });
                    if let Some((j, _)) = threat
                        && let Some(hunter) = entities.get(j)
                    {
                        forces.push((i, toward(hunter.position, here, FLEE_FORCE)));
                    } else {
                        let (sum, count) = entities
                            .iter()
                            .filter(|e| {
                                e.id != entity.id
                                    && is_active(e)
                                    && e.digit == Digit::Zero
                                    && e.position.distance(here) < CLUSTER_RADIUS
                            })
                            .fold((Vec2::ZERO, 0_u32), |(sum, n), e| {
                                (sum.plus(e.position), n.saturating_add(1))
                            });
                        if count > 0 {
                            let centroid = sum.scaled(1.0 / f64::from(count));
                            forces.push((i, toward(here, centroid, CLUSTER_FORCE)));
                        }
                    }
                }
            }
        }

        let entities = ctx.population.entities_mut();
        for (i, force) in forces {
            if let Some(entity) = entities.get_mut(i) {
                entity.apply_force(force);
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
    use firefly_types::{LifeState, Modifiers, Viewport};

    use super::*;
    use crate::config::{CollisionConfig, LifecycleConfig, PopulationConfig};
    use crate::population::{PopulationManager, SpawnParams};

    fn mature_pair(one_at: Vec2, zero_at: Vec2) -> (PopulationManager, EntityId, EntityId) {
        let mut rng = StdRng::seed_from_u64(11);
        let mut bus = EventBus::new();
        let mut pop = PopulationManager::new(
            PopulationConfig::default(),
            LifecycleConfig::default(),
            CollisionConfig::default(),
            Viewport::default(),
        );
        let one = pop
            .spawn(SpawnParams::default().at(one_at).with_digit(Digit::One), &mut rng, &mut bus)
            .unwrap_or_default();
        let zero = pop
            .spawn(SpawnParams::default().at(zero_at).with_digit(Digit::Zero), &mut rng, &mut bus)
            .unwrap_or_default();
        for e in pop.entities_mut() {
            let _ = e.transition(LifeState::Mature);
        }
        (pop, one, zero)
    }

    #[test]
    fn one_chases_and_zero_flees() {
        let (mut pop, one, zero) = mature_pair(Vec2::new(100.0, 100.0), Vec2::new(200.0, 100.0));
        let mut rng = StdRng::seed_from_u64(1);
        let mut bus = EventBus::new();
        let mut module = HuntingModule::new();
        let mut ctx = BehaviorContext {
            dt_ms: 16.0,
            population: &mut pop,
            rng: &mut rng,
            bus: &mut bus,
            modifiers: Modifiers::NEUTRAL,
            pointer: None,
        };
        assert!(module.update(&mut ctx).is_ok());

        let hunter_force = pop.get(one).map(|e| e.force()).unwrap_or_default();
        let prey_force = pop.get(zero).map(|e| e.force()).unwrap_or_default();
        assert!(hunter_force.x > 0.0);
        assert!(prey_force.x > 0.0);
        assert!(module.hunger(one).is_some());
    }

    #[test]
    fn hunger_is_pruned_when_entities_vanish() {
        let (mut pop, one, _) = mature_pair(Vec2::new(100.0, 100.0), Vec2::new(900.0, 600.0));
        let mut rng = StdRng::seed_from_u64(1);
        let mut bus = EventBus::new();
        let mut module = HuntingModule::new();
        {
            let mut ctx = BehaviorContext {
                dt_ms: 16.0,
                population: &mut pop,
                rng: &mut rng,
                bus: &mut bus,
                modifiers: Modifiers::NEUTRAL,
                pointer: None,
            };
            assert!(module.update(&mut ctx).is_ok());
        }
        assert!(pop.kill(one, firefly_types::DeathCause::Natural));
        for _ in 0..70 {
            pop.tick(16.0, &Modifiers::NEUTRAL, &mut rng, &mut bus);
        }
        let mut ctx = BehaviorContext {
            dt_ms: 16.0,
            population: &mut pop,
            rng: &mut rng,
            bus: &mut bus,
            modifiers: Modifiers::NEUTRAL,
            pointer: None,
        };
        assert!(module.update(&mut ctx).is_ok());
        assert!(module.hunger(one).is_none());
    }
}

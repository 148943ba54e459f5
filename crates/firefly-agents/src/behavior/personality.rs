//! House personalities.
//!
//! Each entity is considered once: with a small chance it joins a house for
//! a while. Houses change maximum speed (applied by the population tick)
//! and add a gentle steering bias here.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use firefly_types::{BehaviorKind, EntityId, House, Vec2};

use super::{BehaviorContext, BehaviorModule, is_active, nearest, toward};
use crate::error::AgentError;

const ASSIGN_CHANCE: f64 = 0.15;
const DOMINANT_WEIGHT: f64 = 0.6;
const HOUSE_DURATION_MS: f64 = 30_000.0;
const BIAS_RADIUS: f64 = 100.0;
const COHESION_FORCE: f64 = 0.01;
const GUARD_FORCE: f64 = 0.01;
const ZIGZAG_FORCE: f64 = 0.02;
const ZIGZAG_PERIOD_MS: f64 = 300.0;
const DRIFT_FORCE: f64 = 0.01;
const AVOID_RADIUS: f64 = 60.0;
const AVOID_FORCE: f64 = 0.02;

/// House assignment and steering bias.
#[derive(Debug, Default)]
pub struct PersonalityModule {
    assigned: BTreeMap<EntityId, f64>,
    considered: BTreeSet<EntityId>,
    dominant: Option<House>,
}

impl PersonalityModule {
    /// A module with no dominant house.
    pub const fn new() -> Self {
        Self {
            assigned: BTreeMap::new(),
            considered: BTreeSet::new(),
            dominant: None,
        }
    }

    /// Bias new assignments toward one house.
    pub const fn set_dominant(&mut self, house: Option<House>) {
        self.dominant = house;
    }

    /// Entities currently in a house.
    pub fn members(&self) -> usize {
        self.assigned.len()
    }

    fn pick_house(&self, rng: &mut impl Rng) -> House {
        if let Some(house) = self.dominant
            && rng.random_bool(DOMINANT_WEIGHT)
        {
            return house;
        }
        House::ALL
            .get(rng.random_range(0..House::ALL.len()))
            .copied()
            .unwrap_or(House::Web)
    }

    fn assign(&mut self, ctx: &mut BehaviorContext<'_>) {
        let live: BTreeSet<EntityId> = ctx.population.iter().map(|e| e.id).collect();
        self.considered.retain(|id| live.contains(id));
        self.assigned.retain(|id, _| live.contains(id));

        let dt = ctx.dt_ms;
        for entity in ctx.population.entities_mut() {
            if let Some(remaining) = self.assigned.get_mut(&entity.id) {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    self.assigned.remove(&entity.id);
                    entity.house = None;
                }
                continue;
            }
            if !self.considered.insert(entity.id) {
                continue;
            }
            if ctx.rng.random_bool(ASSIGN_CHANCE) {
                let house = self.pick_house(ctx.rng);
                entity.house = Some(house);
                self.assigned.insert(entity.id, HOUSE_DURATION_MS);
            }
        }
    }
}

impl BehaviorModule for PersonalityModule {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Personality
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        self.assign(ctx);

        let entities = ctx.population.entities();
        let mut forces: Vec<(usize, Vec2)> = Vec::new();
        for (i, entity) in entities.iter().enumerate() {
            let Some(house) = entity.house else {
                continue;
            };
            if !is_active(entity) {
                continue;
            }
            let here = entity.position;
            let force = match house {
                House::Web => {
                    let (sum, n) = entities
                        .iter()
                        .filter(|e| {
                            e.id != entity.id
                                && e.house == Some(House::Web)
                                && e.position.distance(here) < BIAS_RADIUS
                        })
                        .fold((Vec2::ZERO, 0_u32), |(s, n), e| (s.plus(e.position), n.saturating_add(1)));
                    if n == 0 {
                        Vec2::ZERO
                    } else {
                        toward(here, sum.scaled(1.0 / f64::from(n)), COHESION_FORCE)
                    }
                }
                House::Shield => entities
                    .iter()
                    .filter(|e| e.id != entity.id && is_active(e) && e.position.distance(here) < BIAS_RADIUS)
                    .min_by(|a, b| a.energy().total_cmp(&b.energy()))
                    .map_or(Vec2::ZERO, |weakest| toward(here, weakest.position, GUARD_FORCE)),
                House::Forge => Vec2::ZERO,
                House::Script => {
                    let phase = (entity.age_ms / ZIGZAG_PERIOD_MS).sin().signum();
                    entity.velocity.perpendicular().normalized().scaled(ZIGZAG_FORCE * phase)
                }
                House::Cloud => Vec2::new(0.0, -DRIFT_FORCE),
                House::DarkArts => nearest(entities, i, AVOID_RADIUS, is_active)
                    .and_then(|(j, _)| entities.get(j))
                    .map_or(Vec2::ZERO, |other| toward(other.position, here, AVOID_FORCE)),
            };
            forces.push((i, force));
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

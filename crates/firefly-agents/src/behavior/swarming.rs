//! Temporary flocks.
//!
//! Occasionally a mature entity recruits free neighbours into a swarm. Swarm
//! members steer with the classic separation, alignment and cohesion rules
//! until the swarm's timer runs out or it loses too many members.

use std::any::Any;
use std::collections::BTreeMap;

use rand::Rng;
use tracing::debug;

use firefly_types::{BehaviorKind, EntityId, SwarmId, Vec2};

use super::{BehaviorContext, BehaviorModule, is_active, toward};
use crate::error::AgentError;

const FORMATION_CHANCE: f64 = 0.001;
const MIN_MEMBERS: usize = 4;
const RECRUIT_RADIUS: f64 = 80.0;
const SWARM_DURATION_MS: f64 = 8_000.0;
const SEPARATION_RADIUS: f64 = 25.0;
const ALIGNMENT_RADIUS: f64 = 60.0;
const COHESION_RADIUS: f64 = 80.0;
const SEPARATION_FORCE: f64 = 0.04;
const ALIGNMENT_FORCE: f64 = 0.02;
const COHESION_FORCE: f64 = 0.015;

#[derive(Debug, Clone)]
struct Swarm {
    members: Vec<EntityId>,
    remaining_ms: f64,
}

/// Flocking behavior.
#[derive(Debug, Default)]
pub struct SwarmingModule {
    swarms: BTreeMap<SwarmId, Swarm>,
    formed: u64,
}

impl SwarmingModule {
    /// A module with no swarms.
    pub const fn new() -> Self {
        Self {
            swarms: BTreeMap::new(),
            formed: 0,
        }
    }

    /// Number of live swarms.
    pub fn swarm_count(&self) -> usize {
        self.swarms.len()
    }

    /// Swarms formed since creation.
    pub const fn formed(&self) -> u64 {
        self.formed
    }

    /// Expire timers, drop vanished members, and untag dissolved swarms.
    fn maintain(&mut self, ctx: &mut BehaviorContext<'_>) {
        let dt = ctx.dt_ms;
        let population = &mut *ctx.population;
        let mut dissolved = Vec::new();

        for (id, swarm) in &mut self.swarms {
            swarm.remaining_ms -= dt;
            swarm
                .members
                .retain(|m| population.get(*m).is_some_and(is_active));
            if swarm.remaining_ms <= 0.0 || swarm.members.len() < 2 {
                dissolved.push(*id);
            }
        }

        for id in dissolved {
            if let Some(swarm) = self.swarms.remove(&id) {
                for member in swarm.members {
                    if let Some(entity) = population.get_mut(member) {
                        entity.swarm = None;
                    }
                }
                debug!(swarm_id = %id, "Swarm dissolved");
            }
        }

        // Untag entities whose swarm no longer exists (e.g. they started dying).
        for entity in population.entities_mut() {
            if let Some(id) = entity.swarm
                && (!self.swarms.contains_key(&id) || !is_active(entity))
            {
                entity.swarm = None;
            }
        }
    }

    fn try_form(&mut self, ctx: &mut BehaviorContext<'_>) {
        if !ctx.rng.random_bool(FORMATION_CHANCE) {
            return;
        }
        let entities = ctx.population.entities();
        let free: Vec<usize> = entities
            .iter()
            .enumerate()
            .filter(|(_, e)| is_active(e) && e.swarm.is_none() && e.formation.is_none())
            .map(|(i, _)| i)
            .collect();
        if free.is_empty() {
            return;
        }
        let pick = ctx.rng.random_range(0..free.len());
        let Some(seed) = free.get(pick).and_then(|&i| entities.get(i)) else {
            return;
        };
        let center = seed.position;
        let members: Vec<EntityId> = free
            .iter()
            .filter_map(|&i| entities.get(i))
            .filter(|e| e.position.distance(center) < RECRUIT_RADIUS)
            .map(|e| e.id)
            .collect();
        if members.len() < MIN_MEMBERS {
            return;
        }

        let id = SwarmId::new();
        for member in &members {
            if let Some(entity) = ctx.population.get_mut(*member) {
                entity.swarm = Some(id);
            }
        }
        debug!(swarm_id = %id, members = members.len(), "Swarm formed");
        self.swarms.insert(
            id,
            Swarm {
                members,
                remaining_ms: SWARM_DURATION_MS,
            },
        );
        self.formed = self.formed.saturating_add(1);
    }
}

impl BehaviorModule for SwarmingModule {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Swarming
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        self.maintain(ctx);
        self.try_form(ctx);

        let entities = ctx.population.entities();
        let mut forces: Vec<(usize, Vec2)> = Vec::new();

        for (i, entity) in entities.iter().enumerate() {
            let Some(swarm) = entity.swarm else {
                continue;
            };
            let here = entity.position;
            let mut force = Vec2::ZERO;

            for (j, other) in entities.iter().enumerate() {
                if i == j {
                    continue;
                }
                let d = other.position.distance(here);
                if d < SEPARATION_RADIUS && d > 0.0 {
                    let weight = 1.0 - d / SEPARATION_RADIUS;
                    force = force.plus(toward(other.position, here, SEPARATION_FORCE * weight));
                }
            }

            let mates = entities
                .iter()
                .enumerate()
                .filter(|&(j, e)| j != i && e.swarm == Some(swarm));
            let (mut heading, mut centroid) = (Vec2::ZERO, Vec2::ZERO);
            let (mut aligned, mut cohesive) = (0_u32, 0_u32);
            for (_, mate) in mates {
                let d = mate.position.distance(here);
                if d < ALIGNMENT_RADIUS {
                    heading = heading.plus(mate.velocity);
                    aligned = aligned.saturating_add(1);
                }
                if d < COHESION_RADIUS {
                    centroid = centroid.plus(mate.position);
                    cohesive = cohesive.saturating_add(1);
                }
            }
            if aligned > 0 {
                let desired = heading.scaled(1.0 / f64::from(aligned));
                force = force.plus(desired.minus(entity.velocity).normalized().scaled(ALIGNMENT_FORCE));
            }
            if cohesive > 0 {
                let center = centroid.scaled(1.0 / f64::from(cohesive));
                force = force.plus(toward(here, center, COHESION_FORCE));
            }
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

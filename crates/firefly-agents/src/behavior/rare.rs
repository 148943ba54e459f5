//! Rare variants: golden, diamond, glitch and ancient.
//!
//! Every entity is rolled once when first seen. Old entities can turn
//! ancient later. A low per-frame chance, or an explicit
//! [`RareVariantModule::force_rare`], spawns a brand-new rare entity.

use std::any::Any;
use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, warn};

use firefly_events::{EventBus, EventKind};
use firefly_types::{BehaviorKind, Digit, EntityId, RareVariant, SpawnOrigin, Vec2};

use super::{BehaviorContext, BehaviorModule, is_active};
use crate::error::AgentError;
use crate::population::{PopulationManager, SpawnParams};

const GOLDEN_CHANCE: f64 = 0.02;
const DIAMOND_CHANCE: f64 = 0.02;
const GLITCH_CHANCE: f64 = 0.01;
const ANCIENT_AGE_MS: f64 = 60_000.0;
const ANCIENT_CHANCE: f64 = 0.001;
/// Default per-frame chance of spawning a fresh rare entity.
pub const DEFAULT_SPAWN_CHANCE: f64 = 0.0001;
/// Capture resistance granted to diamond entities.
pub const DIAMOND_RESISTANCE: f64 = 0.7;
const AURA_RADIUS: f64 = 80.0;
const GOLDEN_ENERGY_PER_FRAME: f64 = 0.05;
const ANCIENT_PROGRESS_PER_FRAME: f64 = 0.001;
const GLITCH_TELEPORT_CHANCE: f64 = 0.003;
const GLITCH_JUMP: f64 = 200.0;

/// Rare variant tagging, spawning and effects.
#[derive(Debug)]
pub struct RareVariantModule {
    spawn_chance: f64,
    spawned: BTreeMap<RareVariant, u64>,
}

impl Default for RareVariantModule {
    fn default() -> Self {
        Self::new(DEFAULT_SPAWN_CHANCE)
    }
}

impl RareVariantModule {
    /// A module with the given per-frame spawn chance.
    pub const fn new(spawn_chance: f64) -> Self {
        Self {
            spawn_chance,
            spawned: BTreeMap::new(),
        }
    }

    /// Rare tags handed out per variant.
    pub const fn spawned(&self) -> &BTreeMap<RareVariant, u64> {
        &self.spawned
    }

    /// Spawn a new entity carrying `variant`.
    ///
    /// Returns `None` if the population is at capacity.
    pub fn force_rare(
        &mut self,
        variant: RareVariant,
        population: &mut PopulationManager,
        rng: &mut impl Rng,
        bus: &mut EventBus,
    ) -> Option<EntityId> {
        let (min, max) = population.viewport().inner_bounds(0.8);
        let position = Vec2::new(
            rng.random_range(min.x..=max.x),
            rng.random_range(min.y..=max.y),
        );
        let mut params = SpawnParams::new(SpawnOrigin::Rare).at(position);
        params.rare = Some(variant);
        if let Some(digit) = variant.required_digit() {
            params.digit = Some(digit);
        }

        let Some(id) = population.spawn(params, rng, bus) else {
            warn!(variant = variant.name(), "Rare spawn rejected: population at capacity");
            return None;
        };
        self.tag(id, variant, population, bus);
        Some(id)
    }

    fn tag(
        &mut self,
        id: EntityId,
        variant: RareVariant,
        population: &mut PopulationManager,
        bus: &mut EventBus,
    ) {
        let Some(entity) = population.get_mut(id) else {
            return;
        };
        entity.rare = Some(variant);
        entity.rare_checked = true;
        if variant == RareVariant::Diamond {
            entity.bonus_resistance = entity.bonus_resistance.max(DIAMOND_RESISTANCE);
        }
        let snapshot = entity.snapshot();
        let count = self.spawned.entry(variant).or_insert(0);
        *count = count.saturating_add(1);
        debug!(entity_id = %id, variant = variant.name(), "Rare variant appeared");
        bus.emit(EventKind::RareSpawn {
            entity: snapshot,
            variant,
        });
    }

    fn roll_new(&mut self, ctx: &mut BehaviorContext<'_>) {
        let mut tagged: Vec<(EntityId, RareVariant)> = Vec::new();
        for entity in ctx.population.entities_mut() {
            if entity.is_doomed() {
                continue;
            }
            if !entity.rare_checked {
                entity.rare_checked = true;
                let variant = if entity.digit == Digit::One && ctx.rng.random_bool(GOLDEN_CHANCE) {
                    Some(RareVariant::Golden)
                } else if entity.digit == Digit::Zero && ctx.rng.random_bool(DIAMOND_CHANCE) {
                    Some(RareVariant::Diamond)
                } else if ctx.rng.random_bool(GLITCH_CHANCE) {
                    Some(RareVariant::Glitch)
                } else {
                    None
                };
                if let Some(variant) = variant {
                    tagged.push((entity.id, variant));
                }
            } else if entity.rare.is_none()
                && entity.is_mature()
                && entity.age_ms > ANCIENT_AGE_MS
                && ctx.rng.random_bool(ANCIENT_CHANCE)
            {
                tagged.push((entity.id, RareVariant::Ancient));
            }
        }
        for (id, variant) in tagged {
            self.tag(id, variant, ctx.population, ctx.bus);
        }
    }

    fn apply_effects(ctx: &mut BehaviorContext<'_>) {
        let entities = ctx.population.entities();
        let auras: Vec<(RareVariant, EntityId, Vec2)> = entities
            .iter()
            .filter(|e| is_active(e))
            .filter_map(|e| e.rare.map(|r| (r, e.id, e.position)))
            .collect();
        let energy_gain = GOLDEN_ENERGY_PER_FRAME * ctx.step() * ctx.modifiers.energy;
        let progress_gain = ANCIENT_PROGRESS_PER_FRAME * ctx.step();
        let viewport = ctx.population.viewport();

        for (variant, source, center) in auras {
            match variant {
                RareVariant::Golden => {
                    for other in ctx.population.entities_mut() {
                        if other.id != source && is_active(other) && other.position.distance(center) < AURA_RADIUS {
                            other.add_energy(energy_gain);
                        }
                    }
                }
                RareVariant::Ancient => {
                    for other in ctx.population.entities_mut() {
                        if other.id != source && is_active(other) && other.position.distance(center) < AURA_RADIUS {
                            other.evolution_progress += progress_gain;
                        }
                    }
                }
                RareVariant::Glitch => {
                    if ctx.rng.random_bool(GLITCH_TELEPORT_CHANCE) {
                        let angle = ctx.rng.random_range(0.0..std::f64::consts::TAU);
                        let target = viewport.clamp(center.plus(Vec2::from_angle(angle).scaled(GLITCH_JUMP)));
                        ctx.population.teleport(source, target);
                    }
                }
                RareVariant::Diamond => {}
            }
        }
    }
}

impl BehaviorModule for RareVariantModule {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::RareVariants
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        self.roll_new(ctx);

        let chance = (self.spawn_chance * ctx.modifiers.spawn_rate).clamp(0.0, 1.0);
        if !ctx.population.is_full() && ctx.rng.random_bool(chance) {
            let variant = RareVariant::ALL
                .get(ctx.rng.random_range(0..RareVariant::ALL.len()))
                .copied()
                .unwrap_or(RareVariant::Glitch);
            self.force_rare(variant, ctx.population, ctx.rng, ctx.bus);
        }

        Self::apply_effects(ctx);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//! The Resource Manager: spawns, updates, applies and retires resources.
//!
//! One [`ResourceManager::tick`] per frame:
//!
//! 1. every resource runs its own `update`;
//! 2. sanctuaries push hazards back out of their radius;
//! 3. every resource declares its [`Effect`]s on every live entity;
//! 4. shields (sanctuaries and tool zones) are collected first, then the
//!    remaining effects are applied through the population's entry points;
//! 5. expended resources retire, taking a portal's partner with them;
//! 6. each enabled kind below its cap, past its ecosystem-age and
//!    population gates and off cooldown, rolls its spawn chance.
//!
//! Hazards never remove an entity directly: a successful capture or
//! consumption calls [`PopulationManager::kill`], the single removal path.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use firefly_agents::PopulationManager;
use firefly_events::{EventBus, EventKind};
use firefly_types::{
    DeathCause, EntityId, Modifiers, ResourceId, ResourceKind, ResourceState, ResourceVariant,
    Tier, Vec2, Viewport,
};

use crate::config::{KindSettings, ResourcesConfig};
use crate::error::WorldError;
use crate::resource::{
    BlackHole, Effect, EnergyWell, Notice, Occupant, Parasite, Portal, PredatorStar, ResourceEnv,
    Sanctuary, ShadowFirefly, VoidSerpent, WorldResource, black_hole,
};
use crate::tools::ShieldZone;

/// Fraction of the viewport, centred, in which resources are placed.
pub const PLACEMENT_FRACTION: f64 = 0.6;

/// Preferred minimum distance between the two ends of a portal pair.
const PORTAL_MIN_SEPARATION: f64 = 200.0;

/// Placement attempts when looking for separated portal ends.
const PORTAL_PLACEMENT_ATTEMPTS: usize = 8;

/// Per-frame input to [`ResourceManager::tick`].
#[derive(Debug)]
pub struct ResourceTick<'a> {
    /// Elapsed milliseconds.
    pub dt_ms: f64,
    /// The entity arena.
    pub population: &'a mut PopulationManager,
    /// Shared random source.
    pub rng: &'a mut StdRng,
    /// Notification bus.
    pub bus: &'a mut EventBus,
    /// Combined cosmic modifiers.
    pub modifiers: Modifiers,
    /// Shield zones placed by player tools.
    pub shields: &'a [ShieldZone],
    /// Multiplier on well regeneration.
    pub regen_multiplier: f64,
}

/// What happened during one [`ResourceManager::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceReport {
    /// Resources spawned by the probabilistic check.
    pub spawned: usize,
    /// Resources retired.
    pub retired: usize,
    /// Successful captures.
    pub captures: usize,
    /// Captures resisted or blocked.
    pub escapes: usize,
    /// Teleports performed.
    pub teleports: usize,
    /// Entities swallowed by black holes or serpents.
    pub consumed: usize,
    /// Entities converted into shadows.
    pub conversions: usize,
    /// Parasite drain ticks applied.
    pub drains: usize,
}

/// Owns every active resource and hazard.
#[derive(Debug)]
pub struct ResourceManager {
    resources: Vec<Box<dyn WorldResource>>,
    settings: BTreeMap<ResourceKind, KindSettings>,
    viewport: Viewport,
    elapsed_ms: f64,
    cooldowns: BTreeMap<ResourceKind, f64>,
    total_spawned: u64,
    total_captures: u64,
    total_consumed: u64,
    total_conversions: u64,
    total_drained: f64,
}

impl ResourceManager {
    /// Create an empty manager with spawn rules from `config`.
    pub fn new(config: &ResourcesConfig, viewport: Viewport) -> Self {
        let settings: BTreeMap<ResourceKind, KindSettings> = ResourceKind::ALL
            .iter()
            .map(|&kind| (kind, config.settings(kind)))
            .collect();
        let cooldowns = settings
            .iter()
            .filter(|(_, s)| s.spawn_cooldown_ms > 0.0)
            .map(|(&kind, s)| (kind, s.spawn_cooldown_ms / 2.0))
            .collect();
        Self {
            resources: Vec::new(),
            settings,
            viewport,
            elapsed_ms: 0.0,
            cooldowns,
            total_spawned: 0,
            total_captures: 0,
            total_consumed: 0,
            total_conversions: 0,
            total_drained: 0.0,
        }
    }

    // -----------------------------------------------------------------------
    // Spawning and retirement
    // -----------------------------------------------------------------------

    /// Spawn a resource of `kind`, optionally of a specific variant.
    ///
    /// Returns `None` (logged at warn) when the kind is disabled, at
    /// capacity, or the variant does not match. Portals spawn as a pair and
    /// the first end's id is returned.
    pub fn spawn_resource(
        &mut self,
        kind: ResourceKind,
        variant: Option<ResourceVariant>,
        rng: &mut impl Rng,
        bus: &mut EventBus,
    ) -> Option<ResourceId> {
        match self.try_spawn_resource(kind, variant, rng, bus) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(kind = kind.name(), error = %err, "Resource spawn rejected");
                None
            }
        }
    }

    /// Spawn a resource, reporting why a spawn was rejected.
    pub fn try_spawn_resource(
        &mut self,
        kind: ResourceKind,
        variant: Option<ResourceVariant>,
        rng: &mut impl Rng,
        bus: &mut EventBus,
    ) -> Result<ResourceId, WorldError> {
        let settings = self
            .settings
            .get(&kind)
            .ok_or(WorldError::KindDisabled(kind))?;
        if !settings.enabled {
            return Err(WorldError::KindDisabled(kind));
        }
        let max = settings.max_count;
        if self.count(kind) >= max {
            return Err(WorldError::AtCapacity { kind, max });
        }
        let variant = match variant {
            Some(v) if v.kind() != kind => {
                return Err(WorldError::VariantMismatch { kind, variant: v });
            }
            Some(v) => v,
            None => {
                if settings.variants.is_empty() {
                    return Err(WorldError::NoVariants(kind));
                }
                let index = rng.random_range(0..settings.variants.len());
                settings
                    .variants
                    .get(index)
                    .copied()
                    .ok_or(WorldError::NoVariants(kind))?
            }
        };

        let spawned: Vec<Box<dyn WorldResource>> = match variant {
            ResourceVariant::Well(v) => vec![boxed(EnergyWell::new(v, self.place(rng)))],
            ResourceVariant::Predator(v) => vec![boxed(PredatorStar::new(v, self.place(rng)))],
            ResourceVariant::Sanctuary(v) => vec![boxed(Sanctuary::new(v, self.place(rng)))],
            ResourceVariant::Portal => {
                let position = self.place(rng);
                let other = self.place_apart(position, rng);
                let (a, b) = Portal::pair(position, other);
                vec![boxed(a), boxed(b)]
            }
            ResourceVariant::BlackHole => vec![boxed(BlackHole::new(self.anchor()))],
            ResourceVariant::Shadow => vec![boxed(ShadowFirefly::new(self.place_anywhere(rng)))],
            ResourceVariant::Serpent => vec![boxed(VoidSerpent::from_edge(self.viewport, rng))],
            ResourceVariant::Parasite => vec![boxed(Parasite::new(self.place_anywhere(rng)))],
        };

        let mut first = None;
        for resource in spawned {
            let id = resource.id();
            let at = resource.position();
            first.get_or_insert(id);
            debug!(resource_id = %id, variant = ?variant, "Resource spawned");
            bus.emit(EventKind::ResourceSpawned {
                resource: id,
                variant,
                position: at,
            });
            if let ResourceVariant::Predator(predator) = variant {
                bus.emit(EventKind::PredatorSpawn {
                    resource: id,
                    variant: predator,
                    position: at,
                });
            }
            self.resources.push(resource);
            self.total_spawned = self.total_spawned.saturating_add(1);
        }
        first.ok_or(WorldError::NoVariants(kind))
    }

    /// Retire a resource now. A portal takes its partner with it.
    pub fn despawn(&mut self, id: ResourceId, bus: &mut EventBus) -> Result<ResourceVariant, WorldError> {
        let resource = self
            .resources
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(WorldError::ResourceNotFound(id))?;
        let variant = resource.variant();
        resource.expire();
        let _ = self.retire_expended(bus);
        Ok(variant)
    }

    fn retire_expended(&mut self, bus: &mut EventBus) -> usize {
        let partners: BTreeSet<ResourceId> = self
            .resources
            .iter()
            .filter(|r| r.state() == ResourceState::Expended)
            .filter_map(|r| r.partner())
            .collect();
        for resource in &mut self.resources {
            if partners.contains(&resource.id()) {
                resource.expire();
            }
        }

        let (retired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.resources)
            .into_iter()
            .partition(|r| r.state() == ResourceState::Expended);
        self.resources = kept;

        for resource in &retired {
            debug!(resource_id = %resource.id(), variant = ?resource.variant(), "Resource retired");
            bus.emit(EventKind::ResourceRetired {
                resource: resource.id(),
                variant: resource.variant(),
            });
        }
        retired.len()
    }

    fn place(&self, rng: &mut impl Rng) -> Vec2 {
        let (min, max) = self.viewport.inner_bounds(PLACEMENT_FRACTION);
        Vec2::new(uniform(rng, min.x, max.x), uniform(rng, min.y, max.y))
    }

    fn place_anywhere(&self, rng: &mut impl Rng) -> Vec2 {
        Vec2::new(
            uniform(rng, 0.0, self.viewport.width),
            uniform(rng, 0.0, self.viewport.height),
        )
    }

    fn anchor(&self) -> Vec2 {
        let (x, y) = black_hole::ANCHOR;
        Vec2::new(self.viewport.width * x, self.viewport.height * y)
    }

    fn place_apart(&self, from: Vec2, rng: &mut impl Rng) -> Vec2 {
        let mut candidate = self.place(rng);
        for _ in 1..PORTAL_PLACEMENT_ATTEMPTS {
            if candidate.distance(from) >= PORTAL_MIN_SEPARATION {
                break;
            }
            candidate = self.place(rng);
        }
        candidate
    }

    // -----------------------------------------------------------------------
    // Per-frame update
    // -----------------------------------------------------------------------

    /// Update resources, apply their effects, retire and spawn.
    pub fn tick(&mut self, ctx: &mut ResourceTick<'_>) -> ResourceReport {
        let mut report = ResourceReport::default();
        self.elapsed_ms += ctx.dt_ms;
        let occupants: Vec<Occupant> = ctx
            .population
            .iter()
            .filter(|e| !e.is_doomed())
            .map(Occupant::of)
            .collect();

        self.update_all(ctx, &occupants);
        self.repel_hazards(ctx.dt_ms);
        self.apply_effects(ctx, &occupants, &mut report);

        report.retired = self.retire_expended(ctx.bus);
        report.spawned = self.spawn_check(ctx, occupants.len());
        report
    }

    fn update_all(&mut self, ctx: &mut ResourceTick<'_>, occupants: &[Occupant]) {
        let hosts: Vec<EntityId> = self.resources.iter().filter_map(|r| r.host()).collect();
        let mut env = ResourceEnv {
            dt_ms: ctx.dt_ms,
            occupants,
            viewport: self.viewport,
            rng: &mut *ctx.rng,
            regen_multiplier: ctx.regen_multiplier,
            hosts: &hosts,
        };
        for resource in &mut self.resources {
            if resource.update(&mut env) == Some(Notice::Repelled) {
                debug!(resource_id = %resource.id(), variant = ?resource.variant(), "Hazard driven off by a crowd");
                ctx.bus.emit(EventKind::PredatorRepelled {
                    resource: resource.id(),
                    entity: None,
                });
            }
        }
    }

    fn repel_hazards(&mut self, dt_ms: f64) {
        let step = dt_ms / firefly_agents::population::REFERENCE_FRAME_MS;
        let havens: Vec<(Vec2, f64, f64)> = self
            .resources
            .iter()
            .filter_map(|r| {
                r.hazard_repulsion()
                    .map(|force| (r.position(), r.effect_radius(), force))
            })
            .collect();
        if havens.is_empty() {
            return;
        }
        for resource in &mut self.resources {
            if !resource.kind().is_hazard() {
                continue;
            }
            for &(center, radius, force) in &havens {
                let offset = resource.position().minus(center);
                if offset.length() < radius {
                    let direction = if offset.length() > f64::EPSILON {
                        offset.normalized()
                    } else {
                        Vec2::new(1.0, 0.0)
                    };
                    resource.push(direction.scaled(force * step));
                }
            }
        }
    }

    fn apply_effects(
        &mut self,
        ctx: &mut ResourceTick<'_>,
        occupants: &[Occupant],
        report: &mut ResourceReport,
    ) {
        let mut declared: Vec<(usize, EntityId, Effect)> = Vec::new();
        let mut buffer = Vec::new();
        for (index, resource) in self.resources.iter_mut().enumerate() {
            for occupant in occupants {
                buffer.clear();
                resource.effects_for(occupant, ctx.dt_ms, &mut buffer);
                declared.extend(buffer.iter().map(|&effect| (index, occupant.id, effect)));
            }
        }

        let mut shielded: BTreeSet<EntityId> = declared
            .iter()
            .filter(|(_, _, effect)| *effect == Effect::Shield)
            .map(|&(_, id, _)| id)
            .collect();
        shielded.extend(
            occupants
                .iter()
                .filter(|o| ctx.shields.iter().any(|z| z.covers(o.position)))
                .map(|o| o.id),
        );

        for (index, entity, effect) in declared {
            match effect {
                Effect::Attract(force) => {
                    let _ = ctx
                        .population
                        .apply_force(entity, force.scaled(ctx.modifiers.gravity));
                }
                Effect::Energize(amount) => {
                    let _ = ctx
                        .population
                        .add_energy(entity, amount * ctx.modifiers.energy);
                }
                Effect::Teleport(to) => {
                    if self.teleport(index, entity, to, ctx) {
                        report.teleports = report.teleports.saturating_add(1);
                    }
                }
                Effect::Capture => {
                    if self.capture(index, entity, shielded.contains(&entity), ctx) {
                        report.captures = report.captures.saturating_add(1);
                    } else {
                        report.escapes = report.escapes.saturating_add(1);
                    }
                }
                Effect::Consume => {
                    if self.consume(index, entity, shielded.contains(&entity), ctx) {
                        report.consumed = report.consumed.saturating_add(1);
                    }
                }
                Effect::Drain(amount) => {
                    if ctx.population.add_energy(entity, -amount).is_some() {
                        self.total_drained += amount;
                        report.drains = report.drains.saturating_add(1);
                    }
                }
                Effect::Corrupt => {
                    if self.corrupt(index, entity, shielded.contains(&entity), ctx) {
                        report.conversions = report.conversions.saturating_add(1);
                    }
                }
                Effect::Shield => {}
            }
        }
    }

    fn teleport(&mut self, index: usize, entity: EntityId, to: Vec2, ctx: &mut ResourceTick<'_>) -> bool {
        let Some(from) = ctx.population.teleport(entity, to) else {
            return false;
        };
        let partner = self.resources.get(index).and_then(|r| r.partner());
        if let Some(partner) = partner
            && let Some(exit) = self.resources.iter_mut().find(|r| r.id() == partner)
        {
            exit.on_arrival(entity);
        }
        debug!(entity_id = %entity, "Entity teleported");
        ctx.bus.emit(EventKind::Teleport { entity, from, to });
        true
    }

    fn capture(
        &mut self,
        index: usize,
        entity: EntityId,
        shielded: bool,
        ctx: &mut ResourceTick<'_>,
    ) -> bool {
        let Some(resource) = self.resources.get_mut(index) else {
            return false;
        };
        let resource_id = resource.id();
        let ResourceVariant::Predator(variant) = resource.variant() else {
            return false;
        };

        if shielded {
            resource.on_capture(entity, false);
            debug!(resource_id = %resource_id, entity_id = %entity, "Capture blocked by shield");
            ctx.bus.emit(EventKind::PredatorRepelled {
                resource: resource_id,
                entity: Some(entity),
            });
            return false;
        }

        let Some(target) = ctx.population.get(entity) else {
            resource.on_capture(entity, false);
            return false;
        };
        let chance = (1.0 - target.resistance()).clamp(0.0, 1.0);
        let cause = if target.tier() == Tier::Ascended {
            DeathCause::Sacrifice
        } else {
            DeathCause::Predator
        };
        let captured = ctx.rng.random_bool(chance) && ctx.population.kill(entity, cause);
        resource.on_capture(entity, captured);

        if captured {
            self.total_captures = self.total_captures.saturating_add(1);
            debug!(resource_id = %resource_id, entity_id = %entity, cause = cause.as_str(), "Entity captured");
            ctx.bus.emit(EventKind::PredatorKill {
                resource: resource_id,
                variant,
                victim: entity,
            });
        } else {
            debug!(resource_id = %resource_id, entity_id = %entity, "Capture resisted");
        }
        captured
    }

    fn consume(
        &mut self,
        index: usize,
        entity: EntityId,
        shielded: bool,
        ctx: &mut ResourceTick<'_>,
    ) -> bool {
        let Some(resource) = self.resources.get_mut(index) else {
            return false;
        };
        let resource_id = resource.id();
        let variant = resource.variant();
        let cause = match ctx.population.get(entity) {
            Some(target) if !shielded => {
                if target.tier() == Tier::Ascended {
                    DeathCause::Sacrifice
                } else {
                    DeathCause::Consumed
                }
            }
            _ => {
                resource.on_capture(entity, false);
                return false;
            }
        };
        let consumed = ctx.population.kill(entity, cause);
        resource.on_capture(entity, consumed);
        if consumed {
            self.total_consumed = self.total_consumed.saturating_add(1);
            debug!(resource_id = %resource_id, entity_id = %entity, variant = ?variant, cause = cause.as_str(), "Entity consumed");
            ctx.bus.emit(EventKind::HazardKill {
                resource: resource_id,
                variant,
                victim: entity,
                cause,
            });
        }
        consumed
    }

    fn corrupt(
        &mut self,
        index: usize,
        entity: EntityId,
        shielded: bool,
        ctx: &mut ResourceTick<'_>,
    ) -> bool {
        let Some(resource) = self.resources.get_mut(index) else {
            return false;
        };
        let converted = !shielded && ctx.population.corrupt(entity);
        resource.on_capture(entity, converted);
        if converted {
            self.total_conversions = self.total_conversions.saturating_add(1);
            ctx.bus.emit(EventKind::Corruption {
                resource: resource.id(),
                entity,
            });
        }
        converted
    }

    fn spawn_check(&mut self, ctx: &mut ResourceTick<'_>, live: usize) -> usize {
        let mut spawned: usize = 0;
        for kind in ResourceKind::ALL {
            let Some(settings) = self.settings.get(&kind) else {
                continue;
            };
            if !settings.enabled
                || self.elapsed_ms < settings.min_ecosystem_age_ms
                || live < settings.min_population
            {
                continue;
            }
            let chance = (settings.spawn_chance * ctx.modifiers.spawn_rate).clamp(0.0, 1.0);
            if let Some(cooldown) = self.cooldowns.get_mut(&kind) {
                *cooldown = (*cooldown - ctx.dt_ms).max(0.0);
                if *cooldown > 0.0 {
                    continue;
                }
            }
            if self.count(kind) >= settings.max_count {
                continue;
            }
            let reset = settings.spawn_cooldown_ms;
            if chance > 0.0
                && ctx.rng.random_bool(chance)
                && self
                    .try_spawn_resource(kind, None, &mut *ctx.rng, ctx.bus)
                    .is_ok()
            {
                spawned = spawned.saturating_add(1);
                if let Some(cooldown) = self.cooldowns.get_mut(&kind) {
                    *cooldown = reset;
                }
            }
        }
        spawned
    }

    // -----------------------------------------------------------------------
    // Settings and queries
    // -----------------------------------------------------------------------

    /// Change a kind's cap. Existing resources are kept; only future spawns
    /// are gated by the new value.
    pub fn set_max_count(&mut self, kind: ResourceKind, max_count: usize) {
        let active = self.count(kind);
        if let Some(settings) = self.settings.get_mut(&kind) {
            debug!(kind = kind.name(), max_count, active, "Resource cap changed");
            settings.max_count = max_count;
        }
    }

    /// Enable or disable spawning of a kind.
    pub fn set_enabled(&mut self, kind: ResourceKind, enabled: bool) {
        if let Some(settings) = self.settings.get_mut(&kind) {
            settings.enabled = enabled;
        }
    }

    /// Current spawn rules of a kind.
    pub fn settings(&self, kind: ResourceKind) -> Option<&KindSettings> {
        self.settings.get(&kind)
    }

    /// Active count of a kind. Portal pairs count once.
    pub fn count(&self, kind: ResourceKind) -> usize {
        let ends = self.resources.iter().filter(|r| r.kind() == kind).count();
        if kind == ResourceKind::Portal {
            ends.div_ceil(2)
        } else {
            ends
        }
    }

    /// Active counts of every kind.
    pub fn counts(&self) -> BTreeMap<ResourceKind, usize> {
        ResourceKind::ALL
            .iter()
            .map(|&kind| (kind, self.count(kind)))
            .collect()
    }

    /// Look up a resource.
    pub fn get(&self, id: ResourceId) -> Option<&dyn WorldResource> {
        self.resources
            .iter()
            .find(|r| r.id() == id)
            .map(|r| &**r)
    }

    /// Iterate active resources.
    pub fn iter(&self) -> impl Iterator<Item = &dyn WorldResource> {
        self.resources.iter().map(|r| &**r)
    }

    /// Whether any active sanctuary or `extra` zone protects `point`.
    pub fn is_protected(&self, point: Vec2, extra: &[ShieldZone]) -> bool {
        extra.iter().any(|z| z.covers(point))
            || self
                .resources
                .iter()
                .any(|r| r.kind() == ResourceKind::Sanctuary && r.contains(point))
    }

    /// Number of active resource objects (each portal end counts).
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resources are active.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources ever spawned.
    pub const fn total_spawned(&self) -> u64 {
        self.total_spawned
    }

    /// Successful captures ever.
    pub const fn total_captures(&self) -> u64 {
        self.total_captures
    }

    /// Entities swallowed by hazards ever.
    pub const fn total_consumed(&self) -> u64 {
        self.total_consumed
    }

    /// Entities converted into shadows ever.
    pub const fn total_conversions(&self) -> u64 {
        self.total_conversions
    }

    /// Energy parasites have drained ever.
    pub const fn total_drained(&self) -> f64 {
        self.total_drained
    }

    /// Milliseconds of simulated time the manager has seen.
    pub const fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Simulation bounds used for placement.
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Change the placement bounds.
    pub const fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Drop every resource without notifications (teardown).
    pub fn clear(&mut self) {
        self.resources.clear();
    }
}

fn boxed<R: WorldResource + 'static>(resource: R) -> Box<dyn WorldResource> {
    Box::new(resource)
}

fn uniform(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    if high > low {
        rng.random_range(low..high)
    } else {
        low
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use firefly_agents::{CollisionConfig, LifecycleConfig, PopulationConfig, SpawnParams};
    use firefly_types::{Digit, LifeState, PredatorVariant, SpawnOrigin, WellVariant};
    use rand::SeedableRng;

    use super::*;
    use crate::tools::ShieldZone;

    fn manager() -> ResourceManager {
        ResourceManager::new(&ResourcesConfig::default(), Viewport::new(1000.0, 1000.0))
    }

    fn population() -> PopulationManager {
        PopulationManager::new(
            PopulationConfig::default(),
            LifecycleConfig::default(),
            CollisionConfig::default(),
            Viewport::new(1000.0, 1000.0),
        )
    }

    fn mature(
        population: &mut PopulationManager,
        params: SpawnParams,
        rng: &mut StdRng,
        bus: &mut EventBus,
    ) -> EntityId {
        let Some(id) = population.spawn(params, rng, bus) else {
            panic!("population should have room");
        };
        let Some(entity) = population.get_mut(id) else {
            panic!("entity was just spawned");
        };
        entity.velocity = Vec2::ZERO;
        assert!(entity.transition(LifeState::Mature).is_ok());
        id
    }

    struct Frame<'a> {
        population: &'a mut PopulationManager,
        rng: &'a mut StdRng,
        bus: &'a mut EventBus,
        shields: &'a [ShieldZone],
    }

    impl Frame<'_> {
        fn run(&mut self, resources: &mut ResourceManager, dt_ms: f64) -> ResourceReport {
            resources.tick(&mut ResourceTick {
                dt_ms,
                population: &mut *self.population,
                rng: &mut *self.rng,
                bus: &mut *self.bus,
                modifiers: Modifiers::NEUTRAL,
                shields: self.shields,
                regen_multiplier: 1.0,
            })
        }
    }

    fn only(kind: ResourceKind) -> ResourceManager {
        let mut resources = manager();
        for other in ResourceKind::ALL {
            resources.set_enabled(other, other == kind);
        }
        resources
    }

    #[test]
    fn spawns_inside_inner_sixty_percent() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut bus = EventBus::new();
        let mut resources = manager();
        resources.set_max_count(ResourceKind::EnergyWell, 100);
        for _ in 0..50 {
            let _ = resources.spawn_resource(ResourceKind::EnergyWell, None, &mut rng, &mut bus);
        }
        assert_eq!(resources.count(ResourceKind::EnergyWell), 50);
        for resource in resources.iter() {
            let p = resource.position();
            assert!((200.0..=800.0).contains(&p.x) && (200.0..=800.0).contains(&p.y));
        }
    }

    #[test]
    fn spawn_at_capacity_returns_none() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut bus = EventBus::new();
        let mut resources = manager();
        for _ in 0..2 {
            assert!(resources
                .spawn_resource(ResourceKind::PredatorStar, None, &mut rng, &mut bus)
                .is_some());
        }
        assert!(resources
            .spawn_resource(ResourceKind::PredatorStar, None, &mut rng, &mut bus)
            .is_none());
        assert!(matches!(
            resources.try_spawn_resource(ResourceKind::PredatorStar, None, &mut rng, &mut bus),
            Err(WorldError::AtCapacity { max: 2, .. })
        ));
    }

    #[test]
    fn variant_must_match_kind() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut bus = EventBus::new();
        let mut resources = manager();
        let wrong = Some(ResourceVariant::Well(WellVariant::Ancient));
        assert!(matches!(
            resources.try_spawn_resource(ResourceKind::PredatorStar, wrong, &mut rng, &mut bus),
            Err(WorldError::VariantMismatch { .. })
        ));
        let nova = Some(ResourceVariant::Predator(PredatorVariant::Nova));
        assert!(resources
            .spawn_resource(ResourceKind::PredatorStar, nova, &mut rng, &mut bus)
            .is_some());
    }

    #[test]
    fn portal_pairs_count_once_and_retire_together() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut bus = EventBus::new();
        let mut resources = manager();
        let id = resources.spawn_resource(ResourceKind::Portal, None, &mut rng, &mut bus);
        assert_eq!(resources.len(), 2);
        assert_eq!(resources.count(ResourceKind::Portal), 1);

        let Some(id) = id else {
            panic!("portal pair should spawn");
        };
        assert!(resources.despawn(id, &mut bus).is_ok());
        assert!(resources.is_empty());
        assert!(matches!(
            resources.despawn(id, &mut bus),
            Err(WorldError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn shrinking_cap_keeps_existing_resources() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut bus = EventBus::new();
        let mut resources = manager();
        for _ in 0..3 {
            let _ = resources.spawn_resource(ResourceKind::Sanctuary, None, &mut rng, &mut bus);
        }
        resources.set_max_count(ResourceKind::Sanctuary, 1);
        assert_eq!(resources.count(ResourceKind::Sanctuary), 3);
        assert!(resources
            .spawn_resource(ResourceKind::Sanctuary, None, &mut rng, &mut bus)
            .is_none());
    }

    #[test]
    fn spawn_and_retire_are_published() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut bus = EventBus::new();
        let mut resources = manager();
        let before = bus.published();
        let id = resources.spawn_resource(
            ResourceKind::PredatorStar,
            Some(ResourceVariant::Predator(PredatorVariant::Hunter)),
            &mut rng,
            &mut bus,
        );
        assert_eq!(bus.published() - before, 2, "ResourceSpawned + PredatorSpawn");
        if let Some(id) = id {
            let _ = resources.despawn(id, &mut bus);
        }
        assert_eq!(bus.published() - before, 3);
    }

    #[test]
    fn disabled_kind_never_spawns() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut bus = EventBus::new();
        let mut resources = manager();
        resources.set_enabled(ResourceKind::EnergyWell, false);
        assert!(matches!(
            resources.try_spawn_resource(ResourceKind::EnergyWell, None, &mut rng, &mut bus),
            Err(WorldError::KindDisabled(ResourceKind::EnergyWell))
        ));
    }

    #[test]
    fn black_hole_kills_through_the_population() {
        let mut rng = StdRng::seed_from_u64(14);
        let mut bus = EventBus::new();
        let mut pop = population();
        let mut resources = only(ResourceKind::BlackHole);
        let center = Vec2::new(300.0, 300.0);
        resources.resources.push(boxed(BlackHole::new(center)));
        let victim = mature(&mut pop, SpawnParams::new(SpawnOrigin::Seed).at(center), &mut rng, &mut bus);

        let before = bus.published();
        let report = Frame {
            population: &mut pop,
            rng: &mut rng,
            bus: &mut bus,
            shields: &[],
        }
        .run(&mut resources, 16.0);

        assert_eq!(report.consumed, 1);
        assert_eq!(resources.total_consumed(), 1);
        assert_eq!(
            pop.get(victim).and_then(|e| e.death_cause()),
            Some(DeathCause::Consumed)
        );
        assert!(bus.published() > before, "HazardKill is published");
    }

    #[test]
    fn shields_stop_consumption_and_conversion() {
        let mut rng = StdRng::seed_from_u64(16);
        let mut bus = EventBus::new();
        let mut pop = population();
        let mut resources = only(ResourceKind::BlackHole);
        let center = Vec2::new(300.0, 300.0);
        resources.resources.push(boxed(BlackHole::new(center)));
        let zero = SpawnParams::new(SpawnOrigin::Seed).at(center).with_digit(Digit::Zero);
        let guarded = mature(&mut pop, zero, &mut rng, &mut bus);

        let shields = [ShieldZone {
            center,
            radius: 50.0,
        }];
        let report = Frame {
            population: &mut pop,
            rng: &mut rng,
            bus: &mut bus,
            shields: &shields,
        }
        .run(&mut resources, 16.0);

        assert_eq!(report.consumed, 0);
        assert!(pop.get(guarded).is_some_and(|e| !e.is_doomed()));

        let index = resources.len().saturating_sub(1);
        let mut frame = ResourceTick {
            dt_ms: 16.0,
            population: &mut pop,
            rng: &mut rng,
            bus: &mut bus,
            modifiers: Modifiers::NEUTRAL,
            shields: &shields,
            regen_multiplier: 1.0,
        };
        assert!(!resources.corrupt(index, guarded, true, &mut frame));
        assert!(resources.corrupt(index, guarded, false, &mut frame));
        assert_eq!(pop.get(guarded).map(|e| e.shadow), Some(true));
        assert_eq!(resources.total_conversions(), 1);
    }

    #[test]
    fn parasite_drains_its_host() {
        let mut rng = StdRng::seed_from_u64(18);
        let mut bus = EventBus::new();
        let mut pop = population();
        let mut resources = only(ResourceKind::Parasite);
        let at = Vec2::new(500.0, 500.0);
        let params = SpawnParams::new(SpawnOrigin::Seed).at(at).with_energy(80.0);
        let host = mature(&mut pop, params, &mut rng, &mut bus);
        resources
            .resources
            .push(boxed(Parasite::new(at.plus(Vec2::new(5.0, 0.0)))));

        let mut frame = Frame {
            population: &mut pop,
            rng: &mut rng,
            bus: &mut bus,
            shields: &[],
        };
        let _ = frame.run(&mut resources, 16.0);
        let _ = frame.run(&mut resources, 300.0);
        let drains: usize = (0..6).map(|_| frame.run(&mut resources, 100.0).drains).sum();

        assert_eq!(drains, 5);
        assert!((resources.total_drained() - 40.0).abs() < 1e-9);
        assert!(pop.get(host).is_some_and(|e| (e.energy() - 40.0).abs() < 1e-9));
    }

    #[test]
    fn serpents_wait_for_age_population_and_cooldown() {
        let mut rng = StdRng::seed_from_u64(20);
        let mut bus = EventBus::new();
        let mut pop = population();
        let mut resources = only(ResourceKind::VoidSerpent);
        let gates = ResourcesConfig::default().settings(ResourceKind::VoidSerpent);
        for _ in 0..gates.min_population {
            let _ = pop.spawn(SpawnParams::default(), &mut rng, &mut bus);
        }

        let mut frame = Frame {
            population: &mut pop,
            rng: &mut rng,
            bus: &mut bus,
            shields: &[],
        };
        let mut first = None;
        for second in 1_u32..400 {
            if frame.run(&mut resources, 1_000.0).spawned > 0 {
                first = Some(f64::from(second) * 1_000.0);
                break;
            }
        }
        let Some(first) = first else {
            panic!("a serpent should eventually appear");
        };
        // The frame that crosses the age gate already counts down the cooldown.
        let earliest = gates.min_ecosystem_age_ms + gates.spawn_cooldown_ms / 2.0 - 1_000.0;
        assert!(first >= earliest, "spawned at {first} ms");
        assert_eq!(resources.count(ResourceKind::VoidSerpent), 1);

        let Some(id) = resources.iter().next().map(|r| r.id()) else {
            panic!("the serpent is tracked");
        };
        assert!(resources.despawn(id, &mut *frame.bus).is_ok());
        assert_eq!(frame.run(&mut resources, 1_000.0).spawned, 0, "cooldown restarts");
    }

    #[test]
    fn no_hazards_spawn_below_the_population_gate() {
        let mut rng = StdRng::seed_from_u64(22);
        let mut bus = EventBus::new();
        let mut pop = population();
        let mut resources = only(ResourceKind::VoidSerpent);
        let mut frame = Frame {
            population: &mut pop,
            rng: &mut rng,
            bus: &mut bus,
            shields: &[],
        };
        for _ in 0..400 {
            assert_eq!(frame.run(&mut resources, 1_000.0).spawned, 0);
        }
    }
}

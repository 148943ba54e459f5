//! The six cosmic event handlers.
//!
//! `c` below is the event's rise-and-fall curve and `i` its intensity.

use rand::Rng;

use firefly_agents::SpawnParams;
use firefly_types::{CosmicEventKind, DeathCause, EntityId, Modifiers, SpawnOrigin, Vec2, Viewport};

use super::{ActiveEvent, CosmicContext, CosmicEffect};
use crate::error::WorldError;

/// Build the handler for `kind`.
pub fn effect_for(
    kind: CosmicEventKind,
    viewport: Viewport,
    rng: &mut impl Rng,
) -> Box<dyn CosmicEffect> {
    match kind {
        CosmicEventKind::SolarFlare => Box::new(SolarFlare),
        CosmicEventKind::MeteorShower => Box::new(MeteorShower::default()),
        CosmicEventKind::VoidStorm => Box::new(VoidStorm {
            center: viewport.center(),
        }),
        CosmicEventKind::Eclipse => Box::new(Eclipse),
        CosmicEventKind::NebulaDrift => Box::new(NebulaDrift::new(viewport, rng)),
        CosmicEventKind::Comet => Box::new(Comet::new(viewport, rng)),
    }
}

// ---------------------------------------------------------------------------
// Solar flare
// ---------------------------------------------------------------------------

/// One-off energy burst, then boosted regeneration and glow.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolarFlare;

/// Energy granted to every entity when a flare starts, per unit intensity.
const FLARE_BURST: f64 = 20.0;

impl CosmicEffect for SolarFlare {
    fn kind(&self) -> CosmicEventKind {
        CosmicEventKind::SolarFlare
    }

    fn start(&mut self, event: &ActiveEvent, ctx: &mut CosmicContext<'_>) -> Result<(), WorldError> {
        let burst = FLARE_BURST * event.intensity;
        for entity in ctx.population.entities_mut() {
            if !entity.is_doomed() {
                let _ = entity.add_energy(burst);
            }
        }
        Ok(())
    }

    fn update(&mut self, _event: &ActiveEvent, _ctx: &mut CosmicContext<'_>) -> Result<(), WorldError> {
        Ok(())
    }

    fn modifiers(&self, event: &ActiveEvent) -> Modifiers {
        let ci = event.curve() * event.intensity;
        Modifiers {
            energy: 0.5f64.mul_add(ci, 1.0),
            glow: 0.3f64.mul_add(ci, 1.0),
            spawn_rate: 0.2f64.mul_add(event.intensity, 1.0),
            ..Modifiers::NEUTRAL
        }
    }

    fn regen_multiplier(&self, event: &ActiveEvent) -> f64 {
        1.0 + event.intensity
    }
}

// ---------------------------------------------------------------------------
// Meteor shower
// ---------------------------------------------------------------------------

/// Per-frame chance of a meteor, per unit intensity.
const METEOR_CHANCE: f64 = 0.004;

/// Energy a meteor-born entity starts with.
const METEOR_ENERGY: f64 = 100.0;

/// Entities this close to a meteor impact are killed.
pub const IMPACT_RADIUS: f64 = 15.0;

/// Drops new entities in along the top edge. Each meteor also strikes a
/// random point, killing whatever it lands on.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeteorShower {
    landed: u64,
    impacts: u64,
}

impl MeteorShower {
    /// Entities spawned so far.
    pub const fn landed(&self) -> u64 {
        self.landed
    }

    /// Entities killed by impacts so far.
    pub const fn impacts(&self) -> u64 {
        self.impacts
    }

    fn strike(&mut self, point: Vec2, ctx: &mut CosmicContext<'_>) {
        let struck: Vec<EntityId> = ctx
            .population
            .iter()
            .filter(|e| !e.is_doomed() && e.position.distance(point) <= IMPACT_RADIUS)
            .map(|e| e.id)
            .collect();
        for id in struck {
            if ctx.population.kill(id, DeathCause::Collision) {
                self.impacts = self.impacts.saturating_add(1);
            }
        }
    }
}

impl CosmicEffect for MeteorShower {
    fn kind(&self) -> CosmicEventKind {
        CosmicEventKind::MeteorShower
    }

    fn update(&mut self, event: &ActiveEvent, ctx: &mut CosmicContext<'_>) -> Result<(), WorldError> {
        let chance = (METEOR_CHANCE * event.intensity).clamp(0.0, 1.0);
        if !ctx.rng.random_bool(chance) {
            return Ok(());
        }
        let viewport = ctx.population.viewport();
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return Err(WorldError::EffectFailed {
                event: CosmicEventKind::MeteorShower,
                reason: "viewport has no area".to_owned(),
            });
        }
        let impact = Vec2::new(
            ctx.rng.random_range(0.0..viewport.width),
            ctx.rng.random_range(0.0..viewport.height),
        );
        self.strike(impact, ctx);

        if ctx.population.is_full() {
            return Ok(());
        }
        let x = ctx.rng.random_range(0.0..viewport.width);
        let params = SpawnParams::new(SpawnOrigin::Cosmic)
            .at(Vec2::new(x, 0.0))
            .with_energy(METEOR_ENERGY);
        if ctx.population.spawn(params, &mut *ctx.rng, ctx.bus).is_some() {
            self.landed = self.landed.saturating_add(1);
        }
        Ok(())
    }

    fn modifiers(&self, _event: &ActiveEvent) -> Modifiers {
        Modifiers {
            spawn_rate: 1.5,
            ..Modifiers::NEUTRAL
        }
    }
}

// ---------------------------------------------------------------------------
// Void storm
// ---------------------------------------------------------------------------

/// Radius of the void storm vortex.
pub const VORTEX_RADIUS: f64 = 250.0;

/// Swirl force at full intensity.
const VORTEX_FORCE: f64 = 0.02;

/// A vortex at the viewport center that swirls entities around it.
#[derive(Debug, Clone, Copy)]
pub struct VoidStorm {
    center: Vec2,
}

impl CosmicEffect for VoidStorm {
    fn kind(&self) -> CosmicEventKind {
        CosmicEventKind::VoidStorm
    }

    fn update(&mut self, event: &ActiveEvent, ctx: &mut CosmicContext<'_>) -> Result<(), WorldError> {
        let strength = VORTEX_FORCE * event.intensity;
        for entity in ctx.population.entities_mut() {
            let offset = self.center.minus(entity.position);
            let distance = offset.length();
            if distance >= VORTEX_RADIUS || distance <= f64::EPSILON {
                continue;
            }
            let falloff = 1.0 - distance / VORTEX_RADIUS;
            let inward = offset.normalized();
            // Mostly tangential, with a slight pull toward the eye.
            let swirl = inward.perpendicular().plus(inward.scaled(0.3));
            entity.apply_force(swirl.scaled(strength * falloff));
        }
        Ok(())
    }

    fn modifiers(&self, event: &ActiveEvent) -> Modifiers {
        let c = event.curve();
        Modifiers {
            gravity: 0.5f64.mul_add(c * event.intensity, 1.0),
            speed: 0.2f64.mul_add(c, 1.0),
            death_rate: 0.1f64.mul_add(event.intensity, 1.0),
            ..Modifiers::NEUTRAL
        }
    }
}

// ---------------------------------------------------------------------------
// Eclipse
// ---------------------------------------------------------------------------

/// Darkness: entities glow brighter and drain more slowly, but gain less.
#[derive(Debug, Clone, Copy, Default)]
pub struct Eclipse;

impl CosmicEffect for Eclipse {
    fn kind(&self) -> CosmicEventKind {
        CosmicEventKind::Eclipse
    }

    fn update(&mut self, _event: &ActiveEvent, _ctx: &mut CosmicContext<'_>) -> Result<(), WorldError> {
        Ok(())
    }

    fn modifiers(&self, event: &ActiveEvent) -> Modifiers {
        let c = event.curve();
        Modifiers {
            glow: 2.0f64.mul_add(c * event.intensity, 1.0),
            energy: 0.3f64.mul_add(-c, 1.0),
            death_rate: 0.2f64.mul_add(-c, 1.0),
            ..Modifiers::NEUTRAL
        }
    }
}

// ---------------------------------------------------------------------------
// Nebula drift
// ---------------------------------------------------------------------------

/// Radius of the nebula cloud.
pub const NEBULA_RADIUS: f64 = 180.0;

/// Per-frame energy inside the cloud at full intensity.
const NEBULA_ENERGY: f64 = 0.05;

/// Cloud drift speed in px/ms.
const NEBULA_SPEED: f64 = 0.02;

/// A slow energizing cloud that drifts across the viewport.
#[derive(Debug, Clone, Copy)]
pub struct NebulaDrift {
    position: Vec2,
    velocity: Vec2,
    viewport: Viewport,
}

impl NebulaDrift {
    fn new(viewport: Viewport, rng: &mut impl Rng) -> Self {
        let (min, max) = viewport.inner_bounds(0.6);
        let position = Vec2::new(
            rng.random_range(min.x..=max.x),
            rng.random_range(min.y..=max.y),
        );
        let angle = rng.random_range(0.0..std::f64::consts::TAU);
        Self {
            position,
            velocity: Vec2::from_angle(angle).scaled(NEBULA_SPEED),
            viewport,
        }
    }

    /// Current cloud center.
    pub const fn position(&self) -> Vec2 {
        self.position
    }
}

impl CosmicEffect for NebulaDrift {
    fn kind(&self) -> CosmicEventKind {
        CosmicEventKind::NebulaDrift
    }

    fn update(&mut self, event: &ActiveEvent, ctx: &mut CosmicContext<'_>) -> Result<(), WorldError> {
        self.position = self.position.plus(self.velocity.scaled(ctx.dt_ms));
        if self.position.x < 0.0 || self.position.x > self.viewport.width {
            self.velocity.x = -self.velocity.x;
        }
        if self.position.y < 0.0 || self.position.y > self.viewport.height {
            self.velocity.y = -self.velocity.y;
        }
        self.position = self.viewport.clamp(self.position);

        let gain = NEBULA_ENERGY * event.intensity;
        for entity in ctx.population.entities_mut() {
            if !entity.is_doomed() && entity.position.distance(self.position) <= NEBULA_RADIUS {
                let _ = entity.add_energy(gain);
            }
        }
        Ok(())
    }

    fn modifiers(&self, _event: &ActiveEvent) -> Modifiers {
        Modifiers {
            energy: 1.1,
            glow: 1.2,
            ..Modifiers::NEUTRAL
        }
    }
}

// ---------------------------------------------------------------------------
// Comet
// ---------------------------------------------------------------------------

/// Radius within which the comet accelerates evolution.
pub const COMET_RADIUS: f64 = 100.0;

/// Evolution progress per frame near the comet.
const COMET_PROGRESS: f64 = 0.01;

/// A comet crossing the viewport from one side to the other.
#[derive(Debug, Clone, Copy)]
pub struct Comet {
    from: Vec2,
    to: Vec2,
    position: Vec2,
}

impl Comet {
    fn new(viewport: Viewport, rng: &mut impl Rng) -> Self {
        let left_to_right = rng.random_bool(0.5);
        let y_from = rng.random_range(0.0..=viewport.height.max(0.0));
        let y_to = rng.random_range(0.0..=viewport.height.max(0.0));
        let (from, to) = if left_to_right {
            (Vec2::new(0.0, y_from), Vec2::new(viewport.width, y_to))
        } else {
            (Vec2::new(viewport.width, y_from), Vec2::new(0.0, y_to))
        };
        Self {
            from,
            to,
            position: from,
        }
    }

    /// Current comet head.
    pub const fn position(&self) -> Vec2 {
        self.position
    }
}

impl CosmicEffect for Comet {
    fn kind(&self) -> CosmicEventKind {
        CosmicEventKind::Comet
    }

    fn update(&mut self, event: &ActiveEvent, ctx: &mut CosmicContext<'_>) -> Result<(), WorldError> {
        self.position = self.from.plus(self.to.minus(self.from).scaled(event.progress()));
        for entity in ctx.population.entities_mut() {
            if !entity.is_doomed() && entity.position.distance(self.position) <= COMET_RADIUS {
                entity.evolution_progress += COMET_PROGRESS;
            }
        }
        Ok(())
    }

    fn modifiers(&self, _event: &ActiveEvent) -> Modifiers {
        Modifiers {
            glow: 1.5,
            ..Modifiers::NEUTRAL
        }
    }
}

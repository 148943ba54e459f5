//! Stationary energy sources.
//!
//! A well pulls mature entities inside its attraction radius and feeds the
//! ones close to its core. Finite wells drain as they give; an empty well is
//! `Depleted` for a fixed cooldown, then `Restoring` (attracting but not
//! feeding) until half full.

use firefly_types::{ResourceId, ResourceState, ResourceVariant, Vec2, WellVariant};

use super::{Effect, Notice, Occupant, ResourceEnv, WorldResource, falloff};

/// Time a drained well stays depleted.
pub const DEPLETED_COOLDOWN_MS: f64 = 5_000.0;

/// Entities closer than this are not pulled further in.
pub const CORE_RADIUS: f64 = 25.0;

/// Fraction of the attraction radius within which energy is transferred.
pub const TRANSFER_FRACTION: f64 = 0.4;

/// Fill level a well restarts at after depletion.
const RESTART_FILL: f64 = 0.3;

/// Fill level at which a restoring well resumes feeding.
const RESUME_FILL: f64 = 0.5;

/// Tunables of one well variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WellSpec {
    /// Energy capacity; `None` is unlimited.
    pub capacity: Option<f64>,
    /// Regeneration per second.
    pub regen_per_s: f64,
    /// Maximum output per second to one entity.
    pub output_per_s: f64,
    /// Attraction radius.
    pub attract_radius: f64,
    /// Per-frame attraction force at the center.
    pub attract_strength: f64,
    /// Lifetime; `None` never expires.
    pub lifetime_ms: Option<f64>,
}

impl WellSpec {
    /// Tunables for a variant.
    pub const fn of(variant: WellVariant) -> Self {
        match variant {
            WellVariant::Standard => Self {
                capacity: Some(100.0),
                regen_per_s: 0.5,
                output_per_s: 2.0,
                attract_radius: 120.0,
                attract_strength: 0.008,
                lifetime_ms: None,
            },
            WellVariant::Volatile => Self {
                capacity: Some(60.0),
                regen_per_s: 1.5,
                output_per_s: 5.0,
                attract_radius: 80.0,
                attract_strength: 0.015,
                lifetime_ms: Some(60_000.0),
            },
            WellVariant::Ancient => Self {
                capacity: None,
                regen_per_s: 0.0,
                output_per_s: 1.0,
                attract_radius: 200.0,
                attract_strength: 0.005,
                lifetime_ms: None,
            },
        }
    }
}

/// A stationary energy well.
#[derive(Debug, Clone)]
pub struct EnergyWell {
    id: ResourceId,
    variant: WellVariant,
    spec: WellSpec,
    position: Vec2,
    stored: f64,
    state: ResourceState,
    depleted_ms: f64,
    age_ms: f64,
    total_given: f64,
}

impl EnergyWell {
    /// A full well of `variant` at `position`.
    pub fn new(variant: WellVariant, position: Vec2) -> Self {
        let spec = WellSpec::of(variant);
        Self {
            id: ResourceId::new(),
            variant,
            spec,
            position,
            stored: spec.capacity.unwrap_or(f64::INFINITY),
            state: ResourceState::Active,
            depleted_ms: 0.0,
            age_ms: 0.0,
            total_given: 0.0,
        }
    }

    /// Energy currently stored (infinite for unlimited wells).
    pub const fn stored(&self) -> f64 {
        self.stored
    }

    /// Energy handed out so far.
    pub const fn total_given(&self) -> f64 {
        self.total_given
    }

    /// Variant tunables.
    pub const fn spec(&self) -> &WellSpec {
        &self.spec
    }

    fn regenerate(&mut self, dt_ms: f64, multiplier: f64) {
        let Some(capacity) = self.spec.capacity else {
            return;
        };
        let gain = self.spec.regen_per_s * multiplier * dt_ms / 1000.0;
        self.stored = (self.stored + gain).min(capacity);
        if self.state == ResourceState::Restoring && self.stored >= capacity * RESUME_FILL {
            self.state = ResourceState::Active;
        }
    }

    fn draw(&mut self, wanted: f64) -> f64 {
        if self.spec.capacity.is_none() {
            self.total_given += wanted;
            return wanted;
        }
        let given = wanted.min(self.stored).max(0.0);
        self.stored -= given;
        self.total_given += given;
        if self.stored <= 0.0 {
            self.stored = 0.0;
            self.state = ResourceState::Depleted;
            self.depleted_ms = DEPLETED_COOLDOWN_MS;
        }
        given
    }
}

impl WorldResource for EnergyWell {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn variant(&self) -> ResourceVariant {
        ResourceVariant::Well(self.variant)
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn effect_radius(&self) -> f64 {
        self.spec.attract_radius
    }

    fn state(&self) -> ResourceState {
        self.state
    }

    fn update(&mut self, env: &mut ResourceEnv<'_>) -> Option<Notice> {
        if self.state == ResourceState::Expended {
            return None;
        }
        self.age_ms += env.dt_ms;
        if let Some(lifetime) = self.spec.lifetime_ms
            && self.age_ms >= lifetime
        {
            self.state = ResourceState::Expended;
            return None;
        }

        match self.state {
            ResourceState::Active | ResourceState::Restoring => {
                self.regenerate(env.dt_ms, env.regen_multiplier);
            }
            ResourceState::Depleted => {
                self.depleted_ms -= env.dt_ms;
                if self.depleted_ms <= 0.0 {
                    self.stored = self.spec.capacity.unwrap_or(0.0) * RESTART_FILL;
                    self.state = ResourceState::Restoring;
                }
            }
            ResourceState::Expended => {}
        }
        None
    }

    fn effects_for(&mut self, occupant: &Occupant, dt_ms: f64, out: &mut Vec<Effect>) {
        if !occupant.mature
            || matches!(self.state, ResourceState::Depleted | ResourceState::Expended)
        {
            return;
        }
        let offset = self.position.minus(occupant.position);
        let distance = offset.length();
        let radius = self.spec.attract_radius;
        if distance > radius {
            return;
        }

        if distance > CORE_RADIUS {
            let strength = self.spec.attract_strength * falloff(distance, radius);
            out.push(Effect::Attract(offset.normalized().scaled(strength)));
        }

        let transfer_radius = radius * TRANSFER_FRACTION;
        if self.state == ResourceState::Active && distance <= transfer_radius {
            let proximity = falloff(distance, transfer_radius).max(0.1);
            let wanted = self.spec.output_per_s * proximity * dt_ms / 1000.0;
            let given = self.draw(wanted.min(occupant.energy_headroom));
            if given > 0.0 {
                out.push(Effect::Energize(given));
            }
        }
    }

    fn expire(&mut self) {
        self.state = ResourceState::Expended;
    }
}

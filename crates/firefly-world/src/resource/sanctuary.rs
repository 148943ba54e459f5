//! Protective sanctuaries.
//!
//! Every mature entity inside a sanctuary regenerates energy and is shielded
//! from captures. Sanctuaries also push predators back out across their
//! boundary.

use firefly_types::{ResourceId, ResourceState, ResourceVariant, SanctuaryVariant, Vec2};

use super::{Effect, Notice, Occupant, ResourceEnv, WorldResource};

/// Tunables of one sanctuary variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanctuarySpec {
    /// Zone radius.
    pub radius: f64,
    /// Energy per second for entities inside.
    pub regen_per_s: f64,
    /// Lifetime; `None` never expires.
    pub duration_ms: Option<f64>,
    /// Per-frame push applied to predators inside.
    pub repel_force: f64,
}

impl SanctuarySpec {
    /// Tunables for a variant.
    pub const fn of(variant: SanctuaryVariant) -> Self {
        match variant {
            SanctuaryVariant::Standard => Self {
                radius: 100.0,
                regen_per_s: 0.5,
                duration_ms: Some(60_000.0),
                repel_force: 0.3,
            },
            SanctuaryVariant::Ancient => Self {
                radius: 150.0,
                regen_per_s: 1.0,
                duration_ms: Some(90_000.0),
                repel_force: 0.5,
            },
            SanctuaryVariant::Celestial => Self {
                radius: 120.0,
                regen_per_s: 0.8,
                duration_ms: Some(45_000.0),
                repel_force: 0.8,
            },
            SanctuaryVariant::Permanent => Self {
                radius: 80.0,
                regen_per_s: 0.3,
                duration_ms: None,
                repel_force: 0.4,
            },
        }
    }
}

/// A stationary safe zone.
#[derive(Debug, Clone)]
pub struct Sanctuary {
    id: ResourceId,
    variant: SanctuaryVariant,
    spec: SanctuarySpec,
    position: Vec2,
    age_ms: f64,
    energy_restored: f64,
    expended: bool,
}

impl Sanctuary {
    /// A new sanctuary of `variant` at `position`.
    pub fn new(variant: SanctuaryVariant, position: Vec2) -> Self {
        Self {
            id: ResourceId::new(),
            variant,
            spec: SanctuarySpec::of(variant),
            position,
            age_ms: 0.0,
            energy_restored: 0.0,
            expended: false,
        }
    }

    /// Energy handed out so far.
    pub const fn energy_restored(&self) -> f64 {
        self.energy_restored
    }

    /// Variant tunables.
    pub const fn spec(&self) -> &SanctuarySpec {
        &self.spec
    }
}

impl WorldResource for Sanctuary {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn variant(&self) -> ResourceVariant {
        ResourceVariant::Sanctuary(self.variant)
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn effect_radius(&self) -> f64 {
        self.spec.radius
    }

    fn state(&self) -> ResourceState {
        if self.expended {
            ResourceState::Expended
        } else {
            ResourceState::Active
        }
    }

    fn update(&mut self, env: &mut ResourceEnv<'_>) -> Option<Notice> {
        self.age_ms += env.dt_ms;
        if let Some(duration) = self.spec.duration_ms
            && self.age_ms >= duration
        {
            self.expended = true;
        }
        None
    }

    fn effects_for(&mut self, occupant: &Occupant, dt_ms: f64, out: &mut Vec<Effect>) {
        if self.expended || !occupant.mature || !self.contains(occupant.position) {
            return;
        }
        let regen = self.spec.regen_per_s * dt_ms / 1000.0;
        self.energy_restored += regen;
        out.push(Effect::Energize(regen));
        out.push(Effect::Shield);
    }

    fn expire(&mut self) {
        self.expended = true;
    }

    fn hazard_repulsion(&self) -> Option<f64> {
        (!self.expended).then_some(self.spec.repel_force)
    }
}

//! Resource and hazard entities.
//!
//! Every resource implements [`WorldResource`]. A resource never touches an
//! entity itself: each frame it is shown read-only [`Occupant`] views and
//! answers with declared [`Effect`]s, which the
//! [`ResourceManager`](crate::ResourceManager) applies through the
//! population's own entry points.
//!
//! | Kind | Type | Effects |
//! |---|---|---|
//! | Energy well | [`EnergyWell`] | attract, energize |
//! | Predator star | [`PredatorStar`] | capture |
//! | Portal | [`Portal`] | attract, teleport |
//! | Sanctuary | [`Sanctuary`] | energize, shield |
//! | Black hole | [`BlackHole`] | attract, consume |
//! | Shadow firefly | [`ShadowFirefly`] | corrupt |
//! | Void serpent | [`VoidSerpent`] | attract, consume |
//! | Parasite | [`Parasite`] | drain |

pub mod black_hole;
pub mod energy_well;
pub mod parasite;
pub mod portal;
pub mod predator;
pub mod sanctuary;
pub mod serpent;
pub mod shadow;

use rand::Rng;
use rand::rngs::StdRng;

use firefly_types::{
    Digit, Entity, EntityId, MAX_ENERGY, RareVariant, ResourceId, ResourceKind, ResourceState,
    ResourceVariant, Tier, Vec2, Viewport,
};

pub use black_hole::BlackHole;
pub use energy_well::EnergyWell;
pub use parasite::{Parasite, ParasitePhase};
pub use portal::Portal;
pub use predator::{PredatorPhase, PredatorStar};
pub use sanctuary::Sanctuary;
pub use serpent::{SerpentPhase, VoidSerpent};
pub use shadow::{ShadowFirefly, ShadowPhase};

/// Read-only view of an entity handed to resources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occupant {
    /// The entity.
    pub id: EntityId,
    /// Current position.
    pub position: Vec2,
    /// Whether the entity is mature (only mature entities are affected).
    pub mature: bool,
    /// Current tier.
    pub tier: Tier,
    /// Energy the entity can still absorb before reaching the cap.
    pub energy_headroom: f64,
    /// Current energy.
    pub energy: f64,
    /// Speed in pixels per millisecond.
    pub speed: f64,
    /// Binary category.
    pub digit: Digit,
    /// Carries the golden rare tag.
    pub golden: bool,
    /// Already converted by a shadow firefly.
    pub shadow: bool,
}

impl Occupant {
    /// View of a live entity.
    pub fn of(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            position: entity.position,
            mature: entity.is_mature(),
            tier: entity.tier(),
            energy_headroom: (MAX_ENERGY - entity.energy()).max(0.0),
            energy: entity.energy(),
            speed: entity.velocity.length() / firefly_agents::population::REFERENCE_FRAME_MS,
            digit: entity.digit,
            golden: entity.rare == Some(RareVariant::Golden),
            shadow: entity.shadow,
        }
    }
}

/// A declared effect on one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Accumulate an attraction force (scaled by the gravity modifier).
    Attract(Vec2),
    /// Add energy (scaled by the energy modifier).
    Energize(f64),
    /// Attempt a capture; resisted by tier and shields.
    Capture,
    /// Move the entity.
    Teleport(Vec2),
    /// Protect the entity from captures this frame.
    Shield,
    /// Kill the entity outright; only shields stop it.
    Consume,
    /// Remove energy (not scaled by modifiers).
    Drain(f64),
    /// Convert the entity into a shadow.
    Corrupt,
}

/// Something a resource wants published after its update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// A predator was driven off by a crowd.
    Repelled,
}

/// Per-frame input to [`WorldResource::update`].
#[derive(Debug)]
pub struct ResourceEnv<'a> {
    /// Elapsed milliseconds.
    pub dt_ms: f64,
    /// Every live entity.
    pub occupants: &'a [Occupant],
    /// Simulation bounds.
    pub viewport: Viewport,
    /// Shared random source.
    pub rng: &'a mut StdRng,
    /// Multiplier on well regeneration (raised by solar flares).
    pub regen_multiplier: f64,
    /// Entities carrying an attached parasite, once per parasite.
    pub hosts: &'a [EntityId],
}

/// A stationary or mobile resource/hazard.
pub trait WorldResource: std::fmt::Debug {
    /// Stable id.
    fn id(&self) -> ResourceId;

    /// Concrete variant.
    fn variant(&self) -> ResourceVariant;

    /// Family of the variant.
    fn kind(&self) -> ResourceKind {
        self.variant().kind()
    }

    /// Current position.
    fn position(&self) -> Vec2;

    /// Radius of the primary effect.
    fn effect_radius(&self) -> f64;

    /// Lifecycle state.
    fn state(&self) -> ResourceState;

    /// Whether the point lies within the effect radius.
    fn contains(&self, point: Vec2) -> bool {
        self.position().distance(point) <= self.effect_radius()
    }

    /// Advance internal timers and movement.
    fn update(&mut self, env: &mut ResourceEnv<'_>) -> Option<Notice>;

    /// Append this frame's effects on `occupant` to `out`.
    fn effects_for(&mut self, occupant: &Occupant, dt_ms: f64, out: &mut Vec<Effect>);

    /// Mark the resource for retirement.
    fn expire(&mut self);

    /// The other end of a linked pair, if any.
    fn partner(&self) -> Option<ResourceId> {
        None
    }

    /// Told the outcome of a capture, consumption or conversion this
    /// resource requested.
    fn on_capture(&mut self, _target: EntityId, _captured: bool) {}

    /// Entity this resource is attached to.
    fn host(&self) -> Option<EntityId> {
        None
    }

    /// Told that an entity just arrived through the partner.
    fn on_arrival(&mut self, _entity: EntityId) {}

    /// Displace a mobile resource. Stationary resources ignore it.
    fn push(&mut self, _delta: Vec2) {}

    /// Per-frame push this resource applies to hazards inside its radius.
    fn hazard_repulsion(&self) -> Option<f64> {
        None
    }
}

/// Falloff from 1 at the center to 0 at `radius`.
pub(crate) fn falloff(distance: f64, radius: f64) -> f64 {
    if radius <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / radius).clamp(0.0, 1.0)
}

/// Uniform sample in `[low, high)`, or `low` for an empty range.
pub(crate) fn random_in(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    if high > low && (high - low).is_finite() {
        rng.random_range(low..high)
    } else {
        low
    }
}

/// Unit vector toward `to`, or zero when the points coincide.
pub(crate) fn heading(from: Vec2, to: Vec2) -> Vec2 {
    let offset = to.minus(from);
    if offset.length() > f64::EPSILON {
        offset.normalized()
    } else {
        Vec2::ZERO
    }
}

/// Closest occupant matching `filter` within `range`.
pub(crate) fn nearest<'o>(
    from: Vec2,
    range: f64,
    occupants: &'o [Occupant],
    filter: impl Fn(&Occupant) -> bool,
) -> Option<&'o Occupant> {
    occupants
        .iter()
        .filter(|o| filter(o) && from.distance(o.position) < range)
        .min_by(|a, b| from.distance(a.position).total_cmp(&from.distance(b.position)))
}

#[cfg(test)]
impl Occupant {
    /// A mature basic Zero at `position` with half energy.
    pub(crate) fn sample(position: Vec2) -> Self {
        Self {
            id: EntityId::new(),
            position,
            mature: true,
            tier: Tier::Basic,
            energy_headroom: 50.0,
            energy: 50.0,
            speed: 0.0,
            digit: Digit::Zero,
            golden: false,
            shadow: false,
        }
    }
}

//! Black holes: stationary gravity sinks.
//!
//! A black hole pulls every mature entity inside its gravity radius and
//! swallows any that cross its event horizon. Swallowed Ones feed it, and
//! swallowed Zeros starve it. Its size sets its mass, and mass scales both
//! the pull and the gravity radius.

use firefly_types::{Digit, EntityId, ResourceId, ResourceState, ResourceVariant, Vec2};

use super::{Effect, Notice, Occupant, ResourceEnv, WorldResource};

/// Size at spawn; mass is `size / BASE_SIZE`.
pub const BASE_SIZE: f64 = 60.0;

/// Smallest size a black hole shrinks to.
pub const MIN_SIZE: f64 = 20.0;

/// Largest size a black hole grows to.
pub const MAX_SIZE: f64 = 150.0;

/// Event horizon as a fraction of size.
const HORIZON_RATIO: f64 = 0.5;

/// Gravity radius at size zero.
const GRAVITY_BASE_RADIUS: f64 = 150.0;

/// Gravity radius gained per unit of size.
const GRAVITY_RADIUS_PER_SIZE: f64 = 1.5;

/// Pull at the center for mass 1.
const GRAVITY_STRENGTH: f64 = 0.08;

/// Size gained per swallowed One.
const GROWTH_PER_ONE: f64 = 8.0;

/// Size lost per swallowed Zero.
const SHRINK_PER_ZERO: f64 = 6.0;

/// Fraction of the pull felt by shadow-converted entities.
const SHADOW_PULL: f64 = 0.5;

/// Fraction of the viewport where black holes sit.
pub const ANCHOR: (f64, f64) = (0.08, 0.25);

/// A stationary hazard that pulls and swallows entities.
#[derive(Debug, Clone)]
pub struct BlackHole {
    id: ResourceId,
    position: Vec2,
    size: f64,
    consumed: u32,
    pending: Vec<(EntityId, Digit)>,
    expended: bool,
}

impl BlackHole {
    /// A base-sized black hole at `position`.
    pub fn new(position: Vec2) -> Self {
        Self {
            id: ResourceId::new(),
            position,
            size: BASE_SIZE,
            consumed: 0,
            pending: Vec::new(),
            expended: false,
        }
    }

    /// Current size.
    pub const fn size(&self) -> f64 {
        self.size
    }

    /// Gravitational mass relative to a base-sized hole.
    pub fn mass(&self) -> f64 {
        self.size / BASE_SIZE
    }

    /// Radius of the pull.
    pub fn gravity_radius(&self) -> f64 {
        GRAVITY_RADIUS_PER_SIZE.mul_add(self.size, GRAVITY_BASE_RADIUS)
    }

    /// Radius inside which entities are swallowed.
    pub fn horizon(&self) -> f64 {
        self.size * HORIZON_RATIO
    }

    /// Entities swallowed so far.
    pub const fn consumed(&self) -> u32 {
        self.consumed
    }
}

impl WorldResource for BlackHole {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn variant(&self) -> ResourceVariant {
        ResourceVariant::BlackHole
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn effect_radius(&self) -> f64 {
        self.gravity_radius()
    }

    fn state(&self) -> ResourceState {
        if self.expended {
            ResourceState::Expended
        } else {
            ResourceState::Active
        }
    }

    fn update(&mut self, _env: &mut ResourceEnv<'_>) -> Option<Notice> {
        self.pending.clear();
        None
    }

    fn effects_for(&mut self, occupant: &Occupant, _dt_ms: f64, out: &mut Vec<Effect>) {
        if self.expended || !occupant.mature {
            return;
        }
        let offset = self.position.minus(occupant.position);
        let distance = offset.length();
        if distance <= self.horizon() {
            self.pending.push((occupant.id, occupant.digit));
            out.push(Effect::Consume);
            return;
        }
        let radius = self.gravity_radius();
        if distance < radius {
            let reach = (radius - distance) / radius;
            let resist = if occupant.shadow { SHADOW_PULL } else { 1.0 };
            let strength = GRAVITY_STRENGTH * self.mass() * reach * reach * resist;
            out.push(Effect::Attract(offset.normalized().scaled(strength)));
        }
    }

    fn expire(&mut self) {
        self.expended = true;
    }

    fn on_capture(&mut self, target: EntityId, captured: bool) {
        let Some(index) = self.pending.iter().position(|&(id, _)| id == target) else {
            return;
        };
        let (_, digit) = self.pending.swap_remove(index);
        if !captured {
            return;
        }
        self.consumed = self.consumed.saturating_add(1);
        self.size = match digit {
            Digit::One => (self.size + GROWTH_PER_ONE).min(MAX_SIZE),
            Digit::Zero => (self.size - SHRINK_PER_ZERO).max(MIN_SIZE),
        };
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn pulls_inside_gravity_radius_and_swallows_at_horizon() {
        let mut hole = BlackHole::new(Vec2::new(100.0, 100.0));
        let mut out = Vec::new();

        hole.effects_for(&Occupant::sample(Vec2::new(200.0, 100.0)), 16.0, &mut out);
        let Some(Effect::Attract(force)) = out.first().copied() else {
            panic!("expected a pull, got {out:?}");
        };
        assert!(force.x < 0.0, "pull points at the hole");

        out.clear();
        hole.effects_for(&Occupant::sample(Vec2::new(110.0, 100.0)), 16.0, &mut out);
        assert_eq!(out, vec![Effect::Consume]);

        out.clear();
        hole.effects_for(&Occupant::sample(Vec2::new(600.0, 100.0)), 16.0, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn shadows_feel_half_the_pull() {
        let mut hole = BlackHole::new(Vec2::ZERO);
        let plain = Occupant::sample(Vec2::new(100.0, 0.0));
        let shadow = Occupant {
            shadow: true,
            ..plain
        };
        let mut pull = |occupant: &Occupant| {
            let mut out = Vec::new();
            hole.effects_for(occupant, 16.0, &mut out);
            match out.first() {
                Some(Effect::Attract(force)) => force.length(),
                other => panic!("expected a pull, got {other:?}"),
            }
        };
        let full = pull(&plain);
        let halved = pull(&shadow);
        assert!((halved - full * SHADOW_PULL).abs() < 1e-12);
    }

    #[test]
    fn ones_feed_it_and_zeros_starve_it() {
        let mut hole = BlackHole::new(Vec2::ZERO);
        let one = Occupant {
            digit: Digit::One,
            ..Occupant::sample(Vec2::new(5.0, 0.0))
        };
        let zero = Occupant::sample(Vec2::new(0.0, 5.0));
        let mut out = Vec::new();
        hole.effects_for(&one, 16.0, &mut out);
        hole.effects_for(&zero, 16.0, &mut out);

        hole.on_capture(one.id, true);
        assert!((hole.size() - (BASE_SIZE + GROWTH_PER_ONE)).abs() < f64::EPSILON);
        hole.on_capture(zero.id, false);
        assert!((hole.size() - (BASE_SIZE + GROWTH_PER_ONE)).abs() < f64::EPSILON);
        assert_eq!(hole.consumed(), 1);
        assert!(hole.gravity_radius() > GRAVITY_RADIUS_PER_SIZE.mul_add(BASE_SIZE, GRAVITY_BASE_RADIUS));
    }

    #[test]
    fn size_stays_within_bounds() {
        let mut hole = BlackHole::new(Vec2::ZERO);
        for _ in 0..30 {
            let zero = Occupant::sample(Vec2::new(1.0, 0.0));
            let mut out = Vec::new();
            hole.effects_for(&zero, 16.0, &mut out);
            hole.on_capture(zero.id, true);
        }
        assert!((hole.size() - MIN_SIZE).abs() < f64::EPSILON);
    }
}

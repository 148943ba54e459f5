//! Shadow fireflies: dark wanderers that convert Zeros.
//!
//! ```text
//! Spawning -> Active <-> Fleeing
//!               |           |
//!               +-> Purifying -> expended
//! ```
//!
//! An active shadow drifts toward the nearest mature, unconverted Zero and
//! now and then converts one inside its reach. Golden entities are its only
//! threat: it flees any within range, and three close touches purify it.
//! It lives on its own energy, which drains steadily and grows with every
//! conversion.

use rand::Rng;

use firefly_agents::population::REFERENCE_FRAME_MS;
use firefly_types::{Digit, EntityId, ResourceId, ResourceState, ResourceVariant, Vec2};

use super::{Effect, Notice, Occupant, ResourceEnv, WorldResource, heading, nearest, random_in};

/// Fade-in before a shadow becomes active.
pub const SPAWN_MS: f64 = 2_000.0;

/// Time a purification takes.
pub const PURIFY_MS: f64 = 3_000.0;

/// Energy at spawn.
pub const START_ENERGY: f64 = 150.0;

/// Energy lost per millisecond.
const ENERGY_DECAY: f64 = 0.02;

/// Energy gained per conversion.
const CONVERSION_REWARD: f64 = 20.0;

/// Cruising speed in pixels per millisecond.
const SPEED: f64 = 0.04;

/// Velocity gained per reference frame toward prey.
const HUNT_PULL: f64 = 0.002;

/// Velocity gained per reference frame away from a golden entity.
const FLEE_PUSH: f64 = 0.005;

/// Range in which Zeros are noticed.
const HUNT_RANGE: f64 = 300.0;

/// Range in which a conversion can happen.
pub const CONVERSION_RADIUS: f64 = 60.0;

/// Chance per reference frame of converting a Zero in range.
const CONVERSION_CHANCE: f64 = 0.003;

/// Pause between conversions.
const CONVERSION_COOLDOWN_MS: f64 = 5_000.0;

/// Golden entities closer than this send the shadow fleeing.
const THREAT_RANGE: f64 = 100.0;

/// A fleeing shadow calms down once no golden entity is this close.
const SAFE_RANGE: f64 = 200.0;

/// Golden entities closer than this count a touch.
const TOUCH_RANGE: f64 = 40.0;

/// Touches that start purification.
pub const PURIFY_TOUCHES: u32 = 3;

/// Lifecycle phase of a shadow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowPhase {
    /// Fading in.
    Spawning,
    /// Hunting Zeros.
    Active,
    /// Running from a golden entity.
    Fleeing,
    /// Being cleansed; expends when done.
    Purifying,
}

/// A hazard that converts mature Zeros into shadows.
#[derive(Debug, Clone)]
pub struct ShadowFirefly {
    id: ResourceId,
    position: Vec2,
    velocity: Vec2,
    phase: ShadowPhase,
    age_ms: f64,
    energy: f64,
    conversion_cooldown_ms: f64,
    target: Option<EntityId>,
    conversions: u32,
    golden_touches: u32,
    purify_ms: f64,
    expended: bool,
}

impl ShadowFirefly {
    /// A fading-in shadow at `position`.
    pub fn new(position: Vec2) -> Self {
        Self {
            id: ResourceId::new(),
            position,
            velocity: Vec2::ZERO,
            phase: ShadowPhase::Spawning,
            age_ms: 0.0,
            energy: START_ENERGY,
            conversion_cooldown_ms: 0.0,
            target: None,
            conversions: 0,
            golden_touches: 0,
            purify_ms: 0.0,
            expended: false,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> ShadowPhase {
        self.phase
    }

    /// Remaining energy.
    pub const fn energy(&self) -> f64 {
        self.energy
    }

    /// Entities converted so far.
    pub const fn conversions(&self) -> u32 {
        self.conversions
    }

    /// Close golden touches so far.
    pub const fn golden_touches(&self) -> u32 {
        self.golden_touches
    }

    fn is_prey(occupant: &Occupant) -> bool {
        occupant.mature && occupant.digit == Digit::Zero && !occupant.shadow
    }

    fn hunt(&mut self, env: &mut ResourceEnv<'_>, step: f64) {
        self.conversion_cooldown_ms = (self.conversion_cooldown_ms - env.dt_ms).max(0.0);
        if let Some(prey) = nearest(self.position, HUNT_RANGE, env.occupants, Self::is_prey) {
            let pull = heading(self.position, prey.position).scaled(HUNT_PULL * step);
            self.velocity = self.velocity.plus(pull);
        }

        if let Some(golden) = nearest(self.position, THREAT_RANGE, env.occupants, |o| o.golden) {
            self.phase = ShadowPhase::Fleeing;
            if self.position.distance(golden.position) < TOUCH_RANGE {
                self.golden_touches = self.golden_touches.saturating_add(1);
                if self.golden_touches >= PURIFY_TOUCHES {
                    self.phase = ShadowPhase::Purifying;
                    self.velocity = Vec2::ZERO;
                }
            }
            return;
        }

        if self.conversion_cooldown_ms > 0.0 {
            return;
        }
        let chance = (CONVERSION_CHANCE * step).clamp(0.0, 1.0);
        let occupants = env.occupants;
        self.target = occupants
            .iter()
            .filter(|o| Self::is_prey(o) && self.position.distance(o.position) <= CONVERSION_RADIUS)
            .find(|_| env.rng.random_bool(chance))
            .map(|o| o.id);
    }

    fn flee(&mut self, env: &ResourceEnv<'_>, step: f64) {
        match nearest(self.position, SAFE_RANGE, env.occupants, |o| o.golden) {
            Some(golden) => {
                let push = heading(golden.position, self.position).scaled(FLEE_PUSH * step);
                self.velocity = self.velocity.plus(push);
            }
            None => self.phase = ShadowPhase::Active,
        }
    }
}

impl WorldResource for ShadowFirefly {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn variant(&self) -> ResourceVariant {
        ResourceVariant::Shadow
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn effect_radius(&self) -> f64 {
        CONVERSION_RADIUS
    }

    fn state(&self) -> ResourceState {
        if self.expended {
            ResourceState::Expended
        } else {
            ResourceState::Active
        }
    }

    fn update(&mut self, env: &mut ResourceEnv<'_>) -> Option<Notice> {
        if self.expended {
            return None;
        }
        let step = env.dt_ms / REFERENCE_FRAME_MS;
        self.age_ms += env.dt_ms;
        self.target = None;

        match self.phase {
            ShadowPhase::Spawning => {
                if self.age_ms >= SPAWN_MS {
                    self.phase = ShadowPhase::Active;
                    self.velocity = Vec2::new(
                        random_in(&mut *env.rng, -SPEED, SPEED),
                        random_in(&mut *env.rng, -SPEED, SPEED),
                    );
                }
            }
            ShadowPhase::Active => self.hunt(env, step),
            ShadowPhase::Fleeing => self.flee(env, step),
            ShadowPhase::Purifying => {
                self.purify_ms += env.dt_ms;
                if self.purify_ms >= PURIFY_MS {
                    self.expended = true;
                }
            }
        }

        self.energy -= ENERGY_DECAY * env.dt_ms;
        if self.energy <= 0.0 {
            self.expended = true;
        }

        self.velocity = self.velocity.limited(SPEED * 2.0);
        self.position = env
            .viewport
            .clamp(self.position.plus(self.velocity.scaled(env.dt_ms)));
        None
    }

    fn effects_for(&mut self, occupant: &Occupant, _dt_ms: f64, out: &mut Vec<Effect>) {
        if !self.expended && self.target == Some(occupant.id) && Self::is_prey(occupant) {
            out.push(Effect::Corrupt);
        }
    }

    fn expire(&mut self) {
        self.expended = true;
    }

    fn on_capture(&mut self, target: EntityId, captured: bool) {
        if self.target != Some(target) {
            return;
        }
        self.target = None;
        if captured {
            self.conversions = self.conversions.saturating_add(1);
            self.energy += CONVERSION_REWARD;
            self.conversion_cooldown_ms = CONVERSION_COOLDOWN_MS;
        }
    }

    fn push(&mut self, delta: Vec2) {
        self.position = self.position.plus(delta);
    }
}

#[cfg(test)]
mod tests {
    use firefly_types::Viewport;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn step(shadow: &mut ShadowFirefly, occupants: &[Occupant], dt_ms: f64, rng: &mut StdRng) {
        let mut env = ResourceEnv {
            dt_ms,
            occupants,
            viewport: Viewport::default(),
            rng,
            regen_multiplier: 1.0,
            hosts: &[],
        };
        let _ = shadow.update(&mut env);
    }

    fn active_shadow(rng: &mut StdRng) -> ShadowFirefly {
        let mut shadow = ShadowFirefly::new(Vec2::new(400.0, 400.0));
        step(&mut shadow, &[], SPAWN_MS, rng);
        assert_eq!(shadow.phase(), ShadowPhase::Active);
        shadow
    }

    #[test]
    fn converts_a_nearby_zero_and_then_rests() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut shadow = active_shadow(&mut rng);
        let mut zero = Occupant::sample(Vec2::new(420.0, 400.0));

        let mut converted = false;
        for _ in 0..5_000 {
            shadow.energy = START_ENERGY;
            zero.position = shadow.position().plus(Vec2::new(20.0, 0.0));
            step(&mut shadow, &[zero], 16.0, &mut rng);
            let mut out = Vec::new();
            shadow.effects_for(&zero, 16.0, &mut out);
            if out == vec![Effect::Corrupt] {
                shadow.on_capture(zero.id, true);
                converted = true;
                break;
            }
        }
        assert!(converted, "no conversion in 80 s next to a Zero");
        assert_eq!(shadow.conversions(), 1);

        step(&mut shadow, &[zero], 16.0, &mut rng);
        let mut out = Vec::new();
        shadow.effects_for(&zero, 16.0, &mut out);
        assert!(out.is_empty(), "cooldown blocks an immediate second conversion");
    }

    #[test]
    fn ignores_ones_and_converted_zeros() {
        let mut rng = StdRng::seed_from_u64(22);
        let mut shadow = active_shadow(&mut rng);
        let one = Occupant {
            digit: Digit::One,
            ..Occupant::sample(Vec2::new(410.0, 400.0))
        };
        let converted = Occupant {
            shadow: true,
            ..Occupant::sample(Vec2::new(390.0, 400.0))
        };
        for _ in 0..2_000 {
            shadow.energy = START_ENERGY;
            step(&mut shadow, &[one, converted], 16.0, &mut rng);
            let mut out = Vec::new();
            shadow.effects_for(&one, 16.0, &mut out);
            shadow.effects_for(&converted, 16.0, &mut out);
            assert!(out.is_empty());
        }
    }

    #[test]
    fn golden_touches_purify_it() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut shadow = active_shadow(&mut rng);
        let golden = Occupant {
            golden: true,
            digit: Digit::One,
            ..Occupant::sample(shadow.position())
        };
        let far = [Occupant {
            position: Vec2::new(1_500.0, 1_000.0),
            ..golden
        }];

        for _ in 0..PURIFY_TOUCHES {
            step(&mut shadow, &[golden], 16.0, &mut rng);
            if shadow.phase() == ShadowPhase::Fleeing {
                step(&mut shadow, &far, 16.0, &mut rng);
                assert_eq!(shadow.phase(), ShadowPhase::Active);
                shadow.position = golden.position;
            }
        }
        assert_eq!(shadow.phase(), ShadowPhase::Purifying);
        step(&mut shadow, &[], PURIFY_MS, &mut rng);
        assert_eq!(shadow.state(), ResourceState::Expended);
    }

    #[test]
    fn starves_without_conversions() {
        let mut rng = StdRng::seed_from_u64(24);
        let mut shadow = ShadowFirefly::new(Vec2::new(100.0, 100.0));
        for _ in 0..7 {
            step(&mut shadow, &[], 1_000.0, &mut rng);
        }
        assert_eq!(shadow.state(), ResourceState::Active);
        step(&mut shadow, &[], 1_000.0, &mut rng);
        assert_eq!(shadow.state(), ResourceState::Expended);
    }
}

//! Mobile predator stars.
//!
//! Each predator runs a small state machine:
//!
//! ```text
//! Patrol -> Detect -> Chase -> Strike -> Feed -> Patrol
//!    ^         |                                   |
//!    |         +--(lurkers wait for close prey)    |
//!    +---------------------------------------------+
//! Any hunting phase -> Retreat when more than 10 entities crowd it
//! Any phase -> Dormant when satiated, back to Patrol once digested
//! ```
//!
//! A predator only ever *requests* a capture of its struck target. The
//! resource manager rolls the target's resistance, checks shields, and
//! routes any kill through the population's removal path.

use rand::Rng;

use firefly_types::{
    EntityId, PredatorVariant, ResourceId, ResourceState, ResourceVariant, Vec2,
};

use super::{Effect, Notice, Occupant, ResourceEnv, WorldResource, random_in};

/// Lifetime of every predator.
pub const LIFETIME_MS: f64 = 180_000.0;

/// Fade-in before a predator starts hunting.
pub const BIRTH_MS: f64 = 1_500.0;

/// Crowd size that drives a predator off.
pub const RETREAT_CROWD: usize = 10;

/// Crowd size below which a retreating predator resumes patrol.
pub const CALM_CROWD: usize = 5;

/// Satiation gained per successful capture.
const SATIATION_PER_CATCH: f64 = 20.0;

/// Fraction of the satiation cap below which a dormant predator wakes.
const WAKE_FRACTION: f64 = 0.7;

/// Speed factor while dormant.
const DORMANT_SPEED: f64 = 0.2;

/// Speed factor while retreating.
const RETREAT_SPEED: f64 = 1.5;

/// Distance at which a patrol waypoint counts as reached.
const WAYPOINT_RADIUS: f64 = 20.0;

/// Distance at which a nova triggers its burst.
const NOVA_BURST_RANGE: f64 = 100.0;

/// Hunting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredatorPhase {
    /// Wandering between waypoints.
    Patrol,
    /// Picking a target.
    Detect,
    /// Pursuing the target.
    Chase,
    /// Attempting the capture this frame.
    Strike,
    /// Resting after a strike.
    Feed,
    /// Driven off by a crowd.
    Retreat,
    /// Satiated; barely moving.
    Dormant,
}

/// Tunables of one predator variant. Speeds are pixels per millisecond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredatorSpec {
    /// Patrol speed.
    pub speed: f64,
    /// Radius in which prey is noticed.
    pub detect_radius: f64,
    /// Distance beyond which a chase is abandoned.
    pub chase_radius: f64,
    /// Radius in which a strike lands.
    pub catch_radius: f64,
    /// Pursuit speed.
    pub chase_speed: f64,
    /// Pause between hunts.
    pub hunt_cooldown_ms: f64,
    /// Satiation at which the predator goes dormant.
    pub satiation_cap: f64,
    /// Satiation lost per second.
    pub satiation_decay: f64,
    /// Lurkers only strike prey this close.
    pub ambush_range: Option<f64>,
    /// Novas burst to double chase speed for this long.
    pub burst_ms: Option<f64>,
    /// Time between bursts.
    pub burst_cooldown_ms: f64,
}

impl PredatorSpec {
    /// Tunables for a variant.
    pub const fn of(variant: PredatorVariant) -> Self {
        match variant {
            PredatorVariant::Hunter => Self {
                speed: 0.08,
                detect_radius: 200.0,
                chase_radius: 300.0,
                catch_radius: 25.0,
                chase_speed: 0.15,
                hunt_cooldown_ms: 3_000.0,
                satiation_cap: 100.0,
                satiation_decay: 0.5,
                ambush_range: None,
                burst_ms: None,
                burst_cooldown_ms: 0.0,
            },
            PredatorVariant::Lurker => Self {
                speed: 0.02,
                detect_radius: 120.0,
                chase_radius: 150.0,
                catch_radius: 30.0,
                chase_speed: 0.25,
                hunt_cooldown_ms: 5_000.0,
                satiation_cap: 80.0,
                satiation_decay: 0.3,
                ambush_range: Some(80.0),
                burst_ms: None,
                burst_cooldown_ms: 0.0,
            },
            PredatorVariant::Drifter => Self {
                speed: 0.03,
                detect_radius: 300.0,
                chase_radius: 350.0,
                catch_radius: 40.0,
                chase_speed: 0.06,
                hunt_cooldown_ms: 2_000.0,
                satiation_cap: 150.0,
                satiation_decay: 0.8,
                ambush_range: None,
                burst_ms: None,
                burst_cooldown_ms: 0.0,
            },
            PredatorVariant::Nova => Self {
                speed: 0.01,
                detect_radius: 250.0,
                chase_radius: 100.0,
                catch_radius: 80.0,
                chase_speed: 0.4,
                hunt_cooldown_ms: 8_000.0,
                satiation_cap: 60.0,
                satiation_decay: 1.0,
                ambush_range: None,
                burst_ms: Some(500.0),
                burst_cooldown_ms: 10_000.0,
            },
        }
    }
}

/// A mobile hazard that hunts mature entities.
#[derive(Debug, Clone)]
pub struct PredatorStar {
    id: ResourceId,
    variant: PredatorVariant,
    spec: PredatorSpec,
    position: Vec2,
    velocity: Vec2,
    phase: PredatorPhase,
    target: Option<EntityId>,
    waypoint: Option<Vec2>,
    wait_ms: f64,
    satiation: f64,
    hunt_cooldown_ms: f64,
    burst_left_ms: f64,
    burst_cooldown_ms: f64,
    age_ms: f64,
    catches: u32,
    expended: bool,
}

impl PredatorStar {
    /// A hungry predator of `variant` at `position`.
    pub fn new(variant: PredatorVariant, position: Vec2) -> Self {
        Self {
            id: ResourceId::new(),
            variant,
            spec: PredatorSpec::of(variant),
            position,
            velocity: Vec2::ZERO,
            phase: PredatorPhase::Patrol,
            target: None,
            waypoint: None,
            wait_ms: 0.0,
            satiation: 0.0,
            hunt_cooldown_ms: 0.0,
            burst_left_ms: 0.0,
            burst_cooldown_ms: 0.0,
            age_ms: 0.0,
            catches: 0,
            expended: false,
        }
    }

    /// Predator variant.
    pub const fn predator_variant(&self) -> PredatorVariant {
        self.variant
    }

    /// Current hunting phase.
    pub const fn phase(&self) -> PredatorPhase {
        self.phase
    }

    /// Entity currently targeted.
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Successful captures so far.
    pub const fn catches(&self) -> u32 {
        self.catches
    }

    /// Current satiation.
    pub const fn satiation(&self) -> f64 {
        self.satiation
    }

    /// Variant tunables.
    pub const fn spec(&self) -> &PredatorSpec {
        &self.spec
    }

    const fn is_mature(&self) -> bool {
        self.age_ms >= BIRTH_MS
    }

    fn steer(&mut self, toward: Vec2, speed: f64) {
        let offset = toward.minus(self.position);
        if offset.length() > 1.0 {
            self.velocity = offset.normalized().scaled(speed);
        }
    }

    fn patrol(&mut self, env: &mut ResourceEnv<'_>) {
        let Some(waypoint) = self.waypoint else {
            self.wait_ms -= env.dt_ms;
            self.velocity = self.velocity.scaled(0.9);
            if self.wait_ms <= 0.0 {
                let (min, max) = env.viewport.inner_bounds(0.8);
                self.waypoint = Some(Vec2::new(
                    random_in(&mut *env.rng, min.x, max.x),
                    random_in(&mut *env.rng, min.y, max.y),
                ));
            }
            return;
        };
        if self.position.distance(waypoint) < WAYPOINT_RADIUS {
            self.waypoint = None;
            self.wait_ms = env.rng.random_range(2_000.0..5_000.0);
        } else {
            self.steer(waypoint, self.spec.speed);
        }
    }

    fn advance_timers(&mut self, dt_ms: f64) {
        self.age_ms += dt_ms;
        self.satiation = (self.satiation - self.spec.satiation_decay * dt_ms / 1000.0).max(0.0);
        self.hunt_cooldown_ms = (self.hunt_cooldown_ms - dt_ms).max(0.0);
        self.burst_left_ms = (self.burst_left_ms - dt_ms).max(0.0);
        self.burst_cooldown_ms = (self.burst_cooldown_ms - dt_ms).max(0.0);
    }

    fn hunt(&mut self, env: &mut ResourceEnv<'_>, prey: &[Occupant]) -> Option<Notice> {
        if prey.len() > RETREAT_CROWD {
            self.target = None;
            let entering = self.phase != PredatorPhase::Retreat;
            self.phase = PredatorPhase::Retreat;
            let center = centroid(prey);
            let away = self.position.minus(center);
            let direction = if away.length() > 1.0 {
                away.normalized()
            } else {
                Vec2::new(1.0, 0.0)
            };
            self.velocity = direction.scaled(self.spec.speed * RETREAT_SPEED);
            return entering.then_some(Notice::Repelled);
        }

        match self.phase {
            PredatorPhase::Retreat => {
                if prey.len() < CALM_CROWD {
                    self.phase = PredatorPhase::Patrol;
                }
            }
            PredatorPhase::Patrol => {
                self.patrol(env);
                if !prey.is_empty() && self.hunt_cooldown_ms <= 0.0 {
                    self.phase = PredatorPhase::Detect;
                }
            }
            PredatorPhase::Detect => self.detect(prey),
            PredatorPhase::Chase => self.chase(env.occupants),
            PredatorPhase::Strike => {
                self.target = None;
                self.phase = PredatorPhase::Feed;
            }
            PredatorPhase::Feed => {
                self.hunt_cooldown_ms = self.spec.hunt_cooldown_ms;
                self.phase = PredatorPhase::Patrol;
            }
            PredatorPhase::Dormant => {}
        }
        None
    }

    fn detect(&mut self, prey: &[Occupant]) {
        let nearest = prey.iter().min_by(|a, b| {
            self.position
                .distance(a.position)
                .total_cmp(&self.position.distance(b.position))
        });
        let Some(nearest) = nearest else {
            self.phase = PredatorPhase::Patrol;
            return;
        };
        match self.spec.ambush_range {
            Some(range) => {
                if self.position.distance(nearest.position) < range {
                    self.target = Some(nearest.id);
                    self.phase = PredatorPhase::Strike;
                }
            }
            None => {
                self.target = Some(nearest.id);
                self.phase = PredatorPhase::Chase;
            }
        }
    }

    fn chase(&mut self, occupants: &[Occupant]) {
        let found = self
            .target
            .and_then(|id| occupants.iter().find(|o| o.id == id && o.mature));
        let Some(target) = found else {
            self.target = None;
            self.phase = PredatorPhase::Patrol;
            return;
        };
        let distance = self.position.distance(target.position);
        if distance > self.spec.chase_radius {
            self.target = None;
            self.phase = PredatorPhase::Patrol;
            return;
        }
        if let Some(burst) = self.spec.burst_ms
            && self.burst_cooldown_ms <= 0.0
            && distance < NOVA_BURST_RANGE
        {
            self.burst_left_ms = burst;
            self.burst_cooldown_ms = self.spec.burst_cooldown_ms;
        }
        if distance < self.spec.catch_radius {
            self.phase = PredatorPhase::Strike;
        }
        let speed = if self.burst_left_ms > 0.0 {
            self.spec.chase_speed * 2.0
        } else {
            self.spec.chase_speed
        };
        self.steer(target.position, speed);
    }
}

impl WorldResource for PredatorStar {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn variant(&self) -> ResourceVariant {
        ResourceVariant::Predator(self.variant)
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn effect_radius(&self) -> f64 {
        self.spec.catch_radius
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
        self.advance_timers(env.dt_ms);
        if self.age_ms >= LIFETIME_MS {
            self.expended = true;
            return None;
        }

        if self.satiation >= self.spec.satiation_cap {
            self.phase = PredatorPhase::Dormant;
            self.target = None;
        } else if self.phase == PredatorPhase::Dormant
            && self.satiation < self.spec.satiation_cap * WAKE_FRACTION
        {
            self.phase = PredatorPhase::Patrol;
        }

        let mut notice = None;
        if self.phase == PredatorPhase::Dormant {
            self.velocity = self
                .velocity
                .normalized()
                .scaled(self.spec.speed * DORMANT_SPEED);
        } else if self.is_mature() {
            let detect = self.spec.detect_radius;
            let prey: Vec<Occupant> = env
                .occupants
                .iter()
                .filter(|o| o.mature && self.position.distance(o.position) < detect)
                .copied()
                .collect();
            notice = self.hunt(env, &prey);
        }

        self.position = env
            .viewport
            .clamp(self.position.plus(self.velocity.scaled(env.dt_ms)));
        notice
    }

    fn effects_for(&mut self, occupant: &Occupant, _dt_ms: f64, out: &mut Vec<Effect>) {
        if self.expended || self.phase != PredatorPhase::Strike || !occupant.mature {
            return;
        }
        if self.target == Some(occupant.id)
            && self.position.distance(occupant.position) < self.spec.catch_radius
        {
            out.push(Effect::Capture);
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
            self.catches = self.catches.saturating_add(1);
            self.satiation += SATIATION_PER_CATCH;
        }
    }

    fn push(&mut self, delta: Vec2) {
        self.position = self.position.plus(delta);
    }
}

pub(super) fn centroid(points: &[Occupant]) -> Vec2 {
    if points.is_empty() {
        return Vec2::ZERO;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = points.len() as f64;
    points
        .iter()
        .fold(Vec2::ZERO, |acc, o| acc.plus(o.position))
        .scaled(1.0 / count)
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use firefly_types::Viewport;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn prey_at(position: Vec2) -> Occupant {
        Occupant {
            energy_headroom: 100.0,
            ..Occupant::sample(position)
        }
    }

    fn step(predator: &mut PredatorStar, occupants: &[Occupant], rng: &mut StdRng) -> Option<Notice> {
        let mut env = ResourceEnv {
            dt_ms: 16.0,
            occupants,
            viewport: Viewport::default(),
            rng,
            regen_multiplier: 1.0,
            hosts: &[],
        };
        predator.update(&mut env)
    }

    #[test]
    fn hunter_chases_and_strikes_nearby_prey() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut predator = PredatorStar::new(PredatorVariant::Hunter, Vec2::new(400.0, 400.0));
        let prey = [prey_at(Vec2::new(450.0, 400.0))];

        let mut struck = false;
        for _ in 0..400 {
            let _ = step(&mut predator, &prey, &mut rng);
            if predator.phase() == PredatorPhase::Strike {
                let mut out = Vec::new();
                predator.effects_for(&prey[0], 16.0, &mut out);
                struck = out == vec![Effect::Capture];
                break;
            }
        }
        assert!(struck, "hunter never struck; phase {:?}", predator.phase());
    }

    #[test]
    fn crowd_drives_predator_off_once() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut predator = PredatorStar::new(PredatorVariant::Drifter, Vec2::new(400.0, 400.0));
        let crowd: Vec<Occupant> = (0..12)
            .map(|i| prey_at(Vec2::new(420.0 + f64::from(i), 400.0)))
            .collect();

        for _ in 0..100 {
            let _ = step(&mut predator, &[], &mut rng);
        }
        let first = step(&mut predator, &crowd, &mut rng);
        let second = step(&mut predator, &crowd, &mut rng);
        assert_eq!(first, Some(Notice::Repelled));
        assert_eq!(second, None);
        assert_eq!(predator.phase(), PredatorPhase::Retreat);
    }

    #[test]
    fn expires_after_lifetime() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut predator = PredatorStar::new(PredatorVariant::Lurker, Vec2::new(100.0, 100.0));
        let mut env = ResourceEnv {
            dt_ms: LIFETIME_MS,
            occupants: &[],
            viewport: Viewport::default(),
            rng: &mut rng,
            regen_multiplier: 1.0,
            hosts: &[],
        };
        let _ = predator.update(&mut env);
        assert_eq!(predator.state(), ResourceState::Expended);
    }

    #[test]
    fn satiation_puts_predator_to_sleep() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut predator = PredatorStar::new(PredatorVariant::Nova, Vec2::new(400.0, 400.0));
        let target = prey_at(Vec2::new(410.0, 400.0));
        for _ in 0..4 {
            predator.target = Some(target.id);
            predator.on_capture(target.id, true);
        }
        let _ = step(&mut predator, &[target], &mut rng);
        assert_eq!(predator.phase(), PredatorPhase::Dormant);
        assert_eq!(predator.catches(), 4);
    }
}

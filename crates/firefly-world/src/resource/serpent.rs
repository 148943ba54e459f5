//! Void serpents: long segmented hunters.
//!
//! ```text
//! Entering -> Hunting <-> Feeding
//!               |  ^
//!               v  |
//!             Fleeing
//! any phase -> Leaving -> expended (once off screen)
//! ```
//!
//! A serpent slides in from a viewport edge, turns toward the nearest
//! mature entity and swallows whatever its head reaches. Its body drags
//! nearby entities along in a gravitational wake. A dense crowd around the
//! head drives it off for a while. It leaves when its health runs out or its
//! lifespan ends.

use std::f64::consts::{PI, TAU};

use rand::Rng;

use firefly_agents::population::REFERENCE_FRAME_MS;
use firefly_types::{EntityId, ResourceId, ResourceState, ResourceVariant, Vec2, Viewport};

use super::predator::centroid;
use super::{Effect, Notice, Occupant, ResourceEnv, WorldResource, heading, nearest, random_in};

/// Segments including the head.
pub const SEGMENTS: usize = 8;

/// Resting distance between two segments.
const SEGMENT_SPACING: f64 = 25.0;

/// Fraction of the slack a segment closes per update.
const FOLLOW_RATE: f64 = 0.3;

/// Forward speed in pixels per millisecond.
const SPEED: f64 = 0.03;

/// Speed factor while fleeing.
const FLEE_SPEED: f64 = 1.5;

/// Turn rate in radians per millisecond.
const TURN_RATE: f64 = 0.002;

/// Peak side-to-side wave in radians.
const WAVE_AMPLITUDE: f64 = 0.3;

/// Wave phase advance per millisecond.
const WAVE_FREQUENCY: f64 = 0.003;

/// Range in which prey is noticed.
const DETECT_RADIUS: f64 = 200.0;

/// Distance from the head at which prey is swallowed.
pub const CONSUME_RADIUS: f64 = 20.0;

/// Range of the body's pull.
pub const WAKE_RADIUS: f64 = 100.0;

/// Pull at a segment's center.
const WAKE_STRENGTH: f64 = 0.008;

/// Health at spawn and its cap.
pub const MAX_HEALTH: f64 = 100.0;

/// Health lost per millisecond.
const HEALTH_DECAY: f64 = 0.005;

/// Health gained per swallowed entity.
const HEALTH_PER_MEAL: f64 = 15.0;

/// Pause after a meal.
const FEED_MS: f64 = 500.0;

/// Mature entities near the head that drive the serpent off.
pub const SWARM_THRESHOLD: usize = 8;

/// Radius around the head counted for swarm defense.
const SWARM_RADIUS: f64 = 80.0;

/// How long a repelled serpent flees.
const FLEE_MS: f64 = 5_000.0;

/// Minimum time in the entering phase.
const ENTER_MS: f64 = 2_000.0;

/// Distance from the edges the head must reach before hunting.
const ENTER_MARGIN: f64 = 50.0;

/// Distance from the edges at which a wandering serpent turns back.
const WANDER_MARGIN: f64 = 100.0;

/// Chance per reference frame of a random wander turn.
const WANDER_TURN_CHANCE: f64 = 0.01;

/// Distance outside the viewport at which a serpent spawns.
const SPAWN_OFFSET: f64 = 50.0;

/// Distance outside the viewport at which a leaving serpent is gone.
const EXIT_OFFSET: f64 = 150.0;

/// Lifespan range.
const LIFESPAN_MS: (f64, f64) = (30_000.0, 90_000.0);

/// Lifecycle phase of a serpent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerpentPhase {
    /// Sliding in from the edge.
    Entering,
    /// Looking for prey.
    Hunting,
    /// Digesting a meal.
    Feeding,
    /// Driven off by a crowd.
    Fleeing,
    /// Heading for the nearest edge.
    Leaving,
}

/// A segmented hazard that swallows entities with its head.
#[derive(Debug, Clone)]
pub struct VoidSerpent {
    id: ResourceId,
    head: Vec2,
    body: Vec<Vec2>,
    angle: f64,
    target_angle: f64,
    wave_phase: f64,
    phase: SerpentPhase,
    phase_ms: f64,
    age_ms: f64,
    lifespan_ms: f64,
    health: f64,
    prey: Option<EntityId>,
    strike: Option<EntityId>,
    consumed: u32,
    viewport: Viewport,
    expended: bool,
}

impl VoidSerpent {
    /// A serpent with its head at `head`, facing `angle` (radians).
    pub fn new(head: Vec2, angle: f64, lifespan_ms: f64, viewport: Viewport) -> Self {
        let back = Vec2::from_angle(angle).scaled(-SEGMENT_SPACING);
        let body = (1..SEGMENTS)
            .scan(head, |at, _| {
                *at = at.plus(back);
                Some(*at)
            })
            .collect();
        Self {
            id: ResourceId::new(),
            head,
            body,
            angle,
            target_angle: angle,
            wave_phase: 0.0,
            phase: SerpentPhase::Entering,
            phase_ms: 0.0,
            age_ms: 0.0,
            lifespan_ms,
            health: MAX_HEALTH,
            prey: None,
            strike: None,
            consumed: 0,
            viewport,
            expended: false,
        }
    }

    /// A serpent just outside a random edge, heading inward.
    pub fn from_edge(viewport: Viewport, rng: &mut impl Rng) -> Self {
        let (w, h) = (viewport.width, viewport.height);
        let jitter = random_in(rng, -0.25, 0.25);
        let (head, angle) = match rng.random_range(0..4_u8) {
            0 => (Vec2::new(random_in(rng, 0.0, w), -SPAWN_OFFSET), PI / 2.0),
            1 => (Vec2::new(w + SPAWN_OFFSET, random_in(rng, 0.0, h)), PI),
            2 => (Vec2::new(random_in(rng, 0.0, w), h + SPAWN_OFFSET), -PI / 2.0),
            _ => (Vec2::new(-SPAWN_OFFSET, random_in(rng, 0.0, h)), 0.0),
        };
        let lifespan = random_in(rng, LIFESPAN_MS.0, LIFESPAN_MS.1);
        Self::new(head, angle + jitter, lifespan, viewport)
    }

    /// Current phase.
    pub const fn phase(&self) -> SerpentPhase {
        self.phase
    }

    /// Current health.
    pub const fn health(&self) -> f64 {
        self.health
    }

    /// Entities swallowed so far.
    pub const fn consumed(&self) -> u32 {
        self.consumed
    }

    /// Head followed by every body segment.
    pub fn segments(&self) -> impl Iterator<Item = Vec2> + '_ {
        std::iter::once(self.head).chain(self.body.iter().copied())
    }

    fn enter_phase(&mut self, phase: SerpentPhase) {
        self.phase = phase;
        self.phase_ms = 0.0;
    }

    fn turn(&mut self, dt_ms: f64) {
        let diff = (self.target_angle - self.angle + PI).rem_euclid(TAU) - PI;
        let limit = TURN_RATE * dt_ms;
        self.angle += diff.clamp(-limit, limit);
    }

    fn slide(&mut self, dt_ms: f64, speed: f64) {
        let wave = self.wave_phase.sin() * WAVE_AMPLITUDE;
        self.head = self
            .head
            .plus(Vec2::from_angle(self.angle + wave).scaled(speed * dt_ms));
    }

    fn follow(&mut self) {
        let mut leader = self.head;
        for segment in &mut self.body {
            let offset = segment.minus(leader);
            let distance = offset.length();
            if distance > SEGMENT_SPACING {
                let slack = (distance - SEGMENT_SPACING) / distance;
                *segment = segment.minus(offset.scaled(slack * FOLLOW_RATE));
            }
            leader = *segment;
        }
    }

    fn on_screen(&self, margin: f64) -> bool {
        self.head.x > margin
            && self.head.y > margin
            && self.head.x < self.viewport.width - margin
            && self.head.y < self.viewport.height - margin
    }

    fn hunt(&mut self, env: &mut ResourceEnv<'_>) -> Option<Notice> {
        let occupants = env.occupants;
        let crowd: Vec<Occupant> = occupants
            .iter()
            .filter(|o| o.mature && self.head.distance(o.position) < SWARM_RADIUS)
            .copied()
            .collect();
        if crowd.len() >= SWARM_THRESHOLD {
            self.prey = None;
            let away = self.head.minus(centroid(&crowd));
            self.target_angle = away.y.atan2(away.x);
            self.enter_phase(SerpentPhase::Fleeing);
            return Some(Notice::Repelled);
        }

        let tracked = self
            .prey
            .and_then(|id| occupants.iter().find(|o| o.id == id && o.mature));
        let prey = tracked.or_else(|| nearest(self.head, DETECT_RADIUS, occupants, |o| o.mature));
        self.prey = prey.map(|o| o.id);
        match prey {
            Some(prey) => {
                let toward = prey.position.minus(self.head);
                self.target_angle = toward.y.atan2(toward.x);
            }
            None => self.wander(env),
        }

        self.strike = nearest(self.head, CONSUME_RADIUS, occupants, |o| o.mature).map(|o| o.id);
        self.turn(env.dt_ms);
        self.slide(env.dt_ms, SPEED);
        None
    }

    fn wander(&mut self, env: &mut ResourceEnv<'_>) {
        let chance = (WANDER_TURN_CHANCE * env.dt_ms / REFERENCE_FRAME_MS).clamp(0.0, 1.0);
        if env.rng.random_bool(chance) {
            self.target_angle += random_in(&mut *env.rng, -0.5, 0.5);
        }
        let (w, h) = (self.viewport.width, self.viewport.height);
        if self.head.x < WANDER_MARGIN {
            self.target_angle = 0.0;
        } else if self.head.x > w - WANDER_MARGIN {
            self.target_angle = PI;
        }
        if self.head.y < WANDER_MARGIN {
            self.target_angle = PI / 2.0;
        } else if self.head.y > h - WANDER_MARGIN {
            self.target_angle = -PI / 2.0;
        }
    }

    fn leave(&mut self, dt_ms: f64) {
        let (w, h) = (self.viewport.width, self.viewport.height);
        let exits = [
            (self.head.x, PI),
            (w - self.head.x, 0.0),
            (self.head.y, -PI / 2.0),
            (h - self.head.y, PI / 2.0),
        ];
        if let Some(&(_, angle)) = exits.iter().min_by(|a, b| a.0.total_cmp(&b.0)) {
            self.target_angle = angle;
        }
        self.turn(dt_ms);
        self.slide(dt_ms, SPEED);
        if !self.on_screen(-EXIT_OFFSET) {
            self.expended = true;
        }
    }
}

impl WorldResource for VoidSerpent {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn variant(&self) -> ResourceVariant {
        ResourceVariant::Serpent
    }

    fn position(&self) -> Vec2 {
        self.head
    }

    fn effect_radius(&self) -> f64 {
        WAKE_RADIUS
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
        let dt_ms = env.dt_ms;
        self.viewport = env.viewport;
        self.age_ms += dt_ms;
        self.phase_ms += dt_ms;
        self.wave_phase += dt_ms * WAVE_FREQUENCY;
        self.health -= HEALTH_DECAY * dt_ms;
        self.strike = None;

        if self.phase != SerpentPhase::Leaving
            && (self.health <= 0.0 || self.age_ms >= self.lifespan_ms)
        {
            self.prey = None;
            self.enter_phase(SerpentPhase::Leaving);
        }

        let mut notice = None;
        match self.phase {
            SerpentPhase::Entering => {
                self.slide(dt_ms, SPEED);
                if self.phase_ms >= ENTER_MS && self.on_screen(ENTER_MARGIN) {
                    self.enter_phase(SerpentPhase::Hunting);
                }
            }
            SerpentPhase::Hunting => notice = self.hunt(env),
            SerpentPhase::Feeding => {
                if self.phase_ms >= FEED_MS {
                    self.enter_phase(SerpentPhase::Hunting);
                }
            }
            SerpentPhase::Fleeing => {
                let away = self.head.minus(self.viewport.center());
                self.target_angle = away.y.atan2(away.x);
                self.turn(dt_ms);
                self.slide(dt_ms, SPEED * FLEE_SPEED);
                if self.phase_ms >= FLEE_MS {
                    self.enter_phase(SerpentPhase::Hunting);
                }
            }
            SerpentPhase::Leaving => self.leave(dt_ms),
        }
        self.follow();
        notice
    }

    fn effects_for(&mut self, occupant: &Occupant, _dt_ms: f64, out: &mut Vec<Effect>) {
        if self.expended || self.phase == SerpentPhase::Leaving || !occupant.mature {
            return;
        }
        if self.strike == Some(occupant.id) {
            out.push(Effect::Consume);
            return;
        }
        let wake = self.segments().find_map(|segment| {
            let distance = segment.distance(occupant.position);
            (distance > CONSUME_RADIUS && distance < WAKE_RADIUS).then(|| {
                let strength = WAKE_STRENGTH * (1.0 - distance / WAKE_RADIUS);
                heading(occupant.position, segment).scaled(strength)
            })
        });
        if let Some(force) = wake {
            out.push(Effect::Attract(force));
        }
    }

    fn expire(&mut self) {
        self.expended = true;
    }

    fn on_capture(&mut self, target: EntityId, captured: bool) {
        if self.strike != Some(target) {
            return;
        }
        self.strike = None;
        if captured {
            self.consumed = self.consumed.saturating_add(1);
            self.health = (self.health + HEALTH_PER_MEAL).min(MAX_HEALTH);
            self.prey = None;
            self.enter_phase(SerpentPhase::Feeding);
        }
    }

    fn push(&mut self, delta: Vec2) {
        self.head = self.head.plus(delta);
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn step(serpent: &mut VoidSerpent, occupants: &[Occupant], dt_ms: f64, rng: &mut StdRng) -> Option<Notice> {
        let mut env = ResourceEnv {
            dt_ms,
            occupants,
            viewport: Viewport::new(1000.0, 1000.0),
            rng,
            regen_multiplier: 1.0,
            hosts: &[],
        };
        serpent.update(&mut env)
    }

    fn hunting_serpent() -> VoidSerpent {
        let mut serpent = VoidSerpent::new(Vec2::new(500.0, 500.0), 0.0, 60_000.0, Viewport::new(1000.0, 1000.0));
        serpent.enter_phase(SerpentPhase::Hunting);
        serpent
    }

    #[test]
    fn spawns_outside_an_edge_with_a_full_body() {
        let mut rng = StdRng::seed_from_u64(41);
        let viewport = Viewport::new(800.0, 600.0);
        for _ in 0..20 {
            let serpent = VoidSerpent::from_edge(viewport, &mut rng);
            assert!(!viewport.contains(serpent.position()));
            assert_eq!(serpent.segments().count(), SEGMENTS);
            assert_eq!(serpent.phase(), SerpentPhase::Entering);
        }
    }

    #[test]
    fn enters_then_hunts() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut serpent = VoidSerpent::new(Vec2::new(-50.0, 500.0), 0.0, 60_000.0, Viewport::new(1000.0, 1000.0));
        for _ in 0..400 {
            let _ = step(&mut serpent, &[], 16.0, &mut rng);
        }
        assert_eq!(serpent.phase(), SerpentPhase::Hunting);
    }

    #[test]
    fn head_swallows_and_feeds() {
        let mut rng = StdRng::seed_from_u64(43);
        let mut serpent = hunting_serpent();
        let prey = Occupant::sample(Vec2::new(510.0, 500.0));
        let _ = step(&mut serpent, &[prey], 16.0, &mut rng);

        let mut out = Vec::new();
        serpent.effects_for(&prey, 16.0, &mut out);
        assert_eq!(out, vec![Effect::Consume]);

        let before = serpent.health();
        serpent.on_capture(prey.id, true);
        assert_eq!(serpent.phase(), SerpentPhase::Feeding);
        assert_eq!(serpent.consumed(), 1);
        assert!(serpent.health() > before);
    }

    #[test]
    fn body_drags_entities_in_its_wake() {
        let mut serpent = hunting_serpent();
        let beside = Occupant::sample(Vec2::new(450.0, 550.0));
        let mut out = Vec::new();
        serpent.effects_for(&beside, 16.0, &mut out);
        let Some(Effect::Attract(force)) = out.first().copied() else {
            panic!("expected a wake pull, got {out:?}");
        };
        assert!(force.y < 0.0, "pulled toward the body");
    }

    #[test]
    fn crowd_drives_it_off() {
        let mut rng = StdRng::seed_from_u64(44);
        let mut serpent = hunting_serpent();
        let crowd: Vec<Occupant> = (0_u32..)
            .take(SWARM_THRESHOLD)
            .map(|i| Occupant::sample(Vec2::new(530.0, 5.0f64.mul_add(f64::from(i), 470.0))))
            .collect();
        assert_eq!(step(&mut serpent, &crowd, 16.0, &mut rng), Some(Notice::Repelled));
        assert_eq!(serpent.phase(), SerpentPhase::Fleeing);
        let _ = step(&mut serpent, &[], FLEE_MS, &mut rng);
        assert_eq!(serpent.phase(), SerpentPhase::Hunting);
    }

    #[test]
    fn leaves_and_expires_when_starved() {
        let mut rng = StdRng::seed_from_u64(45);
        let mut serpent = hunting_serpent();
        let _ = step(&mut serpent, &[], MAX_HEALTH / HEALTH_DECAY, &mut rng);
        assert_eq!(serpent.phase(), SerpentPhase::Leaving);
        for _ in 0..3_000 {
            let _ = step(&mut serpent, &[], 16.0, &mut rng);
            if serpent.state() == ResourceState::Expended {
                break;
            }
        }
        assert_eq!(serpent.state(), ResourceState::Expended);
    }
}

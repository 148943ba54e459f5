//! Parasites: small drifters that latch onto entities and feed on them.
//!
//! ```text
//! Seeking -> Attaching -> Attached -> Detaching -> Seeking
//! ```
//!
//! A seeking parasite homes in on the nearest mature host with energy to
//! spare. Once attached it rides the host and drains a fixed amount every
//! tick until it is full, the host runs dry, the host shakes it off by
//! moving fast, or it has held on too long. A parasite that finds nobody
//! before it grows old dies off.

use rand::Rng;

use firefly_agents::population::REFERENCE_FRAME_MS;
use firefly_types::{EntityId, ResourceId, ResourceState, ResourceVariant, Vec2, Viewport};

use super::{Effect, Notice, Occupant, ResourceEnv, WorldResource, heading, nearest, random_in};

/// Range in which hosts are noticed.
const SEEK_RANGE: f64 = 150.0;

/// Distance at which a seeking parasite latches on.
pub const ATTACH_DISTANCE: f64 = 15.0;

/// Time to settle onto a host.
pub const ATTACH_MS: f64 = 300.0;

/// Time to let go of a host.
pub const DETACH_MS: f64 = 500.0;

/// Pause after detaching before seeking again.
const DETACH_COOLDOWN_MS: f64 = 3_000.0;

/// Hosts below this energy are ignored.
const MIN_HOST_ENERGY: f64 = 30.0;

/// Parasites one host can carry.
pub const MAX_PER_HOST: usize = 3;

/// Energy taken per drain tick.
const DRAIN_AMOUNT: f64 = 8.0;

/// Interval between drain ticks.
const DRAIN_INTERVAL_MS: f64 = 100.0;

/// Energy taken from one host before letting go.
pub const MAX_DRAIN: f64 = 40.0;

/// Longest time spent on one host.
pub const MAX_ATTACH_MS: f64 = 30_000.0;

/// Host speed above which it may shake the parasite off.
const SHAKE_SPEED: f64 = 0.08;

/// Chance per reference frame of a fast host shaking free.
const SHAKE_CHANCE: f64 = 0.01;

/// Age at which a parasite without a host dies.
pub const MAX_SEEK_AGE_MS: f64 = 15_000.0;

/// Velocity gained per reference frame toward a host.
const SEEK_PULL: f64 = 0.003;

/// Velocity retained per reference frame.
const DAMPING: f64 = 0.95;

/// Top speed in pixels per millisecond.
const MAX_SPEED: f64 = 0.05;

/// Chance per reference frame of a random nudge while idle.
const WANDER_CHANCE: f64 = 0.02;

/// Size of a random nudge.
const WANDER_NUDGE: f64 = 0.01;

/// Closest and farthest a parasite rides from its host's center.
const RIDE_OFFSET: (f64, f64) = (5.0, 10.0);

/// Lifecycle phase of a parasite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParasitePhase {
    /// Looking for a host.
    Seeking,
    /// Settling onto a host.
    Attaching,
    /// Feeding on a host.
    Attached,
    /// Letting go.
    Detaching,
}

/// A hazard that drains energy from the entity it rides.
#[derive(Debug, Clone)]
pub struct Parasite {
    id: ResourceId,
    position: Vec2,
    velocity: Vec2,
    phase: ParasitePhase,
    phase_ms: f64,
    age_ms: f64,
    host: Option<EntityId>,
    offset: Vec2,
    attached_ms: f64,
    drain_clock_ms: f64,
    owed: f64,
    drained: f64,
    lifetime_drained: f64,
    cooldown_ms: f64,
    expended: bool,
}

impl Parasite {
    /// A seeking parasite at `position`.
    pub fn new(position: Vec2) -> Self {
        Self {
            id: ResourceId::new(),
            position,
            velocity: Vec2::ZERO,
            phase: ParasitePhase::Seeking,
            phase_ms: 0.0,
            age_ms: 0.0,
            host: None,
            offset: Vec2::ZERO,
            attached_ms: 0.0,
            drain_clock_ms: 0.0,
            owed: 0.0,
            drained: 0.0,
            lifetime_drained: 0.0,
            cooldown_ms: 0.0,
            expended: false,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> ParasitePhase {
        self.phase
    }

    /// Energy taken from the current host.
    pub const fn drained(&self) -> f64 {
        self.drained
    }

    /// Energy taken over the parasite's whole life.
    pub const fn lifetime_drained(&self) -> f64 {
        self.lifetime_drained
    }

    fn enter(&mut self, phase: ParasitePhase) {
        self.phase = phase;
        self.phase_ms = 0.0;
    }

    fn detach(&mut self) {
        self.host = None;
        self.owed = 0.0;
        self.enter(ParasitePhase::Detaching);
    }

    fn seek(&mut self, env: &mut ResourceEnv<'_>, step: f64) {
        self.age_ms += env.dt_ms;
        if self.age_ms >= MAX_SEEK_AGE_MS {
            self.expended = true;
            return;
        }

        if self.cooldown_ms > 0.0 {
            self.cooldown_ms = (self.cooldown_ms - env.dt_ms).max(0.0);
            if env.rng.random_bool((WANDER_CHANCE * step).clamp(0.0, 1.0)) {
                let nudge = Vec2::new(
                    random_in(&mut *env.rng, -WANDER_NUDGE, WANDER_NUDGE),
                    random_in(&mut *env.rng, -WANDER_NUDGE, WANDER_NUDGE),
                );
                self.velocity = self.velocity.plus(nudge);
            }
            return;
        }

        let hosts = env.hosts;
        let occupants = env.occupants;
        let candidate = nearest(self.position, SEEK_RANGE, occupants, |o| {
            o.mature
                && o.energy >= MIN_HOST_ENERGY
                && hosts.iter().filter(|&&h| h == o.id).count() < MAX_PER_HOST
        });
        let Some(host) = candidate else {
            return;
        };
        let pull = heading(self.position, host.position).scaled(SEEK_PULL * step);
        self.velocity = self.velocity.plus(pull);

        if self.position.distance(host.position) < ATTACH_DISTANCE {
            let angle = random_in(&mut *env.rng, 0.0, std::f64::consts::TAU);
            let radius = random_in(&mut *env.rng, RIDE_OFFSET.0, RIDE_OFFSET.1);
            self.offset = Vec2::from_angle(angle).scaled(radius);
            self.host = Some(host.id);
            self.velocity = Vec2::ZERO;
            self.attached_ms = 0.0;
            self.drain_clock_ms = 0.0;
            self.drained = 0.0;
            self.enter(ParasitePhase::Attaching);
        }
    }

    fn ride(&mut self, env: &mut ResourceEnv<'_>, step: f64) {
        let occupants = env.occupants;
        let host = self
            .host
            .and_then(|id| occupants.iter().find(|o| o.id == id));
        let Some(host) = host.filter(|h| h.energy > 0.0) else {
            self.detach();
            return;
        };
        let anchor = host.position.plus(self.offset);

        if self.phase == ParasitePhase::Attaching {
            let blend = (self.phase_ms / ATTACH_MS).clamp(0.0, 1.0);
            self.position = self.position.plus(anchor.minus(self.position).scaled(blend));
            if self.phase_ms >= ATTACH_MS {
                self.enter(ParasitePhase::Attached);
            }
            return;
        }

        self.position = anchor;
        self.attached_ms += env.dt_ms;
        self.drain_clock_ms += env.dt_ms;
        let ticks = (self.drain_clock_ms / DRAIN_INTERVAL_MS).floor();
        self.drain_clock_ms -= ticks * DRAIN_INTERVAL_MS;
        self.owed += ticks * DRAIN_AMOUNT;
        self.owed = self.owed.min((MAX_DRAIN - self.drained).max(0.0));

        let shaken = host.speed > SHAKE_SPEED
            && env.rng.random_bool((SHAKE_CHANCE * step).clamp(0.0, 1.0));
        if shaken || self.attached_ms >= MAX_ATTACH_MS || self.drained >= MAX_DRAIN {
            self.detach();
        }
    }

    fn drift(&mut self, viewport: Viewport, dt_ms: f64, step: f64) {
        self.velocity = self.velocity.scaled(DAMPING.powf(step)).limited(MAX_SPEED);
        let next = self.position.plus(self.velocity.scaled(dt_ms));
        self.position = Vec2::new(
            next.x.rem_euclid(viewport.width.max(1.0)),
            next.y.rem_euclid(viewport.height.max(1.0)),
        );
    }
}

impl WorldResource for Parasite {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn variant(&self) -> ResourceVariant {
        ResourceVariant::Parasite
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn effect_radius(&self) -> f64 {
        ATTACH_DISTANCE
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
        self.phase_ms += env.dt_ms;

        match self.phase {
            ParasitePhase::Seeking => {
                self.seek(env, step);
                self.drift(env.viewport, env.dt_ms, step);
            }
            ParasitePhase::Attaching | ParasitePhase::Attached => self.ride(env, step),
            ParasitePhase::Detaching => {
                let jitter = Vec2::new(
                    random_in(&mut *env.rng, -WANDER_NUDGE, WANDER_NUDGE),
                    random_in(&mut *env.rng, -WANDER_NUDGE, WANDER_NUDGE),
                );
                self.velocity = self.velocity.plus(jitter);
                self.drift(env.viewport, env.dt_ms, step);
                if self.phase_ms >= DETACH_MS {
                    self.age_ms = 0.0;
                    self.drained = 0.0;
                    self.cooldown_ms = DETACH_COOLDOWN_MS;
                    self.enter(ParasitePhase::Seeking);
                }
            }
        }
        None
    }

    fn effects_for(&mut self, occupant: &Occupant, _dt_ms: f64, out: &mut Vec<Effect>) {
        if self.expended
            || self.phase != ParasitePhase::Attached
            || self.host != Some(occupant.id)
            || self.owed <= 0.0
        {
            return;
        }
        let amount = self.owed.min(occupant.energy.max(0.0));
        self.owed = 0.0;
        if amount > 0.0 {
            self.drained += amount;
            self.lifetime_drained += amount;
            out.push(Effect::Drain(amount));
        }
    }

    fn expire(&mut self) {
        self.expended = true;
    }

    fn host(&self) -> Option<EntityId> {
        match self.phase {
            ParasitePhase::Attaching | ParasitePhase::Attached => self.host,
            ParasitePhase::Seeking | ParasitePhase::Detaching => None,
        }
    }

    fn push(&mut self, delta: Vec2) {
        if self.host.is_none() {
            self.position = self.position.plus(delta);
        }
    }
}

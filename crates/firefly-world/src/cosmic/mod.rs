//! The Cosmic Event Scheduler.
//!
//! Each event kind is either idle or active. Every
//! `event_check_interval_ms` the scheduler rolls `base_event_chance`; on
//! success, and while fewer than `max_concurrent_events` are active, it
//! picks by rarity weight among the kinds that are idle, off cooldown, and
//! overlap-compatible with everything active. An active event owns a
//! [`CosmicEffect`] handler that is ticked every frame until its duration
//! elapses.
//!
//! | Type | Rarity | Duration (s) | Cooldown (s) | Overlaps with |
//! |---|---|---|---|---|
//! | `SOLAR_FLARE` | 0.30 | 5-15 | 60 | `NEBULA_DRIFT` |
//! | `METEOR_SHOWER` | 0.25 | 10-30 | 90 | `SOLAR_FLARE`, `ECLIPSE` |
//! | `VOID_STORM` | 0.15 | 8-20 | 120 | none |
//! | `ECLIPSE` | 0.15 | 15-45 | 180 | `METEOR_SHOWER` |
//! | `NEBULA_DRIFT` | 0.10 | 20-60 | 150 | `SOLAR_FLARE`, `METEOR_SHOWER`, `ECLIPSE` |
//! | `COMET` | 0.05 | 8-15 | 300 | `NEBULA_DRIFT` |

pub mod events;

use std::collections::{BTreeMap, VecDeque};
use std::f64::consts::PI;
use std::panic::{AssertUnwindSafe, catch_unwind};

use rand::Rng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use firefly_agents::PopulationManager;
use firefly_events::{EventBus, EventKind, panic_message};
use firefly_types::{CosmicEventKind, Modifiers};

use crate::config::CosmicConfig;
use crate::error::WorldError;

pub use events::effect_for;

/// Starts remembered in the history.
pub const HISTORY_LIMIT: usize = 50;

/// Intensity range of a started event.
const INTENSITY_RANGE: (f64, f64) = (0.5, 1.0);

/// Static scheduling data of one event kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventSpec {
    /// Relative selection weight.
    pub rarity: f64,
    /// Shortest duration.
    pub min_duration_ms: f64,
    /// Longest duration.
    pub max_duration_ms: f64,
    /// Minimum time between two starts of this kind.
    pub cooldown_ms: f64,
    /// Kinds this one may run alongside.
    pub overlaps: &'static [CosmicEventKind],
}

impl EventSpec {
    /// Scheduling data for a kind.
    pub const fn of(kind: CosmicEventKind) -> Self {
        use CosmicEventKind::{Comet, Eclipse, MeteorShower, NebulaDrift, SolarFlare, VoidStorm};
        match kind {
            SolarFlare => Self {
                rarity: 0.30,
                min_duration_ms: 5_000.0,
                max_duration_ms: 15_000.0,
                cooldown_ms: 60_000.0,
                overlaps: &[NebulaDrift],
            },
            MeteorShower => Self {
                rarity: 0.25,
                min_duration_ms: 10_000.0,
                max_duration_ms: 30_000.0,
                cooldown_ms: 90_000.0,
                overlaps: &[SolarFlare, Eclipse],
            },
            VoidStorm => Self {
                rarity: 0.15,
                min_duration_ms: 8_000.0,
                max_duration_ms: 20_000.0,
                cooldown_ms: 120_000.0,
                overlaps: &[],
            },
            Eclipse => Self {
                rarity: 0.15,
                min_duration_ms: 15_000.0,
                max_duration_ms: 45_000.0,
                cooldown_ms: 180_000.0,
                overlaps: &[MeteorShower],
            },
            NebulaDrift => Self {
                rarity: 0.10,
                min_duration_ms: 20_000.0,
                max_duration_ms: 60_000.0,
                cooldown_ms: 150_000.0,
                overlaps: &[SolarFlare, MeteorShower, Eclipse],
            },
            Comet => Self {
                rarity: 0.05,
                min_duration_ms: 8_000.0,
                max_duration_ms: 15_000.0,
                cooldown_ms: 300_000.0,
                overlaps: &[NebulaDrift],
            },
        }
    }
}

/// Whether two kinds may be active together. Either side allowing is enough.
pub fn can_overlap(a: CosmicEventKind, b: CosmicEventKind) -> bool {
    EventSpec::of(a).overlaps.contains(&b) || EventSpec::of(b).overlaps.contains(&a)
}

/// Timing and intensity of a running event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveEvent {
    /// Event type.
    pub kind: CosmicEventKind,
    /// Scheduler time at start.
    pub started_at_ms: f64,
    /// Total duration.
    pub duration_ms: f64,
    /// Time elapsed since start.
    pub elapsed_ms: f64,
    /// Strength in `[0.5, 1.0]`.
    pub intensity: f64,
}

impl ActiveEvent {
    /// Fraction of the duration elapsed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Rise-and-fall envelope `sin(progress * pi)`.
    pub fn curve(&self) -> f64 {
        (self.progress() * PI).sin()
    }

    /// Whether the duration has elapsed.
    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

/// One remembered start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// Event type.
    pub kind: CosmicEventKind,
    /// Scheduler time at start.
    pub started_at_ms: f64,
    /// Planned duration.
    pub duration_ms: f64,
    /// Intensity.
    pub intensity: f64,
}

/// Result of [`CosmicScheduler::force_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceOutcome {
    /// The event started.
    Started,
    /// The same kind is already running; nothing changed.
    AlreadyActive,
    /// The concurrency cap is reached; nothing changed.
    AtCapacity,
}

/// Per-frame input to cosmic effects.
#[derive(Debug)]
pub struct CosmicContext<'a> {
    /// Elapsed milliseconds.
    pub dt_ms: f64,
    /// The entity arena.
    pub population: &'a mut PopulationManager,
    /// Shared random source.
    pub rng: &'a mut StdRng,
    /// Notification bus.
    pub bus: &'a mut EventBus,
}

/// The continuous effect of one running event.
pub trait CosmicEffect: std::fmt::Debug {
    /// The event this handler implements.
    fn kind(&self) -> CosmicEventKind;

    /// One-time effect when the event starts.
    fn start(&mut self, _event: &ActiveEvent, _ctx: &mut CosmicContext<'_>) -> Result<(), WorldError> {
        Ok(())
    }

    /// Per-frame effect while active.
    fn update(&mut self, event: &ActiveEvent, ctx: &mut CosmicContext<'_>) -> Result<(), WorldError>;

    /// Release anything the event was applying.
    fn end(&mut self, _event: &ActiveEvent) {}

    /// Environment modifiers contributed while active.
    fn modifiers(&self, _event: &ActiveEvent) -> Modifiers {
        Modifiers::NEUTRAL
    }

    /// Multiplier on energy-well regeneration while active.
    fn regen_multiplier(&self, _event: &ActiveEvent) -> f64 {
        1.0
    }
}

/// Kinds started and ended during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CosmicReport {
    /// Kinds that started.
    pub started: Vec<CosmicEventKind>,
    /// Kinds that ended.
    pub ended: Vec<CosmicEventKind>,
    /// Handler calls that failed.
    pub failed: usize,
}

#[derive(Debug)]
struct Running {
    event: ActiveEvent,
    effect: Box<dyn CosmicEffect>,
}

/// Concurrency-capped probabilistic scheduler.
#[derive(Debug)]
pub struct CosmicScheduler {
    config: CosmicConfig,
    active: BTreeMap<CosmicEventKind, Running>,
    last_started: BTreeMap<CosmicEventKind, f64>,
    since_check_ms: f64,
    now_ms: f64,
    history: VecDeque<HistoryEntry>,
    failures: u64,
}

impl CosmicScheduler {
    /// An idle scheduler.
    pub fn new(config: CosmicConfig) -> Self {
        Self {
            config,
            active: BTreeMap::new(),
            last_started: BTreeMap::new(),
            since_check_ms: 0.0,
            now_ms: 0.0,
            history: VecDeque::new(),
            failures: 0,
        }
    }

    /// Advance time, run the periodic check, update and end events.
    pub fn tick(&mut self, ctx: &mut CosmicContext<'_>) -> CosmicReport {
        let mut report = CosmicReport::default();
        self.now_ms += ctx.dt_ms;

        if self.config.enabled {
            self.since_check_ms += ctx.dt_ms;
            if self.since_check_ms >= self.config.event_check_interval_ms {
                self.since_check_ms = 0.0;
                if let Some(kind) = self.check(ctx) {
                    report.started.push(kind);
                }
            }
        }

        let mut finished = Vec::new();
        for (kind, running) in &mut self.active {
            running.event.elapsed_ms += ctx.dt_ms;
            if running.event.is_finished() {
                finished.push(*kind);
                continue;
            }
            let Running { event, effect } = running;
            if !isolated(*kind, "update", || effect.update(event, ctx)) {
                report.failed = report.failed.saturating_add(1);
            }
        }
        self.failures = self
            .failures
            .saturating_add(u64::try_from(report.failed).unwrap_or(u64::MAX));

        for kind in finished {
            if self.end_event(kind, ctx.bus) {
                report.ended.push(kind);
            }
        }
        report
    }

    /// Roll for a new event; returns the kind started, if any.
    fn check(&mut self, ctx: &mut CosmicContext<'_>) -> Option<CosmicEventKind> {
        if !ctx.rng.random_bool(self.config.base_event_chance.clamp(0.0, 1.0)) {
            return None;
        }
        if self.active.len() >= self.config.max_concurrent_events {
            return None;
        }
        let candidates = self.candidates();
        let total: f64 = candidates.iter().map(|&k| EventSpec::of(k).rarity).sum();
        if candidates.is_empty() || total <= 0.0 {
            return None;
        }
        let mut roll = ctx.rng.random_range(0.0..total);
        let mut chosen = candidates.last().copied();
        for kind in candidates {
            roll -= EventSpec::of(kind).rarity;
            if roll <= 0.0 {
                chosen = Some(kind);
                break;
            }
        }
        let kind = chosen?;
        self.start_event(kind, ctx);
        Some(kind)
    }

    /// Kinds eligible for a scheduled start right now.
    pub fn candidates(&self) -> Vec<CosmicEventKind> {
        CosmicEventKind::ALL
            .into_iter()
            .filter(|kind| !self.active.contains_key(kind))
            .filter(|kind| !self.on_cooldown(*kind))
            .filter(|kind| self.active.keys().all(|&other| can_overlap(*kind, other)))
            .collect()
    }

    /// Whether a kind started too recently to be scheduled again.
    pub fn on_cooldown(&self, kind: CosmicEventKind) -> bool {
        self.last_started
            .get(&kind)
            .is_some_and(|&at| self.now_ms - at < EventSpec::of(kind).cooldown_ms)
    }

    /// Start `kind` now, skipping the roll, cooldown and overlap rules.
    ///
    /// Still refuses a kind that is already active or a start beyond the
    /// concurrency cap; both are no-ops logged at warn.
    pub fn force_event(&mut self, kind: CosmicEventKind, ctx: &mut CosmicContext<'_>) -> ForceOutcome {
        if self.active.contains_key(&kind) {
            warn!(event = kind.name(), "Forced event rejected: already active");
            return ForceOutcome::AlreadyActive;
        }
        if self.active.len() >= self.config.max_concurrent_events {
            warn!(
                event = kind.name(),
                active = self.active.len(),
                max = self.config.max_concurrent_events,
                "Forced event rejected: at capacity"
            );
            return ForceOutcome::AtCapacity;
        }
        self.start_event(kind, ctx);
        ForceOutcome::Started
    }

    fn start_event(&mut self, kind: CosmicEventKind, ctx: &mut CosmicContext<'_>) {
        let spec = EventSpec::of(kind);
        let duration_ms = if spec.max_duration_ms > spec.min_duration_ms {
            ctx.rng.random_range(spec.min_duration_ms..spec.max_duration_ms)
        } else {
            spec.min_duration_ms
        };
        let intensity = ctx.rng.random_range(INTENSITY_RANGE.0..INTENSITY_RANGE.1);
        let event = ActiveEvent {
            kind,
            started_at_ms: self.now_ms,
            duration_ms,
            elapsed_ms: 0.0,
            intensity,
        };

        let mut effect = effect_for(kind, ctx.population.viewport(), &mut *ctx.rng);
        if !isolated(kind, "start", || effect.start(&event, ctx)) {
            self.failures = self.failures.saturating_add(1);
        }

        self.active.insert(kind, Running { event, effect });
        self.last_started.insert(kind, self.now_ms);
        self.history.push_back(HistoryEntry {
            kind,
            started_at_ms: self.now_ms,
            duration_ms,
            intensity,
        });
        while self.history.len() > HISTORY_LIMIT {
            let _ = self.history.pop_front();
        }

        info!(event = kind.name(), intensity, duration_ms, "Cosmic event started");
        ctx.bus.emit(EventKind::EventStart {
            event: kind,
            intensity,
            duration_ms,
        });
    }

    fn end_event(&mut self, kind: CosmicEventKind, bus: &mut EventBus) -> bool {
        let Some(mut running) = self.active.remove(&kind) else {
            return false;
        };
        running.effect.end(&running.event);
        debug!(event = kind.name(), elapsed_ms = running.event.elapsed_ms, "Cosmic event ended");
        bus.emit(EventKind::EventEnd { event: kind });
        true
    }

    /// End every active event, publishing each end.
    pub fn end_all(&mut self, bus: &mut EventBus) -> usize {
        let kinds: Vec<CosmicEventKind> = self.active.keys().copied().collect();
        kinds
            .into_iter()
            .filter(|&kind| self.end_event(kind, bus))
            .count()
    }

    /// Drop every active event without notifications (teardown).
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Product of every active event's modifiers.
    pub fn modifiers(&self) -> Modifiers {
        self.active
            .values()
            .fold(Modifiers::NEUTRAL, |acc, r| acc.combine(&r.effect.modifiers(&r.event)))
    }

    /// Product of every active event's well regeneration multiplier.
    pub fn regen_multiplier(&self) -> f64 {
        self.active
            .values()
            .map(|r| r.effect.regen_multiplier(&r.event))
            .product()
    }

    /// Whether `kind` is running.
    pub fn is_active(&self, kind: CosmicEventKind) -> bool {
        self.active.contains_key(&kind)
    }

    /// Running kinds.
    pub fn active_kinds(&self) -> Vec<CosmicEventKind> {
        self.active.keys().copied().collect()
    }

    /// Timing of every running event.
    pub fn active_events(&self) -> Vec<ActiveEvent> {
        self.active.values().map(|r| r.event).collect()
    }

    /// Number of running events.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// The last [`HISTORY_LIMIT`] starts, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    /// Handler calls that failed so far.
    pub const fn failures(&self) -> u64 {
        self.failures
    }

    /// Scheduler time.
    pub const fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Active configuration.
    pub const fn config(&self) -> &CosmicConfig {
        &self.config
    }

    /// Enable or disable scheduled checks. Forced events still work.
    pub const fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }
}

/// Run one handler call, catching errors and panics. Returns success.
fn isolated(
    kind: CosmicEventKind,
    stage: &str,
    call: impl FnOnce() -> Result<(), WorldError>,
) -> bool {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(event = kind.name(), stage, error = %err, "Cosmic event handler failed");
            false
        }
        Err(payload) => {
            warn!(
                event = kind.name(),
                stage,
                panic = %panic_message(payload.as_ref()),
                "Cosmic event handler panicked"
            );
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use firefly_agents::{CollisionConfig, LifecycleConfig, PopulationConfig};
    use firefly_types::Viewport;
    use rand::SeedableRng;

    use super::*;

    fn population() -> PopulationManager {
        PopulationManager::new(
            PopulationConfig::default(),
            LifecycleConfig::default(),
            CollisionConfig::default(),
            Viewport::default(),
        )
    }

    fn always() -> CosmicConfig {
        CosmicConfig {
            enabled: true,
            event_check_interval_ms: 100.0,
            base_event_chance: 1.0,
            max_concurrent_events: 2,
        }
    }

    #[test]
    fn overlap_is_symmetric_or() {
        assert!(can_overlap(CosmicEventKind::SolarFlare, CosmicEventKind::MeteorShower));
        assert!(can_overlap(CosmicEventKind::MeteorShower, CosmicEventKind::SolarFlare));
        assert!(!can_overlap(CosmicEventKind::VoidStorm, CosmicEventKind::Comet));
        assert!(!can_overlap(CosmicEventKind::SolarFlare, CosmicEventKind::Eclipse));
    }

    #[test]
    fn forcing_active_kind_is_a_no_op() {
        let mut population = population();
        let mut rng = StdRng::seed_from_u64(1);
        let mut bus = EventBus::new();
        let mut scheduler = CosmicScheduler::new(CosmicConfig::default());
        let mut ctx = CosmicContext {
            dt_ms: 16.0,
            population: &mut population,
            rng: &mut rng,
            bus: &mut bus,
        };
        assert_eq!(scheduler.force_event(CosmicEventKind::Eclipse, &mut ctx), ForceOutcome::Started);
        assert_eq!(
            scheduler.force_event(CosmicEventKind::Eclipse, &mut ctx),
            ForceOutcome::AlreadyActive
        );
        assert_eq!(scheduler.active_count(), 1);
    }

    #[test]
    fn forcing_beyond_cap_is_a_no_op() {
        let mut population = population();
        let mut rng = StdRng::seed_from_u64(2);
        let mut bus = EventBus::new();
        let mut scheduler = CosmicScheduler::new(CosmicConfig::default());
        let mut ctx = CosmicContext {
            dt_ms: 16.0,
            population: &mut population,
            rng: &mut rng,
            bus: &mut bus,
        };
        let _ = scheduler.force_event(CosmicEventKind::SolarFlare, &mut ctx);
        let _ = scheduler.force_event(CosmicEventKind::VoidStorm, &mut ctx);
        assert_eq!(
            scheduler.force_event(CosmicEventKind::Comet, &mut ctx),
            ForceOutcome::AtCapacity
        );
        assert!(!scheduler.is_active(CosmicEventKind::Comet));
    }

    #[test]
    fn scheduled_events_never_exceed_cap_or_duplicate() {
        let mut population = population();
        let mut rng = StdRng::seed_from_u64(3);
        let mut bus = EventBus::new();
        let mut scheduler = CosmicScheduler::new(always());
        for _ in 0..20_000 {
            let mut ctx = CosmicContext {
                dt_ms: 50.0,
                population: &mut population,
                rng: &mut rng,
                bus: &mut bus,
            };
            let _ = scheduler.tick(&mut ctx);
            let kinds = scheduler.active_kinds();
            assert!(kinds.len() <= 2);
            for (i, a) in kinds.iter().enumerate() {
                for b in kinds.iter().skip(i + 1) {
                    assert_ne!(a, b);
                    assert!(can_overlap(*a, *b));
                }
            }
        }
        assert!(scheduler.history().count() > 0);
        assert!(scheduler.history().count() <= HISTORY_LIMIT);
    }

    #[test]
    fn events_end_after_duration_and_are_published() {
        let mut population = population();
        let mut rng = StdRng::seed_from_u64(4);
        let mut bus = EventBus::new();
        let mut scheduler = CosmicScheduler::new(CosmicConfig {
            enabled: false,
            ..CosmicConfig::default()
        });
        let mut ctx = CosmicContext {
            dt_ms: 1_000.0,
            population: &mut population,
            rng: &mut rng,
            bus: &mut bus,
        };
        let _ = scheduler.force_event(CosmicEventKind::Comet, &mut ctx);
        let mut ended = Vec::new();
        for _ in 0..16 {
            ended.extend(scheduler.tick(&mut ctx).ended);
        }
        assert_eq!(ended, vec![CosmicEventKind::Comet]);
        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(ctx.bus.published(), 2);
    }

    #[test]
    fn cooldown_blocks_rescheduling() {
        let mut population = population();
        let mut rng = StdRng::seed_from_u64(5);
        let mut bus = EventBus::new();
        let mut scheduler = CosmicScheduler::new(CosmicConfig::default());
        let mut ctx = CosmicContext {
            dt_ms: 16.0,
            population: &mut population,
            rng: &mut rng,
            bus: &mut bus,
        };
        let _ = scheduler.force_event(CosmicEventKind::SolarFlare, &mut ctx);
        let _ = scheduler.end_all(ctx.bus);
        assert!(scheduler.on_cooldown(CosmicEventKind::SolarFlare));
        assert!(!scheduler.candidates().contains(&CosmicEventKind::SolarFlare));
    }

    #[test]
    fn modifiers_multiply_across_events() {
        let mut population = population();
        let mut rng = StdRng::seed_from_u64(6);
        let mut bus = EventBus::new();
        let mut scheduler = CosmicScheduler::new(CosmicConfig::default());
        let mut ctx = CosmicContext {
            dt_ms: 16.0,
            population: &mut population,
            rng: &mut rng,
            bus: &mut bus,
        };
        let _ = scheduler.force_event(CosmicEventKind::MeteorShower, &mut ctx);
        let _ = scheduler.force_event(CosmicEventKind::NebulaDrift, &mut ctx);
        let combined = scheduler.modifiers();
        assert!((combined.spawn_rate - 1.5).abs() < 1e-9);
        assert!((combined.energy - 1.1).abs() < 1e-9);
        assert!((combined.glow - 1.2).abs() < 1e-9);
    }

    #[test]
    fn failing_handlers_are_contained() {
        assert!(isolated(CosmicEventKind::Comet, "update", || Ok(())));
        assert!(!isolated(CosmicEventKind::Comet, "update", || {
            Err(WorldError::EffectFailed {
                event: CosmicEventKind::Comet,
                reason: "tail lost".to_owned(),
            })
        }));
        assert!(!isolated(CosmicEventKind::Comet, "start", || panic!("comet broke up")));
    }
}

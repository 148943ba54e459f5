//! The Behavior Module Bus.
//!
//! Each behavior is a [`BehaviorModule`] trait object. The bus keeps them
//! sorted by [`BehaviorKind`], whose declaration order is the fixed
//! execution order, and runs every enabled module once per frame. A module
//! that returns an error or panics is logged and skipped for that frame;
//! later modules and later frames still run.
//!
//! Modules read and mutate entities through the [`PopulationManager`] in
//! their [`BehaviorContext`]. They may spawn through it and request deaths
//! through [`PopulationManager::kill`], but they cannot unlink entities.

pub mod environment;
pub mod hunting;
pub mod pattern;
pub mod personality;
pub mod pointer;
pub mod rare;
pub mod reproduction;
pub mod swarming;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use firefly_events::EventBus;
use firefly_events::bus::panic_message;
use firefly_types::{BehaviorKind, Entity, Modifiers, Vec2};

use crate::error::AgentError;
use crate::population::PopulationManager;

pub use environment::{DayPeriod, EnvironmentModule, Weather};
pub use hunting::HuntingModule;
pub use pattern::{PatternModule, Shape};
pub use personality::PersonalityModule;
pub use pointer::PointerModule;
pub use rare::RareVariantModule;
pub use reproduction::ReproductionModule;
pub use swarming::SwarmingModule;

// ---------------------------------------------------------------------------
// Pointer input
// ---------------------------------------------------------------------------

/// Whether the pointer pulls or pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerMode {
    /// Pull entities toward the pointer.
    Attract,
    /// Push entities away from the pointer.
    Repel,
}

/// Operator-controlled pointer state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pointer {
    /// Pointer position.
    pub position: Vec2,
    /// Attract or repel.
    pub mode: PointerMode,
    /// Whether the pointer is pressed, doubling its strength.
    pub pressed: bool,
}

// ---------------------------------------------------------------------------
// Module contract
// ---------------------------------------------------------------------------

/// Everything a module may touch during its update.
pub struct BehaviorContext<'a> {
    /// Frame delta in milliseconds.
    pub dt_ms: f64,
    /// The entity arena.
    pub population: &'a mut PopulationManager,
    /// Shared random source.
    pub rng: &'a mut StdRng,
    /// Notification bus.
    pub bus: &'a mut EventBus,
    /// Combined cosmic modifiers for this frame.
    pub modifiers: Modifiers,
    /// Current pointer, if any.
    pub pointer: Option<Pointer>,
}

impl BehaviorContext<'_> {
    /// `dt` expressed in 16 ms reference frames.
    pub fn step(&self) -> f64 {
        self.dt_ms / crate::population::REFERENCE_FRAME_MS
    }
}

/// A pluggable per-frame behavior.
pub trait BehaviorModule {
    /// Which slot in the execution order this module fills.
    fn kind(&self) -> BehaviorKind;

    /// Run one frame.
    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError>;

    /// Upcast for typed access through [`BehaviorBus::module_mut`].
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed access through [`BehaviorBus::module_mut`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// What one bus run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BehaviorReport {
    /// Modules that completed.
    pub ran: usize,
    /// Modules that errored or panicked.
    pub failed: usize,
    /// Registered but disabled modules.
    pub skipped: usize,
}

struct Slot {
    module: Box<dyn BehaviorModule>,
    enabled: bool,
    failures: u64,
}

/// Ordered set of behavior modules.
#[derive(Default)]
pub struct BehaviorBus {
    slots: Vec<Slot>,
}

impl std::fmt::Debug for BehaviorBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|s| (s.module.kind(), s.enabled)))
            .finish()
    }
}

impl BehaviorBus {
    /// An empty bus.
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Add a module in its execution slot, replacing any module of the same kind.
    pub fn register(&mut self, module: Box<dyn BehaviorModule>) {
        let kind = module.kind();
        let slot = Slot {
            module,
            enabled: true,
            failures: 0,
        };
        match self.slots.binary_search_by_key(&kind, |s| s.module.kind()) {
            Ok(pos) => {
                if let Some(existing) = self.slots.get_mut(pos) {
                    *existing = slot;
                }
            }
            Err(pos) => self.slots.insert(pos, slot),
        }
        debug!(module = kind.name(), "Behavior module registered");
    }

    /// Enable or disable a registered module. Returns `false` if absent.
    pub fn set_enabled(&mut self, kind: BehaviorKind, enabled: bool) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.module.kind() == kind) else {
            return false;
        };
        slot.enabled = enabled;
        debug!(module = kind.name(), enabled, "Behavior module toggled");
        true
    }

    /// Whether a module is registered and enabled.
    pub fn is_enabled(&self, kind: BehaviorKind) -> bool {
        self.slots
            .iter()
            .any(|s| s.module.kind() == kind && s.enabled)
    }

    /// Registered kinds in execution order.
    pub fn kinds(&self) -> Vec<BehaviorKind> {
        self.slots.iter().map(|s| s.module.kind()).collect()
    }

    /// Failure count of one module.
    pub fn failures(&self, kind: BehaviorKind) -> u64 {
        self.slots
            .iter()
            .find(|s| s.module.kind() == kind)
            .map_or(0, |s| s.failures)
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Typed access to a registered module.
    pub fn module<T: BehaviorModule + 'static>(&self) -> Option<&T> {
        self.slots
            .iter()
            .find_map(|s| s.module.as_any().downcast_ref::<T>())
    }

    /// Typed mutable access to a registered module.
    pub fn module_mut<T: BehaviorModule + 'static>(&mut self) -> Option<&mut T> {
        self.slots
            .iter_mut()
            .find_map(|s| s.module.as_any_mut().downcast_mut::<T>())
    }

    /// Drop every module.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Run every enabled module once, in order, each fault-isolated.
    pub fn run(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorReport {
        let mut report = BehaviorReport::default();

        for slot in &mut self.slots {
            let kind = slot.module.kind();
            if !slot.enabled {
                report.skipped = report.skipped.saturating_add(1);
                continue;
            }

            let module = &mut slot.module;
            match catch_unwind(AssertUnwindSafe(|| module.update(ctx))) {
                Ok(Ok(())) => report.ran = report.ran.saturating_add(1),
                Ok(Err(err)) => {
                    warn!(module = kind.name(), error = %err, "Behavior module failed");
                    slot.failures = slot.failures.saturating_add(1);
                    report.failed = report.failed.saturating_add(1);
                }
                Err(payload) => {
                    warn!(
                        module = kind.name(),
                        panic = %panic_message(payload.as_ref()),
                        "Behavior module panicked"
                    );
                    slot.failures = slot.failures.saturating_add(1);
                    report.failed = report.failed.saturating_add(1);
                }
            }
        }

        report
    }
}

// ---------------------------------------------------------------------------
// Shared helpers for module bodies
// ---------------------------------------------------------------------------

/// Whether an entity takes part in behaviors this frame.
pub(crate) fn is_active(entity: &Entity) -> bool {
    entity.is_mature() && !entity.is_doomed()
}

/// Unit vector from `from` toward `to`, scaled by `strength`.
pub(crate) fn toward(from: Vec2, to: Vec2, strength: f64) -> Vec2 {
    to.minus(from).normalized().scaled(strength)
}

/// Index and distance of the nearest entity satisfying `filter` within `radius`.
pub(crate) fn nearest(
    entities: &[Entity],
    origin: usize,
    radius: f64,
    filter: impl Fn(&Entity) -> bool,
) -> Option<(usize, f64)> {
    let here = entities.get(origin)?.position;
    entities
        .iter()
        .enumerate()
        .filter(|&(i, e)| i != origin && filter(e))
        .map(|(i, e)| (i, e.position.distance(here)))
        .filter(|&(_, d)| d < radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

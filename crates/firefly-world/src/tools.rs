//! Player tools: operator-triggered interventions with charges and cooldowns.
//!
//! | Tool | Radius | Effect | Zone | Cooldown | Charges | Recharge |
//! |---|---|---|---|---|---|---|
//! | Blessing | 80 | +30 energy, instantly | none | 3 s | 5 | 10 s |
//! | Gravity | 100 | pull 0.15 | 2 s | 0.5 s | 10 | 5 s |
//! | Shield | 120 | blocks captures | 10 s | 8 s | 3 | 20 s |
//! | Beacon | 150 | pull 0.1 | 8 s | 5 s | 3 | 15 s |
//! | Catalyst | 100 | x5 evolution progress | 5 s | 10 s | 2 | 30 s |
//!
//! A charge regenerates every recharge period while the tool is below its
//! maximum.

use std::collections::BTreeMap;

use tracing::debug;

use firefly_agents::{PopulationManager, ProgressZone};
use firefly_events::{EventBus, EventKind};
use firefly_types::{ToolKind, Vec2};

/// Charges each tool starts with (bounded by its maximum).
pub const DEFAULT_STARTING_CHARGES: u32 = 3;

/// Tunables of one tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSpec {
    /// Area of effect.
    pub radius: f64,
    /// Force, energy, or progress multiplier depending on the tool.
    pub strength: f64,
    /// Lifetime of the zone left behind; zero for instant tools.
    pub duration_ms: f64,
    /// Time before the tool can be used again.
    pub cooldown_ms: f64,
    /// Charge cap.
    pub max_charges: u32,
    /// Time to regain one charge.
    pub recharge_ms: f64,
    /// Entities closer than this to the center are not pulled.
    pub dead_zone: f64,
}

impl ToolSpec {
    /// Tunables for a tool.
    pub const fn of(tool: ToolKind) -> Self {
        match tool {
            ToolKind::Blessing => Self {
                radius: 80.0,
                strength: 30.0,
                duration_ms: 0.0,
                cooldown_ms: 3_000.0,
                max_charges: 5,
                recharge_ms: 10_000.0,
                dead_zone: 0.0,
            },
            ToolKind::Gravity => Self {
                radius: 100.0,
                strength: 0.15,
                duration_ms: 2_000.0,
                cooldown_ms: 500.0,
                max_charges: 10,
                recharge_ms: 5_000.0,
                dead_zone: 5.0,
            },
            ToolKind::Shield => Self {
                radius: 120.0,
                strength: 0.0,
                duration_ms: 10_000.0,
                cooldown_ms: 8_000.0,
                max_charges: 3,
                recharge_ms: 20_000.0,
                dead_zone: 0.0,
            },
            ToolKind::Beacon => Self {
                radius: 150.0,
                strength: 0.1,
                duration_ms: 8_000.0,
                cooldown_ms: 5_000.0,
                max_charges: 3,
                recharge_ms: 15_000.0,
                dead_zone: 20.0,
            },
            ToolKind::Catalyst => Self {
                radius: 100.0,
                strength: 5.0,
                duration_ms: 5_000.0,
                cooldown_ms: 10_000.0,
                max_charges: 2,
                recharge_ms: 30_000.0,
                dead_zone: 0.0,
            },
        }
    }
}

/// Result of [`PlayerTools::use_tool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The tool fired and touched this many entities.
    Applied {
        /// Entities inside the radius at the time of use.
        affected: usize,
    },
    /// The tool is still cooling down.
    OnCooldown,
    /// The tool has no charges left.
    NoCharges,
}

/// A lingering area left by a timed tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolZone {
    /// Tool that created the zone.
    pub tool: ToolKind,
    /// Center.
    pub center: Vec2,
    /// Radius.
    pub radius: f64,
    /// Time left.
    pub remaining_ms: f64,
}

/// An area in which captures are blocked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShieldZone {
    /// Center.
    pub center: Vec2,
    /// Radius.
    pub radius: f64,
}

impl ShieldZone {
    /// Whether the point is protected.
    pub fn covers(&self, point: Vec2) -> bool {
        self.center.distance(point) <= self.radius
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ToolState {
    charges: u32,
    cooldown_ms: f64,
    recharge_ms: f64,
    uses: u64,
}

/// Charges, cooldowns and active zones of every tool.
#[derive(Debug, Clone)]
pub struct PlayerTools {
    tools: BTreeMap<ToolKind, ToolState>,
    zones: Vec<ToolZone>,
}

impl Default for PlayerTools {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_CHARGES)
    }
}

impl PlayerTools {
    /// Every tool starts with `starting_charges`, capped at its maximum.
    pub fn new(starting_charges: u32) -> Self {
        let tools = ToolKind::ALL
            .iter()
            .map(|&tool| {
                let state = ToolState {
                    charges: starting_charges.min(ToolSpec::of(tool).max_charges),
                    ..ToolState::default()
                };
                (tool, state)
            })
            .collect();
        Self {
            tools,
            zones: Vec::new(),
        }
    }

    /// Fire a tool at `position`.
    ///
    /// Blessings energize immediately; every other tool leaves a zone that
    /// acts over the following frames. Publishes `ToolUse` on success.
    pub fn use_tool(
        &mut self,
        tool: ToolKind,
        position: Vec2,
        population: &mut PopulationManager,
        bus: &mut EventBus,
    ) -> ToolOutcome {
        let spec = ToolSpec::of(tool);
        let Some(state) = self.tools.get_mut(&tool) else {
            return ToolOutcome::NoCharges;
        };
        if state.cooldown_ms > 0.0 {
            debug!(tool = tool.name(), remaining_ms = state.cooldown_ms, "Tool on cooldown");
            return ToolOutcome::OnCooldown;
        }
        if state.charges == 0 {
            debug!(tool = tool.name(), "Tool has no charges");
            return ToolOutcome::NoCharges;
        }
        state.charges = state.charges.saturating_sub(1);
        state.cooldown_ms = spec.cooldown_ms;
        state.uses = state.uses.saturating_add(1);

        let mut affected: usize = 0;
        for entity in population.entities_mut() {
            if entity.is_doomed() || entity.position.distance(position) > spec.radius {
                continue;
            }
            affected = affected.saturating_add(1);
            if tool == ToolKind::Blessing {
                let _ = entity.add_energy(spec.strength);
            }
        }

        if spec.duration_ms > 0.0 {
            self.zones.push(ToolZone {
                tool,
                center: position,
                radius: spec.radius,
                remaining_ms: spec.duration_ms,
            });
        }

        debug!(tool = tool.name(), affected, "Tool used");
        bus.emit(EventKind::ToolUse {
            tool,
            position,
            affected,
        });
        ToolOutcome::Applied { affected }
    }

    /// Advance cooldowns and recharges, expire zones, and apply the pull of
    /// gravity and beacon zones.
    pub fn tick(&mut self, dt_ms: f64, population: &mut PopulationManager) {
        for (tool, state) in &mut self.tools {
            let spec = ToolSpec::of(*tool);
            state.cooldown_ms = (state.cooldown_ms - dt_ms).max(0.0);
            if state.charges < spec.max_charges {
                state.recharge_ms += dt_ms;
                if state.recharge_ms >= spec.recharge_ms {
                    state.charges = state.charges.saturating_add(1);
                    state.recharge_ms = 0.0;
                }
            } else {
                state.recharge_ms = 0.0;
            }
        }

        for zone in &mut self.zones {
            zone.remaining_ms -= dt_ms;
        }
        self.zones.retain(|z| z.remaining_ms > 0.0);

        for zone in &self.zones {
            if !matches!(zone.tool, ToolKind::Gravity | ToolKind::Beacon) {
                continue;
            }
            let spec = ToolSpec::of(zone.tool);
            for entity in population.entities_mut() {
                if entity.is_doomed() {
                    continue;
                }
                let offset = zone.center.minus(entity.position);
                let distance = offset.length();
                if distance < zone.radius && distance > spec.dead_zone {
                    let strength = spec.strength * (1.0 - distance / zone.radius);
                    entity.apply_force(offset.normalized().scaled(strength));
                }
            }
        }
    }

    /// Active shield areas.
    pub fn shield_zones(&self) -> Vec<ShieldZone> {
        self.zones
            .iter()
            .filter(|z| z.tool == ToolKind::Shield)
            .map(|z| ShieldZone {
                center: z.center,
                radius: z.radius,
            })
            .collect()
    }

    /// Active catalyst areas as evolution-progress multipliers.
    pub fn progress_zones(&self) -> Vec<ProgressZone> {
        self.zones
            .iter()
            .filter(|z| z.tool == ToolKind::Catalyst)
            .map(|z| ProgressZone {
                center: z.center,
                radius: z.radius,
                multiplier: ToolSpec::of(ToolKind::Catalyst).strength,
            })
            .collect()
    }

    /// Charges left for a tool.
    pub fn charges(&self, tool: ToolKind) -> u32 {
        self.tools.get(&tool).map_or(0, |s| s.charges)
    }

    /// Cooldown left for a tool.
    pub fn cooldown_remaining(&self, tool: ToolKind) -> f64 {
        self.tools.get(&tool).map_or(0.0, |s| s.cooldown_ms)
    }

    /// Successful uses of a tool.
    pub fn uses(&self, tool: ToolKind) -> u64 {
        self.tools.get(&tool).map_or(0, |s| s.uses)
    }

    /// Active zones.
    pub fn zones(&self) -> &[ToolZone] {
        &self.zones
    }

    /// Drop every active zone.
    pub fn clear_zones(&mut self) {
        self.zones.clear();
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use firefly_agents::{CollisionConfig, LifecycleConfig, PopulationConfig, SpawnParams};
    use firefly_types::{SpawnOrigin, Viewport};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn population_with(points: &[Vec2], bus: &mut EventBus) -> PopulationManager {
        let mut rng = StdRng::seed_from_u64(11);
        let mut population = PopulationManager::new(
            PopulationConfig::default(),
            LifecycleConfig::default(),
            CollisionConfig::default(),
            Viewport::default(),
        );
        for &p in points {
            let params = SpawnParams::new(SpawnOrigin::Operator).at(p).with_energy(50.0);
            let _ = population.spawn(params, &mut rng, bus);
        }
        population
    }

    #[test]
    fn blessing_energizes_entities_in_radius() {
        let mut bus = EventBus::new();
        let mut population =
            population_with(&[Vec2::new(100.0, 100.0), Vec2::new(400.0, 400.0)], &mut bus);
        let mut tools = PlayerTools::default();

        let outcome = tools.use_tool(ToolKind::Blessing, Vec2::new(110.0, 100.0), &mut population, &mut bus);
        assert_eq!(outcome, ToolOutcome::Applied { affected: 1 });
        let energies: Vec<f64> = population.iter().map(|e| e.energy()).collect();
        assert!((energies[0] - 80.0).abs() < 1e-9);
        assert!((energies[1] - 50.0).abs() < 1e-9);
        assert_eq!(tools.charges(ToolKind::Blessing), 2);
    }

    #[test]
    fn cooldown_then_charges_gate_use() {
        let mut bus = EventBus::new();
        let mut population = population_with(&[], &mut bus);
        let mut tools = PlayerTools::new(1);
        let at = Vec2::new(10.0, 10.0);

        assert!(matches!(
            tools.use_tool(ToolKind::Shield, at, &mut population, &mut bus),
            ToolOutcome::Applied { .. }
        ));
        assert_eq!(
            tools.use_tool(ToolKind::Shield, at, &mut population, &mut bus),
            ToolOutcome::OnCooldown
        );
        tools.tick(8_000.0, &mut population);
        assert_eq!(
            tools.use_tool(ToolKind::Shield, at, &mut population, &mut bus),
            ToolOutcome::NoCharges
        );
        tools.tick(20_000.0, &mut population);
        assert_eq!(tools.charges(ToolKind::Shield), 1);
    }

    #[test]
    fn shield_zone_expires() {
        let mut bus = EventBus::new();
        let mut population = population_with(&[], &mut bus);
        let mut tools = PlayerTools::default();
        let _ = tools.use_tool(ToolKind::Shield, Vec2::new(50.0, 50.0), &mut population, &mut bus);
        assert_eq!(tools.shield_zones().len(), 1);
        assert!(tools.shield_zones()[0].covers(Vec2::new(100.0, 50.0)));
        tools.tick(10_001.0, &mut population);
        assert!(tools.shield_zones().is_empty());
    }

    #[test]
    fn catalyst_exposes_progress_zone() {
        let mut bus = EventBus::new();
        let mut population = population_with(&[], &mut bus);
        let mut tools = PlayerTools::default();
        let _ = tools.use_tool(ToolKind::Catalyst, Vec2::new(0.0, 0.0), &mut population, &mut bus);
        let zones = tools.progress_zones();
        assert_eq!(zones.len(), 1);
        assert!((zones[0].multiplier - 5.0).abs() < f64::EPSILON);
    }
}

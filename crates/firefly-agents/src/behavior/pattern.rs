//! Constellation-style pattern formation.
//!
//! Rarely, a handful of free mature entities are assigned slots on a simple
//! shape and pulled toward them for a few seconds.

use std::any::Any;
use std::collections::BTreeMap;
use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use firefly_events::EventKind;
use firefly_types::{BehaviorKind, EntityId, FormationId, Vec2};

use super::{BehaviorContext, BehaviorModule, is_active};
use crate::error::AgentError;

const FORMATION_CHANCE: f64 = 0.0003;
const MIN_MEMBERS: usize = 4;
const MAX_MEMBERS: usize = 7;
const SHAPE_RADIUS: f64 = 100.0;
const GATHER_RADIUS: f64 = 250.0;
const FORMATION_DURATION_MS: f64 = 4_000.0;
const PULL_PER_PX: f64 = 0.002;
const MAX_PULL: f64 = 0.05;

/// Shapes a formation can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Horizontal line.
    Line,
    /// Equilateral triangle.
    Triangle,
    /// Axis-aligned square.
    Square,
    /// Square rotated 45 degrees.
    Diamond,
    /// Upper half circle.
    Arc,
}

impl Shape {
    /// All shapes.
    pub const ALL: [Self; 5] = [
        Self::Line,
        Self::Triangle,
        Self::Square,
        Self::Diamond,
        Self::Arc,
    ];

    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Triangle => "triangle",
            Self::Square => "square",
            Self::Diamond => "diamond",
            Self::Arc => "arc",
        }
    }

    /// `count` slot positions spread over the shape.
    pub fn slots(self, count: usize, center: Vec2, radius: f64) -> Vec<Vec2> {
        match self {
            Self::Line => {
                let from = Vec2::new(center.x - radius, center.y);
                let to = Vec2::new(center.x + radius, center.y);
                along_path(&[from, to], count, false)
            }
            Self::Arc => (0..count)
                .map(|i| {
                    let t = fraction(i, count.saturating_sub(1).max(1));
                    center.plus(Vec2::from_angle(PI + PI * t).scaled(radius))
                })
                .collect(),
            Self::Triangle => along_path(&polygon(center, radius, 3, -PI / 2.0), count, true),
            Self::Square => along_path(&polygon(center, radius, 4, PI / 4.0), count, true),
            Self::Diamond => along_path(&polygon(center, radius, 4, 0.0), count, true),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn fraction(i: usize, n: usize) -> f64 {
    if n == 0 { 0.0 } else { i as f64 / n as f64 }
}

fn polygon(center: Vec2, radius: f64, sides: usize, rotation: f64) -> Vec<Vec2> {
    (0..sides)
        .map(|i| {
            let angle = 2.0_f64.mul_add(PI * fraction(i, sides), rotation);
            center.plus(Vec2::from_angle(angle).scaled(radius))
        })
        .collect()
}

/// Evenly spaced points along a polyline, optionally closed.
fn along_path(vertices: &[Vec2], count: usize, closed: bool) -> Vec<Vec2> {
    let mut edges: Vec<(Vec2, Vec2)> = vertices.windows(2).filter_map(|w| Some((*w.first()?, *w.get(1)?))).collect();
    if closed && let (Some(&last), Some(&first)) = (vertices.last(), vertices.first()) {
        edges.push((last, first));
    }
    let total: f64 = edges.iter().map(|(a, b)| a.distance(*b)).sum();
    if count == 0 || total <= 0.0 {
        return Vec::new();
    }
    let spacing = if closed {
        total / f64::from(u32::try_from(count).unwrap_or(u32::MAX))
    } else {
        total / f64::from(u32::try_from(count.saturating_sub(1).max(1)).unwrap_or(u32::MAX))
    };

    let mut points = Vec::with_capacity(count);
    let mut k: u32 = 0;
    while points.len() < count {
        let mut remaining = spacing * f64::from(k);
        let mut placed = None;
        for &(a, b) in &edges {
            let len = a.distance(b);
            if remaining <= len {
                let t = if len > 0.0 { remaining / len } else { 0.0 };
                placed = Some(a.plus(b.minus(a).scaled(t)));
                break;
            }
            remaining -= len;
        }
        let Some(point) = placed.or_else(|| edges.last().map(|&(_, b)| b)) else {
            break;
        };
        points.push(point);
        k = k.saturating_add(1);
    }
    points
}

#[derive(Debug, Clone)]
struct Formation {
    slots: Vec<(EntityId, Vec2)>,
    remaining_ms: f64,
}

/// Pattern formation behavior.
#[derive(Debug, Default)]
pub struct PatternModule {
    formations: BTreeMap<FormationId, Formation>,
    formed: u64,
}

impl PatternModule {
    /// A module with no formations.
    pub const fn new() -> Self {
        Self {
            formations: BTreeMap::new(),
            formed: 0,
        }
    }

    /// Number of live formations.
    pub fn formation_count(&self) -> usize {
        self.formations.len()
    }

    /// Formations assembled since creation.
    pub const fn formed(&self) -> u64 {
        self.formed
    }

    fn expire(&mut self, ctx: &mut BehaviorContext<'_>) {
        let dt = ctx.dt_ms;
        let mut expired = Vec::new();
        for (id, formation) in &mut self.formations {
            formation.remaining_ms -= dt;
            formation
                .slots
                .retain(|(m, _)| ctx.population.get(*m).is_some_and(is_active));
            if formation.remaining_ms <= 0.0 || formation.slots.is_empty() {
                expired.push(*id);
            }
        }
        for id in expired {
            if let Some(formation) = self.formations.remove(&id) {
                for (member, _) in formation.slots {
                    if let Some(entity) = ctx.population.get_mut(member) {
                        entity.formation = None;
                    }
                }
            }
        }
        for entity in ctx.population.entities_mut() {
            if let Some(id) = entity.formation
                && (!self.formations.contains_key(&id) || !is_active(entity))
            {
                entity.formation = None;
            }
        }
    }

    fn try_form(&mut self, ctx: &mut BehaviorContext<'_>) {
        if !ctx.rng.random_bool(FORMATION_CHANCE) {
            return;
        }
        let entities = ctx.population.entities();
        let free: Vec<&firefly_types::Entity> = entities
            .iter()
            .filter(|e| is_active(e) && e.formation.is_none() && e.swarm.is_none())
            .collect();
        if free.len() < MIN_MEMBERS {
            return;
        }
        let Some(seed) = free.get(ctx.rng.random_range(0..free.len())) else {
            return;
        };
        let origin = seed.position;
        let wanted = ctx.rng.random_range(MIN_MEMBERS..=MAX_MEMBERS);
        let mut nearby: Vec<(EntityId, f64)> = free
            .iter()
            .map(|e| (e.id, e.position.distance(origin)))
            .filter(|&(_, d)| d < GATHER_RADIUS)
            .collect();
        nearby.sort_by(|a, b| a.1.total_cmp(&b.1));
        nearby.truncate(wanted);
        if nearby.len() < MIN_MEMBERS {
            return;
        }

        let viewport = ctx.population.viewport();
        let (min, max) = viewport.inner_bounds(0.8);
        let center = Vec2::new(origin.x.clamp(min.x, max.x), origin.y.clamp(min.y, max.y));
        let shape = Shape::ALL
            .get(ctx.rng.random_range(0..Shape::ALL.len()))
            .copied()
            .unwrap_or(Shape::Line);
        let slots = shape.slots(nearby.len(), center, SHAPE_RADIUS);

        let id = FormationId::new();
        let assigned: Vec<(EntityId, Vec2)> = nearby
            .iter()
            .map(|(member, _)| *member)
            .zip(slots)
            .collect();
        for (member, _) in &assigned {
            if let Some(entity) = ctx.population.get_mut(*member) {
                entity.formation = Some(id);
            }
        }

        debug!(formation_id = %id, shape = shape.name(), members = assigned.len(), "Pattern formed");
        ctx.bus.emit(EventKind::PatternFormed {
            formation: id,
            shape: shape.name().to_owned(),
            members: assigned.len(),
        });
        self.formations.insert(
            id,
            Formation {
                slots: assigned,
                remaining_ms: FORMATION_DURATION_MS,
            },
        );
        self.formed = self.formed.saturating_add(1);
    }
}

impl BehaviorModule for PatternModule {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::PatternFormation
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        self.expire(ctx);
        self.try_form(ctx);

        for formation in self.formations.values() {
            for &(member, slot) in &formation.slots {
                if let Some(entity) = ctx.population.get_mut(member) {
                    let offset = slot.minus(entity.position);
                    let pull = (offset.length() * PULL_PER_PX).min(MAX_PULL);
                    entity.apply_force(offset.normalized().scaled(pull));
                }
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//! Plain value structs shared across the simulation.
//!
//! Covers 2D vectors, the viewport, combined cosmic [`Modifiers`], and the
//! read-only [`EntitySnapshot`] carried by lifecycle notifications.

use serde::{Deserialize, Serialize};

use crate::enums::{Digit, LifeState, RareVariant, Tier};
use crate::ids::EntityId;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A 2D vector used for positions, velocities, and forces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component (grows downward).
    pub y: f64,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a vector.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians.
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    /// Component-wise sum.
    pub fn plus(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference `self - other`.
    pub fn minus(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Scale both components.
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Distance to another point.
    pub fn distance(self, other: Self) -> f64 {
        self.minus(other).length()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > f64::EPSILON {
            self.scaled(1.0 / len)
        } else {
            Self::ZERO
        }
    }

    /// Clamp the length to at most `max`.
    pub fn limited(self, max: f64) -> Self {
        let len = self.length();
        if len > max && len > f64::EPSILON {
            self.scaled(max / len)
        } else {
            self
        }
    }

    /// Perpendicular vector (rotated 90 degrees counter-clockwise).
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }
}

/// The simulated area, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

impl Viewport {
    /// Create a viewport.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Centre point.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Bounds `(min, max)` of the centred inner region covering `fraction`
    /// of each dimension.
    pub fn inner_bounds(&self, fraction: f64) -> (Vec2, Vec2) {
        let fraction = fraction.clamp(0.0, 1.0);
        let margin_x = self.width * (1.0 - fraction) / 2.0;
        let margin_y = self.height * (1.0 - fraction) / 2.0;
        (
            Vec2::new(margin_x, margin_y),
            Vec2::new(self.width - margin_x, self.height - margin_y),
        )
    }

    /// Whether a point lies inside the viewport.
    pub fn contains(&self, point: Vec2) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }

    /// Clamp a point into the viewport.
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(0.0, self.width.max(0.0)),
            point.y.clamp(0.0, self.height.max(0.0)),
        )
    }
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Multiplicative environment modifiers produced by active cosmic events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    /// Scales energy gained from resources and auras.
    pub energy: f64,
    /// Scales maximum movement speed.
    pub speed: f64,
    /// Scales glow (reported only).
    pub glow: f64,
    /// Scales attraction forces.
    pub gravity: f64,
    /// Scales spawn, reproduction, and refill chances.
    pub spawn_rate: f64,
    /// Scales energy decay.
    pub death_rate: f64,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl Modifiers {
    /// All multipliers at 1.0.
    pub const NEUTRAL: Self = Self {
        energy: 1.0,
        speed: 1.0,
        glow: 1.0,
        gravity: 1.0,
        spawn_rate: 1.0,
        death_rate: 1.0,
    };

    /// Multiply every field by the corresponding field of `other`.
    pub fn combine(self, other: &Self) -> Self {
        Self {
            energy: self.energy * other.energy,
            speed: self.speed * other.speed,
            glow: self.glow * other.glow,
            gravity: self.gravity * other.gravity,
            spawn_rate: self.spawn_rate * other.spawn_rate,
            death_rate: self.death_rate * other.death_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Read-only copy of an entity at a point in time.
///
/// Notifications carry snapshots rather than references so that observers
/// never hold onto arena storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Position at snapshot time.
    pub position: Vec2,
    /// Life-state at snapshot time.
    pub state: LifeState,
    /// Binary category.
    pub digit: Digit,
    /// Evolution tier.
    pub tier: Tier,
    /// Rare variant, if tagged.
    pub rare: Option<RareVariant>,
    /// Energy in `[0, 100]`.
    pub energy: f64,
    /// Age in milliseconds.
    pub age_ms: f64,
    /// Generation (0 for seeded entities).
    pub generation: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_helpers() {
        let v = Vec2::new(3.0, 4.0);
        assert!((v.length() - 5.0).abs() < f64::EPSILON);
        assert!((v.normalized().length() - 1.0).abs() < 1e-9);
        assert!((v.limited(1.0).length() - 1.0).abs() < 1e-9);
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
    }

    #[test]
    fn inner_bounds_cover_sixty_percent() {
        let viewport = Viewport::new(1000.0, 500.0);
        let (min, max) = viewport.inner_bounds(0.6);
        assert!((min.x - 200.0).abs() < 1e-9);
        assert!((max.x - 800.0).abs() < 1e-9);
        assert!((min.y - 100.0).abs() < 1e-9);
        assert!((max.y - 400.0).abs() < 1e-9);
    }

    #[test]
    fn modifiers_multiply() {
        let a = Modifiers {
            energy: 1.5,
            ..Modifiers::NEUTRAL
        };
        let b = Modifiers {
            energy: 0.5,
            gravity: 2.0,
            ..Modifiers::NEUTRAL
        };
        let combined = a.combine(&b);
        assert!((combined.energy - 0.75).abs() < 1e-9);
        assert!((combined.gravity - 2.0).abs() < 1e-9);
    }
}

//! Shared type definitions for the Firefly ecosystem simulation.
//!
//! Every crate in the workspace speaks in these types: the population arena
//! stores [`Entity`] values, the event bus carries [`EntitySnapshot`]s, and
//! resource, cosmic, and behavior code is keyed by the enums below.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for simulated objects
//! - [`enums`] -- Lifecycle, tier, resource, cosmic, behavior and tool enums
//! - [`structs`] -- Geometry, viewport, modifiers and snapshots
//! - [`genetics`] -- Inheritable trait multipliers
//! - [`entity`] -- The firefly itself, with its energy and life-state invariants

pub mod entity;
pub mod enums;
pub mod genetics;
pub mod ids;
pub mod structs;

pub use entity::{Entity, MAX_ENERGY, TransitionError};
pub use enums::{
    BehaviorKind, CollisionOutcome, CosmicEventKind, DeathCause, Digit, House, LifeState,
    PredatorVariant, RareVariant, ResourceKind, ResourceState, ResourceVariant, SanctuaryVariant,
    SpawnOrigin, Tier, ToolKind, WellVariant,
};
pub use genetics::{GeneTrait, Genetics, TraitSpec};
pub use ids::{EntityId, FormationId, ResourceId, SwarmId};
pub use structs::{EntitySnapshot, Modifiers, Vec2, Viewport};

//! Population, lifecycle, and behavior logic for the Firefly simulation.
//!
//! This crate owns every live entity. The [`PopulationManager`] is the
//! arena: it spawns, ages, moves, collides, evolves and removes entities,
//! publishing each lifecycle transition on the event bus. The
//! [`BehaviorBus`] runs the pluggable behavior modules against that arena in
//! a fixed order once per frame.
//!
//! # Modules
//!
//! - [`behavior`] -- Module trait, ordered bus, and the eight behavior modules
//! - [`collision`] -- Pair detection and digit-based collision outcomes
//! - [`config`] -- Population bounds, lifecycle timing, collision tunables
//! - [`error`] -- Error types for agent operations ([`AgentError`])
//! - [`genetics`] -- Random genetics and dominance-weighted breeding
//! - [`population`] -- The entity arena ([`PopulationManager`])

pub mod behavior;
pub mod collision;
pub mod config;
pub mod error;
pub mod genetics;
pub mod population;

pub use behavior::{
    BehaviorBus, BehaviorContext, BehaviorModule, BehaviorReport, DayPeriod, EnvironmentModule,
    HuntingModule, PatternModule, PersonalityModule, Pointer, PointerMode, PointerModule,
    RareVariantModule, ReproductionModule, Shape, SwarmingModule, Weather,
};
pub use config::{CollisionConfig, LifecycleConfig, PopulationConfig};
pub use error::AgentError;
pub use genetics::{breed, random_genetics};
pub use population::{PopulationManager, ProgressZone, SpawnParams, TickReport};

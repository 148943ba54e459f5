//! Resources, hazards, player tools and cosmic events for the Firefly
//! simulation.
//!
//! Everything in this crate acts on the population from the outside. The
//! [`ResourceManager`] owns wells, portals, sanctuaries and every hazard;
//! [`PlayerTools`] applies operator-placed influences; the
//! [`CosmicScheduler`] runs rare global events and reports the environment
//! [`Modifiers`](firefly_types::Modifiers) they contribute.
//!
//! # Modules
//!
//! - [`config`] -- Per-kind resource settings and cosmic scheduling config
//! - [`cosmic`] -- Event scheduler and the six event handlers
//! - [`error`] -- Error types for world operations ([`WorldError`])
//! - [`manager`] -- Resource registry, spawning and effect application
//! - [`resource`] -- The resource trait and its eight implementations
//! - [`tools`] -- Player tools, charges and timed zones

pub mod config;
pub mod cosmic;
pub mod error;
pub mod manager;
pub mod resource;
pub mod tools;

pub use config::{
    BlackHolesConfig, CosmicConfig, KindSettings, ParasitesConfig, PortalsConfig,
    PredatorsConfig, ResourcesConfig, SanctuariesConfig, SerpentsConfig, ShadowsConfig,
    WellsConfig,
};
pub use cosmic::{
    ActiveEvent, CosmicContext, CosmicEffect, CosmicReport, CosmicScheduler, EventSpec,
    ForceOutcome, HistoryEntry, can_overlap,
};
pub use error::WorldError;
pub use manager::{ResourceManager, ResourceReport, ResourceTick};
pub use resource::{Effect, Occupant, WorldResource};
pub use tools::{PlayerTools, ShieldZone, ToolOutcome, ToolSpec, ToolZone};

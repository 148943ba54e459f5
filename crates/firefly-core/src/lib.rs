//! Configuration, plugin resolution, frame scheduling and the engine for
//! the Firefly simulation.
//!
//! This crate owns the six-stage frame that drives the simulation:
//! Population, Behaviors, Resources, Cosmic, Meta, and Schedule.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `firefly-config.yaml` into
//!   strongly-typed structs, with range validation.
//! - [`engine`] -- [`Engine`] lifecycle and the frame pipeline.
//! - [`error`] -- Engine lifecycle errors.
//! - [`operator`] -- Operator commands and shared run-control state.
//! - [`plugin`] -- Plugin registry and the resolved enable/disable table.
//! - [`runner`] -- Async frame loop with bounds and operator controls.
//! - [`scheduler`] -- Single-slot frame scheduling and delta capping.
//! - [`surface`] -- Mount surface trait and the headless implementation.
//!
//! [`Engine`]: engine::Engine

pub mod config;
pub mod engine;
pub mod error;
pub mod operator;
pub mod plugin;
pub mod runner;
pub mod scheduler;
pub mod surface;

pub use config::{ConfigAdjustment, ConfigError, SimulationConfig};
pub use engine::{Engine, EngineBuilder, EngineState, FrameSummary};
pub use error::EngineError;
pub use operator::{OperatorCommand, OperatorResponse, OperatorState, SimulationEndReason};
pub use plugin::{ObserverKind, PluginKind, PluginRegistry, PluginStatus, PluginTable};
pub use runner::{FrameCallback, FrameClock, NoOpCallback, RunResult, RunnerError};
pub use scheduler::{ClockError, FrameScheduler};
pub use surface::{HeadlessSurface, Layer, MountSurface};

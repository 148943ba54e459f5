//! Optional meta subsystems for the Firefly simulation.
//!
//! None of these are required for the simulation to run. Each implements
//! [`Observer`] and is attached to the event bus with [`attach`]; the core
//! never holds a reference to them, and a failing observer never affects
//! the frame or its siblings.
//!
//! # Modules
//!
//! - [`achievements`] -- Milestone catalog, unlock tracking, persistence store
//! - [`audio`] -- Cue selection, cooldowns and pluggable backends
//! - [`config`] -- Per-subsystem settings
//! - [`error`] -- Error types ([`ObserverError`], [`StoreError`])
//! - [`event_log`] -- Grouped, bounded event history with text export
//! - [`observer`] -- The observer trait and bus attachment
//! - [`statistics`] -- Counters, snapshots, rates and population history

pub mod achievements;
pub mod audio;
pub mod config;
pub mod error;
pub mod event_log;
pub mod observer;
pub mod statistics;

pub use achievements::{
    Achievement, AchievementCategory, AchievementStats, AchievementStore, Achievements, CATALOG,
    Condition, FileStore, MemoryStore, Progress, STORAGE_KEY, SavedProgress, Unlocked,
};
pub use audio::{AudioBackend, AudioCues, Cue, CueKind, RecordingBackend, SilentBackend};
pub use config::{AchievementsConfig, AudioConfig, EventLogConfig, StatisticsConfig};
pub use error::{ObserverError, StoreError};
pub use event_log::{EventLog, LogCategory, LogEntry};
pub use observer::{Observer, Shared, attach, shared};
pub use statistics::{EcosystemSnapshot, Statistics, StatisticsReport};

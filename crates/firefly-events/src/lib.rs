//! Lifecycle notification bus for the Firefly simulation.
//!
//! The simulation core never holds references to the subsystems that watch
//! it. Instead, every lifecycle transition is published as a [`SimEvent`] on
//! an [`EventBus`], and optional observers (statistics, event log,
//! achievements, audio) subscribe to the [`Signal`]s they care about.
//!
//! Subscribers run in registration order. Each invocation is independently
//! guarded: a handler that returns an error or panics is logged and skipped,
//! and the remaining handlers still run.
//!
//! # Modules
//!
//! - [`signal`] -- Signal names and event payloads
//! - [`bus`] -- Subscription registry and guarded dispatch
//! - [`error`] -- Handler error type

pub mod bus;
pub mod error;
pub mod signal;

pub use bus::{EventBus, PublishReport, SubscriptionId, panic_message};
pub use error::HandlerError;
pub use signal::{EventKind, SimEvent, Signal};

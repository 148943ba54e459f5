//! Error types for the firefly-agents crate.
//!
//! Capacity limits and unknown ids are not errors here: spawns at capacity
//! return `None` and kills of unknown ids return `false`. These variants
//! cover the remaining failures a behavior module can report.

use firefly_types::{BehaviorKind, EntityId, TransitionError};

/// Errors that can occur during population and behavior operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Entity with the given id is not in the population.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A life-state transition was rejected.
    #[error("life-state transition rejected: {source}")]
    Transition {
        /// The underlying rejection.
        #[from]
        source: TransitionError,
    },

    /// A behavior module could not complete its update.
    #[error("behavior module {module:?} failed: {reason}")]
    ModuleFailed {
        /// The failing module.
        module: BehaviorKind,
        /// Description of the failure.
        reason: String,
    },

    /// Population bounds are inconsistent.
    #[error("invalid population bounds: {reason}")]
    InvalidBounds {
        /// Explanation of what is wrong.
        reason: String,
    },
}

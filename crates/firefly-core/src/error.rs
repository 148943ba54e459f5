//! Error types for engine construction and lifecycle.

use crate::config::ConfigError;
use crate::engine::EngineState;

/// Errors returned by [`Engine`](crate::engine::Engine) lifecycle calls.
///
/// Invalid runtime requests (spawning at capacity, forcing an event that
/// is already active) are not errors; they come back as
/// [`OperatorResponse::Rejected`](crate::operator::OperatorResponse::Rejected).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The call is not valid in the engine's current state.
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// What was attempted.
        operation: &'static str,
        /// The state the engine was in.
        state: EngineState,
    },

    /// Configuration could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The population rejected its configuration.
    #[error("population error: {source}")]
    Agents {
        /// The underlying agent error.
        #[from]
        source: firefly_agents::AgentError,
    },
}

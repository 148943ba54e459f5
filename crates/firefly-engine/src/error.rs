//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup and the run so
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: firefly_core::ConfigError,
    },

    /// Engine construction or a lifecycle call failed.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: firefly_core::EngineError,
    },

    /// The frame runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: firefly_core::RunnerError,
    },

    /// An environment override could not be parsed.
    #[error("invalid {name}: {value}")]
    Override {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

//! Error types for the `firefly-observer` crate.
//!
//! Observers never fail the frame loop. Errors returned from a handler are
//! converted into [`HandlerError`](firefly_events::HandlerError) at the
//! subscription boundary and logged by the bus.

/// Errors from the achievement persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored payload could not be encoded or decoded.
    #[error("store payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Errors that can occur inside an observer subsystem.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// Persisting or loading achievement progress failed.
    #[error("achievement store error: {0}")]
    Store(#[from] StoreError),

    /// The observer is already handling an event (re-entrant publish).
    #[error("observer {0} is busy")]
    Busy(&'static str),

    /// The audio backend rejected a cue.
    #[error("audio backend error: {0}")]
    Audio(String),
}

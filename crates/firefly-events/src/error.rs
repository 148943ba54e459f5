//! Errors returned by notification handlers.

/// Failure reported by a subscriber.
///
/// The bus never propagates these: they are logged and counted in the
/// [`PublishReport`](crate::PublishReport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// The handler could not process the event.
    #[error("handler failed: {reason}")]
    Failed {
        /// What went wrong.
        reason: String,
    },

    /// A collaborator the handler depends on is not available.
    #[error("collaborator unavailable: {what}")]
    Unavailable {
        /// The missing collaborator.
        what: String,
    },
}

impl HandlerError {
    /// Convenience constructor for [`HandlerError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

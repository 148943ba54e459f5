//! Error types for the `firefly-world` crate.
//!
//! Invalid operation requests (spawning at capacity, forcing an active
//! event) are reported to the frame loop as `None` or a rejection value.
//! The `try_*` variants of those operations return [`WorldError`] so callers
//! that care can see why.

use firefly_types::{CosmicEventKind, ResourceId, ResourceKind, ResourceVariant};

/// Errors that can occur during resource and cosmic event operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// No active resource has this id.
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),

    /// The resource kind is disabled in configuration.
    #[error("resource kind {0:?} is disabled")]
    KindDisabled(ResourceKind),

    /// The kind already has its maximum number of active resources.
    #[error("resource kind {kind:?} is at capacity ({max})")]
    AtCapacity {
        /// The full kind.
        kind: ResourceKind,
        /// Configured maximum.
        max: usize,
    },

    /// A variant was requested under a kind it does not belong to.
    #[error("variant {variant:?} does not belong to {kind:?}")]
    VariantMismatch {
        /// Requested kind.
        kind: ResourceKind,
        /// Requested variant.
        variant: ResourceVariant,
    },

    /// The kind has no spawnable variants configured.
    #[error("resource kind {0:?} has no configured variants")]
    NoVariants(ResourceKind),

    /// A cosmic event handler failed while applying its effect.
    #[error("cosmic event {event:?} failed: {reason}")]
    EffectFailed {
        /// The failing event.
        event: CosmicEventKind,
        /// Description of the failure.
        reason: String,
    },
}

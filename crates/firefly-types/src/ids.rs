//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every simulated object has a strongly-typed ID so that an entity id can
//! never be passed where a resource id is expected. All IDs use UUID v7
//! (time-ordered). Components that need to remember an object across
//! frames hold one of these ids, never a reference.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a firefly in the population arena.
    EntityId
}

define_id! {
    /// Unique identifier for a resource or hazard (well, predator, portal, sanctuary).
    ResourceId
}

define_id! {
    /// Unique identifier for a temporary swarm grouping.
    SwarmId
}

define_id! {
    /// Unique identifier for a pattern formation (constellation).
    FormationId
}

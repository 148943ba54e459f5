//! Signal names and the payloads published with them.

use serde::{Deserialize, Serialize};

use firefly_types::{
    CollisionOutcome, CosmicEventKind, DeathCause, EntityId, EntitySnapshot, FormationId,
    PredatorVariant, RareVariant, ResourceId, ResourceVariant, SpawnOrigin, Tier, ToolKind, Vec2,
};

/// A lifecycle signal observers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// An entity entered the population.
    Birth,
    /// An entity was removed from the population.
    Death,
    /// An entity moved up a tier.
    Evolution,
    /// Two entities collided.
    Collision,
    /// A player tool was applied.
    ToolUse,
    /// A cosmic event started.
    EventStart,
    /// A cosmic event ended.
    EventEnd,
    /// A predator star appeared.
    PredatorSpawn,
    /// A predator star captured an entity.
    PredatorKill,
    /// A predator was driven off or a capture was blocked.
    PredatorRepelled,
    /// A non-predator hazard killed an entity.
    HazardKill,
    /// A shadow firefly converted an entity.
    Corruption,
    /// A rare variant appeared.
    RareSpawn,
    /// A resource or hazard was placed.
    ResourceSpawned,
    /// A resource or hazard was retired.
    ResourceRetired,
    /// An entity passed through a portal.
    Teleport,
    /// A group of entities formed a pattern.
    PatternFormed,
    /// An achievement was unlocked.
    AchievementUnlocked,
    /// Free-form operator or engine message.
    System,
}

impl Signal {
    /// Every signal, in declaration order.
    pub const ALL: [Self; 19] = [
        Self::Birth,
        Self::Death,
        Self::Evolution,
        Self::Collision,
        Self::ToolUse,
        Self::EventStart,
        Self::EventEnd,
        Self::PredatorSpawn,
        Self::PredatorKill,
        Self::PredatorRepelled,
        Self::HazardKill,
        Self::Corruption,
        Self::RareSpawn,
        Self::ResourceSpawned,
        Self::ResourceRetired,
        Self::Teleport,
        Self::PatternFormed,
        Self::AchievementUnlocked,
        Self::System,
    ];

    /// Stable lowercase name, used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Birth => "birth",
            Self::Death => "death",
            Self::Evolution => "evolution",
            Self::Collision => "collision",
            Self::ToolUse => "tool_use",
            Self::EventStart => "event_start",
            Self::EventEnd => "event_end",
            Self::PredatorSpawn => "predator_spawn",
            Self::PredatorKill => "predator_kill",
            Self::PredatorRepelled => "predator_repelled",
            Self::HazardKill => "hazard_kill",
            Self::Corruption => "corruption",
            Self::RareSpawn => "rare_spawn",
            Self::ResourceSpawned => "resource_spawned",
            Self::ResourceRetired => "resource_retired",
            Self::Teleport => "teleport",
            Self::PatternFormed => "pattern_formed",
            Self::AchievementUnlocked => "achievement_unlocked",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of a published event. Each variant maps to exactly one [`Signal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// An entity was spawned.
    Birth {
        /// The newborn.
        entity: EntitySnapshot,
        /// Which path created it.
        origin: SpawnOrigin,
    },
    /// An entity finished dying and was unlinked.
    Death {
        /// Final state, with life-state `dead`.
        entity: EntitySnapshot,
        /// The first cause recorded.
        cause: DeathCause,
    },
    /// An entity evolved.
    Evolution {
        /// The entity after evolving.
        entity: EntitySnapshot,
        /// Previous tier.
        from: Tier,
        /// New tier.
        to: Tier,
    },
    /// Two entities collided.
    Collision {
        /// First participant.
        a: EntityId,
        /// Second participant.
        b: EntityId,
        /// What the collision did.
        outcome: CollisionOutcome,
        /// Midpoint of the pair.
        position: Vec2,
    },
    /// A player tool was applied.
    ToolUse {
        /// Which tool.
        tool: ToolKind,
        /// Where it was applied.
        position: Vec2,
        /// Entities inside the tool radius.
        affected: usize,
    },
    /// A cosmic event became active.
    EventStart {
        /// Event type.
        event: CosmicEventKind,
        /// Intensity in `[0.5, 1.0]`.
        intensity: f64,
        /// Planned duration.
        duration_ms: f64,
    },
    /// A cosmic event ended.
    EventEnd {
        /// Event type.
        event: CosmicEventKind,
    },
    /// A predator star was placed.
    PredatorSpawn {
        /// The predator.
        resource: ResourceId,
        /// Its variant.
        variant: PredatorVariant,
        /// Where it appeared.
        position: Vec2,
    },
    /// A predator captured an entity.
    PredatorKill {
        /// The predator.
        resource: ResourceId,
        /// Its variant.
        variant: PredatorVariant,
        /// The captured entity.
        victim: EntityId,
    },
    /// A predator retreated or a capture was blocked.
    PredatorRepelled {
        /// The predator.
        resource: ResourceId,
        /// Entity that resisted, if the repel came from a blocked capture.
        entity: Option<EntityId>,
    },
    /// A black hole, void serpent or other non-predator hazard killed an
    /// entity.
    HazardKill {
        /// The hazard.
        resource: ResourceId,
        /// Its variant.
        variant: ResourceVariant,
        /// The killed entity.
        victim: EntityId,
        /// Recorded cause.
        cause: DeathCause,
    },
    /// A shadow firefly converted an entity.
    Corruption {
        /// The shadow firefly.
        resource: ResourceId,
        /// The converted entity.
        entity: EntityId,
    },
    /// A rare variant appeared.
    RareSpawn {
        /// The entity carrying the tag.
        entity: EntitySnapshot,
        /// Which variant.
        variant: RareVariant,
    },
    /// A resource or hazard was placed.
    ResourceSpawned {
        /// The resource.
        resource: ResourceId,
        /// Its variant.
        variant: ResourceVariant,
        /// Where it was placed.
        position: Vec2,
    },
    /// A resource or hazard was retired.
    ResourceRetired {
        /// The resource.
        resource: ResourceId,
        /// Its variant.
        variant: ResourceVariant,
    },
    /// An entity was moved by a portal.
    Teleport {
        /// The moved entity.
        entity: EntityId,
        /// Position before.
        from: Vec2,
        /// Position after.
        to: Vec2,
    },
    /// A pattern formation was assembled.
    PatternFormed {
        /// The formation.
        formation: FormationId,
        /// Shape name.
        shape: String,
        /// Number of members.
        members: usize,
    },
    /// An achievement was unlocked.
    AchievementUnlocked {
        /// Catalog id.
        id: String,
        /// Display name.
        name: String,
        /// Points awarded.
        points: u32,
    },
    /// Free-form message.
    System {
        /// Message text.
        message: String,
    },
}

impl EventKind {
    /// The signal this payload is published under.
    pub const fn signal(&self) -> Signal {
        match self {
            Self::Birth { .. } => Signal::Birth,
            Self::Death { .. } => Signal::Death,
            Self::Evolution { .. } => Signal::Evolution,
            Self::Collision { .. } => Signal::Collision,
            Self::ToolUse { .. } => Signal::ToolUse,
            Self::EventStart { .. } => Signal::EventStart,
            Self::EventEnd { .. } => Signal::EventEnd,
            Self::PredatorSpawn { .. } => Signal::PredatorSpawn,
            Self::PredatorKill { .. } => Signal::PredatorKill,
            Self::PredatorRepelled { .. } => Signal::PredatorRepelled,
            Self::HazardKill { .. } => Signal::HazardKill,
            Self::Corruption { .. } => Signal::Corruption,
            Self::RareSpawn { .. } => Signal::RareSpawn,
            Self::ResourceSpawned { .. } => Signal::ResourceSpawned,
            Self::ResourceRetired { .. } => Signal::ResourceRetired,
            Self::Teleport { .. } => Signal::Teleport,
            Self::PatternFormed { .. } => Signal::PatternFormed,
            Self::AchievementUnlocked { .. } => Signal::AchievementUnlocked,
            Self::System { .. } => Signal::System,
        }
    }
}

/// A published event, stamped with the frame and simulated time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Frame number the event was published in.
    pub frame: u64,
    /// Simulated milliseconds since the engine started.
    pub at_ms: f64,
    /// Payload.
    pub kind: EventKind,
}

impl SimEvent {
    /// Shorthand for `self.kind.signal()`.
    pub const fn signal(&self) -> Signal {
        self.kind.signal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_signal_has_unique_name() {
        let mut names: Vec<&str> = Signal::ALL.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Signal::ALL.len());
    }

    #[test]
    fn payload_maps_to_signal() {
        let kind = EventKind::EventEnd {
            event: CosmicEventKind::Eclipse,
        };
        assert_eq!(kind.signal(), Signal::EventEnd);
        let kind = EventKind::System {
            message: "hello".to_owned(),
        };
        assert_eq!(kind.signal(), Signal::System);
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = SimEvent {
            frame: 3,
            at_ms: 48.0,
            kind: EventKind::EventEnd {
                event: CosmicEventKind::Comet,
            },
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"type\":\"event_end\""));
        assert!(json.contains("COMET"));
    }
}

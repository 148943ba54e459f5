//! Enumeration types for the Firefly simulation.
//!
//! Lifecycle states, evolution tiers, death causes, resource and hazard
//! variants, cosmic event kinds, behavior module kinds, and player tools.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Discrete life-state of an entity.
///
/// States only ever advance in declaration order. `Dead` is the terminal
/// state carried by the final snapshot handed to the death notification;
/// no entity inside the population arena is ever `Dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    /// Fading in; not yet interacting.
    Birth,
    /// Fully active: moves, collides, decays, reproduces.
    Mature,
    /// Playing the death animation; removed once the window elapses.
    Dying,
    /// Removed from the arena.
    Dead,
}

impl LifeState {
    /// Ordinal used to enforce forward-only transitions.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Birth => 0,
            Self::Mature => 1,
            Self::Dying => 2,
            Self::Dead => 3,
        }
    }

    /// Whether moving from `self` to `next` is a forward transition.
    pub const fn can_advance_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }
}

/// Binary category of an entity (the digit it displays).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Digit {
    /// Prey in the hunting module.
    Zero,
    /// Hunter in the hunting module.
    One,
}

impl Digit {
    /// The numeric value of the digit.
    pub const fn value(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }
}

/// Ordered evolution tier.
///
/// Each tier multiplies lifespan, adds resistance to hazard captures, and
/// requires a number of collisions before the next evolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Level 0.
    Basic,
    /// Level 1.
    Charged,
    /// Level 2.
    Radiant,
    /// Level 3.
    Prismatic,
    /// Level 4. Cannot evolve further.
    Ascended,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Self; 5] = [
        Self::Basic,
        Self::Charged,
        Self::Radiant,
        Self::Prismatic,
        Self::Ascended,
    ];

    /// Numeric level, 0 through 4.
    pub const fn level(self) -> u8 {
        match self {
            Self::Basic => 0,
            Self::Charged => 1,
            Self::Radiant => 2,
            Self::Prismatic => 3,
            Self::Ascended => 4,
        }
    }

    /// Lifespan multiplier applied to the base max-age.
    pub const fn life_multiplier(self) -> f64 {
        match self {
            Self::Basic => 1.0,
            Self::Charged => 1.5,
            Self::Radiant => 2.0,
            Self::Prismatic => 3.0,
            Self::Ascended => 5.0,
        }
    }

    /// Probability of shrugging off a hazard capture.
    pub const fn resistance(self) -> f64 {
        match self {
            Self::Basic => 0.0,
            Self::Charged => 0.15,
            Self::Radiant => 0.30,
            Self::Prismatic => 0.50,
            Self::Ascended => 0.75,
        }
    }

    /// Evolution progress required to reach the next tier, or `None` at the top.
    pub const fn evolve_threshold(self) -> Option<f64> {
        match self {
            Self::Basic => Some(3.0),
            Self::Charged => Some(5.0),
            Self::Radiant => Some(8.0),
            Self::Prismatic => Some(12.0),
            Self::Ascended => None,
        }
    }

    /// The next tier up, if any.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Basic => Some(Self::Charged),
            Self::Charged => Some(Self::Radiant),
            Self::Radiant => Some(Self::Prismatic),
            Self::Prismatic => Some(Self::Ascended),
            Self::Ascended => None,
        }
    }

    /// Human-readable tier name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Charged => "Charged",
            Self::Radiant => "Radiant",
            Self::Prismatic => "Prismatic",
            Self::Ascended => "Ascended",
        }
    }
}

/// Why an entity left the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    /// Energy exhausted or max-age reached.
    Natural,
    /// Captured by a predator hazard.
    Predator,
    /// Struck by an impact (meteor landing).
    Collision,
    /// An Ascended entity consumed by a hazard.
    Sacrifice,
    /// Swallowed by a black hole or void serpent.
    Consumed,
}

impl DeathCause {
    /// Lowercase tag used in logs and exports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Natural => "natural",
            Self::Predator => "predator",
            Self::Collision => "collision",
            Self::Sacrifice => "sacrifice",
            Self::Consumed => "consumed",
        }
    }
}

/// Result of two mature entities colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionOutcome {
    /// One + One: both become Zero.
    Overflow,
    /// Zero + Zero: both become One.
    Quantum,
    /// One + Zero: both gain energy.
    Merge,
}

/// Rare variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RareVariant {
    /// Golden One: energizes neighbours.
    Golden,
    /// Diamond Zero: extra hazard resistance.
    Diamond,
    /// Glitch: random short teleports.
    Glitch,
    /// Ancient: slow, boosts nearby evolution.
    Ancient,
}

impl RareVariant {
    /// All rare variants.
    pub const ALL: [Self; 4] = [Self::Golden, Self::Diamond, Self::Glitch, Self::Ancient];

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Golden => "Golden",
            Self::Diamond => "Diamond",
            Self::Glitch => "Glitch",
            Self::Ancient => "Ancient",
        }
    }

    /// Digit the variant requires, if any.
    pub const fn required_digit(self) -> Option<Digit> {
        match self {
            Self::Golden => Some(Digit::One),
            Self::Diamond => Some(Digit::Zero),
            Self::Glitch | Self::Ancient => None,
        }
    }
}

/// Personality house assigned by the personality module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum House {
    /// Network builders: stronger cohesion.
    Web,
    /// Guardians: drift toward the weakest neighbour.
    Shield,
    /// Creators: steady, slightly slow.
    Forge,
    /// Coders: zig-zag movement.
    Script,
    /// Ethereal: float upward.
    Cloud,
    /// Shadows: avoid others.
    DarkArts,
}

impl House {
    /// All houses.
    pub const ALL: [Self; 6] = [
        Self::Web,
        Self::Shield,
        Self::Forge,
        Self::Script,
        Self::Cloud,
        Self::DarkArts,
    ];

    /// Speed multiplier applied while the personality is active.
    pub const fn speed_multiplier(self) -> f64 {
        match self {
            Self::Web => 0.8,
            Self::Shield => 1.1,
            Self::Forge => 0.9,
            Self::Script => 1.2,
            Self::Cloud => 0.7,
            Self::DarkArts => 1.3,
        }
    }
}

/// Where a newly spawned entity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnOrigin {
    /// Initial seeding at start.
    Seed,
    /// Floor enforcement refill.
    Refill,
    /// Offspring of a reproducing parent.
    Reproduction,
    /// Rare-variant module spawn.
    Rare,
    /// Spawned by a cosmic event.
    Cosmic,
    /// Spawned by an operator command.
    Operator,
}

// ---------------------------------------------------------------------------
// Resources and hazards
// ---------------------------------------------------------------------------

/// Resource or hazard family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Stationary energy source.
    EnergyWell,
    /// Mobile hunter.
    PredatorStar,
    /// One end of a teleport pair.
    Portal,
    /// Protective zone.
    Sanctuary,
    /// Stationary gravity sink that swallows what it pulls in.
    BlackHole,
    /// Dark firefly that converts mature Zeros.
    ShadowFirefly,
    /// Long segmented hunter entering from the edge.
    VoidSerpent,
    /// Small hazard that latches onto a host and drains it.
    Parasite,
}

impl ResourceKind {
    /// All resource kinds in spawn-check order.
    pub const ALL: [Self; 8] = [
        Self::EnergyWell,
        Self::PredatorStar,
        Self::Portal,
        Self::Sanctuary,
        Self::BlackHole,
        Self::ShadowFirefly,
        Self::VoidSerpent,
        Self::Parasite,
    ];

    /// Configuration and plugin name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::EnergyWell => "energy_wells",
            Self::PredatorStar => "predator_stars",
            Self::Portal => "portals",
            Self::Sanctuary => "sanctuaries",
            Self::BlackHole => "black_holes",
            Self::ShadowFirefly => "shadow_fireflies",
            Self::VoidSerpent => "void_serpents",
            Self::Parasite => "parasites",
        }
    }

    /// Whether the kind harms entities (and is pushed out of sanctuaries).
    pub const fn is_hazard(self) -> bool {
        !matches!(
            self,
            Self::EnergyWell | Self::Portal | Self::Sanctuary
        )
    }
}

/// Energy well variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WellVariant {
    /// Balanced capacity and output.
    Standard,
    /// Small, fast, and short-lived.
    Volatile,
    /// Infinite capacity, wide reach.
    Ancient,
}

/// Predator star variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredatorVariant {
    /// Active pursuer.
    Hunter,
    /// Ambush predator.
    Lurker,
    /// Slow, wide-ranging.
    Drifter,
    /// Rare explosive bursts.
    Nova,
}

/// Sanctuary variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SanctuaryVariant {
    /// Baseline zone.
    Standard,
    /// Large zone with faster regeneration.
    Ancient,
    /// Short-lived, strong zone.
    Celestial,
    /// Never expires.
    Permanent,
}

/// Concrete variant of a resource or hazard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceVariant {
    /// An energy well.
    Well(WellVariant),
    /// A predator star.
    Predator(PredatorVariant),
    /// A portal end.
    Portal,
    /// A sanctuary.
    Sanctuary(SanctuaryVariant),
    /// A black hole.
    BlackHole,
    /// A shadow firefly.
    Shadow,
    /// A void serpent.
    Serpent,
    /// A parasite.
    Parasite,
}

impl ResourceVariant {
    /// The family this variant belongs to.
    pub const fn kind(self) -> ResourceKind {
        match self {
            Self::Well(_) => ResourceKind::EnergyWell,
            Self::Predator(_) => ResourceKind::PredatorStar,
            Self::Portal => ResourceKind::Portal,
            Self::Sanctuary(_) => ResourceKind::Sanctuary,
            Self::BlackHole => ResourceKind::BlackHole,
            Self::Shadow => ResourceKind::ShadowFirefly,
            Self::Serpent => ResourceKind::VoidSerpent,
            Self::Parasite => ResourceKind::Parasite,
        }
    }
}

/// Lifecycle state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Applying its effect.
    Active,
    /// Emptied; waiting out a cooldown.
    Depleted,
    /// Refilling after depletion.
    Restoring,
    /// Finished; will be retired this frame.
    Expended,
}

// ---------------------------------------------------------------------------
// Cosmic events
// ---------------------------------------------------------------------------

/// Global, time-bounded cosmic event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CosmicEventKind {
    /// Energy wave.
    SolarFlare,
    /// Falling seeds and impacts.
    MeteorShower,
    /// Central vortex.
    VoidStorm,
    /// Darkness, brighter glow.
    Eclipse,
    /// Drifting energizing cloud.
    NebulaDrift,
    /// Rare visitor boosting evolution.
    Comet,
}

impl CosmicEventKind {
    /// All event kinds.
    pub const ALL: [Self; 6] = [
        Self::SolarFlare,
        Self::MeteorShower,
        Self::VoidStorm,
        Self::Eclipse,
        Self::NebulaDrift,
        Self::Comet,
    ];

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SolarFlare => "Solar Flare",
            Self::MeteorShower => "Meteor Shower",
            Self::VoidStorm => "Void Storm",
            Self::Eclipse => "Eclipse",
            Self::NebulaDrift => "Nebula Drift",
            Self::Comet => "Comet Passage",
        }
    }
}

// ---------------------------------------------------------------------------
// Behaviors and tools
// ---------------------------------------------------------------------------

/// Behavior module kind. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    /// Predator/prey chasing and desperate seeking.
    Hunting,
    /// Flocking groups.
    Swarming,
    /// Constellation shapes.
    PatternFormation,
    /// Offspring creation.
    Reproduction,
    /// House personality bias.
    Personality,
    /// Rare-variant tagging and spawning.
    RareVariants,
    /// Pointer attraction and repulsion.
    PointerInteraction,
    /// Day/night cycle and wind.
    Environment,
}

impl BehaviorKind {
    /// All kinds in execution order.
    pub const ALL: [Self; 8] = [
        Self::Hunting,
        Self::Swarming,
        Self::PatternFormation,
        Self::Reproduction,
        Self::Personality,
        Self::RareVariants,
        Self::PointerInteraction,
        Self::Environment,
    ];

    /// Configuration and plugin name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hunting => "hunting",
            Self::Swarming => "swarming",
            Self::PatternFormation => "pattern_formation",
            Self::Reproduction => "reproduction",
            Self::Personality => "personality",
            Self::RareVariants => "rare_variants",
            Self::PointerInteraction => "pointer_interaction",
            Self::Environment => "environment",
        }
    }
}

/// Player tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Instant energy boost in an area.
    Blessing,
    /// Temporary gravity zone.
    Gravity,
    /// Temporary zone blocking captures.
    Shield,
    /// Temporary attractor.
    Beacon,
    /// Temporary evolution accelerator.
    Catalyst,
}

impl ToolKind {
    /// All tools.
    pub const ALL: [Self; 5] = [
        Self::Blessing,
        Self::Gravity,
        Self::Shield,
        Self::Beacon,
        Self::Catalyst,
    ];

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Blessing => "Energy Blessing",
            Self::Gravity => "Gravity Brush",
            Self::Shield => "Shield Bubble",
            Self::Beacon => "Spawn Beacon",
            Self::Catalyst => "Evolution Catalyst",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn life_state_only_advances() {
        assert!(LifeState::Birth.can_advance_to(LifeState::Mature));
        assert!(LifeState::Birth.can_advance_to(LifeState::Dying));
        assert!(!LifeState::Mature.can_advance_to(LifeState::Birth));
        assert!(!LifeState::Dying.can_advance_to(LifeState::Dying));
    }

    #[test]
    fn tiers_chain_to_ascended() {
        let mut tier = Tier::Basic;
        let mut steps = 0;
        while let Some(next) = tier.next() {
            assert!(next > tier);
            tier = next;
            steps += 1;
        }
        assert_eq!(tier, Tier::Ascended);
        assert_eq!(steps, 4);
        assert!(Tier::Ascended.evolve_threshold().is_none());
    }

    #[test]
    fn behavior_order_matches_declaration() {
        let mut sorted = BehaviorKind::ALL;
        sorted.sort();
        assert_eq!(sorted, BehaviorKind::ALL);
    }

    #[test]
    fn cosmic_kinds_use_screaming_names() {
        let json = serde_json::to_string(&CosmicEventKind::SolarFlare).unwrap_or_default();
        assert_eq!(json, "\"SOLAR_FLARE\"");
        let parsed: Result<WellVariant, _> = serde_json::from_str("\"VOLATILE\"");
        assert!(matches!(parsed, Ok(WellVariant::Volatile)));
    }

    #[test]
    fn every_variant_maps_back_to_its_hazard_kind() {
        let hazards = [
            ResourceVariant::BlackHole,
            ResourceVariant::Shadow,
            ResourceVariant::Serpent,
            ResourceVariant::Parasite,
            ResourceVariant::Predator(PredatorVariant::Lurker),
        ];
        for variant in hazards {
            assert!(variant.kind().is_hazard(), "{variant:?}");
        }
        assert!(!ResourceVariant::Portal.kind().is_hazard());
        assert!(!ResourceKind::EnergyWell.is_hazard());
        assert_eq!(ResourceKind::ShadowFirefly.name(), "shadow_fireflies");
    }
}

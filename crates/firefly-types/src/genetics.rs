//! Inheritable trait multipliers.
//!
//! A [`Genetics`] record stores one multiplier per [`GeneTrait`], always
//! within the trait's `[min, max]` range. Breeding and mutation live in
//! `firefly-agents`; this module only defines the data and the trait table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single inheritable trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneTrait {
    /// Maximum movement speed.
    Speed,
    /// Responsiveness to forces.
    Agility,
    /// Body size.
    Size,
    /// Glow brightness.
    GlowIntensity,
    /// Glow pulse rate.
    GlowFrequency,
    /// Divides energy decay.
    EnergyEfficiency,
    /// Multiplies max-age.
    Lifespan,
    /// Hazard resilience.
    Resilience,
    /// Pull toward neighbours.
    Sociability,
    /// Wander strength.
    Curiosity,
    /// Reproduction chance.
    Fertility,
    /// Birth window speed.
    MaturitySpeed,
}

/// Range and inheritance parameters of a trait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraitSpec {
    /// Lowest allowed value.
    pub min: f64,
    /// Highest allowed value.
    pub max: f64,
    /// Value for an unremarkable entity.
    pub default: f64,
    /// Relative chance of mutating on inheritance.
    pub mutation_rate: f64,
    /// Half-width of a mutation step.
    pub mutation_range: f64,
    /// Probability that inheritance favours the larger parent value.
    pub dominance: f64,
}

impl GeneTrait {
    /// All traits.
    pub const ALL: [Self; 12] = [
        Self::Speed,
        Self::Agility,
        Self::Size,
        Self::GlowIntensity,
        Self::GlowFrequency,
        Self::EnergyEfficiency,
        Self::Lifespan,
        Self::Resilience,
        Self::Sociability,
        Self::Curiosity,
        Self::Fertility,
        Self::MaturitySpeed,
    ];

    /// The trait's parameters.
    #[allow(clippy::match_same_arms)]
    pub const fn spec(self) -> TraitSpec {
        let (min, max, mutation_rate, mutation_range, dominance) = match self {
            Self::Speed => (0.6, 1.5, 0.15, 0.1, 0.5),
            Self::Agility => (0.7, 1.4, 0.12, 0.08, 0.5),
            Self::Size => (0.7, 1.4, 0.1, 0.1, 0.6),
            Self::GlowIntensity => (0.5, 1.8, 0.2, 0.15, 0.7),
            Self::GlowFrequency => (0.6, 1.6, 0.18, 0.12, 0.5),
            Self::EnergyEfficiency => (0.7, 1.4, 0.1, 0.08, 0.65),
            Self::Lifespan => (0.8, 1.3, 0.08, 0.06, 0.55),
            Self::Resilience => (0.7, 1.5, 0.12, 0.1, 0.6),
            Self::Sociability => (0.4, 1.6, 0.2, 0.15, 0.5),
            Self::Curiosity => (0.5, 1.5, 0.18, 0.12, 0.55),
            Self::Fertility => (0.6, 1.5, 0.1, 0.1, 0.6),
            Self::MaturitySpeed => (0.8, 1.3, 0.08, 0.05, 0.5),
        };
        TraitSpec {
            min,
            max,
            default: 1.0,
            mutation_rate,
            mutation_range,
            dominance,
        }
    }

    /// Clamp a value into this trait's range.
    pub fn clamp(self, value: f64) -> f64 {
        let spec = self.spec();
        value.clamp(spec.min, spec.max)
    }
}

/// Inheritable trait multipliers of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Genetics {
    /// Trait values. Missing traits read as the trait default.
    traits: BTreeMap<GeneTrait, f64>,
    /// Number of mutations accumulated along this lineage.
    pub mutations: u32,
}

impl Genetics {
    /// All traits at their defaults.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Read a trait value.
    pub fn get(&self, gene: GeneTrait) -> f64 {
        self.traits
            .get(&gene)
            .copied()
            .unwrap_or_else(|| gene.spec().default)
    }

    /// Set a trait value, clamped into range.
    pub fn set(&mut self, gene: GeneTrait, value: f64) {
        self.traits.insert(gene, gene.clamp(value));
    }

    /// Iterate all traits with their current values.
    pub fn iter(&self) -> impl Iterator<Item = (GeneTrait, f64)> + '_ {
        GeneTrait::ALL.into_iter().map(|gene| (gene, self.get(gene)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_traits_read_default() {
        let genetics = Genetics::neutral();
        assert!((genetics.get(GeneTrait::Speed) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn set_clamps_into_range() {
        let mut genetics = Genetics::neutral();
        genetics.set(GeneTrait::Lifespan, 9.0);
        assert!((genetics.get(GeneTrait::Lifespan) - 1.3).abs() < f64::EPSILON);
        genetics.set(GeneTrait::Lifespan, -1.0);
        assert!((genetics.get(GeneTrait::Lifespan) - 0.8).abs() < f64::EPSILON);
    }
}

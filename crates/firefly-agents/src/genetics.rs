//! Genetics creation and inheritance.
//!
//! Seeded entities get traits that vary up to 10% either side of 1.0.
//! Offspring inherit through a dominance-weighted crossover followed by an
//! occasional mutation, always clamped into each trait's range.

use rand::Rng;

use firefly_types::{GeneTrait, Genetics};

/// Base mutation rate multiplied by each trait's own rate.
pub const BASE_MUTATION_RATE: f64 = 0.15;

/// Upper bound on the per-trait mutation chance.
pub const MAX_MUTATION_CHANCE: f64 = 0.5;

/// Half-width of the initial variation around the trait default.
const INITIAL_VARIATION: f64 = 0.1;

/// Weight of the larger parent value under dominant inheritance.
const DOMINANT_WEIGHT: f64 = 0.7;

/// Half-width of the jitter added to a plain average.
const AVERAGE_JITTER: f64 = 0.05;

/// Genetics for a freshly seeded entity.
pub fn random_genetics(rng: &mut impl Rng) -> Genetics {
    let mut genetics = Genetics::neutral();
    for gene in GeneTrait::ALL {
        let variation = rng.random_range(-INITIAL_VARIATION..=INITIAL_VARIATION);
        genetics.set(gene, gene.spec().default + variation);
    }
    genetics
}

/// Chance that a given trait mutates on inheritance.
pub fn mutation_chance(gene: GeneTrait) -> f64 {
    (gene.spec().mutation_rate * BASE_MUTATION_RATE).min(MAX_MUTATION_CHANCE)
}

/// Produce offspring genetics from two parents.
///
/// For each trait, with probability `dominance` the child takes 70% of the
/// larger parent value and 30% of the smaller; otherwise it takes the
/// average plus a small jitter. A mutation of up to `mutation_range` either
/// way is then applied with probability [`mutation_chance`].
pub fn breed(parent_a: &Genetics, parent_b: &Genetics, rng: &mut impl Rng) -> Genetics {
    let mut child = Genetics::neutral();
    child.mutations = parent_a.mutations.max(parent_b.mutations);

    for gene in GeneTrait::ALL {
        let spec = gene.spec();
        let a = parent_a.get(gene);
        let b = parent_b.get(gene);

        let mut value = if rng.random_bool(spec.dominance.clamp(0.0, 1.0)) {
            a.max(b).mul_add(DOMINANT_WEIGHT, a.min(b) * (1.0 - DOMINANT_WEIGHT))
        } else {
            (a + b) / 2.0 + rng.random_range(-AVERAGE_JITTER..=AVERAGE_JITTER)
        };

        if rng.random_bool(mutation_chance(gene)) {
            value += rng.random_range(-spec.mutation_range..=spec.mutation_range);
            child.mutations = child.mutations.saturating_add(1);
        }

        child.set(gene, value);
    }

    child
}

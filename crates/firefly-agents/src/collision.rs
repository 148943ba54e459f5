//! Pairwise collisions between mature entities.
//!
//! Detection is a straightforward O(n^2) sweep: populations are capped in
//! the low hundreds, and each entity takes part in at most one collision
//! per frame.

use firefly_types::{CollisionOutcome, Digit, Entity};

use crate::config::CollisionConfig;

/// Whether two entities are eligible to collide right now.
pub fn can_collide(a: &Entity, b: &Entity, radius: f64) -> bool {
    a.is_mature()
        && b.is_mature()
        && a.collision_cooldown_ms <= 0.0
        && b.collision_cooldown_ms <= 0.0
        && a.position.distance(b.position) < radius
}

/// Index pairs of entities that collide this frame.
///
/// Each index appears in at most one pair; earlier entities pair first.
pub fn find_pairs(entities: &[Entity], radius: f64) -> Vec<(usize, usize)> {
    let mut taken = vec![false; entities.len()];
    let mut pairs = Vec::new();

    for (i, a) in entities.iter().enumerate() {
        if taken.get(i).copied().unwrap_or(true) {
            continue;
        }
        for (j, b) in entities.iter().enumerate().skip(i.saturating_add(1)) {
            if taken.get(j).copied().unwrap_or(true) || !can_collide(a, b, radius) {
                continue;
            }
            if let Some(slot) = taken.get_mut(i) {
                *slot = true;
            }
            if let Some(slot) = taken.get_mut(j) {
                *slot = true;
            }
            pairs.push((i, j));
            break;
        }
    }

    pairs
}

/// The outcome for a pair of digits.
pub const fn outcome_for(a: Digit, b: Digit) -> CollisionOutcome {
    match (a, b) {
        (Digit::One, Digit::One) => CollisionOutcome::Overflow,
        (Digit::Zero, Digit::Zero) => CollisionOutcome::Quantum,
        _ => CollisionOutcome::Merge,
    }
}

/// Apply a collision's effect to both participants.
///
/// `progress_gain` is normally 1.0, multiplied by an active evolution
/// catalyst. Returns the outcome.
pub fn collide(
    a: &mut Entity,
    b: &mut Entity,
    config: &CollisionConfig,
    progress_gain: f64,
    energy_multiplier: f64,
) -> CollisionOutcome {
    let outcome = outcome_for(a.digit, b.digit);
    match outcome {
        CollisionOutcome::Overflow => {
            a.digit = Digit::Zero;
            b.digit = Digit::Zero;
        }
        CollisionOutcome::Quantum => {
            a.digit = Digit::One;
            b.digit = Digit::One;
        }
        CollisionOutcome::Merge => {
            a.add_energy(config.merge_energy * energy_multiplier);
            b.add_energy(config.merge_energy * energy_multiplier);
        }
    }

    for entity in [a, b] {
        entity.collision_cooldown_ms = config.cooldown_ms;
        entity.collision_count = entity.collision_count.saturating_add(1);
        entity.evolution_progress += progress_gain;
    }

    outcome
}

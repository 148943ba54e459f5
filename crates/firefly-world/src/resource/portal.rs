//! Linked teleport portals.
//!
//! Portals always come in pairs. Each end pulls mature entities inside its
//! pull radius and sends those that reach its capture radius out of the
//! partner, just beyond the partner's own capture radius. An entity that has
//! used a pair cannot use either end again until its cooldown elapses.

use std::collections::BTreeMap;

use firefly_types::{EntityId, ResourceId, ResourceState, ResourceVariant, Vec2};

use super::{Effect, Notice, Occupant, ResourceEnv, WorldResource, falloff};

/// Visual radius of a portal.
pub const RADIUS: f64 = 40.0;

/// Distance at which an entity is teleported.
pub const CAPTURE_RADIUS: f64 = 30.0;

/// Radius of the gentle pull.
pub const PULL_RADIUS: f64 = 100.0;

/// Per-frame pull at the capture edge.
pub const PULL_STRENGTH: f64 = 0.08;

/// Time before the same entity may teleport again.
pub const ENTITY_COOLDOWN_MS: f64 = 2_000.0;

/// Lifetime of a pair.
pub const DURATION_MS: f64 = 30_000.0;

/// Exit distance from the partner's center.
const EXIT_DISTANCE: f64 = CAPTURE_RADIUS * 1.5;

/// One end of a portal pair.
#[derive(Debug, Clone)]
pub struct Portal {
    id: ResourceId,
    partner: ResourceId,
    position: Vec2,
    partner_position: Vec2,
    age_ms: f64,
    cooldowns: BTreeMap<EntityId, f64>,
    teleports: u32,
    expended: bool,
}

impl Portal {
    /// Create both ends of a pair.
    pub fn pair(a: Vec2, b: Vec2) -> (Self, Self) {
        let id_a = ResourceId::new();
        let id_b = ResourceId::new();
        let end = |id, partner, position, partner_position| Self {
            id,
            partner,
            position,
            partner_position,
            age_ms: 0.0,
            cooldowns: BTreeMap::new(),
            teleports: 0,
            expended: false,
        };
        (end(id_a, id_b, a, b), end(id_b, id_a, b, a))
    }

    /// Teleports sent out of this end.
    pub const fn teleports(&self) -> u32 {
        self.teleports
    }

    /// Whether `entity` is still cooling down on this end.
    pub fn is_cooling(&self, entity: EntityId) -> bool {
        self.cooldowns.contains_key(&entity)
    }

    /// Time left before the pair closes.
    pub fn remaining_ms(&self) -> f64 {
        (DURATION_MS - self.age_ms).max(0.0)
    }
}

impl WorldResource for Portal {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn variant(&self) -> ResourceVariant {
        ResourceVariant::Portal
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn effect_radius(&self) -> f64 {
        RADIUS
    }

    fn state(&self) -> ResourceState {
        if self.expended {
            ResourceState::Expended
        } else {
            ResourceState::Active
        }
    }

    fn update(&mut self, env: &mut ResourceEnv<'_>) -> Option<Notice> {
        self.age_ms += env.dt_ms;
        if self.age_ms >= DURATION_MS {
            self.expended = true;
        }
        let dt = env.dt_ms;
        self.cooldowns.retain(|_, left| {
            *left -= dt;
            *left > 0.0
        });
        None
    }

    fn effects_for(&mut self, occupant: &Occupant, _dt_ms: f64, out: &mut Vec<Effect>) {
        if self.expended || !occupant.mature || self.is_cooling(occupant.id) {
            return;
        }
        let offset = self.position.minus(occupant.position);
        let distance = offset.length();

        if distance < CAPTURE_RADIUS {
            let heading = occupant.position.minus(self.position).normalized();
            let heading = if heading.length() > 0.0 {
                heading
            } else {
                Vec2::new(1.0, 0.0)
            };
            let exit = self.partner_position.plus(heading.scaled(EXIT_DISTANCE));
            self.cooldowns.insert(occupant.id, ENTITY_COOLDOWN_MS);
            self.teleports = self.teleports.saturating_add(1);
            out.push(Effect::Teleport(exit));
        } else if distance < PULL_RADIUS {
            let strength = PULL_STRENGTH * falloff(distance, PULL_RADIUS);
            out.push(Effect::Attract(offset.normalized().scaled(strength)));
        }
    }

    fn expire(&mut self) {
        self.expended = true;
    }

    fn partner(&self) -> Option<ResourceId> {
        Some(self.partner)
    }

    fn on_arrival(&mut self, entity: EntityId) {
        self.cooldowns.insert(entity, ENTITY_COOLDOWN_MS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupant_at(position: Vec2) -> Occupant {
        Occupant {
            energy_headroom: 100.0,
            ..Occupant::sample(position)
        }
    }

    #[test]
    fn pair_links_both_ends() {
        let (a, b) = Portal::pair(Vec2::new(100.0, 100.0), Vec2::new(600.0, 300.0));
        assert_eq!(a.partner(), Some(b.id()));
        assert_eq!(b.partner(), Some(a.id()));
    }

    #[test]
    fn teleports_out_of_partner_beyond_its_capture_radius() {
        let (mut a, b) = Portal::pair(Vec2::new(100.0, 100.0), Vec2::new(600.0, 300.0));
        let entity = occupant_at(Vec2::new(110.0, 100.0));
        let mut out = Vec::new();
        a.effects_for(&entity, 16.0, &mut out);

        let Some(Effect::Teleport(exit)) = out.first().copied() else {
            panic!("expected a teleport, got {out:?}");
        };
        assert!(exit.distance(b.position()) > CAPTURE_RADIUS);
        assert!(a.is_cooling(entity.id));

        out.clear();
        a.effects_for(&entity, 16.0, &mut out);
        assert!(out.is_empty(), "cooldown blocks an immediate second trip");
    }

    #[test]
    fn pulls_inside_pull_radius() {
        let (mut a, _) = Portal::pair(Vec2::new(100.0, 100.0), Vec2::new(600.0, 300.0));
        let mut out = Vec::new();
        a.effects_for(&occupant_at(Vec2::new(170.0, 100.0)), 16.0, &mut out);
        assert!(matches!(out.as_slice(), [Effect::Attract(f)] if f.x < 0.0));
    }
}

//! Pointer attraction and repulsion.

use std::any::Any;

use firefly_types::BehaviorKind;

use super::{BehaviorContext, BehaviorModule, PointerMode, is_active, toward};
use crate::error::AgentError;

const RADIUS: f64 = 150.0;
const ATTRACT_FORCE: f64 = 0.08;
const REPEL_FORCE: f64 = 0.12;
const PRESS_MULTIPLIER: f64 = 2.0;

/// Steers mature entities toward or away from the pointer.
#[derive(Debug, Default)]
pub struct PointerModule;

impl PointerModule {
    /// A pointer module.
    pub const fn new() -> Self {
        Self
    }
}

impl BehaviorModule for PointerModule {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::PointerInteraction
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        let Some(pointer) = ctx.pointer else {
            return Ok(());
        };
        let press = if pointer.pressed { PRESS_MULTIPLIER } else { 1.0 };

        for entity in ctx.population.entities_mut() {
            if !is_active(entity) {
                continue;
            }
            let distance = entity.position.distance(pointer.position);
            if distance >= RADIUS {
                continue;
            }
            let falloff = 1.0 - distance / RADIUS;
            let force = match pointer.mode {
                PointerMode::Attract => {
                    toward(entity.position, pointer.position, ATTRACT_FORCE * falloff * press)
                }
                PointerMode::Repel => {
                    toward(pointer.position, entity.position, REPEL_FORCE * falloff * press)
                }
            };
            entity.apply_force(force);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

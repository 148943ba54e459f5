//! Resources, tools and cosmic events running together against a live
//! population.

#![allow(clippy::unwrap_used)]

use std::cell::RefCell;
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use firefly_agents::{
    CollisionConfig, LifecycleConfig, PopulationConfig, PopulationManager, SpawnParams,
};
use firefly_events::{EventBus, EventKind, Signal};
use firefly_types::{
    CosmicEventKind, DeathCause, EntityId, LifeState, ResourceKind, SpawnOrigin, ToolKind, Vec2,
    Viewport,
};
use firefly_world::{
    CosmicConfig, CosmicContext, CosmicScheduler, ForceOutcome, PlayerTools, ResourceManager,
    ResourceTick, ResourcesConfig, ToolOutcome, can_overlap,
};

struct World {
    population: PopulationManager,
    resources: ResourceManager,
    tools: PlayerTools,
    cosmic: CosmicScheduler,
    rng: StdRng,
    bus: EventBus,
}

impl World {
    fn new(seed: u64, cosmic: CosmicConfig) -> Self {
        let viewport = Viewport::default();
        let mut world = Self {
            population: PopulationManager::new(
                PopulationConfig::default(),
                LifecycleConfig::default(),
                CollisionConfig::default(),
                viewport,
            ),
            resources: ResourceManager::new(&ResourcesConfig::default(), viewport),
            tools: PlayerTools::default(),
            cosmic: CosmicScheduler::new(cosmic),
            rng: StdRng::seed_from_u64(seed),
            bus: EventBus::new(),
        };
        let _ = world.population.seed(&mut world.rng, &mut world.bus);
        world
    }

    fn frame(&mut self, dt_ms: f64) {
        let mut cosmic_ctx = CosmicContext {
            dt_ms,
            population: &mut self.population,
            rng: &mut self.rng,
            bus: &mut self.bus,
        };
        let _ = self.cosmic.tick(&mut cosmic_ctx);
        let modifiers = self.cosmic.modifiers();

        self.tools.tick(dt_ms, &mut self.population);
        let shields = self.tools.shield_zones();
        let mut tick = ResourceTick {
            dt_ms,
            population: &mut self.population,
            rng: &mut self.rng,
            bus: &mut self.bus,
            modifiers,
            shields: &shields,
            regen_multiplier: self.cosmic.regen_multiplier(),
        };
        let _ = self.resources.tick(&mut tick);

        let _ = self
            .population
            .tick(dt_ms, &modifiers, &mut self.rng, &mut self.bus);
        let _ = self.population.enforce_bounds(&mut self.rng, &mut self.bus);
    }
}

fn busy_cosmos() -> CosmicConfig {
    CosmicConfig {
        enabled: true,
        event_check_interval_ms: 500.0,
        base_event_chance: 0.5,
        max_concurrent_events: 2,
    }
}

#[test]
fn long_run_respects_every_cap() {
    let mut world = World::new(11, busy_cosmos());
    let config = ResourcesConfig::default();
    for kind in ResourceKind::ALL {
        let _ = world
            .resources
            .spawn_resource(kind, None, &mut world.rng, &mut world.bus);
    }

    for _ in 0..6_000 {
        world.frame(16.0);

        assert!(world.population.len() <= PopulationConfig::default().max);
        for kind in ResourceKind::ALL {
            assert!(world.resources.count(kind) <= config.settings(kind).max_count);
        }
        let active = world.cosmic.active_kinds();
        assert!(active.len() <= 2);
        if let [a, b] = active.as_slice() {
            assert_ne!(a, b);
            assert!(can_overlap(*a, *b));
        }
    }
    assert!(world.cosmic.history().count() > 0);
}

#[test]
fn cosmic_starts_and_ends_are_published_in_pairs() {
    let starts = Rc::new(RefCell::new(0_u32));
    let ends = Rc::new(RefCell::new(0_u32));
    let mut world = World::new(12, busy_cosmos());
    {
        let starts = Rc::clone(&starts);
        let _ = world.bus.subscribe(Signal::EventStart, "test", move |_| {
            *starts.borrow_mut() += 1;
            Ok(())
        });
        let ends = Rc::clone(&ends);
        let _ = world.bus.subscribe(Signal::EventEnd, "test", move |_| {
            *ends.borrow_mut() += 1;
            Ok(())
        });
    }

    for _ in 0..20_000 {
        world.frame(16.0);
    }
    let _ = world.cosmic.end_all(&mut world.bus);

    assert!(*starts.borrow() > 0);
    assert_eq!(*starts.borrow(), *ends.borrow());
}

#[test]
fn forced_events_ignore_cooldown_but_not_cap() {
    let mut world = World::new(13, CosmicConfig::default());
    let mut ctx = CosmicContext {
        dt_ms: 16.0,
        population: &mut world.population,
        rng: &mut world.rng,
        bus: &mut world.bus,
    };
    assert_eq!(
        world.cosmic.force_event(CosmicEventKind::VoidStorm, &mut ctx),
        ForceOutcome::Started
    );
    let _ = world.cosmic.end_all(ctx.bus);
    assert!(world.cosmic.on_cooldown(CosmicEventKind::VoidStorm));

    // Cooldown and overlap rules do not apply to forced starts.
    assert_eq!(
        world.cosmic.force_event(CosmicEventKind::VoidStorm, &mut ctx),
        ForceOutcome::Started
    );
    assert_eq!(
        world.cosmic.force_event(CosmicEventKind::Eclipse, &mut ctx),
        ForceOutcome::Started
    );
    assert_eq!(
        world.cosmic.force_event(CosmicEventKind::Comet, &mut ctx),
        ForceOutcome::AtCapacity
    );
    assert_eq!(world.cosmic.active_count(), 2);
}

#[test]
fn shield_tool_protects_points_inside_its_zone() {
    let mut world = World::new(14, CosmicConfig::default());
    let center = Vec2::new(400.0, 300.0);
    let outcome = world
        .tools
        .use_tool(ToolKind::Shield, center, &mut world.population, &mut world.bus);
    assert!(matches!(outcome, ToolOutcome::Applied { .. }));

    let shields = world.tools.shield_zones();
    assert!(world.resources.is_protected(center, &shields));
    assert!(!world.resources.is_protected(Vec2::new(1200.0, 700.0), &shields));

    assert_eq!(
        world
            .tools
            .use_tool(ToolKind::Shield, center, &mut world.population, &mut world.bus),
        ToolOutcome::OnCooldown
    );
}

#[test]
fn meteor_shower_adds_entities_until_population_cap() {
    let mut world = World::new(15, CosmicConfig {
        enabled: false,
        ..CosmicConfig::default()
    });
    let births = Rc::new(RefCell::new(0_u32));
    {
        let births = Rc::clone(&births);
        let _ = world.bus.subscribe(Signal::Birth, "test", move |event| {
            if let EventKind::Birth { origin, .. } = event.kind
                && origin == SpawnOrigin::Cosmic
            {
                *births.borrow_mut() += 1;
            }
            Ok(())
        });
    }
    let mut ctx = CosmicContext {
        dt_ms: 16.0,
        population: &mut world.population,
        rng: &mut world.rng,
        bus: &mut world.bus,
    };
    for _ in 0..20 {
        let _ = world.cosmic.force_event(CosmicEventKind::MeteorShower, &mut ctx);
        for _ in 0..500 {
            let _ = world.cosmic.tick(&mut ctx);
        }
        let _ = world.cosmic.end_all(ctx.bus);
    }
    assert!(*births.borrow() > 0);
    assert!(world.population.len() <= PopulationConfig::default().max);
}

#[test]
fn black_hole_victims_die_through_the_population() {
    let mut world = World::new(16, CosmicConfig {
        enabled: false,
        ..CosmicConfig::default()
    });
    let kills = Rc::new(RefCell::new(Vec::<(EntityId, DeathCause)>::new()));
    let deaths = Rc::new(RefCell::new(Vec::<(EntityId, DeathCause)>::new()));
    {
        let kills = Rc::clone(&kills);
        let _ = world.bus.subscribe(Signal::HazardKill, "test", move |event| {
            if let EventKind::HazardKill { victim, cause, .. } = event.kind {
                kills.borrow_mut().push((victim, cause));
            }
            Ok(())
        });
        let deaths = Rc::clone(&deaths);
        let _ = world.bus.subscribe(Signal::Death, "test", move |event| {
            if let EventKind::Death { entity, cause } = &event.kind {
                deaths.borrow_mut().push((entity.id, *cause));
            }
            Ok(())
        });
    }

    let hole = world
        .resources
        .spawn_resource(ResourceKind::BlackHole, None, &mut world.rng, &mut world.bus)
        .unwrap();
    let center = world.resources.get(hole).unwrap().position();
    let params = SpawnParams::new(SpawnOrigin::Seed).at(center);
    let victim = world
        .population
        .spawn(params, &mut world.rng, &mut world.bus)
        .unwrap();
    let entity = world.population.get_mut(victim).unwrap();
    entity.velocity = Vec2::ZERO;
    entity.transition(LifeState::Mature).unwrap();

    world.frame(16.0);
    assert!(kills.borrow().contains(&(victim, DeathCause::Consumed)));
    assert!(world.resources.total_consumed() >= 1);

    for _ in 0..500 {
        world.frame(16.0);
    }
    assert!(world.population.get(victim).is_none());
    assert!(deaths.borrow().contains(&(victim, DeathCause::Consumed)));
}

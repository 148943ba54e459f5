//! Lifecycle invariants of the population arena under full behavior load.

#![allow(clippy::unwrap_used)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use firefly_agents::{
    BehaviorBus, BehaviorContext, CollisionConfig, EnvironmentModule, HuntingModule,
    LifecycleConfig, PatternModule, PersonalityModule, PointerModule, PopulationConfig,
    PopulationManager, RareVariantModule, ReproductionModule, SwarmingModule,
};
use firefly_events::{EventBus, EventKind, Signal};
use firefly_types::{DeathCause, EntityId, LifeState, Modifiers, Viewport};

fn full_bus() -> BehaviorBus {
    let mut bus = BehaviorBus::new();
    bus.register(Box::new(EnvironmentModule::new()));
    bus.register(Box::new(HuntingModule::new()));
    bus.register(Box::new(SwarmingModule::new()));
    bus.register(Box::new(PatternModule::new()));
    bus.register(Box::new(ReproductionModule::new()));
    bus.register(Box::new(PersonalityModule::new()));
    bus.register(Box::new(RareVariantModule::default()));
    bus.register(Box::new(PointerModule::new()));
    bus
}

fn frame(
    population: &mut PopulationManager,
    behaviors: &mut BehaviorBus,
    rng: &mut StdRng,
    events: &mut EventBus,
    dt_ms: f64,
) {
    population.tick(dt_ms, &Modifiers::NEUTRAL, rng, events);
    population.resolve_collisions(&[], &Modifiers::NEUTRAL, events);
    population.enforce_bounds(rng, events);
    let mut ctx = BehaviorContext {
        dt_ms,
        population,
        rng,
        bus: events,
        modifiers: Modifiers::NEUTRAL,
        pointer: None,
    };
    behaviors.run(&mut ctx);
}

#[test]
fn population_stays_within_bounds_for_a_thousand_frames() {
    let config = PopulationConfig {
        initial: 20,
        min: 10,
        max: 50,
    };
    let lifecycle = LifecycleConfig {
        min_base_age_ms: 4_000.0,
        max_base_age_ms: 8_000.0,
        ..LifecycleConfig::default()
    };
    let mut population =
        PopulationManager::new(config, lifecycle, CollisionConfig::default(), Viewport::default());
    let mut behaviors = full_bus();
    let mut rng = StdRng::seed_from_u64(2024);
    let mut events = EventBus::new();
    population.seed(&mut rng, &mut events);

    for _ in 0..1000 {
        frame(&mut population, &mut behaviors, &mut rng, &mut events, 16.0);
        assert!(population.len() >= 10, "below floor: {}", population.len());
        assert!(population.len() <= 50, "above ceiling: {}", population.len());
    }
    assert!(population.total_removed() > 0);
}

#[test]
fn life_states_only_move_forward_and_deaths_fire_once() {
    let mut population = PopulationManager::new(
        PopulationConfig {
            initial: 15,
            min: 5,
            max: 30,
        },
        LifecycleConfig {
            min_base_age_ms: 5_000.0,
            max_base_age_ms: 6_000.0,
            ..LifecycleConfig::default()
        },
        CollisionConfig::default(),
        Viewport::new(400.0, 300.0),
    );
    let mut behaviors = full_bus();
    let mut rng = StdRng::seed_from_u64(77);
    let mut events = EventBus::new();

    let deaths: Rc<RefCell<BTreeMap<EntityId, u32>>> = Rc::new(RefCell::new(BTreeMap::new()));
    let d = Rc::clone(&deaths);
    events.subscribe(Signal::Death, "test", move |event| {
        if let EventKind::Death { entity, .. } = &event.kind {
            if entity.state != LifeState::Dead {
                return Err(firefly_events::HandlerError::failed("death snapshot not dead"));
            }
            let mut map = d.borrow_mut();
            let slot = map.entry(entity.id).or_insert(0);
            *slot = slot.saturating_add(1);
        }
        Ok(())
    });

    population.seed(&mut rng, &mut events);
    let mut last_rank: BTreeMap<EntityId, u8> = BTreeMap::new();

    for step in 0..800 {
        // Pile extra kill requests on top of natural deaths.
        if step % 50 == 0 {
            let ids = population.ids();
            for id in ids.iter().take(3) {
                population.kill(*id, DeathCause::Predator);
                population.kill(*id, DeathCause::Sacrifice);
            }
        }
        frame(&mut population, &mut behaviors, &mut rng, &mut events, 16.0);

        for entity in population.iter() {
            assert_ne!(entity.state(), LifeState::Dead);
            let rank = entity.state().rank();
            let previous = last_rank.insert(entity.id, rank).unwrap_or(0);
            assert!(rank >= previous, "state moved backward for {}", entity.id);
        }
    }

    assert_eq!(events.failures(), 0);
    let deaths = deaths.borrow();
    assert!(!deaths.is_empty());
    assert!(deaths.values().all(|&n| n == 1));
    for id in deaths.keys() {
        assert!(!population.contains(*id));
    }
}

#[test]
fn population_counts_add_up() {
    let mut population = PopulationManager::new(
        PopulationConfig {
            initial: 24,
            min: 10,
            max: 40,
        },
        LifecycleConfig::default(),
        CollisionConfig::default(),
        Viewport::default(),
    );
    let mut rng = StdRng::seed_from_u64(5);
    let mut events = EventBus::new();
    population.seed(&mut rng, &mut events);

    assert_eq!(population.count_by_digit().values().sum::<usize>(), 24);
    assert_eq!(population.count_by_tier().values().sum::<usize>(), 24);
    assert!(population.count_by_rare().values().sum::<usize>() <= 24);
}

#[test]
fn entities_survive_a_json_round_trip() {
    let mut population = PopulationManager::new(
        PopulationConfig::default(),
        LifecycleConfig::default(),
        CollisionConfig::default(),
        Viewport::default(),
    );
    let mut behaviors = full_bus();
    let mut rng = StdRng::seed_from_u64(31);
    let mut events = EventBus::new();
    population.seed(&mut rng, &mut events);
    for _ in 0..300 {
        frame(&mut population, &mut behaviors, &mut rng, &mut events, 16.0);
    }

    for entity in population.iter() {
        let json = serde_json::to_string(entity).unwrap();
        let restored: firefly_types::Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, entity);
        assert_eq!(restored.state(), entity.state());
        assert_eq!(restored.genetics, entity.genetics);
    }
}

//! The engine driven end to end: bounds over long runs, forced events,
//! plugin resolution, teardown, and observers that misbehave.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use firefly_core::{
    Engine, EngineBuilder, EngineState, HeadlessSurface, MountSurface, ObserverKind,
    OperatorCommand, OperatorResponse, PluginKind, PluginRegistry, PluginStatus,
    SimulationConfig,
};
use firefly_events::{EventKind, HandlerError, Signal};
use firefly_observer::{MemoryStore, RecordingBackend};
use firefly_types::{
    BehaviorKind, CosmicEventKind, EntityId, RareVariant, ResourceKind, SpawnOrigin, Tier, Vec2,
};

fn config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.population.initial = 20;
    config.population.min = 10;
    config.population.max = 50;
    config
}

fn run_frames(engine: &mut Engine, frames: u64, mut on_frame: impl FnMut(&Engine)) {
    let mut now_ms = 0.0;
    for _ in 0..frames {
        now_ms += 16.0;
        let summary = engine.frame(now_ms);
        assert!(summary.is_some());
        on_frame(engine);
    }
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

#[test]
fn population_stays_within_bounds_for_a_thousand_frames() {
    let mut config = config();
    config.lifecycle.min_base_age_ms = 25_000.0;
    config.lifecycle.max_base_age_ms = 40_000.0;
    config.behaviors.reproduction_chance = 0.05;
    let mut engine = Engine::new(config).unwrap();
    for _ in 0..15 {
        let response = engine.execute(OperatorCommand::SpawnEntity {
            position: None,
            tier: Some(Tier::Charged),
        });
        assert!(matches!(response, OperatorResponse::EntitySpawned { .. }));
    }

    let bred = Rc::new(RefCell::new(0_u32));
    let died = Rc::new(RefCell::new(0_u32));
    let (bred_sink, died_sink) = (Rc::clone(&bred), Rc::clone(&died));
    let bus = engine.bus_mut();
    let _ = bus.subscribe(Signal::Birth, "bred-counter", move |event| {
        if let EventKind::Birth { origin: SpawnOrigin::Reproduction, .. } = &event.kind {
            let mut bred = bred_sink.borrow_mut();
            *bred = bred.saturating_add(1);
        }
        Ok(())
    });
    let _ = bus.subscribe(Signal::Death, "death-counter", move |_| {
        let mut died = died_sink.borrow_mut();
        *died = died.saturating_add(1);
        Ok(())
    });

    engine.start().unwrap();
    let mut now_ms = 0.0;
    for _ in 0..1000 {
        now_ms += 100.0;
        assert!(engine.frame(now_ms).is_some());
        let population = engine.population().len();
        assert!((10..=50).contains(&population), "population {population} out of bounds");
    }

    assert!(*bred.borrow() > 0, "no offspring in 100 s of simulated time");
    assert!(*died.borrow() > 0, "no deaths in 100 s of simulated time");
    assert_eq!(engine.frame_count(), 1000);
}

#[test]
fn non_finite_config_values_are_clamped_before_building() {
    let mut config =
        SimulationConfig::parse("engine:\n  width: .inf\nlifecycle:\n  max_base_age_ms: .inf\n").unwrap();
    config.population = self::config().population;
    let mut engine = Engine::new(config).unwrap();

    assert!(engine.config().engine.width.is_finite());
    assert!(engine.config().lifecycle.max_base_age_ms.is_finite());
    assert!(engine.adjustments().len() >= 2);
    engine.start().unwrap();
    run_frames(&mut engine, 10, |_| {});
    assert!(engine.population().len() >= 20);
}

#[test]
fn death_is_announced_once_per_entity() {
    let mut config = config();
    config.lifecycle.min_base_age_ms = 200.0;
    config.lifecycle.max_base_age_ms = 400.0;
    let mut engine = Engine::new(config).unwrap();

    let deaths: Rc<RefCell<Vec<EntityId>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&deaths);
    let _ = engine
        .bus_mut()
        .subscribe(Signal::Death, "death-counter", move |event| {
            if let EventKind::Death { entity, .. } = &event.kind {
                sink.borrow_mut().push(entity.id);
            }
            Ok(())
        });

    engine.start().unwrap();
    run_frames(&mut engine, 600, |_| {});

    let deaths = deaths.borrow();
    let unique: BTreeSet<EntityId> = deaths.iter().copied().collect();
    assert!(!deaths.is_empty());
    assert_eq!(unique.len(), deaths.len());
}

// ---------------------------------------------------------------------------
// Operator commands
// ---------------------------------------------------------------------------

#[test]
fn forcing_an_active_event_is_a_no_op() {
    let mut config = config();
    config.cosmic_events.base_event_chance = 0.0;
    config.cosmic_events.max_concurrent_events = 1;
    let mut engine = Engine::new(config).unwrap();

    let started = engine.execute(OperatorCommand::ForceEvent {
        kind: CosmicEventKind::Eclipse,
    });
    assert_eq!(
        started,
        OperatorResponse::EventStarted {
            kind: CosmicEventKind::Eclipse
        }
    );

    let again = engine.execute(OperatorCommand::ForceEvent {
        kind: CosmicEventKind::Eclipse,
    });
    assert!(again.is_rejected());

    let other = engine.execute(OperatorCommand::ForceEvent {
        kind: CosmicEventKind::SolarFlare,
    });
    assert!(other.is_rejected());

    let cosmic = engine.cosmic().unwrap();
    assert_eq!(cosmic.active_count(), 1);
    assert!(cosmic.is_active(CosmicEventKind::Eclipse));
}

#[test]
fn resource_spawns_stop_at_the_cap() {
    let mut config = config();
    config.resources.kinds.portals.max_count = 2;
    let mut engine = Engine::new(config).unwrap();

    let spawn = OperatorCommand::SpawnResource {
        kind: ResourceKind::Portal,
        variant: None,
    };
    assert!(matches!(
        engine.execute(spawn.clone()),
        OperatorResponse::ResourceSpawned { .. }
    ));
    assert!(matches!(
        engine.execute(spawn.clone()),
        OperatorResponse::ResourceSpawned { .. }
    ));
    assert!(engine.execute(spawn).is_rejected());
}

#[test]
fn despawn_retires_a_spawned_resource() {
    let mut engine = Engine::new(config()).unwrap();
    let OperatorResponse::ResourceSpawned { id } = engine.execute(OperatorCommand::SpawnResource {
        kind: ResourceKind::Sanctuary,
        variant: None,
    }) else {
        panic!("sanctuary was not spawned");
    };
    let before = engine.resources().len();
    assert_eq!(
        engine.execute(OperatorCommand::DespawnResource { id }),
        OperatorResponse::Ok
    );
    assert_eq!(engine.resources().len(), before - 1);
    assert!(engine.execute(OperatorCommand::DespawnResource { id }).is_rejected());
}

#[test]
fn force_rare_needs_the_rare_module() {
    let mut engine = Engine::new(config()).unwrap();
    let response = engine.execute(OperatorCommand::ForceRare {
        variant: RareVariant::Golden,
    });
    assert!(matches!(response, OperatorResponse::EntitySpawned { .. }));

    let mut config = config();
    config.behaviors.rare_variants = false;
    let mut engine = Engine::new(config).unwrap();
    let response = engine.execute(OperatorCommand::ForceRare {
        variant: RareVariant::Golden,
    });
    assert!(response.is_rejected());
}

#[test]
fn pause_and_resume_through_commands() {
    let mut engine = Engine::new(config()).unwrap();
    engine.start().unwrap();
    run_frames(&mut engine, 5, |_| {});
    let population = engine.population().len();

    assert_eq!(engine.execute(OperatorCommand::Pause), OperatorResponse::Ok);
    assert_eq!(engine.execute(OperatorCommand::Pause), OperatorResponse::Ok);
    assert_eq!(engine.state(), EngineState::Paused);
    assert!(!engine.is_frame_pending());
    assert!(engine.frame(1_000.0).is_none());
    assert_eq!(engine.population().len(), population);
    assert_eq!(engine.frame_count(), 5);

    assert_eq!(engine.execute(OperatorCommand::Resume), OperatorResponse::Ok);
    assert_eq!(engine.execute(OperatorCommand::Resume), OperatorResponse::Ok);
    assert_eq!(engine.state(), EngineState::Running);
    assert!(engine.is_frame_pending());
    assert!(engine.frame(2_000.0).is_some());
}

#[test]
fn operator_commands_are_visible_in_the_event_log() {
    let mut engine = Engine::new(config()).unwrap();
    let _ = engine.execute(OperatorCommand::SpawnEntity {
        position: Some(Vec2::new(100.0, 100.0)),
        tier: None,
    });
    let _ = engine.execute(OperatorCommand::SpawnResource {
        kind: ResourceKind::EnergyWell,
        variant: None,
    });

    let OperatorResponse::EventLog { text } = engine.execute(OperatorCommand::ExportEventLog)
    else {
        panic!("event log not exported");
    };
    assert!(text.contains("Operator spawned energy_wells"));
}

#[test]
fn statistics_report_counts_births() {
    let mut engine = Engine::new(config()).unwrap();
    engine.start().unwrap();
    run_frames(&mut engine, 60, |_| {});

    let OperatorResponse::Statistics { report } = engine.execute(OperatorCommand::ReadStatistics)
    else {
        panic!("statistics not returned");
    };
    assert!(report.total_births >= 20);
}

#[test]
fn achievements_read_and_reset() {
    let mut engine = EngineBuilder::new(config())
        .achievement_store(Box::new(MemoryStore::new()))
        .build()
        .unwrap();
    let OperatorResponse::Achievements { progress } =
        engine.execute(OperatorCommand::ReadAchievements)
    else {
        panic!("progress not returned");
    };
    assert!(progress.total > 0);
    assert_eq!(
        engine.execute(OperatorCommand::ResetAchievements),
        OperatorResponse::Ok
    );
}

#[test]
fn audio_plays_only_after_initialization() {
    let mut config = config();
    config.audio.enabled = true;
    let backend = RecordingBackend::new();
    let played = backend.played();
    let mut engine = EngineBuilder::new(config)
        .audio_backend(Box::new(backend))
        .build()
        .unwrap();

    let _ = engine.execute(OperatorCommand::SpawnEntity {
        position: None,
        tier: None,
    });
    assert!(played.borrow().is_empty());

    assert_eq!(
        engine.execute(OperatorCommand::InitializeAudio),
        OperatorResponse::Ok
    );
    let _ = engine.execute(OperatorCommand::SpawnEntity {
        position: None,
        tier: None,
    });
    assert!(!played.borrow().is_empty());
}

// ---------------------------------------------------------------------------
// Plugins
// ---------------------------------------------------------------------------

#[test]
fn unknown_and_unavailable_plugins_are_skipped() {
    let config = SimulationConfig::parse(
        "behaviors:\n  telepathy: true\nresources:\n  wormholes:\n    enabled: true\n",
    )
    .unwrap();
    let registry = PluginRegistry::standard()
        .without(PluginKind::Behavior(BehaviorKind::Swarming))
        .without(PluginKind::Observer(ObserverKind::EventLog));
    let mut engine = EngineBuilder::new(config).registry(registry).build().unwrap();

    let plugins = engine.plugins();
    assert_eq!(
        plugins.status(PluginKind::Behavior(BehaviorKind::Swarming)),
        PluginStatus::Unavailable
    );
    assert_eq!(plugins.with_status(PluginStatus::Unknown).count(), 2);
    assert_eq!(engine.behaviors().len(), 7);
    assert!(!engine.behaviors().kinds().contains(&BehaviorKind::Swarming));
    assert!(engine.event_log().is_none());
    assert!(engine.execute(OperatorCommand::ExportEventLog).is_rejected());

    engine.start().unwrap();
    run_frames(&mut engine, 30, |_| {});
}

#[test]
fn disabled_cosmic_scheduler_rejects_forced_events() {
    let mut config = config();
    config.cosmic_events.enabled = false;
    let mut engine = Engine::new(config).unwrap();
    assert!(engine.cosmic().is_none());
    let response = engine.execute(OperatorCommand::ForceEvent {
        kind: CosmicEventKind::Comet,
    });
    assert!(response.is_rejected());
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

#[test]
fn destroy_right_after_construction_leaves_nothing_behind() {
    let surface = HeadlessSurface::new();
    let mut engine = Engine::new(config()).unwrap();
    engine.mount(Box::new(surface.clone())).unwrap();
    assert!(surface.element_count() > 0);

    engine.destroy();
    assert_eq!(surface.element_count(), 0);
    assert_eq!(engine.bus().total_subscribers(), 0);
    assert!(!engine.is_frame_pending());
    assert!(engine.statistics().is_none());
    assert_eq!(engine.state(), EngineState::Destroyed);
}

#[test]
fn dropping_a_running_engine_detaches_the_surface() {
    let surface = HeadlessSurface::new();
    {
        let mut engine = Engine::new(config()).unwrap();
        engine.mount(Box::new(surface.clone())).unwrap();
        engine.start().unwrap();
        run_frames(&mut engine, 10, |_| {});
    }
    assert_eq!(surface.element_count(), 0);
}

// ---------------------------------------------------------------------------
// Observer isolation
// ---------------------------------------------------------------------------

#[test]
fn failing_observers_do_not_stop_the_frame() {
    let mut engine = Engine::new(config()).unwrap();
    let calls = Rc::new(RefCell::new(0_u32));

    let first = Rc::clone(&calls);
    let _ = engine.bus_mut().subscribe(Signal::Birth, "first", move |_| {
        *first.borrow_mut() += 1;
        Ok(())
    });
    let _ = engine.bus_mut().subscribe(Signal::Birth, "broken", |_| {
        Err(HandlerError::failed("always fails"))
    });
    let _ = engine
        .bus_mut()
        .subscribe(Signal::Birth, "panicking", |_| panic!("observer panic"));
    let third = Rc::clone(&calls);
    let _ = engine.bus_mut().subscribe(Signal::Birth, "third", move |_| {
        *third.borrow_mut() += 1;
        Ok(())
    });

    let response = engine.execute(OperatorCommand::SpawnEntity {
        position: None,
        tier: None,
    });
    assert!(matches!(response, OperatorResponse::EntitySpawned { .. }));
    assert_eq!(*calls.borrow(), 2);
    assert!(engine.bus().failures() >= 2);

    engine.start().unwrap();
    run_frames(&mut engine, 100, |_| {});
    assert!(engine.statistics().unwrap().borrow().total_births() >= 21);
}

//! The simulation engine.
//!
//! [`Engine`] owns every subsystem and drives the frame:
//!
//! 1. Population: age, decay, move, collide, evolve, refill to the floor
//! 2. Behavior modules, in their fixed order
//! 3. Player tools, then resources and hazards
//! 4. Cosmic events
//! 5. Meta: snapshot for statistics and achievements, publish unlocks
//! 6. Request the next frame
//!
//! Observers only ever see the engine through the event bus. The engine
//! keeps shared handles to them so operator commands can read them, but
//! nothing in stages 1-4 depends on whether they exist.

use std::collections::BTreeMap;
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use firefly_agents::{
    BehaviorBus, BehaviorContext, BehaviorModule, BehaviorReport, EnvironmentModule,
    HuntingModule, PatternModule, PersonalityModule, Pointer, PointerModule, PopulationManager,
    RareVariantModule, ReproductionModule, SpawnParams, SwarmingModule, TickReport,
};
use firefly_events::{EventBus, EventKind};
use firefly_observer::{
    AchievementStore, Achievements, AudioBackend, AudioCues, EcosystemSnapshot, EventLog, Shared,
    SilentBackend, Statistics, attach, shared,
};
use firefly_types::{
    BehaviorKind, CosmicEventKind, Modifiers, RareVariant, ResourceKind, SpawnOrigin, Tier,
    ToolKind, Vec2,
};
use firefly_world::{
    CosmicContext, CosmicReport, CosmicScheduler, ForceOutcome, PlayerTools, ResourceManager,
    ResourceReport, ResourceTick, ToolOutcome,
};

use crate::config::{BehaviorsConfig, ConfigAdjustment, SimulationConfig};
use crate::error::EngineError;
use crate::operator::{OperatorCommand, OperatorResponse};
use crate::plugin::{ObserverKind, PluginKind, PluginRegistry, PluginTable};
use crate::scheduler::FrameScheduler;
use crate::surface::{ElementHandle, Layer, MountSurface};

/// Lifecycle state of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Built, not attached to a surface.
    Created,
    /// Attached to a surface, not yet started.
    Mounted,
    /// Scheduling frames.
    Running,
    /// Frame scheduling halted; state retained.
    Paused,
    /// Torn down. Terminal.
    Destroyed,
}

/// What one frame did.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Delta used for this frame.
    pub dt_ms: f64,
    /// Simulated time after this frame.
    pub sim_time_ms: f64,
    /// Live entities at the end of the frame.
    pub population: usize,
    /// Lifecycle transitions.
    pub lifecycle: TickReport,
    /// Collisions resolved.
    pub collisions: usize,
    /// Entities spawned to restore the floor.
    pub refilled: usize,
    /// Behavior modules run, failed and skipped.
    pub behaviors: BehaviorReport,
    /// Resource spawns, retirements and captures.
    pub resources: ResourceReport,
    /// Active resources at the end of the frame.
    pub resource_count: usize,
    /// Cosmic events started and ended.
    pub cosmic: CosmicReport,
    /// Cosmic events active at the end of the frame.
    pub active_events: Vec<CosmicEventKind>,
    /// Whether a statistics snapshot was taken.
    pub snapshot_taken: bool,
    /// Achievement ids unlocked and published this frame.
    pub unlocked: Vec<String>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles an [`Engine`] with optional collaborator overrides.
#[derive(Debug)]
pub struct EngineBuilder {
    config: SimulationConfig,
    registry: PluginRegistry,
    audio_backend: Option<Box<dyn AudioBackend>>,
    achievement_store: Option<Box<dyn AchievementStore>>,
}

impl EngineBuilder {
    /// Builder over `config` with the standard plugin registry.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            registry: PluginRegistry::standard(),
            audio_backend: None,
            achievement_store: None,
        }
    }

    /// Use a different plugin registry.
    #[must_use]
    pub fn registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Send audio cues to `backend` instead of discarding them.
    #[must_use]
    pub fn audio_backend(mut self, backend: Box<dyn AudioBackend>) -> Self {
        self.audio_backend = Some(backend);
        self
    }

    /// Keep achievement progress in `store` instead of the configured one.
    #[must_use]
    pub fn achievement_store(mut self, store: Box<dyn AchievementStore>) -> Self {
        self.achievement_store = Some(store);
        self
    }

    /// Validate the configuration, resolve plugins, construct every enabled
    /// subsystem, attach observers and seed the initial population.
    pub fn build(self) -> Result<Engine, EngineError> {
        let Self {
            mut config,
            registry,
            audio_backend,
            achievement_store,
        } = self;

        let adjustments = config.validate();
        config.population.check()?;
        let plugins = PluginTable::resolve(&config, &registry);
        let viewport = config.viewport();

        let mut rng = StdRng::seed_from_u64(config.engine.seed);
        let mut bus = EventBus::new();

        let mut population = PopulationManager::new(
            config.population.clone(),
            config.lifecycle.clone(),
            config.collision.clone(),
            viewport,
        );

        let mut behaviors = BehaviorBus::new();
        for kind in BehaviorKind::ALL {
            if plugins.is_enabled(PluginKind::Behavior(kind)) {
                behaviors.register(behavior_module(kind, &config.behaviors));
            }
        }

        let mut resources = ResourceManager::new(&config.resources.kinds, viewport);
        for kind in ResourceKind::ALL {
            if !plugins.is_enabled(PluginKind::Resource(kind)) {
                resources.set_enabled(kind, false);
            }
        }

        let cosmic = plugins
            .is_enabled(PluginKind::Cosmic)
            .then(|| CosmicScheduler::new(config.cosmic_events.clone()));
        let tools = PlayerTools::new(config.tools.starting_charges);

        let observers = Observers::build(&config, &plugins, audio_backend, achievement_store, &mut bus);
        let visible = observers.initial_visibility(&config);

        let seeded = population.seed(&mut rng, &mut bus);

        info!(
            seed = config.engine.seed,
            seeded,
            behaviors = behaviors.len(),
            observers = observers.count(),
            cosmic = cosmic.is_some(),
            adjustments = adjustments.len(),
            "Engine constructed"
        );

        Ok(Engine {
            scheduler: FrameScheduler::new(config.engine.default_frame_dt_ms, config.engine.max_frame_dt_ms),
            config,
            adjustments,
            plugins,
            state: EngineState::Created,
            rng,
            bus,
            population,
            behaviors,
            resources,
            cosmic,
            tools,
            observers,
            surface: None,
            root: None,
            overlays: BTreeMap::new(),
            visible,
            pointer: None,
            frame: 0,
            sim_time_ms: 0.0,
            since_snapshot_ms: 0.0,
            last_summary: None,
        })
    }
}

fn behavior_module(kind: BehaviorKind, config: &BehaviorsConfig) -> Box<dyn BehaviorModule> {
    match kind {
        BehaviorKind::Hunting => Box::new(HuntingModule::new()),
        BehaviorKind::Swarming => Box::new(SwarmingModule::new()),
        BehaviorKind::PatternFormation => Box::new(PatternModule::new()),
        BehaviorKind::Reproduction => Box::new(ReproductionModule::with_chance(config.reproduction_chance)),
        BehaviorKind::Personality => Box::new(PersonalityModule::new()),
        BehaviorKind::RareVariants => Box::new(RareVariantModule::new(config.rare_spawn_chance)),
        BehaviorKind::PointerInteraction => Box::new(PointerModule::new()),
        BehaviorKind::Environment => Box::new(EnvironmentModule::new()),
    }
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Observers {
    statistics: Option<Shared<Statistics>>,
    event_log: Option<Shared<EventLog>>,
    achievements: Option<Shared<Achievements>>,
    audio: Option<Shared<AudioCues>>,
}

impl Observers {
    fn build(
        config: &SimulationConfig,
        plugins: &PluginTable,
        audio_backend: Option<Box<dyn AudioBackend>>,
        achievement_store: Option<Box<dyn AchievementStore>>,
        bus: &mut EventBus,
    ) -> Self {
        let enabled = |kind| plugins.is_enabled(PluginKind::Observer(kind));
        let mut observers = Self::default();

        if enabled(ObserverKind::Statistics) {
            let statistics = shared(Statistics::new(config.observers.statistics.clone()));
            let _ = attach(&statistics, bus);
            observers.statistics = Some(statistics);
        }
        if enabled(ObserverKind::EventLog) {
            let event_log = shared(EventLog::new(config.observers.event_log.clone()));
            let _ = attach(&event_log, bus);
            observers.event_log = Some(event_log);
        }
        if enabled(ObserverKind::Achievements) {
            let settings = config.observers.achievements.clone();
            let achievements = shared(match achievement_store {
                Some(store) => Achievements::new(settings, store),
                None => Achievements::from_config(settings),
            });
            let _ = attach(&achievements, bus);
            observers.achievements = Some(achievements);
        }
        if enabled(ObserverKind::Audio) {
            let backend = audio_backend.unwrap_or_else(|| Box::new(SilentBackend));
            let audio = shared(AudioCues::new(config.audio.clone(), backend, config.engine.seed));
            let _ = attach(&audio, bus);
            observers.audio = Some(audio);
        }
        observers
    }

    const fn has(&self, kind: ObserverKind) -> bool {
        match kind {
            ObserverKind::Statistics => self.statistics.is_some(),
            ObserverKind::EventLog => self.event_log.is_some(),
            ObserverKind::Achievements => self.achievements.is_some(),
            ObserverKind::Audio => self.audio.is_some(),
        }
    }

    fn count(&self) -> usize {
        ObserverKind::ALL.into_iter().filter(|&kind| self.has(kind)).count()
    }

    /// Overlay visibility for every constructed observer that has one.
    fn initial_visibility(&self, config: &SimulationConfig) -> BTreeMap<ObserverKind, bool> {
        let observers = &config.observers;
        [
            (ObserverKind::Statistics, observers.statistics.visible),
            (ObserverKind::EventLog, observers.event_log.visible),
            (ObserverKind::Achievements, observers.achievements.visible),
        ]
        .into_iter()
        .filter(|&(kind, _)| self.has(kind))
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns every subsystem and runs the frame.
pub struct Engine {
    config: SimulationConfig,
    adjustments: Vec<ConfigAdjustment>,
    plugins: PluginTable,
    state: EngineState,
    rng: StdRng,
    bus: EventBus,
    population: PopulationManager,
    behaviors: BehaviorBus,
    resources: ResourceManager,
    cosmic: Option<CosmicScheduler>,
    tools: PlayerTools,
    observers: Observers,
    surface: Option<Box<dyn MountSurface>>,
    root: Option<ElementHandle>,
    overlays: BTreeMap<ObserverKind, ElementHandle>,
    visible: BTreeMap<ObserverKind, bool>,
    scheduler: FrameScheduler,
    pointer: Option<Pointer>,
    frame: u64,
    sim_time_ms: f64,
    since_snapshot_ms: f64,
    last_summary: Option<FrameSummary>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("frame", &self.frame)
            .field("sim_time_ms", &self.sim_time_ms)
            .field("population", &self.population.len())
            .field("resources", &self.resources.len())
            .field("behaviors", &self.behaviors)
            .field("observers", &self.observers.count())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine from `config` with the standard plugins.
    pub fn new(config: SimulationConfig) -> Result<Self, EngineError> {
        EngineBuilder::new(config).build()
    }

    /// Start a builder.
    pub fn builder(config: SimulationConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Attach to `surface`: one root layer plus an overlay per visible
    /// observer. Only valid right after construction.
    pub fn mount(&mut self, mut surface: Box<dyn MountSurface>) -> Result<(), EngineError> {
        if self.state != EngineState::Created {
            return Err(EngineError::InvalidState {
                operation: "mount",
                state: self.state,
            });
        }
        self.root = Some(surface.attach(Layer::Root));
        for (&kind, _) in self.visible.iter().filter(|&(_, &visible)| visible) {
            let handle = surface.attach(Layer::Overlay(kind.name().to_owned()));
            self.overlays.insert(kind, handle);
        }
        info!(elements = surface.element_count(), "Engine mounted");
        self.surface = Some(surface);
        self.state = EngineState::Mounted;
        Ok(())
    }

    /// Begin scheduling frames. Starting a running engine does nothing;
    /// starting a paused one resumes it.
    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Created | EngineState::Mounted => {
                self.state = EngineState::Running;
                let _ = self.scheduler.request();
                info!(population = self.population.len(), "Engine started");
                Ok(())
            }
            EngineState::Running => Ok(()),
            EngineState::Paused => {
                let _ = self.resume();
                Ok(())
            }
            EngineState::Destroyed => Err(EngineError::InvalidState {
                operation: "start",
                state: self.state,
            }),
        }
    }

    /// Halt frame scheduling. Returns whether the state changed; pausing
    /// anything but a running engine does nothing.
    pub fn pause(&mut self) -> bool {
        if self.state != EngineState::Running {
            return false;
        }
        let _ = self.scheduler.cancel();
        self.scheduler.forget_timestamp();
        self.state = EngineState::Paused;
        info!(frame = self.frame, "Engine paused");
        true
    }

    /// Restart frame scheduling. Returns whether the state changed.
    pub fn resume(&mut self) -> bool {
        if self.state != EngineState::Paused {
            return false;
        }
        self.state = EngineState::Running;
        let _ = self.scheduler.request();
        info!(frame = self.frame, "Engine resumed");
        true
    }

    /// Tear everything down. Valid in every state; later calls do nothing.
    pub fn destroy(&mut self) {
        if self.state == EngineState::Destroyed {
            return;
        }
        let _ = self.scheduler.cancel();
        self.scheduler.forget_timestamp();

        let subscriptions = self.bus.total_subscribers();
        self.bus.clear();

        if let Some(mut surface) = self.surface.take() {
            if let Some(root) = self.root.take() {
                let _ = surface.detach(root);
            }
            for (_, handle) in std::mem::take(&mut self.overlays) {
                let _ = surface.detach(handle);
            }
            debug!(remaining = surface.element_count(), "Surface detached");
        }
        self.root = None;
        self.overlays.clear();
        self.visible.clear();

        self.behaviors.clear();
        self.resources.clear();
        if let Some(cosmic) = self.cosmic.as_mut() {
            cosmic.clear();
        }
        self.cosmic = None;
        self.tools.clear_zones();
        self.population.clear();
        self.pointer = None;
        self.observers = Observers::default();

        self.state = EngineState::Destroyed;
        info!(frame = self.frame, subscriptions, "Engine destroyed");
    }

    // -----------------------------------------------------------------------
    // Frame
    // -----------------------------------------------------------------------

    /// Run the pending frame at timestamp `now_ms`. Returns `None` when the
    /// engine is not running or no frame is scheduled.
    pub fn frame(&mut self, now_ms: f64) -> Option<FrameSummary> {
        if self.state != EngineState::Running {
            return None;
        }
        self.scheduler.take()?;

        let dt_ms = match self.scheduler.frame_delta(now_ms) {
            Ok(dt) => dt,
            Err(err) => {
                warn!(error = %err, "Bad frame timestamp, using default delta");
                self.scheduler.default_dt_ms()
            }
        };
        self.frame = self.frame.saturating_add(1);
        self.sim_time_ms += dt_ms;
        self.bus.set_clock(self.frame, self.sim_time_ms);

        let modifiers = self
            .cosmic
            .as_ref()
            .map_or(Modifiers::NEUTRAL, CosmicScheduler::modifiers);

        // 1. Population
        let lifecycle = self.population.tick(dt_ms, &modifiers, &mut self.rng, &mut self.bus);
        let zones = self.tools.progress_zones();
        let collisions = self.population.resolve_collisions(&zones, &modifiers, &mut self.bus);
        let refilled = self.population.enforce_bounds(&mut self.rng, &mut self.bus);

        // 2. Behaviors
        let behaviors = self.behaviors.run(&mut BehaviorContext {
            dt_ms,
            population: &mut self.population,
            rng: &mut self.rng,
            bus: &mut self.bus,
            modifiers,
            pointer: self.pointer,
        });

        // 3. Tools and resources
        self.tools.tick(dt_ms, &mut self.population);
        let shields = self.tools.shield_zones();
        let regen_multiplier = self
            .cosmic
            .as_ref()
            .map_or(1.0, CosmicScheduler::regen_multiplier);
        let resources = self.resources.tick(&mut ResourceTick {
            dt_ms,
            population: &mut self.population,
            rng: &mut self.rng,
            bus: &mut self.bus,
            modifiers,
            shields: &shields,
            regen_multiplier,
        });

        // 4. Cosmic events
        let cosmic = match self.cosmic.as_mut() {
            Some(scheduler) => scheduler.tick(&mut CosmicContext {
                dt_ms,
                population: &mut self.population,
                rng: &mut self.rng,
                bus: &mut self.bus,
            }),
            None => CosmicReport::default(),
        };

        // 5. Meta
        let snapshot_taken = self.take_snapshot(dt_ms);
        let unlocked = self.publish_unlocks();

        // 6. Next frame
        let _ = self.scheduler.request();

        let summary = FrameSummary {
            frame: self.frame,
            dt_ms,
            sim_time_ms: self.sim_time_ms,
            population: self.population.len(),
            lifecycle,
            collisions,
            refilled,
            behaviors,
            resources,
            resource_count: self.resources.len(),
            cosmic,
            active_events: self.active_events(),
            snapshot_taken,
            unlocked,
        };
        debug!(
            frame = summary.frame,
            dt_ms,
            population = summary.population,
            resources = summary.resource_count,
            "Frame complete"
        );
        self.last_summary = Some(summary.clone());
        Some(summary)
    }

    /// Feed statistics and achievements a snapshot when one is due.
    fn take_snapshot(&mut self, dt_ms: f64) -> bool {
        let due = match &self.observers.statistics {
            Some(statistics) => statistics
                .try_borrow_mut()
                .is_ok_and(|mut statistics| statistics.tick(dt_ms)),
            None => {
                self.since_snapshot_ms += dt_ms;
                let due = self.since_snapshot_ms >= self.config.observers.statistics.update_interval_ms;
                if due {
                    self.since_snapshot_ms = 0.0;
                }
                due
            }
        };
        if !due || (self.observers.statistics.is_none() && self.observers.achievements.is_none()) {
            return false;
        }

        let mut snapshot = EcosystemSnapshot::from_entities(self.sim_time_ms, &self.population.snapshots());
        snapshot.resources = self.resources.counts();
        snapshot.active_events = self.active_events();
        snapshot.modifiers = self
            .cosmic
            .as_ref()
            .map_or(Modifiers::NEUTRAL, CosmicScheduler::modifiers);

        if let Some(achievements) = &self.observers.achievements
            && let Ok(mut achievements) = achievements.try_borrow_mut()
        {
            achievements.observe_snapshot(&snapshot);
        }
        if let Some(statistics) = &self.observers.statistics
            && let Ok(mut statistics) = statistics.try_borrow_mut()
        {
            statistics.ingest(snapshot);
        }
        true
    }

    /// Publish every pending unlock on the bus.
    fn publish_unlocks(&mut self) -> Vec<String> {
        let pending = match &self.observers.achievements {
            Some(achievements) => achievements
                .try_borrow_mut()
                .map(|mut achievements| achievements.drain_unlocked())
                .unwrap_or_default(),
            None => return Vec::new(),
        };
        pending
            .into_iter()
            .map(|unlock| {
                let _ = self.bus.emit(EventKind::AchievementUnlocked {
                    id: unlock.id.to_owned(),
                    name: unlock.name.to_owned(),
                    points: unlock.points,
                });
                unlock.id.to_owned()
            })
            .collect()
    }

    fn active_events(&self) -> Vec<CosmicEventKind> {
        self.cosmic
            .as_ref()
            .map(CosmicScheduler::active_kinds)
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Operator surface
    // -----------------------------------------------------------------------

    /// Execute one operator command.
    pub fn execute(&mut self, command: OperatorCommand) -> OperatorResponse {
        if self.state == EngineState::Destroyed {
            warn!(?command, "Operator command after destroy ignored");
            return OperatorResponse::rejected("engine destroyed");
        }
        let response = match command {
            OperatorCommand::SpawnResource { kind, variant } => self.spawn_resource(kind, variant),
            OperatorCommand::DespawnResource { id } => match self.resources.despawn(id, &mut self.bus) {
                Ok(variant) => {
                    self.announce(format!("Operator removed {variant:?}"));
                    OperatorResponse::Ok
                }
                Err(err) => OperatorResponse::rejected(err.to_string()),
            },
            OperatorCommand::ForceEvent { kind } => self.force_event(kind),
            OperatorCommand::ForceRare { variant } => self.force_rare(variant),
            OperatorCommand::SpawnEntity { position, tier } => self.spawn_entity(position, tier),
            OperatorCommand::UseTool { tool, position } => self.use_tool(tool, position),
            OperatorCommand::SetPointer { pointer } => {
                self.pointer = pointer;
                OperatorResponse::Ok
            }
            OperatorCommand::Pause => {
                if self.pause() {
                    self.announce("Simulation paused");
                }
                OperatorResponse::Ok
            }
            OperatorCommand::Resume => {
                if self.resume() {
                    self.announce("Simulation resumed");
                }
                OperatorResponse::Ok
            }
            OperatorCommand::ToggleObserver { name } => self.toggle_observer(&name),
            OperatorCommand::ExportEventLog => match &self.observers.event_log {
                Some(log) => OperatorResponse::EventLog {
                    text: log.borrow().export_text(),
                },
                None => OperatorResponse::rejected("event log is not enabled"),
            },
            OperatorCommand::ReadStatistics => match &self.observers.statistics {
                Some(statistics) => OperatorResponse::Statistics {
                    report: Box::new(statistics.borrow().report()),
                },
                None => OperatorResponse::rejected("statistics are not enabled"),
            },
            OperatorCommand::ReadAchievements => match &self.observers.achievements {
                Some(achievements) => OperatorResponse::Achievements {
                    progress: achievements.borrow().progress(),
                },
                None => OperatorResponse::rejected("achievements are not enabled"),
            },
            OperatorCommand::ResetAchievements => self.reset_achievements(),
            OperatorCommand::InitializeAudio => match &self.observers.audio {
                Some(audio) => match audio.borrow_mut().initialize() {
                    Ok(()) => OperatorResponse::Ok,
                    Err(err) => OperatorResponse::rejected(err.to_string()),
                },
                None => OperatorResponse::rejected("audio is not enabled"),
            },
        };
        if let OperatorResponse::Rejected { reason } = &response {
            warn!(reason = %reason, "Operator command rejected");
        }
        response
    }

    fn announce(&mut self, message: impl Into<String>) {
        let _ = self.bus.emit(EventKind::System {
            message: message.into(),
        });
    }

    fn spawn_resource(
        &mut self,
        kind: ResourceKind,
        variant: Option<firefly_types::ResourceVariant>,
    ) -> OperatorResponse {
        match self
            .resources
            .try_spawn_resource(kind, variant, &mut self.rng, &mut self.bus)
        {
            Ok(id) => {
                self.announce(format!("Operator spawned {}", kind.name()));
                OperatorResponse::ResourceSpawned { id }
            }
            Err(err) => OperatorResponse::rejected(err.to_string()),
        }
    }

    fn force_event(&mut self, kind: CosmicEventKind) -> OperatorResponse {
        let Some(scheduler) = self.cosmic.as_mut() else {
            return OperatorResponse::rejected("cosmic events are not enabled");
        };
        let outcome = scheduler.force_event(
            kind,
            &mut CosmicContext {
                dt_ms: 0.0,
                population: &mut self.population,
                rng: &mut self.rng,
                bus: &mut self.bus,
            },
        );
        match outcome {
            ForceOutcome::Started => {
                self.announce(format!("Operator forced {}", kind.name()));
                OperatorResponse::EventStarted { kind }
            }
            ForceOutcome::AlreadyActive => {
                OperatorResponse::rejected(format!("{} is already active", kind.name()))
            }
            ForceOutcome::AtCapacity => OperatorResponse::rejected("cosmic event limit reached"),
        }
    }

    fn force_rare(&mut self, variant: RareVariant) -> OperatorResponse {
        let Some(module) = self.behaviors.module_mut::<RareVariantModule>() else {
            return OperatorResponse::rejected("rare variants are not enabled");
        };
        match module.force_rare(variant, &mut self.population, &mut self.rng, &mut self.bus) {
            Some(id) => OperatorResponse::EntitySpawned { id },
            None => OperatorResponse::rejected("population at capacity"),
        }
    }

    fn spawn_entity(&mut self, position: Option<Vec2>, tier: Option<Tier>) -> OperatorResponse {
        let mut params = SpawnParams::new(SpawnOrigin::Operator);
        if let Some(position) = position {
            params = params.at(position);
        }
        if let Some(tier) = tier {
            params.tier = tier;
        }
        match self.population.spawn(params, &mut self.rng, &mut self.bus) {
            Some(id) => OperatorResponse::EntitySpawned { id },
            None => OperatorResponse::rejected("population at capacity"),
        }
    }

    fn use_tool(&mut self, tool: ToolKind, position: Vec2) -> OperatorResponse {
        match self
            .tools
            .use_tool(tool, position, &mut self.population, &mut self.bus)
        {
            ToolOutcome::Applied { affected } => OperatorResponse::ToolApplied { affected },
            ToolOutcome::OnCooldown => {
                OperatorResponse::rejected(format!("{} is cooling down", tool.name()))
            }
            ToolOutcome::NoCharges => {
                OperatorResponse::rejected(format!("{} has no charges", tool.name()))
            }
        }
    }

    fn toggle_observer(&mut self, name: &str) -> OperatorResponse {
        let Some(kind) = ObserverKind::from_name(name) else {
            return OperatorResponse::rejected(format!("unknown observer {name}"));
        };
        let Some(&visible) = self.visible.get(&kind) else {
            return OperatorResponse::rejected(format!("{name} has no overlay"));
        };
        let visible = !visible;
        self.visible.insert(kind, visible);

        if let Some(surface) = self.surface.as_mut() {
            if visible {
                let handle = surface.attach(Layer::Overlay(kind.name().to_owned()));
                self.overlays.insert(kind, handle);
            } else if let Some(handle) = self.overlays.remove(&kind) {
                let _ = surface.detach(handle);
            }
        }
        debug!(observer = name, visible, "Overlay toggled");
        OperatorResponse::Visibility {
            observer: name.to_owned(),
            visible,
        }
    }

    fn reset_achievements(&mut self) -> OperatorResponse {
        let Some(achievements) = &self.observers.achievements else {
            return OperatorResponse::rejected("achievements are not enabled");
        };
        let result = achievements.borrow_mut().reset();
        match result {
            Ok(()) => {
                self.announce("Achievements reset");
                OperatorResponse::Ok
            }
            Err(err) => OperatorResponse::rejected(err.to_string()),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Current lifecycle state.
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Validated configuration.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Values clamped during validation.
    pub fn adjustments(&self) -> &[ConfigAdjustment] {
        &self.adjustments
    }

    /// Resolved plugin table.
    pub const fn plugins(&self) -> &PluginTable {
        &self.plugins
    }

    /// The entity arena.
    pub const fn population(&self) -> &PopulationManager {
        &self.population
    }

    /// The behavior module bus.
    pub const fn behaviors(&self) -> &BehaviorBus {
        &self.behaviors
    }

    /// Resources and hazards.
    pub const fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    /// The cosmic scheduler, when enabled.
    pub const fn cosmic(&self) -> Option<&CosmicScheduler> {
        self.cosmic.as_ref()
    }

    /// Player tools.
    pub const fn tools(&self) -> &PlayerTools {
        &self.tools
    }

    /// The event bus.
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Mutable access to the event bus, for attaching extra observers.
    pub const fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Statistics, when enabled.
    pub fn statistics(&self) -> Option<Shared<Statistics>> {
        self.observers.statistics.clone()
    }

    /// Event log, when enabled.
    pub fn event_log(&self) -> Option<Shared<EventLog>> {
        self.observers.event_log.clone()
    }

    /// Achievements, when enabled.
    pub fn achievements(&self) -> Option<Shared<Achievements>> {
        self.observers.achievements.clone()
    }

    /// Audio cues, when enabled.
    pub fn audio(&self) -> Option<Shared<AudioCues>> {
        self.observers.audio.clone()
    }

    /// Whether an observer's overlay is shown.
    pub fn is_overlay_visible(&self, kind: ObserverKind) -> bool {
        self.visible.get(&kind).copied().unwrap_or(false)
    }

    /// Current pointer.
    pub const fn pointer(&self) -> Option<Pointer> {
        self.pointer
    }

    /// Whether a frame is scheduled.
    pub const fn is_frame_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Frames run so far.
    pub const fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Simulated time so far.
    pub const fn sim_time_ms(&self) -> f64 {
        self.sim_time_ms
    }

    /// Summary of the most recent frame.
    pub const fn last_summary(&self) -> Option<&FrameSummary> {
        self.last_summary.as_ref()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurface;

    fn quiet() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.observers.achievements.persist = false;
        config
    }

    #[test]
    fn construction_seeds_the_initial_population() {
        let engine = Engine::new(quiet()).unwrap();
        assert_eq!(engine.state(), EngineState::Created);
        assert_eq!(engine.population().len(), 20);
        assert_eq!(engine.behaviors().len(), 8);
        assert!(!engine.is_frame_pending());
    }

    #[test]
    fn frames_only_run_while_running() {
        let mut engine = Engine::new(quiet()).unwrap();
        assert!(engine.frame(0.0).is_none());
        engine.start().unwrap();
        let summary = engine.frame(0.0).unwrap();
        assert_eq!(summary.frame, 1);
        assert!((summary.dt_ms - 16.0).abs() < f64::EPSILON);
        assert!(engine.is_frame_pending());

        let summary = engine.frame(40.0).unwrap();
        assert!((summary.dt_ms - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pause_forgets_the_previous_timestamp() {
        let mut engine = Engine::new(quiet()).unwrap();
        engine.start().unwrap();
        let _ = engine.frame(0.0).unwrap();
        assert!(engine.pause());
        assert!(engine.frame(100.0).is_none());
        assert!(engine.resume());
        let summary = engine.frame(60_000.0).unwrap();
        assert!((summary.dt_ms - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_timestamp_falls_back_to_default_delta() {
        let mut engine = Engine::new(quiet()).unwrap();
        engine.start().unwrap();
        let _ = engine.frame(500.0).unwrap();
        let summary = engine.frame(100.0).unwrap();
        assert!((summary.dt_ms - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mount_attaches_root_and_visible_overlays() {
        let surface = HeadlessSurface::new();
        let mut engine = Engine::new(quiet()).unwrap();
        engine.mount(Box::new(surface.clone())).unwrap();
        assert_eq!(engine.state(), EngineState::Mounted);
        assert_eq!(surface.element_count(), 4);
        assert!(engine.mount(Box::new(HeadlessSurface::new())).is_err());

        let response = engine.execute(OperatorCommand::ToggleObserver {
            name: "event_log".to_owned(),
        });
        assert_eq!(
            response,
            OperatorResponse::Visibility {
                observer: "event_log".to_owned(),
                visible: false,
            }
        );
        assert_eq!(surface.element_count(), 3);
        assert!(!engine.is_overlay_visible(ObserverKind::EventLog));
    }

    #[test]
    fn destroyed_engine_refuses_everything() {
        let mut engine = Engine::new(quiet()).unwrap();
        engine.destroy();
        engine.destroy();
        assert_eq!(engine.state(), EngineState::Destroyed);
        assert!(engine.start().is_err());
        assert!(engine.frame(0.0).is_none());
        assert!(engine.execute(OperatorCommand::ReadStatistics).is_rejected());
        assert_eq!(engine.bus().total_subscribers(), 0);
        assert!(engine.population().is_empty());
    }

    #[test]
    fn unknown_observer_toggle_is_rejected() {
        let mut engine = Engine::new(quiet()).unwrap();
        let response = engine.execute(OperatorCommand::ToggleObserver {
            name: "heatmap".to_owned(),
        });
        assert!(response.is_rejected());
        let response = engine.execute(OperatorCommand::ToggleObserver {
            name: "audio".to_owned(),
        });
        assert!(response.is_rejected());
    }
}

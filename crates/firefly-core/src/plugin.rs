//! Plugin-availability table.
//!
//! Every optional subsystem (behavior modules, resource kinds, the cosmic
//! scheduler, observers) is a plugin. A [`PluginRegistry`] lists the
//! constructors compiled into this build; [`PluginTable::resolve`] combines
//! it with the configuration once at engine construction. Only
//! [`PluginStatus::Enabled`] entries are built. Everything else is skipped
//! without error, and the table stays inspectable for operators and tests.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use firefly_types::{BehaviorKind, ResourceKind};

use crate::config::SimulationConfig;

/// Optional meta subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObserverKind {
    /// Counters and population history.
    Statistics,
    /// Grouped text log.
    EventLog,
    /// Milestones.
    Achievements,
    /// Sound cues.
    Audio,
}

impl ObserverKind {
    /// All observers in attachment order.
    pub const ALL: [Self; 4] = [Self::Statistics, Self::EventLog, Self::Achievements, Self::Audio];

    /// Configuration and operator name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Statistics => "statistics",
            Self::EventLog => "event_log",
            Self::Achievements => "achievements",
            Self::Audio => "audio",
        }
    }

    /// Look up an observer by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// A pluggable subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "family", content = "kind")]
pub enum PluginKind {
    /// A behavior module.
    Behavior(BehaviorKind),
    /// A resource or hazard kind.
    Resource(ResourceKind),
    /// The cosmic event scheduler.
    Cosmic,
    /// An observer subsystem.
    Observer(ObserverKind),
}

impl PluginKind {
    /// Every known plugin, in construction order.
    pub fn all() -> Vec<Self> {
        let behaviors = BehaviorKind::ALL.into_iter().map(Self::Behavior);
        let resources = ResourceKind::ALL.into_iter().map(Self::Resource);
        let observers = ObserverKind::ALL.into_iter().map(Self::Observer);
        behaviors
            .chain(resources)
            .chain(std::iter::once(Self::Cosmic))
            .chain(observers)
            .collect()
    }

    /// Configuration section the plugin lives under.
    pub const fn section(self) -> &'static str {
        match self {
            Self::Behavior(_) => "behaviors",
            Self::Resource(_) => "resources",
            Self::Cosmic => "cosmic_events",
            Self::Observer(ObserverKind::Audio) => "audio",
            Self::Observer(_) => "observers",
        }
    }

    /// Name within the section.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Behavior(kind) => kind.name(),
            Self::Resource(kind) => kind.name(),
            Self::Cosmic => "scheduler",
            Self::Observer(kind) => kind.name(),
        }
    }

    fn configured(self, config: &SimulationConfig) -> bool {
        match self {
            Self::Behavior(kind) => config.behaviors.is_enabled(kind),
            Self::Resource(kind) => config.resources.kinds.settings(kind).enabled,
            Self::Cosmic => config.cosmic_events.enabled,
            Self::Observer(ObserverKind::Statistics) => config.observers.statistics.enabled,
            Self::Observer(ObserverKind::EventLog) => config.observers.event_log.enabled,
            Self::Observer(ObserverKind::Achievements) => config.observers.achievements.enabled,
            Self::Observer(ObserverKind::Audio) => config.audio.enabled,
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.name())
    }
}

/// Resolution outcome for one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    /// Configured on and available; constructed.
    Enabled,
    /// Switched off in configuration.
    Disabled,
    /// Configured on, but this build has no constructor for it.
    Unavailable,
    /// Named in configuration but not a known plugin.
    Unknown,
}

/// One row of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginEntry {
    /// Configuration section.
    pub section: String,
    /// Name within the section.
    pub name: String,
    /// The plugin, when the name is known.
    pub kind: Option<PluginKind>,
    /// Outcome.
    pub status: PluginStatus,
}

/// The constructors available in this build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRegistry {
    available: BTreeSet<PluginKind>,
}

impl PluginRegistry {
    /// Every plugin shipped with the engine.
    pub fn standard() -> Self {
        Self {
            available: PluginKind::all().into_iter().collect(),
        }
    }

    /// No plugins at all.
    pub const fn empty() -> Self {
        Self {
            available: BTreeSet::new(),
        }
    }

    /// Registry with `kind` removed.
    #[must_use]
    pub fn without(mut self, kind: PluginKind) -> Self {
        self.available.remove(&kind);
        self
    }

    /// Registry with `kind` added.
    #[must_use]
    pub fn with(mut self, kind: PluginKind) -> Self {
        self.available.insert(kind);
        self
    }

    /// Whether a constructor for `kind` exists.
    pub fn provides(&self, kind: PluginKind) -> bool {
        self.available.contains(&kind)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Resolved availability of every plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginTable {
    entries: Vec<PluginEntry>,
}

impl PluginTable {
    /// Resolve `config` against `registry`. Unknown names log at warn,
    /// unavailable plugins at debug.
    pub fn resolve(config: &SimulationConfig, registry: &PluginRegistry) -> Self {
        let mut entries = Vec::new();

        for kind in PluginKind::all() {
            let status = if !kind.configured(config) {
                PluginStatus::Disabled
            } else if registry.provides(kind) {
                PluginStatus::Enabled
            } else {
                debug!(plugin = %kind, "Plugin not available in this build, skipping");
                PluginStatus::Unavailable
            };
            entries.push(PluginEntry {
                section: kind.section().to_owned(),
                name: kind.name().to_owned(),
                kind: Some(kind),
                status,
            });
        }

        let unknown = [
            ("behaviors", config.behaviors.unknown.keys()),
            ("resources", config.resources.unknown.keys()),
            ("observers", config.observers.unknown.keys()),
        ];
        for (section, names) in unknown {
            for name in names {
                warn!(section, name = %name, "Unknown plugin in configuration, skipping");
                entries.push(PluginEntry {
                    section: section.to_owned(),
                    name: name.clone(),
                    kind: None,
                    status: PluginStatus::Unknown,
                });
            }
        }

        Self { entries }
    }

    /// Status of a known plugin.
    pub fn status(&self, kind: PluginKind) -> PluginStatus {
        self.entries
            .iter()
            .find(|entry| entry.kind == Some(kind))
            .map_or(PluginStatus::Unavailable, |entry| entry.status)
    }

    /// Whether `kind` is to be constructed.
    pub fn is_enabled(&self, kind: PluginKind) -> bool {
        self.status(kind) == PluginStatus::Enabled
    }

    /// Every row.
    pub fn entries(&self) -> &[PluginEntry] {
        &self.entries
    }

    /// Rows with the given status.
    pub fn with_status(&self, status: PluginStatus) -> impl Iterator<Item = &PluginEntry> {
        self.entries.iter().filter(move |entry| entry.status == status)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_everything_but_audio() {
        let table = PluginTable::resolve(&SimulationConfig::default(), &PluginRegistry::standard());
        assert_eq!(table.entries().len(), 21);
        assert!(table.is_enabled(PluginKind::Behavior(BehaviorKind::Hunting)));
        assert!(table.is_enabled(PluginKind::Cosmic));
        assert_eq!(
            table.status(PluginKind::Observer(ObserverKind::Audio)),
            PluginStatus::Disabled
        );
        assert_eq!(table.with_status(PluginStatus::Unknown).count(), 0);
    }

    #[test]
    fn missing_constructor_is_unavailable_not_an_error() {
        let registry = PluginRegistry::standard().without(PluginKind::Behavior(BehaviorKind::Swarming));
        let table = PluginTable::resolve(&SimulationConfig::default(), &registry);
        assert_eq!(
            table.status(PluginKind::Behavior(BehaviorKind::Swarming)),
            PluginStatus::Unavailable
        );
        assert!(!table.is_enabled(PluginKind::Behavior(BehaviorKind::Swarming)));
    }

    #[test]
    fn disabled_wins_over_unavailable() {
        let mut config = SimulationConfig::default();
        config.behaviors.swarming = false;
        let registry = PluginRegistry::empty();
        let table = PluginTable::resolve(&config, &registry);
        assert_eq!(
            table.status(PluginKind::Behavior(BehaviorKind::Swarming)),
            PluginStatus::Disabled
        );
        assert_eq!(
            table.status(PluginKind::Behavior(BehaviorKind::Hunting)),
            PluginStatus::Unavailable
        );
    }

    #[test]
    fn unknown_names_are_listed() {
        let config = SimulationConfig::parse("behaviors:\n  telepathy: true\n").unwrap();
        let table = PluginTable::resolve(&config, &PluginRegistry::standard());
        let unknown: Vec<&str> = table
            .with_status(PluginStatus::Unknown)
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(unknown, vec!["telepathy"]);
    }

    #[test]
    fn observer_names_round_trip() {
        for kind in ObserverKind::ALL {
            assert_eq!(ObserverKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ObserverKind::from_name("heatmap"), None);
        assert_eq!(PluginKind::Cosmic.to_string(), "cosmic_events.scheduler");
    }
}

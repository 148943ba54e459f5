//! Scrolling history of notable ecosystem events.
//!
//! Entries are stamped with simulated time. Consecutive identical messages
//! of the same category arriving within the grouping window collapse into
//! one entry with a repeat count.

use std::collections::VecDeque;
use std::fmt::Write as _;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use firefly_events::{EventKind, SimEvent, Signal};
use firefly_types::ResourceVariant;

use crate::config::EventLogConfig;
use crate::error::ObserverError;
use crate::observer::Observer;

/// Category of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogCategory {
    /// An entity was born.
    Birth,
    /// An entity died.
    Death,
    /// An entity evolved.
    Evolution,
    /// A rare variant appeared.
    RareSpawn,
    /// A cosmic event started or ended.
    CosmicEvent,
    /// Predator activity.
    Predator,
    /// Operator or tool action.
    PlayerAction,
    /// A pattern formed.
    Constellation,
    /// An achievement unlocked.
    Achievement,
    /// Engine messages.
    System,
}

impl LogCategory {
    /// Label used in the text export.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Birth => "Birth",
            Self::Death => "Death",
            Self::Evolution => "Evolution",
            Self::RareSpawn => "Rare",
            Self::CosmicEvent => "Cosmic",
            Self::Predator => "Predator",
            Self::PlayerAction => "Action",
            Self::Constellation => "Constellation",
            Self::Achievement => "Achievement",
            Self::System => "System",
        }
    }
}

/// One (possibly grouped) log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Category.
    pub category: LogCategory,
    /// Message text.
    pub message: String,
    /// Simulated time of the latest occurrence.
    pub at_ms: f64,
    /// Occurrences grouped into this entry.
    pub count: u32,
}

const SIGNALS: &[Signal] = &[
    Signal::Birth,
    Signal::Death,
    Signal::Evolution,
    Signal::RareSpawn,
    Signal::EventStart,
    Signal::EventEnd,
    Signal::PredatorSpawn,
    Signal::PredatorKill,
    Signal::PredatorRepelled,
    Signal::HazardKill,
    Signal::Corruption,
    Signal::ToolUse,
    Signal::ResourceSpawned,
    Signal::PatternFormed,
    Signal::AchievementUnlocked,
    Signal::System,
];

/// Bounded, grouped event history.
#[derive(Debug, Clone)]
pub struct EventLog {
    config: EventLogConfig,
    entries: VecDeque<LogEntry>,
}

impl EventLog {
    /// Empty log.
    pub const fn new(config: EventLogConfig) -> Self {
        Self {
            config,
            entries: VecDeque::new(),
        }
    }

    /// Append a message, grouping it with the previous entry when identical.
    pub fn log(&mut self, category: LogCategory, message: impl Into<String>, at_ms: f64) {
        let message = message.into();
        if self.config.group_similar
            && let Some(last) = self.entries.back_mut()
            && last.category == category
            && last.message == message
            && at_ms - last.at_ms < self.config.group_window_ms
        {
            last.count = last.count.saturating_add(1);
            last.at_ms = at_ms;
            return;
        }

        self.entries.push_back(LogEntry {
            category,
            message,
            at_ms,
            count: 1,
        });
        while self.entries.len() > self.config.max_entries {
            let _ = self.entries.pop_front();
        }
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Render the log as `[HH:MM:SS] Label: message (xN)` lines.
    pub fn export_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = write!(
                out,
                "[{}] {}: {}",
                clock(entry.at_ms),
                entry.category.label(),
                entry.message
            );
            if entry.count > 1 {
                let _ = write!(out, " (x{})", entry.count);
            }
            out.push('\n');
        }
        out
    }

    /// Active configuration.
    pub const fn config(&self) -> &EventLogConfig {
        &self.config
    }
}

impl Observer for EventLog {
    fn name(&self) -> &'static str {
        "event_log"
    }

    fn signals(&self) -> &'static [Signal] {
        SIGNALS
    }

    fn handle(&mut self, event: &SimEvent) -> Result<(), ObserverError> {
        if let Some((category, message)) = describe(&event.kind) {
            self.log(category, message, event.at_ms);
        }
        Ok(())
    }
}

/// Category and message for a notification, if it is worth logging.
fn describe(kind: &EventKind) -> Option<(LogCategory, String)> {
    let line = match kind {
        EventKind::Birth { entity, .. } => (
            LogCategory::Birth,
            format!("{} firefly born (gen {})", entity.tier.name(), entity.generation),
        ),
        EventKind::Death { entity, cause } => (
            LogCategory::Death,
            format!("{} firefly died ({})", entity.tier.name(), cause.as_str()),
        ),
        EventKind::Evolution { from, to, .. } => (
            LogCategory::Evolution,
            format!("Firefly evolved from {} to {}", from.name(), to.name()),
        ),
        EventKind::RareSpawn { variant, .. } => (
            LogCategory::RareSpawn,
            format!("{} firefly appeared", variant.name()),
        ),
        EventKind::EventStart { event, .. } => {
            (LogCategory::CosmicEvent, format!("{} started", event.name()))
        }
        EventKind::EventEnd { event } => {
            (LogCategory::CosmicEvent, format!("{} ended", event.name()))
        }
        EventKind::PredatorSpawn { variant, .. } => {
            (LogCategory::Predator, format!("{variant:?} predator appeared"))
        }
        EventKind::PredatorKill { variant, .. } => (
            LogCategory::Predator,
            format!("{variant:?} predator captured a firefly"),
        ),
        EventKind::PredatorRepelled { entity, .. } => (
            LogCategory::Predator,
            if entity.is_some() {
                "Capture blocked".to_owned()
            } else {
                "Predator repelled by the swarm".to_owned()
            },
        ),
        EventKind::HazardKill { variant, .. } => (
            LogCategory::Predator,
            format!("{} consumed a firefly", resource_label(*variant)),
        ),
        EventKind::Corruption { .. } => (
            LogCategory::Predator,
            "A firefly was corrupted by a shadow".to_owned(),
        ),
        EventKind::ToolUse { tool, affected, .. } => (
            LogCategory::PlayerAction,
            format!("{} used ({affected} affected)", tool.name()),
        ),
        EventKind::ResourceSpawned { variant, .. } => (
            LogCategory::System,
            format!("{} appeared", resource_label(*variant)),
        ),
        EventKind::PatternFormed { shape, .. } => (
            LogCategory::Constellation,
            format!("Constellation formed: {shape}"),
        ),
        EventKind::AchievementUnlocked { name, .. } => {
            (LogCategory::Achievement, format!("Unlocked: {name}"))
        }
        EventKind::System { message } => (LogCategory::System, message.clone()),
        _ => return None,
    };
    Some(line)
}

fn resource_label(variant: ResourceVariant) -> String {
    match variant {
        ResourceVariant::Well(v) => format!("{v:?} energy well"),
        ResourceVariant::Predator(v) => format!("{v:?} predator star"),
        ResourceVariant::Portal => "Portal".to_owned(),
        ResourceVariant::Sanctuary(v) => format!("{v:?} sanctuary"),
        ResourceVariant::BlackHole => "Black hole".to_owned(),
        ResourceVariant::Shadow => "Shadow firefly".to_owned(),
        ResourceVariant::Serpent => "Void serpent".to_owned(),
        ResourceVariant::Parasite => "Parasite".to_owned(),
    }
}

/// `HH:MM:SS` of a simulated timestamp, wrapping at 24 hours.
fn clock(at_ms: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let seconds = ((at_ms.max(0.0) / 1000.0).floor() % 86_400.0) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
        .map_or_else(|| "--:--:--".to_owned(), |t| t.format("%H:%M:%S").to_string())
}

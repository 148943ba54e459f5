//! Operator commands and shared run-control state.
//!
//! [`OperatorCommand`] is the runtime debug surface: force-spawn a named
//! resource, event or rare variant, pause and resume, toggle an observer
//! overlay, export the event log, read statistics. Commands are executed by
//! [`Engine::execute`](crate::engine::Engine::execute), which always answers
//! with an [`OperatorResponse`]; an invalid request is a
//! [`OperatorResponse::Rejected`], never an error.
//!
//! [`OperatorState`] is shared between the frame runner and whatever feeds
//! it commands (a ctrl-c handler, a test). Atomic fields keep the frame path
//! lock-free; the command queue sits behind a tokio mutex and is drained
//! once per frame.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use firefly_agents::Pointer;
use firefly_observer::{Progress, StatisticsReport};
use firefly_types::{
    CosmicEventKind, EntityId, RareVariant, ResourceId, ResourceKind, ResourceVariant, Tier,
    ToolKind, Vec2,
};

use crate::config::SimulationBoundsConfig;

/// A runtime request from the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum OperatorCommand {
    /// Spawn a resource of `kind`, optionally a specific variant.
    SpawnResource {
        /// Resource family.
        kind: ResourceKind,
        /// Variant; random from the configured types when absent.
        #[serde(default)]
        variant: Option<ResourceVariant>,
    },
    /// Retire a resource.
    DespawnResource {
        /// The resource.
        id: ResourceId,
    },
    /// Start a cosmic event now.
    ForceEvent {
        /// Event kind.
        kind: CosmicEventKind,
    },
    /// Spawn a rare variant now.
    ForceRare {
        /// Variant to spawn.
        variant: RareVariant,
    },
    /// Spawn an ordinary entity.
    SpawnEntity {
        /// Position; random when absent.
        #[serde(default)]
        position: Option<Vec2>,
        /// Starting tier; basic when absent.
        #[serde(default)]
        tier: Option<Tier>,
    },
    /// Fire a player tool.
    UseTool {
        /// The tool.
        tool: ToolKind,
        /// Where to aim it.
        position: Vec2,
    },
    /// Move, press or remove the pointer.
    SetPointer {
        /// New pointer state; `None` removes it.
        #[serde(default)]
        pointer: Option<Pointer>,
    },
    /// Halt frame scheduling.
    Pause,
    /// Restart frame scheduling.
    Resume,
    /// Show or hide an observer overlay.
    ToggleObserver {
        /// Observer name (`statistics`, `event_log`, `achievements`).
        name: String,
    },
    /// Export the event log as text.
    ExportEventLog,
    /// Read aggregate statistics.
    ReadStatistics,
    /// Read achievement progress.
    ReadAchievements,
    /// Forget every unlock and counter.
    ResetAchievements,
    /// Run the deferred audio setup.
    InitializeAudio,
}

/// Outcome of an [`OperatorCommand`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum OperatorResponse {
    /// Done; nothing to report.
    Ok,
    /// A resource was spawned.
    ResourceSpawned {
        /// Its id.
        id: ResourceId,
    },
    /// An entity was spawned.
    EntitySpawned {
        /// Its id.
        id: EntityId,
    },
    /// A cosmic event started.
    EventStarted {
        /// Its kind.
        kind: CosmicEventKind,
    },
    /// A tool fired.
    ToolApplied {
        /// Entities in range.
        affected: usize,
    },
    /// Overlay visibility after a toggle.
    Visibility {
        /// Observer name.
        observer: String,
        /// Whether its overlay is now attached.
        visible: bool,
    },
    /// Exported event log.
    EventLog {
        /// One line per entry.
        text: String,
    },
    /// Statistics snapshot.
    Statistics {
        /// The report.
        report: Box<StatisticsReport>,
    },
    /// Achievement progress.
    Achievements {
        /// The progress summary.
        progress: Progress,
    },
    /// Nothing happened.
    Rejected {
        /// Why.
        reason: String,
    },
}

impl OperatorResponse {
    /// Rejection with a reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Whether the command was rejected.
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Reason why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// Reached the configured `max_frames` limit.
    MaxFramesReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// A stop was requested.
    OperatorStop,
    /// The engine was destroyed.
    EngineDestroyed,
}

/// Shared run-control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Real-time milliseconds between frames (runtime-adjustable).
    frame_interval_ms: AtomicU64,

    /// Wall-clock time when the run started.
    started_at: DateTime<Utc>,

    /// Maximum number of frames (0 = unlimited).
    max_frames: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// Commands awaiting the next frame.
    commands: Mutex<VecDeque<OperatorCommand>>,

    /// Reason the run ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create a new operator state from configuration.
    pub fn new(frame_interval_ms: u64, bounds: &SimulationBoundsConfig) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            frame_interval_ms: AtomicU64::new(frame_interval_ms),
            started_at: Utc::now(),
            max_frames: bounds.max_frames,
            max_real_time_seconds: bounds.max_real_time_seconds,
            commands: Mutex::new(VecDeque::new()),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the run ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the run ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Frame pacing
    // -----------------------------------------------------------------------

    /// Current real-time frame interval in milliseconds.
    pub fn frame_interval_ms(&self) -> u64 {
        self.frame_interval_ms.load(Ordering::Acquire)
    }

    /// Set the frame interval. Returns the previous interval.
    pub fn set_frame_interval_ms(&self, ms: u64) -> u64 {
        self.frame_interval_ms.swap(ms, Ordering::AcqRel)
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `frames` has reached a non-zero `max_frames`.
    pub const fn frame_limit_reached(&self, frames: u64) -> bool {
        self.max_frames > 0 && frames >= self.max_frames
    }

    /// Whether a non-zero `max_real_time_seconds` has elapsed.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Get the configured max frames.
    pub const fn max_frames(&self) -> u64 {
        self.max_frames
    }

    /// Get the configured max real-time seconds.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    // -----------------------------------------------------------------------
    // Command queue
    // -----------------------------------------------------------------------

    /// Queue a command for the next frame.
    pub async fn submit(&self, command: OperatorCommand) {
        self.commands.lock().await.push_back(command);
    }

    /// Take every queued command, oldest first.
    pub async fn drain_commands(&self) -> Vec<OperatorCommand> {
        self.commands.lock().await.drain(..).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn unbounded() -> SimulationBoundsConfig {
        SimulationBoundsConfig::default()
    }

    #[test]
    fn stop_request() {
        let state = OperatorState::new(16, &unbounded());
        assert!(!state.is_stop_requested());
        state.request_stop();
        assert!(state.is_stop_requested());
    }

    #[test]
    fn frame_interval_is_adjustable() {
        let state = OperatorState::new(16, &unbounded());
        assert_eq!(state.set_frame_interval_ms(33), 16);
        assert_eq!(state.frame_interval_ms(), 33);
    }

    #[test]
    fn zero_limits_mean_unlimited() {
        let state = OperatorState::new(16, &unbounded());
        assert!(!state.frame_limit_reached(u64::MAX));
        assert!(!state.time_limit_reached());
    }

    #[test]
    fn frame_limit_reached() {
        let bounds = SimulationBoundsConfig {
            max_frames: 100,
            max_real_time_seconds: 0,
        };
        let state = OperatorState::new(16, &bounds);
        assert!(!state.frame_limit_reached(99));
        assert!(state.frame_limit_reached(100));
    }

    #[tokio::test]
    async fn commands_drain_in_order() {
        let state = OperatorState::new(16, &unbounded());
        state.submit(OperatorCommand::Pause).await;
        state
            .submit(OperatorCommand::ForceEvent {
                kind: CosmicEventKind::Eclipse,
            })
            .await;
        let drained = state.drain_commands().await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained.first(), Some(&OperatorCommand::Pause));
        assert!(state.drain_commands().await.is_empty());
    }

    #[test]
    fn commands_parse_from_json() {
        let command: OperatorCommand =
            serde_json::from_str(r#"{"command": "spawn_resource", "kind": "portal"}"#).unwrap();
        assert_eq!(
            command,
            OperatorCommand::SpawnResource {
                kind: ResourceKind::Portal,
                variant: None,
            }
        );
        let command: OperatorCommand =
            serde_json::from_str(r#"{"command": "force_event", "kind": "SOLAR_FLARE"}"#).unwrap();
        assert_eq!(
            command,
            OperatorCommand::ForceEvent {
                kind: CosmicEventKind::SolarFlare,
            }
        );
    }
}

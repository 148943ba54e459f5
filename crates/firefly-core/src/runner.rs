//! Frame loop runner with operator controls.
//!
//! [`run`] drives an [`Engine`] until a termination condition is met:
//!
//! - **Bounded run**: stop after `max_frames` or `max_real_time_seconds`
//! - **Operator commands**: queued commands are executed before each frame
//! - **Pause/resume**: a paused engine schedules no frames; the loop keeps
//!   draining commands so a later `resume` gets through
//! - **Variable pacing**: the frame interval is adjustable at runtime
//! - **Clean stop**: `request_stop` ends the loop before the next frame
//!
//! Frame timestamps come from a [`FrameClock`]. The wall clock gives real
//! deltas; the fixed clock advances by a constant step per frame, which
//! makes a headless run reproducible for a given seed.

use std::sync::Arc;

use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::engine::{Engine, EngineState, FrameSummary};
use crate::error::EngineError;
use crate::operator::{OperatorState, SimulationEndReason};

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The engine could not be started.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: EngineError,
    },
}

/// Where frame timestamps come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameClock {
    /// Milliseconds since the run started, from the tokio clock.
    Wall,
    /// A constant step per frame.
    Fixed {
        /// Milliseconds added per frame.
        step_ms: f64,
    },
}

#[derive(Debug)]
struct ClockState {
    clock: FrameClock,
    started: Instant,
    fixed_ms: f64,
}

impl ClockState {
    fn new(clock: FrameClock) -> Self {
        Self {
            clock,
            started: Instant::now(),
            fixed_ms: 0.0,
        }
    }

    fn now_ms(&mut self) -> f64 {
        match self.clock {
            FrameClock::Wall => self.started.elapsed().as_secs_f64() * 1000.0,
            FrameClock::Fixed { step_ms } => {
                self.fixed_ms += step_ms;
                self.fixed_ms
            }
        }
    }
}

/// Result of a run.
#[derive(Debug)]
pub struct RunResult {
    /// Why the run ended.
    pub end_reason: SimulationEndReason,
    /// The last frame summary, if any frame completed.
    pub final_summary: Option<FrameSummary>,
    /// Frames executed during this run.
    pub total_frames: u64,
    /// Operator commands executed during this run.
    pub commands_executed: u64,
}

/// Callback invoked after each frame completes.
pub trait FrameCallback {
    /// Called with the frame's summary and the engine after the frame.
    fn on_frame(&mut self, summary: &FrameSummary, engine: &Engine);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl FrameCallback for NoOpCallback {
    fn on_frame(&mut self, _summary: &FrameSummary, _engine: &Engine) {}
}

/// Run the frame loop until a termination condition is met.
///
/// The engine is started if it is not running yet. A paused engine stays
/// paused until a `resume` command arrives.
///
/// # Errors
///
/// Returns [`RunnerError`] if the engine cannot be started.
pub async fn run(
    engine: &mut Engine,
    operator: &Arc<OperatorState>,
    clock: FrameClock,
    callback: &mut dyn FrameCallback,
) -> Result<RunResult, RunnerError> {
    if engine.state() != EngineState::Paused {
        engine.start()?;
    }

    let mut clock = ClockState::new(clock);
    let mut last_summary: Option<FrameSummary> = None;
    let mut total_frames: u64 = 0;
    let mut commands_executed: u64 = 0;

    info!(
        max_frames = operator.max_frames(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        frame_interval_ms = operator.frame_interval_ms(),
        clock = ?clock.clock,
        "Run starting"
    );

    let end_reason = loop {
        // --- Check stop request (before frame) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            break SimulationEndReason::OperatorStop;
        }

        // --- Check time limit (before frame) ---
        if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "Real-time limit reached"
            );
            break SimulationEndReason::MaxRealTimeReached;
        }

        // --- Operator commands ---
        for command in operator.drain_commands().await {
            let response = engine.execute(command);
            debug!(?response, "Operator command executed");
            commands_executed = commands_executed.saturating_add(1);
        }

        if engine.state() == EngineState::Destroyed {
            warn!("Engine destroyed during run");
            break SimulationEndReason::EngineDestroyed;
        }

        // --- Execute frame ---
        if engine.is_frame_pending() {
            let now_ms = clock.now_ms();
            if let Some(summary) = engine.frame(now_ms) {
                total_frames = total_frames.saturating_add(1);
                callback.on_frame(&summary, engine);

                let reached = operator.frame_limit_reached(total_frames);
                last_summary = Some(summary);
                if reached {
                    info!(
                        frames = total_frames,
                        max_frames = operator.max_frames(),
                        "Frame limit reached"
                    );
                    break SimulationEndReason::MaxFramesReached;
                }
            }
        }

        // --- Sleep for frame interval ---
        let interval_ms = operator.frame_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }
    };

    operator.set_end_reason(end_reason).await;
    Ok(RunResult {
        end_reason,
        final_summary: last_summary,
        total_frames,
        commands_executed,
    })
}

/// Log the end of a run.
pub fn log_run_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_frames = result.total_frames,
        commands = result.commands_executed,
        final_frame = result.final_summary.as_ref().map(|s| s.frame),
        final_population = result.final_summary.as_ref().map(|s| s.population),
        "Run ended"
    );

    if let Some(summary) = &result.final_summary {
        info!(
            frame = summary.frame,
            sim_time_ms = summary.sim_time_ms,
            population = summary.population,
            resources = summary.resource_count,
            active_events = ?summary.active_events,
            "Final frame summary"
        );
    } else {
        warn!("Run ended with no frames executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{SimulationBoundsConfig, SimulationConfig};
    use crate::operator::OperatorCommand;

    fn engine() -> Engine {
        Engine::new(SimulationConfig::default()).unwrap()
    }

    fn operator(max_frames: u64) -> Arc<OperatorState> {
        Arc::new(OperatorState::new(
            0,
            &SimulationBoundsConfig {
                max_frames,
                max_real_time_seconds: 0,
            },
        ))
    }

    struct Counting(u64);

    impl FrameCallback for Counting {
        fn on_frame(&mut self, _summary: &FrameSummary, _engine: &Engine) {
            self.0 = self.0.saturating_add(1);
        }
    }

    #[tokio::test]
    async fn stops_at_frame_limit() {
        let mut engine = engine();
        let operator = operator(25);
        let mut callback = Counting(0);
        let result = run(
            &mut engine,
            &operator,
            FrameClock::Fixed { step_ms: 16.0 },
            &mut callback,
        )
        .await
        .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::MaxFramesReached);
        assert_eq!(result.total_frames, 25);
        assert_eq!(callback.0, 25);
        assert_eq!(result.final_summary.unwrap().frame, 25);
        assert_eq!(
            operator.end_reason().await,
            Some(SimulationEndReason::MaxFramesReached)
        );
    }

    #[tokio::test]
    async fn stop_request_ends_before_the_first_frame() {
        let mut engine = engine();
        let operator = operator(0);
        operator.request_stop();
        let result = run(
            &mut engine,
            &operator,
            FrameClock::Fixed { step_ms: 16.0 },
            &mut NoOpCallback,
        )
        .await
        .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_frames, 0);
        assert!(result.final_summary.is_none());
    }

    #[tokio::test]
    async fn queued_commands_run_before_frames() {
        let mut engine = engine();
        let operator = operator(10);
        operator.submit(OperatorCommand::SpawnEntity { position: None, tier: None }).await;
        let result = run(
            &mut engine,
            &operator,
            FrameClock::Fixed { step_ms: 16.0 },
            &mut NoOpCallback,
        )
        .await
        .unwrap();
        assert_eq!(result.commands_executed, 1);
        assert_eq!(result.total_frames, 10);
    }

    #[tokio::test]
    async fn destroyed_engine_cannot_run() {
        let mut engine = engine();
        engine.destroy();
        let result = run(
            &mut engine,
            &operator(5),
            FrameClock::Wall,
            &mut NoOpCallback,
        )
        .await;
        assert!(matches!(result, Err(RunnerError::Engine { .. })));
    }
}

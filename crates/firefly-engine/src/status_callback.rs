//! Frame callback that reports simulation status.
//!
//! Every `every` frames, logs a one-line status at `info`; tracks the
//! population extremes for the final report.

use firefly_core::runner::FrameCallback;
use firefly_core::{Engine, FrameSummary};
use firefly_types::CosmicEventKind;
use tracing::{debug, info};

/// Callback that logs periodic status lines.
#[derive(Debug)]
pub struct StatusCallback {
    every: u64,
    lowest: usize,
    highest: usize,
    unlocked: Vec<String>,
}

impl StatusCallback {
    /// Report every `every` frames (at least 1).
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            lowest: usize::MAX,
            highest: 0,
            unlocked: Vec::new(),
        }
    }

    /// Smallest and largest population seen, if any frame ran.
    pub const fn population_range(&self) -> Option<(usize, usize)> {
        if self.lowest > self.highest {
            None
        } else {
            Some((self.lowest, self.highest))
        }
    }

    /// Achievement ids unlocked during the run.
    pub fn unlocked(&self) -> &[String] {
        &self.unlocked
    }
}

fn event_names(kinds: &[CosmicEventKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl FrameCallback for StatusCallback {
    fn on_frame(&mut self, summary: &FrameSummary, engine: &Engine) {
        self.lowest = self.lowest.min(summary.population);
        self.highest = self.highest.max(summary.population);

        for id in &summary.unlocked {
            info!(achievement = %id, frame = summary.frame, "Achievement unlocked");
        }
        self.unlocked.extend(summary.unlocked.iter().cloned());

        if !summary.cosmic.started.is_empty() {
            debug!(
                frame = summary.frame,
                started = %event_names(&summary.cosmic.started),
                "Cosmic events started"
            );
        }

        if summary.frame.checked_rem(self.every) == Some(0) {
            info!(
                frame = summary.frame,
                sim_seconds = summary.sim_time_ms / 1000.0,
                population = summary.population,
                resources = summary.resource_count,
                events = %event_names(&summary.active_events),
                bus_failures = engine.bus().failures(),
                "Status"
            );
        }
    }
}

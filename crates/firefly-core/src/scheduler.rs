//! Frame scheduling and delta computation.
//!
//! At most one frame is pending at a time. The engine requests the next
//! frame as the last stage of the current one, so cancelling the pending
//! handle is all it takes to stop the loop.

use serde::Serialize;

/// Errors from frame timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ClockError {
    /// Timestamp is NaN or infinite.
    #[error("frame timestamp is not finite: {now_ms}")]
    NonFinite {
        /// The offending timestamp.
        now_ms: f64,
    },

    /// Timestamp is earlier than the previous frame's.
    #[error("frame timestamp went backwards: {now_ms} < {previous_ms}")]
    Backwards {
        /// The offending timestamp.
        now_ms: f64,
        /// The previous frame's timestamp.
        previous_ms: f64,
    },
}

/// Handle to a requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Raw handle value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Single-slot frame scheduler with delta tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameScheduler {
    pending: Option<FrameHandle>,
    issued: u64,
    previous_ms: Option<f64>,
    default_dt_ms: f64,
    max_dt_ms: f64,
}

impl FrameScheduler {
    /// Scheduler using `default_dt_ms` when there is no previous timestamp
    /// and capping every delta at `max_dt_ms`.
    pub const fn new(default_dt_ms: f64, max_dt_ms: f64) -> Self {
        Self {
            pending: None,
            issued: 0,
            previous_ms: None,
            default_dt_ms,
            max_dt_ms,
        }
    }

    /// Request a frame. Returns the already-pending handle if there is one.
    pub fn request(&mut self) -> FrameHandle {
        if let Some(handle) = self.pending {
            return handle;
        }
        self.issued = self.issued.saturating_add(1);
        let handle = FrameHandle(self.issued);
        self.pending = Some(handle);
        handle
    }

    /// Cancel the pending frame. Returns whether one was pending.
    pub const fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Consume the pending frame so it can run.
    pub const fn take(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    /// Whether a frame is pending.
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the previous timestamp; the next delta is the default.
    pub const fn forget_timestamp(&mut self) {
        self.previous_ms = None;
    }

    /// The delta used when no previous timestamp exists.
    pub const fn default_dt_ms(&self) -> f64 {
        self.default_dt_ms
    }

    /// Delta since the previous frame, capped, and record `now_ms` as the
    /// new previous timestamp. A rejected timestamp is not recorded.
    pub fn frame_delta(&mut self, now_ms: f64) -> Result<f64, ClockError> {
        if !now_ms.is_finite() {
            return Err(ClockError::NonFinite { now_ms });
        }
        let dt = match self.previous_ms {
            None => self.default_dt_ms,
            Some(previous_ms) if now_ms < previous_ms => {
                return Err(ClockError::Backwards { now_ms, previous_ms });
            }
            Some(previous_ms) => now_ms - previous_ms,
        };
        self.previous_ms = Some(now_ms);
        Ok(dt.min(self.max_dt_ms))
    }
}

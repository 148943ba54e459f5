//! Subscription registry with per-handler fault isolation.
//!
//! Handlers are stored per [`Signal`] in registration order. Publishing an
//! event invokes every handler bound to its signal exactly once; a handler
//! that returns [`HandlerError`] or panics is logged and counted, and
//! dispatch continues with the next handler.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::HandlerError;
use crate::signal::{EventKind, SimEvent, Signal};

/// Boxed subscriber callback.
pub type Handler = Box<dyn FnMut(&SimEvent) -> Result<(), HandlerError>>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of a single publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    /// Handlers that completed successfully.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

struct Subscription {
    id: SubscriptionId,
    owner: String,
    handler: Handler,
}

/// Typed publish/subscribe registry.
pub struct EventBus {
    subscriptions: BTreeMap<Signal, Vec<Subscription>>,
    next_id: u64,
    frame: u64,
    now_ms: f64,
    published: u64,
    failures: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.total_subscribers())
            .field("frame", &self.frame)
            .field("published", &self.published)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create an empty bus at frame 0.
    pub const fn new() -> Self {
        Self {
            subscriptions: BTreeMap::new(),
            next_id: 0,
            frame: 0,
            now_ms: 0.0,
            published: 0,
            failures: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Bind a handler to a signal. It runs after every handler already bound.
    pub fn subscribe<F>(&mut self, signal: Signal, owner: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: FnMut(&SimEvent) -> Result<(), HandlerError> + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let owner = owner.into();
        debug!(signal = %signal, owner = %owner, subscription = %id, "Subscribed");
        self.subscriptions.entry(signal).or_default().push(Subscription {
            id,
            owner,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove one subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for subs in self.subscriptions.values_mut() {
            if let Some(pos) = subs.iter().position(|s| s.id == id) {
                subs.remove(pos);
                return true;
            }
        }
        false
    }

    /// Remove every subscription registered by `owner`. Returns how many were removed.
    pub fn unsubscribe_owner(&mut self, owner: &str) -> usize {
        let mut removed: usize = 0;
        for subs in self.subscriptions.values_mut() {
            let before = subs.len();
            subs.retain(|s| s.owner != owner);
            removed = removed.saturating_add(before.saturating_sub(subs.len()));
        }
        removed
    }

    /// Number of handlers bound to a signal.
    pub fn subscriber_count(&self, signal: Signal) -> usize {
        self.subscriptions.get(&signal).map_or(0, Vec::len)
    }

    /// Number of handlers across all signals.
    pub fn total_subscribers(&self) -> usize {
        self.subscriptions.values().map(Vec::len).sum()
    }

    /// Detach every handler.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    /// Set the frame and simulated time stamped onto subsequent events.
    pub const fn set_clock(&mut self, frame: u64, now_ms: f64) {
        self.frame = frame;
        self.now_ms = now_ms;
    }

    /// Current frame stamp.
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Current simulated time stamp.
    pub const fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Total events published.
    pub const fn published(&self) -> u64 {
        self.published
    }

    /// Total handler failures since creation.
    pub const fn failures(&self) -> u64 {
        self.failures
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Stamp a payload with the current clock and publish it.
    pub fn emit(&mut self, kind: EventKind) -> PublishReport {
        let event = SimEvent {
            frame: self.frame,
            at_ms: self.now_ms,
            kind,
        };
        self.publish(&event)
    }

    /// Deliver an event to every handler bound to its signal, in order.
    pub fn publish(&mut self, event: &SimEvent) -> PublishReport {
        self.published = self.published.saturating_add(1);
        let signal = event.signal();
        let mut report = PublishReport::default();
        let Some(subs) = self.subscriptions.get_mut(&signal) else {
            return report;
        };

        for sub in subs.iter_mut() {
            let handler = &mut sub.handler;
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => report.delivered = report.delivered.saturating_add(1),
                Ok(Err(err)) => {
                    warn!(
                        signal = %signal,
                        owner = %sub.owner,
                        error = %err,
                        "Observer returned an error"
                    );
                    report.failed = report.failed.saturating_add(1);
                }
                Err(payload) => {
                    warn!(
                        signal = %signal,
                        owner = %sub.owner,
                        panic = %panic_message(payload.as_ref()),
                        "Observer panicked"
                    );
                    report.failed = report.failed.saturating_add(1);
                }
            }
        }

        self.failures = self
            .failures
            .saturating_add(u64::try_from(report.failed).unwrap_or(u64::MAX));
        report
    }
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn system(message: &str) -> EventKind {
        EventKind::System {
            message: message.to_owned(),
        }
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for label in ["a", "b", "c"] {
            let order = Rc::clone(&order);
            bus.subscribe(Signal::System, label, move |_| {
                order.borrow_mut().push(label);
                Ok(())
            });
        }
        let report = bus.emit(system("go"));
        assert_eq!(report.delivered, 3);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let hits = Rc::new(RefCell::new(0_u32));
        let mut bus = EventBus::new();
        let h1 = Rc::clone(&hits);
        let first = bus.subscribe(Signal::System, "one", move |_| {
            let mut n = h1.borrow_mut();
            *n = n.saturating_add(1);
            Ok(())
        });
        let h2 = Rc::clone(&hits);
        bus.subscribe(Signal::System, "two", move |_| {
            let mut n = h2.borrow_mut();
            *n = n.saturating_add(10);
            Ok(())
        });
        assert!(bus.unsubscribe(first));
        assert!(!bus.unsubscribe(first));
        bus.emit(system("x"));
        assert_eq!(*hits.borrow(), 10);
    }

    #[test]
    fn events_carry_the_clock() {
        let seen = Rc::new(RefCell::new(None));
        let mut bus = EventBus::new();
        let s = Rc::clone(&seen);
        bus.subscribe(Signal::System, "clock", move |e| {
            *s.borrow_mut() = Some((e.frame, e.at_ms));
            Ok(())
        });
        bus.set_clock(7, 112.0);
        bus.emit(system("t"));
        let stamped = *seen.borrow();
        assert!(matches!(stamped, Some((7, at)) if (at - 112.0).abs() < f64::EPSILON));
    }

    #[test]
    fn unrelated_signals_are_not_delivered() {
        let mut bus = EventBus::new();
        bus.subscribe(Signal::Birth, "births", |_| Err(HandlerError::failed("nope")));
        let report = bus.emit(system("quiet"));
        assert_eq!(report, PublishReport::default());
    }

    #[test]
    fn clear_detaches_everything() {
        let mut bus = EventBus::new();
        bus.subscribe(Signal::Birth, "a", |_| Ok(()));
        bus.subscribe(Signal::Death, "a", |_| Ok(()));
        bus.subscribe(Signal::Death, "b", |_| Ok(()));
        assert_eq!(bus.unsubscribe_owner("a"), 2);
        assert_eq!(bus.total_subscribers(), 1);
        bus.clear();
        assert_eq!(bus.total_subscribers(), 0);
    }
}

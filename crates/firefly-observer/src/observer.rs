//! Attaching observer subsystems to the event bus.
//!
//! An observer is shared between the engine (which reads it) and the bus
//! (which feeds it), so it lives behind `Rc<RefCell<_>>`. [`attach`]
//! subscribes one handler per signal the observer declares, all under the
//! observer's name so they can be detached together.

use std::cell::RefCell;
use std::rc::Rc;

use firefly_events::{EventBus, HandlerError, SimEvent, Signal, SubscriptionId};
use tracing::debug;

use crate::error::ObserverError;

/// A subsystem fed by lifecycle notifications.
pub trait Observer {
    /// Subscription owner name.
    fn name(&self) -> &'static str;

    /// Signals this observer wants.
    fn signals(&self) -> &'static [Signal];

    /// Process one event.
    fn handle(&mut self, event: &SimEvent) -> Result<(), ObserverError>;
}

/// An observer shared between the engine and the bus.
pub type Shared<O> = Rc<RefCell<O>>;

/// Wrap an observer for sharing.
pub fn shared<O: Observer>(observer: O) -> Shared<O> {
    Rc::new(RefCell::new(observer))
}

/// Subscribe `observer` to every signal it declares, after any handlers
/// already registered.
pub fn attach<O: Observer + 'static>(observer: &Shared<O>, bus: &mut EventBus) -> Vec<SubscriptionId> {
    let (name, signals) = {
        let inner = observer.borrow();
        (inner.name(), inner.signals())
    };
    let ids: Vec<SubscriptionId> = signals
        .iter()
        .map(|&signal| {
            let target = Rc::clone(observer);
            bus.subscribe(signal, name, move |event| {
                let mut inner = target
                    .try_borrow_mut()
                    .map_err(|_borrowed| HandlerError::failed(ObserverError::Busy(name).to_string()))?;
                inner
                    .handle(event)
                    .map_err(|err| HandlerError::failed(err.to_string()))
            })
        })
        .collect();
    debug!(observer = name, subscriptions = ids.len(), "Observer attached");
    ids
}

#[cfg(test)]
mod tests {
    use firefly_events::EventKind;

    use super::*;

    #[derive(Default)]
    struct Counter {
        seen: usize,
        fail: bool,
    }

    impl Observer for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn signals(&self) -> &'static [Signal] {
            &[Signal::System, Signal::EventEnd]
        }

        fn handle(&mut self, _event: &SimEvent) -> Result<(), ObserverError> {
            self.seen += 1;
            if self.fail {
                return Err(ObserverError::Audio("boom".to_owned()));
            }
            Ok(())
        }
    }

    #[test]
    fn attaches_one_subscription_per_signal() {
        let mut bus = EventBus::new();
        let counter = shared(Counter::default());
        let ids = attach(&counter, &mut bus);
        assert_eq!(ids.len(), 2);
        assert_eq!(bus.unsubscribe_owner("counter"), 2);
    }

    #[test]
    fn handler_errors_are_reported_not_raised() {
        let mut bus = EventBus::new();
        let counter = shared(Counter {
            fail: true,
            ..Counter::default()
        });
        let _ = attach(&counter, &mut bus);
        let report = bus.emit(EventKind::System {
            message: "hello".to_owned(),
        });
        assert_eq!(report.failed, 1);
        assert_eq!(counter.borrow().seen, 1);
    }
}

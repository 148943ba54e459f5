//! Fault isolation across subscribers bound to the same signal.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::cell::RefCell;
use std::rc::Rc;

use firefly_events::{EventBus, EventKind, HandlerError, Signal};

fn counter(bus: &mut EventBus, owner: &str, hits: &Rc<RefCell<Vec<String>>>) {
    let hits = Rc::clone(hits);
    let label = owner.to_owned();
    bus.subscribe(Signal::System, owner, move |_| {
        hits.borrow_mut().push(label.clone());
        Ok(())
    });
}

fn fire(bus: &mut EventBus) -> firefly_events::PublishReport {
    bus.emit(EventKind::System {
        message: "tick".to_owned(),
    })
}

#[test]
fn panicking_middle_handler_does_not_block_siblings() {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let mut bus = EventBus::new();
    counter(&mut bus, "first", &hits);
    bus.subscribe(Signal::System, "middle", |_| panic!("observer exploded"));
    counter(&mut bus, "third", &hits);

    let report = fire(&mut bus);

    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(*hits.borrow(), vec!["first".to_owned(), "third".to_owned()]);
}

#[test]
fn erroring_middle_handler_does_not_block_siblings() {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let mut bus = EventBus::new();
    counter(&mut bus, "first", &hits);
    bus.subscribe(Signal::System, "middle", |_| {
        Err(HandlerError::failed("storage offline"))
    });
    counter(&mut bus, "third", &hits);

    for _ in 0..3 {
        let report = fire(&mut bus);
        assert_eq!(report.failed, 1);
    }

    assert_eq!(hits.borrow().len(), 6);
    assert_eq!(bus.failures(), 3);
    assert_eq!(bus.published(), 3);
}

#[test]
fn n_observers_yield_n_invocations() {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let mut bus = EventBus::new();
    for i in 0..5 {
        counter(&mut bus, &format!("obs-{i}"), &hits);
    }
    let report = fire(&mut bus);
    assert_eq!(report.delivered, 5);
    assert_eq!(hits.borrow().len(), 5);
    assert_eq!(hits.borrow().first().unwrap(), "obs-0");
    assert_eq!(hits.borrow().last().unwrap(), "obs-4");
}

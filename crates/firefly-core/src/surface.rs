//! Mount surface abstraction.
//!
//! The engine does not draw. It attaches named layers to a caller-supplied
//! [`MountSurface`] when mounted and detaches every one of them on
//! teardown. [`HeadlessSurface`] keeps the layers in memory, which is all
//! the binary and the tests need.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;

/// Opaque handle to an attached layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ElementHandle(u64);

impl ElementHandle {
    /// Raw handle value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// What a layer shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "layer", content = "name")]
pub enum Layer {
    /// The simulation canvas.
    Root,
    /// An observer's overlay panel.
    Overlay(String),
}

/// A container the engine renders into.
pub trait MountSurface: std::fmt::Debug {
    /// Attach a layer and return its handle.
    fn attach(&mut self, layer: Layer) -> ElementHandle;

    /// Remove a layer. Returns `false` for an unknown handle.
    fn detach(&mut self, handle: ElementHandle) -> bool;

    /// Number of attached layers.
    fn element_count(&self) -> usize;
}

#[derive(Debug, Default)]
struct HeadlessState {
    next: u64,
    layers: BTreeMap<ElementHandle, Layer>,
}

/// In-memory surface. Clones share state, so a test can keep one clone
/// and inspect it after the engine has been destroyed.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessSurface {
    /// Empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// The layers currently attached, in attachment order.
    pub fn layers(&self) -> Vec<Layer> {
        self.state.borrow().layers.values().cloned().collect()
    }
}

impl MountSurface for HeadlessSurface {
    fn attach(&mut self, layer: Layer) -> ElementHandle {
        let mut state = self.state.borrow_mut();
        state.next = state.next.saturating_add(1);
        let handle = ElementHandle(state.next);
        state.layers.insert(handle, layer);
        handle
    }

    fn detach(&mut self, handle: ElementHandle) -> bool {
        self.state.borrow_mut().layers.remove(&handle).is_some()
    }

    fn element_count(&self) -> usize {
        self.state.borrow().layers.len()
    }
}

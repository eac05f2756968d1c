//! Document-level scroll listener registry.
//!
//! Listeners are attached through [`ScrollListeners::subscribe`], which hands
//! back a [`ScrollSubscription`]. Dropping the subscription detaches the
//! listener, so a listener can never outlive its owner.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// Where a scroll event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOrigin {
    /// The document itself scrolled
    Document,
    /// A nested scrollable container scrolled. Scroll events do not bubble,
    /// so only capture listeners observe these.
    Nested,
}

/// Listener phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capture,
    Bubble,
}

type Callback = Box<dyn FnMut()>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<u64, (Phase, Callback)>,
}

/// Shared handle to the scroll listeners of one document.
#[derive(Clone, Default)]
pub struct ScrollListeners {
    inner: Rc<RefCell<Registry>>,
}

impl std::fmt::Debug for ScrollListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollListeners")
            .field("active", &self.active())
            .finish()
    }
}

impl ScrollListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener. It stays attached until the returned subscription
    /// is dropped.
    ///
    /// Callbacks must not subscribe or unsubscribe while they run.
    #[must_use = "dropping the subscription detaches the listener"]
    pub fn subscribe(&self, phase: Phase, callback: impl FnMut() + 'static) -> ScrollSubscription {
        let mut registry = self.inner.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, (phase, Box::new(callback)));
        ScrollSubscription {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    /// Deliver a scroll event. Returns how many listeners ran.
    pub fn dispatch(&self, origin: ScrollOrigin) -> usize {
        let mut registry = self.inner.borrow_mut();
        let mut delivered = 0;
        for (phase, callback) in registry.listeners.values_mut() {
            if origin == ScrollOrigin::Nested && *phase != Phase::Capture {
                continue;
            }
            callback();
            delivered += 1;
        }
        delivered
    }

    /// Number of attached listeners.
    pub fn active(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

/// Guard for an attached listener.
#[derive(Debug)]
pub struct ScrollSubscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Drop for ScrollSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().listeners.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_drop_detaches() {
        let listeners = ScrollListeners::new();
        let hits = Rc::new(Cell::new(0));

        let counter = hits.clone();
        let subscription = listeners.subscribe(Phase::Capture, move || counter.set(counter.get() + 1));
        assert_eq!(listeners.active(), 1);
        assert_eq!(listeners.dispatch(ScrollOrigin::Document), 1);

        drop(subscription);
        assert_eq!(listeners.active(), 0);
        assert_eq!(listeners.dispatch(ScrollOrigin::Document), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_nested_scroll_reaches_capture_only() {
        let listeners = ScrollListeners::new();
        let captured = Rc::new(Cell::new(false));
        let bubbled = Rc::new(Cell::new(false));

        let c = captured.clone();
        let _capture = listeners.subscribe(Phase::Capture, move || c.set(true));
        let b = bubbled.clone();
        let _bubble = listeners.subscribe(Phase::Bubble, move || b.set(true));

        assert_eq!(listeners.dispatch(ScrollOrigin::Nested), 1);
        assert!(captured.get());
        assert!(!bubbled.get());
    }

    #[test]
    fn test_subscription_outliving_registry() {
        let listeners = ScrollListeners::new();
        let subscription = listeners.subscribe(Phase::Bubble, || {});
        drop(listeners);
        drop(subscription);
    }
}

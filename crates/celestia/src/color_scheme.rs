//! OS-level color scheme preference (`prefers-color-scheme: dark`).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

/// Callback invoked with the new "prefers dark" state.
pub type SchemeCallback = Box<dyn Fn(bool)>;

/// Source of the OS dark-mode preference and its changes.
pub trait ColorSchemeSource {
    /// Whether the OS currently prefers a dark color scheme.
    fn prefers_dark(&self) -> bool;

    /// Register `callback` for changes. The callback stays registered until
    /// the returned guard is dropped.
    fn subscribe(&self, callback: SchemeCallback) -> Subscription;
}

/// Drop guard for a [`ColorSchemeSource::subscribe`] registration.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Guard that runs `cancel` when dropped.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Guard with nothing to tear down.
    pub fn noop() -> Self {
        Self { cancel: None }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[derive(Default)]
struct SimulatedState {
    dark: bool,
    next_id: u64,
    listeners: BTreeMap<u64, Rc<dyn Fn(bool)>>,
}

/// Color scheme whose preference is set by the host.
///
/// Native hosts use it with whatever platform signal they have; tests use it
/// to simulate the OS switching modes.
#[derive(Clone, Default)]
pub struct SimulatedColorScheme {
    state: Rc<RefCell<SimulatedState>>,
}

impl fmt::Debug for SimulatedColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SimulatedColorScheme")
            .field("dark", &state.dark)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl SimulatedColorScheme {
    pub fn new(prefers_dark: bool) -> Self {
        let scheme = Self::default();
        scheme.state.borrow_mut().dark = prefers_dark;
        scheme
    }

    /// Change the preference and notify listeners if it changed.
    pub fn set_prefers_dark(&self, dark: bool) {
        let listeners: Vec<Rc<dyn Fn(bool)>> = {
            let mut state = self.state.borrow_mut();
            if state.dark == dark {
                return;
            }
            state.dark = dark;
            state.listeners.values().cloned().collect()
        };
        debug!(scheme.dark = dark, listeners = listeners.len(), "Color scheme changed");
        for listener in listeners {
            listener(dark);
        }
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

impl ColorSchemeSource for SimulatedColorScheme {
    fn prefers_dark(&self) -> bool {
        self.state.borrow().dark
    }

    fn subscribe(&self, callback: SchemeCallback) -> Subscription {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.listeners.insert(id, Rc::from(callback));
            id
        };
        let weak = Rc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().listeners.remove(&id);
            }
        })
    }
}

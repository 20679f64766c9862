//! Attribute-selector → handler dispatch table.
//!
//! Markup declares behavior through attributes (`data-theme-toggle`,
//! `data-modal-open`, ...). Instead of every controller installing its own
//! delegated document listener, the host builds one [`ActionRegistry`] at
//! startup and routes every DOM event through [`ActionRegistry::dispatch`].

use std::fmt;

use tracing::{debug, trace};

use crate::dom::{Dom, Selector};

/// Kind of a [`UiEvent`], used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Change,
    Input,
    FocusOut,
    Submit,
    KeyDown,
    Resize,
    Scroll,
    AnimationEnd,
}

/// A DOM event, reduced to what the controllers read.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Click,
    Change,
    Input,
    FocusOut,
    Submit,
    KeyDown { key: String },
    /// Window resize; carries the new viewport width.
    Resize { width: f64 },
    /// Window scroll; carries the new vertical offset.
    Scroll { y: f64 },
    AnimationEnd,
}

impl UiEvent {
    pub fn key_down(key: impl Into<String>) -> Self {
        Self::KeyDown { key: key.into() }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Click => EventKind::Click,
            Self::Change => EventKind::Change,
            Self::Input => EventKind::Input,
            Self::FocusOut => EventKind::FocusOut,
            Self::Submit => EventKind::Submit,
            Self::KeyDown { .. } => EventKind::KeyDown,
            Self::Resize { .. } => EventKind::Resize,
            Self::Scroll { .. } => EventKind::Scroll,
            Self::AnimationEnd => EventKind::AnimationEnd,
        }
    }

    /// Key name for `KeyDown` events.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::KeyDown { key } => Some(key),
            _ => None,
        }
    }
}

/// What a handler asks of the host after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    #[default]
    Continue,
    /// Suppress the browser's default action (navigation, submission).
    PreventDefault,
}

/// Everything a handler sees.
#[derive(Debug)]
pub struct EventContext<'a, D: Dom> {
    pub event: &'a UiEvent,
    /// Element the event fired on; `None` for window events.
    pub target: Option<&'a D::Node>,
    /// Element matched by the binding's selector (the target or an
    /// ancestor); `None` for global bindings.
    pub matched: Option<&'a D::Node>,
    /// Host clock in milliseconds.
    pub now_ms: f64,
}

type Handler<D> = Box<dyn Fn(&EventContext<'_, D>) -> Propagation>;

struct Binding<D: Dom> {
    name: &'static str,
    kind: EventKind,
    selector: Option<Selector>,
    handler: Handler<D>,
}

/// Result of [`ActionRegistry::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    /// Number of handlers that ran.
    pub handled: usize,
    pub default_prevented: bool,
}

/// Ordered table of event bindings.
pub struct ActionRegistry<D: Dom> {
    dom: D,
    bindings: Vec<Binding<D>>,
}

impl<D: Dom> fmt::Debug for ActionRegistry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field(
                "bindings",
                &self.bindings.iter().map(|b| b.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<D: Dom> ActionRegistry<D> {
    pub fn new(dom: D) -> Self {
        Self {
            dom,
            bindings: Vec::new(),
        }
    }

    /// Bind `handler` to `kind` events whose target is, or sits inside, an
    /// element matching `selector`.
    pub fn on<F>(&mut self, name: &'static str, kind: EventKind, selector: Selector, handler: F) -> &mut Self
    where
        F: Fn(&EventContext<'_, D>) -> Propagation + 'static,
    {
        self.bindings.push(Binding {
            name,
            kind,
            selector: Some(selector),
            handler: Box::new(handler),
        });
        self
    }

    /// Bind `handler` to every `kind` event regardless of target.
    pub fn on_global<F>(&mut self, name: &'static str, kind: EventKind, handler: F) -> &mut Self
    where
        F: Fn(&EventContext<'_, D>) -> Propagation + 'static,
    {
        self.bindings.push(Binding {
            name,
            kind,
            selector: None,
            handler: Box::new(handler),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Names of bindings for `kind`, in dispatch order.
    pub fn names_for(&self, kind: EventKind) -> Vec<&'static str> {
        self.bindings
            .iter()
            .filter(|b| b.kind == kind)
            .map(|b| b.name)
            .collect()
    }

    /// Run every matching binding in registration order.
    pub fn dispatch(&self, event: &UiEvent, target: Option<&D::Node>, now_ms: f64) -> Outcome {
        let kind = event.kind();
        let mut outcome = Outcome::default();
        for binding in self.bindings.iter().filter(|b| b.kind == kind) {
            let matched = match (&binding.selector, target) {
                (None, _) => None,
                (Some(selector), Some(target)) => match self.dom.closest(target, selector) {
                    Some(node) => Some(node),
                    None => continue,
                },
                (Some(_), None) => continue,
            };
            let context = EventContext {
                event,
                target,
                matched: matched.as_ref(),
                now_ms,
            };
            trace!(binding = binding.name, event = ?kind, "Dispatching");
            if (binding.handler)(&context) == Propagation::PreventDefault {
                outcome.default_prevented = true;
            }
            outcome.handled += 1;
        }
        if outcome.handled > 0 {
            debug!(
                event = ?kind,
                handled = outcome.handled,
                prevented = outcome.default_prevented,
                "Event dispatched"
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_dom::MemoryDom;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_event_kind_and_key() {
        assert_eq!(UiEvent::key_down("Escape").kind(), EventKind::KeyDown);
        assert_eq!(UiEvent::key_down("Escape").key(), Some("Escape"));
        assert_eq!(UiEvent::Click.key(), None);
        assert_eq!(UiEvent::Resize { width: 10.0 }.kind(), EventKind::Resize);
    }

    #[test]
    fn test_dispatch_matches_ancestor() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let button = dom.element("button").attr("data-go", "").child_of(&body);
        let icon = dom.element("span").child_of(&button);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut registry = ActionRegistry::new(dom.clone());
        registry.on("go", EventKind::Click, Selector::attr("data-go"), move |ctx| {
            sink.borrow_mut().push(*ctx.matched.unwrap());
            Propagation::PreventDefault
        });

        let outcome = registry.dispatch(&UiEvent::Click, Some(&icon), 0.0);
        assert_eq!(outcome.handled, 1);
        assert!(outcome.default_prevented);
        assert_eq!(*seen.borrow(), vec![button]);

        let outcome = registry.dispatch(&UiEvent::Click, Some(&body), 0.0);
        assert_eq!(outcome, Outcome::default());
    }

    #[test]
    fn test_dispatch_filters_by_kind_and_keeps_order() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ActionRegistry::new(dom.clone());
        for name in ["first", "second"] {
            let sink = Rc::clone(&order);
            registry.on_global(name, EventKind::KeyDown, move |_| {
                sink.borrow_mut().push(name);
                Propagation::Continue
            });
        }
        registry.on("click", EventKind::Click, Selector::tag("body"), |_| Propagation::Continue);

        let outcome = registry.dispatch(&UiEvent::key_down("a"), Some(&body), 0.0);
        assert_eq!(outcome.handled, 2);
        assert!(!outcome.default_prevented);
        assert_eq!(*order.borrow(), vec!["first", "second"]);
        assert_eq!(registry.names_for(EventKind::KeyDown), vec!["first", "second"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_selector_bindings_skip_window_events() {
        let dom = MemoryDom::new();
        let mut registry = ActionRegistry::new(dom);
        registry.on("any", EventKind::Resize, Selector::tag("html"), |_| Propagation::Continue);
        let outcome = registry.dispatch(&UiEvent::Resize { width: 800.0 }, None, 0.0);
        assert_eq!(outcome.handled, 0);
    }
}

//! Browser event listeners and the timer interval feeding a [`Celestia`]
//! host.

use std::rc::Rc;

use celestia::registry::UiEvent;
use celestia::Celestia;
use tracing::{debug, trace};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, Event, EventTarget, KeyboardEvent, Window};

use crate::dom::BrowserDom;

/// Timer resolution for toast, modal and resize deadlines.
pub const TICK_INTERVAL_MS: i32 = 50;

const DOCUMENT_EVENTS: [&str; 7] = [
    "click",
    "change",
    "input",
    "focusout",
    "submit",
    "keydown",
    "animationend",
];
const WINDOW_EVENTS: [&str; 2] = ["resize", "scroll"];

type Host = Rc<Celestia<BrowserDom>>;

struct Listener {
    target: EventTarget,
    name: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

/// Owns every listener registered for one host. Dropping it removes them
/// and stops the timer.
pub struct EventBridge {
    window: Window,
    listeners: Vec<Listener>,
    interval: Option<(i32, Closure<dyn FnMut()>)>,
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field(
                "listeners",
                &self.listeners.iter().map(|l| l.name).collect::<Vec<_>>(),
            )
            .field("interval", &self.interval.as_ref().map(|(id, _)| *id))
            .finish()
    }
}

impl EventBridge {
    /// Listen on the document and window and start the timer.
    ///
    /// # Errors
    /// Returns the browser's exception if a listener or the interval cannot
    /// be registered. Anything registered before the failure is removed.
    pub fn attach(dom: &BrowserDom, host: &Host) -> Result<Self, JsValue> {
        let mut bridge = Self {
            window: dom.window().clone(),
            listeners: Vec::new(),
            interval: None,
        };
        let document: EventTarget = dom.document().clone().into();
        let window: EventTarget = dom.window().clone().into();
        for name in DOCUMENT_EVENTS {
            bridge.listen(&document, name, host)?;
        }
        for name in WINDOW_EVENTS {
            bridge.listen(&window, name, host)?;
        }

        let ticking = Rc::clone(host);
        let clock = dom.window().clone();
        let tick = Closure::<dyn FnMut()>::new(move || ticking.tick(now(&clock)));
        let id = dom
            .window()
            .set_interval_with_callback_and_timeout_and_arguments_0(
                tick.as_ref().unchecked_ref(),
                TICK_INTERVAL_MS,
            )?;
        bridge.interval = Some((id, tick));
        debug!(listeners = bridge.listeners.len(), "Event bridge attached");
        Ok(bridge)
    }

    fn listen(&mut self, target: &EventTarget, name: &'static str, host: &Host) -> Result<(), JsValue> {
        let host = Rc::clone(host);
        let window = self.window.clone();
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(ui_event) = to_ui_event(name, &event, &window) else {
                return;
            };
            let target = event.target().and_then(|t| t.dyn_into::<Element>().ok());
            let outcome = host.dispatch(&ui_event, target.as_ref(), now(&window));
            if outcome.default_prevented {
                trace!(event = name, "Preventing default");
                event.prevent_default();
            }
        });
        target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
        self.listeners.push(Listener {
            target: target.clone(),
            name,
            closure,
        });
        Ok(())
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        for listener in self.listeners.drain(..) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.name,
                listener.closure.as_ref().unchecked_ref(),
            );
        }
        if let Some((id, _closure)) = self.interval.take() {
            self.window.clear_interval_with_handle(id);
        }
        debug!("Event bridge detached");
    }
}

/// Host clock in milliseconds.
pub fn now(window: &Window) -> f64 {
    window
        .performance()
        .map_or_else(js_sys::Date::now, |performance| performance.now())
}

fn to_ui_event(name: &str, event: &Event, window: &Window) -> Option<UiEvent> {
    let ui_event = match name {
        "click" => UiEvent::Click,
        "change" => UiEvent::Change,
        "input" => UiEvent::Input,
        "focusout" => UiEvent::FocusOut,
        "submit" => UiEvent::Submit,
        "animationend" => UiEvent::AnimationEnd,
        "keydown" => UiEvent::key_down(event.dyn_ref::<KeyboardEvent>()?.key()),
        "resize" => UiEvent::Resize {
            width: window
                .inner_width()
                .ok()
                .and_then(|w| w.as_f64())
                .unwrap_or(0.0),
        },
        "scroll" => UiEvent::Scroll {
            y: window.scroll_y().unwrap_or(0.0),
        },
        _ => return None,
    };
    Some(ui_event)
}

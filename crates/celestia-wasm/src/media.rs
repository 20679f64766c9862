//! `prefers-color-scheme` through `window.matchMedia`.

use celestia::color_scheme::{ColorSchemeSource, SchemeCallback, Subscription};
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{MediaQueryList, MediaQueryListEvent, Window};

use crate::storage::describe;

const DARK_QUERY: &str = "(prefers-color-scheme: dark)";

/// OS color scheme as reported by the browser. Without `matchMedia` the
/// scheme reads as light and never changes.
#[derive(Debug, Clone)]
pub struct MediaQueryScheme {
    query: Option<MediaQueryList>,
}

impl MediaQueryScheme {
    pub fn new(window: &Window) -> Self {
        let query = match window.match_media(DARK_QUERY) {
            Ok(query) => query,
            Err(err) => {
                debug!(error = %describe(&err), "matchMedia unavailable");
                None
            }
        };
        Self { query }
    }
}

impl ColorSchemeSource for MediaQueryScheme {
    fn prefers_dark(&self) -> bool {
        self.query.as_ref().is_some_and(MediaQueryList::matches)
    }

    fn subscribe(&self, callback: SchemeCallback) -> Subscription {
        let Some(query) = self.query.clone() else {
            return Subscription::noop();
        };
        let closure = Closure::<dyn FnMut(MediaQueryListEvent)>::new(move |event: MediaQueryListEvent| {
            callback(event.matches());
        });
        if let Err(err) =
            query.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref())
        {
            debug!(error = %describe(&err), "Cannot listen for color scheme changes");
            return Subscription::noop();
        }
        Subscription::new(move || {
            let _ = query
                .remove_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
        })
    }
}

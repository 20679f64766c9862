//! # celestia-wasm
//!
//! Browser bindings for celestia, compiled to WebAssembly.
//!
//! Mounting a [`CelestiaApp`] connects every controller to the live page:
//! theme toggles and radios, form validation, toasts, modals, the mobile
//! menu, chat panels and the small widgets are all driven from document
//! and window event listeners.
//!
//! ## Quick Start (JavaScript)
//!
//! ```javascript
//! import init, { CelestiaApp } from 'celestia-wasm';
//!
//! await init();
//!
//! const app = new CelestiaApp(JSON.stringify({ toast: { duration_ms: 3000 } }));
//!
//! window.addEventListener('themechange', (e) => console.log(e.detail.theme));
//! app.toast('Saved', 'success');
//! app.confirm({ message: 'Delete this item?', onConfirm: () => remove() });
//! ```
//!
//! ## Available APIs
//!
//! - `new CelestiaApp(configJson?)` - Mount on the current page
//! - `setTheme(name)`, `toggleTheme()`, `theme()`, `effectiveTheme()`
//! - `toast(message, kind?, durationMs?)`
//! - `openModal(id)`, `closeModal(id)`, `confirm(options)`, `alert(message, title?)`
//! - `validateForm(form)`, `validateField(field)`
//! - `refresh()`, `dispose()`

#![forbid(unsafe_code)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::new_without_default)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

// Use wee_alloc for smaller binaries (optional)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

pub mod console;
pub mod dom;
pub mod events;
pub mod media;
pub mod storage;

use std::rc::Rc;

use celestia::config::CelestiaConfig;
use celestia::modal::{AlertOptions, ConfirmOptions};
use celestia::theme::{ListenerId, ThemePreference};
use celestia::toast::ToastKind;
use celestia::Celestia;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, CustomEventInit, Element, Window};

pub use dom::BrowserDom;
pub use events::EventBridge;
pub use media::MediaQueryScheme;
pub use storage::LocalStorage;

/// Event dispatched on `window` after every theme switch.
pub const THEME_CHANGE_EVENT: &str = "themechange";

/// Initialize the module: panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    console::init_logging("info");
}

/// Module version information.
#[must_use]
#[wasm_bindgen(js_name = "version")]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Set the console log level: `off`, `error`, `warn`, `info`, `debug`,
/// `trace`, or directives like `celestia=debug,warn`. Returns whether the
/// filter was applied.
#[wasm_bindgen(js_name = "setLogLevel")]
pub fn set_log_level(level: &str) -> bool {
    console::set_level(level)
}

/// A mounted celestia host.
#[wasm_bindgen]
pub struct CelestiaApp {
    host: Rc<Celestia<BrowserDom>>,
    window: Window,
    bridge: Option<EventBridge>,
    theme_listener: Option<ListenerId>,
}

#[wasm_bindgen]
impl CelestiaApp {
    /// Mount on the current page with optional JSON configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<CelestiaApp, JsValue> {
        let config = match config.as_deref().map(str::trim) {
            Some(json) if !json.is_empty() => {
                CelestiaConfig::from_json(json).map_err(|err| JsError::new(&err.to_string()))?
            }
            _ => CelestiaConfig::default(),
        };

        let dom = BrowserDom::new()?;
        let window = dom.window().clone();
        let host = Rc::new(
            Celestia::new(
                dom.clone(),
                Rc::new(LocalStorage::new(window.clone())),
                Rc::new(MediaQueryScheme::new(&window)),
                config,
            )
            .map_err(|err| JsError::new(&err.to_string()))?,
        );

        let emitter = window.clone();
        let theme_config = host.config().theme.clone();
        let theme_listener = host.theme().on_change(move |preference| {
            emit_theme_change(&emitter, theme_config.id_for(preference));
        });

        let bridge = EventBridge::attach(&dom, &host)?;
        info!(version = env!("CARGO_PKG_VERSION"), "Celestia mounted");
        Ok(Self {
            host,
            window,
            bridge: Some(bridge),
            theme_listener: Some(theme_listener),
        })
    }

    /// Switch theme. Accepts `light`, `dark`, `system` or a configured
    /// theme id.
    #[wasm_bindgen(js_name = "setTheme")]
    pub fn set_theme(&self, name: &str) -> Result<(), JsValue> {
        let config = &self.host.config().theme;
        let preference = config
            .parse(name)
            .or_else(|| match name.trim().to_ascii_lowercase().as_str() {
                "light" => Some(ThemePreference::Light),
                "dark" => Some(ThemePreference::Dark),
                "system" | "auto" => Some(ThemePreference::System),
                _ => None,
            })
            .ok_or_else(|| JsValue::from_str(&format!("unknown theme {name:?}")))?;
        self.host.theme().set_theme(preference);
        Ok(())
    }

    #[wasm_bindgen(js_name = "toggleTheme")]
    pub fn toggle_theme(&self) {
        self.host.theme().toggle();
    }

    /// Stored preference id (a theme id or `system`).
    pub fn theme(&self) -> String {
        let preference = self.host.theme().current();
        self.host.config().theme.id_for(preference).to_string()
    }

    /// Theme id actually rendered.
    #[wasm_bindgen(js_name = "effectiveTheme")]
    pub fn effective_theme(&self) -> String {
        let effective = self.host.theme().effective();
        self.host.config().theme.effective_id(effective).to_string()
    }

    /// Show a toast. `kind` is `success`, `error`, `warning` or `info`;
    /// a `durationMs` of 0 keeps it until dismissed.
    pub fn toast(&self, message: &str, kind: Option<String>, duration_ms: Option<f64>) -> bool {
        let kind = kind.as_deref().map(ToastKind::parse_lossy).unwrap_or_default();
        let duration = duration_ms
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| ms.round() as u64);
        self.host
            .toasts()
            .show(message, kind, duration, self.now())
            .is_some()
    }

    #[wasm_bindgen(js_name = "openModal")]
    pub fn open_modal(&self, id: &str) -> bool {
        self.host.modals().open(id)
    }

    #[wasm_bindgen(js_name = "closeModal")]
    pub fn close_modal(&self, id: &str) -> bool {
        self.host.modals().close(id, self.now())
    }

    /// Open a confirm dialog. `options` may set `title`, `message`,
    /// `confirmText`, `cancelText`, `onConfirm` and `onCancel`.
    pub fn confirm(&self, options: &JsValue) -> bool {
        let defaults = ConfirmOptions::default();
        let text = |key: &str, fallback: String| read_string(options, key).unwrap_or(fallback);
        let confirm_options = ConfirmOptions {
            title: text("title", defaults.title),
            message: text("message", defaults.message),
            confirm_text: text("confirmText", defaults.confirm_text),
            cancel_text: text("cancelText", defaults.cancel_text),
        };
        let on_confirm = read_function(options, "onConfirm");
        let on_cancel = read_function(options, "onCancel");
        self.host
            .modals()
            .confirm(
                &confirm_options,
                move || call(on_confirm.as_ref()),
                move || call(on_cancel.as_ref()),
            )
            .is_some()
    }

    /// Open an alert dialog. The promise resolves when it closes.
    pub fn alert(&self, message: &str, title: Option<String>) -> js_sys::Promise {
        let mut options = AlertOptions::new(message);
        if let Some(title) = title {
            options.title = title;
        }
        let host = Rc::clone(&self.host);
        js_sys::Promise::new(&mut |resolve, _reject| {
            let shown = host
                .modals()
                .alert(&options, move || call(Some(&resolve)))
                .is_some();
            if !shown {
                warn!("Cannot show alert without a document body");
            }
        })
    }

    /// Validate every field in `form` with errors revealed.
    #[wasm_bindgen(js_name = "validateForm")]
    pub fn validate_form(&self, form: &Element) -> bool {
        self.host.validation().validate_form(form)
    }

    /// Validate one field with errors revealed.
    #[wasm_bindgen(js_name = "validateField")]
    pub fn validate_field(&self, field: &Element) -> bool {
        self.host.validation().validate_field(field, true).is_valid()
    }

    /// Re-sync navbar, range readouts and theme controls after the page
    /// swapped in new markup.
    pub fn refresh(&self) {
        self.host.refresh();
        self.host.chat_panels().update_overlay();
    }

    /// Remove every listener and stop following the OS color scheme.
    pub fn dispose(&mut self) {
        self.bridge = None;
        if let Some(id) = self.theme_listener.take() {
            self.host.theme().remove_listener(id);
        }
        self.host.dispose();
    }
}

impl CelestiaApp {
    fn now(&self) -> f64 {
        events::now(&self.window)
    }
}

fn emit_theme_change(window: &Window, theme: &str) {
    let detail = js_sys::Object::new();
    if js_sys::Reflect::set(&detail, &JsValue::from_str("theme"), &JsValue::from_str(theme)).is_err() {
        return;
    }
    let init = CustomEventInit::new();
    init.set_detail(&detail);
    match CustomEvent::new_with_event_init_dict(THEME_CHANGE_EVENT, &init) {
        Ok(event) => {
            let _ = window.dispatch_event(&event);
        }
        Err(err) => warn!(error = %storage::describe(&err), "Cannot create themechange event"),
    }
}

fn read_string(options: &JsValue, key: &str) -> Option<String> {
    if !options.is_object() {
        return None;
    }
    js_sys::Reflect::get(options, &JsValue::from_str(key))
        .ok()
        .and_then(|value| value.as_string())
}

fn read_function(options: &JsValue, key: &str) -> Option<js_sys::Function> {
    if !options.is_object() {
        return None;
    }
    js_sys::Reflect::get(options, &JsValue::from_str(key))
        .ok()
        .and_then(|value| value.dyn_into::<js_sys::Function>().ok())
}

fn call(function: Option<&js_sys::Function>) {
    if let Some(function) = function {
        if let Err(err) = function.call0(&JsValue::UNDEFINED) {
            warn!(error = %storage::describe(&err), "Callback threw");
        }
    }
}

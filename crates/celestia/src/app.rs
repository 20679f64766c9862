//! The [`Celestia`] host: owns every controller and routes events to them.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use celestia::prelude::*;
//!
//! let dom = MemoryDom::new();
//! let body = dom.body().unwrap();
//! let toggle = dom.element("button").attr("data-theme-toggle", "").child_of(&body);
//!
//! let app = Celestia::new(
//!     dom.clone(),
//!     Rc::new(MemoryStore::new()),
//!     Rc::new(SimulatedColorScheme::new(false)),
//!     CelestiaConfig::default(),
//! )
//! .unwrap();
//!
//! let outcome = app.dispatch(&UiEvent::Click, Some(&toggle), 0.0);
//! assert!(outcome.default_prevented);
//! assert_eq!(app.theme().current(), ThemePreference::Dark);
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};

use crate::chat_panel::{self, ChatPanels};
use crate::color_scheme::ColorSchemeSource;
use crate::config::CelestiaConfig;
use crate::dom::{Dom, Selector};
use crate::error::Result;
use crate::menu::{self, MobileMenu};
use crate::modal::{self, ModalManager, modal_selector};
use crate::registry::{ActionRegistry, EventKind, Outcome, Propagation, UiEvent};
use crate::storage::PreferenceStore;
use crate::theme::{self, ThemeManager};
use crate::toast::{self, ToastStack};
use crate::validation::{ValidationEngine, field_selector};
use crate::widgets::{self, NavbarScroll, PasswordToggle, RangeDisplay};

/// Every controller for one document plus the event table that drives
/// them.
pub struct Celestia<D: Dom + Clone + 'static> {
    config: CelestiaConfig,
    theme: Rc<ThemeManager<D>>,
    validation: Rc<ValidationEngine<D>>,
    toasts: Rc<ToastStack<D>>,
    modals: Rc<ModalManager<D>>,
    menu: Rc<MobileMenu<D>>,
    chat: Rc<ChatPanels<D>>,
    navbar: Rc<NavbarScroll<D>>,
    ranges: Rc<RangeDisplay<D>>,
    registry: ActionRegistry<D>,
    disposed: Cell<bool>,
}

impl<D: Dom + Clone + 'static> fmt::Debug for Celestia<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Celestia")
            .field("theme", &self.theme)
            .field("registry", &self.registry)
            .field("disposed", &self.disposed.get())
            .finish_non_exhaustive()
    }
}

impl<D: Dom + Clone + 'static> Celestia<D> {
    /// Validate `config`, build every controller and render initial state.
    ///
    /// # Errors
    /// Returns a [`ConfigError`](crate::error::ConfigError) if the
    /// configuration is invalid.
    pub fn new(
        dom: D,
        store: Rc<dyn PreferenceStore>,
        scheme: Rc<dyn ColorSchemeSource>,
        config: CelestiaConfig,
    ) -> Result<Self> {
        config.validate()?;

        let validation = Rc::new(ValidationEngine::new(dom.clone(), config.validation.clone())?);
        let theme = Rc::new(ThemeManager::new(dom.clone(), store, scheme, config.theme.clone()));
        let toasts = Rc::new(ToastStack::new(dom.clone(), config.toast.clone()));
        let modals = Rc::new(ModalManager::new(dom.clone(), config.modal.clone()));
        let menu = Rc::new(MobileMenu::new(dom.clone()));
        let chat = Rc::new(ChatPanels::new(dom.clone(), config.chat_panel.clone()));
        let navbar = Rc::new(NavbarScroll::new(dom.clone(), config.navbar.clone()));
        let passwords = Rc::new(PasswordToggle::new(dom.clone()));
        let ranges = Rc::new(RangeDisplay::new(dom.clone()));

        let mut registry = ActionRegistry::new(dom);
        bind_theme(&mut registry, &theme);
        bind_validation(&mut registry, &validation);
        bind_toasts(&mut registry, &toasts);
        bind_modals(&mut registry, &modals);
        bind_escape(&mut registry, &modals, &menu);
        bind_menu(&mut registry, &menu);
        bind_chat(&mut registry, &chat);
        bind_widgets(&mut registry, &navbar, &passwords, &ranges);

        navbar.sync();
        ranges.sync_all();
        chat.update_overlay();

        info!(bindings = registry.len(), "Celestia started");
        Ok(Self {
            config,
            theme,
            validation,
            toasts,
            modals,
            menu,
            chat,
            navbar,
            ranges,
            registry,
            disposed: Cell::new(false),
        })
    }

    /// Route an event to every matching binding. Does nothing once
    /// disposed.
    pub fn dispatch(&self, event: &UiEvent, target: Option<&D::Node>, now_ms: f64) -> Outcome {
        if self.disposed.get() {
            return Outcome::default();
        }
        self.registry.dispatch(event, target, now_ms)
    }

    /// Fire timers due at `now_ms`: toast dismissal and removal, generated
    /// modal removal and the chat panel resize reset.
    pub fn tick(&self, now_ms: f64) {
        if self.disposed.get() {
            return;
        }
        self.toasts.advance(now_ms);
        self.modals.advance(now_ms);
        self.chat.advance(now_ms);
        self.validation.forget_detached();
    }

    /// Earliest pending timer, if any.
    pub fn next_deadline(&self) -> Option<f64> {
        [
            self.toasts.next_deadline(),
            self.modals.next_deadline(),
            self.chat.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .reduce(f64::min)
    }

    /// Re-read document state that changes without events: navbar scroll
    /// position and range readouts.
    pub fn refresh(&self) {
        self.navbar.sync();
        self.ranges.sync_all();
        self.theme.render_bound_ui();
    }

    /// Detach from the OS color scheme and stop handling events.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.theme.dispose();
        info!("Celestia disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub fn config(&self) -> &CelestiaConfig {
        &self.config
    }

    pub fn theme(&self) -> &ThemeManager<D> {
        &self.theme
    }

    pub fn validation(&self) -> &ValidationEngine<D> {
        &self.validation
    }

    pub fn toasts(&self) -> &ToastStack<D> {
        &self.toasts
    }

    pub fn modals(&self) -> &ModalManager<D> {
        &self.modals
    }

    pub fn menu(&self) -> &MobileMenu<D> {
        &self.menu
    }

    pub fn chat_panels(&self) -> &ChatPanels<D> {
        &self.chat
    }

    pub fn registry(&self) -> &ActionRegistry<D> {
        &self.registry
    }
}

impl<D: Dom + Clone + 'static> Drop for Celestia<D> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn bind_theme<D: Dom + Clone + 'static>(registry: &mut ActionRegistry<D>, theme: &Rc<ThemeManager<D>>) {
    let toggle = Rc::clone(theme);
    registry.on(
        "theme.toggle",
        EventKind::Click,
        Selector::attr(theme::TOGGLE_ATTR),
        move |_| {
            toggle.toggle();
            Propagation::PreventDefault
        },
    );

    let select = Rc::clone(theme);
    registry.on(
        "theme.select",
        EventKind::Change,
        Selector::tag("input").and(Selector::attr_eq("name", theme::RADIO_NAME)),
        move |ctx| {
            if let Some(radio) = ctx.matched {
                select.select_from(radio);
            }
            Propagation::Continue
        },
    );
}

fn bind_validation<D: Dom + Clone + 'static>(
    registry: &mut ActionRegistry<D>,
    validation: &Rc<ValidationEngine<D>>,
) {
    for (name, kind, reveal) in [
        ("validation.input", EventKind::Input, false),
        ("validation.blur", EventKind::FocusOut, true),
    ] {
        let engine = Rc::clone(validation);
        registry.on(name, kind, field_selector(), move |ctx| {
            if let Some(field) = ctx.matched {
                engine.validate_field(field, reveal);
            }
            Propagation::Continue
        });
    }

    let engine = Rc::clone(validation);
    registry.on(
        "validation.submit",
        EventKind::Submit,
        Selector::tag("form"),
        move |ctx| match ctx.matched {
            Some(form) if !engine.validate_form(form) => Propagation::PreventDefault,
            _ => Propagation::Continue,
        },
    );
}

fn bind_toasts<D: Dom + Clone + 'static>(registry: &mut ActionRegistry<D>, toasts: &Rc<ToastStack<D>>) {
    let stack = Rc::clone(toasts);
    registry.on(
        "toast.dismiss",
        EventKind::Click,
        Selector::attr(toast::DISMISS_ATTR),
        move |ctx| {
            if let Some(button) = ctx.matched {
                stack.dismiss_node(button, ctx.now_ms);
            }
            Propagation::PreventDefault
        },
    );

    let stack = Rc::clone(toasts);
    registry.on(
        "toast.finish",
        EventKind::AnimationEnd,
        Selector::class("toast-exit"),
        move |ctx| {
            if let Some(node) = ctx.matched {
                stack.finish(node);
            }
            Propagation::Continue
        },
    );
}

fn bind_modals<D: Dom + Clone + 'static>(registry: &mut ActionRegistry<D>, modals: &Rc<ModalManager<D>>) {
    let manager = Rc::clone(modals);
    registry.on(
        "modal.action",
        EventKind::Click,
        Selector::attr(modal::ACTION_ATTR),
        move |ctx| {
            if let Some(button) = ctx.matched {
                manager.handle_action(button, ctx.now_ms);
            }
            Propagation::PreventDefault
        },
    );

    let manager = Rc::clone(modals);
    registry.on(
        "modal.open",
        EventKind::Click,
        Selector::attr(modal::OPEN_ATTR),
        move |ctx| {
            if let Some(trigger) = ctx.matched {
                manager.handle_open_trigger(trigger);
            }
            Propagation::PreventDefault
        },
    );

    let manager = Rc::clone(modals);
    registry.on(
        "modal.close",
        EventKind::Click,
        Selector::attr(modal::CLOSE_ATTR),
        move |ctx| {
            if let Some(trigger) = ctx.matched {
                manager.handle_close_trigger(trigger, ctx.now_ms);
            }
            Propagation::PreventDefault
        },
    );

    let manager = Rc::clone(modals);
    registry.on("modal.backdrop", EventKind::Click, modal_selector(), move |ctx| {
        if let (Some(target), Some(dialog)) = (ctx.target, ctx.matched) {
            if target == dialog {
                manager.handle_backdrop(dialog, ctx.now_ms);
            }
        }
        Propagation::Continue
    });
}

fn bind_escape<D: Dom + Clone + 'static>(
    registry: &mut ActionRegistry<D>,
    modals: &Rc<ModalManager<D>>,
    menu: &Rc<MobileMenu<D>>,
) {
    let modals = Rc::clone(modals);
    let menu = Rc::clone(menu);
    registry.on_global("escape", EventKind::KeyDown, move |ctx| {
        if ctx.event.key() != Some("Escape") {
            return Propagation::Continue;
        }
        // Innermost layer first: an open modal sits above the menu.
        if modals.handle_escape(ctx.now_ms) || menu.handle_escape() {
            debug!("Escape closed an overlay");
            return Propagation::PreventDefault;
        }
        Propagation::Continue
    });
}

fn bind_menu<D: Dom + Clone + 'static>(registry: &mut ActionRegistry<D>, menu: &Rc<MobileMenu<D>>) {
    let toggle = Rc::clone(menu);
    registry.on(
        "menu.toggle",
        EventKind::Click,
        Selector::attr(menu::TOGGLE_ATTR),
        move |_| {
            toggle.toggle();
            Propagation::PreventDefault
        },
    );

    let close = Rc::clone(menu);
    registry.on(
        "menu.overlay",
        EventKind::Click,
        Selector::attr(menu::OVERLAY_ATTR),
        move |_| {
            close.close();
            Propagation::Continue
        },
    );
}

fn bind_chat<D: Dom + Clone + 'static>(registry: &mut ActionRegistry<D>, chat: &Rc<ChatPanels<D>>) {
    let panels = Rc::clone(chat);
    registry.on(
        "chat.toggle",
        EventKind::Click,
        Selector::attr(chat_panel::TOGGLE_ATTR),
        move |ctx| {
            if let Some(trigger) = ctx.matched {
                panels.toggle_from(trigger);
            }
            Propagation::PreventDefault
        },
    );

    let panels = Rc::clone(chat);
    registry.on(
        "chat.overlay",
        EventKind::Click,
        Selector::attr(chat_panel::OVERLAY_ATTR),
        move |_| {
            panels.close_all();
            Propagation::Continue
        },
    );

    let panels = Rc::clone(chat);
    registry.on_global("chat.resize", EventKind::Resize, move |ctx| {
        panels.handle_resize(ctx.now_ms);
        Propagation::Continue
    });
}

fn bind_widgets<D: Dom + Clone + 'static>(
    registry: &mut ActionRegistry<D>,
    navbar: &Rc<NavbarScroll<D>>,
    passwords: &Rc<PasswordToggle<D>>,
    ranges: &Rc<RangeDisplay<D>>,
) {
    let nav = Rc::clone(navbar);
    registry.on_global("navbar.scroll", EventKind::Scroll, move |ctx| {
        if let UiEvent::Scroll { y } = ctx.event {
            nav.update(*y);
        }
        Propagation::Continue
    });

    let toggle = Rc::clone(passwords);
    registry.on(
        "password.toggle",
        EventKind::Click,
        Selector::tag("button").and(Selector::attr(widgets::PASSWORD_TOGGLE_ATTR)),
        move |ctx| {
            if let Some(button) = ctx.matched {
                toggle.toggle(button);
            }
            Propagation::PreventDefault
        },
    );

    let range = Rc::clone(ranges);
    registry.on(
        "range.display",
        EventKind::Input,
        Selector::tag("input").and(Selector::attr(widgets::RANGE_DISPLAY_ATTR)),
        move |ctx| {
            if let Some(input) = ctx.matched {
                range.update(input);
            }
            Propagation::Continue
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_scheme::SimulatedColorScheme;
    use crate::memory_dom::MemoryDom;
    use crate::storage::MemoryStore;

    fn app(dom: &MemoryDom) -> Celestia<MemoryDom> {
        Celestia::new(
            dom.clone(),
            Rc::new(MemoryStore::new()),
            Rc::new(SimulatedColorScheme::new(false)),
            CelestiaConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = CelestiaConfig::default();
        config.theme.storage_key.clear();
        let result = Celestia::new(
            MemoryDom::new(),
            Rc::new(MemoryStore::new()),
            Rc::new(SimulatedColorScheme::new(false)),
            config,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_every_component_is_bound() {
        let dom = MemoryDom::new();
        let app = app(&dom);
        let clicks = app.registry().names_for(EventKind::Click);
        for name in [
            "theme.toggle",
            "toast.dismiss",
            "modal.open",
            "menu.toggle",
            "chat.toggle",
            "password.toggle",
        ] {
            assert!(clicks.contains(&name), "missing {name}");
        }
        assert_eq!(app.registry().names_for(EventKind::KeyDown), vec!["escape"]);
    }

    #[test]
    fn test_tick_and_next_deadline() {
        let dom = MemoryDom::new();
        let app = app(&dom);
        assert_eq!(app.next_deadline(), None);
        app.toasts().info("hi", 0.0);
        app.dispatch(&UiEvent::Resize { width: 500.0 }, None, 0.0);
        assert_eq!(app.next_deadline(), Some(150.0));
        app.tick(150.0);
        assert_eq!(app.next_deadline(), Some(4000.0));
    }

    #[test]
    fn test_tick_forgets_removed_fields() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let form = dom.element("form").child_of(&body);
        let email = dom
            .element("input")
            .attr("type", "email")
            .value("a@b.com")
            .child_of(&form);
        let app = app(&dom);
        app.dispatch(&UiEvent::Input, Some(&email), 0.0);
        assert_eq!(app.validation().tracked_fields(), 1);

        dom.remove(&form);
        app.tick(50.0);
        assert_eq!(app.validation().tracked_fields(), 0);
    }

    #[test]
    fn test_dispose_stops_dispatch() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let toggle = dom
            .element("button")
            .attr(theme::TOGGLE_ATTR, "")
            .child_of(&body);
        let app = app(&dom);
        app.dispose();
        assert!(app.is_disposed());
        assert!(!app.theme().is_subscribed());
        let outcome = app.dispatch(&UiEvent::Click, Some(&toggle), 0.0);
        assert_eq!(outcome.handled, 0);
    }
}

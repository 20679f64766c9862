//! Theme preference: persistence, OS reconciliation and bound UI.
//!
//! The user picks a [`ThemePreference`] (light, dark, or follow the system).
//! [`ThemeManager`] persists that choice, resolves it to an
//! [`EffectiveTheme`] using the OS color scheme, and writes the effective
//! theme id to a single attribute on the document element. Styling keys
//! off that attribute; nothing else is touched apart from the bound toggle
//! icons and radio inputs.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use celestia::color_scheme::SimulatedColorScheme;
//! use celestia::config::ThemeConfig;
//! use celestia::dom::Dom;
//! use celestia::memory_dom::MemoryDom;
//! use celestia::storage::MemoryStore;
//! use celestia::theme::{ThemeManager, ThemePreference};
//!
//! let dom = MemoryDom::new();
//! let scheme = Rc::new(SimulatedColorScheme::new(true));
//! let manager = ThemeManager::new(
//!     dom.clone(),
//!     Rc::new(MemoryStore::new()),
//!     scheme,
//!     ThemeConfig::default(),
//! );
//!
//! assert_eq!(manager.current(), ThemePreference::System);
//! let root = dom.document_element();
//! assert_eq!(dom.attribute(&root, "data-theme").as_deref(), Some("celestia-dark"));
//!
//! manager.toggle();
//! assert_eq!(manager.current(), ThemePreference::Light);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use tracing::{debug, info, trace, warn};

use crate::color_scheme::{ColorSchemeSource, Subscription};
use crate::config::ThemeConfig;
use crate::dom::{Dom, Selector};
use crate::storage::PreferenceStore;

/// Stored identifier for [`ThemePreference::System`].
pub const SYSTEM_ID: &str = "system";

/// Attribute marking a theme toggle control.
pub const TOGGLE_ATTR: &str = "data-theme-toggle";
/// Attribute marking the sun/moon icons inside a toggle.
pub const ICON_ATTR: &str = "data-theme-icon";
/// `name` shared by the theme radio inputs.
pub const RADIO_NAME: &str = "theme-radio";

/// The user's stored choice.
///
/// Persisted and emitted as the configured theme id (see
/// [`ThemeConfig::id_for`]); `Display` gives the short name for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThemePreference {
    Light,
    Dark,
    /// Follow the OS color scheme.
    #[default]
    System,
}

impl ThemePreference {
    /// Resolve to the theme actually rendered.
    pub fn resolve(self, prefers_dark: bool) -> EffectiveTheme {
        match self {
            Self::Light => EffectiveTheme::Light,
            Self::Dark => EffectiveTheme::Dark,
            Self::System if prefers_dark => EffectiveTheme::Dark,
            Self::System => EffectiveTheme::Light,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
            Self::System => write!(f, "system"),
        }
    }
}

/// The concrete theme rendered. Never "system".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectiveTheme {
    Light,
    Dark,
}

impl EffectiveTheme {
    pub fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// The explicit preference that renders as this theme.
    pub fn as_preference(self) -> ThemePreference {
        match self {
            Self::Light => ThemePreference::Light,
            Self::Dark => ThemePreference::Dark,
        }
    }
}

impl ThemeConfig {
    /// Storage/radio identifier for a preference.
    pub fn id_for(&self, preference: ThemePreference) -> &str {
        match preference {
            ThemePreference::Light => &self.light_theme,
            ThemePreference::Dark => &self.dark_theme,
            ThemePreference::System => SYSTEM_ID,
        }
    }

    /// Attribute value for an effective theme.
    pub fn effective_id(&self, theme: EffectiveTheme) -> &str {
        self.id_for(theme.as_preference())
    }

    /// Parse a stored identifier. Unknown values yield `None`.
    pub fn parse(&self, value: &str) -> Option<ThemePreference> {
        if value == self.light_theme {
            Some(ThemePreference::Light)
        } else if value == self.dark_theme {
            Some(ThemePreference::Dark)
        } else if value == SYSTEM_ID {
            Some(ThemePreference::System)
        } else {
            None
        }
    }
}

/// Identifier for a registered theme change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type ChangeListener = Rc<dyn Fn(ThemePreference)>;

struct ThemeState<D: Dom> {
    dom: D,
    store: Rc<dyn PreferenceStore>,
    scheme: Rc<dyn ColorSchemeSource>,
    config: ThemeConfig,
    current: ThemePreference,
}

impl<D: Dom> ThemeState<D> {
    fn load(&self) -> ThemePreference {
        match self.store.get(&self.config.storage_key) {
            Ok(Some(saved)) => self.config.parse(&saved).unwrap_or_else(|| {
                debug!(theme.saved = %saved, "Ignoring unrecognized stored theme");
                ThemePreference::System
            }),
            Ok(None) => ThemePreference::System,
            Err(err) => {
                warn!(error = %err, "Failed to load theme from storage");
                ThemePreference::System
            }
        }
    }

    fn effective(&self) -> EffectiveTheme {
        self.current.resolve(self.scheme.prefers_dark())
    }

    fn apply(&mut self, preference: ThemePreference) {
        let effective = preference.resolve(self.scheme.prefers_dark());
        let root = self.dom.document_element();
        self.dom.set_attribute(
            &root,
            &self.config.attribute,
            self.config.effective_id(effective),
        );
        self.current = preference;
        if let Err(err) = self
            .store
            .set(&self.config.storage_key, self.config.id_for(preference))
        {
            warn!(error = %err, "Failed to save theme to storage");
        }
        trace!(theme.preference = %preference, theme.effective = ?effective, "Theme applied");
    }

    fn render_bound_ui(&self) {
        let dom = &self.dom;
        let dark = self.effective().is_dark();
        let sun = Selector::attr_eq(ICON_ATTR, "light")
            .or(Selector::attr_eq(ICON_ATTR, self.config.light_theme.as_str()));
        let moon = Selector::attr_eq(ICON_ATTR, "dark")
            .or(Selector::attr_eq(ICON_ATTR, self.config.dark_theme.as_str()));

        // Sun shows in dark mode (click goes light), moon in light mode.
        for toggle in dom.query_all(None, &Selector::attr(TOGGLE_ATTR)) {
            for icon in dom.query_all(Some(&toggle), &sun) {
                dom.toggle_class(&icon, "hidden", !dark);
                dom.toggle_class(&icon, "block", dark);
            }
            for icon in dom.query_all(Some(&toggle), &moon) {
                dom.toggle_class(&icon, "hidden", dark);
                dom.toggle_class(&icon, "block", !dark);
            }
        }

        let current_id = self.config.id_for(self.current);
        let radios = Selector::tag("input").and(Selector::attr_eq("name", RADIO_NAME));
        for radio in dom.query_all(None, &radios) {
            dom.set_checked(&radio, dom.value(&radio) == current_id);
        }
    }
}

/// Owns the theme preference for one document.
///
/// Construction loads the stored preference, applies it, renders bound UI
/// and subscribes to OS color scheme changes. The subscription lives until
/// [`dispose`](ThemeManager::dispose) is called or the manager is dropped.
pub struct ThemeManager<D: Dom + 'static> {
    state: Rc<RefCell<ThemeState<D>>>,
    listeners: RefCell<BTreeMap<ListenerId, ChangeListener>>,
    next_listener_id: Cell<u64>,
    subscription: RefCell<Option<Subscription>>,
}

impl<D: Dom + 'static> fmt::Debug for ThemeManager<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeManager")
            .field("current", &self.current())
            .field("listeners", &self.listeners.borrow().len())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

impl<D: Dom + 'static> ThemeManager<D> {
    /// Create a manager and connect it to the document.
    pub fn new(
        dom: D,
        store: Rc<dyn PreferenceStore>,
        scheme: Rc<dyn ColorSchemeSource>,
        config: ThemeConfig,
    ) -> Self {
        let state = ThemeState {
            dom,
            store,
            scheme: Rc::clone(&scheme),
            config,
            current: ThemePreference::System,
        };
        let manager = Self {
            state: Rc::new(RefCell::new(state)),
            listeners: RefCell::new(BTreeMap::new()),
            next_listener_id: Cell::new(1),
            subscription: RefCell::new(None),
        };

        let initial = manager.load();
        manager.apply(initial);
        manager.render_bound_ui();

        let weak = Rc::downgrade(&manager.state);
        let subscription = scheme.subscribe(Box::new(move |dark| on_system_change(&weak, dark)));
        *manager.subscription.borrow_mut() = Some(subscription);
        debug!(theme.preference = %initial, "Theme manager connected");
        manager
    }

    /// Read the persisted preference, falling back to System when storage
    /// is unavailable, empty, or holds an unknown value.
    pub fn load(&self) -> ThemePreference {
        self.state.borrow().load()
    }

    /// Render `preference` and persist it. Does not notify listeners.
    pub fn apply(&self, preference: ThemePreference) {
        self.state.borrow_mut().apply(preference);
    }

    /// Flip between light and dark. From System, switch to the opposite of
    /// what the OS currently resolves to.
    pub fn toggle(&self) {
        let target = self.effective().opposite().as_preference();
        self.set_theme(target);
    }

    /// Apply, re-render and notify listeners.
    pub fn set_theme(&self, preference: ThemePreference) {
        let from = self.current();
        {
            let mut state = self.state.borrow_mut();
            state.apply(preference);
            state.render_bound_ui();
        }
        info!(theme.from = %from, theme.to = %preference, "Theme switched");
        self.notify_listeners(preference);
    }

    /// Sync toggle icons and radio inputs with the current preference.
    pub fn render_bound_ui(&self) {
        self.state.borrow().render_bound_ui();
    }

    /// Handle a change on a theme radio input. Unknown values are ignored.
    pub fn select_from(&self, node: &D::Node) {
        let value = self.state.borrow().dom.value(node);
        let parsed = self.state.borrow().config.parse(&value);
        match parsed {
            Some(preference) => self.set_theme(preference),
            None => debug!(theme.value = %value, "Ignoring unknown theme selection"),
        }
    }

    pub fn current(&self) -> ThemePreference {
        self.state.borrow().current
    }

    pub fn effective(&self) -> EffectiveTheme {
        self.state.borrow().effective()
    }

    pub fn config(&self) -> ThemeConfig {
        self.state.borrow().config.clone()
    }

    /// Register a listener called with the new preference after every
    /// [`set_theme`](ThemeManager::set_theme).
    pub fn on_change<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(ThemePreference) + 'static,
    {
        let id = ListenerId(self.next_listener_id.get());
        self.next_listener_id.set(id.0 + 1);
        self.listeners.borrow_mut().insert(id, Rc::new(callback));
        debug!(theme.listener_id = id.0, "Theme listener registered");
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        if self.listeners.borrow_mut().remove(&id).is_some() {
            debug!(theme.listener_id = id.0, "Theme listener removed");
        }
    }

    /// Stop following OS color scheme changes.
    pub fn dispose(&self) {
        if self.subscription.borrow_mut().take().is_some() {
            debug!("Theme manager disposed");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.borrow().is_some()
    }

    fn notify_listeners(&self, preference: ThemePreference) {
        let listeners: Vec<(ListenerId, ChangeListener)> = self
            .listeners
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();

        for (id, listener) in listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener(preference)));
            if result.is_err() {
                warn!(
                    theme.listener_id = id.0,
                    theme.preference = %preference,
                    "Theme listener panicked"
                );
            }
        }
    }
}

fn on_system_change<D: Dom>(state: &Weak<RefCell<ThemeState<D>>>, dark: bool) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let Ok(mut state) = state.try_borrow_mut() else {
        warn!("Skipping color scheme change during theme update");
        return;
    };
    if state.current == ThemePreference::System {
        debug!(scheme.dark = dark, "Following system color scheme");
        state.apply(ThemePreference::System);
        state.render_bound_ui();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_scheme::SimulatedColorScheme;
    use crate::memory_dom::{MemoryDom, NodeId};
    use crate::storage::{MemoryStore, UnavailableStore};

    const KEY: &str = "__CELESTIA_THEME__";

    struct Fixture {
        dom: MemoryDom,
        store: Rc<MemoryStore>,
        scheme: Rc<SimulatedColorScheme>,
        manager: ThemeManager<MemoryDom>,
    }

    fn fixture(stored: Option<&str>, os_dark: bool) -> Fixture {
        let dom = MemoryDom::new();
        let store = Rc::new(match stored {
            Some(value) => MemoryStore::with(KEY, value),
            None => MemoryStore::new(),
        });
        let scheme = Rc::new(SimulatedColorScheme::new(os_dark));
        let manager = ThemeManager::new(
            dom.clone(),
            Rc::clone(&store) as Rc<dyn PreferenceStore>,
            Rc::clone(&scheme) as Rc<dyn ColorSchemeSource>,
            ThemeConfig::default(),
        );
        Fixture {
            dom,
            store,
            scheme,
            manager,
        }
    }

    fn rendered(f: &Fixture) -> Option<String> {
        f.dom.attribute(&f.dom.document_element(), "data-theme")
    }

    #[test]
    fn test_load_recognized_values() {
        assert_eq!(fixture(Some("celestia-dark"), false).manager.current(), ThemePreference::Dark);
        assert_eq!(fixture(Some("celestia-light"), true).manager.current(), ThemePreference::Light);
        assert_eq!(fixture(Some("system"), true).manager.current(), ThemePreference::System);
    }

    #[test]
    fn test_load_falls_back_to_system() {
        assert_eq!(fixture(None, false).manager.current(), ThemePreference::System);
        assert_eq!(fixture(Some(""), false).manager.current(), ThemePreference::System);
        assert_eq!(fixture(Some("dark"), false).manager.current(), ThemePreference::System);
    }

    #[test]
    fn test_unavailable_storage_is_not_fatal() {
        let dom = MemoryDom::new();
        let manager = ThemeManager::new(
            dom.clone(),
            Rc::new(UnavailableStore),
            Rc::new(SimulatedColorScheme::new(true)),
            ThemeConfig::default(),
        );
        assert_eq!(manager.current(), ThemePreference::System);
        manager.set_theme(ThemePreference::Light);
        assert_eq!(manager.current(), ThemePreference::Light);
        assert_eq!(
            dom.attribute(&dom.document_element(), "data-theme").as_deref(),
            Some("celestia-light")
        );
    }

    #[test]
    fn test_apply_system_follows_os() {
        let f = fixture(None, true);
        assert_eq!(rendered(&f).as_deref(), Some("celestia-dark"));
        let f = fixture(None, false);
        assert_eq!(rendered(&f).as_deref(), Some("celestia-light"));
    }

    #[test]
    fn test_apply_persists_preference_not_effective() {
        let f = fixture(None, true);
        f.manager.apply(ThemePreference::System);
        assert_eq!(f.store.peek(KEY).as_deref(), Some("system"));
        f.manager.apply(ThemePreference::Light);
        assert_eq!(f.store.peek(KEY).as_deref(), Some("celestia-light"));
    }

    #[test]
    fn test_toggle_from_system_goes_opposite_of_os() {
        let f = fixture(None, true);
        f.manager.toggle();
        assert_eq!(f.manager.current(), ThemePreference::Light);

        let f = fixture(None, false);
        f.manager.toggle();
        assert_eq!(f.manager.current(), ThemePreference::Dark);
    }

    #[test]
    fn test_toggle_twice_restores() {
        let f = fixture(Some("celestia-dark"), false);
        f.manager.toggle();
        f.manager.toggle();
        assert_eq!(f.manager.current(), ThemePreference::Dark);
        assert_eq!(rendered(&f).as_deref(), Some("celestia-dark"));
    }

    #[test]
    fn test_os_change_reapplies_only_for_system() {
        let f = fixture(None, false);
        f.scheme.set_prefers_dark(true);
        assert_eq!(rendered(&f).as_deref(), Some("celestia-dark"));

        f.manager.set_theme(ThemePreference::Light);
        f.scheme.set_prefers_dark(false);
        f.scheme.set_prefers_dark(true);
        assert_eq!(rendered(&f).as_deref(), Some("celestia-light"));
    }

    #[test]
    fn test_dispose_tears_down_subscription() {
        let f = fixture(None, false);
        assert_eq!(f.scheme.listener_count(), 1);
        f.manager.dispose();
        assert!(!f.manager.is_subscribed());
        assert_eq!(f.scheme.listener_count(), 0);
        f.scheme.set_prefers_dark(true);
        assert_eq!(rendered(&f).as_deref(), Some("celestia-light"));
    }

    #[test]
    fn test_drop_tears_down_subscription() {
        let f = fixture(None, false);
        let scheme = Rc::clone(&f.scheme);
        drop(f);
        assert_eq!(scheme.listener_count(), 0);
    }

    #[test]
    fn test_set_theme_notifies_listeners() {
        let f = fixture(None, false);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = f.manager.on_change(move |p| sink.borrow_mut().push(p));

        f.manager.set_theme(ThemePreference::Dark);
        f.manager.toggle();
        f.manager.remove_listener(id);
        f.manager.set_theme(ThemePreference::System);

        assert_eq!(*seen.borrow(), vec![ThemePreference::Dark, ThemePreference::Light]);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let f = fixture(None, false);
        let reached = Rc::new(Cell::new(false));
        let flag = Rc::clone(&reached);
        f.manager.on_change(|_| panic!("listener failure"));
        f.manager.on_change(move |_| flag.set(true));
        f.manager.set_theme(ThemePreference::Dark);
        assert!(reached.get());
    }

    fn toggle_with_icons(dom: &MemoryDom) -> (NodeId, NodeId) {
        let body = dom.body().unwrap();
        let button = dom.element("button").attr(TOGGLE_ATTR, "").child_of(&body);
        let sun = dom.element("span").attr(ICON_ATTR, "light").child_of(&button);
        let moon = dom.element("span").attr(ICON_ATTR, "celestia-dark").child_of(&button);
        (sun, moon)
    }

    #[test]
    fn test_render_bound_ui_icons() {
        let f = fixture(Some("celestia-dark"), false);
        let (sun, moon) = toggle_with_icons(&f.dom);
        f.manager.render_bound_ui();
        assert!(f.dom.has_class(&sun, "block"));
        assert!(!f.dom.has_class(&sun, "hidden"));
        assert!(f.dom.has_class(&moon, "hidden"));

        f.manager.toggle();
        assert!(f.dom.has_class(&sun, "hidden"));
        assert!(f.dom.has_class(&moon, "block"));
        assert!(!f.dom.has_class(&moon, "hidden"));
    }

    #[test]
    fn test_icons_outside_toggle_are_ignored() {
        let f = fixture(Some("celestia-dark"), false);
        let body = f.dom.body().unwrap();
        let stray = f.dom.element("span").attr(ICON_ATTR, "light").child_of(&body);
        f.manager.render_bound_ui();
        assert!(f.dom.classes(stray).is_empty());
    }

    #[test]
    fn test_radio_selection() {
        let f = fixture(None, false);
        let body = f.dom.body().unwrap();
        let radios: Vec<NodeId> = ["celestia-light", "celestia-dark", "system"]
            .iter()
            .map(|value| {
                f.dom
                    .element("input")
                    .attr("type", "radio")
                    .attr("name", RADIO_NAME)
                    .value(value)
                    .child_of(&body)
            })
            .collect();
        f.manager.render_bound_ui();
        assert!(f.dom.is_checked(&radios[2]));

        f.manager.select_from(&radios[1]);
        assert_eq!(f.manager.current(), ThemePreference::Dark);
        assert!(f.dom.is_checked(&radios[1]));
        assert!(!f.dom.is_checked(&radios[2]));
    }

    #[test]
    fn test_select_unknown_value_is_ignored() {
        let f = fixture(Some("celestia-light"), false);
        let body = f.dom.body().unwrap();
        let bogus = f.dom.element("input").value("sepia").child_of(&body);
        f.manager.select_from(&bogus);
        assert_eq!(f.manager.current(), ThemePreference::Light);
    }

    #[test]
    fn test_display_names_differ_from_stored_ids() {
        let config = ThemeConfig::default();
        assert_eq!(ThemePreference::Dark.to_string(), "dark");
        assert_eq!(config.id_for(ThemePreference::Dark), "celestia-dark");
        assert_eq!(config.parse("dark"), None);
    }

    #[test]
    fn test_config_parse_and_ids() {
        let config = ThemeConfig::default();
        for preference in [ThemePreference::Light, ThemePreference::Dark, ThemePreference::System] {
            assert_eq!(config.parse(config.id_for(preference)), Some(preference));
        }
        assert_eq!(config.effective_id(EffectiveTheme::Dark), "celestia-dark");
    }
}

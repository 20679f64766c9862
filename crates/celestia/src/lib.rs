#![forbid(unsafe_code)]
// Allow these clippy lints for API ergonomics and DOM controller code
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::use_self)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::single_match_else)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::new_without_default)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::type_complexity)]

//! # Celestia
//!
//! Theme switching, form validation and small UI controllers for
//! server-rendered markup.
//!
//! Markup opts into behavior with attributes (`data-theme-toggle`,
//! `data-modal-open`, `data-chat-panel`, ...). A [`Celestia`] host owns one
//! controller per concern and routes DOM events to them through a single
//! [`ActionRegistry`]:
//!
//! - [`ThemeManager`]: light/dark/system preference, persisted and
//!   reconciled with the OS color scheme
//! - [`ValidationEngine`]: email, minimum length and matching-field rules
//!   with inline hints
//! - [`ToastStack`], [`ModalManager`], [`MobileMenu`], [`ChatPanels`]
//! - navbar scroll state, password reveal and range readouts in [`widgets`]
//!
//! Controllers are generic over the [`Dom`] trait. [`MemoryDom`] is an
//! in-memory document for tests and native hosts; the `celestia-wasm`
//! crate implements it over `web-sys`.
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use celestia::prelude::*;
//!
//! let dom = MemoryDom::new();
//! let body = dom.body().unwrap();
//! let form = dom.element("form").child_of(&body);
//! let email = dom
//!     .element("input")
//!     .attr("type", "email")
//!     .value("not-an-email")
//!     .child_of(&form);
//!
//! let app = Celestia::new(
//!     dom.clone(),
//!     Rc::new(MemoryStore::new()),
//!     Rc::new(SimulatedColorScheme::new(false)),
//!     CelestiaConfig::default(),
//! )
//! .unwrap();
//!
//! let outcome = app.dispatch(&UiEvent::Submit, Some(&form), 0.0);
//! assert!(outcome.default_prevented);
//! assert!(dom.has_class(&email, "input-error"));
//! ```

pub mod app;
pub mod chat_panel;
pub mod color_scheme;
pub mod config;
pub mod dom;
pub mod error;
pub mod memory_dom;
pub mod menu;
pub mod modal;
pub mod registry;
pub mod storage;
pub mod theme;
pub mod toast;
pub mod validation;
pub mod widgets;

// Re-exports
pub use app::Celestia;
pub use chat_panel::{ChatPanels, PanelVisibility};
pub use color_scheme::{ColorSchemeSource, SchemeCallback, SimulatedColorScheme, Subscription};
pub use config::{
    CelestiaConfig, ChatPanelConfig, ModalConfig, NavbarConfig, ThemeConfig, ToastConfig,
    ValidationConfig,
};
pub use dom::{Dom, Selector};
pub use error::{ConfigError, Result, StorageError};
pub use memory_dom::{MemoryDom, NodeId};
pub use menu::MobileMenu;
pub use modal::{AlertOptions, ConfirmOptions, ModalManager};
pub use registry::{ActionRegistry, EventContext, EventKind, Outcome, Propagation, UiEvent};
pub use storage::{MemoryStore, PreferenceStore, UnavailableStore};
pub use theme::{EffectiveTheme, ListenerId, ThemeManager, ThemePreference};
pub use toast::{ToastId, ToastKind, ToastStack};
pub use validation::{FieldState, ValidationEngine, ValidationRule};
pub use widgets::{NavbarScroll, PasswordToggle, RangeDisplay};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::app::Celestia;
    pub use crate::color_scheme::{ColorSchemeSource, SimulatedColorScheme};
    pub use crate::config::CelestiaConfig;
    pub use crate::dom::{Dom, Selector};
    pub use crate::error::{ConfigError, StorageError};
    pub use crate::memory_dom::MemoryDom;
    pub use crate::modal::{AlertOptions, ConfirmOptions};
    pub use crate::registry::{EventKind, Outcome, UiEvent};
    pub use crate::storage::{MemoryStore, PreferenceStore};
    pub use crate::theme::{EffectiveTheme, ThemePreference};
    pub use crate::toast::ToastKind;
    pub use crate::validation::FieldState;
}

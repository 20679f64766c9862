//! Off-canvas mobile navigation menu.

use std::cell::Cell;

use tracing::debug;

use crate::dom::{Dom, Selector};

pub const MENU_ATTR: &str = "data-mobile-menu";
pub const TOGGLE_ATTR: &str = "data-mobile-menu-toggle";
pub const OVERLAY_ATTR: &str = "data-mobile-menu-overlay";

const OPEN_CLASS: &str = "open";

/// Opens and closes `[data-mobile-menu]` and locks page scroll while open.
#[derive(Debug)]
pub struct MobileMenu<D: Dom> {
    dom: D,
    open: Cell<bool>,
}

impl<D: Dom> MobileMenu<D> {
    pub fn new(dom: D) -> Self {
        Self {
            dom,
            open: Cell::new(false),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub fn toggle(&self) {
        if self.open.get() {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn open(&self) {
        self.render(true);
    }

    pub fn close(&self) {
        self.render(false);
    }

    /// Close on Escape. Returns whether the menu was open.
    pub fn handle_escape(&self) -> bool {
        if !self.open.get() {
            return false;
        }
        self.close();
        true
    }

    fn render(&self, open: bool) {
        let Some(menu) = self.dom.query(None, &Selector::attr(MENU_ATTR)) else {
            debug!("No mobile menu in document");
            return;
        };
        self.open.set(open);
        self.dom.toggle_class(&menu, OPEN_CLASS, open);
        if let Some(overlay) = self.dom.query(None, &Selector::attr(OVERLAY_ATTR)) {
            self.dom.toggle_class(&overlay, OPEN_CLASS, open);
        }
        if let Some(body) = self.dom.body() {
            self.dom
                .set_style(&body, "overflow", if open { "hidden" } else { "" });
        }
        for toggle in self.dom.query_all(None, &Selector::attr(TOGGLE_ATTR)) {
            self.dom
                .set_attribute(&toggle, "aria-expanded", if open { "true" } else { "false" });
        }
    }
}

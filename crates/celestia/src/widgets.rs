//! Small attribute-driven widgets: navbar scroll state, password
//! visibility toggle and range value readout.

use tracing::debug;

use crate::config::NavbarConfig;
use crate::dom::{Dom, Selector};

pub const NAVBAR_ATTR: &str = "data-navbar";
pub const AT_TOP_ATTR: &str = "data-at-top";
pub const PASSWORD_TOGGLE_ATTR: &str = "data-password-toggle";
pub const SHOW_ICON_ATTR: &str = "data-show-icon";
pub const HIDE_ICON_ATTR: &str = "data-hide-icon";
pub const RANGE_DISPLAY_ATTR: &str = "data-range-display";

/// Marks `[data-navbar]` with `data-at-top` while the page is scrolled less
/// than the threshold.
#[derive(Debug)]
pub struct NavbarScroll<D: Dom> {
    dom: D,
    config: NavbarConfig,
}

impl<D: Dom> NavbarScroll<D> {
    pub fn new(dom: D, config: NavbarConfig) -> Self {
        Self { dom, config }
    }

    pub fn is_at_top(&self, scroll_y: f64) -> bool {
        scroll_y < self.config.threshold
    }

    /// Write `data-at-top` for `scroll_y`.
    pub fn update(&self, scroll_y: f64) {
        let at_top = self.is_at_top(scroll_y);
        for navbar in self.dom.query_all(None, &Selector::attr(NAVBAR_ATTR)) {
            self.dom
                .set_attribute(&navbar, AT_TOP_ATTR, if at_top { "true" } else { "false" });
        }
    }

    /// Write `data-at-top` for the document's current scroll offset.
    pub fn sync(&self) {
        self.update(self.dom.scroll_y());
    }
}

/// `button[data-password-toggle="<input id>"]` switches its input between
/// masked and plain text.
#[derive(Debug)]
pub struct PasswordToggle<D: Dom> {
    dom: D,
}

impl<D: Dom> PasswordToggle<D> {
    pub fn new(dom: D) -> Self {
        Self { dom }
    }

    /// Flip the input `button` points at. Returns whether the password is
    /// now visible.
    pub fn toggle(&self, button: &D::Node) -> Option<bool> {
        let id = self.dom.attribute(button, PASSWORD_TOGGLE_ATTR)?;
        let Some(input) = self.dom.element_by_id(&id) else {
            debug!(input.id = %id, "No password input to toggle");
            return None;
        };
        let was_masked = self
            .dom
            .attribute(&input, "type")
            .is_some_and(|t| t.eq_ignore_ascii_case("password"));
        self.dom
            .set_attribute(&input, "type", if was_masked { "text" } else { "password" });

        let show = self.dom.query(Some(button), &Selector::attr(SHOW_ICON_ATTR));
        let hide = self.dom.query(Some(button), &Selector::attr(HIDE_ICON_ATTR));
        if let (Some(show), Some(hide)) = (show, hide) {
            self.dom.toggle_class(&show, "hidden", was_masked);
            self.dom.toggle_class(&hide, "hidden", !was_masked);
        }
        Some(was_masked)
    }
}

/// `input[data-range-display="<id>"]` mirrors its value into the element
/// with that id.
#[derive(Debug)]
pub struct RangeDisplay<D: Dom> {
    dom: D,
}

impl<D: Dom> RangeDisplay<D> {
    pub fn new(dom: D) -> Self {
        Self { dom }
    }

    pub fn update(&self, input: &D::Node) {
        let Some(id) = self.dom.attribute(input, RANGE_DISPLAY_ATTR) else {
            return;
        };
        if let Some(display) = self.dom.element_by_id(&id) {
            self.dom.set_text(&display, &self.dom.value(input));
        }
    }

    /// Update every range input in the document.
    pub fn sync_all(&self) {
        let selector = Selector::tag("input").and(Selector::attr(RANGE_DISPLAY_ATTR));
        for input in self.dom.query_all(None, &selector) {
            self.update(&input);
        }
    }
}

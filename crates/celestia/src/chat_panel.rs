//! Collapsible chat sidebars.
//!
//! Each `[data-chat-panel]` carries `data-visible`: `auto` leaves layout to
//! the stylesheet's media queries, `true`/`false` force the panel shown or
//! hidden. A panel narrower than its breakpoint is in "mobile mode", where a
//! shown panel floats over the page behind `[data-chat-overlay]`.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::config::ChatPanelConfig;
use crate::dom::{Dom, Selector};

pub const PANEL_ATTR: &str = "data-chat-panel";
pub const TOGGLE_ATTR: &str = "data-chat-panel-toggle";
pub const OVERLAY_ATTR: &str = "data-chat-overlay";
pub const BREAKPOINT_ATTR: &str = "data-chat-breakpoint";
pub const VISIBLE_ATTR: &str = "data-visible";

/// Value of a panel's `data-visible` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelVisibility {
    #[default]
    Auto,
    Shown,
    Hidden,
}

impl PanelVisibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Shown => "true",
            Self::Hidden => "false",
        }
    }
}

impl fmt::Display for PanelVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PanelVisibility {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "true" => Ok(Self::Shown),
            "false" => Ok(Self::Hidden),
            _ => Err(()),
        }
    }
}

/// Controls every chat panel in the document and the shared overlay.
#[derive(Debug)]
pub struct ChatPanels<D: Dom> {
    dom: D,
    config: ChatPanelConfig,
    resize_at: Cell<Option<f64>>,
}

impl<D: Dom> ChatPanels<D> {
    pub fn new(dom: D, config: ChatPanelConfig) -> Self {
        Self {
            dom,
            config,
            resize_at: Cell::new(None),
        }
    }

    /// Current visibility of `panel`; unknown values read as `Auto`.
    pub fn visibility(&self, panel: &D::Node) -> PanelVisibility {
        self.dom
            .attribute(panel, VISIBLE_ATTR)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Breakpoint of `panel` in px.
    pub fn breakpoint(&self, panel: &D::Node) -> f64 {
        self.dom
            .attribute(panel, BREAKPOINT_ATTR)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|bp| *bp > 0.0)
            .unwrap_or(self.config.breakpoint)
    }

    pub fn is_mobile(&self, panel: &D::Node) -> bool {
        self.dom.viewport_width() < self.breakpoint(panel)
    }

    /// Toggle `panel`. On wide viewports `auto` counts as shown.
    pub fn toggle(&self, panel: &D::Node) {
        let current = self.visibility(panel);
        let next = if self.is_mobile(panel) {
            match current {
                PanelVisibility::Shown => PanelVisibility::Hidden,
                _ => PanelVisibility::Shown,
            }
        } else {
            match current {
                PanelVisibility::Hidden => PanelVisibility::Shown,
                _ => PanelVisibility::Hidden,
            }
        };
        trace!(from = %current, to = %next, "Toggling chat panel");
        self.set_visibility(panel, next);
        self.update_overlay();
    }

    /// Toggle the panel whose id the trigger's `data-chat-panel-toggle`
    /// names.
    pub fn toggle_from(&self, trigger: &D::Node) {
        let Some(id) = self.dom.attribute(trigger, TOGGLE_ATTR) else {
            return;
        };
        match self
            .dom
            .element_by_id(&id)
            .filter(|node| self.dom.has_attribute(node, PANEL_ATTR))
        {
            Some(panel) => self.toggle(&panel),
            None => debug!(panel.id = %id, "No chat panel to toggle"),
        }
    }

    /// Hide every panel that is in mobile mode.
    pub fn close_all(&self) {
        for panel in self.panels() {
            if self.is_mobile(&panel) {
                self.set_visibility(&panel, PanelVisibility::Hidden);
            }
        }
        self.update_overlay();
    }

    /// Whether some panel is forced shown while in mobile mode.
    pub fn overlay_needed(&self) -> bool {
        self.panels()
            .iter()
            .any(|p| self.visibility(p) == PanelVisibility::Shown && self.is_mobile(p))
    }

    pub fn update_overlay(&self) {
        let needed = self.overlay_needed();
        for overlay in self.dom.query_all(None, &Selector::attr(OVERLAY_ATTR)) {
            self.dom.toggle_class(&overlay, "hidden", !needed);
        }
    }

    /// Note a window resize; panels reset once resizing settles.
    pub fn handle_resize(&self, now_ms: f64) {
        self.resize_at
            .set(Some(now_ms + self.config.resize_debounce_ms as f64));
    }

    /// Reset panels to `auto` if the resize debounce elapsed.
    pub fn advance(&self, now_ms: f64) {
        match self.resize_at.get() {
            Some(at) if at <= now_ms => {
                self.resize_at.set(None);
                for panel in self.panels() {
                    self.set_visibility(&panel, PanelVisibility::Auto);
                }
                self.update_overlay();
            }
            _ => {}
        }
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.resize_at.get()
    }

    fn panels(&self) -> Vec<D::Node> {
        self.dom.query_all(None, &Selector::attr(PANEL_ATTR))
    }

    fn set_visibility(&self, panel: &D::Node, visibility: PanelVisibility) {
        self.dom.set_attribute(panel, VISIBLE_ATTR, visibility.as_str());
    }
}

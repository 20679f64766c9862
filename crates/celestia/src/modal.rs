//! Modal dialogs: open/close triggers, Escape and backdrop dismissal, and
//! generated confirm/alert dialogs.

use std::cell::{Cell, RefCell};
use std::fmt;

use tracing::debug;

use crate::config::ModalConfig;
use crate::dom::{Dom, Selector, focusable};

/// Attribute on a trigger naming the dialog id to open.
pub const OPEN_ATTR: &str = "data-modal-open";
/// Attribute on a trigger that closes its enclosing dialog.
pub const CLOSE_ATTR: &str = "data-modal-close";
/// Attribute on the buttons of generated dialogs.
pub const ACTION_ATTR: &str = "data-modal-action";

/// `dialog.modal`
pub fn modal_selector() -> Selector {
    Selector::tag("dialog").and(Selector::class("modal"))
}

/// Text of a generated confirm dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOptions {
    /// Default `Confirm`.
    pub title: String,
    /// Default `Are you sure you want to do this?`.
    pub message: String,
    /// Default `Confirm`.
    pub confirm_text: String,
    /// Default `Cancel`.
    pub cancel_text: String,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            title: "Confirm".into(),
            message: "Are you sure you want to do this?".into(),
            confirm_text: "Confirm".into(),
            cancel_text: "Cancel".into(),
        }
    }
}

/// Text of a generated alert dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertOptions {
    /// Default `Notice`.
    pub title: String,
    pub message: String,
    /// Default `OK`.
    pub ok_text: String,
}

impl AlertOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

impl Default for AlertOptions {
    fn default() -> Self {
        Self {
            title: "Notice".into(),
            message: String::new(),
            ok_text: "OK".into(),
        }
    }
}

type Callback = Box<dyn FnOnce()>;

enum Pending {
    Confirm {
        on_confirm: Option<Callback>,
        on_cancel: Option<Callback>,
    },
    Alert {
        on_close: Option<Callback>,
    },
}

struct Generated<N> {
    node: N,
    pending: Pending,
    remove_at: Option<f64>,
}

/// Opens and closes `<dialog class="modal">` elements.
pub struct ModalManager<D: Dom> {
    dom: D,
    config: ModalConfig,
    generated: RefCell<Vec<Generated<D::Node>>>,
    next_id: Cell<u64>,
}

impl<D: Dom> fmt::Debug for ModalManager<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalManager")
            .field("config", &self.config)
            .field("generated", &self.generated.borrow().len())
            .finish()
    }
}

impl<D: Dom> ModalManager<D> {
    pub fn new(dom: D, config: ModalConfig) -> Self {
        Self {
            dom,
            config,
            generated: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Open the dialog with `id`. Returns `false` if there is no such
    /// dialog.
    pub fn open(&self, id: &str) -> bool {
        match self.dialog_by_id(id) {
            Some(dialog) => {
                self.show(&dialog);
                true
            }
            None => {
                debug!(modal.id = %id, "No dialog to open");
                false
            }
        }
    }

    /// Close the dialog with `id`.
    pub fn close(&self, id: &str, now_ms: f64) -> bool {
        match self.dialog_by_id(id) {
            Some(dialog) => {
                self.close_node(&dialog, now_ms);
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.dialog_by_id(id)
            .is_some_and(|dialog| self.dom.has_attribute(&dialog, "open"))
    }

    /// Close `dialog`. Generated dialogs are scheduled for removal and an
    /// alert's close callback runs.
    pub fn close_node(&self, dialog: &D::Node, now_ms: f64) {
        self.dom.close_dialog(dialog);
        let on_close = {
            let mut generated = self.generated.borrow_mut();
            let Some(entry) = generated.iter_mut().find(|g| &g.node == dialog) else {
                return;
            };
            if entry.remove_at.is_none() {
                entry.remove_at = Some(now_ms + self.config.removal_delay_ms as f64);
            }
            match &mut entry.pending {
                Pending::Alert { on_close } => on_close.take(),
                Pending::Confirm {
                    on_confirm,
                    on_cancel,
                } => {
                    // A closed confirm never answers.
                    on_confirm.take();
                    on_cancel.take();
                    None
                }
            }
        };
        if let Some(callback) = on_close {
            callback();
        }
    }

    /// Handle a click on a `[data-modal-open]` trigger.
    pub fn handle_open_trigger(&self, trigger: &D::Node) {
        if let Some(id) = self.dom.attribute(trigger, OPEN_ATTR) {
            self.open(&id);
        }
    }

    /// Handle a click on a `[data-modal-close]` trigger.
    pub fn handle_close_trigger(&self, trigger: &D::Node, now_ms: f64) {
        if let Some(dialog) = self.dom.closest(trigger, &modal_selector()) {
            self.close_node(&dialog, now_ms);
        }
    }

    /// Close when the click landed on the dialog element itself (its
    /// backdrop) rather than on its content.
    pub fn handle_backdrop(&self, target: &D::Node, now_ms: f64) -> bool {
        if !self.config.close_on_backdrop || !self.dom.matches(target, &modal_selector()) {
            return false;
        }
        self.close_node(target, now_ms);
        true
    }

    /// Close the first open modal. Returns whether one was closed.
    pub fn handle_escape(&self, now_ms: f64) -> bool {
        if !self.config.close_on_escape {
            return false;
        }
        let open = modal_selector().and(Selector::attr("open"));
        match self.dom.query(None, &open) {
            Some(dialog) => {
                self.close_node(&dialog, now_ms);
                true
            }
            None => false,
        }
    }

    /// Handle a click on a `[data-modal-action]` button of a generated
    /// dialog.
    pub fn handle_action(&self, button: &D::Node, now_ms: f64) {
        let Some(dialog) = self.dom.closest(button, &modal_selector()) else {
            return;
        };
        let action = self.dom.attribute(button, ACTION_ATTR).unwrap_or_default();
        let callback = {
            let mut generated = self.generated.borrow_mut();
            match generated.iter_mut().find(|g| g.node == dialog) {
                Some(Generated {
                    remove_at: Some(_),
                    ..
                }) => return,
                Some(Generated {
                    pending:
                        Pending::Confirm {
                            on_confirm,
                            on_cancel,
                        },
                    ..
                }) => match action.as_str() {
                    "confirm" => on_confirm.take(),
                    "cancel" => on_cancel.take(),
                    _ => None,
                },
                _ => None,
            }
        };
        self.close_node(&dialog, now_ms);
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Build and open a confirm dialog. `on_confirm` or `on_cancel` runs
    /// when the matching button is clicked; dismissing it another way runs
    /// neither.
    pub fn confirm(
        &self,
        options: &ConfirmOptions,
        on_confirm: impl FnOnce() + 'static,
        on_cancel: impl FnOnce() + 'static,
    ) -> Option<D::Node> {
        let (dialog, actions) = self.build("confirm", &options.title, &options.message)?;
        let dom = &self.dom;

        let cancel = dom.create_element("button")?;
        dom.add_class(&cancel, "btn");
        dom.add_class(&cancel, "btn-ghost");
        dom.set_attribute(&cancel, ACTION_ATTR, "cancel");
        dom.set_text(&cancel, &options.cancel_text);
        dom.append_child(&actions, &cancel);

        let confirm = dom.create_element("button")?;
        dom.add_class(&confirm, "btn");
        dom.add_class(&confirm, "btn-primary");
        dom.set_attribute(&confirm, ACTION_ATTR, "confirm");
        dom.set_text(&confirm, &options.confirm_text);
        dom.append_child(&actions, &confirm);

        self.generated.borrow_mut().push(Generated {
            node: dialog.clone(),
            pending: Pending::Confirm {
                on_confirm: Some(Box::new(on_confirm)),
                on_cancel: Some(Box::new(on_cancel)),
            },
            remove_at: None,
        });
        self.show(&dialog);
        Some(dialog)
    }

    /// Build and open an alert dialog. `on_close` runs once, however the
    /// dialog is closed.
    pub fn alert(&self, options: &AlertOptions, on_close: impl FnOnce() + 'static) -> Option<D::Node> {
        let (dialog, actions) = self.build("alert", &options.title, &options.message)?;
        let dom = &self.dom;

        let ok = dom.create_element("button")?;
        dom.add_class(&ok, "btn");
        dom.add_class(&ok, "btn-primary");
        dom.set_attribute(&ok, ACTION_ATTR, "ok");
        dom.set_text(&ok, &options.ok_text);
        dom.append_child(&actions, &ok);

        self.generated.borrow_mut().push(Generated {
            node: dialog.clone(),
            pending: Pending::Alert {
                on_close: Some(Box::new(on_close)),
            },
            remove_at: None,
        });
        self.show(&dialog);
        Some(dialog)
    }

    /// Remove generated dialogs whose removal delay elapsed.
    pub fn advance(&self, now_ms: f64) {
        self.generated.borrow_mut().retain(|g| {
            let due = g.remove_at.is_some_and(|at| at <= now_ms);
            if due {
                self.dom.remove(&g.node);
            }
            !due
        });
    }

    /// Generated dialogs still in the document or awaiting removal.
    pub fn generated_count(&self) -> usize {
        self.generated.borrow().len()
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.generated
            .borrow()
            .iter()
            .filter_map(|g| g.remove_at)
            .reduce(f64::min)
    }

    fn dialog_by_id(&self, id: &str) -> Option<D::Node> {
        self.dom
            .element_by_id(id)
            .filter(|node| self.dom.tag_name(node) == "dialog")
    }

    fn show(&self, dialog: &D::Node) {
        self.dom.show_modal(dialog);
        if let Some(target) = self.dom.query(Some(dialog), &focusable()) {
            self.dom.focus(&target);
        }
    }

    /// Dialog skeleton appended to body; returns the dialog and its
    /// action row.
    fn build(&self, kind: &str, title: &str, message: &str) -> Option<(D::Node, D::Node)> {
        let dom = &self.dom;
        let body = dom.body()?;
        let serial = self.next_id.get();
        self.next_id.set(serial + 1);

        let dialog = dom.create_element("dialog")?;
        dom.set_attribute(&dialog, "id", &format!("celestia-{kind}-modal-{serial}"));
        dom.add_class(&dialog, "modal");

        let content = dom.create_element("div")?;
        for class in ["modal-box", "glass-panel", "rounded-ios"] {
            dom.add_class(&content, class);
        }
        let heading = dom.create_element("h3")?;
        dom.add_class(&heading, "text-lg");
        dom.add_class(&heading, "font-bold");
        dom.set_text(&heading, title);
        dom.append_child(&content, &heading);

        let text = dom.create_element("p")?;
        dom.add_class(&text, "py-4");
        dom.set_text(&text, message);
        dom.append_child(&content, &text);

        let actions = dom.create_element("div")?;
        dom.add_class(&actions, "modal-action");
        dom.append_child(&content, &actions);
        dom.append_child(&dialog, &content);

        let backdrop = dom.create_element("form")?;
        dom.add_class(&backdrop, "modal-backdrop");
        dom.set_attribute(&backdrop, "method", "dialog");
        let backdrop_button = dom.create_element("button")?;
        dom.set_attribute(&backdrop_button, CLOSE_ATTR, "");
        dom.set_text(&backdrop_button, "close");
        dom.append_child(&backdrop, &backdrop_button);
        dom.append_child(&dialog, &backdrop);

        dom.append_child(&body, &dialog);
        Some((dialog, actions))
    }
}

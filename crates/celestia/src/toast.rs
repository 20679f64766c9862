//! Toast notifications.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::config::ToastConfig;
use crate::dom::{Dom, Selector};

const CONTAINER_ATTR: &str = "data-toast-target";
/// Attribute on the close button of each toast.
pub const DISMISS_ATTR: &str = "data-toast-dismiss";
const ID_ATTR: &str = "data-toast-id";

/// Visual flavor of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

impl ToastKind {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Success => "lucide--check-circle",
            Self::Error => "lucide--x-circle",
            Self::Warning => "lucide--alert-triangle",
            Self::Info => "lucide--info",
        }
    }

    pub fn alert_class(self) -> &'static str {
        match self {
            Self::Success => "alert-success",
            Self::Error => "alert-error",
            Self::Warning => "alert-warning",
            Self::Info => "alert-info",
        }
    }

    /// Parse a kind name; anything unknown is Info.
    pub fn parse_lossy(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl FromStr for ToastKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(format!("unknown toast kind: {other}")),
        }
    }
}

/// Identifier of a shown toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct Toast<N> {
    id: ToastId,
    node: N,
    dismiss_at: Option<f64>,
    remove_at: Option<f64>,
}

/// Stack of toasts in a single container.
pub struct ToastStack<D: Dom> {
    dom: D,
    config: ToastConfig,
    container: RefCell<Option<D::Node>>,
    toasts: RefCell<Vec<Toast<D::Node>>>,
    next_id: Cell<u64>,
}

impl<D: Dom> fmt::Debug for ToastStack<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastStack")
            .field("config", &self.config)
            .field("active", &self.toasts.borrow().len())
            .finish()
    }
}

impl<D: Dom> ToastStack<D> {
    pub fn new(dom: D, config: ToastConfig) -> Self {
        Self {
            dom,
            config,
            container: RefCell::new(None),
            toasts: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Show a toast. `duration_ms` overrides the configured duration; `0`
    /// keeps the toast until dismissed. Returns `None` when the document
    /// has no body to attach to.
    pub fn show(
        &self,
        message: &str,
        kind: ToastKind,
        duration_ms: Option<u64>,
        now_ms: f64,
    ) -> Option<ToastId> {
        let container = self.ensure_container()?;
        let dom = &self.dom;
        let id = ToastId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let toast = dom.create_element("div")?;
        for class in [
            "alert",
            kind.alert_class(),
            "glass-panel",
            "shadow-lg",
            "toast-enter",
            "flex",
            "items-center",
            "gap-3",
        ] {
            dom.add_class(&toast, class);
        }
        dom.set_attribute(&toast, ID_ATTR, &id.to_string());

        let icon = dom.create_element("span")?;
        for class in ["iconify", kind.icon(), "size-5", "shrink-0"] {
            dom.add_class(&icon, class);
        }
        dom.append_child(&toast, &icon);

        let text = dom.create_element("span")?;
        dom.add_class(&text, "flex-1");
        dom.set_text(&text, message);
        dom.append_child(&toast, &text);

        let close = dom.create_element("button")?;
        for class in ["btn", "btn-ghost", "btn-xs", "btn-circle"] {
            dom.add_class(&close, class);
        }
        dom.set_attribute(&close, "aria-label", "Close");
        dom.set_attribute(&close, DISMISS_ATTR, "");
        let close_icon = dom.create_element("span")?;
        for class in ["iconify", "lucide--x", "size-4"] {
            dom.add_class(&close_icon, class);
        }
        dom.append_child(&close, &close_icon);
        dom.append_child(&toast, &close);

        dom.append_child(&container, &toast);

        let duration = duration_ms.unwrap_or(self.config.duration_ms);
        let dismiss_at = (duration > 0).then(|| now_ms + duration as f64);
        self.toasts.borrow_mut().push(Toast {
            id,
            node: toast,
            dismiss_at,
            remove_at: None,
        });
        debug!(toast.id = id.0, toast.kind = ?kind, duration, "Toast shown");
        Some(id)
    }

    pub fn success(&self, message: &str, now_ms: f64) -> Option<ToastId> {
        self.show(message, ToastKind::Success, None, now_ms)
    }

    pub fn error(&self, message: &str, now_ms: f64) -> Option<ToastId> {
        self.show(message, ToastKind::Error, None, now_ms)
    }

    pub fn warning(&self, message: &str, now_ms: f64) -> Option<ToastId> {
        self.show(message, ToastKind::Warning, None, now_ms)
    }

    pub fn info(&self, message: &str, now_ms: f64) -> Option<ToastId> {
        self.show(message, ToastKind::Info, None, now_ms)
    }

    /// Start the exit animation. The element is removed on animation end
    /// or `exit_ms` later, whichever comes first.
    pub fn dismiss(&self, id: ToastId, now_ms: f64) {
        let mut toasts = self.toasts.borrow_mut();
        let Some(index) = toasts.iter().position(|t| t.id == id) else {
            return;
        };
        if !self.dom.is_connected(&toasts[index].node) {
            toasts.remove(index);
            return;
        }
        let toast = &mut toasts[index];
        if toast.remove_at.is_some() {
            return;
        }
        self.dom.remove_class(&toast.node, "toast-enter");
        self.dom.add_class(&toast.node, "toast-exit");
        toast.dismiss_at = None;
        toast.remove_at = Some(now_ms + self.config.exit_ms as f64);
    }

    /// Dismiss the toast containing `node` (its close button).
    pub fn dismiss_node(&self, node: &D::Node, now_ms: f64) {
        if let Some(id) = self.id_of(node) {
            self.dismiss(id, now_ms);
        }
    }

    pub fn dismiss_all(&self, now_ms: f64) {
        let ids: Vec<ToastId> = self.toasts.borrow().iter().map(|t| t.id).collect();
        for id in ids {
            self.dismiss(id, now_ms);
        }
    }

    /// Remove an exiting toast once its animation finished.
    pub fn finish(&self, node: &D::Node) {
        let Some(id) = self.id_of(node) else {
            return;
        };
        let mut toasts = self.toasts.borrow_mut();
        if let Some(index) = toasts
            .iter()
            .position(|t| t.id == id && t.remove_at.is_some())
        {
            let toast = toasts.remove(index);
            self.dom.remove(&toast.node);
            debug!(toast.id = id.0, "Toast removed");
        }
    }

    /// Run due auto-dismissals and removals.
    pub fn advance(&self, now_ms: f64) {
        let due: Vec<ToastId> = self
            .toasts
            .borrow()
            .iter()
            .filter(|t| t.dismiss_at.is_some_and(|at| at <= now_ms))
            .map(|t| t.id)
            .collect();
        for id in due {
            self.dismiss(id, now_ms);
        }

        let mut toasts = self.toasts.borrow_mut();
        toasts.retain(|t| {
            let expired = t.remove_at.is_some_and(|at| at <= now_ms);
            if expired {
                self.dom.remove(&t.node);
            }
            !expired
        });
    }

    /// Toasts shown and not yet removed.
    pub fn active_count(&self) -> usize {
        self.toasts.borrow().len()
    }

    /// Earliest pending deadline, for hosts that schedule precise timers.
    pub fn next_deadline(&self) -> Option<f64> {
        self.toasts
            .borrow()
            .iter()
            .filter_map(|t| t.remove_at.or(t.dismiss_at))
            .reduce(f64::min)
    }

    fn id_of(&self, node: &D::Node) -> Option<ToastId> {
        let toast = self.dom.closest(node, &Selector::attr(ID_ATTR))?;
        let id = self.dom.attribute(&toast, ID_ATTR)?.parse().ok()?;
        Some(ToastId(id))
    }

    fn ensure_container(&self) -> Option<D::Node> {
        let dom = &self.dom;
        if let Some(existing) = self.container.borrow().as_ref() {
            if dom.is_connected(existing) {
                return Some(existing.clone());
            }
        }
        let container = match dom.query(None, &Selector::attr_eq(CONTAINER_ATTR, "container")) {
            Some(found) => found,
            None => {
                let Some(body) = dom.body() else {
                    warn!("Cannot show toast without a document body");
                    return None;
                };
                let created = dom.create_element("div")?;
                dom.add_class(&created, "toast");
                for class in self.config.position.split_ascii_whitespace() {
                    dom.add_class(&created, class);
                }
                dom.add_class(&created, "z-[9999]");
                dom.set_attribute(&created, "role", "alert");
                dom.set_attribute(&created, "aria-live", "polite");
                dom.set_attribute(&created, CONTAINER_ATTR, "container");
                dom.append_child(&body, &created);
                created
            }
        };
        *self.container.borrow_mut() = Some(container.clone());
        Some(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_dom::MemoryDom;

    fn stack(dom: &MemoryDom) -> ToastStack<MemoryDom> {
        ToastStack::new(dom.clone(), ToastConfig::default())
    }

    fn toast_nodes(dom: &MemoryDom) -> Vec<crate::memory_dom::NodeId> {
        dom.query_all(None, &Selector::attr(ID_ATTR))
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(ToastKind::parse_lossy("Error"), ToastKind::Error);
        assert_eq!(ToastKind::parse_lossy("bogus"), ToastKind::Info);
        assert!("bogus".parse::<ToastKind>().is_err());
    }

    #[test]
    fn test_show_creates_single_container() {
        let dom = MemoryDom::new();
        let toasts = stack(&dom);
        toasts.success("Saved", 0.0);
        toasts.error("Failed", 0.0);

        let containers = dom.query_all(None, &Selector::attr_eq(CONTAINER_ATTR, "container"));
        assert_eq!(containers.len(), 1);
        assert!(dom.has_class(&containers[0], "toast-bottom"));
        assert_eq!(dom.children(containers[0]).len(), 2);
        assert_eq!(toasts.active_count(), 2);
    }

    #[test]
    fn test_reuses_markup_container() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let existing = dom
            .element("div")
            .attr(CONTAINER_ATTR, "container")
            .child_of(&body);
        stack(&dom).info("hello", 0.0);
        assert_eq!(dom.children(existing).len(), 1);
    }

    #[test]
    fn test_message_is_text_not_markup() {
        let dom = MemoryDom::new();
        stack(&dom).warning("<b>bold</b>", 0.0);
        let toast = toast_nodes(&dom)[0];
        assert_eq!(dom.text(&toast), "<b>bold</b>");
        assert!(dom.query(Some(&toast), &Selector::tag("b")).is_none());
        assert!(dom.has_class(&toast, "alert-warning"));
    }

    #[test]
    fn test_auto_dismiss_then_removal() {
        let dom = MemoryDom::new();
        let toasts = stack(&dom);
        toasts.info("hi", 1000.0);
        let node = toast_nodes(&dom)[0];
        assert_eq!(toasts.next_deadline(), Some(5000.0));

        toasts.advance(4999.0);
        assert!(dom.has_class(&node, "toast-enter"));

        toasts.advance(5000.0);
        assert!(dom.has_class(&node, "toast-exit"));
        assert!(!dom.has_class(&node, "toast-enter"));
        assert_eq!(toasts.next_deadline(), Some(5300.0));

        toasts.advance(5300.0);
        assert!(!dom.is_connected(&node));
        assert_eq!(toasts.active_count(), 0);
    }

    #[test]
    fn test_zero_duration_is_sticky() {
        let dom = MemoryDom::new();
        let toasts = stack(&dom);
        toasts.show("sticky", ToastKind::Info, Some(0), 0.0);
        toasts.advance(1_000_000.0);
        assert_eq!(toasts.active_count(), 1);
        assert_eq!(toasts.next_deadline(), None);
    }

    #[test]
    fn test_close_button_and_animation_end() {
        let dom = MemoryDom::new();
        let toasts = stack(&dom);
        toasts.info("bye", 0.0);
        let node = toast_nodes(&dom)[0];
        let button = dom.query(Some(&node), &Selector::attr(DISMISS_ATTR)).unwrap();

        toasts.finish(&node);
        assert!(dom.is_connected(&node), "finish before dismiss is ignored");

        toasts.dismiss_node(&button, 10.0);
        toasts.finish(&node);
        assert!(!dom.is_connected(&node));
        assert_eq!(toasts.active_count(), 0);
    }

    #[test]
    fn test_dismiss_all() {
        let dom = MemoryDom::new();
        let toasts = stack(&dom);
        toasts.info("a", 0.0);
        toasts.info("b", 0.0);
        toasts.dismiss_all(0.0);
        for node in toast_nodes(&dom) {
            assert!(dom.has_class(&node, "toast-exit"));
        }
        toasts.advance(300.0);
        assert_eq!(toasts.active_count(), 0);
    }
}

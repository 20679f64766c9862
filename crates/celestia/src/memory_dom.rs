//! In-memory document.
//!
//! [`MemoryDom`] is an arena of elements behind a shared handle. It backs
//! the test suite and any native host that wants to drive the controllers
//! without a browser.
//!
//! ```rust
//! use celestia::dom::{Dom, Selector};
//! use celestia::memory_dom::MemoryDom;
//!
//! let dom = MemoryDom::new();
//! let body = dom.body().unwrap();
//! let input = dom.element("input").attr("type", "email").id("email").child_of(&body);
//!
//! assert_eq!(dom.element_by_id("email"), Some(input));
//! assert_eq!(dom.query_all(None, &Selector::tag("input")).len(), 1);
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::dom::{Dom, Selector};

/// Handle to an element in a [`MemoryDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

const ROOT: NodeId = NodeId(0);
const BODY: NodeId = NodeId(1);

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    attributes: BTreeMap<String, String>,
    value: String,
    checked: bool,
    text: String,
    style: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Inner {
    nodes: Vec<NodeData>,
    focused: Option<NodeId>,
    viewport_width: f64,
    scroll_y: f64,
}

impl Inner {
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            ..NodeData::default()
        });
        id
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != id);
        }
    }

    fn is_connected(&self, mut id: NodeId) -> bool {
        loop {
            if id == ROOT {
                return true;
            }
            match self.node(id).parent {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        let data = self.node(id);
        selector.matches_with(&data.tag, &|name: &str| {
            data.attributes.get(name).map(String::as_str)
        })
    }

    fn descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.node(id).children {
            out.push(*child);
            self.descendants(*child, out);
        }
    }

    fn text_content(&self, id: NodeId, out: &mut String) {
        let data = self.node(id);
        out.push_str(&data.text);
        for child in &data.children {
            self.text_content(*child, out);
        }
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let data = self.node(id);
        let _ = write!(out, "<{}", data.tag);
        for (name, value) in &data.attributes {
            if value.is_empty() {
                let _ = write!(out, " {name}");
            } else {
                let _ = write!(out, " {name}=\"{value}\"");
            }
        }
        out.push('>');
        out.push_str(&data.text);
        for child in &data.children {
            self.write_html(*child, out);
        }
        let _ = write!(out, "</{}>", data.tag);
    }
}

/// Shared in-memory document with an `<html>` root and a `<body>`.
///
/// Cloning yields another handle to the same document.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    inner: Rc<RefCell<Inner>>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Create an empty document with a 1280px wide viewport scrolled to the top.
    pub fn new() -> Self {
        let mut inner = Inner {
            nodes: Vec::new(),
            focused: None,
            viewport_width: 1280.0,
            scroll_y: 0.0,
        };
        let root = inner.push("html");
        let body = inner.push("body");
        inner.node_mut(body).parent = Some(root);
        inner.node_mut(root).children.push(body);
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Start building a detached element.
    pub fn element(&self, tag: &str) -> ElementBuilder<'_> {
        let node = self.inner.borrow_mut().push(tag);
        ElementBuilder { dom: self, node }
    }

    /// Element that last received focus.
    pub fn focused(&self) -> Option<NodeId> {
        self.inner.borrow().focused
    }

    pub fn set_viewport_width(&self, width: f64) {
        self.inner.borrow_mut().viewport_width = width;
    }

    pub fn set_scroll_y(&self, y: f64) {
        self.inner.borrow_mut().scroll_y = y;
    }

    /// Inline style property, if set.
    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.inner.borrow().node(node).style.get(property).cloned()
    }

    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.inner
            .borrow()
            .node(node)
            .attributes
            .get("class")
            .map(|c| c.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node).parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.borrow().node(node).children.clone()
    }

    /// Serialize `node` and its subtree. Attributes are sorted by name.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.inner.borrow().write_html(node, &mut out);
        out
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn document_element(&self) -> NodeId {
        ROOT
    }

    fn body(&self) -> Option<NodeId> {
        Some(BODY)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.query(None, &Selector::id(id))
    }

    fn query_all(&self, scope: Option<&NodeId>, selector: &Selector) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let mut candidates = Vec::new();
        match scope {
            Some(scope) => inner.descendants(*scope, &mut candidates),
            None => {
                candidates.push(ROOT);
                inner.descendants(ROOT, &mut candidates);
            }
        }
        candidates
            .into_iter()
            .filter(|id| inner.is_connected(*id) && inner.matches(*id, selector))
            .collect()
    }

    fn closest(&self, node: &NodeId, selector: &Selector) -> Option<NodeId> {
        let inner = self.inner.borrow();
        let mut current = Some(*node);
        while let Some(id) = current {
            if inner.matches(id, selector) {
                return Some(id);
            }
            current = inner.node(id).parent;
        }
        None
    }

    fn matches(&self, node: &NodeId, selector: &Selector) -> bool {
        self.inner.borrow().matches(*node, selector)
    }

    fn tag_name(&self, node: &NodeId) -> String {
        self.inner.borrow().node(*node).tag.clone()
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.inner.borrow().node(*node).attributes.get(name).cloned()
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) {
        self.inner
            .borrow_mut()
            .node_mut(*node)
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&self, node: &NodeId, name: &str) {
        self.inner.borrow_mut().node_mut(*node).attributes.remove(name);
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.classes(*node).iter().any(|c| c == class)
    }

    fn add_class(&self, node: &NodeId, class: &str) {
        let mut classes = self.classes(*node);
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            self.set_attribute(node, "class", &classes.join(" "));
        }
    }

    fn remove_class(&self, node: &NodeId, class: &str) {
        let mut classes = self.classes(*node);
        let before = classes.len();
        classes.retain(|c| c != class);
        if classes.len() != before {
            self.set_attribute(node, "class", &classes.join(" "));
        }
    }

    fn value(&self, node: &NodeId) -> String {
        self.inner.borrow().node(*node).value.clone()
    }

    fn set_value(&self, node: &NodeId, value: &str) {
        self.inner.borrow_mut().node_mut(*node).value = value.to_string();
    }

    fn is_checked(&self, node: &NodeId) -> bool {
        self.inner.borrow().node(*node).checked
    }

    fn set_checked(&self, node: &NodeId, checked: bool) {
        self.inner.borrow_mut().node_mut(*node).checked = checked;
    }

    fn text(&self, node: &NodeId) -> String {
        let mut out = String::new();
        self.inner.borrow().text_content(*node, &mut out);
        out
    }

    fn set_text(&self, node: &NodeId, text: &str) {
        let mut inner = self.inner.borrow_mut();
        let children = std::mem::take(&mut inner.node_mut(*node).children);
        for child in children {
            inner.node_mut(child).parent = None;
        }
        inner.node_mut(*node).text = text.to_string();
    }

    fn set_style(&self, node: &NodeId, property: &str, value: &str) {
        let mut inner = self.inner.borrow_mut();
        let style = &mut inner.node_mut(*node).style;
        if value.is_empty() {
            style.remove(property);
        } else {
            style.insert(property.to_string(), value.to_string());
        }
    }

    fn create_element(&self, tag: &str) -> Option<NodeId> {
        Some(self.inner.borrow_mut().push(tag))
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) {
        let mut inner = self.inner.borrow_mut();
        inner.detach(*child);
        inner.node_mut(*child).parent = Some(*parent);
        inner.node_mut(*parent).children.push(*child);
    }

    fn insert_after(&self, reference: &NodeId, node: &NodeId) {
        let mut inner = self.inner.borrow_mut();
        let Some(parent) = inner.node(*reference).parent else {
            return;
        };
        inner.detach(*node);
        let siblings = &mut inner.node_mut(parent).children;
        let index = siblings
            .iter()
            .position(|c| c == reference)
            .map_or(siblings.len(), |i| i + 1);
        siblings.insert(index, *node);
        inner.node_mut(*node).parent = Some(parent);
    }

    fn remove(&self, node: &NodeId) {
        let mut inner = self.inner.borrow_mut();
        inner.detach(*node);
        if inner.focused.is_some_and(|f| !inner.is_connected(f)) {
            inner.focused = None;
        }
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        self.inner.borrow().is_connected(*node)
    }

    fn focus(&self, node: &NodeId) {
        self.inner.borrow_mut().focused = Some(*node);
    }

    fn viewport_width(&self) -> f64 {
        self.inner.borrow().viewport_width
    }

    fn scroll_y(&self) -> f64 {
        self.inner.borrow().scroll_y
    }
}

/// Fluent builder returned by [`MemoryDom::element`].
#[derive(Debug)]
pub struct ElementBuilder<'a> {
    dom: &'a MemoryDom,
    node: NodeId,
}

impl ElementBuilder<'_> {
    pub fn attr(self, name: &str, value: &str) -> Self {
        self.dom.set_attribute(&self.node, name, value);
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Add one or more space-separated classes.
    pub fn class(self, classes: &str) -> Self {
        for class in classes.split_ascii_whitespace() {
            self.dom.add_class(&self.node, class);
        }
        self
    }

    pub fn value(self, value: &str) -> Self {
        self.dom.set_value(&self.node, value);
        self
    }

    pub fn checked(self, checked: bool) -> Self {
        self.dom.set_checked(&self.node, checked);
        self
    }

    pub fn text(self, text: &str) -> Self {
        self.dom.set_text(&self.node, text);
        self
    }

    /// Append to `parent` and return the new node.
    pub fn child_of(self, parent: &NodeId) -> NodeId {
        self.dom.append_child(parent, &self.node);
        self.node
    }

    /// Return the node without attaching it.
    pub fn build(self) -> NodeId {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_root_and_body() {
        let dom = MemoryDom::new();
        assert_eq!(dom.tag_name(&dom.document_element()), "html");
        let body = dom.body().unwrap();
        assert_eq!(dom.tag_name(&body), "body");
        assert!(dom.is_connected(&body));
    }

    #[test]
    fn test_query_all_document_order_and_scope() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let form = dom.element("form").child_of(&body);
        let a = dom.element("input").id("a").child_of(&form);
        let b = dom.element("input").id("b").child_of(&body);

        assert_eq!(dom.query_all(None, &Selector::tag("input")), vec![a, b]);
        assert_eq!(dom.query_all(Some(&form), &Selector::tag("input")), vec![a]);
        assert!(dom.query_all(Some(&form), &Selector::tag("form")).is_empty());
    }

    #[test]
    fn test_detached_nodes_are_not_found() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let lone = dom.element("div").id("lone").build();
        assert!(dom.element_by_id("lone").is_none());
        dom.append_child(&body, &lone);
        assert_eq!(dom.element_by_id("lone"), Some(lone));
        dom.remove(&lone);
        assert!(dom.element_by_id("lone").is_none());
        assert!(!dom.is_connected(&lone));
    }

    #[test]
    fn test_closest_is_inclusive() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let label = dom.element("label").class("input").child_of(&body);
        let input = dom.element("input").child_of(&label);

        let wrapper = Selector::tag("label").and(Selector::class("input"));
        assert_eq!(dom.closest(&input, &wrapper), Some(label));
        assert_eq!(dom.closest(&label, &wrapper), Some(label));
        assert_eq!(dom.closest(&input, &Selector::tag("form")), None);
    }

    #[test]
    fn test_class_edits() {
        let dom = MemoryDom::new();
        let node = dom.element("div").class("a b").build();
        dom.add_class(&node, "b");
        dom.add_class(&node, "c");
        dom.remove_class(&node, "a");
        assert_eq!(dom.classes(node), vec!["b", "c"]);
        dom.toggle_class(&node, "b", false);
        assert!(!dom.has_class(&node, "b"));
    }

    #[test]
    fn test_insert_after_places_next_sibling() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let first = dom.element("label").child_of(&body);
        let last = dom.element("span").child_of(&body);
        let hint = dom.create_element("p").unwrap();
        dom.insert_after(&first, &hint);
        assert_eq!(dom.children(body), vec![first, hint, last]);
    }

    #[test]
    fn test_set_text_replaces_children() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let p = dom.element("p").child_of(&body);
        dom.element("b").text("old").child_of(&p);
        dom.set_text(&p, "new <b>");
        assert_eq!(dom.text(&p), "new <b>");
        assert!(dom.children(p).is_empty());
    }

    #[test]
    fn test_outer_html() {
        let dom = MemoryDom::new();
        let node = dom
            .element("dialog")
            .id("m")
            .class("modal")
            .attr("open", "")
            .text("hi")
            .build();
        assert_eq!(
            dom.outer_html(node),
            "<dialog class=\"modal\" id=\"m\" open>hi</dialog>"
        );
    }

    #[test]
    fn test_removing_focused_subtree_clears_focus() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let dialog = dom.element("dialog").child_of(&body);
        let button = dom.element("button").child_of(&dialog);
        dom.focus(&button);
        assert_eq!(dom.focused(), Some(button));
        dom.remove(&dialog);
        assert_eq!(dom.focused(), None);
    }
}

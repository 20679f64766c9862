//! Document abstraction the controllers are written against.
//!
//! [`Dom`] covers the handful of document operations the controllers need:
//! lookup by id and selector, attribute and class edits, form values, and
//! element creation. [`MemoryDom`](crate::memory_dom::MemoryDom) implements
//! it in memory; the `celestia-wasm` crate implements it over `web-sys`.
//!
//! Selectors are structured values rather than strings so the in-memory
//! document can match them directly; [`Selector::to_css`] produces the
//! equivalent CSS for the browser.

use std::fmt;

/// A subset of CSS selectors: simple selectors, compounds, lists and
/// negation. Descendant combinators are expressed by scoping a query to a
/// node instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// `tag`
    Tag(String),
    /// `#id`
    Id(String),
    /// `.class`
    Class(String),
    /// `[name]`
    Attr(String),
    /// `[name="value"]`
    AttrEq(String, String),
    /// Compound: every part must match (`input.a[b]`).
    And(Vec<Selector>),
    /// List: any part may match (`a, b`).
    Any(Vec<Selector>),
    /// `:not(inner)`
    Not(Box<Selector>),
}

impl Selector {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    pub fn attr(name: impl Into<String>) -> Self {
        Self::Attr(name.into())
    }

    pub fn attr_eq(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::AttrEq(name.into(), value.into())
    }

    /// Compound of `self` and `other`.
    pub fn and(self, other: Selector) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Selector list of `self` and `other`.
    pub fn or(self, other: Selector) -> Self {
        match self {
            Self::Any(mut parts) => {
                parts.push(other);
                Self::Any(parts)
            }
            first => Self::Any(vec![first, other]),
        }
    }

    /// `:not(self)`
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Render as a CSS selector string.
    pub fn to_css(&self) -> String {
        match self {
            Self::Tag(tag) => tag.clone(),
            Self::Id(id) => format!("#{}", escape_ident(id)),
            Self::Class(class) => format!(".{}", escape_ident(class)),
            Self::Attr(name) => format!("[{name}]"),
            Self::AttrEq(name, value) => format!("[{name}=\"{}\"]", escape_string(value)),
            Self::And(parts) => {
                // Type selectors must lead a compound.
                let (tags, rest): (Vec<_>, Vec<_>) =
                    parts.iter().partition(|p| matches!(p, Self::Tag(_)));
                tags.iter().chain(rest.iter()).map(|p| p.to_css()).collect()
            }
            Self::Any(parts) => parts
                .iter()
                .map(Selector::to_css)
                .collect::<Vec<_>>()
                .join(", "),
            Self::Not(inner) => format!(":not({})", inner.to_css()),
        }
    }

    /// Match against an element described by its tag and an attribute
    /// lookup. Classes are read from the `class` attribute.
    pub fn matches_with<'a, F>(&self, tag: &str, attribute: &F) -> bool
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        match self {
            Self::Tag(expected) => expected.eq_ignore_ascii_case(tag),
            Self::Id(expected) => attribute("id") == Some(expected.as_str()),
            Self::Class(expected) => attribute("class")
                .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == expected)),
            Self::Attr(name) => attribute(name).is_some(),
            Self::AttrEq(name, value) => attribute(name) == Some(value.as_str()),
            Self::And(parts) => parts.iter().all(|p| p.matches_with(tag, attribute)),
            Self::Any(parts) => parts.iter().any(|p| p.matches_with(tag, attribute)),
            Self::Not(inner) => !inner.matches_with(tag, attribute),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

fn escape_ident(ident: &str) -> String {
    ident
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
                c.to_string()
            } else {
                format!("\\{c}")
            }
        })
        .collect()
}

fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Elements that can take keyboard focus, in the order a dialog should try
/// them.
pub fn focusable() -> Selector {
    Selector::tag("button")
        .or(Selector::attr("href"))
        .or(Selector::tag("input"))
        .or(Selector::tag("select"))
        .or(Selector::tag("textarea"))
        .or(Selector::attr("tabindex").and(Selector::attr_eq("tabindex", "-1").negate()))
}

/// Document and window operations used by the controllers.
///
/// All methods take `&self`: implementations are handles onto a shared,
/// single-threaded document. Operations on a node that is no longer in the
/// document are allowed and have no visible effect.
pub trait Dom {
    /// Element handle. Cheap to clone; equality is node identity.
    type Node: Clone + PartialEq + fmt::Debug;

    /// The `<html>` element.
    fn document_element(&self) -> Self::Node;

    fn body(&self) -> Option<Self::Node>;

    /// First connected element with the given id.
    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// Connected descendants of `scope` (or of the document) matching
    /// `selector`, in document order. `scope` itself is not included.
    fn query_all(&self, scope: Option<&Self::Node>, selector: &Selector) -> Vec<Self::Node>;

    /// First match of [`query_all`](Dom::query_all).
    fn query(&self, scope: Option<&Self::Node>, selector: &Selector) -> Option<Self::Node> {
        self.query_all(scope, selector).into_iter().next()
    }

    /// Nearest inclusive ancestor of `node` matching `selector`.
    fn closest(&self, node: &Self::Node, selector: &Selector) -> Option<Self::Node>;

    fn matches(&self, node: &Self::Node, selector: &Selector) -> bool;

    /// Lowercase tag name.
    fn tag_name(&self, node: &Self::Node) -> String;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn has_attribute(&self, node: &Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);

    fn remove_attribute(&self, node: &Self::Node, name: &str);

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    fn add_class(&self, node: &Self::Node, class: &str);

    fn remove_class(&self, node: &Self::Node, class: &str);

    /// Add `class` when `on`, remove it otherwise.
    fn toggle_class(&self, node: &Self::Node, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    /// Current value of a form control; empty for other elements.
    fn value(&self, node: &Self::Node) -> String;

    fn set_value(&self, node: &Self::Node, value: &str);

    fn is_checked(&self, node: &Self::Node) -> bool;

    fn set_checked(&self, node: &Self::Node, checked: bool);

    fn text(&self, node: &Self::Node) -> String;

    /// Replace the node's children with a single text node.
    fn set_text(&self, node: &Self::Node, text: &str);

    /// Set an inline style property. An empty value clears it.
    fn set_style(&self, node: &Self::Node, property: &str, value: &str);

    /// Create a detached element. `None` if the host refused the tag name.
    fn create_element(&self, tag: &str) -> Option<Self::Node>;

    fn append_child(&self, parent: &Self::Node, child: &Self::Node);

    /// Insert `node` as the next sibling of `reference`.
    fn insert_after(&self, reference: &Self::Node, node: &Self::Node);

    /// Detach `node` from its parent.
    fn remove(&self, node: &Self::Node);

    fn is_connected(&self, node: &Self::Node) -> bool;

    fn focus(&self, node: &Self::Node);

    /// Open a `<dialog>` modally.
    fn show_modal(&self, node: &Self::Node) {
        self.set_attribute(node, "open", "");
    }

    /// Close a `<dialog>`.
    fn close_dialog(&self, node: &Self::Node) {
        self.remove_attribute(node, "open");
    }

    /// Viewport width in CSS pixels.
    fn viewport_width(&self) -> f64;

    /// Vertical scroll offset in CSS pixels.
    fn scroll_y(&self) -> f64;
}

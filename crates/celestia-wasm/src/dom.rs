//! [`Dom`] over the live browser document.

use celestia::dom::{Dom, Selector};
use tracing::debug;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, HtmlDialogElement, HtmlElement, HtmlInputElement, HtmlSelectElement,
    HtmlTextAreaElement, NodeList, Window,
};

/// Handle onto the page's `window` and `document`.
#[derive(Debug, Clone)]
pub struct BrowserDom {
    window: Window,
    document: Document,
    root: Element,
}

impl BrowserDom {
    /// Connect to the current page.
    ///
    /// # Errors
    /// Fails outside a browser main thread, where there is no `window` or
    /// `document`.
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let root = document
            .document_element()
            .ok_or_else(|| JsValue::from_str("no document element"))?;
        Ok(Self {
            window,
            document,
            root,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

fn report<T>(op: &'static str, result: Result<T, JsValue>) {
    if let Err(err) = result {
        debug!(op, error = ?err, "DOM operation failed");
    }
}

fn elements(list: Result<NodeList, JsValue>) -> Vec<Element> {
    let Ok(list) = list else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

impl Dom for BrowserDom {
    type Node = Element;

    fn document_element(&self) -> Element {
        self.root.clone()
    }

    fn body(&self) -> Option<Element> {
        self.document.body().map(Into::into)
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn query_all(&self, scope: Option<&Element>, selector: &Selector) -> Vec<Element> {
        let css = selector.to_css();
        match scope {
            Some(scope) => elements(scope.query_selector_all(&css)),
            None => elements(self.document.query_selector_all(&css)),
        }
    }

    fn query(&self, scope: Option<&Element>, selector: &Selector) -> Option<Element> {
        let css = selector.to_css();
        let found = match scope {
            Some(scope) => scope.query_selector(&css),
            None => self.document.query_selector(&css),
        };
        found.ok().flatten()
    }

    fn closest(&self, node: &Element, selector: &Selector) -> Option<Element> {
        node.closest(&selector.to_css()).ok().flatten()
    }

    fn matches(&self, node: &Element, selector: &Selector) -> bool {
        node.matches(&selector.to_css()).unwrap_or(false)
    }

    fn tag_name(&self, node: &Element) -> String {
        node.tag_name().to_ascii_lowercase()
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) {
        report("set_attribute", node.set_attribute(name, value));
    }

    fn remove_attribute(&self, node: &Element, name: &str) {
        report("remove_attribute", node.remove_attribute(name));
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn add_class(&self, node: &Element, class: &str) {
        report("add_class", node.class_list().add_1(class));
    }

    fn remove_class(&self, node: &Element, class: &str) {
        report("remove_class", node.class_list().remove_1(class));
    }

    fn toggle_class(&self, node: &Element, class: &str, on: bool) {
        report(
            "toggle_class",
            node.class_list().toggle_with_force(class, on),
        );
    }

    fn value(&self, node: &Element) -> String {
        if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.value()
        } else if let Some(area) = node.dyn_ref::<HtmlTextAreaElement>() {
            area.value()
        } else if let Some(select) = node.dyn_ref::<HtmlSelectElement>() {
            select.value()
        } else {
            node.get_attribute("value").unwrap_or_default()
        }
    }

    fn set_value(&self, node: &Element, value: &str) {
        if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        } else if let Some(area) = node.dyn_ref::<HtmlTextAreaElement>() {
            area.set_value(value);
        } else if let Some(select) = node.dyn_ref::<HtmlSelectElement>() {
            select.set_value(value);
        } else {
            self.set_attribute(node, "value", value);
        }
    }

    fn is_checked(&self, node: &Element) -> bool {
        node.dyn_ref::<HtmlInputElement>()
            .is_some_and(HtmlInputElement::checked)
    }

    fn set_checked(&self, node: &Element, checked: bool) {
        if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.set_checked(checked);
        }
    }

    fn text(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn set_text(&self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn set_style(&self, node: &Element, property: &str, value: &str) {
        let Some(element) = node.dyn_ref::<HtmlElement>() else {
            return;
        };
        let style = element.style();
        if value.is_empty() {
            report("remove_style", style.remove_property(property));
        } else {
            report("set_style", style.set_property(property, value));
        }
    }

    fn create_element(&self, tag: &str) -> Option<Element> {
        match self.document.create_element(tag) {
            Ok(element) => Some(element),
            Err(err) => {
                debug!(tag, error = ?err, "Cannot create element");
                None
            }
        }
    }

    fn append_child(&self, parent: &Element, child: &Element) {
        report("append_child", parent.append_child(child));
    }

    fn insert_after(&self, reference: &Element, node: &Element) {
        report("insert_after", reference.after_with_node_1(node));
    }

    fn remove(&self, node: &Element) {
        node.remove();
    }

    fn is_connected(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn focus(&self, node: &Element) {
        if let Some(element) = node.dyn_ref::<HtmlElement>() {
            report("focus", element.focus());
        }
    }

    fn show_modal(&self, node: &Element) {
        match node.dyn_ref::<HtmlDialogElement>() {
            Some(dialog) if !dialog.open() => report("show_modal", dialog.show_modal()),
            Some(_) => {}
            None => self.set_attribute(node, "open", ""),
        }
    }

    fn close_dialog(&self, node: &Element) {
        match node.dyn_ref::<HtmlDialogElement>() {
            Some(dialog) => dialog.close(),
            None => self.remove_attribute(node, "open"),
        }
    }

    fn viewport_width(&self) -> f64 {
        self.window
            .inner_width()
            .ok()
            .and_then(|width| width.as_f64())
            .unwrap_or(0.0)
    }

    fn scroll_y(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }
}

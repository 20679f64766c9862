//! Browser-based WASM tests.
//!
//! Run with: wasm-pack test --headless --chrome

#![cfg(target_arch = "wasm32")]

use std::rc::Rc;

use celestia::dom::{Dom, Selector};
use celestia::storage::{MemoryStore, PreferenceStore};
use celestia::color_scheme::SimulatedColorScheme;
use celestia::registry::UiEvent;
use celestia::{Celestia, CelestiaConfig};
use celestia_wasm::{BrowserDom, CelestiaApp, LocalStorage};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::HtmlInputElement;

wasm_bindgen_test_configure!(run_in_browser);

fn fresh_body(dom: &BrowserDom) -> web_sys::Element {
    let body = dom.body().unwrap();
    body.set_inner_html("");
    body
}

#[wasm_bindgen_test]
fn test_version() {
    let version = celestia_wasm::version();
    assert!(version.contains('.'));
}

#[wasm_bindgen_test]
fn test_selectors_run_in_browser() {
    let dom = BrowserDom::new().unwrap();
    let body = fresh_body(&dom);
    body.set_inner_html(
        r#"<form id="f"><input type="email" id="e"><input name="theme-radio" value="system"></form>"#,
    );
    let form = dom.element_by_id("f").unwrap();
    let email = Selector::tag("input").and(Selector::attr_eq("type", "email"));
    assert_eq!(dom.query_all(Some(&form), &email).len(), 1);
    assert_eq!(dom.tag_name(&form), "form");

    let input = dom.element_by_id("e").unwrap();
    assert_eq!(dom.closest(&input, &Selector::tag("form")), Some(form));
}

#[wasm_bindgen_test]
fn test_value_and_classes() {
    let dom = BrowserDom::new().unwrap();
    let body = fresh_body(&dom);
    let input = dom.create_element("input").unwrap();
    dom.append_child(&body, &input);
    dom.set_value(&input, "abc");
    assert_eq!(input.dyn_ref::<HtmlInputElement>().unwrap().value(), "abc");

    dom.toggle_class(&input, "input-error", true);
    assert!(dom.has_class(&input, "input-error"));
    dom.remove_class(&input, "input-error");
    assert!(!dom.has_class(&input, "input-error"));
}

#[wasm_bindgen_test]
fn test_local_storage_round_trip() {
    let dom = BrowserDom::new().unwrap();
    let store = LocalStorage::new(dom.window().clone());
    store.set("__celestia_test__", "celestia-dark").unwrap();
    assert_eq!(
        store.get("__celestia_test__").unwrap().as_deref(),
        Some("celestia-dark")
    );
}

#[wasm_bindgen_test]
fn test_host_over_browser_dom() {
    let dom = BrowserDom::new().unwrap();
    let body = fresh_body(&dom);
    body.set_inner_html(r#"<button data-theme-toggle><span data-theme-icon="dark"></span></button>"#);
    let host = Celestia::new(
        dom.clone(),
        Rc::new(MemoryStore::new()),
        Rc::new(SimulatedColorScheme::new(false)),
        CelestiaConfig::default(),
    )
    .unwrap();

    let icon = dom.query(None, &Selector::attr("data-theme-icon")).unwrap();
    let outcome = host.dispatch(&UiEvent::Click, Some(&icon), 0.0);
    assert!(outcome.default_prevented);
    let root = dom.document_element();
    assert_eq!(dom.attribute(&root, "data-theme").as_deref(), Some("celestia-dark"));
}

#[wasm_bindgen_test]
fn test_app_mount_and_dispose() {
    let dom = BrowserDom::new().unwrap();
    fresh_body(&dom);
    let mut app = CelestiaApp::new(None).unwrap();
    app.set_theme("light").unwrap();
    assert_eq!(app.theme(), "celestia-light");
    assert!(app.set_theme("purple").is_err());
    assert!(app.toast("hello", Some("success".into()), Some(0.0)));
    assert!(dom.query(None, &Selector::class("alert-success")).is_some());
    app.dispose();
}

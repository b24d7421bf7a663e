//! DOM helpers.
//!
//! Thin wrappers over `web_sys` so the view code stays readable. All of the
//! widget's markup lives under its own root element, so queries are always
//! scoped to a parent instead of the document.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element};

pub fn document() -> Document {
    gloo_utils::document()
}

pub fn create_element(tag: &str) -> Element {
    document().create_element(tag).unwrap()
}

pub fn query_within(parent: &Element, selector: &str) -> Option<Element> {
    parent.query_selector(selector).ok()?
}

pub fn query_typed<T: JsCast>(parent: &Element, selector: &str) -> Option<T> {
    query_within(parent, selector).and_then(|e| e.dyn_into::<T>().ok())
}

pub fn query_all_within(parent: &Element, selector: &str) -> Vec<Element> {
    let nl = parent.query_selector_all(selector).unwrap();
    let mut v = Vec::new();
    for i in 0..nl.length() {
        if let Some(e) = nl.item(i) {
            if let Ok(el) = e.dyn_into::<Element>() {
                v.push(el);
            }
        }
    }
    v
}

pub fn set_inner_html(el: &Element, html: &str) {
    el.set_inner_html(html);
}

pub fn add_class(el: &Element, cls: &str) {
    let _ = el.class_list().add_1(cls);
}

/// Escape text that ends up inside markup or attribute values. Model ids
/// and error messages come from remote endpoints and are not trusted.
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ── Event wiring ──

pub fn on_click(el: &Element, handler: impl FnMut(web_sys::MouseEvent) + 'static) {
    let cb = Closure::wrap(Box::new(handler) as Box<dyn FnMut(_)>);
    el.add_event_listener_with_callback("click", cb.as_ref().unchecked_ref())
        .unwrap();
    cb.forget();
}

pub fn on_input(el: &Element, handler: impl FnMut(web_sys::Event) + 'static) {
    let cb = Closure::wrap(Box::new(handler) as Box<dyn FnMut(_)>);
    el.add_event_listener_with_callback("input", cb.as_ref().unchecked_ref())
        .unwrap();
    cb.forget();
}

pub fn on_change(el: &Element, handler: impl FnMut(web_sys::Event) + 'static) {
    let cb = Closure::wrap(Box::new(handler) as Box<dyn FnMut(_)>);
    el.add_event_listener_with_callback("change", cb.as_ref().unchecked_ref())
        .unwrap();
    cb.forget();
}

pub fn on_keydown(el: &Element, handler: impl FnMut(web_sys::KeyboardEvent) + 'static) {
    let cb = Closure::wrap(Box::new(handler) as Box<dyn FnMut(_)>);
    el.add_event_listener_with_callback("keydown", cb.as_ref().unchecked_ref())
        .unwrap();
    cb.forget();
}

//! DOM element bindings.
//!
//! All fields are resolved once at startup; a missing element fails `start`
//! with a `JsValue` error naming its id.

use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlButtonElement, HtmlElement, HtmlInputElement, HtmlTextAreaElement};

// ── Helpers ──

pub fn document() -> Document {
    gloo_utils::document()
}

pub fn window() -> web_sys::Window {
    gloo_utils::window()
}

pub fn by_id(id: &str) -> Option<Element> {
    document().get_element_by_id(id)
}

pub fn by_id_typed<T: JsCast>(id: &str) -> Option<T> {
    by_id(id).and_then(|e| e.dyn_into::<T>().ok())
}

pub fn create_element(tag: &str) -> Result<Element, JsValue> {
    document().create_element(tag)
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn clear_children(el: &Element) {
    el.set_inner_html("");
}

pub fn get_input_value(el: &HtmlInputElement) -> String {
    el.value()
}

pub fn get_textarea_value(el: &HtmlTextAreaElement) -> String {
    el.value()
}

pub fn toggle_class(el: &Element, cls: &str, force: bool) {
    let _ = el.class_list().toggle_with_force(cls, force);
}

/// Shows or hides an element through the `hidden` class.
pub fn set_visible(el: &Element, visible: bool) {
    toggle_class(el, "hidden", !visible);
}

// ── Elements struct ──

/// DOM references used by the minting page. Clone-friendly; every field is
/// a handle into the JS heap.
#[derive(Clone)]
pub struct Elements {
    // Session
    pub connect_btn: HtmlButtonElement,
    pub account_label: Element,
    pub network_banner: Element,
    pub error_banner: Element,

    // Mint form
    pub file_input: HtmlInputElement,
    pub name_input: HtmlInputElement,
    pub description_input: HtmlTextAreaElement,
    pub mint_btn: HtmlButtonElement,
    pub mint_status: Element,

    // Gallery
    pub gallery: HtmlElement,
}

macro_rules! get_el {
    ($id:expr) => {
        by_id($id).ok_or_else(|| JsValue::from_str(&format!("missing element #{}", $id)))?
    };
}

macro_rules! get_typed {
    ($ty:ty, $id:expr) => {
        by_id_typed::<$ty>($id).ok_or_else(|| {
            JsValue::from_str(&format!("missing {} #{}", stringify!($ty), $id))
        })?
    };
}

impl Elements {
    pub fn bind() -> Result<Self, JsValue> {
        Ok(Self {
            connect_btn: get_typed!(HtmlButtonElement, "connectBtn"),
            account_label: get_el!("accountLabel"),
            network_banner: get_el!("networkBanner"),
            error_banner: get_el!("errorBanner"),

            file_input: get_typed!(HtmlInputElement, "mintFile"),
            name_input: get_typed!(HtmlInputElement, "mintName"),
            description_input: get_typed!(HtmlTextAreaElement, "mintDescription"),
            mint_btn: get_typed!(HtmlButtonElement, "mintBtn"),
            mint_status: get_el!("mintStatus"),

            gallery: get_typed!(HtmlElement, "gallery"),
        })
    }
}

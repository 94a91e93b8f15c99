//! Event binding.
//!
//! Async handlers are spawned with `wasm_bindgen_futures::spawn_local`.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::dom::Elements;
use crate::mint_form;
use crate::wallet;

/// Attach an async handler for `$event` on `$el`.
macro_rules! on_event_async {
    ($el:expr, $event:expr, $els:expr, $handler:expr) => {{
        let els = $els.clone();
        let cb = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let els2 = els.clone();
            wasm_bindgen_futures::spawn_local(async move {
                $handler(&els2).await;
            });
        }) as Box<dyn FnMut(_)>);
        $el.add_event_listener_with_callback($event, cb.as_ref().unchecked_ref())?;
        cb.forget();
    }};
}

/// Attach a sync handler for `$event` on `$el`.
macro_rules! on_event {
    ($el:expr, $event:expr, $els:expr, $handler:expr) => {{
        let els = $els.clone();
        let cb = Closure::wrap(Box::new(move |_: web_sys::Event| {
            $handler(&els);
        }) as Box<dyn FnMut(_)>);
        $el.add_event_listener_with_callback($event, cb.as_ref().unchecked_ref())?;
        cb.forget();
    }};
}

/// Bind all UI event listeners. Call once after init.
pub fn bind_events(els: &Elements) -> Result<(), JsValue> {
    // ── Session ──
    on_event_async!(els.connect_btn, "click", els, wallet::on_connect);

    // ── Mint form ──
    on_event_async!(els.file_input, "change", els, mint_form::on_file_selected);
    on_event!(els.name_input, "input", els, mint_form::on_name_input);
    on_event!(els.description_input, "input", els, mint_form::on_description_input);
    on_event_async!(els.mint_btn, "click", els, mint_form::on_mint);

    Ok(())
}

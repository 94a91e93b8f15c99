//! Gallery panel rendering.

use gm_api_types::GalleryItem;
use gm_pinning::gateway_url;
use tracing::warn;
use wasm_bindgen::prelude::*;

use crate::dom::{self, Elements};
use crate::state;

pub fn spawn_refresh(els: &Elements) {
    let els = els.clone();
    wasm_bindgen_futures::spawn_local(async move {
        refresh(&els).await;
    });
}

pub async fn refresh(els: &Elements) {
    let Some(core) = state::core() else {
        return;
    };
    render(els);
    // A dropped result means a newer load is under way and will render.
    if core.refresh_gallery().await {
        render(els);
    }
}

pub fn render(els: &Elements) {
    if let Err(err) = try_render(els) {
        warn!("gallery render failed: {err:?}");
    }
}

fn try_render(els: &Elements) -> Result<(), JsValue> {
    let Some(core) = state::core() else {
        return Ok(());
    };
    let gallery = core.gallery();
    dom::clear_children(&els.gallery);

    if core.session().account().is_none() {
        return placeholder(els, "Connect your wallet to see the collection.");
    }
    if gallery.is_loading() {
        return placeholder(els, "Loading tokens…");
    }
    if let Some(err) = gallery.error() {
        let el = placeholder_element(&err.to_string())?;
        dom::toggle_class(&el, "error", true);
        els.gallery.append_child(&el)?;
        return Ok(());
    }
    if gallery.items().is_empty() {
        return placeholder(els, "No tokens minted yet.");
    }

    let gateway = state::gateway();
    for item in gallery.items() {
        let el = card(item, &gateway)?;
        els.gallery.append_child(&el)?;
    }
    Ok(())
}

fn placeholder_element(text: &str) -> Result<web_sys::Element, JsValue> {
    let el = dom::create_element("p")?;
    el.set_class_name("gallery-empty");
    dom::set_text(&el, text);
    Ok(el)
}

fn placeholder(els: &Elements, text: &str) -> Result<(), JsValue> {
    let el = placeholder_element(text)?;
    els.gallery.append_child(&el)?;
    Ok(())
}

fn card(item: &GalleryItem, gateway: &str) -> Result<web_sys::Element, JsValue> {
    let figure = dom::create_element("figure")?;
    figure.set_class_name("token-card");

    let image: web_sys::HtmlImageElement = dom::create_element("img")?.dyn_into()?;
    // Items keep the `ipfs://` reference from the metadata; only the view
    // picks a gateway.
    image.set_src(&gateway_url(&item.image, gateway));
    image.set_alt(&item.name);
    figure.append_child(&image)?;

    let caption = dom::create_element("figcaption")?;
    dom::set_text(&caption, &item.name);
    figure.append_child(&caption)?;

    let description = dom::create_element("p")?;
    dom::set_text(&description, &item.description);
    figure.append_child(&description)?;

    Ok(figure)
}

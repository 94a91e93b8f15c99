//! Mint form: file picker, text fields and the status line.

use gm_api_types::ImageFile;
use gm_mint_core::{MintError, MintFormState, MintPhase};
use js_sys::Uint8Array;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::dom::{self, Elements};
use crate::gallery_view;
use crate::state;

async fn read_file(file: &web_sys::File) -> Result<ImageFile, JsValue> {
    let buffer = JsFuture::from(file.array_buffer()).await?;
    Ok(ImageFile {
        file_name: file.name(),
        mime_type: file.type_(),
        bytes: Uint8Array::new(&buffer).to_vec(),
    })
}

pub async fn on_file_selected(els: &Elements) {
    let Some(core) = state::core() else {
        return;
    };
    let selected = els.file_input.files().and_then(|files| files.get(0));
    let image = match selected {
        Some(file) => match read_file(&file).await {
            Ok(image) => Some(image),
            Err(err) => {
                warn!("could not read selected file: {err:?}");
                None
            }
        },
        None => None,
    };
    core.mint().select_file(image);
}

pub fn on_name_input(els: &Elements) {
    if let Some(core) = state::core() {
        core.mint().set_name(dom::get_input_value(&els.name_input));
    }
}

pub fn on_description_input(els: &Elements) {
    if let Some(core) = state::core() {
        core.mint().set_description(dom::get_textarea_value(&els.description_input));
    }
}

pub async fn on_mint(els: &Elements) {
    let Some(core) = state::core() else {
        return;
    };
    match core.submit_mint().await {
        Ok(outcome) => {
            info!(token_uri = %outcome.token_uri, "token minted");
            gallery_view::render(els);
        }
        // The button is disabled while minting; a double click can still race it.
        Err(MintError::InFlight) => {}
        Err(err) => warn!(class = ?err.class(), "mint rejected: {err}"),
    }
}

fn status_text(state: &MintFormState) -> String {
    match state.phase {
        MintPhase::Uploading => "Uploading image and metadata to IPFS…".to_owned(),
        MintPhase::AwaitingConfirmation => "Waiting for the transaction to confirm…".to_owned(),
        MintPhase::Idle => match (&state.error, state.success) {
            (Some(err), _) => err.to_string(),
            (None, true) => match state.last_token {
                Some(token) => format!("Minted token {token}!"),
                None => "Minted!".to_owned(),
            },
            (None, false) => String::new(),
        },
    }
}

/// Mirrors the core's form state into the DOM.
pub fn render(els: &Elements, state: &MintFormState) {
    if dom::get_input_value(&els.name_input) != state.name {
        els.name_input.set_value(&state.name);
    }
    if dom::get_textarea_value(&els.description_input) != state.description {
        els.description_input.set_value(&state.description);
    }
    if state.file.is_none() && !els.file_input.value().is_empty() {
        els.file_input.set_value("");
    }

    let busy = state.in_flight();
    els.mint_btn.set_disabled(busy);
    els.file_input.set_disabled(busy);
    els.name_input.set_disabled(busy);
    els.description_input.set_disabled(busy);

    dom::set_text(&els.mint_status, &status_text(state));
    dom::toggle_class(&els.mint_status, "error", state.error.is_some());
    dom::toggle_class(&els.mint_status, "success", state.success);
}

//! Connect button, account label and the two banners.

use gm_mint_core::{ErrorClass, SessionChange, SessionError};
use tracing::info;

use crate::dom::{self, Elements};
use crate::gallery_view;
use crate::state;

pub fn show_error(els: &Elements, class: ErrorClass, message: &str) {
    dom::toggle_class(&els.error_banner, "provider-missing", class == ErrorClass::ProviderMissing);
    dom::set_text(&els.error_banner, message);
    dom::set_visible(&els.error_banner, true);
}

pub fn clear_error(els: &Elements) {
    dom::set_visible(&els.error_banner, false);
}

fn show_session_error(els: &Elements, err: &SessionError) {
    show_error(els, err.class(), &err.to_string());
}

pub fn render_session(els: &Elements) {
    let Some(core) = state::core() else {
        return;
    };
    let session = core.session();

    match session.account() {
        Some(account) => {
            dom::set_text(&els.account_label, &account.0);
            els.connect_btn.set_disabled(true);
        }
        None => {
            dom::set_text(&els.account_label, "Not connected");
            els.connect_btn.set_disabled(false);
        }
    }

    let wrong_network = session.account().is_some() && !session.is_expected_network();
    if let Some(chain) = session.chain().filter(|_| wrong_network) {
        dom::set_text(
            &els.network_banner,
            &format!("Wallet is on network {chain}; switch to the collection's network to mint."),
        );
    }
    dom::set_visible(&els.network_banner, wrong_network);
}

/// Reacts to session changes pushed by the core.
pub fn on_session_change(els: &Elements, change: &SessionChange) {
    render_session(els);
    match change {
        SessionChange::Connected(_) | SessionChange::Switched(_) => {
            clear_error(els);
            gallery_view::spawn_refresh(els);
        }
        SessionChange::Disconnected => gallery_view::render(els),
        SessionChange::Reloading => {}
    }
}

pub async fn on_connect(els: &Elements) {
    let Some(core) = state::core() else {
        return;
    };
    match core.session().connect().await {
        Ok(account) => info!(%account, "wallet connected"),
        Err(err) => show_session_error(els, &err),
    }
    render_session(els);
}

/// Startup check; adopts an account the wallet already authorized.
pub async fn restore(els: &Elements) {
    let Some(core) = state::core() else {
        return;
    };
    if let Err(err) = core.session().restore().await {
        show_session_error(els, &err);
    }
    render_session(els);
}

use gm_mint_core::PageControl;
use tracing::warn;

use crate::dom;

/// Reloads the whole document, dropping every pending future with it.
pub struct BrowserPage;

impl PageControl for BrowserPage {
    fn reload(&self) {
        if let Err(err) = dom::window().location().reload() {
            warn!("page reload failed: {err:?}");
        }
    }
}

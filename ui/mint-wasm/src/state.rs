//! Global application state.
//!
//! `thread_local!` storage; WASM is single-threaded. Closures registered on
//! the DOM and on the core reach the core through here instead of capturing
//! it, which keeps `MintCore` free of reference cycles.

use gm_mint_core::MintCore;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
pub struct AppState {
    pub core: Option<Rc<MintCore>>,
    pub gateway: String,
}

thread_local! {
    static STATE: RefCell<AppState> = RefCell::new(AppState::default());
}

pub fn with<F, R>(f: F) -> R
where
    F: FnOnce(&AppState) -> R,
{
    STATE.with(|s| f(&s.borrow()))
}

pub fn with_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut AppState) -> R,
{
    STATE.with(|s| f(&mut s.borrow_mut()))
}

pub fn install(core: Rc<MintCore>, gateway: String) {
    with_mut(|s| {
        s.core = Some(core);
        s.gateway = gateway;
    });
}

pub fn core() -> Option<Rc<MintCore>> {
    with(|s| s.core.clone())
}

pub fn gateway() -> String {
    with(|s| s.gateway.clone())
}

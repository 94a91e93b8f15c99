//! GalleryMint WASM front end.
//!
//! Binds the minting page to `gm-mint-core`: the injected wallet provides
//! accounts and signs, Pinata stores images and metadata, and the gallery is
//! read back through the configured IPFS gateway.

pub mod config;
pub mod delay;
pub mod dom;
pub mod events;
pub mod gallery_view;
pub mod logging;
pub mod mint_form;
pub mod page;
pub mod provider;
pub mod state;
pub mod wallet;

use gm_contract_evm::EvmContractBinder;
use gm_mint_core::{ErrorClass, MintCore, WalletSession};
use gm_pinning::{GatewayClient, PinataClient, PinningService};
use gm_wallet_provider::{RpcProvider, WalletProvider};
use std::rc::Rc;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;

/// WASM entry point – called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    init().await
}

async fn init() -> Result<(), JsValue> {
    let config = config::load();
    logging::init(config.as_ref().map_or("info", |config| config.log_filter.as_str()));
    let els = dom::Elements::bind()?;

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            wallet::show_error(&els, ErrorClass::Network, &err.to_string());
            return Err(JsValue::from_str(&err.to_string()));
        }
    };

    let provider = match provider::InjectedProvider::detect() {
        Some(injected) => Some(injected as Rc<dyn WalletProvider>),
        None => match config.rpc_url.clone() {
            Some(url) => {
                info!(%url, "no injected wallet provider; using dev node");
                Some(Rc::new(RpcProvider::new(Some(url))) as Rc<dyn WalletProvider>)
            }
            None => {
                info!("no injected wallet provider found");
                None
            }
        },
    };

    let binder = EvmContractBinder::new(
        &config.contract_address,
        Rc::new(delay::GlooDelay),
        config.receipt_policy,
    )
    .map_err(|err| JsValue::from_str(&format!("{err:#}")))?;
    let session = WalletSession::new(
        provider,
        Rc::new(binder),
        Rc::new(page::BrowserPage),
        config.expected_chain.clone(),
    );

    let jwt = config.pinata_jwt.clone().unwrap_or_else(|| {
        warn!("no Pinata JWT configured; uploads will be rejected");
        String::new()
    });
    let pinning: Rc<dyn PinningService> =
        Rc::new(PinataClient::new(Some(config.pinata_url.clone()), jwt));

    let core = MintCore::new(session, pinning, Rc::new(GatewayClient::new()), &config);
    state::install(core.clone(), config.gateway_url.clone());

    {
        let els = els.clone();
        core.session()
            .observe(move |change| wallet::on_session_change(&els, change));
    }
    {
        let els = els.clone();
        core.mint().observe(move |form| mint_form::render(&els, form));
    }
    core.session().attach();

    events::bind_events(&els)?;

    wallet::render_session(&els);
    mint_form::render(&els, &core.mint().state());
    gallery_view::render(&els);

    wallet::restore(&els).await;

    Ok(())
}

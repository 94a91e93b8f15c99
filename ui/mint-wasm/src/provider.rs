//! The wallet extension's injected `window.ethereum` object.

use async_trait::async_trait;
use gm_api_types::ChainId;
use gm_wallet_provider::{
    INTERNAL_ERROR, Listener, ListenerId, ListenerSet, ProviderError, ProviderEvent, WalletProvider,
    parse_accounts,
};
use js_sys::{Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::{Value, json};
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::dom;

const ACCOUNTS_CHANGED: &str = "accountsChanged";
const CHAIN_CHANGED: &str = "chainChanged";

type Handler = Closure<dyn FnMut(JsValue)>;

pub struct InjectedProvider {
    ethereum: Object,
    listeners: Rc<ListenerSet>,
    handlers: Vec<(&'static str, Handler)>,
}

impl InjectedProvider {
    /// Returns `None` when no wallet extension injected a provider.
    pub fn detect() -> Option<Rc<Self>> {
        let ethereum = Reflect::get(&dom::window(), &JsValue::from_str("ethereum")).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return None;
        }
        let ethereum: Object = ethereum.dyn_into().ok()?;

        let listeners = Rc::new(ListenerSet::default());
        let mut provider = Self {
            ethereum,
            listeners,
            handlers: Vec::new(),
        };

        let set = provider.listeners.clone();
        provider.listen(ACCOUNTS_CHANGED, move |value| {
            let accounts = serde_wasm_bindgen::from_value::<Value>(value)
                .map_err(|err| ProviderError::internal(err.to_string()))
                .and_then(|value| parse_accounts(&value));
            match accounts {
                Ok(accounts) => set.emit(&ProviderEvent::AccountsChanged(accounts)),
                Err(err) => warn!("ignoring malformed {ACCOUNTS_CHANGED} payload: {err}"),
            }
        });

        let set = provider.listeners.clone();
        provider.listen(CHAIN_CHANGED, move |value| match value.as_string() {
            Some(chain) => set.emit(&ProviderEvent::ChainChanged(ChainId(chain))),
            None => warn!("ignoring malformed {CHAIN_CHANGED} payload"),
        });

        Some(Rc::new(provider))
    }

    fn listen(&mut self, event: &'static str, handler: impl FnMut(JsValue) + 'static) {
        let closure = Handler::new(handler);
        match self.call("on", event, &closure) {
            Ok(()) => self.handlers.push((event, closure)),
            Err(err) => warn!("failed to subscribe to {event}: {err:?}"),
        }
    }

    fn call(&self, method: &str, event: &str, closure: &Handler) -> Result<(), JsValue> {
        let function: Function = Reflect::get(&self.ethereum, &JsValue::from_str(method))?.dyn_into()?;
        function.call2(&self.ethereum, &JsValue::from_str(event), closure.as_ref())?;
        Ok(())
    }
}

impl Drop for InjectedProvider {
    fn drop(&mut self) {
        for (event, closure) in &self.handlers {
            if let Err(err) = self.call("removeListener", event, closure) {
                debug!("removeListener {event} failed: {err:?}");
            }
        }
    }
}

/// Wallets reject with `{ code, message }`; anything else becomes an
/// internal error.
fn provider_error(err: JsValue) -> ProviderError {
    let code = Reflect::get(&err, &JsValue::from_str("code"))
        .ok()
        .and_then(|code| code.as_f64())
        .map(|code| code as i64)
        .unwrap_or(INTERNAL_ERROR);
    let message = Reflect::get(&err, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    ProviderError::new(code, message)
}

#[async_trait(?Send)]
impl WalletProvider for InjectedProvider {
    fn name(&self) -> &str {
        "injected"
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let arguments = json!({ "method": method, "params": params })
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|err| ProviderError::internal(err.to_string()))?;

        let request: Function = Reflect::get(&self.ethereum, &JsValue::from_str("request"))
            .and_then(|function| function.dyn_into())
            .map_err(|_| ProviderError::internal("provider has no request method"))?;
        let promise: Promise = request
            .call1(&self.ethereum, &arguments)
            .map_err(provider_error)?
            .dyn_into()
            .map_err(|_| ProviderError::internal("request did not return a promise"))?;

        let result = JsFuture::from(promise).await.map_err(provider_error)?;
        if result.is_undefined() || result.is_null() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result).map_err(|err| ProviderError::internal(err.to_string()))
    }

    fn subscribe(&self, listener: Listener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

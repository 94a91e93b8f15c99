use async_trait::async_trait;
use gm_api_types::{ChainId, WalletAddress};
use serde_json::Value;
use std::cell::{Cell, RefCell};

use crate::{
    ETH_ACCOUNTS, ETH_CHAIN_ID, ETH_REQUEST_ACCOUNTS, Listener, ListenerId, ListenerSet,
    ProviderError, ProviderEvent, WalletProvider,
};

type RequestHandler = Box<dyn Fn(&str, &Value) -> Option<Result<Value, ProviderError>>>;

/// In-memory provider that behaves like a wallet extension.
///
/// Account access is granted on the first `eth_requestAccounts` unless
/// rejection is switched on. Methods other than the account/chain queries are
/// answered by the handler installed with [`ScriptedProvider::on_request`].
pub struct ScriptedProvider {
    accounts: RefCell<Vec<WalletAddress>>,
    chain: RefCell<ChainId>,
    authorized: Cell<bool>,
    reject_access: Cell<bool>,
    handler: RefCell<Option<RequestHandler>>,
    calls: RefCell<Vec<String>>,
    listeners: ListenerSet,
}

impl ScriptedProvider {
    pub fn new(accounts: Vec<WalletAddress>, chain: ChainId) -> Self {
        Self {
            accounts: RefCell::new(accounts),
            chain: RefCell::new(chain),
            authorized: Cell::new(false),
            reject_access: Cell::new(false),
            handler: RefCell::new(None),
            calls: RefCell::new(Vec::new()),
            listeners: ListenerSet::default(),
        }
    }

    /// Pretend the user approved this site in an earlier visit.
    pub fn authorized(self) -> Self {
        self.authorized.set(true);
        self
    }

    pub fn reject_access_requests(&self, reject: bool) {
        self.reject_access.set(reject);
    }

    pub fn on_request<F>(&self, handler: F)
    where
        F: Fn(&str, &Value) -> Option<Result<Value, ProviderError>> + 'static,
    {
        *self.handler.borrow_mut() = Some(Box::new(handler));
    }

    pub fn switch_accounts(&self, accounts: Vec<WalletAddress>) {
        *self.accounts.borrow_mut() = accounts.clone();
        self.listeners.emit(&ProviderEvent::AccountsChanged(accounts));
    }

    pub fn switch_chain(&self, chain: ChainId) {
        *self.chain.borrow_mut() = chain.clone();
        self.listeners.emit(&ProviderEvent::ChainChanged(chain));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|call| *call == method).count()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn account_list(&self) -> Value {
        Value::Array(
            self.accounts
                .borrow()
                .iter()
                .map(|account| Value::String(account.0.clone()))
                .collect(),
        )
    }
}

#[async_trait(?Send)]
impl WalletProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.calls.borrow_mut().push(method.to_owned());

        match method {
            ETH_REQUEST_ACCOUNTS => {
                if self.reject_access.get() {
                    return Err(ProviderError::user_rejected());
                }
                self.authorized.set(true);
                Ok(self.account_list())
            }
            ETH_ACCOUNTS => {
                if self.authorized.get() {
                    Ok(self.account_list())
                } else {
                    Ok(Value::Array(Vec::new()))
                }
            }
            ETH_CHAIN_ID => Ok(Value::String(self.chain.borrow().0.clone())),
            _ => {
                let handler = self.handler.borrow();
                handler
                    .as_ref()
                    .and_then(|handler| handler(method, &params))
                    .unwrap_or_else(|| Err(ProviderError::unsupported_method(method)))
            }
        }
    }

    fn subscribe(&self, listener: Listener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{UNSUPPORTED_METHOD, authorized_accounts, chain_id, request_accounts};
    use serde_json::json;
    use std::rc::Rc;

    fn alice() -> WalletAddress {
        WalletAddress("0x00000000000000000000000000000000000a11ce".to_owned())
    }

    #[tokio::test]
    async fn passive_check_sees_nothing_until_access_granted() {
        let provider = ScriptedProvider::new(vec![alice()], ChainId("0xaa36a7".to_owned()));

        assert!(authorized_accounts(&provider).await.expect("accounts").is_empty());
        assert_eq!(request_accounts(&provider).await.expect("granted"), vec![alice()]);
        assert_eq!(authorized_accounts(&provider).await.expect("accounts"), vec![alice()]);
        assert_eq!(
            chain_id(&provider).await.expect("chain"),
            ChainId("0xaa36a7".to_owned())
        );
    }

    #[tokio::test]
    async fn rejected_prompt_returns_4001() {
        let provider = ScriptedProvider::new(vec![alice()], ChainId("0x1".to_owned()));
        provider.reject_access_requests(true);

        let err = request_accounts(&provider).await.expect_err("rejected");
        assert!(err.is_user_rejected());
        assert!(authorized_accounts(&provider).await.expect("accounts").is_empty());
    }

    #[tokio::test]
    async fn unknown_methods_go_through_the_handler() {
        let provider = ScriptedProvider::new(vec![alice()], ChainId("0x1".to_owned()));

        let err = provider
            .request("eth_blockNumber", json!([]))
            .await
            .expect_err("no handler yet");
        assert_eq!(err.code, UNSUPPORTED_METHOD);

        provider.on_request(|method, _| (method == "eth_blockNumber").then(|| Ok(json!("0x10"))));
        let value = provider.request("eth_blockNumber", json!([])).await.expect("handled");
        assert_eq!(value, json!("0x10"));
        assert_eq!(provider.call_count("eth_blockNumber"), 2);
    }

    #[test]
    fn switching_accounts_notifies_subscribers() {
        let provider = ScriptedProvider::new(vec![alice()], ChainId("0x1".to_owned()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = provider.subscribe(Rc::new(move |event: &ProviderEvent| {
            sink.borrow_mut().push(event.clone());
        }));

        provider.switch_accounts(Vec::new());
        provider.switch_chain(ChainId("0x5".to_owned()));

        assert_eq!(
            seen.borrow().as_slice(),
            &[
                ProviderEvent::AccountsChanged(Vec::new()),
                ProviderEvent::ChainChanged(ChainId("0x5".to_owned())),
            ]
        );
        assert!(provider.unsubscribe(id));
        assert_eq!(provider.listener_count(), 0);
    }
}

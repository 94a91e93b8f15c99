//! EIP-1193 style wallet provider abstraction.
//!
//! The browser front end wraps `window.ethereum`; native code talks to a dev
//! node through [`RpcProvider`]; tests script a [`ScriptedProvider`].

mod rpc;
mod scripted;

pub use rpc::{DEFAULT_RPC_URL, RpcProvider};
pub use scripted::ScriptedProvider;

use async_trait::async_trait;
use gm_api_types::{ChainId, WalletAddress};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use thiserror::Error;

pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
pub const ETH_ACCOUNTS: &str = "eth_accounts";
pub const ETH_CHAIN_ID: &str = "eth_chainId";
pub const ETH_CALL: &str = "eth_call";
pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";
pub const ETH_GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";

// EIP-1193 provider error codes.
pub const USER_REJECTED: i64 = 4001;
pub const UNAUTHORIZED: i64 = 4100;
pub const UNSUPPORTED_METHOD: i64 = 4200;
pub const DISCONNECTED: i64 = 4900;
// JSON-RPC 2.0 internal error, used for transport and decoding failures.
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} (code {code})")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED, "user rejected the request")
    }

    pub fn unsupported_method(method: &str) -> Self {
        Self::new(UNSUPPORTED_METHOD, format!("unsupported method: {method}"))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code == USER_REJECTED
    }
}

/// Notifications pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<WalletAddress>),
    ChainChanged(ChainId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub type Listener = Rc<dyn Fn(&ProviderEvent)>;

#[async_trait(?Send)]
pub trait WalletProvider {
    fn name(&self) -> &str;
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
    fn subscribe(&self, listener: Listener) -> ListenerId;
    fn unsubscribe(&self, id: ListenerId) -> bool;
}

/// Registry of event listeners shared by provider implementations.
#[derive(Default)]
pub struct ListenerSet {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
}

impl ListenerSet {
    pub fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Listeners may subscribe or unsubscribe while being notified, so the
    /// set is snapshotted before dispatch.
    pub fn emit(&self, event: &ProviderEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }
}

pub fn parse_accounts(value: &Value) -> Result<Vec<WalletAddress>, ProviderError> {
    let Some(entries) = value.as_array() else {
        return Err(ProviderError::internal(format!(
            "expected an account list, got {value}"
        )));
    };

    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .map(|address| WalletAddress(address.to_owned()))
                .ok_or_else(|| ProviderError::internal(format!("account is not a string: {entry}")))
        })
        .collect()
}

/// Prompts the user for account access.
pub async fn request_accounts(
    provider: &dyn WalletProvider,
) -> Result<Vec<WalletAddress>, ProviderError> {
    let value = provider.request(ETH_REQUEST_ACCOUNTS, Value::Array(Vec::new())).await?;
    parse_accounts(&value)
}

/// Accounts the site is already authorized for; never prompts.
pub async fn authorized_accounts(
    provider: &dyn WalletProvider,
) -> Result<Vec<WalletAddress>, ProviderError> {
    let value = provider.request(ETH_ACCOUNTS, Value::Array(Vec::new())).await?;
    parse_accounts(&value)
}

pub async fn chain_id(provider: &dyn WalletProvider) -> Result<ChainId, ProviderError> {
    let value = provider.request(ETH_CHAIN_ID, Value::Array(Vec::new())).await?;
    value
        .as_str()
        .map(|id| ChainId(id.to_owned()))
        .ok_or_else(|| ProviderError::internal(format!("chain id is not a string: {value}")))
}

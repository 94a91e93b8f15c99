//! Wallet session: which account is active and which contract handle goes
//! with it.
//!
//! Every account change bumps a session epoch. Work started under one epoch
//! (a gallery load, a mint) carries it along so results that arrive after the
//! user switched accounts can be recognised and dropped.

use gm_api_types::{ChainId, WalletAddress};
use gm_contract::{ContractBinder, NftContract};
use gm_wallet_provider::{
    ListenerId, ProviderEvent, WalletProvider, authorized_accounts, chain_id, request_accounts,
};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, info, warn};

use crate::error::SessionError;

/// Full page reload, requested whenever the wallet switches networks.
pub trait PageControl {
    fn reload(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Connected(WalletAddress),
    Switched(WalletAddress),
    Disconnected,
    Reloading,
}

type Observer = Rc<dyn Fn(&SessionChange)>;

/// Snapshot of a connected session.
#[derive(Clone)]
pub struct ActiveSession {
    pub account: WalletAddress,
    pub contract: Rc<dyn NftContract>,
    pub epoch: u64,
}

#[derive(Default)]
struct SessionState {
    account: Option<WalletAddress>,
    contract: Option<Rc<dyn NftContract>>,
    chain: Option<ChainId>,
    epoch: u64,
    subscription: Option<ListenerId>,
}

struct SessionInner {
    provider: Option<Rc<dyn WalletProvider>>,
    binder: Rc<dyn ContractBinder>,
    page: Rc<dyn PageControl>,
    expected_chain: Option<ChainId>,
    state: RefCell<SessionState>,
    observers: RefCell<Vec<Observer>>,
}

/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct WalletSession {
    inner: Rc<SessionInner>,
}

impl WalletSession {
    pub fn new(
        provider: Option<Rc<dyn WalletProvider>>,
        binder: Rc<dyn ContractBinder>,
        page: Rc<dyn PageControl>,
        expected_chain: Option<ChainId>,
    ) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                provider,
                binder,
                page,
                expected_chain,
                state: RefCell::new(SessionState::default()),
                observers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.inner.provider.is_some()
    }

    pub fn account(&self) -> Option<WalletAddress> {
        self.inner.state.borrow().account.clone()
    }

    pub fn contract(&self) -> Option<Rc<dyn NftContract>> {
        self.inner.state.borrow().contract.clone()
    }

    pub fn chain(&self) -> Option<ChainId> {
        self.inner.state.borrow().chain.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.inner.state.borrow().epoch
    }

    pub fn active(&self) -> Option<ActiveSession> {
        let state = self.inner.state.borrow();
        Some(ActiveSession {
            account: state.account.clone()?,
            contract: state.contract.clone()?,
            epoch: state.epoch,
        })
    }

    /// False only when both the wallet's chain and the configured chain are
    /// known and differ.
    pub fn is_expected_network(&self) -> bool {
        match (&self.inner.expected_chain, self.chain()) {
            (Some(expected), Some(actual)) => expected.matches(&actual),
            _ => true,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.state.borrow().subscription.is_some()
    }

    pub fn observe(&self, observer: impl Fn(&SessionChange) + 'static) {
        self.inner.observers.borrow_mut().push(Rc::new(observer));
    }

    /// Prompts the wallet for account access and adopts the first account.
    pub async fn connect(&self) -> Result<WalletAddress, SessionError> {
        let Some(provider) = self.inner.provider.clone() else {
            warn!("connect requested but no wallet provider is present");
            return Err(SessionError::ProviderMissing);
        };

        let accounts = request_accounts(provider.as_ref()).await.map_err(|err| {
            warn!(code = err.code, "account request failed: {}", err.message);
            SessionError::from(err)
        })?;
        let account = accounts.into_iter().next().ok_or(SessionError::NoAccounts)?;

        self.adopt(account.clone(), SessionChange::Connected);
        self.refresh_chain(provider.as_ref()).await;
        Ok(account)
    }

    /// Startup check that adopts an account the site is already authorized
    /// for. Never prompts.
    pub async fn restore(&self) -> Result<Option<WalletAddress>, SessionError> {
        let Some(provider) = self.inner.provider.clone() else {
            return Ok(None);
        };

        let accounts = authorized_accounts(provider.as_ref()).await?;
        let Some(account) = accounts.into_iter().next() else {
            debug!("no previously authorized account");
            return Ok(None);
        };

        self.adopt(account.clone(), SessionChange::Connected);
        self.refresh_chain(provider.as_ref()).await;
        Ok(Some(account))
    }

    /// Subscribes to provider notifications. Returns false without a provider.
    pub fn attach(&self) -> bool {
        let Some(provider) = self.inner.provider.as_ref() else {
            return false;
        };
        if self.is_attached() {
            return true;
        }

        let weak: Weak<SessionInner> = Rc::downgrade(&self.inner);
        let id = provider.subscribe(Rc::new(move |event: &ProviderEvent| {
            if let Some(inner) = weak.upgrade() {
                WalletSession { inner }.handle_event(event);
            }
        }));
        self.inner.state.borrow_mut().subscription = Some(id);
        debug!(provider = provider.name(), "subscribed to wallet events");
        true
    }

    pub fn detach(&self) {
        let subscription = self.inner.state.borrow_mut().subscription.take();
        if let (Some(provider), Some(id)) = (self.inner.provider.as_ref(), subscription) {
            provider.unsubscribe(id);
        }
    }

    /// Forgets the account locally. The wallet itself keeps the site
    /// authorized.
    pub fn disconnect(&self) {
        self.inner.state.borrow_mut().chain = None;
        self.clear();
    }

    pub fn handle_event(&self, event: &ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                Some(account) => self.adopt(account.clone(), SessionChange::Switched),
                None => {
                    info!("wallet reported no accounts");
                    self.clear();
                }
            },
            ProviderEvent::ChainChanged(chain) => {
                info!(%chain, "wallet switched network, reloading");
                self.inner.state.borrow_mut().chain = Some(chain.clone());
                self.notify(&SessionChange::Reloading);
                self.inner.page.reload();
            }
        }
    }

    fn adopt(&self, account: WalletAddress, change: fn(WalletAddress) -> SessionChange) {
        let Some(provider) = self.inner.provider.as_ref() else {
            return;
        };
        let contract = self.inner.binder.bind(provider, &account);
        let epoch = {
            let mut state = self.inner.state.borrow_mut();
            state.epoch += 1;
            state.account = Some(account.clone());
            state.contract = Some(contract);
            state.epoch
        };
        info!(%account, epoch, "wallet account active");
        self.notify(&change(account));
    }

    fn clear(&self) {
        let epoch = {
            let mut state = self.inner.state.borrow_mut();
            state.epoch += 1;
            state.account = None;
            state.contract = None;
            state.epoch
        };
        debug!(epoch, "wallet session cleared");
        self.notify(&SessionChange::Disconnected);
    }

    async fn refresh_chain(&self, provider: &dyn WalletProvider) {
        match chain_id(provider).await {
            Ok(chain) => {
                if !self
                    .inner
                    .expected_chain
                    .as_ref()
                    .is_none_or(|expected| expected.matches(&chain))
                {
                    warn!(%chain, "wallet is on an unexpected network");
                }
                self.inner.state.borrow_mut().chain = Some(chain);
            }
            Err(err) => warn!("failed to read chain id: {err}"),
        }
    }

    fn notify(&self, change: &SessionChange) {
        let observers: Vec<Observer> = self.inner.observers.borrow().clone();
        for observer in observers {
            observer(change);
        }
    }
}

mod memory;

pub use memory::InMemoryNftContract;

use anyhow::Result;
use async_trait::async_trait;
use gm_api_types::{TokenId, TxHash, WalletAddress};
use gm_wallet_provider::WalletProvider;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub token_id: Option<TokenId>,
}

/// The three entry points of the deployed collection contract.
#[async_trait(?Send)]
pub trait NftContract {
    fn address(&self) -> &str;
    async fn mint(&self, token_uri: &str) -> Result<TxHash>;
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<MintReceipt>;
    /// Id the next mint will receive; equals the number of tokens minted so far.
    async fn token_counter(&self) -> Result<u64>;
    async fn token_uri(&self, token_id: TokenId) -> Result<String>;
}

/// Creates the contract handle for a freshly adopted account, talking
/// through the provider that account came from.
pub trait ContractBinder {
    fn bind(&self, provider: &Rc<dyn WalletProvider>, account: &WalletAddress) -> Rc<dyn NftContract>;
}

impl<F> ContractBinder for F
where
    F: Fn(&Rc<dyn WalletProvider>, &WalletAddress) -> Rc<dyn NftContract>,
{
    fn bind(&self, provider: &Rc<dyn WalletProvider>, account: &WalletAddress) -> Rc<dyn NftContract> {
        self(provider, account)
    }
}

/// Timer used between receipt polls; the browser and native runtimes differ.
#[async_trait(?Send)]
pub trait Delay {
    async fn delay(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

#[async_trait(?Send)]
impl Delay for NoDelay {
    async fn delay(&self, _duration: Duration) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptPolicy {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1500),
            max_attempts: 120,
        }
    }
}

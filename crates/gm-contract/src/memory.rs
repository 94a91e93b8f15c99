use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use gm_api_types::{TokenId, TxHash, WalletAddress};
use gm_wallet_provider::WalletProvider;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::{ContractBinder, MintReceipt, NftContract};

pub const IN_MEMORY_ADDRESS: &str = "0x0000000000000000000000000000000000c0ffee";

#[derive(Default)]
struct Ledger {
    token_uris: Vec<String>,
    owners: Vec<Option<WalletAddress>>,
    receipts: HashMap<String, Result<MintReceipt, String>>,
    counter_failure: Option<String>,
    mint_failure: Option<String>,
    revert_next: bool,
    calls: Vec<&'static str>,
}

/// Collection contract kept in memory.
///
/// Clones share one ledger, so handles bound to different accounts see the
/// same token list, as they would on chain.
#[derive(Clone, Default)]
pub struct InMemoryNftContract {
    account: Option<WalletAddress>,
    ledger: Rc<RefCell<Ledger>>,
}

impl InMemoryNftContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bound_to(&self, account: &WalletAddress) -> Self {
        Self {
            account: Some(account.clone()),
            ledger: self.ledger.clone(),
        }
    }

    pub fn account(&self) -> Option<&WalletAddress> {
        self.account.as_ref()
    }

    /// Seeds a token minted before the test starts.
    pub fn preload(&self, token_uri: &str) -> TokenId {
        let mut ledger = self.ledger.borrow_mut();
        ledger.token_uris.push(token_uri.to_owned());
        ledger.owners.push(None);
        TokenId(ledger.token_uris.len() as u64 - 1)
    }

    pub fn fail_counter_reads(&self, message: Option<&str>) {
        self.ledger.borrow_mut().counter_failure = message.map(ToOwned::to_owned);
    }

    pub fn fail_mints(&self, message: Option<&str>) {
        self.ledger.borrow_mut().mint_failure = message.map(ToOwned::to_owned);
    }

    pub fn revert_next_mint(&self) {
        self.ledger.borrow_mut().revert_next = true;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.ledger.borrow().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.ledger.borrow().calls.iter().filter(|call| **call == name).count()
    }

    pub fn token_count(&self) -> usize {
        self.ledger.borrow().token_uris.len()
    }

    pub fn owner_of(&self, token_id: TokenId) -> Option<WalletAddress> {
        self.ledger
            .borrow()
            .owners
            .get(token_id.0 as usize)
            .cloned()
            .flatten()
    }
}

fn derive_tx_hash(token_uri: &str, nonce: usize) -> TxHash {
    let digest = Sha256::digest(format!("{token_uri}:{nonce}").as_bytes());
    let mut hash = String::with_capacity(2 + digest.len() * 2);
    hash.push_str("0x");
    for byte in digest {
        hash.push_str(&format!("{byte:02x}"));
    }
    TxHash(hash)
}

#[async_trait(?Send)]
impl NftContract for InMemoryNftContract {
    fn address(&self) -> &str {
        IN_MEMORY_ADDRESS
    }

    async fn mint(&self, token_uri: &str) -> Result<TxHash> {
        let mut ledger = self.ledger.borrow_mut();
        ledger.calls.push("mint");

        if let Some(message) = ledger.mint_failure.clone() {
            bail!("{message}");
        }

        let nonce = ledger.receipts.len();
        let tx_hash = derive_tx_hash(token_uri, nonce);

        let outcome = if std::mem::take(&mut ledger.revert_next) {
            Err("transaction reverted".to_owned())
        } else {
            ledger.token_uris.push(token_uri.to_owned());
            ledger.owners.push(self.account.clone());
            Ok(MintReceipt {
                tx_hash: tx_hash.clone(),
                block_number: Some(nonce as u64 + 1),
                token_id: Some(TokenId(ledger.token_uris.len() as u64 - 1)),
            })
        };
        ledger.receipts.insert(tx_hash.0.clone(), outcome);

        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<MintReceipt> {
        let mut ledger = self.ledger.borrow_mut();
        ledger.calls.push("wait_for_receipt");

        match ledger.receipts.get(&tx_hash.0) {
            Some(Ok(receipt)) => Ok(receipt.clone()),
            Some(Err(reason)) => bail!("{reason}: {tx_hash}"),
            None => Err(anyhow!("unknown transaction {tx_hash}")),
        }
    }

    async fn token_counter(&self) -> Result<u64> {
        let mut ledger = self.ledger.borrow_mut();
        ledger.calls.push("token_counter");

        if let Some(message) = ledger.counter_failure.clone() {
            bail!("{message}");
        }
        Ok(ledger.token_uris.len() as u64)
    }

    async fn token_uri(&self, token_id: TokenId) -> Result<String> {
        let mut ledger = self.ledger.borrow_mut();
        ledger.calls.push("token_uri");

        ledger
            .token_uris
            .get(token_id.0 as usize)
            .cloned()
            .ok_or_else(|| anyhow!("nonexistent token {token_id}"))
    }
}

/// The ledger has no use for the provider; only the account is kept.
impl ContractBinder for InMemoryNftContract {
    fn bind(&self, _provider: &Rc<dyn WalletProvider>, account: &WalletAddress) -> Rc<dyn NftContract> {
        Rc::new(self.bound_to(account))
    }
}

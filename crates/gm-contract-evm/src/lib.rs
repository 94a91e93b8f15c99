use alloy_primitives::{Address, B256, U256, hex};
use alloy_sol_types::{SolCall, SolEvent, sol};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use gm_api_types::{TokenId, TxHash, WalletAddress};
use gm_contract::{ContractBinder, Delay, MintReceipt, NftContract, ReceiptPolicy};
use gm_wallet_provider::{
    ETH_CALL, ETH_GET_TRANSACTION_RECEIPT, ETH_SEND_TRANSACTION, WalletProvider,
};
use serde::Deserialize;
use serde_json::json;
use std::rc::Rc;
use std::str::FromStr;
use tracing::{debug, info, warn};

sol! {
    function mintNFT(string tokenURI) external returns (uint256);
    function tokenCounter() external view returns (uint256);
    function tokenURI(uint256 tokenId) external view returns (string);

    event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
}

/// Collection contract reached through the wallet provider's JSON-RPC.
///
/// Reads go out as `eth_call`; the mint is an `eth_sendTransaction` signed by
/// the wallet for the bound account.
pub struct EvmNftContract {
    provider: Rc<dyn WalletProvider>,
    address: Address,
    address_text: String,
    from: WalletAddress,
    delay: Rc<dyn Delay>,
    policy: ReceiptPolicy,
}

// ── JSON-RPC receipt shape ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

#[derive(Debug, Deserialize)]
struct RpcLog {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
}

fn parse_quantity(raw: &str) -> Result<u64> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).with_context(|| format!("invalid quantity {raw}"))
}

fn decode_hex(raw: &str) -> Result<Vec<u8>> {
    hex::decode(raw).map_err(|err| anyhow!("invalid hex data {raw}: {err}"))
}

fn to_u64(value: U256) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} does not fit in u64"))
}

impl EvmNftContract {
    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let params = json!([
            { "to": self.address_text, "data": hex::encode_prefixed(data) },
            "latest"
        ]);
        let value = self
            .provider
            .request(ETH_CALL, params)
            .await
            .context("eth_call")?;
        let raw = value
            .as_str()
            .ok_or_else(|| anyhow!("eth_call returned {value}"))?;
        decode_hex(raw)
    }

    fn minted_token(&self, logs: &[RpcLog]) -> Option<TokenId> {
        let signature = format!("{:#x}", Transfer::SIGNATURE_HASH);
        logs.iter()
            .filter(|log| Address::from_str(&log.address).ok() == Some(self.address))
            .filter(|log| log.topics.len() == 4 && log.topics[0].eq_ignore_ascii_case(&signature))
            .find_map(|log| {
                let topic = B256::from_str(&log.topics[3]).ok()?;
                to_u64(U256::from_be_bytes(topic.0)).ok().map(TokenId)
            })
    }
}

#[async_trait(?Send)]
impl NftContract for EvmNftContract {
    fn address(&self) -> &str {
        &self.address_text
    }

    async fn mint(&self, token_uri: &str) -> Result<TxHash> {
        let data = mintNFTCall {
            tokenURI: token_uri.to_owned(),
        }
        .abi_encode();

        let params = json!([{
            "from": self.from.0,
            "to": self.address_text,
            "data": hex::encode_prefixed(data),
        }]);
        let value = self
            .provider
            .request(ETH_SEND_TRANSACTION, params)
            .await
            .context("mintNFT transaction")?;
        let tx_hash = value
            .as_str()
            .map(|hash| TxHash(hash.to_owned()))
            .ok_or_else(|| anyhow!("eth_sendTransaction returned {value}"))?;

        info!(%tx_hash, from = %self.from, "mint submitted");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<MintReceipt> {
        for attempt in 1..=self.policy.max_attempts {
            let value = self
                .provider
                .request(ETH_GET_TRANSACTION_RECEIPT, json!([tx_hash.0]))
                .await
                .context("eth_getTransactionReceipt")?;

            if value.is_null() {
                debug!(%tx_hash, attempt, "receipt not available yet");
                self.delay.delay(self.policy.poll_interval).await;
                continue;
            }

            let receipt: RpcReceipt =
                serde_json::from_value(value).context("malformed transaction receipt")?;

            if receipt.status.as_deref().map(parse_quantity).transpose()? == Some(0) {
                bail!("transaction {} reverted", receipt.transaction_hash);
            }

            let block_number = receipt
                .block_number
                .as_deref()
                .map(parse_quantity)
                .transpose()?;
            let token_id = self.minted_token(&receipt.logs);
            if token_id.is_none() {
                warn!(%tx_hash, "no Transfer event found in mint receipt");
            }

            return Ok(MintReceipt {
                tx_hash: TxHash(receipt.transaction_hash),
                block_number,
                token_id,
            });
        }

        bail!(
            "transaction {tx_hash} not confirmed after {} attempts",
            self.policy.max_attempts
        )
    }

    async fn token_counter(&self) -> Result<u64> {
        let output = self.call(tokenCounterCall {}.abi_encode()).await?;
        let counter = tokenCounterCall::abi_decode_returns(&output)
            .map_err(|err| anyhow!("tokenCounter decode: {err}"))?;
        to_u64(counter)
    }

    async fn token_uri(&self, token_id: TokenId) -> Result<String> {
        let output = self
            .call(
                tokenURICall {
                    tokenId: U256::from(token_id.0),
                }
                .abi_encode(),
            )
            .await?;
        tokenURICall::abi_decode_returns(&output).map_err(|err| anyhow!("tokenURI decode: {err}"))
    }
}

/// Builds [`EvmNftContract`] handles for whichever account the session adopts.
pub struct EvmContractBinder {
    address: Address,
    delay: Rc<dyn Delay>,
    policy: ReceiptPolicy,
}

impl EvmContractBinder {
    pub fn new(
        contract_address: &str,
        delay: Rc<dyn Delay>,
        policy: ReceiptPolicy,
    ) -> Result<Self> {
        let address = Address::from_str(contract_address.trim())
            .map_err(|err| anyhow!("invalid contract address {contract_address}: {err}"))?;
        Ok(Self {
            address,
            delay,
            policy,
        })
    }
}

impl ContractBinder for EvmContractBinder {
    fn bind(&self, provider: &Rc<dyn WalletProvider>, account: &WalletAddress) -> Rc<dyn NftContract> {
        Rc::new(EvmNftContract {
            provider: provider.clone(),
            address: self.address,
            address_text: self.address.to_string(),
            from: account.clone(),
            delay: self.delay.clone(),
            policy: self.policy,
        })
    }
}

use gm_api_types::ChainId;
use gm_contract::ReceiptPolicy;
use gm_pinning::{DEFAULT_GATEWAY, DEFAULT_PINATA_URL};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_CONTRACT_ADDRESS: &str = "GM_CONTRACT_ADDRESS";
pub const ENV_CHAIN_ID: &str = "GM_CHAIN_ID";
pub const ENV_PINATA_JWT: &str = "GM_PINATA_JWT";
pub const ENV_PINATA_URL: &str = "GM_PINATA_URL";
pub const ENV_GATEWAY_URL: &str = "GM_GATEWAY_URL";
pub const ENV_GALLERY_SCOPE: &str = "GM_GALLERY_SCOPE";
pub const ENV_GALLERY_MAX_TOKENS: &str = "GM_GALLERY_MAX_TOKENS";
pub const ENV_RECEIPT_POLL_MS: &str = "GM_RECEIPT_POLL_MS";
pub const ENV_RECEIPT_MAX_ATTEMPTS: &str = "GM_RECEIPT_MAX_ATTEMPTS";
pub const ENV_RPC_URL: &str = "GM_RPC_URL";
pub const ENV_LOG: &str = "GM_LOG";

/// Sepolia, the test network the collection is deployed on.
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;

/// Upper bound on tokens one gallery load resolves; the counter comes from
/// the contract and is not trusted.
pub const DEFAULT_GALLERY_MAX_TOKENS: u64 = 100;

/// Which tokens the gallery resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GalleryScope {
    /// Only the most recently minted token.
    #[default]
    Latest,
    /// Every token, oldest first, capped to the newest
    /// `gallery_max_tokens`.
    All,
}

impl FromStr for GalleryScope {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "all" => Ok(Self::All),
            _ => Err(ConfigError::InvalidScope(value.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintConfig {
    pub contract_address: String,
    pub expected_chain: Option<ChainId>,
    pub pinata_url: String,
    pub pinata_jwt: Option<String>,
    pub gateway_url: String,
    pub gallery_scope: GalleryScope,
    pub gallery_max_tokens: u64,
    pub receipt_policy: ReceiptPolicy,
    /// Dev node used when no wallet extension is injected.
    pub rpc_url: Option<String>,
    pub log_filter: String,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            expected_chain: Some(ChainId::from_numeric(DEFAULT_CHAIN_ID)),
            pinata_url: DEFAULT_PINATA_URL.to_owned(),
            pinata_jwt: None,
            gateway_url: DEFAULT_GATEWAY.to_owned(),
            gallery_scope: GalleryScope::default(),
            gallery_max_tokens: DEFAULT_GALLERY_MAX_TOKENS,
            receipt_policy: ReceiptPolicy::default(),
            rpc_url: None,
            log_filter: "info".to_owned(),
        }
    }
}

impl MintConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source (process environment,
    /// values baked in at build time, test fixtures) and validates it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(address) = get(ENV_CONTRACT_ADDRESS) {
            config.contract_address = address;
        }
        if let Some(chain) = get(ENV_CHAIN_ID) {
            let chain = ChainId(chain);
            if chain.as_u64().is_none() {
                return Err(ConfigError::InvalidChain(chain.0));
            }
            config.expected_chain = Some(chain);
        }
        if let Some(url) = get(ENV_PINATA_URL) {
            config.pinata_url = url;
        }
        config.pinata_jwt = get(ENV_PINATA_JWT);
        if let Some(url) = get(ENV_GATEWAY_URL) {
            config.gateway_url = url;
        }
        if let Some(scope) = get(ENV_GALLERY_SCOPE) {
            config.gallery_scope = scope.parse()?;
        }
        if let Some(raw) = get(ENV_GALLERY_MAX_TOKENS) {
            config.gallery_max_tokens = parse_number(ENV_GALLERY_MAX_TOKENS, &raw)?;
        }
        if let Some(raw) = get(ENV_RECEIPT_POLL_MS) {
            let millis = parse_number(ENV_RECEIPT_POLL_MS, &raw)?;
            config.receipt_policy.poll_interval = Duration::from_millis(millis);
        }
        if let Some(raw) = get(ENV_RECEIPT_MAX_ATTEMPTS) {
            let attempts = parse_number(ENV_RECEIPT_MAX_ATTEMPTS, &raw)?;
            config.receipt_policy.max_attempts =
                u32::try_from(attempts).map_err(|_| ConfigError::InvalidNumber {
                    key: ENV_RECEIPT_MAX_ATTEMPTS,
                    value: raw.clone(),
                })?;
        }
        config.rpc_url = get(ENV_RPC_URL);
        if let Some(filter) = get(ENV_LOG) {
            config.log_filter = filter;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contract_address.is_empty() {
            return Err(ConfigError::MissingContractAddress);
        }
        if !is_hex_address(&self.contract_address) {
            return Err(ConfigError::InvalidContractAddress(
                self.contract_address.clone(),
            ));
        }
        if self.receipt_policy.max_attempts == 0 {
            return Err(ConfigError::InvalidNumber {
                key: ENV_RECEIPT_MAX_ATTEMPTS,
                value: "0".to_owned(),
            });
        }
        if self.gallery_max_tokens == 0 {
            return Err(ConfigError::InvalidNumber {
                key: ENV_GALLERY_MAX_TOKENS,
                value: "0".to_owned(),
            });
        }
        Ok(())
    }
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: raw.to_owned(),
    })
}

fn is_hex_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

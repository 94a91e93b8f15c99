//! Settings baked into the bundle at build time.

use gm_mint_core::config::{
    ENV_CHAIN_ID, ENV_CONTRACT_ADDRESS, ENV_GALLERY_MAX_TOKENS, ENV_GALLERY_SCOPE, ENV_GATEWAY_URL,
    ENV_LOG, ENV_PINATA_JWT, ENV_PINATA_URL, ENV_RECEIPT_MAX_ATTEMPTS, ENV_RECEIPT_POLL_MS,
    ENV_RPC_URL,
};
use gm_mint_core::{ConfigError, MintConfig};

pub fn load() -> Result<MintConfig, ConfigError> {
    MintConfig::from_lookup(baked)
}

fn baked(key: &str) -> Option<String> {
    let value = match key {
        ENV_CONTRACT_ADDRESS => option_env!("GM_CONTRACT_ADDRESS"),
        ENV_CHAIN_ID => option_env!("GM_CHAIN_ID"),
        ENV_PINATA_JWT => option_env!("GM_PINATA_JWT"),
        ENV_PINATA_URL => option_env!("GM_PINATA_URL"),
        ENV_GATEWAY_URL => option_env!("GM_GATEWAY_URL"),
        ENV_GALLERY_SCOPE => option_env!("GM_GALLERY_SCOPE"),
        ENV_GALLERY_MAX_TOKENS => option_env!("GM_GALLERY_MAX_TOKENS"),
        ENV_RECEIPT_POLL_MS => option_env!("GM_RECEIPT_POLL_MS"),
        ENV_RECEIPT_MAX_ATTEMPTS => option_env!("GM_RECEIPT_MAX_ATTEMPTS"),
        ENV_RPC_URL => option_env!("GM_RPC_URL"),
        ENV_LOG => option_env!("GM_LOG"),
        _ => None,
    };
    value.map(str::to_owned)
}

//! Token URI resolution.
//!
//! A token URI is either an embedded base64 JSON document or a pointer to a
//! remote one. Classification happens first and never touches the network,
//! so both paths can be exercised on their own.

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use gm_api_types::TokenMetadata;
use gm_pinning::{ContentFetcher, gateway_url};

pub const DATA_URI_JSON_PREFIX: &str = "data:application/json;base64,";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenLocation {
    Inline(TokenMetadata),
    /// HTTP URL, already rewritten through the gateway when it was `ipfs://`.
    Remote(String),
}

pub fn classify(token_uri: &str, gateway: &str) -> TokenLocation {
    match decode_inline(token_uri) {
        Some(metadata) => TokenLocation::Inline(metadata),
        None => TokenLocation::Remote(gateway_url(token_uri.trim(), gateway)),
    }
}

/// Decodes `data:application/json;base64,<payload>` or a bare base64
/// payload. Anything that is not base64-encoded metadata JSON yields `None`.
pub fn decode_inline(token_uri: &str) -> Option<TokenMetadata> {
    let raw = token_uri.trim();
    let payload = match raw.strip_prefix(DATA_URI_JSON_PREFIX) {
        Some(payload) => payload,
        None if raw.starts_with("data:") => raw.split_once(";base64,")?.1,
        None => raw,
    };

    let bytes = STANDARD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn encode_inline(metadata: &TokenMetadata) -> Result<String> {
    let json = serde_json::to_vec(metadata)?;
    Ok(format!("{DATA_URI_JSON_PREFIX}{}", STANDARD.encode(json)))
}

pub async fn resolve(location: TokenLocation, fetcher: &dyn ContentFetcher) -> Result<TokenMetadata> {
    match location {
        TokenLocation::Inline(metadata) => Ok(metadata),
        TokenLocation::Remote(url) => {
            let value = fetcher.fetch_json(&url).await?;
            serde_json::from_value(value).with_context(|| format!("metadata at {url} is malformed"))
        }
    }
}

//! Content pinning and retrieval.
//!
//! Images and metadata documents are pinned to IPFS and addressed as
//! `ipfs://<cid>`; reading them back goes through an HTTP gateway.

mod gateway;
mod pinata;

pub use gateway::GatewayClient;
pub use pinata::{DEFAULT_PINATA_URL, PinataClient};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use gm_api_types::{ContentRef, IPFS_SCHEME, ImageFile, TokenMetadata};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

pub const DEFAULT_GATEWAY: &str = "https://gateway.pinata.cloud";

#[async_trait(?Send)]
pub trait PinningService {
    async fn pin_file(&self, file: &ImageFile) -> Result<ContentRef>;
    async fn pin_json(&self, metadata: &TokenMetadata) -> Result<ContentRef>;
}

#[async_trait(?Send)]
pub trait ContentFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value>;
}

/// Rewrites an `ipfs://` reference to an HTTP gateway URL. Anything else is
/// returned untouched.
pub fn gateway_url(reference: &str, gateway: &str) -> String {
    match reference.strip_prefix(IPFS_SCHEME) {
        Some(path) => format!(
            "{}/ipfs/{}",
            gateway.trim_end_matches('/'),
            path.trim_start_matches("ipfs/")
        ),
        None => reference.to_owned(),
    }
}

#[derive(Default)]
pub struct InMemoryPinning {
    objects: RefCell<HashMap<String, Vec<u8>>>,
    failure: RefCell<Option<String>>,
    pin_calls: Cell<usize>,
    fetch_calls: Cell<usize>,
}

impl InMemoryPinning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_pins(&self, message: Option<&str>) {
        *self.failure.borrow_mut() = message.map(ToOwned::to_owned);
    }

    pub fn pin_calls(&self) -> usize {
        self.pin_calls.get()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.get()
    }

    pub fn object(&self, reference: &ContentRef) -> Option<Vec<u8>> {
        let cid = reference.cid()?;
        self.objects.borrow().get(cid).cloned()
    }

    /// Stores raw bytes as if some earlier session had pinned them.
    pub fn insert(&self, bytes: Vec<u8>) -> ContentRef {
        let cid = content_id(&bytes);
        self.objects.borrow_mut().insert(cid.clone(), bytes);
        ContentRef::from_cid(&cid)
    }

    fn store(&self, bytes: Vec<u8>) -> Result<ContentRef> {
        self.pin_calls.set(self.pin_calls.get() + 1);
        if let Some(message) = self.failure.borrow().as_deref() {
            bail!("{message}");
        }
        Ok(self.insert(bytes))
    }
}

fn content_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut cid = String::from("bafk");
    for byte in &digest[..16] {
        cid.push_str(&format!("{byte:02x}"));
    }
    cid
}

#[async_trait(?Send)]
impl PinningService for InMemoryPinning {
    async fn pin_file(&self, file: &ImageFile) -> Result<ContentRef> {
        self.store(file.bytes.clone())
    }

    async fn pin_json(&self, metadata: &TokenMetadata) -> Result<ContentRef> {
        let bytes = serde_json::to_vec(metadata)?;
        self.store(bytes)
    }
}

#[async_trait(?Send)]
impl ContentFetcher for InMemoryPinning {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.fetch_calls.set(self.fetch_calls.get() + 1);

        let cid = url
            .rsplit_once("/ipfs/")
            .map(|(_, cid)| cid)
            .ok_or_else(|| anyhow!("not a gateway url: {url}"))?;
        let bytes = self
            .objects
            .borrow()
            .get(cid)
            .cloned()
            .ok_or_else(|| anyhow!("{url}: 404 not found"))?;
        serde_json::from_slice(&bytes).with_context(|| format!("{url} is not JSON"))
    }
}

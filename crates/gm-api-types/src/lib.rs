use serde::{Deserialize, Serialize};
use std::fmt;

pub const IPFS_SCHEME: &str = "ipfs://";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// Addresses come back from wallets in mixed (checksummed) case.
    pub fn same_as(&self, other: &WalletAddress) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainId(pub String);

impl ChainId {
    pub fn from_numeric(id: u64) -> Self {
        Self(format!("{id:#x}"))
    }

    /// Accepts both the `0x`-prefixed hex form wallets report and plain decimal.
    pub fn as_u64(&self) -> Option<u64> {
        let raw = self.0.trim();
        match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => raw.parse().ok(),
        }
    }

    pub fn matches(&self, other: &ChainId) -> bool {
        match (self.as_u64(), other.as_u64()) {
            (Some(a), Some(b)) => a == b,
            _ => self.0.eq_ignore_ascii_case(&other.0),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pinned object, always carried in its `ipfs://<cid>` form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentRef(pub String);

impl ContentRef {
    pub fn from_cid(cid: &str) -> Self {
        Self(format!("{IPFS_SCHEME}{cid}"))
    }

    pub fn cid(&self) -> Option<&str> {
        self.0.strip_prefix(IPFS_SCHEME)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The JSON document a token URI points at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    /// Optional in the wild; a missing field reads as empty.
    #[serde(default)]
    pub description: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GalleryItem {
    pub name: String,
    pub description: String,
    pub image: String,
}

impl From<TokenMetadata> for GalleryItem {
    fn from(metadata: TokenMetadata) -> Self {
        Self {
            name: metadata.name,
            description: metadata.description,
            image: metadata.image,
        }
    }
}

/// Raw image bytes picked by the user, as handed to the pinning service.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_compares_hex_and_decimal() {
        let from_wallet = ChainId("0xaa36a7".to_owned());
        let configured = ChainId("11155111".to_owned());
        assert!(from_wallet.matches(&configured));
        assert_eq!(ChainId::from_numeric(11155111), from_wallet);
        assert!(!from_wallet.matches(&ChainId("0x1".to_owned())));
    }

    #[test]
    fn content_ref_exposes_cid() {
        let reference = ContentRef::from_cid("bafyimage");
        assert_eq!(reference.as_str(), "ipfs://bafyimage");
        assert_eq!(reference.cid(), Some("bafyimage"));
        assert_eq!(ContentRef("https://example.org/a.png".to_owned()).cid(), None);
    }

    #[test]
    fn metadata_serializes_with_plain_field_names() {
        let metadata = TokenMetadata {
            name: "Sunset".to_owned(),
            description: "orange sky".to_owned(),
            image: "ipfs://bafyimage".to_owned(),
        };
        let json = serde_json::to_value(&metadata).expect("serialize");
        assert_eq!(json["name"], "Sunset");
        assert_eq!(json["image"], "ipfs://bafyimage");
    }

    #[test]
    fn wallet_address_comparison_ignores_case() {
        let checksummed = WalletAddress("0xAbCd00000000000000000000000000000000Ef01".to_owned());
        let lower = WalletAddress("0xabcd00000000000000000000000000000000ef01".to_owned());
        assert!(checksummed.same_as(&lower));
    }
}

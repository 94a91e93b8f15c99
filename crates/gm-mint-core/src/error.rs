use gm_wallet_provider::ProviderError;
use thiserror::Error;

/// The three kinds of failure the user gets to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    ProviderMissing,
    WalletInteraction,
    Network,
    /// Bad form input; nothing left the page.
    Input,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("contract address is not configured (set {})", crate::config::ENV_CONTRACT_ADDRESS)]
    MissingContractAddress,
    #[error("invalid contract address: {0}")]
    InvalidContractAddress(String),
    #[error("invalid chain id: {0}")]
    InvalidChain(String),
    #[error("invalid gallery scope {0:?}; expected \"latest\" or \"all\"")]
    InvalidScope(String),
    #[error("invalid value for {key}: {value}")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no wallet detected; install a browser wallet such as MetaMask")]
    ProviderMissing,
    #[error("wallet connection request was rejected")]
    UserRejected,
    #[error("wallet returned no accounts")]
    NoAccounts,
    #[error("wallet request failed: {0}")]
    Wallet(String),
}

impl From<ProviderError> for SessionError {
    fn from(err: ProviderError) -> Self {
        if err.is_user_rejected() {
            Self::UserRejected
        } else {
            Self::Wallet(err.to_string())
        }
    }
}

impl SessionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ProviderMissing => ErrorClass::ProviderMissing,
            Self::UserRejected | Self::NoAccounts | Self::Wallet(_) => {
                ErrorClass::WalletInteraction
            }
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GalleryError {
    #[error("failed to read minted tokens: {0}")]
    CounterRead(String),
}

impl GalleryError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Network
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MintError {
    #[error("a mint is already in progress")]
    InFlight,
    #[error("select an image to mint")]
    MissingFile,
    #[error("enter a name")]
    MissingName,
    #[error("enter a description")]
    MissingDescription,
    #[error("connect your wallet first")]
    NotConnected,
    #[error("image upload failed: {0}")]
    ImageUpload(String),
    #[error("metadata upload failed: {0}")]
    MetadataUpload(String),
    #[error("mint transaction failed: {0}")]
    MintTransaction(String),
    #[error("mint was not confirmed: {0}")]
    Confirmation(String),
}

impl MintError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InFlight
            | Self::MissingFile
            | Self::MissingName
            | Self::MissingDescription => ErrorClass::Input,
            Self::NotConnected | Self::MintTransaction(_) => ErrorClass::WalletInteraction,
            Self::ImageUpload(_) | Self::MetadataUpload(_) | Self::Confirmation(_) => {
                ErrorClass::Network
            }
        }
    }

    /// True when the failure happened before anything was uploaded or sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InFlight
                | Self::MissingFile
                | Self::MissingName
                | Self::MissingDescription
                | Self::NotConnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gm_wallet_provider::{DISCONNECTED, ProviderError};

    #[test]
    fn provider_errors_map_to_session_errors() {
        assert_eq!(
            SessionError::from(ProviderError::user_rejected()),
            SessionError::UserRejected
        );
        let other = SessionError::from(ProviderError::new(DISCONNECTED, "wallet locked"));
        assert_eq!(other, SessionError::Wallet("wallet locked (code 4900)".to_owned()));
        assert_eq!(other.class(), ErrorClass::WalletInteraction);
        assert_eq!(SessionError::ProviderMissing.class(), ErrorClass::ProviderMissing);
    }

    #[test]
    fn mint_errors_are_classified() {
        assert!(MintError::MissingName.is_precondition());
        assert!(!MintError::ImageUpload("timeout".to_owned()).is_precondition());
        assert_eq!(MintError::MintTransaction("rejected".to_owned()).class(), ErrorClass::WalletInteraction);
        assert_eq!(MintError::Confirmation("reverted".to_owned()).class(), ErrorClass::Network);
        assert_eq!(GalleryError::CounterRead("down".to_owned()).class(), ErrorClass::Network);
    }
}

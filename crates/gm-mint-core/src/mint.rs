//! Mint form state machine.
//!
//! `Idle -> Uploading -> AwaitingConfirmation -> Idle`. Preconditions are
//! checked before anything leaves the page; once uploads start, a failure at
//! any stage returns straight to `Idle` and whatever was already pinned stays
//! pinned.

use gm_api_types::{ContentRef, GalleryItem, ImageFile, TokenId, TokenMetadata, TxHash};
use gm_contract::MintReceipt;
use gm_pinning::PinningService;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{info, warn};

use crate::error::MintError;
use crate::session::{ActiveSession, WalletSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MintPhase {
    #[default]
    Idle,
    Uploading,
    AwaitingConfirmation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintFormState {
    pub file: Option<ImageFile>,
    pub name: String,
    pub description: String,
    pub phase: MintPhase,
    pub error: Option<MintError>,
    pub success: bool,
    pub last_token: Option<TokenId>,
    pub last_tx: Option<TxHash>,
}

impl MintFormState {
    pub fn in_flight(&self) -> bool {
        self.phase != MintPhase::Idle
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOutcome {
    pub item: GalleryItem,
    pub receipt: MintReceipt,
    pub token_uri: ContentRef,
    pub image: ContentRef,
    /// Session epoch the mint was started under.
    pub epoch: u64,
}

struct MintRequest {
    file: ImageFile,
    name: String,
    description: String,
    session: ActiveSession,
}

type Observer = Rc<dyn Fn(&MintFormState)>;

pub struct MintFlow {
    pinning: Rc<dyn PinningService>,
    state: RefCell<MintFormState>,
    observers: RefCell<Vec<Observer>>,
}

impl MintFlow {
    pub fn new(pinning: Rc<dyn PinningService>) -> Self {
        Self {
            pinning,
            state: RefCell::new(MintFormState::default()),
            observers: RefCell::new(Vec::new()),
        }
    }

    pub fn state(&self) -> MintFormState {
        self.state.borrow().clone()
    }

    pub fn observe(&self, observer: impl Fn(&MintFormState) + 'static) {
        self.observers.borrow_mut().push(Rc::new(observer));
    }

    pub fn select_file(&self, file: Option<ImageFile>) {
        self.update(|state| {
            state.file = file;
            state.success = false;
        });
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.update(|state| state.name = name);
    }

    pub fn set_description(&self, description: impl Into<String>) {
        let description = description.into();
        self.update(|state| state.description = description);
    }

    /// Runs one mint. `on_minted` sees the outcome before the form is cleared.
    pub async fn submit(
        &self,
        session: &WalletSession,
        on_minted: impl FnOnce(&MintOutcome),
    ) -> Result<MintOutcome, MintError> {
        if self.state.borrow().in_flight() {
            return Err(MintError::InFlight);
        }

        let request = match self.prepare(session) {
            Ok(request) => request,
            Err(err) => {
                self.update(|state| {
                    state.error = Some(err.clone());
                    state.success = false;
                });
                return Err(err);
            }
        };

        self.update(|state| {
            state.phase = MintPhase::Uploading;
            state.error = None;
            state.success = false;
        });

        match self.run(request).await {
            Ok(outcome) => {
                on_minted(&outcome);
                self.update(|state| {
                    *state = MintFormState {
                        success: true,
                        last_token: outcome.receipt.token_id,
                        last_tx: Some(outcome.receipt.tx_hash.clone()),
                        ..MintFormState::default()
                    };
                });
                Ok(outcome)
            }
            Err(err) => {
                warn!("mint failed: {err}");
                self.update(|state| {
                    state.phase = MintPhase::Idle;
                    state.error = Some(err.clone());
                });
                Err(err)
            }
        }
    }

    fn prepare(&self, session: &WalletSession) -> Result<MintRequest, MintError> {
        let state = self.state.borrow();
        let file = state.file.clone().ok_or(MintError::MissingFile)?;
        let name = state.name.trim();
        if name.is_empty() {
            return Err(MintError::MissingName);
        }
        let description = state.description.trim();
        if description.is_empty() {
            return Err(MintError::MissingDescription);
        }
        let session = session.active().ok_or(MintError::NotConnected)?;

        Ok(MintRequest {
            file,
            name: name.to_owned(),
            description: description.to_owned(),
            session,
        })
    }

    async fn run(&self, request: MintRequest) -> Result<MintOutcome, MintError> {
        let MintRequest {
            file,
            name,
            description,
            session,
        } = request;

        let image = self
            .pinning
            .pin_file(&file)
            .await
            .map_err(|err| MintError::ImageUpload(format!("{err:#}")))?;

        let metadata = TokenMetadata {
            name,
            description,
            image: image.as_str().to_owned(),
        };
        let token_uri = self.pinning.pin_json(&metadata).await.map_err(|err| {
            warn!(%image, "image left pinned without metadata");
            MintError::MetadataUpload(format!("{err:#}"))
        })?;

        self.update(|state| state.phase = MintPhase::AwaitingConfirmation);

        let contract = session.contract;
        let tx_hash = contract.mint(token_uri.as_str()).await.map_err(|err| {
            warn!(%token_uri, "metadata left pinned without a token");
            MintError::MintTransaction(format!("{err:#}"))
        })?;
        info!(tx = %tx_hash, account = %session.account, "mint submitted");

        let receipt = contract
            .wait_for_receipt(&tx_hash)
            .await
            .map_err(|err| MintError::Confirmation(format!("{err:#}")))?;
        match receipt.token_id {
            Some(token) => info!(tx = %tx_hash, %token, "mint confirmed"),
            None => info!(tx = %tx_hash, "mint confirmed"),
        }

        Ok(MintOutcome {
            item: metadata.into(),
            receipt,
            token_uri,
            image,
            epoch: session.epoch,
        })
    }

    fn update(&self, apply: impl FnOnce(&mut MintFormState)) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            apply(&mut state);
            state.clone()
        };
        let observers: Vec<Observer> = self.observers.borrow().clone();
        for observer in observers {
            observer(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PageControl;
    use anyhow::Result;
    use async_trait::async_trait;
    use gm_api_types::{ChainId, WalletAddress};
    use gm_contract::InMemoryNftContract;
    use gm_pinning::InMemoryPinning;
    use gm_wallet_provider::{ScriptedProvider, WalletProvider};

    struct NoReload;

    impl PageControl for NoReload {
        fn reload(&self) {}
    }

    /// Yields once before every pin so a second submit can interleave.
    struct YieldingPinning(InMemoryPinning);

    #[async_trait(?Send)]
    impl PinningService for YieldingPinning {
        async fn pin_file(&self, file: &ImageFile) -> Result<ContentRef> {
            tokio::task::yield_now().await;
            self.0.pin_file(file).await
        }

        async fn pin_json(&self, metadata: &TokenMetadata) -> Result<ContentRef> {
            self.0.pin_json(metadata).await
        }
    }

    fn image() -> ImageFile {
        ImageFile {
            file_name: "harbor.png".to_owned(),
            mime_type: "image/png".to_owned(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    async fn connected(contract: &InMemoryNftContract) -> WalletSession {
        let provider = ScriptedProvider::new(
            vec![WalletAddress("0x00000000000000000000000000000000000a11ce".to_owned())],
            ChainId("0xaa36a7".to_owned()),
        );
        let session = WalletSession::new(
            Some(Rc::new(provider) as Rc<dyn WalletProvider>),
            Rc::new(contract.clone()),
            Rc::new(NoReload),
            None,
        );
        session.connect().await.expect("connected");
        session
    }

    fn filled(flow: &MintFlow) {
        flow.select_file(Some(image()));
        flow.set_name("  Harbor ");
        flow.set_description("boats at dusk");
    }

    #[tokio::test]
    async fn successful_mint_clears_the_form_and_reports_the_item() {
        let contract = InMemoryNftContract::new();
        let session = connected(&contract).await;
        let pinning = Rc::new(InMemoryPinning::new());
        let flow = MintFlow::new(pinning.clone());
        filled(&flow);

        let phases = Rc::new(RefCell::new(Vec::new()));
        let sink = phases.clone();
        flow.observe(move |state| sink.borrow_mut().push(state.phase));

        let mut minted = None;
        let outcome = flow
            .submit(&session, |outcome| minted = Some(outcome.item.clone()))
            .await
            .expect("minted");

        assert_eq!(minted.as_ref(), Some(&outcome.item));
        assert_eq!(outcome.item.name, "Harbor");
        assert_eq!(outcome.item.image, outcome.image.as_str());
        assert_eq!(pinning.object(&outcome.image), Some(image().bytes));
        assert_eq!(contract.token_count(), 1);
        assert_eq!(outcome.epoch, session.epoch());

        let state = flow.state();
        assert!(state.success);
        assert_eq!(state.file, None);
        assert!(state.name.is_empty());
        assert_eq!(state.last_token, Some(TokenId(0)));
        assert_eq!(state.phase, MintPhase::Idle);

        assert!(phases.borrow().contains(&MintPhase::Uploading));
        assert!(phases.borrow().contains(&MintPhase::AwaitingConfirmation));
    }

    #[tokio::test]
    async fn preconditions_are_checked_in_order_without_side_effects() {
        let contract = InMemoryNftContract::new();
        let session = connected(&contract).await;
        let pinning = Rc::new(InMemoryPinning::new());
        let flow = MintFlow::new(pinning.clone());

        let err = flow.submit(&session, |_| {}).await.expect_err("no file");
        assert_eq!(err, MintError::MissingFile);

        flow.select_file(Some(image()));
        flow.set_name("   ");
        assert_eq!(flow.submit(&session, |_| {}).await, Err(MintError::MissingName));

        flow.set_name("Harbor");
        assert_eq!(
            flow.submit(&session, |_| {}).await,
            Err(MintError::MissingDescription)
        );

        flow.set_description("boats");
        session.disconnect();
        assert_eq!(flow.submit(&session, |_| {}).await, Err(MintError::NotConnected));

        assert_eq!(pinning.pin_calls(), 0);
        assert!(contract.calls().is_empty());
        let state = flow.state();
        assert_eq!(state.phase, MintPhase::Idle);
        assert_eq!(state.error, Some(MintError::NotConnected));
        assert_eq!(state.name, "Harbor");
    }

    #[tokio::test]
    async fn upload_failure_returns_to_idle_before_the_contract() {
        let contract = InMemoryNftContract::new();
        let session = connected(&contract).await;
        let pinning = Rc::new(InMemoryPinning::new());
        pinning.fail_pins(Some("401 invalid jwt"));
        let flow = MintFlow::new(pinning.clone());
        filled(&flow);

        let err = flow.submit(&session, |_| panic!("not minted")).await.expect_err("failed");
        assert_eq!(err, MintError::ImageUpload("401 invalid jwt".to_owned()));
        assert_eq!(contract.call_count("mint"), 0);

        let state = flow.state();
        assert_eq!(state.phase, MintPhase::Idle);
        assert_eq!(state.error, Some(err));
        // The form is kept so the user can retry.
        assert!(state.file.is_some());
    }

    #[tokio::test]
    async fn rejected_or_reverted_transactions_are_reported() {
        let contract = InMemoryNftContract::new();
        let session = connected(&contract).await;
        let pinning = Rc::new(InMemoryPinning::new());
        let flow = MintFlow::new(pinning.clone());
        filled(&flow);

        contract.fail_mints(Some("user denied transaction signature"));
        let err = flow.submit(&session, |_| {}).await.expect_err("rejected");
        assert!(matches!(err, MintError::MintTransaction(_)));
        // Image and metadata were both pinned and stay orphaned.
        assert_eq!(pinning.pin_calls(), 2);

        contract.fail_mints(None);
        contract.revert_next_mint();
        let err = flow.submit(&session, |_| {}).await.expect_err("reverted");
        assert!(matches!(err, MintError::Confirmation(message) if message.contains("reverted")));
        assert_eq!(contract.token_count(), 0);
        assert!(!flow.state().in_flight());
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_refused() {
        let contract = InMemoryNftContract::new();
        let session = connected(&contract).await;
        let flow = MintFlow::new(Rc::new(YieldingPinning(InMemoryPinning::new())));
        filled(&flow);

        let (first, second) = tokio::join!(
            flow.submit(&session, |_| {}),
            flow.submit(&session, |_| {}),
        );

        assert!(first.is_ok());
        assert_eq!(second.expect_err("in flight"), MintError::InFlight);
        assert_eq!(contract.token_count(), 1);
        assert!(flow.state().success);
    }
}

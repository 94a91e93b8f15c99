//! Application core for the GalleryMint front end: wallet session, token
//! gallery and mint flow, independent of any particular DOM or wallet.

pub mod config;
pub mod error;
pub mod gallery;
pub mod metadata;
pub mod mint;
pub mod session;

pub use config::{GalleryScope, MintConfig};
pub use error::{ConfigError, ErrorClass, GalleryError, MintError, SessionError};
pub use gallery::{GalleryLoader, GalleryState};
pub use metadata::TokenLocation;
pub use mint::{MintFlow, MintFormState, MintOutcome, MintPhase};
pub use session::{ActiveSession, PageControl, SessionChange, WalletSession};

use gm_pinning::{ContentFetcher, PinningService};
use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};
use tracing::debug;

/// Ties the session, gallery and mint flow together.
pub struct MintCore {
    session: WalletSession,
    loader: GalleryLoader,
    gallery: RefCell<GalleryState>,
    mint: MintFlow,
}

impl MintCore {
    pub fn new(
        session: WalletSession,
        pinning: Rc<dyn PinningService>,
        fetcher: Rc<dyn ContentFetcher>,
        config: &MintConfig,
    ) -> Rc<Self> {
        let core = Rc::new(Self {
            loader: GalleryLoader::new(fetcher, config.gateway_url.clone(), config.gallery_scope)
                .with_max_tokens(config.gallery_max_tokens),
            gallery: RefCell::new(GalleryState::default()),
            mint: MintFlow::new(pinning),
            session,
        });

        let weak: Weak<Self> = Rc::downgrade(&core);
        core.session.observe(move |change| {
            let Some(core) = weak.upgrade() else {
                return;
            };
            if matches!(
                change,
                SessionChange::Connected(_) | SessionChange::Switched(_) | SessionChange::Disconnected
            ) {
                let epoch = core.session.epoch();
                debug!(epoch, "account changed, clearing gallery");
                let mut gallery = core.gallery.borrow_mut();
                gallery.reset(epoch);
                if core.session.account().is_none() {
                    gallery.apply(epoch, Ok(Vec::new()));
                }
            }
        });

        core
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn mint(&self) -> &MintFlow {
        &self.mint
    }

    pub fn gallery(&self) -> Ref<'_, GalleryState> {
        self.gallery.borrow()
    }

    /// Loads the gallery for the active account. Returns false when the
    /// result was dropped because the account changed meanwhile, or when no
    /// account is connected.
    pub async fn refresh_gallery(&self) -> bool {
        let Some(active) = self.session.active() else {
            return false;
        };
        self.gallery.borrow_mut().reset(active.epoch);

        let result = self.loader.load(active.contract.as_ref()).await;
        self.gallery.borrow_mut().apply(active.epoch, result)
    }

    /// Submits the mint form and appends the new token to the gallery.
    pub async fn submit_mint(&self) -> Result<MintOutcome, MintError> {
        let gallery = &self.gallery;
        self.mint
            .submit(&self.session, |outcome| {
                gallery
                    .borrow_mut()
                    .push_minted(outcome.epoch, outcome.item.clone());
            })
            .await
    }
}

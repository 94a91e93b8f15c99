use gm_api_types::{GalleryItem, TokenId};
use gm_contract::NftContract;
use gm_pinning::ContentFetcher;
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_GALLERY_MAX_TOKENS, GalleryScope};
use crate::error::GalleryError;
use crate::metadata::{TokenLocation, classify, resolve};

/// What the gallery panel shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryState {
    items: Vec<GalleryItem>,
    epoch: u64,
    error: Option<GalleryError>,
    loading: bool,
    /// Items minted while a load was pending; the load may predate them.
    minted_while_loading: Vec<GalleryItem>,
}

impl GalleryState {
    pub fn items(&self) -> &[GalleryItem] {
        &self.items
    }

    pub fn error(&self) -> Option<&GalleryError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Empties the gallery for a new session epoch and marks it loading.
    pub fn reset(&mut self, epoch: u64) {
        self.items.clear();
        self.minted_while_loading.clear();
        self.error = None;
        self.epoch = epoch;
        self.loading = true;
    }

    /// Applies a load result. Results from an older epoch are dropped and
    /// `false` is returned. Items minted while the load was pending are kept
    /// after the loaded ones unless the load already returned them.
    pub fn apply(&mut self, epoch: u64, result: Result<Vec<GalleryItem>, GalleryError>) -> bool {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "dropping stale gallery result");
            return false;
        }
        self.loading = false;
        let minted = std::mem::take(&mut self.minted_while_loading);
        match result {
            Ok(mut items) => {
                for item in minted {
                    if !items.contains(&item) {
                        debug!(name = %item.name, "keeping token minted during load");
                        items.push(item);
                    }
                }
                self.items = items;
                self.error = None;
            }
            Err(err) => {
                self.items = minted;
                self.error = Some(err);
            }
        }
        true
    }

    pub fn push_minted(&mut self, epoch: u64, item: GalleryItem) -> bool {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "dropping minted item from an old session");
            return false;
        }
        if self.loading {
            self.minted_while_loading.push(item.clone());
        }
        self.items.push(item);
        true
    }
}

/// Reads tokens back from the contract and resolves their metadata.
pub struct GalleryLoader {
    fetcher: Rc<dyn ContentFetcher>,
    gateway: String,
    scope: GalleryScope,
    max_tokens: u64,
}

impl GalleryLoader {
    pub fn new(fetcher: Rc<dyn ContentFetcher>, gateway: impl Into<String>, scope: GalleryScope) -> Self {
        Self {
            fetcher,
            gateway: gateway.into(),
            scope,
            max_tokens: DEFAULT_GALLERY_MAX_TOKENS,
        }
    }

    /// Caps how many of the newest tokens an `All` load resolves.
    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    pub fn scope(&self) -> GalleryScope {
        self.scope
    }

    pub async fn load(&self, contract: &dyn NftContract) -> Result<Vec<GalleryItem>, GalleryError> {
        let counter = contract.token_counter().await.map_err(|err| {
            warn!("token counter read failed: {err:#}");
            GalleryError::CounterRead(format!("{err:#}"))
        })?;

        if counter == 0 {
            debug!("no tokens minted yet");
            return Ok(Vec::new());
        }

        let first = match self.scope {
            GalleryScope::Latest => counter - 1,
            GalleryScope::All => counter.saturating_sub(self.max_tokens),
        };
        if first > 0 && self.scope == GalleryScope::All {
            info!(counter, skipped = first, "gallery capped to the newest tokens");
        }

        let mut items = Vec::new();
        for id in (first..counter).map(TokenId) {
            match self.load_token(contract, id).await {
                Ok(item) => items.push(item),
                Err(err) => warn!(token = %id, "skipping token: {err:#}"),
            }
        }

        info!(counter, loaded = items.len(), "gallery loaded");
        Ok(items)
    }

    async fn load_token(&self, contract: &dyn NftContract, id: TokenId) -> anyhow::Result<GalleryItem> {
        let token_uri = contract.token_uri(id).await?;
        let location = classify(&token_uri, &self.gateway);
        if let TokenLocation::Remote(url) = &location {
            debug!(token = %id, url = %url, "resolving remote metadata");
        }
        let metadata = resolve(location, self.fetcher.as_ref()).await?;
        Ok(metadata.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::encode_inline;
    use gm_api_types::TokenMetadata;
    use gm_contract::InMemoryNftContract;
    use gm_pinning::{DEFAULT_GATEWAY, InMemoryPinning};

    fn metadata(name: &str) -> TokenMetadata {
        TokenMetadata {
            name: name.to_owned(),
            description: format!("{name} description"),
            image: format!("ipfs://bafk{name}"),
        }
    }

    fn loader(store: &Rc<InMemoryPinning>, scope: GalleryScope) -> GalleryLoader {
        GalleryLoader::new(store.clone(), DEFAULT_GATEWAY, scope)
    }

    #[tokio::test]
    async fn empty_collection_makes_no_further_calls() {
        let store = Rc::new(InMemoryPinning::new());
        let contract = InMemoryNftContract::new();

        let items = loader(&store, GalleryScope::All).load(&contract).await.expect("load");
        assert!(items.is_empty());
        assert_eq!(contract.calls(), vec!["token_counter"]);
        assert_eq!(store.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn latest_scope_resolves_only_the_newest_token() {
        let store = Rc::new(InMemoryPinning::new());
        let contract = InMemoryNftContract::new();
        contract.preload(&encode_inline(&metadata("first")).expect("encode"));
        let remote = store.insert(serde_json::to_vec(&metadata("second")).expect("json"));
        contract.preload(remote.as_str());

        let items = loader(&store, GalleryScope::Latest).load(&contract).await.expect("load");
        assert_eq!(items, vec![GalleryItem::from(metadata("second"))]);
        assert_eq!(contract.call_count("token_uri"), 1);
        assert_eq!(store.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn all_scope_skips_broken_tokens_oldest_first() {
        let store = Rc::new(InMemoryPinning::new());
        let contract = InMemoryNftContract::new();
        contract.preload(&encode_inline(&metadata("first")).expect("encode"));
        contract.preload("ipfs://bafkmissing");
        let remote = store.insert(serde_json::to_vec(&metadata("third")).expect("json"));
        contract.preload(remote.as_str());

        let items = loader(&store, GalleryScope::All).load(&contract).await.expect("load");
        assert_eq!(
            items,
            vec![
                GalleryItem::from(metadata("first")),
                GalleryItem::from(metadata("third")),
            ]
        );
        // Only the two remote tokens went to the gateway.
        assert_eq!(store.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn counter_failure_is_a_hard_error() {
        let store = Rc::new(InMemoryPinning::new());
        let contract = InMemoryNftContract::new();
        contract.fail_counter_reads(Some("execution reverted"));

        let err = loader(&store, GalleryScope::Latest)
            .load(&contract)
            .await
            .expect_err("counter failure");
        assert_eq!(err, GalleryError::CounterRead("execution reverted".to_owned()));
        assert_eq!(contract.call_count("token_uri"), 0);
    }

    #[test]
    fn stale_results_are_dropped() {
        let mut state = GalleryState::default();
        state.reset(1);
        assert!(state.is_loading());

        state.reset(2);
        assert!(!state.apply(1, Ok(vec![GalleryItem::from(metadata("old"))])));
        assert!(state.items().is_empty());
        assert!(state.is_loading());

        assert!(state.apply(2, Ok(vec![GalleryItem::from(metadata("new"))])));
        assert_eq!(state.items().len(), 1);
        assert!(!state.is_loading());

        assert!(!state.push_minted(1, GalleryItem::from(metadata("late"))));
        assert!(state.push_minted(2, GalleryItem::from(metadata("minted"))));
        assert_eq!(state.items().len(), 2);
    }

    /// Reports a counter the contract controls and records which ids were
    /// asked for.
    struct HugeCounter {
        requested: std::cell::RefCell<Vec<u64>>,
    }

    #[async_trait::async_trait(?Send)]
    impl NftContract for HugeCounter {
        fn address(&self) -> &str {
            "0x00000000000000000000000000000000000000ff"
        }

        async fn mint(&self, _token_uri: &str) -> anyhow::Result<gm_api_types::TxHash> {
            anyhow::bail!("read-only")
        }

        async fn wait_for_receipt(
            &self,
            _tx_hash: &gm_api_types::TxHash,
        ) -> anyhow::Result<gm_contract::MintReceipt> {
            anyhow::bail!("read-only")
        }

        async fn token_counter(&self) -> anyhow::Result<u64> {
            Ok(u64::MAX)
        }

        async fn token_uri(&self, token_id: TokenId) -> anyhow::Result<String> {
            self.requested.borrow_mut().push(token_id.0);
            encode_inline(&metadata(&token_id.to_string()))
        }
    }

    #[tokio::test]
    async fn huge_counter_resolves_only_the_newest_tokens() {
        let store = Rc::new(InMemoryPinning::new());
        let contract = HugeCounter {
            requested: Default::default(),
        };

        let items = loader(&store, GalleryScope::All)
            .with_max_tokens(3)
            .load(&contract)
            .await
            .expect("load");

        assert_eq!(items.len(), 3);
        assert_eq!(
            *contract.requested.borrow(),
            vec![u64::MAX - 3, u64::MAX - 2, u64::MAX - 1]
        );
        assert_eq!(items[2].name, (u64::MAX - 1).to_string());
    }

    #[tokio::test]
    async fn latest_scope_ignores_the_cap() {
        let store = Rc::new(InMemoryPinning::new());
        let contract = HugeCounter {
            requested: Default::default(),
        };

        let items = loader(&store, GalleryScope::Latest).load(&contract).await.expect("load");
        assert_eq!(items.len(), 1);
        assert_eq!(*contract.requested.borrow(), vec![u64::MAX - 1]);
    }

    #[test]
    fn mint_during_load_survives_the_older_result() {
        let mut state = GalleryState::default();
        state.reset(4);
        assert!(state.push_minted(4, GalleryItem::from(metadata("new"))));

        // The load read the counter before the mint landed.
        assert!(state.apply(4, Ok(vec![GalleryItem::from(metadata("old"))])));
        assert_eq!(
            state.items(),
            &[GalleryItem::from(metadata("old")), GalleryItem::from(metadata("new"))]
        );

        // A later load that already includes the token does not repeat it.
        state.reset(4);
        assert!(state.push_minted(4, GalleryItem::from(metadata("newer"))));
        assert!(state.apply(
            4,
            Ok(vec![GalleryItem::from(metadata("old")), GalleryItem::from(metadata("newer"))])
        ));
        assert_eq!(state.items().len(), 2);
    }

    #[test]
    fn mint_during_failed_load_is_still_listed() {
        let mut state = GalleryState::default();
        state.reset(5);
        assert!(state.push_minted(5, GalleryItem::from(metadata("new"))));
        assert!(state.apply(5, Err(GalleryError::CounterRead("down".to_owned()))));
        assert_eq!(state.items(), &[GalleryItem::from(metadata("new"))]);
        assert!(state.error().is_some());
    }

    #[test]
    fn errors_replace_items() {
        let mut state = GalleryState::default();
        state.reset(3);
        assert!(state.apply(3, Err(GalleryError::CounterRead("down".to_owned()))));
        assert!(state.items().is_empty());
        assert_eq!(state.error(), Some(&GalleryError::CounterRead("down".to_owned())));
    }
}

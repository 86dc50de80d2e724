//! Async facade over [`SwapSession`].
//!
//! PSBT construction is I/O-bound on external providers; the wrappers here
//! dispatch via `tokio::task::spawn_blocking` so callers stay in async land
//! while the session stays synchronous.

use std::sync::Arc;

use bitcoin::Txid;

use crate::error::{Error, Result};
use crate::item::Item;
use crate::providers::MempoolAcceptance;
use crate::sdk::SwapSession;
use crate::swap::{BuyerTerms, ListingState, PurchaseLayout, SellerTerms, VerifyListingRequest};

pub struct SwapNode {
    session: Arc<SwapSession>,
}

impl SwapNode {
    pub fn new(session: SwapSession) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    pub fn session(&self) -> &SwapSession {
        &self.session
    }

    async fn with_session<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&SwapSession) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || f(&session))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }

    pub async fn create_listing(&self, seller: SellerTerms) -> Result<ListingState> {
        self.with_session(move |s| s.create_listing(seller)).await
    }

    /// Run the buyer flow, returning the advanced state plus the slot layout.
    pub async fn prepare_purchase(
        &self,
        mut state: ListingState,
        terms: BuyerTerms,
    ) -> Result<(ListingState, PurchaseLayout)> {
        self.with_session(move |s| {
            let layout = s.prepare_purchase(&mut state, terms)?;
            Ok((state, layout))
        })
        .await
    }

    pub async fn verify_signed_listing(&self, req: VerifyListingRequest) -> Result<Item> {
        self.with_session(move |s| s.verify_signed_listing(&req))
            .await
    }

    pub async fn merge_listing(&self, mut state: ListingState) -> Result<(ListingState, String)> {
        self.with_session(move |s| {
            let merged = s.merge_listing(&mut state)?;
            Ok((state, merged))
        })
        .await
    }

    pub async fn finalize(&self, psbt_b64: String) -> Result<String> {
        self.with_session(move |s| s.finalize(&psbt_b64)).await
    }

    pub async fn precheck(&self, raw_tx: String) -> Result<MempoolAcceptance> {
        self.with_session(move |s| s.precheck(&raw_tx)).await
    }

    pub async fn submit(&self, raw_tx: String) -> Result<Txid> {
        self.with_session(move |s| s.submit(&raw_tx)).await
    }
}

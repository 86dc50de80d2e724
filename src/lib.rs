//! Trust-minimized atomic swaps for inscription-bearing outputs on
//! Bitcoin-family UTXO chains.
//!
//! A seller lists a single inscription under a `SINGLE|ANYONECANPAY`
//! signature; an independent buyer assembles the purchase transaction
//! around that half using the two-dummy layout, which preserves the
//! inscription's sat offset across the swap; the combiner validates the
//! signed listing and splices the halves into one broadcastable candidate.
//!
//! [`SwapSession`] is the synchronous operation surface; [`SwapNode`] wraps
//! it for async callers. All network access goes through the traits in
//! [`providers`].

pub mod chain;
pub mod config;
pub mod error;
pub mod fees;
pub mod item;
pub mod node;
pub mod providers;
pub mod psbt;
pub mod sdk;
pub mod swap;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod utxo;

// ── Core types ─────────────────────────────────────────────────────────
pub use chain::{AddressType, ChainParams};
pub use config::SwapConfig;
pub use error::{Error, ErrorKind, Result};
pub use fees::FeeTier;
pub use item::{Item, SatLocation};
pub use node::SwapNode;
pub use providers::Providers;
pub use sdk::SwapSession;
pub use swap::{
    BuyerTerms, ListingState, PurchaseLayout, SellerTerms, VerifyListingRequest, merge_psbts,
};
pub use utxo::UtxoClassifier;

// Re-export the chain stack for app-layer use.
pub use bitcoin;

//! Parameter and state documents passed between swap operations.

use bitcoin::{PublicKey, XOnlyPublicKey};
use serde::{Deserialize, Serialize};

use crate::chain::ChainParams;
use crate::fees::FeeTier;
use crate::item::Item;
use crate::providers::AddressUtxo;

/// The seller's terms for listing a single inscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerTerms {
    /// Marketplace maker fee in basis points.
    pub maker_fee_bp: u16,
    /// The inscription being sold.
    pub ord_item: Item,
    /// Asking price in sats, exclusive of the postage reimbursement.
    pub price: u64,
    /// Where the seller is paid.
    pub receive_address: String,
    /// X-only key backing the listing input; required for taproot owners.
    #[serde(default)]
    pub tap_internal_key: Option<XOnlyPublicKey>,
}

/// The buyer's terms for purchasing a listed inscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyerTerms {
    /// Marketplace taker fee in basis points.
    pub taker_fee_bp: u16,
    /// Funds dummies, payments, change, and the fresh dummies.
    pub payment_address: String,
    /// Where the inscription lands.
    pub token_receive_address: String,
    pub fee_rate_tier: FeeTier,
    /// Compressed payment pubkey; required when the payment address is P2SH.
    #[serde(default)]
    pub payment_pubkey: Option<PublicKey>,
}

/// Buyer-side accumulation inside a [`ListingState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyerSide {
    pub terms: BuyerTerms,
    #[serde(default)]
    pub dummy_utxos: Option<[AddressUtxo; 2]>,
    #[serde(default)]
    pub payment_utxos: Vec<AddressUtxo>,
    #[serde(default)]
    pub unsigned_buying_psbt: Option<String>,
    #[serde(default)]
    pub signed_buying_psbt: Option<String>,
    #[serde(default)]
    pub merged_psbt: Option<String>,
}

impl BuyerSide {
    pub fn new(terms: BuyerTerms) -> Self {
        Self {
            terms,
            dummy_utxos: None,
            payment_utxos: Vec::new(),
            unsigned_buying_psbt: None,
            signed_buying_psbt: None,
            merged_psbt: None,
        }
    }
}

/// The mutable swap document. Produced by the seller flow, extended by the
/// buyer flow, owned exclusively by the calling session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingState {
    pub network: ChainParams,
    pub seller: SellerTerms,
    #[serde(default)]
    pub unsigned_listing_psbt: Option<String>,
    #[serde(default)]
    pub signed_listing_psbt: Option<String>,
    #[serde(default)]
    pub buyer: Option<BuyerSide>,
}

impl ListingState {
    pub fn new(network: ChainParams, seller: SellerTerms) -> Self {
        Self {
            network,
            seller,
            unsigned_listing_psbt: None,
            signed_listing_psbt: None,
            buyer: None,
        }
    }
}

/// A received signed listing plus the claims to verify it against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyListingRequest {
    pub signed_listing_psbt: String,
    pub token_id: String,
    pub price: u64,
    pub seller_receive_address: String,
    #[serde(default)]
    pub tap_internal_key: Option<XOnlyPublicKey>,
}

/// Net amount the seller's single output must pay: the price minus the maker
/// fee, plus reimbursement of the postage carried by the spent output.
pub fn seller_payout(price: u64, maker_fee_bp: u16, output_value: u64) -> u64 {
    price - basis_points(price, maker_fee_bp) + output_value
}

/// Marketplace cut of a purchase.
pub fn platform_fee(price: u64, total_fee_bp: u16) -> u64 {
    basis_points(price, total_fee_bp)
}

fn basis_points(amount: u64, bp: u16) -> u64 {
    (amount as u128 * bp as u128 / 10_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payout_reimburses_postage() {
        assert_eq!(seller_payout(100_000, 100, 10_000), 109_000);
        assert_eq!(seller_payout(100_000_000, 100, 10_000), 99_010_000);
    }

    #[test]
    fn payout_with_zero_fee_is_price_plus_postage() {
        assert_eq!(seller_payout(42_000, 0, 546), 42_546);
    }

    #[test]
    fn fees_floor_toward_zero() {
        assert_eq!(platform_fee(100_000, 300), 3_000);
        assert_eq!(platform_fee(100_000_000, 100), 1_000_000);
        assert_eq!(platform_fee(99, 100), 0);
    }

    #[test]
    fn basis_points_survive_sentinel_prices() {
        // 2e15 sats at 10000 bp would overflow a u64 intermediate product
        assert_eq!(platform_fee(2_000_000_000_000_000, 10_000), 2_000_000_000_000_000);
    }
}

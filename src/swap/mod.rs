//! The swap protocol surface: listing and purchase construction plus the
//! recombination of the signed halves.

pub mod params;
pub mod psbt;

pub use params::{
    BuyerSide, BuyerTerms, ListingState, SellerTerms, VerifyListingRequest, platform_fee,
    seller_payout,
};
pub use psbt::merge::merge_psbts;
pub use psbt::purchase::PurchaseLayout;

/// Input slot of the seller's signed ordinal in the purchase transaction.
pub const ORD_INPUT_INDEX: usize = 2;
/// Output slot receiving the recombined dummy padding.
pub const PAD_OUTPUT_INDEX: usize = 0;
/// Output slot delivering the inscription to the buyer.
pub const ORD_OUTPUT_INDEX: usize = 1;
/// Output slot paying the seller. Must mirror the listing's single output.
pub const SELLER_OUTPUT_INDEX: usize = 2;
/// Output slot paying the marketplace, when a fee address is configured.
/// When the fee output is suppressed this index holds whatever comes next;
/// consult [`PurchaseLayout`] instead of the raw constant.
pub const PLATFORM_FEE_OUTPUT_INDEX: usize = 3;

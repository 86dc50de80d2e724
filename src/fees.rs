//! Fee tiers and the transaction cost model.

use serde::{Deserialize, Serialize};

// Fully-legacy sizes. Overestimates segwit chains, exact for legacy ones, so
// the fee is never undershot across the multi-chain target set.
const INPUT_BYTES: u64 = 180;
const OUTPUT_BYTES: u64 = 34;
const BASE_BYTES: u64 = 10;

/// Confirmation-speed tier understood by the fee oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeTier {
    Fastest,
    HalfHour,
    Hour,
    Minimum,
}

impl FeeTier {
    /// Wire name used by the fee oracle.
    pub fn as_str(self) -> &'static str {
        match self {
            FeeTier::Fastest => "fastestFee",
            FeeTier::HalfHour => "halfHourFee",
            FeeTier::Hour => "hourFee",
            FeeTier::Minimum => "minimumFee",
        }
    }

    /// Parse a wire name. Unrecognized strings fall back to the hour tier.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "fastestFee" => FeeTier::Fastest,
            "halfHourFee" => FeeTier::HalfHour,
            "hourFee" => FeeTier::Hour,
            "minimumFee" => FeeTier::Minimum,
            _ => FeeTier::Hour,
        }
    }
}

/// Estimated fee for a transaction of `vins` inputs and `vouts` outputs at
/// `rate` sat/vB.
pub fn estimate_fee(vins: usize, vouts: usize, rate: u64) -> u64 {
    (INPUT_BYTES * vins as u64 + OUTPUT_BYTES * vouts as u64 + BASE_BYTES) * rate
}

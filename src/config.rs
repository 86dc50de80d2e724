//! Engine configuration and protocol constants.

use serde::{Deserialize, Serialize};

/// Value of a freshly created dummy output, in sats.
pub const DUMMY_UTXO_VALUE: u64 = 600;
/// Smallest output value accepted as an existing dummy.
pub const DUMMY_UTXO_MIN_VALUE: u64 = 580;
/// Largest output value accepted as an existing dummy.
pub const DUMMY_UTXO_MAX_VALUE: u64 = 1_000;
/// Postage carried by the inscription output delivered to the buyer.
pub const ORDINALS_POSTAGE_VALUE: u64 = 10_000;
/// Reserved sentinel price signalling an out-of-band delisting.
pub const DELIST_MAGIC_PRICE: u64 = 20_000_000 * 100_000_000;

/// Tunable knobs of the swap engine. One instance per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Value given to the two fresh dummy outputs of every purchase.
    pub dummy_value: u64,
    /// Inclusive lower bound for an output to qualify as a dummy.
    pub dummy_min_value: u64,
    /// Inclusive upper bound for an output to qualify as a dummy.
    pub dummy_max_value: u64,
    /// Value of the output carrying the inscription to the buyer.
    pub postage: u64,
    /// Marketplace fee collection address. `None` suppresses the fee output.
    pub platform_fee_address: Option<String>,
    /// Listings priced exactly at this value are treated as withdrawn.
    pub delist_magic_price: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            dummy_value: DUMMY_UTXO_VALUE,
            dummy_min_value: DUMMY_UTXO_MIN_VALUE,
            dummy_max_value: DUMMY_UTXO_MAX_VALUE,
            postage: ORDINALS_POSTAGE_VALUE,
            platform_fee_address: None,
            delist_magic_price: DELIST_MAGIC_PRICE,
        }
    }
}

impl SwapConfig {
    /// Default configuration with a marketplace fee address installed.
    pub fn with_platform_fee_address(address: impl Into<String>) -> Self {
        Self {
            platform_fee_address: Some(address.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = SwapConfig::default();
        assert_eq!(config.dummy_value, 600);
        assert_eq!(config.dummy_min_value, 580);
        assert_eq!(config.dummy_max_value, 1_000);
        assert_eq!(config.postage, 10_000);
        assert!(config.platform_fee_address.is_none());
        assert_eq!(config.delist_magic_price, 2_000_000_000_000_000);
    }
}

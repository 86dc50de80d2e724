//! Per-chain parameters and address classification.
//!
//! Every chain the engine targets is described by a [`ChainParams`] record;
//! all downstream code branches on the closed [`AddressType`] enum computed
//! here instead of re-parsing address strings.

use bech32::Hrp;
use bitcoin::hashes::Hash;
use bitcoin::key::TweakedPublicKey;
use bitcoin::{
    PubkeyHash, Script, ScriptBuf, ScriptHash, WPubkeyHash, WScriptHash, XOnlyPublicKey, base58,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Script shape of an address, derived once per address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressType {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    Unknown,
}

/// Parameters of one Bitcoin-family chain.
///
/// An empty `bech32_hrp` means the chain has no segwit address space at all;
/// the constructor forces both capability flags off in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub name: String,
    pub ticker: String,
    /// Base58-check version byte of pay-to-pubkey-hash addresses.
    pub pub_key_hash: u8,
    /// Base58-check version byte of pay-to-script-hash addresses.
    pub script_hash: u8,
    /// Bech32 human-readable part; empty disables segwit and taproot.
    pub bech32_hrp: String,
    pub supports_segwit: bool,
    pub supports_taproot: bool,
    /// Output values at or below this are uneconomical to spend.
    pub dust_limit: u64,
    /// Floor for fee rates in sat/vB.
    pub min_fee_rate: u64,
}

impl ChainParams {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        ticker: &str,
        pub_key_hash: u8,
        script_hash: u8,
        bech32_hrp: &str,
        supports_segwit: bool,
        supports_taproot: bool,
        dust_limit: u64,
        min_fee_rate: u64,
    ) -> Self {
        let has_hrp = !bech32_hrp.is_empty();
        Self {
            name: name.to_string(),
            ticker: ticker.to_string(),
            pub_key_hash,
            script_hash,
            bech32_hrp: bech32_hrp.to_string(),
            supports_segwit: supports_segwit && has_hrp,
            supports_taproot: supports_taproot && has_hrp,
            dust_limit,
            min_fee_rate,
        }
    }

    pub fn bitcoin() -> Self {
        Self::new("bitcoin", "BTC", 0x00, 0x05, "bc", true, true, 546, 1)
    }

    pub fn bitcoin_testnet() -> Self {
        Self::new("bitcoin-testnet", "tBTC", 0x6f, 0xc4, "tb", true, true, 546, 1)
    }

    pub fn litecoin() -> Self {
        Self::new("litecoin", "LTC", 0x30, 0x32, "ltc", true, true, 546, 1)
    }

    pub fn dogecoin() -> Self {
        Self::new("dogecoin", "DOGE", 0x1e, 0x16, "", false, false, 1_000_000, 1_000)
    }

    pub fn junkcoin() -> Self {
        Self::new("junkcoin", "JKC", 0x10, 0x05, "", false, false, 546, 1)
    }

    /// Look up a built-in chain by name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "bitcoin" | "mainnet" => Ok(Self::bitcoin()),
            "bitcoin-testnet" | "testnet" => Ok(Self::bitcoin_testnet()),
            "litecoin" => Ok(Self::litecoin()),
            "dogecoin" => Ok(Self::dogecoin()),
            "junkcoin" => Ok(Self::junkcoin()),
            other => Err(Error::UnknownChain(other.to_string())),
        }
    }

    pub fn dust_limit(&self) -> u64 {
        self.dust_limit
    }

    pub fn min_fee_rate(&self) -> u64 {
        self.min_fee_rate
    }

    // ── Classification ──────────────────────────────────────────────────

    /// Derive the script shape of `address` under this chain's parameters.
    ///
    /// Base58-check is attempted first; bech32 decoding is constrained to
    /// this chain's HRP and capability flags. Anything else is `Unknown`.
    pub fn classify_address(&self, address: &str) -> AddressType {
        if let Ok(raw) = base58::decode_check(address) {
            if raw.len() == 21 && raw[0] == self.pub_key_hash {
                return AddressType::P2pkh;
            }
            if raw.len() == 21 && raw[0] == self.script_hash {
                return AddressType::P2sh;
            }
            return AddressType::Unknown;
        }

        if self.bech32_hrp.is_empty() {
            return AddressType::Unknown;
        }
        let Ok((hrp, version, program)) = bech32::segwit::decode(address) else {
            return AddressType::Unknown;
        };
        if !hrp.to_string().eq_ignore_ascii_case(&self.bech32_hrp) {
            return AddressType::Unknown;
        }
        match (version.to_u8(), program.len()) {
            (0, 20) if self.supports_segwit => AddressType::P2wpkh,
            (0, 32) if self.supports_segwit => AddressType::P2wsh,
            (1, 32) if self.supports_taproot => AddressType::P2tr,
            _ => AddressType::Unknown,
        }
    }

    pub fn is_valid_address(&self, address: &str) -> bool {
        self.classify_address(address) != AddressType::Unknown
    }

    // ── Script coding ───────────────────────────────────────────────────

    /// The scriptPubKey paying to `address`.
    pub fn address_to_script(&self, address: &str) -> Result<ScriptBuf> {
        if let Ok(raw) = base58::decode_check(address)
            && raw.len() == 21
        {
            let hash: [u8; 20] = raw[1..].try_into().expect("length checked");
            if raw[0] == self.pub_key_hash {
                return Ok(ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)));
            }
            if raw[0] == self.script_hash {
                return Ok(ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(hash)));
            }
        }

        if !self.bech32_hrp.is_empty()
            && let Ok((hrp, version, program)) = bech32::segwit::decode(address)
            && hrp.to_string().eq_ignore_ascii_case(&self.bech32_hrp)
        {
            match (version.to_u8(), program.len()) {
                (0, 20) if self.supports_segwit => {
                    let hash: [u8; 20] = program.try_into().expect("length checked");
                    return Ok(ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(hash)));
                }
                (0, 32) if self.supports_segwit => {
                    let hash: [u8; 32] = program.try_into().expect("length checked");
                    return Ok(ScriptBuf::new_p2wsh(&WScriptHash::from_byte_array(hash)));
                }
                (1, 32) if self.supports_taproot => {
                    let key = XOnlyPublicKey::from_slice(&program).map_err(|_| {
                        Error::InvalidAddress {
                            what: "taproot",
                            address: address.to_string(),
                            chain: self.name.clone(),
                        }
                    })?;
                    return Ok(ScriptBuf::new_p2tr_tweaked(
                        TweakedPublicKey::dangerous_assume_tweaked(key),
                    ));
                }
                _ => {}
            }
        }

        Err(Error::InvalidAddress {
            what: "chain",
            address: address.to_string(),
            chain: self.name.clone(),
        })
    }

    /// The address paying to `script`, if the script has a standard shape
    /// this chain can express.
    pub fn script_to_address(&self, script: &Script) -> Option<String> {
        let bytes = script.as_bytes();
        if script.is_p2pkh() {
            return Some(self.base58_address(self.pub_key_hash, &bytes[3..23]));
        }
        if script.is_p2sh() {
            return Some(self.base58_address(self.script_hash, &bytes[2..22]));
        }
        if self.bech32_hrp.is_empty() {
            return None;
        }
        let hrp = Hrp::parse(&self.bech32_hrp).ok()?;
        if self.supports_segwit && bytes.len() == 22 && bytes[0] == 0x00 && bytes[1] == 0x14 {
            return bech32::segwit::encode_v0(hrp, &bytes[2..]).ok();
        }
        if self.supports_segwit && bytes.len() == 34 && bytes[0] == 0x00 && bytes[1] == 0x20 {
            return bech32::segwit::encode_v0(hrp, &bytes[2..]).ok();
        }
        if self.supports_taproot && bytes.len() == 34 && bytes[0] == 0x51 && bytes[1] == 0x20 {
            return bech32::segwit::encode_v1(hrp, &bytes[2..]).ok();
        }
        None
    }

    fn base58_address(&self, version: u8, payload: &[u8]) -> String {
        let mut data = Vec::with_capacity(21);
        data.push(version);
        data.extend_from_slice(payload);
        base58::encode_check(&data)
    }

    /// Encode a P2PKH address from a pubkey hash.
    pub fn p2pkh_address(&self, hash: [u8; 20]) -> String {
        self.base58_address(self.pub_key_hash, &hash)
    }

    /// Encode a P2SH address from a script hash.
    pub fn p2sh_address(&self, hash: [u8; 20]) -> String {
        self.base58_address(self.script_hash, &hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitcoin_base58_round_trip() {
        let chain = ChainParams::bitcoin();
        let p2pkh = chain.p2pkh_address([0x11; 20]);
        let p2sh = chain.p2sh_address([0x22; 20]);
        assert_eq!(chain.classify_address(&p2pkh), AddressType::P2pkh);
        assert_eq!(chain.classify_address(&p2sh), AddressType::P2sh);

        let script = chain.address_to_script(&p2pkh).unwrap();
        assert_eq!(chain.script_to_address(&script).unwrap(), p2pkh);
        let script = chain.address_to_script(&p2sh).unwrap();
        assert_eq!(chain.script_to_address(&script).unwrap(), p2sh);
    }

    #[test]
    fn bitcoin_segwit_round_trip() {
        let chain = ChainParams::bitcoin();
        let script = ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array([0x33; 20]));
        let address = chain.script_to_address(&script).unwrap();
        assert!(address.starts_with("bc1q"));
        assert_eq!(chain.classify_address(&address), AddressType::P2wpkh);
        assert_eq!(chain.address_to_script(&address).unwrap(), script);

        let script = ScriptBuf::new_p2wsh(&WScriptHash::from_byte_array([0x44; 32]));
        let address = chain.script_to_address(&script).unwrap();
        assert_eq!(chain.classify_address(&address), AddressType::P2wsh);
        assert_eq!(chain.address_to_script(&address).unwrap(), script);
    }

    #[test]
    fn bitcoin_taproot_round_trip() {
        let chain = ChainParams::bitcoin();
        // x-coordinate of the generator point, a known-valid x-only key
        let key = XOnlyPublicKey::from_slice(
            &hex::decode("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap(),
        )
        .unwrap();
        let script = ScriptBuf::new_p2tr_tweaked(TweakedPublicKey::dangerous_assume_tweaked(key));
        let address = chain.script_to_address(&script).unwrap();
        assert!(address.starts_with("bc1p"));
        assert_eq!(chain.classify_address(&address), AddressType::P2tr);
        assert_eq!(chain.address_to_script(&address).unwrap(), script);
    }

    #[test]
    fn known_mainnet_addresses_classify() {
        let chain = ChainParams::bitcoin();
        assert_eq!(
            chain.classify_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"),
            AddressType::P2pkh
        );
        assert_eq!(
            chain.classify_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"),
            AddressType::P2wpkh
        );
    }

    #[test]
    fn legacy_chain_rejects_segwit() {
        let chain = ChainParams::junkcoin();
        assert!(!chain.supports_segwit);
        assert!(!chain.supports_taproot);
        assert_eq!(
            chain.classify_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"),
            AddressType::Unknown
        );
        let p2pkh = chain.p2pkh_address([0x55; 20]);
        assert_eq!(chain.classify_address(&p2pkh), AddressType::P2pkh);
    }

    #[test]
    fn empty_hrp_forces_capability_flags_off() {
        let chain = ChainParams::new("custom", "X", 0x30, 0x32, "", true, true, 546, 1);
        assert!(!chain.supports_segwit);
        assert!(!chain.supports_taproot);
    }

    #[test]
    fn foreign_hrp_is_unknown() {
        let chain = ChainParams::litecoin();
        // valid bech32, wrong HRP for litecoin
        assert_eq!(
            chain.classify_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"),
            AddressType::Unknown
        );
    }

    #[test]
    fn version_bytes_are_chain_specific() {
        let bitcoin = ChainParams::bitcoin();
        let dogecoin = ChainParams::dogecoin();
        let address = dogecoin.p2pkh_address([0x66; 20]);
        assert_eq!(dogecoin.classify_address(&address), AddressType::P2pkh);
        assert_eq!(bitcoin.classify_address(&address), AddressType::Unknown);
    }

    #[test]
    fn from_name_lookup() {
        assert_eq!(ChainParams::from_name("bitcoin").unwrap().ticker, "BTC");
        assert_eq!(ChainParams::from_name("junkcoin").unwrap().ticker, "JKC");
        assert!(matches!(
            ChainParams::from_name("solana"),
            Err(Error::UnknownChain(_))
        ));
    }
}

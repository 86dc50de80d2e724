//! External provider seams.
//!
//! The engine never talks to the network directly; everything flows through
//! the traits here. A [`Providers`] bundle is handed to a session at
//! construction time. A process-wide default bundle is retained only as a
//! compatibility shim at the outermost boundary.

use std::sync::{Arc, OnceLock, RwLock};

use bitcoin::{OutPoint, Txid};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fees::FeeTier;
use crate::item::Item;

pub mod esplora;
pub mod rpc;

pub use esplora::{EsploraClient, HttpItemIndex};
pub use rpc::{RpcClient, RpcConfig};

// ── Wire models ─────────────────────────────────────────────────────────

/// Confirmation status of an output, as reported by the UTXO source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoStatus {
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_time: Option<u32>,
}

/// One unspent output of an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressUtxo {
    pub txid: Txid,
    pub vout: u32,
    pub value: u64,
    pub status: UtxoStatus,
}

impl AddressUtxo {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// Verbose transaction view from the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerboseTransaction {
    pub txid: Txid,
    #[serde(default)]
    pub hex: String,
    /// Zero while the transaction sits in the mempool.
    #[serde(default)]
    pub confirmations: u32,
    #[serde(default)]
    pub blockhash: Option<String>,
    #[serde(default)]
    pub blocktime: Option<u64>,
    #[serde(default)]
    pub vin: Vec<VerboseVin>,
    #[serde(default)]
    pub vout: Vec<VerboseVout>,
}

/// One input of a verbose transaction. Coinbase inputs carry no prevout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerboseVin {
    #[serde(default)]
    pub txid: Option<Txid>,
    #[serde(default)]
    pub vout: Option<u32>,
    #[serde(default)]
    pub sequence: Option<u32>,
}

/// One output of a verbose transaction. `value` is in coin units, as the
/// node reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerboseVout {
    pub value: f64,
    pub n: u32,
}

/// Per-input result of node-side PSBT analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsbtInputAnalysis {
    #[serde(default)]
    pub has_utxo: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsbtAnalysis {
    #[serde(default)]
    pub inputs: Vec<PsbtInputAnalysis>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizedPsbt {
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub psbt: Option<String>,
    pub complete: bool,
}

/// One entry of a `testmempoolaccept` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolAcceptance {
    pub txid: Txid,
    #[serde(default)]
    pub wtxid: Option<Txid>,
    pub allowed: bool,
    #[serde(default)]
    pub vsize: Option<u64>,
    #[serde(rename = "reject-reason", default)]
    pub reject_reason: Option<String>,
}

/// Recommended fee rates in sat/vB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedFees {
    pub fastest_fee: u64,
    pub half_hour_fee: u64,
    pub hour_fee: u64,
    #[serde(default)]
    pub economy_fee: u64,
    pub minimum_fee: u64,
}

impl RecommendedFees {
    pub fn tier(&self, tier: FeeTier) -> u64 {
        match tier {
            FeeTier::Fastest => self.fastest_fee,
            FeeTier::HalfHour => self.half_hour_fee,
            FeeTier::Hour => self.hour_fee,
            FeeTier::Minimum => self.minimum_fee,
        }
    }
}

// ── Traits ──────────────────────────────────────────────────────────────

/// Node-level RPC endpoint; one instance per chain.
pub trait NodeRpc: Send + Sync {
    fn get_raw_transaction(&self, txid: &Txid) -> Result<String>;
    fn get_raw_transaction_verbose(&self, txid: &Txid) -> Result<VerboseTransaction>;
    fn analyze_psbt(&self, psbt_b64: &str) -> Result<PsbtAnalysis>;
    fn finalize_psbt(&self, psbt_b64: &str) -> Result<FinalizedPsbt>;
    fn test_mempool_accept(&self, raw_txs: &[String]) -> Result<Vec<MempoolAcceptance>>;
    fn send_raw_transaction(&self, raw_tx: &str) -> Result<Txid>;
    fn get_raw_mempool(&self) -> Result<Vec<Txid>>;
}

/// Fee-rate oracle.
pub trait FeeOracle: Send + Sync {
    fn get_fees_recommended(&self) -> Result<RecommendedFees>;

    fn get_fee(&self, tier: FeeTier) -> Result<u64> {
        Ok(self.get_fees_recommended()?.tier(tier))
    }
}

/// Address-indexed UTXO set.
pub trait UtxoSource: Send + Sync {
    fn get_address_utxos(&self, address: &str) -> Result<Vec<AddressUtxo>>;
}

/// Outpoint-indexed inscription lookup. Covers confirmed chain state only.
pub trait ItemIndex: Send + Sync {
    fn get_token_by_output(&self, outpoint: &OutPoint) -> Result<Option<Item>>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Item>>;
}

/// Marketplace fee schedule in basis points, keyed by address.
pub trait MarketFees: Send + Sync {
    fn maker_fee_bp(&self, address: &str) -> Result<u16>;
    fn taker_fee_bp(&self, address: &str) -> Result<u16>;
}

/// Fixed fee schedule; the default when no marketplace provider is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticMarketFees {
    pub maker_bp: u16,
    pub taker_bp: u16,
}

impl MarketFees for StaticMarketFees {
    fn maker_fee_bp(&self, _address: &str) -> Result<u16> {
        Ok(self.maker_bp)
    }

    fn taker_fee_bp(&self, _address: &str) -> Result<u16> {
        Ok(self.taker_bp)
    }
}

/// The full provider bundle consumed by a session.
#[derive(Clone)]
pub struct Providers {
    pub rpc: Arc<dyn NodeRpc>,
    pub fees: Arc<dyn FeeOracle>,
    pub utxos: Arc<dyn UtxoSource>,
    pub items: Arc<dyn ItemIndex>,
    pub market: Arc<dyn MarketFees>,
}

// ── Process-wide default handles (compatibility shim) ───────────────────

static DEFAULT_PROVIDERS: OnceLock<RwLock<Option<Providers>>> = OnceLock::new();

fn default_cell() -> &'static RwLock<Option<Providers>> {
    DEFAULT_PROVIDERS.get_or_init(|| RwLock::new(None))
}

/// Install the process-wide default provider bundle, replacing any previous
/// one. Prefer passing [`Providers`] explicitly; this exists for callers
/// that cannot thread a session through yet.
pub fn set_default_providers(providers: Providers) {
    if let Ok(mut cell) = default_cell().write() {
        *cell = Some(providers);
    }
}

/// The process-wide default provider bundle, if one was installed.
pub fn default_providers() -> Option<Providers> {
    default_cell().read().ok().and_then(|cell| cell.clone())
}

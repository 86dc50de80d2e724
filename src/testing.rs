//! In-memory providers and fixtures for exercising the swap pipeline
//! without a live network.

use std::collections::HashMap;
use std::sync::Arc;

use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::psbt::Psbt;
use bitcoin::{OutPoint, ScriptBuf, Transaction, Txid, XOnlyPublicKey};

use crate::error::{Error, Result};
use crate::item::{Item, SatLocation};
use crate::providers::{
    AddressUtxo, FeeOracle, FinalizedPsbt, ItemIndex, MempoolAcceptance, NodeRpc, Providers,
    PsbtAnalysis, PsbtInputAnalysis, RecommendedFees, StaticMarketFees, UtxoSource, UtxoStatus,
    VerboseTransaction, VerboseVin, VerboseVout,
};
use crate::psbt;

// ── Fixtures ────────────────────────────────────────────────────────────

pub fn txid(byte: u8) -> Txid {
    Txid::from_byte_array([byte; 32])
}

pub fn outpoint(txid_byte: u8, vout: u32) -> OutPoint {
    OutPoint::new(txid(txid_byte), vout)
}

pub fn utxo(txid_byte: u8, vout: u32, value: u64, confirmed: bool) -> AddressUtxo {
    AddressUtxo {
        txid: txid(txid_byte),
        vout,
        value,
        status: UtxoStatus {
            confirmed,
            block_height: confirmed.then_some(100),
            block_time: None,
        },
    }
}

/// The secp generator's x coordinate: a known-valid x-only key.
pub fn x_only_key() -> XOnlyPublicKey {
    XOnlyPublicKey::from_slice(
        &hex::decode("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
            .expect("valid hex"),
    )
    .expect("valid x-only key")
}

/// An inscription sitting at offset zero of `outpoint`.
pub fn item_at(outpoint: OutPoint, output_value: u64) -> Item {
    Item {
        id: format!("{}i0", outpoint.txid),
        owner: String::new(),
        location: SatLocation::new(outpoint.txid, outpoint.vout, 0),
        output: outpoint,
        output_value,
    }
}

pub fn item_with_offset(txid_byte: u8, vout: u32, offset: u64, output_value: u64) -> Item {
    let output = outpoint(txid_byte, vout);
    Item {
        id: format!("{}i0", output.txid),
        owner: String::new(),
        location: SatLocation::new(output.txid, output.vout, offset),
        output,
        output_value,
    }
}

/// A one-output parent transaction paying `value` to `script`.
pub fn parent_transaction_to(seed: u8, value: u64, script: ScriptBuf) -> Transaction {
    psbt::unsigned_transaction(
        vec![psbt::unsigned_input(outpoint(seed, 0))],
        vec![psbt::output(value, script)],
    )
}

pub fn parent_transaction(seed: u8, value: u64) -> Transaction {
    parent_transaction_to(seed, value, ScriptBuf::new())
}

/// An inscription located inside an actual transaction's first output.
pub fn item_for_parent(parent: &Transaction, vout: u32, offset: u64) -> Item {
    let parent_txid = parent.compute_txid();
    let output = OutPoint::new(parent_txid, vout);
    Item {
        id: format!("{parent_txid}i0"),
        owner: String::new(),
        location: SatLocation::new(parent_txid, vout, offset),
        output,
        output_value: parent.output[vout as usize].value.to_sat(),
    }
}

/// A confirmed UTXO backed by a real parent transaction, for legacy-input
/// paths that fetch the parent by txid.
pub fn funded_utxo(seed: u8, value: u64, script: ScriptBuf) -> (Transaction, AddressUtxo) {
    let parent = parent_transaction_to(seed, value, script);
    let utxo = AddressUtxo {
        txid: parent.compute_txid(),
        vout: 0,
        value,
        status: UtxoStatus {
            confirmed: true,
            block_height: Some(100),
            block_time: None,
        },
    };
    (parent, utxo)
}

/// A verbose transaction with the given confirmation count and prevouts.
pub fn verbose_tx(txid_byte: u8, confirmations: u32, vins: &[(u8, u32)]) -> VerboseTransaction {
    VerboseTransaction {
        txid: txid(txid_byte),
        hex: String::new(),
        confirmations,
        blockhash: None,
        blocktime: None,
        vin: vins
            .iter()
            .map(|(parent, vout)| VerboseVin {
                txid: Some(txid(*parent)),
                vout: Some(*vout),
                sequence: None,
            })
            .collect(),
        vout: vec![VerboseVout { value: 0.0, n: 0 }],
    }
}

// ── Mock providers ──────────────────────────────────────────────────────

/// Static node backend over prepared transactions. PSBT analysis and
/// finalization are derived from the actual final-script fields, so tests
/// see the same signals a node would emit.
#[derive(Debug, Default)]
pub struct StaticRpc {
    pub transactions: HashMap<Txid, Transaction>,
    pub verbose: HashMap<Txid, VerboseTransaction>,
}

impl StaticRpc {
    pub fn with_transaction(mut self, tx: Transaction) -> Self {
        self.transactions.insert(tx.compute_txid(), tx);
        self
    }

    pub fn with_verbose(mut self, tx: VerboseTransaction) -> Self {
        self.verbose.insert(tx.txid, tx);
        self
    }

    fn parse_psbt(psbt_b64: &str) -> Result<Psbt> {
        psbt_b64
            .parse()
            .map_err(|e: bitcoin::psbt::PsbtParseError| Error::Provider(e.to_string()))
    }
}

impl NodeRpc for StaticRpc {
    fn get_raw_transaction(&self, txid: &Txid) -> Result<String> {
        self.transactions
            .get(txid)
            .map(|tx| hex::encode(encode::serialize(tx)))
            .ok_or_else(|| Error::Provider(format!("unknown transaction {txid}")))
    }

    fn get_raw_transaction_verbose(&self, txid: &Txid) -> Result<VerboseTransaction> {
        self.verbose
            .get(txid)
            .cloned()
            .ok_or_else(|| Error::Provider(format!("unknown transaction {txid}")))
    }

    fn analyze_psbt(&self, psbt_b64: &str) -> Result<PsbtAnalysis> {
        let parsed = Self::parse_psbt(psbt_b64)?;
        let inputs = parsed
            .inputs
            .iter()
            .map(|input| {
                let is_final =
                    input.final_script_witness.is_some() || input.final_script_sig.is_some();
                PsbtInputAnalysis {
                    has_utxo: input.witness_utxo.is_some() || input.non_witness_utxo.is_some(),
                    is_final,
                    next: (!is_final).then(|| "signer".to_string()),
                }
            })
            .collect();
        Ok(PsbtAnalysis { inputs, next: None })
    }

    fn finalize_psbt(&self, psbt_b64: &str) -> Result<FinalizedPsbt> {
        let parsed = Self::parse_psbt(psbt_b64)?;
        let complete = parsed
            .inputs
            .iter()
            .all(|i| i.final_script_witness.is_some() || i.final_script_sig.is_some());
        Ok(FinalizedPsbt {
            hex: complete.then(|| hex::encode(encode::serialize(&parsed.unsigned_tx))),
            psbt: (!complete).then(|| psbt_b64.to_string()),
            complete,
        })
    }

    fn test_mempool_accept(&self, raw_txs: &[String]) -> Result<Vec<MempoolAcceptance>> {
        raw_txs
            .iter()
            .map(|raw| {
                let bytes =
                    hex::decode(raw).map_err(|e| Error::Provider(format!("bad tx hex: {e}")))?;
                let tx: Transaction = encode::deserialize(&bytes)
                    .map_err(|e| Error::Provider(format!("bad tx encoding: {e}")))?;
                Ok(MempoolAcceptance {
                    txid: tx.compute_txid(),
                    wtxid: None,
                    allowed: true,
                    vsize: Some(tx.vsize() as u64),
                    reject_reason: None,
                })
            })
            .collect()
    }

    fn send_raw_transaction(&self, raw_tx: &str) -> Result<Txid> {
        let bytes =
            hex::decode(raw_tx).map_err(|e| Error::Provider(format!("bad tx hex: {e}")))?;
        let tx: Transaction = encode::deserialize(&bytes)
            .map_err(|e| Error::Provider(format!("bad tx encoding: {e}")))?;
        Ok(tx.compute_txid())
    }

    fn get_raw_mempool(&self) -> Result<Vec<Txid>> {
        Ok(self
            .verbose
            .values()
            .filter(|tx| tx.confirmations == 0)
            .map(|tx| tx.txid)
            .collect())
    }
}

/// Flat fee schedule: every tier quotes the same rate.
#[derive(Debug, Clone, Copy)]
pub struct StaticFees(pub u64);

impl FeeOracle for StaticFees {
    fn get_fees_recommended(&self) -> Result<RecommendedFees> {
        Ok(RecommendedFees {
            fastest_fee: self.0,
            half_hour_fee: self.0,
            hour_fee: self.0,
            economy_fee: self.0,
            minimum_fee: self.0,
        })
    }
}

/// Serves the same UTXO list for every address.
#[derive(Debug, Clone, Default)]
pub struct StaticUtxos(pub Vec<AddressUtxo>);

impl UtxoSource for StaticUtxos {
    fn get_address_utxos(&self, _address: &str) -> Result<Vec<AddressUtxo>> {
        Ok(self.0.clone())
    }
}

/// Outpoint-keyed inscription index.
#[derive(Debug, Clone, Default)]
pub struct StaticItems {
    pub items: HashMap<OutPoint, Item>,
}

impl StaticItems {
    pub fn with_item(item: Item) -> Self {
        let mut items = HashMap::new();
        items.insert(item.output, item);
        Self { items }
    }

    pub fn insert(mut self, item: Item) -> Self {
        self.items.insert(item.output, item);
        self
    }
}

impl ItemIndex for StaticItems {
    fn get_token_by_output(&self, outpoint: &OutPoint) -> Result<Option<Item>> {
        Ok(self.items.get(outpoint).cloned())
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Item>> {
        Ok(self.items.values().find(|item| item.id == id).cloned())
    }
}

/// An index that is always down, for fail-closed tests.
#[derive(Debug, Clone, Copy)]
pub struct FailingItems;

impl ItemIndex for FailingItems {
    fn get_token_by_output(&self, _outpoint: &OutPoint) -> Result<Option<Item>> {
        Err(Error::Provider("index offline".into()))
    }

    fn get_token_by_id(&self, _id: &str) -> Result<Option<Item>> {
        Err(Error::Provider("index offline".into()))
    }
}

// ── Bundles ─────────────────────────────────────────────────────────────

pub fn providers_with(
    rpc: StaticRpc,
    fee_rate: u64,
    utxos: Vec<AddressUtxo>,
    items: StaticItems,
) -> Providers {
    providers_with_market(rpc, fee_rate, utxos, items, 0, 0)
}

pub fn providers_with_market(
    rpc: StaticRpc,
    fee_rate: u64,
    utxos: Vec<AddressUtxo>,
    items: StaticItems,
    maker_bp: u16,
    taker_bp: u16,
) -> Providers {
    Providers {
        rpc: Arc::new(rpc),
        fees: Arc::new(StaticFees(fee_rate)),
        utxos: Arc::new(StaticUtxos(utxos)),
        items: Arc::new(items),
        market: Arc::new(StaticMarketFees { maker_bp, taker_bp }),
    }
}

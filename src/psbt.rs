//! PSBT assembly helpers shared by the listing and purchase builders.

use bitcoin::absolute::LockTime;
use bitcoin::psbt::{Input as PsbtInput, Psbt, PsbtSighashType};
use bitcoin::transaction::Version;
use bitcoin::{
    Amount, EcdsaSighashType, OutPoint, ScriptBuf, Sequence, TapSighashType, Transaction, TxIn,
    TxOut, Witness, XOnlyPublicKey,
};

use crate::error::{Error, Result};

/// Signing shape of a PSBT input. Each variant carries only the fields the
/// corresponding signer consumes.
#[derive(Debug, Clone)]
pub enum InputKind {
    /// Base58 P2PKH input; signs over the full parent transaction.
    Legacy { prev_tx: Transaction },
    /// P2SH-wrapped P2WPKH with its synthesized redeem script.
    NestedSegwit {
        prevout: TxOut,
        redeem_script: ScriptBuf,
    },
    /// Native v0 segwit input.
    NativeSegwit { prevout: TxOut },
    /// Taproot key-path input.
    Taproot {
        prevout: TxOut,
        internal_key: XOnlyPublicKey,
    },
}

impl InputKind {
    /// SINGLE|ANYONECANPAY in the flavour understood by this input's signer.
    pub fn single_anyonecanpay(&self) -> PsbtSighashType {
        match self {
            InputKind::Taproot { .. } => {
                PsbtSighashType::from(TapSighashType::SinglePlusAnyoneCanPay)
            }
            _ => PsbtSighashType::from(EcdsaSighashType::SinglePlusAnyoneCanPay),
        }
    }

    /// Populate `input` with the signing metadata for this shape.
    pub fn apply(&self, input: &mut PsbtInput) {
        match self {
            InputKind::Legacy { prev_tx } => {
                input.non_witness_utxo = Some(strip_witnesses(prev_tx));
            }
            InputKind::NestedSegwit {
                prevout,
                redeem_script,
            } => {
                input.witness_utxo = Some(prevout.clone());
                input.redeem_script = Some(redeem_script.clone());
            }
            InputKind::NativeSegwit { prevout } => {
                input.witness_utxo = Some(prevout.clone());
            }
            InputKind::Taproot {
                prevout,
                internal_key,
            } => {
                input.witness_utxo = Some(prevout.clone());
                input.tap_internal_key = Some(*internal_key);
            }
        }
    }
}

/// Clear input witnesses so the transaction serializes in the legacy format.
/// Some nodes return segwit-serialized parents; legacy signing hashes the
/// non-witness serialization.
pub fn strip_witnesses(tx: &Transaction) -> Transaction {
    let mut tx = tx.clone();
    for input in &mut tx.input {
        input.witness = Witness::default();
    }
    tx
}

/// An unsigned input spending `outpoint`.
pub fn unsigned_input(outpoint: OutPoint) -> TxIn {
    TxIn {
        previous_output: outpoint,
        script_sig: ScriptBuf::new(),
        sequence: Sequence::MAX,
        witness: Witness::default(),
    }
}

pub fn output(value: u64, script_pubkey: ScriptBuf) -> TxOut {
    TxOut {
        value: Amount::from_sat(value),
        script_pubkey,
    }
}

/// A version-2, unlocked transaction skeleton.
pub fn unsigned_transaction(input: Vec<TxIn>, output: Vec<TxOut>) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input,
        output,
    }
}

pub fn new_psbt(tx: Transaction) -> Result<Psbt> {
    Psbt::from_unsigned_tx(tx).map_err(|e| Error::Psbt(e.to_string()))
}

//! Recombination of the signed halves.

use bitcoin::Witness;
use bitcoin::psbt::Psbt;

use crate::error::{Error, Result};
use crate::swap::ORD_INPUT_INDEX;

/// Splice the seller's signed input into the ordinal slot of the buyer PSBT.
///
/// Only the unsigned-transaction input and its PSBT metadata move; every
/// other field of the buyer PSBT is preserved. The merge is a pure function
/// of its two arguments.
pub fn merge_psbts(seller: &Psbt, buyer: &Psbt) -> Result<Psbt> {
    if seller.unsigned_tx.input.len() != 1 {
        return Err(Error::ListingInputCount(seller.unsigned_tx.input.len()));
    }
    if buyer.unsigned_tx.input.len() <= ORD_INPUT_INDEX {
        return Err(Error::Layout(format!(
            "purchase has {} inputs, the ordinal slot is {ORD_INPUT_INDEX}",
            buyer.unsigned_tx.input.len()
        )));
    }
    let slot = &buyer.unsigned_tx.input[ORD_INPUT_INDEX];
    if slot.previous_output != seller.unsigned_tx.input[0].previous_output {
        return Err(Error::Layout(
            "ordinal slot does not spend the listed outpoint".into(),
        ));
    }

    let mut merged = buyer.clone();
    merged.unsigned_tx.input[ORD_INPUT_INDEX] = seller.unsigned_tx.input[0].clone();
    merged.inputs[ORD_INPUT_INDEX] = seller.inputs[0].clone();
    Ok(merged)
}

/// A final witness consisting of a single 65-byte all-zero element — the
/// placeholder some wallets leave behind instead of a Schnorr signature.
pub(crate) fn is_placeholder_schnorr(witness: &Witness) -> bool {
    witness.len() == 1
        && witness
            .iter()
            .next()
            .is_some_and(|elem| elem.len() == 65 && elem.iter().all(|b| *b == 0))
}

//! The seller half: one input, one output, SINGLE|ANYONECANPAY.

use bitcoin::ScriptBuf;
use bitcoin::psbt::Psbt;

use crate::error::Result;
use crate::item::Item;
use crate::psbt::{self, InputKind};
use crate::swap::params::seller_payout;

/// Inputs to the listing builder. The parent transaction is prefetched by
/// the session, so the builder never touches a provider.
#[derive(Debug, Clone)]
pub struct ListingPsbtParams {
    pub item: Item,
    pub price: u64,
    pub maker_fee_bp: u16,
    /// scriptPubKey of the seller's receive address.
    pub receive_script: ScriptBuf,
    pub input_kind: InputKind,
}

/// Build the unsigned listing PSBT.
///
/// ```text
/// Inputs:  [0] inscription outpoint    (signed SINGLE|ANYONECANPAY)
/// Outputs: [0] seller receive          price − maker fee + postage reimbursement
/// ```
///
/// The sighash commits only to this input and to the output sharing its
/// index, so the buyer may assemble any transaction around the pair as long
/// as both land at the same index there.
pub fn build_listing_psbt(params: &ListingPsbtParams) -> Result<Psbt> {
    params.item.validate()?;

    let payout = seller_payout(params.price, params.maker_fee_bp, params.item.output_value);
    let tx = psbt::unsigned_transaction(
        vec![psbt::unsigned_input(params.item.output)],
        vec![psbt::output(payout, params.receive_script.clone())],
    );

    let mut listing = psbt::new_psbt(tx)?;
    params.input_kind.apply(&mut listing.inputs[0]);
    listing.inputs[0].sighash_type = Some(params.input_kind.single_anyonecanpay());
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::psbt::PsbtSighashType;
    use bitcoin::{EcdsaSighashType, TapSighashType};

    use crate::testing;

    fn params(kind: InputKind) -> ListingPsbtParams {
        ListingPsbtParams {
            item: testing::item_with_offset(7, 0, 0, 10_000),
            price: 100_000,
            maker_fee_bp: 100,
            receive_script: ScriptBuf::from_bytes(vec![0x51]),
            input_kind: kind,
        }
    }

    #[test]
    fn listing_has_one_input_one_output() {
        let kind = InputKind::NativeSegwit {
            prevout: psbt::output(10_000, ScriptBuf::new()),
        };
        let listing = build_listing_psbt(&params(kind)).unwrap();
        assert_eq!(listing.unsigned_tx.input.len(), 1);
        assert_eq!(listing.unsigned_tx.output.len(), 1);
        assert_eq!(listing.unsigned_tx.output[0].value.to_sat(), 109_000);
    }

    #[test]
    fn taproot_listing_uses_taproot_sighash() {
        let kind = InputKind::Taproot {
            prevout: psbt::output(10_000, ScriptBuf::new()),
            internal_key: testing::x_only_key(),
        };
        let listing = build_listing_psbt(&params(kind)).unwrap();
        assert_eq!(
            listing.inputs[0].sighash_type,
            Some(PsbtSighashType::from(TapSighashType::SinglePlusAnyoneCanPay))
        );
        assert!(listing.inputs[0].tap_internal_key.is_some());
    }

    #[test]
    fn legacy_listing_uses_ecdsa_sighash_and_parent_tx() {
        let prev_tx = testing::parent_transaction(7, 10_000);
        let kind = InputKind::Legacy {
            prev_tx: prev_tx.clone(),
        };
        let mut p = params(kind);
        p.item = testing::item_for_parent(&prev_tx, 0, 0);
        let listing = build_listing_psbt(&p).unwrap();
        assert_eq!(
            listing.inputs[0].sighash_type,
            Some(PsbtSighashType::from(
                EcdsaSighashType::SinglePlusAnyoneCanPay
            ))
        );
        assert!(listing.inputs[0].non_witness_utxo.is_some());
    }

    #[test]
    fn inconsistent_item_is_rejected() {
        let kind = InputKind::NativeSegwit {
            prevout: psbt::output(10_000, ScriptBuf::new()),
        };
        let mut p = params(kind);
        p.item.location.offset = 10_000; // == output_value, out of range
        assert!(build_listing_psbt(&p).is_err());
    }
}

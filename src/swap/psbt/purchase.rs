//! The buyer half: the fixed-slot layout that recombines with the seller's
//! SINGLE|ANYONECANPAY signature.

use bitcoin::ScriptBuf;
use bitcoin::psbt::Psbt;

use crate::error::{Error, Result};
use crate::fees::estimate_fee;
use crate::item::Item;
use crate::psbt::{self, InputKind};
use crate::providers::AddressUtxo;
use crate::swap::params::{platform_fee, seller_payout};
use crate::swap::{ORD_INPUT_INDEX, ORD_OUTPUT_INDEX, PAD_OUTPUT_INDEX, SELLER_OUTPUT_INDEX};

/// A buyer-owned input with its resolved signing shape.
#[derive(Debug, Clone)]
pub struct PurchaseInput {
    pub utxo: AddressUtxo,
    pub kind: InputKind,
}

/// Inputs to the purchase builder; all selection and provider I/O has
/// already happened.
#[derive(Debug, Clone)]
pub struct PurchasePsbtParams {
    pub item: Item,
    pub price: u64,
    pub maker_fee_bp: u16,
    pub taker_fee_bp: u16,
    pub dummies: [PurchaseInput; 2],
    pub payments: Vec<PurchaseInput>,
    /// scriptPubKey of the buyer payment address; receives the pad output,
    /// the fresh dummies, and any change.
    pub payment_script: ScriptBuf,
    /// scriptPubKey receiving the inscription.
    pub token_receive_script: ScriptBuf,
    /// scriptPubKey of the seller's receive address; must mirror the listing.
    pub seller_receive_script: ScriptBuf,
    /// Marketplace fee collection script, when one is configured.
    pub platform_fee_script: Option<ScriptBuf>,
    /// Fee rate in sat/vB, already clamped to the chain minimum.
    pub fee_rate: u64,
    pub dust_limit: u64,
    /// Value of each fresh dummy output.
    pub dummy_value: u64,
    /// Value of the inscription output delivered to the buyer.
    pub postage: u64,
}

/// Where each structural piece of the purchase transaction landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseLayout {
    pub ord_input: usize,
    pub pad_output: usize,
    pub ord_output: usize,
    pub seller_output: usize,
    pub platform_fee_output: Option<usize>,
    pub new_dummy_outputs: [usize; 2],
    pub change_output: Option<usize>,
    /// Total miner fee committed by the layout.
    pub fee: u64,
}

/// Build the unsigned purchase PSBT.
///
/// ```text
/// Inputs:  [0] buyer dummy #1
///          [1] buyer dummy #2
///          [2] seller ordinal outpoint   (placeholder; filled by merge)
///          [3…] buyer payment inputs
///
/// Outputs: [0] payment address           dummy1 + dummy2 + sat offset
///          [1] token receive address     postage
///          [2] seller receive address    seller payout
///          [3] platform fee address      maker + taker bp   (unless ≤ dust)
///          [..] payment address          fresh dummy × 2
///          [..] payment address          change             (unless ≤ dust)
/// ```
///
/// The two dummies absorb the inscription's sat offset into output 0, so the
/// inscribed sat opens output 1 and the postage tail of the seller input
/// flows into output 2. Keeping the ordinal input and the seller output at
/// fixed slots is what lets the SINGLE|ANYONECANPAY listing signature
/// survive the splice.
pub fn build_purchase_psbt(params: &PurchasePsbtParams) -> Result<(Psbt, PurchaseLayout)> {
    params.item.validate()?;
    if params.payments.is_empty() {
        return Err(Error::Layout("at least one payment input is required".into()));
    }

    let offset = params.item.location.offset;
    let dummy1 = params.dummies[0].utxo.value;
    let dummy2 = params.dummies[1].utxo.value;
    let payout = seller_payout(params.price, params.maker_fee_bp, params.item.output_value);
    let marketplace_cut = platform_fee(params.price, params.maker_fee_bp + params.taker_fee_bp);

    // ── Inputs ──
    let mut inputs = vec![
        psbt::unsigned_input(params.dummies[0].utxo.outpoint()),
        psbt::unsigned_input(params.dummies[1].utxo.outpoint()),
        psbt::unsigned_input(params.item.output),
    ];
    inputs.extend(
        params
            .payments
            .iter()
            .map(|p| psbt::unsigned_input(p.utxo.outpoint())),
    );

    // ── Outputs ──
    let mut outputs = vec![
        psbt::output(dummy1 + dummy2 + offset, params.payment_script.clone()),
        psbt::output(params.postage, params.token_receive_script.clone()),
        psbt::output(payout, params.seller_receive_script.clone()),
    ];

    let platform_fee_output = match &params.platform_fee_script {
        Some(script) if marketplace_cut > params.dust_limit => {
            outputs.push(psbt::output(marketplace_cut, script.clone()));
            Some(outputs.len() - 1)
        }
        _ => None,
    };

    let new_dummy_outputs = [outputs.len(), outputs.len() + 1];
    outputs.push(psbt::output(params.dummy_value, params.payment_script.clone()));
    outputs.push(psbt::output(params.dummy_value, params.payment_script.clone()));

    // ── Balance ──
    let payment_sum: u64 = params.payments.iter().map(|p| p.utxo.value).sum();
    let total_in = dummy1 + dummy2 + params.item.output_value + payment_sum;
    let committed: u64 = outputs.iter().map(|o| o.value.to_sat()).sum();

    let fee_with_change = estimate_fee(inputs.len(), outputs.len() + 1, params.fee_rate);
    let fee_flat = estimate_fee(inputs.len(), outputs.len(), params.fee_rate);

    let available = total_in.checked_sub(committed).ok_or(Error::InsufficientFunds {
        needed: committed + fee_flat,
        available: total_in,
    })?;

    let (fee, change_output) = if available > fee_with_change
        && available - fee_with_change > params.dust_limit
    {
        let index = outputs.len();
        outputs.push(psbt::output(
            available - fee_with_change,
            params.payment_script.clone(),
        ));
        (fee_with_change, Some(index))
    } else if available >= fee_flat {
        // A sub-dust remainder rides with the miner fee.
        (available, None)
    } else {
        return Err(Error::InsufficientFunds {
            needed: committed + fee_flat,
            available: total_in,
        });
    };

    let mut purchase = psbt::new_psbt(psbt::unsigned_transaction(inputs, outputs))?;
    params.dummies[0].kind.apply(&mut purchase.inputs[0]);
    params.dummies[1].kind.apply(&mut purchase.inputs[1]);
    // Slot 2 stays bare: the seller's signed metadata replaces it at merge.
    for (i, payment) in params.payments.iter().enumerate() {
        payment.kind.apply(&mut purchase.inputs[ORD_INPUT_INDEX + 1 + i]);
    }

    let layout = PurchaseLayout {
        ord_input: ORD_INPUT_INDEX,
        pad_output: PAD_OUTPUT_INDEX,
        ord_output: ORD_OUTPUT_INDEX,
        seller_output: SELLER_OUTPUT_INDEX,
        platform_fee_output,
        new_dummy_outputs,
        change_output,
        fee,
    };
    Ok((purchase, layout))
}

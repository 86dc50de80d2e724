//! The full pipeline: list, purchase, merge, finalize, precheck.

use bitcoin::hashes::Hash;
use bitcoin::psbt::Psbt;
use bitcoin::{ScriptBuf, WPubkeyHash, Witness, XOnlyPublicKey};

use ordswap_sdk::testing::{self, StaticItems, StaticRpc};
use ordswap_sdk::{
    BuyerTerms, ChainParams, FeeTier, ListingState, SellerTerms, SwapConfig, SwapNode,
    SwapSession, swap::ORD_INPUT_INDEX,
};

fn owner_script(key: XOnlyPublicKey) -> ScriptBuf {
    ScriptBuf::new_p2tr_tweaked(bitcoin::key::TweakedPublicKey::dangerous_assume_tweaked(key))
}

fn session_and_listing() -> (SwapSession, ListingState, BuyerTerms) {
    let chain = ChainParams::bitcoin();
    let key = testing::x_only_key();
    let owner = chain.script_to_address(&owner_script(key)).unwrap();

    let parent = testing::parent_transaction_to(0x10, 10_000, owner_script(key));
    let mut item = testing::item_for_parent(&parent, 0, 0);
    item.owner = owner;

    let address_of = |byte: u8| {
        chain
            .script_to_address(&ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(
                [byte; 20],
            )))
            .unwrap()
    };

    let utxos = vec![
        testing::utxo(0x21, 0, 600, true),
        testing::utxo(0x22, 0, 600, true),
        testing::utxo(0x23, 0, 200_000, true),
    ];
    let providers = testing::providers_with_market(
        StaticRpc::default().with_transaction(parent),
        2,
        utxos,
        StaticItems::with_item(item.clone()),
        100,
        200,
    );
    let platform_fee_address = address_of(0xee);
    let session = SwapSession::new(
        chain.clone(),
        providers,
        SwapConfig::with_platform_fee_address(platform_fee_address),
    );

    let state = session
        .create_listing(SellerTerms {
            maker_fee_bp: 100,
            ord_item: item,
            price: 100_000,
            receive_address: address_of(0x42),
            tap_internal_key: Some(key),
        })
        .unwrap();

    let terms = BuyerTerms {
        taker_fee_bp: 200,
        payment_address: address_of(0xbb),
        token_receive_address: session
            .chain()
            .script_to_address(&owner_script(key))
            .unwrap(),
        fee_rate_tier: FeeTier::Hour,
        payment_pubkey: None,
    };
    (session, state, terms)
}

/// Stand-in for the external signer: finalize every input except the
/// ordinal slot.
fn sign_all_but_ord(psbt_b64: &str) -> String {
    let mut psbt: Psbt = psbt_b64.parse().unwrap();
    for (index, input) in psbt.inputs.iter_mut().enumerate() {
        if index != ORD_INPUT_INDEX {
            input.final_script_witness = Some(Witness::from(vec![vec![0xcd; 72]]));
        }
    }
    psbt.to_string()
}

fn sign_listing(psbt_b64: &str) -> String {
    let mut psbt: Psbt = psbt_b64.parse().unwrap();
    psbt.inputs[0].final_script_witness = Some(Witness::from(vec![vec![0xab; 65]]));
    psbt.to_string()
}

fn advance_to_signed(session: &SwapSession, state: &mut ListingState, terms: BuyerTerms) {
    state.signed_listing_psbt = Some(sign_listing(state.unsigned_listing_psbt.as_ref().unwrap()));
    session.prepare_purchase(state, terms).unwrap();
    let buyer = state.buyer.as_mut().unwrap();
    buyer.signed_buying_psbt = Some(sign_all_but_ord(
        buyer.unsigned_buying_psbt.as_ref().unwrap(),
    ));
}

#[test]
fn merge_splices_the_seller_signature_into_the_ordinal_slot() {
    let (session, mut state, terms) = session_and_listing();
    advance_to_signed(&session, &mut state, terms);

    let merged_b64 = session.merge_listing(&mut state).unwrap();
    let merged: Psbt = merged_b64.parse().unwrap();

    let seller: Psbt = state.signed_listing_psbt.as_ref().unwrap().parse().unwrap();
    assert_eq!(
        merged.inputs[ORD_INPUT_INDEX].final_script_witness,
        seller.inputs[0].final_script_witness
    );
    assert!(merged
        .inputs
        .iter()
        .all(|input| input.final_script_witness.is_some()));
    assert_eq!(
        merged.unsigned_tx.input[ORD_INPUT_INDEX].previous_output,
        state.seller.ord_item.output
    );
}

#[test]
fn merge_is_byte_identical_across_invocations() {
    let (session, mut state, terms) = session_and_listing();
    advance_to_signed(&session, &mut state, terms);

    let first = session.merge_listing(&mut state).unwrap();
    let second = session.merge_listing(&mut state).unwrap();
    assert_eq!(first, second);
    assert_eq!(state.buyer.as_ref().unwrap().merged_psbt, Some(first));
}

#[test]
fn merged_psbt_finalizes_and_passes_the_mempool_precheck() {
    let (session, mut state, terms) = session_and_listing();
    advance_to_signed(&session, &mut state, terms);

    let merged = session.merge_listing(&mut state).unwrap();
    let raw_tx = session.finalize(&merged).unwrap();
    let accepted = session.precheck(&raw_tx).unwrap();
    assert!(accepted.allowed);

    let txid = session.submit(&raw_tx).unwrap();
    let merged: Psbt = merged.parse().unwrap();
    assert_eq!(txid, merged.unsigned_tx.compute_txid());
}

#[test]
fn merge_without_signed_halves_is_rejected() {
    let (session, mut state, _terms) = session_and_listing();
    assert!(session.merge_listing(&mut state).is_err());
}

#[tokio::test]
async fn async_node_drives_the_same_pipeline() {
    let (session, _state, terms) = session_and_listing();
    let seller = _state.seller.clone();
    let node = SwapNode::new(session);

    let mut state = node.create_listing(seller).await.unwrap();
    state.signed_listing_psbt = Some(sign_listing(state.unsigned_listing_psbt.as_ref().unwrap()));

    let (mut state, layout) = node.prepare_purchase(state, terms).await.unwrap();
    assert_eq!(layout.ord_input, ORD_INPUT_INDEX);
    {
        let buyer = state.buyer.as_mut().unwrap();
        buyer.signed_buying_psbt = Some(sign_all_but_ord(
            buyer.unsigned_buying_psbt.as_ref().unwrap(),
        ));
    }

    let (_state, merged) = node.merge_listing(state).await.unwrap();
    let raw_tx = node.finalize(merged).await.unwrap();
    let accepted = node.precheck(raw_tx).await.unwrap();
    assert!(accepted.allowed);
}

//! `SwapSession` — provider I/O orchestration for the swap protocol.
//!
//! The session owns a chain profile, a provider bundle, and the engine
//! configuration. Every public operation is a linear sequence of provider
//! requests followed by pure PSBT assembly; nothing is persisted and the
//! network is never mutated here (broadcast is a thin passthrough).

use bitcoin::consensus::encode;
use bitcoin::hashes::{Hash, hash160};
use bitcoin::psbt::Psbt;
use bitcoin::{ScriptBuf, Transaction, TxOut, Txid, WPubkeyHash};

use crate::chain::{AddressType, ChainParams};
use crate::config::SwapConfig;
use crate::error::{Error, Result};
use crate::item::Item;
use crate::psbt::InputKind;
use crate::providers::{self, AddressUtxo, MempoolAcceptance, Providers};
use crate::swap::params::{platform_fee, seller_payout};
use crate::swap::psbt::list::{ListingPsbtParams, build_listing_psbt};
use crate::swap::psbt::merge::{is_placeholder_schnorr, merge_psbts};
use crate::swap::psbt::purchase::{
    PurchaseInput, PurchaseLayout, PurchasePsbtParams, build_purchase_psbt,
};
use crate::swap::{BuyerSide, BuyerTerms, ListingState, SellerTerms, VerifyListingRequest};
use crate::utxo::UtxoClassifier;

pub struct SwapSession {
    chain: ChainParams,
    providers: Providers,
    config: SwapConfig,
}

impl SwapSession {
    pub fn new(chain: ChainParams, providers: Providers, config: SwapConfig) -> Self {
        Self {
            chain,
            providers,
            config,
        }
    }

    /// Construct a session from the process-wide default provider bundle.
    /// Compatibility shim; prefer [`SwapSession::new`].
    pub fn with_default_providers(chain: ChainParams, config: SwapConfig) -> Result<Self> {
        let providers = providers::default_providers()
            .ok_or_else(|| Error::Provider("no default providers installed".into()))?;
        Ok(Self::new(chain, providers, config))
    }

    pub fn chain(&self) -> &ChainParams {
        &self.chain
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    // ── Seller side ─────────────────────────────────────────────────────

    /// Build the unsigned listing PSBT and open a listing document.
    pub fn create_listing(&self, seller: SellerTerms) -> Result<ListingState> {
        if seller.maker_fee_bp > 10_000 {
            return Err(Error::FeeOutOfRange(seller.maker_fee_bp));
        }
        if !self.chain.is_valid_address(&seller.receive_address) {
            return Err(Error::InvalidAddress {
                what: "seller receive",
                address: seller.receive_address.clone(),
                chain: self.chain.name.clone(),
            });
        }

        let receive_script = self.chain.address_to_script(&seller.receive_address)?;
        let input_kind = self.listing_input_kind(&seller)?;
        let listing = build_listing_psbt(&ListingPsbtParams {
            item: seller.ord_item.clone(),
            price: seller.price,
            maker_fee_bp: seller.maker_fee_bp,
            receive_script,
            input_kind,
        })?;

        let mut state = ListingState::new(self.chain.clone(), seller);
        state.unsigned_listing_psbt = Some(listing.to_string());
        Ok(state)
    }

    /// Resolve the signing shape of the seller's ordinal input from the
    /// owner address and the fetched parent transaction.
    fn listing_input_kind(&self, seller: &SellerTerms) -> Result<InputKind> {
        let item = &seller.ord_item;
        let prev_tx = self.fetch_transaction(&item.location.txid)?;
        let prevout = prev_tx
            .output
            .get(item.location.vout as usize)
            .cloned()
            .ok_or(Error::MissingVout {
                txid: item.location.txid,
                vout: item.location.vout,
            })?;

        match self.chain.classify_address(&item.owner) {
            AddressType::P2tr => {
                let internal_key = seller
                    .tap_internal_key
                    .ok_or(Error::MissingTapInternalKey)?;
                Ok(InputKind::Taproot {
                    prevout,
                    internal_key,
                })
            }
            AddressType::P2wpkh | AddressType::P2wsh => Ok(InputKind::NativeSegwit { prevout }),
            // Without the redeem data only the parent transaction is usable.
            AddressType::P2pkh | AddressType::P2sh => Ok(InputKind::Legacy { prev_tx }),
            AddressType::Unknown => Err(Error::InvalidAddress {
                what: "inscription owner",
                address: item.owner.clone(),
                chain: self.chain.name.clone(),
            }),
        }
    }

    // ── Buyer side ──────────────────────────────────────────────────────

    /// Select the buyer's coins and build the unsigned purchase PSBT.
    pub fn prepare_purchase(
        &self,
        state: &mut ListingState,
        terms: BuyerTerms,
    ) -> Result<PurchaseLayout> {
        if terms.taker_fee_bp > 10_000 {
            return Err(Error::FeeOutOfRange(terms.taker_fee_bp));
        }
        let payment_type = self.chain.classify_address(&terms.payment_address);
        if payment_type == AddressType::Unknown {
            return Err(Error::InvalidAddress {
                what: "buyer payment",
                address: terms.payment_address.clone(),
                chain: self.chain.name.clone(),
            });
        }
        if !self.chain.is_valid_address(&terms.token_receive_address) {
            return Err(Error::InvalidAddress {
                what: "token receive",
                address: terms.token_receive_address.clone(),
                chain: self.chain.name.clone(),
            });
        }
        let payment_script = self.chain.address_to_script(&terms.payment_address)?;
        let redeem_script = self.nested_redeem_script(payment_type, &terms, &payment_script)?;

        let seller = &state.seller;
        if seller.maker_fee_bp > 10_000 {
            return Err(Error::FeeOutOfRange(seller.maker_fee_bp));
        }
        seller.ord_item.validate()?;
        let offset = seller.ord_item.location.offset;

        // Marketplace cut, as it will appear in the outputs (or not).
        let fee_script = self.platform_fee_script()?;
        let marketplace_cut = platform_fee(seller.price, seller.maker_fee_bp + terms.taker_fee_bp);
        let effective_cut = match &fee_script {
            Some(_) if marketplace_cut > self.chain.dust_limit => marketplace_cut,
            _ => 0,
        };

        let utxos = self
            .providers
            .utxos
            .get_address_utxos(&terms.payment_address)?;
        let classifier = UtxoClassifier::new(
            self.providers.rpc.as_ref(),
            self.providers.items.as_ref(),
            &self.config,
        );

        let dummies = classifier
            .select_dummy_utxos(&utxos)
            .ok_or(Error::MissingDummyUtxos {
                min: self.config.dummy_min_value,
                max: self.config.dummy_max_value,
            })?;
        let remaining: Vec<AddressUtxo> = utxos
            .into_iter()
            .filter(|u| {
                u.outpoint() != dummies[0].outpoint() && u.outpoint() != dummies[1].outpoint()
            })
            .collect();

        let fee_rate = self
            .providers
            .fees
            .get_fee(terms.fee_rate_tier)?
            .max(self.chain.min_fee_rate);

        let maker_cut = platform_fee(seller.price, seller.maker_fee_bp);
        let need = offset
            + self.config.postage
            + (seller.price - maker_cut)
            + effective_cut
            + 2 * self.config.dummy_value;
        // Base slots: two dummies + the ordinal input; seven outputs with
        // platform fee and change included.
        let payments = classifier.select_payment_utxos(&remaining, need, 3, 7, fee_rate)?;

        let to_input = |utxo: &AddressUtxo| -> Result<PurchaseInput> {
            Ok(PurchaseInput {
                utxo: utxo.clone(),
                kind: self.payment_input_kind(
                    payment_type,
                    utxo,
                    &payment_script,
                    redeem_script.as_ref(),
                )?,
            })
        };
        let dummy_inputs = [to_input(&dummies[0])?, to_input(&dummies[1])?];
        let payment_inputs = payments.iter().map(to_input).collect::<Result<Vec<_>>>()?;

        let (purchase, layout) = build_purchase_psbt(&PurchasePsbtParams {
            item: seller.ord_item.clone(),
            price: seller.price,
            maker_fee_bp: seller.maker_fee_bp,
            taker_fee_bp: terms.taker_fee_bp,
            dummies: dummy_inputs,
            payments: payment_inputs,
            payment_script,
            token_receive_script: self.chain.address_to_script(&terms.token_receive_address)?,
            seller_receive_script: self.chain.address_to_script(&seller.receive_address)?,
            platform_fee_script: fee_script,
            fee_rate,
            dust_limit: self.chain.dust_limit,
            dummy_value: self.config.dummy_value,
            postage: self.config.postage,
        })?;

        let mut side = BuyerSide::new(terms);
        side.dummy_utxos = Some(dummies);
        side.payment_utxos = payments;
        side.unsigned_buying_psbt = Some(purchase.to_string());
        state.buyer = Some(side);
        Ok(layout)
    }

    fn platform_fee_script(&self) -> Result<Option<ScriptBuf>> {
        match &self.config.platform_fee_address {
            Some(address) if !address.is_empty() => {
                Ok(Some(self.chain.address_to_script(address)?))
            }
            _ => Ok(None),
        }
    }

    /// For a P2SH payment address, synthesize the `p2sh(p2wpkh(pubkey))`
    /// redeem script and check it actually hashes to the address.
    fn nested_redeem_script(
        &self,
        payment_type: AddressType,
        terms: &BuyerTerms,
        payment_script: &ScriptBuf,
    ) -> Result<Option<ScriptBuf>> {
        if payment_type != AddressType::P2sh {
            return Ok(None);
        }
        let pubkey = terms.payment_pubkey.ok_or(Error::MissingPaymentPubkey)?;
        if !pubkey.compressed {
            return Err(Error::PaymentPubkeyMismatch);
        }
        let wpkh = WPubkeyHash::from_byte_array(
            hash160::Hash::hash(&pubkey.to_bytes()).to_byte_array(),
        );
        let redeem = ScriptBuf::new_p2wpkh(&wpkh);
        if &ScriptBuf::new_p2sh(&redeem.script_hash()) != payment_script {
            return Err(Error::PaymentPubkeyMismatch);
        }
        Ok(Some(redeem))
    }

    fn payment_input_kind(
        &self,
        payment_type: AddressType,
        utxo: &AddressUtxo,
        payment_script: &ScriptBuf,
        redeem_script: Option<&ScriptBuf>,
    ) -> Result<InputKind> {
        let prevout = TxOut {
            value: bitcoin::Amount::from_sat(utxo.value),
            script_pubkey: payment_script.clone(),
        };
        match payment_type {
            AddressType::P2pkh => Ok(InputKind::Legacy {
                prev_tx: self.fetch_transaction(&utxo.txid)?,
            }),
            AddressType::P2sh => Ok(InputKind::NestedSegwit {
                prevout,
                redeem_script: redeem_script.ok_or(Error::MissingPaymentPubkey)?.clone(),
            }),
            // The buyer's wallet fills taproot derivation data itself.
            AddressType::P2wpkh | AddressType::P2wsh | AddressType::P2tr => {
                Ok(InputKind::NativeSegwit { prevout })
            }
            AddressType::Unknown => Err(Error::InvalidAddress {
                what: "buyer payment",
                address: String::new(),
                chain: self.chain.name.clone(),
            }),
        }
    }

    // ── Verification ────────────────────────────────────────────────────

    /// Validate a received signed listing against the protocol invariants.
    /// Deterministic and idempotent given stable providers.
    pub fn verify_signed_listing(&self, req: &VerifyListingRequest) -> Result<Item> {
        if req.price == self.config.delist_magic_price {
            return Err(Error::ListingWithdrawn);
        }

        let listing: Psbt = req
            .signed_listing_psbt
            .parse()
            .map_err(|e: bitcoin::psbt::PsbtParseError| Error::Psbt(e.to_string()))?;

        if listing.unsigned_tx.input.len() != 1 {
            return Err(Error::ListingInputCount(listing.unsigned_tx.input.len()));
        }
        if listing.unsigned_tx.output.len() != 1 {
            return Err(Error::Layout(format!(
                "listing must pay exactly one output (found {})",
                listing.unsigned_tx.output.len()
            )));
        }

        // Signature presence. Taproot listings additionally go through
        // node-side analysis so a malformed witness cannot slip past.
        let input = &listing.inputs[0];
        if input.tap_internal_key.is_some() || req.tap_internal_key.is_some() {
            let witness = input
                .final_script_witness
                .as_ref()
                .ok_or(Error::ListingUnsigned)?;
            if is_placeholder_schnorr(witness) {
                return Err(Error::ListingUnsigned);
            }
            let analysis = self.providers.rpc.analyze_psbt(&req.signed_listing_psbt)?;
            if !analysis.inputs.first().is_some_and(|i| i.is_final) {
                return Err(Error::ListingUnsigned);
            }
        } else if input.final_script_witness.is_none()
            && input.final_script_sig.is_none()
            && input.partial_sigs.is_empty()
        {
            return Err(Error::ListingUnsigned);
        }

        // Inscription identity.
        let outpoint = listing.unsigned_tx.input[0].previous_output;
        let item = self
            .providers
            .items
            .get_token_by_output(&outpoint)?
            .ok_or_else(|| Error::ListingTokenMismatch {
                expected: req.token_id.clone(),
                found: outpoint.to_string(),
            })?;
        if item.id != req.token_id {
            return Err(Error::ListingTokenMismatch {
                expected: req.token_id.clone(),
                found: item.id.clone(),
            });
        }

        // Price correctness under the marketplace maker fee (zero if the
        // provider has nothing for this seller).
        let maker_fee_bp = self
            .providers
            .market
            .maker_fee_bp(&item.owner)
            .unwrap_or_default();
        if maker_fee_bp > 10_000 {
            return Err(Error::FeeOutOfRange(maker_fee_bp));
        }
        let expected = seller_payout(req.price, maker_fee_bp, item.output_value);
        let found = listing.unsigned_tx.output[0].value.to_sat();
        if found != expected {
            return Err(Error::ListingPriceMismatch { expected, found });
        }

        // Receive address.
        let found_address = self
            .chain
            .script_to_address(&listing.unsigned_tx.output[0].script_pubkey)
            .unwrap_or_default();
        if found_address != req.seller_receive_address {
            return Err(Error::ListingReceiverMismatch {
                expected: req.seller_receive_address.clone(),
                found: found_address,
            });
        }

        // Seller authenticity: the spent output must belong to the owner the
        // index reports.
        let prev_tx = self.fetch_transaction(&outpoint.txid)?;
        let prevout = prev_tx
            .output
            .get(outpoint.vout as usize)
            .ok_or(Error::MissingVout {
                txid: outpoint.txid,
                vout: outpoint.vout,
            })?;
        let owner = self.chain.script_to_address(&prevout.script_pubkey);
        if owner.as_deref() != Some(item.owner.as_str()) {
            return Err(Error::ListingOwnerMismatch {
                owner: item.owner.clone(),
            });
        }

        Ok(item)
    }

    // ── Merge and node handoff ──────────────────────────────────────────

    /// Splice the signed listing into the signed purchase PSBT and record
    /// the merged document on the state.
    pub fn merge_listing(&self, state: &mut ListingState) -> Result<String> {
        let seller_psbt = parse_psbt(
            state
                .signed_listing_psbt
                .as_deref()
                .ok_or(Error::MissingState("signed listing psbt"))?,
        )?;
        let buyer = state
            .buyer
            .as_mut()
            .ok_or(Error::MissingState("buyer side"))?;
        let buyer_psbt = parse_psbt(
            buyer
                .signed_buying_psbt
                .as_deref()
                .ok_or(Error::MissingState("signed buying psbt"))?,
        )?;

        let merged = merge_psbts(&seller_psbt, &buyer_psbt)?;
        let encoded = merged.to_string();
        buyer.merged_psbt = Some(encoded.clone());
        Ok(encoded)
    }

    /// Ask the node to finalize a PSBT, returning the raw transaction hex.
    pub fn finalize(&self, psbt_b64: &str) -> Result<String> {
        let finalized = self.providers.rpc.finalize_psbt(psbt_b64)?;
        if !finalized.complete {
            return Err(Error::Rejected("node could not finalize the psbt".into()));
        }
        finalized
            .hex
            .ok_or_else(|| Error::Rejected("finalized psbt came back without raw hex".into()))
    }

    /// Dry-run a raw transaction against the node mempool.
    pub fn precheck(&self, raw_tx: &str) -> Result<MempoolAcceptance> {
        let results = self
            .providers
            .rpc
            .test_mempool_accept(&[raw_tx.to_owned()])?;
        match results.into_iter().next() {
            Some(result) if result.allowed => Ok(result),
            Some(result) => Err(Error::Rejected(
                result
                    .reject_reason
                    .unwrap_or_else(|| "unknown reject reason".into()),
            )),
            None => Err(Error::Provider("empty testmempoolaccept response".into())),
        }
    }

    /// Hand a raw transaction to the node for broadcast.
    pub fn submit(&self, raw_tx: &str) -> Result<Txid> {
        self.providers.rpc.send_raw_transaction(raw_tx)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn fetch_transaction(&self, txid: &Txid) -> Result<Transaction> {
        let raw = self.providers.rpc.get_raw_transaction(txid)?;
        let bytes =
            hex::decode(raw).map_err(|e| Error::Provider(format!("bad transaction hex: {e}")))?;
        encode::deserialize(&bytes)
            .map_err(|e| Error::Provider(format!("bad transaction encoding: {e}")))
    }
}

fn parse_psbt(psbt_b64: &str) -> Result<Psbt> {
    psbt_b64
        .parse()
        .map_err(|e: bitcoin::psbt::PsbtParseError| Error::Psbt(e.to_string()))
}

//! Inscription-aware UTXO classification and coin selection.

use bitcoin::OutPoint;

use crate::config::SwapConfig;
use crate::error::{Error, Result};
use crate::fees::estimate_fee;
use crate::providers::{AddressUtxo, ItemIndex, NodeRpc};

/// Classifies wallet UTXOs against the inscription index and picks the
/// structural and funding coins of a purchase.
pub struct UtxoClassifier<'a> {
    rpc: &'a dyn NodeRpc,
    items: &'a dyn ItemIndex,
    config: &'a SwapConfig,
}

impl<'a> UtxoClassifier<'a> {
    pub fn new(rpc: &'a dyn NodeRpc, items: &'a dyn ItemIndex, config: &'a SwapConfig) -> Self {
        Self { rpc, items, config }
    }

    /// Whether spending `utxo` could move an inscription.
    ///
    /// Confirmed outputs are judged by the index directly. The index only
    /// covers confirmed chain state, so unconfirmed outputs are judged by
    /// their parents; an unconfirmed ancestor means the ancestry cannot be
    /// cleared. Every provider failure counts as containment.
    pub fn contains_inscription(&self, utxo: &AddressUtxo) -> bool {
        let outpoint = utxo.outpoint();

        if utxo.status.confirmed {
            return match self.items.get_token_by_output(&outpoint) {
                Ok(None) => false,
                Ok(Some(_)) => true,
                Err(e) => {
                    log::warn!("index lookup failed for {outpoint}, treating as inscribed: {e}");
                    true
                }
            };
        }

        let tx = match self.rpc.get_raw_transaction_verbose(&utxo.txid) {
            Ok(tx) => tx,
            Err(e) => {
                log::warn!("cannot fetch unconfirmed {outpoint}, treating as inscribed: {e}");
                return true;
            }
        };

        for vin in &tx.vin {
            let (Some(txid), Some(vout)) = (vin.txid, vin.vout) else {
                return true;
            };
            match self.rpc.get_raw_transaction_verbose(&txid) {
                Ok(parent) if parent.confirmations == 0 => return true,
                Ok(_) => {}
                Err(_) => return true,
            }
            match self.items.get_token_by_output(&OutPoint::new(txid, vout)) {
                Ok(None) => {}
                _ => return true,
            }
        }
        false
    }

    /// The first two inscription-free outputs in the dummy range, scanning in
    /// the given order. `None` if fewer than two qualify.
    pub fn select_dummy_utxos(&self, utxos: &[AddressUtxo]) -> Option<[AddressUtxo; 2]> {
        let mut first: Option<AddressUtxo> = None;
        for utxo in utxos {
            if utxo.value < self.config.dummy_min_value || utxo.value > self.config.dummy_max_value
            {
                continue;
            }
            if self.contains_inscription(utxo) {
                log::warn!("skipping dummy candidate {}: inscribed", utxo.outpoint());
                continue;
            }
            match first.take() {
                None => first = Some(utxo.clone()),
                Some(a) => return Some([a, utxo.clone()]),
            }
        }
        None
    }

    /// Accumulate payment coins, largest first, until `amount` plus the
    /// estimated fee over `base_vins + taken` inputs is covered.
    ///
    /// Values at or below the dummy denomination are left untouched so future
    /// purchases can still find padding outputs.
    pub fn select_payment_utxos(
        &self,
        utxos: &[AddressUtxo],
        amount: u64,
        base_vins: usize,
        base_vouts: usize,
        fee_rate: u64,
    ) -> Result<Vec<AddressUtxo>> {
        let mut candidates: Vec<AddressUtxo> = utxos
            .iter()
            .filter(|u| u.value > self.config.dummy_value)
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.value.cmp(&a.value));

        let mut taken = Vec::new();
        let mut sum = 0u64;
        for utxo in candidates {
            if sum >= amount + estimate_fee(base_vins + taken.len(), base_vouts, fee_rate) {
                break;
            }
            if self.contains_inscription(&utxo) {
                log::warn!("skipping payment candidate {}: inscribed", utxo.outpoint());
                continue;
            }
            sum += utxo.value;
            taken.push(utxo);
        }

        let needed = amount + estimate_fee(base_vins + taken.len(), base_vouts, fee_rate);
        if sum < needed {
            return Err(Error::InsufficientFunds {
                needed,
                available: sum,
            });
        }
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, StaticItems, StaticRpc};

    fn config() -> SwapConfig {
        SwapConfig::default()
    }

    #[test]
    fn confirmed_utxo_without_token_is_clean() {
        let rpc = StaticRpc::default();
        let items = StaticItems::default();
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        let utxo = testing::utxo(1, 0, 700, true);
        assert!(!classifier.contains_inscription(&utxo));
    }

    #[test]
    fn confirmed_utxo_with_token_is_inscribed() {
        let rpc = StaticRpc::default();
        let utxo = testing::utxo(1, 0, 700, true);
        let items = StaticItems::with_item(testing::item_at(utxo.outpoint(), 700));
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        assert!(classifier.contains_inscription(&utxo));
    }

    #[test]
    fn index_failure_fails_closed() {
        let rpc = StaticRpc::default();
        let items = testing::FailingItems;
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        let utxo = testing::utxo(1, 0, 700, true);
        assert!(classifier.contains_inscription(&utxo));
    }

    #[test]
    fn unconfirmed_utxo_with_unconfirmed_parent_is_inscribed() {
        // child (txid 2) spends parent (txid 1); parent still in mempool
        let rpc = StaticRpc::default()
            .with_verbose(testing::verbose_tx(2, 0, &[(1, 0)]))
            .with_verbose(testing::verbose_tx(1, 0, &[]));
        let items = StaticItems::default();
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        let utxo = testing::utxo(2, 0, 700, false);
        assert!(classifier.contains_inscription(&utxo));
    }

    #[test]
    fn unconfirmed_utxo_with_inscribed_parent_is_inscribed() {
        let rpc = StaticRpc::default()
            .with_verbose(testing::verbose_tx(2, 0, &[(1, 0)]))
            .with_verbose(testing::verbose_tx(1, 6, &[]));
        let parent_outpoint = OutPoint::new(testing::txid(1), 0);
        let items = StaticItems::with_item(testing::item_at(parent_outpoint, 700));
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        let utxo = testing::utxo(2, 0, 700, false);
        assert!(classifier.contains_inscription(&utxo));
    }

    #[test]
    fn unconfirmed_utxo_with_clean_confirmed_parents_is_clean() {
        let rpc = StaticRpc::default()
            .with_verbose(testing::verbose_tx(2, 0, &[(1, 0)]))
            .with_verbose(testing::verbose_tx(1, 6, &[]));
        let items = StaticItems::default();
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        let utxo = testing::utxo(2, 0, 700, false);
        assert!(!classifier.contains_inscription(&utxo));
    }

    #[test]
    fn dummy_selection_takes_first_two_in_range() {
        let rpc = StaticRpc::default();
        let items = StaticItems::default();
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        let utxos = vec![
            testing::utxo(1, 0, 500, true),   // below range
            testing::utxo(2, 0, 600, true),   // dummy #1
            testing::utxo(3, 0, 50_000, true), // out of range
            testing::utxo(4, 0, 999, true),   // dummy #2
            testing::utxo(5, 0, 700, true),   // not reached
        ];
        let [a, b] = classifier.select_dummy_utxos(&utxos).unwrap();
        assert_eq!(a.value, 600);
        assert_eq!(b.value, 999);
    }

    #[test]
    fn dummy_selection_skips_tainted_and_fails_short() {
        // A 700-sat unconfirmed output whose parent carries an inscription, a
        // clean 700-sat confirmed output, and a 50k coin out of the dummy
        // range: only the clean one qualifies, so selection must fail.
        let rpc = StaticRpc::default().with_verbose(testing::verbose_tx(2, 0, &[(1, 0)]));
        let parent_outpoint = OutPoint::new(testing::txid(1), 0);
        let rpc = rpc.with_verbose(testing::verbose_tx(1, 3, &[]));
        let items = StaticItems::with_item(testing::item_at(parent_outpoint, 700));
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        let utxos = vec![
            testing::utxo(2, 0, 700, false),
            testing::utxo(3, 0, 700, true),
            testing::utxo(4, 0, 50_000, true),
        ];
        assert!(classifier.select_dummy_utxos(&utxos).is_none());
    }

    #[test]
    fn payment_selection_prefers_large_and_protects_dummies() {
        let rpc = StaticRpc::default();
        let items = StaticItems::default();
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        let utxos = vec![
            testing::utxo(1, 0, 600, true), // dummy denomination, protected
            testing::utxo(2, 0, 30_000, true),
            testing::utxo(3, 0, 80_000, true),
        ];
        let taken = classifier
            .select_payment_utxos(&utxos, 50_000, 3, 7, 1)
            .unwrap();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].value, 80_000);
    }

    #[test]
    fn payment_selection_accumulates_until_fee_covered() {
        let rpc = StaticRpc::default();
        let items = StaticItems::default();
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        let utxos = vec![
            testing::utxo(1, 0, 60_000, true),
            testing::utxo(2, 0, 50_000, true),
        ];
        let taken = classifier
            .select_payment_utxos(&utxos, 100_000, 3, 7, 1)
            .unwrap();
        assert_eq!(taken.len(), 2);
        let sum: u64 = taken.iter().map(|u| u.value).sum();
        assert!(sum >= 100_000 + estimate_fee(5, 7, 1));
    }

    #[test]
    fn payment_selection_reports_shortfall() {
        let rpc = StaticRpc::default();
        let items = StaticItems::default();
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        let utxos = vec![testing::utxo(1, 0, 50_000, true)];
        let err = classifier
            .select_payment_utxos(&utxos, 100_000, 3, 7, 2)
            .unwrap_err();
        match err {
            Error::InsufficientFunds { needed, available } => {
                assert_eq!(available, 50_000);
                assert_eq!(needed, 100_000 + estimate_fee(4, 7, 2));
            }
            other => panic!("expected InsufficientFunds, got {other}"),
        }
    }

    #[test]
    fn payment_selection_skips_inscribed_coins() {
        let rpc = StaticRpc::default();
        let inscribed = testing::utxo(1, 0, 90_000, true);
        let items = StaticItems::with_item(testing::item_at(inscribed.outpoint(), 90_000));
        let config = config();
        let classifier = UtxoClassifier::new(&rpc, &items, &config);
        let utxos = vec![inscribed, testing::utxo(2, 0, 80_000, true)];
        let taken = classifier
            .select_payment_utxos(&utxos, 50_000, 3, 7, 1)
            .unwrap();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].value, 80_000);
    }
}

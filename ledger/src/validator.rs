//! Candidate-batch validation.
//!
//! Picks the largest subset of candidate transactions that can be applied
//! together without driving any sender below zero. Removal works to a fixed
//! point: dropping a payment changes the sender's final balance but also the
//! recipient's, which can tip a downstream sender negative, so the fold is
//! re-run until no offenders remain.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use tally_store::StateStore;
use tally_transactions::{Transaction, ValidationResult};
use tally_types::{Address, TxFingerprint};

use crate::engine::StateEngine;
use crate::error::{balance_corruption, LedgerError};

impl<S: StateStore> StateEngine<S> {
    /// Largest subset of `candidates` that is jointly applicable as of
    /// `at_height` (default: current height).
    ///
    /// A candidate survives the pre-filter when it is not already included at
    /// or before the bound, its authorship checks out, it is statically
    /// valid, and genesis seeds only appear while the state is empty. The
    /// surviving set is then trimmed: for every overdrafting sender, its
    /// largest-amount payments are dropped (insertion order breaks ties)
    /// until the account is whole, and the fold repeats until it converges.
    pub fn validate(
        &self,
        candidates: &[Transaction],
        at_height: Option<u32>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let bound = match at_height {
            Some(height) => height,
            None => self.store.height()?,
        };

        let mut txs: Vec<Transaction> = Vec::new();
        for tx in candidates {
            if let Some(height) = self.store.inclusion(&tx.fingerprint())? {
                if height <= bound {
                    continue;
                }
            }
            if tx.is_genesis() && bound > 0 {
                continue;
            }
            if !tx.authorship_ok() {
                continue;
            }
            if tx.validate() != ValidationResult::Ok {
                continue;
            }
            txs.push(tx.clone());
        }

        while !txs.is_empty() {
            let mut working: HashMap<Address, i64> = HashMap::new();
            for tx in &txs {
                for (account, delta) in tx.balance_changes() {
                    if !working.contains_key(&account) {
                        let base = self.balance_bounded(&account, bound)? as i64;
                        working.insert(account, base);
                    }
                    if let Some(balance) = working.get_mut(&account) {
                        *balance = balance.checked_add(delta).ok_or_else(|| {
                            balance_corruption("candidate delta overflows balance")
                        })?;
                    }
                }
            }

            let mut offenders: Vec<(Address, i64)> = working
                .iter()
                .filter(|(_, balance)| **balance < 0)
                .map(|(account, balance)| (*account, *balance))
                .collect();
            if offenders.is_empty() {
                return Ok(txs);
            }
            offenders.sort();

            let mut to_remove: HashSet<TxFingerprint> = HashSet::new();
            for (offender, shortfall) in offenders {
                // This sender's payments, largest amount first; the sort is
                // stable, so equal amounts keep their input order and the
                // result is reproducible.
                let mut outgoing: Vec<&Transaction> = txs
                    .iter()
                    .filter(|tx| {
                        matches!(tx, Transaction::Payment(payment) if payment.sender == offender)
                    })
                    .collect();
                outgoing.sort_by(|a, b| payment_amount(b).cmp(&payment_amount(a)));

                let mut running = shortfall;
                for tx in outgoing {
                    if running >= 0 {
                        break;
                    }
                    if let Transaction::Payment(payment) = tx {
                        to_remove.insert(tx.fingerprint());
                        let restored = payment.amount.saturating_add(payment.fee);
                        running =
                            running.saturating_add(i64::try_from(restored).unwrap_or(i64::MAX));
                    }
                }
            }

            debug!(
                removed = to_remove.len(),
                remaining = txs.len() - to_remove.len(),
                "trimmed overdrafting candidates"
            );
            txs.retain(|tx| !to_remove.contains(&tx.fingerprint()));
        }
        Ok(txs)
    }
}

fn payment_amount(tx: &Transaction) -> u64 {
    match tx {
        Transaction::Payment(payment) => payment.amount,
        Transaction::Genesis(genesis) => genesis.amount,
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{address, keypair, payment, payment_block, seeded_engine};
    use crate::StateEngine;
    use tally_transactions::{GenesisTx, PaymentTx, Transaction};
    use tally_types::{Address, Timestamp};

    #[test]
    fn overdraft_drops_the_largest_payment() {
        // S3: combined outflow exceeds the balance; the largest goes, the
        // remaining two come back in input order.
        let engine = seeded_engine(10, 1_000_000);
        let big = payment(0, address(1), 600_000, 1, 10);
        let mid = payment(0, address(2), 500_000, 1, 20);
        let small = payment(0, address(3), 100, 1, 30);

        let valid = engine
            .validate(&[big.clone(), mid.clone(), small.clone()], None)
            .unwrap();
        assert_eq!(valid, vec![mid, small]);
    }

    #[test]
    fn jointly_affordable_set_is_untouched() {
        let engine = seeded_engine(4, 1_000_000);
        let candidates = vec![
            payment(0, address(1), 100, 1, 10),
            payment(1, address(2), 200, 1, 20),
            payment(2, address(3), 300, 1, 30),
        ];
        let valid = engine.validate(&candidates, None).unwrap();
        assert_eq!(valid, candidates);
    }

    #[test]
    fn removal_cascades_to_downstream_senders() {
        // a1 spends money it would only have received from a0's removed
        // payment, so the fixed point empties the set.
        let engine = seeded_engine(1, 500);
        let funding = payment(0, address(1), 600, 0, 10);
        let downstream = payment(1, address(2), 500, 0, 20);

        let valid = engine.validate(&[downstream, funding], None).unwrap();
        assert!(valid.is_empty());
    }

    #[test]
    fn equal_amounts_trim_in_input_order() {
        let engine = seeded_engine(4, 1_000);
        let first = payment(0, address(1), 400, 0, 10);
        let second = payment(0, address(2), 400, 0, 20);
        let third = payment(0, address(3), 400, 0, 30);

        let valid = engine
            .validate(&[first, second.clone(), third.clone()], None)
            .unwrap();
        assert_eq!(valid, vec![second, third]);
    }

    #[test]
    fn already_included_candidates_are_filtered() {
        let mut engine = seeded_engine(2, 1_000_000);
        let tx = payment(0, address(1), 500, 10, 100);
        engine.process_block(&payment_block(vec![tx.clone()])).unwrap();

        assert!(engine.validate(&[tx.clone()], None).unwrap().is_empty());
        // At a height before the inclusion the candidate is fresh again.
        assert_eq!(engine.validate(&[tx.clone()], Some(1)).unwrap(), vec![tx]);
    }

    #[test]
    fn tampered_authorship_is_filtered() {
        let engine = seeded_engine(2, 1_000_000);
        let mut tx = match payment(0, address(1), 500, 10, 100) {
            Transaction::Payment(payment) => payment,
            Transaction::Genesis(_) => unreachable!(),
        };
        tx.amount = 1;
        let valid = engine.validate(&[Transaction::Payment(tx)], None).unwrap();
        assert!(valid.is_empty());
    }

    #[test]
    fn statically_invalid_candidates_are_filtered() {
        let engine = StateEngine::in_memory().unwrap();
        let bad = Transaction::Genesis(GenesisTx::new(Address::ZERO, 100, Timestamp::EPOCH));
        let good = Transaction::Genesis(GenesisTx::new(address(1), 100, Timestamp::EPOCH));
        let valid = engine.validate(&[bad, good.clone()], None).unwrap();
        assert_eq!(valid, vec![good]);
    }

    #[test]
    fn genesis_candidates_only_pass_on_the_empty_state() {
        let empty = StateEngine::in_memory().unwrap();
        let seed = Transaction::Genesis(GenesisTx::new(address(1), 100, Timestamp::EPOCH));
        assert_eq!(empty.validate(&[seed.clone()], None).unwrap(), vec![seed.clone()]);

        let grown = seeded_engine(1, 1_000);
        assert!(grown.validate(&[seed], None).unwrap().is_empty());
    }

    #[test]
    fn validated_set_applies_cleanly() {
        // The validator's promise: its output is a block the engine accepts.
        let mut engine = seeded_engine(3, 1_000);
        let candidates = vec![
            payment(0, address(1), 900, 50, 10),
            payment(0, address(2), 900, 50, 20),
            payment(1, address(2), 100, 1, 30),
        ];
        let valid = engine.validate(&candidates, None).unwrap();
        assert!(valid.len() < candidates.len());
        engine.process_block(&payment_block(valid)).unwrap();
    }

    #[test]
    fn spending_a_payment_and_its_fee_exactly_is_valid() {
        // Fees are not seeded during validation, so the sender must afford
        // amount + fee out of the committed balance.
        let engine = seeded_engine(2, 1_000);
        let exact = payment(0, address(1), 990, 10, 10);
        assert_eq!(engine.validate(&[exact.clone()], None).unwrap(), vec![exact]);

        let over = payment(0, address(1), 991, 10, 11);
        assert!(engine.validate(&[over], None).unwrap().is_empty());
    }

    #[test]
    fn unsigned_payment_never_validates() {
        let engine = seeded_engine(2, 1_000);
        let kp = keypair(0);
        let mut tx = PaymentTx::create(&kp, address(1), 10, 0, Timestamp::new(1));
        tx.signature = tally_types::Signature([0u8; 64]);
        assert!(engine
            .validate(&[Transaction::Payment(tx)], None)
            .unwrap()
            .is_empty());
    }
}

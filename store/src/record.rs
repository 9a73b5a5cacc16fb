//! Persisted record types for the per-account history chain.

use serde::{Deserialize, Serialize};
use tally_transactions::Transaction;

/// The balance carried by a change record.
///
/// Signed so that underflow is representable during block application;
/// persisted records always hold a value ≥ 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: i64,
}

impl AccountState {
    pub fn new(balance: i64) -> Self {
        Self { balance }
    }
}

/// One cause of a balance change at a given height.
///
/// Fee credits are a distinct variant so they contribute to balances without
/// being mistaken for transaction fingerprints during rollback cleanup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonEntry {
    Transaction(Transaction),
    FeeCredit(u64),
}

/// One link in an account's history chain, stored per `(account, height)`.
///
/// `prev_height == 0` means this is the account's first change. Records are
/// immutable once committed; rollback removes them but never edits them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub state: AccountState,
    pub reason: Vec<ReasonEntry>,
    pub prev_height: u32,
}

impl ChangeRecord {
    /// Iterate the transactions in this record's reason list, skipping fee
    /// credits.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.reason.iter().filter_map(|entry| match entry {
            ReasonEntry::Transaction(tx) => Some(tx),
            ReasonEntry::FeeCredit(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_transactions::GenesisTx;
    use tally_types::{Address, Timestamp};

    #[test]
    fn transactions_iterator_skips_fee_credits() {
        let tx = Transaction::Genesis(GenesisTx::new(
            Address::new([1u8; 32]),
            100,
            Timestamp::new(0),
        ));
        let record = ChangeRecord {
            state: AccountState::new(100),
            reason: vec![
                ReasonEntry::Transaction(tx.clone()),
                ReasonEntry::FeeCredit(5),
            ],
            prev_height: 0,
        };
        let txs: Vec<_> = record.transactions().collect();
        assert_eq!(txs, vec![&tx]);
    }
}

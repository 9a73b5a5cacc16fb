//! Genesis transaction: seed an account with an initial balance.
//!
//! Genesis transactions are lawful only in the block applied at height 0;
//! everywhere else the engine rejects them.

use serde::{Deserialize, Serialize};
use tally_crypto::blake2b_256_multi;
use tally_types::{Address, Timestamp, TxFingerprint};

/// A genesis seed granting `amount` to `recipient`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisTx {
    pub recipient: Address,
    pub amount: u64,
    pub timestamp: Timestamp,
}

impl GenesisTx {
    pub fn new(recipient: Address, amount: u64, timestamp: Timestamp) -> Self {
        Self {
            recipient,
            amount,
            timestamp,
        }
    }

    /// Content hash identifying this seed. Genesis transactions carry no
    /// signature, so the fingerprint is derived from the fields.
    pub fn fingerprint(&self) -> TxFingerprint {
        let hash = blake2b_256_multi(&[
            self.recipient.as_bytes(),
            &self.amount.to_be_bytes(),
            &self.timestamp.as_secs().to_be_bytes(),
        ]);
        TxFingerprint::new(hash.to_vec())
    }

    pub fn balance_changes(&self) -> Vec<(Address, i64)> {
        vec![(self.recipient, i64::try_from(self.amount).unwrap_or(i64::MAX))]
    }
}

//! Transaction variants for the tally state engine.
//!
//! Exactly two kinds of transaction exist: genesis seeds (initial balance
//! grants, lawful only in the first block) and signed payments. The engine
//! needs four things from a transaction — its fingerprint, its balance-change
//! list, an authorship check, and static validation — all dispatched here.

pub mod genesis;
pub mod payment;
pub mod validation;

pub use genesis::GenesisTx;
pub use payment::PaymentTx;
pub use validation::ValidationResult;

use serde::{Deserialize, Serialize};
use tally_types::{Address, Timestamp, TxFingerprint};

/// A transaction: either a genesis seed or a signed payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transaction {
    Genesis(GenesisTx),
    Payment(PaymentTx),
}

impl Transaction {
    /// The transaction's unique fingerprint.
    ///
    /// A payment is identified by its signature; a genesis seed by a hash of
    /// its content.
    pub fn fingerprint(&self) -> TxFingerprint {
        match self {
            Transaction::Genesis(tx) => tx.fingerprint(),
            Transaction::Payment(tx) => tx.fingerprint(),
        }
    }

    /// The balance deltas this transaction produces, as `(account, delta)`
    /// pairs in application order.
    pub fn balance_changes(&self) -> Vec<(Address, i64)> {
        match self {
            Transaction::Genesis(tx) => tx.balance_changes(),
            Transaction::Payment(tx) => tx.balance_changes(),
        }
    }

    /// Whether the claimed author actually produced this transaction.
    ///
    /// Genesis seeds have no author; payments must carry a signature that
    /// verifies under the sender's key.
    pub fn authorship_ok(&self) -> bool {
        match self {
            Transaction::Genesis(_) => true,
            Transaction::Payment(tx) => tx.authorship_ok(),
        }
    }

    /// Stateless validation of addresses and amounts.
    pub fn validate(&self) -> ValidationResult {
        match self {
            Transaction::Genesis(tx) => validation::validate_genesis(tx),
            Transaction::Payment(tx) => validation::validate_payment(tx),
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            Transaction::Genesis(tx) => tx.timestamp,
            Transaction::Payment(tx) => tx.timestamp,
        }
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self, Transaction::Genesis(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_crypto::keypair_from_seed;

    #[test]
    fn fingerprints_are_distinct_across_variants() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let recipient = Address::new([9u8; 32]);
        let genesis = Transaction::Genesis(GenesisTx::new(recipient, 1000, Timestamp::new(0)));
        let payment = Transaction::Payment(PaymentTx::create(
            &kp,
            recipient,
            500,
            10,
            Timestamp::new(1),
        ));
        assert_ne!(genesis.fingerprint(), payment.fingerprint());
    }

    #[test]
    fn genesis_authorship_is_vacuous() {
        let tx = Transaction::Genesis(GenesisTx::new(Address::new([1u8; 32]), 5, Timestamp::EPOCH));
        assert!(tx.authorship_ok());
    }

    #[test]
    fn payment_balance_changes_sum_to_minus_fee() {
        let kp = keypair_from_seed(&[2u8; 32]);
        let tx = Transaction::Payment(PaymentTx::create(
            &kp,
            Address::new([3u8; 32]),
            700,
            30,
            Timestamp::new(5),
        ));
        let net: i64 = tx.balance_changes().iter().map(|(_, d)| d).sum();
        assert_eq!(net, -30);
    }
}

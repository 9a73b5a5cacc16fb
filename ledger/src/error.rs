use tally_store::StoreError;
use tally_types::{Address, TxFingerprint};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transaction {fingerprint} already included at height {height}")]
    DuplicateInclusion {
        fingerprint: TxFingerprint,
        height: u32,
    },

    #[error("account {account} would reach negative balance {balance}")]
    NegativeBalance { account: Address, balance: i64 },

    #[error("transaction variant not applicable at height {height}")]
    UnknownTransactionVariant { height: u32 },

    #[error("schema version mismatch: store has {found}, engine expects {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// A chain link the head pointer promises does not exist: the store is
/// corrupted, so fail loudly instead of answering with a wrong balance.
pub(crate) fn chain_corruption(account: &Address, height: u32) -> LedgerError {
    LedgerError::Store(StoreError::Corruption(format!(
        "missing change record for account {account} at height {height}"
    )))
}

/// A persisted balance outside the representable range: committed state can
/// never legitimately produce this.
pub(crate) fn balance_corruption(detail: &str) -> LedgerError {
    LedgerError::Store(StoreError::Corruption(detail.to_string()))
}

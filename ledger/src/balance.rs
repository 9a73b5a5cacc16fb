//! Balance queries and read-side diagnostics.
//!
//! Point-in-time balances walk the per-account chain backwards from the head,
//! following `prev_height` links until a record at or below the requested
//! height turns up. Cost is proportional to the chain depth past the target
//! height; queries hit the head or shallow depths in practice.

use tally_crypto::blake2b_256;
use tally_store::StateStore;
use tally_transactions::Transaction;
use tally_types::{Address, TxFingerprint};

use crate::engine::StateEngine;
use crate::error::{balance_corruption, chain_corruption, LedgerError};

impl<S: StateStore> StateEngine<S> {
    /// Balance of `account` as of `at_height` (default: current height).
    ///
    /// Accounts never touched — and heights before the account's first
    /// change — answer 0.
    pub fn balance(&self, account: &Address, at_height: Option<u32>) -> Result<u64, LedgerError> {
        let bound = match at_height {
            Some(height) => height,
            None => self.store.height()?,
        };
        self.balance_bounded(account, bound)
    }

    pub(crate) fn balance_bounded(&self, account: &Address, bound: u32) -> Result<u64, LedgerError> {
        let mut height = self.store.head(account)?;
        loop {
            if height == 0 {
                return Ok(0);
            }
            let record = self
                .store
                .change(account, height)?
                .ok_or_else(|| chain_corruption(account, height))?;
            if height <= bound {
                if record.state.balance < 0 {
                    return Err(balance_corruption("persisted balance is negative"));
                }
                return Ok(record.state.balance as u64);
            }
            height = record.prev_height;
        }
    }

    /// Balance ignoring the `confirmations` most recent heights, floored at
    /// the genesis height.
    pub fn balance_with_confirmations(
        &self,
        account: &Address,
        confirmations: u32,
    ) -> Result<u64, LedgerError> {
        let height = self.store.height()?;
        let bound = height.saturating_sub(confirmations).max(1);
        self.balance_bounded(account, bound)
    }

    /// Sum of every account's current balance. Conservation diagnostics: in
    /// a closed system this never moves after genesis.
    pub fn total_balance(&self) -> Result<u64, LedgerError> {
        let mut total: u64 = 0;
        for (account, _) in self.store.iter_heads()? {
            let balance = self.balance(&account, None)?;
            total = total
                .checked_add(balance)
                .ok_or_else(|| balance_corruption("total balance overflows u64"))?;
        }
        Ok(total)
    }

    /// Height at which `fingerprint` was included, if strictly below
    /// `upper_bound` (no bound: any inclusion counts).
    pub fn included(
        &self,
        fingerprint: &TxFingerprint,
        upper_bound: Option<u32>,
    ) -> Result<Option<u32>, LedgerError> {
        let found = self.store.inclusion(fingerprint)?;
        Ok(match (found, upper_bound) {
            (Some(height), Some(bound)) if height < bound => Some(height),
            (Some(_), Some(_)) => None,
            (None, Some(_)) => None,
            (found, None) => found,
        })
    }

    /// Every payment that ever touched `account`, newest first.
    pub fn account_transactions(&self, account: &Address) -> Result<Vec<Transaction>, LedgerError> {
        let mut transactions = Vec::new();
        let mut height = self.store.head(account)?;
        while height > 0 {
            let record = self
                .store
                .change(account, height)?
                .ok_or_else(|| chain_corruption(account, height))?;
            for tx in record.transactions() {
                if matches!(tx, Transaction::Payment(_)) {
                    transactions.push(tx.clone());
                }
            }
            height = record.prev_height;
        }
        Ok(transactions)
    }

    /// Diagnostic fingerprint of the current state: Blake2b over the sorted
    /// non-zero `(address, balance)` pairs, truncated to 32 bits. Stable
    /// across runs; not a cryptographic commitment.
    pub fn hash(&self) -> Result<i32, LedgerError> {
        let mut entries = Vec::new();
        for (account, _) in self.store.iter_heads()? {
            let balance = self.balance(&account, None)?;
            if balance > 0 {
                entries.push((account, balance));
            }
        }
        entries.sort();

        let mut buffer = Vec::with_capacity(entries.len() * 40);
        for (account, balance) in &entries {
            buffer.extend_from_slice(account.as_bytes());
            buffer.extend_from_slice(&balance.to_be_bytes());
        }
        let digest = blake2b_256(&buffer);
        Ok(i32::from_be_bytes([
            digest[0], digest[1], digest[2], digest[3],
        ]))
    }
}

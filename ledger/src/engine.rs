//! The state engine: block application, rollback, lifecycle.
//!
//! One engine owns one store for its lifetime. The two mutating operations
//! (`process_block`, `rollback_to`) take `&mut self`, so the single-writer
//! discipline is enforced by ownership; reads observe committed state only.
//! Every mutation is planned against the committed snapshot first and then
//! written through a single store batch, making commit the only publication
//! point.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use tally_store::{
    AccountState, ChangeRecord, MemoryStateStore, ReasonEntry, StateBatch, StateStore,
};
use tally_store_lmdb::{LmdbConfig, LmdbStateStore};
use tally_types::{Address, TxFingerprint};

use crate::block::Block;
use crate::error::{balance_corruption, chain_corruption, LedgerError};

/// On-disk schema version written by this engine.
pub const SCHEMA_VERSION: u32 = 1;

/// Entity counts for operator diagnostics.
#[derive(Clone, Debug)]
pub struct StateSummary {
    pub height: u32,
    pub accounts: u64,
    pub change_records: u64,
    pub inclusions: u64,
}

/// Persistent, rollback-capable account-balance state engine.
#[derive(Debug)]
pub struct StateEngine<S: StateStore> {
    pub(crate) store: S,
}

impl StateEngine<LmdbStateStore> {
    /// Open (or create) an engine over an LMDB store at `path`.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let store = LmdbStateStore::open(path, LmdbConfig::default())?;
        Self::new(store)
    }
}

impl StateEngine<MemoryStateStore> {
    /// Open an ephemeral engine holding all state in memory.
    pub fn in_memory() -> Result<Self, LedgerError> {
        Self::new(MemoryStateStore::new())
    }
}

impl<S: StateStore> StateEngine<S> {
    /// Wrap a store: discard any writes a crashed run left uncommitted, then
    /// check the schema handshake (a fresh store is stamped, a mismatched one
    /// is refused).
    pub fn new(store: S) -> Result<Self, LedgerError> {
        store.recover()?;
        match store.schema_version()? {
            0 => store.set_schema_version(SCHEMA_VERSION)?,
            v if v == SCHEMA_VERSION => {}
            v => {
                return Err(LedgerError::SchemaMismatch {
                    found: v,
                    expected: SCHEMA_VERSION,
                })
            }
        }
        Ok(Self { store })
    }

    /// Flush and release the store.
    pub fn close(self) -> Result<(), LedgerError> {
        self.store.sync()?;
        Ok(())
    }

    /// Current committed height (0 before genesis).
    pub fn state_height(&self) -> Result<u32, LedgerError> {
        Ok(self.store.height()?)
    }

    pub fn summary(&self) -> Result<StateSummary, LedgerError> {
        Ok(StateSummary {
            height: self.store.height()?,
            accounts: self.store.account_count()?,
            change_records: self.store.change_count()?,
            inclusions: self.store.inclusion_count()?,
        })
    }

    /// Apply a block as the next height.
    ///
    /// Fails without touching persisted state when a transaction is already
    /// included, a genesis seed appears past the genesis block, or any
    /// account would end up below zero. Well-formed blocks come out of
    /// [`validate`](Self::validate) and never trip the balance check.
    pub fn process_block(&mut self, block: &Block) -> Result<(), LedgerError> {
        let height = self.store.height()?;

        for tx in &block.transactions {
            let fingerprint = tx.fingerprint();
            if let Some(at) = self.store.inclusion(&fingerprint)? {
                return Err(LedgerError::DuplicateInclusion {
                    fingerprint,
                    height: at,
                });
            }
            if tx.is_genesis() && height > 0 {
                return Err(LedgerError::UnknownTransactionVariant { height });
            }
        }

        // Seed the working map with the fee distribution, then fold every
        // transaction delta on top. Reason lists grow by prepending, so they
        // read newest-first with the fee credit last.
        let mut working: HashMap<Address, (i64, Vec<ReasonEntry>)> = HashMap::new();
        for (account, fee) in block.consensus.fee_distribution(block) {
            let base = self.balance_bounded(&account, height)? as i64;
            let credited = i64::try_from(fee)
                .ok()
                .and_then(|fee| base.checked_add(fee))
                .ok_or_else(|| balance_corruption("fee credit overflows balance"))?;
            working.insert(account, (credited, vec![ReasonEntry::FeeCredit(fee)]));
        }

        for tx in &block.transactions {
            for (account, delta) in tx.balance_changes() {
                if !working.contains_key(&account) {
                    let base = self.balance_bounded(&account, height)? as i64;
                    working.insert(account, (base, Vec::new()));
                }
                if let Some((balance, reason)) = working.get_mut(&account) {
                    *balance = balance
                        .checked_add(delta)
                        .ok_or_else(|| balance_corruption("transaction delta overflows balance"))?;
                    reason.insert(0, ReasonEntry::Transaction(tx.clone()));
                }
            }
        }

        for (account, (balance, _)) in &working {
            if *balance < 0 {
                return Err(LedgerError::NegativeBalance {
                    account: *account,
                    balance: *balance,
                });
            }
        }

        let new_height = height
            .checked_add(1)
            .ok_or_else(|| balance_corruption("height marker overflow"))?;

        // Plan against the committed snapshot, then write one batch.
        let mut plan: Vec<(Address, ChangeRecord)> = Vec::with_capacity(working.len());
        for (account, (balance, reason)) in working {
            let prev_height = self.store.head(&account)?;
            plan.push((
                account,
                ChangeRecord {
                    state: AccountState::new(balance),
                    reason,
                    prev_height,
                },
            ));
        }

        let mut batch = self.store.begin()?;
        batch.set_height(new_height)?;
        for (account, record) in &plan {
            batch.put_change(account, new_height, record)?;
            batch.put_head(account, new_height)?;
            for tx in record.transactions() {
                batch.put_inclusion(&tx.fingerprint(), new_height)?;
            }
        }
        batch.commit()?;

        info!(
            height = new_height,
            transactions = block.transactions.len(),
            accounts = plan.len(),
            "block applied"
        );
        Ok(())
    }

    /// Revert the state to `target` height.
    ///
    /// Unwinds every account's chain past `target`, removing change records
    /// and the inclusion entries of the transactions they carry, then resets
    /// the height marker — all in one committed batch. Rolling back to the
    /// current height (or beyond) is a no-op.
    pub fn rollback_to(&mut self, target: u32) -> Result<(), LedgerError> {
        let current = self.store.height()?;
        if target >= current {
            return Ok(());
        }

        // Plan the unwind per account from the committed snapshot.
        struct Unwind {
            account: Address,
            new_head: u32,
            removals: Vec<(u32, Vec<TxFingerprint>)>,
        }

        let mut plan: Vec<Unwind> = Vec::new();
        for (account, head) in self.store.iter_heads()? {
            if head <= target {
                continue;
            }
            let mut removals = Vec::new();
            let mut h = head;
            while h > target {
                let record = self
                    .store
                    .change(&account, h)?
                    .ok_or_else(|| chain_corruption(&account, h))?;
                let fingerprints = record.transactions().map(|tx| tx.fingerprint()).collect();
                removals.push((h, fingerprints));
                h = record.prev_height;
            }
            plan.push(Unwind {
                account,
                new_head: h,
                removals,
            });
        }

        let mut batch = self.store.begin()?;
        for unwind in &plan {
            for (height, fingerprints) in &unwind.removals {
                batch.delete_change(&unwind.account, *height)?;
                for fingerprint in fingerprints {
                    batch.delete_inclusion(fingerprint)?;
                }
            }
            if unwind.new_head == 0 {
                batch.delete_head(&unwind.account)?;
            } else {
                batch.put_head(&unwind.account, unwind.new_head)?;
            }
        }
        batch.set_height(target)?;
        batch.commit()?;

        info!(from = current, to = target, accounts = plan.len(), "state rolled back");
        Ok(())
    }
}

//! In-memory storage backend.
//!
//! Backs engine unit tests and ephemeral engines. Batched operations are
//! staged in a vector and applied under the write lock on commit, so the
//! commit/discard contract matches the durable backends: a dropped batch
//! leaves no trace.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::record::ChangeRecord;
use crate::state::{StateBatch, StateStore};
use crate::StoreError;
use tally_types::{Address, TxFingerprint};

#[derive(Default, Debug)]
struct Tables {
    height: u32,
    schema_version: u32,
    heads: BTreeMap<Address, u32>,
    changes: BTreeMap<(Address, u32), ChangeRecord>,
    included: BTreeMap<TxFingerprint, u32>,
}

/// A `StateStore` held entirely in memory.
#[derive(Default, Debug)]
pub struct MemoryStateStore {
    tables: RwLock<Tables>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

enum Op {
    SetHeight(u32),
    PutHead(Address, u32),
    DeleteHead(Address),
    PutChange(Address, u32, ChangeRecord),
    DeleteChange(Address, u32),
    PutInclusion(TxFingerprint, u32),
    DeleteInclusion(TxFingerprint),
}

/// Staged write batch over a [`MemoryStateStore`].
pub struct MemoryStateBatch<'a> {
    store: &'a MemoryStateStore,
    ops: Vec<Op>,
}

impl StateStore for MemoryStateStore {
    type Batch<'a>
        = MemoryStateBatch<'a>
    where
        Self: 'a;

    fn recover(&self) -> Result<(), StoreError> {
        // Staged writes live only inside batches; there is nothing to drop.
        Ok(())
    }

    fn height(&self) -> Result<u32, StoreError> {
        Ok(self.read()?.height)
    }

    fn head(&self, account: &Address) -> Result<u32, StoreError> {
        Ok(self.read()?.heads.get(account).copied().unwrap_or(0))
    }

    fn change(&self, account: &Address, height: u32) -> Result<Option<ChangeRecord>, StoreError> {
        Ok(self.read()?.changes.get(&(*account, height)).cloned())
    }

    fn inclusion(&self, fingerprint: &TxFingerprint) -> Result<Option<u32>, StoreError> {
        Ok(self.read()?.included.get(fingerprint).copied())
    }

    fn iter_heads(&self) -> Result<Vec<(Address, u32)>, StoreError> {
        Ok(self
            .read()?
            .heads
            .iter()
            .map(|(addr, height)| (*addr, *height))
            .collect())
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.heads.len() as u64)
    }

    fn change_count(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.changes.len() as u64)
    }

    fn inclusion_count(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.included.len() as u64)
    }

    fn schema_version(&self) -> Result<u32, StoreError> {
        Ok(self.read()?.schema_version)
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))?
            .schema_version = version;
        Ok(())
    }

    fn begin(&self) -> Result<MemoryStateBatch<'_>, StoreError> {
        Ok(MemoryStateBatch {
            store: self,
            ops: Vec::new(),
        })
    }

    fn sync(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl StateBatch for MemoryStateBatch<'_> {
    fn set_height(&mut self, height: u32) -> Result<(), StoreError> {
        self.ops.push(Op::SetHeight(height));
        Ok(())
    }

    fn put_head(&mut self, account: &Address, height: u32) -> Result<(), StoreError> {
        self.ops.push(Op::PutHead(*account, height));
        Ok(())
    }

    fn delete_head(&mut self, account: &Address) -> Result<(), StoreError> {
        self.ops.push(Op::DeleteHead(*account));
        Ok(())
    }

    fn put_change(
        &mut self,
        account: &Address,
        height: u32,
        record: &ChangeRecord,
    ) -> Result<(), StoreError> {
        self.ops.push(Op::PutChange(*account, height, record.clone()));
        Ok(())
    }

    fn delete_change(&mut self, account: &Address, height: u32) -> Result<(), StoreError> {
        self.ops.push(Op::DeleteChange(*account, height));
        Ok(())
    }

    fn put_inclusion(
        &mut self,
        fingerprint: &TxFingerprint,
        height: u32,
    ) -> Result<(), StoreError> {
        self.ops.push(Op::PutInclusion(fingerprint.clone(), height));
        Ok(())
    }

    fn delete_inclusion(&mut self, fingerprint: &TxFingerprint) -> Result<(), StoreError> {
        self.ops.push(Op::DeleteInclusion(fingerprint.clone()));
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        let mut tables = self
            .store
            .tables
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))?;
        for op in self.ops {
            match op {
                Op::SetHeight(height) => tables.height = height,
                Op::PutHead(account, height) => {
                    tables.heads.insert(account, height);
                }
                Op::DeleteHead(account) => {
                    tables.heads.remove(&account);
                }
                Op::PutChange(account, height, record) => {
                    tables.changes.insert((account, height), record);
                }
                Op::DeleteChange(account, height) => {
                    tables.changes.remove(&(account, height));
                }
                Op::PutInclusion(fingerprint, height) => {
                    tables.included.insert(fingerprint, height);
                }
                Op::DeleteInclusion(fingerprint) => {
                    tables.included.remove(&fingerprint);
                }
            }
        }
        Ok(())
    }
}

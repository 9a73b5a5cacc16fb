//! Storage traits for the state engine.

use crate::record::ChangeRecord;
use crate::StoreError;
use tally_types::{Address, TxFingerprint};

/// Read side of the state store, plus the batch factory.
///
/// The store holds four logical maps inside one transactional backing file:
/// a singleton height marker, the per-account head pointers, the per-account
/// change chains keyed by height, and the transaction inclusion index.
/// Heights are `u32`; head 0 means "never touched".
pub trait StateStore {
    type Batch<'a>: StateBatch
    where
        Self: 'a;

    /// Drop any uncommitted writes left behind by a crashed run. Called once
    /// when an engine opens the store.
    fn recover(&self) -> Result<(), StoreError>;

    /// Current committed height marker (0 before genesis).
    fn height(&self) -> Result<u32, StoreError>;

    /// Height of the account's most recent change record, 0 if absent.
    fn head(&self, account: &Address) -> Result<u32, StoreError>;

    /// The change record written for `account` at `height`, if any.
    fn change(&self, account: &Address, height: u32) -> Result<Option<ChangeRecord>, StoreError>;

    /// Height at which the fingerprint was first included, if any.
    fn inclusion(&self, fingerprint: &TxFingerprint) -> Result<Option<u32>, StoreError>;

    /// All `(account, head height)` pairs — every account ever touched.
    fn iter_heads(&self) -> Result<Vec<(Address, u32)>, StoreError>;

    fn account_count(&self) -> Result<u64, StoreError>;
    fn change_count(&self) -> Result<u64, StoreError>;
    fn inclusion_count(&self) -> Result<u64, StoreError>;

    /// Stored schema version, 0 for a freshly created store.
    fn schema_version(&self) -> Result<u32, StoreError>;
    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;

    /// Begin a write batch. All mutation goes through batches; nothing is
    /// visible to readers (or survives a crash) until [`StateBatch::commit`].
    fn begin(&self) -> Result<Self::Batch<'_>, StoreError>;

    /// Flush buffered durability state to disk (graceful shutdown).
    fn sync(&self) -> Result<(), StoreError>;
}

/// Write side: buffered mutations published atomically by `commit`.
///
/// Dropping a batch without committing discards every operation in it.
pub trait StateBatch {
    fn set_height(&mut self, height: u32) -> Result<(), StoreError>;

    fn put_head(&mut self, account: &Address, height: u32) -> Result<(), StoreError>;
    fn delete_head(&mut self, account: &Address) -> Result<(), StoreError>;

    fn put_change(
        &mut self,
        account: &Address,
        height: u32,
        record: &ChangeRecord,
    ) -> Result<(), StoreError>;
    fn delete_change(&mut self, account: &Address, height: u32) -> Result<(), StoreError>;

    fn put_inclusion(&mut self, fingerprint: &TxFingerprint, height: u32)
        -> Result<(), StoreError>;
    fn delete_inclusion(&mut self, fingerprint: &TxFingerprint) -> Result<(), StoreError>;

    /// Atomically publish every buffered operation.
    fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;
}

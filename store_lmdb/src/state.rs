//! LMDB implementation of the state-store traits.
//!
//! The change chain uses composite keys `address(32) ++ height_be(4)`, so
//! a record lookup is a single exact `get` and the per-account chain is
//! ordered by height within the address prefix.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use tally_store::{ChangeRecord, StateBatch, StateStore, StoreError};
use tally_types::{Address, TxFingerprint};

use crate::environment::{LmdbConfig, LmdbEnvironment};
use crate::LmdbError;

const HEIGHT_KEY: &[u8] = b"height";
const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// State store backed by an LMDB environment.
pub struct LmdbStateStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    pub(crate) heads_db: Database<Bytes, Bytes>,
    pub(crate) changes_db: Database<Bytes, Bytes>,
    pub(crate) included_db: Database<Bytes, Bytes>,
}

impl LmdbStateStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &std::path::Path, config: LmdbConfig) -> Result<Self, StoreError> {
        let environment = LmdbEnvironment::open(path, config)?;
        Ok(environment.state_store())
    }
}

/// Build composite key `address ++ height_be`.
fn change_key(account: &Address, height: u32) -> [u8; 36] {
    let mut key = [0u8; 36];
    key[..32].copy_from_slice(account.as_bytes());
    key[32..].copy_from_slice(&height.to_be_bytes());
    key
}

fn decode_height(bytes: &[u8], what: &str) -> Result<u32, StoreError> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| StoreError::Corruption(format!("{what} has unexpected byte length")))?;
    Ok(u32::from_be_bytes(arr))
}

impl StateStore for LmdbStateStore {
    type Batch<'a>
        = LmdbStateBatch<'a>
    where
        Self: 'a;

    fn recover(&self) -> Result<(), StoreError> {
        // LMDB aborts unfinished write transactions on its own; a crashed run
        // leaves the last committed snapshot intact.
        Ok(())
    }

    fn height(&self) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self.meta_db.get(&rtxn, HEIGHT_KEY).map_err(LmdbError::from)? {
            Some(bytes) => decode_height(bytes, "height marker"),
            None => Ok(0),
        }
    }

    fn head(&self, account: &Address) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .heads_db
            .get(&rtxn, account.as_bytes().as_slice())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => decode_height(bytes, "head entry"),
            None => Ok(0),
        }
    }

    fn change(&self, account: &Address, height: u32) -> Result<Option<ChangeRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let key = change_key(account, height);
        match self.changes_db.get(&rtxn, &key).map_err(LmdbError::from)? {
            Some(bytes) => {
                let record = bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn inclusion(&self, fingerprint: &TxFingerprint) -> Result<Option<u32>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .included_db
            .get(&rtxn, fingerprint.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode_height(bytes, "inclusion entry")?)),
            None => Ok(None),
        }
    }

    fn iter_heads(&self) -> Result<Vec<(Address, u32)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.heads_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut heads = Vec::new();
        for result in iter {
            let (key, value) = result.map_err(LmdbError::from)?;
            let bytes: [u8; 32] = key
                .try_into()
                .map_err(|_| StoreError::Corruption("head key is not an address".into()))?;
            heads.push((Address::new(bytes), decode_height(value, "head entry")?));
        }
        Ok(heads)
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.heads_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    fn change_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.changes_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    fn inclusion_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.included_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    fn schema_version(&self) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .meta_db
            .get(&rtxn, SCHEMA_VERSION_KEY)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => decode_height(bytes, "schema version"),
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &version.to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn begin(&self) -> Result<LmdbStateBatch<'_>, StoreError> {
        let txn = self.env.write_txn().map_err(LmdbError::from)?;
        Ok(LmdbStateBatch { txn, store: self })
    }

    fn sync(&self) -> Result<(), StoreError> {
        // A committed empty write transaction flushes dirty pages.
        let wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

/// A write batch over the four maps inside one LMDB write transaction.
///
/// Commit is the only fsync; dropping the batch aborts the transaction and
/// discards every buffered operation.
pub struct LmdbStateBatch<'a> {
    txn: RwTxn<'a>,
    store: &'a LmdbStateStore,
}

impl StateBatch for LmdbStateBatch<'_> {
    fn set_height(&mut self, height: u32) -> Result<(), StoreError> {
        self.store
            .meta_db
            .put(&mut self.txn, HEIGHT_KEY, &height.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_head(&mut self, account: &Address, height: u32) -> Result<(), StoreError> {
        self.store
            .heads_db
            .put(&mut self.txn, account.as_bytes(), &height.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_head(&mut self, account: &Address) -> Result<(), StoreError> {
        self.store
            .heads_db
            .delete(&mut self.txn, account.as_bytes().as_slice())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_change(
        &mut self,
        account: &Address,
        height: u32,
        record: &ChangeRecord,
    ) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        let key = change_key(account, height);
        self.store
            .changes_db
            .put(&mut self.txn, &key, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_change(&mut self, account: &Address, height: u32) -> Result<(), StoreError> {
        let key = change_key(account, height);
        self.store
            .changes_db
            .delete(&mut self.txn, &key)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_inclusion(
        &mut self,
        fingerprint: &TxFingerprint,
        height: u32,
    ) -> Result<(), StoreError> {
        self.store
            .included_db
            .put(&mut self.txn, fingerprint.as_bytes(), &height.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_inclusion(&mut self, fingerprint: &TxFingerprint) -> Result<(), StoreError> {
        self.store
            .included_db
            .delete(&mut self.txn, fingerprint.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::state::LmdbStateStore;
use crate::LmdbError;

/// Tunables for opening an LMDB environment.
#[derive(Clone, Copy, Debug)]
pub struct LmdbConfig {
    /// Maximum size of the memory map, in bytes.
    pub map_size: usize,
    /// Maximum number of named databases.
    pub max_dbs: u32,
}

impl Default for LmdbConfig {
    fn default() -> Self {
        Self {
            map_size: 1024 * 1024 * 1024,
            max_dbs: 8,
        }
    }
}

/// Wraps the LMDB environment and the database handles for the four maps.
pub struct LmdbEnvironment {
    env: Arc<Env>,

    /// Height marker and schema version.
    pub(crate) meta_db: Database<Bytes, Bytes>,
    /// `address(32)` → last change height.
    pub(crate) heads_db: Database<Bytes, Bytes>,
    /// `address(32) ++ height_be(4)` → serialized change record.
    pub(crate) changes_db: Database<Bytes, Bytes>,
    /// `fingerprint bytes` → inclusion height.
    pub(crate) included_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, config: LmdbConfig) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)
            .map_err(|e| LmdbError::Heed(format!("failed to create directory: {e}")))?;

        let env = unsafe {
            EnvOpenOptions::new()
                .max_dbs(config.max_dbs)
                .map_size(config.map_size)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        let heads_db = env.create_database(&mut wtxn, Some("heads"))?;
        let changes_db = env.create_database(&mut wtxn, Some("changes"))?;
        let included_db = env.create_database(&mut wtxn, Some("included"))?;
        wtxn.commit()?;

        Ok(Self {
            env: Arc::new(env),
            meta_db,
            heads_db,
            changes_db,
            included_db,
        })
    }

    /// Get a shared reference to the underlying heed environment.
    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Create the state store backed by this environment.
    pub fn state_store(&self) -> LmdbStateStore {
        LmdbStateStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
            heads_db: self.heads_db,
            changes_db: self.changes_db,
            included_db: self.included_db,
        }
    }

    /// Force an `fsync` of the LMDB memory-mapped file to disk.
    ///
    /// LMDB ensures durability on every write-transaction commit; this is an
    /// extra safety measure during graceful shutdown, making sure the OS has
    /// flushed all dirty pages before the process exits.
    pub fn force_sync(&self) -> Result<(), LmdbError> {
        let wtxn = self.env.write_txn()?;
        wtxn.commit()?;
        Ok(())
    }
}

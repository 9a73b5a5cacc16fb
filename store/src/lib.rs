//! Abstract storage layer for the tally state engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements the
//! [`StateStore`] and [`StateBatch`] traits. The engine depends only on the
//! traits; commit is the single durable publication point and a dropped
//! batch discards every buffered write.

pub mod error;
pub mod memory;
pub mod record;
pub mod state;

pub use error::StoreError;
pub use memory::MemoryStateStore;
pub use record::{AccountState, ChangeRecord, ReasonEntry};
pub use state::{StateBatch, StateStore};

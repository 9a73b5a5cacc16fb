//! Fundamental types for the tally state engine.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: account addresses, transaction fingerprints, block hashes,
//! key material, and timestamps.

pub mod address;
pub mod fingerprint;
pub mod hash;
pub mod keys;
pub mod time;

pub use address::Address;
pub use fingerprint::TxFingerprint;
pub use hash::BlockHash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use time::Timestamp;

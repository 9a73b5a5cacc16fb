//! Cryptographic primitives for the tally state engine.
//!
//! Blake2b-256 hashing, Ed25519 signing and verification, and account
//! address derivation. Everything here is deterministic given its inputs;
//! the only source of randomness is `generate_keypair`.

pub mod address;
pub mod keys;
pub mod primitives;

pub use address::address_from_public_key;
pub use keys::{generate_keypair, keypair_from_seed};
pub use primitives::{blake2b_256, blake2b_256_multi, sign_message, verify_signature};

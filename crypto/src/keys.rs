//! Ed25519 key pair construction.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tally_types::{KeyPair, PrivateKey, PublicKey};

/// Generate a fresh random key pair from the operating system RNG.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    keypair_from_signing_key(signing_key)
}

/// Derive a key pair deterministically from a 32-byte seed.
///
/// Used by tests and reproducible fixtures; the seed is the Ed25519 secret
/// scalar directly.
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair_from_signing_key(SigningKey::from_bytes(seed))
}

fn keypair_from_signing_key(signing_key: SigningKey) -> KeyPair {
    let public = PublicKey(signing_key.verifying_key().to_bytes());
    let private = PrivateKey(signing_key.to_bytes());
    KeyPair { public, private }
}

//! Hashing and signing primitives.
//!
//! Blake2b-256 is the digest behind every derived identifier in tally:
//! genesis transaction fingerprints, account addresses, and the engine's
//! diagnostic state hash. Ed25519 backs payment authorship, where the
//! signature doubles as the transaction's fingerprint — so a signature that
//! fails to verify also means the fingerprint cannot be trusted.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

use tally_types::{PrivateKey, PublicKey, Signature};

type Blake2b256 = Blake2b<U32>;

/// 256-bit Blake2b digest of a single byte slice.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Digest several byte slices as one message.
///
/// Equivalent to hashing their concatenation, without allocating it.
/// Fingerprint and address derivation feed their fixed-width fields through
/// this to avoid building intermediate buffers.
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Sign `message` with an Ed25519 private key.
///
/// Ed25519 signing is deterministic: the same key and message always yield
/// the same signature, which is what lets a payment's signature serve as a
/// stable fingerprint.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signature = SigningKey::from_bytes(&private_key.0).sign(message);
    Signature(signature.to_bytes())
}

/// Check an Ed25519 signature over `message`.
///
/// Returns `false` both for forged signatures and for public keys that do
/// not decode to a curve point.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    match VerifyingKey::from_bytes(&public_key.0) {
        Ok(key) => {
            let signature = ed25519_dalek::Signature::from_bytes(&signature.0);
            key.verify(message, &signature).is_ok()
        }
        Err(_) => false,
    }
}

//! Account address derivation.

use crate::primitives::blake2b_256;
use tally_types::{Address, PublicKey};

/// Derive the account address for a public key: Blake2b-256 of the key bytes.
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    Address::new(blake2b_256(public_key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    #[test]
    fn derivation_is_deterministic() {
        let kp = keypair_from_seed(&[7u8; 32]);
        let a1 = address_from_public_key(&kp.public);
        let a2 = address_from_public_key(&kp.public);
        assert_eq!(a1, a2);
        assert!(a1.is_valid());
    }

    #[test]
    fn different_keys_different_addresses() {
        let kp1 = keypair_from_seed(&[1u8; 32]);
        let kp2 = keypair_from_seed(&[2u8; 32]);
        assert_ne!(
            address_from_public_key(&kp1.public),
            address_from_public_key(&kp2.public)
        );
    }
}

//! Account address type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque 32-byte account identifier.
///
/// Derived from the account's public key via Blake2b hashing. Equality and
/// ordering are plain byte comparison; the ordering is what lets addresses
/// key the ordered maps in the store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    /// The all-zero address. Never a valid account.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Validate that this address is well-formed.
    pub fn is_valid(&self) -> bool {
        !self.is_zero()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(")?;
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address_is_invalid() {
        assert!(!Address::ZERO.is_valid());
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn nonzero_address_is_valid() {
        let addr = Address::new([7u8; 32]);
        assert!(addr.is_valid());
    }

    #[test]
    fn ordering_is_byte_ordering() {
        let a = Address::new([1u8; 32]);
        let b = Address::new([2u8; 32]);
        assert!(a < b);
    }

    #[test]
    fn display_is_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xAB;
        let addr = Address::new(bytes);
        assert!(addr.to_string().starts_with("ab00"));
        assert_eq!(addr.to_string().len(), 64);
    }
}

//! Transaction fingerprint type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque byte string uniquely identifying a transaction.
///
/// For a signed payment this is the 64-byte signature; for a genesis seed it
/// is the 32-byte content hash. The store treats it as a raw key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxFingerprint(Vec<u8>);

impl TxFingerprint {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for TxFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxFingerprint(")?;
        for b in self.0.iter().take(4) {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for TxFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

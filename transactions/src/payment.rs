//! Payment transaction: transfer value between accounts, paying a fee.

use serde::{Deserialize, Serialize};
use tally_crypto::{address_from_public_key, sign_message, verify_signature};
use tally_types::{Address, KeyPair, PublicKey, Signature, Timestamp, TxFingerprint};

/// A signed value transfer.
///
/// The sender's balance drops by `amount + fee`; the recipient's rises by
/// `amount`. Fees are credited elsewhere by the block's fee distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTx {
    pub sender: Address,
    pub sender_key: PublicKey,
    pub recipient: Address,
    pub amount: u64,
    pub fee: u64,
    pub timestamp: Timestamp,
    pub signature: Signature,
}

impl PaymentTx {
    /// Build and sign a payment from a key pair. The sender address is
    /// derived from the public key, so the result is authorship-correct by
    /// construction.
    pub fn create(
        keypair: &KeyPair,
        recipient: Address,
        amount: u64,
        fee: u64,
        timestamp: Timestamp,
    ) -> Self {
        let sender = address_from_public_key(&keypair.public);
        let payload = signing_payload(&keypair.public, &recipient, amount, fee, timestamp);
        let signature = sign_message(&payload, &keypair.private);
        Self {
            sender,
            sender_key: keypair.public.clone(),
            recipient,
            amount,
            fee,
            timestamp,
            signature,
        }
    }

    /// The signature doubles as the unique fingerprint.
    pub fn fingerprint(&self) -> TxFingerprint {
        TxFingerprint::new(self.signature.as_bytes().to_vec())
    }

    pub fn balance_changes(&self) -> Vec<(Address, i64)> {
        let amount = i64::try_from(self.amount).unwrap_or(i64::MAX);
        let outflow = self
            .amount
            .checked_add(self.fee)
            .and_then(|total| i64::try_from(total).ok())
            .unwrap_or(i64::MAX);
        vec![(self.sender, -outflow), (self.recipient, amount)]
    }

    /// Verify that the signature covers this payment's content and that the
    /// claimed sender address matches the signing key.
    pub fn authorship_ok(&self) -> bool {
        if address_from_public_key(&self.sender_key) != self.sender {
            return false;
        }
        let payload = signing_payload(
            &self.sender_key,
            &self.recipient,
            self.amount,
            self.fee,
            self.timestamp,
        );
        verify_signature(&payload, &self.signature, &self.sender_key)
    }
}

/// Canonical byte payload covered by the payment signature.
fn signing_payload(
    sender_key: &PublicKey,
    recipient: &Address,
    amount: u64,
    fee: u64,
    timestamp: Timestamp,
) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(32 + 32 + 8 + 8 + 8);
    buffer.extend_from_slice(sender_key.as_bytes());
    buffer.extend_from_slice(recipient.as_bytes());
    buffer.extend_from_slice(&amount.to_be_bytes());
    buffer.extend_from_slice(&fee.to_be_bytes());
    buffer.extend_from_slice(&timestamp.as_secs().to_be_bytes());
    buffer
}

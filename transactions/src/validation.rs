//! Stateless transaction validation.
//!
//! Only addresses and amount representability are checked here. Stateful
//! checks (spendable balance, double inclusion) are the ledger's job.

use crate::genesis::GenesisTx;
use crate::payment::PaymentTx;

/// Result of static validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationResult {
    Ok,
    /// An involved address is the zero address.
    InvalidAddress,
    /// The amount cannot be represented as a signed 64-bit balance delta.
    NegativeAmount,
    /// The fee (or amount + fee) cannot be represented as a signed delta.
    NegativeFee,
    /// Insufficient spendable balance. Never produced by static validation;
    /// reserved for stateful checks made by outer layers.
    NoBalance,
}

/// Largest value representable as a signed balance delta.
const MAX_DELTA: u64 = i64::MAX as u64;

pub fn validate_genesis(tx: &GenesisTx) -> ValidationResult {
    if !tx.recipient.is_valid() {
        return ValidationResult::InvalidAddress;
    }
    if tx.amount > MAX_DELTA {
        return ValidationResult::NegativeAmount;
    }
    ValidationResult::Ok
}

pub fn validate_payment(tx: &PaymentTx) -> ValidationResult {
    if !tx.sender.is_valid() || !tx.recipient.is_valid() {
        return ValidationResult::InvalidAddress;
    }
    if tx.amount > MAX_DELTA {
        return ValidationResult::NegativeAmount;
    }
    match tx.amount.checked_add(tx.fee) {
        Some(total) if total <= MAX_DELTA => ValidationResult::Ok,
        _ => ValidationResult::NegativeFee,
    }
}

//! Block container and the consensus seam.
//!
//! The engine sees a block as an ordered list of transactions plus the
//! consensus module that decides who collects the block's fees. Nothing else
//! about consensus leaks in.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tally_transactions::Transaction;
use tally_types::{Address, BlockHash};

/// Produces the fee distribution for a block.
///
/// Must be a pure function of the block: the same block always yields the
/// same distribution, otherwise replaying history would diverge.
pub trait ConsensusModule: Send + Sync {
    fn fee_distribution(&self, block: &Block) -> HashMap<Address, u64>;
}

/// An ordered batch of transactions to apply as one height.
#[derive(Clone)]
pub struct Block {
    /// Hash of the parent block, kept by the enclosing block storage.
    pub reference: BlockHash,
    pub transactions: Vec<Transaction>,
    pub consensus: Arc<dyn ConsensusModule>,
}

impl Block {
    pub fn new(
        reference: BlockHash,
        transactions: Vec<Transaction>,
        consensus: Arc<dyn ConsensusModule>,
    ) -> Self {
        Self {
            reference,
            transactions,
            consensus,
        }
    }

    /// Sum of the fees carried by this block's payments.
    pub fn total_fees(&self) -> u64 {
        self.transactions
            .iter()
            .filter_map(|tx| match tx {
                Transaction::Payment(payment) => Some(payment.fee),
                Transaction::Genesis(_) => None,
            })
            .fold(0u64, |total, fee| total.saturating_add(fee))
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("reference", &self.reference)
            .field("transactions", &self.transactions.len())
            .finish()
    }
}

/// Fee policy crediting a block's entire fee take to one collector account
/// (typically the block producer).
pub struct FeeCollector {
    pub collector: Address,
}

impl ConsensusModule for FeeCollector {
    fn fee_distribution(&self, block: &Block) -> HashMap<Address, u64> {
        let total = block.total_fees();
        if total == 0 {
            return HashMap::new();
        }
        HashMap::from([(self.collector, total)])
    }
}

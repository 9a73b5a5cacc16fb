//! Shared fixtures for the engine test modules.

use std::collections::HashMap;
use std::sync::Arc;

use tally_crypto::{address_from_public_key, keypair_from_seed};
use tally_store::MemoryStateStore;
use tally_transactions::{GenesisTx, PaymentTx, Transaction};
use tally_types::{Address, BlockHash, KeyPair, Timestamp};

use crate::block::{Block, ConsensusModule};
use crate::engine::StateEngine;

pub fn keypair(n: u8) -> KeyPair {
    keypair_from_seed(&[n; 32])
}

/// The address owned by `keypair(n)`.
pub fn address(n: u8) -> Address {
    address_from_public_key(&keypair(n).public)
}

/// Fee policy crediting each payment's fee back to its sender. Keeps the
/// system closed without introducing a block producer account.
pub struct SenderFees;

impl ConsensusModule for SenderFees {
    fn fee_distribution(&self, block: &Block) -> HashMap<Address, u64> {
        let mut distribution: HashMap<Address, u64> = HashMap::new();
        for tx in &block.transactions {
            if let Transaction::Payment(payment) = tx {
                *distribution.entry(payment.sender).or_insert(0) += payment.fee;
            }
        }
        distribution.retain(|_, fee| *fee > 0);
        distribution
    }
}

pub fn genesis_block(seeds: &[(Address, u64)]) -> Block {
    let transactions = seeds
        .iter()
        .map(|(recipient, amount)| {
            Transaction::Genesis(GenesisTx::new(*recipient, *amount, Timestamp::EPOCH))
        })
        .collect();
    Block::new(BlockHash::ZERO, transactions, Arc::new(SenderFees))
}

/// A payment signed by `keypair(sender_seed)`. Distinct timestamps keep
/// fingerprints distinct for otherwise identical payments.
pub fn payment(sender_seed: u8, recipient: Address, amount: u64, fee: u64, timestamp: u64) -> Transaction {
    Transaction::Payment(PaymentTx::create(
        &keypair(sender_seed),
        recipient,
        amount,
        fee,
        Timestamp::new(timestamp),
    ))
}

pub fn payment_block(transactions: Vec<Transaction>) -> Block {
    Block::new(BlockHash::new([1u8; 32]), transactions, Arc::new(SenderFees))
}

/// An in-memory engine seeded with `accounts` accounts holding `amount` each
/// (addresses `address(0)..address(accounts)`).
pub fn seeded_engine(accounts: u8, amount: u64) -> StateEngine<MemoryStateStore> {
    let mut engine = StateEngine::in_memory().expect("in-memory engine");
    let seeds: Vec<(Address, u64)> = (0..accounts).map(|i| (address(i), amount)).collect();
    engine.process_block(&genesis_block(&seeds)).expect("genesis block");
    engine
}

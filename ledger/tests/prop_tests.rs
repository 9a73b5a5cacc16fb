use proptest::prelude::*;

use std::collections::HashMap;
use std::sync::Arc;

use tally_crypto::{address_from_public_key, keypair_from_seed};
use tally_ledger::{Block, ConsensusModule, LedgerError, StateEngine};
use tally_store::MemoryStateStore;
use tally_transactions::{GenesisTx, PaymentTx, Transaction};
use tally_types::{Address, BlockHash, Timestamp};

const ACCOUNTS: u8 = 4;
const SEED_BALANCE: u64 = 10_000;

fn address(n: u8) -> Address {
    address_from_public_key(&keypair_from_seed(&[n; 32]).public)
}

/// Credits each payment's fee back to its sender, keeping the system closed.
struct SenderFees;

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

fn payment(sender: u8, recipient: u8, amount: u64, fee: u64, timestamp: u64) -> Transaction {
    Transaction::Payment(PaymentTx::create(
        &keypair_from_seed(&[sender; 32]),
        address(recipient),
        amount,
        fee,
        Timestamp::new(timestamp),
    ))
}

fn block(transactions: Vec<Transaction>) -> Block {
    Block::new(BlockHash::new([1u8; 32]), transactions, Arc::new(SenderFees))
}

fn seeded_engine() -> StateEngine<MemoryStateStore> {
    let mut engine = StateEngine::in_memory().expect("engine");
    let seeds = (0..ACCOUNTS)
        .map(|i| {
            Transaction::Genesis(GenesisTx::new(address(i), SEED_BALANCE, Timestamp::EPOCH))
        })
        .collect();
    engine
        .process_block(&Block::new(BlockHash::ZERO, seeds, Arc::new(SenderFees)))
        .expect("genesis");
    engine
}

/// `(sender, recipient, amount, fee)` specs; timestamps are assigned from a
/// running counter so every generated payment has a distinct fingerprint.
fn payment_specs(max_len: usize) -> impl Strategy<Value = Vec<(u8, u8, u64, u64)>> {
    prop::collection::vec(
        (0..ACCOUNTS, 0..ACCOUNTS, 0u64..3_000, 0u64..50),
        0..max_len,
    )
}

fn build_payments(specs: &[(u8, u8, u64, u64)], timestamp_base: u64) -> Vec<Transaction> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (sender, recipient, amount, fee))| {
            payment(*sender, *recipient, *amount, *fee, timestamp_base + i as u64)
        })
        .collect()
}

proptest! {
    /// Conservation: fees are redistributed inside each block, so the total
    /// supply never moves after genesis.
    #[test]
    fn conservation_across_validated_blocks(
        specs1 in payment_specs(12),
        specs2 in payment_specs(12),
    ) {
        let mut engine = seeded_engine();
        prop_assert_eq!(engine.total_balance().unwrap(), ACCOUNTS as u64 * SEED_BALANCE);

        for (round, specs) in [specs1, specs2].iter().enumerate() {
            let candidates = build_payments(specs, 1 + round as u64 * 1000);
            let valid = engine.validate(&candidates, None).unwrap();
            engine.process_block(&block(valid)).unwrap();
            prop_assert_eq!(engine.total_balance().unwrap(), ACCOUNTS as u64 * SEED_BALANCE);
        }
    }

    /// The validated subset always applies cleanly as a block.
    #[test]
    fn validated_set_is_applicable(specs in payment_specs(16)) {
        let mut engine = seeded_engine();
        let candidates = build_payments(&specs, 1);
        let valid = engine.validate(&candidates, None).unwrap();
        prop_assert!(engine.process_block(&block(valid)).is_ok());
    }

    /// Validation is converged: running the validator over its own output
    /// changes nothing.
    #[test]
    fn validation_is_a_fixed_point(specs in payment_specs(16)) {
        let engine = seeded_engine();
        let candidates = build_payments(&specs, 1);
        let valid = engine.validate(&candidates, None).unwrap();
        let revalidated = engine.validate(&valid, None).unwrap();
        prop_assert_eq!(valid, revalidated);
    }

    /// Rollback is a left-inverse of block application: balances, inclusion,
    /// height, and the diagnostic hash all return to their prior values.
    #[test]
    fn rollback_undoes_application(
        specs1 in payment_specs(10),
        specs2 in payment_specs(10),
    ) {
        let mut engine = seeded_engine();
        let first = engine.validate(&build_payments(&specs1, 1), None).unwrap();
        engine.process_block(&block(first)).unwrap();

        let height_before = engine.state_height().unwrap();
        let hash_before = engine.hash().unwrap();
        let balances_before: Vec<u64> = (0..ACCOUNTS)
            .map(|i| engine.balance(&address(i), None).unwrap())
            .collect();

        let second = engine.validate(&build_payments(&specs2, 1000), None).unwrap();
        let fingerprints: Vec<_> = second.iter().map(|tx| tx.fingerprint()).collect();
        engine.process_block(&block(second)).unwrap();

        engine.rollback_to(height_before).unwrap();

        prop_assert_eq!(engine.state_height().unwrap(), height_before);
        prop_assert_eq!(engine.hash().unwrap(), hash_before);
        for (i, expected) in balances_before.iter().enumerate() {
            prop_assert_eq!(engine.balance(&address(i as u8), None).unwrap(), *expected);
        }
        for fingerprint in &fingerprints {
            prop_assert_eq!(engine.included(fingerprint, None).unwrap(), None);
        }
    }

    /// Rolling back twice to the same height equals rolling back once.
    #[test]
    fn rollback_is_idempotent(specs in payment_specs(10), target in 0u32..3) {
        let mut engine = seeded_engine();
        let valid = engine.validate(&build_payments(&specs, 1), None).unwrap();
        engine.process_block(&block(valid)).unwrap();

        engine.rollback_to(target).unwrap();
        let hash_once = engine.hash().unwrap();
        let height_once = engine.state_height().unwrap();

        engine.rollback_to(target).unwrap();
        prop_assert_eq!(engine.hash().unwrap(), hash_once);
        prop_assert_eq!(engine.state_height().unwrap(), height_once);
    }

    /// No committed operation leaves a negative balance behind: every
    /// point-in-time read succeeds (the read path fails loudly on a
    /// persisted negative).
    #[test]
    fn no_negative_balance_is_ever_persisted(specs in payment_specs(14)) {
        let mut engine = seeded_engine();
        let valid = engine.validate(&build_payments(&specs, 1), None).unwrap();
        engine.process_block(&block(valid)).unwrap();

        let height = engine.state_height().unwrap();
        for i in 0..ACCOUNTS {
            for h in 1..=height {
                prop_assert!(engine.balance(&address(i), Some(h)).is_ok());
            }
        }
    }

    /// A fingerprint already in the index always rejects the carrying block.
    #[test]
    fn double_include_always_rejected(
        sender in 0..ACCOUNTS,
        recipient in 0..ACCOUNTS,
        amount in 1u64..1_000,
        fee in 0u64..50,
    ) {
        let mut engine = seeded_engine();
        let tx = payment(sender, recipient, amount, fee, 1);
        engine.process_block(&block(vec![tx.clone()])).unwrap();

        let replay = engine.process_block(&block(vec![tx]));
        prop_assert!(
            matches!(replay, Err(LedgerError::DuplicateInclusion { .. })),
            "expected DuplicateInclusion error"
        );
    }
}

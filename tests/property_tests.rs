//! Property-based tests for the ledger core
//!
//! These tests check that the chain invariants hold under random inputs.

use proptest::prelude::*;
use pow_ledger::blockchain::pow::{self, ProofSearch};
use pow_ledger::blockchain::{Amount, Block, Ledger, Transaction};

fn amount_strategy() -> impl Strategy<Value = Amount> {
    prop_oneof![
        any::<i64>().prop_map(Amount::Integer),
        ((i64::MAX as u64 + 1)..=u64::MAX).prop_map(Amount::Unsigned),
        (-1.0e12f64..1.0e12f64).prop_map(Amount::Decimal),
    ]
}

fn transaction_strategy() -> impl Strategy<Value = Transaction> {
    (".{0,12}", ".{0,12}", amount_strategy())
        .prop_map(|(sender, recipient, amount)| Transaction::new(sender, recipient, amount))
}

fn block_strategy() -> impl Strategy<Value = Block> {
    (
        1u64..1_000_000u64,
        0.0f64..4.0e9f64,
        prop::collection::vec(transaction_strategy(), 0..6),
        any::<u64>(),
        "[0-9a-f]{64}",
    )
        .prop_map(|(index, timestamp, transactions, proof, previous_hash)| Block {
            index,
            timestamp,
            transactions,
            proof,
            previous_hash,
        })
}

fn genesis_ledger() -> Ledger {
    let ledger = Ledger::new();
    ledger
        .create_block(pow::GENESIS_PROOF, Some("1".to_string()))
        .unwrap();
    ledger
}

proptest! {
    /// Equal blocks hash identically, however often they are hashed
    #[test]
    fn prop_hash_deterministic(block in block_strategy()) {
        let rebuilt = Block {
            index: block.index,
            timestamp: block.timestamp,
            transactions: block.transactions.clone(),
            proof: block.proof,
            previous_hash: block.previous_hash.clone(),
        };

        let hash = block.canonical_hash().unwrap();
        prop_assert_eq!(hash.len(), 64);
        prop_assert_eq!(&hash, &block.canonical_hash().unwrap());
        prop_assert_eq!(&hash, &rebuilt.canonical_hash().unwrap());
    }

    /// The committed batch is exactly what was submitted, in order
    #[test]
    fn prop_batch_clear_atomicity(
        transactions in prop::collection::vec(transaction_strategy(), 0..20),
        proof in any::<u64>()
    ) {
        let ledger = genesis_ledger();
        for transaction in &transactions {
            prop_assert_eq!(ledger.add_transaction(transaction.clone()).unwrap(), 2);
        }

        let block = ledger.create_block(proof, None).unwrap();

        prop_assert_eq!(&block.transactions, &transactions);
        prop_assert!(ledger.pending_transactions().is_empty());
    }

    /// Indices are contiguous from 1 and every block links to its predecessor
    #[test]
    fn prop_index_and_linkage(
        proofs in prop::collection::vec(any::<u64>(), 1..12),
        batch in prop::collection::vec(transaction_strategy(), 0..4)
    ) {
        let ledger = genesis_ledger();
        for proof in &proofs {
            for transaction in &batch {
                ledger.add_transaction(transaction.clone()).unwrap();
            }
            ledger.create_block(*proof, None).unwrap();
        }

        let chain = ledger.chain();
        prop_assert_eq!(chain.len(), proofs.len() + 1);
        for (position, block) in chain.iter().enumerate() {
            prop_assert_eq!(block.index, position as u64 + 1);
        }
        for pair in chain.windows(2) {
            prop_assert_eq!(&pair[1].previous_hash, &pair[0].canonical_hash().unwrap());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    /// The search result verifies and nothing smaller does
    #[test]
    fn prop_search_minimal(previous_proof in 0u64..1_000_000u64) {
        let proof = pow::search(previous_proof);

        prop_assert!(pow::verify(previous_proof, proof));
        prop_assert!(pow::puzzle_digest(previous_proof, proof).starts_with("0000"));
        prop_assert!((0..proof).all(|candidate| !pow::verify(previous_proof, candidate)));
    }

    /// Parallel search agrees with the sequential one
    #[test]
    fn prop_parallel_search_agrees(previous_proof in any::<u64>(), workers in 2usize..5) {
        let parallel = ProofSearch::new().with_workers(workers).run(previous_proof).unwrap();

        prop_assert_eq!(parallel, pow::search(previous_proof));
    }
}

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use thiserror::Error;

use super::block::Block;
use super::canonical::SerializationError;
use super::pow::{self, PowError, ProofSearch};
use super::transaction::{Amount, Transaction};

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("The chain has no blocks yet; create the genesis block first")]
    EmptyChain,

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Proof of work error: {0}")]
    ProofOfWork(#[from] PowError),

    #[error("Invalid chain at block {index}: {reason}")]
    InvalidChain { index: u64, reason: String },
}

#[derive(Debug, Default)]
struct LedgerState {
    /// The chain of committed blocks
    chain: Vec<Block>,

    /// Transactions waiting for the next block
    pending_transactions: Vec<Transaction>,
}

impl LedgerState {
    fn tip(&self) -> Result<&Block, LedgerError> {
        self.chain.last().ok_or(LedgerError::EmptyChain)
    }

    /// Seals the pending batch into a new block and appends it.
    ///
    /// The block is hashed before anything changes, so a failure leaves both
    /// the chain and the pending batch as they were.
    fn commit(&mut self, proof: u64, previous_hash: Option<String>) -> Result<Block, LedgerError> {
        let previous_hash = match previous_hash {
            Some(hash) => hash,
            None => self.tip()?.canonical_hash()?,
        };

        let block = Block::new(
            self.chain.len() as u64 + 1,
            self.pending_transactions.clone(),
            proof,
            previous_hash,
        );
        block.canonical_hash()?;

        self.pending_transactions.clear();
        self.chain.push(block.clone());

        Ok(block)
    }
}

/// Handle to an append-only ledger
///
/// Clones share the same chain. A single lock guards both the chain and the
/// pending batch, so sealing a batch and appending its block is atomic with
/// respect to concurrent submissions.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    state: Arc<Mutex<LedgerState>>,
}

impl Ledger {
    /// Creates an empty ledger. No genesis block is created.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts a chain handed over by a loader or a peer
    ///
    /// # Arguments
    ///
    /// * `blocks` - The blocks to adopt, genesis first
    ///
    /// # Returns
    ///
    /// A ledger holding `blocks` with an empty pending batch, or
    /// `InvalidChain` naming the first block that fails validation
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, LedgerError> {
        validate_chain(&blocks)?;
        info!("Adopted chain of {} blocks", blocks.len());

        Ok(Ledger {
            state: Arc::new(Mutex::new(LedgerState {
                chain: blocks,
                pending_transactions: Vec::new(),
            })),
        })
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        // State is never left half-updated, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a new transaction to the pending batch
    ///
    /// # Arguments
    ///
    /// * `sender` - Address of the sender
    /// * `recipient` - Address of the recipient
    /// * `amount` - Amount to transfer
    ///
    /// # Returns
    ///
    /// The index of the block that will hold this transaction, or
    /// `EmptyChain` if there is no block to build on yet
    pub fn submit_transaction(
        &self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<Amount>,
    ) -> Result<u64, LedgerError> {
        self.add_transaction(Transaction::new(sender, recipient, amount))
    }

    /// Adds an already built transaction to the pending batch
    pub fn add_transaction(&self, transaction: Transaction) -> Result<u64, LedgerError> {
        let mut state = self.state();
        let next_index = state.tip()?.index + 1;

        debug!(
            "Queued transaction {} -> {} ({}) for block {}",
            transaction.sender, transaction.recipient, transaction.amount, next_index
        );
        state.pending_transactions.push(transaction);

        Ok(next_index)
    }

    /// Seals the pending batch into a new block
    ///
    /// # Arguments
    ///
    /// * `proof` - The proof of work for the new block
    /// * `previous_hash` - Hash to link to; defaults to the tip's canonical hash
    ///   and is required for the genesis block
    ///
    /// # Returns
    ///
    /// The committed block. On error the pending batch is left untouched.
    pub fn create_block(&self, proof: u64, previous_hash: Option<String>) -> Result<Block, LedgerError> {
        let block = self.state().commit(proof, previous_hash)?;
        info!(
            "Committed block {} with {} transaction(s)",
            block.index,
            block.transactions.len()
        );
        Ok(block)
    }

    /// Searches a proof for the next block and commits it
    ///
    /// The search runs without holding the lock. If another block lands in
    /// the meantime the search is repeated against the new tip.
    ///
    /// # Arguments
    ///
    /// * `search` - How to search for the proof
    /// * `reward` - Transaction appended to the batch at commit time
    pub fn mine_block(&self, search: &ProofSearch, reward: Option<Transaction>) -> Result<Block, LedgerError> {
        loop {
            let tip = self.tip()?;
            let proof = search.run(tip.proof)?;

            let mut state = self.state();
            if state.tip()?.index != tip.index {
                warn!("Tip moved past block {} while mining, searching again", tip.index);
                continue;
            }

            if let Some(reward) = reward.clone() {
                state.pending_transactions.push(reward);
            }
            let block = match state.commit(proof, None) {
                Ok(block) => block,
                Err(err) => {
                    if reward.is_some() {
                        state.pending_transactions.pop();
                    }
                    return Err(err);
                }
            };
            drop(state);

            info!("Mined block {} with proof {}", block.index, block.proof);
            return Ok(block);
        }
    }

    /// Gets the last committed block
    pub fn tip(&self) -> Result<Block, LedgerError> {
        self.state().tip().cloned()
    }

    /// Canonical hash of `block`
    pub fn canonical_hash(block: &Block) -> Result<String, LedgerError> {
        Ok(block.canonical_hash()?)
    }

    /// Gets a copy of the whole chain
    pub fn chain(&self) -> Vec<Block> {
        self.state().chain.clone()
    }

    /// Gets a copy of the pending batch
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.state().pending_transactions.clone()
    }

    pub fn len(&self) -> usize {
        self.state().chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().chain.is_empty()
    }

    /// Validates the committed chain
    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_chain(&self.state().chain)
    }

    /// Validates the committed chain
    ///
    /// # Returns
    ///
    /// true if the chain is valid, false otherwise
    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(err) => {
                warn!("Chain validation failed: {}", err);
                false
            }
        }
    }
}

/// Checks that `blocks` form a well-linked chain
///
/// Indices must run from 1 without gaps. Every block after the first must
/// link to the canonical hash of its predecessor and carry a proof that
/// solves the puzzle posed by the predecessor's proof.
pub fn validate_chain(blocks: &[Block]) -> Result<(), LedgerError> {
    for (position, block) in blocks.iter().enumerate() {
        let expected_index = position as u64 + 1;
        if block.index != expected_index {
            return Err(LedgerError::InvalidChain {
                index: block.index,
                reason: format!("expected index {}", expected_index),
            });
        }

        let previous = match position.checked_sub(1) {
            Some(previous) => &blocks[previous],
            None => continue,
        };

        if block.previous_hash != previous.canonical_hash()? {
            return Err(LedgerError::InvalidChain {
                index: block.index,
                reason: "previous_hash does not match the previous block".to_string(),
            });
        }

        if !pow::verify(previous.proof, block.proof) {
            return Err(LedgerError::InvalidChain {
                index: block.index,
                reason: format!("proof {} does not solve the puzzle", block.proof),
            });
        }
    }

    Ok(())
}

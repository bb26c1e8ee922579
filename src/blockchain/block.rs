use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::canonical::{self, SerializationError};
use super::transaction::Transaction;

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Index of the block in the chain, starting at 1
    pub index: u64,

    /// Seconds since the Unix epoch when the block was created
    pub timestamp: f64,

    /// Transactions sealed into this block, in submission order
    pub transactions: Vec<Transaction>,

    /// Proof of work
    pub proof: u64,

    /// Canonical hash of the previous block
    pub previous_hash: String,
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `transactions` - The transactions to seal into the block
    /// * `proof` - The proof of work
    /// * `previous_hash` - The hash of the previous block
    pub fn new(index: u64, transactions: Vec<Transaction>, proof: u64, previous_hash: String) -> Self {
        Block {
            index,
            timestamp: current_timestamp(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Calculates the canonical hash of the block
    ///
    /// The hash covers every field, including `previous_hash` and `proof`.
    ///
    /// # Returns
    ///
    /// The SHA-256 of the block's canonical encoding as lowercase hex, or an
    /// error if a numeric field is not finite
    pub fn canonical_hash(&self) -> Result<String, SerializationError> {
        self.ensure_encodable()?;
        canonical::canonical_digest(self)
    }

    fn ensure_encodable(&self) -> Result<(), SerializationError> {
        if !self.timestamp.is_finite() {
            return Err(SerializationError::NonFiniteNumber {
                field: "timestamp".to_string(),
            });
        }

        for (position, transaction) in self.transactions.iter().enumerate() {
            if !transaction.amount.is_finite() {
                return Err(SerializationError::NonFiniteNumber {
                    field: format!("transactions[{}].amount", position),
                });
            }
        }

        Ok(())
    }
}

/// Wall-clock seconds since the epoch with microsecond resolution
fn current_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

// Blockchain module
//
// This module contains the ledger core:
// - Block and transaction records
// - Canonical encoding and hashing
// - The ledger (committed chain plus pending batch)
// - Proof of work search and verification

pub mod block;
pub mod canonical;
pub mod chain;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use canonical::SerializationError;
pub use chain::{validate_chain, Ledger, LedgerError};
pub use pow::{PowError, ProofSearch};
pub use transaction::{Amount, Transaction};

//! Proof-of-work puzzle gating block admission.
//!
//! A proof is valid when the SHA-256 of the previous proof's decimal text,
//! directly followed by the candidate's decimal text, starts with
//! [`DIFFICULTY_PREFIX`] in hex.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Required prefix of the hex digest (16 leading zero bits)
pub const DIFFICULTY_PREFIX: &str = "0000";

/// Conventional proof of the genesis block
pub const GENESIS_PROOF: u64 = 100;

/// How many candidates the sequential search tries between cancel checks
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Candidates handed to the worker pool per round
const PARALLEL_CHUNK: u64 = 16 * 1024;

/// Errors that can occur during a proof search
#[derive(Debug, Error)]
pub enum PowError {
    #[error("No valid proof among the first {attempts} candidates")]
    PuzzleUnsolvable { attempts: u64 },

    #[error("Proof search was cancelled")]
    Cancelled,

    #[error("Failed to start search workers: {0}")]
    WorkerPool(String),
}

/// Hex digest the puzzle is evaluated on
pub fn puzzle_digest(previous_proof: u64, candidate: u64) -> String {
    let guess = format!("{}{}", previous_proof, candidate);
    hex::encode(Sha256::digest(guess.as_bytes()))
}

/// Checks whether `candidate` solves the puzzle posed by `previous_proof`
pub fn verify(previous_proof: u64, candidate: u64) -> bool {
    puzzle_digest(previous_proof, candidate).starts_with(DIFFICULTY_PREFIX)
}

/// Returns the smallest proof that solves the puzzle posed by `previous_proof`
///
/// The search is unbounded and single-threaded. Use [`ProofSearch`] for a
/// bounded, cancellable or parallel search.
pub fn search(previous_proof: u64) -> u64 {
    let mut candidate = 0;
    while !verify(previous_proof, candidate) {
        candidate += 1;
    }
    candidate
}

/// A configurable proof search
///
/// Every variant returns the smallest valid proof within the candidate range
/// `0..max_attempts`, whatever the number of workers.
#[derive(Debug, Clone)]
pub struct ProofSearch {
    max_attempts: Option<u64>,
    workers: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for ProofSearch {
    fn default() -> Self {
        ProofSearch {
            max_attempts: None,
            workers: 1,
            cancel: None,
        }
    }
}

impl ProofSearch {
    /// Creates an unbounded, single-threaded search
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives up with [`PowError::PuzzleUnsolvable`] after `max_attempts` candidates
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Spreads the candidate space over `workers` threads
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Aborts with [`PowError::Cancelled`] once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn max_attempts(&self) -> Option<u64> {
        self.max_attempts
    }

    /// Runs the search against `previous_proof`
    ///
    /// # Returns
    ///
    /// The smallest valid proof, or an error if the attempt ceiling was hit
    /// or the search was cancelled
    pub fn run(&self, previous_proof: u64) -> Result<u64, PowError> {
        let limit = self.max_attempts.unwrap_or(u64::MAX);
        debug!(
            "Searching proof for {} with {} worker(s), limit {}",
            previous_proof, self.workers, limit
        );

        if self.workers == 1 {
            self.run_sequential(previous_proof, limit)
        } else {
            self.run_parallel(previous_proof, limit)
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    fn run_sequential(&self, previous_proof: u64, limit: u64) -> Result<u64, PowError> {
        for candidate in 0..limit {
            if candidate % CANCEL_CHECK_INTERVAL == 0 && self.is_cancelled() {
                return Err(PowError::Cancelled);
            }
            if verify(previous_proof, candidate) {
                return Ok(candidate);
            }
        }

        Err(PowError::PuzzleUnsolvable { attempts: limit })
    }

    fn run_parallel(&self, previous_proof: u64, limit: u64) -> Result<u64, PowError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| PowError::WorkerPool(e.to_string()))?;

        // Chunks are scanned in order and `find_first` keeps the lowest hit
        // inside a chunk, so the result is the sequential search's proof.
        let mut start = 0;
        while start < limit {
            if self.is_cancelled() {
                return Err(PowError::Cancelled);
            }

            let end = start.saturating_add(PARALLEL_CHUNK).min(limit);
            let hit = pool.install(|| {
                (start..end)
                    .into_par_iter()
                    .find_first(|candidate| verify(previous_proof, *candidate))
            });
            if let Some(proof) = hit {
                return Ok(proof);
            }

            start = end;
        }

        Err(PowError::PuzzleUnsolvable { attempts: limit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_known_values() {
        assert_eq!(search(100), 35293);
        assert_eq!(search(0), 69732);
        assert_eq!(search(35293), 35089);
    }

    #[test]
    fn test_search_result_verifies() {
        let proof = search(GENESIS_PROOF);

        assert!(verify(GENESIS_PROOF, proof));
        let digest = puzzle_digest(GENESIS_PROOF, proof);
        assert!(digest.starts_with("0000"));
        assert_eq!(
            hex::encode(Sha256::digest(format!("100{}", proof).as_bytes())),
            digest
        );
    }

    #[test]
    fn test_search_is_minimal() {
        let proof = search(1);
        assert_eq!(proof, 72608);
        assert!((0..proof).all(|candidate| !verify(1, candidate)));
    }

    #[test]
    fn test_verify_uses_plain_decimal_concatenation() {
        assert_eq!(
            puzzle_digest(100, 35293),
            "0000c415de5ceea33c02daa85a1c218ecca1b1c9e9864ed34d183597844de8e2"
        );
        assert!(verify(100, 35293));
        assert!(!verify(100, 35292));
        // only the concatenated text is hashed
        assert!(verify(1003, 5293));
    }

    #[test]
    fn test_bounded_search_gives_up() {
        let search = ProofSearch::new().with_max_attempts(1000);

        match search.run(100) {
            Err(PowError::PuzzleUnsolvable { attempts }) => assert_eq!(attempts, 1000),
            other => panic!("expected PuzzleUnsolvable, got {:?}", other),
        }
    }

    #[test]
    fn test_bounded_search_finds_proof_within_limit() {
        let search = ProofSearch::new().with_max_attempts(35294);
        assert_eq!(search.run(100).unwrap(), 35293);
    }

    #[test]
    fn test_parallel_search_matches_sequential() {
        let search = ProofSearch::new().with_workers(4);

        assert_eq!(search.run(100).unwrap(), 35293);
        assert_eq!(search.run(1).unwrap(), 72608);
    }

    #[test]
    fn test_parallel_bounded_search_gives_up() {
        let search = ProofSearch::new().with_workers(3).with_max_attempts(500);

        assert!(matches!(
            search.run(100),
            Err(PowError::PuzzleUnsolvable { attempts: 500 })
        ));
    }

    #[test]
    fn test_cancelled_search() {
        let flag = Arc::new(AtomicBool::new(true));

        let sequential = ProofSearch::new().with_cancel_flag(flag.clone());
        assert!(matches!(sequential.run(100), Err(PowError::Cancelled)));

        let parallel = ProofSearch::new().with_workers(2).with_cancel_flag(flag);
        assert!(matches!(parallel.run(100), Err(PowError::Cancelled)));
    }

    #[test]
    fn test_zero_workers_means_one() {
        assert_eq!(ProofSearch::new().with_workers(0).workers(), 1);
    }
}

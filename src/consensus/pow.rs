//! Proof-of-work: search for a nonce whose block hash starts with
//! `difficulty` zero characters.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{ConsensusStrategy, Seal};
use crate::blockchain::{Block, CandidateBlock};
use crate::crypto::HashFunction;
use crate::error::ChainError;

/// True when `hash` starts with `difficulty` '0' characters.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

#[derive(Debug, Clone)]
pub struct ProofOfWork {
    difficulty: usize,
    threads: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> Self {
        ProofOfWork {
            difficulty,
            threads: 1,
            cancel: None,
        }
    }

    /// Split the nonce space across `threads` workers; worker `w` tries
    /// `w`, `w + threads`, `w + 2 * threads`, ... The first to find a nonce
    /// stops the rest.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Abort the search once `flag` is raised. Checked before every attempt.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// The seal recorded on, and hashed into, every block this rule mines.
    pub fn seal_record(&self) -> Seal {
        Seal::ProofOfWork {
            difficulty: self.difficulty,
        }
    }

    /// The required hash prefix.
    pub fn target(&self) -> String {
        "0".repeat(self.difficulty)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Find a nonce meeting the difficulty. Returns the nonce and its hash.
    /// Only the nonce varies; the hash is recomputed in full on every attempt.
    pub fn mine(
        &self,
        candidate: &CandidateBlock,
        hasher: &dyn HashFunction,
    ) -> Result<(u64, String), ChainError> {
        if self.difficulty > hasher.width() {
            return Err(ChainError::InvalidDifficulty {
                difficulty: self.difficulty,
                width: hasher.width(),
            });
        }

        let seal = self.seal_record();
        if self.threads > 1 {
            self.mine_parallel(candidate, &seal, hasher)
        } else {
            self.mine_sequential(candidate, &seal, hasher)
        }
    }

    fn mine_sequential(
        &self,
        candidate: &CandidateBlock,
        seal: &Seal,
        hasher: &dyn HashFunction,
    ) -> Result<(u64, String), ChainError> {
        let mut nonce = 0u64;
        loop {
            if self.is_cancelled() {
                return Err(ChainError::MiningCancelled);
            }

            let hash = candidate.hash_with_nonce(nonce, seal, hasher);
            if meets_difficulty(&hash, self.difficulty) {
                debug!("Block {} solved after {} attempts", candidate.index(), nonce + 1);
                return Ok((nonce, hash));
            }

            nonce = nonce.checked_add(1).ok_or(ChainError::NonceSpaceExhausted)?;
        }
    }

    fn mine_parallel(
        &self,
        candidate: &CandidateBlock,
        seal: &Seal,
        hasher: &dyn HashFunction,
    ) -> Result<(u64, String), ChainError> {
        let found = AtomicBool::new(false);
        let stride = self.threads as u64;

        let outcomes: Vec<Result<Option<(u64, String)>, ChainError>> = (0..stride)
            .into_par_iter()
            .map(|worker| {
                let mut nonce = worker;
                loop {
                    if found.load(Ordering::Relaxed) {
                        return Ok(None);
                    }
                    if self.is_cancelled() {
                        return Err(ChainError::MiningCancelled);
                    }

                    let hash = candidate.hash_with_nonce(nonce, seal, hasher);
                    if meets_difficulty(&hash, self.difficulty) {
                        found.store(true, Ordering::Relaxed);
                        return Ok(Some((nonce, hash)));
                    }

                    nonce = match nonce.checked_add(stride) {
                        Some(next) => next,
                        None => return Ok(None),
                    };
                }
            })
            .collect();

        let mut winner: Option<(u64, String)> = None;
        let mut failure = None;
        for outcome in outcomes {
            match outcome {
                Ok(Some(solution)) => {
                    if winner.as_ref().map_or(true, |(best, _)| solution.0 < *best) {
                        winner = Some(solution);
                    }
                }
                Ok(None) => {}
                Err(err) => failure = Some(err),
            }
        }

        match (winner, failure) {
            (Some(solution), _) => {
                debug!(
                    "Block {} solved at nonce {} by {} workers",
                    candidate.index(),
                    solution.0,
                    self.threads
                );
                Ok(solution)
            }
            (None, Some(err)) => Err(err),
            (None, None) => Err(ChainError::NonceSpaceExhausted),
        }
    }
}

impl ConsensusStrategy for ProofOfWork {
    fn name(&self) -> &'static str {
        "proof-of-work"
    }

    fn seal(
        &mut self,
        candidate: CandidateBlock,
        hasher: &dyn HashFunction,
    ) -> Result<Block, ChainError> {
        let (nonce, hash) = self.mine(&candidate, hasher)?;
        Ok(candidate.into_block(nonce, hash, self.seal_record()))
    }
}

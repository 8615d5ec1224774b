//! Proof-of-stake: pick one participant with probability proportional to its
//! stake, then seal the block once without any search.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{ConsensusStrategy, Seal};
use crate::blockchain::{Block, CandidateBlock};
use crate::crypto::HashFunction;
use crate::error::ChainError;

/// Running totals of `stakes`. Fails on an empty table, a zero total, or a
/// total that does not fit in a `u64`.
pub fn cumulative_stakes(stakes: &[u64]) -> Result<Vec<u64>, ChainError> {
    if stakes.is_empty() {
        return Err(ChainError::DegenerateStake("stake table is empty".to_string()));
    }

    let mut cumulative = Vec::with_capacity(stakes.len());
    let mut total = 0u64;
    for stake in stakes {
        total = total.checked_add(*stake).ok_or_else(|| {
            ChainError::DegenerateStake("total stake overflows u64".to_string())
        })?;
        cumulative.push(total);
    }

    if total == 0 {
        return Err(ChainError::DegenerateStake("total stake is zero".to_string()));
    }
    Ok(cumulative)
}

// Smallest index whose running total reaches `draw`.
fn participant_for_draw(cumulative: &[u64], draw: u64) -> usize {
    cumulative.partition_point(|&total| total < draw)
}

/// Stake-weighted choice: draw `r` uniformly from `[1, total]` and return the
/// first participant whose cumulative stake is at least `r`.
pub fn select_weighted<R: Rng + ?Sized>(stakes: &[u64], rng: &mut R) -> Result<usize, ChainError> {
    let cumulative = cumulative_stakes(stakes)?;
    let total = cumulative[cumulative.len() - 1];
    let draw = rng.gen_range(1..=total);
    Ok(participant_for_draw(&cumulative, draw))
}

/// Seals blocks by stake-weighted selection. The random source is owned by
/// the strategy so tests can inject a seeded generator.
#[derive(Debug, Clone)]
pub struct ProofOfStake<R = StdRng> {
    stakes: Vec<u64>,
    rng: R,
}

impl ProofOfStake<StdRng> {
    /// Strategy drawing from an entropy-seeded generator.
    pub fn new(stakes: Vec<u64>) -> Self {
        Self::with_rng(stakes, StdRng::from_entropy())
    }

    /// Strategy with reproducible selections.
    pub fn seeded(stakes: Vec<u64>, seed: u64) -> Self {
        Self::with_rng(stakes, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ProofOfStake<R> {
    pub fn with_rng(stakes: Vec<u64>, rng: R) -> Self {
        ProofOfStake { stakes, rng }
    }

    pub fn stakes(&self) -> &[u64] {
        &self.stakes
    }

    /// Draw the participant that validates the next block.
    pub fn select(&mut self) -> Result<usize, ChainError> {
        select_weighted(&self.stakes, &mut self.rng)
    }

    /// Select a validator, annotate the block with it and hash it once at
    /// nonce 0. Returns the block together with the selected index.
    pub fn seal_with_selection(
        &mut self,
        candidate: CandidateBlock,
        hasher: &dyn HashFunction,
    ) -> Result<(Block, usize), ChainError> {
        let validator = self.select()?;
        debug!(
            "Participant {} of {} selected for block {}",
            validator,
            self.stakes.len(),
            candidate.index()
        );
        // The selected participant is hashed into the block through its seal.
        let block = candidate.finalize(0, Seal::ProofOfStake { validator }, hasher);
        Ok((block, validator))
    }
}

impl<R: Rng> ConsensusStrategy for ProofOfStake<R> {
    fn name(&self) -> &'static str {
        "proof-of-stake"
    }

    fn seal(
        &mut self,
        candidate: CandidateBlock,
        hasher: &dyn HashFunction,
    ) -> Result<Block, ChainError> {
        self.seal_with_selection(candidate, hasher).map(|(block, _)| block)
    }
}

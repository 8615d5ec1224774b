//! Consensus rules that turn a candidate block into a sealed one
//!
//! - [`pow`] - Proof-of-work nonce search
//! - [`pos`] - Stake-weighted validator selection

pub mod pos;
pub mod pow;

pub use pos::{cumulative_stakes, select_weighted, ProofOfStake};
pub use pow::{meets_difficulty, ProofOfWork};

use crate::blockchain::{Block, CandidateBlock};
use crate::crypto::HashFunction;
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record of which rule sealed a block and with what parameters.
///
/// The seal is committed to by the block hash through [`Seal::canonical`], so
/// it cannot be rewritten without invalidating the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Seal {
    Genesis,
    ProofOfWork { difficulty: usize },
    ProofOfStake { validator: usize },
}

impl Seal {
    /// Selected participant for proof-of-stake blocks.
    pub fn validator(&self) -> Option<usize> {
        match self {
            Seal::ProofOfStake { validator } => Some(*validator),
            _ => None,
        }
    }

    /// Text appended to the block hash preimage after the nonce.
    pub fn canonical(&self) -> String {
        match self {
            Seal::Genesis => "genesis".to_string(),
            Seal::ProofOfWork { difficulty } => format!("proof_of_work:{}", difficulty),
            Seal::ProofOfStake { validator } => format!("proof_of_stake:{}", validator),
        }
    }
}

impl fmt::Display for Seal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Seal::Genesis => write!(f, "genesis"),
            Seal::ProofOfWork { difficulty } => {
                write!(f, "proof-of-work, difficulty {}", difficulty)
            }
            Seal::ProofOfStake { validator } => {
                write!(f, "proof-of-stake, validated by participant {}", validator)
            }
        }
    }
}

/// A rule that seals candidate blocks. The ledger depends only on this trait.
///
/// Implementations take exclusive ownership of the candidate and must return
/// a block whose hash is the digest of its own fields and seal, typically via
/// [`CandidateBlock::finalize`].
pub trait ConsensusStrategy {
    fn name(&self) -> &'static str;

    fn seal(
        &mut self,
        candidate: CandidateBlock,
        hasher: &dyn HashFunction,
    ) -> Result<Block, ChainError>;
}

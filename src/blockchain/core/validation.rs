use crate::consensus::{meets_difficulty, Seal};
use crate::crypto::HashFunction;
use crate::error::ChainError;

use super::chain::{Block, GENESIS_PREVIOUS_HASH};

/// Check that a block's stored Merkle root and hash match what its own fields
/// re-derive to.
pub fn validate_block(block: &Block, hasher: &dyn HashFunction) -> Result<(), ChainError> {
    let merkle_root = block.recompute_merkle_root(hasher);
    if merkle_root != block.merkle_root() {
        return Err(ChainError::IntegrityViolation(format!(
            "Merkle root mismatch in block {}. Expected {}, but got {}.",
            block.index(),
            merkle_root,
            block.merkle_root()
        )));
    }

    let hash = block.recompute_hash(hasher);
    if hash != block.hash() {
        return Err(ChainError::IntegrityViolation(format!(
            "Hash mismatch in block {}. Expected {}, but got {}.",
            block.index(),
            hash,
            block.hash()
        )));
    }
    Ok(())
}

/// Hash-chain integrity: every block is self-consistent, the first block
/// carries the genesis link and every later block links to its predecessor's
/// stored hash. Stops at the first failure.
pub fn validate_chain(blocks: &[Block], hasher: &dyn HashFunction) -> Result<(), ChainError> {
    let genesis = blocks
        .first()
        .ok_or_else(|| ChainError::InvalidChain("Chain has no genesis block.".to_string()))?;
    validate_block(genesis, hasher)?;

    if genesis.index() != 0 || genesis.previous_hash() != GENESIS_PREVIOUS_HASH {
        return Err(ChainError::IntegrityViolation(format!(
            "Genesis block must have index 0 and previous hash {}, but got index {} and {}.",
            GENESIS_PREVIOUS_HASH,
            genesis.index(),
            genesis.previous_hash()
        )));
    }

    for pair in blocks.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        validate_block(current, hasher)?;

        if current.previous_hash() != previous.hash() {
            return Err(ChainError::IntegrityViolation(format!(
                "Invalid previous block hash in block {}. Expected {}, but got {}.",
                current.index(),
                previous.hash(),
                current.previous_hash()
            )));
        }
    }
    Ok(())
}

/// Consensus-specific checks recorded in each block's seal: the genesis block
/// sits at index 0 with the genesis link, indices are contiguous, and every
/// proof-of-work block meets the difficulty it claims. Proof-of-stake
/// selections come from a random draw and are not re-checked.
pub fn verify_consensus(blocks: &[Block], hasher: &dyn HashFunction) -> Result<(), ChainError> {
    for (position, block) in blocks.iter().enumerate() {
        if block.index() != position as u64 {
            return Err(ChainError::ConsensusViolation(format!(
                "Block at position {} claims index {}.",
                position,
                block.index()
            )));
        }

        if position == 0 && *block.seal() != Seal::Genesis {
            return Err(ChainError::ConsensusViolation(
                "First block is not sealed as genesis.".to_string(),
            ));
        }

        match block.seal() {
            Seal::Genesis => {
                if position != 0 || block.previous_hash() != GENESIS_PREVIOUS_HASH {
                    return Err(ChainError::ConsensusViolation(format!(
                        "Genesis seal found on block {}.",
                        block.index()
                    )));
                }
            }
            Seal::ProofOfWork { difficulty } => {
                if *difficulty > hasher.width() || !meets_difficulty(block.hash(), *difficulty) {
                    return Err(ChainError::ConsensusViolation(format!(
                        "Block {} hash {} does not meet difficulty {}.",
                        block.index(),
                        block.hash(),
                        difficulty
                    )));
                }
            }
            Seal::ProofOfStake { .. } => {}
        }
    }
    Ok(())
}

//! Merkle aggregation of transaction digests
//!
//! Levels are reduced pairwise, left before right. A level with an odd number
//! of nodes has its last node duplicated before pairing; this padding rule is
//! part of the root's definition and must not change.

use crate::crypto::HashFunction;
use crate::transaction::Transaction;

/// Root returned for a block without transactions.
pub const EMPTY_ROOT: &str = "";

/// Compute the Merkle root of an ordered batch of transactions.
pub fn build_root(transactions: &[Transaction], hasher: &dyn HashFunction) -> String {
    if transactions.is_empty() {
        return EMPTY_ROOT.to_string();
    }

    let mut level: Vec<String> = transactions.iter().map(|tx| tx.hash(hasher)).collect();
    while level.len() > 1 {
        level = next_level(&level, hasher);
    }
    level.swap_remove(0)
}

fn combine(left: &str, right: &str, hasher: &dyn HashFunction) -> String {
    let mut joined = String::with_capacity(left.len() + right.len());
    joined.push_str(left);
    joined.push_str(right);
    hasher.digest_str(&joined)
}

fn next_level(level: &[String], hasher: &dyn HashFunction) -> Vec<String> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            combine(left, right, hasher)
        })
        .collect()
}

/// Which side of the running hash a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: String,
    pub side: Side,
}

/// Inclusion proof for a single leaf, ordered from the leaf level upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf_index: usize,
    pub steps: Vec<ProofStep>,
}

impl MerkleProof {
    /// Fold the proof over `leaf` and compare with `root`.
    pub fn verify(&self, leaf: &str, root: &str, hasher: &dyn HashFunction) -> bool {
        let computed = self.steps.iter().fold(leaf.to_string(), |acc, step| match step.side {
            Side::Left => combine(&step.sibling, &acc, hasher),
            Side::Right => combine(&acc, &step.sibling, hasher),
        });
        computed == root
    }
}

/// A Merkle tree that keeps every level, so inclusion proofs can be produced
/// after the root is known.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<String>>,
}

impl MerkleTree {
    pub fn from_leaves(leaves: Vec<String>, hasher: &dyn HashFunction) -> Self {
        let mut levels = Vec::new();
        if leaves.is_empty() {
            return MerkleTree { levels };
        }

        levels.push(leaves);
        while let Some(top) = levels.last().filter(|level| level.len() > 1) {
            let parent = next_level(top, hasher);
            levels.push(parent);
        }
        MerkleTree { levels }
    }

    pub fn from_transactions(transactions: &[Transaction], hasher: &dyn HashFunction) -> Self {
        let leaves = transactions.iter().map(|tx| tx.hash(hasher)).collect();
        Self::from_leaves(leaves, hasher)
    }

    pub fn root(&self) -> &str {
        self.levels
            .last()
            .and_then(|level| level.first())
            .map(String::as_str)
            .unwrap_or(EMPTY_ROOT)
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Number of combination rounds between the leaves and the root.
    pub fn height(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    /// Build the inclusion proof for the leaf at `leaf_index`.
    pub fn proof(&self, leaf_index: usize) -> Option<MerkleProof> {
        if leaf_index >= self.leaf_count() {
            return None;
        }

        let mut steps = Vec::with_capacity(self.height());
        let mut index = leaf_index;
        for level in &self.levels[..self.height()] {
            let step = if index % 2 == 0 {
                // A trailing node on an odd level is paired with itself.
                let sibling = level.get(index + 1).unwrap_or(&level[index]);
                ProofStep { sibling: sibling.clone(), side: Side::Right }
            } else {
                ProofStep { sibling: level[index - 1].clone(), side: Side::Left }
            };
            steps.push(step);
            index /= 2;
        }

        Some(MerkleProof { leaf_index, steps })
    }
}

use crate::consensus::{ConsensusStrategy, Seal};
use crate::crypto::HashFunction;
use crate::error::ChainError;
use crate::merkle::build_root;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

use super::validation::{validate_chain, verify_consensus};

/// Timestamp of every genesis block: 2023-01-01T00:00:00Z in Unix milliseconds.
pub const GENESIS_TIMESTAMP: u64 = 1672531200000;

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Digest of a block header. Fields are concatenated as plain text in this
/// exact order: index, timestamp, previous hash, Merkle root, nonce, then the
/// seal's canonical form. Unsealed candidates hash without the seal.
pub fn compute_block_hash(
    hasher: &dyn HashFunction,
    index: u64,
    timestamp: u64,
    previous_hash: &str,
    merkle_root: &str,
    nonce: u64,
    seal: Option<&Seal>,
) -> String {
    let mut preimage = format!("{}{}{}{}{}", index, timestamp, previous_hash, merkle_root, nonce);
    if let Some(seal) = seal {
        preimage.push_str(&seal.canonical());
    }
    hasher.digest_str(&preimage)
}

/// A block that has been constructed but not yet sealed by a consensus rule.
///
/// Index, timestamp, previous hash and Merkle root are fixed at construction;
/// the sealing strategy chooses the nonce and the seal.
#[derive(Debug, Clone)]
pub struct CandidateBlock {
    index: u64,
    timestamp: u64,
    previous_hash: String,
    merkle_root: String,
    transactions: Vec<Transaction>,
    provisional_hash: String,
}

impl CandidateBlock {
    pub fn new(
        index: u64,
        previous_hash: impl Into<String>,
        transactions: Vec<Transaction>,
        hasher: &dyn HashFunction,
    ) -> Self {
        let timestamp = chrono::Utc::now().timestamp_millis() as u64;
        Self::with_timestamp(index, timestamp, previous_hash, transactions, hasher)
    }

    /// Candidate for index 0 with the fixed genesis timestamp and link.
    pub fn genesis(transactions: Vec<Transaction>, hasher: &dyn HashFunction) -> Self {
        Self::with_timestamp(0, GENESIS_TIMESTAMP, GENESIS_PREVIOUS_HASH, transactions, hasher)
    }

    pub fn with_timestamp(
        index: u64,
        timestamp: u64,
        previous_hash: impl Into<String>,
        transactions: Vec<Transaction>,
        hasher: &dyn HashFunction,
    ) -> Self {
        let previous_hash = previous_hash.into();
        let merkle_root = build_root(&transactions, hasher);
        let provisional_hash =
            compute_block_hash(hasher, index, timestamp, &previous_hash, &merkle_root, 0, None);

        CandidateBlock {
            index,
            timestamp,
            previous_hash,
            merkle_root,
            transactions,
            provisional_hash,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn merkle_root(&self) -> &str {
        &self.merkle_root
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Hash at nonce 0 without a seal. Sealing always replaces it.
    pub fn provisional_hash(&self) -> &str {
        &self.provisional_hash
    }

    /// Full recomputation of the sealed digest for a trial nonce.
    pub fn hash_with_nonce(&self, nonce: u64, seal: &Seal, hasher: &dyn HashFunction) -> String {
        compute_block_hash(
            hasher,
            self.index,
            self.timestamp,
            &self.previous_hash,
            &self.merkle_root,
            nonce,
            Some(seal),
        )
    }

    /// Seal at `nonce`, computing the final hash from the fixed fields.
    pub fn finalize(self, nonce: u64, seal: Seal, hasher: &dyn HashFunction) -> Block {
        let hash = self.hash_with_nonce(nonce, &seal, hasher);
        self.into_block(nonce, hash, seal)
    }

    /// Finalize into an immutable block. `hash` must be the digest for `nonce`
    /// and `seal`.
    pub(crate) fn into_block(self, nonce: u64, hash: String, seal: Seal) -> Block {
        Block {
            index: self.index,
            timestamp: self.timestamp,
            previous_hash: self.previous_hash,
            merkle_root: self.merkle_root,
            nonce,
            hash,
            seal,
            transactions: self.transactions,
        }
    }
}

/// A sealed block. Fields are read-only once sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    timestamp: u64,
    previous_hash: String,
    merkle_root: String,
    nonce: u64,
    hash: String,
    seal: Seal,
    transactions: Vec<Transaction>,
}

impl Block {
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Construction time in Unix milliseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn merkle_root(&self) -> &str {
        &self.merkle_root
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Which consensus rule sealed this block, and with what parameters.
    pub fn seal(&self) -> &Seal {
        &self.seal
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Re-derive the header digest from the stored fields and seal.
    pub fn recompute_hash(&self, hasher: &dyn HashFunction) -> String {
        compute_block_hash(
            hasher,
            self.index,
            self.timestamp,
            &self.previous_hash,
            &self.merkle_root,
            self.nonce,
            Some(&self.seal),
        )
    }

    /// Re-derive the Merkle root from the stored transactions.
    pub fn recompute_merkle_root(&self, hasher: &dyn HashFunction) -> String {
        build_root(&self.transactions, hasher)
    }
}

/// An append-only chain of sealed blocks, starting at a genesis block.
pub struct Ledger {
    // Never empty: every constructor installs at least the genesis block.
    blocks: Vec<Block>,
    hasher: Box<dyn HashFunction>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("hasher", &self.hasher.name())
            .field("blocks", &self.blocks)
            .finish()
    }
}

// A ledger always holds its genesis block, so there is no `is_empty`.
#[allow(clippy::len_without_is_empty)]
impl Ledger {
    /// Create a ledger whose genesis block commits `genesis_transactions`.
    /// Genesis is sealed directly at nonce 0; no mining is involved.
    pub fn new(genesis_transactions: Vec<Transaction>, hasher: Box<dyn HashFunction>) -> Self {
        let genesis = CandidateBlock::genesis(genesis_transactions, hasher.as_ref())
            .finalize(0, Seal::Genesis, hasher.as_ref());
        debug!("Created genesis block {} using {}", genesis.hash(), hasher.name());

        Ledger {
            blocks: vec![genesis],
            hasher,
        }
    }

    /// Create a ledger with the single default genesis mint.
    pub fn with_default_genesis(hasher: Box<dyn HashFunction>) -> Self {
        Self::new(vec![Transaction::genesis_mint()], hasher)
    }

    /// Adopt an existing sequence of blocks, e.g. one read back from JSON.
    /// The blocks are not validated; call [`Ledger::validate`] for that.
    pub fn from_blocks(
        blocks: Vec<Block>,
        hasher: Box<dyn HashFunction>,
    ) -> Result<Self, ChainError> {
        if blocks.is_empty() {
            return Err(ChainError::InvalidChain(
                "A ledger needs at least a genesis block.".to_string(),
            ));
        }
        Ok(Ledger { blocks, hasher })
    }

    /// Build the next block from `transactions`, seal it with `strategy` and
    /// append it. On error the ledger is left unchanged.
    pub fn append(
        &mut self,
        transactions: Vec<Transaction>,
        strategy: &mut dyn ConsensusStrategy,
    ) -> Result<&Block, ChainError> {
        let index = self.blocks.len() as u64;
        let previous_hash = self.last_block().hash().to_string();
        let candidate =
            CandidateBlock::new(index, previous_hash.clone(), transactions, self.hasher.as_ref());

        let started = Instant::now();
        let block = strategy.seal(candidate, self.hasher.as_ref())?;
        let elapsed = started.elapsed();

        if block.index() != index || block.previous_hash() != previous_hash {
            return Err(ChainError::InvalidChain(format!(
                "Strategy {} returned block {} linked to {}, expected block {} linked to {}.",
                strategy.name(),
                block.index(),
                block.previous_hash(),
                index,
                previous_hash
            )));
        }

        info!(
            "Sealed block {} with {} in {:.3}s: {} ({})",
            index,
            strategy.name(),
            elapsed.as_secs_f64(),
            block.hash(),
            block.seal()
        );

        self.blocks.push(block);
        Ok(self.last_block())
    }

    /// Integrity check of every stored digest and link.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Like [`Ledger::is_valid`] but reports the first failure.
    pub fn validate(&self) -> Result<(), ChainError> {
        validate_chain(&self.blocks, self.hasher.as_ref())
    }

    /// Re-check consensus-specific conditions recorded in each block's seal.
    pub fn verify_consensus(&self) -> Result<(), ChainError> {
        verify_consensus(&self.blocks, self.hasher.as_ref())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn last_block(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn hasher(&self) -> &dyn HashFunction {
        self.hasher.as_ref()
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{ProofOfStake, ProofOfWork};
    use crate::crypto::{DigestAlgorithm, Djb2, Sha256Hex};
    use crate::transaction::Amount;

    fn tx(id: &str, sender: &str, receiver: &str, amount: i32) -> Transaction {
        Transaction::new(id, sender, receiver, Amount::from_num(amount))
    }

    #[test]
    fn test_block_hash_field_order() {
        let hash = compute_block_hash(&Djb2, 1, 2, "ab", "cd", 3, None);
        assert_eq!(hash, Djb2.digest_str("12abcd3"));

        let seal = Seal::ProofOfWork { difficulty: 2 };
        let hash = compute_block_hash(&Djb2, 1, 2, "ab", "cd", 3, Some(&seal));
        assert_eq!(hash, Djb2.digest_str("12abcd3proof_of_work:2"));
    }

    #[test]
    fn test_genesis_block() {
        let ledger = Ledger::with_default_genesis(Box::new(Sha256Hex));
        assert_eq!(ledger.len(), 1);

        let genesis = ledger.genesis();
        assert_eq!(genesis.index(), 0);
        assert_eq!(genesis.previous_hash(), GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.timestamp(), GENESIS_TIMESTAMP);
        assert_eq!(genesis.nonce(), 0);
        assert_eq!(genesis.seal(), &Seal::Genesis);
        assert_eq!(genesis.transactions(), &[Transaction::genesis_mint()]);
        assert_eq!(genesis.hash(), genesis.recompute_hash(&Sha256Hex));
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_genesis_is_deterministic() {
        let a = Ledger::with_default_genesis(DigestAlgorithm::Djb2.hasher());
        let b = Ledger::with_default_genesis(DigestAlgorithm::Djb2.hasher());
        assert_eq!(a.genesis(), b.genesis());
    }

    #[test]
    fn test_candidate_provisional_hash() {
        let batch = vec![tx("tx1", "A", "B", 5)];
        let candidate = CandidateBlock::with_timestamp(3, 99, "prev", batch, &Djb2);
        let root = candidate.merkle_root().to_string();
        let seal = Seal::ProofOfStake { validator: 0 };

        assert_eq!(
            candidate.provisional_hash(),
            compute_block_hash(&Djb2, 3, 99, "prev", &root, 0, None)
        );
        assert_ne!(candidate.hash_with_nonce(0, &seal, &Djb2), candidate.provisional_hash());
        assert_ne!(
            candidate.hash_with_nonce(1, &seal, &Djb2),
            candidate.hash_with_nonce(0, &seal, &Djb2)
        );
        assert_eq!(candidate.merkle_root(), build_root(candidate.transactions(), &Djb2));
    }

    #[test]
    fn test_append_links_blocks() {
        let mut ledger = Ledger::with_default_genesis(Box::new(Sha256Hex));
        let genesis_hash = ledger.genesis().hash().to_string();

        let block = ledger
            .append(vec![tx("tx1", "A", "B", 5)], &mut ProofOfWork::new(1))
            .unwrap()
            .clone();
        assert_eq!(block.index(), 1);
        assert_eq!(block.previous_hash(), genesis_hash);
        assert!(block.hash().starts_with('0'));

        let block = ledger
            .append(vec![tx("tx2", "B", "C", 2)], &mut ProofOfStake::seeded(vec![1, 2, 3], 7))
            .unwrap()
            .clone();
        assert_eq!(block.index(), 2);
        assert_eq!(block.previous_hash(), ledger.blocks()[1].hash());
        assert_eq!(ledger.len(), 3);
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_empty_batch_block_is_legal() {
        let mut ledger = Ledger::new(Vec::new(), Box::new(Djb2));
        ledger.append(Vec::new(), &mut ProofOfWork::new(0)).unwrap();
        assert_eq!(ledger.last_block().merkle_root(), crate::merkle::EMPTY_ROOT);
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_failed_seal_leaves_ledger_untouched() {
        let mut ledger = Ledger::with_default_genesis(Box::new(Djb2));
        let before = ledger.blocks().to_vec();

        let err = ledger
            .append(vec![tx("tx1", "A", "B", 5)], &mut ProofOfStake::seeded(vec![0, 0], 1))
            .unwrap_err();
        assert!(matches!(err, ChainError::DegenerateStake(_)));
        assert_eq!(ledger.blocks(), before.as_slice());
    }

    #[test]
    fn test_tampered_amount_is_detected() {
        let mut ledger = Ledger::with_default_genesis(Box::new(Sha256Hex));
        ledger
            .append(vec![tx("tx1", "A", "B", 5), tx("tx2", "B", "C", 1)], &mut ProofOfWork::new(1))
            .unwrap();
        ledger
            .append(vec![tx("tx3", "C", "D", 3)], &mut ProofOfWork::new(1))
            .unwrap();
        assert!(ledger.is_valid());

        ledger.blocks[1].transactions[0].amount = Amount::from_num(500);
        assert!(!ledger.is_valid());
    }

    #[test]
    fn test_tampered_header_fields_are_detected() {
        let build = || {
            let mut ledger = Ledger::with_default_genesis(Box::new(Sha256Hex));
            ledger.append(vec![tx("tx1", "A", "B", 5)], &mut ProofOfWork::new(1)).unwrap();
            ledger.append(vec![tx("tx2", "B", "A", 1)], &mut ProofOfWork::new(1)).unwrap();
            ledger
        };

        let mut ledger = build();
        ledger.blocks[1].nonce += 1;
        assert!(!ledger.is_valid());

        let mut ledger = build();
        ledger.blocks[1].timestamp += 1;
        assert!(!ledger.is_valid());

        let mut ledger = build();
        ledger.blocks[2].previous_hash = "0".to_string();
        assert!(!ledger.is_valid());

        let mut ledger = build();
        ledger.blocks[1].index = 7;
        assert!(!ledger.is_valid());

        // Rehashing a block after tampering still breaks the link from its successor.
        let mut ledger = build();
        ledger.blocks[1].merkle_root = "forged".to_string();
        ledger.blocks[1].hash = ledger.blocks[1].recompute_hash(&Sha256Hex);
        assert!(!ledger.is_valid());
    }

    #[test]
    fn test_tampered_seal_is_detected() {
        let build = || {
            let mut ledger = Ledger::with_default_genesis(Box::new(Sha256Hex));
            ledger.append(vec![tx("tx1", "A", "B", 5)], &mut ProofOfWork::new(1)).unwrap();
            let mut pos = ProofOfStake::seeded(vec![1, 0, 0, 0], 5);
            ledger.append(vec![tx("tx2", "B", "C", 2)], &mut pos).unwrap();
            ledger
        };
        assert_eq!(build().blocks[2].seal, Seal::ProofOfStake { validator: 0 });

        // Credit a participant without stake.
        let mut ledger = build();
        ledger.blocks[2].seal = Seal::ProofOfStake { validator: 3 };
        assert!(!ledger.is_valid());

        // Downgrade the claimed work.
        let mut ledger = build();
        ledger.blocks[1].seal = Seal::ProofOfWork { difficulty: 0 };
        assert!(!ledger.is_valid());

        let mut ledger = build();
        ledger.blocks[1].seal = Seal::ProofOfStake { validator: 0 };
        assert!(!ledger.is_valid());

        let mut ledger = build();
        ledger.blocks[0].seal = Seal::ProofOfWork { difficulty: 0 };
        assert!(!ledger.is_valid());
    }

    #[test]
    fn test_from_blocks_rejects_empty() {
        let err = Ledger::from_blocks(Vec::new(), Box::new(Djb2)).unwrap_err();
        assert!(matches!(err, ChainError::InvalidChain(_)));
    }

    #[test]
    fn test_from_blocks_roundtrip() {
        let mut ledger = Ledger::with_default_genesis(Box::new(Sha256Hex));
        ledger.append(vec![tx("tx1", "A", "B", 5)], &mut ProofOfWork::new(2)).unwrap();

        let json = serde_json::to_string(ledger.blocks()).unwrap();
        let blocks: Vec<Block> = serde_json::from_str(&json).unwrap();
        let restored = Ledger::from_blocks(blocks, Box::new(Sha256Hex)).unwrap();
        assert_eq!(restored.blocks(), ledger.blocks());
        assert!(restored.is_valid());
        assert!(restored.verify_consensus().is_ok());
    }
}

//! Digest primitives for minichain
//!
//! Every digest in the ledger (transaction leaves, Merkle nodes, block hashes)
//! goes through a [`HashFunction`]. None of the shipped mixers other than
//! SHA-256 should be mistaken for a cryptographic hash: a mismatch is evidence
//! of accidental change, not proof against an adversary.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::ChainError;

/// A deterministic digest rendered as fixed-width lowercase hex.
pub trait HashFunction: Send + Sync {
    /// Short identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Number of hex characters every digest produced by this function has.
    fn width(&self) -> usize;

    /// Digest arbitrary bytes.
    fn digest(&self, input: &[u8]) -> String;

    fn digest_str(&self, input: &str) -> String {
        self.digest(input.as_bytes())
    }
}

/// SHA-256, 64 hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hex;

impl HashFunction for Sha256Hex {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn width(&self) -> usize {
        64
    }

    fn digest(&self, input: &[u8]) -> String {
        hex::encode(Sha256::digest(input))
    }
}

/// The `djb2` string mixer over a wrapping 64-bit state, 16 hex characters.
///
/// Bytes are folded in as signed 8-bit values, so non-ASCII input
/// sign-extends before the addition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Djb2;

impl HashFunction for Djb2 {
    fn name(&self) -> &'static str {
        "djb2"
    }

    fn width(&self) -> usize {
        16
    }

    fn digest(&self, input: &[u8]) -> String {
        let hash = input.iter().fold(5381u64, |hash, &byte| {
            (hash << 5)
                .wrapping_add(hash)
                .wrapping_add(byte as i8 as i64 as u64)
        });
        format!("{:016x}", hash)
    }
}

/// Polynomial mixer `(hash * 101 + byte) mod 1_000_000_007` over a wrapping
/// 32-bit state, 8 hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolyMod;

impl PolyMod {
    const MODULUS: u32 = 1_000_000_007;
}

impl HashFunction for PolyMod {
    fn name(&self) -> &'static str {
        "polymod"
    }

    fn width(&self) -> usize {
        8
    }

    fn digest(&self, input: &[u8]) -> String {
        let hash = input.iter().fold(0u32, |hash, &byte| {
            hash.wrapping_mul(101).wrapping_add(byte as i8 as i32 as u32) % Self::MODULUS
        });
        format!("{:08x}", hash)
    }
}

/// Selects one of the shipped digest implementations by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Djb2,
    PolyMod,
}

impl DigestAlgorithm {
    /// Box the selected implementation for use by a ledger.
    pub fn hasher(self) -> Box<dyn HashFunction> {
        match self {
            DigestAlgorithm::Sha256 => Box::new(Sha256Hex),
            DigestAlgorithm::Djb2 => Box::new(Djb2),
            DigestAlgorithm::PolyMod => Box::new(PolyMod),
        }
    }
}

impl HashFunction for DigestAlgorithm {
    fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => Sha256Hex.name(),
            DigestAlgorithm::Djb2 => Djb2.name(),
            DigestAlgorithm::PolyMod => PolyMod.name(),
        }
    }

    fn width(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => Sha256Hex.width(),
            DigestAlgorithm::Djb2 => Djb2.width(),
            DigestAlgorithm::PolyMod => PolyMod.width(),
        }
    }

    fn digest(&self, input: &[u8]) -> String {
        match self {
            DigestAlgorithm::Sha256 => Sha256Hex.digest(input),
            DigestAlgorithm::Djb2 => Djb2.digest(input),
            DigestAlgorithm::PolyMod => PolyMod.digest(input),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(HashFunction::name(self))
    }
}

impl FromStr for DigestAlgorithm {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "djb2" => Ok(DigestAlgorithm::Djb2),
            "polymod" => Ok(DigestAlgorithm::PolyMod),
            other => Err(ChainError::Config(format!(
                "Unknown digest algorithm '{}' (expected sha256, djb2 or polymod)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            Sha256Hex.digest_str("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_djb2_known_vectors() {
        assert_eq!(Djb2.digest_str(""), "0000000000001505");
        assert_eq!(Djb2.digest_str("a"), "000000000002b606");
        assert_eq!(Djb2.digest_str("abc"), "000000000b885c8b");
        assert_eq!(Djb2.digest_str("tx1: A -> B : 5"), "34250c3a61549b79");
    }

    #[test]
    fn test_djb2_sign_extends_high_bytes() {
        assert_eq!(Djb2.digest_str("é"), "0000000000596211");
    }

    #[test]
    fn test_polymod_known_vectors() {
        assert_eq!(PolyMod.digest_str(""), "00000000");
        assert_eq!(PolyMod.digest_str("a"), "00000061");
        assert_eq!(PolyMod.digest_str("abc"), "000f4046");
        assert_eq!(PolyMod.digest_str("tx1: A -> B : 5"), "2cc3bae7");
        assert_eq!(PolyMod.digest_str("é"), "014dec70");
    }

    #[test]
    fn test_width_is_fixed() {
        let algorithms = [DigestAlgorithm::Sha256, DigestAlgorithm::Djb2, DigestAlgorithm::PolyMod];
        for algorithm in algorithms {
            for input in ["", "x", "a much longer input string with spaces and -> arrows"] {
                let digest = algorithm.digest_str(input);
                assert_eq!(digest.len(), algorithm.width(), "{} on {:?}", algorithm, input);
                assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let hasher = DigestAlgorithm::Djb2.hasher();
        assert_eq!(hasher.digest_str("same input"), hasher.digest_str("same input"));
        assert_ne!(hasher.digest_str("input a"), hasher.digest_str("input b"));
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("SHA256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!("polymod".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::PolyMod);
        assert!("md5".parse::<DigestAlgorithm>().is_err());
    }
}

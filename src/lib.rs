//! minichain - a minimal append-only ledger
//!
//! Blocks commit batches of transactions through a Merkle root, link to their
//! predecessor by hash, and are sealed either by proof-of-work mining or by
//! stake-weighted proof-of-stake selection.
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, and chain validation
//! - [`transaction`] - Transaction values and their canonical form
//! - [`merkle`] - Merkle roots and inclusion proofs
//!
//! ## Consensus
//! - [`consensus`] - The sealing trait, proof-of-work and proof-of-stake
//!
//! ## Hashing
//! - [`crypto`] - Pluggable digest functions
//!
//! ## Configuration & Utilities
//! - [`batch`] - Batch plans consumed by the CLI
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod merkle;
pub mod transaction;

// ============================================================================
// Consensus
// ============================================================================
pub mod consensus;

// ============================================================================
// Hashing
// ============================================================================
pub mod crypto;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod batch;
pub mod config;
pub mod error;

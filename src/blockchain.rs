// Thin re-export module: block and ledger types live in `blockchain/core.rs`,
// split between chain management and integrity validation.

pub mod core;
pub use core::*;

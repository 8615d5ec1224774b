//! Transaction type for minichain

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::HashFunction;

/// Deterministic fixed-point decimal used for transfer amounts.
pub type Amount = I32F32;

/// A value transfer committed by a block. Transactions are accepted as-is:
/// no uniqueness, balance or signature checks are made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub amount: Amount,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: Amount,
    ) -> Self {
        Transaction {
            id: id.into(),
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
        }
    }

    /// The default genesis mint: `tx0: system -> genesis : 50`.
    pub fn genesis_mint() -> Self {
        Transaction::new("tx0", "system", "genesis", Amount::from_num(50))
    }

    /// The string form that is fed to the digest, `id: sender -> receiver : amount`.
    pub fn canonical(&self) -> String {
        format!(
            "{}: {} -> {} : {}",
            self.id, self.sender, self.receiver, self.amount
        )
    }

    /// Digest of the canonical form; this is the transaction's Merkle leaf.
    pub fn hash(&self, hasher: &dyn HashFunction) -> String {
        hasher.digest_str(&self.canonical())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

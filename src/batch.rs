//! Batch plans: caller-supplied transaction batches, each with the consensus
//! rule that should seal it. This is the input format of the `minichain` CLI.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::blockchain::Ledger;
use crate::config::Config;
use crate::error::Result;
use crate::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "consensus", rename_all = "snake_case")]
pub enum BatchPlan {
    ProofOfWork {
        #[serde(default)]
        difficulty: Option<usize>,
        transactions: Vec<Transaction>,
    },
    ProofOfStake {
        #[serde(default)]
        stakes: Option<Vec<u64>>,
        transactions: Vec<Transaction>,
    },
}

impl BatchPlan {
    pub fn transactions(&self) -> &[Transaction] {
        match self {
            BatchPlan::ProofOfWork { transactions, .. }
            | BatchPlan::ProofOfStake { transactions, .. } => {
                transactions
            }
        }
    }
}

/// Read a JSON array of [`BatchPlan`]s.
pub fn load_batches(path: &Path) -> Result<Vec<BatchPlan>> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Append every plan to `ledger` in order. Parameters a plan leaves out are
/// taken from `config`. Stops at the first plan that fails to seal; blocks
/// appended before it remain.
pub fn apply_batches(ledger: &mut Ledger, plans: Vec<BatchPlan>, config: &Config) -> Result<()> {
    let total = plans.len();
    for (position, plan) in plans.into_iter().enumerate() {
        let block = match plan {
            BatchPlan::ProofOfWork {
                difficulty,
                transactions,
            } => ledger.append(transactions, &mut config.proof_of_work(difficulty))?,
            BatchPlan::ProofOfStake {
                stakes,
                transactions,
            } => ledger.append(transactions, &mut config.proof_of_stake(stakes))?,
        };
        info!(
            "Batch {}/{} committed as block {} ({} transactions)",
            position + 1,
            total,
            block.index(),
            block.transactions().len()
        );
    }
    Ok(())
}

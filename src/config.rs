//! Configuration management for minichain

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::consensus::{cumulative_stakes, ProofOfStake, ProofOfWork};
use crate::crypto::{DigestAlgorithm, HashFunction};
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "minichain.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub staking: StakingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub digest: DigestAlgorithm,
    /// Genesis transactions; the default mint when absent.
    #[serde(default)]
    pub genesis: Option<Vec<Transaction>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiningConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            threads: default_threads(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StakingConfig {
    #[serde(default)]
    pub stakes: Vec<u64>,
    /// Fixed seed for reproducible validator selection.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<tracing::Level> {
        tracing::Level::from_str(&self.level)
            .map_err(|_| ChainError::Config(format!("Unknown log level '{}'", self.level)))
    }
}

fn default_difficulty() -> usize {
    2
}

fn default_threads() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values a ledger cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.mining.threads == 0 {
            return Err(ChainError::Config("mining.threads must be at least 1".to_string()));
        }

        let width = self.chain.digest.width();
        if self.mining.difficulty > width {
            return Err(ChainError::Config(format!(
                "mining.difficulty {} exceeds the {} digest width of {}",
                self.mining.difficulty, self.chain.digest, width
            )));
        }

        if !self.staking.stakes.is_empty() {
            cumulative_stakes(&self.staking.stakes)
                .map_err(|e| ChainError::Config(format!("staking.stakes: {}", e)))?;
        }

        self.logging.level()?;
        Ok(())
    }

    pub fn genesis_transactions(&self) -> Vec<Transaction> {
        self.chain
            .genesis
            .clone()
            .unwrap_or_else(|| vec![Transaction::genesis_mint()])
    }

    pub fn hasher(&self) -> Box<dyn HashFunction> {
        self.chain.digest.hasher()
    }

    /// Proof-of-work strategy at `difficulty`, or the configured one.
    pub fn proof_of_work(&self, difficulty: Option<usize>) -> ProofOfWork {
        ProofOfWork::new(difficulty.unwrap_or(self.mining.difficulty))
            .with_threads(self.mining.threads)
    }

    /// Proof-of-stake strategy over `stakes`, or the configured table.
    pub fn proof_of_stake(&self, stakes: Option<Vec<u64>>) -> ProofOfStake {
        let stakes = stakes.unwrap_or_else(|| self.staking.stakes.clone());
        match self.staking.seed {
            Some(seed) => ProofOfStake::seeded(stakes, seed),
            None => ProofOfStake::new(stakes),
        }
    }
}

/// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when no
/// path is given. A missing default file yields the built-in defaults; a
/// missing explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_str = match path {
        Some(path) => fs::read_to_string(path)?,
        None => match fs::read_to_string(DEFAULT_CONFIG_FILE) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        },
    };

    Config::from_toml_str(&config_str)
}

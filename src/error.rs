//! Error types for minichain

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Degenerate stake table: {0}")]
    DegenerateStake(String),
    #[error("Invalid difficulty {difficulty}: digest is only {width} characters wide")]
    InvalidDifficulty { difficulty: usize, width: usize },
    #[error("Mining cancelled")]
    MiningCancelled,
    #[error("Nonce space exhausted without meeting the target")]
    NonceSpaceExhausted,
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),
    #[error("Consensus violation: {0}")]
    ConsensusViolation(String),
    #[error("Invalid chain: {0}")]
    InvalidChain(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ChainError::InvalidDifficulty { difficulty: 70, width: 64 };
        assert_eq!(
            err.to_string(),
            "Invalid difficulty 70: digest is only 64 characters wide"
        );
        assert_eq!(
            ChainError::DegenerateStake("total stake is zero".to_string()).to_string(),
            "Degenerate stake table: total stake is zero"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ChainError = io.into();
        assert!(matches!(err, ChainError::Io(_)));
        assert!(err.to_string().starts_with("IO error"));
    }
}

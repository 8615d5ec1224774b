// Chain management (blocks, ledger) and the integrity checks run over it.
pub mod chain;
pub mod validation;

pub use chain::*;
pub use validation::*;

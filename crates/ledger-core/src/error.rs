use thiserror::Error;

/// Failures surfaced by the ledger engine.
///
/// A difficulty list that disagrees in length with the chain is not an error:
/// it is reported by validation as [`crate::ValidationReport::SizeMismatch`].
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unable to load ledger: {0}")]
    Load(String),

    #[error("block index {index} out of range (chain has {len} blocks)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("difficulty {difficulty} outside the accepted range 0..={max}")]
    DifficultyOutOfRange { difficulty: u32, max: u32 },

    #[error("no nonce found for block {index} after {attempts} attempts")]
    MiningExhausted { index: usize, attempts: u64 },

    #[error("ledger document encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

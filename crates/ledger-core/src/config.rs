use crate::constants::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use serde::{Deserialize, Serialize};

/// Tunables for a [`crate::chain::Ledger`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Difficulty assigned to newly appended blocks.
    pub difficulty: u32,
    /// Upper bound accepted by `change_difficulty`.
    pub max_difficulty: u32,
    /// Cap on nonce candidates per block when appending or repairing.
    /// `None` searches until a nonce is found.
    pub max_iterations: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            max_difficulty: MAX_DIFFICULTY,
            max_iterations: None,
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: Option<u64>) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

pub mod chain;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod hash;
pub mod mine;
pub mod repair;
pub mod validate;

pub use chain::{genesis_block, Ledger, LedgerStore};
pub use config::LedgerConfig;
pub use document::{LedgerDocument, PartyIndex};
pub use error::{LedgerError, Result};
pub use hash::{hash_block, hash_block_with, BlockHasher};
pub use mine::{meets_difficulty, mine, MineOutcome};
pub use repair::repair_chain;
pub use validate::{validate_chain, BlockVerdict, ValidationReport};

use serde::{Deserialize, Serialize};

/// One record of the chain.
///
/// `previous_hash` is the hex digest of the preceding block (empty for
/// genesis). `nonce` is the smallest value that makes the probe of the
/// preceding block and this block's `data` start with `difficulty` zero
/// characters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Block {
    #[serde(rename = "previoushash")]
    pub previous_hash: String,
    pub sender: String,
    pub recipient: String,
    pub data: String,
    pub nonce: u64,
    pub difficulty: u32,
}

impl Block {
    pub fn new(
        previous_hash: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        data: impl Into<String>,
        nonce: u64,
        difficulty: u32,
    ) -> Self {
        Self {
            previous_hash: previous_hash.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            data: data.into(),
            nonce,
            difficulty,
        }
    }

    pub fn hash(&self) -> String {
        hash_block(self)
    }
}

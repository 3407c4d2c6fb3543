use crate::{
    hash::hash_block,
    mine::{mine, MineOutcome},
    Block,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Outcome of checking one non-genesis block against its predecessor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockVerdict {
    pub index: usize,
    pub previous_hash_ok: bool,
    pub nonce_ok: bool,
}

impl BlockVerdict {
    pub fn is_valid(&self) -> bool {
        self.previous_hash_ok && self.nonce_ok
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationReport {
    /// The difficulty list and the chain differ in length; no block was checked.
    SizeMismatch { blocks: usize, difficulties: usize },
    /// One verdict per block, starting at index 1.
    Checked { verdicts: Vec<BlockVerdict> },
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        match self {
            ValidationReport::SizeMismatch { .. } => false,
            ValidationReport::Checked { verdicts } => verdicts.iter().all(BlockVerdict::is_valid),
        }
    }

    pub fn verdicts(&self) -> &[BlockVerdict] {
        match self {
            ValidationReport::SizeMismatch { .. } => &[],
            ValidationReport::Checked { verdicts } => verdicts,
        }
    }

    pub fn invalid_indices(&self) -> Vec<usize> {
        self.verdicts()
            .iter()
            .filter(|v| !v.is_valid())
            .map(|v| v.index)
            .collect()
    }
}

/// Re-derives the link and the nonce of every block after genesis.
///
/// Each block is judged only against its predecessor, so one bad block does
/// not stop later blocks from being checked.
pub fn validate_chain(blocks: &[Block], difficulties: &[u32]) -> ValidationReport {
    if blocks.len() != difficulties.len() {
        warn!(
            blocks = blocks.len(),
            difficulties = difficulties.len(),
            "difficulty list out of sync with chain"
        );
        return ValidationReport::SizeMismatch {
            blocks: blocks.len(),
            difficulties: difficulties.len(),
        };
    }

    let verdicts: Vec<BlockVerdict> = blocks
        .windows(2)
        .zip(difficulties.iter().skip(1))
        .enumerate()
        .map(|(offset, (pair, &difficulty))| {
            let (previous, current) = (&pair[0], &pair[1]);
            BlockVerdict {
                index: offset + 1,
                previous_hash_ok: current.previous_hash == hash_block(previous),
                nonce_ok: nonce_is_minimal(difficulty, previous, current),
            }
        })
        .collect();

    debug!(checked = verdicts.len(), "chain validated");
    ValidationReport::Checked { verdicts }
}

/// The stored nonce equals a fresh search's answer exactly when the search,
/// stopped right after the stored nonce, lands on it. `u64::MAX` is past the
/// last candidate any search tries, so it never matches.
fn nonce_is_minimal(difficulty: u32, previous: &Block, current: &Block) -> bool {
    let Some(limit) = current.nonce.checked_add(1) else {
        return false;
    };
    matches!(
        mine(difficulty, previous, &current.data, Some(limit)),
        MineOutcome::Found { nonce, .. } if nonce == current.nonce
    )
}

//! Block digests.
//!
//! A block hashes as SHA-256 over `data ++ previous_hash ++ nonce ++ sender ++
//! recipient`, with the nonce written in decimal and no separators between
//! fields. Mining appends a candidate nonce and the candidate payload of the
//! next block to that same byte string.
//!
//! Because no delimiters are inserted, two blocks whose fields split the same
//! bytes differently hash identically. Ledgers already on disk depend on this
//! exact layout, so it is kept as is.

use crate::Block;
use sha2::{Digest, Sha256};

/// SHA-256 state that has already absorbed a block's own fields.
///
/// The miner clones this once per candidate instead of re-hashing the five
/// fields every time; the resulting digests are identical to hashing the full
/// concatenation from scratch.
#[derive(Clone)]
pub struct BlockHasher {
    state: Sha256,
}

impl BlockHasher {
    pub fn new(block: &Block) -> Self {
        let mut state = Sha256::new();
        state.update(block.data.as_bytes());
        state.update(block.previous_hash.as_bytes());
        state.update(block.nonce.to_string().as_bytes());
        state.update(block.sender.as_bytes());
        state.update(block.recipient.as_bytes());
        Self { state }
    }

    /// Digest of the block alone.
    pub fn finish(self) -> String {
        hex::encode(self.state.finalize())
    }

    /// Digest of the block followed by `extra_nonce ++ extra_data`.
    ///
    /// The extras are only appended when both are non-empty.
    pub fn finish_with(&self, extra_nonce: &str, extra_data: &str) -> String {
        let mut state = self.state.clone();
        if !extra_nonce.is_empty() && !extra_data.is_empty() {
            state.update(extra_nonce.as_bytes());
            state.update(extra_data.as_bytes());
        }
        hex::encode(state.finalize())
    }
}

/// Lowercase hex SHA-256 of a block, as linked from its successor.
pub fn hash_block(block: &Block) -> String {
    BlockHasher::new(block).finish()
}

/// Lowercase hex SHA-256 of a block probed with a candidate nonce and payload.
pub fn hash_block_with(block: &Block, extra_nonce: &str, extra_data: &str) -> String {
    BlockHasher::new(block).finish_with(extra_nonce, extra_data)
}

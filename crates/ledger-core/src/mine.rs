use crate::{constants::HASH_HEX_SIZE, hash::BlockHasher, Block};
use tracing::debug;

/// Result of a nonce search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    Found { nonce: u64, attempts: u64 },
    Exhausted { attempts: u64 },
}

impl MineOutcome {
    pub fn nonce(&self) -> Option<u64> {
        match self {
            MineOutcome::Found { nonce, .. } => Some(*nonce),
            MineOutcome::Exhausted { .. } => None,
        }
    }

    pub fn attempts(&self) -> u64 {
        match self {
            MineOutcome::Found { attempts, .. } | MineOutcome::Exhausted { attempts } => *attempts,
        }
    }
}

/// True when the first `difficulty` characters of `hex_digest` are all `'0'`.
pub fn meets_difficulty(hex_digest: &str, difficulty: u32) -> bool {
    let required = difficulty as usize;
    hex_digest.len() >= required && hex_digest.bytes().take(required).all(|b| b == b'0')
}

/// Searches nonces 0, 1, 2, ... for the first one whose probe hash
/// `hash(reference ++ nonce ++ data)` meets `difficulty`.
///
/// The returned nonce is always the smallest qualifying one. `limit` caps the
/// number of candidates tried; with `None` the search only ends when a nonce is
/// found.
///
/// Two inputs can never succeed and are reported as `Exhausted` instead of
/// spinning: a difficulty longer than the digest, and an empty `data`, for
/// which the probe ignores the nonce so only candidate 0 is worth trying.
pub fn mine(difficulty: u32, reference: &Block, data: &str, limit: Option<u64>) -> MineOutcome {
    if difficulty as usize > HASH_HEX_SIZE {
        return MineOutcome::Exhausted { attempts: 0 };
    }

    let mut end = limit.unwrap_or(u64::MAX);
    if data.is_empty() {
        end = end.min(1);
    }

    let hasher = BlockHasher::new(reference);
    for nonce in 0..end {
        let digest = hasher.finish_with(&nonce.to_string(), data);
        if meets_difficulty(&digest, difficulty) {
            debug!(nonce, difficulty, digest = %digest, "nonce found");
            return MineOutcome::Found {
                nonce,
                attempts: nonce + 1,
            };
        }
    }
    MineOutcome::Exhausted { attempts: end }
}

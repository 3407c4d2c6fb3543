use crate::{
    error::{LedgerError, Result},
    hash::hash_block,
    mine::{mine, MineOutcome},
    Block,
};

/// Re-links and re-mines every block after genesis, in order.
///
/// Each block is linked to its already repaired predecessor and mined for its
/// current payload, so tampered payloads are kept and become part of a valid
/// chain. The input is left untouched; the repaired chain is returned with the
/// number of blocks whose link or nonce changed.
pub fn repair_chain(blocks: &[Block], limit: Option<u64>) -> Result<(Vec<Block>, usize)> {
    let mut repaired = blocks.to_vec();
    let mut changed = 0;

    for index in 1..repaired.len() {
        let (done, rest) = repaired.split_at_mut(index);
        let previous = &done[index - 1];
        let current = &mut rest[0];

        let previous_hash = hash_block(previous);
        let nonce = match mine(current.difficulty, previous, &current.data, limit) {
            MineOutcome::Found { nonce, .. } => nonce,
            MineOutcome::Exhausted { attempts } => {
                return Err(LedgerError::MiningExhausted { index, attempts })
            }
        };

        if current.previous_hash != previous_hash || current.nonce != nonce {
            changed += 1;
        }
        current.previous_hash = previous_hash;
        current.nonce = nonce;
    }

    Ok((repaired, changed))
}

use crate::{
    config::LedgerConfig,
    constants::{GENESIS_DATA, GENESIS_DIFFICULTY},
    document::{LedgerDocument, PartyIndex},
    error::{LedgerError, Result},
    hash::hash_block,
    mine::{mine, MineOutcome},
    repair::repair_chain,
    validate::{validate_chain, ValidationReport},
    Block,
};
use tracing::{info, warn};

/// Trait the storage backends implement to persist a ledger snapshot.
/// This lives in `ledger-core` to avoid a circular dependency.
pub trait LedgerStore: Send + Sync {
    /// Returns `None` when nothing has been saved yet.
    fn load(&self) -> anyhow::Result<Option<LedgerDocument>>;
    fn save(&self, document: &LedgerDocument) -> anyhow::Result<()>;
}

/// The fixed first block: no link, no parties, nonce 0, difficulty 2.
pub fn genesis_block() -> Block {
    Block::new("", "", "", GENESIS_DATA, 0, GENESIS_DIFFICULTY)
}

/// An in-memory chain together with its party indices.
///
/// Each block's `difficulty` field is the only record of its difficulty; the
/// list form written to documents is derived from it.
#[derive(Clone, Debug)]
pub struct Ledger {
    blocks: Vec<Block>,
    chain_hash: String,
    sender_map: PartyIndex,
    receiver_map: PartyIndex,
    /// Length of a loaded difficulty list that disagreed with the chain.
    /// Kept in step with appends until a repair resynchronises it.
    declared_difficulties: Option<usize>,
    config: LedgerConfig,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl Ledger {
    /// A fresh chain holding only the genesis block.
    pub fn new(config: LedgerConfig) -> Self {
        let genesis = genesis_block();
        Self {
            chain_hash: hash_block(&genesis),
            blocks: vec![genesis],
            sender_map: PartyIndex::new(),
            receiver_map: PartyIndex::new(),
            declared_difficulties: None,
            config,
        }
    }

    /// Rebuilds a ledger from a snapshot. The chain is accepted as is, broken
    /// or not; only an empty chain is refused.
    pub fn from_document(document: LedgerDocument, config: LedgerConfig) -> Result<Self> {
        if document.blocks.is_empty() {
            return Err(LedgerError::Load("blockchain holds no genesis block".into()));
        }

        let declared = document.difficulty_list.len();
        let declared_difficulties = if declared != document.blocks.len() {
            warn!(
                blocks = document.blocks.len(),
                declared, "difficulty list length differs from chain"
            );
            Some(declared)
        } else {
            let disagreeing = document
                .blocks
                .iter()
                .zip(&document.difficulty_list)
                .filter(|(block, listed)| block.difficulty != **listed)
                .count();
            if disagreeing > 0 {
                warn!(disagreeing, "difficulty list disagrees with blocks; using block values");
            }
            None
        };

        info!(blocks = document.blocks.len(), "ledger loaded");
        Ok(Self {
            blocks: document.blocks,
            chain_hash: document.chain_hash,
            sender_map: document.sender_map,
            receiver_map: document.receiver_map,
            declared_difficulties,
            config,
        })
    }

    /// Loads the stored snapshot, or starts a fresh chain and saves it.
    pub fn open<S: LedgerStore + ?Sized>(store: &S, config: LedgerConfig) -> anyhow::Result<Self> {
        match store.load()? {
            Some(document) => Ok(Self::from_document(document, config)?),
            None => {
                let ledger = Self::new(config);
                store.save(&ledger.to_document())?;
                Ok(ledger)
            }
        }
    }

    pub fn to_document(&self) -> LedgerDocument {
        LedgerDocument {
            difficulty_list: self.difficulty_list(),
            sender_map: self.sender_map.clone(),
            receiver_map: self.receiver_map.clone(),
            chain_hash: self.chain_hash.clone(),
            blocks: self.blocks.clone(),
        }
    }

    pub fn save_to<S: LedgerStore + ?Sized>(&self, store: &S) -> anyhow::Result<()> {
        store.save(&self.to_document())
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, index: usize) -> Result<&Block> {
        self.blocks.get(index).ok_or(LedgerError::IndexOutOfRange {
            index,
            len: self.blocks.len(),
        })
    }

    fn block_mut(&mut self, index: usize) -> Result<&mut Block> {
        let len = self.blocks.len();
        self.blocks
            .get_mut(index)
            .ok_or(LedgerError::IndexOutOfRange { index, len })
    }

    pub fn tip(&self) -> &Block {
        // from_document and new both guarantee a genesis block
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn chain_hash(&self) -> &str {
        &self.chain_hash
    }

    pub fn difficulty_list(&self) -> Vec<u32> {
        self.blocks.iter().map(|b| b.difficulty).collect()
    }

    pub fn is_desynchronised(&self) -> bool {
        self.declared_difficulties.is_some()
    }

    pub fn sender_map(&self) -> &PartyIndex {
        &self.sender_map
    }

    pub fn receiver_map(&self) -> &PartyIndex {
        &self.receiver_map
    }

    pub fn recipients_of(&self, sender: &str) -> &[String] {
        self.sender_map.get(sender).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn senders_of(&self, recipient: &str) -> &[String] {
        self.receiver_map
            .get(recipient)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Mines and appends a block linked to the current tip.
    pub fn add_transaction(&mut self, sender: &str, recipient: &str, data: &str) -> Result<&Block> {
        let index = self.blocks.len();
        let difficulty = self.config.difficulty;
        let max = self.config.max_difficulty;
        if difficulty > max {
            return Err(LedgerError::DifficultyOutOfRange { difficulty, max });
        }
        let tip = self.tip();

        let previous_hash = hash_block(tip);
        let nonce = match mine(difficulty, tip, data, self.config.max_iterations) {
            MineOutcome::Found { nonce, .. } => nonce,
            MineOutcome::Exhausted { attempts } => {
                warn!(index, attempts, "mining gave up");
                return Err(LedgerError::MiningExhausted { index, attempts });
            }
        };

        self.blocks.push(Block::new(
            previous_hash,
            sender,
            recipient,
            data,
            nonce,
            difficulty,
        ));
        if let Some(declared) = self.declared_difficulties.as_mut() {
            *declared += 1;
        }
        record_party(&mut self.sender_map, sender, recipient);
        record_party(&mut self.receiver_map, recipient, sender);

        info!(index, nonce, difficulty, "block appended");
        Ok(&self.blocks[index])
    }

    pub fn validate(&self) -> ValidationReport {
        match self.declared_difficulties {
            Some(difficulties) => ValidationReport::SizeMismatch {
                blocks: self.blocks.len(),
                difficulties,
            },
            None => validate_chain(&self.blocks, &self.difficulty_list()),
        }
    }

    /// Overwrites a block's payload and nothing else, leaving the chain broken
    /// until the next repair.
    pub fn corrupt(&mut self, index: usize, data: impl Into<String>) -> Result<()> {
        let block = self.block_mut(index)?;
        block.data = data.into();
        warn!(index, "block payload overwritten");
        Ok(())
    }

    /// Sets a block's difficulty without re-mining it.
    pub fn change_difficulty(&mut self, index: usize, difficulty: u32) -> Result<()> {
        let max = self.config.max_difficulty;
        if difficulty > max {
            return Err(LedgerError::DifficultyOutOfRange { difficulty, max });
        }
        self.block_mut(index)?.difficulty = difficulty;
        info!(index, difficulty, "block difficulty changed");
        Ok(())
    }

    /// Re-links and re-mines every block after genesis around its current
    /// payload. Nothing changes if a block cannot be mined within the
    /// configured cap. Returns how many blocks were rewritten.
    pub fn repair(&mut self) -> Result<usize> {
        let (blocks, changed) = repair_chain(&self.blocks, self.config.max_iterations)?;
        self.blocks = blocks;
        self.declared_difficulties = None;
        info!(changed, "chain repaired");
        Ok(changed)
    }
}

fn record_party(index: &mut PartyIndex, key: &str, counterparty: &str) {
    let parties = index.entry(key.to_owned()).or_default();
    if !parties.iter().any(|p| p == counterparty) {
        parties.push(counterparty.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_DIFFICULTY;
    use std::sync::Mutex;

    fn quick() -> LedgerConfig {
        LedgerConfig::default().with_difficulty(1)
    }

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Option<LedgerDocument>>,
    }

    impl LedgerStore for MemoryStore {
        fn load(&self) -> anyhow::Result<Option<LedgerDocument>> {
            Ok(self.saved.lock().unwrap().clone())
        }

        fn save(&self, document: &LedgerDocument) -> anyhow::Result<()> {
            *self.saved.lock().unwrap() = Some(document.clone());
            Ok(())
        }
    }

    #[test]
    fn genesis_ledger_example() {
        let ledger = Ledger::default();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.blocks()[0], genesis_block());
        assert_eq!(ledger.chain_hash(), hash_block(&genesis_block()));
        assert_eq!(ledger.difficulty_list(), vec![2]);
        assert!(ledger.sender_map().is_empty());
        assert!(ledger.validate().is_valid());
    }

    #[test]
    fn add_transaction_mines_at_configured_difficulty() {
        let mut ledger = Ledger::default();
        let block = ledger.add_transaction("alice", "bob", "hello").unwrap().clone();
        assert_eq!(block.nonce, 158);
        assert_eq!(block.difficulty, 2);
        assert_eq!(block.previous_hash, ledger.chain_hash());
        assert!(crate::meets_difficulty(
            &crate::hash_block_with(&ledger.blocks()[0], "158", "hello"),
            2
        ));
        assert!(ledger.validate().is_valid());
    }

    #[test]
    fn party_indices_dedupe_and_keep_order() {
        let mut ledger = Ledger::new(quick());
        ledger.add_transaction("alice", "bob", "1").unwrap();
        ledger.add_transaction("alice", "carol", "2").unwrap();
        ledger.add_transaction("alice", "bob", "3").unwrap();
        ledger.add_transaction("dave", "bob", "4").unwrap();

        assert_eq!(ledger.recipients_of("alice"), ["bob", "carol"]);
        assert_eq!(ledger.senders_of("bob"), ["alice", "dave"]);
        assert!(ledger.recipients_of("nobody").is_empty());
        assert_eq!(ledger.sender_map().len(), 2);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let mut ledger = Ledger::new(quick());
        assert!(matches!(
            ledger.corrupt(1, "x"),
            Err(LedgerError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(
            ledger.change_difficulty(5, 1),
            Err(LedgerError::IndexOutOfRange { index: 5, len: 1 })
        ));
        assert!(ledger.block(1).is_err());
    }

    #[test]
    fn difficulty_above_maximum_is_rejected() {
        let mut ledger = Ledger::new(quick());
        let err = ledger.change_difficulty(0, MAX_DIFFICULTY + 1).unwrap_err();
        assert!(matches!(err, LedgerError::DifficultyOutOfRange { .. }));
        assert_eq!(ledger.blocks()[0].difficulty, 2);
    }

    #[test]
    fn append_difficulty_above_maximum_is_rejected() {
        let mut ledger = Ledger::new(LedgerConfig::default().with_difficulty(40));
        let err = ledger.add_transaction("alice", "bob", "hello").unwrap_err();
        assert!(matches!(
            err,
            LedgerError::DifficultyOutOfRange {
                difficulty: 40,
                max: MAX_DIFFICULTY
            }
        ));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.sender_map().is_empty());
    }

    #[test]
    fn changed_difficulty_fails_until_repair() {
        let mut ledger = Ledger::new(quick());
        ledger.add_transaction("alice", "bob", "hello").unwrap();
        ledger.change_difficulty(1, 3).unwrap();
        assert_eq!(ledger.validate().invalid_indices(), vec![1]);

        ledger.repair().unwrap();
        assert!(ledger.validate().is_valid());
        assert_eq!(ledger.blocks()[1].nonce, 3979);
    }

    #[test]
    fn corrupting_genesis_breaks_its_successor() {
        let mut ledger = Ledger::new(quick());
        ledger.add_transaction("alice", "bob", "hello").unwrap();
        ledger.corrupt(0, "rewritten").unwrap();
        assert_eq!(ledger.validate().invalid_indices(), vec![1]);
        ledger.repair().unwrap();
        assert!(ledger.validate().is_valid());
        assert_eq!(ledger.blocks()[0].data, "rewritten");
    }

    #[test]
    fn capped_mining_leaves_ledger_untouched() {
        let config = LedgerConfig::default()
            .with_difficulty(6)
            .with_max_iterations(Some(5));
        let mut ledger = Ledger::new(config);
        let err = ledger.add_transaction("alice", "bob", "hello").unwrap_err();
        assert!(matches!(
            err,
            LedgerError::MiningExhausted {
                index: 1,
                attempts: 5
            }
        ));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.sender_map().is_empty());
    }

    #[test]
    fn failed_repair_keeps_previous_chain() {
        let mut ledger = Ledger::new(quick().with_max_iterations(Some(50)));
        ledger.add_transaction("alice", "bob", "hello").unwrap();
        ledger.corrupt(1, "forged").unwrap();
        ledger.change_difficulty(1, 8).unwrap();
        let before = ledger.blocks().to_vec();

        assert!(matches!(
            ledger.repair(),
            Err(LedgerError::MiningExhausted { index: 1, .. })
        ));
        assert_eq!(ledger.blocks(), before.as_slice());
    }

    #[test]
    fn desynchronised_list_reports_size_mismatch_until_repair() {
        let mut ledger = Ledger::new(quick());
        ledger.add_transaction("alice", "bob", "hello").unwrap();
        let mut document = ledger.to_document();
        document.difficulty_list.pop();

        let mut loaded = Ledger::from_document(document, quick()).unwrap();
        assert!(loaded.is_desynchronised());
        assert_eq!(
            loaded.validate(),
            ValidationReport::SizeMismatch {
                blocks: 2,
                difficulties: 1
            }
        );

        loaded.add_transaction("bob", "carol", "again").unwrap();
        assert_eq!(
            loaded.validate(),
            ValidationReport::SizeMismatch {
                blocks: 3,
                difficulties: 2
            }
        );

        assert_eq!(loaded.repair().unwrap(), 0);
        assert!(!loaded.is_desynchronised());
        assert!(loaded.validate().is_valid());
        assert_eq!(loaded.to_document().difficulty_list, vec![2, 1, 1]);
    }

    #[test]
    fn empty_chain_is_refused() {
        let mut document = Ledger::default().to_document();
        document.blocks.clear();
        document.difficulty_list.clear();
        assert!(matches!(
            Ledger::from_document(document, LedgerConfig::default()),
            Err(LedgerError::Load(_))
        ));
    }

    #[test]
    fn open_creates_and_persists_genesis() {
        let store = MemoryStore::default();
        let mut ledger = Ledger::open(&store, quick()).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(store.load().unwrap().is_some());

        ledger.add_transaction("alice", "bob", "hello").unwrap();
        ledger.save_to(&store).unwrap();

        let reopened = Ledger::open(&store, quick()).unwrap();
        assert_eq!(reopened.blocks(), ledger.blocks());
        assert_eq!(reopened.recipients_of("alice"), ["bob"]);
    }
}

use anyhow::{Context, Result};
use ledger_core::{LedgerDocument, LedgerStore};
use sled::{Db, IVec};
use std::path::Path;
use tracing::info;

const TREE_LEDGERS: &str = "ledgers";
const DEFAULT_LEDGER: &str = "default";

/// Ledger snapshots in a sled database, one bincode value per ledger name.
#[derive(Clone)]
pub struct SledStore {
  db: Db,
  name: String,
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let db = sled::open(path.as_ref())
      .with_context(|| format!("opening sled database at {}", path.as_ref().display()))?;
    info!("sled store opened");
    Ok(Self {
      db,
      name: DEFAULT_LEDGER.to_string(),
    })
  }

  /// The same database, addressing the snapshot stored under `name`.
  pub fn named(&self, name: &str) -> Self {
    Self {
      db: self.db.clone(),
      name: name.to_string(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  fn ledgers(&self) -> Result<sled::Tree> {
    self.db.open_tree(TREE_LEDGERS).context("open ledgers tree")
  }

  pub fn names(&self) -> Result<Vec<String>> {
    self
      .ledgers()?
      .iter()
      .keys()
      .map(|key| Ok(String::from_utf8_lossy(&key?).into_owned()))
      .collect()
  }

  pub fn remove(&self) -> Result<bool> {
    let removed = self.ledgers()?.remove(self.name.as_bytes())?.is_some();
    self.db.flush()?;
    Ok(removed)
  }

  pub fn clear(&self) -> Result<()> {
    self.ledgers()?.clear()?;
    self.db.flush()?;
    Ok(())
  }
}

impl LedgerStore for SledStore {
  fn load(&self) -> Result<Option<LedgerDocument>> {
    let tree = self.ledgers()?;
    let opt = tree.get(self.name.as_bytes())?;
    opt
      .map(|ivec: IVec| {
        bincode::deserialize(&ivec)
          .with_context(|| format!("decoding ledger snapshot '{}'", self.name))
      })
      .transpose()
  }

  fn save(&self, document: &LedgerDocument) -> Result<()> {
    let tree = self.ledgers()?;
    let bytes = bincode::serialize(document)?;
    tree.insert(self.name.as_bytes(), bytes)?;
    self.db.flush()?;
    info!(ledger = %self.name, blocks = document.blocks.len(), "snapshot saved");
    Ok(())
  }
}

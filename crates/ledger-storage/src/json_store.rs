use anyhow::{Context, Result};
use ledger_core::{LedgerDocument, LedgerStore};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// A ledger kept as one pretty-printed JSON document on disk.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Option<LedgerDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let document = LedgerDocument::from_json_str(&contents)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        info!(path = %self.path.display(), blocks = document.blocks.len(), "ledger file read");
        Ok(Some(document))
    }

    fn save(&self, document: &LedgerDocument) -> Result<()> {
        let json = document.to_json_pretty()?;
        fs::write(&self.path, json)
            .with_context(|| format!("could not open file for writing to: {}", self.path.display()))?;
        info!(path = %self.path.display(), "ledger file written");
        Ok(())
    }
}

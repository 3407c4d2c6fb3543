use std::fs;

use ledger_core::{Ledger, LedgerConfig};
use ledger_storage::sled_store::SledStore;
use tempfile::{tempdir, TempDir};

pub fn create_temp_dir() -> (TempDir, std::path::PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().to_path_buf();
    (temp_dir, db_path)
}

pub fn create_temp_store() -> (TempDir, SledStore) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("sled");
    (
        temp_dir,
        SledStore::open(&db_path).expect("Failed to open SledStore"),
    )
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let db_path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Database directory should be removed");
}

/// A difficulty-1 ledger with `n` mined transactions.
pub fn sample_ledger(n: usize) -> Ledger {
    let mut ledger = Ledger::new(LedgerConfig::default().with_difficulty(1));
    for i in 0..n {
        ledger
            .add_transaction(&format!("user-{}", i % 3), &format!("user-{}", (i + 1) % 3), &format!("payment {i}"))
            .expect("mine");
    }
    ledger
}

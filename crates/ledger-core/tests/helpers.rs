use ledger_core::{Ledger, LedgerConfig};

/// Builds a ledger with one mined block per payload.
pub fn ledger_with(payloads: &[&str], difficulty: u32) -> Ledger {
    let mut ledger = Ledger::new(LedgerConfig::default().with_difficulty(difficulty));
    for (i, data) in payloads.iter().enumerate() {
        let sender = format!("sender-{}", i % 2);
        let recipient = format!("recipient-{}", i % 3);
        ledger
            .add_transaction(&sender, &recipient, data)
            .expect("mining at low difficulty always succeeds");
    }
    ledger
}

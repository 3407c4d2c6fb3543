pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Payload of the fixed first block.
pub const GENESIS_DATA: &str = "Leeroy Jenkins";
pub const GENESIS_DIFFICULTY: u32 = 2;

/// Difficulty used when appending transactions.
pub const DEFAULT_DIFFICULTY: u32 = 2;
/// Highest difficulty an operator may assign to a block.
pub const MAX_DIFFICULTY: u32 = 8;

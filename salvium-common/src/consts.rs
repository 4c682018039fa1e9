//! Protocol constants shared across the wallet crates.
//!
//! Values follow the Salvium daemon's cryptonote_config; anything that varies
//! per network is exposed as a function over [`Network`](crate::Network).

use crate::Network;

/// Ring size for all post-fork-1 transactions (1 real + 10 decoys).
pub const RING_SIZE: usize = 11;

/// Number of decoys fetched per input.
pub const DECOYS_PER_RING: usize = RING_SIZE - 1;

/// Target seconds between blocks (v2 chains).
pub const DIFFICULTY_TARGET_V2: u64 = 120;

/// Blocks contributing to the difficulty calculation.
pub const DIFFICULTY_WINDOW: usize = 720;

/// Outliers trimmed from each end of the sorted timestamp window.
pub const DIFFICULTY_CUT: usize = 60;

/// Median window for block timestamp validation.
pub const BLOCKCHAIN_TIMESTAMP_CHECK_WINDOW: usize = 60;

/// Maximum seconds a block timestamp may run ahead of local time.
pub const BLOCK_FUTURE_TIME_LIMIT: u64 = 7200;

/// Seconds an alt-block is kept around before pruning.
pub const MEMPOOL_TX_FROM_ALT_BLOCK_LIVETIME: u64 = 604_800;

/// Confirmations before a non-coinbase output is spendable.
pub const DEFAULT_TX_SPENDABLE_AGE: u64 = 10;

/// Confirmations before a coinbase output is spendable.
pub const COINBASE_UNLOCK_WINDOW: u64 = 60;

/// Upper bound on the serialized transaction weight accepted by the network.
pub const MAX_TX_WEIGHT: usize = 149_400;

/// Input cap for sweeps so the result stays under [`MAX_TX_WEIGHT`].
pub const SWEEP_MAX_INPUTS: usize = 60;

/// Subaddress lookahead grid: major (account) axis.
pub const MAJOR_LOOKAHEAD: u32 = 50;

/// Subaddress lookahead grid: minor (address) axis.
pub const MINOR_LOOKAHEAD: u32 = 200;

/// Fee quantization mask (fees round up to a multiple of this).
pub const FEE_QUANTIZATION_MASK: u64 = 10_000;

/// Base fee per byte of transaction weight, in atomic units.
pub const FEE_PER_BYTE: u64 = 3_000;

/// The identity commitment mask used by coinbase outputs: scalar one.
pub const IDENTITY_MASK: [u8; 32] = [
    0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0,
];

/// Blocks a STAKE output stays locked after inclusion.
pub fn stake_lock_period(network: Network) -> u64 {
    match network {
        Network::Mainnet => 21_600,
        Network::Testnet | Network::Stagenet => 1_440,
    }
}

/// Asset tag for the original chain asset (pre hard fork 6).
pub const ASSET_SAL: &str = "SAL";

/// Asset tag for the rebased chain asset (hard fork 6 onward).
pub const ASSET_SAL1: &str = "SAL1";

/// Sentinel destination asset for burn transactions.
pub const ASSET_BURN: &str = "BURN";

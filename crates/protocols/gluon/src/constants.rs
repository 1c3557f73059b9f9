//! Gluon Protocol Constants
//!
//! Fixed-point parameters of the on-chain Gluon contract. All ratios are
//! expressed over [`PRECISION`].

/// Fixed-point denominator for ratios, prices and decay terms
pub const PRECISION: i64 = 1_000_000_000;

/// Upper bound of the fusion ratio (q*, 66%)
pub const QSTAR: i64 = 660_000_000;

/// Base transmutation fee (0.5%)
pub const PHI0: i64 = 5_000_000;

/// Volume sensitivity of the transmutation fee
pub const PHI1: i64 = 500_000_000;

/// Fission levy (0.1%)
pub const FISSION_LEVY: i64 = 1_000_000;

/// Fusion levy (0.5%)
pub const FUSION_LEVY: i64 = 5_000_000;

/// nanoERG permanently locked in the Gluon box and excluded from fissioned ERG
pub const RESERVE_BUFFER: i64 = 1_000_000;

/// Blocks in one volume epoch (one day at two-minute blocks)
pub const BLOCKS_PER_DAY: u64 = 720;

/// Number of daily volume buckets kept in R7 and R8
pub const BUCKET_LEN: usize = 14;

/// Gluon box register layout
pub mod registers {
    /// Total supply `[neutrons, protons]`
    pub const TOTAL_SUPPLY: &str = "R4";
    /// Dev fee ErgoTree bytes
    pub const DEV_TREE: &str = "R5";
    /// Dev fee accounting `(repaid, max)`
    pub const FEES: &str = "R6";
    /// Daily ERG volume, protons to neutrons
    pub const VOLUME_TO_NEUTRONS: &str = "R7";
    /// Daily ERG volume, neutrons to protons
    pub const VOLUME_TO_PROTONS: &str = "R8";
    /// Height anchor of bucket 0
    pub const LAST_EPOCH: &str = "R9";
    /// Oracle pool price per kilogram of gold
    pub const ORACLE_PRICE: &str = "R4";
}

/// Context extension the buyback box expects when spent by a transmutation
pub mod buyback {
    /// Context variable id carrying the action selector
    pub const ACTION_VAR: &str = "0";
    /// Top-up action (Sigma Int 1)
    pub const TOPUP_ACTION: i32 = 1;
}

//! Gluon Protocol Implementation
//!
//! This crate implements the off-chain side of the Gluon Gold reserve
//! protocol on Ergo.
//!
//! # Protocol Overview
//!
//! Gluon splits ERG held in a singleton reserve box into two tokens:
//! - Neutrons (GAU): pegged to one gram of gold via the gold oracle pool
//! - Protons (GAUC): leveraged claim on the remaining reserve
//!
//! Fission deposits ERG for both tokens, fusion burns both to redeem ERG, and
//! transmutations convert one token into the other for a volume-dependent fee.
//!
//! # Features
//!
//! - Typed decoding of the Gluon box and the gold oracle box
//! - Fusion ratio, token prices and the 14-day rolling volume fee term
//! - Decaying dev fee plus UI and oracle fees
//! - Balanced transaction building for all four operations
//!
//! # Example
//!
//! ```ignore
//! use gluon::GluonProtocol;
//!
//! let protocol = GluonProtocol::new(config, Arc::new(node_client))?;
//! let snapshot = protocol.fetch_snapshot().await?;
//! let plan = protocol.fission(&snapshot, 1_000_000_000, user_boxes)?;
//! println!("{}", plan.to_eip12().to_json_pretty()?);
//! ```

pub mod calculator;
pub mod constants;
pub mod fees;
pub mod protocol;
pub mod ratio;
pub mod state;
pub mod tx_builder;
pub mod volume;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use calculator::{TokenAmounts, TransmuteQuote};
pub use fees::{FeeBreakdown, FeeKind, FeeOutputSpec, FeePercentages};
pub use protocol::{FeeQuote, GluonOperation, GluonProtocol, GluonSnapshot};
pub use state::{DevFeeLedger, FieldDeltas, GluonBox, GoldOracleBox, TokenDeltas};
pub use volume::{EpochUpdate, VolumeBuckets};

//! ergo-tx: Transaction building utilities for Ergo
//!
//! Provides EIP-12 transaction structures, Sigma register encoding, and the
//! balanced transaction assembler.

pub mod assembler;
pub mod eip12;
pub mod sigma;

#[cfg(feature = "ergo-lib")]
pub mod address;
#[cfg(feature = "ergo-lib")]
pub use address::{address_to_ergo_tree, ergo_tree_to_address, AddressError};

pub use assembler::{build_transaction, check_conservation, compute_change, TransactionPlan};
pub use eip12::*;
pub use sigma::*;

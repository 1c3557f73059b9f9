//! Configuration types for the Gluon toolkit
//!
//! Everything the engine needs from the outside world: where the node lives,
//! which singleton boxes and tokens make up the protocol, and the fee schedule.

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_BOX_VALUE_NANO, TX_FEE_NANO};
use crate::{Error, Network, Result};

/// Mainnet Gluon Gold reserve NFT
pub const MAINNET_GLUON_NFT: &str =
    "797e331df22c5cfd0aae654703ebc12dcbcba99b80d32e2b7e151eac2d27b6fa";

/// Mainnet gold oracle pool NFT (nanoERG per kg of gold)
pub const MAINNET_GOLD_ORACLE_POOL_NFT: &str =
    "3c45f29a5165b030fdb5eaf5d81f8108f9d8f507b31487dd51f4ae08fe07cf4a";

/// Denominator for every fee rate (rates are expressed per 100_000)
pub const FEE_DENOMINATOR: i64 = 100_000;

/// Node connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node URL (e.g., "http://127.0.0.1:9053")
    pub url: String,

    /// API key for authenticated endpoints (optional)
    #[serde(default)]
    pub api_key: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9053".to_string(),
            api_key: String::new(),
        }
    }
}

/// Token and NFT ids identifying the protocol boxes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GluonIds {
    /// Singleton NFT of the reserve (Gluon) box
    pub gluon_nft: String,
    /// Neutron (gold-pegged) token id
    pub neutron_token: String,
    /// Proton (volatile) token id
    pub proton_token: String,
    /// Gold oracle pool NFT
    pub oracle_pool_nft: String,
    /// Oracle buyback box NFT, spent by transmutations
    pub oracle_buyback_nft: String,
}

impl GluonIds {
    /// Known mainnet ids. Token ids are not bundled and must be supplied.
    pub fn mainnet() -> Self {
        Self {
            gluon_nft: MAINNET_GLUON_NFT.to_string(),
            oracle_pool_nft: MAINNET_GOLD_ORACLE_POOL_NFT.to_string(),
            ..Self::default()
        }
    }
}

/// Fee rates (per [`FEE_DENOMINATOR`]) and their destinations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default)]
    pub dev_fee_num: i64,
    #[serde(default)]
    pub ui_fee_num: i64,
    #[serde(default)]
    pub oracle_fee_num: i64,

    /// Dev fee ErgoTree; the reserve box's R5 script is used when unset
    #[serde(default)]
    pub dev_fee_tree: Option<String>,
    #[serde(default)]
    pub ui_fee_tree: String,
    #[serde(default)]
    pub oracle_fee_tree: String,

    /// Minimum value of every created box, added on top of each fee
    #[serde(default = "default_min_box_value")]
    pub min_box_value: i64,

    #[serde(default = "default_miner_fee")]
    pub miner_fee: i64,
}

fn default_min_box_value() -> i64 {
    MIN_BOX_VALUE_NANO
}

fn default_miner_fee() -> i64 {
    TX_FEE_NANO
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            dev_fee_num: 0,
            ui_fee_num: 0,
            oracle_fee_num: 0,
            dev_fee_tree: None,
            ui_fee_tree: String::new(),
            oracle_fee_tree: String::new(),
            min_box_value: default_min_box_value(),
            miner_fee: default_miner_fee(),
        }
    }
}

/// Complete toolkit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GluonConfig {
    pub node: NodeConfig,

    pub network: Network,

    pub ids: GluonIds,

    #[serde(default)]
    pub fees: FeeSchedule,
}

impl Default for GluonConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            network: Network::Mainnet,
            ids: GluonIds::mainnet(),
            fees: FeeSchedule::default(),
        }
    }
}

impl GluonConfig {
    /// Check that every required field is present and every rate is sane.
    ///
    /// Returns the first problem found as [`Error::Config`].
    pub fn validate(&self) -> Result<()> {
        if self.node.url.trim().is_empty() {
            return Err(Error::Config("node.url is not set".to_string()));
        }

        let ids = [
            ("ids.gluon_nft", &self.ids.gluon_nft),
            ("ids.neutron_token", &self.ids.neutron_token),
            ("ids.proton_token", &self.ids.proton_token),
            ("ids.oracle_pool_nft", &self.ids.oracle_pool_nft),
            ("ids.oracle_buyback_nft", &self.ids.oracle_buyback_nft),
        ];
        for (field, value) in ids {
            check_id(field, value)?;
        }

        let rates = [
            ("fees.dev_fee_num", self.fees.dev_fee_num),
            ("fees.ui_fee_num", self.fees.ui_fee_num),
            ("fees.oracle_fee_num", self.fees.oracle_fee_num),
        ];
        for (field, rate) in rates {
            if !(0..=FEE_DENOMINATOR).contains(&rate) {
                return Err(Error::Config(format!(
                    "{} must be within 0..={}, got {}",
                    field, FEE_DENOMINATOR, rate
                )));
            }
        }

        if self.fees.ui_fee_num > 0 && self.fees.ui_fee_tree.is_empty() {
            return Err(Error::Config(
                "fees.ui_fee_tree is required when ui_fee_num > 0".to_string(),
            ));
        }
        if self.fees.oracle_fee_num > 0 && self.fees.oracle_fee_tree.is_empty() {
            return Err(Error::Config(
                "fees.oracle_fee_tree is required when oracle_fee_num > 0".to_string(),
            ));
        }
        if self.fees.min_box_value <= 0 || self.fees.miner_fee <= 0 {
            return Err(Error::Config(
                "fees.min_box_value and fees.miner_fee must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_id(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Config(format!("{} is not set", field)));
    }
    match hex::decode(value) {
        Ok(bytes) if bytes.len() == 32 => Ok(()),
        _ => Err(Error::Config(format!(
            "{} must be a 32-byte hex id, got {}",
            field, value
        ))),
    }
}

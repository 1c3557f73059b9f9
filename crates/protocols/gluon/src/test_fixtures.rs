//! Shared box fixtures for unit tests

use std::collections::HashMap;

use ergo_tx::{
    encode_sigma_coll_byte, encode_sigma_coll_long, encode_sigma_long, encode_sigma_long_pair,
    Eip12Asset, Eip12InputBox,
};
use gluon_core::{FeeSchedule, GluonIds};

pub const GLUON_NFT: &str = gluon_core::MAINNET_GLUON_NFT;
pub const NEUTRON_ID: &str = "1111111111111111111111111111111111111111111111111111111111111111";
pub const PROTON_ID: &str = "2222222222222222222222222222222222222222222222222222222222222222";
pub const ORACLE_NFT: &str = "3333333333333333333333333333333333333333333333333333333333333333";
pub const BUYBACK_NFT: &str = "4444444444444444444444444444444444444444444444444444444444444444";
pub const USER_TOKEN: &str = "5555555555555555555555555555555555555555555555555555555555555555";

pub const GLUON_TREE: &str = "101f0400d801d601b2a5730000";
pub const BUYBACK_TREE: &str = "1005040004000e20aa";
pub const DEV_TREE: &str = "0008cd0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
pub const USER_TREE: &str = "0008cd03c6a4d1e3a1b9b6f6a4e1a0b5c9d8e7f6a5b4c3d2e1f0a9b8c7d6e5f4a3b2c1d0";
pub const UI_TREE: &str = "0008cd02aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const ORACLE_FEE_TREE: &str = "0008cd02bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

pub const NEUTRON_SUPPLY: i64 = 100_000_000_000_000_000;
pub const PROTON_SUPPLY: i64 = 100_000_000_000_000_000;

/// 1 ERG per gram of gold
pub const ORACLE_PRICE_PER_KG: i64 = 1_000_000_000_000;

pub const FIXTURE_EPOCH: i64 = 1_440_000;

pub fn ids() -> GluonIds {
    GluonIds {
        gluon_nft: GLUON_NFT.to_string(),
        neutron_token: NEUTRON_ID.to_string(),
        proton_token: PROTON_ID.to_string(),
        oracle_pool_nft: ORACLE_NFT.to_string(),
        oracle_buyback_nft: BUYBACK_NFT.to_string(),
    }
}

/// 0.3% dev, 0.2% ui, 0.1% oracle
pub fn fee_schedule() -> FeeSchedule {
    FeeSchedule {
        dev_fee_num: 300,
        ui_fee_num: 200,
        oracle_fee_num: 100,
        dev_fee_tree: None,
        ui_fee_tree: UI_TREE.to_string(),
        oracle_fee_tree: ORACLE_FEE_TREE.to_string(),
        ..FeeSchedule::default()
    }
}

/// Knobs for a Gluon box fixture; the default has 999 ERG fissioned and
/// 500_000_000_000 of each token circulating
#[derive(Debug, Clone)]
pub struct GluonFixture {
    pub value: i64,
    pub neutrons_in_box: i64,
    pub protons_in_box: i64,
    pub repaid: i64,
    pub max_fee: i64,
    pub volume_to_neutrons: [i64; 14],
    pub volume_to_protons: [i64; 14],
    pub last_epoch: i64,
}

impl Default for GluonFixture {
    fn default() -> Self {
        Self {
            value: 999_000_000_000 + 1_000_000,
            neutrons_in_box: NEUTRON_SUPPLY - 500_000_000_000,
            protons_in_box: PROTON_SUPPLY - 500_000_000_000,
            repaid: 0,
            max_fee: 1_000_000_000,
            volume_to_neutrons: [0; 14],
            volume_to_protons: [0; 14],
            last_epoch: FIXTURE_EPOCH,
        }
    }
}

pub fn gluon_input(f: GluonFixture) -> Eip12InputBox {
    let mut registers = HashMap::new();
    registers.insert(
        "R4".to_string(),
        encode_sigma_coll_long(&[NEUTRON_SUPPLY, PROTON_SUPPLY]),
    );
    registers.insert(
        "R5".to_string(),
        encode_sigma_coll_byte(&hex::decode(DEV_TREE).unwrap()),
    );
    registers.insert(
        "R6".to_string(),
        encode_sigma_long_pair(f.repaid, f.max_fee),
    );
    registers.insert("R7".to_string(), encode_sigma_coll_long(&f.volume_to_neutrons));
    registers.insert("R8".to_string(), encode_sigma_coll_long(&f.volume_to_protons));
    registers.insert("R9".to_string(), encode_sigma_long(f.last_epoch));

    Eip12InputBox {
        box_id: "gluon_box".to_string(),
        transaction_id: "gluon_tx".to_string(),
        index: 0,
        value: f.value.to_string(),
        ergo_tree: GLUON_TREE.to_string(),
        assets: vec![
            Eip12Asset::new(GLUON_NFT, 1),
            Eip12Asset::new(NEUTRON_ID, f.neutrons_in_box),
            Eip12Asset::new(PROTON_ID, f.protons_in_box),
        ],
        creation_height: 1_440_100,
        additional_registers: registers,
        extension: HashMap::new(),
    }
}

pub fn oracle_input(price_per_kg: i64) -> Eip12InputBox {
    let mut registers = HashMap::new();
    registers.insert("R4".to_string(), encode_sigma_long(price_per_kg));
    registers.insert("R5".to_string(), ergo_tx::encode_sigma_int(1_440_500));

    Eip12InputBox {
        box_id: "oracle_box".to_string(),
        transaction_id: "oracle_tx".to_string(),
        index: 0,
        value: "5000000".to_string(),
        ergo_tree: "100a0400".to_string(),
        assets: vec![Eip12Asset::new(ORACLE_NFT, 1)],
        creation_height: 1_440_500,
        additional_registers: registers,
        extension: HashMap::new(),
    }
}

pub fn buyback_input() -> Eip12InputBox {
    Eip12InputBox {
        box_id: "buyback_box".to_string(),
        transaction_id: "buyback_tx".to_string(),
        index: 2,
        value: "50000000".to_string(),
        ergo_tree: BUYBACK_TREE.to_string(),
        assets: vec![Eip12Asset::new(BUYBACK_NFT, 1)],
        creation_height: 1_440_300,
        additional_registers: HashMap::new(),
        extension: HashMap::new(),
    }
}

pub fn user_input(id: &str, value: i64, assets: Vec<Eip12Asset>) -> Eip12InputBox {
    Eip12InputBox {
        box_id: id.to_string(),
        transaction_id: format!("{}_tx", id),
        index: 1,
        value: value.to_string(),
        ergo_tree: USER_TREE.to_string(),
        assets,
        creation_height: 1_440_200,
        additional_registers: HashMap::new(),
        extension: HashMap::new(),
    }
}

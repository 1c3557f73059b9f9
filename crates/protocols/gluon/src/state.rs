//! Gluon State Parsing
//!
//! Typed, validated views of the Gluon reserve box and the gold oracle pool
//! box. Boxes are decoded once per call; successors are derived with
//! [`GluonBox::with_delta`] and never mutate the source record.

use std::collections::HashMap;

use ergo_tx::{
    decode_sigma_coll_byte, decode_sigma_int_or_long, decode_sigma_long_list,
    encode_sigma_long, encode_sigma_long_pair, Eip12Asset, Eip12DataInputBox, Eip12InputBox,
    Eip12Output,
};
use gluon_core::{BlockHeight, GluonIds, Network, ProtocolError, TxError};
use serde::{Deserialize, Serialize};

use crate::constants::{registers, RESERVE_BUFFER};
use crate::volume::{EpochUpdate, VolumeBuckets};

/// Dev fee accounting kept in R6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevFeeLedger {
    /// nanoERG of dev fee paid so far
    pub repaid: i64,
    /// Total dev fee after which the fee decays to zero
    pub max: i64,
}

/// Token amount changes applied to the Gluon box (positive = into the box)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenDeltas {
    pub neutrons: i64,
    pub protons: i64,
}

/// Non-token changes applied to the Gluon box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldDeltas {
    /// nanoERG change of the box value (positive = into the box)
    pub value: i64,
    /// Dev fee paid by this transaction, added to R6 repaid
    pub dev_fee_repaid: i64,
    /// New volume buckets and anchor (transmutations only)
    pub epoch: Option<EpochUpdate>,
}

/// Decoded Gluon reserve box
#[derive(Debug, Clone)]
pub struct GluonBox {
    source: Eip12InputBox,
    neutron_token: String,
    proton_token: String,
    value: i64,
    neutrons: i64,
    protons: i64,
    total_supply: (i64, i64),
    dev_tree: String,
    fees: DevFeeLedger,
    volume_to_neutrons: VolumeBuckets,
    volume_to_protons: VolumeBuckets,
    last_epoch: BlockHeight,
}

impl GluonBox {
    /// Decode and validate a Gluon box.
    ///
    /// Fails with [`ProtocolError::BoxParseError`] if the NFT or a token is
    /// missing, a register is absent or malformed, a volume register does not
    /// hold 14 buckets, a circulating supply is negative, or the box holds no
    /// fissioned ERG.
    pub fn from_input(input: Eip12InputBox, ids: &GluonIds) -> Result<Self, ProtocolError> {
        if amount_of(&input, &ids.gluon_nft)? != 1 {
            return Err(parse_error(format!(
                "Box {} does not hold the Gluon NFT",
                input.box_id
            )));
        }

        let value = input.value_nano().map_err(tx_parse_error)?;
        let neutrons = held_token(&input, &ids.neutron_token, "neutron")?;
        let protons = held_token(&input, &ids.proton_token, "proton")?;

        let supply = decode_sigma_long_list(register(&input, registers::TOTAL_SUPPLY)?)
            .map_err(|e| parse_error(format!("Failed to parse R4 (total supply): {}", e)))?;
        let total_supply = as_pair(&supply, "R4 (total supply)")?;

        let dev_tree = decode_sigma_coll_byte(register(&input, registers::DEV_TREE)?)
            .map(hex::encode)
            .map_err(|e| parse_error(format!("Failed to parse R5 (dev tree): {}", e)))?;

        let fee_values = decode_sigma_long_list(register(&input, registers::FEES)?)
            .map_err(|e| parse_error(format!("Failed to parse R6 (fees): {}", e)))?;
        let (repaid, max) = as_pair(&fee_values, "R6 (fees)")?;

        let volume_to_neutrons = decode_volume(&input, registers::VOLUME_TO_NEUTRONS)?;
        let volume_to_protons = decode_volume(&input, registers::VOLUME_TO_PROTONS)?;

        let last_epoch = decode_sigma_int_or_long(register(&input, registers::LAST_EPOCH)?)
            .map_err(|e| parse_error(format!("Failed to parse R9 (last epoch): {}", e)))?;
        let last_epoch = BlockHeight::try_from(last_epoch)
            .map_err(|_| parse_error(format!("Negative R9 (last epoch): {}", last_epoch)))?;

        for asset in &input.assets {
            if asset.token_id != ids.gluon_nft
                && asset.token_id != ids.neutron_token
                && asset.token_id != ids.proton_token
            {
                tracing::warn!(
                    box_id = %input.box_id,
                    token_id = %asset.token_id,
                    "Unexpected token in Gluon box, preserving it"
                );
            }
        }

        let gluon = Self {
            neutron_token: ids.neutron_token.clone(),
            proton_token: ids.proton_token.clone(),
            value,
            neutrons,
            protons,
            total_supply,
            dev_tree,
            fees: DevFeeLedger { repaid, max },
            volume_to_neutrons,
            volume_to_protons,
            last_epoch,
            source: input,
        };
        gluon.validate()?;
        Ok(gluon)
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        if self.circulating_neutrons() < 0 || self.circulating_protons() < 0 {
            return Err(parse_error(format!(
                "Box {} holds more tokens than R4 total supply",
                self.source.box_id
            )));
        }
        if self.fissioned_erg() <= 0 {
            return Err(parse_error(format!(
                "Box {} holds no fissioned ERG (value {})",
                self.source.box_id, self.value
            )));
        }
        if self.fees.repaid < 0 || self.fees.max < 0 {
            return Err(parse_error(format!(
                "Box {} has negative fee accounting in R6",
                self.source.box_id
            )));
        }
        Ok(())
    }

    pub fn box_id(&self) -> &str {
        &self.source.box_id
    }

    /// The spendable record this view was decoded from
    pub fn input(&self) -> &Eip12InputBox {
        &self.source
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn ergo_tree(&self) -> &str {
        &self.source.ergo_tree
    }

    /// Neutrons held by the box (not yet issued)
    pub fn neutrons(&self) -> i64 {
        self.neutrons
    }

    /// Protons held by the box (not yet issued)
    pub fn protons(&self) -> i64 {
        self.protons
    }

    /// R4 `[neutrons, protons]`
    pub fn total_supply(&self) -> (i64, i64) {
        self.total_supply
    }

    pub fn circulating_neutrons(&self) -> i64 {
        self.total_supply.0 - self.neutrons
    }

    pub fn circulating_protons(&self) -> i64 {
        self.total_supply.1 - self.protons
    }

    /// Box value minus the locked reserve buffer
    pub fn fissioned_erg(&self) -> i64 {
        self.value - RESERVE_BUFFER
    }

    /// Dev fee ErgoTree (hex) from R5
    pub fn dev_tree(&self) -> &str {
        &self.dev_tree
    }

    /// R5 rendered as an address
    pub fn dev_fee_address(&self, network: Network) -> Result<String, ProtocolError> {
        ergo_tx::ergo_tree_to_address(&self.dev_tree, network).map_err(|e| {
            ProtocolError::BoxParseError {
                message: format!("R5 is not a valid ErgoTree: {}", e),
            }
        })
    }

    pub fn fees(&self) -> DevFeeLedger {
        self.fees
    }

    /// R7
    pub fn volume_protons_to_neutrons(&self) -> &VolumeBuckets {
        &self.volume_to_neutrons
    }

    /// R8
    pub fn volume_neutrons_to_protons(&self) -> &VolumeBuckets {
        &self.volume_to_protons
    }

    /// R9, the height anchoring bucket 0
    pub fn last_epoch_height(&self) -> BlockHeight {
        self.last_epoch
    }

    /// ERG volume transmuted from protons to neutrons over the last `days` days
    pub fn accumulate_protons_to_neutrons(&self, days: usize) -> Result<i64, ProtocolError> {
        self.volume_to_neutrons.accumulate(days)
    }

    /// ERG volume transmuted from neutrons to protons over the last `days` days
    pub fn accumulate_neutrons_to_protons(&self, days: usize) -> Result<i64, ProtocolError> {
        self.volume_to_protons.accumulate(days)
    }

    /// Derive the successor record.
    ///
    /// R6 is always rewritten as a `(Long, Long)` tuple; R7, R8 and R9 only
    /// when `fields.epoch` is set. Asset order, the script and all other
    /// registers are preserved.
    pub fn with_delta(
        &self,
        tokens: TokenDeltas,
        fields: FieldDeltas,
    ) -> Result<Self, ProtocolError> {
        let neutrons = checked_add(self.neutrons, tokens.neutrons, "neutrons")?;
        let protons = checked_add(self.protons, tokens.protons, "protons")?;
        let value = checked_add(self.value, fields.value, "value")?;
        let repaid = checked_add(self.fees.repaid, fields.dev_fee_repaid, "repaid fee")?;

        if neutrons < 0 || protons < 0 {
            return Err(ProtocolError::InvalidAmount {
                message: format!(
                    "Gluon box cannot supply the tokens (neutrons {}, protons {})",
                    neutrons, protons
                ),
            });
        }
        if neutrons > self.total_supply.0 || protons > self.total_supply.1 {
            return Err(ProtocolError::InvalidAmount {
                message: "Gluon box would hold more tokens than the total supply".to_string(),
            });
        }
        if value <= RESERVE_BUFFER {
            return Err(ProtocolError::InvalidAmount {
                message: format!("Gluon box value {} would fall to the reserve buffer", value),
            });
        }

        let mut source = self.source.clone();
        source.value = value.to_string();
        for asset in source.assets.iter_mut() {
            if asset.token_id == self.neutron_token {
                *asset = Eip12Asset::new(asset.token_id.clone(), neutrons);
            } else if asset.token_id == self.proton_token {
                *asset = Eip12Asset::new(asset.token_id.clone(), protons);
            }
        }

        let fees = DevFeeLedger {
            repaid,
            max: self.fees.max,
        };
        source.additional_registers.insert(
            registers::FEES.to_string(),
            encode_sigma_long_pair(fees.repaid, fees.max),
        );

        let mut successor = Self {
            source,
            value,
            neutrons,
            protons,
            fees,
            ..self.clone()
        };

        if let Some(epoch) = fields.epoch {
            let regs = &mut successor.source.additional_registers;
            regs.insert(
                registers::VOLUME_TO_NEUTRONS.to_string(),
                epoch.protons_to_neutrons.to_register(),
            );
            regs.insert(
                registers::VOLUME_TO_PROTONS.to_string(),
                epoch.neutrons_to_protons.to_register(),
            );
            regs.insert(
                registers::LAST_EPOCH.to_string(),
                encode_sigma_long(clamp_height(epoch.anchor)),
            );
            successor.volume_to_neutrons = epoch.protons_to_neutrons;
            successor.volume_to_protons = epoch.neutrons_to_protons;
            successor.last_epoch = epoch.anchor;
        }

        Ok(successor)
    }

    /// Output candidate recreating this record (creation height set at assembly)
    pub fn to_output(&self) -> Eip12Output {
        Eip12Output {
            value: self.value.to_string(),
            ergo_tree: self.source.ergo_tree.clone(),
            assets: self.source.assets.clone(),
            creation_height: 0,
            additional_registers: self.source.additional_registers.clone(),
            extension: HashMap::new(),
        }
    }
}

/// Decoded gold oracle pool box
#[derive(Debug, Clone)]
pub struct GoldOracleBox {
    source: Eip12InputBox,
    price_per_kg: i64,
}

impl GoldOracleBox {
    /// Decode the oracle pool box; R4 is nanoERG per kilogram of gold
    pub fn from_input(input: Eip12InputBox, ids: &GluonIds) -> Result<Self, ProtocolError> {
        if amount_of(&input, &ids.oracle_pool_nft)? < 1 {
            return Err(parse_error(format!(
                "Box {} does not hold the oracle pool NFT",
                input.box_id
            )));
        }

        let price_per_kg = decode_sigma_int_or_long(register(&input, registers::ORACLE_PRICE)?)
            .map_err(|e| parse_error(format!("Failed to parse oracle R4 (gold price): {}", e)))?;
        if price_per_kg < 0 {
            return Err(parse_error(format!(
                "Negative oracle price {} in box {}",
                price_per_kg, input.box_id
            )));
        }

        Ok(Self {
            source: input,
            price_per_kg,
        })
    }

    pub fn box_id(&self) -> &str {
        &self.source.box_id
    }

    pub fn input(&self) -> &Eip12InputBox {
        &self.source
    }

    /// nanoERG per kilogram of gold
    pub fn price_per_kg(&self) -> i64 {
        self.price_per_kg
    }

    /// nanoERG per gram of gold, the reference price of one neutron
    pub fn price_per_gram(&self) -> i64 {
        self.price_per_kg / 1000
    }

    pub fn to_data_input(&self) -> Eip12DataInputBox {
        self.source.to_data_input()
    }
}

fn parse_error(message: String) -> ProtocolError {
    ProtocolError::BoxParseError { message }
}

fn tx_parse_error(e: TxError) -> ProtocolError {
    parse_error(e.to_string())
}

fn register<'a>(input: &'a Eip12InputBox, name: &str) -> Result<&'a str, ProtocolError> {
    input
        .additional_registers
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| parse_error(format!("Box {} is missing {}", input.box_id, name)))
}

fn amount_of(input: &Eip12InputBox, token_id: &str) -> Result<i64, ProtocolError> {
    input.token_amount(token_id).map_err(tx_parse_error)
}

fn held_token(input: &Eip12InputBox, token_id: &str, name: &str) -> Result<i64, ProtocolError> {
    if !input.assets.iter().any(|a| a.token_id == token_id) {
        return Err(parse_error(format!(
            "Box {} does not hold the {} token",
            input.box_id, name
        )));
    }
    amount_of(input, token_id)
}

fn as_pair(values: &[i64], what: &str) -> Result<(i64, i64), ProtocolError> {
    match values {
        [a, b] => Ok((*a, *b)),
        _ => Err(parse_error(format!(
            "{} must hold 2 values, found {}",
            what,
            values.len()
        ))),
    }
}

fn decode_volume(input: &Eip12InputBox, name: &str) -> Result<VolumeBuckets, ProtocolError> {
    let values = decode_sigma_long_list(register(input, name)?)
        .map_err(|e| parse_error(format!("Failed to parse {} (volume): {}", name, e)))?;
    VolumeBuckets::from_slice(&values)
}

fn checked_add(current: i64, delta: i64, what: &str) -> Result<i64, ProtocolError> {
    current
        .checked_add(delta)
        .ok_or_else(|| ProtocolError::InvalidAmount {
            message: format!("Gluon box {} overflows", what),
        })
}

fn clamp_height(height: BlockHeight) -> i64 {
    i64::try_from(height).unwrap_or(i64::MAX)
}

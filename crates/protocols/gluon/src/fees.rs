//! Fee Engine
//!
//! Dev, UI and oracle fees charged on the ERG volume of each operation. The
//! dev fee decays linearly to zero as R6 `repaid` approaches `max`. Every fee
//! output carries the minimum box value on top of the fee itself.

use ergo_tx::Eip12Output;
use gluon_core::{FeeSchedule, FEE_DENOMINATOR};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::state::GluonBox;

/// Recipient class of a fee output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    Dev,
    Ui,
    Oracle,
}

/// A fee output to be created by the transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeOutputSpec {
    pub kind: FeeKind,
    pub ergo_tree: String,
    /// Output value: fee plus minimum box value
    pub amount: i64,
}

impl FeeOutputSpec {
    pub fn to_output(&self) -> Eip12Output {
        Eip12Output::simple(self.amount, self.ergo_tree.clone(), 0)
    }
}

/// Fee output values of one operation, in nanoERG
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub dev_fee: i64,
    pub ui_fee: i64,
    pub oracle_fee: i64,
    pub total_fee: i64,
}

/// Fee output values as fractions of the operation's ERG volume
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeePercentages {
    pub dev_fee: f64,
    pub ui_fee: f64,
    pub oracle_fee: f64,
    pub total_fee: f64,
}

impl FeeBreakdown {
    /// Sum fee outputs by kind
    pub fn from_outputs(outputs: &[FeeOutputSpec]) -> Self {
        let mut breakdown = Self::default();
        for output in outputs {
            let slot = match output.kind {
                FeeKind::Dev => &mut breakdown.dev_fee,
                FeeKind::Ui => &mut breakdown.ui_fee,
                FeeKind::Oracle => &mut breakdown.oracle_fee,
            };
            *slot = slot.saturating_add(output.amount);
        }
        breakdown.total_fee = breakdown
            .dev_fee
            .saturating_add(breakdown.ui_fee)
            .saturating_add(breakdown.oracle_fee);
        breakdown
    }

    /// Divide by `erg_volume`; a zero volume yields all zeros
    pub fn percentages(&self, erg_volume: i64) -> FeePercentages {
        if erg_volume == 0 {
            return FeePercentages::default();
        }
        let volume = erg_volume as f64;
        FeePercentages {
            dev_fee: self.dev_fee as f64 / volume,
            ui_fee: self.ui_fee as f64 / volume,
            oracle_fee: self.oracle_fee as f64 / volume,
            total_fee: self.total_fee as f64 / volume,
        }
    }
}

/// `floor(rate * erg / FEE_DENOMINATOR)`
fn nominal_fee(rate: i64, erg: i64) -> i64 {
    let fee = BigInt::from(rate) * BigInt::from(erg) / BigInt::from(FEE_DENOMINATOR);
    fee.to_i64().unwrap_or(i64::MAX)
}

/// Dev fee after decay: `floor(nominal * (max - repaid) / max)`
pub fn dev_fee(schedule: &FeeSchedule, erg: i64, gluon: &GluonBox) -> i64 {
    let ledger = gluon.fees();
    if ledger.max <= 0 || ledger.repaid >= ledger.max {
        return 0;
    }
    let nominal = nominal_fee(schedule.dev_fee_num, erg);
    let decayed = BigInt::from(nominal) * BigInt::from(ledger.max - ledger.repaid)
        / BigInt::from(ledger.max);
    decayed.to_i64().unwrap_or(nominal)
}

pub fn ui_fee(schedule: &FeeSchedule, erg: i64) -> i64 {
    nominal_fee(schedule.ui_fee_num, erg)
}

pub fn oracle_fee(schedule: &FeeSchedule, erg: i64) -> i64 {
    nominal_fee(schedule.oracle_fee_num, erg)
}

/// Fee outputs for an operation moving `erg` nanoERG.
///
/// Dev always comes first, then UI when a UI rate is set, then oracle when an
/// oracle rate is set and `with_oracle_fee` (transmutations only). The dev
/// fee goes to the configured tree, falling back to the Gluon box's R5.
pub fn fee_outputs(
    schedule: &FeeSchedule,
    erg: i64,
    gluon: &GluonBox,
    with_oracle_fee: bool,
) -> Vec<FeeOutputSpec> {
    let mut outputs = vec![FeeOutputSpec {
        kind: FeeKind::Dev,
        ergo_tree: schedule
            .dev_fee_tree
            .clone()
            .unwrap_or_else(|| gluon.dev_tree().to_string()),
        amount: dev_fee(schedule, erg, gluon).saturating_add(schedule.min_box_value),
    }];

    if schedule.ui_fee_num > 0 {
        outputs.push(FeeOutputSpec {
            kind: FeeKind::Ui,
            ergo_tree: schedule.ui_fee_tree.clone(),
            amount: ui_fee(schedule, erg).saturating_add(schedule.min_box_value),
        });
    }

    if with_oracle_fee && schedule.oracle_fee_num > 0 {
        outputs.push(FeeOutputSpec {
            kind: FeeKind::Oracle,
            ergo_tree: schedule.oracle_fee_tree.clone(),
            amount: oracle_fee(schedule, erg).saturating_add(schedule.min_box_value),
        });
    }

    outputs
}

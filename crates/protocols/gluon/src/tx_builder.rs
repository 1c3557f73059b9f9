//! Gluon Transaction Builder
//!
//! Builds balanced, unsigned transactions for fission, fusion and both
//! transmutations.
//!
//! # Important Notes
//!
//! - Gluon box MUST be input[0] and its successor output[0]
//! - The gold oracle box is the only data input
//! - Transmutations also spend the oracle buyback box as the last input,
//!   with context extension `{"0": "0402"}`, and recreate it as output[2]
//! - Change always goes to the first user box's script

use std::collections::HashMap;

use ergo_tx::{
    build_transaction, compute_change, encode_sigma_int, Eip12InputBox, Eip12Output,
    TransactionPlan,
};
use gluon_core::{BlockHeight, FeeSchedule, ProtocolError, Result, TxError};

use crate::calculator::{
    fission, fusion_will_need, transmute_from_gold, transmute_to_gold, TransmuteQuote,
};
use crate::constants::buyback;
use crate::fees::{dev_fee, fee_outputs, FeeKind, FeeOutputSpec};
use crate::state::{FieldDeltas, GluonBox, GoldOracleBox, TokenDeltas};

/// Request to fission ERG into neutrons and protons
#[derive(Debug, Clone)]
pub struct FissionRequest {
    /// nanoERG to deposit
    pub erg_amount: i64,
    /// User's UTXOs; the first one's script receives the change
    pub user_inputs: Vec<Eip12InputBox>,
}

/// Request to fuse neutrons and protons back into ERG
#[derive(Debug, Clone)]
pub struct FusionRequest {
    /// nanoERG to redeem
    pub erg_amount: i64,
    /// User's UTXOs (must hold the required tokens)
    pub user_inputs: Vec<Eip12InputBox>,
}

/// Request to transmute one token into the other
#[derive(Debug, Clone)]
pub struct TransmuteRequest {
    /// Tokens to pay in (protons for to-gold, neutrons for from-gold)
    pub amount: i64,
    /// User's UTXOs (must hold the tokens paid in)
    pub user_inputs: Vec<Eip12InputBox>,
    /// Current network height; stamped on every output
    pub height: BlockHeight,
}

/// Protocol state a build operates on
#[derive(Debug, Clone, Copy)]
pub struct TxContext<'a> {
    pub gluon: &'a GluonBox,
    pub oracle: &'a GoldOracleBox,
    pub fees: &'a FeeSchedule,
}

/// Everything that differs between the four operations
struct Layout {
    successor: GluonBox,
    fees: Vec<FeeOutputSpec>,
    /// Spent buyback box and its successor
    buyback: Option<(Eip12InputBox, Eip12Output)>,
    reference_height: Option<i32>,
}

/// Build a fission transaction.
///
/// Layout: inputs `[gluon, user...]`, outputs
/// `[gluon successor, change, dev fee, ui fee?, miner fee]`.
pub fn build_fission_tx(request: &FissionRequest, ctx: &TxContext) -> Result<TransactionPlan> {
    let out = fission(ctx.gluon, request.erg_amount)?;
    let dev_paid = dev_fee(ctx.fees, request.erg_amount, ctx.gluon);

    let successor = ctx.gluon.with_delta(
        TokenDeltas {
            neutrons: -out.neutrons,
            protons: -out.protons,
        },
        FieldDeltas {
            value: request.erg_amount,
            dev_fee_repaid: dev_paid,
            epoch: None,
        },
    )?;

    let plan = assemble(
        ctx,
        &request.user_inputs,
        Layout {
            successor,
            fees: fee_outputs(ctx.fees, request.erg_amount, ctx.gluon, false),
            buyback: None,
            reference_height: None,
        },
    )?;

    tracing::info!(
        erg_in = request.erg_amount,
        neutrons_out = out.neutrons,
        protons_out = out.protons,
        dev_fee = dev_paid,
        height = plan.height,
        "Built fission transaction"
    );
    Ok(plan)
}

/// Build a fusion transaction.
///
/// Layout: inputs `[gluon, user...]`, outputs
/// `[gluon successor, change, dev fee, ui fee?, miner fee]`.
pub fn build_fusion_tx(request: &FusionRequest, ctx: &TxContext) -> Result<TransactionPlan> {
    let need = fusion_will_need(ctx.gluon, request.erg_amount)?;
    let dev_paid = dev_fee(ctx.fees, request.erg_amount, ctx.gluon);

    let successor = ctx.gluon.with_delta(
        TokenDeltas {
            neutrons: need.neutrons,
            protons: need.protons,
        },
        FieldDeltas {
            value: -request.erg_amount,
            dev_fee_repaid: dev_paid,
            epoch: None,
        },
    )?;

    let plan = assemble(
        ctx,
        &request.user_inputs,
        Layout {
            successor,
            fees: fee_outputs(ctx.fees, request.erg_amount, ctx.gluon, false),
            buyback: None,
            reference_height: None,
        },
    )?;

    tracing::info!(
        erg_out = request.erg_amount,
        neutrons_in = need.neutrons,
        protons_in = need.protons,
        dev_fee = dev_paid,
        height = plan.height,
        "Built fusion transaction"
    );
    Ok(plan)
}

/// Build a transmutation of protons into neutrons.
///
/// Layout: inputs `[gluon, user..., buyback]`, outputs
/// `[gluon successor, change, buyback successor, dev fee, ui fee?, miner fee]`.
pub fn build_transmute_to_gold_tx(
    request: &TransmuteRequest,
    buyback_box: &Eip12InputBox,
    ctx: &TxContext,
) -> Result<TransactionPlan> {
    let quote = transmute_to_gold(ctx.gluon, ctx.oracle, request.amount, request.height)?;
    let plan = build_transmute(
        request,
        buyback_box,
        ctx,
        &quote,
        TokenDeltas {
            neutrons: -quote.amount_out,
            protons: quote.amount_in,
        },
    )?;

    tracing::info!(
        protons_in = quote.amount_in,
        neutrons_out = quote.amount_out,
        erg_volume = quote.erg_volume,
        height = plan.height,
        "Built transmute-to-gold transaction"
    );
    Ok(plan)
}

/// Build a transmutation of neutrons into protons.
///
/// Same layout as [`build_transmute_to_gold_tx`].
pub fn build_transmute_from_gold_tx(
    request: &TransmuteRequest,
    buyback_box: &Eip12InputBox,
    ctx: &TxContext,
) -> Result<TransactionPlan> {
    let quote = transmute_from_gold(ctx.gluon, ctx.oracle, request.amount, request.height)?;
    let plan = build_transmute(
        request,
        buyback_box,
        ctx,
        &quote,
        TokenDeltas {
            neutrons: quote.amount_in,
            protons: -quote.amount_out,
        },
    )?;

    tracing::info!(
        neutrons_in = quote.amount_in,
        protons_out = quote.amount_out,
        erg_volume = quote.erg_volume,
        height = plan.height,
        "Built transmute-from-gold transaction"
    );
    Ok(plan)
}

fn build_transmute(
    request: &TransmuteRequest,
    buyback_box: &Eip12InputBox,
    ctx: &TxContext,
    quote: &TransmuteQuote,
    tokens: TokenDeltas,
) -> Result<TransactionPlan> {
    let reference_height = i32::try_from(request.height).map_err(|_| TxError::BuildFailed {
        message: format!("Height {} out of range", request.height),
    })?;

    let successor = ctx.gluon.with_delta(
        tokens,
        FieldDeltas {
            value: 0,
            dev_fee_repaid: dev_fee(ctx.fees, quote.erg_volume, ctx.gluon),
            epoch: Some(quote.epoch),
        },
    )?;

    let (oracle_fees, fees): (Vec<FeeOutputSpec>, Vec<FeeOutputSpec>) =
        fee_outputs(ctx.fees, quote.erg_volume, ctx.gluon, true)
            .into_iter()
            .partition(|f| f.kind == FeeKind::Oracle);
    let oracle_fee: i64 = oracle_fees.iter().map(|f| f.amount).sum();

    let buyback = buyback_successor(buyback_box, oracle_fee)?;

    assemble(
        ctx,
        &request.user_inputs,
        Layout {
            successor,
            fees,
            buyback: Some(buyback),
            reference_height: Some(reference_height),
        },
    )
}

/// Spent buyback input (with the top-up selector) and its successor, which
/// receives the oracle fee
fn buyback_successor(
    buyback_box: &Eip12InputBox,
    oracle_fee: i64,
) -> Result<(Eip12InputBox, Eip12Output)> {
    let mut input = buyback_box.clone();
    input.extension.insert(
        buyback::ACTION_VAR.to_string(),
        encode_sigma_int(buyback::TOPUP_ACTION),
    );

    let value = buyback_box
        .value_nano()?
        .checked_add(oracle_fee)
        .ok_or_else(|| ProtocolError::InvalidAmount {
            message: "Buyback box value overflows".to_string(),
        })?;

    let output = Eip12Output {
        value: value.to_string(),
        ergo_tree: buyback_box.ergo_tree.clone(),
        assets: buyback_box.assets.clone(),
        creation_height: 0,
        additional_registers: buyback_box.additional_registers.clone(),
        extension: HashMap::new(),
    };
    Ok((input, output))
}

fn assemble(
    ctx: &TxContext,
    user_inputs: &[Eip12InputBox],
    layout: Layout,
) -> Result<TransactionPlan> {
    let change_tree = user_inputs
        .first()
        .map(|b| b.ergo_tree.clone())
        .ok_or(TxError::NoUtxos)?;

    let mut inputs = Vec::with_capacity(user_inputs.len() + 2);
    inputs.push(ctx.gluon.input().clone());
    inputs.extend(user_inputs.iter().cloned());

    let gluon_out = layout.successor.to_output();
    let fee_outs: Vec<Eip12Output> = layout.fees.iter().map(FeeOutputSpec::to_output).collect();

    let mut planned = vec![gluon_out.clone()];
    let mut buyback_out = None;
    if let Some((buyback_in, out)) = layout.buyback {
        inputs.push(buyback_in);
        planned.push(out.clone());
        buyback_out = Some(out);
    }
    planned.extend(fee_outs.iter().cloned());

    let change = compute_change(&inputs, &planned, &change_tree, ctx.fees.miner_fee)?;
    let change_value = change.value_nano()?;
    if change_value < ctx.fees.min_box_value {
        tracing::warn!(
            change_value,
            min_box_value = ctx.fees.min_box_value,
            "Change output is below the minimum box value"
        );
    }

    let mut outputs = vec![gluon_out, change];
    outputs.extend(buyback_out);
    outputs.extend(fee_outs);

    let plan = build_transaction(
        inputs,
        outputs,
        vec![ctx.oracle.to_data_input()],
        ctx.fees.miner_fee,
        layout.reference_height,
    )?;
    Ok(plan)
}

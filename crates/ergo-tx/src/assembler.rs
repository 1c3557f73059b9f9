//! Balanced Transaction Assembly
//!
//! Turns spent inputs and planned outputs into an unsigned transaction that
//! conserves ERG and every token, with exactly one change output.
//!
//! # Important Notes
//!
//! - Change is computed BEFORE any transaction exists; underfunding is an error
//! - Change token order follows first appearance among the inputs
//! - The miner fee output is always the last output

use std::collections::HashMap;

use gluon_core::{TokenShortfall, TxError};

use crate::eip12::{Eip12Asset, Eip12DataInputBox, Eip12InputBox, Eip12Output, Eip12UnsignedTx};

/// Unsigned, balanced transaction ready for wallet presentation
#[derive(Debug, Clone)]
pub struct TransactionPlan {
    pub inputs: Vec<Eip12InputBox>,
    pub data_inputs: Vec<Eip12DataInputBox>,
    /// All outputs, miner fee output last
    pub outputs: Vec<Eip12Output>,
    pub miner_fee: i64,
    /// Creation height stamped on every output
    pub height: i32,
}

impl TransactionPlan {
    /// EIP-12 form for wallet signing.
    ///
    /// Inputs keep any context extension they were given (empty otherwise);
    /// data inputs and outputs always carry an empty one.
    pub fn to_eip12(&self) -> Eip12UnsignedTx {
        let data_inputs = self
            .data_inputs
            .iter()
            .cloned()
            .map(|mut d| {
                d.extension.clear();
                d
            })
            .collect();

        let outputs = self
            .outputs
            .iter()
            .cloned()
            .map(|mut o| {
                o.extension.clear();
                o
            })
            .collect();

        Eip12UnsignedTx {
            inputs: self.inputs.clone(),
            data_inputs,
            outputs,
        }
    }

    /// Total nanoERG spent by the inputs
    pub fn input_value(&self) -> Result<i64, TxError> {
        self.inputs.iter().map(|b| b.value_nano()).sum()
    }

    /// Total nanoERG created by the outputs (miner fee included)
    pub fn output_value(&self) -> Result<i64, TxError> {
        self.outputs.iter().map(|o| o.value_nano()).sum()
    }
}

/// Running per-token balance that remembers first-seen order
#[derive(Debug, Default)]
struct TokenBalance {
    order: Vec<String>,
    totals: HashMap<String, i128>,
}

impl TokenBalance {
    fn add(&mut self, asset: &Eip12Asset, sign: i128) -> Result<(), TxError> {
        let amount = asset.amount_i64()? as i128;
        if !self.totals.contains_key(&asset.token_id) {
            self.order.push(asset.token_id.clone());
        }
        *self.totals.entry(asset.token_id.clone()).or_insert(0) += sign * amount;
        Ok(())
    }

    fn of(inputs: &[Eip12InputBox], outputs: &[Eip12Output]) -> Result<Self, TxError> {
        let mut balance = Self::default();
        for asset in inputs.iter().flat_map(|b| b.assets.iter()) {
            balance.add(asset, 1)?;
        }
        for asset in outputs.iter().flat_map(|o| o.assets.iter()) {
            balance.add(asset, -1)?;
        }
        Ok(balance)
    }

    fn remainders(&self) -> impl Iterator<Item = (&String, i128)> + '_ {
        self.order.iter().map(move |id| (id, self.totals[id]))
    }
}

fn erg_remainder(inputs: &[Eip12InputBox], outputs: &[Eip12Output]) -> Result<i128, TxError> {
    let mut total: i128 = 0;
    for input in inputs {
        total += input.value_nano()? as i128;
    }
    for output in outputs {
        total -= output.value_nano()? as i128;
    }
    Ok(total)
}

/// Compute the single change output for a set of inputs and planned outputs.
///
/// `planned_outputs` must not contain the change output itself nor the miner
/// fee output. Only strictly positive token remainders are kept. Fails with
/// [`TxError::InsufficientFunds`] if ERG or any token is overspent.
///
/// The returned output has creation height 0; [`build_transaction`] stamps the
/// real height.
pub fn compute_change(
    inputs: &[Eip12InputBox],
    planned_outputs: &[Eip12Output],
    change_tree: &str,
    miner_fee: i64,
) -> Result<Eip12Output, TxError> {
    let erg_left = erg_remainder(inputs, planned_outputs)? - miner_fee as i128;
    let tokens = TokenBalance::of(inputs, planned_outputs)?;

    let tokens_missing: Vec<TokenShortfall> = tokens
        .remainders()
        .filter(|(_, amount)| *amount < 0)
        .map(|(token_id, amount)| TokenShortfall {
            token_id: token_id.clone(),
            missing: clamp_i64(-amount),
        })
        .collect();

    if erg_left < 0 || !tokens_missing.is_empty() {
        return Err(TxError::InsufficientFunds {
            erg_missing: clamp_i64((-erg_left).max(0)),
            tokens_missing,
        });
    }

    let assets = tokens
        .remainders()
        .filter(|(_, amount)| *amount > 0)
        .map(|(token_id, amount)| Eip12Asset::new(token_id.clone(), clamp_i64(amount)))
        .collect();

    Ok(Eip12Output::change(
        clamp_i64(erg_left),
        change_tree,
        assets,
        0,
    ))
}

/// Assemble an unsigned transaction.
///
/// Every output gets `reference_height` as creation height when given,
/// otherwise the highest creation height among the inputs. The standard miner
/// fee output is appended. The result is checked for exact conservation.
pub fn build_transaction(
    inputs: Vec<Eip12InputBox>,
    outputs: Vec<Eip12Output>,
    data_inputs: Vec<Eip12DataInputBox>,
    miner_fee: i64,
    reference_height: Option<i32>,
) -> Result<TransactionPlan, TxError> {
    let max_input_height = inputs
        .iter()
        .map(|b| b.creation_height)
        .max()
        .ok_or(TxError::NoUtxos)?;
    let height = reference_height.unwrap_or(max_input_height);

    let mut outputs: Vec<Eip12Output> = outputs
        .into_iter()
        .map(|mut o| {
            o.creation_height = height;
            o
        })
        .collect();
    outputs.push(Eip12Output::fee(miner_fee, height));

    check_conservation(&inputs, &outputs)?;

    Ok(TransactionPlan {
        inputs,
        data_inputs,
        outputs,
        miner_fee,
        height,
    })
}

/// Verify that `outputs` (miner fee included) spend exactly what `inputs` hold
pub fn check_conservation(
    inputs: &[Eip12InputBox],
    outputs: &[Eip12Output],
) -> Result<(), TxError> {
    let erg = erg_remainder(inputs, outputs)?;
    if erg != 0 {
        return Err(TxError::BuildFailed {
            message: format!("ERG not conserved: inputs exceed outputs by {}", erg),
        });
    }

    let tokens = TokenBalance::of(inputs, outputs)?;
    if let Some((token_id, amount)) = tokens.remainders().find(|(_, a)| *a != 0) {
        return Err(TxError::BuildFailed {
            message: format!(
                "Token {} not conserved: inputs exceed outputs by {}",
                token_id, amount
            ),
        });
    }

    Ok(())
}

fn clamp_i64(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const USER_TREE: &str = "0008cd02aa";

    fn input(id: &str, value: i64, height: i32, assets: Vec<Eip12Asset>) -> Eip12InputBox {
        Eip12InputBox {
            box_id: id.to_string(),
            transaction_id: format!("tx_{}", id),
            index: 0,
            value: value.to_string(),
            ergo_tree: USER_TREE.to_string(),
            assets,
            creation_height: height,
            additional_registers: HashMap::new(),
            extension: HashMap::new(),
        }
    }

    fn output(value: i64, assets: Vec<Eip12Asset>) -> Eip12Output {
        Eip12Output::change(value, "1000", assets, 0)
    }

    #[test]
    fn test_insufficient_erg() {
        let inputs = vec![input("a", 60, 10, vec![]), input("b", 40, 10, vec![])];
        let outputs = vec![output(150, vec![])];

        let err = compute_change(&inputs, &outputs, USER_TREE, 10).unwrap_err();
        match err {
            TxError::InsufficientFunds {
                erg_missing,
                tokens_missing,
            } => {
                assert_eq!(erg_missing, 60);
                assert!(tokens_missing.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_insufficient_tokens() {
        let inputs = vec![input("a", 1_000, 10, vec![Eip12Asset::new("tok", 5)])];
        let outputs = vec![output(100, vec![Eip12Asset::new("tok", 8)])];

        let err = compute_change(&inputs, &outputs, USER_TREE, 10).unwrap_err();
        assert!(matches!(
            err,
            TxError::InsufficientFunds { erg_missing: 0, ref tokens_missing }
                if tokens_missing == &vec![TokenShortfall { token_id: "tok".into(), missing: 3 }]
        ));
    }

    #[test]
    fn test_change_keeps_positive_remainders_in_input_order() {
        let inputs = vec![
            input(
                "a",
                5_000,
                10,
                vec![Eip12Asset::new("beta", 4), Eip12Asset::new("alpha", 9)],
            ),
            input("b", 1_000, 10, vec![Eip12Asset::new("gamma", 2)]),
        ];
        let outputs = vec![output(
            2_000,
            vec![Eip12Asset::new("alpha", 9), Eip12Asset::new("beta", 1)],
        )];

        let change = compute_change(&inputs, &outputs, USER_TREE, 100).unwrap();
        assert_eq!(change.value, "3900");
        assert_eq!(change.ergo_tree, USER_TREE);
        // alpha fully spent, dropped
        assert_eq!(
            change.assets,
            vec![Eip12Asset::new("beta", 3), Eip12Asset::new("gamma", 2)]
        );
    }

    #[test]
    fn test_tokens_minted_from_output_side_count_against_inputs() {
        // An output token that no input holds is a shortfall, not free money
        let inputs = vec![input("a", 1_000, 10, vec![])];
        let outputs = vec![output(100, vec![Eip12Asset::new("new", 1)])];
        assert!(compute_change(&inputs, &outputs, USER_TREE, 10).is_err());
    }

    #[test]
    fn test_build_uses_max_input_height() {
        let inputs = vec![
            input("a", 3_000, 100, vec![Eip12Asset::new("tok", 7)]),
            input("b", 1_000, 250, vec![]),
        ];
        let planned = vec![output(1_500, vec![])];
        let change = compute_change(&inputs, &planned, USER_TREE, 1_100).unwrap();

        let mut outputs = planned;
        outputs.push(change);
        let plan = build_transaction(inputs, outputs, vec![], 1_100, None).unwrap();

        assert_eq!(plan.height, 250);
        assert!(plan.outputs.iter().all(|o| o.creation_height == 250));
        let fee = plan.outputs.last().unwrap();
        assert_eq!(fee.value, "1100");
        assert_eq!(fee.ergo_tree, gluon_core::constants::MINER_FEE_ERGO_TREE);
        assert_eq!(plan.input_value().unwrap(), plan.output_value().unwrap());
    }

    #[test]
    fn test_build_uses_reference_height() {
        let inputs = vec![input("a", 2_100, 100, vec![])];
        let outputs = vec![output(1_000, vec![])];
        let plan = build_transaction(inputs, outputs, vec![], 1_100, Some(1_296_123)).unwrap();
        assert_eq!(plan.height, 1_296_123);
        assert_eq!(plan.outputs[0].creation_height, 1_296_123);
    }

    #[test]
    fn test_build_rejects_unbalanced_outputs() {
        let inputs = vec![input("a", 2_000, 100, vec![Eip12Asset::new("tok", 3)])];
        // Token dropped on the floor
        let outputs = vec![output(900, vec![])];
        let err = build_transaction(inputs, outputs, vec![], 1_100, None).unwrap_err();
        assert!(matches!(err, TxError::BuildFailed { ref message } if message.contains("tok")));
    }

    #[test]
    fn test_build_without_inputs() {
        let err = build_transaction(vec![], vec![], vec![], 1_100, None).unwrap_err();
        assert!(matches!(err, TxError::NoUtxos));
    }

    #[test]
    fn test_eip12_form_keeps_input_extension() {
        let mut buyback = input("buyback", 2_100, 100, vec![]);
        buyback
            .extension
            .insert("0".to_string(), crate::encode_sigma_int(1));
        let oracle = input("oracle", 1_000_000, 90, vec![]).to_data_input();

        let plan = build_transaction(
            vec![buyback],
            vec![output(1_000, vec![])],
            vec![oracle],
            1_100,
            None,
        )
        .unwrap();
        let tx = plan.to_eip12();

        assert_eq!(tx.inputs[0].extension["0"], "0402");
        assert!(tx.data_inputs[0].extension.is_empty());
        assert_eq!(tx.outputs.len(), 2);

        let json = serde_json::to_value(&tx).unwrap();
        for output in json["outputs"].as_array().unwrap() {
            assert_eq!(output["extension"], serde_json::json!({}));
        }
        assert_eq!(json["inputs"][0]["extension"]["0"], "0402");
    }
}

//! Gluon Protocol Facade
//!
//! Entry point for integrators. [`GluonProtocol`] reads chain state through an
//! injected [`LedgerGateway`], and turns a [`GluonSnapshot`] into quotes, fee
//! breakdowns and unsigned transactions.
//!
//! Nothing is cached: every snapshot is fetched fresh and every quote or build
//! works on the snapshot the caller passes in.

use std::sync::Arc;

use ergo_node_client::LedgerGateway;
use ergo_tx::{Eip12InputBox, Eip12UnsignedTx, TransactionPlan};
use gluon_core::{BlockHeight, GluonConfig, ProtocolError, Result, TokenId};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::calculator::{self, TokenAmounts, TransmuteQuote};
use crate::constants::PRECISION;
use crate::fees::{fee_outputs, FeeBreakdown, FeePercentages};
use crate::ratio::{fusion_ratio, neutron_price, proton_price, to_i64};
use crate::state::{GluonBox, GoldOracleBox};
use crate::tx_builder::{
    build_fission_tx, build_fusion_tx, build_transmute_from_gold_tx, build_transmute_to_gold_tx,
    FissionRequest, FusionRequest, TransmuteRequest, TxContext,
};

/// Decoded Gluon and oracle boxes from one fetch
#[derive(Debug, Clone)]
pub struct GluonSnapshot {
    pub gluon: GluonBox,
    pub oracle: GoldOracleBox,
}

impl GluonSnapshot {
    pub fn fusion_ratio(&self) -> i64 {
        fusion_ratio(&self.gluon, &self.oracle)
    }

    /// nanoERG per 1e9 raw neutron units
    pub fn neutron_price(&self) -> Result<i64> {
        Ok(neutron_price(&self.gluon, &self.oracle)?)
    }

    /// nanoERG per 1e9 raw proton units
    pub fn proton_price(&self) -> Result<i64> {
        Ok(proton_price(&self.gluon, &self.oracle)?)
    }
}

/// User-facing operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GluonOperation {
    Fission,
    Fusion,
    TransmuteToGold,
    TransmuteFromGold,
}

/// Fees of one operation, absolute and relative to its ERG volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub erg_volume: i64,
    pub amounts: FeeBreakdown,
    pub percentages: FeePercentages,
}

/// Gluon protocol client
pub struct GluonProtocol {
    config: GluonConfig,
    gateway: Arc<dyn LedgerGateway>,
}

impl GluonProtocol {
    /// Create a client; fails with [`gluon_core::Error::Config`] on an invalid config
    pub fn new(config: GluonConfig, gateway: Arc<dyn LedgerGateway>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, gateway })
    }

    pub fn config(&self) -> &GluonConfig {
        &self.config
    }

    // =========================================================================
    // Ledger reads
    // =========================================================================

    /// Fetch and decode the Gluon box and the gold oracle box concurrently
    pub async fn fetch_snapshot(&self) -> Result<GluonSnapshot> {
        let ids = &self.config.ids;
        let (gluon_input, oracle_input) = tokio::try_join!(
            self.fetch_singleton(&ids.gluon_nft, "Gluon box"),
            self.fetch_singleton(&ids.oracle_pool_nft, "Gold oracle box"),
        )?;

        let snapshot = GluonSnapshot {
            gluon: GluonBox::from_input(gluon_input, ids)?,
            oracle: GoldOracleBox::from_input(oracle_input, ids)?,
        };

        tracing::debug!(
            gluon_box = snapshot.gluon.box_id(),
            oracle_box = snapshot.oracle.box_id(),
            price_per_gram = snapshot.oracle.price_per_gram(),
            "Fetched Gluon snapshot"
        );
        Ok(snapshot)
    }

    /// Fetch the oracle buyback box spent by transmutations
    pub async fn fetch_buyback_box(&self) -> Result<Eip12InputBox> {
        self.fetch_singleton(&self.config.ids.oracle_buyback_nft, "Oracle buyback box")
            .await
    }

    pub async fn current_height(&self) -> Result<BlockHeight> {
        Ok(self.gateway.network_height().await?)
    }

    async fn fetch_singleton(&self, nft: &str, what: &str) -> Result<Eip12InputBox> {
        let boxes = self
            .gateway
            .unspent_boxes_by_token_id(&TokenId::new(nft))
            .await?;
        let first = boxes
            .into_iter()
            .next()
            .ok_or_else(|| ProtocolError::StateUnavailable {
                reason: format!("{} not found (NFT {})", what, nft),
            })?;
        Ok(first)
    }

    // =========================================================================
    // Quotes
    // =========================================================================

    /// Neutrons and protons issued for `erg_amount` nanoERG
    pub fn fission_will_get(&self, snapshot: &GluonSnapshot, erg_amount: i64) -> Result<TokenAmounts> {
        Ok(calculator::fission(&snapshot.gluon, erg_amount)?)
    }

    /// Neutrons and protons required to redeem `erg_amount` nanoERG
    pub fn fusion_will_need(&self, snapshot: &GluonSnapshot, erg_amount: i64) -> Result<TokenAmounts> {
        Ok(calculator::fusion_will_need(&snapshot.gluon, erg_amount)?)
    }

    /// Neutrons received for `protons_in` at `height`
    pub fn transmute_to_gold_will_get(
        &self,
        snapshot: &GluonSnapshot,
        protons_in: i64,
        height: BlockHeight,
    ) -> Result<TransmuteQuote> {
        Ok(calculator::transmute_to_gold(
            &snapshot.gluon,
            &snapshot.oracle,
            protons_in,
            height,
        )?)
    }

    /// Protons received for `neutrons_in` at `height`
    pub fn transmute_from_gold_will_get(
        &self,
        snapshot: &GluonSnapshot,
        neutrons_in: i64,
        height: BlockHeight,
    ) -> Result<TransmuteQuote> {
        Ok(calculator::transmute_from_gold(
            &snapshot.gluon,
            &snapshot.oracle,
            neutrons_in,
            height,
        )?)
    }

    /// Fees charged by `operation`.
    ///
    /// `amount` is nanoERG for fission and fusion, and the tokens paid in for
    /// transmutations, whose ERG volume is `floor(price * amount / 1e9)`.
    pub fn fee_quote(
        &self,
        snapshot: &GluonSnapshot,
        operation: GluonOperation,
        amount: i64,
    ) -> Result<FeeQuote> {
        let (erg_volume, with_oracle_fee) = match operation {
            GluonOperation::Fission | GluonOperation::Fusion => (amount, false),
            GluonOperation::TransmuteToGold => {
                (token_volume(snapshot.proton_price()?, amount)?, true)
            }
            GluonOperation::TransmuteFromGold => {
                (token_volume(snapshot.neutron_price()?, amount)?, true)
            }
        };

        let outputs = fee_outputs(
            &self.config.fees,
            erg_volume,
            &snapshot.gluon,
            with_oracle_fee,
        );
        let amounts = FeeBreakdown::from_outputs(&outputs);

        Ok(FeeQuote {
            erg_volume,
            amounts,
            percentages: amounts.percentages(erg_volume),
        })
    }

    /// Address of the dev fee script in the Gluon box's R5
    pub fn dev_fee_address(&self, snapshot: &GluonSnapshot) -> Result<String> {
        Ok(snapshot.gluon.dev_fee_address(self.config.network)?)
    }

    // =========================================================================
    // Transaction building
    // =========================================================================

    pub fn fission(
        &self,
        snapshot: &GluonSnapshot,
        erg_amount: i64,
        user_inputs: Vec<Eip12InputBox>,
    ) -> Result<TransactionPlan> {
        build_fission_tx(
            &FissionRequest {
                erg_amount,
                user_inputs,
            },
            &self.context(snapshot),
        )
    }

    pub fn fusion(
        &self,
        snapshot: &GluonSnapshot,
        erg_amount: i64,
        user_inputs: Vec<Eip12InputBox>,
    ) -> Result<TransactionPlan> {
        build_fusion_tx(
            &FusionRequest {
                erg_amount,
                user_inputs,
            },
            &self.context(snapshot),
        )
    }

    /// Fetches the buyback box and the current height, then builds
    pub async fn transmute_to_gold(
        &self,
        snapshot: &GluonSnapshot,
        protons_in: i64,
        user_inputs: Vec<Eip12InputBox>,
    ) -> Result<TransactionPlan> {
        let (buyback, height) = self.transmute_inputs().await?;
        build_transmute_to_gold_tx(
            &TransmuteRequest {
                amount: protons_in,
                user_inputs,
                height,
            },
            &buyback,
            &self.context(snapshot),
        )
    }

    /// Fetches the buyback box and the current height, then builds
    pub async fn transmute_from_gold(
        &self,
        snapshot: &GluonSnapshot,
        neutrons_in: i64,
        user_inputs: Vec<Eip12InputBox>,
    ) -> Result<TransactionPlan> {
        let (buyback, height) = self.transmute_inputs().await?;
        build_transmute_from_gold_tx(
            &TransmuteRequest {
                amount: neutrons_in,
                user_inputs,
                height,
            },
            &buyback,
            &self.context(snapshot),
        )
    }

    pub fn fission_for_eip12(
        &self,
        snapshot: &GluonSnapshot,
        erg_amount: i64,
        user_inputs: Vec<Eip12InputBox>,
    ) -> Result<Eip12UnsignedTx> {
        Ok(self.fission(snapshot, erg_amount, user_inputs)?.to_eip12())
    }

    pub fn fusion_for_eip12(
        &self,
        snapshot: &GluonSnapshot,
        erg_amount: i64,
        user_inputs: Vec<Eip12InputBox>,
    ) -> Result<Eip12UnsignedTx> {
        Ok(self.fusion(snapshot, erg_amount, user_inputs)?.to_eip12())
    }

    pub async fn transmute_to_gold_for_eip12(
        &self,
        snapshot: &GluonSnapshot,
        protons_in: i64,
        user_inputs: Vec<Eip12InputBox>,
    ) -> Result<Eip12UnsignedTx> {
        Ok(self
            .transmute_to_gold(snapshot, protons_in, user_inputs)
            .await?
            .to_eip12())
    }

    pub async fn transmute_from_gold_for_eip12(
        &self,
        snapshot: &GluonSnapshot,
        neutrons_in: i64,
        user_inputs: Vec<Eip12InputBox>,
    ) -> Result<Eip12UnsignedTx> {
        Ok(self
            .transmute_from_gold(snapshot, neutrons_in, user_inputs)
            .await?
            .to_eip12())
    }

    async fn transmute_inputs(&self) -> Result<(Eip12InputBox, BlockHeight)> {
        tokio::try_join!(self.fetch_buyback_box(), self.current_height())
    }

    fn context<'a>(&'a self, snapshot: &'a GluonSnapshot) -> TxContext<'a> {
        TxContext {
            gluon: &snapshot.gluon,
            oracle: &snapshot.oracle,
            fees: &self.config.fees,
        }
    }
}

fn token_volume(price: i64, amount: i64) -> Result<i64> {
    let volume = BigInt::from(price) * BigInt::from(amount) / BigInt::from(PRECISION);
    Ok(to_i64(volume, "ERG volume")?)
}

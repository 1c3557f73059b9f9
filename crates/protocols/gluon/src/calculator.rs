//! Gluon Exchange Calculator
//!
//! Pure quote functions over an immutable `(GluonBox, GoldOracleBox)`
//! snapshot. Each formula evaluates in the same order as the contract and
//! truncates after every division.

use gluon_core::{BlockHeight, ProtocolError};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::constants::{FISSION_LEVY, FUSION_LEVY, PRECISION};
use crate::ratio::{fusion_ratio, neutron_price, proton_price, to_i64, var_phi_beta};
use crate::state::{GluonBox, GoldOracleBox};
use crate::volume::{epoch_anchor, EpochUpdate};

/// Neutron and proton amounts (raw units)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmounts {
    pub neutrons: i64,
    pub protons: i64,
}

/// Quote for a transmutation in either direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmuteQuote {
    /// Tokens paid in by the user
    pub amount_in: i64,
    /// Tokens received by the user
    pub amount_out: i64,
    /// ERG value of `amount_in` at the current price, the fee base
    pub erg_volume: i64,
    /// Buckets and anchor the successor Gluon box must carry
    pub epoch: EpochUpdate,
}

fn require_positive(amount: i64, what: &str) -> Result<(), ProtocolError> {
    if amount <= 0 {
        return Err(ProtocolError::InvalidAmount {
            message: format!("{} must be positive, got {}", what, amount),
        });
    }
    Ok(())
}

/// Tokens issued for `erg_in` nanoERG:
/// `floor(floor(erg_in * circulating * (1e9 - 1e6) / fissioned) / 1e9)` per token
pub fn fission(gluon: &GluonBox, erg_in: i64) -> Result<TokenAmounts, ProtocolError> {
    require_positive(erg_in, "ERG to fission")?;

    let fissioned = BigInt::from(gluon.fissioned_erg());
    let scaled = BigInt::from(erg_in) * BigInt::from(PRECISION - FISSION_LEVY);
    let out = |circulating: i64| {
        to_i64(
            &scaled * BigInt::from(circulating) / &fissioned / BigInt::from(PRECISION),
            "fission output",
        )
    };

    let amounts = TokenAmounts {
        neutrons: out(gluon.circulating_neutrons())?,
        protons: out(gluon.circulating_protons())?,
    };
    tracing::debug!(
        erg_in,
        neutrons = amounts.neutrons,
        protons = amounts.protons,
        "Fission quote"
    );
    Ok(amounts)
}

/// Tokens required to redeem `erg_out` nanoERG:
/// `floor(erg_out * circulating * 1e9 / (fissioned * (1e9 - 5e6)))` per token
pub fn fusion_will_need(gluon: &GluonBox, erg_out: i64) -> Result<TokenAmounts, ProtocolError> {
    require_positive(erg_out, "ERG to fuse")?;
    if erg_out >= gluon.fissioned_erg() {
        return Err(ProtocolError::InvalidAmount {
            message: format!(
                "Cannot redeem {} nanoERG, only {} fissioned",
                erg_out,
                gluon.fissioned_erg()
            ),
        });
    }

    let denominator =
        BigInt::from(gluon.fissioned_erg()) * BigInt::from(PRECISION - FUSION_LEVY);
    let scaled = BigInt::from(erg_out) * BigInt::from(PRECISION);
    let need = |circulating: i64| {
        to_i64(
            &scaled * BigInt::from(circulating) / &denominator,
            "fusion input",
        )
    };

    let amounts = TokenAmounts {
        neutrons: need(gluon.circulating_neutrons())?,
        protons: need(gluon.circulating_protons())?,
    };
    tracing::debug!(
        erg_out,
        neutrons = amounts.neutrons,
        protons = amounts.protons,
        "Fusion quote"
    );
    Ok(amounts)
}

/// Neutrons received for `protons_in` protons at `height`
pub fn transmute_to_gold(
    gluon: &GluonBox,
    oracle: &GoldOracleBox,
    protons_in: i64,
    height: BlockHeight,
) -> Result<TransmuteQuote, ProtocolError> {
    require_positive(protons_in, "Protons to transmute")?;

    let circ_protons = gluon.circulating_protons();
    let circ_neutrons = gluon.circulating_neutrons();
    if circ_protons <= 0 {
        return Err(ProtocolError::InvalidAmount {
            message: "No protons in circulation".to_string(),
        });
    }

    let ratio = fusion_ratio(gluon, oracle);
    if ratio <= 0 {
        return Err(ProtocolError::InvalidAmount {
            message: "Fusion ratio is zero, transmutation to gold is unavailable".to_string(),
        });
    }

    let price = proton_price(gluon, oracle)?;
    let erg_volume = to_i64(
        BigInt::from(price) * BigInt::from(protons_in) / BigInt::from(PRECISION),
        "proton volume",
    )?;

    let anchor = gluon.last_epoch_height();
    let to_neutrons = gluon
        .volume_protons_to_neutrons()
        .advanced(height, anchor, erg_volume);
    let to_protons = gluon.volume_neutrons_to_protons().advanced(height, anchor, 0);

    let phi = var_phi_beta(gluon.fissioned_erg(), &to_neutrons, &to_protons)?;
    let decay = decay_term(phi)?;

    let a = BigInt::from(protons_in) * BigInt::from(decay) / BigInt::from(circ_protons);
    let b = BigInt::from(PRECISION - ratio) * BigInt::from(circ_neutrons) / BigInt::from(PRECISION);
    let amount_out = to_i64(a * b / BigInt::from(ratio), "neutron output")?;

    tracing::debug!(
        protons_in,
        ratio,
        price,
        erg_volume,
        phi,
        amount_out,
        "Transmute to gold quote"
    );

    Ok(TransmuteQuote {
        amount_in: protons_in,
        amount_out,
        erg_volume,
        epoch: EpochUpdate {
            protons_to_neutrons: to_neutrons,
            neutrons_to_protons: to_protons,
            anchor: epoch_anchor(height),
        },
    })
}

/// Protons received for `neutrons_in` neutrons at `height`
pub fn transmute_from_gold(
    gluon: &GluonBox,
    oracle: &GoldOracleBox,
    neutrons_in: i64,
    height: BlockHeight,
) -> Result<TransmuteQuote, ProtocolError> {
    require_positive(neutrons_in, "Neutrons to transmute")?;

    let circ_protons = gluon.circulating_protons();
    let circ_neutrons = gluon.circulating_neutrons();
    if circ_neutrons <= 0 {
        return Err(ProtocolError::InvalidAmount {
            message: "No neutrons in circulation".to_string(),
        });
    }

    let ratio = fusion_ratio(gluon, oracle);
    let price = neutron_price(gluon, oracle)?;
    let erg_volume = to_i64(
        BigInt::from(price) * BigInt::from(neutrons_in) / BigInt::from(PRECISION),
        "neutron volume",
    )?;

    let anchor = gluon.last_epoch_height();
    let to_neutrons = gluon.volume_protons_to_neutrons().advanced(height, anchor, 0);
    let to_protons = gluon
        .volume_neutrons_to_protons()
        .advanced(height, anchor, erg_volume);

    let phi = var_phi_beta(gluon.fissioned_erg(), &to_protons, &to_neutrons)?;
    let decay = decay_term(phi)?;

    let a = BigInt::from(neutrons_in) * BigInt::from(decay) / BigInt::from(circ_neutrons);
    let b = BigInt::from(ratio) * BigInt::from(circ_protons) / BigInt::from(PRECISION);
    let amount_out = to_i64(a * b / BigInt::from(PRECISION - ratio), "proton output")?;

    tracing::debug!(
        neutrons_in,
        ratio,
        price,
        erg_volume,
        phi,
        amount_out,
        "Transmute from gold quote"
    );

    Ok(TransmuteQuote {
        amount_in: neutrons_in,
        amount_out,
        erg_volume,
        epoch: EpochUpdate {
            protons_to_neutrons: to_neutrons,
            neutrons_to_protons: to_protons,
            anchor: epoch_anchor(height),
        },
    })
}

fn decay_term(phi: i64) -> Result<i64, ProtocolError> {
    let decay = PRECISION - phi;
    if decay <= 0 {
        return Err(ProtocolError::InvalidAmount {
            message: format!("Transmutation fee term {} consumes the whole amount", phi),
        });
    }
    Ok(decay)
}

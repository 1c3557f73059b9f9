//! Ratio and Price Engine
//!
//! Fusion ratio, token prices and the transmutation fee term, computed with
//! arbitrary precision integers and truncated exactly where the contract
//! truncates.

use gluon_core::ProtocolError;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::constants::{PHI0, PHI1, PRECISION, QSTAR};
use crate::state::{GluonBox, GoldOracleBox};
use crate::volume::VolumeBuckets;

/// Fusion ratio: share of fissioned ERG backing neutrons, capped at [`QSTAR`].
///
/// `min(QSTAR, circulating_neutrons * price_per_gram / fissioned_erg)`
pub fn fusion_ratio(gluon: &GluonBox, oracle: &GoldOracleBox) -> i64 {
    let fissioned = BigInt::from(gluon.fissioned_erg());
    if fissioned <= BigInt::zero() {
        return 0;
    }
    let uncapped = BigInt::from(gluon.circulating_neutrons())
        * BigInt::from(oracle.price_per_gram())
        / fissioned;
    uncapped.min(BigInt::from(QSTAR)).to_i64().unwrap_or(QSTAR)
}

/// Neutron price in nanoERG per [`PRECISION`] raw units
pub fn neutron_price(gluon: &GluonBox, oracle: &GoldOracleBox) -> Result<i64, ProtocolError> {
    token_price(
        fusion_ratio(gluon, oracle),
        gluon.fissioned_erg(),
        gluon.circulating_neutrons(),
        "neutron",
    )
}

/// Proton price in nanoERG per [`PRECISION`] raw units
pub fn proton_price(gluon: &GluonBox, oracle: &GoldOracleBox) -> Result<i64, ProtocolError> {
    token_price(
        PRECISION - fusion_ratio(gluon, oracle),
        gluon.fissioned_erg(),
        gluon.circulating_protons(),
        "proton",
    )
}

fn token_price(
    share: i64,
    fissioned: i64,
    circulating: i64,
    token: &str,
) -> Result<i64, ProtocolError> {
    if circulating <= 0 {
        return Ok(0);
    }
    let price = BigInt::from(share) * BigInt::from(fissioned) / BigInt::from(circulating);
    to_i64(price, &format!("{} price", token))
}

/// Transmutation fee term in [`PRECISION`] units.
///
/// `PHI0 + PHI1 * max(0, sum(volume_to_negate) - sum(volume_to_minus)) / r_erg`
pub fn var_phi_beta(
    r_erg: i64,
    volume_to_negate: &VolumeBuckets,
    volume_to_minus: &VolumeBuckets,
) -> Result<i64, ProtocolError> {
    if r_erg <= 0 {
        return Err(ProtocolError::InvalidAmount {
            message: format!("Fissioned ERG must be positive, got {}", r_erg),
        });
    }
    let negate: BigInt = volume_to_negate.as_slice().iter().map(|v| BigInt::from(*v)).sum();
    let minus: BigInt = volume_to_minus.as_slice().iter().map(|v| BigInt::from(*v)).sum();
    let net = (negate - minus).max(BigInt::zero());
    let phi = BigInt::from(PHI0) + BigInt::from(PHI1) * net / BigInt::from(r_erg);
    to_i64(phi, "fee term")
}

pub(crate) fn to_i64(value: BigInt, what: &str) -> Result<i64, ProtocolError> {
    value.to_i64().ok_or_else(|| ProtocolError::InvalidAmount {
        message: format!("{} overflows a Long", what),
    })
}

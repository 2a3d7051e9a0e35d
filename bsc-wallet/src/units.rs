//! Conversions between base units (wei) and display amounts (BNB).
//!
//! Two paths are offered:
//!
//! - [`to_display`] / [`to_base_units`] go through `f64`. They lose precision
//!   past ~15 significant digits and must only feed presentation.
//! - [`format_amount`] / [`parse_amount`] are exact decimal conversions and
//!   are the ones to use when building on-chain amounts.

use alloy::primitives::U256;
use alloy::primitives::utils::{format_units, parse_units};

use crate::error::{Error, Result};

/// Decimal places of the native currency.
pub const DECIMALS: u8 = 18;

/// Base units per whole display unit, `10 * 10^17`.
pub const WEI_PER_UNIT: u128 = 10 * 10u128.pow(17);

#[allow(clippy::cast_precision_loss)]
const WEI_PER_UNIT_F64: f64 = WEI_PER_UNIT as f64;

/// Convert base units to a floating display amount (lossy).
#[must_use]
pub fn to_display(base_units: U256) -> f64 {
    f64::from(base_units) / WEI_PER_UNIT_F64
}

/// Convert a floating display amount to base units, truncating toward zero.
///
/// Lossy for amounts that need more precision than an `f64` carries; results
/// beyond `u128::MAX` saturate.
///
/// # Errors
///
/// Returns [`Error::InvalidAmount`] for negative, NaN or infinite input.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_base_units(display: f64) -> Result<U256> {
    if !display.is_finite() || display < 0.0 {
        return Err(Error::InvalidAmount(format!(
            "{display} is not a finite, non-negative amount"
        )));
    }
    Ok(U256::from((display * WEI_PER_UNIT_F64).floor() as u128))
}

/// Exact decimal rendering of a base-unit amount, e.g. `"1.500000000000000000"`.
#[must_use]
pub fn format_amount(base_units: U256) -> String {
    // 18 decimals is always a valid unit, so formatting cannot fail.
    format_units(base_units, DECIMALS).unwrap_or_else(|_| base_units.to_string())
}

/// Exact parse of a decimal display amount into base units.
///
/// # Errors
///
/// Returns [`Error::InvalidAmount`] if the string is not a non-negative
/// decimal. Digits past the 18th fractional place are truncated.
pub fn parse_amount(display: &str) -> Result<U256> {
    let parsed = parse_units(display.trim(), DECIMALS)
        .map_err(|e| Error::InvalidAmount(format!("'{display}': {e}")))?;
    if parsed.is_negative() {
        return Err(Error::InvalidAmount(format!("'{display}' is negative")));
    }
    Ok(parsed.get_absolute())
}

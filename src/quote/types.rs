//! Price quoting types

use crate::rpc::RpcError;
use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single price observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSample {
    /// Quoted token
    pub token: Address,
    /// Base asset received for one whole token
    pub price: Decimal,
    /// Local time the quote was taken
    pub timestamp: DateTime<Utc>,
}

/// Price quoting errors
#[derive(Debug, Error)]
pub enum QuoteError {
    /// Router call failed
    #[error("quote unavailable: {0}")]
    Unavailable(#[from] RpcError),
    /// Router returned data that does not decode
    #[error("malformed quote: {0}")]
    Malformed(String),
    /// Pair on the path has empty reserves
    #[error("no liquidity for path")]
    NoLiquidity,
    /// Amount does not fit a decimal price
    #[error("amount {0} out of decimal range")]
    OutOfRange(U256),
}

/// Largest mantissa a `Decimal` can carry
const MAX_MANTISSA: u128 = (1u128 << 96) - 1;
const MAX_SCALE: u32 = 28;

/// `numerator / denominator` as a `Decimal`
///
/// Long division, one decimal digit at a time. Digits beyond 28 decimal
/// places, or beyond what the 96-bit mantissa holds, are truncated.
pub fn ratio_to_decimal(numerator: U256, denominator: U256) -> Result<Decimal, QuoteError> {
    if denominator.is_zero() {
        return Err(QuoteError::Malformed("zero denominator".to_string()));
    }

    let ten = U256::from(10u8);
    let max = U256::from(MAX_MANTISSA);

    let mut mantissa = numerator / denominator;
    if mantissa > max {
        return Err(QuoteError::OutOfRange(numerator));
    }
    let mut remainder = numerator % denominator;
    let mut scale = 0;

    while scale < MAX_SCALE && !remainder.is_zero() {
        let Some(shifted) = remainder.checked_mul(ten) else {
            break;
        };
        let next = mantissa * ten + shifted / denominator;
        if next > max {
            break;
        }
        mantissa = next;
        remainder = shifted % denominator;
        scale += 1;
    }

    let mantissa = i128::try_from(mantissa.to::<u128>()).map_err(|_| QuoteError::OutOfRange(numerator))?;
    Decimal::try_from_i128_with_scale(mantissa, scale)
        .map(|d| d.normalize())
        .map_err(|_| QuoteError::OutOfRange(numerator))
}

/// Convert a raw token amount with `decimals` places into a `Decimal`
pub fn units_to_decimal(value: U256, decimals: u32) -> Result<Decimal, QuoteError> {
    ratio_to_decimal(value, U256::from(10u8).pow(U256::from(decimals)))
}

//! Pair detection types

use alloy_primitives::{Address, TxHash};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// A pool pairing a new token with the wrapped native asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPair {
    /// The token that is not the wrapped native asset
    pub token: Address,
    /// Pool address
    pub pair: Address,
    pub block: Option<u64>,
    pub transaction: Option<TxHash>,
    /// First price in the native asset; `None` when the quote failed
    pub price: Option<Decimal>,
    pub detected_at: DateTime<Utc>,
}

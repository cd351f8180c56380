//! Price quoting module
//!
//! Prices come from the exchange router's `getAmountsOut`, read through the
//! primary endpoint.

mod router;
mod types;

pub use router::RouterQuoter;
pub use types::{ratio_to_decimal, units_to_decimal, PriceSample, QuoteError};

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

/// Trait for price quoting implementations
#[async_trait]
pub trait PriceQuoter: Send + Sync {
    /// Raw output amount for swapping `amount_in` along `path`
    async fn amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<U256, QuoteError>;
    /// Current price of one whole `token` in the base asset
    async fn quote_price(&self, token: Address) -> Result<PriceSample, QuoteError>;
}

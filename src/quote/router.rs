//! Router-backed price quoter

use super::{ratio_to_decimal, PriceQuoter, PriceSample, QuoteError};
use crate::abi::IRouter;
use crate::rpc::{ChainRpc, RpcError};
use crate::telemetry::{self, LatencyMetric};
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::time::Instant;

/// Decimals of the wrapped native asset (WBNB)
const NATIVE_DECIMALS: u8 = 18;

/// Native input for the inverted quote: 0.001 of the native asset
const NATIVE_QUOTE_IN: u64 = 1_000_000_000_000_000;

/// Sell-side outputs below this many wei are too coarse to price from
const MIN_PRECISE_OUT: u64 = 1_000_000_000_000;

/// Revert reason of a pair whose reserves are empty
const INSUFFICIENT_LIQUIDITY: &str = "INSUFFICIENT_LIQUIDITY";

fn pow10(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Quotes prices through `getAmountsOut` on a UniswapV2-style router
///
/// The price of one whole token is read from the sell side first. When
/// that answer is under [`MIN_PRECISE_OUT`] wei, the token is worth too
/// little to price that way, so the native side is quoted instead and the
/// result inverted. Prices far below one wei per token stay exact.
pub struct RouterQuoter {
    rpc: Arc<dyn ChainRpc>,
    router: Address,
    wrapped_native: Address,
    token_decimals: u8,
}

impl RouterQuoter {
    /// Create a quoter reading through `rpc`
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        router: Address,
        wrapped_native: Address,
        token_decimals: u8,
    ) -> Self {
        Self {
            rpc,
            router,
            wrapped_native,
            token_decimals,
        }
    }

    /// One whole token in raw units
    fn one_token(&self) -> U256 {
        pow10(self.token_decimals)
    }

    /// Price from the native side: `NATIVE_QUOTE_IN` wei in, tokens out
    async fn inverted_price(&self, token: Address) -> Result<Decimal, QuoteError> {
        let native_in = U256::from(NATIVE_QUOTE_IN);
        let bought = self
            .amounts_out(native_in, &[self.wrapped_native, token])
            .await?;
        if bought.is_zero() {
            return Err(QuoteError::NoLiquidity);
        }

        let denominator = bought
            .checked_mul(pow10(NATIVE_DECIMALS))
            .ok_or(QuoteError::OutOfRange(bought))?;
        ratio_to_decimal(native_in * self.one_token(), denominator)
    }
}

#[async_trait]
impl PriceQuoter for RouterQuoter {
    /// Router output for `amount_in`; zero is a valid answer for dust
    async fn amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<U256, QuoteError> {
        let call = IRouter::getAmountsOutCall {
            amountIn: amount_in,
            path: path.to_vec(),
        };

        let started = Instant::now();
        let raw = match self.rpc.call(self.router, call.abi_encode().into()).await {
            Ok(raw) => raw,
            Err(RpcError::Rpc { message, .. }) if message.contains(INSUFFICIENT_LIQUIDITY) => {
                return Err(QuoteError::NoLiquidity)
            }
            Err(e) => return Err(e.into()),
        };
        telemetry::record_latency(LatencyMetric::Quote, started.elapsed());

        let amounts = IRouter::getAmountsOutCall::abi_decode_returns(&raw)
            .map_err(|e| QuoteError::Malformed(e.to_string()))?;

        amounts
            .last()
            .copied()
            .ok_or_else(|| QuoteError::Malformed("empty amounts".to_string()))
    }

    async fn quote_price(&self, token: Address) -> Result<PriceSample, QuoteError> {
        let out = self
            .amounts_out(self.one_token(), &[token, self.wrapped_native])
            .await?;

        let price = if out >= U256::from(MIN_PRECISE_OUT) {
            ratio_to_decimal(out, pow10(NATIVE_DECIMALS))?
        } else {
            tracing::trace!(token = %token, out = %out, "Sell-side quote too coarse, inverting");
            self.inverted_price(token).await?
        };

        tracing::trace!(token = %token, %price, "Quoted price");

        Ok(PriceSample {
            token,
            price,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{MockPool, MockRpc};
    use alloy_primitives::address;
    use alloy_sol_types::SolValue;
    use rust_decimal_macros::dec;

    const ROUTER: Address = address!("D99D1c33F9fC3444f8101754aBC46c52416550D1");
    const WBNB: Address = address!("ae13d989daC2f0dEbFf460aC112a837C89BAa7cd");
    const TOKEN: Address = address!("1111111111111111111111111111111111111111");

    fn amounts_reply(amounts: Vec<U256>) -> Vec<u8> {
        (amounts,).abi_encode_params()
    }

    fn e(exp: u64) -> U256 {
        U256::from(10u64).pow(U256::from(exp))
    }

    #[tokio::test]
    async fn test_quote_price_converts_to_decimal() {
        let reply = amounts_reply(vec![e(18), U256::from(2_500_000_000_000_000u64)]);
        let rpc = Arc::new(MockRpc::new("http://a").call_returns(reply));

        let quoter = RouterQuoter::new(rpc.clone(), ROUTER, WBNB, 18);
        let sample = quoter.quote_price(TOKEN).await.unwrap();

        assert_eq!(sample.token, TOKEN);
        assert_eq!(sample.price, dec!(0.0025));

        let (to, data) = rpc.last_call().unwrap();
        assert_eq!(to, ROUTER);
        let decoded = IRouter::getAmountsOutCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.amountIn, e(18));
        assert_eq!(decoded.path, vec![TOKEN, WBNB]);
    }

    #[tokio::test]
    async fn test_sub_wei_price_is_inverted() {
        // Selling one whole token yields 0 wei; 0.001 native buys 2e16 tokens
        let rpc = Arc::new(MockRpc::new("http://a").call_with(|_, data| {
            let call = IRouter::getAmountsOutCall::abi_decode(data).unwrap();
            let out = if call.path[0] == WBNB {
                U256::from(2u64) * e(34)
            } else {
                U256::ZERO
            };
            Ok(amounts_reply(vec![call.amountIn, out]).into())
        }));

        let quoter = RouterQuoter::new(rpc.clone(), ROUTER, WBNB, 18);
        let sample = quoter.quote_price(TOKEN).await.unwrap();
        assert_eq!(sample.price, dec!(0.00000000000000000005));

        let (_, data) = rpc.last_call().unwrap();
        let decoded = IRouter::getAmountsOutCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.amountIn, U256::from(NATIVE_QUOTE_IN));
        assert_eq!(decoded.path, vec![WBNB, TOKEN]);
    }

    #[tokio::test]
    async fn test_few_wei_price_keeps_precision() {
        // 3 wei per token: a 0.8x stop must see 2.4, not round to 2
        let pool = Arc::new(MockPool::new(WBNB, U256::from(3u64) * e(20), e(38)));
        let rpc = Arc::new(MockRpc::new("http://a").with_pool(pool.clone()));
        let quoter = RouterQuoter::new(rpc, ROUTER, WBNB, 18);

        let before = quoter.quote_price(TOKEN).await.unwrap().price;
        pool.set_reserves(U256::from(24u64) * e(19), e(38));
        let after = quoter.quote_price(TOKEN).await.unwrap().price;

        let ratio = after / before;
        assert!(ratio > dec!(0.79) && ratio < dec!(0.81), "ratio {ratio}");
    }

    #[tokio::test]
    async fn test_zero_output_is_a_price_not_an_error() {
        // Dust rounds down to zero; that is not missing liquidity
        let reply = amounts_reply(vec![U256::from(1u64), U256::ZERO]);
        let rpc = Arc::new(MockRpc::new("http://a").call_returns(reply));

        let quoter = RouterQuoter::new(rpc, ROUTER, WBNB, 18);
        assert_eq!(quoter.amounts_out(e(18), &[TOKEN, WBNB]).await.unwrap(), U256::ZERO);
    }

    #[tokio::test]
    async fn test_empty_reserves_are_no_liquidity() {
        let pool = Arc::new(MockPool::new(WBNB, U256::ZERO, U256::ZERO));
        let rpc = Arc::new(MockRpc::new("http://a").with_pool(pool));

        let quoter = RouterQuoter::new(rpc, ROUTER, WBNB, 18);
        let err = quoter.quote_price(TOKEN).await.unwrap_err();
        assert!(matches!(err, QuoteError::NoLiquidity));
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        let rpc = Arc::new(MockRpc::new("http://a").call_returns(vec![0x01, 0x02]));
        let quoter = RouterQuoter::new(rpc, ROUTER, WBNB, 18);
        let err = quoter.amounts_out(U256::from(1u64), &[TOKEN, WBNB]).await.unwrap_err();
        assert!(matches!(err, QuoteError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_rpc_failure_is_unavailable() {
        let rpc = Arc::new(MockRpc::new("http://a").unreachable());
        let quoter = RouterQuoter::new(rpc, ROUTER, WBNB, 18);
        let err = quoter.quote_price(TOKEN).await.unwrap_err();
        assert!(matches!(err, QuoteError::Unavailable(_)));
    }

    #[test]
    fn test_one_token_respects_decimals() {
        let rpc = Arc::new(MockRpc::new("http://a"));
        let quoter = RouterQuoter::new(rpc, ROUTER, WBNB, 9);
        assert_eq!(quoter.one_token(), U256::from(1_000_000_000u64));
    }
}

//! Buy and sell pipeline
//!
//! Every trade is: quote, build call, sign, race the broadcast, race the
//! receipt. Sells approve the router first and wait for that receipt
//! before swapping.

use super::{SellAmount, TradeError, TradeReport, TransactionSigner, UnsignedCall};
use crate::abi::{IERC20, IRouter};
use crate::config::TradeConfig;
use crate::exit::{ExitAction, ExitReport, ExitTrigger};
use crate::quote::{PriceQuoter, QuoteError};
use crate::rpc::{Endpoint, ReceiptRecord};
use crate::session::Session;
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const BPS_DENOMINATOR: u32 = 10_000;

/// Lower `amount` by `bps` basis points, rounding down
pub fn apply_slippage(amount: U256, bps: u32) -> U256 {
    let keep = BPS_DENOMINATOR.saturating_sub(bps);
    amount * U256::from(keep) / U256::from(BPS_DENOMINATOR)
}

/// Tunables for the pipeline
#[derive(Debug, Clone)]
pub struct TradeSettings {
    pub buy_slippage_bps: u32,
    pub sell_slippage_bps: u32,
    /// Swap deadline relative to signing time
    pub deadline: Duration,
    pub swap_gas_limit: u64,
    pub approve_gas_limit: u64,
}

impl From<&TradeConfig> for TradeSettings {
    fn from(config: &TradeConfig) -> Self {
        Self {
            buy_slippage_bps: config.buy_slippage_bps,
            sell_slippage_bps: config.sell_slippage_bps,
            deadline: Duration::from_secs(config.deadline_secs),
            swap_gas_limit: config.swap_gas_limit,
            approve_gas_limit: config.approve_gas_limit,
        }
    }
}

/// Router trader for one wallet
pub struct Trader {
    session: Arc<Session>,
    signer: Arc<dyn TransactionSigner>,
    quoter: Arc<dyn PriceQuoter>,
    settings: TradeSettings,
}

impl Trader {
    pub fn new(
        session: Arc<Session>,
        signer: Arc<dyn TransactionSigner>,
        quoter: Arc<dyn PriceQuoter>,
        settings: TradeSettings,
    ) -> Self {
        Self {
            session,
            signer,
            quoter,
            settings,
        }
    }

    /// Swap `amount_in` wei of the native asset for `token`
    pub async fn buy(&self, token: Address, amount_in: U256) -> Result<TradeReport, TradeError> {
        if amount_in.is_zero() {
            return Err(TradeError::ZeroAmount);
        }

        let addresses = self.session.addresses();
        let path = vec![addresses.wrapped_native, token];
        let quoted = self.quoter.amounts_out(amount_in, &path).await?;
        if quoted.is_zero() {
            return Err(TradeError::Quote(QuoteError::NoLiquidity));
        }
        let min_amount_out = apply_slippage(quoted, self.settings.buy_slippage_bps);

        tracing::info!(
            token = %token,
            amount_in = %amount_in,
            quoted = %quoted,
            min_out = %min_amount_out,
            "Buying"
        );

        let data = IRouter::swapExactETHForTokensCall {
            amountOutMin: min_amount_out,
            path,
            to: self.signer.address(),
            deadline: self.deadline(),
        }
        .abi_encode();

        let call = self.call(addresses.router, data.into(), amount_in, self.settings.swap_gas_limit);
        let (hash, endpoint, receipt) = self.execute(&call).await?;

        Ok(TradeReport {
            hash,
            endpoint,
            receipt,
            amount_in,
            min_amount_out,
        })
    }

    /// Swap `amount` of `token` back to the native asset
    pub async fn sell(&self, token: Address, amount: SellAmount) -> Result<TradeReport, TradeError> {
        let amount_in = match amount {
            SellAmount::All => {
                let balance = self.balance_of(token).await?;
                if balance.is_zero() {
                    return Err(TradeError::NothingToSell { token });
                }
                balance
            }
            SellAmount::Exact(amount) if amount.is_zero() => return Err(TradeError::ZeroAmount),
            SellAmount::Exact(amount) => amount,
        };

        let addresses = self.session.addresses();

        let approve = IERC20::approveCall {
            spender: addresses.router,
            amount: amount_in,
        }
        .abi_encode();
        let call = self.call(token, approve.into(), U256::ZERO, self.settings.approve_gas_limit);
        let (approve_hash, _, _) = self.execute(&call).await?;
        tracing::info!(token = %token, hash = %approve_hash, amount = %amount_in, "Router approved");

        let path = vec![token, addresses.wrapped_native];
        let quoted = self.quoter.amounts_out(amount_in, &path).await?;
        let min_amount_out = apply_slippage(quoted, self.settings.sell_slippage_bps);

        tracing::info!(
            token = %token,
            amount_in = %amount_in,
            quoted = %quoted,
            min_out = %min_amount_out,
            "Selling"
        );

        let data = IRouter::swapExactTokensForETHCall {
            amountIn: amount_in,
            amountOutMin: min_amount_out,
            path,
            to: self.signer.address(),
            deadline: self.deadline(),
        }
        .abi_encode();

        let call = self.call(addresses.router, data.into(), U256::ZERO, self.settings.swap_gas_limit);
        let (hash, endpoint, receipt) = self.execute(&call).await?;

        Ok(TradeReport {
            hash,
            endpoint,
            receipt,
            amount_in,
            min_amount_out,
        })
    }

    /// Wallet balance of `token`, read through the primary endpoint
    pub async fn balance_of(&self, token: Address) -> Result<U256, TradeError> {
        let data = IERC20::balanceOfCall {
            account: self.signer.address(),
        }
        .abi_encode();

        let raw = self.session.primary().call(token, data.into()).await?;
        IERC20::balanceOfCall::abi_decode_returns(&raw).map_err(|e| TradeError::Decode(e.to_string()))
    }

    fn call(&self, to: Address, data: Bytes, value: U256, gas_limit: u64) -> UnsignedCall {
        UnsignedCall {
            chain_id: self.session.addresses().chain_id,
            to,
            data,
            value,
            gas_limit,
        }
    }

    fn deadline(&self) -> U256 {
        let now = Utc::now().timestamp().max(0) as u64;
        U256::from(now + self.settings.deadline.as_secs())
    }

    /// Sign, race and confirm; a failed receipt is an error
    async fn execute(
        &self,
        call: &UnsignedCall,
    ) -> Result<(TxHash, Endpoint, ReceiptRecord), TradeError> {
        let tx = self.signer.sign(call).await.map_err(TradeError::Signing)?;
        let (hash, endpoint) = self.session.submit(&tx).await?;
        let receipt = self.session.confirm(hash).await?;

        if !receipt.succeeded() {
            tracing::error!(hash = %hash, block = receipt.block_number, "Transaction reverted");
            return Err(TradeError::Reverted { hash });
        }
        Ok((hash, endpoint, receipt))
    }
}

#[async_trait]
impl ExitAction for Trader {
    async fn exit_position(&self, token: Address, trigger: &ExitTrigger) -> anyhow::Result<ExitReport> {
        let report = self.sell(token, SellAmount::All).await?;
        Ok(ExitReport {
            token,
            reason: trigger.reason,
            hash: Some(report.hash),
            amount: report.amount_in,
            paper: false,
        })
    }
}

//! Trade pipeline module
//!
//! Builds router calls, hands them to an external signer and pushes the
//! signed blobs through the broadcast and confirmation racers.

mod signer;
mod trader;
mod types;

pub use signer::LocalKeySigner;
pub use trader::{apply_slippage, Trader, TradeSettings};
pub use types::{SellAmount, TradeError, TradeReport, UnsignedCall};

use crate::rpc::SignedTransaction;
use alloy_primitives::Address;
use async_trait::async_trait;

/// Signs calls on behalf of the trading wallet
///
/// Key handling lives entirely behind this trait; nonce and gas price are
/// the signer's business. [`LocalKeySigner`] is the in-process version.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Wallet address that owns the position
    fn address(&self) -> Address;
    /// Produce the raw signed transaction for `call`
    async fn sign(&self, call: &UnsignedCall) -> anyhow::Result<SignedTransaction>;
}

//! Trade types

use crate::quote::QuoteError;
use crate::race::RaceError;
use crate::rpc::{Endpoint, ReceiptRecord, RpcError};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use thiserror::Error;

/// A contract call waiting for a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedCall {
    pub chain_id: u64,
    pub to: Address,
    pub data: Bytes,
    /// Native value attached, in wei
    pub value: U256,
    pub gas_limit: u64,
}

/// How much of a position to sell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellAmount {
    /// The wallet's whole balance
    All,
    Exact(U256),
}

/// A confirmed swap
#[derive(Debug, Clone)]
pub struct TradeReport {
    pub hash: TxHash,
    /// Endpoint that accepted the transaction first
    pub endpoint: Endpoint,
    pub receipt: ReceiptRecord,
    pub amount_in: U256,
    pub min_amount_out: U256,
}

/// Trade pipeline errors
#[derive(Debug, Error)]
pub enum TradeError {
    #[error(transparent)]
    Race(#[from] RaceError),

    #[error("quote failed: {0}")]
    Quote(#[from] QuoteError),

    #[error("rpc call failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("signing failed: {0}")]
    Signing(#[source] anyhow::Error),

    #[error("malformed call result: {0}")]
    Decode(String),

    #[error("no balance of {token} to sell")]
    NothingToSell { token: Address },

    #[error("trade amount must be positive")]
    ZeroAmount,

    #[error("transaction {hash} reverted")]
    Reverted { hash: TxHash },
}

//! Chain RPC module
//!
//! Per-endpoint access to an EVM node: chain head, raw transaction
//! submission, receipts, read-only calls, event logs and the account state
//! a signer needs.

mod client;
mod types;

pub use client::JsonRpcClient;
pub use types::{
    Endpoint, LogFilter, LogRecord, ReceiptRecord, ReceiptStatus, RpcError, SignedTransaction,
};

use alloy_primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;

/// A single node the racers can talk to
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Endpoint this client is bound to
    fn endpoint(&self) -> &Endpoint;
    /// Latest block height
    async fn latest_height(&self) -> Result<u64, RpcError>;
    /// Submit a signed transaction blob, returning its hash
    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TxHash, RpcError>;
    /// Fetch the receipt for a transaction, `None` while pending or unknown
    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<ReceiptRecord>, RpcError>;
    /// Execute a read-only call against the latest block
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError>;
    /// Logs matching `filter`
    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, RpcError>;
    /// Next nonce for `address`, counting pending transactions
    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError>;
    /// Current gas price in wei
    async fn gas_price(&self) -> Result<u128, RpcError>;
}

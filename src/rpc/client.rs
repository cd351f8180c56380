//! JSON-RPC client for a single EVM node
//!
//! Backed by an alloy `RootProvider` over HTTP. Every request is bounded by
//! the client's per-call timeout so one slow node cannot hold up a race for
//! longer than that.

use super::{ChainRpc, Endpoint, LogFilter, LogRecord, ReceiptRecord, ReceiptStatus, RpcError};
use alloy_eips::BlockId;
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::network::{ReceiptResponse, TransactionBuilder};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{Filter, Log, TransactionRequest};
use alloy_transport::TransportResult;
use alloy_transport_http::Http;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::future::IntoFuture;
use std::time::Duration;

/// Receipts without a block number are not final yet
fn into_record<R: ReceiptResponse>(receipt: &R) -> Option<ReceiptRecord> {
    let block_number = receipt.block_number()?;
    let status = if receipt.status() {
        ReceiptStatus::Success
    } else {
        ReceiptStatus::Failure
    };
    Some(ReceiptRecord {
        hash: receipt.transaction_hash(),
        status,
        block_number,
        block_hash: receipt.block_hash(),
        gas_used: Some(receipt.gas_used()),
    })
}

fn into_log_record(log: Log) -> LogRecord {
    LogRecord {
        address: log.inner.address,
        topics: log.inner.data.topics().to_vec(),
        data: log.inner.data.data.clone(),
        block_number: log.block_number,
        transaction_hash: log.transaction_hash,
    }
}

/// JSON-RPC over HTTP bound to one endpoint
pub struct JsonRpcClient {
    endpoint: Endpoint,
    provider: RootProvider,
    timeout: Duration,
}

impl JsonRpcClient {
    /// Create a client for `url` with the given per-call timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let endpoint = Endpoint::new(url);
        let parsed: Url = endpoint
            .url
            .parse()
            .map_err(|e| RpcError::Transport(format!("invalid endpoint url {}: {e}", endpoint.url)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {e}")))?;
        let transport = Http::with_client(client, parsed);
        let provider = RootProvider::new(RpcClient::new(transport, false));

        Ok(Self {
            endpoint,
            provider,
            timeout,
        })
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, RpcError>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(RpcError::from),
            Err(_) => Err(RpcError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl ChainRpc for JsonRpcClient {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn latest_height(&self) -> Result<u64, RpcError> {
        self.bounded(self.provider.get_block_number()).await
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TxHash, RpcError> {
        let pending = self.bounded(self.provider.send_raw_transaction(raw)).await?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<ReceiptRecord>, RpcError> {
        let receipt = self
            .bounded(self.provider.get_transaction_receipt(hash))
            .await?;
        Ok(receipt.as_ref().and_then(into_record))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        self.bounded(self.provider.call(request).block(BlockId::latest()))
            .await
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, RpcError> {
        let query = Filter::new()
            .address(filter.address)
            .event_signature(filter.event)
            .from_block(filter.from_block)
            .to_block(filter.to_block);
        let logs = self.bounded(self.provider.get_logs(&query)).await?;
        Ok(logs.into_iter().map(into_log_record).collect())
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        self.bounded(
            self.provider
                .get_transaction_count(address)
                .block_id(BlockId::pending()),
        )
        .await
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        self.bounded(self.provider.get_gas_price()).await
    }
}

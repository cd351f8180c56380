//! Chain RPC types

use alloy_primitives::{Address, Bytes, TxHash, B256};
use alloy_transport::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Network address of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Failure of one call against one endpoint
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// No response within the per-call timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Connection, TLS or HTTP status failure
    #[error("transport error: {0}")]
    Transport(String),
    /// Node answered with a JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// Response did not have the expected shape
    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        RpcError::Transport(e.to_string())
    }
}

impl From<TransportError> for RpcError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::ErrorResp(payload) => RpcError::Rpc {
                code: payload.code,
                message: payload.message.to_string(),
            },
            TransportError::NullResp => RpcError::Decode("null response".to_string()),
            TransportError::SerError(e) => RpcError::Decode(e.to_string()),
            TransportError::DeserError { err, .. } => RpcError::Decode(err.to_string()),
            other => RpcError::Transport(other.to_string()),
        }
    }
}

/// A ready-to-broadcast transaction
///
/// The raw bytes are never modified after signing; duplicate broadcasts of
/// the same blob are rejected by nodes as already known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    raw: Bytes,
    hash: Option<TxHash>,
}

impl SignedTransaction {
    /// Wrap raw signed bytes whose hash is not known locally
    pub fn new(raw: impl Into<Bytes>) -> Self {
        Self {
            raw: raw.into(),
            hash: None,
        }
    }

    /// Wrap raw signed bytes together with the hash the signer computed
    pub fn with_hash(raw: impl Into<Bytes>, hash: TxHash) -> Self {
        Self {
            raw: raw.into(),
            hash: Some(hash),
        }
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn hash(&self) -> Option<TxHash> {
        self.hash
    }
}

/// Execution status recorded in a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Failure,
}

/// Finalized outcome of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    /// Transaction hash
    pub hash: TxHash,
    /// Success or revert
    pub status: ReceiptStatus,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Hash of the including block
    pub block_hash: Option<B256>,
    /// Gas consumed
    pub gas_used: Option<u64>,
}

impl ReceiptRecord {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Event log query over an inclusive block range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFilter {
    /// Emitting contract
    pub address: Address,
    /// Event signature hash (topic 0)
    pub event: B256,
    pub from_block: u64,
    pub to_block: u64,
}

/// One emitted event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<TxHash>,
}

//! Scripted collaborators for tests
//!
//! Delays go through `tokio::time`, so tests running with a paused clock
//! see exact latencies.

use crate::abi::{IFactory, IRouter};
use crate::exit::{ExitAction, ExitReason, ExitReport, ExitTrigger};
use crate::quote::{PriceQuoter, PriceSample, QuoteError};
use crate::rpc::{
    ChainRpc, Endpoint, LogFilter, LogRecord, ReceiptRecord, ReceiptStatus, RpcError,
    SignedTransaction,
};
use crate::trade::{TransactionSigner, UnsignedCall};
use alloy_primitives::{keccak256, Address, Bytes, TxHash, B256, U256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Successful receipt for `hash` mined in `block`
pub fn receipt(hash: TxHash, block: u64) -> ReceiptRecord {
    ReceiptRecord {
        hash,
        status: ReceiptStatus::Success,
        block_number: block,
        block_hash: Some(B256::repeat_byte(0x11)),
        gas_used: Some(21_000),
    }
}

/// `PairCreated` log emitted by `factory` in `block`
pub fn pair_created_log(factory: Address, token0: Address, token1: Address, pair: Address, block: u64) -> LogRecord {
    let event = IFactory::PairCreated {
        token0,
        token1,
        pair,
        pairIndex: U256::from(1u64),
    };
    let data = event.encode_log_data();
    LogRecord {
        address: factory,
        topics: data.topics().to_vec(),
        data: data.data,
        block_number: Some(block),
        transaction_hash: Some(TxHash::repeat_byte(0xcd)),
    }
}

fn refused() -> RpcError {
    RpcError::Transport("connection refused".to_string())
}

#[derive(Debug, Clone)]
enum Submit {
    NotScripted,
    Accept { delay: Duration, hash: TxHash },
    Echo,
    Reject(String),
}

type CallHandler = Box<dyn Fn(Address, &Bytes) -> Result<Bytes, RpcError> + Send + Sync>;

/// Scripted chain endpoint
///
/// Unscripted calls answer immediately: height 1, no receipt, no logs,
/// nonce 0, submissions and contract calls rejected.
pub struct MockRpc {
    endpoint: Endpoint,
    unreachable: bool,
    height: (Duration, u64),
    submit: Submit,
    receipt: Option<(usize, ReceiptRecord)>,
    receipt_delay: Duration,
    call_reply: Option<Bytes>,
    call_handler: Option<CallHandler>,
    logs: Vec<LogRecord>,
    nonce: u64,
    gas_price: u128,
    submissions: AtomicUsize,
    receipt_polls: AtomicUsize,
    calls: Mutex<Vec<(Address, Bytes)>>,
    log_filters: Mutex<Vec<LogFilter>>,
}

impl MockRpc {
    pub fn new(url: &str) -> Self {
        Self {
            endpoint: Endpoint::new(url),
            unreachable: false,
            height: (Duration::ZERO, 1),
            submit: Submit::NotScripted,
            receipt: None,
            receipt_delay: Duration::ZERO,
            call_reply: None,
            call_handler: None,
            logs: vec![],
            nonce: 0,
            gas_price: 3_000_000_000,
            submissions: AtomicUsize::new(0),
            receipt_polls: AtomicUsize::new(0),
            calls: Mutex::new(vec![]),
            log_filters: Mutex::new(vec![]),
        }
    }

    /// Fail every call at once
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn height_after(mut self, delay: Duration, height: u64) -> Self {
        self.height = (delay, height);
        self
    }

    pub fn accepts_after(mut self, delay: Duration, hash: TxHash) -> Self {
        self.submit = Submit::Accept { delay, hash };
        self
    }

    /// Accept immediately, answering with the keccak hash of the blob
    pub fn echoes_hash(mut self) -> Self {
        self.submit = Submit::Echo;
        self
    }

    pub fn rejects(mut self, message: &str) -> Self {
        self.submit = Submit::Reject(message.to_string());
        self
    }

    /// Answer `None` to the first `polls` receipt requests, then `record`
    pub fn receipt_after_polls(mut self, polls: usize, record: ReceiptRecord) -> Self {
        self.receipt = Some((polls, record));
        self
    }

    pub fn receipt_delay(mut self, delay: Duration) -> Self {
        self.receipt_delay = delay;
        self
    }

    pub fn call_returns(mut self, reply: Vec<u8>) -> Self {
        self.call_reply = Some(reply.into());
        self
    }

    /// Answer contract calls with `handler`, which sees target and calldata
    pub fn call_with(
        mut self,
        handler: impl Fn(Address, &Bytes) -> Result<Bytes, RpcError> + Send + Sync + 'static,
    ) -> Self {
        self.call_handler = Some(Box::new(handler));
        self
    }

    /// Answer `getAmountsOut` from `pool`
    pub fn with_pool(self, pool: Arc<MockPool>) -> Self {
        self.call_with(move |_, data| pool.answer(data))
    }

    /// Return `logs` to every log query
    pub fn logs_return(mut self, logs: Vec<LogRecord>) -> Self {
        self.logs = logs;
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn gas_price(mut self, wei: u128) -> Self {
        self.gas_price = wei;
        self
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn receipt_polls(&self) -> usize {
        self.receipt_polls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<(Address, Bytes)> {
        self.calls.lock().ok()?.last().cloned()
    }

    pub fn last_log_filter(&self) -> Option<LogFilter> {
        self.log_filters.lock().ok()?.last().copied()
    }

    pub fn log_queries(&self) -> usize {
        self.log_filters.lock().map(|f| f.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn latest_height(&self) -> Result<u64, RpcError> {
        if self.unreachable {
            return Err(refused());
        }
        let (delay, height) = self.height;
        tokio::time::sleep(delay).await;
        Ok(height)
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TxHash, RpcError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(refused());
        }
        match &self.submit {
            Submit::NotScripted => Err(RpcError::Rpc {
                code: -32000,
                message: "submission not scripted".to_string(),
            }),
            Submit::Accept { delay, hash } => {
                tokio::time::sleep(*delay).await;
                Ok(*hash)
            }
            Submit::Echo => Ok(keccak256(raw)),
            Submit::Reject(message) => Err(RpcError::Rpc {
                code: -32000,
                message: message.clone(),
            }),
        }
    }

    async fn transaction_receipt(&self, _hash: TxHash) -> Result<Option<ReceiptRecord>, RpcError> {
        let poll = self.receipt_polls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(refused());
        }
        tokio::time::sleep(self.receipt_delay).await;
        Ok(match &self.receipt {
            Some((after, record)) if poll >= *after => Some(record.clone()),
            _ => None,
        })
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((to, data.clone()));
        }
        if self.unreachable {
            return Err(refused());
        }
        if let Some(handler) = &self.call_handler {
            return handler(to, &data);
        }
        self.call_reply.clone().ok_or_else(|| RpcError::Rpc {
            code: 3,
            message: "execution reverted".to_string(),
        })
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, RpcError> {
        if self.unreachable {
            return Err(refused());
        }
        if let Ok(mut filters) = self.log_filters.lock() {
            filters.push(*filter);
        }
        Ok(self.logs.clone())
    }

    async fn transaction_count(&self, _address: Address) -> Result<u64, RpcError> {
        if self.unreachable {
            return Err(refused());
        }
        Ok(self.nonce)
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        if self.unreachable {
            return Err(refused());
        }
        Ok(self.gas_price)
    }
}

/// Constant-product pool behind a mock router
///
/// Answers `getAmountsOut` for a two-hop path between the wrapped native
/// asset and one token, with the 0.25% swap fee. Empty reserves revert the
/// way the router library does.
pub struct MockPool {
    wrapped_native: Address,
    /// (native, token)
    reserves: Mutex<(U256, U256)>,
}

impl MockPool {
    pub fn new(wrapped_native: Address, native_reserve: U256, token_reserve: U256) -> Self {
        Self {
            wrapped_native,
            reserves: Mutex::new((native_reserve, token_reserve)),
        }
    }

    pub fn set_reserves(&self, native_reserve: U256, token_reserve: U256) {
        if let Ok(mut reserves) = self.reserves.lock() {
            *reserves = (native_reserve, token_reserve);
        }
    }

    fn answer(&self, data: &[u8]) -> Result<Bytes, RpcError> {
        let call = IRouter::getAmountsOutCall::abi_decode(data)
            .map_err(|e| RpcError::Decode(e.to_string()))?;
        let (native, token) = *self
            .reserves
            .lock()
            .map_err(|_| RpcError::Transport("pool poisoned".to_string()))?;

        let (reserve_in, reserve_out) = match call.path.first() {
            Some(first) if *first == self.wrapped_native => (native, token),
            _ => (token, native),
        };
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(RpcError::Rpc {
                code: 3,
                message: "execution reverted: PancakeLibrary: INSUFFICIENT_LIQUIDITY".to_string(),
            });
        }

        let with_fee = call.amountIn * U256::from(9975u64);
        let out = with_fee * reserve_out / (reserve_in * U256::from(10_000u64) + with_fee);
        Ok((vec![call.amountIn, out],).abi_encode_params().into())
    }
}

/// Scripted price feed
///
/// Each quote takes the next scripted entry and the last one repeats;
/// `None` entries fail that quote.
pub struct MockQuoter {
    script: Mutex<VecDeque<Option<Decimal>>>,
    last: Mutex<Option<Option<Decimal>>>,
    delay: Duration,
    amounts_out: Option<U256>,
    quotes: AtomicUsize,
}

impl MockQuoter {
    pub fn new(prices: Vec<Option<Decimal>>) -> Self {
        Self {
            script: Mutex::new(prices.into()),
            last: Mutex::new(None),
            delay: Duration::ZERO,
            amounts_out: None,
            quotes: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fixed answer for `amounts_out`
    pub fn with_amounts_out(mut self, amount: U256) -> Self {
        self.amounts_out = Some(amount);
        self
    }

    pub fn quotes_taken(&self) -> usize {
        self.quotes.load(Ordering::SeqCst)
    }

    fn next_price(&self) -> Option<Decimal> {
        let (Ok(mut script), Ok(mut last)) = (self.script.lock(), self.last.lock()) else {
            return None;
        };
        if let Some(next) = script.pop_front() {
            *last = Some(next);
        }
        last.flatten()
    }
}

#[async_trait]
impl PriceQuoter for MockQuoter {
    async fn amounts_out(&self, _amount_in: U256, _path: &[Address]) -> Result<U256, QuoteError> {
        self.amounts_out.ok_or(QuoteError::NoLiquidity)
    }

    async fn quote_price(&self, token: Address) -> Result<PriceSample, QuoteError> {
        self.quotes.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match self.next_price() {
            Some(price) => Ok(PriceSample {
                token,
                price,
                timestamp: Utc::now(),
            }),
            None => Err(QuoteError::Unavailable(refused())),
        }
    }
}

/// Exit action that only remembers it was called
pub struct RecordingExit {
    failure: Option<String>,
    calls: Mutex<Vec<ExitReason>>,
}

impl RecordingExit {
    pub fn new() -> Self {
        Self {
            failure: None,
            calls: Mutex::new(vec![]),
        }
    }

    /// Every exit fails with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> Vec<ExitReason> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Default for RecordingExit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExitAction for RecordingExit {
    async fn exit_position(&self, token: Address, trigger: &ExitTrigger) -> anyhow::Result<ExitReport> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(trigger.reason);
        }
        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        Ok(ExitReport {
            token,
            reason: trigger.reason,
            hash: Some(TxHash::repeat_byte(0xee)),
            amount: U256::from(1u64),
            paper: false,
        })
    }
}

/// Signer producing a deterministic fake blob per call
pub struct MockSigner {
    address: Address,
    calls: Mutex<Vec<UnsignedCall>>,
}

impl MockSigner {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            calls: Mutex::new(vec![]),
        }
    }

    /// Calls signed so far, in order
    pub fn calls(&self) -> Vec<UnsignedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, call: &UnsignedCall) -> anyhow::Result<SignedTransaction> {
        let mut calls = self
            .calls
            .lock()
            .map_err(|_| anyhow::anyhow!("signer poisoned"))?;
        calls.push(call.clone());

        let mut raw = Vec::with_capacity(call.data.len() + 60);
        raw.extend_from_slice(&(calls.len() as u64).to_be_bytes());
        raw.extend_from_slice(call.to.as_slice());
        raw.extend_from_slice(&call.value.to_be_bytes::<32>());
        raw.extend_from_slice(&call.data);

        let hash = keccak256(&raw);
        Ok(SignedTransaction::with_hash(raw, hash))
    }
}

//! Factory log poller

use super::NewPair;
use crate::abi::IFactory;
use crate::quote::PriceQuoter;
use crate::rpc::{ChainRpc, LogFilter, LogRecord, RpcError};
use alloy_primitives::Address;
use alloy_sol_types::SolEvent;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Most blocks asked for in a single `eth_getLogs`
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 2000;

const FEED_CAPACITY: usize = 64;

enum Wake {
    Tick,
    Stop,
    Spurious,
}

/// Watches one factory for pools against the wrapped native asset
pub struct PairWatcher {
    rpc: Arc<dyn ChainRpc>,
    quoter: Arc<dyn PriceQuoter>,
    factory: Address,
    wrapped_native: Address,
    poll_interval: Duration,
    max_block_range: u64,
    next_block: Option<u64>,
}

impl PairWatcher {
    /// Watch `factory` through `rpc`, starting at the chain head
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        quoter: Arc<dyn PriceQuoter>,
        factory: Address,
        wrapped_native: Address,
    ) -> Self {
        Self {
            rpc,
            quoter,
            factory,
            wrapped_native,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
            next_block: None,
        }
    }

    pub fn poll_every(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn max_block_range(mut self, blocks: u64) -> Self {
        self.max_block_range = blocks.max(1);
        self
    }

    /// Start from `block` instead of the head
    pub fn from_block(mut self, block: u64) -> Self {
        self.next_block = Some(block);
        self
    }

    /// First block the next poll will ask for
    pub fn next_block(&self) -> Option<u64> {
        self.next_block
    }

    /// One pass from the last seen block up to the head
    ///
    /// Ranges wider than the block cap are walked over several polls. The
    /// cursor only advances once the log query succeeded.
    pub async fn poll_once(&mut self) -> Result<Vec<NewPair>, RpcError> {
        let head = self.rpc.latest_height().await?;
        let from = self.next_block.unwrap_or(head);
        if from > head {
            return Ok(vec![]);
        }
        let to = head.min(from.saturating_add(self.max_block_range - 1));

        let filter = LogFilter {
            address: self.factory,
            event: IFactory::PairCreated::SIGNATURE_HASH,
            from_block: from,
            to_block: to,
        };
        let logs = self.rpc.logs(&filter).await?;
        self.next_block = Some(to + 1);

        tracing::trace!(from, to, logs = logs.len(), "Scanned factory logs");

        let mut found = Vec::new();
        for log in &logs {
            if let Some((token, pair)) = self.match_log(log) {
                found.push(self.describe(token, pair, log).await);
            }
        }
        Ok(found)
    }

    /// `(new token, pair)` when the log pairs something with the wrapped native asset
    fn match_log(&self, log: &LogRecord) -> Option<(Address, Address)> {
        let event = match IFactory::PairCreated::decode_raw_log(log.topics.iter().copied(), &log.data) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(tx = ?log.transaction_hash, error = %e, "Skipping undecodable PairCreated log");
                return None;
            }
        };

        if event.token0 == self.wrapped_native {
            Some((event.token1, event.pair))
        } else if event.token1 == self.wrapped_native {
            Some((event.token0, event.pair))
        } else {
            None
        }
    }

    async fn describe(&self, token: Address, pair: Address, log: &LogRecord) -> NewPair {
        let price = match self.quoter.quote_price(token).await {
            Ok(sample) => Some(sample.price),
            Err(e) => {
                tracing::debug!(token = %token, error = %e, "First quote failed");
                None
            }
        };

        tracing::info!(token = %token, pair = %pair, block = ?log.block_number, price = ?price, "New pair detected");

        NewPair {
            token,
            pair,
            block: log.block_number,
            transaction: log.transaction_hash,
            price,
            detected_at: Utc::now(),
        }
    }

    /// Spawn the polling loop
    pub fn start(self) -> PairFeed {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (pair_tx, pair_rx) = mpsc::channel(FEED_CAPACITY);

        tracing::info!(
            factory = %self.factory,
            poll_ms = self.poll_interval.as_millis() as u64,
            "Watching for new pairs"
        );

        let task = tokio::spawn(self.run(pair_tx, cancel_rx));
        PairFeed {
            cancel_tx,
            pair_rx,
            task,
        }
    }

    async fn run(mut self, pair_tx: mpsc::Sender<NewPair>, mut cancel_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let wake = tokio::select! {
                _ = ticker.tick() => Wake::Tick,
                changed = cancel_rx.changed() => match changed {
                    Ok(()) if *cancel_rx.borrow() => Wake::Stop,
                    Ok(()) => Wake::Spurious,
                    Err(_) => Wake::Stop,
                },
            };

            match wake {
                Wake::Tick => {}
                Wake::Spurious => continue,
                Wake::Stop => break,
            }

            match self.poll_once().await {
                Ok(pairs) => {
                    for pair in pairs {
                        if pair_tx.send(pair).await.is_err() {
                            return;
                        }
                    }
                }
                // Same range is retried next tick
                Err(e) => tracing::warn!(error = %e, "Pair poll failed"),
            }
        }

        tracing::info!(next_block = ?self.next_block, "Pair watcher stopped");
    }
}

/// Receiving end of a running watcher
pub struct PairFeed {
    cancel_tx: watch::Sender<bool>,
    pair_rx: mpsc::Receiver<NewPair>,
    task: JoinHandle<()>,
}

impl PairFeed {
    /// Next detection; `None` once the watcher stopped
    pub async fn next(&mut self) -> Option<NewPair> {
        self.pair_rx.recv().await
    }

    /// Stop polling after the current pass
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

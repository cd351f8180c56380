//! Redundant confirmation polling
//!
//! A new round starts every poll interval and asks every idle endpoint for
//! the receipt. Answers from all rounds feed one channel, so a late answer
//! from an earlier round still wins, and an endpoint that has not answered
//! yet is skipped rather than asked twice. A hung node never stretches the
//! cadence. The whole loop runs under a hard deadline.

use super::{EndpointSet, RaceError};
use crate::rpc::{Endpoint, ReceiptRecord, RpcError};
use crate::telemetry::{self, LatencyMetric, RaceOp};
use alloy_primitives::TxHash;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// One receipt answer, tagged with who answered and which round asked
struct Answer {
    index: usize,
    endpoint: Endpoint,
    round: u64,
    result: Result<Option<ReceiptRecord>, RpcError>,
}

#[derive(Default)]
struct RoundTally {
    asked: usize,
    answered: usize,
    failed: usize,
}

/// First-available receipt poller
#[derive(Debug, Clone)]
pub struct ConfirmationRacer {
    poll_interval: Duration,
    request_timeout: Duration,
}

impl ConfirmationRacer {
    /// Create a racer polling every `poll_interval`, each call bounded by `request_timeout`
    pub fn new(poll_interval: Duration, request_timeout: Duration) -> Self {
        Self {
            poll_interval,
            request_timeout,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait up to `timeout` from now for a receipt
    pub async fn confirm(
        &self,
        hash: TxHash,
        endpoints: &EndpointSet,
        timeout: Duration,
    ) -> Result<ReceiptRecord, RaceError> {
        self.confirm_by(hash, endpoints, Instant::now() + timeout).await
    }

    /// Wait until `deadline` for a receipt
    ///
    /// Fails with `ConfirmationTimeout` exactly when no endpoint produced a
    /// receipt before the deadline.
    pub async fn confirm_by(
        &self,
        hash: TxHash,
        endpoints: &EndpointSet,
        deadline: Instant,
    ) -> Result<ReceiptRecord, RaceError> {
        let started = Instant::now();

        match tokio::time::timeout_at(deadline, self.poll_until_found(hash, endpoints)).await {
            Ok(receipt) => {
                let elapsed = started.elapsed();
                telemetry::record_latency(LatencyMetric::Confirmation, elapsed);
                tracing::info!(
                    hash = %hash,
                    block = receipt.block_number,
                    status = ?receipt.status,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Transaction confirmed"
                );
                Ok(receipt)
            }
            Err(_) => {
                let waited = started.elapsed();
                tracing::error!(hash = %hash, waited_ms = waited.as_millis() as u64, "Confirmation timed out");
                Err(RaceError::ConfirmationTimeout { hash, waited })
            }
        }
    }

    async fn poll_until_found(&self, hash: TxHash, endpoints: &EndpointSet) -> ReceiptRecord {
        let (answer_tx, mut answer_rx) = mpsc::unbounded_channel::<Answer>();
        let mut in_flight = vec![false; endpoints.len()];
        let mut tallies: HashMap<u64, RoundTally> = HashMap::new();
        let mut round: u64 = 0;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                Some(answer) = answer_rx.recv() => {
                    in_flight[answer.index] = false;
                    if let Some(receipt) = record_answer(hash, answer, &mut tallies) {
                        return receipt;
                    }
                }
                _ = ticker.tick() => {
                    round += 1;
                    let asked = self.start_round(hash, endpoints, round, &mut in_flight, &answer_tx);
                    if asked == 0 {
                        tracing::trace!(hash = %hash, round, "Every endpoint still busy");
                    } else {
                        tallies.insert(round, RoundTally { asked, ..Default::default() });
                    }
                }
            }
        }
    }

    /// Ask every idle endpoint once; returns how many were asked
    fn start_round(
        &self,
        hash: TxHash,
        endpoints: &EndpointSet,
        round: u64,
        in_flight: &mut [bool],
        answer_tx: &mpsc::UnboundedSender<Answer>,
    ) -> usize {
        let mut asked = 0;

        for (index, rpc) in endpoints.iter().enumerate() {
            if in_flight[index] {
                continue;
            }
            in_flight[index] = true;
            asked += 1;

            let rpc = Arc::clone(rpc);
            let answer_tx = answer_tx.clone();
            let timeout = self.request_timeout;

            tokio::spawn(async move {
                let result = match tokio::time::timeout(timeout, rpc.transaction_receipt(hash)).await {
                    Ok(result) => result,
                    Err(_) => Err(RpcError::Timeout(timeout)),
                };
                let _ = answer_tx.send(Answer {
                    index,
                    endpoint: rpc.endpoint().clone(),
                    round,
                    result,
                });
            });
        }

        asked
    }
}

/// Fold one answer into its round; `Some` once a receipt arrives
fn record_answer(
    hash: TxHash,
    answer: Answer,
    tallies: &mut HashMap<u64, RoundTally>,
) -> Option<ReceiptRecord> {
    let Answer {
        endpoint,
        round,
        result,
        ..
    } = answer;
    let tally = tallies.entry(round).or_default();
    tally.answered += 1;

    match result {
        Ok(Some(receipt)) => {
            tracing::debug!(endpoint = %endpoint, round, "Receipt found");
            return Some(receipt);
        }
        Ok(None) => {}
        Err(e) => {
            tally.failed += 1;
            telemetry::record_endpoint_failure(RaceOp::Receipt, &endpoint);
            tracing::debug!(endpoint = %endpoint, round, error = %e, "Receipt poll failed");
        }
    }

    if tally.answered >= tally.asked {
        if tally.failed == tally.answered {
            tracing::warn!(hash = %hash, round, "Every endpoint failed this poll round");
        } else {
            tracing::trace!(hash = %hash, round, failed = tally.failed, "No receipt yet");
        }
        tallies.remove(&round);
    }
    None
}

//! Redundant transaction broadcast
//!
//! The same signed blob goes to every endpoint at once. The first
//! acceptance is authoritative; later answers are ignored and their tasks
//! left to run out on their own.

use super::{EndpointSet, EndpointUnreachable, SubmissionOutcome};
use crate::rpc::{RpcError, SignedTransaction};
use crate::telemetry::{self, LatencyMetric, RaceOp};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Node error messages meaning the blob is already in the mempool
const ALREADY_KNOWN: &[&str] = &["already known", "known transaction", "already imported"];

fn is_already_known(error: &RpcError) -> bool {
    match error {
        RpcError::Rpc { message, .. } => {
            let message = message.to_lowercase();
            ALREADY_KNOWN.iter().any(|m| message.contains(m))
        }
        _ => false,
    }
}

/// First-success broadcaster
#[derive(Debug, Clone)]
pub struct BroadcastRacer {
    timeout: Duration,
}

impl BroadcastRacer {
    /// Create a racer; `timeout` bounds each endpoint's submission
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Submit `tx` to every endpoint, returning the first accepted hash
    ///
    /// Returns `Failed` only once every endpoint has failed or timed out,
    /// which is bounded by a single timeout since all calls run at once.
    pub async fn broadcast(
        &self,
        tx: &SignedTransaction,
        endpoints: &EndpointSet,
    ) -> SubmissionOutcome {
        let started = Instant::now();
        let (result_tx, mut result_rx) = mpsc::channel(endpoints.len());

        for rpc in endpoints.iter() {
            let rpc = Arc::clone(rpc);
            let raw = tx.raw().clone();
            let result_tx = result_tx.clone();
            let timeout = self.timeout;

            tokio::spawn(async move {
                let result = match tokio::time::timeout(timeout, rpc.send_raw_transaction(&raw)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(RpcError::Timeout(timeout)),
                };
                // Receiver is gone once a winner has been picked
                let _ = result_tx.send((rpc.endpoint().clone(), result)).await;
            });
        }
        drop(result_tx);

        let mut failures = Vec::new();

        while let Some((endpoint, result)) = result_rx.recv().await {
            let accepted = match result {
                Ok(hash) => Ok(hash),
                // Another node already relayed our blob to this one
                Err(e) if is_already_known(&e) => match tx.hash() {
                    Some(hash) => {
                        tracing::debug!(endpoint = %endpoint, "Endpoint already knows the transaction");
                        Ok(hash)
                    }
                    None => Err(e),
                },
                Err(e) => Err(e),
            };

            match accepted {
                Ok(hash) => {
                    let elapsed = started.elapsed();
                    if let Some(expected) = tx.hash() {
                        if expected != hash {
                            tracing::warn!(
                                endpoint = %endpoint,
                                %expected,
                                returned = %hash,
                                "Endpoint returned an unexpected transaction hash"
                            );
                        }
                    }
                    telemetry::record_latency(LatencyMetric::Broadcast, elapsed);
                    tracing::info!(
                        endpoint = %endpoint,
                        hash = %hash,
                        elapsed_ms = elapsed.as_millis() as u64,
                        failed_before = failures.len(),
                        "Transaction accepted"
                    );
                    return SubmissionOutcome::Accepted {
                        hash,
                        endpoint,
                        elapsed,
                    };
                }
                Err(source) => {
                    telemetry::record_endpoint_failure(RaceOp::Broadcast, &endpoint);
                    tracing::warn!(endpoint = %endpoint, error = %source, "Broadcast failed");
                    failures.push(EndpointUnreachable { endpoint, source });
                }
            }
        }

        tracing::error!(
            attempted = failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Transaction rejected by every endpoint"
        );
        SubmissionOutcome::Failed { failures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::ChainRpc;
    use crate::testkit::MockRpc;
    use alloy_primitives::TxHash;

    fn set(mocks: Vec<Arc<MockRpc>>) -> EndpointSet {
        EndpointSet::new(
            mocks
                .into_iter()
                .map(|m| m as Arc<dyn ChainRpc>)
                .collect(),
        )
        .unwrap()
    }

    fn signed() -> SignedTransaction {
        SignedTransaction::new(vec![0x02, 0xf8, 0x6b])
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_acceptance_wins() {
        let hash = TxHash::repeat_byte(0xab);
        let endpoints = set(vec![
            Arc::new(MockRpc::new("http://a").rejects("insufficient funds")),
            Arc::new(MockRpc::new("http://b").accepts_after(Duration::from_millis(10), hash)),
            Arc::new(MockRpc::new("http://c").accepts_after(Duration::from_millis(30), hash)),
        ]);

        let racer = BroadcastRacer::new(Duration::from_secs(5));
        let outcome = racer.broadcast(&signed(), &endpoints).await;

        match outcome {
            SubmissionOutcome::Accepted { hash: got, endpoint, .. } => {
                assert_eq!(got, hash);
                assert_eq!(endpoint.url, "http://b");
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_without_waiting_for_slow_endpoints() {
        let hash = TxHash::repeat_byte(0x01);
        let endpoints = set(vec![
            Arc::new(MockRpc::new("http://slow").accepts_after(Duration::from_secs(4), hash)),
            Arc::new(MockRpc::new("http://fast").accepts_after(Duration::from_millis(5), hash)),
        ]);

        let racer = BroadcastRacer::new(Duration::from_secs(5));
        let started = Instant::now();
        let outcome = racer.broadcast(&signed(), &endpoints).await;

        assert!(outcome.is_accepted());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failed_is_bounded_by_one_timeout() {
        let hash = TxHash::repeat_byte(0x01);
        let endpoints = set(vec![
            Arc::new(MockRpc::new("http://a").rejects("nonce too low")),
            Arc::new(MockRpc::new("http://b").accepts_after(Duration::from_secs(60), hash)),
            Arc::new(MockRpc::new("http://c").accepts_after(Duration::from_secs(60), hash)),
            Arc::new(MockRpc::new("http://d").unreachable()),
        ]);

        let timeout = Duration::from_secs(2);
        let racer = BroadcastRacer::new(timeout);
        let started = Instant::now();
        let outcome = racer.broadcast(&signed(), &endpoints).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= timeout);
        assert!(elapsed < timeout * 2);
        match outcome {
            SubmissionOutcome::Failed { failures } => {
                assert_eq!(failures.len(), 4);
                let timeouts = failures
                    .iter()
                    .filter(|f| matches!(f.source, RpcError::Timeout(_)))
                    .count();
                assert_eq!(timeouts, 2);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_known_counts_as_accepted_when_hash_is_known() {
        let hash = TxHash::repeat_byte(0x77);
        let endpoints = set(vec![Arc::new(
            MockRpc::new("http://a").rejects("already known"),
        )]);

        let racer = BroadcastRacer::new(Duration::from_secs(1));
        let tx = SignedTransaction::with_hash(vec![0x02], hash);
        let outcome = racer.broadcast(&tx, &endpoints).await;
        assert_eq!(outcome.hash(), Some(hash));

        let outcome = racer.broadcast(&signed(), &endpoints).await;
        assert!(!outcome.is_accepted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_endpoint_receives_the_blob() {
        let hash = TxHash::repeat_byte(0x02);
        let a = Arc::new(MockRpc::new("http://a").accepts_after(Duration::from_millis(1), hash));
        let b = Arc::new(MockRpc::new("http://b").accepts_after(Duration::from_millis(50), hash));
        let endpoints = set(vec![a.clone(), b.clone()]);

        let racer = BroadcastRacer::new(Duration::from_secs(1));
        racer.broadcast(&signed(), &endpoints).await;

        // Let the detached loser finish
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(a.submissions(), 1);
        assert_eq!(b.submissions(), 1);
    }

    #[test]
    fn test_already_known_messages() {
        let known = RpcError::Rpc {
            code: -32000,
            message: "Known transaction: 0xab".to_string(),
        };
        assert!(is_already_known(&known));
        assert!(!is_already_known(&RpcError::Transport("already known".to_string())));
    }
}

//! Endpoint latency probing
//!
//! Issues `latest_height` to every endpoint at once and picks the fastest
//! responder as the primary read connection. Failures are logged and
//! treated as infinite latency; when nothing answers, the first configured
//! endpoint is used so a session always has a connection.

use super::EndpointSet;
use crate::rpc::{ChainRpc, Endpoint, RpcError};
use crate::telemetry::{self, GaugeMetric, LatencyMetric, RaceOp};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Latency measurement for one endpoint
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub endpoint: Endpoint,
    /// Round-trip latency, `None` when the endpoint failed or timed out
    pub latency: Option<Duration>,
    /// Chain height reported by the endpoint
    pub height: Option<u64>,
}

impl ProbeResult {
    pub fn reachable(&self) -> bool {
        self.latency.is_some()
    }
}

/// Outcome of one probe round
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub results: Vec<ProbeResult>,
    selected: usize,
    fallback: bool,
}

impl ProbeReport {
    /// Index of the selected endpoint in the probed set
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> &ProbeResult {
        &self.results[self.selected]
    }

    /// True when no endpoint answered and the first one was taken blindly
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn reachable_count(&self) -> usize {
        self.results.iter().filter(|r| r.reachable()).count()
    }
}

/// Index of the lowest-latency reachable result
///
/// Ties go to the earlier entry. Returns `None` if nothing is reachable.
pub fn select_fastest(results: &[ProbeResult]) -> Option<usize> {
    results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.latency.map(|latency| (i, latency)))
        .min_by_key(|&(_, latency)| latency)
        .map(|(i, _)| i)
}

/// Latency prober for an endpoint set
#[derive(Debug, Clone)]
pub struct EndpointProbe {
    timeout: Duration,
}

impl EndpointProbe {
    /// Create a prober with a per-endpoint timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Probe every endpoint concurrently and select the fastest
    pub async fn probe(&self, endpoints: &EndpointSet) -> ProbeReport {
        let started = Instant::now();
        let results: Vec<ProbeResult> =
            join_all(endpoints.iter().map(|rpc| self.probe_one(rpc))).await;

        telemetry::record_latency(LatencyMetric::Probe, started.elapsed());

        let (selected, fallback) = match select_fastest(&results) {
            Some(i) => (i, false),
            None => {
                tracing::warn!(
                    endpoint = %results[0].endpoint,
                    "No endpoint answered the probe, falling back to the first one"
                );
                (0, true)
            }
        };

        let report = ProbeReport {
            results,
            selected,
            fallback,
        };

        telemetry::set_gauge(
            GaugeMetric::ReachableEndpoints,
            report.reachable_count() as f64,
        );

        tracing::info!(
            endpoint = %report.selected().endpoint,
            latency_ms = report.selected().latency.map(|l| l.as_millis() as u64),
            reachable = report.reachable_count(),
            total = report.results.len(),
            "Selected primary endpoint"
        );

        report
    }

    /// Probe and hand back the selected endpoint's client
    pub async fn probe_and_select(&self, endpoints: &EndpointSet) -> Arc<dyn ChainRpc> {
        let report = self.probe(endpoints).await;
        endpoints
            .get(report.selected_index())
            .unwrap_or_else(|| endpoints.first())
            .clone()
    }

    async fn probe_one(&self, rpc: &Arc<dyn ChainRpc>) -> ProbeResult {
        let endpoint = rpc.endpoint().clone();
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, rpc.latest_height()).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(height) => {
                let latency = started.elapsed();
                telemetry::record_endpoint_latency(&endpoint, latency);
                tracing::debug!(
                    endpoint = %endpoint,
                    height,
                    latency_ms = latency.as_millis() as u64,
                    "Probe answered"
                );
                ProbeResult {
                    endpoint,
                    latency: Some(latency),
                    height: Some(height),
                }
            }
            Err(e) => {
                telemetry::record_endpoint_failure(RaceOp::Probe, &endpoint);
                tracing::warn!(endpoint = %endpoint, error = %e, "Probe failed");
                ProbeResult {
                    endpoint,
                    latency: None,
                    height: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::MockRpc;

    fn result(url: &str, latency_ms: Option<u64>) -> ProbeResult {
        ProbeResult {
            endpoint: Endpoint::new(url),
            latency: latency_ms.map(Duration::from_millis),
            height: latency_ms.map(|_| 100),
        }
    }

    fn set(mocks: Vec<MockRpc>) -> EndpointSet {
        EndpointSet::new(
            mocks
                .into_iter()
                .map(|m| Arc::new(m) as Arc<dyn ChainRpc>)
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_select_fastest_picks_minimum() {
        let results = vec![
            result("a", Some(50)),
            result("b", Some(10)),
            result("c", None),
        ];
        assert_eq!(select_fastest(&results), Some(1));
    }

    #[test]
    fn test_select_fastest_tie_prefers_earlier() {
        let results = vec![
            result("a", None),
            result("b", Some(20)),
            result("c", Some(20)),
        ];
        assert_eq!(select_fastest(&results), Some(1));
    }

    #[test]
    fn test_select_fastest_none_reachable() {
        let results = vec![result("a", None), result("b", None)];
        assert_eq!(select_fastest(&results), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_selects_lowest_latency() {
        let endpoints = set(vec![
            MockRpc::new("http://a").height_after(Duration::from_millis(50), 100),
            MockRpc::new("http://b").height_after(Duration::from_millis(10), 100),
            MockRpc::new("http://c").unreachable(),
        ]);

        let probe = EndpointProbe::new(Duration::from_secs(1));
        let report = probe.probe(&endpoints).await;

        assert_eq!(report.selected_index(), 1);
        assert_eq!(report.selected().endpoint.url, "http://b");
        assert!(!report.is_fallback());
        assert_eq!(report.reachable_count(), 2);
        assert!(!report.results[2].reachable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_falls_back_to_first() {
        let endpoints = set(vec![
            MockRpc::new("http://a").unreachable(),
            MockRpc::new("http://b").unreachable(),
        ]);

        let probe = EndpointProbe::new(Duration::from_secs(1));
        let report = probe.probe(&endpoints).await;

        assert!(report.is_fallback());
        assert_eq!(report.selected_index(), 0);

        let primary = probe.probe_and_select(&endpoints).await;
        assert_eq!(primary.endpoint().url, "http://a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_counts_as_unreachable() {
        let endpoints = set(vec![
            MockRpc::new("http://slow").height_after(Duration::from_secs(10), 100),
            MockRpc::new("http://ok").height_after(Duration::from_millis(300), 100),
        ]);

        let probe = EndpointProbe::new(Duration::from_secs(1));
        let started = Instant::now();
        let report = probe.probe(&endpoints).await;

        assert!(started.elapsed() <= Duration::from_secs(1));
        assert!(!report.results[0].reachable());
        assert_eq!(report.selected().endpoint.url, "http://ok");
    }
}

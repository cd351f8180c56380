//! Prometheus metrics

use crate::rpc::Endpoint;
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Full probe round
    Probe,
    /// Broadcast until first acceptance
    Broadcast,
    /// Submission until first receipt
    Confirmation,
    /// Router price quote
    Quote,
}

/// Racing operation an endpoint took part in
#[derive(Debug, Clone, Copy)]
pub enum RaceOp {
    Probe,
    Broadcast,
    Receipt,
}

impl RaceOp {
    fn as_str(self) -> &'static str {
        match self {
            RaceOp::Probe => "probe",
            RaceOp::Broadcast => "broadcast",
            RaceOp::Receipt => "receipt",
        }
    }
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Last price seen by an exit monitor
    MonitorPrice,
    /// Reachable endpoints in the last probe round
    ReachableEndpoints,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Probe => "sniperace_probe_round_latency_ms",
        LatencyMetric::Broadcast => "sniperace_broadcast_latency_ms",
        LatencyMetric::Confirmation => "sniperace_confirmation_latency_ms",
        LatencyMetric::Quote => "sniperace_quote_latency_ms",
    };

    ::metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
}

/// Record the round-trip latency of one endpoint
pub fn record_endpoint_latency(endpoint: &Endpoint, duration: Duration) {
    ::metrics::histogram!("sniperace_endpoint_latency_ms", "endpoint" => endpoint.url.clone())
        .record(duration.as_secs_f64() * 1000.0);
}

/// Count a failed call against one endpoint
pub fn record_endpoint_failure(op: RaceOp, endpoint: &Endpoint) {
    ::metrics::counter!(
        "sniperace_endpoint_failures_total",
        "op" => op.as_str(),
        "endpoint" => endpoint.url.clone()
    )
    .increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::MonitorPrice => "sniperace_monitor_price",
        GaugeMetric::ReachableEndpoints => "sniperace_reachable_endpoints",
    };

    ::metrics::gauge!(metric_name).set(value);
}

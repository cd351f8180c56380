//! Racing transport types

use crate::rpc::{ChainRpc, Endpoint, RpcError};
use alloy_primitives::TxHash;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One endpoint failed or timed out during a race
#[derive(Debug, Clone, Error)]
#[error("endpoint {endpoint} unreachable: {source}")]
pub struct EndpointUnreachable {
    pub endpoint: Endpoint,
    #[source]
    pub source: RpcError,
}

/// Errors surfaced by the racers
#[derive(Debug, Error)]
pub enum RaceError {
    /// Every endpoint in the set failed for the same attempt
    #[error("all {} endpoints failed", .0.len())]
    AllEndpointsFailed(Vec<EndpointUnreachable>),
    /// No endpoint produced a receipt before the deadline
    #[error("no receipt for {hash} after {waited:?}")]
    ConfirmationTimeout { hash: TxHash, waited: Duration },
    /// An endpoint set must contain at least one endpoint
    #[error("endpoint set is empty")]
    EmptyEndpointSet,
}

/// Ordered, non-empty, immutable set of endpoints
#[derive(Clone)]
pub struct EndpointSet {
    endpoints: Arc<[Arc<dyn ChainRpc>]>,
}

#[allow(clippy::len_without_is_empty)]
impl EndpointSet {
    /// Build a set, rejecting an empty list
    pub fn new(endpoints: Vec<Arc<dyn ChainRpc>>) -> Result<Self, RaceError> {
        if endpoints.is_empty() {
            return Err(RaceError::EmptyEndpointSet);
        }
        Ok(Self {
            endpoints: endpoints.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ChainRpc>> {
        self.endpoints.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn ChainRpc>> {
        self.endpoints.get(index)
    }

    /// First configured endpoint, the deterministic fallback
    pub fn first(&self) -> &Arc<dyn ChainRpc> {
        &self.endpoints[0]
    }

    pub fn urls(&self) -> Vec<String> {
        self.iter().map(|e| e.endpoint().url.clone()).collect()
    }
}

impl fmt::Debug for EndpointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.urls()).finish()
    }
}

/// Result of one broadcast attempt
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// First endpoint to accept the transaction
    Accepted {
        hash: TxHash,
        endpoint: Endpoint,
        elapsed: Duration,
    },
    /// Every endpoint rejected the transaction or timed out
    Failed { failures: Vec<EndpointUnreachable> },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted { .. })
    }

    pub fn hash(&self) -> Option<TxHash> {
        match self {
            SubmissionOutcome::Accepted { hash, .. } => Some(*hash),
            SubmissionOutcome::Failed { .. } => None,
        }
    }

    /// Endpoints that were tried and failed
    pub fn attempted(&self) -> Vec<&Endpoint> {
        match self {
            SubmissionOutcome::Accepted { endpoint, .. } => vec![endpoint],
            SubmissionOutcome::Failed { failures } => failures.iter().map(|f| &f.endpoint).collect(),
        }
    }

    /// Accepted hash and endpoint, or `AllEndpointsFailed`
    pub fn into_result(self) -> Result<(TxHash, Endpoint), RaceError> {
        match self {
            SubmissionOutcome::Accepted { hash, endpoint, .. } => Ok((hash, endpoint)),
            SubmissionOutcome::Failed { failures } => Err(RaceError::AllEndpointsFailed(failures)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_endpoint_set_rejected() {
        let result = EndpointSet::new(vec![]);
        assert!(matches!(result, Err(RaceError::EmptyEndpointSet)));
    }

    #[test]
    fn test_failed_outcome_into_result() {
        let outcome = SubmissionOutcome::Failed {
            failures: vec![
                EndpointUnreachable {
                    endpoint: Endpoint::new("http://a"),
                    source: RpcError::Transport("connection refused".to_string()),
                },
                EndpointUnreachable {
                    endpoint: Endpoint::new("http://b"),
                    source: RpcError::Timeout(Duration::from_secs(1)),
                },
            ],
        };
        assert!(!outcome.is_accepted());
        assert_eq!(outcome.attempted().len(), 2);

        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.to_string(), "all 2 endpoints failed");
    }

    #[test]
    fn test_accepted_outcome_hash() {
        let hash = TxHash::repeat_byte(0xab);
        let outcome = SubmissionOutcome::Accepted {
            hash,
            endpoint: Endpoint::new("http://b"),
            elapsed: Duration::from_millis(12),
        };
        assert_eq!(outcome.hash(), Some(hash));
        let (accepted, endpoint) = outcome.into_result().unwrap();
        assert_eq!(accepted, hash);
        assert_eq!(endpoint.url, "http://b");
    }

    #[test]
    fn test_endpoint_unreachable_display() {
        let err = EndpointUnreachable {
            endpoint: Endpoint::new("http://a"),
            source: RpcError::Transport("refused".to_string()),
        };
        assert_eq!(err.to_string(), "endpoint http://a unreachable: transport error: refused");
    }
}

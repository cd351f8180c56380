//! Session context
//!
//! Built once at startup and shared by reference. Holds the endpoint sets,
//! the probed primary endpoint and the racers configured for this network.

use crate::config::Config;
use crate::race::{
    BroadcastRacer, ConfirmationRacer, EndpointProbe, EndpointSet, ProbeReport, RaceError,
};
use crate::rpc::{ChainRpc, Endpoint, JsonRpcClient, ReceiptRecord, RpcError, SignedTransaction};
use alloy_primitives::{Address, TxHash};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Session construction errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to build client: {0}")]
    Client(#[from] RpcError),

    #[error(transparent)]
    Race(#[from] RaceError),
}

/// Network addresses the trade pipeline needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkAddresses {
    pub chain_id: u64,
    pub router: Address,
    pub factory: Address,
    pub wrapped_native: Address,
}

/// Shared, read-only connection state
pub struct Session {
    read: EndpointSet,
    broadcast: EndpointSet,
    primary: Arc<dyn ChainRpc>,
    probe_report: Option<ProbeReport>,
    addresses: NetworkAddresses,
    broadcaster: BroadcastRacer,
    confirmer: ConfirmationRacer,
    confirm_timeout: Duration,
}

impl Session {
    /// Connect to the configured endpoints and probe for the primary one
    pub async fn connect(config: &Config) -> Result<Self, SessionError> {
        let read = build_set(&config.network.read_urls(), config.confirm.request_timeout())?;
        let broadcast = build_set(&config.network.broadcast_urls(), config.broadcast.timeout())?;

        tracing::info!(
            read = read.len(),
            broadcast = broadcast.len(),
            chain_id = config.network.chain_id(),
            "Connecting session"
        );

        let probe = EndpointProbe::new(config.probe.timeout());
        let report = probe.probe(&read).await;
        let primary = read
            .get(report.selected_index())
            .unwrap_or_else(|| read.first())
            .clone();

        let addresses = NetworkAddresses {
            chain_id: config.network.chain_id(),
            router: config.network.router(),
            factory: config.network.factory(),
            wrapped_native: config.network.wrapped_native(),
        };

        let mut session = Self::from_parts(
            read,
            broadcast,
            primary,
            addresses,
            BroadcastRacer::new(config.broadcast.timeout()),
            ConfirmationRacer::new(config.confirm.poll_interval(), config.confirm.request_timeout()),
            config.confirm.timeout(),
        );
        session.probe_report = Some(report);
        Ok(session)
    }

    /// Assemble a session from already-built parts, skipping the probe
    pub fn from_parts(
        read: EndpointSet,
        broadcast: EndpointSet,
        primary: Arc<dyn ChainRpc>,
        addresses: NetworkAddresses,
        broadcaster: BroadcastRacer,
        confirmer: ConfirmationRacer,
        confirm_timeout: Duration,
    ) -> Self {
        Self {
            read,
            broadcast,
            primary,
            probe_report: None,
            addresses,
            broadcaster,
            confirmer,
            confirm_timeout,
        }
    }

    pub fn read_endpoints(&self) -> &EndpointSet {
        &self.read
    }

    pub fn broadcast_endpoints(&self) -> &EndpointSet {
        &self.broadcast
    }

    /// Fastest read endpoint found at connect time
    pub fn primary(&self) -> &Arc<dyn ChainRpc> {
        &self.primary
    }

    pub fn probe_report(&self) -> Option<&ProbeReport> {
        self.probe_report.as_ref()
    }

    pub fn addresses(&self) -> NetworkAddresses {
        self.addresses
    }

    pub fn broadcaster(&self) -> &BroadcastRacer {
        &self.broadcaster
    }

    pub fn confirmer(&self) -> &ConfirmationRacer {
        &self.confirmer
    }

    pub fn confirm_timeout(&self) -> Duration {
        self.confirm_timeout
    }

    /// Race `tx` to the broadcast set
    pub async fn submit(&self, tx: &SignedTransaction) -> Result<(TxHash, Endpoint), RaceError> {
        self.broadcaster.broadcast(tx, &self.broadcast).await.into_result()
    }

    /// Wait for `hash` on the read set with the configured deadline
    pub async fn confirm(&self, hash: TxHash) -> Result<ReceiptRecord, RaceError> {
        self.confirmer
            .confirm(hash, &self.read, self.confirm_timeout)
            .await
    }

    /// Broadcast, then wait for the receipt
    pub async fn submit_and_confirm(
        &self,
        tx: &SignedTransaction,
    ) -> Result<(Endpoint, ReceiptRecord), RaceError> {
        let (hash, endpoint) = self.submit(tx).await?;
        let receipt = self.confirm(hash).await?;
        Ok((endpoint, receipt))
    }
}

fn build_set(urls: &[String], timeout: Duration) -> Result<EndpointSet, SessionError> {
    let clients = urls
        .iter()
        .map(|url| JsonRpcClient::new(url.as_str(), timeout).map(|c| Arc::new(c) as Arc<dyn ChainRpc>))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(EndpointSet::new(clients)?)
}

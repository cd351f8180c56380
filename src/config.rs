//! Configuration types for snipe-race

use crate::telemetry::LogFormat;
use alloy_primitives::{address, Address};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Root configuration structure
///
/// Every section has defaults, so an empty file yields the testnet setup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub probe: ProbeConfig,
    pub broadcast: BroadcastConfig,
    pub confirm: ConfirmConfig,
    pub monitor: MonitorConfig,
    pub trade: TradeConfig,
    pub pairs: PairsConfig,
    pub telemetry: TelemetryConfig,
}

/// Known networks
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPreset {
    #[default]
    Testnet,
    Mainnet,
}

impl NetworkPreset {
    pub fn chain_id(&self) -> u64 {
        match self {
            NetworkPreset::Testnet => 97,
            NetworkPreset::Mainnet => 56,
        }
    }

    pub fn rpc_urls(&self) -> Vec<String> {
        let urls: &[&str] = match self {
            NetworkPreset::Testnet => &[
                "https://data-seed-prebsc-1-s1.binance.org:8545/",
                "https://data-seed-prebsc-2-s1.binance.org:8545/",
                "https://data-seed-prebsc-1-s2.binance.org:8545/",
            ],
            NetworkPreset::Mainnet => &[
                "https://bsc-dataseed1.binance.org/",
                "https://bsc-dataseed2.binance.org/",
                "https://bsc-dataseed3.binance.org/",
                "https://bsc-dataseed4.binance.org/",
            ],
        };
        urls.iter().map(|u| u.to_string()).collect()
    }

    /// PancakeSwap V2 router
    pub fn router(&self) -> Address {
        match self {
            NetworkPreset::Testnet => address!("D99D1c33F9fC3444f8101754aBC46c52416550D1"),
            NetworkPreset::Mainnet => address!("10ED43C718714eb63d5aA57B78B54704E256024E"),
        }
    }

    /// PancakeSwap V2 factory
    pub fn factory(&self) -> Address {
        match self {
            NetworkPreset::Testnet => address!("6725F303b657a9451d8BA641348b6761A6CC7a17"),
            NetworkPreset::Mainnet => address!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73"),
        }
    }

    /// WBNB
    pub fn wrapped_native(&self) -> Address {
        match self {
            NetworkPreset::Testnet => address!("ae13d989daC2f0dEbFf460aC112a837C89BAa7cd"),
            NetworkPreset::Mainnet => address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c"),
        }
    }
}

/// Network configuration
///
/// Unset overrides fall back to the preset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub preset: NetworkPreset,
    pub chain_id: Option<u64>,
    pub read_endpoints: Option<Vec<String>>,
    /// Defaults to the read endpoints
    pub broadcast_endpoints: Option<Vec<String>>,
    pub router: Option<Address>,
    pub factory: Option<Address>,
    pub wrapped_native: Option<Address>,
}

impl NetworkConfig {
    pub fn chain_id(&self) -> u64 {
        self.chain_id.unwrap_or_else(|| self.preset.chain_id())
    }

    pub fn read_urls(&self) -> Vec<String> {
        self.read_endpoints
            .clone()
            .unwrap_or_else(|| self.preset.rpc_urls())
    }

    pub fn broadcast_urls(&self) -> Vec<String> {
        self.broadcast_endpoints
            .clone()
            .unwrap_or_else(|| self.read_urls())
    }

    pub fn router(&self) -> Address {
        self.router.unwrap_or_else(|| self.preset.router())
    }

    pub fn factory(&self) -> Address {
        self.factory.unwrap_or_else(|| self.preset.factory())
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
            .unwrap_or_else(|| self.preset.wrapped_native())
    }
}

/// Endpoint probing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Broadcast configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// Per-endpoint submission timeout
    #[serde(default = "default_broadcast_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_broadcast_timeout_ms() -> u64 {
    5000
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_broadcast_timeout_ms(),
        }
    }
}

impl BroadcastConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Confirmation polling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Timeout for a single receipt request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Overall confirmation deadline
    #[serde(default = "default_confirm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    100
}
fn default_request_timeout_ms() -> u64 {
    2000
}
fn default_confirm_timeout_secs() -> u64 {
    60
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            timeout_secs: default_confirm_timeout_secs(),
        }
    }
}

impl ConfirmConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Exit monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Floor for the tick interval
    #[serde(default = "default_min_tick_interval_ms")]
    pub min_tick_interval_ms: u64,

    /// Multiple of the entry price that takes profit
    #[serde(default = "default_take_profit")]
    pub take_profit: Decimal,

    /// Multiple of the entry price that stops the loss
    #[serde(default = "default_stop_loss")]
    pub stop_loss: Decimal,
}

fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_min_tick_interval_ms() -> u64 {
    250
}
fn default_take_profit() -> Decimal {
    Decimal::new(20, 1) // 2.0x
}
fn default_stop_loss() -> Decimal {
    Decimal::new(8, 1) // 0.8x
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            min_tick_interval_ms: default_min_tick_interval_ms(),
            take_profit: default_take_profit(),
            stop_loss: default_stop_loss(),
        }
    }
}

impl MonitorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn min_tick_interval(&self) -> Duration {
        Duration::from_millis(self.min_tick_interval_ms)
    }
}

/// Trade pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TradeConfig {
    /// Slippage tolerance on buys, in basis points
    #[serde(default = "default_buy_slippage_bps")]
    pub buy_slippage_bps: u32,

    /// Slippage tolerance on sells, in basis points
    #[serde(default = "default_sell_slippage_bps")]
    pub sell_slippage_bps: u32,

    /// Swap deadline relative to signing time
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    #[serde(default = "default_swap_gas_limit")]
    pub swap_gas_limit: u64,

    #[serde(default = "default_approve_gas_limit")]
    pub approve_gas_limit: u64,

    /// Decimals assumed for quoted tokens
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,

    /// Environment variable holding the hex private key for live exits
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

fn default_buy_slippage_bps() -> u32 {
    4900
}
fn default_sell_slippage_bps() -> u32 {
    500
}
fn default_deadline_secs() -> u64 {
    60
}
fn default_swap_gas_limit() -> u64 {
    300_000
}
fn default_approve_gas_limit() -> u64 {
    250_000
}
fn default_token_decimals() -> u8 {
    18
}
fn default_private_key_env() -> String {
    "SNIPE_PRIVATE_KEY".to_string()
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            buy_slippage_bps: default_buy_slippage_bps(),
            sell_slippage_bps: default_sell_slippage_bps(),
            deadline_secs: default_deadline_secs(),
            swap_gas_limit: default_swap_gas_limit(),
            approve_gas_limit: default_approve_gas_limit(),
            token_decimals: default_token_decimals(),
            private_key_env: default_private_key_env(),
        }
    }
}

/// New-pair watcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PairsConfig {
    #[serde(default = "default_pairs_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Most blocks requested in one log query
    #[serde(default = "default_max_block_range")]
    pub max_block_range: u64,
}

fn default_pairs_poll_interval_ms() -> u64 {
    1000
}
fn default_max_block_range() -> u64 {
    2000
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_pairs_poll_interval_ms(),
            max_block_range: default_max_block_range(),
        }
    }
}

impl PairsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus exporter port; disabled when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: None,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the components would refuse at runtime
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.network.read_urls().is_empty() {
            anyhow::bail!("network.read_endpoints must not be empty");
        }
        if self.network.broadcast_urls().is_empty() {
            anyhow::bail!("network.broadcast_endpoints must not be empty");
        }
        if self.confirm.poll_interval_ms == 0 {
            anyhow::bail!("confirm.poll_interval_ms must be positive");
        }
        if self.monitor.stop_loss <= Decimal::ZERO || self.monitor.stop_loss >= self.monitor.take_profit {
            anyhow::bail!(
                "monitor thresholds must satisfy 0 < stop_loss < take_profit (got {} / {})",
                self.monitor.stop_loss,
                self.monitor.take_profit
            );
        }
        if self.pairs.poll_interval_ms == 0 || self.pairs.max_block_range == 0 {
            anyhow::bail!("pairs.poll_interval_ms and pairs.max_block_range must be positive");
        }
        if self.trade.buy_slippage_bps >= 10_000 || self.trade.sell_slippage_bps >= 10_000 {
            anyhow::bail!("trade slippage must be below 10000 bps");
        }
        Ok(())
    }
}

//! CLI interface for snipe-race
//!
//! Provides subcommands for:
//! - `probe`: Measure endpoint latency and pick the primary
//! - `quote`: Quote a token through the router
//! - `broadcast`: Race a signed transaction to every endpoint
//! - `confirm`: Race every endpoint for a receipt
//! - `monitor`: Watch a position for take-profit / stop-loss (paper or live exit)
//! - `pairs`: Stream new pools against the wrapped native asset
//! - `config`: Show the resolved configuration

mod broadcast;
mod confirm;
mod monitor;
mod pairs;
mod probe;
mod quote;

pub use broadcast::BroadcastArgs;
pub use confirm::ConfirmArgs;
pub use monitor::MonitorArgs;
pub use pairs::PairsArgs;
pub use probe::ProbeArgs;
pub use quote::QuoteArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "snipe-race")]
#[command(about = "Multi-endpoint racing transport and exit monitor for BSC token trades")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe read endpoints and show the selected primary
    Probe(ProbeArgs),
    /// Quote a token price in the native asset
    Quote(QuoteArgs),
    /// Broadcast a signed raw transaction
    Broadcast(BroadcastArgs),
    /// Wait for a transaction receipt
    Confirm(ConfirmArgs),
    /// Monitor a position and exit on take-profit or stop-loss
    Monitor(MonitorArgs),
    /// Watch the factory for new pairs
    Pairs(PairsArgs),
    /// Show configuration
    Config,
}

//! snipe-race: multi-endpoint racing transport for time-sensitive BSC trades
//!
//! This library provides the core components for:
//! - Endpoint latency probing and primary selection
//! - Redundant broadcast with first-success semantics
//! - Redundant receipt polling with first-available semantics
//! - Router price quotes and the approve / swap trade pipeline
//! - New-pair detection from factory logs
//! - Take-profit / stop-loss exit monitoring
//! - Full observability stack

pub mod abi;
pub mod cli;
pub mod config;
pub mod exit;
pub mod pairs;
pub mod quote;
pub mod race;
pub mod rpc;
pub mod session;
pub mod telemetry;
pub mod trade;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

//! Price-triggered exit module
//!
//! An [`ExitMonitor`] polls the quoter on a fixed tick and fires an
//! [`ExitAction`] once when the price crosses take-profit or stop-loss.

mod monitor;
mod paper;
mod types;

pub use monitor::{ExitMonitor, MonitorHandle, DEFAULT_TICK_INTERVAL};
pub use paper::PaperExit;
pub use types::{
    ExitError, ExitReason, ExitReport, ExitThresholds, ExitTrigger, MonitorOutcome, MonitorState,
};

use alloy_primitives::Address;
use async_trait::async_trait;

/// What to do once a threshold is crossed
#[async_trait]
pub trait ExitAction: Send + Sync {
    /// Close the whole position in `token`
    async fn exit_position(&self, token: Address, trigger: &ExitTrigger) -> anyhow::Result<ExitReport>;
}

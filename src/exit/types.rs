//! Exit monitor types

use alloy_primitives::{Address, TxHash, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exit monitor errors
#[derive(Debug, Error)]
pub enum ExitError {
    /// Thresholds must satisfy `0 < stop_loss < take_profit`
    #[error("invalid thresholds: take profit {take_profit}, stop loss {stop_loss}")]
    InvalidThresholds {
        take_profit: Decimal,
        stop_loss: Decimal,
    },
    /// Reference price must be positive
    #[error("invalid reference price: {0}")]
    InvalidReferencePrice(Decimal),
    /// Monitor task panicked or was aborted
    #[error("monitor task failed: {0}")]
    TaskFailed(String),
}

/// Which threshold was crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

/// Monitor lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorState {
    /// Watching the price
    Armed,
    /// Threshold crossed, exit issued
    Triggered(ExitReason),
    /// Stopped by the caller
    Cancelled,
}

impl MonitorState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MonitorState::Armed)
    }
}

/// Take-profit / stop-loss multipliers relative to a reference price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExitThresholds {
    take_profit: Decimal,
    stop_loss: Decimal,
}

impl ExitThresholds {
    /// Validate and build thresholds
    pub fn new(take_profit: Decimal, stop_loss: Decimal) -> Result<Self, ExitError> {
        if stop_loss <= Decimal::ZERO || take_profit <= Decimal::ZERO || stop_loss >= take_profit {
            return Err(ExitError::InvalidThresholds {
                take_profit,
                stop_loss,
            });
        }
        Ok(Self {
            take_profit,
            stop_loss,
        })
    }

    pub fn take_profit(&self) -> Decimal {
        self.take_profit
    }

    pub fn stop_loss(&self) -> Decimal {
        self.stop_loss
    }

    /// Compare `price` against the thresholds scaled by `reference`
    ///
    /// Take-profit is checked first.
    pub fn evaluate(&self, reference: Decimal, price: Decimal) -> Option<ExitReason> {
        if let Some(target) = reference.checked_mul(self.take_profit) {
            if price >= target {
                return Some(ExitReason::TakeProfit);
            }
        }
        if let Some(floor) = reference.checked_mul(self.stop_loss) {
            if price <= floor {
                return Some(ExitReason::StopLoss);
            }
        }
        None
    }
}

/// The crossing that fired an exit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitTrigger {
    pub reason: ExitReason,
    /// Price that crossed the threshold
    pub price: Decimal,
    pub reference_price: Decimal,
}

/// Result of an exit action
#[derive(Debug, Clone)]
pub struct ExitReport {
    pub token: Address,
    pub reason: ExitReason,
    /// Sell transaction, `None` for paper exits
    pub hash: Option<TxHash>,
    /// Raw token amount sold
    pub amount: U256,
    pub paper: bool,
}

/// How a monitor run ended
#[derive(Debug)]
pub enum MonitorOutcome {
    /// A threshold fired and the exit action ran
    Exited {
        trigger: ExitTrigger,
        exit: anyhow::Result<ExitReport>,
    },
    /// Cancelled before any threshold fired
    Cancelled,
}

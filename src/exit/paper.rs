//! Paper exit action

use super::{ExitAction, ExitReport, ExitTrigger};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A simulated exit
#[derive(Debug, Clone)]
pub struct PaperFill {
    pub token: Address,
    pub trigger: ExitTrigger,
    pub amount: U256,
    pub timestamp: DateTime<Utc>,
}

/// Records exits instead of trading
pub struct PaperExit {
    position: U256,
    fills: Arc<RwLock<Vec<PaperFill>>>,
}

impl PaperExit {
    /// Create a paper exit closing a simulated position of `position` raw units
    pub fn new(position: U256) -> Self {
        Self {
            position,
            fills: Arc::new(RwLock::new(vec![])),
        }
    }

    pub async fn fills(&self) -> Vec<PaperFill> {
        self.fills.read().await.clone()
    }
}

#[async_trait]
impl ExitAction for PaperExit {
    async fn exit_position(&self, token: Address, trigger: &ExitTrigger) -> anyhow::Result<ExitReport> {
        let fill = PaperFill {
            token,
            trigger: trigger.clone(),
            amount: self.position,
            timestamp: Utc::now(),
        };

        let mut fills = self.fills.write().await;
        fills.push(fill);

        tracing::info!(
            token = %token,
            reason = ?trigger.reason,
            price = %trigger.price,
            "Paper exit filled"
        );

        Ok(ExitReport {
            token,
            reason: trigger.reason,
            hash: None,
            amount: self.position,
            paper: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::ExitReason;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_paper_exit_records_fill() {
        let exit = PaperExit::new(U256::from(1_000u64));
        let trigger = ExitTrigger {
            reason: ExitReason::TakeProfit,
            price: dec!(0.02),
            reference_price: dec!(0.01),
        };

        let report = exit.exit_position(Address::ZERO, &trigger).await.unwrap();
        assert!(report.paper);
        assert!(report.hash.is_none());
        assert_eq!(report.amount, U256::from(1_000u64));

        let fills = exit.fills().await;
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].trigger.price, dec!(0.02));
    }
}

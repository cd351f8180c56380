//! Exit monitor loop
//!
//! Runs on its own task. Each tick takes one price sample; a failed quote
//! skips the tick. Cancellation is observed at tick boundaries and loses to
//! a trigger detected in the same tick, so an issued exit is never dropped.

use super::{
    ExitAction, ExitError, ExitReason, ExitThresholds, ExitTrigger, MonitorOutcome, MonitorState,
};
use crate::quote::PriceQuoter;
use crate::telemetry::{self, GaugeMetric};
use alloy_primitives::Address;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Tick interval when none is configured
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Why the loop woke up
enum Wake {
    Tick,
    Cancelled,
    /// Cancel channel changed without requesting cancellation
    Spurious,
    HandleDropped,
}

/// Take-profit / stop-loss watcher for one position
pub struct ExitMonitor {
    token: Address,
    reference_price: Decimal,
    thresholds: ExitThresholds,
    tick_interval: Duration,
    quoter: Arc<dyn PriceQuoter>,
    action: Arc<dyn ExitAction>,
}

impl ExitMonitor {
    /// Create an armed monitor
    ///
    /// Thresholds are validated by [`ExitThresholds::new`]; the reference
    /// price must be positive.
    pub fn new(
        token: Address,
        reference_price: Decimal,
        thresholds: ExitThresholds,
        quoter: Arc<dyn PriceQuoter>,
        action: Arc<dyn ExitAction>,
    ) -> Result<Self, ExitError> {
        if reference_price <= Decimal::ZERO {
            return Err(ExitError::InvalidReferencePrice(reference_price));
        }

        Ok(Self {
            token,
            reference_price,
            thresholds,
            tick_interval: DEFAULT_TICK_INTERVAL,
            quoter,
            action,
        })
    }

    /// Set the tick interval, never faster than `min_interval`
    pub fn tick_every(mut self, interval: Duration, min_interval: Duration) -> Self {
        if interval < min_interval {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                min_ms = min_interval.as_millis() as u64,
                "Tick interval below minimum, clamping"
            );
            self.tick_interval = min_interval;
        } else {
            self.tick_interval = interval;
        }
        self
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn token(&self) -> Address {
        self.token
    }

    /// Threshold check for a single price
    pub fn evaluate(&self, price: Decimal) -> Option<ExitReason> {
        self.thresholds.evaluate(self.reference_price, price)
    }

    /// Spawn the monitor loop
    pub fn start(self) -> MonitorHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(MonitorState::Armed);

        tracing::info!(
            token = %self.token,
            reference = %self.reference_price,
            take_profit = %self.thresholds.take_profit(),
            stop_loss = %self.thresholds.stop_loss(),
            tick_ms = self.tick_interval.as_millis() as u64,
            "Exit monitor armed"
        );

        let task = tokio::spawn(self.run(cancel_rx, state_tx));

        MonitorHandle {
            cancel_tx,
            state_rx,
            task,
        }
    }

    async fn run(
        self,
        mut cancel_rx: watch::Receiver<bool>,
        state_tx: watch::Sender<MonitorState>,
    ) -> MonitorOutcome {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut handle_alive = true;
        let mut ticks: u64 = 0;

        loop {
            let wake = tokio::select! {
                _ = ticker.tick() => Wake::Tick,
                changed = cancel_rx.changed(), if handle_alive => match changed {
                    Ok(()) if *cancel_rx.borrow() => Wake::Cancelled,
                    Ok(()) => Wake::Spurious,
                    Err(_) => Wake::HandleDropped,
                },
            };

            match wake {
                Wake::Tick => {}
                Wake::Cancelled => return self.cancelled(&state_tx, ticks),
                Wake::Spurious => continue,
                Wake::HandleDropped => {
                    // Keep watching without a way to cancel
                    handle_alive = false;
                    continue;
                }
            }

            ticks += 1;
            match self.quoter.quote_price(self.token).await {
                Ok(sample) => {
                    if let Some(price) = sample.price.to_f64() {
                        telemetry::set_gauge(GaugeMetric::MonitorPrice, price);
                    }
                    tracing::debug!(token = %self.token, price = %sample.price, tick = ticks, "Price sample");

                    if let Some(reason) = self.evaluate(sample.price) {
                        let trigger = ExitTrigger {
                            reason,
                            price: sample.price,
                            reference_price: self.reference_price,
                        };
                        return self.exit(&state_tx, trigger).await;
                    }
                }
                Err(e) => {
                    tracing::debug!(token = %self.token, error = %e, tick = ticks, "Quote failed, skipping tick");
                }
            }

            if *cancel_rx.borrow() {
                return self.cancelled(&state_tx, ticks);
            }
        }
    }

    async fn exit(&self, state_tx: &watch::Sender<MonitorState>, trigger: ExitTrigger) -> MonitorOutcome {
        state_tx.send_replace(MonitorState::Triggered(trigger.reason));
        tracing::info!(
            token = %self.token,
            reason = ?trigger.reason,
            price = %trigger.price,
            reference = %trigger.reference_price,
            "Exit threshold crossed, closing position"
        );

        let exit = self.action.exit_position(self.token, &trigger).await;
        match &exit {
            Ok(report) => tracing::info!(
                token = %self.token,
                hash = ?report.hash,
                amount = %report.amount,
                paper = report.paper,
                "Position closed"
            ),
            Err(e) => tracing::error!(token = %self.token, error = %e, "Exit failed"),
        }

        MonitorOutcome::Exited { trigger, exit }
    }

    fn cancelled(&self, state_tx: &watch::Sender<MonitorState>, ticks: u64) -> MonitorOutcome {
        state_tx.send_replace(MonitorState::Cancelled);
        tracing::info!(token = %self.token, ticks, "Exit monitor cancelled");
        MonitorOutcome::Cancelled
    }
}

/// Control handle for a running monitor
pub struct MonitorHandle {
    cancel_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<MonitorState>,
    task: JoinHandle<MonitorOutcome>,
}

impl MonitorHandle {
    /// Request cancellation, honoured at the next tick boundary
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Current state
    pub fn state(&self) -> MonitorState {
        *self.state_rx.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the state to change from what was last observed
    pub async fn state_changed(&mut self) -> MonitorState {
        // Sender lives in the task; on drop the last published state stays readable
        let _ = self.state_rx.changed().await;
        *self.state_rx.borrow_and_update()
    }

    /// Wait for the monitor to finish
    pub async fn wait(self) -> Result<MonitorOutcome, ExitError> {
        self.task
            .await
            .map_err(|e| ExitError::TaskFailed(e.to_string()))
    }
}

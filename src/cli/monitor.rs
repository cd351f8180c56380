//! Monitor command implementation

use crate::config::Config;
use crate::exit::{ExitAction, ExitMonitor, ExitThresholds, MonitorOutcome, PaperExit};
use crate::quote::{PriceQuoter, RouterQuoter};
use crate::session::Session;
use crate::trade::{LocalKeySigner, TradeSettings, Trader, TransactionSigner};
use alloy_primitives::{Address, U256};
use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Token contract address
    pub token: Address,

    /// Entry price; the current quote when omitted
    #[arg(long)]
    pub reference: Option<Decimal>,

    /// Take-profit multiple of the entry price
    #[arg(long)]
    pub take_profit: Option<Decimal>,

    /// Stop-loss multiple of the entry price
    #[arg(long)]
    pub stop_loss: Option<Decimal>,

    /// Tick interval in milliseconds
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Simulated position size in raw token units
    #[arg(long, default_value = "0")]
    pub position: U256,

    /// Sell the wallet's balance on a trigger instead of a paper exit
    ///
    /// The key is read from the environment variable named by
    /// `trade.private_key_env`.
    #[arg(long)]
    pub live: bool,
}

impl MonitorArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let session = Arc::new(Session::connect(config).await?);
        let addresses = session.addresses();
        let quoter = Arc::new(RouterQuoter::new(
            session.primary().clone(),
            addresses.router,
            addresses.wrapped_native,
            config.trade.token_decimals,
        ));

        let reference = match self.reference {
            Some(price) => price,
            None => quoter.quote_price(self.token).await?.price,
        };
        let thresholds = ExitThresholds::new(
            self.take_profit.unwrap_or(config.monitor.take_profit),
            self.stop_loss.unwrap_or(config.monitor.stop_loss),
        )?;
        let tick = self
            .tick_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.monitor.tick_interval());

        let paper = Arc::new(PaperExit::new(self.position));
        let exit: Arc<dyn ExitAction> = if self.live {
            let signer = LocalKeySigner::from_env(&config.trade.private_key_env, session.primary().clone())?;
            tracing::info!(wallet = %signer.address(), "Live exit armed");
            Arc::new(Trader::new(
                session.clone(),
                Arc::new(signer),
                quoter.clone(),
                TradeSettings::from(&config.trade),
            ))
        } else {
            paper.clone()
        };
        let mut handle = ExitMonitor::new(self.token, reference, thresholds, quoter, exit)?
            .tick_every(tick, config.monitor.min_tick_interval())
            .start();

        println!(
            "Monitoring {} from {} (take profit {}x, stop loss {}x), Ctrl-C to stop",
            self.token,
            reference,
            thresholds.take_profit(),
            thresholds.stop_loss()
        );

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, cancelling monitor");
                handle.cancel();
            }
            _ = async {
                loop {
                    let state = handle.state_changed().await;
                    if state.is_terminal() || handle.is_finished() {
                        break;
                    }
                }
            } => {}
        }

        match handle.wait().await? {
            MonitorOutcome::Exited { trigger, exit: result } => {
                let report = result?;
                println!(
                    "{:?} at {} (entry {}), {} exit of {}",
                    trigger.reason,
                    trigger.price,
                    trigger.reference_price,
                    if report.paper { "paper" } else { "live" },
                    report.amount
                );
                if let Some(tx) = report.hash {
                    println!("Exit transaction: {tx}");
                }
            }
            MonitorOutcome::Cancelled => println!("Monitor cancelled"),
        }

        if !self.live {
            println!("Paper fills recorded: {}", paper.fills().await.len());
        }
        Ok(())
    }
}

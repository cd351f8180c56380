//! Pairs command implementation

use crate::config::Config;
use crate::pairs::PairWatcher;
use crate::quote::RouterQuoter;
use crate::session::Session;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct PairsArgs {
    /// First block to scan; the chain head when omitted
    #[arg(long)]
    pub from_block: Option<u64>,

    /// Print one JSON object per detection
    #[arg(long)]
    pub json: bool,
}

impl PairsArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let session = Session::connect(config).await?;
        let addresses = session.addresses();
        let quoter = Arc::new(RouterQuoter::new(
            session.primary().clone(),
            addresses.router,
            addresses.wrapped_native,
            config.trade.token_decimals,
        ));

        let mut watcher = PairWatcher::new(
            session.primary().clone(),
            quoter,
            addresses.factory,
            addresses.wrapped_native,
        )
        .poll_every(config.pairs.poll_interval())
        .max_block_range(config.pairs.max_block_range);
        if let Some(block) = self.from_block {
            watcher = watcher.from_block(block);
        }

        let mut feed = watcher.start();
        if !self.json {
            println!("Watching factory {} for new pairs, Ctrl-C to stop", addresses.factory);
        }

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted, stopping pair watcher");
                    feed.cancel();
                    break;
                }
                next = feed.next() => {
                    let Some(pair) = next else { break };
                    if self.json {
                        println!("{}", serde_json::to_string(&pair)?);
                    } else {
                        let price = pair
                            .price
                            .map(|p| p.to_string())
                            .unwrap_or_else(|| "no quote".to_string());
                        println!(
                            "{} pair {} block {} price {}",
                            pair.token,
                            pair.pair,
                            pair.block.map(|b| b.to_string()).unwrap_or_else(|| "?".to_string()),
                            price
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

//! Quote command implementation

use crate::config::Config;
use crate::quote::{PriceQuoter, RouterQuoter};
use crate::session::Session;
use alloy_primitives::Address;
use clap::Args;

#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Token contract address
    pub token: Address,

    /// Token decimals, if not the configured default
    #[arg(long)]
    pub decimals: Option<u8>,
}

impl QuoteArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let session = Session::connect(config).await?;
        let addresses = session.addresses();
        let quoter = RouterQuoter::new(
            session.primary().clone(),
            addresses.router,
            addresses.wrapped_native,
            self.decimals.unwrap_or(config.trade.token_decimals),
        );

        let sample = quoter.quote_price(self.token).await?;
        println!("{} = {} native per token ({})", sample.token, sample.price, sample.timestamp);
        Ok(())
    }
}

//! Confirm command implementation

use crate::config::Config;
use crate::session::Session;
use alloy_primitives::TxHash;
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ConfirmArgs {
    /// Transaction hash
    pub hash: TxHash,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl ConfirmArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let session = Session::connect(config).await?;
        let timeout = self
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| session.confirm_timeout());

        let receipt = session
            .confirmer()
            .confirm(self.hash, session.read_endpoints(), timeout)
            .await?;

        println!("Transaction: {}", receipt.hash);
        println!("  Status: {:?}", receipt.status);
        println!("  Block:  {}", receipt.block_number);
        if let Some(gas_used) = receipt.gas_used {
            println!("  Gas:    {}", gas_used);
        }
        Ok(())
    }
}

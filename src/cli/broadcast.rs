//! Broadcast command implementation

use crate::config::Config;
use crate::rpc::SignedTransaction;
use crate::session::Session;
use alloy_primitives::{keccak256, Bytes};
use clap::Args;

#[derive(Args, Debug)]
pub struct BroadcastArgs {
    /// Signed raw transaction, hex encoded
    pub raw: Bytes,

    /// Wait for the receipt after broadcasting
    #[arg(short, long)]
    pub wait: bool,
}

impl BroadcastArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let session = Session::connect(config).await?;

        // The hash of a signed transaction is the hash of its encoding
        let tx = SignedTransaction::with_hash(self.raw.clone(), keccak256(&self.raw));
        let (hash, endpoint) = session.submit(&tx).await?;
        println!("Accepted {} via {}", hash, endpoint);

        if self.wait {
            let receipt = session.confirm(hash).await?;
            println!(
                "Confirmed in block {} ({:?})",
                receipt.block_number, receipt.status
            );
        }
        Ok(())
    }
}

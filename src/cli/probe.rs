//! Probe command implementation

use crate::config::Config;
use crate::session::Session;
use clap::Args;

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Override the probe timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl ProbeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut config = config.clone();
        if let Some(timeout_ms) = self.timeout_ms {
            config.probe.timeout_ms = timeout_ms;
        }

        let session = Session::connect(&config).await?;
        let report = session
            .probe_report()
            .ok_or_else(|| anyhow::anyhow!("session was not probed"))?;

        println!("Endpoint probe ({} endpoints):", report.results.len());
        for (i, result) in report.results.iter().enumerate() {
            let marker = if i == report.selected_index() { "*" } else { " " };
            match (result.latency, result.height) {
                (Some(latency), Some(height)) => println!(
                    " {} {:<50} {:>6} ms  block {}",
                    marker,
                    result.endpoint,
                    latency.as_millis(),
                    height
                ),
                _ => println!(" {} {:<50} unreachable", marker, result.endpoint),
            }
        }
        if report.is_fallback() {
            println!("No endpoint answered; using the first one");
        }

        Ok(())
    }
}

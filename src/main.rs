use clap::Parser;
use snipe_race::cli::{Cli, Commands};
use snipe_race::config::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; a missing file means the built-in testnet setup
    let config = if Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        eprintln!("Warning: {} not found, using default configuration", cli.config);
        Config::default()
    };

    // Initialize telemetry
    snipe_race::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Probe(args) => args.execute(&config).await?,
        Commands::Quote(args) => args.execute(&config).await?,
        Commands::Broadcast(args) => {
            tracing::info!("Broadcasting transaction");
            args.execute(&config).await?;
        }
        Commands::Confirm(args) => args.execute(&config).await?,
        Commands::Monitor(args) => {
            tracing::info!(token = %args.token, "Starting exit monitor");
            args.execute(&config).await?;
        }
        Commands::Pairs(args) => args.execute(&config).await?,
        Commands::Config => {
            let network = &config.network;
            println!("Current configuration:");
            println!("  Network: {:?} (chain {})", network.preset, network.chain_id());
            println!("  Read endpoints: {}", network.read_urls().join(", "));
            println!("  Broadcast endpoints: {}", network.broadcast_urls().join(", "));
            println!("  Router: {}", network.router());
            println!("  Factory: {}", network.factory());
            println!("  Wrapped native: {}", network.wrapped_native());
            println!(
                "  Timeouts: probe={}ms broadcast={}ms confirm={}s (poll {}ms)",
                config.probe.timeout_ms,
                config.broadcast.timeout_ms,
                config.confirm.timeout_secs,
                config.confirm.poll_interval_ms
            );
            println!(
                "  Monitor: TP={}x SL={}x tick={}ms (min {}ms)",
                config.monitor.take_profit,
                config.monitor.stop_loss,
                config.monitor.tick_interval_ms,
                config.monitor.min_tick_interval_ms
            );
            println!(
                "  Slippage: buy={}bps sell={}bps",
                config.trade.buy_slippage_bps, config.trade.sell_slippage_bps
            );
            println!(
                "  Pairs: poll={}ms max_range={} blocks",
                config.pairs.poll_interval_ms, config.pairs.max_block_range
            );
            println!("  Live key env: {}", config.trade.private_key_env);
        }
    }

    Ok(())
}

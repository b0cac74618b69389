//! Fetch latest prices for the symbol list and write the USD price snapshot
//!
//! Run with: cargo run --bin update-prices -- --delay-secs 5

use anyhow::Result;
use clap::Parser;
use price_updater::config::{Overrides, Settings};
use price_updater::quotes::throttle::FixedDelay;
use price_updater::quotes::yahoo::YahooProvider;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "update-prices")]
#[command(about = "Fetch equity and FX quotes and write a USD price snapshot")]
struct Args {
    /// JSON settings file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Symbol list to read
    #[arg(long)]
    symbols: Option<PathBuf>,

    /// Snapshot file to write
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Seconds to wait after each request
    #[arg(long)]
    delay_secs: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref())?.apply(Overrides {
        symbols_path: args.symbols,
        prices_path: args.output,
        request_delay_secs: args.delay_secs,
        request_timeout_secs: args.timeout_secs,
        log_level: args.log_level,
    });

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_level))
        .init();

    log::debug!("Settings: {:?}", settings);

    let provider = YahooProvider::new(settings.request_timeout())?;
    let pacer = FixedDelay::new(settings.request_delay());
    let today = chrono::Local::now().date_naive();

    let summary = price_updater::update_prices(&settings, &provider, &pacer, today).await?;

    if summary.skipped > 0 {
        log::warn!("{} of {} symbols could not be priced", summary.skipped, summary.total);
    }

    Ok(())
}

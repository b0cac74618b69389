pub mod config;
pub mod currency;
pub mod models;
pub mod normalizer;
pub mod quotes;
pub mod storage;

use anyhow::Result;
use chrono::NaiveDate;
use config::Settings;
use normalizer::RunSummary;
use quotes::throttle::RequestPacer;
use quotes::QuoteProvider;

/// One complete update: read the symbol list, price every instrument,
/// overwrite the snapshot.
///
/// Nothing is written if the symbol list cannot be read. Per-instrument
/// failures only shrink the snapshot.
pub async fn update_prices<P, R>(
    settings: &Settings,
    provider: &P,
    pacer: &R,
    as_of: NaiveDate,
) -> Result<RunSummary>
where
    P: QuoteProvider + ?Sized,
    R: RequestPacer + ?Sized,
{
    let instruments = storage::read_symbol_list(&settings.symbols_path)?;
    let report = normalizer::normalize(&instruments, provider, pacer, as_of).await;
    storage::write_snapshot(&settings.prices_path, &report.snapshot)?;
    Ok(report.summary())
}

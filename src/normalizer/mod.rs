//! Quote normalizer
//!
//! Turns a symbol list into a USD price snapshot. Every instrument yields an
//! [`InstrumentOutcome`]; only priced instruments reach the snapshot, so one
//! failed lookup never affects the others.

use crate::currency::{self, ExchangeRateCache, RateLookup};
use crate::models::{Instrument, PriceRecord, PriceSnapshot};
use crate::quotes::throttle::{Paced, RequestPacer};
use crate::quotes::{major_unit, QuoteError, QuoteProvider, BASE_CURRENCY};
use chrono::NaiveDate;

/// Result for a single instrument
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentOutcome {
    Priced { symbol: String, record: PriceRecord },
    Skipped { symbol: String, error: QuoteError },
}

impl InstrumentOutcome {
    pub fn is_priced(&self) -> bool {
        matches!(self, Self::Priced { .. })
    }
}

/// Counts for the end-of-run log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub priced: usize,
    pub skipped: usize,
    pub rates_fetched: usize,
}

/// Everything one normalization run produced
#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub snapshot: PriceSnapshot,
    pub outcomes: Vec<InstrumentOutcome>,
    pub rates_fetched: usize,
}

impl NormalizeReport {
    pub fn summary(&self) -> RunSummary {
        let priced = self.outcomes.iter().filter(|o| o.is_priced()).count();
        RunSummary {
            total: self.outcomes.len(),
            priced,
            skipped: self.outcomes.len() - priced,
            rates_fetched: self.rates_fetched,
        }
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &QuoteError)> {
        self.outcomes.iter().filter_map(|o| match o {
            InstrumentOutcome::Skipped { symbol, error } => Some((symbol.as_str(), error)),
            InstrumentOutcome::Priced { .. } => None,
        })
    }
}

/// Priced instrument plus the currency rate fetched on its behalf, if any
struct PricedInstrument {
    record: PriceRecord,
    new_rate: Option<(String, f64)>,
}

/// Fetch and normalize all instruments in input order.
///
/// `pacer` runs after every provider call, including failed ones and rate
/// lookups. Errors are recorded per instrument and never returned.
pub async fn normalize<P, R>(
    instruments: &[Instrument],
    provider: &P,
    pacer: &R,
    as_of: NaiveDate,
) -> NormalizeReport
where
    P: QuoteProvider + ?Sized,
    R: RequestPacer + ?Sized,
{
    let provider = Paced::new(provider, pacer);
    let mut rates = ExchangeRateCache::new();
    let mut report = NormalizeReport {
        outcomes: Vec::with_capacity(instruments.len()),
        ..Default::default()
    };

    log::info!(
        "Fetching prices for {} instruments from {}",
        instruments.len(),
        provider.name()
    );

    for instrument in instruments {
        log::info!("Fetching {} ({})", instrument.name, instrument.symbol);

        let outcome = match price_instrument(instrument, &provider, &mut rates, as_of).await {
            Ok(priced) => {
                if let Some((currency, rate)) = priced.new_rate {
                    log::info!("{}/{} rate: {}", currency, BASE_CURRENCY, rate);
                    report.rates_fetched += 1;
                    report
                        .snapshot
                        .insert(currency.clone(), PriceRecord::exchange_rate(&currency, rate, as_of));
                }
                report
                    .snapshot
                    .insert(instrument.symbol.clone(), priced.record.clone());
                InstrumentOutcome::Priced {
                    symbol: instrument.symbol.clone(),
                    record: priced.record,
                }
            }
            Err(error) => {
                log::warn!("Skipping {} ({}): {}", instrument.name, instrument.symbol, error);
                InstrumentOutcome::Skipped {
                    symbol: instrument.symbol.clone(),
                    error,
                }
            }
        };
        report.outcomes.push(outcome);
    }

    let summary = report.summary();
    log::info!(
        "Finished: {} priced, {} skipped, {} rates fetched",
        summary.priced,
        summary.skipped,
        summary.rates_fetched
    );
    if summary.skipped > 0 {
        let symbols: Vec<&str> = report.skipped().map(|(symbol, _)| symbol).collect();
        log::info!("Skipped symbols: {}", symbols.join(", "));
    }

    report
}

async fn price_instrument<P>(
    instrument: &Instrument,
    provider: &P,
    rates: &mut ExchangeRateCache,
    as_of: NaiveDate,
) -> Result<PricedInstrument, QuoteError>
where
    P: QuoteProvider + ?Sized,
{
    let quote = provider.fetch_quote(&instrument.symbol).await?;
    let currency = quote.currency_or_base();

    if currency == BASE_CURRENCY {
        log::info!("{} ({}): {}", instrument.name, instrument.symbol, quote.price);
        return Ok(PricedInstrument {
            record: PriceRecord::usd(quote.price, &instrument.name, as_of),
            new_rate: None,
        });
    }

    // Minor units (pence, cents) are priced in their major currency
    let (rate_currency, divisor) = major_unit(&currency);
    let lookup = rates.lookup(provider, rate_currency).await?;
    let usd_price = currency::convert(quote.price / divisor, lookup.rate());
    log::info!(
        "{} ({}): {} {} -> {} {}",
        instrument.name,
        instrument.symbol,
        currency,
        quote.price,
        BASE_CURRENCY,
        usd_price
    );

    let new_rate = match lookup {
        RateLookup::Fetched(rate) => Some((rate_currency.to_string(), rate)),
        RateLookup::Cached(_) => None,
    };

    Ok(PricedInstrument {
        record: PriceRecord::converted(usd_price, quote.price, currency, &instrument.name, as_of),
        new_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::throttle::NoDelay;
    use crate::quotes::Quote;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingPacer {
        pauses: AtomicUsize,
    }

    #[async_trait]
    impl RequestPacer for CountingPacer {
        async fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Answers from a fixed table and records every symbol it was asked for
    #[derive(Default)]
    struct ScriptedProvider {
        quotes: HashMap<String, Quote>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn with(mut self, symbol: &str, price: f64, currency: Option<&str>) -> Self {
            self.quotes.insert(symbol.to_string(), Quote::new(price, currency));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuoteProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
            self.calls.lock().unwrap().push(symbol.to_string());
            self.quotes
                .get(symbol)
                .cloned()
                .ok_or_else(|| QuoteError::lookup(symbol, "No data found"))
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
    }

    fn instruments(list: &[(&str, &str)]) -> Vec<Instrument> {
        list.iter().map(|(s, n)| Instrument::new(*s, *n)).collect()
    }

    #[tokio::test]
    async fn test_usd_and_hkd_example() {
        let provider = ScriptedProvider::default()
            .with("AAPL", 150.0, Some("USD"))
            .with("0700.HK", 300.0, Some("HKD"))
            .with("HKDUSD=X", 0.128, None);
        let list = instruments(&[("AAPL", "Apple"), ("0700.HK", "Tencent")]);
        let pacer = CountingPacer::default();

        let report = normalize(&list, &provider, &pacer, day()).await;
        let snapshot = &report.snapshot;

        // AAPL, 0700.HK and the HKDUSD=X rate each pause once
        assert_eq!(pacer.pauses.load(Ordering::SeqCst), 3);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot["AAPL"], PriceRecord::usd(150.0, "Apple", day()));
        assert_eq!(
            snapshot["0700.HK"],
            PriceRecord::converted(300.0 * 0.128, 300.0, "HKD", "Tencent", day())
        );
        assert_eq!(snapshot["HKD"].price, 0.128);
        assert_eq!(snapshot["HKD"].name, "HKD-USD");
        assert!(snapshot["HKD"].original_price.is_none());
    }

    #[tokio::test]
    async fn test_pence_priced_in_pounds() {
        let provider = ScriptedProvider::default()
            .with("HSBA.L", 650.0, Some("GBp"))
            .with("VOD.L", 70.0, Some("GBX"))
            .with("GBPUSD=X", 1.27, None);
        let list = instruments(&[("HSBA.L", "HSBC"), ("VOD.L", "Vodafone")]);

        let report = normalize(&list, &provider, &NoDelay, day()).await;
        let hsbc = &report.snapshot["HSBA.L"];

        assert_eq!(provider.calls(), vec!["HSBA.L", "GBPUSD=X", "VOD.L"]);
        assert!((hsbc.price - 8.255).abs() < 1e-9, "unexpected USD price {}", hsbc.price);
        assert_eq!(hsbc.original_price, Some(650.0));
        assert_eq!(hsbc.currency.as_deref(), Some("GBp"));
        assert!((report.snapshot["VOD.L"].price - 0.889).abs() < 1e-9);
        assert_eq!(report.snapshot["GBP"].price, 1.27);
        assert_eq!(report.snapshot["GBP"].name, "GBP-USD");
        assert!(!report.snapshot.contains_key("GBp"));
    }

    #[tokio::test]
    async fn test_missing_currency_treated_as_usd() {
        let provider = ScriptedProvider::default().with("MSFT", 410.5, None);
        let list = instruments(&[("MSFT", "Microsoft")]);

        let report = normalize(&list, &provider, &NoDelay, day()).await;

        let record = &report.snapshot["MSFT"];
        assert_eq!(record.price, 410.5);
        assert!(record.original_price.is_none());
        assert!(record.currency.is_none());
        assert_eq!(provider.calls(), vec!["MSFT"]);
    }

    #[tokio::test]
    async fn test_rate_fetched_once_per_currency() {
        let provider = ScriptedProvider::default()
            .with("0700.HK", 300.0, Some("HKD"))
            .with("9988.HK", 80.0, Some("HKD"))
            .with("HKDUSD=X", 0.128, None);
        let list = instruments(&[("0700.HK", "Tencent"), ("9988.HK", "Alibaba")]);

        let report = normalize(&list, &provider, &NoDelay, day()).await;

        assert_eq!(provider.calls(), vec!["0700.HK", "HKDUSD=X", "9988.HK"]);
        assert_eq!(report.snapshot["9988.HK"].price, 80.0 * 0.128);
        assert_eq!(report.snapshot["HKD"].price, 0.128);
        assert_eq!(report.summary().rates_fetched, 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_isolated() {
        let provider = ScriptedProvider::default()
            .with("AAPL", 150.0, Some("USD"))
            .with("MSFT", 410.0, Some("USD"));
        let list = instruments(&[("AAPL", "Apple"), ("GONE", "Delisted"), ("MSFT", "Microsoft")]);

        let report = normalize(&list, &provider, &NoDelay, day()).await;

        assert!(!report.snapshot.contains_key("GONE"));
        assert_eq!(report.snapshot["AAPL"].price, 150.0);
        assert_eq!(report.snapshot["MSFT"].price, 410.0);

        let skipped: Vec<_> = report.skipped().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0, "GONE");
        assert!(matches!(skipped[0].1, QuoteError::Lookup { .. }));
    }

    #[tokio::test]
    async fn test_missing_rate_skips_only_that_currency() {
        let provider = ScriptedProvider::default()
            .with("0700.HK", 300.0, Some("HKD"))
            .with("9988.HK", 80.0, Some("HKD"))
            .with("SAP.DE", 180.0, Some("EUR"))
            .with("EURUSD=X", 1.08, None)
            .with("AAPL", 150.0, Some("USD"));
        let list = instruments(&[
            ("0700.HK", "Tencent"),
            ("SAP.DE", "SAP"),
            ("9988.HK", "Alibaba"),
            ("AAPL", "Apple"),
        ]);

        let report = normalize(&list, &provider, &NoDelay, day()).await;
        let snapshot = &report.snapshot;

        assert!(!snapshot.contains_key("0700.HK"));
        assert!(!snapshot.contains_key("9988.HK"));
        assert!(!snapshot.contains_key("HKD"));
        assert_eq!(snapshot["SAP.DE"].price, 180.0 * 1.08);
        assert_eq!(snapshot["EUR"].price, 1.08);
        assert_eq!(snapshot["AAPL"].price, 150.0);

        // failed rate is not requested a second time
        let hkd_calls = provider.calls().iter().filter(|s| *s == "HKDUSD=X").count();
        assert_eq!(hkd_calls, 1);

        let summary = report.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.priced, 2);
        assert_eq!(summary.skipped, 2);
        assert!(report
            .skipped()
            .all(|(_, e)| matches!(e, QuoteError::RateUnavailable { currency, .. } if currency == "HKD")));
    }

    #[tokio::test]
    async fn test_outcomes_follow_input_order() {
        let provider = ScriptedProvider::default()
            .with("B", 2.0, None)
            .with("A", 1.0, None);
        let list = instruments(&[("B", "Bravo"), ("X", "Missing"), ("A", "Alpha")]);

        let report = normalize(&list, &provider, &NoDelay, day()).await;
        let symbols: Vec<_> = report
            .outcomes
            .iter()
            .map(|o| match o {
                InstrumentOutcome::Priced { symbol, .. } | InstrumentOutcome::Skipped { symbol, .. } => {
                    symbol.as_str()
                }
            })
            .collect();

        assert_eq!(symbols, vec!["B", "X", "A"]);
        assert!(!report.outcomes[1].is_priced());
    }

    #[tokio::test]
    async fn test_duplicate_symbol_overwrites() {
        let provider = ScriptedProvider::default().with("AAPL", 150.0, None);
        let list = instruments(&[("AAPL", "Apple"), ("AAPL", "Apple Inc.")]);

        let report = normalize(&list, &provider, &NoDelay, day()).await;

        assert_eq!(report.snapshot.len(), 1);
        assert_eq!(report.snapshot["AAPL"].name, "Apple Inc.");
    }

    #[tokio::test]
    async fn test_identical_runs_serialize_identically() {
        let provider = ScriptedProvider::default()
            .with("AAPL", 150.0, Some("USD"))
            .with("0700.HK", 300.0, Some("HKD"))
            .with("HKDUSD=X", 0.128, None);
        let list = instruments(&[("0700.HK", "Tencent"), ("AAPL", "Apple")]);

        let first = normalize(&list, &provider, &NoDelay, day()).await;
        let second = normalize(&list, &provider, &NoDelay, day()).await;

        assert_eq!(
            serde_json::to_string_pretty(&first.snapshot).unwrap(),
            serde_json::to_string_pretty(&second.snapshot).unwrap()
        );
    }

    #[tokio::test]
    async fn test_empty_list() {
        let provider = ScriptedProvider::default();
        let report = normalize(&[], &provider, &NoDelay, day()).await;

        assert!(report.snapshot.is_empty());
        assert_eq!(report.summary().total, 0);
        assert!(provider.calls().is_empty());
    }
}

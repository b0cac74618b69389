//! Currency conversion module
//!
//! Provides USD conversion with:
//! - Per-run rate cache, filled lazily from the quote provider
//! - Failed lookups remembered so a currency is asked for at most once per run

use crate::quotes::{fx_symbol, QuoteError, QuoteProvider, BASE_CURRENCY};
use std::collections::HashMap;

/// Cached outcome of a rate lookup
#[derive(Debug, Clone, PartialEq)]
pub enum RateEntry {
    Available(f64),
    Unavailable(String),
}

/// Result of [`ExchangeRateCache::lookup`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLookup {
    /// Rate was already known
    Cached(f64),
    /// Rate was fetched by this call
    Fetched(f64),
}

impl RateLookup {
    pub fn rate(self) -> f64 {
        match self {
            Self::Cached(rate) | Self::Fetched(rate) => rate,
        }
    }
}

/// Currency code to USD rate, scoped to one run
#[derive(Debug, Default)]
pub struct ExchangeRateCache {
    entries: HashMap<String, RateEntry>,
}

impl ExchangeRateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, currency: &str, entry: RateEntry) {
        self.entries.insert(currency.to_string(), entry);
    }

    /// Get the USD rate for a currency, asking the provider on a cache miss.
    ///
    /// Cached entries, including failures, are answered without a provider
    /// call. A fetched or failed result is stored before returning.
    pub async fn lookup<P>(&mut self, provider: &P, currency: &str) -> Result<RateLookup, QuoteError>
    where
        P: QuoteProvider + ?Sized,
    {
        if currency == BASE_CURRENCY {
            return Ok(RateLookup::Cached(1.0));
        }

        match self.entries.get(currency) {
            Some(RateEntry::Available(rate)) => return Ok(RateLookup::Cached(*rate)),
            Some(RateEntry::Unavailable(reason)) => {
                return Err(QuoteError::rate_unavailable(currency, reason.clone()))
            }
            None => {}
        }

        let symbol = fx_symbol(currency);
        log::debug!("Fetching {}/{} rate via {}", currency, BASE_CURRENCY, symbol);

        match provider.fetch_quote(&symbol).await {
            Ok(quote) if quote.price.is_finite() && quote.price > 0.0 => {
                self.insert(currency, RateEntry::Available(quote.price));
                Ok(RateLookup::Fetched(quote.price))
            }
            Ok(quote) => {
                let reason = format!("invalid rate {}", quote.price);
                self.insert(currency, RateEntry::Unavailable(reason.clone()));
                Err(QuoteError::rate_unavailable(currency, reason))
            }
            Err(e) => {
                let reason = e.to_string();
                self.insert(currency, RateEntry::Unavailable(reason.clone()));
                Err(QuoteError::rate_unavailable(currency, reason))
            }
        }
    }
}

/// Convert an amount into USD with a rate quoted as USD per unit
pub fn convert(amount: f64, rate: f64) -> f64 {
    amount * rate
}

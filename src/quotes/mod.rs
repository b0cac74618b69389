//! Quote Provider Framework
//!
//! Kursquellen hinter einer gemeinsamen Schnittstelle:
//! - Yahoo Finance (Aktien, ETFs, Wechselkurse über `<CODE>USD=X`)
//! - Pacing zwischen Anfragen (Rate-Limits des Providers)

pub mod throttle;
pub mod yahoo;

use async_trait::async_trait;
use thiserror::Error;

/// Referenzwährung des Snapshots
pub const BASE_CURRENCY: &str = "USD";

/// Aktueller Kurs eines Symbols
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: f64,
    /// Handelswährung; fehlt sie, gilt der Kurs als USD
    pub currency: Option<String>,
}

impl Quote {
    pub fn new(price: f64, currency: Option<&str>) -> Self {
        Self {
            price,
            currency: currency.map(String::from),
        }
    }

    /// Trading currency as reported, `USD` when the provider reported none.
    ///
    /// Case is significant: `GBp` is pence, not pounds.
    pub fn currency_or_base(&self) -> String {
        self.currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(BASE_CURRENCY)
            .to_string()
    }
}

/// Major currency and divisor for a quoted currency code.
///
/// Handle GBX/GBp (British Pence), ZAc (South African cents) and ILA (Israeli
/// agorot): prices arrive in the minor unit and are divided by 100 before
/// conversion. Any other code is its own major currency.
pub fn major_unit(currency: &str) -> (&str, f64) {
    match currency {
        "GBX" | "GBp" => ("GBP", 100.0),
        "ZAc" | "ZAC" => ("ZAR", 100.0),
        "ILA" => ("ILS", 100.0),
        other => (other, 1.0),
    }
}

/// Failures that cost one instrument its snapshot entry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuoteError {
    /// Provider call failed or returned an unexpected shape
    #[error("lookup failed for {symbol}: {message}")]
    Lookup { symbol: String, message: String },

    /// USD rate for the trading currency could not be fetched
    #[error("no USD rate for {currency}: {message}")]
    RateUnavailable { currency: String, message: String },
}

impl QuoteError {
    pub fn lookup(symbol: &str, message: impl Into<String>) -> Self {
        Self::Lookup {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }

    pub fn rate_unavailable(currency: &str, message: impl Into<String>) -> Self {
        Self::RateUnavailable {
            currency: currency.to_string(),
            message: message.into(),
        }
    }
}

/// Source of latest quotes
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteError>;
}

/// Synthetic symbol for a currency's USD rate, e.g. `HKDUSD=X`
pub fn fx_symbol(currency: &str) -> String {
    format!("{}{}=X", currency, BASE_CURRENCY)
}

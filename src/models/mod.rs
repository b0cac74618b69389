use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instrument as listed in the symbol file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

/// Root of the symbol list file: `{ "stocks": [...] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolList {
    pub stocks: Vec<Instrument>,
}

/// One entry of the price snapshot.
///
/// Instruments quoted in USD carry only `price`. Instruments quoted in another
/// currency also carry the raw `originalPrice` and the `currency` code.
/// Currency entries (keyed by the code itself) carry the USD rate as `price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub name: String,
    pub last_updated: NaiveDate,
}

impl PriceRecord {
    pub fn usd(price: f64, name: impl Into<String>, last_updated: NaiveDate) -> Self {
        Self {
            price,
            original_price: None,
            currency: None,
            name: name.into(),
            last_updated,
        }
    }

    pub fn converted(
        usd_price: f64,
        original_price: f64,
        currency: impl Into<String>,
        name: impl Into<String>,
        last_updated: NaiveDate,
    ) -> Self {
        Self {
            price: usd_price,
            original_price: Some(original_price),
            currency: Some(currency.into()),
            name: name.into(),
            last_updated,
        }
    }

    /// Entry for a currency's USD rate, named e.g. `HKD-USD`
    pub fn exchange_rate(currency: &str, rate: f64, last_updated: NaiveDate) -> Self {
        Self::usd(rate, format!("{}-USD", currency), last_updated)
    }
}

/// Complete output artifact, keyed by instrument symbol or currency code.
///
/// Ordered map so that identical inputs serialize to identical bytes.
pub type PriceSnapshot = BTreeMap<String, PriceRecord>;

//! Yahoo Finance Quote Provider
//!
//! Unterstützt:
//! - Aktuelle Kurse (regularMarketPrice)
//! - Handelswährung aus den Chart-Metadaten
//! - Wechselkurse über synthetische Symbole (`HKDUSD=X`)

use super::{Quote, QuoteError, QuoteProvider};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo chart API client
pub struct YahooProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client(timeout)?,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at another chart endpoint (mirrors, local stubs)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn quote_url(&self, symbol: &str) -> String {
        format!(
            "{}/{}?interval=1d&range=1d",
            self.base_url,
            urlencoding::encode(symbol)
        )
    }
}

/// HTTP Client mit korrekten Headers erstellen
fn create_client(timeout: Duration) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))
}

#[async_trait]
impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let url = self.quote_url(symbol);
        log::debug!("Fetching Yahoo quote for {} from {}", symbol, url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                QuoteError::lookup(symbol, "request timed out")
            } else {
                QuoteError::lookup(symbol, format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::debug!("Yahoo API error for {}: {} - {}", symbol, status, body);
            return Err(QuoteError::lookup(symbol, format!("HTTP status {}", status)));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| QuoteError::lookup(symbol, format!("response is not JSON: {}", e)))?;

        parse_quote(&data).map_err(|e| QuoteError::lookup(symbol, e.to_string()))
    }
}

/// Quote aus Yahoo Chart-Response parsen
pub fn parse_quote(data: &serde_json::Value) -> Result<Quote> {
    // Check for Yahoo API error in response
    if let Some(error) = data
        .get("chart")
        .and_then(|c| c.get("error"))
        .and_then(|e| e.as_object())
    {
        let code = error.get("code").and_then(|c| c.as_str()).unwrap_or("unknown");
        let desc = error
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("No description");
        return Err(anyhow!("Yahoo API error: {} - {}", code, desc));
    }

    let chart = data
        .get("chart")
        .and_then(|c| c.get("result"))
        .and_then(|r| r.get(0))
        .ok_or_else(|| anyhow!("Invalid response format"))?;

    let meta = chart.get("meta").ok_or_else(|| anyhow!("Missing meta"))?;

    // Aktueller Kurs, sonst letzter Schlusskurs
    let price = meta
        .get("regularMarketPrice")
        .and_then(|p| p.as_f64())
        .or_else(|| {
            chart
                .get("indicators")
                .and_then(|i| i.get("quote"))
                .and_then(|q| q.get(0))
                .and_then(|q| q.get("close"))
                .and_then(|c| c.as_array())
                .and_then(|arr| arr.iter().rev().find_map(|v| v.as_f64()))
        })
        .ok_or_else(|| anyhow!("Missing price"))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(anyhow!("Invalid price {}", price));
    }

    let currency = meta
        .get("currency")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty());

    Ok(Quote::new(price, currency))
}

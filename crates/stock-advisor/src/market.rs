//! Market Data
//!
//! Quote sources for the advisory cycle. `SnapshotMarketData` serves a
//! fixed quote table loaded from CSV, which keeps runs reproducible.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{AdvisorError, Result};
use crate::model::StockQuote;
use crate::scoring;

/// Quote provider trait (Strategy pattern)
///
/// Implement this for each data vendor.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Get the current quote for a symbol
    async fn get_quote(&self, symbol: &str) -> Result<StockQuote>;

    /// Get quotes for multiple symbols, skipping any that fail
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<StockQuote>> {
        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.get_quote(symbol).await {
                Ok(quote) => quotes.push(quote),
                Err(e) => tracing::warn!(%symbol, error = %e, "Skipping unpriced stock"),
            }
        }
        Ok(quotes)
    }

    /// Check if the source is available
    async fn health_check(&self) -> bool;

    /// Source name
    fn name(&self) -> &str;
}

/// CSV row of a quote snapshot
#[derive(Debug, Deserialize)]
struct QuoteRow {
    symbol: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    sector: String,
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    change_percent: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str")]
    volume: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    market_cap: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pe_ratio: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    dividend_yield: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    volatility: Option<Decimal>,
}

impl From<QuoteRow> for StockQuote {
    fn from(row: QuoteRow) -> Self {
        let company = if row.company.is_empty() {
            row.symbol.clone()
        } else {
            row.company
        };
        let mut quote = Self::new(row.symbol.trim(), company, row.price);
        quote.sector = row.sector;
        quote.change_percent = row.change_percent.unwrap_or_default();
        quote.volume = row.volume;
        quote.market_cap = row.market_cap;
        quote.pe_ratio = row.pe_ratio.unwrap_or_default();
        quote.dividend_yield = row.dividend_yield.unwrap_or_default();
        quote.volatility = row.volatility.unwrap_or_default();
        quote.risk_level = scoring::risk_level(quote.volatility);
        quote
    }
}

/// Market data served from a fixed quote table
#[derive(Clone, Debug, Default)]
pub struct SnapshotMarketData {
    quotes: HashMap<String, StockQuote>,
}

impl SnapshotMarketData {
    pub fn new(quotes: impl IntoIterator<Item = StockQuote>) -> Self {
        Self {
            quotes: quotes
                .into_iter()
                .map(|q| (q.symbol.to_uppercase(), q))
                .collect(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading quote snapshot");
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut quotes = Vec::new();
        for record in rdr.deserialize() {
            let row: QuoteRow = record?;
            quotes.push(StockQuote::from(row));
        }
        tracing::info!(quotes = quotes.len(), "Loaded quote snapshot");
        Ok(Self::new(quotes))
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[async_trait]
impl MarketDataSource for SnapshotMarketData {
    async fn get_quote(&self, symbol: &str) -> Result<StockQuote> {
        let mut quote = self
            .quotes
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| AdvisorError::UnsupportedStock(symbol.to_string()))?;

        if quote.price <= Decimal::ZERO {
            return Err(AdvisorError::PriceUnavailable(quote.symbol));
        }

        quote.updated_at = Utc::now();
        Ok(quote)
    }

    async fn health_check(&self) -> bool {
        !self.quotes.is_empty()
    }

    fn name(&self) -> &str {
        "Snapshot"
    }
}

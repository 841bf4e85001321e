//! Domain Models
//!
//! Core data types for equity selection and allocation.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tradable security under consideration for allocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Ticker symbol, unique within a ranking run
    pub symbol: String,

    /// Current price per share
    pub price: Decimal,

    /// Market capitalization
    #[serde(default)]
    pub market_cap: Decimal,

    /// Traded volume
    #[serde(default)]
    pub volume: Decimal,

    /// Quality score in [0, 100], computed upstream
    #[serde(default)]
    pub quality_score: Decimal,
}

impl Candidate {
    pub fn new(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            price,
            market_cap: Decimal::ZERO,
            volume: Decimal::ZERO,
            quality_score: Decimal::ZERO,
        }
    }

    pub fn with_market_cap(mut self, market_cap: Decimal) -> Self {
        self.market_cap = market_cap;
        self
    }

    pub fn with_volume(mut self, volume: Decimal) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_quality(mut self, quality_score: Decimal) -> Self {
        self.quality_score = quality_score;
        self
    }
}

/// A candidate with its popularity score attached
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,

    /// Weighted blend of normalized size, normalized volume and quality
    pub popularity_score: Decimal,
}

/// Sized position for one selected candidate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Ticker symbol
    pub symbol: String,

    /// Price used for sizing
    pub price: Decimal,

    /// Quality score the allocation fraction was derived from
    pub quality_score: Decimal,

    /// Popularity score used for ranking
    pub popularity_score: Decimal,

    /// Share of the budget, in percent
    pub allocation_percentage: Decimal,

    /// budget × allocation_percentage / 100
    pub target_spend: Decimal,

    /// Shares to buy (fractional below the whole-share threshold)
    pub shares_to_buy: Decimal,

    /// shares_to_buy × price
    pub actual_investment: Decimal,
}

impl AllocationResult {
    /// Recompute spend after the share count changed
    pub(crate) fn reprice(&mut self) {
        self.actual_investment = self.shares_to_buy * self.price;
    }
}

/// Risk bucket derived from volatility
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// A priced, enriched stock quote
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StockQuote {
    /// Ticker symbol (e.g., "TCS", "INFY")
    pub symbol: String,

    /// Company name
    pub company: String,

    /// Sector label
    pub sector: String,

    /// Last traded price
    pub price: Decimal,

    /// Day change percentage
    pub change_percent: Decimal,

    /// Traded volume
    pub volume: Decimal,

    /// Market capitalization
    pub market_cap: Decimal,

    /// Price to earnings ratio
    pub pe_ratio: Decimal,

    /// Dividend yield percentage
    pub dividend_yield: Decimal,

    /// Annualized volatility percentage
    pub volatility: Decimal,

    /// Quality score (filled by `scoring::apply_quality_scores`)
    pub quality_score: Decimal,

    /// Risk bucket
    pub risk_level: RiskLevel,

    /// Quote timestamp
    pub updated_at: DateTime<Utc>,
}

impl StockQuote {
    pub fn new(symbol: impl Into<String>, company: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            company: company.into(),
            sector: String::new(),
            price,
            change_percent: Decimal::ZERO,
            volume: Decimal::ZERO,
            market_cap: Decimal::ZERO,
            pe_ratio: Decimal::ZERO,
            dividend_yield: Decimal::ZERO,
            volatility: Decimal::ZERO,
            quality_score: Decimal::ZERO,
            risk_level: RiskLevel::Medium,
            updated_at: Utc::now(),
        }
    }

    /// Project onto the fields the allocator consumes
    pub fn to_candidate(&self) -> Candidate {
        Candidate {
            symbol: self.symbol.clone(),
            price: self.price,
            market_cap: self.market_cap,
            volume: self.volume,
            quality_score: self.quality_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_candidate_builder() {
        let c = Candidate::new("tcs", dec!(3500))
            .with_market_cap(dec!(1_200_000))
            .with_volume(dec!(40_000))
            .with_quality(dec!(72.5));

        assert_eq!(c.symbol, "TCS");
        assert_eq!(c.quality_score, dec!(72.5));
    }

    #[test]
    fn test_quote_to_candidate() {
        let mut quote = StockQuote::new("INFY", "Infosys", dec!(1500));
        quote.market_cap = dec!(600_000);
        quote.volume = dec!(1_000);
        quote.quality_score = dec!(64);

        let c = quote.to_candidate();
        assert_eq!(c.symbol, "INFY");
        assert_eq!(c.price, dec!(1500));
        assert_eq!(c.market_cap, dec!(600_000));
        assert_eq!(c.quality_score, dec!(64));
    }

    #[test]
    fn test_candidate_deserializes_with_defaults() {
        let c: Candidate = serde_json::from_str(r#"{"symbol":"A","price":"100"}"#).unwrap();
        assert_eq!(c.price, dec!(100));
        assert_eq!(c.volume, Decimal::ZERO);
    }
}

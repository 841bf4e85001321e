//! Quality Scoring
//!
//! Fundamental quality score and risk bucket for priced quotes. Quality
//! blends valuation, dividend, stability and relative size; it is the
//! weight the allocator splits budget by.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::model::{RiskLevel, StockQuote};

/// P/E band considered fairly valued
const FAIR_PE_MIN: Decimal = dec!(15);
const FAIR_PE_MAX: Decimal = dec!(25);

/// Classify risk from volatility percentage
pub fn risk_level(volatility: Decimal) -> RiskLevel {
    if volatility < dec!(5) {
        RiskLevel::Low
    } else if volatility < dec!(15) {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Quality score in [0, 100] for one quote, given the largest market cap in its set
pub fn quality_score(quote: &StockQuote, max_market_cap: Decimal) -> Decimal {
    let valuation = if quote.pe_ratio >= FAIR_PE_MIN && quote.pe_ratio <= FAIR_PE_MAX {
        dec!(100)
    } else {
        dec!(50)
    };
    let dividend = clamp_percent(quote.dividend_yield * dec!(10));
    let stability = clamp_percent(dec!(100) - quote.volatility * dec!(5));
    let size = if max_market_cap > Decimal::ZERO {
        quote.market_cap / max_market_cap * dec!(100)
    } else {
        Decimal::ZERO
    };

    valuation * dec!(0.3) + dividend * dec!(0.2) + stability * dec!(0.3) + size * dec!(0.2)
}

/// Fill `quality_score` and `risk_level` for every quote in the set
pub fn apply_quality_scores(quotes: &mut [StockQuote]) {
    let max_market_cap = quotes
        .iter()
        .map(|q| q.market_cap)
        .max()
        .unwrap_or(Decimal::ZERO);

    for quote in quotes.iter_mut() {
        quote.quality_score = quality_score(quote, max_market_cap);
        quote.risk_level = risk_level(quote.volatility);
    }
}

fn clamp_percent(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, dec!(100))
}

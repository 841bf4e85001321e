//! Stock Universe
//!
//! The list of tradable companies, tagged by index membership. The
//! investment amount decides which market-cap tiers are eligible:
//!
//! | Amount          | Tiers               |
//! |-----------------|---------------------|
//! | < 10,000        | small               |
//! | < 50,000        | small, mid          |
//! | otherwise       | large, mid, small   |

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AdvisorError, Result};
use crate::model::StockQuote;

/// Below this amount only small caps are considered
pub const SMALL_AMOUNT_LIMIT: Decimal = dec!(10000);

/// Below this amount large caps are excluded
pub const MID_AMOUNT_LIMIT: Decimal = dec!(50000);

const TIER_COLUMNS: [&str; 4] = ["in_nifty50", "in_nifty100", "in_midcap100", "in_smallcap100"];

/// Market capitalization tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketCapTier {
    Large,
    Mid,
    Small,
}

impl std::fmt::Display for MarketCapTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Large => write!(f, "large"),
            Self::Mid => write!(f, "mid"),
            Self::Small => write!(f, "small"),
        }
    }
}

/// Tiers eligible for an investment amount
pub fn market_cap_tiers(amount: Decimal) -> Vec<MarketCapTier> {
    if amount < SMALL_AMOUNT_LIMIT {
        vec![MarketCapTier::Small]
    } else if amount < MID_AMOUNT_LIMIT {
        vec![MarketCapTier::Small, MarketCapTier::Mid]
    } else {
        vec![MarketCapTier::Large, MarketCapTier::Mid, MarketCapTier::Small]
    }
}

/// One row of the universe file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub symbol: String,

    #[serde(default)]
    pub company_name: String,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub in_nifty50: bool,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub in_nifty100: bool,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub in_midcap100: bool,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub in_smallcap100: bool,
}

impl UniverseEntry {
    pub fn new(symbol: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            company_name: company_name.into(),
            in_nifty50: false,
            in_nifty100: false,
            in_midcap100: false,
            in_smallcap100: false,
        }
    }

    pub fn in_tier(&self, tier: MarketCapTier) -> bool {
        match tier {
            MarketCapTier::Large => self.in_nifty50 || self.in_nifty100,
            MarketCapTier::Mid => self.in_midcap100,
            MarketCapTier::Small => self.in_smallcap100,
        }
    }
}

/// Accepts true/True/1/yes; anything else is false
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    ))
}

/// Tradable companies loaded from CSV
#[derive(Clone, Debug, Default)]
pub struct StockUniverse {
    entries: Vec<UniverseEntry>,

    /// Whether the source carried any index-membership column
    has_tier_flags: bool,
}

impl StockUniverse {
    pub fn new(entries: Vec<UniverseEntry>, has_tier_flags: bool) -> Self {
        Self {
            entries,
            has_tier_flags,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading stock universe");
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let has_tier_flags = rdr
            .headers()?
            .iter()
            .any(|h| TIER_COLUMNS.contains(&h.trim()));

        let mut entries = Vec::new();
        for record in rdr.deserialize() {
            let mut entry: UniverseEntry = record?;
            entry.symbol = entry.symbol.trim().to_uppercase();
            if !entry.symbol.is_empty() {
                entries.push(entry);
            }
        }

        tracing::info!(stocks = entries.len(), has_tier_flags, "Loaded stock universe");
        Ok(Self::new(entries, has_tier_flags))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[UniverseEntry] {
        &self.entries
    }

    pub fn company_name(&self, symbol: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.symbol.eq_ignore_ascii_case(symbol))
            .map(|e| e.company_name.as_str())
    }

    /// Companies eligible for `amount`, deduplicated by company name,
    /// in file order, at most `count`.
    ///
    /// Without membership columns every company is eligible.
    pub fn shortlist(&self, amount: Decimal, count: usize) -> Result<Vec<UniverseEntry>> {
        if self.entries.is_empty() {
            return Err(AdvisorError::UniverseNotLoaded);
        }

        let tiers = market_cap_tiers(amount);
        let mut seen_companies = HashSet::new();

        let shortlisted: Vec<UniverseEntry> = self
            .entries
            .iter()
            .filter(|e| !self.has_tier_flags || tiers.iter().any(|t| e.in_tier(*t)))
            .filter(|e| e.company_name.is_empty() || seen_companies.insert(e.company_name.clone()))
            .take(count)
            .cloned()
            .collect();

        tracing::info!(
            %amount,
            tiers = ?tiers,
            shortlisted = shortlisted.len(),
            "Shortlisted stocks by market cap"
        );

        Ok(shortlisted)
    }
}

/// Preferred price band for an investment amount
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    pub min: Decimal,

    /// `None` means unbounded
    pub max: Option<Decimal>,
}

impl PriceBand {
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.min && self.max.is_none_or(|max| price <= max)
    }
}

pub fn price_band(amount: Decimal) -> PriceBand {
    if amount < SMALL_AMOUNT_LIMIT {
        PriceBand {
            min: dec!(50),
            max: Some(dec!(500)),
        }
    } else if amount < MID_AMOUNT_LIMIT {
        PriceBand {
            min: dec!(100),
            max: Some(dec!(2000)),
        }
    } else {
        PriceBand {
            min: Decimal::ZERO,
            max: None,
        }
    }
}

/// Keep the quotes whose prices suit the amount.
///
/// Falls back to every priced quote when fewer than `min_stocks` fall in
/// the band. Small amounts prefer the cheapest; larger amounts prefer
/// prices closest to the band floor.
pub fn filter_by_price_range(
    quotes: &[StockQuote],
    amount: Decimal,
    min_stocks: usize,
    max_stocks: usize,
) -> Vec<StockQuote> {
    let priced: Vec<&StockQuote> = quotes.iter().filter(|q| q.price > Decimal::ZERO).collect();
    if priced.is_empty() {
        tracing::warn!("No stocks with valid prices");
        return quotes.iter().take(max_stocks).cloned().collect();
    }

    let band = price_band(amount);
    let mut in_range: Vec<&StockQuote> = priced
        .iter()
        .copied()
        .filter(|q| band.contains(q.price))
        .collect();

    if in_range.len() < min_stocks {
        tracing::debug!(
            in_range = in_range.len(),
            min_stocks,
            "Not enough stocks in price band, using all priced stocks"
        );
        in_range = priced;
    }

    if amount < SMALL_AMOUNT_LIMIT {
        in_range.sort_by(|a, b| a.price.cmp(&b.price));
    } else {
        in_range.sort_by_key(|q| (q.price - band.min).abs());
    }

    in_range.into_iter().take(max_stocks).cloned().collect()
}

/// Price statistics of a selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
    pub avg: Decimal,
}

/// Overview of a stock selection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub total_stocks: usize,
    pub amount: Decimal,
    pub market_caps: Vec<MarketCapTier>,
    pub symbols: Vec<String>,
    pub price_range: Option<PriceRange>,
}

pub fn selection_summary(quotes: &[StockQuote], amount: Decimal) -> SelectionSummary {
    let price_range = match (
        quotes.iter().map(|q| q.price).min(),
        quotes.iter().map(|q| q.price).max(),
    ) {
        (Some(min), Some(max)) => {
            let total: Decimal = quotes.iter().map(|q| q.price).sum();
            Some(PriceRange {
                min,
                max,
                avg: total / Decimal::from(quotes.len()),
            })
        }
        _ => None,
    };

    SelectionSummary {
        total_stocks: quotes.len(),
        amount,
        market_caps: market_cap_tiers(amount),
        symbols: quotes.iter().map(|q| q.symbol.clone()).collect(),
        price_range,
    }
}

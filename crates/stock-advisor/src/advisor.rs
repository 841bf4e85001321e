//! Advisory Cycle
//!
//! One full pass from investment amount to sized positions:
//!
//! 1. market-cap tiers for the amount
//! 2. shortlist from the universe
//! 3. quotes and quality scores
//! 4. optional price-band filter
//! 5. rank, allocate, rebalance
//! 6. background news collection for the selected stocks
//!
//! Step 6 is started but never awaited; the report is returned as soon as
//! the allocation is ready.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::allocation::{AllocationPlan, Allocator, AllocatorConfig};
use crate::error::{AdvisorError, Result};
use crate::market::MarketDataSource;
use crate::model::{Candidate, StockQuote};
use crate::news::{
    spawn_collection, CollectionRequest, CollectionSettings, NewsArchive, NewsSource, NewsStatus,
    NewsStore, NewsTask,
};
use crate::scoring;
use crate::universe::{
    filter_by_price_range, market_cap_tiers, selection_summary, MarketCapTier, SelectionSummary,
    StockUniverse,
};

/// Fewest in-band stocks before the price filter falls back to all priced stocks
const MIN_AFFORDABLE_STOCKS: usize = 5;

/// Most stocks the price filter passes on to ranking
const MAX_AFFORDABLE_STOCKS: usize = 10;

/// Advisory cycle tuning
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Companies taken from the universe per run
    pub shortlist_count: usize,

    /// Stocks kept after popularity ranking
    pub selection_count: usize,

    /// News articles requested per selected stock
    pub articles_per_stock: usize,

    /// Pause between news requests, in milliseconds
    pub news_request_interval_ms: u64,

    /// Narrow quotes to the amount's price band before ranking
    pub prefer_affordable: bool,

    pub allocator: AllocatorConfig,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            shortlist_count: 30,
            selection_count: 10,
            articles_per_stock: 3,
            news_request_interval_ms: 1000,
            prefer_affordable: false,
            allocator: AllocatorConfig::default(),
        }
    }
}

/// Outcome of one advisory cycle
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdvisoryReport {
    pub id: Uuid,

    pub created_at: DateTime<Utc>,

    pub investment_amount: Decimal,

    /// Tiers the shortlist was drawn from
    pub market_caps: Vec<MarketCapTier>,

    pub shortlisted_count: usize,

    /// Shortlisted stocks with a usable quote
    pub priced_count: usize,

    pub plan: AllocationPlan,

    /// Quotes of the selected stocks, in plan order
    pub holdings: Vec<StockQuote>,

    /// Symbols and price spread of the holdings
    pub selection: SelectionSummary,

    /// News progress when the report was produced
    pub news_status: NewsStatus,
}

impl AdvisoryReport {
    /// Short text overview: profile line, workflow counts, top positions
    pub fn summary(&self) -> String {
        const SHOWN: usize = 5;

        let caps: Vec<String> = self
            .market_caps
            .iter()
            .map(|c| c.to_string().to_uppercase())
            .collect();

        let mut s = String::new();
        s.push_str("Analysis complete\n\n");
        s.push_str(&format!("Amount:      {:.2}\n", self.investment_amount));
        s.push_str(&format!("Market caps: {}\n", caps.join(", ")));
        s.push_str(&format!("Shortlisted: {} companies\n", self.shortlisted_count));
        s.push_str(&format!("Selected:    {} stocks by popularity\n", self.plan.allocations.len()));
        if let Some(range) = &self.selection.price_range {
            s.push_str(&format!(
                "Prices:      {:.2} - {:.2} (avg {:.2})\n",
                range.min, range.max, range.avg
            ));
        }
        s.push_str(&format!(
            "Invested:    {:.2} ({:.1}% utilization)\n",
            self.plan.total_invested, self.plan.utilization
        ));
        s.push_str(&format!("News:        {}\n\n", self.news_status.message));

        for (i, a) in self.plan.allocations.iter().take(SHOWN).enumerate() {
            s.push_str(&format!(
                "{}. {} - {:.2} x {:.2} shares = {:.2} ({:.1}%)\n",
                i + 1,
                a.symbol,
                a.price,
                a.shares_to_buy,
                a.actual_investment,
                a.allocation_percentage
            ));
            s.push_str(&format!("   Popularity: {:.1}/100\n", a.popularity_score));
        }
        if self.plan.allocations.len() > SHOWN {
            s.push_str(&format!(
                "\n...and {} more stocks\n",
                self.plan.allocations.len() - SHOWN
            ));
        }

        s
    }

    pub fn holding(&self, symbol: &str) -> Option<&StockQuote> {
        self.holdings
            .iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
    }
}

/// Report plus the handle of the news collection it started
#[derive(Debug)]
pub struct Analysis {
    pub report: AdvisoryReport,

    /// `None` when no news source is configured
    pub news: Option<NewsTask>,
}

/// Runs advisory cycles against a universe and a quote source
pub struct InvestmentAdvisor {
    universe: StockUniverse,
    market: Arc<dyn MarketDataSource>,
    news_source: Option<Arc<dyn NewsSource>>,
    news_archive: Option<NewsArchive>,
    news: NewsStore,
    allocator: Allocator,
    config: AdvisorConfig,
}

impl InvestmentAdvisor {
    pub fn new(
        universe: StockUniverse,
        market: Arc<dyn MarketDataSource>,
        config: AdvisorConfig,
    ) -> Self {
        Self {
            universe,
            market,
            news_source: None,
            news_archive: None,
            news: NewsStore::unconfigured(),
            allocator: Allocator::new(config.allocator.clone()),
            config,
        }
    }

    /// Collect news from `source` into `store` after each analysis
    pub fn with_news(mut self, source: Arc<dyn NewsSource>, store: NewsStore) -> Self {
        self.news_source = Some(source);
        self.news = store;
        self
    }

    /// Also save collected articles to `archive`
    pub fn with_news_archive(mut self, archive: NewsArchive) -> Self {
        self.news_archive = Some(archive);
        self
    }

    pub fn universe(&self) -> &StockUniverse {
        &self.universe
    }

    pub fn market(&self) -> &Arc<dyn MarketDataSource> {
        &self.market
    }

    pub fn news(&self) -> &NewsStore {
        &self.news
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Run one advisory cycle for `amount`
    pub async fn analyze(&self, amount: Decimal) -> Result<Analysis> {
        if amount <= Decimal::ZERO {
            return Err(AdvisorError::InvalidBudget(amount));
        }
        tracing::info!(%amount, "Starting analysis");

        let market_caps = market_cap_tiers(amount);
        let shortlist = self.universe.shortlist(amount, self.config.shortlist_count)?;
        let symbols: Vec<String> = shortlist.iter().map(|e| e.symbol.clone()).collect();

        let mut quotes = self.market.get_quotes(&symbols).await?;
        tracing::info!(
            source = self.market.name(),
            priced = quotes.len(),
            shortlisted = symbols.len(),
            "Fetched quotes"
        );
        if quotes.is_empty() {
            return Err(AdvisorError::EmptyInput);
        }
        let priced_count = quotes.len();

        for quote in &mut quotes {
            if quote.company.is_empty() || quote.company == quote.symbol {
                if let Some(name) = self.universe.company_name(&quote.symbol) {
                    if !name.is_empty() {
                        quote.company = name.to_string();
                    }
                }
            }
        }
        scoring::apply_quality_scores(&mut quotes);

        if self.config.prefer_affordable {
            quotes = filter_by_price_range(
                &quotes,
                amount,
                MIN_AFFORDABLE_STOCKS,
                MAX_AFFORDABLE_STOCKS,
            );
        }

        let candidates: Vec<Candidate> = quotes.iter().map(StockQuote::to_candidate).collect();
        let plan = self
            .allocator
            .plan(&candidates, self.config.selection_count, amount)?;

        let holdings: Vec<StockQuote> = plan
            .allocations
            .iter()
            .filter_map(|a| quotes.iter().find(|q| q.symbol == a.symbol).cloned())
            .collect();

        let news = match &self.news_source {
            Some(source) => {
                let requests = holdings
                    .iter()
                    .map(|q| CollectionRequest::new(q.symbol.clone(), q.company.clone()))
                    .collect();
                Some(
                    spawn_collection(
                        Arc::clone(source),
                        self.news.clone(),
                        requests,
                        CollectionSettings {
                            articles_per_stock: self.config.articles_per_stock,
                            interval: Duration::from_millis(self.config.news_request_interval_ms),
                            archive: self.news_archive.clone(),
                        },
                    )
                    .await,
                )
            }
            None => None,
        };

        let report = AdvisoryReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            investment_amount: amount,
            market_caps,
            shortlisted_count: shortlist.len(),
            priced_count,
            plan,
            selection: selection_summary(&holdings, amount),
            holdings,
            news_status: self.news.status().await,
        };

        tracing::info!(
            report = %report.id,
            selected = report.plan.allocations.len(),
            utilization = %report.plan.utilization.round_dp(1),
            "Analysis complete"
        );

        Ok(Analysis { report, news })
    }
}

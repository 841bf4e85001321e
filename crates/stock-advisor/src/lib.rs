//! # stock-advisor
//!
//! Equity investment advisor that turns an investment amount into a
//! diversified basket of realizable share counts.
//!
//! ## Pipeline
//!
//! - **Universe** - index-tagged companies; the amount picks eligible market-cap tiers
//! - **Scoring** - quality from valuation, dividend, volatility and size
//! - **Ranking** - popularity blends normalized market cap, volume and quality
//! - **Allocation** - budget split by quality, quantized to shares, topped up
//! - **News** - collected in the background, never awaited by the allocation
//!
//! ## Example: 5,000 across three small caps
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  Fractional regime (budget < 10,000)                      │
//! ├───────────────────────────────────────────────────────────┤
//! │  ALPHA  ███████████████  13.88 × 120.00 = 1,665.60 (33%)  │
//! │  BETA   ███████████████  37.04 ×  45.00 = 1,666.80 (33%)  │
//! │  DELTA  ███████████████   6.41 × 260.00 = 1,666.60 (33%)  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Spend never exceeds the budget. From 10,000 upward only whole shares
//! are bought and a greedy top-up fills the gap left by rounding.

pub mod advisor;
pub mod allocation;
pub mod error;
pub mod market;
pub mod model;
pub mod news;
pub mod scoring;
pub mod session;
pub mod universe;

pub use advisor::{AdvisorConfig, AdvisoryReport, Analysis, InvestmentAdvisor};
pub use allocation::{rank_and_select, AllocationPlan, Allocator, AllocatorConfig, ShareRegime};
pub use error::{AdvisorError, Result};
pub use model::{AllocationResult, Candidate, RankedCandidate, RiskLevel, StockQuote};
pub use session::{AdvisorySession, SessionId, SessionStore, Stage};

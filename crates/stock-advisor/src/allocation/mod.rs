//! Portfolio Allocation
//!
//! Turns priced candidates and a budget into realizable share counts:
//!
//! 1. [`rank_and_select`] - popularity ranking, keep the top N
//! 2. [`Allocator::allocate`] - quality-proportional split, share quantization
//! 3. [`Allocator::rebalance`] - greedy top-up toward the utilization target
//!
//! Total spend never exceeds the budget. Below `fractional_below` shares
//! may be fractional (two decimals); at or above it only whole shares are bought.

mod plan;
mod ranking;
pub mod sizing;

pub use plan::AllocationPlan;
pub use ranking::{popularity_scores, rank_and_select, MARKET_CAP_WEIGHT, QUALITY_WEIGHT, VOLUME_WEIGHT};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};
use crate::model::{AllocationResult, Candidate, RankedCandidate};

/// How share counts are quantized
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareRegime {
    /// Shares rounded to two decimal places
    Fractional,
    /// Whole shares only
    Whole,
}

impl ShareRegime {
    /// Smallest share increment in this regime
    pub fn quantum(self) -> Decimal {
        match self {
            Self::Fractional => dec!(0.01),
            Self::Whole => Decimal::ONE,
        }
    }
}

impl std::fmt::Display for ShareRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fractional => write!(f, "fractional shares"),
            Self::Whole => write!(f, "whole shares"),
        }
    }
}

/// Allocator tuning
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Budgets strictly below this use fractional shares
    pub fractional_below: Decimal,

    /// Top-up runs only when utilization is below this fraction of budget
    pub rebalance_trigger: Decimal,

    /// Top-up stops once utilization reaches this fraction of budget
    pub rebalance_target: Decimal,

    /// Explicit cap on top-up iterations; derived from remaining budget when unset
    pub max_rebalance_steps: Option<usize>,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            fractional_below: dec!(10000),
            rebalance_trigger: dec!(0.80),
            rebalance_target: dec!(0.95),
            max_rebalance_steps: None,
        }
    }
}

/// Quality-weighted allocator. Holds configuration only; every call is
/// a pure function of its arguments.
#[derive(Clone, Debug, Default)]
pub struct Allocator {
    config: AllocatorConfig,
}

impl Allocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub fn regime_for(&self, budget: Decimal) -> ShareRegime {
        if budget < self.config.fractional_below {
            ShareRegime::Fractional
        } else {
            ShareRegime::Whole
        }
    }

    /// See [`rank_and_select`]
    pub fn rank_and_select(
        &self,
        candidates: &[Candidate],
        count: usize,
    ) -> Result<Vec<RankedCandidate>> {
        rank_and_select(candidates, count)
    }

    /// Split the budget by quality and quantize to shares.
    ///
    /// An empty selection yields an empty allocation.
    pub fn allocate(
        &self,
        selected: &[RankedCandidate],
        budget: Decimal,
    ) -> Result<Vec<AllocationResult>> {
        validate_budget(budget)?;

        let regime = self.regime_for(budget);
        let fractions =
            sizing::allocation_fractions(selected).ok_or_else(|| too_large(budget))?;

        let mut allocations = Vec::with_capacity(selected.len());
        for (ranked, allocation_percentage) in selected.iter().zip(fractions) {
            let c = &ranked.candidate;
            let target_spend = (allocation_percentage / dec!(100))
                .checked_mul(budget)
                .ok_or_else(|| too_large(budget))?;
            let shares_to_buy = sizing::quantize_shares(target_spend, c.price, regime)
                .ok_or_else(|| too_large(budget))?;
            let actual_investment = shares_to_buy
                .checked_mul(c.price)
                .ok_or_else(|| too_large(budget))?;

            allocations.push(AllocationResult {
                symbol: c.symbol.clone(),
                price: c.price,
                quality_score: c.quality_score,
                popularity_score: ranked.popularity_score,
                allocation_percentage,
                target_spend,
                shares_to_buy,
                actual_investment,
            });
        }
        sizing::checked_total(&allocations).ok_or_else(|| too_large(budget))?;

        let cuts = sizing::enforce_budget(&mut allocations, budget, regime);
        if cuts > 0 {
            tracing::debug!(cuts, %budget, "quantization exceeded budget, trimmed");
        }

        Ok(allocations)
    }

    /// Greedy top-up: while utilization is under target, add one share to
    /// the cheapest position that still fits the remaining budget.
    ///
    /// Prices are fixed and the remaining budget only shrinks, so the same
    /// position is picked at every step; the shares are added in one go.
    pub fn rebalance(
        &self,
        mut allocations: Vec<AllocationResult>,
        budget: Decimal,
    ) -> Result<AllocationPlan> {
        validate_budget(budget)?;
        sizing::checked_total(&allocations).ok_or_else(|| too_large(budget))?;

        let regime = self.regime_for(budget);
        sizing::enforce_budget(&mut allocations, budget, regime);

        let total = sizing::total_invested(&allocations);
        let trigger = budget
            .checked_mul(self.config.rebalance_trigger)
            .ok_or_else(|| too_large(budget))?;
        let target = budget
            .checked_mul(self.config.rebalance_target)
            .ok_or_else(|| too_large(budget))?;
        let mut steps = 0usize;

        if total < trigger {
            tracing::warn!(
                invested = %total,
                %budget,
                "Low utilization, rebalancing"
            );

            let remaining = budget - total;
            let cap = self
                .config
                .max_rebalance_steps
                .unwrap_or_else(|| sizing::default_step_cap(&allocations, remaining));

            if let Some(idx) = sizing::cheapest_affordable(&allocations, remaining) {
                let position = &mut allocations[idx];
                steps = sizing::top_up_shares(position.price, target - total, remaining, cap);
                position.shares_to_buy = position
                    .shares_to_buy
                    .checked_add(Decimal::from(steps))
                    .ok_or_else(|| too_large(budget))?;
                position.reprice();
                tracing::debug!(symbol = %position.symbol, added = steps, "topped up position");
            }
        }

        let plan = AllocationPlan::new(budget, regime, allocations, steps);
        tracing::info!(
            positions = plan.allocations.len(),
            rebalance_steps = steps,
            "Total allocated {:.2} ({:.1}% utilization)",
            plan.total_invested,
            plan.utilization
        );

        Ok(plan)
    }

    /// Rank, allocate and rebalance in one pass
    pub fn plan(
        &self,
        candidates: &[Candidate],
        count: usize,
        budget: Decimal,
    ) -> Result<AllocationPlan> {
        validate_budget(budget)?;
        let selected = self.rank_and_select(candidates, count)?;
        let allocations = self.allocate(&selected, budget)?;
        self.rebalance(allocations, budget)
    }
}

fn too_large(budget: Decimal) -> AdvisorError {
    AdvisorError::InvalidAllocation(format!("budget {budget} is too large to size positions"))
}

fn validate_budget(budget: Decimal) -> Result<()> {
    if budget <= Decimal::ZERO {
        return Err(AdvisorError::InvalidBudget(budget));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Vec<Candidate> {
        vec![
            Candidate::new("A", dec!(100)).with_quality(dec!(80)),
            Candidate::new("B", dec!(50)).with_quality(dec!(20)),
        ]
    }

    fn whole_share_allocator() -> Allocator {
        Allocator::new(AllocatorConfig {
            fractional_below: dec!(100),
            ..Default::default()
        })
    }

    fn shares(plan: &AllocationPlan) -> Vec<Decimal> {
        plan.allocations.iter().map(|a| a.shares_to_buy).collect()
    }

    #[test]
    fn test_regime_boundary() {
        let allocator = Allocator::default();
        assert_eq!(allocator.regime_for(dec!(9999.99)), ShareRegime::Fractional);
        assert_eq!(allocator.regime_for(dec!(10000)), ShareRegime::Whole);
    }

    #[test]
    fn test_invalid_budget() {
        let allocator = Allocator::default();
        let selected = allocator.rank_and_select(&pair(), 2).unwrap();

        assert!(matches!(
            allocator.allocate(&selected, dec!(0)),
            Err(AdvisorError::InvalidBudget(_))
        ));
        assert!(matches!(
            allocator.plan(&pair(), 2, dec!(-10)),
            Err(AdvisorError::InvalidBudget(_))
        ));
    }

    #[test]
    fn test_scenario_proportional_whole_shares() {
        let plan = whole_share_allocator().plan(&pair(), 2, dec!(1000)).unwrap();

        assert_eq!(plan.regime, ShareRegime::Whole);
        assert_eq!(shares(&plan), vec![dec!(8), dec!(4)]);
        assert_eq!(plan.allocations[0].target_spend, dec!(800));
        assert_eq!(plan.allocations[1].target_spend, dec!(200));
        assert_eq!(plan.total_invested, dec!(1000));
        assert_eq!(plan.utilization, dec!(100));
        assert!(!plan.rebalanced());
    }

    #[test]
    fn test_scenario_proportional_fractional_regime() {
        let plan = Allocator::default().plan(&pair(), 2, dec!(1000)).unwrap();

        assert_eq!(plan.regime, ShareRegime::Fractional);
        assert_eq!(shares(&plan), vec![dec!(8), dec!(4)]);
        assert_eq!(plan.utilization, dec!(100));
    }

    #[test]
    fn test_scenario_half_share_rounds_up_to_one() {
        let plan = whole_share_allocator().plan(&pair(), 2, dec!(150)).unwrap();

        // exact 1.2 / 0.6 -> both at least one share
        assert_eq!(shares(&plan), vec![dec!(1), dec!(1)]);
        assert_eq!(plan.total_invested, dec!(150));
        assert_eq!(plan.utilization, dec!(100));
    }

    #[test]
    fn test_scenario_single_fractional_candidate() {
        let candidates = vec![Candidate::new("X", dec!(333.3)).with_quality(dec!(100))];
        let plan = Allocator::default().plan(&candidates, 1, dec!(9999)).unwrap();

        assert_eq!(plan.regime, ShareRegime::Fractional);
        assert_eq!(plan.allocations[0].shares_to_buy, dec!(30.00));
        assert_eq!(plan.total_invested, dec!(9999));
    }

    #[test]
    fn test_budget_exactly_at_threshold_uses_whole_shares() {
        let candidates = vec![Candidate::new("X", dec!(3000)).with_quality(dec!(100))];
        let plan = Allocator::default().plan(&candidates, 1, dec!(10000)).unwrap();

        assert_eq!(plan.regime, ShareRegime::Whole);
        assert_eq!(plan.allocations[0].shares_to_buy, dec!(3));
        assert_eq!(plan.total_invested, dec!(9000));
    }

    #[test]
    fn test_zero_price_never_gets_shares() {
        let candidates = vec![
            Candidate::new("FREE", dec!(0)).with_quality(dec!(90)),
            Candidate::new("PAID", dec!(10)).with_quality(dec!(10)),
        ];
        let plan = whole_share_allocator().plan(&candidates, 2, dec!(1000)).unwrap();

        let free = plan.allocation_for("FREE").unwrap();
        assert_eq!(free.shares_to_buy, Decimal::ZERO);
        assert_eq!(free.actual_investment, Decimal::ZERO);
        assert!(plan.total_invested <= dec!(1000));
    }

    #[test]
    fn test_rebalance_tops_up_cheapest() {
        // A gets 0.4 of a 1000 share -> 0; B gets 6 x 100.
        let candidates = vec![
            Candidate::new("A", dec!(1000)).with_quality(dec!(40)),
            Candidate::new("B", dec!(100)).with_quality(dec!(60)),
        ];
        let plan = whole_share_allocator().plan(&candidates, 2, dec!(1000)).unwrap();

        assert_eq!(plan.allocation_for("A").unwrap().shares_to_buy, dec!(0));
        assert_eq!(plan.allocation_for("B").unwrap().shares_to_buy, dec!(10));
        assert_eq!(plan.rebalance_steps, 4);
        assert_eq!(plan.total_invested, dec!(1000));
    }

    #[test]
    fn test_rebalance_not_triggered_at_or_above_trigger() {
        let allocator = whole_share_allocator();
        let selected = allocator.rank_and_select(&pair(), 2).unwrap();
        let mut allocations = allocator.allocate(&selected, dec!(1000)).unwrap();
        // 700 + 100 = 800, exactly the trigger
        allocations[0].shares_to_buy = dec!(7);
        allocations[0].reprice();
        allocations[1].shares_to_buy = dec!(2);
        allocations[1].reprice();

        let plan = allocator.rebalance(allocations, dec!(1000)).unwrap();
        assert_eq!(plan.rebalance_steps, 0);
        assert_eq!(plan.utilization, dec!(80));
    }

    #[test]
    fn test_rebalance_stops_when_nothing_affordable() {
        let candidates = vec![Candidate::new("PRICEY", dec!(600)).with_quality(dec!(100))];
        let plan = whole_share_allocator().plan(&candidates, 1, dec!(1000)).unwrap();

        assert_eq!(plan.allocations[0].shares_to_buy, dec!(1));
        assert_eq!(plan.utilization, dec!(60));
        assert!(!plan.meets_target(dec!(95)));
        assert!(plan.summary().contains("could not be placed"));
    }

    #[test]
    fn test_explicit_step_cap() {
        let allocator = Allocator::new(AllocatorConfig {
            fractional_below: dec!(100),
            max_rebalance_steps: Some(2),
            ..Default::default()
        });
        let candidates = vec![
            Candidate::new("A", dec!(1000)).with_quality(dec!(40)),
            Candidate::new("B", dec!(100)).with_quality(dec!(60)),
        ];
        let plan = allocator.plan(&candidates, 2, dec!(1000)).unwrap();

        assert_eq!(plan.rebalance_steps, 2);
        assert_eq!(plan.total_invested, dec!(800));
    }

    #[test]
    fn test_spend_never_exceeds_budget() {
        let candidates: Vec<Candidate> = (1..=12)
            .map(|i| {
                Candidate::new(format!("S{i}"), Decimal::from(i * 37 + 3))
                    .with_market_cap(Decimal::from(i * 1000))
                    .with_volume(Decimal::from(13 - i))
                    .with_quality(Decimal::from(i * 7 % 100))
            })
            .collect();

        for budget in [dec!(50), dec!(333), dec!(999.99), dec!(10000), dec!(12345), dec!(250000)] {
            let plan = Allocator::default().plan(&candidates, 10, budget).unwrap();
            assert!(plan.total_invested <= budget, "overspent at {budget}");

            let pct: Decimal = plan.allocations.iter().map(|a| a.allocation_percentage).sum();
            assert!((pct - dec!(100)).abs() < dec!(0.0001));
        }
    }

    #[test]
    fn test_huge_budget_is_sized_without_overflow() {
        let candidates = vec![Candidate::new("A", dec!(1)).with_quality(dec!(100))];
        let budget = dec!(1000000000000000000000000000);
        let plan = Allocator::default().plan(&candidates, 1, budget).unwrap();

        assert_eq!(plan.total_invested, budget);
        assert_eq!(plan.utilization, dec!(100));
    }

    #[test]
    fn test_unrepresentable_amounts_are_rejected() {
        let tiny = vec![Candidate::new("DUST", dec!(0.001)).with_quality(dec!(100))];
        assert!(matches!(
            Allocator::default().plan(&tiny, 1, Decimal::MAX),
            Err(AdvisorError::InvalidAllocation(_))
        ));

        let loud = vec![
            Candidate::new("A", dec!(10)).with_quality(Decimal::MAX),
            Candidate::new("B", dec!(10)).with_quality(Decimal::MAX),
        ];
        assert!(matches!(
            Allocator::default().plan(&loud, 2, dec!(1000)),
            Err(AdvisorError::InvalidAllocation(_))
        ));
    }

    /// Top-up done one share per iteration
    fn top_up_share_by_share(
        config: &AllocatorConfig,
        mut allocations: Vec<AllocationResult>,
        budget: Decimal,
    ) -> (Vec<Decimal>, usize) {
        let mut total = sizing::total_invested(&allocations);
        let mut steps = 0;

        if total < budget * config.rebalance_trigger {
            let cap = config
                .max_rebalance_steps
                .unwrap_or_else(|| sizing::default_step_cap(&allocations, budget - total));
            while total < budget * config.rebalance_target && steps < cap {
                let Some(idx) = sizing::cheapest_affordable(&allocations, budget - total) else {
                    break;
                };
                allocations[idx].shares_to_buy += Decimal::ONE;
                allocations[idx].reprice();
                total = sizing::total_invested(&allocations);
                steps += 1;
            }
        }

        (allocations.iter().map(|a| a.shares_to_buy).collect(), steps)
    }

    #[test]
    fn test_top_up_matches_share_by_share_greedy() {
        let candidates = vec![
            Candidate::new("A", dec!(1000)).with_quality(dec!(40)),
            Candidate::new("B", dec!(100)).with_quality(dec!(50)),
            Candidate::new("C", dec!(70)).with_quality(dec!(5)),
            Candidate::new("D", dec!(70)).with_quality(dec!(5)),
        ];
        let mut topped_up = 0;

        for fractional_below in [dec!(100), dec!(10000)] {
            for max_rebalance_steps in [None, Some(3)] {
                let config = AllocatorConfig {
                    fractional_below,
                    max_rebalance_steps,
                    ..Default::default()
                };
                let allocator = Allocator::new(config.clone());

                for budget in [dec!(640), dec!(1000), dec!(2345), dec!(5000), dec!(20000)] {
                    let selected = allocator.rank_and_select(&candidates, 4).unwrap();
                    let allocations = allocator.allocate(&selected, budget).unwrap();

                    let (expected_shares, expected_steps) =
                        top_up_share_by_share(&config, allocations.clone(), budget);
                    let plan = allocator.rebalance(allocations, budget).unwrap();

                    assert_eq!(shares(&plan), expected_shares, "budget {budget}");
                    assert_eq!(plan.rebalance_steps, expected_steps, "budget {budget}");
                    if plan.rebalanced() {
                        topped_up += 1;
                    }
                }
            }
        }

        assert!(topped_up > 0);
    }

    #[test]
    fn test_top_up_with_many_steps_is_immediate() {
        // One 6e11 share leaves room for 3.4e11 single-unit shares.
        let candidates = vec![
            Candidate::new("BIG", dec!(600000000000)).with_quality(dec!(99)),
            Candidate::new("PENNY", dec!(1)).with_quality(dec!(1)),
        ];
        let plan = Allocator::default()
            .plan(&candidates, 2, dec!(1000000000000))
            .unwrap();

        assert_eq!(plan.rebalance_steps, 340_000_000_000);
        assert_eq!(plan.allocation_for("BIG").unwrap().shares_to_buy, dec!(1));
        assert_eq!(plan.utilization, dec!(95));
    }

    #[test]
    fn test_allocate_is_idempotent() {
        let allocator = Allocator::default();
        let selected = allocator.rank_and_select(&pair(), 2).unwrap();

        let first = allocator.allocate(&selected, dec!(777)).unwrap();
        let second = allocator.allocate(&selected, dec!(777)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_allocate_empty_selection() {
        let allocations = Allocator::default().allocate(&[], dec!(1000)).unwrap();
        assert!(allocations.is_empty());
    }

    #[test]
    fn test_summary_lists_positions() {
        let plan = whole_share_allocator().plan(&pair(), 2, dec!(1000)).unwrap();
        let summary = plan.summary();

        assert!(summary.contains("ALLOCATION PLAN"));
        assert!(summary.contains("100.0% utilization"));
        assert!(summary.contains('A'));
        assert!(!summary.contains("Top-up"));
    }
}

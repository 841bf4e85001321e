//! Allocation Plan
//!
//! Final sized positions for one budget, with utilization bookkeeping.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::ShareRegime;
use crate::model::AllocationResult;

/// A complete allocation plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AllocationPlan {
    /// Total budget
    pub budget: Decimal,

    /// Share quantization regime chosen for this budget
    pub regime: ShareRegime,

    /// Per-candidate positions, in selection order
    pub allocations: Vec<AllocationResult>,

    /// Sum of actual investment
    pub total_invested: Decimal,

    /// total_invested / budget × 100
    pub utilization: Decimal,

    /// Shares added by the top-up pass
    pub rebalance_steps: usize,
}

impl AllocationPlan {
    pub(crate) fn new(
        budget: Decimal,
        regime: ShareRegime,
        allocations: Vec<AllocationResult>,
        rebalance_steps: usize,
    ) -> Self {
        let total_invested = super::sizing::total_invested(&allocations);
        let utilization = if budget > Decimal::ZERO {
            total_invested / budget * dec!(100)
        } else {
            Decimal::ZERO
        };

        Self {
            budget,
            regime,
            allocations,
            total_invested,
            utilization,
            rebalance_steps,
        }
    }

    /// Whether the top-up pass added any shares
    pub fn rebalanced(&self) -> bool {
        self.rebalance_steps > 0
    }

    /// Budget left unspent
    pub fn uninvested(&self) -> Decimal {
        self.budget - self.total_invested
    }

    /// Positions that actually buy something
    pub fn active_positions(&self) -> impl Iterator<Item = &AllocationResult> {
        self.allocations
            .iter()
            .filter(|a| a.shares_to_buy > Decimal::ZERO)
    }

    pub fn allocation_for(&self, symbol: &str) -> Option<&AllocationResult> {
        self.allocations
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Whether utilization reached `target_percent`
    pub fn meets_target(&self, target_percent: Decimal) -> bool {
        self.utilization >= target_percent
    }

    /// Plain-text breakdown of the plan
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str("═══ ALLOCATION PLAN ═══\n\n");
        s.push_str(&format!("Budget:     {:.2} ({})\n", self.budget, self.regime));
        s.push_str(&format!(
            "Invested:   {:.2} ({:.1}% utilization)\n",
            self.total_invested, self.utilization
        ));
        s.push_str(&format!("Uninvested: {:.2}\n\n", self.uninvested()));

        s.push_str("Positions:\n");
        for a in self.active_positions() {
            s.push_str(&format!(
                "  {:<12} {} × {:.2} = {:.2} ({:.1}%)  popularity {:.1}\n",
                a.symbol,
                a.shares_to_buy,
                a.price,
                a.actual_investment,
                a.allocation_percentage,
                a.popularity_score
            ));
        }

        let skipped: Vec<&str> = self
            .allocations
            .iter()
            .filter(|a| a.shares_to_buy <= Decimal::ZERO)
            .map(|a| a.symbol.as_str())
            .collect();
        if !skipped.is_empty() {
            s.push_str(&format!("  No shares: {}\n", skipped.join(", ")));
        }

        if self.rebalanced() {
            s.push_str(&format!(
                "\nTop-up added {} share(s) to improve utilization\n",
                self.rebalance_steps
            ));
        }
        if !self.meets_target(dec!(95)) {
            s.push_str(
                "\nNote: part of the budget could not be placed at these share prices\n",
            );
        }

        s
    }
}

//! Position Sizing
//!
//! Quality-proportional fractions, share quantization and the budget
//! guard that keeps total spend within the budget.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::ShareRegime;
use crate::model::{AllocationResult, RankedCandidate};

/// Allocation percentages proportional to quality.
///
/// Falls back to an equal split when the total quality is zero.
/// Negative quality scores count as zero. `None` when the quality total
/// is too large to represent.
pub fn allocation_fractions(selected: &[RankedCandidate]) -> Option<Vec<Decimal>> {
    if selected.is_empty() {
        return Some(Vec::new());
    }

    let total_quality = selected.iter().try_fold(Decimal::ZERO, |acc, r| {
        acc.checked_add(r.candidate.quality_score.max(Decimal::ZERO))
    })?;

    if total_quality == Decimal::ZERO {
        let equal = dec!(100) / Decimal::from(selected.len());
        return Some(vec![equal; selected.len()]);
    }

    Some(
        selected
            .iter()
            .map(|r| r.candidate.quality_score.max(Decimal::ZERO) / total_quality * dec!(100))
            .collect(),
    )
}

/// Convert a target spend into a realizable share count.
///
/// `None` when the share count is too large to represent.
pub fn quantize_shares(
    target_spend: Decimal,
    price: Decimal,
    regime: ShareRegime,
) -> Option<Decimal> {
    if price <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }

    let exact = target_spend.checked_div(price)?;
    let shares = match regime {
        ShareRegime::Fractional => exact.round_dp(2),
        ShareRegime::Whole => {
            if exact >= dec!(0.5) {
                exact.floor().max(Decimal::ONE)
            } else {
                Decimal::ZERO
            }
        }
    };
    Some(shares)
}

pub fn total_invested(allocations: &[AllocationResult]) -> Decimal {
    allocations.iter().map(|a| a.actual_investment).sum()
}

/// Upper bound on total spend, or `None` if it overflows.
///
/// Counts each position at the larger of its recorded spend and
/// `shares * price`, so once this succeeds, repricing, trimming shares or
/// topping up within the budget cannot overflow [`total_invested`].
pub fn checked_total(allocations: &[AllocationResult]) -> Option<Decimal> {
    allocations.iter().try_fold(Decimal::ZERO, |acc, a| {
        let spend = a.shares_to_buy.checked_mul(a.price)?;
        acc.checked_add(spend.max(a.actual_investment))
    })
}

/// Remove one quantum at a time from the position that most exceeds its
/// target until total spend fits the budget. Returns the number of cuts.
///
/// Quantization can round a position above its target: whole shares bump
/// `exact` in [0.5, 1) up to one share, and fractional rounding may round up.
pub fn enforce_budget(
    allocations: &mut [AllocationResult],
    budget: Decimal,
    regime: ShareRegime,
) -> usize {
    let quantum = regime.quantum();
    let mut cuts = 0;

    while total_invested(allocations) > budget {
        let Some(idx) = most_overshooting(allocations) else {
            break;
        };
        let position = &mut allocations[idx];
        position.shares_to_buy = (position.shares_to_buy - quantum).max(Decimal::ZERO);
        position.reprice();
        cuts += 1;

        tracing::debug!(
            symbol = %position.symbol,
            shares = %position.shares_to_buy,
            "trimmed position to stay within budget"
        );
    }

    cuts
}

/// Held position with the largest spend above target (first on ties)
fn most_overshooting(allocations: &[AllocationResult]) -> Option<usize> {
    let mut best: Option<(usize, Decimal)> = None;

    for (idx, a) in allocations.iter().enumerate() {
        if a.shares_to_buy <= Decimal::ZERO || a.price <= Decimal::ZERO {
            continue;
        }
        let overshoot = a.actual_investment - a.target_spend;
        match best {
            Some((_, current)) if overshoot <= current => {}
            _ => best = Some((idx, overshoot)),
        }
    }

    best.map(|(idx, _)| idx)
}

/// Cheapest positively priced position affordable within `remaining`
/// (first occurrence on equal prices)
pub fn cheapest_affordable(allocations: &[AllocationResult], remaining: Decimal) -> Option<usize> {
    let mut best: Option<(usize, Decimal)> = None;

    for (idx, a) in allocations.iter().enumerate() {
        if a.price <= Decimal::ZERO || a.price > remaining {
            continue;
        }
        match best {
            Some((_, cheapest)) if a.price >= cheapest => {}
            _ => best = Some((idx, a.price)),
        }
    }

    best.map(|(idx, _)| idx)
}

/// Shares the top-up adds to a position priced `price`: enough to close
/// `shortfall`, no more than fit in `remaining`, and at most `cap`.
pub fn top_up_shares(price: Decimal, shortfall: Decimal, remaining: Decimal, cap: usize) -> usize {
    if price <= Decimal::ZERO || shortfall <= Decimal::ZERO {
        return 0;
    }

    let to_target = shortfall.checked_div(price).map_or(Decimal::MAX, |n| n.ceil());
    let affordable = remaining.checked_div(price).map_or(Decimal::MAX, |n| n.floor());

    to_target
        .min(affordable)
        .max(Decimal::ZERO)
        .to_usize()
        .map_or(cap, |n| n.min(cap))
}

/// Upper bound on top-up iterations: each step spends at least the
/// cheapest positive price.
pub fn default_step_cap(allocations: &[AllocationResult], remaining: Decimal) -> usize {
    let min_price = allocations
        .iter()
        .map(|a| a.price)
        .filter(|p| *p > Decimal::ZERO)
        .min();

    match min_price {
        Some(price) if remaining > Decimal::ZERO => (remaining / price)
            .floor()
            .to_usize()
            .map_or(usize::MAX, |steps| steps.saturating_add(1)),
        _ => 0,
    }
}

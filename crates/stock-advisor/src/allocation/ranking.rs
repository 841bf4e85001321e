//! Popularity Ranking
//!
//! Orders candidates by a weighted blend of normalized market cap,
//! normalized volume and quality, then keeps the top N.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{AdvisorError, Result};
use crate::model::{Candidate, RankedCandidate};

/// Weight of normalized market capitalization
pub const MARKET_CAP_WEIGHT: Decimal = dec!(0.35);

/// Weight of normalized traded volume
pub const VOLUME_WEIGHT: Decimal = dec!(0.25);

/// Weight of the precomputed quality score
pub const QUALITY_WEIGHT: Decimal = dec!(0.40);

/// Rank candidates by popularity and keep the first `count`.
///
/// Sorting is stable, so equal scores keep their input order.
pub fn rank_and_select(candidates: &[Candidate], count: usize) -> Result<Vec<RankedCandidate>> {
    if candidates.is_empty() {
        return Err(AdvisorError::EmptyInput);
    }
    if count == 0 {
        return Err(AdvisorError::InvalidAllocation(
            "selection count must be at least 1".into(),
        ));
    }

    let mut ranked = popularity_scores(candidates);
    ranked.sort_by(|a, b| b.popularity_score.cmp(&a.popularity_score));

    for r in ranked.iter().take(15) {
        tracing::debug!(
            symbol = %r.candidate.symbol,
            popularity = %r.popularity_score.round_dp(1),
            price = %r.candidate.price,
            "popularity ranking"
        );
    }

    ranked.truncate(count);
    tracing::info!(
        selected = ranked.len(),
        from = candidates.len(),
        "Selected {} popular stocks",
        ranked.len()
    );

    Ok(ranked)
}

/// Score every candidate without reordering.
///
/// Normalization is relative to the whole input set, not the selected subset.
pub fn popularity_scores(candidates: &[Candidate]) -> Vec<RankedCandidate> {
    let max_cap = candidates.iter().map(|c| c.market_cap).max().unwrap_or(Decimal::ZERO);
    let max_volume = candidates.iter().map(|c| c.volume).max().unwrap_or(Decimal::ZERO);

    candidates
        .iter()
        .map(|c| {
            let popularity_score = MARKET_CAP_WEIGHT * normalize(c.market_cap, max_cap)
                + VOLUME_WEIGHT * normalize(c.volume, max_volume)
                + QUALITY_WEIGHT * c.quality_score;
            RankedCandidate {
                candidate: c.clone(),
                popularity_score,
            }
        })
        .collect()
}

/// Scale to 0..100 against the set maximum; a non-positive maximum yields 0
fn normalize(value: Decimal, max: Decimal) -> Decimal {
    if max <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    value.max(Decimal::ZERO) / max * dec!(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(symbol: &str, cap: Decimal, volume: Decimal, quality: Decimal) -> Candidate {
        Candidate::new(symbol, dec!(100))
            .with_market_cap(cap)
            .with_volume(volume)
            .with_quality(quality)
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = rank_and_select(&[], 5);
        assert!(matches!(result, Err(AdvisorError::EmptyInput)));
    }

    #[test]
    fn test_zero_count_rejected() {
        let c = vec![candidate("A", dec!(1), dec!(1), dec!(1))];
        assert!(matches!(
            rank_and_select(&c, 0),
            Err(AdvisorError::InvalidAllocation(_))
        ));
    }

    #[test]
    fn test_popularity_weights() {
        let c = vec![
            candidate("BIG", dec!(1000), dec!(500), dec!(50)),
            candidate("HALF", dec!(500), dec!(1000), dec!(100)),
        ];
        let scored = popularity_scores(&c);

        // 0.35 * 100 + 0.25 * 50 + 0.40 * 50
        assert_eq!(scored[0].popularity_score, dec!(67.5));
        // 0.35 * 50 + 0.25 * 100 + 0.40 * 100
        assert_eq!(scored[1].popularity_score, dec!(82.5));
    }

    #[test]
    fn test_zero_maximum_normalizes_to_zero() {
        let c = vec![
            candidate("A", dec!(0), dec!(0), dec!(80)),
            candidate("B", dec!(0), dec!(0), dec!(20)),
        ];
        let scored = popularity_scores(&c);
        assert_eq!(scored[0].popularity_score, dec!(32));
        assert_eq!(scored[1].popularity_score, dec!(8));
    }

    #[test]
    fn test_selects_min_of_count_and_len_sorted() {
        let c = vec![
            candidate("LOW", dec!(10), dec!(10), dec!(10)),
            candidate("TOP", dec!(100), dec!(100), dec!(90)),
            candidate("MID", dec!(50), dec!(50), dec!(50)),
        ];

        let two = rank_and_select(&c, 2).unwrap();
        let symbols: Vec<_> = two.iter().map(|r| r.candidate.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TOP", "MID"]);

        let all = rank_and_select(&c, 10).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].popularity_score >= w[1].popularity_score));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let c = vec![
            candidate("FIRST", dec!(10), dec!(10), dec!(40)),
            candidate("SECOND", dec!(10), dec!(10), dec!(40)),
            candidate("THIRD", dec!(10), dec!(10), dec!(40)),
        ];
        let ranked = rank_and_select(&c, 3).unwrap();
        let symbols: Vec<_> = ranked.iter().map(|r| r.candidate.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["FIRST", "SECOND", "THIRD"]);
    }
}

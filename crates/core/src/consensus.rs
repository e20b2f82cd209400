//! Weighted-vote consensus over per-strategy opinions.
//!
//! Each opinion contributes `weight x strength` to exactly one of three
//! buckets (buy/sell/hold). The winning bucket decides the signal, with
//! exact ties resolving to Hold. Confidence is the winning bucket's share
//! of the total bucket mass, so weights need not sum to one.

use crate::config::ConsensusConfig;
use crate::types::{ConsensusDecision, OpinionScore, Signal, StrategyId, StrategyOpinion};
use std::collections::HashMap;

/// Weight assumed for a strategy absent from the configuration.
const DEFAULT_WEIGHT: f64 = 0.1;

pub struct ConsensusEngine {
    weights: HashMap<StrategyId, f64>,
    min_confidence: f64,
    min_stars: u8,
}

impl ConsensusEngine {
    #[must_use]
    pub fn new(config: &ConsensusConfig) -> Self {
        Self {
            weights: config.weights.clone(),
            min_confidence: config.min_confidence,
            min_stars: config.min_stars,
        }
    }

    /// Minimum star rating a decision needs to be actionable.
    #[must_use]
    pub const fn min_stars(&self) -> u8 {
        self.min_stars
    }

    /// Star cap applied to decisions that fail horizon confirmation:
    /// one below the actionable minimum.
    #[must_use]
    pub const fn unconfirmed_star_cap(&self) -> u8 {
        self.min_stars.saturating_sub(1)
    }

    #[must_use]
    pub fn weight_for(&self, strategy: StrategyId) -> f64 {
        self.weights.get(&strategy).copied().unwrap_or(DEFAULT_WEIGHT)
    }

    /// Combines one cycle's opinions for a symbol into a single decision.
    ///
    /// A Hold decision still carries the star rating of its winning bucket;
    /// there is no sentinel value for "no trade".
    #[must_use]
    pub fn combine(&self, symbol: &str, opinions: &[StrategyOpinion]) -> ConsensusDecision {
        let mut buy_score = 0.0_f64;
        let mut sell_score = 0.0_f64;
        let mut hold_score = 0.0_f64;
        let mut breakdown = Vec::with_capacity(opinions.len());

        for opinion in opinions {
            let weight = self.weight_for(opinion.strategy);
            let weighted_score = weight * opinion.strength.score();

            match opinion.signal {
                Signal::Buy => buy_score += weighted_score,
                Signal::Sell => sell_score += weighted_score,
                Signal::Hold => hold_score += weighted_score,
            }

            breakdown.push(OpinionScore {
                strategy: opinion.strategy,
                signal: opinion.signal,
                strength: opinion.strength,
                weight,
                weighted_score,
            });
        }

        let total = buy_score + sell_score + hold_score;

        // Exact ties (including buy == sell) fall through to Hold.
        let (signal, winning) = if buy_score > sell_score && buy_score > hold_score {
            (Signal::Buy, buy_score)
        } else if sell_score > buy_score && sell_score > hold_score {
            (Signal::Sell, sell_score)
        } else {
            (Signal::Hold, hold_score.max(buy_score).max(sell_score))
        };

        let confidence = if total > 0.0 { winning / total } else { 0.0 };

        ConsensusDecision {
            symbol: symbol.to_string(),
            signal,
            confidence,
            stars: stars_for(confidence),
            breakdown,
            horizon_confirmed: true,
        }
    }

    /// A decision is actionable only when directional and above both the
    /// confidence and star thresholds. Anything below is treated as Hold
    /// downstream: no sizing, no order.
    #[must_use]
    pub fn is_actionable(&self, decision: &ConsensusDecision) -> bool {
        decision.signal.is_directional()
            && decision.confidence >= self.min_confidence
            && decision.stars >= self.min_stars
    }
}

/// Step function from confidence to a 1-5 star rating. Non-decreasing by
/// construction.
#[must_use]
pub fn stars_for(confidence: f64) -> u8 {
    if confidence >= 0.85 {
        5
    } else if confidence >= 0.70 {
        4
    } else if confidence >= 0.60 {
        3
    } else if confidence >= 0.50 {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Strength;

    fn engine_with(weights: &[(StrategyId, f64)], min_confidence: f64, min_stars: u8) -> ConsensusEngine {
        let config = ConsensusConfig {
            weights: weights.iter().copied().collect(),
            min_confidence,
            min_stars,
        };
        ConsensusEngine::new(&config)
    }

    fn opinion(strategy: StrategyId, signal: Signal, strength: Strength) -> StrategyOpinion {
        StrategyOpinion::new(strategy, signal, strength)
    }

    #[test]
    fn weighted_majority_buy_lands_in_expected_confidence_band() {
        // Three voters: BUY/High at 0.4, BUY/Moderate at 0.3, HOLD/Low at 0.3.
        let engine = engine_with(
            &[
                (StrategyId::EmaTrend, 0.4),
                (StrategyId::RsiReversal, 0.3),
                (StrategyId::Bollinger, 0.3),
            ],
            0.5,
            3,
        );
        let opinions = [
            opinion(StrategyId::EmaTrend, Signal::Buy, Strength::High),
            opinion(StrategyId::RsiReversal, Signal::Buy, Strength::Moderate),
            opinion(StrategyId::Bollinger, Signal::Hold, Strength::Low),
        ];

        let decision = engine.combine("BTCUSDT", &opinions);

        assert_eq!(decision.signal, Signal::Buy);
        // buy = 0.4*0.8 + 0.3*0.6 = 0.50, hold = 0.3*0.4 = 0.12 -> 0.806
        assert!(decision.confidence > 0.75 && decision.confidence < 0.85);
        assert!(decision.stars >= 4);
        assert!(engine.is_actionable(&decision));
    }

    #[test]
    fn bucket_totals_conserve_opinion_mass() {
        let engine = engine_with(
            &[
                (StrategyId::EmaTrend, 0.7),
                (StrategyId::RsiReversal, 0.2),
                (StrategyId::Bollinger, 0.45),
                (StrategyId::MacdMomentum, 0.15),
            ],
            0.5,
            3,
        );
        let opinions = [
            opinion(StrategyId::EmaTrend, Signal::Buy, Strength::VeryHigh),
            opinion(StrategyId::RsiReversal, Signal::Sell, Strength::Low),
            opinion(StrategyId::Bollinger, Signal::Hold, Strength::Moderate),
            opinion(StrategyId::MacdMomentum, Signal::Sell, Strength::VeryLow),
        ];

        let decision = engine.combine("ETHUSDT", &opinions);

        let breakdown_total: f64 = decision.breakdown.iter().map(|s| s.weighted_score).sum();
        let expected: f64 = opinions
            .iter()
            .map(|o| engine.weight_for(o.strategy) * o.strength.score())
            .sum();
        assert!((breakdown_total - expected).abs() < 1e-12);
    }

    #[test]
    fn exact_buy_sell_tie_resolves_to_hold() {
        // Design choice, not inherited behavior: equal directional buckets
        // must produce the conservative default.
        let engine = engine_with(
            &[(StrategyId::EmaTrend, 0.5), (StrategyId::RsiReversal, 0.5)],
            0.5,
            3,
        );
        let opinions = [
            opinion(StrategyId::EmaTrend, Signal::Buy, Strength::High),
            opinion(StrategyId::RsiReversal, Signal::Sell, Strength::High),
        ];

        let decision = engine.combine("SOLUSDT", &opinions);

        assert_eq!(decision.signal, Signal::Hold);
        assert!(!engine.is_actionable(&decision));
    }

    #[test]
    fn hold_decision_carries_bucket_derived_stars() {
        let engine = engine_with(&[(StrategyId::EmaTrend, 1.0)], 0.5, 3);
        let opinions = [opinion(StrategyId::EmaTrend, Signal::Hold, Strength::VeryHigh)];

        let decision = engine.combine("BTCUSDT", &opinions);

        assert_eq!(decision.signal, Signal::Hold);
        assert!((decision.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(decision.stars, 5);
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        let engine = engine_with(&[], 0.5, 3);
        for opinions in [
            vec![],
            vec![opinion(StrategyId::EmaTrend, Signal::Buy, Strength::VeryLow)],
            vec![
                opinion(StrategyId::EmaTrend, Signal::Buy, Strength::VeryHigh),
                opinion(StrategyId::RsiReversal, Signal::Sell, Strength::VeryHigh),
                opinion(StrategyId::Bollinger, Signal::Hold, Strength::VeryHigh),
            ],
        ] {
            let decision = engine.combine("X", &opinions);
            assert!((0.0..=1.0).contains(&decision.confidence));
        }
    }

    #[test]
    fn stars_are_non_decreasing_in_confidence() {
        let mut previous = 0;
        for step in 0..=100 {
            let confidence = f64::from(step) / 100.0;
            let stars = stars_for(confidence);
            assert!(stars >= previous);
            assert!((1..=5).contains(&stars));
            previous = stars;
        }
        assert_eq!(stars_for(0.85), 5);
        assert_eq!(stars_for(0.70), 4);
        assert_eq!(stars_for(0.60), 3);
        assert_eq!(stars_for(0.50), 2);
        assert_eq!(stars_for(0.49), 1);
    }

    #[test]
    fn below_threshold_decisions_are_not_actionable() {
        let engine = engine_with(&[(StrategyId::EmaTrend, 1.0)], 0.9, 5);
        let opinions = [opinion(StrategyId::EmaTrend, Signal::Buy, Strength::Moderate)];

        let decision = engine.combine("BTCUSDT", &opinions);

        // Unanimous buy, but the configured floor is higher than anything
        // a single moderate vote can reach once thresholds apply.
        assert_eq!(decision.signal, Signal::Buy);
        assert!(engine.is_actionable(&decision) == (decision.confidence >= 0.9 && decision.stars >= 5));
    }
}

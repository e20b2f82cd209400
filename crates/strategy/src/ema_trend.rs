//! EMA alignment trend-following scorer.

use crate::indicators::{closes, ema};
use crate::scorer::{Scorer, ScorerInput};
use quorum_core::types::{Signal, Strength, StrategyId, StrategyOpinion};

pub struct EmaTrendScorer {
    fast: usize,
    slow: usize,
    anchor: usize,
}

impl EmaTrendScorer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fast: 9,
            slow: 21,
            anchor: 50,
        }
    }
}

impl Default for EmaTrendScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for EmaTrendScorer {
    fn id(&self) -> StrategyId {
        StrategyId::EmaTrend
    }

    fn score(&self, input: &ScorerInput) -> StrategyOpinion {
        let prices = closes(input.primary_candles());
        let (Some(fast), Some(slow), Some(anchor)) = (
            ema(&prices, self.fast),
            ema(&prices, self.slow),
            ema(&prices, self.anchor),
        ) else {
            return StrategyOpinion::abstain(self.id());
        };
        let Some(last) = prices.last().copied() else {
            return StrategyOpinion::abstain(self.id());
        };

        // Full stack alignment is the trend signal; price beyond the fast
        // EMA upgrades it. A bare fast/slow cross is a weaker early read.
        let (signal, strength) = if fast > slow && slow > anchor {
            let strength = if last > fast {
                Strength::VeryHigh
            } else {
                Strength::High
            };
            (Signal::Buy, strength)
        } else if fast < slow && slow < anchor {
            let strength = if last < fast {
                Strength::VeryHigh
            } else {
                Strength::High
            };
            (Signal::Sell, strength)
        } else if fast > slow {
            (Signal::Buy, Strength::Moderate)
        } else if fast < slow {
            (Signal::Sell, Strength::Moderate)
        } else {
            (Signal::Hold, Strength::Low)
        };

        StrategyOpinion::new(self.id(), signal, strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use quorum_core::types::{Candle, Horizon};
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    fn input_from_closes(closes: &[f64]) -> ScorerInput {
        let candles: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let close = Decimal::try_from(*close).unwrap();
                Candle {
                    open_time: Utc.timestamp_opt(1_700_000_000 + i as i64 * 900, 0).unwrap(),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: Decimal::ONE,
                }
            })
            .collect();
        let current_price = candles.last().map_or(Decimal::ZERO, |c| c.close);
        ScorerInput {
            symbol: "BTCUSDT".to_string(),
            primary: Horizon::Min15,
            candles_by_horizon: HashMap::from([(Horizon::Min15, candles)]),
            current_price,
        }
    }

    #[test]
    fn sustained_uptrend_scores_strong_buy() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + f64::from(i)).collect();
        let opinion = EmaTrendScorer::new().score(&input_from_closes(&closes));
        assert_eq!(opinion.signal, Signal::Buy);
        assert_eq!(opinion.strength, Strength::VeryHigh);
    }

    #[test]
    fn sustained_downtrend_scores_strong_sell() {
        let closes: Vec<f64> = (0..80).map(|i| 200.0 - f64::from(i)).collect();
        let opinion = EmaTrendScorer::new().score(&input_from_closes(&closes));
        assert_eq!(opinion.signal, Signal::Sell);
        assert_eq!(opinion.strength, Strength::VeryHigh);
    }

    #[test]
    fn flat_market_holds() {
        let closes = vec![100.0; 80];
        let opinion = EmaTrendScorer::new().score(&input_from_closes(&closes));
        assert_eq!(opinion.signal, Signal::Hold);
    }

    #[test]
    fn short_history_abstains() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + f64::from(i)).collect();
        let opinion = EmaTrendScorer::new().score(&input_from_closes(&closes));
        assert_eq!(opinion, StrategyOpinion::abstain(StrategyId::EmaTrend));
    }
}

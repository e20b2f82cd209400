//! Bollinger band mean-reversion scorer.

use crate::indicators::{closes, sma, stddev};
use crate::scorer::{Scorer, ScorerInput};
use quorum_core::types::{Signal, Strength, StrategyId, StrategyOpinion};

pub struct BollingerScorer {
    period: usize,
    band_mult: f64,
}

impl BollingerScorer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            period: 20,
            band_mult: 2.0,
        }
    }
}

impl Default for BollingerScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for BollingerScorer {
    fn id(&self) -> StrategyId {
        StrategyId::Bollinger
    }

    fn score(&self, input: &ScorerInput) -> StrategyOpinion {
        let prices = closes(input.primary_candles());
        let (Some(mean), Some(deviation)) =
            (sma(&prices, self.period), stddev(&prices, self.period))
        else {
            return StrategyOpinion::abstain(self.id());
        };
        let Some(last) = prices.last().copied() else {
            return StrategyOpinion::abstain(self.id());
        };
        // Zero width means a dead market, not a band touch.
        if deviation <= f64::EPSILON {
            return StrategyOpinion::new(self.id(), Signal::Hold, Strength::Low);
        }

        let z = (last - mean) / deviation;
        let (signal, strength) = if z <= -self.band_mult {
            let strength = if z <= -self.band_mult - 0.5 {
                Strength::VeryHigh
            } else {
                Strength::High
            };
            (Signal::Buy, strength)
        } else if z >= self.band_mult {
            let strength = if z >= self.band_mult + 0.5 {
                Strength::VeryHigh
            } else {
                Strength::High
            };
            (Signal::Sell, strength)
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
            symbol: "SOLUSDT".to_string(),
            primary: Horizon::Min15,
            candles_by_horizon: HashMap::from([(Horizon::Min15, candles)]),
            current_price,
        }
    }

    #[test]
    fn spike_below_the_lower_band_buys() {
        // Mild noise around 100, then a hard drop on the last bar.
        let mut closes: Vec<f64> = (0..24)
            .map(|i| 100.0 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        closes.push(90.0);
        let opinion = BollingerScorer::new().score(&input_from_closes(&closes));
        assert_eq!(opinion.signal, Signal::Buy);
        assert!(opinion.strength >= Strength::High);
    }

    #[test]
    fn spike_above_the_upper_band_sells() {
        let mut closes: Vec<f64> = (0..24)
            .map(|i| 100.0 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        closes.push(110.0);
        let opinion = BollingerScorer::new().score(&input_from_closes(&closes));
        assert_eq!(opinion.signal, Signal::Sell);
        assert!(opinion.strength >= Strength::High);
    }

    #[test]
    fn price_inside_the_bands_holds() {
        let closes: Vec<f64> = (0..30)
            .map(|i| 100.0 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let opinion = BollingerScorer::new().score(&input_from_closes(&closes));
        assert_eq!(opinion.signal, Signal::Hold);
    }

    #[test]
    fn dead_flat_market_holds_instead_of_dividing_by_zero() {
        let closes = vec![100.0; 30];
        let opinion = BollingerScorer::new().score(&input_from_closes(&closes));
        assert_eq!(opinion.signal, Signal::Hold);
    }

    #[test]
    fn short_history_abstains() {
        let closes = vec![100.0; 10];
        let opinion = BollingerScorer::new().score(&input_from_closes(&closes));
        assert_eq!(opinion, StrategyOpinion::abstain(StrategyId::Bollinger));
    }
}

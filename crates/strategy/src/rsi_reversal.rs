//! RSI mean-reversion scorer: fade oversold and overbought extremes.

use crate::indicators::{closes, rsi};
use crate::scorer::{Scorer, ScorerInput};
use quorum_core::types::{Signal, Strength, StrategyId, StrategyOpinion};

pub struct RsiReversalScorer {
    period: usize,
    oversold: f64,
    overbought: f64,
}

impl RsiReversalScorer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl Default for RsiReversalScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for RsiReversalScorer {
    fn id(&self) -> StrategyId {
        StrategyId::RsiReversal
    }

    fn score(&self, input: &ScorerInput) -> StrategyOpinion {
        let prices = closes(input.primary_candles());
        let Some(value) = rsi(&prices, self.period) else {
            return StrategyOpinion::abstain(self.id());
        };

        // Ten points past the threshold counts as an extreme reading.
        let (signal, strength) = if value <= self.oversold {
            let strength = if value <= self.oversold - 10.0 {
                Strength::VeryHigh
            } else {
                Strength::High
            };
            (Signal::Buy, strength)
        } else if value >= self.overbought {
            let strength = if value >= self.overbought + 10.0 {
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

//! MACD histogram momentum scorer.

use crate::indicators::{closes, ema_series};
use crate::scorer::{Scorer, ScorerInput};
use quorum_core::types::{Signal, Strength, StrategyId, StrategyOpinion};

pub struct MacdMomentumScorer {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl MacdMomentumScorer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }

    /// MACD histogram series: (fast EMA - slow EMA) minus its signal EMA.
    fn histogram(&self, prices: &[f64]) -> Vec<f64> {
        let fast = ema_series(prices, self.fast);
        let slow = ema_series(prices, self.slow);
        if slow.is_empty() {
            return Vec::new();
        }

        // Align the two series on their final values; the fast series is
        // longer by (slow - fast) entries.
        let offset = fast.len() - slow.len();
        let macd: Vec<f64> = slow
            .iter()
            .enumerate()
            .map(|(i, s)| fast[i + offset] - s)
            .collect();

        let signal = ema_series(&macd, self.signal);
        if signal.is_empty() {
            return Vec::new();
        }
        let offset = macd.len() - signal.len();
        signal
            .iter()
            .enumerate()
            .map(|(i, s)| macd[i + offset] - s)
            .collect()
    }
}

impl Default for MacdMomentumScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for MacdMomentumScorer {
    fn id(&self) -> StrategyId {
        StrategyId::MacdMomentum
    }

    fn score(&self, input: &ScorerInput) -> StrategyOpinion {
        let prices = closes(input.primary_candles());
        let histogram = self.histogram(&prices);
        let [.., previous, current] = histogram.as_slice() else {
            return StrategyOpinion::abstain(self.id());
        };

        if *current == 0.0 {
            return StrategyOpinion::new(self.id(), Signal::Hold, Strength::Low);
        }

        let signal = if *current > 0.0 { Signal::Buy } else { Signal::Sell };
        // A fresh cross of the signal line is the strongest read; momentum
        // still widening is moderate; fading momentum barely counts.
        let crossed = previous.signum() != current.signum();
        let widening = current.abs() > previous.abs();
        let strength = if crossed {
            Strength::High
        } else if widening {
            Strength::Moderate
        } else {
            Strength::Low
        };

        StrategyOpinion::new(self.id(), signal, strength)
    }
}

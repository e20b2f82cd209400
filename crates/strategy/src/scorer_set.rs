//! Fixed scorer roster, assembled once at startup.

use crate::bollinger::BollingerScorer;
use crate::ema_trend::EmaTrendScorer;
use crate::macd_momentum::MacdMomentumScorer;
use crate::rsi_reversal::RsiReversalScorer;
use crate::scorer::{Scorer, ScorerInput};
use quorum_core::types::StrategyOpinion;

pub struct ScorerSet {
    scorers: Vec<Box<dyn Scorer>>,
}

impl ScorerSet {
    #[must_use]
    pub fn new(scorers: Vec<Box<dyn Scorer>>) -> Self {
        Self { scorers }
    }

    /// The standard roster: one scorer per known strategy id.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(EmaTrendScorer::new()),
            Box::new(RsiReversalScorer::new()),
            Box::new(BollingerScorer::new()),
            Box::new(MacdMomentumScorer::new()),
        ])
    }

    /// Runs every scorer against one snapshot. Always returns one opinion
    /// per scorer; abstentions are opinions too.
    #[must_use]
    pub fn score_all(&self, input: &ScorerInput) -> Vec<StrategyOpinion> {
        self.scorers.iter().map(|s| s.score(input)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::types::{Horizon, StrategyId};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn standard_roster_covers_every_strategy_id() {
        let set = ScorerSet::standard();
        let input = ScorerInput {
            symbol: "BTCUSDT".to_string(),
            primary: Horizon::Min15,
            candles_by_horizon: HashMap::new(),
            current_price: dec!(20000),
        };

        let opinions = set.score_all(&input);
        assert_eq!(opinions.len(), StrategyId::all().len());

        let mut seen: Vec<StrategyId> = opinions.iter().map(|o| o.strategy).collect();
        seen.sort_by_key(|id| id.as_str());
        let mut expected = StrategyId::all().to_vec();
        expected.sort_by_key(|id| id.as_str());
        assert_eq!(seen, expected);
    }

    #[test]
    fn empty_input_yields_all_abstentions() {
        let set = ScorerSet::standard();
        let input = ScorerInput {
            symbol: "BTCUSDT".to_string(),
            primary: Horizon::Min15,
            candles_by_horizon: HashMap::new(),
            current_price: dec!(20000),
        };

        for opinion in set.score_all(&input) {
            assert_eq!(opinion, StrategyOpinion::abstain(opinion.strategy));
        }
    }
}

//! The scorer seam: pure, synchronous opinion producers.

use quorum_core::types::{Candle, Horizon, StrategyId, StrategyOpinion};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Market snapshot handed to every scorer in a cycle.
///
/// Built once per symbol per scan from already-fetched candles; scorers
/// never perform I/O and never see each other's output.
pub struct ScorerInput {
    pub symbol: String,
    pub primary: Horizon,
    pub candles_by_horizon: HashMap<Horizon, Vec<Candle>>,
    pub current_price: Decimal,
}

impl ScorerInput {
    /// Candles for a horizon, empty when that horizon was not fetched.
    #[must_use]
    pub fn horizon(&self, horizon: Horizon) -> &[Candle] {
        self.candles_by_horizon
            .get(&horizon)
            .map_or(&[], Vec::as_slice)
    }

    /// Candles at the primary decision horizon.
    #[must_use]
    pub fn primary_candles(&self) -> &[Candle] {
        self.horizon(self.primary)
    }
}

/// A strategy's scoring function. Implementations take `&self` and may
/// not mutate: the same input must always produce the same opinion.
///
/// A scorer that cannot compute (short history, degenerate prices)
/// returns [`StrategyOpinion::abstain`] rather than an error; one broken
/// strategy must not take the cycle down.
pub trait Scorer: Send + Sync {
    fn id(&self) -> StrategyId;
    fn score(&self, input: &ScorerInput) -> StrategyOpinion;
}

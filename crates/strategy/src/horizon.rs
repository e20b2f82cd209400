//! Per-horizon trend classification feeding the confirmation step.

use crate::indicators::{closes, ema};
use crate::scorer::ScorerInput;
use quorum_core::trend::aggregate_trend;
use quorum_core::types::{Candle, Horizon, TrendDirection};

/// Classifies one horizon's trend from its EMA stack (9/21/50).
///
/// Full alignment with price leading reads strong; a bare fast/slow cross
/// reads plain; anything else, including short history, reads Neutral.
#[must_use]
pub fn classify_trend(candles: &[Candle]) -> TrendDirection {
    let prices = closes(candles);
    let (Some(fast), Some(slow), Some(anchor)) =
        (ema(&prices, 9), ema(&prices, 21), ema(&prices, 50))
    else {
        return TrendDirection::Neutral;
    };
    let Some(last) = prices.last().copied() else {
        return TrendDirection::Neutral;
    };

    if fast > slow && slow > anchor {
        if last > fast {
            TrendDirection::StrongBullish
        } else {
            TrendDirection::Bullish
        }
    } else if fast < slow && slow < anchor {
        if last < fast {
            TrendDirection::StrongBearish
        } else {
            TrendDirection::Bearish
        }
    } else if fast > slow {
        TrendDirection::Bullish
    } else if fast < slow {
        TrendDirection::Bearish
    } else {
        TrendDirection::Neutral
    }
}

/// Classifies each configured confirmation horizon and folds the readings
/// into one outlook.
pub struct HorizonAnalyzer {
    horizons: Vec<Horizon>,
}

impl HorizonAnalyzer {
    #[must_use]
    pub fn new(horizons: Vec<Horizon>) -> Self {
        Self { horizons }
    }

    /// Aggregate outlook over the configured horizons. With no horizons
    /// configured the outlook is Neutral, which never blocks.
    #[must_use]
    pub fn outlook(&self, input: &ScorerInput) -> TrendDirection {
        let readings: Vec<(Horizon, TrendDirection)> = self
            .horizons
            .iter()
            .map(|&h| (h, classify_trend(input.horizon(h))))
            .collect();
        aggregate_trend(&readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let close = Decimal::try_from(*close).unwrap();
                Candle {
                    open_time: Utc.timestamp_opt(1_700_000_000 + i as i64 * 3600, 0).unwrap(),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: Decimal::ONE,
                }
            })
            .collect()
    }

    #[test]
    fn rising_series_classifies_bullish() {
        let candles = candles_from_closes(&(0..80).map(|i| 100.0 + f64::from(i)).collect::<Vec<_>>());
        assert_eq!(classify_trend(&candles), TrendDirection::StrongBullish);
    }

    #[test]
    fn falling_series_classifies_bearish() {
        let candles = candles_from_closes(&(0..80).map(|i| 200.0 - f64::from(i)).collect::<Vec<_>>());
        assert_eq!(classify_trend(&candles), TrendDirection::StrongBearish);
    }

    #[test]
    fn short_history_is_neutral() {
        let candles = candles_from_closes(&[100.0, 101.0, 102.0]);
        assert_eq!(classify_trend(&candles), TrendDirection::Neutral);
    }

    #[test]
    fn analyzer_folds_opposing_horizons_to_neutral() {
        let rising = candles_from_closes(&(0..80).map(|i| 100.0 + f64::from(i)).collect::<Vec<_>>());
        let falling = candles_from_closes(&(0..80).map(|i| 200.0 - f64::from(i)).collect::<Vec<_>>());
        let input = ScorerInput {
            symbol: "BTCUSDT".to_string(),
            primary: Horizon::Min15,
            candles_by_horizon: HashMap::from([
                (Horizon::Hour1, rising),
                (Horizon::Hour4, falling),
            ]),
            current_price: Decimal::ONE_HUNDRED,
        };

        let analyzer = HorizonAnalyzer::new(vec![Horizon::Hour1, Horizon::Hour4]);
        assert_eq!(analyzer.outlook(&input), TrendDirection::Neutral);
    }

    #[test]
    fn analyzer_with_no_horizons_is_neutral() {
        let input = ScorerInput {
            symbol: "BTCUSDT".to_string(),
            primary: Horizon::Min15,
            candles_by_horizon: HashMap::new(),
            current_price: Decimal::ONE_HUNDRED,
        };
        let analyzer = HorizonAnalyzer::new(Vec::new());
        assert_eq!(analyzer.outlook(&input), TrendDirection::Neutral);
    }
}

//! ATR-based volatility gate.
//!
//! The gate answers one question per symbol per scan: is this market
//! moving enough, relative to its own price, for an ATR-sized stop to
//! clear fees and noise. It fails closed when history is too short.

use crate::config::GateConfig;
use crate::types::Candle;
use anyhow::Result;
use rust_decimal::Decimal;

/// Average true range over the last `period` candles.
///
/// True range uses the usual three-way max against the previous close, so
/// `period + 1` candles are required. Returns `None` on insufficient data.
#[must_use]
pub fn average_true_range(candles: &[Candle], period: usize) -> Option<Decimal> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let window = &candles[candles.len() - period - 1..];
    let mut sum = Decimal::ZERO;
    for pair in window.windows(2) {
        let previous_close = pair[0].close;
        let candle = &pair[1];
        let tr = (candle.high - candle.low)
            .max((candle.high - previous_close).abs())
            .max((candle.low - previous_close).abs());
        sum += tr;
    }

    Some(sum / Decimal::from(period))
}

/// ATR as a percentage of the latest close.
#[must_use]
pub fn atr_percent(atr: Decimal, close: Decimal) -> Option<Decimal> {
    if close <= Decimal::ZERO {
        return None;
    }
    Some(atr / close * Decimal::ONE_HUNDRED)
}

/// Outcome of a gate check, kept for logging alongside the pass/fail bit.
#[derive(Debug, Clone, Copy)]
pub struct GateVerdict {
    pub passed: bool,
    pub atr: Option<Decimal>,
    pub atr_pct: Option<Decimal>,
}

pub struct VolatilityGate {
    enabled: bool,
    min_atr_pct: Decimal,
    lookback: usize,
}

impl VolatilityGate {
    /// # Errors
    ///
    /// Returns an error if the configured threshold is negative, not
    /// representable as a decimal, or the lookback is zero.
    pub fn new(config: &GateConfig) -> Result<Self> {
        let min_atr_pct = Decimal::try_from(config.min_atr_pct)?;
        if min_atr_pct < Decimal::ZERO {
            anyhow::bail!("gate min_atr_pct must be non-negative");
        }
        if config.lookback == 0 {
            anyhow::bail!("gate lookback must be at least 1");
        }
        Ok(Self {
            enabled: config.enabled,
            min_atr_pct,
            lookback: config.lookback,
        })
    }

    /// Checks a symbol's recent candles against the threshold.
    ///
    /// Disabled gates pass everything. An enabled gate with too little
    /// history fails the symbol; a market we cannot measure is skipped,
    /// not traded.
    #[must_use]
    pub fn permits(&self, candles: &[Candle]) -> GateVerdict {
        if !self.enabled {
            return GateVerdict {
                passed: true,
                atr: None,
                atr_pct: None,
            };
        }

        let Some(atr) = average_true_range(candles, self.lookback) else {
            return GateVerdict {
                passed: false,
                atr: None,
                atr_pct: None,
            };
        };

        let atr_pct = candles
            .last()
            .and_then(|candle| atr_percent(atr, candle.close));

        GateVerdict {
            passed: atr_pct.is_some_and(|pct| pct >= self.min_atr_pct),
            atr: Some(atr),
            atr_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn flat_candles(count: usize, close: Decimal, range: Decimal) -> Vec<Candle> {
        (0..count)
            .map(|i| Candle {
                open_time: Utc.timestamp_opt(1_700_000_000 + i as i64 * 900, 0).unwrap(),
                open: close,
                high: close + range,
                low: close - range,
                close,
                volume: dec!(1000),
            })
            .collect()
    }

    fn gate(enabled: bool, min_atr_pct: f64) -> VolatilityGate {
        VolatilityGate::new(&GateConfig {
            enabled,
            min_atr_pct,
            lookback: 14,
        })
        .unwrap()
    }

    #[test]
    fn atr_of_constant_range_candles_is_the_range() {
        // high - low = 40 on every candle, no gaps between closes.
        let candles = flat_candles(20, dec!(20000), dec!(20));
        let atr = average_true_range(&candles, 14).unwrap();
        assert_eq!(atr, dec!(40));
    }

    #[test]
    fn atr_requires_period_plus_one_candles() {
        let candles = flat_candles(14, dec!(20000), dec!(20));
        assert!(average_true_range(&candles, 14).is_none());
        assert!(average_true_range(&candles, 0).is_none());
    }

    #[test]
    fn quiet_market_is_gated_and_volatile_market_passes() {
        let gate = gate(true, 0.5);

        // ATR 60 on a 20000 close -> 0.3%, below the 0.5% threshold.
        let quiet = flat_candles(20, dec!(20000), dec!(30));
        let verdict = gate.permits(&quiet);
        assert!(!verdict.passed);
        assert_eq!(verdict.atr_pct, Some(dec!(0.3)));

        // ATR 400 on a 20000 close -> 2.0%.
        let volatile = flat_candles(20, dec!(20000), dec!(200));
        let verdict = gate.permits(&volatile);
        assert!(verdict.passed);
        assert_eq!(verdict.atr_pct, Some(dec!(2.0)));
    }

    #[test]
    fn disabled_gate_passes_without_measuring() {
        let gate = gate(false, 0.5);
        let verdict = gate.permits(&[]);
        assert!(verdict.passed);
        assert!(verdict.atr.is_none());
    }

    #[test]
    fn enabled_gate_fails_closed_on_short_history() {
        let gate = gate(true, 0.5);
        let verdict = gate.permits(&flat_candles(5, dec!(20000), dec!(200)));
        assert!(!verdict.passed);
        assert!(verdict.atr.is_none());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let result = VolatilityGate::new(&GateConfig {
            enabled: true,
            min_atr_pct: -0.1,
            lookback: 14,
        });
        assert!(result.is_err());
    }
}

//! Indicator primitives over close-price slices.
//!
//! Everything here works on `f64`: scores and bands tolerate float
//! precision, and it keeps the hot scan path free of decimal division.
//! Money stays `Decimal` everywhere else.

use quorum_core::types::Candle;

/// Extracts close prices as floats for indicator math.
#[must_use]
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .map(|c| c.close.try_into().unwrap_or(0.0))
        .collect()
}

/// Simple moving average of the last `period` values.
#[must_use]
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Exponential moving average seeded with the SMA of the first `period`
/// values, then smoothed over the remainder.
#[must_use]
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).last().copied()
}

/// Full EMA series, one value per input value from index `period - 1` on.
/// Empty when there is not enough history.
#[must_use]
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    let mut series = Vec::with_capacity(values.len() - period + 1);
    series.push(seed);
    let mut current = seed;
    for value in &values[period..] {
        current = alpha * value + (1.0 - alpha) * current;
        series.push(current);
    }
    series
}

/// Relative strength index with Wilder smoothing.
///
/// Needs `period + 1` values for the first reading. A series with no
/// losses reads 100, no gains reads 0.
#[must_use]
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for pair in values[..=period].windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    for pair in values[period..].windows(2) {
        let change = pair[1] - pair[0];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Population standard deviation of the last `period` values.
#[must_use]
pub fn stddev(values: &[f64], period: usize) -> Option<f64> {
    let mean = sma(values, period)?;
    let window = &values[values.len() - period..];
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
    Some(variance.sqrt())
}

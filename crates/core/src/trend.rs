//! Multi-horizon trend aggregation and decision confirmation.
//!
//! Per-horizon trend classification lives with the scorers; this module
//! only folds already-classified horizons into one outlook and applies
//! the confirmation rule to a consensus decision.

use crate::types::{ConsensusDecision, Horizon, Signal, TrendDirection};

/// Bucket contribution of a strong trend reading.
const STRONG_WEIGHT: f64 = 1.0;
/// Bucket contribution of a plain trend reading.
const PLAIN_WEIGHT: f64 = 0.6;
/// Winning share required before the outlook is labelled strong.
const STRONG_RATIO: f64 = 0.75;

/// Folds per-horizon trend readings into a single outlook.
///
/// Same bucket idea as the signal consensus: bullish and bearish readings
/// accumulate weight, neutral readings contribute nothing, and an empty or
/// perfectly balanced input is Neutral.
#[must_use]
pub fn aggregate_trend(readings: &[(Horizon, TrendDirection)]) -> TrendDirection {
    let mut bullish = 0.0_f64;
    let mut bearish = 0.0_f64;

    for (_, trend) in readings {
        match trend {
            TrendDirection::StrongBullish => bullish += STRONG_WEIGHT,
            TrendDirection::Bullish => bullish += PLAIN_WEIGHT,
            TrendDirection::StrongBearish => bearish += STRONG_WEIGHT,
            TrendDirection::Bearish => bearish += PLAIN_WEIGHT,
            TrendDirection::Neutral => {}
        }
    }

    let total = bullish + bearish;
    if total <= 0.0 || (bullish - bearish).abs() < f64::EPSILON {
        return TrendDirection::Neutral;
    }

    if bullish > bearish {
        if bullish / total >= STRONG_RATIO {
            TrendDirection::StrongBullish
        } else {
            TrendDirection::Bullish
        }
    } else if bearish / total >= STRONG_RATIO {
        TrendDirection::StrongBearish
    } else {
        TrendDirection::Bearish
    }
}

/// Whether the aggregate outlook permits a decision's direction.
///
/// Only an opposing outlook blocks: Neutral neither confirms nor
/// contradicts, and Hold has no direction to contradict.
#[must_use]
pub const fn confirms(signal: Signal, outlook: TrendDirection) -> bool {
    match signal {
        Signal::Buy => !outlook.is_bearish(),
        Signal::Sell => !outlook.is_bullish(),
        Signal::Hold => true,
    }
}

/// Applies horizon confirmation to a decision in place.
///
/// A contradicted decision is downgraded, never dropped: its flag is
/// cleared and its stars capped at `star_cap`, which keeps it visible in
/// logs and notifications while guaranteeing it can never action.
pub fn apply_confirmation(
    decision: &mut ConsensusDecision,
    outlook: TrendDirection,
    star_cap: u8,
) {
    if decision.signal.is_directional() && !confirms(decision.signal, outlook) {
        decision.horizon_confirmed = false;
        decision.stars = decision.stars.min(star_cap);
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directional opinion of a single strategy, or the final consensus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Returns true if this signal has a tradeable direction.
    #[must_use]
    pub const fn is_directional(self) -> bool {
        !matches!(self, Self::Hold)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

/// Ordered strength of a strategy opinion.
///
/// The numeric mapping is a fixed design choice: monotonic, with a non-zero
/// floor so a `VeryLow` opinion still contributes to bucket totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strength {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl Strength {
    /// Numeric score in (0, 1] used by the consensus buckets.
    #[must_use]
    pub const fn score(self) -> f64 {
        match self {
            Self::VeryLow => 0.2,
            Self::Low => 0.4,
            Self::Moderate => 0.6,
            Self::High => 0.8,
            Self::VeryHigh => 1.0,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryLow => "VERY_LOW",
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
            Self::VeryHigh => "VERY_HIGH",
        }
    }
}

/// Candle aggregation level. `Min15` is the primary decision horizon;
/// the coarser levels are used for trend confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
}

impl Horizon {
    /// Exchange interval string for candle requests.
    #[must_use]
    pub const fn interval(self) -> &'static str {
        match self {
            Self::Min15 => "15m",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day1 => "1d",
        }
    }
}

/// One OHLCV candle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Closed set of strategy identifiers. Scorers are bound to these at startup;
/// there is no string-keyed dispatch in the scan path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    EmaTrend,
    RsiReversal,
    Bollinger,
    MacdMomentum,
}

impl StrategyId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmaTrend => "ema_trend",
            Self::RsiReversal => "rsi_reversal",
            Self::Bollinger => "bollinger",
            Self::MacdMomentum => "macd_momentum",
        }
    }

    /// All known strategies, in scoring order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [
            Self::EmaTrend,
            Self::RsiReversal,
            Self::Bollinger,
            Self::MacdMomentum,
        ]
    }
}

/// Opinion emitted by one scorer for one symbol in one cycle.
/// Immutable once produced; consumed by the consensus engine and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyOpinion {
    pub strategy: StrategyId,
    pub signal: Signal,
    pub strength: Strength,
}

impl StrategyOpinion {
    #[must_use]
    pub const fn new(strategy: StrategyId, signal: Signal, strength: Strength) -> Self {
        Self {
            strategy,
            signal,
            strength,
        }
    }

    /// The opinion a scorer returns when it cannot compute (insufficient history).
    #[must_use]
    pub const fn abstain(strategy: StrategyId) -> Self {
        Self::new(strategy, Signal::Hold, Strength::VeryLow)
    }
}

/// Per-strategy line in a consensus breakdown, kept for audit and notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpinionScore {
    pub strategy: StrategyId,
    pub signal: Signal,
    pub strength: Strength,
    pub weight: f64,
    pub weighted_score: f64,
}

/// Final weighted decision for one symbol in one scan cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusDecision {
    pub symbol: String,
    pub signal: Signal,
    /// Winning bucket's share of the total bucket mass, in [0, 1].
    pub confidence: f64,
    /// 1-5 star summary of confidence. Confirmation failure can cap this
    /// below 1 when the configured minimum is 1.
    pub stars: u8,
    pub breakdown: Vec<OpinionScore>,
    /// True only when the coarser horizons agree with the direction.
    pub horizon_confirmed: bool,
}

/// Trend classification across confirmation horizons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl TrendDirection {
    #[must_use]
    pub const fn is_bullish(self) -> bool {
        matches!(self, Self::Bullish | Self::StrongBullish)
    }

    #[must_use]
    pub const fn is_bearish(self) -> bool {
        matches!(self, Self::Bearish | Self::StrongBearish)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrongBullish => "STRONG_BULLISH",
            Self::Bullish => "BULLISH",
            Self::Neutral => "NEUTRAL",
            Self::Bearish => "BEARISH",
            Self::StrongBearish => "STRONG_BEARISH",
        }
    }
}

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Sign applied to (exit - entry) when computing P&L.
    #[must_use]
    pub fn sign(self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => -Decimal::ONE,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }

    /// Parses the ledger column encoding.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LONG" => Some(Self::Long),
            "SHORT" => Some(Self::Short),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    TakeProfit,
    StopLoss,
    ManualStop,
}

impl CloseReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TakeProfit => "TAKE_PROFIT",
            Self::StopLoss => "STOP_LOSS",
            Self::ManualStop => "MANUAL_STOP",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TAKE_PROFIT" => Some(Self::TakeProfit),
            "STOP_LOSS" => Some(Self::StopLoss),
            "MANUAL_STOP" => Some(Self::ManualStop),
            _ => None,
        }
    }
}

/// A sized, risk-bounded position. The only entity with a real lifecycle:
/// created on open, mutated once on close, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub stars: u8,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub exit_price: Option<Decimal>,
    pub close_reason: Option<CloseReason>,
    pub realized_pnl: Option<Decimal>,
    pub status: PositionStatus,
}

impl Position {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.status, PositionStatus::Open)
    }

    /// P&L at `price` for the open quantity, signed by side.
    #[must_use]
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.quantity * self.side.sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn strength_scores_are_monotonic() {
        let ordered = [
            Strength::VeryLow,
            Strength::Low,
            Strength::Moderate,
            Strength::High,
            Strength::VeryHigh,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].score() < pair[1].score());
        }
        assert!(Strength::VeryLow.score() > 0.0);
        assert!((Strength::VeryHigh.score() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn side_sign_flips_pnl_direction() {
        let mut position = Position {
            id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            side: Side::Long,
            entry_price: dec!(100),
            quantity: dec!(2),
            stop_loss: dec!(90),
            take_profit: dec!(120),
            stars: 4,
            opened_at: Utc::now(),
            closed_at: None,
            exit_price: None,
            close_reason: None,
            realized_pnl: None,
            status: PositionStatus::Open,
        };

        assert_eq!(position.unrealized_pnl(dec!(110)), dec!(20));
        position.side = Side::Short;
        assert_eq!(position.unrealized_pnl(dec!(110)), dec!(-20));
    }

    #[test]
    fn horizon_serde_uses_interval_strings() {
        let json = serde_json::to_string(&Horizon::Min15).unwrap();
        assert_eq!(json, "\"15m\"");
        let back: Horizon = serde_json::from_str("\"4h\"").unwrap();
        assert_eq!(back, Horizon::Hour4);
    }

    #[test]
    fn close_reason_round_trips_ledger_encoding() {
        for reason in [
            CloseReason::TakeProfit,
            CloseReason::StopLoss,
            CloseReason::ManualStop,
        ] {
            assert_eq!(CloseReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(CloseReason::parse("TP"), None);
    }
}

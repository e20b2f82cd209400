use crate::types::{Horizon, StrategyId};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeMode {
    /// Real market data, simulated fills. The default.
    Paper,
    /// Signed orders against the real account.
    Live,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: TradeMode,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub exchange: ExchangeConfig,
    pub notifier: NotifierConfig,
    pub trading: TradingConfig,
    pub scheduler: SchedulerConfig,
    pub consensus: ConsensusConfig,
    pub gate: GateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub api_url: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Webhook target for trade and report notifications. Log-only when unset.
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub watchlist: Vec<String>,
    /// Maximum concurrently open positions.
    pub capacity: usize,
    /// Account currency lost if a position stops out.
    pub risk_amount: f64,
    pub stop_atr_mult: f64,
    pub profit_atr_mult: f64,
    /// Budget for one symbol's scan before it is abandoned for this cycle.
    pub per_symbol_timeout_secs: u64,
    /// Candles fetched per horizon for scoring.
    pub candle_history: usize,
    pub primary_horizon: Horizon,
    pub confirmation_horizons: Vec<Horizon>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub scan_interval_secs: u64,
    pub watch_interval_secs: u64,
    pub report_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Per-strategy vote weight. Unlisted strategies get a small default.
    pub weights: HashMap<StrategyId, f64>,
    pub min_confidence: f64,
    pub min_stars: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub enabled: bool,
    /// ATR as a percentage of price below which a symbol is skipped.
    pub min_atr_pct: f64,
    /// ATR lookback in candles.
    pub lookback: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: TradeMode::Paper,
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            exchange: ExchangeConfig::default(),
            notifier: NotifierConfig::default(),
            trading: TradingConfig::default(),
            scheduler: SchedulerConfig::default(),
            consensus: ConsensusConfig::default(),
            gate: GateConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://quorum.db?mode=rwc".to_string(),
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://fapi.binance.com".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self { webhook_url: None }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            watchlist: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            capacity: 3,
            risk_amount: 20.0,
            stop_atr_mult: 1.5,
            profit_atr_mult: 3.0,
            per_symbol_timeout_secs: 60,
            candle_history: 100,
            primary_horizon: Horizon::Min15,
            confirmation_horizons: vec![Horizon::Hour1, Horizon::Hour4],
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 900,
            watch_interval_secs: 300,
            report_interval_secs: 86_400,
        }
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert(StrategyId::EmaTrend, 0.3);
        weights.insert(StrategyId::RsiReversal, 0.25);
        weights.insert(StrategyId::Bollinger, 0.25);
        weights.insert(StrategyId::MacdMomentum, 0.2);
        Self {
            weights,
            min_confidence: 0.5,
            min_stars: 3,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_atr_pct: 0.5,
            lookback: 14,
        }
    }
}

impl AppConfig {
    /// Validates invariants that serde defaults cannot enforce.
    ///
    /// Called once at startup; a failure here is fatal by design, most
    /// importantly live mode without credentials.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.mode == TradeMode::Live
            && (self.exchange.api_key.is_empty() || self.exchange.api_secret.is_empty())
        {
            anyhow::bail!("live mode requires exchange.api_key and exchange.api_secret");
        }
        if self.trading.watchlist.is_empty() {
            anyhow::bail!("trading.watchlist must name at least one symbol");
        }
        if self.trading.capacity == 0 {
            anyhow::bail!("trading.capacity must be at least 1");
        }
        if self.trading.risk_amount <= 0.0 {
            anyhow::bail!("trading.risk_amount must be positive");
        }
        if self.trading.stop_atr_mult <= 0.0 || self.trading.profit_atr_mult <= 0.0 {
            anyhow::bail!("trading ATR multiples must be positive");
        }
        if self.trading.candle_history < self.gate.lookback + 1 {
            anyhow::bail!("trading.candle_history too short for the gate lookback");
        }
        if !(0.0..=1.0).contains(&self.consensus.min_confidence) {
            anyhow::bail!("consensus.min_confidence must be within [0, 1]");
        }
        if !(1..=5).contains(&self.consensus.min_stars) {
            anyhow::bail!("consensus.min_stars must be within 1..=5");
        }
        if self.consensus.weights.values().any(|w| *w < 0.0) {
            anyhow::bail!("consensus.weights must be non-negative");
        }
        if self.scheduler.scan_interval_secs == 0
            || self.scheduler.watch_interval_secs == 0
            || self.scheduler.report_interval_secs == 0
        {
            anyhow::bail!("scheduler intervals must be positive");
        }
        Ok(())
    }
}

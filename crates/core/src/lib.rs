pub mod config;
pub mod config_loader;
pub mod consensus;
pub mod risk;
pub mod trend;
pub mod types;
pub mod volatility;

pub use config::{
    AppConfig, ConsensusConfig, DatabaseConfig, ExchangeConfig, GateConfig, NotifierConfig,
    SchedulerConfig, ServerConfig, TradeMode, TradingConfig,
};
pub use config_loader::ConfigLoader;
pub use consensus::{stars_for, ConsensusEngine};
pub use risk::{plan_entry, realized_pnl, EntryPlan, RiskParams};
pub use trend::{aggregate_trend, apply_confirmation, confirms};
pub use types::{
    Candle, CloseReason, ConsensusDecision, Horizon, OpinionScore, Position, PositionStatus,
    Side, Signal, Strength, StrategyId, StrategyOpinion, TrendDirection,
};
pub use volatility::{average_true_range, atr_percent, GateVerdict, VolatilityGate};

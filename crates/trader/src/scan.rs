//! The scan-and-decide cycle: gate, score, combine, confirm, size, open.

use crate::commands::{OpenOutcome, OpenRequest};
use crate::handle::TraderHandle;
use anyhow::{Context, Result};
use quorum_core::config::{AppConfig, TradingConfig};
use quorum_core::consensus::ConsensusEngine;
use quorum_core::risk::{plan_entry, EntryPlan, RiskParams};
use quorum_core::trend::apply_confirmation;
use quorum_core::types::{Candle, ConsensusDecision, Horizon, TrendDirection};
use quorum_core::volatility::{average_true_range, GateVerdict, VolatilityGate};
use quorum_exchange::ExchangeGateway;
use quorum_strategy::{HorizonAnalyzer, ScorerInput, ScorerSet};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Horizon the volatility gate and stop sizing measure ATR on. Hourly
/// bars smooth out the 15m noise that would whipsaw the gate.
const GATE_HORIZON: Horizon = Horizon::Hour1;

/// How one symbol's scan ended. Only `Opened` changed any state.
#[derive(Debug)]
pub enum SymbolOutcome {
    Opened,
    /// Volatility below the gate threshold, or unmeasurable.
    Gated,
    /// Decision was Hold or below the actionability thresholds.
    NoTrade,
    AtCapacity,
    AlreadyOpen,
    Rejected(String),
    TimedOut,
    Failed(String),
}

/// Everything a symbol scan produced, surfaced for the CLI `analyze`
/// command and for logging.
pub struct SymbolAnalysis {
    pub decision: ConsensusDecision,
    pub outlook: TrendDirection,
    pub verdict: GateVerdict,
    pub plan: Option<EntryPlan>,
}

/// Stateless per-cycle pipeline. Owns no positions; every open attempt
/// is delegated to the manager through the handle.
pub struct Scanner {
    gateway: Arc<dyn ExchangeGateway>,
    scorers: ScorerSet,
    consensus: ConsensusEngine,
    analyzer: HorizonAnalyzer,
    gate: VolatilityGate,
    atr_lookback: usize,
    risk: RiskParams,
    trading: TradingConfig,
}

impl Scanner {
    /// # Errors
    ///
    /// Returns an error if the gate or risk configuration is invalid.
    pub fn from_config(config: &AppConfig, gateway: Arc<dyn ExchangeGateway>) -> Result<Self> {
        Ok(Self {
            gateway,
            scorers: ScorerSet::standard(),
            consensus: ConsensusEngine::new(&config.consensus),
            analyzer: HorizonAnalyzer::new(config.trading.confirmation_horizons.clone()),
            gate: VolatilityGate::new(&config.gate).context("volatility gate config")?,
            atr_lookback: config.gate.lookback,
            risk: RiskParams::from_config(&config.trading).context("risk config")?,
            trading: config.trading.clone(),
        })
    }

    /// One full cycle over the watchlist. Each symbol is budgeted and
    /// isolated: a slow or failing symbol costs only itself.
    pub async fn scan_once(&self, handle: &TraderHandle) {
        // Cheap pre-check; the authoritative capacity check happens in
        // the manager when an open is actually attempted.
        match handle.snapshot().await {
            Ok(status) if status.open_count >= status.capacity => {
                tracing::info!(
                    open = status.open_count,
                    capacity = status.capacity,
                    "book full, skipping scan cycle"
                );
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "manager unavailable, skipping scan cycle");
                return;
            }
        }

        let budget = Duration::from_secs(self.trading.per_symbol_timeout_secs);
        for symbol in &self.trading.watchlist {
            let outcome =
                match tokio::time::timeout(budget, self.process_symbol(symbol, handle)).await {
                    Ok(outcome) => outcome,
                    Err(_) => SymbolOutcome::TimedOut,
                };
            match &outcome {
                SymbolOutcome::Opened => tracing::info!(%symbol, "scan opened a position"),
                SymbolOutcome::Rejected(reason) => {
                    tracing::warn!(%symbol, %reason, "scan open rejected");
                }
                SymbolOutcome::Failed(reason) => {
                    tracing::warn!(%symbol, %reason, "symbol scan failed");
                }
                SymbolOutcome::TimedOut => tracing::warn!(%symbol, "symbol scan timed out"),
                SymbolOutcome::Gated | SymbolOutcome::NoTrade => {
                    tracing::debug!(%symbol, outcome = ?outcome, "no action");
                }
                SymbolOutcome::AtCapacity | SymbolOutcome::AlreadyOpen => {
                    tracing::debug!(%symbol, outcome = ?outcome, "skipped by manager");
                }
            }
        }
    }

    async fn process_symbol(&self, symbol: &str, handle: &TraderHandle) -> SymbolOutcome {
        let analysis = match self.analyze_symbol(symbol).await {
            Ok(analysis) => analysis,
            Err(e) => return SymbolOutcome::Failed(format!("{e:#}")),
        };

        if !analysis.verdict.passed {
            return SymbolOutcome::Gated;
        }
        let Some(plan) = analysis.plan else {
            return SymbolOutcome::NoTrade;
        };

        let request = OpenRequest {
            decision: analysis.decision,
            plan,
        };
        match handle.try_open(request).await {
            Ok(OpenOutcome::Opened(_)) => SymbolOutcome::Opened,
            Ok(OpenOutcome::AtCapacity) => SymbolOutcome::AtCapacity,
            Ok(OpenOutcome::AlreadyOpen) => SymbolOutcome::AlreadyOpen,
            Ok(OpenOutcome::Rejected(reason)) => SymbolOutcome::Rejected(reason),
            Err(e) => SymbolOutcome::Failed(format!("manager: {e:#}")),
        }
    }

    /// Runs the decision pipeline for one symbol without touching the
    /// book. `plan` is set only for a gate-passing, actionable decision.
    ///
    /// # Errors
    ///
    /// Returns an error if market data cannot be fetched or sizing fails.
    pub async fn analyze_symbol(&self, symbol: &str) -> Result<SymbolAnalysis> {
        let mut candles_by_horizon: HashMap<Horizon, Vec<Candle>> = HashMap::new();
        let primary = self.trading.primary_horizon;

        let mut horizons = vec![primary];
        horizons.extend(&self.trading.confirmation_horizons);
        if !horizons.contains(&GATE_HORIZON) {
            horizons.push(GATE_HORIZON);
        }
        for horizon in horizons {
            let candles = self
                .gateway
                .get_candles(symbol, horizon, self.trading.candle_history)
                .await
                .with_context(|| format!("candles for {symbol} {}", horizon.interval()))?;
            candles_by_horizon.insert(horizon, candles);
        }

        let current_price = self
            .gateway
            .get_current_price(symbol)
            .await
            .with_context(|| format!("price for {symbol}"))?;

        let input = ScorerInput {
            symbol: symbol.to_string(),
            primary,
            candles_by_horizon,
            current_price,
        };

        let verdict = self.gate.permits(input.horizon(GATE_HORIZON));
        let opinions = self.scorers.score_all(&input);
        let mut decision = self.consensus.combine(symbol, &opinions);
        let outlook = self.analyzer.outlook(&input);
        apply_confirmation(&mut decision, outlook, self.consensus.unconfirmed_star_cap());

        tracing::debug!(
            %symbol,
            signal = decision.signal.as_str(),
            confidence = decision.confidence,
            stars = decision.stars,
            confirmed = decision.horizon_confirmed,
            outlook = outlook.as_str(),
            gate_passed = verdict.passed,
            "symbol analyzed"
        );

        let plan = if verdict.passed && self.consensus.is_actionable(&decision) {
            // The gate already measured ATR unless it was disabled.
            let atr = verdict
                .atr
                .or_else(|| average_true_range(input.horizon(GATE_HORIZON), self.atr_lookback));
            match atr {
                Some(atr) => Some(plan_entry(decision.signal, current_price, atr, &self.risk)?),
                None => None,
            }
        } else {
            None
        };

        Ok(SymbolAnalysis {
            decision,
            outlook,
            verdict,
            plan,
        })
    }
}

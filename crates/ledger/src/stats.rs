//! Aggregates derived from closed positions.
//!
//! Statistics are never stored: they are recomputed from ledger rows on
//! demand, so the ledger stays the single source of truth.

use quorum_core::types::Position;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TradeStats {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_pnl: Decimal,
    pub win_rate: f64,
    pub best_trade: Option<Decimal>,
    pub worst_trade: Option<Decimal>,
}

impl TradeStats {
    /// Folds closed positions into summary statistics. Open positions and
    /// rows without a recorded P&L are skipped. Break-even closes count
    /// as losses.
    #[must_use]
    pub fn from_positions(positions: &[Position]) -> Self {
        let mut stats = Self::default();

        for position in positions {
            let Some(pnl) = position.realized_pnl else {
                continue;
            };
            if position.is_open() {
                continue;
            }

            stats.trades += 1;
            if pnl > Decimal::ZERO {
                stats.wins += 1;
            } else {
                stats.losses += 1;
            }
            stats.total_pnl += pnl;
            stats.best_trade = Some(stats.best_trade.map_or(pnl, |best| best.max(pnl)));
            stats.worst_trade = Some(stats.worst_trade.map_or(pnl, |worst| worst.min(pnl)));
        }

        if stats.trades > 0 {
            stats.win_rate = stats.wins as f64 / stats.trades as f64;
        }
        stats
    }
}

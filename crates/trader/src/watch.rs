//! The position-watch cycle: mark open positions and hand exit decisions
//! to the manager.

use crate::handle::TraderHandle;
use quorum_exchange::ExchangeGateway;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// One watch tick. Fetches a mark per open position, logs unrealized
/// P&L, and submits the marks for exit evaluation. A symbol whose price
/// fetch fails is simply skipped until the next tick.
pub async fn watch_once(gateway: &Arc<dyn ExchangeGateway>, handle: &TraderHandle) {
    let status = match handle.snapshot().await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(error = %e, "manager unavailable, skipping watch cycle");
            return;
        }
    };
    if status.open_positions.is_empty() {
        return;
    }

    let mut marks: Vec<(Uuid, Decimal)> = Vec::with_capacity(status.open_positions.len());
    for position in &status.open_positions {
        match gateway.get_current_price(&position.symbol).await {
            Ok(price) => {
                tracing::info!(
                    symbol = %position.symbol,
                    side = position.side.as_str(),
                    mark = %price,
                    unrealized = %position.unrealized_pnl(price),
                    "open position"
                );
                marks.push((position.id, price));
            }
            Err(e) => {
                tracing::warn!(symbol = %position.symbol, error = %e, "mark fetch failed");
            }
        }
    }

    match handle.sync_exits(marks).await {
        Ok(0) => {}
        Ok(closed) => tracing::info!(closed, "watch cycle closed positions"),
        Err(e) => tracing::error!(error = %e, "exit sync failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{OpenOutcome, OpenRequest};
    use crate::manager::PositionManager;
    use crate::notify::LogNotifier;
    use quorum_core::risk::EntryPlan;
    use quorum_core::types::{CloseReason, ConsensusDecision, Side, Signal};
    use quorum_exchange::StaticGateway;
    use quorum_ledger::Ledger;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn watch_closes_a_stopped_out_position() {
        let gateway = Arc::new(StaticGateway::new());
        gateway.set_price("BTCUSDT", dec!(20000)).await;
        let ledger = Ledger::new_in_memory().await.unwrap();
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(
            PositionManager::new(rx, gateway.clone(), ledger.clone(), Arc::new(LogNotifier), 3)
                .run(),
        );
        let handle = TraderHandle::new(tx);

        let request = OpenRequest {
            decision: ConsensusDecision {
                symbol: "BTCUSDT".to_string(),
                signal: Signal::Buy,
                confidence: 0.8,
                stars: 4,
                breakdown: Vec::new(),
                horizon_confirmed: true,
            },
            plan: EntryPlan {
                side: Side::Long,
                entry_price: dec!(20000),
                stop_loss: dec!(19600),
                take_profit: dec!(20800),
                quantity: dec!(0.05),
                reward_risk: dec!(2),
            },
        };
        assert!(matches!(
            handle.try_open(request).await.unwrap(),
            OpenOutcome::Opened(_)
        ));

        let watch_gateway: Arc<dyn ExchangeGateway> = gateway.clone();

        // Price above the stop: nothing closes.
        watch_once(&watch_gateway, &handle).await;
        assert_eq!(ledger.open_count().await.unwrap(), 1);

        // Price through the stop: the watch tick closes it.
        gateway.set_price("BTCUSDT", dec!(19500)).await;
        watch_once(&watch_gateway, &handle).await;
        assert_eq!(ledger.open_count().await.unwrap(), 0);
        let closed = ledger.all_closed().await.unwrap();
        assert_eq!(closed[0].close_reason, Some(CloseReason::StopLoss));
    }
}

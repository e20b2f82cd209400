//! The position manager actor.
//!
//! All lifecycle mutations run inside this single task: capacity
//! check-and-reserve, per-symbol uniqueness, exit closes, and manual
//! stop. The scan and watch loops do their network work concurrently and
//! only meet here, one command at a time, which is what makes the
//! capacity and uniqueness checks atomic.

use crate::commands::{OpenOutcome, OpenRequest, TraderCommand, TraderStatus};
use crate::notify::{Notification, Notifier};
use chrono::Utc;
use quorum_core::risk::realized_pnl;
use quorum_core::types::{CloseReason, Position, PositionStatus, Side};
use quorum_exchange::{ExchangeGateway, GatewayError};
use quorum_ledger::Ledger;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct PositionManager {
    rx: mpsc::Receiver<TraderCommand>,
    gateway: Arc<dyn ExchangeGateway>,
    ledger: Ledger,
    notifier: Arc<dyn Notifier>,
    capacity: usize,
    last_error: Option<String>,
}

impl PositionManager {
    #[must_use]
    pub fn new(
        rx: mpsc::Receiver<TraderCommand>,
        gateway: Arc<dyn ExchangeGateway>,
        ledger: Ledger,
        notifier: Arc<dyn Notifier>,
        capacity: usize,
    ) -> Self {
        Self {
            rx,
            gateway,
            ledger,
            notifier,
            capacity,
            last_error: None,
        }
    }

    /// Processes commands until `Shutdown` or all handles drop.
    pub async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                TraderCommand::TryOpen { request, reply } => {
                    let outcome = self.try_open(request).await;
                    let _ = reply.send(outcome);
                }
                TraderCommand::SyncExits { marks, reply } => {
                    let closed = self.sync_exits(marks).await;
                    let _ = reply.send(closed);
                }
                TraderCommand::StopAll { reply } => {
                    let closed = self.stop_all().await;
                    let _ = reply.send(closed);
                }
                TraderCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot().await);
                }
                TraderCommand::Shutdown => {
                    tracing::info!("position manager shutting down");
                    break;
                }
            }
        }
    }

    async fn try_open(&mut self, request: OpenRequest) -> OpenOutcome {
        let symbol = request.decision.symbol.clone();
        let plan = request.plan;

        let open_count = match self.ledger.open_count().await {
            Ok(count) => count,
            Err(e) => return self.record_rejection(&symbol, format!("ledger: {e}")),
        };
        if open_count >= self.capacity {
            tracing::info!(%symbol, open_count, capacity = self.capacity, "at capacity, not opening");
            return OpenOutcome::AtCapacity;
        }

        match self.ledger.open_position_for(&symbol).await {
            Ok(Some(_)) => return OpenOutcome::AlreadyOpen,
            Ok(None) => {}
            Err(e) => return self.record_rejection(&symbol, format!("ledger: {e}")),
        }

        let fill = match self
            .gateway
            .place_order(&symbol, plan.side, plan.quantity)
            .await
        {
            Ok(fill) => fill,
            Err(GatewayError::Rejected(reason)) => {
                return self.record_rejection(&symbol, reason);
            }
            Err(e) => return self.record_rejection(&symbol, e.to_string()),
        };

        let position = Position {
            id: Uuid::new_v4(),
            symbol: symbol.clone(),
            side: plan.side,
            entry_price: fill.price,
            quantity: fill.quantity,
            stop_loss: plan.stop_loss,
            take_profit: plan.take_profit,
            stars: request.decision.stars,
            opened_at: Utc::now(),
            closed_at: None,
            exit_price: None,
            close_reason: None,
            realized_pnl: None,
            status: PositionStatus::Open,
        };

        if let Err(e) = self.ledger.insert_open(&position).await {
            // The order filled but the book has no record of it. Unwind
            // at market so the exchange and the ledger stay consistent.
            tracing::error!(%symbol, error = %e, "ledger insert failed, unwinding fill");
            if let Err(unwind) = self
                .gateway
                .close_position(&symbol, position.side, position.quantity)
                .await
            {
                tracing::error!(%symbol, error = %unwind, "unwind failed, manual intervention needed");
            }
            return self.record_rejection(&symbol, format!("ledger: {e}"));
        }

        tracing::info!(
            %symbol,
            side = position.side.as_str(),
            price = %position.entry_price,
            quantity = %position.quantity,
            stars = position.stars,
            "position opened"
        );
        self.send_notification(&Notification::PositionOpened {
            position: position.clone(),
            decision: request.decision,
            reward_risk: plan.reward_risk,
        })
        .await;

        OpenOutcome::Opened(position)
    }

    /// Re-validates marks against protective levels and closes on first
    /// touch. The stop is checked before the target, so a candle wide
    /// enough to touch both resolves as a stop-out.
    async fn sync_exits(&mut self, marks: Vec<(Uuid, Decimal)>) -> usize {
        let open = match self.ledger.open_positions().await {
            Ok(open) => open,
            Err(e) => {
                self.last_error = Some(format!("ledger: {e}"));
                return 0;
            }
        };

        let mut closed = 0;
        for (id, mark) in marks {
            let Some(position) = open.iter().find(|p| p.id == id) else {
                continue;
            };

            let stop_hit = match position.side {
                Side::Long => mark <= position.stop_loss,
                Side::Short => mark >= position.stop_loss,
            };
            let target_hit = match position.side {
                Side::Long => mark >= position.take_profit,
                Side::Short => mark <= position.take_profit,
            };

            let reason = if stop_hit {
                CloseReason::StopLoss
            } else if target_hit {
                CloseReason::TakeProfit
            } else {
                continue;
            };

            if self.close_position(position, reason).await {
                closed += 1;
            }
        }
        closed
    }

    /// Closes the whole book at market. Safe to call repeatedly: a second
    /// invocation finds nothing open and closes nothing.
    async fn stop_all(&mut self) -> usize {
        let open = match self.ledger.open_positions().await {
            Ok(open) => open,
            Err(e) => {
                self.last_error = Some(format!("ledger: {e}"));
                return 0;
            }
        };

        let mut closed = 0;
        for position in &open {
            if self.close_position(position, CloseReason::ManualStop).await {
                closed += 1;
            }
        }
        tracing::info!(closed, "manual stop completed");
        closed
    }

    /// One position's close path: exchange first, then ledger, then
    /// notification. A failed exchange close leaves the row open so the
    /// next tick retries it.
    async fn close_position(&mut self, position: &Position, reason: CloseReason) -> bool {
        let fill = match self
            .gateway
            .close_position(&position.symbol, position.side, position.quantity)
            .await
        {
            Ok(fill) => fill,
            Err(e) => {
                tracing::warn!(symbol = %position.symbol, error = %e, "close failed, will retry");
                self.last_error = Some(format!("close {}: {e}", position.symbol));
                return false;
            }
        };

        let pnl = realized_pnl(position.side, position.entry_price, fill.price, position.quantity);
        let closed_at = Utc::now();
        match self
            .ledger
            .mark_closed(position.id, fill.price, reason, closed_at, pnl)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(symbol = %position.symbol, "position already closed in ledger");
                return false;
            }
            Err(e) => {
                tracing::error!(symbol = %position.symbol, error = %e, "ledger close failed");
                self.last_error = Some(format!("ledger: {e}"));
                return false;
            }
        }

        tracing::info!(
            symbol = %position.symbol,
            reason = reason.as_str(),
            exit = %fill.price,
            pnl = %pnl,
            "position closed"
        );

        let mut closed = position.clone();
        closed.status = PositionStatus::Closed;
        closed.closed_at = Some(closed_at);
        closed.exit_price = Some(fill.price);
        closed.close_reason = Some(reason);
        closed.realized_pnl = Some(pnl);
        self.send_notification(&Notification::PositionClosed { position: closed })
            .await;
        true
    }

    async fn snapshot(&self) -> TraderStatus {
        let open_positions = self.ledger.open_positions().await.unwrap_or_default();
        TraderStatus {
            open_count: open_positions.len(),
            open_positions,
            capacity: self.capacity,
            last_error: self.last_error.clone(),
        }
    }

    fn record_rejection(&mut self, symbol: &str, reason: String) -> OpenOutcome {
        tracing::warn!(%symbol, %reason, "open rejected");
        self.last_error = Some(reason.clone());
        OpenOutcome::Rejected(reason)
    }

    async fn send_notification(&self, notification: &Notification) {
        if let Err(e) = self.notifier.notify(notification).await {
            tracing::warn!(error = %e, "notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::TraderHandle;
    use crate::notify::LogNotifier;
    use quorum_core::risk::EntryPlan;
    use quorum_core::types::{ConsensusDecision, Side, Signal};
    use quorum_exchange::StaticGateway;
    use rust_decimal_macros::dec;

    async fn spawn_manager(capacity: usize) -> (TraderHandle, Arc<StaticGateway>, Ledger) {
        let gateway = Arc::new(StaticGateway::new());
        let ledger = Ledger::new_in_memory().await.unwrap();
        let (tx, rx) = mpsc::channel(16);
        let manager = PositionManager::new(
            rx,
            gateway.clone(),
            ledger.clone(),
            Arc::new(LogNotifier),
            capacity,
        );
        tokio::spawn(manager.run());
        (TraderHandle::new(tx), gateway, ledger)
    }

    fn buy_request(symbol: &str) -> OpenRequest {
        OpenRequest {
            decision: ConsensusDecision {
                symbol: symbol.to_string(),
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
        }
    }

    #[tokio::test]
    async fn capacity_is_enforced_at_the_boundary() {
        let (handle, gateway, _ledger) = spawn_manager(2).await;
        for symbol in ["BTCUSDT", "ETHUSDT", "SOLUSDT"] {
            gateway.set_price(symbol, dec!(20000)).await;
        }

        assert!(matches!(
            handle.try_open(buy_request("BTCUSDT")).await.unwrap(),
            OpenOutcome::Opened(_)
        ));
        assert!(matches!(
            handle.try_open(buy_request("ETHUSDT")).await.unwrap(),
            OpenOutcome::Opened(_)
        ));
        assert!(matches!(
            handle.try_open(buy_request("SOLUSDT")).await.unwrap(),
            OpenOutcome::AtCapacity
        ));

        let status = handle.snapshot().await.unwrap();
        assert_eq!(status.open_count, 2);
        assert_eq!(status.capacity, 2);
    }

    #[tokio::test]
    async fn one_position_per_symbol() {
        let (handle, gateway, _ledger) = spawn_manager(3).await;
        gateway.set_price("BTCUSDT", dec!(20000)).await;

        assert!(matches!(
            handle.try_open(buy_request("BTCUSDT")).await.unwrap(),
            OpenOutcome::Opened(_)
        ));
        assert!(matches!(
            handle.try_open(buy_request("BTCUSDT")).await.unwrap(),
            OpenOutcome::AlreadyOpen
        ));
        assert_eq!(gateway.orders().await.len(), 1);
    }

    #[tokio::test]
    async fn rejected_order_leaves_the_book_unchanged() {
        let (handle, gateway, ledger) = spawn_manager(3).await;
        gateway.set_price("BTCUSDT", dec!(20000)).await;
        gateway.reject_orders(true).await;

        let outcome = handle.try_open(buy_request("BTCUSDT")).await.unwrap();
        assert!(matches!(outcome, OpenOutcome::Rejected(_)));
        assert_eq!(ledger.open_count().await.unwrap(), 0);

        let status = handle.snapshot().await.unwrap();
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn take_profit_touch_closes_with_profit() {
        let (handle, gateway, ledger) = spawn_manager(3).await;
        gateway.set_price("BTCUSDT", dec!(20000)).await;

        let OpenOutcome::Opened(position) = handle.try_open(buy_request("BTCUSDT")).await.unwrap()
        else {
            panic!("expected open");
        };

        // Mark inside the levels: nothing happens.
        assert_eq!(
            handle.sync_exits(vec![(position.id, dec!(20100))]).await.unwrap(),
            0
        );

        // Mark at the target: close at the current market price.
        gateway.set_price("BTCUSDT", dec!(20800)).await;
        assert_eq!(
            handle.sync_exits(vec![(position.id, dec!(20800))]).await.unwrap(),
            1
        );

        let closed = ledger.all_closed().await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].close_reason, Some(CloseReason::TakeProfit));
        assert_eq!(closed[0].realized_pnl, Some(dec!(40.00)));
        assert_eq!(ledger.open_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stop_touch_wins_over_target_on_the_same_mark() {
        let (handle, gateway, ledger) = spawn_manager(3).await;
        gateway.set_price("ETHUSDT", dec!(1500)).await;

        let mut request = buy_request("ETHUSDT");
        request.plan.entry_price = dec!(1500);
        request.plan.stop_loss = dec!(1600);
        request.plan.take_profit = dec!(1550);
        // Degenerate levels where one mark satisfies both; the stop must win.
        let OpenOutcome::Opened(position) = handle.try_open(request).await.unwrap() else {
            panic!("expected open");
        };

        gateway.set_price("ETHUSDT", dec!(1580)).await;
        assert_eq!(
            handle.sync_exits(vec![(position.id, dec!(1580))]).await.unwrap(),
            1
        );
        let closed = ledger.all_closed().await.unwrap();
        assert_eq!(closed[0].close_reason, Some(CloseReason::StopLoss));
    }

    #[tokio::test]
    async fn stop_all_closes_everything_once() {
        let (handle, gateway, ledger) = spawn_manager(3).await;
        gateway.set_price("BTCUSDT", dec!(20000)).await;
        gateway.set_price("ETHUSDT", dec!(1500)).await;

        handle.try_open(buy_request("BTCUSDT")).await.unwrap();
        handle.try_open(buy_request("ETHUSDT")).await.unwrap();

        assert_eq!(handle.stop_all().await.unwrap(), 2);
        // Repeat invocation is a no-op, not an error.
        assert_eq!(handle.stop_all().await.unwrap(), 0);

        let closed = ledger.all_closed().await.unwrap();
        assert_eq!(closed.len(), 2);
        assert!(closed
            .iter()
            .all(|p| p.close_reason == Some(CloseReason::ManualStop)));
        assert_eq!(ledger.open_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_close_keeps_the_position_open_for_retry() {
        let (handle, gateway, ledger) = spawn_manager(3).await;
        gateway.set_price("BTCUSDT", dec!(20000)).await;

        let OpenOutcome::Opened(position) = handle.try_open(buy_request("BTCUSDT")).await.unwrap()
        else {
            panic!("expected open");
        };

        gateway.reject_orders(true).await;
        assert_eq!(
            handle.sync_exits(vec![(position.id, dec!(19000))]).await.unwrap(),
            0
        );
        assert_eq!(ledger.open_count().await.unwrap(), 1);

        // The next tick succeeds once the exchange recovers.
        gateway.reject_orders(false).await;
        gateway.set_price("BTCUSDT", dec!(19000)).await;
        assert_eq!(
            handle.sync_exits(vec![(position.id, dec!(19000))]).await.unwrap(),
            1
        );
        let closed = ledger.all_closed().await.unwrap();
        assert_eq!(closed[0].close_reason, Some(CloseReason::StopLoss));
    }
}

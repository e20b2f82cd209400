//! Outbound notifications: opened, closed, periodic report.
//!
//! Delivery is strictly best-effort. The manager logs a failed send and
//! moves on; a dead webhook must never stall the book.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use quorum_core::types::{ConsensusDecision, Position};
use quorum_ledger::TradeStats;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub enum Notification {
    PositionOpened {
        position: Position,
        decision: ConsensusDecision,
        reward_risk: Decimal,
    },
    PositionClosed {
        position: Position,
    },
    Report {
        date: NaiveDate,
        today: TradeStats,
        all_time: TradeStats,
        open: Vec<Position>,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Errors
    /// Returns an error if delivery fails; callers log and continue.
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Renders a notification as the text block sent to the webhook and the
/// log line body.
#[must_use]
pub fn render(notification: &Notification) -> String {
    match notification {
        Notification::PositionOpened {
            position,
            decision,
            reward_risk,
        } => {
            let stars = "★".repeat(usize::from(position.stars));
            let mut text = format!(
                "OPENED {} {} qty {} @ {}\n{} confidence {:.0}% | R:R {:.1}\nSL {} | TP {}",
                position.side.as_str(),
                position.symbol,
                position.quantity,
                position.entry_price,
                stars,
                decision.confidence * 100.0,
                reward_risk,
                position.stop_loss,
                position.take_profit,
            );
            for line in &decision.breakdown {
                text.push_str(&format!(
                    "\n  {}: {} {} ({:.2})",
                    line.strategy.as_str(),
                    line.signal.as_str(),
                    line.strength.as_str(),
                    line.weighted_score,
                ));
            }
            text
        }
        Notification::PositionClosed { position } => {
            let reason = position
                .close_reason
                .map_or("UNKNOWN", |reason| reason.as_str());
            let pnl = position.realized_pnl.unwrap_or_default();
            let exit = position.exit_price.unwrap_or_default();
            format!(
                "CLOSED {} {} @ {} [{reason}] P&L {pnl}",
                position.side.as_str(),
                position.symbol,
                exit,
            )
        }
        Notification::Report {
            date,
            today,
            all_time,
            open,
        } => {
            let mut text = format!(
                "Report {date}\nToday: {} trades, {} wins / {} losses, P&L {}\nAll time: {} trades, win rate {:.0}%, P&L {}",
                today.trades,
                today.wins,
                today.losses,
                today.total_pnl,
                all_time.trades,
                all_time.win_rate * 100.0,
                all_time.total_pnl,
            );
            if open.is_empty() {
                text.push_str("\nNo open positions");
            } else {
                for position in open {
                    text.push_str(&format!(
                        "\nOpen: {} {} @ {} (SL {}, TP {})",
                        position.side.as_str(),
                        position.symbol,
                        position.entry_price,
                        position.stop_loss,
                        position.take_profit,
                    ));
                }
            }
            text
        }
    }
}

/// Posts rendered notifications to a webhook as a JSON `content` payload.
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    #[must_use]
    pub fn new(url: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let body = serde_json::json!({ "content": render(notification) });
        let response = self.http_client.post(&self.url).json(&body).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("webhook returned {}", response.status());
        }
        Ok(())
    }
}

/// Fallback notifier: everything lands in the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::info!("{}", render(notification));
        Ok(())
    }
}

//! The periodic report cycle.

use crate::handle::TraderHandle;
use crate::notify::{Notification, Notifier};
use chrono::Utc;
use quorum_ledger::Ledger;
use std::sync::Arc;

/// Assembles and sends one report: today's aggregates, all-time
/// aggregates, and a snapshot of the open book. Statistics are computed
/// from ledger rows each time; nothing is cached between reports.
pub async fn report_once(ledger: &Ledger, handle: &TraderHandle, notifier: &Arc<dyn Notifier>) {
    let date = Utc::now().date_naive();

    let today = match ledger.daily_stats(date).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!(error = %e, "daily stats failed, skipping report");
            return;
        }
    };
    let all_time = match ledger.all_time_stats().await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!(error = %e, "all-time stats failed, skipping report");
            return;
        }
    };
    let open = match handle.snapshot().await {
        Ok(status) => status.open_positions,
        Err(e) => {
            tracing::error!(error = %e, "manager unavailable, skipping report");
            return;
        }
    };

    tracing::info!(
        %date,
        today_trades = today.trades,
        today_pnl = %today.total_pnl,
        all_time_trades = all_time.trades,
        open = open.len(),
        "report assembled"
    );

    if let Err(e) = notifier
        .notify(&Notification::Report {
            date,
            today,
            all_time,
            open,
        })
        .await
    {
        tracing::warn!(error = %e, "report notification failed");
    }
}

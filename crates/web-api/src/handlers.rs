use crate::server::ApiState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use quorum_ledger::TradeStats;
use quorum_trader::TraderStatus;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct StopAllResponse {
    pub closed: usize,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub date: chrono::NaiveDate,
    pub today: TradeStats,
    pub all_time: TradeStats,
}

/// Current book: open positions, capacity, last error.
///
/// # Errors
/// Returns `StatusCode::SERVICE_UNAVAILABLE` if the manager has shut down.
pub async fn get_status(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<TraderStatus>, StatusCode> {
    let status = state
        .handle
        .snapshot()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(status))
}

/// Emergency stop: closes every open position at market. Idempotent;
/// a second call reports zero closed.
///
/// # Errors
/// Returns `StatusCode::SERVICE_UNAVAILABLE` if the manager has shut down.
pub async fn stop_all(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<StopAllResponse>, StatusCode> {
    tracing::warn!("manual stop requested via API");
    let closed = state
        .handle
        .stop_all()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(StopAllResponse { closed }))
}

/// On-demand performance report for today plus all time.
///
/// # Errors
/// Returns `StatusCode::INTERNAL_SERVER_ERROR` if the ledger query fails.
pub async fn get_report(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ReportResponse>, StatusCode> {
    let date = Utc::now().date_naive();
    let today = state
        .ledger
        .daily_stats(date)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let all_time = state
        .ledger
        .all_time_stats()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(ReportResponse {
        date,
        today,
        all_time,
    }))
}

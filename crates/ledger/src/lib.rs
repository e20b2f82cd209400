//! SQLite-backed position ledger.

mod stats;

pub use stats::TradeStats;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use quorum_core::types::{CloseReason, Position, PositionStatus, Side};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use uuid::Uuid;

type PositionRow = (
    String,         // id
    String,         // symbol
    String,         // side
    String,         // entry_price
    String,         // quantity
    String,         // stop_loss
    String,         // take_profit
    i64,            // stars
    i64,            // opened_at
    Option<i64>,    // closed_at
    Option<String>, // exit_price
    Option<String>, // close_reason
    Option<String>, // realized_pnl
    String,         // status
);

const SELECT_COLUMNS: &str = "id, symbol, side, entry_price, quantity, stop_loss, take_profit, \
     stars, opened_at, closed_at, exit_price, close_reason, realized_pnl, status";

/// Connection-pooled handle to the positions table. Cheap to clone.
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Connects to the database and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .with_context(|| format!("connecting to {database_url}"))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// In-memory ledger for tests and throwaway paper runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn new_in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Records a freshly opened position.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including on a duplicate id.
    pub async fn insert_open(&self, position: &Position) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO positions (
                id, symbol, side, entry_price, quantity, stop_loss, take_profit,
                stars, opened_at, status
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'OPEN')
            ",
        )
        .bind(position.id.to_string())
        .bind(&position.symbol)
        .bind(position.side.as_str())
        .bind(position.entry_price.to_string())
        .bind(position.quantity.to_string())
        .bind(position.stop_loss.to_string())
        .bind(position.take_profit.to_string())
        .bind(i64::from(position.stars))
        .bind(position.opened_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Marks an open position closed. Returns false when the row was
    /// already closed (or missing), which makes repeated close attempts
    /// harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_closed(
        &self,
        id: Uuid,
        exit_price: Decimal,
        reason: CloseReason,
        closed_at: DateTime<Utc>,
        realized_pnl: Decimal,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE positions
            SET status = 'CLOSED', exit_price = ?2, close_reason = ?3,
                closed_at = ?4, realized_pnl = ?5
            WHERE id = ?1 AND status = 'OPEN'
            ",
        )
        .bind(id.to_string())
        .bind(exit_price.to_string())
        .bind(reason.as_str())
        .bind(closed_at.timestamp())
        .bind(realized_pnl.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All currently open positions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or row decoding fails.
    pub async fn open_positions(&self) -> Result<Vec<Position>> {
        let rows = sqlx::query_as::<_, PositionRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM positions WHERE status = 'OPEN' ORDER BY opened_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_position).collect()
    }

    /// The open position for a symbol, if any. Uniqueness is enforced at
    /// the manager boundary, so at most one row matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or row decoding fails.
    pub async fn open_position_for(&self, symbol: &str) -> Result<Option<Position>> {
        let row = sqlx::query_as::<_, PositionRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM positions WHERE status = 'OPEN' AND symbol = ?1"
        ))
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_position).transpose()
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn open_count(&self) -> Result<usize> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM positions WHERE status = 'OPEN'")
                .fetch_one(&self.pool)
                .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Positions closed in `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or row decoding fails.
    pub async fn closed_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Position>> {
        let rows = sqlx::query_as::<_, PositionRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM positions \
             WHERE status = 'CLOSED' AND closed_at >= ?1 AND closed_at < ?2 \
             ORDER BY closed_at"
        ))
        .bind(start.timestamp())
        .bind(end.timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_position).collect()
    }

    /// Every closed position, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or row decoding fails.
    pub async fn all_closed(&self) -> Result<Vec<Position>> {
        let rows = sqlx::query_as::<_, PositionRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM positions WHERE status = 'CLOSED' ORDER BY closed_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_position).collect()
    }

    /// Statistics over positions closed on the given UTC date.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or row decoding fails.
    pub async fn daily_stats(&self, date: NaiveDate) -> Result<TradeStats> {
        let start = Utc
            .from_utc_datetime(&date.and_hms_opt(0, 0, 0).context("invalid date")?);
        let end = start + chrono::Duration::days(1);
        let closed = self.closed_between(start, end).await?;
        Ok(TradeStats::from_positions(&closed))
    }

    /// Statistics over the whole ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or row decoding fails.
    pub async fn all_time_stats(&self) -> Result<TradeStats> {
        let closed = self.all_closed().await?;
        Ok(TradeStats::from_positions(&closed))
    }
}

fn parse_decimal(raw: &str, field: &str) -> Result<Decimal> {
    Decimal::from_str(raw).with_context(|| format!("ledger column {field} = {raw}"))
}

fn parse_timestamp(secs: i64, field: &str) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .with_context(|| format!("ledger column {field} = {secs}"))
}

fn row_to_position(row: &PositionRow) -> Result<Position> {
    let (
        id,
        symbol,
        side,
        entry_price,
        quantity,
        stop_loss,
        take_profit,
        stars,
        opened_at,
        closed_at,
        exit_price,
        close_reason,
        realized_pnl,
        status,
    ) = row;

    Ok(Position {
        id: Uuid::parse_str(id).with_context(|| format!("ledger column id = {id}"))?,
        symbol: symbol.clone(),
        side: Side::parse(side).with_context(|| format!("ledger column side = {side}"))?,
        entry_price: parse_decimal(entry_price, "entry_price")?,
        quantity: parse_decimal(quantity, "quantity")?,
        stop_loss: parse_decimal(stop_loss, "stop_loss")?,
        take_profit: parse_decimal(take_profit, "take_profit")?,
        stars: u8::try_from(*stars).with_context(|| format!("ledger column stars = {stars}"))?,
        opened_at: parse_timestamp(*opened_at, "opened_at")?,
        closed_at: closed_at
            .map(|secs| parse_timestamp(secs, "closed_at"))
            .transpose()?,
        exit_price: exit_price
            .as_deref()
            .map(|raw| parse_decimal(raw, "exit_price"))
            .transpose()?,
        close_reason: close_reason
            .as_deref()
            .map(|raw| {
                CloseReason::parse(raw)
                    .with_context(|| format!("ledger column close_reason = {raw}"))
            })
            .transpose()?,
        realized_pnl: realized_pnl
            .as_deref()
            .map(|raw| parse_decimal(raw, "realized_pnl"))
            .transpose()?,
        status: PositionStatus::parse(status)
            .with_context(|| format!("ledger column status = {status}"))?,
    })
}

//! The exchange seam: everything upstream of the decision loop talks
//! through this trait, which is what lets paper mode and tests swap in
//! without touching the loop.

use async_trait::async_trait;
use quorum_core::types::{Candle, Horizon, Side};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The exchange understood the request and said no. Not retryable.
    #[error("order rejected by exchange: {0}")]
    Rejected(String),
    /// Network-level failure. The next cycle retries naturally.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response arrived but did not parse as expected.
    #[error("malformed exchange response: {0}")]
    Malformed(String),
}

/// Result of a filled market order.
#[derive(Debug, Clone, Copy)]
pub struct OrderFill {
    pub price: Decimal,
    pub quantity: Decimal,
}

#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Most recent `limit` candles at the given horizon, oldest first.
    async fn get_candles(
        &self,
        symbol: &str,
        horizon: Horizon,
        limit: usize,
    ) -> Result<Vec<Candle>, GatewayError>;

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, GatewayError>;

    /// Available quote-currency balance.
    async fn get_account_balance(&self) -> Result<Decimal, GatewayError>;

    /// Opens a position with a market order.
    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderFill, GatewayError>;

    /// Closes an existing position with a reduce-only market order.
    /// `side` is the side of the position being closed, not of the order.
    async fn close_position(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderFill, GatewayError>;
}

//! Paper execution: real market data, simulated fills.

use crate::gateway::{ExchangeGateway, GatewayError, OrderFill};
use async_trait::async_trait;
use quorum_core::types::{Candle, Horizon, Side};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Wraps a data-bearing gateway and fills every order at the current
/// market price. Nothing ever reaches the real account.
pub struct PaperExecution<G> {
    inner: G,
    balance: Decimal,
}

impl<G> PaperExecution<G> {
    pub fn new(inner: G, starting_balance: Decimal) -> Self {
        Self {
            inner,
            balance: starting_balance,
        }
    }
}

#[async_trait]
impl<G: ExchangeGateway> ExchangeGateway for PaperExecution<G> {
    async fn get_candles(
        &self,
        symbol: &str,
        horizon: Horizon,
        limit: usize,
    ) -> Result<Vec<Candle>, GatewayError> {
        self.inner.get_candles(symbol, horizon, limit).await
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        self.inner.get_current_price(symbol).await
    }

    async fn get_account_balance(&self) -> Result<Decimal, GatewayError> {
        Ok(self.balance)
    }

    async fn place_order(
        &self,
        symbol: &str,
        _side: Side,
        quantity: Decimal,
    ) -> Result<OrderFill, GatewayError> {
        if quantity <= Decimal::ZERO {
            return Err(GatewayError::Rejected(format!(
                "quantity {quantity} below exchange minimum"
            )));
        }
        let price = self.inner.get_current_price(symbol).await?;
        Ok(OrderFill { price, quantity })
    }

    async fn close_position(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderFill, GatewayError> {
        self.place_order(symbol, side, quantity).await
    }
}

/// Record of one simulated order, kept for assertions.
#[derive(Debug, Clone)]
pub struct RecordedOrder {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub reduce: bool,
}

/// In-memory gateway with preset prices and candles. The test double for
/// everything above the exchange seam.
#[derive(Default)]
pub struct StaticGateway {
    prices: RwLock<HashMap<String, Decimal>>,
    candles: RwLock<HashMap<(String, Horizon), Vec<Candle>>>,
    orders: RwLock<Vec<RecordedOrder>>,
    balance: RwLock<Decimal>,
    reject_orders: RwLock<bool>,
}

impl StaticGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.write().await.insert(symbol.to_string(), price);
    }

    pub async fn set_candles(&self, symbol: &str, horizon: Horizon, candles: Vec<Candle>) {
        self.candles
            .write()
            .await
            .insert((symbol.to_string(), horizon), candles);
    }

    pub async fn set_balance(&self, balance: Decimal) {
        *self.balance.write().await = balance;
    }

    /// When set, every order comes back `Rejected`.
    pub async fn reject_orders(&self, reject: bool) {
        *self.reject_orders.write().await = reject;
    }

    pub async fn orders(&self) -> Vec<RecordedOrder> {
        self.orders.read().await.clone()
    }

    async fn record(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        reduce: bool,
    ) -> Result<OrderFill, GatewayError> {
        if *self.reject_orders.read().await {
            return Err(GatewayError::Rejected("rejected by test harness".to_string()));
        }
        let price = self.get_current_price(symbol).await?;
        self.orders.write().await.push(RecordedOrder {
            symbol: symbol.to_string(),
            side,
            quantity,
            reduce,
        });
        Ok(OrderFill { price, quantity })
    }
}

#[async_trait]
impl ExchangeGateway for StaticGateway {
    async fn get_candles(
        &self,
        symbol: &str,
        horizon: Horizon,
        _limit: usize,
    ) -> Result<Vec<Candle>, GatewayError> {
        Ok(self
            .candles
            .read()
            .await
            .get(&(symbol.to_string(), horizon))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        self.prices
            .read()
            .await
            .get(symbol)
            .copied()
            .ok_or_else(|| GatewayError::Malformed(format!("no price set for {symbol}")))
    }

    async fn get_account_balance(&self) -> Result<Decimal, GatewayError> {
        Ok(*self.balance.read().await)
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderFill, GatewayError> {
        self.record(symbol, side, quantity, false).await
    }

    async fn close_position(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderFill, GatewayError> {
        self.record(symbol, side, quantity, true).await
    }
}

//! Binance USD-M futures REST gateway.

use crate::gateway::{ExchangeGateway, GatewayError, OrderFill};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use hmac::{Hmac, Mac};
use quorum_core::types::{Candle, Horizon, Side};
use reqwest::Client;
use rust_decimal::Decimal;
use sha2::Sha256;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;
type DirectLimiter = RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>;

const RECV_WINDOW_MS: u32 = 5000;

struct Credentials {
    api_key: String,
    api_secret: String,
}

pub struct BinanceFuturesGateway {
    http_client: Client,
    base_url: String,
    credentials: Option<Credentials>,
    rate_limiter: Arc<DirectLimiter>,
}

impl BinanceFuturesGateway {
    /// Unauthenticated gateway: market data only. Signed calls fail with
    /// `Rejected`, which paper mode never issues.
    #[must_use]
    pub fn public(base_url: String) -> Self {
        Self::build(base_url, None)
    }

    #[must_use]
    pub fn signed(base_url: String, api_key: String, api_secret: String) -> Self {
        Self::build(base_url, Some(Credentials { api_key, api_secret }))
    }

    fn build(base_url: String, credentials: Option<Credentials>) -> Self {
        // Binance allows 2400 request weight per minute; 10/s stays far
        // under it even with multi-horizon candle fetches.
        let quota = Quota::per_second(NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN));
        Self {
            http_client: Client::new(),
            base_url,
            credentials,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn get_public(&self, endpoint: &str, query: &str) -> Result<serde_json::Value, GatewayError> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}?{}", self.base_url, endpoint, query);
        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Malformed(format!("{endpoint}: {body}")));
        }
        Ok(response.json().await?)
    }

    fn sign(&self, query: &str) -> Result<(String, &str), GatewayError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| GatewayError::Rejected("signed endpoint requires credentials".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(credentials.api_secret.as_bytes())
            .map_err(|e| GatewayError::Malformed(format!("invalid API secret: {e}")))?;
        mac.update(query.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok((
            format!("{query}&signature={signature}"),
            credentials.api_key.as_str(),
        ))
    }

    async fn get_signed(&self, endpoint: &str, query: &str) -> Result<serde_json::Value, GatewayError> {
        self.rate_limiter.until_ready().await;
        let query = format!(
            "{query}&recvWindow={RECV_WINDOW_MS}&timestamp={}",
            Utc::now().timestamp_millis()
        );
        let (signed_query, api_key) = self.sign(&query)?;
        let url = format!("{}{}?{}", self.base_url, endpoint, signed_query);
        let response = self
            .http_client
            .get(&url)
            .header("X-MBX-APIKEY", api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Malformed(format!("{endpoint}: {body}")));
        }
        Ok(response.json().await?)
    }

    async fn post_signed(&self, endpoint: &str, query: &str) -> Result<serde_json::Value, GatewayError> {
        self.rate_limiter.until_ready().await;
        let query = format!(
            "{query}&recvWindow={RECV_WINDOW_MS}&timestamp={}",
            Utc::now().timestamp_millis()
        );
        let (signed_query, api_key) = self.sign(&query)?;
        let url = format!("{}{}?{}", self.base_url, endpoint, signed_query);
        let response = self
            .http_client
            .post(&url)
            .header("X-MBX-APIKEY", api_key)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            // Binance encodes rejections (bad quantity, filters, margin)
            // as 4xx with a JSON error body.
            return Err(GatewayError::Rejected(body));
        }
        if !status.is_success() {
            return Err(GatewayError::Malformed(format!("{endpoint}: {body}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| GatewayError::Malformed(format!("{endpoint}: {e}")))
    }

    async fn market_order(
        &self,
        symbol: &str,
        order_side: &str,
        quantity: Decimal,
        reduce_only: bool,
    ) -> Result<OrderFill, GatewayError> {
        if quantity <= Decimal::ZERO {
            return Err(GatewayError::Rejected(format!(
                "quantity {quantity} below exchange minimum"
            )));
        }

        let mut query = format!(
            "symbol={symbol}&side={order_side}&type=MARKET&quantity={quantity}&newOrderRespType=RESULT"
        );
        if reduce_only {
            query.push_str("&reduceOnly=true");
        }

        let json = self.post_signed("/fapi/v1/order", &query).await?;
        let status = json_str(&json, "status")?;
        if status != "FILLED" && status != "PARTIALLY_FILLED" {
            return Err(GatewayError::Rejected(format!("order status {status}")));
        }

        Ok(OrderFill {
            price: json_decimal(&json, "avgPrice")?,
            quantity: json_decimal(&json, "executedQty")?,
        })
    }
}

fn json_str<'a>(value: &'a serde_json::Value, field: &str) -> Result<&'a str, GatewayError> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::Malformed(format!("missing field {field}")))
}

fn json_decimal(value: &serde_json::Value, field: &str) -> Result<Decimal, GatewayError> {
    let raw = json_str(value, field)?;
    Decimal::from_str(raw).map_err(|e| GatewayError::Malformed(format!("{field} = {raw}: {e}")))
}

fn parse_kline(row: &serde_json::Value) -> Result<Candle, GatewayError> {
    let fields = row
        .as_array()
        .ok_or_else(|| GatewayError::Malformed("kline row is not an array".to_string()))?;
    if fields.len() < 6 {
        return Err(GatewayError::Malformed("kline row too short".to_string()));
    }

    let open_millis = fields[0]
        .as_i64()
        .ok_or_else(|| GatewayError::Malformed("kline open time is not an integer".to_string()))?;
    let open_time = Utc
        .timestamp_millis_opt(open_millis)
        .single()
        .ok_or_else(|| GatewayError::Malformed(format!("kline open time {open_millis}")))?;

    let decimal_at = |index: usize, name: &str| -> Result<Decimal, GatewayError> {
        let raw = fields[index]
            .as_str()
            .ok_or_else(|| GatewayError::Malformed(format!("kline {name} is not a string")))?;
        Decimal::from_str(raw).map_err(|e| GatewayError::Malformed(format!("kline {name}: {e}")))
    };

    Ok(Candle {
        open_time,
        open: decimal_at(1, "open")?,
        high: decimal_at(2, "high")?,
        low: decimal_at(3, "low")?,
        close: decimal_at(4, "close")?,
        volume: decimal_at(5, "volume")?,
    })
}

#[async_trait]
impl ExchangeGateway for BinanceFuturesGateway {
    async fn get_candles(
        &self,
        symbol: &str,
        horizon: Horizon,
        limit: usize,
    ) -> Result<Vec<Candle>, GatewayError> {
        let query = format!(
            "symbol={symbol}&interval={}&limit={limit}",
            horizon.interval()
        );
        let json = self.get_public("/fapi/v1/klines", &query).await?;
        let rows = json
            .as_array()
            .ok_or_else(|| GatewayError::Malformed("klines response is not an array".to_string()))?;
        rows.iter().map(parse_kline).collect()
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        let json = self
            .get_public("/fapi/v1/ticker/price", &format!("symbol={symbol}"))
            .await?;
        json_decimal(&json, "price")
    }

    async fn get_account_balance(&self) -> Result<Decimal, GatewayError> {
        let json = self.get_signed("/fapi/v2/balance", "").await?;
        let entries = json
            .as_array()
            .ok_or_else(|| GatewayError::Malformed("balance response is not an array".to_string()))?;
        for entry in entries {
            if entry.get("asset").and_then(|v| v.as_str()) == Some("USDT") {
                return json_decimal(entry, "availableBalance");
            }
        }
        Err(GatewayError::Malformed("no USDT balance entry".to_string()))
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderFill, GatewayError> {
        let order_side = match side {
            Side::Long => "BUY",
            Side::Short => "SELL",
        };
        self.market_order(symbol, order_side, quantity, false).await
    }

    async fn close_position(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderFill, GatewayError> {
        let order_side = match side {
            Side::Long => "SELL",
            Side::Short => "BUY",
        };
        self.market_order(symbol, order_side, quantity, true).await
    }
}

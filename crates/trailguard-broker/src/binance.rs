//! Binance USD-M futures gateway with HMAC request signing.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use trailguard_core::error::GatewayError;
use trailguard_core::traits::BrokerGateway;
use trailguard_core::types::{
    MarginMode, OrderRequest, OrderResult, OrderStatus, Position, Side, Venue,
};

use crate::http::{transport_error, REQUEST_TIMEOUT_SECS};

type HmacSha256 = Hmac<Sha256>;

/// Cancel/status lookups need the symbol alongside the venue order id, so
/// gateway order ids are encoded as `SYMBOL:id`.
const ORDER_ID_SEP: char = ':';

/// Binance error code for cancelling an order that no longer exists.
const ERR_UNKNOWN_ORDER: i64 = -2011;
/// Binance error code for setting a margin type that is already set.
const ERR_NO_NEED_TO_CHANGE_MARGIN: i64 = -4046;

/// Binance API configuration.
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub api_key: String,
    pub api_secret: String,
}

impl BinanceConfig {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
        }
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        let api_key = std::env::var("BINANCE_API_KEY")
            .map_err(|_| GatewayError::Configuration("BINANCE_API_KEY not set".into()))?;
        let api_secret = std::env::var("BINANCE_SECRET_KEY")
            .map_err(|_| GatewayError::Configuration("BINANCE_SECRET_KEY not set".into()))?;
        Ok(Self {
            api_key,
            api_secret,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceOrder {
    order_id: i64,
    status: String,
}

#[derive(Debug, Deserialize)]
struct BinanceError {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinancePositionRisk {
    symbol: String,
    position_amt: String,
    entry_price: String,
    mark_price: String,
    leverage: String,
}

/// Binance futures gateway client.
pub struct BinanceGateway {
    config: BinanceConfig,
    client: Client,
    base_url: String,
}

impl BinanceGateway {
    pub fn new(config: BinanceConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;

        Ok(Self {
            config,
            client,
            base_url: "https://fapi.binance.com".into(),
        })
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        Self::new(BinanceConfig::from_env()?)
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn timestamp_ms() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    }

    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signed_query(&self, params: &[(&str, String)]) -> String {
        let mut query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!("timestamp={}", Self::timestamp_ms()));
        let signature = self.sign(&query);
        format!("{query}&signature={signature}")
    }

    async fn send_signed(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<(reqwest::StatusCode, String), GatewayError> {
        let url = format!("{}{}?{}", self.base_url, endpoint, self.signed_query(params));
        let resp = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Ok((status, body))
    }

    fn map_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
        if let Ok(err) = serde_json::from_str::<BinanceError>(body) {
            return match err.code {
                -1003 => GatewayError::RateLimited { retry_after_secs: 1 },
                _ => GatewayError::Rejected(format!("{}: {}", err.code, err.msg)),
            };
        }
        crate::http::status_error(status, body.to_string())
    }

    fn parse_status(status: &str) -> OrderStatus {
        match status {
            "NEW" => OrderStatus::Accepted,
            "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
            "FILLED" => OrderStatus::Filled,
            "CANCELED" => OrderStatus::Canceled,
            "REJECTED" => OrderStatus::Rejected,
            "EXPIRED" => OrderStatus::Expired,
            _ => OrderStatus::Submitted,
        }
    }

    fn split_order_id(order_id: &str) -> Result<(&str, &str), GatewayError> {
        order_id.split_once(ORDER_ID_SEP).ok_or_else(|| {
            GatewayError::Configuration(format!("malformed binance order id: {order_id}"))
        })
    }

    async fn set_leverage(&self, symbol: &str, leverage: Decimal) -> Result<(), GatewayError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("leverage", leverage.trunc().to_string()),
        ];
        let (status, body) = self
            .send_signed(reqwest::Method::POST, "/fapi/v1/leverage", &params)
            .await?;
        if !status.is_success() {
            return Err(Self::map_error(status, &body));
        }
        Ok(())
    }

    async fn set_margin_mode(&self, symbol: &str, mode: MarginMode) -> Result<(), GatewayError> {
        let margin_type = match mode {
            MarginMode::Isolated => "ISOLATED",
            MarginMode::Cross => "CROSSED",
        };
        let params = [
            ("symbol", symbol.to_string()),
            ("marginType", margin_type.to_string()),
        ];
        let (status, body) = self
            .send_signed(reqwest::Method::POST, "/fapi/v1/marginType", &params)
            .await?;
        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<BinanceError>(&body) {
                if err.code == ERR_NO_NEED_TO_CHANGE_MARGIN {
                    return Ok(());
                }
            }
            return Err(Self::map_error(status, &body));
        }
        Ok(())
    }

    /// Contingent close order (stop-loss or take-profit leg).
    async fn place_protective_leg(
        &self,
        symbol: &str,
        side: Side,
        order_type: &str,
        stop_price: Decimal,
    ) -> Result<(), GatewayError> {
        let params = [
            ("symbol", symbol.to_string()),
            (
                "side",
                match side {
                    Side::Buy => "BUY".to_string(),
                    Side::Sell => "SELL".to_string(),
                },
            ),
            ("type", order_type.to_string()),
            ("stopPrice", stop_price.to_string()),
            ("closePosition", "true".to_string()),
        ];
        let (status, body) = self
            .send_signed(reqwest::Method::POST, "/fapi/v1/order", &params)
            .await?;
        if !status.is_success() {
            // The entry is already live; a failed protective leg must be
            // surfaced but should not be mistaken for a failed entry.
            warn!("Binance protective leg {order_type} failed for {symbol}: {body}");
            return Err(Self::map_error(status, &body));
        }
        Ok(())
    }

    fn parse_position(&self, p: BinancePositionRisk) -> Option<Position> {
        let amount: Decimal = p.position_amt.parse().unwrap_or(Decimal::ZERO);
        if amount.is_zero() {
            return None;
        }
        let side = if amount > Decimal::ZERO {
            Side::Buy
        } else {
            Side::Sell
        };
        let entry_price: Decimal = p.entry_price.parse().unwrap_or(Decimal::ZERO);
        let mark_price: Decimal = p.mark_price.parse().unwrap_or(entry_price);
        let leverage: Decimal = p.leverage.parse().unwrap_or(Decimal::ONE);

        let mut position =
            Position::new(p.symbol, Venue::Binance, side, amount.abs(), entry_price)
                .with_leverage(leverage);
        position.mark_price = mark_price;
        Some(position)
    }
}

#[async_trait]
impl BrokerGateway for BinanceGateway {
    async fn place_order(&self, request: OrderRequest) -> Result<OrderResult, GatewayError> {
        if let Some(leverage) = request.leverage {
            self.set_leverage(&request.symbol, leverage).await?;
        }
        if let Some(mode) = request.margin_mode {
            self.set_margin_mode(&request.symbol, mode).await?;
        }

        let params = [
            ("symbol", request.symbol.clone()),
            (
                "side",
                match request.side {
                    Side::Buy => "BUY".to_string(),
                    Side::Sell => "SELL".to_string(),
                },
            ),
            ("type", "MARKET".to_string()),
            ("quantity", request.quantity.to_string()),
        ];

        debug!("Submitting Binance order: {params:?}");

        let (status, body) = self
            .send_signed(reqwest::Method::POST, "/fapi/v1/order", &params)
            .await?;
        if !status.is_success() {
            return Err(Self::map_error(status, &body));
        }

        let order: BinanceOrder = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;

        info!(
            "Binance order submitted: {} {} {} ({})",
            request.side, request.quantity, request.symbol, order.order_id
        );

        // Protective legs ride as reduce-only contingent orders; the exit
        // side is the opposite of the entry.
        let exit_side = request.side.opposite();
        if let Some(stop_loss) = request.stop_loss {
            self.place_protective_leg(&request.symbol, exit_side, "STOP_MARKET", stop_loss)
                .await?;
        }
        if let Some(take_profit) = request.take_profit {
            self.place_protective_leg(
                &request.symbol,
                exit_side,
                "TAKE_PROFIT_MARKET",
                take_profit,
            )
            .await?;
        }

        Ok(OrderResult {
            order_id: format!("{}{}{}", request.symbol, ORDER_ID_SEP, order.order_id),
            status: Self::parse_status(&order.status),
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), GatewayError> {
        let (symbol, id) = Self::split_order_id(order_id)?;
        let params = [
            ("symbol", symbol.to_string()),
            ("orderId", id.to_string()),
        ];
        let (status, body) = self
            .send_signed(reqwest::Method::DELETE, "/fapi/v1/order", &params)
            .await?;
        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<BinanceError>(&body) {
                if err.code == ERR_UNKNOWN_ORDER {
                    // Already filled or cancelled: idempotent success.
                    return Ok(());
                }
            }
            return Err(Self::map_error(status, &body));
        }
        info!("Binance order cancelled: {order_id}");
        Ok(())
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatus, GatewayError> {
        let (symbol, id) = Self::split_order_id(order_id)?;
        let params = [
            ("symbol", symbol.to_string()),
            ("orderId", id.to_string()),
        ];
        let (status, body) = self
            .send_signed(reqwest::Method::GET, "/fapi/v1/order", &params)
            .await?;
        if !status.is_success() {
            return Err(Self::map_error(status, &body));
        }
        let order: BinanceOrder = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;
        Ok(Self::parse_status(&order.status))
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, GatewayError> {
        let params = [("symbol", symbol.to_string())];
        let (status, body) = self
            .send_signed(reqwest::Method::GET, "/fapi/v2/positionRisk", &params)
            .await?;
        if !status.is_success() {
            return Err(Self::map_error(status, &body));
        }
        let positions: Vec<BinancePositionRisk> = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;
        Ok(positions
            .into_iter()
            .find_map(|p| self.parse_position(p)))
    }

    async fn get_all_positions(&self) -> Result<Vec<Position>, GatewayError> {
        let (status, body) = self
            .send_signed(reqwest::Method::GET, "/fapi/v2/positionRisk", &[])
            .await?;
        if !status.is_success() {
            return Err(Self::map_error(status, &body));
        }
        let positions: Vec<BinancePositionRisk> = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;
        Ok(positions
            .into_iter()
            .filter_map(|p| self.parse_position(p))
            .collect())
    }

    fn venue(&self) -> Venue {
        Venue::Binance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gateway() -> BinanceGateway {
        BinanceGateway::new(BinanceConfig::new("key".into(), "secret".into()))
            .unwrap()
            .with_base_url("http://127.0.0.1:1")
    }

    #[test]
    fn test_signature_is_deterministic() {
        let gateway = gateway();
        let first = gateway.sign("symbol=BTCUSDT&timestamp=1000");
        let second = gateway.sign("symbol=BTCUSDT&timestamp=1000");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64); // hex-encoded SHA-256
    }

    #[test]
    fn test_order_id_round_trip() {
        let (symbol, id) = BinanceGateway::split_order_id("BTCUSDT:12345").unwrap();
        assert_eq!(symbol, "BTCUSDT");
        assert_eq!(id, "12345");

        assert!(BinanceGateway::split_order_id("12345").is_err());
    }

    #[test]
    fn test_unknown_order_code_maps_to_rejected() {
        let err = BinanceGateway::map_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"code":-2019,"msg":"Margin is insufficient."}"#,
        );
        assert!(matches!(err, GatewayError::Rejected(_)));
    }

    #[test]
    fn test_parse_position_sides() {
        let gateway = gateway();
        let long = gateway
            .parse_position(BinancePositionRisk {
                symbol: "BTCUSDT".into(),
                position_amt: "0.5".into(),
                entry_price: "30000".into(),
                mark_price: "30500".into(),
                leverage: "5".into(),
            })
            .unwrap();
        assert_eq!(long.side, Side::Buy);
        assert_eq!(long.leverage, dec!(5));
        assert_eq!(long.mark_price, dec!(30500));

        let flat = gateway.parse_position(BinancePositionRisk {
            symbol: "BTCUSDT".into(),
            position_amt: "0".into(),
            entry_price: "0".into(),
            mark_price: "0".into(),
            leverage: "1".into(),
        });
        assert!(flat.is_none());
    }
}

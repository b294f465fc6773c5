//! Alpaca gateway for paper and live trading.

use async_trait::async_trait;
use reqwest::{header, Client};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use trailguard_core::error::GatewayError;
use trailguard_core::traits::BrokerGateway;
use trailguard_core::types::{OrderRequest, OrderResult, OrderStatus, Position, Side, Venue};

use crate::http::{status_error, transport_error, REQUEST_TIMEOUT_SECS};

/// Alpaca API configuration.
#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    pub api_key: String,
    pub api_secret: String,
    pub paper: bool,
}

impl AlpacaConfig {
    pub fn new(api_key: String, api_secret: String, paper: bool) -> Self {
        Self {
            api_key,
            api_secret,
            paper,
        }
    }

    /// Load from environment variables.
    pub fn from_env() -> Result<Self, GatewayError> {
        let api_key = std::env::var("ALPACA_API_KEY")
            .map_err(|_| GatewayError::Configuration("ALPACA_API_KEY not set".into()))?;
        let api_secret = std::env::var("ALPACA_API_SECRET")
            .map_err(|_| GatewayError::Configuration("ALPACA_API_SECRET not set".into()))?;
        let paper = std::env::var("ALPACA_PAPER")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Ok(Self {
            api_key,
            api_secret,
            paper,
        })
    }

    pub fn base_url(&self) -> &str {
        if self.paper {
            "https://paper-api.alpaca.markets"
        } else {
            "https://api.alpaca.markets"
        }
    }
}

#[derive(Debug, Serialize)]
struct BracketLeg {
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_price: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    symbol: String,
    qty: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    time_in_force: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_loss: Option<BracketLeg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    take_profit: Option<BracketLeg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trail_percent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaOrder {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct AlpacaPosition {
    symbol: String,
    qty: String,
    side: String,
    avg_entry_price: String,
    current_price: String,
}

/// Alpaca gateway client.
pub struct AlpacaGateway {
    config: AlpacaConfig,
    client: Client,
}

impl AlpacaGateway {
    pub fn new(config: AlpacaConfig) -> Result<Self, GatewayError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            header::HeaderValue::from_str(&config.api_key)
                .map_err(|e| GatewayError::Configuration(e.to_string()))?,
        );
        headers.insert(
            "APCA-API-SECRET-KEY",
            header::HeaderValue::from_str(&config.api_secret)
                .map_err(|e| GatewayError::Configuration(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        Self::new(AlpacaConfig::from_env()?)
    }

    fn parse_status(status: &str) -> OrderStatus {
        match status {
            "new" | "pending_new" => OrderStatus::Submitted,
            "accepted" => OrderStatus::Accepted,
            "partially_filled" => OrderStatus::PartiallyFilled,
            "filled" => OrderStatus::Filled,
            "canceled" | "pending_cancel" | "done_for_day" => OrderStatus::Canceled,
            "rejected" => OrderStatus::Rejected,
            "expired" => OrderStatus::Expired,
            _ => OrderStatus::Submitted,
        }
    }

    fn parse_position(&self, p: AlpacaPosition) -> Position {
        let side = if p.side == "short" {
            Side::Sell
        } else {
            Side::Buy
        };
        let quantity: Decimal = p.qty.parse().unwrap_or(Decimal::ZERO).abs();
        let entry_price: Decimal = p.avg_entry_price.parse().unwrap_or(Decimal::ZERO);
        let mark_price: Decimal = p.current_price.parse().unwrap_or(entry_price);

        let mut position = Position::new(p.symbol, Venue::Alpaca, side, quantity, entry_price);
        position.mark_price = mark_price;
        position
    }
}

#[async_trait]
impl BrokerGateway for AlpacaGateway {
    async fn place_order(&self, request: OrderRequest) -> Result<OrderResult, GatewayError> {
        let url = format!("{}/v2/orders", self.config.base_url());

        let has_bracket = request.stop_loss.is_some() || request.take_profit.is_some();
        let trailing_only = request.trailing_stop.is_some() && !has_bracket;

        let create_req = CreateOrderRequest {
            symbol: request.symbol.clone(),
            qty: request.quantity.to_string(),
            side: match request.side {
                Side::Buy => "buy".into(),
                Side::Sell => "sell".into(),
            },
            order_type: if trailing_only {
                "trailing_stop".into()
            } else {
                "market".into()
            },
            time_in_force: "gtc".into(),
            order_class: has_bracket.then(|| "bracket".into()),
            stop_loss: request.stop_loss.map(|price| BracketLeg {
                stop_price: Some(price.to_string()),
                limit_price: None,
            }),
            take_profit: request.take_profit.map(|price| BracketLeg {
                stop_price: None,
                limit_price: Some(price.to_string()),
            }),
            trail_percent: trailing_only.then(|| {
                // Option checked just above.
                request.trailing_stop.unwrap_or_default().to_string()
            }),
        };

        debug!("Submitting Alpaca order: {:?}", create_req);

        let resp = self
            .client
            .post(&url)
            .json(&create_req)
            .send()
            .await
            .map_err(transport_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let order: AlpacaOrder = resp
            .json()
            .await
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;

        info!(
            "Alpaca order submitted: {} {} {} ({})",
            request.side, request.quantity, request.symbol, order.id
        );

        Ok(OrderResult {
            order_id: order.id,
            status: Self::parse_status(&order.status),
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), GatewayError> {
        let url = format!("{}/v2/orders/{}", self.config.base_url(), order_id);
        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(transport_error)?;

        // 404: unknown/already gone; 422: already in a terminal state.
        // Both count as cancelled for the idempotency contract.
        let status = resp.status();
        if status.is_success() || status.as_u16() == 404 || status.as_u16() == 422 {
            info!("Alpaca order cancelled: {order_id}");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatus, GatewayError> {
        let url = format!("{}/v2/orders/{}", self.config.base_url(), order_id);
        let resp = self.client.get(&url).send().await.map_err(transport_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let order: AlpacaOrder = resp
            .json()
            .await
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;
        Ok(Self::parse_status(&order.status))
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, GatewayError> {
        let url = format!("{}/v2/positions/{}", self.config.base_url(), symbol);
        let resp = self.client.get(&url).send().await.map_err(transport_error)?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let position: AlpacaPosition = resp
            .json()
            .await
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;
        Ok(Some(self.parse_position(position)))
    }

    async fn get_all_positions(&self) -> Result<Vec<Position>, GatewayError> {
        let url = format!("{}/v2/positions", self.config.base_url());
        let resp = self.client.get(&url).send().await.map_err(transport_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let positions: Vec<AlpacaPosition> = resp
            .json()
            .await
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;
        Ok(positions
            .into_iter()
            .map(|p| self.parse_position(p))
            .collect())
    }

    fn venue(&self) -> Venue {
        Venue::Alpaca
    }
}

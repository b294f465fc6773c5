//! OANDA v20 REST gateway for forex instruments.

use async_trait::async_trait;
use reqwest::{header, Client};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use trailguard_core::error::GatewayError;
use trailguard_core::traits::BrokerGateway;
use trailguard_core::types::{OrderRequest, OrderResult, OrderStatus, Position, Side, Venue};

use crate::http::{status_error, transport_error, REQUEST_TIMEOUT_SECS};

/// OANDA API configuration.
#[derive(Debug, Clone)]
pub struct OandaConfig {
    pub api_key: String,
    pub account_id: String,
    pub practice: bool,
}

impl OandaConfig {
    pub fn new(api_key: String, account_id: String, practice: bool) -> Self {
        Self {
            api_key,
            account_id,
            practice,
        }
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        let api_key = std::env::var("OANDA_API_KEY")
            .map_err(|_| GatewayError::Configuration("OANDA_API_KEY not set".into()))?;
        let account_id = std::env::var("OANDA_ACCOUNT_ID")
            .map_err(|_| GatewayError::Configuration("OANDA_ACCOUNT_ID not set".into()))?;
        let practice = std::env::var("OANDA_MODE")
            .map(|v| v != "live")
            .unwrap_or(true);

        Ok(Self {
            api_key,
            account_id,
            practice,
        })
    }

    pub fn base_url(&self) -> &str {
        if self.practice {
            "https://api-fxpractice.oanda.com/v3"
        } else {
            "https://api-fxtrade.oanda.com/v3"
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OandaTransaction {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OandaOrderResponse {
    order_create_transaction: Option<OandaTransaction>,
    order_fill_transaction: Option<OandaTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OandaOrderDetail {
    state: String,
}

#[derive(Debug, Deserialize)]
struct OandaOrderStatusResponse {
    order: OandaOrderDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OandaPositionSide {
    units: String,
    average_price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OandaPosition {
    instrument: String,
    long: OandaPositionSide,
    short: OandaPositionSide,
}

#[derive(Debug, Deserialize)]
struct OandaPositionResponse {
    position: OandaPosition,
}

#[derive(Debug, Deserialize)]
struct OandaOpenPositionsResponse {
    positions: Vec<OandaPosition>,
}

#[derive(Debug, Deserialize)]
struct OandaQuote {
    price: String,
}

#[derive(Debug, Deserialize)]
struct OandaClientPrice {
    instrument: String,
    #[serde(default)]
    bids: Vec<OandaQuote>,
    #[serde(default)]
    asks: Vec<OandaQuote>,
}

#[derive(Debug, Deserialize)]
struct OandaPricingResponse {
    prices: Vec<OandaClientPrice>,
}

/// Midpoint of the best bid and ask, or whichever side is quoted.
fn mid_price(price: &OandaClientPrice) -> Option<Decimal> {
    let bid = price.bids.first().and_then(|q| q.price.parse::<Decimal>().ok());
    let ask = price.asks.first().and_then(|q| q.price.parse::<Decimal>().ok());
    match (bid, ask) {
        (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
        (bid, ask) => bid.or(ask),
    }
}

fn apply_quote(position: &mut Position, quotes: &HashMap<String, Decimal>) {
    if let Some(mid) = quotes.get(&position.symbol) {
        position.mark_price = *mid;
    }
}

/// OANDA gateway client.
pub struct OandaGateway {
    config: OandaConfig,
    client: Client,
}

impl OandaGateway {
    pub fn new(config: OandaConfig) -> Result<Self, GatewayError> {
        let mut headers = header::HeaderMap::new();
        let bearer = format!("Bearer {}", config.api_key);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&bearer)
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
        Self::new(OandaConfig::from_env()?)
    }

    fn orders_url(&self) -> String {
        format!(
            "{}/accounts/{}/orders",
            self.config.base_url(),
            self.config.account_id
        )
    }

    /// Current mid quotes for a comma-separated instrument list.
    async fn fetch_quotes(
        &self,
        instruments: &str,
    ) -> Result<HashMap<String, Decimal>, GatewayError> {
        let url = format!(
            "{}/accounts/{}/pricing?instruments={}",
            self.config.base_url(),
            self.config.account_id,
            instruments
        );
        let resp = self.client.get(&url).send().await.map_err(transport_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let parsed: OandaPricingResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;

        Ok(parsed
            .prices
            .iter()
            .filter_map(|p| mid_price(p).map(|mid| (p.instrument.clone(), mid)))
            .collect())
    }

    fn parse_position(&self, p: OandaPosition) -> Option<Position> {
        let long_units: Decimal = p.long.units.parse().unwrap_or(Decimal::ZERO);
        let short_units: Decimal = p.short.units.parse().unwrap_or(Decimal::ZERO);

        let (side, units, avg) = if !long_units.is_zero() {
            (Side::Buy, long_units, p.long.average_price)
        } else if !short_units.is_zero() {
            (Side::Sell, short_units.abs(), p.short.average_price)
        } else {
            return None;
        };

        let entry_price: Decimal = avg
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Decimal::ZERO);

        // The mark starts at the entry; `apply_quote` re-marks it from the
        // pricing endpoint.
        Some(Position::new(
            p.instrument,
            Venue::Oanda,
            side,
            units,
            entry_price,
        ))
    }
}

#[async_trait]
impl BrokerGateway for OandaGateway {
    async fn place_order(&self, request: OrderRequest) -> Result<OrderResult, GatewayError> {
        let units = match request.side {
            Side::Buy => request.quantity,
            Side::Sell => -request.quantity,
        };

        let mut order = serde_json::json!({
            "type": "MARKET",
            "instrument": request.symbol,
            "units": units.to_string(),
            "timeInForce": "FOK",
            "positionFill": "DEFAULT",
        });
        if let Some(price) = request.stop_loss {
            order["stopLossOnFill"] = serde_json::json!({ "price": price.to_string() });
        }
        if let Some(price) = request.take_profit {
            order["takeProfitOnFill"] = serde_json::json!({ "price": price.to_string() });
        }
        if let Some(distance) = request.trailing_stop {
            order["trailingStopLossOnFill"] =
                serde_json::json!({ "distance": distance.to_string() });
        }

        debug!("Submitting OANDA order: {order}");

        let resp = self
            .client
            .post(self.orders_url())
            .json(&serde_json::json!({ "order": order }))
            .send()
            .await
            .map_err(transport_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let parsed: OandaOrderResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;

        let filled = parsed.order_fill_transaction.is_some();
        let order_id = parsed
            .order_create_transaction
            .or(parsed.order_fill_transaction)
            .map(|tx| tx.id)
            .ok_or_else(|| GatewayError::Api {
                status: 200,
                body: "order response carried no transaction id".into(),
            })?;

        info!(
            "OANDA order submitted: {} {} {} ({order_id})",
            request.side, request.quantity, request.symbol
        );

        Ok(OrderResult {
            order_id,
            status: if filled {
                OrderStatus::Filled
            } else {
                OrderStatus::Accepted
            },
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), GatewayError> {
        let url = format!("{}/{}/cancel", self.orders_url(), order_id);
        let resp = self.client.put(&url).send().await.map_err(transport_error)?;

        // Unknown or already-terminal orders count as cancelled.
        let status = resp.status();
        if status.is_success() || status.as_u16() == 404 {
            info!("OANDA order cancelled: {order_id}");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatus, GatewayError> {
        let url = format!("{}/{}", self.orders_url(), order_id);
        let resp = self.client.get(&url).send().await.map_err(transport_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let parsed: OandaOrderStatusResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;

        Ok(match parsed.order.state.as_str() {
            "PENDING" => OrderStatus::Accepted,
            "FILLED" | "TRIGGERED" => OrderStatus::Filled,
            "CANCELLED" => OrderStatus::Canceled,
            _ => OrderStatus::Submitted,
        })
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, GatewayError> {
        let url = format!(
            "{}/accounts/{}/positions/{}",
            self.config.base_url(),
            self.config.account_id,
            symbol
        );
        let resp = self.client.get(&url).send().await.map_err(transport_error)?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let parsed: OandaPositionResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;

        let mut position = match self.parse_position(parsed.position) {
            Some(position) => position,
            None => return Ok(None),
        };
        let quotes = self.fetch_quotes(&position.symbol).await?;
        apply_quote(&mut position, &quotes);
        Ok(Some(position))
    }

    async fn get_all_positions(&self) -> Result<Vec<Position>, GatewayError> {
        let url = format!(
            "{}/accounts/{}/openPositions",
            self.config.base_url(),
            self.config.account_id
        );
        let resp = self.client.get(&url).send().await.map_err(transport_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let parsed: OandaOpenPositionsResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Api { status: 200, body: e.to_string() })?;

        let mut positions: Vec<Position> = parsed
            .positions
            .into_iter()
            .filter_map(|p| self.parse_position(p))
            .collect();
        if !positions.is_empty() {
            let instruments = positions
                .iter()
                .map(|p| p.symbol.as_str())
                .collect::<Vec<_>>()
                .join(",");
            let quotes = self.fetch_quotes(&instruments).await?;
            for position in &mut positions {
                apply_quote(position, &quotes);
            }
        }
        Ok(positions)
    }

    fn venue(&self) -> Venue {
        Venue::Oanda
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gateway() -> OandaGateway {
        OandaGateway::new(OandaConfig::new("key".into(), "acct".into(), true)).unwrap()
    }

    #[test]
    fn test_parse_position_long() {
        let position = gateway()
            .parse_position(OandaPosition {
                instrument: "EUR_USD".into(),
                long: OandaPositionSide {
                    units: "1000".into(),
                    average_price: Some("1.0850".into()),
                },
                short: OandaPositionSide {
                    units: "0".into(),
                    average_price: None,
                },
            })
            .unwrap();

        assert_eq!(position.side, Side::Buy);
        assert_eq!(position.quantity, dec!(1000));
        assert_eq!(position.entry_price, dec!(1.0850));
    }

    #[test]
    fn test_parse_position_flat() {
        let flat = gateway().parse_position(OandaPosition {
            instrument: "EUR_USD".into(),
            long: OandaPositionSide {
                units: "0".into(),
                average_price: None,
            },
            short: OandaPositionSide {
                units: "0".into(),
                average_price: None,
            },
        });
        assert!(flat.is_none());
    }

    #[test]
    fn test_mid_price_from_pricing_payload() {
        let parsed: OandaPricingResponse = serde_json::from_str(
            r#"{"prices":[{"instrument":"EUR_USD","bids":[{"price":"1.0848"}],"asks":[{"price":"1.0852"}]}]}"#,
        )
        .unwrap();
        assert_eq!(mid_price(&parsed.prices[0]), Some(dec!(1.0850)));
    }

    #[test]
    fn test_mid_price_one_sided_book() {
        let parsed: OandaPricingResponse = serde_json::from_str(
            r#"{"prices":[{"instrument":"EUR_USD","bids":[{"price":"1.0848"}]}]}"#,
        )
        .unwrap();
        assert_eq!(mid_price(&parsed.prices[0]), Some(dec!(1.0848)));
    }

    #[test]
    fn test_live_quote_moves_mark_off_entry() {
        let mut position = gateway()
            .parse_position(OandaPosition {
                instrument: "EUR_USD".into(),
                long: OandaPositionSide {
                    units: "1000".into(),
                    average_price: Some("1.0850".into()),
                },
                short: OandaPositionSide {
                    units: "0".into(),
                    average_price: None,
                },
            })
            .unwrap();
        assert_eq!(position.mark_price, position.entry_price);

        let quotes = HashMap::from([("EUR_USD".to_string(), dec!(1.0912))]);
        apply_quote(&mut position, &quotes);
        assert_eq!(position.mark_price, dec!(1.0912));
        assert_ne!(position.mark_price, position.entry_price);
    }

    #[test]
    fn test_missing_quote_keeps_entry_mark() {
        let mut position = gateway()
            .parse_position(OandaPosition {
                instrument: "USD_JPY".into(),
                long: OandaPositionSide {
                    units: "100".into(),
                    average_price: Some("151.20".into()),
                },
                short: OandaPositionSide {
                    units: "0".into(),
                    average_price: None,
                },
            })
            .unwrap();

        apply_quote(&mut position, &HashMap::new());
        assert_eq!(position.mark_price, dec!(151.20));
    }

    #[test]
    fn test_parse_position_short_units_abs() {
        let position = gateway()
            .parse_position(OandaPosition {
                instrument: "USD_JPY".into(),
                long: OandaPositionSide {
                    units: "0".into(),
                    average_price: None,
                },
                short: OandaPositionSide {
                    units: "-500".into(),
                    average_price: Some("151.20".into()),
                },
            })
            .unwrap();

        assert_eq!(position.side, Side::Sell);
        assert_eq!(position.quantity, dec!(500));
    }
}

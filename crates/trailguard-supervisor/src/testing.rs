//! Test doubles shared by the supervisor and scheduler tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use trailguard_core::error::GatewayError;
use trailguard_core::traits::{AlertSink, BrokerGateway, Severity};
use trailguard_core::types::{OrderRequest, OrderResult, OrderStatus, Position, Venue};

/// Gateway that replays a scripted sequence of `get_position` responses and
/// records every order placed or cancelled. An exhausted script answers with
/// a transient network error.
pub struct ScriptedGateway {
    positions: Mutex<VecDeque<Result<Option<Position>, GatewayError>>>,
    placed: Mutex<Vec<OrderRequest>>,
    cancelled: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            positions: Mutex::new(VecDeque::new()),
            placed: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_position(&self, response: Result<Option<Position>, GatewayError>) {
        self.positions.lock().await.push_back(response);
    }

    pub async fn placed(&self) -> Vec<OrderRequest> {
        self.placed.lock().await.clone()
    }

    pub async fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().await.clone()
    }
}

#[async_trait]
impl BrokerGateway for ScriptedGateway {
    async fn place_order(&self, request: OrderRequest) -> Result<OrderResult, GatewayError> {
        let mut placed = self.placed.lock().await;
        placed.push(request);
        Ok(OrderResult {
            order_id: format!("close-{}", placed.len()),
            status: OrderStatus::Filled,
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), GatewayError> {
        self.cancelled.lock().await.push(order_id.to_string());
        Ok(())
    }

    async fn get_order_status(&self, _order_id: &str) -> Result<OrderStatus, GatewayError> {
        Ok(OrderStatus::Filled)
    }

    async fn get_position(&self, _symbol: &str) -> Result<Option<Position>, GatewayError> {
        self.positions
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Network("script exhausted".into())))
    }

    async fn get_all_positions(&self) -> Result<Vec<Position>, GatewayError> {
        Ok(Vec::new())
    }

    fn venue(&self) -> Venue {
        Venue::Binance
    }
}

/// Alert sink that records every notification.
pub struct RecordingAlerts {
    alerts: Mutex<Vec<(String, Severity)>>,
}

impl RecordingAlerts {
    pub fn new() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
        }
    }

    pub async fn recorded(&self) -> Vec<(String, Severity)> {
        self.alerts.lock().await.clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn notify(&self, message: &str, severity: Severity, _symbol: Option<&str>) {
        self.alerts.lock().await.push((message.to_string(), severity));
    }
}

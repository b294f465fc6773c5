//! In-memory gateway for dry runs and tests.
//!
//! Orders fill instantly at the last set price. Opposite-side orders net
//! against the open position the way a one-way futures account would.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use trailguard_core::error::GatewayError;
use trailguard_core::traits::BrokerGateway;
use trailguard_core::types::{OrderRequest, OrderResult, OrderStatus, Position, Side, Venue};
use uuid::Uuid;

#[derive(Debug, Default)]
struct PaperBook {
    prices: HashMap<String, Decimal>,
    positions: HashMap<String, Position>,
    orders: HashMap<String, OrderStatus>,
}

/// Simulated gateway holding its book in memory.
pub struct PaperGateway {
    venue: Venue,
    book: RwLock<PaperBook>,
}

impl PaperGateway {
    pub fn new(venue: Venue) -> Self {
        Self {
            venue,
            book: RwLock::new(PaperBook::default()),
        }
    }

    /// Set the simulated market price for a symbol. Open positions on the
    /// symbol are re-marked immediately.
    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        let mut book = self.book.write().await;
        book.prices.insert(symbol.to_string(), price);
        if let Some(position) = book.positions.get_mut(symbol) {
            position.mark_price = price;
        }
    }

    async fn price_of(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        self.book
            .read()
            .await
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| GatewayError::Rejected(format!("no market price for {symbol}")))
    }
}

#[async_trait]
impl BrokerGateway for PaperGateway {
    async fn place_order(&self, request: OrderRequest) -> Result<OrderResult, GatewayError> {
        if request.quantity <= Decimal::ZERO {
            return Err(GatewayError::Rejected(format!(
                "non-positive quantity {}",
                request.quantity
            )));
        }
        let fill_price = self.price_of(&request.symbol).await?;

        let mut book = self.book.write().await;
        match book.positions.get_mut(&request.symbol) {
            Some(open) if open.side == request.side.opposite() => {
                // Netting: reduce or flatten the existing position.
                if request.quantity >= open.quantity {
                    book.positions.remove(&request.symbol);
                } else {
                    open.quantity -= request.quantity;
                }
            }
            Some(open) => {
                // Same-side add at a blended entry.
                let total = open.quantity + request.quantity;
                open.entry_price = (open.entry_price * open.quantity
                    + fill_price * request.quantity)
                    / total;
                open.quantity = total;
                open.mark_price = fill_price;
            }
            None => {
                let mut position = Position::new(
                    request.symbol.clone(),
                    self.venue,
                    request.side,
                    request.quantity,
                    fill_price,
                );
                if let Some(leverage) = request.leverage {
                    position.leverage = leverage;
                }
                book.positions.insert(request.symbol.clone(), position);
            }
        }

        let order_id = Uuid::new_v4().to_string();
        book.orders.insert(order_id.clone(), OrderStatus::Filled);

        info!(
            "Paper fill: {} {} {} @ {fill_price}",
            request.side, request.quantity, request.symbol
        );

        Ok(OrderResult {
            order_id,
            status: OrderStatus::Filled,
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), GatewayError> {
        let mut book = self.book.write().await;
        // Filled and unknown orders both count as already handled.
        if let Some(status) = book.orders.get_mut(order_id) {
            if status.is_active() {
                *status = OrderStatus::Canceled;
            }
        }
        Ok(())
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatus, GatewayError> {
        self.book
            .read()
            .await
            .orders
            .get(order_id)
            .copied()
            .ok_or_else(|| GatewayError::NotFound(order_id.to_string()))
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, GatewayError> {
        Ok(self.book.read().await.positions.get(symbol).cloned())
    }

    async fn get_all_positions(&self) -> Result<Vec<Position>, GatewayError> {
        Ok(self.book.read().await.positions.values().cloned().collect())
    }

    fn venue(&self) -> Venue {
        self.venue
    }
}

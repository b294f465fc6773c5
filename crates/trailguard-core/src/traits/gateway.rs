//! Broker gateway trait definition.

use crate::error::GatewayError;
use crate::types::{OrderRequest, OrderResult, OrderStatus, Position, Venue};
use async_trait::async_trait;

/// Uniform capability contract over one brokerage venue.
///
/// Variants differ only in wire encoding, never in the contract surface.
/// Every call crosses a network boundary; callers must apply timeouts and
/// retry transient failures with bounded backoff.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    /// Place an order.
    ///
    /// Fails with [`GatewayError::Rejected`] when the venue declines the
    /// order (insufficient margin, invalid symbol); not retried.
    async fn place_order(&self, request: OrderRequest) -> Result<OrderResult, GatewayError>;

    /// Cancel an order.
    ///
    /// Idempotent: cancelling an already closed or cancelled order returns
    /// `Ok(())`, not an error.
    async fn cancel_order(&self, order_id: &str) -> Result<(), GatewayError>;

    /// Get the status of an order.
    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatus, GatewayError>;

    /// Get the position for a symbol.
    ///
    /// `None` is a valid, non-error outcome: no open position.
    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, GatewayError>;

    /// Get all open positions. Used by bulk-close operations.
    async fn get_all_positions(&self) -> Result<Vec<Position>, GatewayError>;

    /// The venue this gateway talks to.
    fn venue(&self) -> Venue;
}

impl std::fmt::Debug for dyn BrokerGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerGateway")
            .field("venue", &self.venue())
            .finish()
    }
}

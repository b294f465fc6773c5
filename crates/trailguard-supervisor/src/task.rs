//! The per-position supervision task.
//!
//! One `Supervisor` owns one position from entry confirmation to close. It
//! walks INIT -> MONITORING -> CLOSING -> CLOSED, or ends in FAILED when the
//! position cannot be validated or the close cannot be executed.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use trailguard_core::error::GatewayError;
use trailguard_core::traits::{AlertSink, BrokerGateway, FeedbackOutcome, PersistenceStore, Severity};
use trailguard_core::types::{OrderRequest, Position, RiskLevels, Side, TaskSpec};
use trailguard_risk::{RiskEngine, StaticLevels};

use crate::retry::{with_retries, RetryPolicy};
use crate::state::{Phase, SupervisorState};

/// Result of one monitoring tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Position open, trigger not crossed.
    Continue,
    /// Trailing trigger crossed; close the position.
    Triggered,
    /// Position no longer exists at the venue.
    Flat,
}

/// Error escaping a supervisor run.
///
/// Any variant returned from [`Supervisor::run`] consumes one task-level
/// attempt; transient fetch failures during MONITORING are absorbed in the
/// loop and never reach here.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("transient gateway failure: {0}")]
    Transient(#[source] GatewayError),

    #[error("supervision failed: {0}")]
    Fatal(String),
}

impl From<GatewayError> for PollError {
    fn from(err: GatewayError) -> Self {
        if err.is_transient() {
            PollError::Transient(err)
        } else {
            PollError::Fatal(err.to_string())
        }
    }
}

/// Realized profit in percent of entry, sign adjusted for side.
pub fn realized_profit_pct(entry: Decimal, exit: Decimal, side: Side) -> Decimal {
    if entry.is_zero() {
        return Decimal::ZERO;
    }
    let raw = match side {
        Side::Buy => (exit - entry) / entry,
        Side::Sell => (entry - exit) / entry,
    };
    (raw * dec!(100)).round_dp(2)
}

/// Supervises one position until it is closed.
pub struct Supervisor {
    spec: TaskSpec,
    gateway: Arc<dyn BrokerGateway>,
    store: Arc<dyn PersistenceStore>,
    alerts: Arc<dyn AlertSink>,
    risk: RiskEngine,
    poll_interval: Duration,
    call_retry: RetryPolicy,
}

impl Supervisor {
    pub fn new(
        spec: TaskSpec,
        gateway: Arc<dyn BrokerGateway>,
        store: Arc<dyn PersistenceStore>,
        alerts: Arc<dyn AlertSink>,
        risk: RiskEngine,
        poll_interval: Duration,
    ) -> Self {
        Self {
            spec,
            gateway,
            store,
            alerts,
            risk,
            poll_interval,
            call_retry: RetryPolicy::default(),
        }
    }

    pub fn with_call_retry(mut self, policy: RetryPolicy) -> Self {
        self.call_retry = policy;
        self
    }

    /// Run the supervision loop to a terminal phase.
    ///
    /// `cancel` flips to `true` when an operator stops supervision; the loop
    /// observes it at every suspension point.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) -> Result<Phase, PollError> {
        let position = match self.fetch_position().await? {
            Some(position) => position,
            None => {
                warn!(
                    "{}: no open position for {} at {}; refusing to supervise",
                    self.spec.strategy_id, self.spec.symbol, self.spec.venue
                );
                self.alerts
                    .notify(
                        &format!(
                            "supervision aborted: no open position for {}",
                            self.spec.symbol
                        ),
                        Severity::Critical,
                        Some(&self.spec.symbol),
                    )
                    .await;
                return Ok(Phase::Failed);
            }
        };

        let mut state = SupervisorState::new(
            position.entry_price,
            self.spec.side,
            self.spec.trigger_pct,
        );
        let static_levels =
            self.risk
                .static_levels(position.entry_price, self.spec.side, None, position.leverage);
        state.begin_monitoring();

        info!(
            "{}: monitoring {} {} on {} (entry {}, trigger {}%)",
            self.spec.strategy_id,
            self.spec.side,
            self.spec.symbol,
            self.spec.venue,
            position.entry_price,
            self.spec.trigger_pct
        );

        let mut last_price = position.mark_price;
        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    match changed {
                        Ok(()) if *cancel.borrow() => {
                            return self.on_cancel(&mut state, position.entry_price, last_price).await;
                        }
                        Ok(()) => continue,
                        // Sender gone: nobody can cancel us any more.
                        Err(_) => tokio::time::sleep(self.poll_interval).await,
                    }
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            match self.poll(&mut state, &mut last_price).await {
                Ok(PollOutcome::Continue) => {}
                Ok(PollOutcome::Flat) => {
                    info!(
                        "{}: position {} closed externally",
                        self.spec.strategy_id, self.spec.symbol
                    );
                    return self
                        .finish_closed(
                            &mut state,
                            position.entry_price,
                            last_price,
                            "position closed externally",
                        )
                        .await;
                }
                Ok(PollOutcome::Triggered) => {
                    if state.try_begin_close() {
                        self.close_position().await?;
                        return self
                            .finish_closed(
                                &mut state,
                                position.entry_price,
                                last_price,
                                "trailing stop triggered",
                            )
                            .await;
                    }
                }
                Err(PollError::Transient(err)) => {
                    // Stay in MONITORING; the next tick tries again.
                    warn!(
                        "{}: poll failed for {}: {err}",
                        self.spec.strategy_id, self.spec.symbol
                    );
                }
                Err(fatal) => return Err(fatal),
            }

            // Trailing level survives restarts through the store; failures
            // here degrade durability, not supervision.
            if let Err(err) = self
                .persist_levels(&state, position.entry_price, &static_levels)
                .await
            {
                warn!(
                    "{}: failed to persist risk levels: {err}",
                    self.spec.strategy_id
                );
            }
        }
    }

    /// One monitoring tick: re-mark, ratchet, evaluate the trigger.
    async fn poll(
        &self,
        state: &mut SupervisorState,
        last_price: &mut Decimal,
    ) -> Result<PollOutcome, PollError> {
        let position = match self.gateway.get_position(&self.spec.symbol).await {
            Ok(Some(position)) => position,
            Ok(None) => return Ok(PollOutcome::Flat),
            Err(err) => return Err(err.into()),
        };

        let price = position.mark_price;
        *last_price = price;
        let stop = state.ratchet_mut().observe(price);
        debug!(
            "{}: {} @ {price}, trailing stop {stop}",
            self.spec.strategy_id, self.spec.symbol
        );

        if state.ratchet().is_triggered(price) {
            Ok(PollOutcome::Triggered)
        } else {
            Ok(PollOutcome::Continue)
        }
    }

    /// Cancel the resting entry order, then flatten with an opposite-side
    /// market order.
    async fn close_position(&self) -> Result<(), PollError> {
        with_retries(self.call_retry, "cancel entry order", || {
            self.gateway.cancel_order(&self.spec.entry_order_id)
        })
        .await
        .map_err(PollError::from)?;

        let close = OrderRequest::market(
            self.spec.symbol.clone(),
            self.spec.side.opposite(),
            self.spec.quantity,
        );
        let result = with_retries(self.call_retry, "place closing order", || {
            self.gateway.place_order(close.clone())
        })
        .await
        .map_err(PollError::from)?;

        info!(
            "{}: closing order {} submitted for {}",
            self.spec.strategy_id, result.order_id, self.spec.symbol
        );
        Ok(())
    }

    async fn on_cancel(
        &self,
        state: &mut SupervisorState,
        entry_price: Decimal,
        last_price: Decimal,
    ) -> Result<Phase, PollError> {
        info!(
            "{}: supervision cancelled for {}",
            self.spec.strategy_id, self.spec.symbol
        );
        match self.fetch_position().await? {
            None => {
                self.finish_closed(
                    state,
                    entry_price,
                    last_price,
                    "supervision cancelled; position flat",
                )
                .await
            }
            Some(position) => {
                self.alerts
                    .notify(
                        &format!(
                            "supervision cancelled with {} {} still open on {}",
                            position.quantity, position.symbol, position.venue
                        ),
                        Severity::Warning,
                        Some(&self.spec.symbol),
                    )
                    .await;
                state.finish(Phase::Failed);
                Ok(Phase::Failed)
            }
        }
    }

    async fn finish_closed(
        &self,
        state: &mut SupervisorState,
        entry_price: Decimal,
        exit_price: Decimal,
        reason: &str,
    ) -> Result<Phase, PollError> {
        let profit_pct = realized_profit_pct(entry_price, exit_price, self.spec.side);
        let rationale = format!(
            "{reason}; exit {exit_price}, realized {profit_pct}% on {}",
            self.spec.symbol
        );

        if let Err(err) = self
            .store
            .record_feedback(&self.spec.strategy_id, FeedbackOutcome::Success, &rationale)
            .await
        {
            warn!(
                "{}: failed to record feedback: {err}",
                self.spec.strategy_id
            );
        }

        self.alerts
            .notify(
                &format!("{}: {rationale}", self.spec.symbol),
                Severity::Info,
                Some(&self.spec.symbol),
            )
            .await;

        state.finish(Phase::Closed);
        Ok(Phase::Closed)
    }

    async fn persist_levels(
        &self,
        state: &SupervisorState,
        entry_price: Decimal,
        static_levels: &StaticLevels,
    ) -> Result<(), trailguard_core::error::StoreError> {
        let levels = RiskLevels {
            symbol: self.spec.symbol.clone(),
            entry_price,
            static_sl: static_levels.static_sl,
            static_tp: static_levels.static_tp,
            trailing_sl: state.ratchet().stop_level(),
            timestamp: Utc::now(),
            strategy_id: self.spec.strategy_id.clone(),
        };
        self.store.save_risk_levels(&levels).await
    }

    async fn fetch_position(&self) -> Result<Option<Position>, PollError> {
        self.gateway
            .get_position(&self.spec.symbol)
            .await
            .map_err(PollError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingAlerts, ScriptedGateway};
    use rust_decimal_macros::dec;
    use trailguard_core::types::{Side, Venue};
    use trailguard_risk::RiskConfig;
    use trailguard_store::MemoryStore;

    fn spec(side: Side) -> TaskSpec {
        TaskSpec::new("BTCUSDT", dec!(0.5), Venue::Binance, side, "entry-1", dec!(2))
            .with_strategy_id("strat-1")
    }

    fn supervisor(
        spec: TaskSpec,
        gateway: Arc<ScriptedGateway>,
        store: Arc<MemoryStore>,
        alerts: Arc<RecordingAlerts>,
    ) -> Supervisor {
        Supervisor::new(
            spec,
            gateway,
            store,
            alerts,
            RiskEngine::new(RiskConfig::default()),
            Duration::ZERO,
        )
        .with_call_retry(RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
        })
    }

    fn idle_cancel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    fn long_position(mark: Decimal) -> Position {
        let mut position =
            Position::new("BTCUSDT", Venue::Binance, Side::Buy, dec!(0.5), dec!(100));
        position.mark_price = mark;
        position
    }

    #[tokio::test]
    async fn test_trigger_closes_exactly_once() {
        let gateway = Arc::new(ScriptedGateway::new());
        // Init snapshot, a run-up, then a drop through the trailing stop.
        gateway.push_position(Ok(Some(long_position(dec!(100))))).await;
        gateway.push_position(Ok(Some(long_position(dec!(110))))).await;
        gateway.push_position(Ok(Some(long_position(dec!(107))))).await;

        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let task = supervisor(spec(Side::Buy), gateway.clone(), store.clone(), alerts.clone());

        let (_tx, rx) = idle_cancel();
        let phase = task.run(rx).await.unwrap();

        assert_eq!(phase, Phase::Closed);
        assert_eq!(gateway.cancelled().await, vec!["entry-1".to_string()]);
        let placed = gateway.placed().await;
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].side, Side::Sell);
        assert_eq!(placed[0].quantity, dec!(0.5));
    }

    #[tokio::test]
    async fn test_transient_fetch_failures_keep_monitoring() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_position(Ok(Some(long_position(dec!(100))))).await;
        gateway
            .push_position(Err(GatewayError::Network("reset".into())))
            .await;
        gateway
            .push_position(Err(GatewayError::Timeout("10s".into())))
            .await;
        // Still alive after two failed polls; then the trigger fires.
        gateway.push_position(Ok(Some(long_position(dec!(110))))).await;
        gateway.push_position(Ok(Some(long_position(dec!(90))))).await;

        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let task = supervisor(spec(Side::Buy), gateway.clone(), store.clone(), alerts.clone());

        let (_tx, rx) = idle_cancel();
        let phase = task.run(rx).await.unwrap();

        // The failures were absorbed inside MONITORING, not surfaced.
        assert_eq!(phase, Phase::Closed);
        assert_eq!(gateway.placed().await.len(), 1);
    }

    #[tokio::test]
    async fn test_absent_position_fails_with_alert() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_position(Ok(None)).await;

        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let task = supervisor(spec(Side::Buy), gateway.clone(), store.clone(), alerts.clone());

        let (_tx, rx) = idle_cancel();
        let phase = task.run(rx).await.unwrap();

        assert_eq!(phase, Phase::Failed);
        let alerts = alerts.recorded().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].1, Severity::Critical);
        // No orders were touched.
        assert!(gateway.placed().await.is_empty());
        assert!(gateway.cancelled().await.is_empty());
    }

    #[tokio::test]
    async fn test_external_close_ends_closed() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_position(Ok(Some(long_position(dec!(100))))).await;
        gateway.push_position(Ok(Some(long_position(dec!(102))))).await;
        gateway.push_position(Ok(None)).await;

        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let task = supervisor(spec(Side::Buy), gateway.clone(), store.clone(), alerts.clone());

        let (_tx, rx) = idle_cancel();
        let phase = task.run(rx).await.unwrap();

        assert_eq!(phase, Phase::Closed);
        // Nothing left to close, so no orders placed.
        assert!(gateway.placed().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_when_flat_ends_closed() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_position(Ok(Some(long_position(dec!(100))))).await;
        // Flatness confirmation after the cancel signal.
        gateway.push_position(Ok(None)).await;

        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let task = supervisor(spec(Side::Buy), gateway.clone(), store.clone(), alerts.clone());

        let (tx, rx) = idle_cancel();
        tx.send(true).unwrap();
        let phase = task.run(rx).await.unwrap();

        assert_eq!(phase, Phase::Closed);
    }

    #[tokio::test]
    async fn test_cancel_with_open_position_alerts() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_position(Ok(Some(long_position(dec!(100))))).await;
        gateway.push_position(Ok(Some(long_position(dec!(101))))).await;

        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let task = supervisor(spec(Side::Buy), gateway.clone(), store.clone(), alerts.clone());

        let (tx, rx) = idle_cancel();
        tx.send(true).unwrap();
        let phase = task.run(rx).await.unwrap();

        assert_eq!(phase, Phase::Failed);
        let recorded = alerts.recorded().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].1, Severity::Warning);
    }

    #[test]
    fn test_feedback_profit_pct_long() {
        assert_eq!(realized_profit_pct(dec!(100), dec!(110), Side::Buy), dec!(10));
        assert_eq!(realized_profit_pct(dec!(100), dec!(95), Side::Buy), dec!(-5));
    }

    #[test]
    fn test_feedback_profit_pct_short() {
        assert_eq!(realized_profit_pct(dec!(100), dec!(90), Side::Sell), dec!(10));
        assert_eq!(realized_profit_pct(dec!(100), dec!(103), Side::Sell), dec!(-3));
    }

    #[test]
    fn test_profit_pct_zero_entry() {
        assert_eq!(realized_profit_pct(dec!(0), dec!(10), Side::Buy), dec!(0));
    }
}

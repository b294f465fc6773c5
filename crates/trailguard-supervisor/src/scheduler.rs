//! Durable task queue, worker pool, and task-level retry.
//!
//! The store, not process memory, is the source of truth for which positions
//! need supervision: `schedule` persists the spec before enqueueing it, and
//! `recover` re-enqueues whatever the store still holds as pending.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{error, info, warn};
use trailguard_core::error::TrailguardError;
use trailguard_core::traits::{AlertSink, BrokerGateway, FeedbackOutcome, PersistenceStore, Severity};
use trailguard_core::types::{TaskSpec, Venue};
use trailguard_risk::{RiskConfig, RiskEngine};

use crate::task::Supervisor;

/// Scheduler tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// Monitoring poll cadence, in seconds.
    pub poll_interval_secs: u64,
    /// Task-level attempts before a position is abandoned.
    pub max_attempts: u32,
    /// Delay between task-level attempts, in seconds.
    pub retry_delay_secs: u64,
    /// Worker pool size.
    pub workers: usize,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15,
            max_attempts: 3,
            retry_delay_secs: 30,
            workers: 4,
        }
    }
}

/// Handle to a scheduled supervision task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub strategy_id: String,
    pub symbol: String,
}

type CancelMap = Arc<Mutex<HashMap<String, watch::Sender<bool>>>>;

/// Schedules supervisor tasks onto a shared worker pool.
pub struct Scheduler {
    gateways: HashMap<Venue, Arc<dyn BrokerGateway>>,
    store: Arc<dyn PersistenceStore>,
    tx: mpsc::Sender<TaskSpec>,
    cancels: CancelMap,
    settings: SupervisorSettings,
}

impl Scheduler {
    pub fn new(
        gateways: HashMap<Venue, Arc<dyn BrokerGateway>>,
        store: Arc<dyn PersistenceStore>,
        alerts: Arc<dyn AlertSink>,
        risk_config: RiskConfig,
        settings: SupervisorSettings,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<TaskSpec>(256);
        let rx = Arc::new(Mutex::new(rx));
        let cancels: CancelMap = Arc::new(Mutex::new(HashMap::new()));

        for worker_id in 0..settings.workers.max(1) {
            let rx = rx.clone();
            let deps = WorkerDeps {
                gateways: gateways.clone(),
                store: store.clone(),
                alerts: alerts.clone(),
                risk_config: risk_config.clone(),
                cancels: cancels.clone(),
                settings: settings.clone(),
            };
            tokio::spawn(async move {
                worker_loop(worker_id, rx, deps).await;
            });
        }

        Self {
            gateways,
            store,
            tx,
            cancels,
            settings,
        }
    }

    /// Persist and enqueue a supervision task.
    ///
    /// Call only after the entry order is confirmed. Fails fast when the
    /// task names a venue no gateway was registered for.
    pub async fn schedule(&self, spec: TaskSpec) -> Result<TaskHandle, TrailguardError> {
        if !self.gateways.contains_key(&spec.venue) {
            return Err(TrailguardError::Config(format!(
                "no gateway configured for venue {}",
                spec.venue
            )));
        }

        self.store.put_task(&spec).await?;
        let handle = TaskHandle {
            strategy_id: spec.strategy_id.clone(),
            symbol: spec.symbol.clone(),
        };
        self.tx
            .send(spec)
            .await
            .map_err(|_| TrailguardError::Internal("supervisor worker pool is down".into()))?;

        info!(
            "scheduled supervision of {} ({})",
            handle.symbol, handle.strategy_id
        );
        Ok(handle)
    }

    /// Re-enqueue every task the store still holds as pending. Returns how
    /// many were resumed.
    pub async fn recover(&self) -> Result<usize, TrailguardError> {
        let pending = self.store.pending_tasks().await?;
        let count = pending.len();
        for spec in pending {
            info!(
                "recovering supervision of {} ({})",
                spec.symbol, spec.strategy_id
            );
            self.tx
                .send(spec)
                .await
                .map_err(|_| TrailguardError::Internal("supervisor worker pool is down".into()))?;
        }
        Ok(count)
    }

    /// Signal one running task to stop. Returns whether it was found.
    pub async fn cancel(&self, strategy_id: &str) -> bool {
        let cancels = self.cancels.lock().await;
        match cancels.get(strategy_id) {
            Some(tx) => tx.send(true).is_ok(),
            None => false,
        }
    }

    /// Signal every running task to stop.
    pub async fn cancel_all(&self) -> usize {
        let cancels = self.cancels.lock().await;
        let mut signalled = 0;
        for tx in cancels.values() {
            if tx.send(true).is_ok() {
                signalled += 1;
            }
        }
        signalled
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }
}

struct WorkerDeps {
    gateways: HashMap<Venue, Arc<dyn BrokerGateway>>,
    store: Arc<dyn PersistenceStore>,
    alerts: Arc<dyn AlertSink>,
    risk_config: RiskConfig,
    cancels: CancelMap,
    settings: SupervisorSettings,
}

async fn worker_loop(worker_id: usize, rx: Arc<Mutex<mpsc::Receiver<TaskSpec>>>, deps: WorkerDeps) {
    loop {
        // Hold the lock only while waiting for the next spec.
        let spec = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(spec) = spec else {
            info!("worker {worker_id}: queue closed, shutting down");
            break;
        };
        run_task(&deps, spec).await;
    }
}

/// Drive one spec to a terminal state, retrying failed attempts.
async fn run_task(deps: &WorkerDeps, spec: TaskSpec) {
    let Some(gateway) = deps.gateways.get(&spec.venue).cloned() else {
        // schedule() validates the venue; only recovered specs from an older
        // configuration can reach this.
        error!(
            "{}: no gateway for venue {}, abandoning",
            spec.strategy_id, spec.venue
        );
        abandon(deps, &spec, "venue no longer configured").await;
        return;
    };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    deps.cancels
        .lock()
        .await
        .insert(spec.strategy_id.clone(), cancel_tx);

    let poll_interval = Duration::from_secs(deps.settings.poll_interval_secs);
    let mut attempt = 1;
    loop {
        let task = Supervisor::new(
            spec.clone(),
            gateway.clone(),
            deps.store.clone(),
            deps.alerts.clone(),
            RiskEngine::new(deps.risk_config.clone()),
            poll_interval,
        );

        match task.run(cancel_rx.clone()).await {
            Ok(phase) => {
                info!("{}: supervision ended {phase}", spec.strategy_id);
                if let Err(err) = deps.store.complete_task(&spec.strategy_id).await {
                    warn!("{}: failed to complete task: {err}", spec.strategy_id);
                }
                break;
            }
            Err(err) if attempt < deps.settings.max_attempts => {
                warn!(
                    "{}: attempt {attempt}/{} failed: {err}; resubmitting",
                    spec.strategy_id, deps.settings.max_attempts
                );
                tokio::time::sleep(Duration::from_secs(deps.settings.retry_delay_secs)).await;
                attempt += 1;
            }
            Err(err) => {
                error!(
                    "{}: attempt {attempt}/{} failed: {err}; abandoning",
                    spec.strategy_id, deps.settings.max_attempts
                );
                abandon(deps, &spec, &err.to_string()).await;
                break;
            }
        }
    }

    deps.cancels.lock().await.remove(&spec.strategy_id);
}

/// Terminal failure path: one alert, a FAILURE feedback record, and the task
/// marked done so recovery does not resurrect it.
async fn abandon(deps: &WorkerDeps, spec: &TaskSpec, reason: &str) {
    deps.alerts
        .notify(
            &format!(
                "supervision abandoned for {} on {}: {reason}; position may need manual attention",
                spec.symbol, spec.venue
            ),
            Severity::Critical,
            Some(&spec.symbol),
        )
        .await;

    if let Err(err) = deps
        .store
        .record_feedback(
            &spec.strategy_id,
            FeedbackOutcome::Failure,
            &format!("supervision abandoned: {reason}"),
        )
        .await
    {
        warn!("{}: failed to record feedback: {err}", spec.strategy_id);
    }
    if let Err(err) = deps.store.complete_task(&spec.strategy_id).await {
        warn!("{}: failed to complete task: {err}", spec.strategy_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingAlerts, ScriptedGateway};
    use rust_decimal_macros::dec;
    use trailguard_core::types::{Position, Side};
    use trailguard_store::MemoryStore;

    fn fast_settings() -> SupervisorSettings {
        SupervisorSettings {
            poll_interval_secs: 0,
            max_attempts: 3,
            retry_delay_secs: 0,
            workers: 2,
        }
    }

    fn scheduler(
        gateway: Arc<ScriptedGateway>,
        store: Arc<MemoryStore>,
        alerts: Arc<RecordingAlerts>,
    ) -> Scheduler {
        let mut gateways: HashMap<Venue, Arc<dyn BrokerGateway>> = HashMap::new();
        gateways.insert(Venue::Binance, gateway);
        Scheduler::new(
            gateways,
            store,
            alerts,
            RiskConfig::default(),
            fast_settings(),
        )
    }

    fn spec() -> TaskSpec {
        TaskSpec::new("BTCUSDT", dec!(0.5), Venue::Binance, Side::Buy, "entry-1", dec!(2))
            .with_strategy_id("strat-1")
    }

    async fn wait_until_done(store: &MemoryStore) {
        for _ in 0..200 {
            if store.pending_tasks().await.unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task never completed");
    }

    #[tokio::test]
    async fn test_unknown_venue_rejected_at_schedule() {
        let gateway = Arc::new(ScriptedGateway::new());
        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let scheduler = scheduler(gateway, store.clone(), alerts);

        let oanda_spec = TaskSpec::new(
            "EUR_USD",
            dec!(1000),
            Venue::Oanda,
            Side::Buy,
            "entry-2",
            dec!(2),
        );
        let err = scheduler.schedule(oanda_spec).await.unwrap_err();
        assert!(matches!(err, TrailguardError::Config(_)));
        // Nothing was persisted for the rejected spec.
        assert!(store.pending_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retry_exhaustion_abandons_with_one_alert() {
        // Empty script: every position fetch fails transiently, so every
        // attempt dies at validation.
        let gateway = Arc::new(ScriptedGateway::new());
        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let scheduler = scheduler(gateway, store.clone(), alerts.clone());

        scheduler.schedule(spec()).await.unwrap();
        wait_until_done(&store).await;

        let recorded = alerts.recorded().await;
        assert_eq!(recorded.len(), 1, "expected exactly one abandonment alert");
        assert_eq!(recorded[0].1, Severity::Critical);
        assert!(recorded[0].0.contains("abandoned"));
    }

    #[tokio::test]
    async fn test_successful_supervision_completes_task() {
        let gateway = Arc::new(ScriptedGateway::new());
        let mut position =
            Position::new("BTCUSDT", Venue::Binance, Side::Buy, dec!(0.5), dec!(100));
        position.mark_price = dec!(100);
        gateway.push_position(Ok(Some(position.clone()))).await;
        position.mark_price = dec!(110);
        gateway.push_position(Ok(Some(position.clone()))).await;
        position.mark_price = dec!(95);
        gateway.push_position(Ok(Some(position))).await;

        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let scheduler = scheduler(gateway.clone(), store.clone(), alerts);

        scheduler.schedule(spec()).await.unwrap();
        wait_until_done(&store).await;

        assert_eq!(gateway.placed().await.len(), 1);
        assert_eq!(gateway.cancelled().await, vec!["entry-1".to_string()]);
    }

    #[tokio::test]
    async fn test_recover_reenqueues_pending() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_position(Ok(None)).await;

        let store = Arc::new(MemoryStore::new());
        // Spec persisted by a previous process that died before finishing.
        store.put_task(&spec()).await.unwrap();

        let alerts = Arc::new(RecordingAlerts::new());
        let scheduler = scheduler(gateway, store.clone(), alerts);

        let resumed = scheduler.recover().await.unwrap();
        assert_eq!(resumed, 1);
        wait_until_done(&store).await;
    }

    #[tokio::test]
    async fn test_cancel_unknown_task_is_false() {
        let gateway = Arc::new(ScriptedGateway::new());
        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let scheduler = scheduler(gateway, store, alerts);

        assert!(!scheduler.cancel("no-such-task").await);
        assert_eq!(scheduler.cancel_all().await, 0);
    }
}

//! Persistence contract.

use crate::error::StoreError;
use crate::types::{RiskLevels, TaskSpec};
use async_trait::async_trait;

/// Outcome recorded against the prediction that opened a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackOutcome {
    Success,
    Failure,
}

impl std::fmt::Display for FeedbackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackOutcome::Success => write!(f, "SUCCESS"),
            FeedbackOutcome::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Durable storage for risk levels, prediction feedback, and the supervisor
/// task queue.
///
/// All writes are scoped by `strategy_id` and are append/upsert only, so
/// supervisor tasks never contend on the same record.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Upsert the protective levels for a strategy.
    async fn save_risk_levels(&self, levels: &RiskLevels) -> Result<(), StoreError>;

    /// Record the outcome of a supervised position and append to its
    /// rationale/audit trail.
    async fn record_feedback(
        &self,
        strategy_id: &str,
        outcome: FeedbackOutcome,
        rationale: &str,
    ) -> Result<(), StoreError>;

    /// Enqueue (or re-enqueue) a supervisor task. Upsert by `strategy_id`.
    async fn put_task(&self, spec: &TaskSpec) -> Result<(), StoreError>;

    /// Mark a supervisor task as terminally finished.
    async fn complete_task(&self, strategy_id: &str) -> Result<(), StoreError>;

    /// Tasks enqueued but not yet finished, for recovery after a worker
    /// restart.
    async fn pending_tasks(&self) -> Result<Vec<TaskSpec>, StoreError>;
}

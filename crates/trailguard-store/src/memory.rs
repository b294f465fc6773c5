//! In-memory store for tests and dry runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use trailguard_core::error::StoreError;
use trailguard_core::traits::{FeedbackOutcome, PersistenceStore};
use trailguard_core::types::{RiskLevels, TaskSpec};

/// One feedback entry with its accumulated rationale.
#[derive(Debug, Clone)]
pub struct FeedbackEntry {
    pub outcome: FeedbackOutcome,
    pub rationale: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    levels: HashMap<String, RiskLevels>,
    feedback: HashMap<String, FeedbackEntry>,
    tasks: HashMap<String, (TaskSpec, bool)>,
}

/// Keyed in-memory persistence.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest levels recorded for a strategy.
    pub async fn levels(&self, strategy_id: &str) -> Option<RiskLevels> {
        self.inner.read().await.levels.get(strategy_id).cloned()
    }

    /// Feedback recorded for a strategy.
    pub async fn feedback(&self, strategy_id: &str) -> Option<FeedbackEntry> {
        self.inner.read().await.feedback.get(strategy_id).cloned()
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn save_risk_levels(&self, levels: &RiskLevels) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .levels
            .insert(levels.strategy_id.clone(), levels.clone());
        Ok(())
    }

    async fn record_feedback(
        &self,
        strategy_id: &str,
        outcome: FeedbackOutcome,
        rationale: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .feedback
            .entry(strategy_id.to_string())
            .or_insert_with(|| FeedbackEntry {
                outcome,
                rationale: String::new(),
                recorded_at: Utc::now(),
            });
        entry.outcome = outcome;
        entry.recorded_at = Utc::now();
        if entry.rationale.is_empty() {
            entry.rationale = rationale.to_string();
        } else {
            entry.rationale = format!("{} | {}", entry.rationale, rationale);
        }
        Ok(())
    }

    async fn put_task(&self, spec: &TaskSpec) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .tasks
            .insert(spec.strategy_id.clone(), (spec.clone(), false));
        Ok(())
    }

    async fn complete_task(&self, strategy_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some((_, done)) = inner.tasks.get_mut(strategy_id) {
            *done = true;
        }
        Ok(())
    }

    async fn pending_tasks(&self) -> Result<Vec<TaskSpec>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .tasks
            .values()
            .filter(|(_, done)| !done)
            .map(|(spec, _)| spec.clone())
            .collect())
    }
}

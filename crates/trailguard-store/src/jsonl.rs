//! Append-only JSON-lines file store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;
use trailguard_core::error::StoreError;
use trailguard_core::traits::{FeedbackOutcome, PersistenceStore};
use trailguard_core::types::{RiskLevels, TaskSpec};

const LEVELS_FILE: &str = "risk_levels.jsonl";
const FEEDBACK_FILE: &str = "feedback.jsonl";
const TASKS_FILE: &str = "tasks.jsonl";

#[derive(Debug, Serialize, Deserialize)]
struct FeedbackRecord {
    strategy_id: String,
    outcome: FeedbackOutcome,
    rationale: String,
    recorded_at: DateTime<Utc>,
}

/// Task queue event. `spec: Some` enqueues, `done: true` retires; the latest
/// event per `strategy_id` wins on replay.
#[derive(Debug, Serialize, Deserialize)]
struct TaskEvent {
    strategy_id: String,
    spec: Option<TaskSpec>,
    done: bool,
    recorded_at: DateTime<Utc>,
}

/// File-backed store, one JSON object per line, append-only.
///
/// Records are never rewritten; upsert semantics come from latest-wins on
/// replay. Good enough for a single supervising process per data directory.
pub struct JsonlStore {
    dir: PathBuf,
    // Serializes appends so interleaved tasks never tear a line.
    write_lock: Mutex<()>,
}

impl JsonlStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    async fn append<T: Serialize>(&self, file: &str, record: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(file))
            .await?;
        handle.write_all(line.as_bytes()).await?;
        handle.flush().await?;
        Ok(())
    }

    async fn read_lines<T: for<'de> Deserialize<'de>>(
        &self,
        file: &str,
    ) -> Result<Vec<T>, StoreError> {
        let path = self.path(file);
        if !path_exists(&path).await {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path).await?;
        let mut records = Vec::new();
        for line in contents.lines().filter(|line| !line.trim().is_empty()) {
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                // A crash mid-append can leave a torn final line; keep the
                // records that did make it to disk.
                Err(err) => warn!("Skipping unreadable record in {file}: {err}"),
            }
        }
        Ok(records)
    }
}

async fn path_exists(path: &Path) -> bool {
    fs::metadata(path).await.is_ok()
}

#[async_trait]
impl PersistenceStore for JsonlStore {
    async fn save_risk_levels(&self, levels: &RiskLevels) -> Result<(), StoreError> {
        self.append(LEVELS_FILE, levels).await
    }

    async fn record_feedback(
        &self,
        strategy_id: &str,
        outcome: FeedbackOutcome,
        rationale: &str,
    ) -> Result<(), StoreError> {
        let record = FeedbackRecord {
            strategy_id: strategy_id.to_string(),
            outcome,
            rationale: rationale.to_string(),
            recorded_at: Utc::now(),
        };
        self.append(FEEDBACK_FILE, &record).await
    }

    async fn put_task(&self, spec: &TaskSpec) -> Result<(), StoreError> {
        let event = TaskEvent {
            strategy_id: spec.strategy_id.clone(),
            spec: Some(spec.clone()),
            done: false,
            recorded_at: Utc::now(),
        };
        self.append(TASKS_FILE, &event).await
    }

    async fn complete_task(&self, strategy_id: &str) -> Result<(), StoreError> {
        let event = TaskEvent {
            strategy_id: strategy_id.to_string(),
            spec: None,
            done: true,
            recorded_at: Utc::now(),
        };
        self.append(TASKS_FILE, &event).await
    }

    async fn pending_tasks(&self) -> Result<Vec<TaskSpec>, StoreError> {
        let events: Vec<TaskEvent> = self.read_lines(TASKS_FILE).await?;

        let mut latest: HashMap<String, TaskEvent> = HashMap::new();
        for event in events {
            latest.insert(event.strategy_id.clone(), event);
        }

        let mut pending: Vec<TaskSpec> = latest
            .into_values()
            .filter(|event| !event.done)
            .filter_map(|event| event.spec)
            .collect();
        // Stable recovery order.
        pending.sort_by(|a, b| a.strategy_id.cmp(&b.strategy_id));
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use trailguard_core::types::{Side, Venue};

    fn spec(id: &str) -> TaskSpec {
        TaskSpec::new("BTCUSDT", dec!(0.5), Venue::Binance, Side::Buy, "o-9", dec!(2))
            .with_strategy_id(id)
    }

    #[tokio::test]
    async fn test_pending_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = JsonlStore::open(dir.path()).await.unwrap();
            store.put_task(&spec("a")).await.unwrap();
            store.put_task(&spec("b")).await.unwrap();
            store.complete_task("a").await.unwrap();
        }

        // A fresh process sees the same queue.
        let store = JsonlStore::open(dir.path()).await.unwrap();
        let pending = store.pending_tasks().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].strategy_id, "b");
    }

    #[tokio::test]
    async fn test_torn_line_skipped_on_replay() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlStore::open(dir.path()).await.unwrap();
            store.put_task(&spec("a")).await.unwrap();
        }

        // Simulate a crash mid-append leaving a truncated record.
        let mut raw = std::fs::OpenOptions::new()
            .append(true)
            .open(dir.path().join(TASKS_FILE))
            .unwrap();
        std::io::Write::write_all(&mut raw, b"{\"strategy_id\":\"b\",\"sp").unwrap();

        let store = JsonlStore::open(dir.path()).await.unwrap();
        let pending = store.pending_tasks().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].strategy_id, "a");
    }

    #[tokio::test]
    async fn test_requeue_after_complete() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::open(dir.path()).await.unwrap();

        store.put_task(&spec("a")).await.unwrap();
        store.complete_task("a").await.unwrap();
        store.put_task(&spec("a")).await.unwrap();

        let pending = store.pending_tasks().await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_levels_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::open(dir.path()).await.unwrap();

        let levels = RiskLevels {
            symbol: "BTCUSDT".into(),
            entry_price: dec!(30000),
            static_sl: dec!(29400),
            static_tp: dec!(31200),
            trailing_sl: dec!(29550),
            timestamp: Utc::now(),
            strategy_id: "s1".into(),
        };
        store.save_risk_levels(&levels).await.unwrap();
        store.save_risk_levels(&levels).await.unwrap();

        let lines: Vec<RiskLevels> = store.read_lines(LEVELS_FILE).await.unwrap();
        assert_eq!(lines.len(), 2);
    }
}

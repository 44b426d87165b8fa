use crate::error::StoreError;
use crate::spec::FlowSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// What one save persists: the editable spec plus its compiled vendor JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub spec: FlowSpec,
    pub compiled: Value,
}

/// Persistence for a single flow.
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// The stored spec in whatever shape it was written, or `None` for a new flow.
    async fn load(&self) -> Result<Option<Value>, StoreError>;

    async fn save(&self, record: &FlowRecord) -> Result<(), StoreError>;
}

/// Store that keeps every saved record in memory.
///
/// Saves can be delayed and made to fail, which makes it useful for driving
/// the autosave queue in tests and demos.
#[derive(Debug, Default)]
pub struct MemoryStore {
    initial: Option<Value>,
    saves: Mutex<Vec<FlowRecord>>,
    save_delay: Duration,
    failures_left: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `load` returns `raw`.
    pub fn with_initial(raw: Value) -> Self {
        Self {
            initial: Some(raw),
            ..Self::default()
        }
    }

    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = delay;
        self
    }

    /// Makes the next `count` saves fail.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub async fn saves(&self) -> Vec<FlowRecord> {
        self.saves.lock().await.clone()
    }

    pub async fn save_count(&self) -> usize {
        self.saves.lock().await.len()
    }

    pub async fn last_saved(&self) -> Option<FlowRecord> {
        self.saves.lock().await.last().cloned()
    }

    /// Highest number of saves that were running at the same time.
    pub fn max_concurrent_saves(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlowStore for MemoryStore {
    async fn load(&self) -> Result<Option<Value>, StoreError> {
        if let Some(last) = self.saves.lock().await.last() {
            return serde_json::to_value(&last.spec)
                .map(Some)
                .map_err(|e| StoreError::Corrupt(e.to_string()));
        }
        Ok(self.initial.clone())
    }

    async fn save(&self, record: &FlowRecord) -> Result<(), StoreError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.save_delay.is_zero() {
            tokio::time::sleep(self.save_delay).await;
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let result = if should_fail {
            Err(StoreError::Rejected("simulated failure".to_string()))
        } else {
            self.saves.lock().await.push(record.clone());
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Store backed by one JSON file holding a [`FlowRecord`].
///
/// Files written by older tools that hold a bare spec are still loaded.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl FlowStore for JsonFileStore {
    async fn load(&self) -> Result<Option<Value>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let mut document: Value =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let is_record = document.get("spec").is_some() && document.get("compiled").is_some();
        if is_record {
            return Ok(document.get_mut("spec").map(Value::take));
        }
        Ok(Some(document))
    }

    async fn save(&self, record: &FlowRecord) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        // Staged write; the target is only ever replaced whole.
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, content)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), "flow record written");
        Ok(())
    }
}

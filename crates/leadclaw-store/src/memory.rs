//! In-memory record store — demo backend and test double.
//!
//! Models the awkward parts of a real sheet-backed API: writes become
//! visible only after a configurable number of subsequent reads, writes
//! can be dropped outright, and control reads can be made to fail. The
//! adapter layer is expected to cope with all three.

use async_trait::async_trait;
use leadclaw_core::error::{LeadClawError, Result};
use leadclaw_core::traits::RecordStore;
use tokio::sync::Mutex;

struct StoredRow {
    /// Fetch sequence number at which this row becomes visible.
    visible_at: u64,
    value: serde_json::Value,
}

struct Inner {
    rows: Vec<StoredRow>,
    fetches: u64,
    visibility_lag: u64,
    drop_writes: bool,
    control: String,
    fail_control: bool,
}

/// In-process [`RecordStore`] with simulated eventual consistency.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lag(0)
    }

    /// A store whose appended rows only appear after `lag` further reads.
    pub fn with_lag(lag: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                rows: Vec::new(),
                fetches: 0,
                visibility_lag: lag,
                drop_writes: false,
                control: "RUN".into(),
                fail_control: false,
            }),
        }
    }

    /// Silently discard subsequent appends (write-verify must catch this).
    pub async fn set_drop_writes(&self, drop: bool) {
        self.inner.lock().await.drop_writes = drop;
    }

    pub async fn set_control(&self, value: &str) {
        self.inner.lock().await.control = value.to_string();
    }

    /// Make control reads fail (the monitor must fail open to RUN).
    pub async fn set_fail_control(&self, fail: bool) {
        self.inner.lock().await.fail_control = fail;
    }

    /// Every stored row regardless of visibility. Test helper.
    pub async fn all_rows(&self) -> Vec<serde_json::Value> {
        self.inner
            .lock()
            .await
            .rows
            .iter()
            .map(|r| r.value.clone())
            .collect()
    }

    pub async fn row_count(&self) -> usize {
        self.inner.lock().await.rows.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append_row(&self, row: &serde_json::Value) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.drop_writes {
            // Backend accepted the request and lost the row. No error.
            return Ok(());
        }
        let visible_at = inner.fetches + inner.visibility_lag;
        inner.rows.push(StoredRow {
            visible_at,
            value: row.clone(),
        });
        Ok(())
    }

    async fn fetch_rows(&self) -> Result<Vec<serde_json::Value>> {
        let mut inner = self.inner.lock().await;
        inner.fetches += 1;
        let now = inner.fetches;
        Ok(inner
            .rows
            .iter()
            .filter(|r| r.visible_at <= now)
            .map(|r| r.value.clone())
            .collect())
    }

    async fn update_row(&self, id: &str, fields: &serde_json::Value) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .rows
            .iter_mut()
            .find(|r| r.value.get("id").and_then(|v| v.as_str()) == Some(id))
            .ok_or_else(|| LeadClawError::Store(format!("row {id} not found")))?;
        if let (Some(target), Some(patch)) = (row.value.as_object_mut(), fields.as_object()) {
            for (k, v) in patch {
                target.insert(k.clone(), v.clone());
            }
        }
        Ok(())
    }

    async fn read_control(&self) -> Result<String> {
        let inner = self.inner.lock().await;
        if inner.fail_control {
            return Err(LeadClawError::Store("control cell unreachable".into()));
        }
        Ok(inner.control.clone())
    }
}

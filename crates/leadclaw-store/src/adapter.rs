//! Store adapter — the write-verified discipline layered over a raw
//! [`RecordStore`].
//!
//! The backing store is eventually consistent and can silently drop
//! writes, so nothing above this layer trusts a write until the adapter
//! has re-read it. Reads always go through the backend fresh (the
//! [`RecordStore`] contract forbids serving cached snapshots).

use std::collections::HashSet;
use std::sync::Arc;

use leadclaw_core::config::StoreConfig;
use leadclaw_core::error::{LeadClawError, Result};
use leadclaw_core::retry::RetryPolicy;
use leadclaw_core::traits::RecordStore;
use leadclaw_core::types::{Candidate, CandidateStatus, ControlSignal, StatusUpdate};
use tracing::{debug, info, warn};

/// A batch update that did not stick, with the error it died on.
pub struct FailedUpdate {
    pub update: StatusUpdate,
    pub error: LeadClawError,
}

/// Write-verified facade over the candidates table and the control cell.
pub struct StoreAdapter {
    store: Arc<dyn RecordStore>,
    /// Re-read schedule for write verification. Exhausting it is fatal.
    verify: RetryPolicy,
    /// Retry schedule for transient request failures.
    request_retry: RetryPolicy,
}

impl StoreAdapter {
    pub fn new(store: Arc<dyn RecordStore>, config: &StoreConfig) -> Self {
        Self::with_policies(
            store,
            RetryPolicy::from_secs(&config.verify_delays_secs),
            RetryPolicy::from_secs(&config.request_retry_secs),
        )
    }

    pub fn with_policies(
        store: Arc<dyn RecordStore>,
        verify: RetryPolicy,
        request_retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            verify,
            request_retry,
        }
    }

    /// Append new candidate rows, then re-read until every appended id is
    /// visible. Ids already visible in the store are skipped first, which
    /// makes a retried append idempotent. Returns how many rows were
    /// actually appended.
    ///
    /// Exhausting the verify schedule with rows still invisible returns
    /// [`LeadClawError::WriteNotVerified`] — the store is eating writes
    /// and continuing would fabricate state.
    pub async fn append_candidates(&self, candidates: &[Candidate]) -> Result<usize> {
        if candidates.is_empty() {
            return Ok(0);
        }

        let visible = self.visible_ids().await?;
        let to_append: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| !visible.contains(&c.id))
            .collect();
        let skipped = candidates.len() - to_append.len();
        if skipped > 0 {
            debug!("Skipping {skipped} candidate(s) already present in the store");
        }
        if to_append.is_empty() {
            return Ok(0);
        }

        for candidate in &to_append {
            let row = serde_json::to_value(candidate).map_err(|e| {
                LeadClawError::Store(format!("serialize candidate {}: {e}", candidate.id))
            })?;
            let store = &self.store;
            self.request_retry
                .run("append row", LeadClawError::is_transient, || {
                    store.append_row(&row)
                })
                .await?;
        }
        info!("📤 Appended {} candidate row(s), verifying...", to_append.len());

        let expected: Vec<String> = to_append.iter().map(|c| c.id.clone()).collect();
        let mut recheck = 0usize;
        loop {
            let visible = self.visible_ids().await?;
            let missing: Vec<String> = expected
                .iter()
                .filter(|id| !visible.contains(id.as_str()))
                .cloned()
                .collect();
            if missing.is_empty() {
                info!(
                    "✅ Verified {} row(s) visible after {} read(s)",
                    expected.len(),
                    recheck + 1
                );
                return Ok(expected.len());
            }
            recheck += 1;
            match self.verify.delay_before(recheck) {
                Some(delay) => {
                    warn!(
                        "⚠️ {} row(s) not yet visible, re-checking in {:?} ({recheck}/{})",
                        missing.len(),
                        delay,
                        self.verify.attempts() - 1
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(LeadClawError::WriteNotVerified { missing }),
            }
        }
    }

    /// Apply one partial row update.
    pub async fn update_status(&self, update: &StatusUpdate) -> Result<()> {
        let fields = update_fields(update);
        let store = &self.store;
        let id = update.id.as_str();
        self.request_retry
            .run("update row", LeadClawError::is_transient, || {
                store.update_row(id, &fields)
            })
            .await
    }

    /// Apply a batch of row updates, isolating failures: every update is
    /// attempted, and the ones that failed come back with their errors so
    /// the caller can retry just that subset.
    pub async fn update_batch(&self, updates: &[StatusUpdate]) -> Vec<FailedUpdate> {
        let mut failed = Vec::new();
        for update in updates {
            if let Err(error) = self.update_status(update).await {
                warn!("⚠️ Update for {} failed: {error}", update.id);
                failed.push(FailedUpdate {
                    update: update.clone(),
                    error,
                });
            }
        }
        failed
    }

    /// Candidates still awaiting a filter verdict.
    pub async fn pending(&self) -> Result<Vec<Candidate>> {
        Ok(self
            .fetch_candidates()
            .await?
            .into_iter()
            .filter(|c| c.status == CandidateStatus::Pending)
            .collect())
    }

    /// Candidates that passed the filter and have not been contacted.
    pub async fn ready_for_engagement(&self) -> Result<Vec<Candidate>> {
        Ok(self
            .fetch_candidates()
            .await?
            .into_iter()
            .filter(|c| c.is_ready())
            .collect())
    }

    /// Every parseable candidate row.
    pub async fn all_candidates(&self) -> Result<Vec<Candidate>> {
        self.fetch_candidates().await
    }

    /// Ids and handles already present in the store, for scrape dedup.
    /// Handles are included because two scrape passes can surface the
    /// same account under different platform ids.
    pub async fn existing_keys(&self) -> Result<HashSet<String>> {
        let rows = self.fetch_raw().await?;
        let mut keys = HashSet::with_capacity(rows.len() * 2);
        for row in &rows {
            if let Some(id) = row.get("id").and_then(|v| v.as_str()) {
                keys.insert(id.to_string());
            }
            if let Some(handle) = row.get("handle").and_then(|v| v.as_str()) {
                keys.insert(handle.to_string());
            }
        }
        Ok(keys)
    }

    /// Read the operator kill switch. Any failure fails open to `Run`:
    /// the control cell is a convenience, not a dependency, and a flaky
    /// store must not strand the pipeline.
    pub async fn control_signal(&self) -> ControlSignal {
        match self.store.read_control().await {
            Ok(raw) => ControlSignal::parse(&raw),
            Err(e) => {
                warn!("⚠️ Control cell unreadable ({e}), failing open to RUN");
                ControlSignal::Run
            }
        }
    }

    async fn fetch_raw(&self) -> Result<Vec<serde_json::Value>> {
        let store = &self.store;
        self.request_retry
            .run("fetch rows", LeadClawError::is_transient, || {
                store.fetch_rows()
            })
            .await
    }

    /// Fetch and parse candidate rows, skipping rows that do not parse.
    /// Operators hand-edit the table; one mangled row must not take the
    /// whole pipeline down.
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>> {
        let rows = self.fetch_raw().await?;
        let total = rows.len();
        let candidates: Vec<Candidate> = rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect();
        if candidates.len() < total {
            warn!(
                "⚠️ Skipped {} unparseable row(s) out of {total}",
                total - candidates.len()
            );
        }
        Ok(candidates)
    }

    async fn visible_ids(&self) -> Result<HashSet<String>> {
        let rows = self.fetch_raw().await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("id").and_then(|v| v.as_str()))
            .map(String::from)
            .collect())
    }
}

/// Collapse a [`StatusUpdate`] into the JSON patch sent to the store.
/// Only populated fields appear, so untouched columns survive.
fn update_fields(update: &StatusUpdate) -> serde_json::Value {
    let mut fields = serde_json::Map::new();
    if let Some(status) = update.status {
        fields.insert("status".into(), serde_json::json!(status));
    }
    if let Some(reason) = &update.filter_reason {
        fields.insert("filter_reason".into(), serde_json::json!(reason));
    }
    if let Some(engage) = update.engage {
        fields.insert("engage".into(), serde_json::json!(engage));
    }
    if let Some(at) = update.engaged_at {
        fields.insert("engaged_at".into(), serde_json::json!(at));
    }
    if let Some(err) = &update.last_error {
        fields.insert("last_error".into(), serde_json::json!(err));
    }
    serde_json::Value::Object(fields)
}

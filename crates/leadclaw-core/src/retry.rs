//! One retry/backoff policy for the whole pipeline.
//!
//! The store adapter (transient request retries, write-verify re-check
//! schedule) and the orchestrator's cycle-failure path all consume this
//! instead of growing their own ad hoc backoff loops.

use std::future::Future;
use std::time::Duration;

use crate::error::{LeadClawError, Result};

/// An escalating delay schedule. The attempt budget is derived from it:
/// `delays.len() + 1` tries total (one initial attempt plus one retry per
/// delay).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Build from whole-second config values.
    pub fn from_secs(secs: &[u64]) -> Self {
        Self::new(secs.iter().map(|s| Duration::from_secs(*s)).collect())
    }

    /// Total attempts this policy allows.
    pub fn attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Delay to sleep before retry number `retry` (1-based). `None` once
    /// the schedule is exhausted.
    pub fn delay_before(&self, retry: usize) -> Option<Duration> {
        if retry == 0 {
            return None;
        }
        self.delays.get(retry - 1).copied()
    }

    /// Backoff for an ongoing failure streak, clamping to the last entry
    /// so a long outage keeps the longest delay instead of wrapping.
    pub fn backoff_for(&self, consecutive_failures: u32) -> Duration {
        if self.delays.is_empty() {
            return Duration::ZERO;
        }
        let idx = (consecutive_failures.saturating_sub(1) as usize).min(self.delays.len() - 1);
        self.delays[idx]
    }

    /// Run `op`, retrying per the schedule while `retryable` says the
    /// error is worth another attempt. The final error is returned as-is.
    pub async fn run<T, F, Fut, P>(&self, label: &str, retryable: P, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&LeadClawError) -> bool,
    {
        let mut attempt = 1usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    let next_delay = self.delay_before(attempt);
                    if !retryable(&e) || next_delay.is_none() {
                        return Err(e);
                    }
                    let delay = next_delay.unwrap_or_default();
                    tracing::warn!(
                        "⚠️ {label} failed (attempt {attempt}/{}): {e} — retrying in {:?}",
                        self.attempts(),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    /// Three escalating delays, matching the default write-verify schedule.
    fn default() -> Self {
        Self::from_secs(&[2, 5, 10])
    }
}

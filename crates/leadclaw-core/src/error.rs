//! LeadClaw error taxonomy.
//!
//! Four classes matter to the orchestrator:
//! - transient (store/network hiccups) — retried with backoff, bounded attempts
//! - fatal (unverified writes, permission failures) — halt the process
//! - per-record faults — logged against that row, never abort the batch
//! - everything else — counted by the circuit breaker until its threshold

use thiserror::Error;

/// All errors produced by LeadClaw crates.
#[derive(Error, Debug)]
pub enum LeadClawError {
    /// Configuration load/parse problems.
    #[error("Config error: {0}")]
    Config(String),

    /// Record-store request failed (network, serialization, bad response).
    /// Transient by default — callers retry these with backoff.
    #[error("Store error: {0}")]
    Store(String),

    /// Rows were appended but never became visible on re-read.
    /// The store is silently dropping writes (typically a permission
    /// problem on the remote table). Fatal: retrying blindly would mask
    /// a real outage.
    #[error("Write not verified: {} row(s) never became visible: {}", missing.len(), missing.join(", "))]
    WriteNotVerified { missing: Vec<String> },

    /// Authenticated dependency rejected us. Will not resolve by waiting;
    /// trips the circuit breaker immediately.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Scraper hard failure ("no results" is not an error).
    #[error("Scrape error: {0}")]
    Scrape(String),

    /// Rule evaluator hard failure for one candidate.
    #[error("Evaluate error: {0}")]
    Evaluate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LeadClawError {
    /// Permission/authorization-class error — the circuit breaker opens
    /// immediately on these regardless of its failure counter.
    pub fn is_permission(&self) -> bool {
        matches!(self, LeadClawError::PermissionDenied(_))
    }

    /// Fatal for the process: no amount of inter-cycle retrying helps.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LeadClawError::PermissionDenied(_) | LeadClawError::WriteNotVerified { .. }
        )
    }

    /// Transient store/network fault — safe to retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, LeadClawError::Store(_))
    }
}

/// Convenience result type used across all LeadClaw crates.
pub type Result<T> = std::result::Result<T, LeadClawError>;

//! Action executor seam — performs one engagement action at a time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Activity;

/// Tagged outcome of one action attempt. The core branches on the tag
/// only; whatever the executor saw (closed DMs, challenge pages, HTTP
/// codes) is folded into one of these before it crosses the seam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// Action confirmed performed. Only now may quota be consumed.
    Completed,
    Failed(ActionFailure),
}

/// Closed failure set for a single activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionFailure {
    /// Target does not accept DMs.
    DmClosed,
    /// Target account is gone or suspended.
    AccountSuspended,
    /// Upstream told us to slow down.
    RateLimited,
    /// Target could not be resolved at all.
    TargetNotFound,
    /// Momentary fault — worth retrying the same activity.
    Transient,
}

impl ActionFailure {
    /// Only `Transient` is retried within the same activity; every other
    /// failure is terminal for that activity (and that activity only).
    pub fn is_transient(&self) -> bool {
        matches!(self, ActionFailure::Transient)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionFailure::DmClosed => "DM_CLOSED",
            ActionFailure::AccountSuspended => "ACCOUNT_SUSPENDED",
            ActionFailure::RateLimited => "RATE_LIMITED",
            ActionFailure::TargetNotFound => "TARGET_NOT_FOUND",
            ActionFailure::Transient => "TRANSIENT",
        }
    }
}

impl std::fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Performs engagement actions against target identities. The underlying
/// session (one authenticated browser/API context) is an exclusive
/// resource: the orchestrator never calls `execute` concurrently.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    fn name(&self) -> &str;

    /// Perform one activity. There is no error case at the Rust level:
    /// every failure mode is a value in the tagged outcome set.
    async fn execute(&self, activity: &Activity) -> ActionOutcome;

    /// Best-effort release of the session resource. Called on every
    /// shutdown path, fatal ones included.
    async fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ActionFailure::Transient.is_transient());
        for f in [
            ActionFailure::DmClosed,
            ActionFailure::AccountSuspended,
            ActionFailure::RateLimited,
            ActionFailure::TargetNotFound,
        ] {
            assert!(!f.is_transient(), "{f} must be terminal");
        }
    }

    #[test]
    fn test_failure_labels_match_store_values() {
        assert_eq!(ActionFailure::DmClosed.to_string(), "DM_CLOSED");
        assert_eq!(
            serde_json::to_string(&ActionFailure::RateLimited).unwrap(),
            "\"RATE_LIMITED\""
        );
    }
}

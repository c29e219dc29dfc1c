//! Circuit breaker — stops the pipeline after sustained failure.
//!
//! Counts consecutive failed cycles; a success while still closed resets
//! the streak. Permission-class errors skip the counter and open the
//! circuit at once. Open is terminal for the process: recovery is an
//! operator restart, not a timer.

use leadclaw_core::error::LeadClawError;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
}

pub struct CircuitBreaker {
    threshold: u32,
    consecutive_failures: u32,
    state: CircuitState,
    opened_reason: Option<String>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_failures: 0,
            state: CircuitState::Closed,
            opened_reason: None,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == CircuitState::Open
    }

    pub fn failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Why the circuit opened, if it has.
    pub fn opened_reason(&self) -> Option<&str> {
        self.opened_reason.as_deref()
    }

    /// A full cycle succeeded. Resets the streak, but never re-closes an
    /// open circuit.
    pub fn record_success(&mut self) {
        if self.state == CircuitState::Closed {
            self.consecutive_failures = 0;
        }
    }

    /// A cycle failed. Returns the resulting state so callers can halt
    /// on the transition.
    pub fn record_failure(&mut self, err: &LeadClawError) -> CircuitState {
        if self.state == CircuitState::Open {
            return self.state;
        }
        self.consecutive_failures += 1;
        if err.is_permission() {
            self.trip(format!("permission failure: {err}"));
        } else if self.consecutive_failures >= self.threshold {
            self.trip(format!(
                "{} consecutive failures (last: {err})",
                self.consecutive_failures
            ));
        } else {
            warn!(
                "⚠️ Cycle failure {}/{} before circuit opens",
                self.consecutive_failures, self.threshold
            );
        }
        self.state
    }

    fn trip(&mut self, reason: String) {
        error!("🚨 Circuit breaker OPEN: {reason}");
        self.state = CircuitState::Open;
        self.opened_reason = Some(reason);
    }
}

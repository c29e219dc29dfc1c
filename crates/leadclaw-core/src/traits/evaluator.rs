//! Rule evaluator seam — the filter phase's pass/fail oracle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Candidate;

/// Outcome of evaluating one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    /// Human-readable reason, recorded on the candidate row either way.
    pub reason: String,
}

impl Verdict {
    pub fn pass(reason: &str) -> Self {
        Self {
            passed: true,
            reason: reason.to_string(),
        }
    }

    pub fn fail(reason: &str) -> Self {
        Self {
            passed: false,
            reason: reason.to_string(),
        }
    }
}

/// Decides whether a candidate is worth engaging. Must behave as a pure
/// function over the candidate — no side effects the core has to track.
/// A hard failure marks only that candidate `ERROR`; it never aborts the
/// batch.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&self, candidate: &Candidate) -> Result<Verdict>;
}

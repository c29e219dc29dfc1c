//! # LeadClaw Core
//!
//! Shared types, traits, config, and errors for the LeadClaw outreach engine.
//!
//! ## Design Principles
//! - The external tabular store is the system of record — no local database
//! - Every platform touchpoint (scraper, evaluator, executor, store) is a trait
//! - Fail closed on permissions, fail open on the kill switch
//! - All timing decisions flow through injectable clocks for testability
//!
//! ## Architecture
//! ```text
//! CycleOrchestrator (leadclaw-engine)
//!   ├── Scraper        → ScrapedProfile  → Candidate (PENDING)
//!   ├── RuleEvaluator  → Verdict         → PASS / FAIL
//!   ├── ActivityPlanner (leadclaw-scheduler) → Vec<Activity>
//!   └── ActionExecutor → ActionOutcome   → SENT marker / last_error
//!
//! StoreAdapter (leadclaw-store)
//!   └── RecordStore (HTTP or in-memory) — write-verify-retry on top
//! ```

pub mod config;
pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

pub use config::{
    EngineConfig, LeadClawConfig, LimitsConfig, PlannerConfig, RulesConfig, ScrapeConfig,
    StoreConfig,
};
pub use error::{LeadClawError, Result};
pub use retry::RetryPolicy;
pub use traits::{
    ActionExecutor, ActionFailure, ActionOutcome, RecordStore, RuleEvaluator, Scraper, Verdict,
};
pub use types::{
    Activity, ActivityKind, Candidate, CandidateStatus, ControlSignal, EngageStatus,
    ScrapedProfile, StatusUpdate,
};

//! # LeadClaw Scheduler
//!
//! Quota accounting and per-cycle activity planning.
//!
//! ## Design Principles
//! - Rolling windows (trailing hour / trailing day), never midnight resets
//! - Quota is consumed by confirmed actions, not by plans
//! - DMs outrank everything; secondary actions are probabilistic filler
//! - All clock and RNG inputs are injectable
//!
//! ## Architecture
//! ```text
//! RateLimiter (per-kind hour/day windows)
//!   └── ActivityPlanner::build_plan(ready, limiter, now)
//!         ├── 1 DM per ready candidate, up to DM quota, readiness order
//!         ├── like/repost/comment rolled per candidate, quota-bounded
//!         └── slots drawn in the daytime interval, sort (rank, slot)
//! ```

pub mod limits;
pub mod planner;

pub use limits::{RateLimiter, UsageStats};
pub use planner::ActivityPlanner;

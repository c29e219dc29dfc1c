//! # LeadClaw Store
//!
//! Adapter layer between the pipeline and its system of record, an
//! external tabular store (a hosted sheet or any row-oriented API).
//!
//! ## Design Principles
//! - Never trust a write: every append is re-read until visible
//! - Reads bypass caches; the backend's own lag is handled by re-checks
//! - Partial updates only — operator-owned columns are never clobbered
//! - The kill-switch cell fails open: unreadable means RUN
//!
//! ## Architecture
//! ```text
//! StoreAdapter (write-verify, dedup, tolerant row parsing)
//!   └── RecordStore trait
//!         ├── HttpRecordStore  — remote tabular API (bearer auth)
//!         └── MemoryStore      — in-process, with simulated lag/faults
//! ```

pub mod adapter;
pub mod http;
pub mod memory;

pub use adapter::{FailedUpdate, StoreAdapter};
pub use http::HttpRecordStore;
pub use memory::MemoryStore;

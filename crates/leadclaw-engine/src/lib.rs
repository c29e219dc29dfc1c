//! # LeadClaw Engine
//!
//! The control plane: circuit breaker, kill-switch monitor, and the
//! cycle orchestrator that drives scrape → filter → engage rounds.
//!
//! ## Design Principles
//!
//! - **Store is truth**: every phase rereads the tabular store; nothing
//!   meaningful lives only in process memory
//! - **Fail safe, not silent**: permission problems open the circuit at
//!   once, transient ones get bounded retries with logs
//! - **Operator holds the wheel**: the kill switch is consulted at every
//!   phase boundary and wins over everything else
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              CycleOrchestrator               │
//! │  STARTING → SCRAPING → FILTERING → ENGAGING  │
//! │      │          │           │          │     │
//! │      └──────────┴─── gate ──┴──────────┘     │
//! └──────┬───────────────────┬──────────────────-┘
//!        │                   │
//! ┌──────▼─────────┐  ┌──────▼─────────┐
//! │ KillSwitchMon. │  │ CircuitBreaker │
//! │ RUN/PAUSE/STOP │  │ CLOSED → OPEN  │
//! └────────────────┘  └────────────────┘
//! ```

pub mod breaker;
pub mod cycle;
pub mod killswitch;

pub use breaker::{CircuitBreaker, CircuitState};
pub use cycle::{CycleOrchestrator, CycleOutcome, Phase};
pub use killswitch::KillSwitchMonitor;

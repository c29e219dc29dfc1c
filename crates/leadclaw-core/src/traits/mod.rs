//! Collaborator seams. The orchestration core talks to every external
//! dependency through one of these traits and branches only on typed
//! outcomes — never on raw external state.

pub mod evaluator;
pub mod executor;
pub mod record_store;
pub mod scraper;

pub use evaluator::{RuleEvaluator, Verdict};
pub use executor::{ActionExecutor, ActionFailure, ActionOutcome};
pub use record_store::RecordStore;
pub use scraper::Scraper;

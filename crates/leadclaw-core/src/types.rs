//! Core data model — candidates, activities, and the control signal.
//!
//! Everything here round-trips through the external tabular store as JSON
//! rows, so the serde names are the store's column values (uppercase status
//! strings, snake_case keys).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter status of a candidate. Transitions are one-directional:
/// `Pending` → (`Pass` | `Fail` | `Error`). The core never reverts one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateStatus {
    #[default]
    Pending,
    Pass,
    Fail,
    Error,
}

impl CandidateStatus {
    /// Whether moving to `next` is a forward transition. Used to assert
    /// status monotonicity; the orchestrator never writes a backward move.
    pub fn advances_to(self, next: CandidateStatus) -> bool {
        match (self, next) {
            (a, b) if a == b => true,
            (CandidateStatus::Pending, _) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Pending => "PENDING",
            CandidateStatus::Pass => "PASS",
            CandidateStatus::Fail => "FAIL",
            CandidateStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outreach status of a `Pass` candidate: `NotSent` → `Sent`, one way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngageStatus {
    #[default]
    NotSent,
    Sent,
}

impl EngageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngageStatus::NotSent => "NOT_SENT",
            EngageStatus::Sent => "SENT",
        }
    }
}

impl std::fmt::Display for EngageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered subject of outreach — one row in the candidates table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable identifier, the store row key. Unique within the store.
    pub id: String,
    /// Display handle — the identity actions run against.
    pub handle: String,
    #[serde(default)]
    pub bio: String,
    /// Follower-like metric reported by the scraper.
    #[serde(default)]
    pub followers: u64,
    /// Keyword that surfaced this candidate.
    #[serde(default)]
    pub keyword: String,
    pub discovered_at: DateTime<Utc>,
    #[serde(default)]
    pub status: CandidateStatus,
    /// Reason string from the rule evaluator (pass or fail).
    #[serde(default)]
    pub filter_reason: Option<String>,
    #[serde(default)]
    pub engage: EngageStatus,
    /// Last time an action touched this candidate.
    #[serde(default)]
    pub engaged_at: Option<DateTime<Utc>>,
    /// Per-candidate error log written by the engagement phase.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl Candidate {
    /// Build a fresh `Pending` candidate from a scraped profile.
    pub fn from_profile(profile: ScrapedProfile, keyword: &str) -> Self {
        Self {
            id: profile.id,
            handle: profile.handle,
            bio: profile.bio,
            followers: profile.followers,
            keyword: keyword.to_string(),
            discovered_at: Utc::now(),
            status: CandidateStatus::Pending,
            filter_reason: None,
            engage: EngageStatus::NotSent,
            engaged_at: None,
            last_error: None,
        }
    }

    /// Ready for the engagement phase: passed the filter, not yet contacted.
    pub fn is_ready(&self) -> bool {
        self.status == CandidateStatus::Pass && self.engage == EngageStatus::NotSent
    }
}

/// Raw profile as returned by a scraper, before it becomes a store row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedProfile {
    pub id: String,
    pub handle: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub followers: u64,
}

/// The closed set of engagement action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Direct message — the highest-value action.
    Dm,
    Like,
    Repost,
    Comment,
}

impl ActivityKind {
    /// Fixed priority rank: lower = higher priority. `Dm` always plans first.
    pub fn rank(&self) -> u8 {
        match self {
            ActivityKind::Dm => 0,
            ActivityKind::Like => 1,
            ActivityKind::Repost => 2,
            ActivityKind::Comment => 3,
        }
    }

    /// Kinds that are invalid without a payload (message/comment text).
    /// `Like`/`Repost` resolve their target from the handle alone.
    pub fn requires_payload(&self) -> bool {
        matches!(self, ActivityKind::Dm | ActivityKind::Comment)
    }

    /// All kinds, in rank order.
    pub fn all() -> [ActivityKind; 4] {
        [
            ActivityKind::Dm,
            ActivityKind::Like,
            ActivityKind::Repost,
            ActivityKind::Comment,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Dm => "dm",
            ActivityKind::Like => "like",
            ActivityKind::Repost => "repost",
            ActivityKind::Comment => "comment",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned engagement action for the current cycle. Created fresh each
/// cycle by the planner, consumed once by the orchestrator, never persisted
/// — the candidate row is the durable record of completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub candidate_id: String,
    pub handle: String,
    /// Kind-specific payload, opaque to the core (DM text, comment text).
    pub payload: Option<String>,
    /// Intended execution slot, drawn from the configured daytime interval.
    pub scheduled_at: DateTime<Utc>,
    /// Explicit priority rank copied from the kind at planning time.
    pub rank: u8,
}

impl Activity {
    pub fn new(
        kind: ActivityKind,
        candidate: &Candidate,
        payload: Option<String>,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            candidate_id: candidate.id.clone(),
            handle: candidate.handle.clone(),
            payload,
            scheduled_at,
            rank: kind.rank(),
        }
    }
}

/// A partial row update applied by the store adapter. `None` fields are
/// left untouched, so every constructor below encodes one forward-only
/// transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub id: String,
    pub status: Option<CandidateStatus>,
    pub filter_reason: Option<String>,
    pub engage: Option<EngageStatus>,
    pub engaged_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl StatusUpdate {
    /// Filter verdict: `Pending` → `Pass`/`Fail`/`Error` with a reason.
    pub fn verdict(id: &str, status: CandidateStatus, reason: &str) -> Self {
        Self {
            id: id.to_string(),
            status: Some(status),
            filter_reason: Some(reason.to_string()),
            ..Default::default()
        }
    }

    /// Confirmed outreach: `NotSent` → `Sent` plus timestamp.
    pub fn sent(id: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            engage: Some(EngageStatus::Sent),
            engaged_at: Some(at),
            ..Default::default()
        }
    }

    /// Secondary action confirmed — touch the timestamp only.
    pub fn touched(id: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            engaged_at: Some(at),
            ..Default::default()
        }
    }

    /// Per-candidate error log entry; no status change.
    pub fn errored(id: &str, message: &str) -> Self {
        Self {
            id: id.to_string(),
            last_error: Some(message.to_string()),
            ..Default::default()
        }
    }
}

/// Operator kill switch, read from one control cell in the store.
/// Owned by the operator; read-only for the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlSignal {
    Run,
    Pause,
    Stop,
}

impl ControlSignal {
    /// Parse a raw cell value. Unrecognized input fails open to `Run` so a
    /// typo in the control cell never strands the pipeline.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PAUSE" => ControlSignal::Pause,
            "STOP" => ControlSignal::Stop,
            _ => ControlSignal::Run,
        }
    }
}

impl std::fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlSignal::Run => write!(f, "RUN"),
            ControlSignal::Pause => write!(f, "PAUSE"),
            ControlSignal::Stop => write!(f, "STOP"),
        }
    }
}

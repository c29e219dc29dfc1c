//! LeadClaw configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeadClawConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl LeadClawConfig {
    /// Load config from the default path (~/.leadclaw/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::LeadClawError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::LeadClawError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LeadClawError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the LeadClaw home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".leadclaw")
    }
}

/// External record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend: "http" (remote tabular API) or "memory" (in-process, demo).
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub base_url: String,
    /// Bearer token for the store API, if it wants one.
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_candidates_table")]
    pub candidates_table: String,
    /// Name of the kill-switch control cell.
    #[serde(default = "default_control_cell")]
    pub control_cell: String,
    /// Write-verify re-check schedule: three escalating delays.
    #[serde(default = "default_verify_delays")]
    pub verify_delays_secs: Vec<u64>,
    /// Retry schedule for transient store requests.
    #[serde(default = "default_request_retries")]
    pub request_retry_secs: Vec<u64>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend() -> String { "memory".into() }
fn default_candidates_table() -> String { "candidates".into() }
fn default_control_cell() -> String { "kill_switch".into() }
fn default_verify_delays() -> Vec<u64> { vec![2, 5, 10] }
fn default_request_retries() -> Vec<u64> { vec![1, 3] }
fn default_request_timeout() -> u64 { 30 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            base_url: String::new(),
            api_token: String::new(),
            candidates_table: default_candidates_table(),
            control_cell: default_control_cell(),
            verify_delays_secs: default_verify_delays(),
            request_retry_secs: default_request_retries(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Scrape phase configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_per_keyword_limit")]
    pub per_keyword_limit: usize,
    /// Randomized pause between keywords, seconds.
    #[serde(default = "default_keyword_delay_min")]
    pub keyword_delay_min_secs: u64,
    #[serde(default = "default_keyword_delay_max")]
    pub keyword_delay_max_secs: u64,
}

fn default_keywords() -> Vec<String> { vec!["indie founder".into(), "solo builder".into()] }
fn default_per_keyword_limit() -> usize { 30 }
fn default_keyword_delay_min() -> u64 { 10 }
fn default_keyword_delay_max() -> u64 { 40 }

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            per_keyword_limit: default_per_keyword_limit(),
            keyword_delay_min_secs: default_keyword_delay_min(),
            keyword_delay_max_secs: default_keyword_delay_max(),
        }
    }
}

/// Built-in keyword rule evaluator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_min_followers")]
    pub min_followers: u64,
    /// 0 = no upper cap.
    #[serde(default)]
    pub max_followers: u64,
    /// Pass requires at least one of these in the bio (empty = no check).
    #[serde(default)]
    pub require_bio_any: Vec<String>,
    /// Any of these in the bio fails the candidate.
    #[serde(default = "default_reject_bio")]
    pub reject_bio_any: Vec<String>,
}

fn default_min_followers() -> u64 { 100 }
fn default_reject_bio() -> Vec<String> { vec!["crypto".into(), "giveaway".into()] }

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            min_followers: default_min_followers(),
            max_followers: 0,
            require_bio_any: Vec::new(),
            reject_bio_any: default_reject_bio(),
        }
    }
}

/// Rolling rate limits per action kind. A value of 0 disables the kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_dm_hour")]
    pub dm_per_hour: u32,
    #[serde(default = "default_dm_day")]
    pub dm_per_day: u32,
    #[serde(default = "default_like_hour")]
    pub like_per_hour: u32,
    #[serde(default = "default_like_day")]
    pub like_per_day: u32,
    #[serde(default = "default_repost_hour")]
    pub repost_per_hour: u32,
    #[serde(default = "default_repost_day")]
    pub repost_per_day: u32,
    #[serde(default = "default_comment_hour")]
    pub comment_per_hour: u32,
    #[serde(default = "default_comment_day")]
    pub comment_per_day: u32,
}

fn default_dm_hour() -> u32 { 5 }
fn default_dm_day() -> u32 { 30 }
fn default_like_hour() -> u32 { 20 }
fn default_like_day() -> u32 { 120 }
fn default_repost_hour() -> u32 { 5 }
fn default_repost_day() -> u32 { 25 }
fn default_comment_hour() -> u32 { 8 }
fn default_comment_day() -> u32 { 40 }

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            dm_per_hour: default_dm_hour(),
            dm_per_day: default_dm_day(),
            like_per_hour: default_like_hour(),
            like_per_day: default_like_day(),
            repost_per_hour: default_repost_hour(),
            repost_per_day: default_repost_day(),
            comment_per_hour: default_comment_hour(),
            comment_per_day: default_comment_day(),
        }
    }
}

/// Activity planner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Daytime scheduling interval, UTC hours [start, end).
    #[serde(default = "default_hours_start")]
    pub active_hours_start: u32,
    #[serde(default = "default_hours_end")]
    pub active_hours_end: u32,
    /// Per-kind assignment chance for secondary activities (0.0–1.0).
    /// A chance is a ceiling on behavior, not a guarantee: quota left
    /// unused by the dice stays unused that cycle.
    #[serde(default = "default_like_chance")]
    pub like_chance: f64,
    #[serde(default = "default_repost_chance")]
    pub repost_chance: f64,
    #[serde(default = "default_comment_chance")]
    pub comment_chance: f64,
    /// DM text template; `{handle}` and `{keyword}` are substituted.
    /// Empty = DMs are omitted from plans (with a warning).
    #[serde(default = "default_dm_template")]
    pub dm_template: String,
    /// Comment text pool, one picked at random per comment activity.
    /// Empty = comments are omitted from plans.
    #[serde(default = "default_comment_templates")]
    pub comment_templates: Vec<String>,
}

fn default_hours_start() -> u32 { 9 }
fn default_hours_end() -> u32 { 21 }
fn default_like_chance() -> f64 { 0.5 }
fn default_repost_chance() -> f64 { 0.2 }
fn default_comment_chance() -> f64 { 0.25 }
fn default_dm_template() -> String {
    "Hey {handle} — saw you through \"{keyword}\" and wanted to reach out.".into()
}
fn default_comment_templates() -> Vec<String> {
    vec!["Great perspective 👏".into(), "This resonates — thanks for sharing.".into()]
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            active_hours_start: default_hours_start(),
            active_hours_end: default_hours_end(),
            like_chance: default_like_chance(),
            repost_chance: default_repost_chance(),
            comment_chance: default_comment_chance(),
            dm_template: default_dm_template(),
            comment_templates: default_comment_templates(),
        }
    }
}

/// Cycle orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sleep after a fully successful cycle.
    #[serde(default = "default_cycle_delay")]
    pub cycle_delay_secs: u64,
    /// Escalating sleep schedule after failed cycles (clamped at the last
    /// entry while the failure streak continues).
    #[serde(default = "default_cycle_retry")]
    pub cycle_retry_secs: Vec<u64>,
    /// Consecutive failed cycles before the circuit breaker opens.
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,
    /// Retries of a single activity on TRANSIENT failures.
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,
    /// Randomized pause between engagement actions, seconds.
    #[serde(default = "default_action_delay_min")]
    pub action_delay_min_secs: u64,
    #[serde(default = "default_action_delay_max")]
    pub action_delay_max_secs: u64,
    /// How often to re-read the control cell while paused.
    #[serde(default = "default_pause_poll")]
    pub pause_poll_secs: u64,
}

fn default_cycle_delay() -> u64 { 3600 }
fn default_cycle_retry() -> Vec<u64> { vec![300, 600, 1200] }
fn default_breaker_threshold() -> u32 { 5 }
fn default_transient_retries() -> u32 { 2 }
fn default_action_delay_min() -> u64 { 30 }
fn default_action_delay_max() -> u64 { 90 }
fn default_pause_poll() -> u64 { 30 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_delay_secs: default_cycle_delay(),
            cycle_retry_secs: default_cycle_retry(),
            breaker_threshold: default_breaker_threshold(),
            transient_retries: default_transient_retries(),
            action_delay_min_secs: default_action_delay_min(),
            action_delay_max_secs: default_action_delay_max(),
            pause_poll_secs: default_pause_poll(),
        }
    }
}

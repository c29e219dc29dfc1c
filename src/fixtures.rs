//! Reference collaborators: a deterministic scraper, a config-driven
//! rule evaluator, and an executor that rehearses actions instead of
//! performing them. Real scraper/executor integrations plug in behind
//! the same traits.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::info;

use leadclaw_core::config::RulesConfig;
use leadclaw_core::error::Result;
use leadclaw_core::traits::{ActionExecutor, ActionOutcome, RuleEvaluator, Scraper, Verdict};
use leadclaw_core::types::{Activity, Candidate, ScrapedProfile};

const FIXTURE_BIOS: &[&str] = &[
    "Building a bootstrapped SaaS in public. DMs open.",
    "Indie founder. Shipping weekly, tweeting daily.",
    "Solo builder documenting the journey from 0 to ramen profitable.",
    "Crypto degen, NFT flipper, to the moon 🚀",
    "Designer turned founder. I talk about pricing and churn.",
    "Giveaway every Friday! Follow + RT to enter.",
    "Writing about growth loops and cold outreach that doesn't suck.",
    "Maker of small bets. Currently: a calendar tool for freelancers.",
];

/// Emits a stable set of synthetic profiles per keyword, so repeated
/// cycles exercise the dedup path exactly like a real source would.
pub struct FixtureScraper;

impl FixtureScraper {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FixtureScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scraper for FixtureScraper {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn scrape(&self, keyword: &str, limit: usize) -> Result<Vec<ScrapedProfile>> {
        let slug: String = keyword
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let mut rng = StdRng::seed_from_u64(seed_for(keyword));
        let count = limit.min(8);
        let profiles = (1..=count)
            .map(|i| {
                let bio = FIXTURE_BIOS[rng.gen_range(0..FIXTURE_BIOS.len())];
                ScrapedProfile {
                    id: format!("{slug}-{i:03}"),
                    handle: format!("@{slug}_{i}"),
                    bio: bio.to_string(),
                    followers: rng.gen_range(20..5_000),
                }
            })
            .collect();
        Ok(profiles)
    }
}

fn seed_for(keyword: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    keyword.hash(&mut hasher);
    hasher.finish()
}

/// Pure, local evaluation against the `[rules]` config section: follower
/// range plus required / banned bio terms.
pub struct KeywordRuleEvaluator {
    rules: RulesConfig,
}

impl KeywordRuleEvaluator {
    pub fn new(rules: RulesConfig) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl RuleEvaluator for KeywordRuleEvaluator {
    fn name(&self) -> &str {
        "keyword-rules"
    }

    async fn evaluate(&self, candidate: &Candidate) -> Result<Verdict> {
        if candidate.followers < self.rules.min_followers {
            return Ok(Verdict::fail(&format!(
                "only {} followers (min {})",
                candidate.followers, self.rules.min_followers
            )));
        }
        if self.rules.max_followers > 0 && candidate.followers > self.rules.max_followers {
            return Ok(Verdict::fail(&format!(
                "{} followers exceeds cap of {}",
                candidate.followers, self.rules.max_followers
            )));
        }
        let bio = candidate.bio.to_lowercase();
        if let Some(banned) = self
            .rules
            .reject_bio_any
            .iter()
            .find(|term| bio.contains(&term.to_lowercase()))
        {
            return Ok(Verdict::fail(&format!("bio mentions \"{banned}\"")));
        }
        if !self.rules.require_bio_any.is_empty()
            && !self
                .rules
                .require_bio_any
                .iter()
                .any(|term| bio.contains(&term.to_lowercase()))
        {
            return Ok(Verdict::fail("bio matches none of the required terms"));
        }
        Ok(Verdict::pass("follower range ok, bio clean"))
    }
}

/// Logs every planned action and reports it completed. Lets a full
/// pipeline run be rehearsed end to end with zero outbound traffic.
pub struct DryRunExecutor;

#[async_trait]
impl ActionExecutor for DryRunExecutor {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn execute(&self, activity: &Activity) -> ActionOutcome {
        match &activity.payload {
            Some(text) => info!("🎭 [dry-run] {} → {}: {text}", activity.kind, activity.handle),
            None => info!("🎭 [dry-run] {} → {}", activity.kind, activity.handle),
        }
        ActionOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadclaw_core::types::{CandidateStatus, EngageStatus};

    fn candidate(followers: u64, bio: &str) -> Candidate {
        Candidate {
            id: "c-001".into(),
            handle: "@c1".into(),
            bio: bio.into(),
            followers,
            keyword: "indie".into(),
            discovered_at: Utc::now(),
            status: CandidateStatus::Pending,
            filter_reason: None,
            engage: EngageStatus::NotSent,
            engaged_at: None,
            last_error: None,
        }
    }

    #[tokio::test]
    async fn test_scraper_is_deterministic_per_keyword() {
        let scraper = FixtureScraper::new();
        let a = scraper.scrape("indie founder", 8).await.unwrap();
        let b = scraper.scrape("indie founder", 8).await.unwrap();
        assert_eq!(a.len(), 8);
        assert_eq!(a[0].id, b[0].id);
        assert_eq!(a[0].followers, b[0].followers);

        let other = scraper.scrape("growth hacker", 8).await.unwrap();
        assert_ne!(a[0].id, other[0].id);
    }

    #[tokio::test]
    async fn test_scraper_respects_limit() {
        let scraper = FixtureScraper::new();
        let profiles = scraper.scrape("indie", 3).await.unwrap();
        assert_eq!(profiles.len(), 3);
    }

    #[tokio::test]
    async fn test_evaluator_rejects_low_followers() {
        let eval = KeywordRuleEvaluator::new(RulesConfig::default());
        let verdict = eval.evaluate(&candidate(10, "builder")).await.unwrap();
        assert!(!verdict.passed);
        assert!(verdict.reason.contains("only 10 followers"));
    }

    #[tokio::test]
    async fn test_evaluator_rejects_banned_bio_terms() {
        let eval = KeywordRuleEvaluator::new(RulesConfig::default());
        let verdict = eval
            .evaluate(&candidate(500, "Crypto degen to the moon"))
            .await
            .unwrap();
        assert!(!verdict.passed);
        assert!(verdict.reason.contains("crypto"));
    }

    #[tokio::test]
    async fn test_evaluator_enforces_required_terms() {
        let mut rules = RulesConfig::default();
        rules.require_bio_any = vec!["founder".into()];
        let eval = KeywordRuleEvaluator::new(rules);

        let miss = eval.evaluate(&candidate(500, "I like trains")).await.unwrap();
        assert!(!miss.passed);

        let hit = eval
            .evaluate(&candidate(500, "Indie founder, DMs open"))
            .await
            .unwrap();
        assert!(hit.passed);
    }

    #[tokio::test]
    async fn test_evaluator_caps_followers_when_configured() {
        let mut rules = RulesConfig::default();
        rules.max_followers = 1_000;
        let eval = KeywordRuleEvaluator::new(rules);
        let verdict = eval.evaluate(&candidate(50_000, "builder")).await.unwrap();
        assert!(!verdict.passed);
        assert!(verdict.reason.contains("exceeds cap"));
    }

    #[tokio::test]
    async fn test_dry_run_executor_always_completes() {
        let exec = DryRunExecutor;
        let activity = Activity::new(
            leadclaw_core::types::ActivityKind::Like,
            &candidate(500, "builder"),
            None,
            Utc::now(),
        );
        assert!(matches!(exec.execute(&activity).await, ActionOutcome::Completed));
    }
}

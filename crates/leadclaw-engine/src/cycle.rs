//! Cycle orchestrator — drives the scrape → filter → engage loop.
//!
//! One cycle walks the phases in order, consulting the kill switch at
//! every phase boundary. The store is the only state that survives a
//! cycle; plans, verdict batches, and scrape results are all rebuilt
//! from it each time, so a crash mid-cycle costs at most one cycle of
//! work.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

use leadclaw_core::config::LeadClawConfig;
use leadclaw_core::error::Result;
use leadclaw_core::retry::RetryPolicy;
use leadclaw_core::traits::{ActionExecutor, ActionOutcome, RuleEvaluator, Scraper};
use leadclaw_core::types::{Activity, ActivityKind, Candidate, CandidateStatus, ControlSignal, StatusUpdate};
use leadclaw_scheduler::{ActivityPlanner, RateLimiter};
use leadclaw_store::StoreAdapter;

use crate::breaker::{CircuitBreaker, CircuitState};
use crate::killswitch::KillSwitchMonitor;

/// Pipeline phase, for logs and status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Scraping,
    Filtering,
    Engaging,
    Cooldown,
    Stopped,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Starting => "STARTING",
            Phase::Scraping => "SCRAPING",
            Phase::Filtering => "FILTERING",
            Phase::Engaging => "ENGAGING",
            Phase::Cooldown => "COOLDOWN",
            Phase::Stopped => "STOPPED",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// All phases ran.
    Completed,
    /// The operator's STOP signal ended the cycle at a phase boundary.
    Stopped,
}

/// Owns one pass of the outreach pipeline and loops it forever (or once).
pub struct CycleOrchestrator {
    config: LeadClawConfig,
    adapter: Arc<StoreAdapter>,
    scraper: Box<dyn Scraper>,
    evaluator: Box<dyn RuleEvaluator>,
    executor: Box<dyn ActionExecutor>,
    planner: ActivityPlanner,
    limiter: RateLimiter,
    killswitch: KillSwitchMonitor,
    breaker: CircuitBreaker,
    phase: Phase,
    cycle: u64,
    cycles_completed: u64,
}

impl CycleOrchestrator {
    pub fn new(
        config: LeadClawConfig,
        adapter: Arc<StoreAdapter>,
        scraper: Box<dyn Scraper>,
        evaluator: Box<dyn RuleEvaluator>,
        executor: Box<dyn ActionExecutor>,
    ) -> Self {
        let limiter = RateLimiter::new(&config.limits);
        let planner = ActivityPlanner::new(config.planner.clone());
        let killswitch = KillSwitchMonitor::new(
            adapter.clone(),
            Duration::from_secs(config.engine.pause_poll_secs.max(1)),
        );
        let breaker = CircuitBreaker::new(config.engine.breaker_threshold);
        Self {
            config,
            adapter,
            scraper,
            evaluator,
            executor,
            planner,
            limiter,
            killswitch,
            breaker,
            phase: Phase::Starting,
            cycle: 0,
            cycles_completed: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run cycles until the operator stops us or the circuit opens.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "🚀 Engine starting (scraper: {}, evaluator: {}, executor: {})",
            self.scraper.name(),
            self.evaluator.name(),
            self.executor.name()
        );
        let retry = RetryPolicy::from_secs(&self.config.engine.cycle_retry_secs);
        loop {
            match self.run_cycle().await {
                Ok(CycleOutcome::Stopped) => {
                    self.shutdown("operator STOP").await;
                    return Ok(());
                }
                Ok(CycleOutcome::Completed) => {
                    self.breaker.record_success();
                    if self.stop_requested().await {
                        self.shutdown("operator STOP").await;
                        return Ok(());
                    }
                    self.set_phase(Phase::Cooldown);
                    let delay = Duration::from_secs(self.config.engine.cycle_delay_secs);
                    info!(
                        "😴 Cycle {} complete ({} total), cooling down for {:?}",
                        self.cycle, self.cycles_completed, delay
                    );
                    if self.cooldown_sleep(delay).await {
                        self.shutdown("operator STOP").await;
                        return Ok(());
                    }
                }
                Err(e) => {
                    let state = self.breaker.record_failure(&e);
                    if state == CircuitState::Open || e.is_fatal() {
                        self.shutdown("unrecoverable failure").await;
                        return Err(e);
                    }
                    if self.stop_requested().await {
                        self.shutdown("operator STOP").await;
                        return Ok(());
                    }
                    let backoff = retry.backoff_for(self.breaker.failures());
                    warn!("⚠️ Cycle {} failed: {e}, next attempt in {:?}", self.cycle, backoff);
                    self.set_phase(Phase::Cooldown);
                    if self.cooldown_sleep(backoff).await {
                        self.shutdown("operator STOP").await;
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Run exactly one cycle, then release the executor session.
    pub async fn run_once(&mut self) -> Result<CycleOutcome> {
        let result = self.run_cycle().await;
        match &result {
            Ok(CycleOutcome::Completed) => {
                self.breaker.record_success();
                self.shutdown("single cycle complete").await;
            }
            Ok(CycleOutcome::Stopped) => self.shutdown("operator STOP").await,
            Err(e) => {
                self.breaker.record_failure(e);
                self.shutdown("cycle failed").await;
            }
        }
        result
    }

    /// One pass through the phases. The kill switch is consulted at every
    /// phase boundary: PAUSE holds right here, STOP ends the cycle
    /// without entering the next phase.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.cycle += 1;
        self.set_phase(Phase::Starting);
        info!("🔄 Cycle {} starting", self.cycle);
        if self.stop_requested().await {
            return Ok(CycleOutcome::Stopped);
        }

        self.set_phase(Phase::Scraping);
        let discovered = self.scrape_phase().await?;
        if self.stop_requested().await {
            return Ok(CycleOutcome::Stopped);
        }

        self.set_phase(Phase::Filtering);
        let (passed, filtered_out) = self.filter_phase().await?;
        if self.stop_requested().await {
            return Ok(CycleOutcome::Stopped);
        }

        self.set_phase(Phase::Engaging);
        let executed = self.engage_phase().await?;

        self.cycles_completed += 1;
        info!(
            "✅ Cycle {}: {discovered} discovered, {passed} passed, {filtered_out} filtered out, {executed} action(s) done",
            self.cycle
        );
        Ok(CycleOutcome::Completed)
    }

    /// Scrape every configured keyword, dedup against the store and this
    /// cycle's own finds, and append what is genuinely new.
    async fn scrape_phase(&self) -> Result<usize> {
        let keywords = &self.config.scrape.keywords;
        if keywords.is_empty() {
            warn!("⚠️ No scrape keywords configured");
            return Ok(0);
        }
        let mut seen = self.adapter.existing_keys().await?;
        let mut fresh: Vec<Candidate> = Vec::new();
        for (i, keyword) in keywords.iter().enumerate() {
            let profiles = self
                .scraper
                .scrape(keyword, self.config.scrape.per_keyword_limit)
                .await?;
            let found = profiles.len();
            let mut new_here = 0usize;
            for profile in profiles {
                if profile.id.trim().is_empty() {
                    warn!("⚠️ Scraper returned a profile without an id, dropping it");
                    continue;
                }
                if seen.contains(&profile.id) || seen.contains(&profile.handle) {
                    continue;
                }
                seen.insert(profile.id.clone());
                if !profile.handle.trim().is_empty() {
                    seen.insert(profile.handle.clone());
                }
                fresh.push(Candidate::from_profile(profile, keyword));
                new_here += 1;
            }
            debug!("🔎 \"{keyword}\": {new_here} new of {found} scraped");
            if i + 1 < keywords.len() {
                self.jitter_sleep(
                    self.config.scrape.keyword_delay_min_secs,
                    self.config.scrape.keyword_delay_max_secs,
                )
                .await;
            }
        }
        if fresh.is_empty() {
            info!("🔎 Scrape pass found nothing new");
            return Ok(0);
        }
        let appended = self.adapter.append_candidates(&fresh).await?;
        info!("📥 Discovered {appended} new candidate(s)");
        Ok(appended)
    }

    /// Evaluate every pending candidate and write the verdicts back in one
    /// batch. A failing evaluator marks only that candidate; a failing
    /// batch write gets one more shot at the failed subset before the
    /// cycle is declared failed.
    async fn filter_phase(&self) -> Result<(usize, usize)> {
        let pending = self.adapter.pending().await?;
        if pending.is_empty() {
            info!("🧮 No pending candidates to filter");
            return Ok((0, 0));
        }
        info!(
            "🧮 Filtering {} pending candidate(s) via {}",
            pending.len(),
            self.evaluator.name()
        );

        let mut updates = Vec::with_capacity(pending.len());
        let (mut passed, mut rejected, mut errored) = (0usize, 0usize, 0usize);
        for candidate in &pending {
            match self.evaluator.evaluate(candidate).await {
                Ok(verdict) if verdict.passed => {
                    passed += 1;
                    updates.push(StatusUpdate::verdict(
                        &candidate.id,
                        CandidateStatus::Pass,
                        &verdict.reason,
                    ));
                }
                Ok(verdict) => {
                    rejected += 1;
                    updates.push(StatusUpdate::verdict(
                        &candidate.id,
                        CandidateStatus::Fail,
                        &verdict.reason,
                    ));
                }
                Err(e) if e.is_permission() => return Err(e),
                Err(e) => {
                    errored += 1;
                    warn!("⚠️ Evaluator failed on {}: {e}", candidate.id);
                    updates.push(StatusUpdate::verdict(
                        &candidate.id,
                        CandidateStatus::Error,
                        &e.to_string(),
                    ));
                }
            }
        }

        let mut failed = self.adapter.update_batch(&updates).await;
        if !failed.is_empty() {
            if let Some(pos) = failed.iter().position(|f| f.error.is_permission()) {
                return Err(failed.swap_remove(pos).error);
            }
            warn!(
                "⚠️ {} verdict update(s) failed, retrying that subset",
                failed.len()
            );
            let retry_batch: Vec<StatusUpdate> = failed.into_iter().map(|f| f.update).collect();
            let mut still_failed = self.adapter.update_batch(&retry_batch).await;
            if !still_failed.is_empty() {
                return Err(still_failed.swap_remove(0).error);
            }
        }

        info!("✅ Verdicts: {passed} passed, {rejected} rejected, {errored} errored");
        Ok((passed, rejected + errored))
    }

    /// Build this cycle's plan and execute it sequentially, recording
    /// quota and store markers per confirmed action. A failed activity
    /// marks its own row and never takes the rest of the plan down with
    /// it; only a store write failure aborts the phase.
    async fn engage_phase(&mut self) -> Result<usize> {
        let ready = self.adapter.ready_for_engagement().await?;
        let now = Utc::now();
        let plan = self.planner.build_plan(&ready, &mut self.limiter, now);
        if plan.is_empty() {
            info!("💤 Nothing to engage this cycle");
            return Ok(0);
        }
        info!(
            "🎯 Executing {} planned activities via {}",
            plan.len(),
            self.executor.name()
        );

        let mut executed = 0usize;
        for (i, activity) in plan.iter().enumerate() {
            match self.execute_with_retries(activity).await {
                ActionOutcome::Completed => {
                    self.limiter.record(activity.kind);
                    let update = if activity.kind == ActivityKind::Dm {
                        StatusUpdate::sent(&activity.candidate_id, Utc::now())
                    } else {
                        StatusUpdate::touched(&activity.candidate_id, Utc::now())
                    };
                    self.adapter.update_status(&update).await?;
                    executed += 1;
                    debug!("✅ {} to {} confirmed", activity.kind, activity.handle);
                }
                ActionOutcome::Failed(failure) => {
                    warn!("⚠️ {} to {} failed: {failure}", activity.kind, activity.handle);
                    self.adapter
                        .update_status(&StatusUpdate::errored(
                            &activity.candidate_id,
                            failure.as_str(),
                        ))
                        .await?;
                }
            }
            if i + 1 < plan.len() {
                self.jitter_sleep(
                    self.config.engine.action_delay_min_secs,
                    self.config.engine.action_delay_max_secs,
                )
                .await;
            }
        }
        Ok(executed)
    }

    /// Execute one activity, retrying transient faults a bounded number
    /// of times. Every other failure comes back as-is.
    async fn execute_with_retries(&self, activity: &Activity) -> ActionOutcome {
        let budget = self.config.engine.transient_retries;
        let mut attempt = 0u32;
        loop {
            let outcome = self.executor.execute(activity).await;
            match outcome {
                ActionOutcome::Failed(f) if f.is_transient() && attempt < budget => {
                    attempt += 1;
                    warn!(
                        "🔁 {} to {} hit a transient fault, retry {attempt}/{budget}",
                        activity.kind, activity.handle
                    );
                    self.jitter_sleep(
                        self.config.engine.action_delay_min_secs,
                        self.config.engine.action_delay_max_secs,
                    )
                    .await;
                }
                other => return other,
            }
        }
    }

    async fn stop_requested(&self) -> bool {
        matches!(self.killswitch.gate().await, ControlSignal::Stop)
    }

    /// Cooldown that stays responsive to the kill switch: sleeps in
    /// poll-sized slices and re-reads the control cell between them.
    /// Returns true once the operator requests a stop.
    async fn cooldown_sleep(&self, total: Duration) -> bool {
        let poll = Duration::from_secs(self.config.engine.pause_poll_secs.max(1));
        let mut remaining = total;
        while !remaining.is_zero() {
            let slice = remaining.min(poll);
            tokio::time::sleep(slice).await;
            remaining -= slice;
            if self.stop_requested().await {
                return true;
            }
        }
        false
    }

    async fn shutdown(&mut self, reason: &str) {
        info!("🛑 Engine stopping: {reason}");
        self.set_phase(Phase::Stopped);
        self.executor.shutdown().await;
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!("Phase: {} → {}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Sleep a random number of whole seconds in `[min, max]`. Zeroes
    /// skip the sleep entirely.
    async fn jitter_sleep(&self, min_secs: u64, max_secs: u64) {
        let secs = if max_secs <= min_secs {
            min_secs
        } else {
            rand::thread_rng().gen_range(min_secs..=max_secs)
        };
        if secs > 0 {
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use leadclaw_core::error::LeadClawError;
    use leadclaw_core::traits::{ActionFailure, Verdict};
    use leadclaw_core::types::ScrapedProfile;
    use leadclaw_store::MemoryStore;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    fn profile(id: &str, followers: u64) -> ScrapedProfile {
        ScrapedProfile {
            id: id.into(),
            handle: format!("@{id}"),
            bio: "building in public".into(),
            followers,
        }
    }

    struct StubScraper {
        profiles: Vec<ScrapedProfile>,
        fail: bool,
    }

    #[async_trait]
    impl Scraper for StubScraper {
        fn name(&self) -> &str {
            "stub-scraper"
        }

        async fn scrape(&self, _keyword: &str, limit: usize) -> Result<Vec<ScrapedProfile>> {
            if self.fail {
                return Err(LeadClawError::Scrape("browser session died".into()));
            }
            Ok(self.profiles.iter().take(limit).cloned().collect())
        }
    }

    struct StubEvaluator {
        min_followers: u64,
        error_ids: Vec<String>,
        /// Side effect: flip the control cell mid-filter, as an operator
        /// editing the sheet during a cycle would.
        set_control: Option<(Arc<MemoryStore>, &'static str)>,
    }

    impl StubEvaluator {
        fn passing() -> Self {
            Self {
                min_followers: 100,
                error_ids: Vec::new(),
                set_control: None,
            }
        }
    }

    #[async_trait]
    impl RuleEvaluator for StubEvaluator {
        fn name(&self) -> &str {
            "stub-rules"
        }

        async fn evaluate(&self, candidate: &Candidate) -> Result<Verdict> {
            if let Some((store, value)) = &self.set_control {
                store.set_control(value).await;
            }
            if self.error_ids.contains(&candidate.id) {
                return Err(LeadClawError::Evaluate("rules engine 500".into()));
            }
            if candidate.followers >= self.min_followers {
                Ok(Verdict::pass("enough followers"))
            } else {
                Ok(Verdict::fail("too few followers"))
            }
        }
    }

    #[derive(Clone)]
    struct RecordingExecutor {
        executed: Arc<Mutex<Vec<Activity>>>,
        script: Arc<Mutex<VecDeque<ActionOutcome>>>,
        shutdowns: Arc<Mutex<u32>>,
        /// Side effect: flip the control cell mid-engagement, as an
        /// operator reacting to the outreach would.
        set_control: Option<(Arc<MemoryStore>, &'static str)>,
    }

    impl RecordingExecutor {
        fn new(script: Vec<ActionOutcome>) -> Self {
            Self {
                executed: Arc::new(Mutex::new(Vec::new())),
                script: Arc::new(Mutex::new(script.into())),
                shutdowns: Arc::new(Mutex::new(0)),
                set_control: None,
            }
        }

        fn completing() -> Self {
            Self::new(Vec::new())
        }

        fn flipping_control(store: Arc<MemoryStore>, value: &'static str) -> Self {
            let mut this = Self::completing();
            this.set_control = Some((store, value));
            this
        }

        async fn calls(&self) -> Vec<Activity> {
            self.executed.lock().await.clone()
        }

        async fn shutdown_count(&self) -> u32 {
            *self.shutdowns.lock().await
        }
    }

    #[async_trait]
    impl ActionExecutor for RecordingExecutor {
        fn name(&self) -> &str {
            "recording"
        }

        async fn execute(&self, activity: &Activity) -> ActionOutcome {
            self.executed.lock().await.push(activity.clone());
            if let Some((store, value)) = &self.set_control {
                store.set_control(value).await;
            }
            self.script
                .lock()
                .await
                .pop_front()
                .unwrap_or(ActionOutcome::Completed)
        }

        async fn shutdown(&self) {
            *self.shutdowns.lock().await += 1;
        }
    }

    fn test_config() -> LeadClawConfig {
        let mut cfg = LeadClawConfig::default();
        cfg.scrape.keywords = vec!["indie".into()];
        cfg.scrape.keyword_delay_min_secs = 0;
        cfg.scrape.keyword_delay_max_secs = 0;
        cfg.engine.action_delay_min_secs = 0;
        cfg.engine.action_delay_max_secs = 0;
        cfg.engine.cycle_retry_secs = vec![0];
        cfg.store.verify_delays_secs = vec![0, 0, 0];
        cfg.store.request_retry_secs = vec![0];
        // Secondary actions off unless a test turns them on.
        cfg.planner.like_chance = 0.0;
        cfg.planner.repost_chance = 0.0;
        cfg.planner.comment_chance = 0.0;
        cfg
    }

    fn build(
        cfg: LeadClawConfig,
        store: Arc<MemoryStore>,
        scraper: StubScraper,
        evaluator: StubEvaluator,
        executor: RecordingExecutor,
    ) -> CycleOrchestrator {
        let adapter = Arc::new(StoreAdapter::new(store, &cfg.store));
        CycleOrchestrator::new(
            cfg,
            adapter,
            Box::new(scraper),
            Box::new(evaluator),
            Box::new(executor),
        )
    }

    #[tokio::test]
    async fn test_cycle_scrapes_filters_engages() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::completing();
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500), profile("b", 800)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        let outcome = engine.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Completed);
        assert_eq!(engine.cycles_completed(), 1);

        let rows = store.all_rows().await;
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row["status"], "PASS");
            assert_eq!(row["engage"], "SENT");
            assert!(row["engaged_at"].is_string());
        }
        let calls = executor.calls().await;
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|a| a.kind == ActivityKind::Dm));
    }

    #[tokio::test]
    async fn test_second_cycle_skips_known_candidates() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::completing();
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        engine.run_cycle().await.unwrap();
        engine.run_cycle().await.unwrap();

        assert_eq!(store.row_count().await, 1);
        // Engaged in cycle one; cycle two found nothing ready.
        assert_eq!(executor.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_candidates_are_not_engaged() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::completing();
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: vec![profile("big", 500), profile("small", 10)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        engine.run_cycle().await.unwrap();

        let rows = store.all_rows().await;
        let small = rows.iter().find(|r| r["id"] == "small").unwrap();
        assert_eq!(small["status"], "FAIL");
        assert_eq!(small["engage"], "NOT_SENT");
        assert_eq!(small["filter_reason"], "too few followers");

        let calls = executor.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].handle, "@big");
    }

    #[tokio::test]
    async fn test_evaluator_error_marks_only_that_row() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::completing();
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: vec![profile("fine", 500), profile("cursed", 500)],
                fail: false,
            },
            StubEvaluator {
                min_followers: 100,
                error_ids: vec!["cursed".into()],
                set_control: None,
            },
            executor.clone(),
        );

        let outcome = engine.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Completed);

        let rows = store.all_rows().await;
        let cursed = rows.iter().find(|r| r["id"] == "cursed").unwrap();
        assert_eq!(cursed["status"], "ERROR");
        let fine = rows.iter().find(|r| r["id"] == "fine").unwrap();
        assert_eq!(fine["status"], "PASS");
        assert_eq!(fine["engage"], "SENT");
    }

    #[tokio::test]
    async fn test_stop_during_filtering_skips_engagement() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::completing();
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500)],
                fail: false,
            },
            StubEvaluator {
                min_followers: 100,
                error_ids: Vec::new(),
                set_control: Some((store.clone(), "STOP")),
            },
            executor.clone(),
        );

        let outcome = engine.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Stopped);

        // Filtering finished (the verdict landed) but engagement never ran.
        let rows = store.all_rows().await;
        assert_eq!(rows[0]["status"], "PASS");
        assert_eq!(rows[0]["engage"], "NOT_SENT");
        assert!(executor.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_suspended_target_fails_only_that_activity() {
        let store = Arc::new(MemoryStore::new());
        let executor =
            RecordingExecutor::new(vec![ActionOutcome::Failed(ActionFailure::AccountSuspended)]);
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500), profile("b", 500)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        let outcome = engine.run_once().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Completed);
        assert!(!engine.breaker().is_open());
        // The dead target's row keeps the error; the other DM still went out.
        assert_eq!(executor.calls().await.len(), 2);
        let rows = store.all_rows().await;
        let suspended = rows
            .iter()
            .filter(|r| r["last_error"] == "ACCOUNT_SUSPENDED" && r["engage"] == "NOT_SENT")
            .count();
        let sent = rows.iter().filter(|r| r["engage"] == "SENT").count();
        assert_eq!(suspended, 1);
        assert_eq!(sent, 1);
    }

    #[tokio::test]
    async fn test_rate_limited_activity_does_not_abort_plan() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::new(vec![
            ActionOutcome::Completed,
            ActionOutcome::Failed(ActionFailure::RateLimited),
        ]);
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500), profile("b", 500), profile("c", 500)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        let outcome = engine.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Completed);
        // The refused action marks its row; the rest of the plan still runs.
        assert_eq!(executor.calls().await.len(), 3);

        let rows = store.all_rows().await;
        let sent = rows.iter().filter(|r| r["engage"] == "SENT").count();
        let limited = rows
            .iter()
            .filter(|r| r["last_error"] == "RATE_LIMITED")
            .count();
        assert_eq!(sent, 2);
        assert_eq!(limited, 1);
    }

    #[tokio::test]
    async fn test_scraper_failure_counts_toward_breaker() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::completing();
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: Vec::new(),
                fail: true,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        let err = engine.run_once().await.unwrap_err();
        assert!(matches!(err, LeadClawError::Scrape(_)));
        assert_eq!(engine.breaker().failures(), 1);
        assert!(!engine.breaker().is_open());
        assert_eq!(store.row_count().await, 0);
    }

    #[tokio::test]
    async fn test_transient_faults_are_retried_within_the_activity() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::new(vec![
            ActionOutcome::Failed(ActionFailure::Transient),
            ActionOutcome::Failed(ActionFailure::Transient),
            ActionOutcome::Completed,
        ]);
        let mut engine = build(
            test_config(), // transient_retries default 2
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        engine.run_cycle().await.unwrap();
        assert_eq!(executor.calls().await.len(), 3);
        assert_eq!(store.all_rows().await[0]["engage"], "SENT");
    }

    #[tokio::test]
    async fn test_transient_exhaustion_leaves_row_unsent() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::new(vec![
            ActionOutcome::Failed(ActionFailure::Transient),
            ActionOutcome::Failed(ActionFailure::Transient),
            ActionOutcome::Failed(ActionFailure::Transient),
        ]);
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        let outcome = engine.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Completed);

        let rows = store.all_rows().await;
        assert_eq!(rows[0]["engage"], "NOT_SENT");
        assert_eq!(rows[0]["last_error"], "TRANSIENT");
    }

    #[tokio::test]
    async fn test_dm_quota_caps_engagement() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::completing();
        let mut cfg = test_config();
        cfg.limits.dm_per_hour = 1;
        let mut engine = build(
            cfg,
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500), profile("b", 500), profile("c", 500)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        engine.run_cycle().await.unwrap();

        let rows = store.all_rows().await;
        let sent = rows.iter().filter(|r| r["engage"] == "SENT").count();
        assert_eq!(sent, 1);
        assert_eq!(executor.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_writes_fail_the_cycle_fatally() {
        let store = Arc::new(MemoryStore::new());
        store.set_drop_writes(true).await;
        let executor = RecordingExecutor::completing();
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        let err = engine.run_once().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, LeadClawError::WriteNotVerified { .. }));
    }

    #[tokio::test]
    async fn test_run_exits_cleanly_on_stop() {
        let store = Arc::new(MemoryStore::new());
        store.set_control("STOP").await;
        let executor = RecordingExecutor::completing();
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        engine.run().await.unwrap();
        assert_eq!(engine.phase(), Phase::Stopped);
        assert_eq!(executor.shutdown_count().await, 1);
        assert!(executor.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_stop_after_engaging_skips_cooldown() {
        let store = Arc::new(MemoryStore::new());
        // STOP lands while the DM goes out; the default hour-long cooldown
        // must never start.
        let executor = RecordingExecutor::flipping_control(store.clone(), "STOP");
        let mut engine = build(
            test_config(),
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        tokio::time::timeout(Duration::from_secs(5), engine.run())
            .await
            .expect("STOP after engaging must end the run before the cooldown sleep")
            .unwrap();

        assert_eq!(engine.phase(), Phase::Stopped);
        assert_eq!(engine.cycles_completed(), 1);
        assert_eq!(executor.shutdown_count().await, 1);
        assert_eq!(store.all_rows().await[0]["engage"], "SENT");
    }

    #[tokio::test]
    async fn test_stop_during_cooldown_wakes_runner() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::completing();
        let mut cfg = test_config();
        cfg.engine.pause_poll_secs = 1;
        let mut engine = build(
            cfg,
            store.clone(),
            StubScraper {
                profiles: vec![profile("a", 500)],
                fail: false,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        let flipper = tokio::spawn({
            let store = store.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                store.set_control("STOP").await;
            }
        });

        // The cycle itself finishes in milliseconds, so STOP arrives inside
        // the cooldown sleep; the poll slice picks it up within a second.
        tokio::time::timeout(Duration::from_secs(10), engine.run())
            .await
            .expect("STOP during cooldown must wake the runner before the full delay")
            .unwrap();

        assert_eq!(engine.phase(), Phase::Stopped);
        assert_eq!(engine.cycles_completed(), 1);
        assert_eq!(executor.shutdown_count().await, 1);
        flipper.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_halts_once_breaker_opens() {
        let store = Arc::new(MemoryStore::new());
        let executor = RecordingExecutor::completing();
        let mut cfg = test_config();
        cfg.engine.breaker_threshold = 2;
        let mut engine = build(
            cfg,
            store.clone(),
            StubScraper {
                profiles: Vec::new(),
                fail: true,
            },
            StubEvaluator::passing(),
            executor.clone(),
        );

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, LeadClawError::Scrape(_)));
        assert!(engine.breaker().is_open());
        assert_eq!(engine.phase(), Phase::Stopped);
        assert_eq!(executor.shutdown_count().await, 1);
    }
}

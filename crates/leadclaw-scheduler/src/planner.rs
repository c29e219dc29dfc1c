//! Activity planner — turns ready candidates plus remaining quota into a
//! prioritized, time-slotted engagement plan.
//!
//! Plans are cycle-local. Nothing here consumes quota; the limiter is
//! only consulted for headroom, and events are recorded later when an
//! action actually completes.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use leadclaw_core::config::PlannerConfig;
use leadclaw_core::types::{Activity, ActivityKind, Candidate};

use crate::limits::RateLimiter;

const DAY_SECS: i64 = 86_400;

/// Builds one engagement plan per cycle.
///
/// Plan shape: one DM per ready candidate up to the DM quota, taken in
/// readiness order, then secondary actions (like/repost/comment) rolled
/// per candidate with configured chances, each kind bounded by its own
/// quota. Quota is a ceiling; the dice decide how much of it gets used.
pub struct ActivityPlanner {
    config: PlannerConfig,
}

impl ActivityPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn build_plan(
        &self,
        ready: &[Candidate],
        limiter: &mut RateLimiter,
        now: DateTime<Utc>,
    ) -> Vec<Activity> {
        self.build_plan_with(ready, limiter, now, &mut rand::thread_rng())
    }

    /// RNG-injected variant so tests can pin the dice.
    pub fn build_plan_with<R: Rng>(
        &self,
        ready: &[Candidate],
        limiter: &mut RateLimiter,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<Activity> {
        let usable: Vec<&Candidate> = ready
            .iter()
            .filter(|c| {
                if c.handle.trim().is_empty() {
                    warn!("⚠️ Candidate {} has no handle, skipping", c.id);
                    false
                } else {
                    true
                }
            })
            .collect();

        let mut plan: Vec<Activity> = Vec::new();

        // DMs first, in readiness order, up to quota.
        let dm_quota = limiter.remaining_at(ActivityKind::Dm, now) as usize;
        if self.config.dm_template.trim().is_empty() {
            if dm_quota > 0 && !usable.is_empty() {
                warn!("⚠️ DM template is empty, planning no DMs");
            }
        } else {
            for candidate in usable.iter().take(dm_quota) {
                let payload = render(&self.config.dm_template, candidate);
                plan.push(Activity::new(
                    ActivityKind::Dm,
                    candidate,
                    Some(payload),
                    self.draw_slot(now, rng),
                ));
            }
        }

        // Secondary actions, rolled per candidate, bounded per kind.
        for kind in [ActivityKind::Like, ActivityKind::Repost, ActivityKind::Comment] {
            let quota = limiter.remaining_at(kind, now) as usize;
            let chance = self.chance_for(kind).clamp(0.0, 1.0);
            if quota == 0 || chance <= 0.0 {
                continue;
            }
            if kind == ActivityKind::Comment && self.config.comment_templates.is_empty() {
                warn!("⚠️ No comment templates configured, planning no comments");
                continue;
            }
            let mut planned = 0usize;
            for candidate in &usable {
                if planned >= quota {
                    break;
                }
                if !rng.gen_bool(chance) {
                    continue;
                }
                let payload = match kind {
                    ActivityKind::Comment => self
                        .config
                        .comment_templates
                        .choose(rng)
                        .map(|t| render(t, candidate)),
                    _ => None,
                };
                plan.push(Activity::new(
                    kind,
                    candidate,
                    payload,
                    self.draw_slot(now, rng),
                ));
                planned += 1;
            }
        }

        plan.sort_by(|a, b| {
            a.rank
                .cmp(&b.rank)
                .then_with(|| a.scheduled_at.cmp(&b.scheduled_at))
        });

        let dms = plan.iter().filter(|a| a.kind == ActivityKind::Dm).count();
        info!(
            "📅 Planned {} activities for {} candidate(s) ({dms} DM(s))",
            plan.len(),
            usable.len()
        );
        plan
    }

    fn chance_for(&self, kind: ActivityKind) -> f64 {
        match kind {
            ActivityKind::Like => self.config.like_chance,
            ActivityKind::Repost => self.config.repost_chance,
            ActivityKind::Comment => self.config.comment_chance,
            ActivityKind::Dm => 1.0,
        }
    }

    /// Draw an execution slot inside the configured daytime interval:
    /// the remainder of today's window if it is still open, otherwise
    /// tomorrow's window.
    fn draw_slot<R: Rng>(&self, now: DateTime<Utc>, rng: &mut R) -> DateTime<Utc> {
        let start_h = i64::from(self.config.active_hours_start.min(23));
        let mut end_h = i64::from(self.config.active_hours_end.min(24));
        if end_h <= start_h {
            end_h = (start_h + 1).min(24);
        }

        let ts = now.timestamp();
        let day_start = ts - ts.rem_euclid(DAY_SECS);
        let window_start = day_start + start_h * 3600;
        let window_end = day_start + end_h * 3600;
        let (lo, hi) = if ts < window_start {
            (window_start, window_end)
        } else if ts < window_end {
            (ts, window_end)
        } else {
            (window_start + DAY_SECS, window_end + DAY_SECS)
        };
        let slot = rng.gen_range(lo..hi);
        DateTime::from_timestamp(slot, 0).unwrap_or(now)
    }
}

fn render(template: &str, candidate: &Candidate) -> String {
    template
        .replace("{handle}", &candidate.handle)
        .replace("{keyword}", &candidate.keyword)
}
